pub mod bmp;

use anyhow::{anyhow, bail, ensure, Context, Result};
use tracing::{debug, error, info, trace, warn};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::RgbImage;

use crate::{account::SaveSlot, ui::history::History};

/// Ordered name/value pairs for a URL-encoded form body.
pub type FormFields = Vec<(String, String)>;

/// Upload body for one annotated still. The ROI is sent as `ROI_*`, every
/// later region as `TAG{n}_*` numbered from 1. No network I/O happens here.
pub fn build_upload_form(still: &RgbImage, history: &History, slot: SaveSlot) -> Result<FormFields> {
    ensure!(
        still.width() > 0 && still.height() > 0,
        "No captured image to upload"
    );
    let roi = history
        .roi()
        .ok_or_else(|| anyhow!("No ROI has been outlined"))?;

    debug!("forming bmp ...");
    let bmp = bmp::encode_bmp(still);
    debug!("forming bmp ... finished, {} bytes", bmp.len());

    let mut fields: FormFields = vec![
        ("FILE".to_string(), STANDARD.encode(&bmp)),
        ("Img_W".to_string(), still.width().to_string()),
        ("Img_H".to_string(), still.height().to_string()),
        ("TagNum".to_string(), history.tags().len().to_string()),
    ];

    let (x, y, w, h) = roi.image_bounds();
    debug!("ROI: X:{} Y:{} W:{} H:{}", x, y, w, h);
    push_bounds(&mut fields, "ROI", (x, y, w, h));

    for (i, tag) in history.tags().iter().enumerate() {
        let prefix = format!("TAG{}", i + 1);
        let bounds = tag.image_bounds();
        debug!(
            "{}: type:{} X:{} Y:{} W:{} H:{}",
            prefix,
            tag.kind.to_str(),
            bounds.0,
            bounds.1,
            bounds.2,
            bounds.3
        );
        /// tag type is not sent yet, the server expects a placeholder
        fields.push((format!("{}_T", prefix), " ".to_string()));
        push_bounds(&mut fields, &prefix, bounds);
    }

    fields.push(("NUM".to_string(), slot.to_string()));

    Ok(fields)
}

fn push_bounds(fields: &mut FormFields, prefix: &str, (x, y, w, h): (i32, i32, i32, i32)) {
    fields.push((format!("{}_X", prefix), x.to_string()));
    fields.push((format!("{}_Y", prefix), y.to_string()));
    fields.push((format!("{}_W", prefix), w.to_string()));
    fields.push((format!("{}_H", prefix), h.to_string()));
}
