use anyhow::{anyhow, bail, ensure, Context, Result};
use tracing::{debug, error, info, trace, warn};

use image::{codecs::jpeg::JpegEncoder, ImageFormat, RgbImage};

use super::vision_types::Nv21Frame;

/// BT.601 limited-range YUV to RGB.
pub fn nv21_to_rgb(frame: &Nv21Frame) -> Result<RgbImage> {
    let (w, h) = (frame.width as usize, frame.height as usize);
    let expected = Nv21Frame::expected_len(frame.width, frame.height);
    ensure!(
        frame.data.len() >= expected,
        "NV21 frame too short: {} < {} for {}x{}",
        frame.data.len(),
        expected,
        w,
        h
    );

    let (y_plane, vu_plane) = frame.data.split_at(w * h);
    let vu_stride = 2 * w.div_ceil(2);

    let mut out = RgbImage::new(frame.width, frame.height);
    for (x, y, px) in out.enumerate_pixels_mut() {
        let (x, y) = (x as usize, y as usize);
        let luma = y_plane[y * w + x] as i32;
        let idx = (y / 2) * vu_stride + (x / 2) * 2;
        let v = vu_plane[idx] as i32 - 128;
        let u = vu_plane[idx + 1] as i32 - 128;

        let c = (luma - 16).max(0) * 298;
        let r = (c + 409 * v + 128) >> 8;
        let g = (c - 100 * u - 208 * v + 128) >> 8;
        let b = (c + 516 * u + 128) >> 8;

        px.0 = [
            r.clamp(0, 255) as u8,
            g.clamp(0, 255) as u8,
            b.clamp(0, 255) as u8,
        ];
    }

    Ok(out)
}

/// Frame to still: compress to JPEG, then decode the JPEG back to pixels.
pub fn capture_still(frame: &Nv21Frame, jpeg_quality: u8) -> Result<RgbImage> {
    let rgb = nv21_to_rgb(frame)?;

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, jpeg_quality)
        .encode_image(&rgb)
        .context("Failed to compress frame to JPEG")?;

    debug!(
        "compressed {}x{} frame to {} byte JPEG",
        frame.width,
        frame.height,
        jpeg.len()
    );

    let img = image::load_from_memory_with_format(&jpeg, ImageFormat::Jpeg)
        .context("Failed to decode captured JPEG")?
        .to_rgb8();

    Ok(img)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray_frame(width: u32, height: u32, luma: u8) -> Nv21Frame {
        let y_len = (width * height) as usize;
        let mut data = vec![luma; y_len];
        data.resize(Nv21Frame::expected_len(width, height), 128);
        Nv21Frame {
            width,
            height,
            data,
        }
    }

    #[test]
    fn test_nv21_gray_levels() {
        let img = nv21_to_rgb(&gray_frame(4, 2, 16)).unwrap();
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0]);

        let img = nv21_to_rgb(&gray_frame(4, 2, 235)).unwrap();
        assert_eq!(img.get_pixel(3, 1).0, [255, 255, 255]);
    }

    #[test]
    fn test_nv21_red_chroma() {
        let mut frame = gray_frame(2, 2, 81);
        // V then U
        frame.data[4] = 240;
        frame.data[5] = 90;
        let px = nv21_to_rgb(&frame).unwrap().get_pixel(1, 1).0;
        assert!(px[0] > 200 && px[1] < 40 && px[2] < 40, "{:?}", px);
    }

    #[test]
    fn test_nv21_short_buffer() {
        let frame = Nv21Frame {
            width: 4,
            height: 4,
            data: vec![0; 10],
        };
        assert!(nv21_to_rgb(&frame).is_err());
    }

    #[test]
    fn test_capture_still_keeps_size() {
        let img = capture_still(&gray_frame(64, 48, 120), 90).unwrap();
        assert_eq!(img.dimensions(), (64, 48));
        let p = img.get_pixel(10, 10).0;
        /// lossy, but close to the source gray
        assert!(p.iter().all(|&c| (110..=135).contains(&c)), "{:?}", p);
    }
}
