use crate::ui::ui_types::Size;

/// Room for 40 boxes: slot 0 is the count, then 5 slots per box.
pub const RESULT_CAPACITY: usize = 201;
pub const RESULT_STRIDE: usize = 5;

/// A raw preview frame in NV21 layout: a full-resolution Y plane followed by
/// interleaved V/U samples at half resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nv21Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Nv21Frame {
    pub fn expected_len(width: u32, height: u32) -> usize {
        let (w, h) = (width as usize, height as usize);
        w * h + 2 * w.div_ceil(2) * h.div_ceil(2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskMode {
    /// Stills are captured for annotation.
    Training,
    /// Every frame goes to the detector.
    Detection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DetectedBox {
    pub id: i32,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Boxes from one detection pass, in capture-frame pixels.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DetectionResult {
    /// Increments once per pass.
    pub version: u64,
    pub boxes: Vec<DetectedBox>,
}

impl DetectionResult {
    /// Decodes `[count, id0, x0, y0, w0, h0, id1, ...]`. The count is clamped
    /// to what the buffer can hold.
    pub fn from_raw(version: u64, raw: &[i32]) -> Self {
        let Some((&count, rest)) = raw.split_first() else {
            return Self {
                version,
                boxes: vec![],
            };
        };
        let count = (count.max(0) as usize).min(rest.len() / RESULT_STRIDE);

        let boxes = rest
            .chunks_exact(RESULT_STRIDE)
            .take(count)
            .map(|c| DetectedBox {
                id: c[0],
                x: c[1],
                y: c[2],
                width: c[3],
                height: c[4],
            })
            .collect();

        Self { version, boxes }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CameraSettings {
    pub requested_preview: Size,
    pub jpeg_quality: u8,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            requested_preview: Size::new(640, 480),
            jpeg_quality: 90,
        }
    }
}

impl CameraSettings {
    /// The requested size if supported, otherwise the closest supported width
    /// and the closest supported height, picked independently.
    pub fn choose_preview_size(&self, supported: &[Size]) -> Option<Size> {
        let want = self.requested_preview;
        if supported.contains(&want) {
            return Some(want);
        }

        let width = supported
            .iter()
            .map(|s| s.width)
            .min_by_key(|w| w.abs_diff(want.width))?;
        let height = supported
            .iter()
            .map(|s| s.height)
            .min_by_key(|h| h.abs_diff(want.height))?;

        Some(Size::new(width, height))
    }
}
