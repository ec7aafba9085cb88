use anyhow::{anyhow, bail, ensure, Context, Result};
use tracing::{debug, error, info, trace, warn};

use image::RgbImage;

use super::{
    utilities,
    vision_types::{
        CameraSettings, DetectedBox, DetectionResult, Nv21Frame, TaskMode, RESULT_CAPACITY,
    },
};
use crate::ui::{
    overlay::{detection_box_op, DrawOp},
    projector::Projector,
    ui_types::Size,
};

/// The native detection library.
pub trait Detector: Send {
    /// Loads a trained detector file. Returns false if the file was rejected.
    fn init(&mut self, detector_file: &[u8]) -> bool;

    /// Runs one pass over an NV21 frame, writing `[count, id, x, y, w, h, ...]`
    /// into `result`.
    fn detect(&mut self, width: u32, height: u32, frame: &[u8], result: &mut [i32]);
}

/// Stand-in used when no native library is linked. Rejects every detector file.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDetector;

impl Detector for NullDetector {
    fn init(&mut self, _detector_file: &[u8]) -> bool {
        false
    }

    fn detect(&mut self, _width: u32, _height: u32, _frame: &[u8], result: &mut [i32]) {
        result.fill(0);
    }
}

/// Owns the latest camera frame and forwards it to the detector.
pub struct DetectionBridge<D> {
    detector: D,
    camera: CameraSettings,
    mode: TaskMode,
    preview: Option<Size>,
    display: Size,
    initialized: bool,
    /// A pass has been scheduled and has not finished yet.
    in_flight: bool,
    latest: Option<Nv21Frame>,
    raw: Vec<i32>,
    result: DetectionResult,
}

impl<D: Detector> DetectionBridge<D> {
    pub fn new(detector: D, camera: CameraSettings, display: Size) -> Self {
        Self {
            detector,
            camera,
            mode: TaskMode::Training,
            preview: None,
            display,
            initialized: false,
            in_flight: false,
            latest: None,
            raw: vec![0; RESULT_CAPACITY],
            result: DetectionResult::default(),
        }
    }

    pub fn mode(&self) -> TaskMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: TaskMode) {
        debug!("task mode: {:?}", mode);
        self.mode = mode;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn preview_size(&self) -> Option<Size> {
        self.preview
    }

    pub fn latest_result(&self) -> &DetectionResult {
        &self.result
    }

    /// Picks the preview size from what the camera reports.
    pub fn configure_preview(&mut self, supported: &[Size]) -> Result<Size> {
        for s in supported {
            trace!("supported preview size: {}x{}", s.width, s.height);
        }
        let size = self
            .camera
            .choose_preview_size(supported)
            .ok_or_else(|| anyhow!("Camera reported no preview sizes"))?;

        if size != self.camera.requested_preview {
            warn!(
                "preview {}x{} not supported, using {}x{}",
                self.camera.requested_preview.width,
                self.camera.requested_preview.height,
                size.width,
                size.height
            );
        }

        self.preview = Some(size);
        Ok(size)
    }

    /// Loads a downloaded detector file. Empty files are not passed on.
    pub fn init_detector(&mut self, detector_file: &[u8]) -> bool {
        if detector_file.is_empty() {
            warn!("empty detector file");
            return false;
        }
        let ok = self.detector.init(detector_file);
        info!(
            "detector init with {} bytes: {}",
            detector_file.len(),
            if ok { "ok" } else { "rejected" }
        );
        self.initialized |= ok;
        ok
    }

    /// Stores the frame. Returns true when a detection pass should be
    /// scheduled; frames arriving while a pass is in flight are dropped.
    pub fn on_frame(&mut self, frame: Nv21Frame) -> bool {
        if self.in_flight {
            trace!("dropping frame, detection in flight");
            return false;
        }
        self.latest = Some(frame);

        if self.mode == TaskMode::Detection && self.initialized {
            self.in_flight = true;
            true
        } else {
            false
        }
    }

    /// Runs the scheduled pass and returns the detection layer's paint ops.
    pub fn run_pass(&mut self) -> Option<Vec<DrawOp>> {
        if !self.in_flight {
            return None;
        }
        let Some(frame) = self.latest.as_ref() else {
            self.in_flight = false;
            return None;
        };

        self.raw.fill(0);
        self.detector
            .detect(frame.width, frame.height, &frame.data, &mut self.raw);
        self.result = DetectionResult::from_raw(self.result.version + 1, &self.raw);
        trace!("detected {} boxes", self.result.boxes.len());

        let frame_size = Size::new(frame.width, frame.height);
        let ops = self.overlay_ops(frame_size);
        self.in_flight = false;
        Some(ops)
    }

    /// Latest result mapped into display space, X and Y scaled independently.
    pub fn display_boxes(&self, frame: Size) -> Vec<DetectedBox> {
        let (sx, sy) = Projector::new(frame, self.display).scale_factors();
        self.result
            .boxes
            .iter()
            .map(|b| DetectedBox {
                id: b.id,
                x: (b.x as f64 * sx) as i32,
                y: (b.y as f64 * sy) as i32,
                width: (b.width as f64 * sx) as i32,
                height: (b.height as f64 * sy) as i32,
            })
            .collect()
    }

    fn overlay_ops(&self, frame: Size) -> Vec<DrawOp> {
        let mut ops = vec![DrawOp::Clear];
        for b in self.display_boxes(frame) {
            debug!(
                "id={} x={} y={} width={} height={}",
                b.id, b.x, b.y, b.width, b.height
            );
            ops.push(detection_box_op(b.x, b.y, b.width, b.height));
        }
        ops
    }

    /// Converts the latest frame into a still for annotation.
    pub fn capture_still(&mut self) -> Result<RgbImage> {
        ensure!(
            self.mode == TaskMode::Training,
            "capture requested while in {:?} mode",
            self.mode
        );
        let frame = self
            .latest
            .as_ref()
            .ok_or_else(|| anyhow!("No camera frame received yet"))?;

        info!("capturing still {}x{}", frame.width, frame.height);
        utilities::capture_still(frame, self.camera.jpeg_quality)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::ui_types::{Color, Point};

    /// Replays a fixed result and counts passes.
    struct FixedDetector {
        result: Vec<i32>,
        calls: usize,
    }

    impl Detector for FixedDetector {
        fn init(&mut self, detector_file: &[u8]) -> bool {
            detector_file.starts_with(b"DK")
        }

        fn detect(&mut self, _width: u32, _height: u32, _frame: &[u8], result: &mut [i32]) {
            self.calls += 1;
            result[..self.result.len()].copy_from_slice(&self.result);
        }
    }

    fn frame(width: u32, height: u32) -> Nv21Frame {
        Nv21Frame {
            width,
            height,
            data: vec![128; Nv21Frame::expected_len(width, height)],
        }
    }

    fn bridge(result: Vec<i32>) -> DetectionBridge<FixedDetector> {
        let mut b = DetectionBridge::new(
            FixedDetector { result, calls: 0 },
            CameraSettings::default(),
            Size::new(1280, 720),
        );
        b.set_mode(TaskMode::Detection);
        assert!(b.init_detector(b"DK001"));
        b
    }

    #[test]
    fn test_scaled_box() {
        let mut b = bridge(vec![1, 7, 100, 100, 50, 50]);
        assert!(b.on_frame(frame(640, 480)));
        let ops = b.run_pass().unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(
            ops[1],
            DrawOp::StrokeRect {
                from: Point::new(200, 150),
                to: Point::new(299, 224),
                color: Color::Red,
                width: crate::ui::overlay::DETECTION_STROKE,
            }
        );
        assert_eq!(b.latest_result().version, 1);
    }

    #[test]
    fn test_zero_boxes_clears() {
        let mut b = bridge(vec![0]);
        b.on_frame(frame(640, 480));
        assert_eq!(b.run_pass(), Some(vec![DrawOp::Clear]));
    }

    #[test]
    fn test_frames_dropped_while_in_flight() {
        let mut b = bridge(vec![0]);
        assert!(b.on_frame(frame(640, 480)));
        assert!(!b.on_frame(frame(320, 240)));
        b.run_pass();
        assert_eq!(b.detector.calls, 1);
        assert_eq!(b.latest.as_ref().unwrap().width, 640);

        /// nothing scheduled
        assert!(b.run_pass().is_none());
        assert!(b.on_frame(frame(320, 240)));
    }

    #[test]
    fn test_no_pass_without_init() {
        let mut b = DetectionBridge::new(
            NullDetector,
            CameraSettings::default(),
            Size::new(1280, 720),
        );
        b.set_mode(TaskMode::Detection);
        assert!(!b.init_detector(b"DK001"));
        assert!(!b.init_detector(b""));
        assert!(!b.on_frame(frame(640, 480)));
        assert!(b.run_pass().is_none());
    }

    #[test]
    fn test_versions_increase() {
        let mut b = bridge(vec![1, 1, 0, 0, 10, 10]);
        for v in 1..=3 {
            b.on_frame(frame(640, 480));
            b.run_pass();
            assert_eq!(b.latest_result().version, v);
        }
    }

    #[test]
    fn test_capture_only_in_training() {
        let mut b = bridge(vec![0]);
        b.on_frame(frame(32, 24));
        assert!(b.capture_still().is_err());

        b.run_pass();
        b.set_mode(TaskMode::Training);
        let still = b.capture_still().unwrap();
        assert_eq!(still.dimensions(), (32, 24));
    }

    #[test]
    fn test_capture_without_frame() {
        let mut b = DetectionBridge::new(
            NullDetector,
            CameraSettings::default(),
            Size::new(800, 480),
        );
        assert!(b.capture_still().is_err());
    }

    #[test]
    fn test_configure_preview() {
        let mut b = DetectionBridge::new(
            NullDetector,
            CameraSettings::default(),
            Size::new(800, 480),
        );
        assert!(b.configure_preview(&[]).is_err());
        let s = b
            .configure_preview(&[Size::new(800, 600), Size::new(640, 480)])
            .unwrap();
        assert_eq!(s, Size::new(640, 480));
        assert_eq!(b.preview_size(), Some(s));
    }
}
