pub mod detection;
pub mod utilities;
pub mod vision_types;

pub use self::detection::{DetectionBridge, Detector, NullDetector};
pub use self::vision_types::*;
