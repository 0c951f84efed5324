use anyhow::Result;
use sha2::{Digest, Sha256};

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{Detection, DetectionResult};
use crate::frame::Frame;

const STUB_CONFIDENCE: f32 = 0.85;

/// Stub backend for tests and demos. Reports the target as present while
/// consecutive frames keep changing (pixel-hash comparison), which pairs
/// with the stub frame source's scene-state flips.
pub struct StubBackend {
    target_label: String,
    min_confidence: f32,
    last_hash: Option<[u8; 32]>,
}

impl StubBackend {
    pub fn new(target_label: &str, min_confidence: f32) -> Self {
        Self {
            target_label: target_label.to_string(),
            min_confidence,
            last_hash: None,
        }
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, frame: &Frame) -> Result<DetectionResult> {
        let current_hash: [u8; 32] = Sha256::digest(frame.pixels()).into();
        let changed = match self.last_hash {
            Some(prev) => prev != current_hash,
            None => false,
        };
        self.last_hash = Some(current_hash);

        let present = changed && STUB_CONFIDENCE >= self.min_confidence;
        let detections = if present {
            vec![Detection {
                x: 0.25,
                y: 0.25,
                w: 0.5,
                h: 0.5,
                confidence: STUB_CONFIDENCE,
                label: self.target_label.clone(),
            }]
        } else {
            vec![]
        };

        Ok(DetectionResult {
            present,
            confidence: if present { STUB_CONFIDENCE } else { 0.0 },
            detections,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    fn frame(value: u8) -> Frame {
        Frame::new(vec![value; 8 * 8 * 3], 8, 8, SystemTime::now()).unwrap()
    }

    #[test]
    fn first_frame_is_absent() {
        let mut backend = StubBackend::new("cup", 0.5);
        let result = backend.detect(&frame(1)).unwrap();
        assert!(!result.present);
    }

    #[test]
    fn changed_pixels_report_presence() {
        let mut backend = StubBackend::new("cup", 0.5);
        backend.detect(&frame(1)).unwrap();
        let result = backend.detect(&frame(2)).unwrap();
        assert!(result.present);
        assert_eq!(result.detections.len(), 1);
        assert_eq!(result.detections[0].label, "cup");
    }

    #[test]
    fn identical_pixels_report_absence() {
        let mut backend = StubBackend::new("cup", 0.5);
        backend.detect(&frame(1)).unwrap();
        backend.detect(&frame(2)).unwrap();
        let result = backend.detect(&frame(2)).unwrap();
        assert!(!result.present);
    }

    #[test]
    fn confidence_floor_suppresses_presence() {
        let mut backend = StubBackend::new("cup", 0.99);
        backend.detect(&frame(1)).unwrap();
        let result = backend.detect(&frame(2)).unwrap();
        assert!(!result.present);
    }
}
