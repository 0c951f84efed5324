use anyhow::Result;

use crate::detect::result::DetectionResult;
use crate::frame::Frame;

/// Detector backend trait.
///
/// Implementations wrap whatever inference actually runs (an ONNX model,
/// an external NVR, a test script). They are treated as pure, possibly
/// slow, synchronous calls: the sampling loop blocks on `detect` and
/// accepts the cadence drift that causes.
///
/// A backend failure is never fatal to the loop; the caller treats the
/// sample as absent.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a frame, reporting whether the target object is
    /// present above the backend's configured confidence floor.
    fn detect(&mut self, frame: &Frame) -> Result<DetectionResult>;

    /// Optional warm-up hook (model load, first-inference cost).
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
