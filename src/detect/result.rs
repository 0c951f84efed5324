/// Result of running detection on one frame.
///
/// Only `present` feeds the debouncer; boxes and confidence exist for
/// display and logging.
#[derive(Clone, Debug, Default)]
pub struct DetectionResult {
    /// Is the target object in the frame?
    pub present: bool,
    /// Confidence of the primary detection.
    pub confidence: f32,
    /// Bounding boxes (normalized 0..1 coordinates).
    pub detections: Vec<Detection>,
}

#[derive(Clone, Debug)]
pub struct Detection {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub confidence: f32,
    pub label: String,
}
