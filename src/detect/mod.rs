mod backend;
mod backends;
mod result;

pub use backend::DetectorBackend;
pub use backends::{from_config, StubBackend};
pub use result::{Detection, DetectionResult};
