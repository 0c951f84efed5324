//! Frame ingestion sources.
//!
//! Sources produce in-memory RGB `Frame`s for the sampling loop:
//! - HTTP cameras streaming MJPEG or serving single JPEG snapshots
//! - Stub source (`stub://<name>`) producing synthetic frames for tests
//!   and demos
//!
//! A source returning `Ok(None)` means the stream is exhausted; the loop
//! exits cleanly. Source errors are per-frame and recoverable.

mod http;
mod stub;

use anyhow::{anyhow, Result};

use crate::frame::Frame;

pub use http::{HttpConfig, HttpSource};
pub use stub::StubSource;

/// A frame source the sampling loop pulls from.
pub trait FrameSource: Send {
    /// Establish the connection or open the device.
    fn connect(&mut self) -> Result<()>;

    /// Capture the next frame. `Ok(None)` signals end-of-stream.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Whether frames have been arriving recently.
    fn is_healthy(&self) -> bool;

    /// Capture statistics for health logging.
    fn stats(&self) -> SourceStats;
}

/// Statistics for a frame source.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub source: String,
}

/// Build a frame source from a device identifier.
///
/// `stub://<name>` selects the synthetic source; `http(s)://` a camera
/// stream. Anything else is a configuration error.
pub fn from_device(device: &str) -> Result<Box<dyn FrameSource>> {
    if device.starts_with("stub://") {
        return Ok(Box::new(StubSource::new(device)));
    }
    if device.starts_with("http://") || device.starts_with("https://") {
        return Ok(Box::new(HttpSource::new(HttpConfig {
            url: device.to_string(),
            ..HttpConfig::default()
        })?));
    }
    Err(anyhow!(
        "unsupported capture device '{}'; expected stub:// or http(s)://",
        device
    ))
}
