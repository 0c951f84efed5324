use anyhow::Result;
use std::time::SystemTime;

use super::{FrameSource, SourceStats};
use crate::frame::Frame;

const STUB_WIDTH: u32 = 640;
const STUB_HEIGHT: u32 = 480;
const SCENE_FLIP_EVERY: u64 = 50;

/// Synthetic frame source (`stub://<name>`).
///
/// Generates deterministic frames whose content shifts every frame and
/// whose scene state flips periodically, so the stub detector observes
/// motion. Never exhausts, always healthy.
pub struct StubSource {
    name: String,
    frame_count: u64,
    scene_state: u8,
}

impl StubSource {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            frame_count: 0,
            scene_state: 0,
        }
    }
}

impl FrameSource for StubSource {
    fn connect(&mut self) -> Result<()> {
        log::info!("StubSource: connected to {} (synthetic)", self.name);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        self.frame_count += 1;
        if self.frame_count % SCENE_FLIP_EVERY == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }

        let pixel_count = (STUB_WIDTH * STUB_HEIGHT * 3) as usize;
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.frame_count + self.scene_state as u64) % 256) as u8;
        }

        let frame = Frame::new(pixels, STUB_WIDTH, STUB_HEIGHT, SystemTime::now())?;
        Ok(Some(frame))
    }

    fn is_healthy(&self) -> bool {
        true
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            source: self.name.clone(),
        }
    }
}
