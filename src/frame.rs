use anyhow::{anyhow, Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use std::time::SystemTime;

const JPEG_QUALITY: u8 = 85;

/// An in-memory RGB frame as produced by a frame source.
///
/// Pixels are tightly packed row-major RGB8 (`width * height * 3` bytes).
/// Frames are ephemeral: they flow from the source through detection and,
/// on a trigger, into the artifact store, and are dropped afterwards.
#[derive(Clone, Debug)]
pub struct Frame {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    captured_at: SystemTime,
}

impl Frame {
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, captured_at: SystemTime) -> Result<Self> {
        let expected = width as usize * height as usize * 3;
        if pixels.len() != expected {
            return Err(anyhow!(
                "frame pixel buffer size mismatch: got {} bytes, expected {} for {}x{} rgb",
                pixels.len(),
                expected,
                width,
                height
            ));
        }
        Ok(Self {
            pixels,
            width,
            height,
            captured_at,
        })
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn captured_at(&self) -> SystemTime {
        self.captured_at
    }

    /// Encode the frame as JPEG bytes.
    pub fn encode_jpeg(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(self.pixels.len() / 8);
        let mut encoder = JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY);
        encoder
            .encode(
                &self.pixels,
                self.width,
                self.height,
                ExtendedColorType::Rgb8,
            )
            .context("encode frame as jpeg")?;
        Ok(bytes)
    }
}
