//! Capture domain — one-frame acquisition from a capture device.
//!
//! The device itself (camera, scanner, screen) belongs to the presentation
//! layer; it reaches the pipeline through the `FrameSource` boundary. The
//! device is held exclusively for the duration of a single frame grab and
//! released when the `FrameLease` drops, on every exit path.

use image::DynamicImage;
use std::io::Cursor;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture device unavailable: {0}")]
    Unavailable(String),
    #[error("failed to grab frame: {0}")]
    Frame(String),
    #[error("failed to encode frame: {0}")]
    Encode(String),
}

/// A capture device the pipeline can grab one frame from.
pub trait FrameSource: Send + Sync {
    /// Acquire the device and grab a single frame. The returned lease owns
    /// the device until dropped.
    fn acquire(&self) -> Result<FrameLease, CaptureError>;
}

/// One grabbed frame plus the release hook for the device that produced it.
/// Dropping the lease releases the device — there is no other way to let go
/// of it, so early returns and errors cannot leak a held camera.
pub struct FrameLease {
    frame: DynamicImage,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl FrameLease {
    pub fn new(frame: DynamicImage, release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            frame,
            release: Some(Box::new(release)),
        }
    }

    pub fn frame(&self) -> &DynamicImage {
        &self.frame
    }
}

impl Drop for FrameLease {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

/// Grab one frame from the device and encode it to JPEG bytes in memory.
/// The device is released before this returns, whether or not it succeeds.
pub fn capture_jpeg(source: &dyn FrameSource) -> Result<Vec<u8>, CaptureError> {
    let lease = source.acquire()?;

    let mut jpeg = Vec::new();
    lease
        .frame()
        .write_to(&mut Cursor::new(&mut jpeg), image::ImageFormat::Jpeg)
        .map_err(|e| CaptureError::Encode(e.to_string()))?;

    log::info!("[CAPTURE] Frame encoded: {} bytes", jpeg.len());
    Ok(jpeg)
}
