// ============================================================================
// ERRORS - surface allocation, presentation, and file I/O failures
// ============================================================================

use thiserror::Error;

use crate::canvas::Size;

/// Failure to create or refill a pixel surface.
///
/// Any of these is fatal to the operation that asked for the surface; the
/// history ring is left exactly as it was before the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("surface size {0} has a zero dimension")]
    ZeroSized(Size),
    #[error("surface size {size} exceeds the device limit of {limit} pixels per edge")]
    TooLarge { size: Size, limit: u32 },
    #[error("failed to allocate {bytes} bytes for a {size} surface")]
    Allocation { size: Size, bytes: usize },
    #[error("pixel buffer holds {actual} pixels, surface needs {expected}")]
    PixelCountMismatch { expected: usize, actual: usize },
}

/// Failure while submitting a frame to a presentation chain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PresentError {
    /// The device backing the chain is gone. The chain cannot be reused;
    /// the owner must build a new one.
    #[error("presentation device lost: {0}")]
    DeviceLost(String),
    #[error("no presentation chain attached")]
    NoChain,
    #[error("presenter must be stopped first")]
    StillRunning,
    #[error("failed to start presenter thread: {0}")]
    Spawn(String),
    #[error("presenter thread panicked")]
    Panicked,
}

/// Failure while encoding or decoding canvas content.
#[derive(Error, Debug)]
pub enum IoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image codec error: {0}")]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

/// Anything a user-level paint command can fail with.
#[derive(Error, Debug)]
pub enum ControllerError {
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    #[error(transparent)]
    Present(#[from] PresentError),
    #[error(transparent)]
    Io(#[from] IoError),
}
