use thiserror::Error;

use super::frame::{Frame, FrameError};

/// Failure to obtain a frame from a capture source
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture device unavailable: {0}")]
    Unavailable(String),
    #[error("failed to read frame: {0}")]
    Read(String),
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Yields frames on demand until exhausted or failing.
///
/// `Ok(None)` signals end of stream. Geometry and pixel format stay fixed
/// for the lifetime of one source.
pub trait CaptureSource {
    fn read_frame(&mut self) -> Result<Option<Frame>, CaptureError>;
}

impl<S: CaptureSource + ?Sized> CaptureSource for Box<S> {
    fn read_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        (**self).read_frame()
    }
}
