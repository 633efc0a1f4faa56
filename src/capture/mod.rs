pub mod frame;
pub mod source;

#[cfg(feature = "gstreamer-pipeline")]
pub mod gst_capture;

#[cfg(feature = "opencv")]
pub mod cv_capture;

pub use frame::{Frame, FrameGeometry, PixelFormat};
pub use source::{CaptureError, CaptureSource};

#[cfg(feature = "gstreamer-pipeline")]
pub use gst_capture::GstCapture;

#[cfg(feature = "opencv")]
pub use cv_capture::CvCapture;
