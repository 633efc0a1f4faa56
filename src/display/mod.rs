pub mod sink;

#[cfg(feature = "sdl-display")]
pub mod display;

#[cfg(feature = "opencv")]
pub mod highgui;

#[cfg(feature = "gstreamer-pipeline")]
pub mod gst_display;

pub use sink::{
    BufferConsumer, BufferSink, DisplaySink, DisplaySurface, FrameSink, Submission,
    TransferBuffer, TransferStats,
};

#[cfg(feature = "sdl-display")]
pub use display::Sdl2Display;

#[cfg(feature = "opencv")]
pub use highgui::HighGuiDisplay;

#[cfg(feature = "gstreamer-pipeline")]
pub use gst_display::AppSrcDisplay;
