pub mod bus;

#[cfg(feature = "gstreamer-pipeline")]
pub mod frames;

pub use bus::{BusDispatcher, BusEvent, BusFlow, PlaybackControl};

#[cfg(feature = "gstreamer-pipeline")]
pub use frames::FrameExtractor;
