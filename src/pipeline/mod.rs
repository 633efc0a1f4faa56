#[cfg(feature = "opencv")]
mod hershey;
pub mod launch;
pub mod overlay;
pub mod rate;
pub mod relay;

pub use overlay::{OverlayFont, OverlayStyle};
pub use rate::RateEstimator;
pub use relay::{Flow, FrameRelay};
