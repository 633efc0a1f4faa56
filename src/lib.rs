pub mod capture;
pub mod display;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod utils;

use std::path::Path;

use capture::frame::{FrameGeometry, PixelFormat};
use pipeline::overlay::{OverlayFont, MAX_FONT_SCALE, MAX_PRECISION, MAX_THICKNESS};
use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};

pub use capture::{CaptureSource, Frame};
pub use error::{ErrorCategory, StopReason};

/// Prefix for environment overrides, e.g. `FRAMERELAY__CAPTURE__WIDTH=1280`
pub const ENV_PREFIX: &str = "FRAMERELAY";

/// System configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub capture: CaptureConfig,
    pub display: DisplayConfig,
    pub overlay: OverlayConfig,
    pub gstreamer: GStreamerConfig,
    pub extract: ExtractConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// V4L2 device node; empty means auto-detect
    pub device: String,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub format: PixelFormat,
}

impl CaptureConfig {
    pub fn geometry(&self) -> FrameGeometry {
        FrameGeometry::new(self.width, self.height, self.format.channels())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    pub title: String,
    /// Key that stops the display loop
    pub cancel_key: char,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayConfig {
    pub anchor_x: i32,
    pub anchor_y: i32,
    pub font_scale: f64,
    pub thickness: u32,
    /// Label color for `show`, in the frame's channel order
    pub window_color: [u8; 3],
    /// Label color for `relay`, in the frame's channel order
    pub relay_color: [u8; 3],
    pub precision: usize,
    pub font: OverlayFont,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GStreamerConfig {
    /// Replaces the generated capture pipeline when set; must end in `appsink name=appsink`
    pub custom_pipeline: Option<String>,
    pub video_sink: String,
    pub is_live: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// multifilesink location pattern
    pub output_pattern: String,
    pub jpeg_quality: i32,
    pub sync: bool,
    /// How long the driving loop waits for a bus message per tick
    pub tick_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capture: CaptureConfig {
                device: "/dev/video0".into(),
                width: 640,
                height: 480,
                fps: 30,
                format: PixelFormat::Bgr24,
            },
            display: DisplayConfig {
                title: "feed".into(),
                cancel_key: 'q',
            },
            overlay: OverlayConfig {
                anchor_x: 30,
                anchor_y: 50,
                font_scale: 1.0,
                thickness: 2,
                window_color: [255, 0, 255],
                relay_color: [255, 255, 0],
                precision: 6,
                font: OverlayFont::default(),
            },
            gstreamer: GStreamerConfig {
                custom_pipeline: None,
                video_sink: "autovideosink".into(),
                is_live: true,
            },
            extract: ExtractConfig {
                output_pattern: "frame%05d.jpg".into(),
                jpeg_quality: 85,
                sync: false,
                tick_ms: 100,
            },
        }
    }
}

impl Config {
    /// Layer defaults, an optional TOML file and `FRAMERELAY__*` variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder().add_source(
            config::Config::try_from(&Config::default())
                .map_err(|e| eyre!("Failed to serialize default config: {}", e))?,
        );

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .map_err(|e| eyre!("Failed to load configuration: {}", e))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| eyre!("Invalid configuration: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.capture.width == 0 || self.capture.height == 0 {
            return Err(eyre!(
                "Capture geometry must be non-zero, got {}x{}",
                self.capture.width,
                self.capture.height
            ));
        }
        if self.capture.fps == 0 {
            return Err(eyre!("Capture fps must be non-zero"));
        }
        let scale = self.overlay.font_scale;
        if !scale.is_finite() || scale <= 0.0 || scale > MAX_FONT_SCALE {
            return Err(eyre!(
                "Overlay font scale must be within (0, {}], got {}",
                MAX_FONT_SCALE,
                scale
            ));
        }
        if self.overlay.thickness == 0 || self.overlay.thickness > MAX_THICKNESS {
            return Err(eyre!(
                "Overlay thickness must be within 1..={}, got {}",
                MAX_THICKNESS,
                self.overlay.thickness
            ));
        }
        if self.overlay.precision > MAX_PRECISION {
            return Err(eyre!(
                "Overlay precision must be at most {}, got {}",
                MAX_PRECISION,
                self.overlay.precision
            ));
        }
        if !(0..=100).contains(&self.extract.jpeg_quality) {
            return Err(eyre!(
                "JPEG quality must be within 0..=100, got {}",
                self.extract.jpeg_quality
            ));
        }
        Ok(())
    }
}
