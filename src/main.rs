//! framerelay: FPS overlay on a live camera feed, and still-frame extraction

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::{eyre::eyre, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use framerelay::display::{BufferSink, DisplaySink};
use framerelay::error::failure_exit_code;
use framerelay::pipeline::{FrameRelay, OverlayStyle};
use framerelay::{utils, CaptureSource, Config, StopReason};

#[derive(Debug, Parser)]
#[command(name = "framerelay", version, about)]
struct Cli {
    /// TOML configuration file; missing files fall back to defaults
    #[arg(long, global = true, default_value = "framerelay.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the camera feed with an FPS label in a window
    Show {
        #[arg(long, value_enum, default_value_t = CaptureBackend::Gstreamer)]
        capture: CaptureBackend,
        #[arg(long, value_enum, default_value_t = DisplayBackend::Sdl)]
        display: DisplayBackend,
    },
    /// Push the labelled feed back into a GStreamer pipeline through appsrc
    Relay {
        #[arg(long, value_enum, default_value_t = CaptureBackend::Gstreamer)]
        capture: CaptureBackend,
    },
    /// Extract every frame of a video file into numbered JPEG files
    Extract {
        /// Input video file
        location: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CaptureBackend {
    Gstreamer,
    Opencv,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DisplayBackend {
    Sdl,
    Highgui,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = color_eyre::install() {
        eprintln!("Failed to install error reporter: {}", e);
    }
    init_tracing();

    match run(cli) {
        Ok(reason) => reason.exit_code(),
        Err(e) => {
            error!("{:?}", e);
            failure_exit_code()
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::prelude::*;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("framerelay=info"));
    let fmt = tracing_subscriber::fmt::layer().with_timer(tracing_subscriber::fmt::time::uptime());
    let registry = tracing_subscriber::registry().with(filter).with(fmt);

    #[cfg(feature = "profiling")]
    let registry = registry.with(tracing_tracy::TracyLayer::default());

    registry.init();
}

fn run(cli: Cli) -> Result<StopReason> {
    let mut config = Config::load(Some(cli.config.as_path()))?;

    match cli.command {
        Command::Show { capture, display } => {
            resolve_device(&mut config)?;
            let mut source = open_source(&config, capture)?;
            let style = OverlayStyle::for_window(&config.overlay);
            let mut relay = FrameRelay::new(style);

            let reason = match display {
                DisplayBackend::Sdl => {
                    let mut sink = DisplaySink::new(open_sdl(&config)?);
                    relay.run(&mut source, &mut sink)
                }
                DisplayBackend::Highgui => {
                    let mut sink = DisplaySink::new(open_highgui(&config)?);
                    relay.run(&mut source, &mut sink)
                }
            };
            Ok(reason)
        }
        Command::Relay { capture } => relay_to_appsrc(&mut config, capture),
        Command::Extract { location } => extract(&location, &config),
    }
}

fn resolve_device(config: &mut Config) -> Result<()> {
    if config.capture.device.is_empty() {
        config.capture.device = utils::auto_detect_device()?.path;
    }
    info!("Using capture device: {}", config.capture.device);
    Ok(())
}

fn open_source(config: &Config, backend: CaptureBackend) -> Result<Box<dyn CaptureSource>> {
    match backend {
        CaptureBackend::Gstreamer => open_gstreamer(config),
        CaptureBackend::Opencv => open_opencv(config),
    }
}

#[cfg(feature = "gstreamer-pipeline")]
fn open_gstreamer(config: &Config) -> Result<Box<dyn CaptureSource>> {
    let mut capture = framerelay::capture::GstCapture::new(&config.capture, &config.gstreamer)?;
    capture.start_stream()?;
    Ok(Box::new(capture))
}

#[cfg(not(feature = "gstreamer-pipeline"))]
fn open_gstreamer(_config: &Config) -> Result<Box<dyn CaptureSource>> {
    Err(eyre!("built without the gstreamer-pipeline feature"))
}

#[cfg(feature = "opencv")]
fn open_opencv(config: &Config) -> Result<Box<dyn CaptureSource>> {
    let capture = framerelay::capture::CvCapture::new(&config.capture, &config.gstreamer)?;
    Ok(Box::new(capture))
}

#[cfg(not(feature = "opencv"))]
fn open_opencv(_config: &Config) -> Result<Box<dyn CaptureSource>> {
    Err(eyre!("built without the opencv feature"))
}

#[cfg(feature = "sdl-display")]
fn open_sdl(config: &Config) -> Result<framerelay::display::Sdl2Display> {
    framerelay::display::Sdl2Display::new(&config.display, config.capture.width, config.capture.height)
}

#[cfg(not(feature = "sdl-display"))]
fn open_sdl(_config: &Config) -> Result<NoDisplay> {
    Err(eyre!("built without the sdl-display feature"))
}

#[cfg(feature = "opencv")]
fn open_highgui(config: &Config) -> Result<framerelay::display::HighGuiDisplay> {
    framerelay::display::HighGuiDisplay::new(&config.display)
}

#[cfg(not(feature = "opencv"))]
fn open_highgui(_config: &Config) -> Result<NoDisplay> {
    Err(eyre!("built without the opencv feature"))
}

/// Stand-in surface type for backends compiled out
#[cfg(any(not(feature = "opencv"), not(feature = "sdl-display")))]
enum NoDisplay {}

#[cfg(any(not(feature = "opencv"), not(feature = "sdl-display")))]
impl framerelay::display::DisplaySurface for NoDisplay {
    fn show(&mut self, _frame: &framerelay::Frame) -> Result<(), StopReason> {
        match *self {}
    }

    fn poll_cancel_key(&mut self) -> bool {
        match *self {}
    }
}

#[cfg(feature = "gstreamer-pipeline")]
fn relay_to_appsrc(config: &mut Config, capture: CaptureBackend) -> Result<StopReason> {
    use framerelay::display::AppSrcDisplay;

    let mut display = AppSrcDisplay::new(&config.capture, &config.gstreamer)?;
    display.start()?;

    resolve_device(config)?;
    let mut source = open_source(config, capture)?;

    let mut sink = BufferSink::new(display, config.capture.geometry());
    let stats = sink.stats();
    let mut relay = FrameRelay::new(OverlayStyle::for_relay(&config.overlay));
    let reason = relay.run(&mut source, &mut sink);

    info!(
        allocated = stats.allocated(),
        released = stats.released(),
        rejected = stats.rejected(),
        "Transfer buffers"
    );
    Ok(reason)
}

#[cfg(not(feature = "gstreamer-pipeline"))]
fn relay_to_appsrc(_config: &mut Config, _capture: CaptureBackend) -> Result<StopReason> {
    Err(eyre!("built without the gstreamer-pipeline feature"))
}

#[cfg(feature = "gstreamer-pipeline")]
fn extract(location: &std::path::Path, config: &Config) -> Result<StopReason> {
    let extractor = framerelay::extract::FrameExtractor::new(location, &config.extract)?;
    extractor.run()
}

#[cfg(not(feature = "gstreamer-pipeline"))]
fn extract(_location: &std::path::Path, _config: &Config) -> Result<StopReason> {
    Err(eyre!("built without the gstreamer-pipeline feature"))
}
