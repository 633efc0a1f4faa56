//! GStreamer appsrc sink: frames produced in Rust are pushed back into a
//! pipeline that converts and displays them

use color_eyre::{eyre::eyre, Result};
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use tracing::{info, warn};

use crate::display::sink::{BufferConsumer, Submission, TransferBuffer};
use crate::pipeline::launch;
use crate::{CaptureConfig, GStreamerConfig};

/// `appsrc ! videoconvert ! <video sink>` fed one buffer per frame
pub struct AppSrcDisplay {
    pipeline: gst::Pipeline,
    appsrc: gst_app::AppSrc,
}

impl AppSrcDisplay {
    /// Caps (format, size, framerate) are fixed here for the whole run
    pub fn new(capture: &CaptureConfig, gst_config: &GStreamerConfig) -> Result<Self> {
        gst::init().map_err(|e| eyre!("Failed to initialize GStreamer: {}", e))?;

        let mut gst_config = gst_config.clone();
        if gst_config.video_sink == "auto" {
            gst_config.video_sink = Self::detect_video_sink().to_string();
        }

        let pipeline_str = launch::appsrc_display(capture, &gst_config);
        info!("Pipeline: {}", pipeline_str);

        let pipeline = gst::parse::launch(&pipeline_str)
            .map_err(|e| eyre!("not all elements could be created: {}", e))?
            .downcast::<gst::Pipeline>()
            .map_err(|_| eyre!("Failed to create pipeline"))?;

        let appsrc = pipeline
            .by_name(launch::APPSRC_NAME)
            .ok_or_else(|| eyre!("Failed to find appsrc"))?
            .downcast::<gst_app::AppSrc>()
            .map_err(|_| eyre!("Failed to cast to AppSrc"))?;

        appsrc.set_format(gst::Format::Time);
        appsrc.set_is_live(gst_config.is_live);
        appsrc.set_do_timestamp(true);

        Ok(Self { pipeline, appsrc })
    }

    fn detect_video_sink() -> &'static str {
        let sinks = [
            "glimagesink",
            "waylandsink",
            "xvimagesink",
            "ximagesink",
            "autovideosink",
        ];

        for sink in &sinks {
            if gst::ElementFactory::find(sink).is_some() {
                return sink;
            }
        }

        warn!("Using auto video sink");
        "autovideosink"
    }

    pub fn start(&mut self) -> Result<()> {
        info!("Starting appsrc display pipeline");
        self.pipeline
            .set_state(gst::State::Playing)
            .map_err(|e| eyre!("Failed to start pipeline: {:?}", e))?;
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        info!("Stopping appsrc display pipeline");
        let _ = self.appsrc.end_of_stream();
        self.pipeline
            .set_state(gst::State::Null)
            .map_err(|e| eyre!("Failed to stop pipeline: {:?}", e))?;
        Ok(())
    }
}

impl BufferConsumer for AppSrcDisplay {
    fn submit(&mut self, buffer: TransferBuffer) -> Submission {
        // gst takes ownership; the transfer buffer is released when gst unrefs it
        let buffer = gst::Buffer::from_mut_slice(buffer);

        match self.appsrc.push_buffer(buffer) {
            Ok(_) => Submission::Accepted,
            Err(flow) => {
                warn!("error pushing buffer: {:?}", flow);
                Submission::Rejected(format!("{:?}", flow))
            }
        }
    }
}

impl Drop for AppSrcDisplay {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
