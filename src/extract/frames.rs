//! Decode a video file and write every frame out as a JPEG

use std::path::Path;
use std::time::Duration;

use color_eyre::{eyre::eyre, Result};
use gstreamer as gst;
use gstreamer::prelude::*;
use tracing::{debug, error, info};

use crate::error::StopReason;
use crate::extract::bus::{self, BusDispatcher, BusEvent, PlaybackControl};
use crate::ExtractConfig;

/// `filesrc ! decodebin ! videorate ! videoconvert ! jpegenc ! multifilesink`
pub struct FrameExtractor {
    pipeline: gst::Pipeline,
    tick: Duration,
}

impl FrameExtractor {
    pub fn new(location: &Path, config: &ExtractConfig) -> Result<Self> {
        gst::init().map_err(|e| eyre!("Failed to initialize GStreamer: {}", e))?;

        if !location.is_file() {
            return Err(eyre!("cannot open {}", location.display()));
        }
        let location = location
            .to_str()
            .ok_or_else(|| eyre!("location is not valid UTF-8: {}", location.display()))?;

        let pipeline = gst::Pipeline::with_name("frame_extract");
        let source = make("filesrc", "file-source")?;
        let decoder = make("decodebin", "decoder-bin")?;
        let vidrate = make("videorate", "videorater")?;
        let conv = make("videoconvert", "videoconverter")?;
        let encoder = make("jpegenc", "jpeg-encoder")?;
        let sink = make("multifilesink", "frame-sink")?;

        source.set_property("location", location);
        encoder.set_property("quality", config.jpeg_quality);
        sink.set_property("location", config.output_pattern.as_str());
        sink.set_property("sync", config.sync);

        pipeline.add_many([&source, &decoder, &vidrate, &conv, &encoder, &sink])?;

        source
            .link(&decoder)
            .map_err(|e| eyre!("could not link file source to decoder: {}", e))?;
        gst::Element::link_many([&vidrate, &conv, &encoder, &sink])
            .map_err(|e| eyre!("could not link elements: {}", e))?;

        // decodebin exposes its pads only once it has typefound the stream
        let vidrate_weak = vidrate.downgrade();
        decoder.connect_pad_added(move |_, src_pad| {
            let Some(vidrate) = vidrate_weak.upgrade() else {
                return;
            };

            let is_video = src_pad
                .current_caps()
                .and_then(|caps| caps.structure(0).map(|s| s.name().starts_with("video/")))
                .unwrap_or(false);
            if !is_video {
                debug!("Ignoring non-video pad {}", src_pad.name());
                return;
            }

            let Some(sink_pad) = vidrate.static_pad("sink") else {
                return;
            };
            if sink_pad.is_linked() {
                return;
            }

            info!("Dynamic pad created, linking this with decoder");
            if let Err(e) = src_pad.link(&sink_pad) {
                error!("Failed to link decoder pad: {:?}", e);
            }
        });

        info!(
            "Extracting {} to {} (quality {})",
            location, config.output_pattern, config.jpeg_quality
        );

        Ok(Self {
            pipeline,
            tick: Duration::from_millis(config.tick_ms),
        })
    }

    /// Play to end of stream or error, then tear the pipeline down
    pub fn run(&self) -> Result<StopReason> {
        let pipeline_bus = self
            .pipeline
            .bus()
            .ok_or_else(|| eyre!("Pipeline has no bus"))?;

        let (tx, rx) = bus::channel();
        pipeline_bus.set_sync_handler(move |_, msg| {
            if let Some(event) = bus_event(msg) {
                let _ = tx.send(event);
            }
            gst::BusSyncReply::Drop
        });

        info!("Now playing");
        self.pipeline
            .set_state(gst::State::Playing)
            .map_err(|e| eyre!("Failed to start pipeline: {:?}", e))?;

        let reason = BusDispatcher::new(rx, self).run(self.tick);

        pipeline_bus.unset_sync_handler();
        self.pipeline
            .set_state(gst::State::Null)
            .map_err(|e| eyre!("Failed to stop pipeline: {:?}", e))?;
        info!("Pipeline stopped: {}", reason);

        Ok(reason)
    }
}

impl PlaybackControl for FrameExtractor {
    fn pause(&self) -> Result<()> {
        self.pipeline
            .set_state(gst::State::Paused)
            .map_err(|e| eyre!("Failed to pause pipeline: {:?}", e))?;
        Ok(())
    }

    fn resume(&self) -> Result<()> {
        self.pipeline
            .set_state(gst::State::Playing)
            .map_err(|e| eyre!("Failed to resume pipeline: {:?}", e))?;
        Ok(())
    }
}

impl Drop for FrameExtractor {
    fn drop(&mut self) {
        let _ = self.pipeline.set_state(gst::State::Null);
    }
}

fn make(factory: &str, name: &str) -> Result<gst::Element> {
    gst::ElementFactory::make(factory)
        .name(name)
        .build()
        .map_err(|e| eyre!("could not create element {}: {}", factory, e))
}

fn bus_event(msg: &gst::Message) -> Option<BusEvent> {
    use gst::MessageView;

    match msg.view() {
        MessageView::Eos(..) => Some(BusEvent::EndOfStream),
        MessageView::Error(err) => Some(BusEvent::Error {
            source: err.src().map(|s| s.path_string().to_string()),
            message: err.error().to_string(),
            debug: err.debug().map(|d| d.to_string()),
        }),
        MessageView::Warning(warning) => Some(BusEvent::Warning {
            source: warning.src().map(|s| s.path_string().to_string()),
            message: warning.error().to_string(),
        }),
        MessageView::Buffering(buffering) => Some(BusEvent::Buffering(buffering.percent())),
        _ => None,
    }
}
