//! GStreamer appsink capture producing densely packed frames

use std::time::Instant;

use bytes::BytesMut;
use color_eyre::{eyre::eyre, Result};
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use gstreamer_video as gst_video;
use tracing::{debug, info, instrument};

use crate::capture::frame::{Frame, FrameGeometry, PixelFormat};
use crate::capture::source::{CaptureError, CaptureSource};
use crate::pipeline::launch;
use crate::{CaptureConfig, GStreamerConfig};

/// Camera pipeline ending in an appsink we pull from synchronously
pub struct GstCapture {
    pipeline: gst::Pipeline,
    appsink: gst_app::AppSink,
    format: PixelFormat,
    sequence: u64,
}

impl GstCapture {
    /// Create a capture pipeline for the configured device and geometry
    pub fn new(config: &CaptureConfig, gst_config: &GStreamerConfig) -> Result<Self> {
        gst::init().map_err(|e| eyre!("Failed to initialize GStreamer: {}", e))?;

        info!("Initializing GStreamer capture pipeline");

        let pipeline_str = launch::camera_capture(config, gst_config);
        info!("Pipeline: {}", pipeline_str);

        let pipeline = gst::parse::launch(&pipeline_str)?
            .downcast::<gst::Pipeline>()
            .map_err(|_| eyre!("Failed to create pipeline"))?;

        let appsink = pipeline
            .by_name(launch::APPSINK_NAME)
            .ok_or_else(|| eyre!("Failed to find appsink element"))?
            .downcast::<gst_app::AppSink>()
            .map_err(|_| eyre!("Failed to cast to AppSink"))?;

        // Pull mode; we block on pull_sample once per relay cycle
        appsink.set_property("emit-signals", false);
        appsink.set_property("max-buffers", 3u32);
        appsink.set_property("sync", false);

        Ok(Self {
            pipeline,
            appsink,
            format: config.format,
            sequence: 0,
        })
    }

    /// Start the capture pipeline
    pub fn start_stream(&mut self) -> Result<()> {
        info!("Starting GStreamer capture pipeline");

        self.pipeline
            .set_state(gst::State::Playing)
            .map_err(|e| eyre!("Failed to start pipeline: {:?}", e))?;

        let (state_change, _, _) = self.pipeline.state(Some(gst::ClockTime::from_seconds(5)));

        match state_change {
            Ok(gst::StateChangeSuccess::Success) => {
                info!("Pipeline started successfully");
                Ok(())
            }
            Ok(gst::StateChangeSuccess::Async) | Ok(gst::StateChangeSuccess::NoPreroll) => {
                info!("Pipeline starting asynchronously");
                Ok(())
            }
            Err(_) => Err(eyre!("cannot open camera")),
        }
    }

    /// Stop the capture pipeline
    pub fn stop_stream(&mut self) -> Result<()> {
        info!("Stopping GStreamer capture pipeline");

        self.pipeline
            .set_state(gst::State::Null)
            .map_err(|e| eyre!("Failed to stop pipeline: {:?}", e))?;

        Ok(())
    }

    #[instrument(skip(self))]
    fn pull_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        let timestamp = Instant::now();

        let sample = match self.appsink.pull_sample() {
            Ok(sample) => sample,
            Err(_) if self.appsink.is_eos() => {
                debug!("appsink reached end of stream");
                return Ok(None);
            }
            Err(e) => return Err(CaptureError::Read(e.to_string())),
        };

        let buffer = sample
            .buffer()
            .ok_or_else(|| CaptureError::Read("sample contains no buffer".into()))?;

        let caps = sample
            .caps()
            .ok_or_else(|| CaptureError::Read("sample has no caps".into()))?;

        let video_info = gst_video::VideoInfo::from_caps(caps)
            .map_err(|_| CaptureError::Read("failed to parse video info from caps".into()))?;

        let map = buffer
            .map_readable()
            .map_err(|_| CaptureError::Read("failed to map buffer".into()))?;

        let geometry = FrameGeometry::new(
            video_info.width(),
            video_info.height(),
            self.format.channels(),
        );

        // GStreamer pads packed RGB rows to 4 bytes; drop the padding
        let stride = video_info.stride()[0] as usize;
        let data = repack_rows(map.as_slice(), stride, geometry)?;

        self.sequence += 1;
        let mut frame = Frame::from_packed(self.sequence, geometry, self.format, data)?;
        frame.stamp(timestamp, buffer.pts().map(|pts| pts.into()));

        Ok(Some(frame))
    }
}

impl CaptureSource for GstCapture {
    fn read_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        self.pull_frame()
    }
}

impl Drop for GstCapture {
    fn drop(&mut self) {
        let _ = self.stop_stream();
    }
}

/// Copy `height` rows of `row_len` bytes out of a strided plane
fn repack_rows(
    plane: &[u8],
    stride: usize,
    geometry: FrameGeometry,
) -> Result<BytesMut, CaptureError> {
    let row_len = geometry.row_len();
    let rows = geometry.height as usize;

    if stride < row_len || plane.len() < stride * rows.saturating_sub(1) + row_len {
        return Err(CaptureError::Read(format!(
            "plane of {} bytes with stride {} cannot hold {:?}",
            plane.len(),
            stride,
            geometry
        )));
    }

    let mut data = BytesMut::with_capacity(geometry.byte_len());
    if stride == row_len {
        data.extend_from_slice(&plane[..geometry.byte_len()]);
    } else {
        for row in plane.chunks(stride).take(rows) {
            data.extend_from_slice(&row[..row_len]);
        }
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repack_strips_row_padding() {
        // 2x2 BGR, rows padded from 6 to 8 bytes
        let plane = [1, 2, 3, 4, 5, 6, 0, 0, 7, 8, 9, 10, 11, 12, 0, 0];
        let data = repack_rows(&plane, 8, FrameGeometry::new(2, 2, 3)).unwrap();
        assert_eq!(&data[..], &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
    }

    #[test]
    fn test_repack_packed_plane_is_copied_verbatim() {
        let plane: Vec<u8> = (0..24).collect();
        let data = repack_rows(&plane, 12, FrameGeometry::new(4, 2, 3)).unwrap();
        assert_eq!(&data[..], &plane[..]);
    }

    #[test]
    fn test_repack_rejects_short_plane() {
        let plane = [0u8; 10];
        assert!(repack_rows(&plane, 6, FrameGeometry::new(2, 2, 3)).is_err());
    }
}
