//! OpenCV VideoCapture over a GStreamer pipeline description

use bytes::BytesMut;
use color_eyre::{eyre::eyre, Result};
use opencv::{core::Mat, prelude::*, videoio};
use tracing::info;

use crate::capture::frame::{Frame, FrameGeometry, PixelFormat};
use crate::capture::source::{CaptureError, CaptureSource};
use crate::pipeline::launch;
use crate::{CaptureConfig, GStreamerConfig};

pub struct CvCapture {
    capture: videoio::VideoCapture,
    format: PixelFormat,
    mat: Mat,
    sequence: u64,
}

impl CvCapture {
    pub fn new(config: &CaptureConfig, gst_config: &GStreamerConfig) -> Result<Self> {
        let pipeline = launch::camera_capture(config, gst_config);
        info!("Opening OpenCV capture: {}", pipeline);

        let capture = videoio::VideoCapture::from_file(&pipeline, videoio::CAP_GSTREAMER)?;
        if !capture.is_opened()? {
            return Err(eyre!("cannot open camera"));
        }

        Ok(Self {
            capture,
            format: config.format,
            mat: Mat::default(),
            sequence: 0,
        })
    }
}

impl CaptureSource for CvCapture {
    fn read_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        let grabbed = self
            .capture
            .read(&mut self.mat)
            .map_err(|e| CaptureError::Read(e.to_string()))?;
        check_grab(grabbed, self.mat.empty())?;

        let geometry = FrameGeometry::new(
            self.mat.cols() as u32,
            self.mat.rows() as u32,
            self.mat.channels() as u32,
        );

        // data_bytes requires a continuous Mat; ROI views are not
        let bytes = self
            .mat
            .data_bytes()
            .map_err(|e| CaptureError::Read(e.to_string()))?;

        self.sequence += 1;
        let frame = Frame::from_packed(
            self.sequence,
            geometry,
            self.format,
            BytesMut::from(bytes),
        )?;
        Ok(Some(frame))
    }
}

/// The pipeline wraps a live camera, so a failed grab is a lost device, not end of stream
fn check_grab(grabbed: bool, empty: bool) -> Result<(), CaptureError> {
    if !grabbed {
        return Err(CaptureError::Read("cannot read frames from camera".into()));
    }
    if empty {
        return Err(CaptureError::Read("camera returned an empty frame".into()));
    }
    Ok(())
}

impl Drop for CvCapture {
    fn drop(&mut self) {
        let _ = self.capture.release();
    }
}
