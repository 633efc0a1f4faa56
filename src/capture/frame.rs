use std::time::{Duration, Instant};

use bytes::BytesMut;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Densely packed frame. The payload length always equals
/// `geometry.byte_len()`; the overlay writes into it in place.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Row-major interleaved pixels, no row padding
    data: BytesMut,

    meta: FrameMetadata,

    /// Capture timestamp for latency tracking
    timestamp: Instant,
}

/// Frame metadata
#[derive(Debug, Clone, PartialEq)]
pub struct FrameMetadata {
    pub sequence: u64,
    pub geometry: FrameGeometry,
    pub format: PixelFormat,
    pub device_timestamp: Option<Duration>, // Pipeline timestamp if available
}

/// Width, height and channel count agreed with the source for a whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameGeometry {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
}

impl FrameGeometry {
    pub const fn new(width: u32, height: u32, channels: u32) -> Self {
        Self {
            width,
            height,
            channels,
        }
    }

    pub fn row_len(&self) -> usize {
        self.width as usize * self.channels as usize
    }

    pub fn byte_len(&self) -> usize {
        self.row_len() * self.height as usize
    }
}

/// Pixel formats we support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Rgb24,
    Bgr24,
}

impl PixelFormat {
    pub const fn channels(&self) -> u32 {
        match self {
            PixelFormat::Rgb24 | PixelFormat::Bgr24 => 3,
        }
    }

    /// Format name in GStreamer caps
    pub const fn caps_name(&self) -> &'static str {
        match self {
            PixelFormat::Rgb24 => "RGB",
            PixelFormat::Bgr24 => "BGR",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame payload is {actual} bytes, {expected} expected for {geometry:?}")]
    SizeMismatch {
        geometry: FrameGeometry,
        expected: usize,
        actual: usize,
    },
    #[error("{format:?} frames carry {expected} channels, got {actual}")]
    ChannelMismatch {
        format: PixelFormat,
        expected: u32,
        actual: u32,
    },
}

impl Frame {
    /// Wrap packed pixels, rejecting payloads that do not match the geometry
    pub fn from_packed(
        sequence: u64,
        geometry: FrameGeometry,
        format: PixelFormat,
        data: BytesMut,
    ) -> Result<Self, FrameError> {
        if geometry.channels != format.channels() {
            return Err(FrameError::ChannelMismatch {
                format,
                expected: format.channels(),
                actual: geometry.channels,
            });
        }

        if data.len() != geometry.byte_len() {
            return Err(FrameError::SizeMismatch {
                geometry,
                expected: geometry.byte_len(),
                actual: data.len(),
            });
        }

        Ok(Self {
            data,
            meta: FrameMetadata {
                sequence,
                geometry,
                format,
                device_timestamp: None,
            },
            timestamp: Instant::now(),
        })
    }

    /// Record when the frame was captured and the pipeline's own timestamp
    pub fn stamp(&mut self, captured: Instant, device_timestamp: Option<Duration>) {
        self.timestamp = captured;
        self.meta.device_timestamp = device_timestamp;
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Pixels for in-place drawing; the slice cannot change the frame's length
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn meta(&self) -> &FrameMetadata {
        &self.meta
    }

    pub fn sequence(&self) -> u64 {
        self.meta.sequence
    }

    pub fn format(&self) -> PixelFormat {
        self.meta.format
    }

    pub fn geometry(&self) -> FrameGeometry {
        self.meta.geometry
    }

    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vga_byte_len() {
        assert_eq!(FrameGeometry::new(640, 480, 3).byte_len(), 921_600);
    }

    #[test]
    fn test_from_packed_checks_length() {
        let geometry = FrameGeometry::new(4, 2, 3);
        let err = Frame::from_packed(1, geometry, PixelFormat::Bgr24, BytesMut::zeroed(23)).unwrap_err();
        assert_eq!(
            err,
            FrameError::SizeMismatch {
                geometry,
                expected: 24,
                actual: 23
            }
        );

        let frame = Frame::from_packed(1, geometry, PixelFormat::Bgr24, BytesMut::zeroed(24)).unwrap();
        assert_eq!(frame.geometry(), geometry);
        assert_eq!(frame.sequence(), 1);
        assert_eq!(frame.data().len(), geometry.byte_len());
    }

    #[test]
    fn test_payload_length_is_fixed_after_construction() {
        let geometry = FrameGeometry::new(4, 4, 3);
        assert!(Frame::from_packed(1, geometry, PixelFormat::Bgr24, BytesMut::zeroed(10)).is_err());

        let mut frame =
            Frame::from_packed(1, geometry, PixelFormat::Bgr24, BytesMut::zeroed(48)).unwrap();
        frame.data_mut().fill(9);
        frame.stamp(Instant::now(), Some(Duration::from_millis(40)));

        assert_eq!(frame.data().len(), geometry.byte_len());
        assert!(frame.data().iter().all(|&b| b == 9));
        assert_eq!(frame.meta().device_timestamp, Some(Duration::from_millis(40)));
    }

    #[test]
    fn test_from_packed_checks_channels() {
        let geometry = FrameGeometry::new(4, 2, 4);
        assert!(matches!(
            Frame::from_packed(1, geometry, PixelFormat::Rgb24, BytesMut::zeroed(32)),
            Err(FrameError::ChannelMismatch { .. })
        ));
    }
}
