//! Capture, annotate, deliver: one frame per cycle

use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use crate::capture::CaptureSource;
use crate::display::FrameSink;
use crate::error::StopReason;
use crate::pipeline::overlay::{self, OverlayStyle};
use crate::pipeline::rate::RateEstimator;

/// Result of a single relay cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop(StopReason),
}

/// Moves frames from a capture source to a sink, stamping the current rate
#[derive(Debug, Default)]
pub struct FrameRelay {
    estimator: RateEstimator,
    style: OverlayStyle,
    relayed: u64,
}

impl FrameRelay {
    pub fn new(style: OverlayStyle) -> Self {
        Self::with_estimator(RateEstimator::new(), style)
    }

    pub fn with_estimator(estimator: RateEstimator, style: OverlayStyle) -> Self {
        Self {
            estimator,
            style,
            relayed: 0,
        }
    }

    /// Frames delivered so far
    pub fn relayed(&self) -> u64 {
        self.relayed
    }

    pub fn rate(&self) -> f64 {
        self.estimator.current()
    }

    /// Read one frame, stamp it, hand it to `sink`
    pub fn relay_once<S, K>(&mut self, source: &mut S, sink: &mut K) -> Flow
    where
        S: CaptureSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        match self.cycle(source, sink) {
            Ok(()) => Flow::Continue,
            Err(reason) => Flow::Stop(reason),
        }
    }

    fn cycle<S, K>(&mut self, source: &mut S, sink: &mut K) -> Result<(), StopReason>
    where
        S: CaptureSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        let mut frame = match source.read_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => return Err(StopReason::EndOfStream),
            Err(e) => {
                warn!("Error cant read frame: {}", e);
                return Err(StopReason::CaptureFailure(e.to_string()));
            }
        };

        let rate = self.estimator.sample();
        metrics::gauge!("relay_fps").set(rate);

        overlay::draw_rate(&mut frame, rate, &self.style);

        let sequence = frame.sequence();
        let deliver_start = Instant::now();
        sink.deliver(frame)?;

        metrics::histogram!("deliver_time_us").record(deliver_start.elapsed().as_micros() as f64);
        metrics::counter!("frames_relayed").increment(1);
        self.relayed += 1;
        debug!(sequence, rate, "frame relayed");

        Ok(())
    }

    /// Relay until something stops the run, and return why
    #[instrument(skip_all)]
    pub fn run<S, K>(&mut self, source: &mut S, sink: &mut K) -> StopReason
    where
        S: CaptureSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        info!("Relay loop started");

        loop {
            if let Flow::Stop(reason) = self.relay_once(source, sink) {
                if reason.is_clean() {
                    info!(relayed = self.relayed, "Relay stopped: {}", reason);
                } else {
                    warn!(relayed = self.relayed, "Relay failed: {}", reason);
                }
                return reason;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CaptureError, Frame, FrameGeometry, PixelFormat};
    use crate::display::{BufferConsumer, BufferSink, Submission, TransferBuffer};
    use bytes::BytesMut;
    use std::collections::VecDeque;

    struct Scripted {
        script: VecDeque<Result<Option<Frame>, CaptureError>>,
        reads: usize,
    }

    impl Scripted {
        fn frames(count: u64, geometry: FrameGeometry) -> Self {
            let script = (1..=count)
                .map(|seq| {
                    Ok(Some(
                        Frame::from_packed(
                            seq,
                            geometry,
                            PixelFormat::Bgr24,
                            BytesMut::zeroed(geometry.byte_len()),
                        )
                        .unwrap(),
                    ))
                })
                .collect();
            Self { script, reads: 0 }
        }
    }

    impl CaptureSource for Scripted {
        fn read_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
            self.reads += 1;
            self.script.pop_front().unwrap_or(Ok(None))
        }
    }

    #[derive(Default)]
    struct Sequences(Vec<u64>);

    impl FrameSink for Sequences {
        fn deliver(&mut self, frame: Frame) -> Result<(), StopReason> {
            self.0.push(frame.sequence());
            Ok(())
        }
    }

    #[test]
    fn test_end_of_stream_stops_cleanly() {
        let geometry = FrameGeometry::new(8, 8, 3);
        let mut source = Scripted::frames(0, geometry);
        let mut sink = Sequences::default();
        let mut relay = FrameRelay::default();

        assert_eq!(
            relay.relay_once(&mut source, &mut sink),
            Flow::Stop(StopReason::EndOfStream)
        );
        assert!(sink.0.is_empty());
    }

    #[test]
    fn test_overlay_applied_before_delivery() {
        let geometry = FrameGeometry::new(320, 240, 3);
        let mut source = Scripted::frames(1, geometry);

        struct Painted(bool);
        impl FrameSink for Painted {
            fn deliver(&mut self, frame: Frame) -> Result<(), StopReason> {
                self.0 = frame.data().iter().any(|&b| b != 0);
                Ok(())
            }
        }

        let mut sink = Painted(false);
        let mut relay = FrameRelay::default();
        assert_eq!(relay.relay_once(&mut source, &mut sink), Flow::Continue);
        assert!(sink.0);
        assert_eq!(relay.relayed(), 1);
    }

    #[test]
    fn test_run_returns_delivery_failure() {
        struct Reject;
        impl BufferConsumer for Reject {
            fn submit(&mut self, _buffer: TransferBuffer) -> Submission {
                Submission::Rejected("not-linked".into())
            }
        }

        let geometry = FrameGeometry::new(4, 4, 3);
        let mut source = Scripted::frames(3, geometry);
        let mut sink = BufferSink::new(Reject, geometry);
        let mut relay = FrameRelay::default();

        let reason = relay.run(&mut source, &mut sink);
        assert_eq!(reason, StopReason::DeliveryFailure("not-linked".into()));
        assert_eq!(source.reads, 1);
        assert_eq!(relay.relayed(), 0);
    }

    #[test]
    fn test_boxed_collaborators() {
        let geometry = FrameGeometry::new(4, 4, 3);
        let mut source: Box<dyn CaptureSource> = Box::new(Scripted::frames(2, geometry));
        let mut sink: Box<dyn FrameSink> = Box::new(Sequences::default());
        let mut relay = FrameRelay::default();

        assert_eq!(relay.run(&mut source, &mut sink), StopReason::EndOfStream);
        assert_eq!(relay.relayed(), 2);
    }
}
