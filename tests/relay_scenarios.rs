use std::cell::Cell;
use std::rc::Rc;

use bytes::BytesMut;
use framerelay::capture::{CaptureError, CaptureSource, Frame, FrameGeometry, PixelFormat};
use framerelay::display::{BufferConsumer, BufferSink, FrameSink, Submission, TransferBuffer};
use framerelay::pipeline::{Flow, FrameRelay, OverlayStyle};
use framerelay::{ErrorCategory, StopReason};

const VGA: FrameGeometry = FrameGeometry::new(640, 480, 3);

fn frame(sequence: u64, geometry: FrameGeometry) -> Frame {
    let mut data = BytesMut::zeroed(geometry.byte_len());
    // tag the bottom-right pixel, far from the label
    let last = data.len() - 1;
    data[last] = sequence as u8;
    Frame::from_packed(sequence, geometry, PixelFormat::Bgr24, data).unwrap()
}

/// Yields `frames` frames, then fails or ends
struct Camera {
    geometry: FrameGeometry,
    frames: u64,
    fail_after: bool,
    reads: Rc<Cell<usize>>,
}

impl Camera {
    fn new(geometry: FrameGeometry, frames: u64) -> Self {
        Self {
            geometry,
            frames,
            fail_after: false,
            reads: Rc::new(Cell::new(0)),
        }
    }

    fn failing_after(geometry: FrameGeometry, frames: u64) -> Self {
        Self {
            fail_after: true,
            ..Self::new(geometry, frames)
        }
    }
}

impl CaptureSource for Camera {
    fn read_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        let read = self.reads.get() + 1;
        self.reads.set(read);

        if read as u64 <= self.frames {
            Ok(Some(frame(read as u64, self.geometry)))
        } else if self.fail_after {
            Err(CaptureError::Read("device disconnected".into()))
        } else {
            Ok(None)
        }
    }
}

#[derive(Default)]
struct Recording {
    delivered: Vec<Frame>,
}

impl FrameSink for Recording {
    fn deliver(&mut self, frame: Frame) -> Result<(), StopReason> {
        self.delivered.push(frame);
        Ok(())
    }
}

/// Accepts everything except the submissions listed in `reject`
#[derive(Default)]
struct Downstream {
    lengths: Vec<usize>,
    reject: Vec<usize>,
}

impl BufferConsumer for Downstream {
    fn submit(&mut self, buffer: TransferBuffer) -> Submission {
        self.lengths.push(buffer.len());
        if self.reject.contains(&self.lengths.len()) {
            Submission::Rejected("flow error".into())
        } else {
            Submission::Accepted
        }
    }
}

#[test]
fn frames_are_delivered_in_capture_order() {
    let geometry = FrameGeometry::new(64, 64, 3);
    let mut source = Camera::new(geometry, 3);
    let mut sink = Recording::default();
    let mut relay = FrameRelay::new(OverlayStyle::default());

    assert_eq!(relay.run(&mut source, &mut sink), StopReason::EndOfStream);

    let order: Vec<u64> = sink.delivered.iter().map(|f| f.sequence()).collect();
    assert_eq!(order, vec![1, 2, 3]);

    let tags: Vec<u8> = sink
        .delivered
        .iter()
        .map(|f| f.data()[f.data().len() - 1])
        .collect();
    assert_eq!(tags, vec![1, 2, 3]);
}

#[test]
fn overlay_keeps_geometry_of_every_frame() {
    let mut source = Camera::new(VGA, 4);
    let mut sink = Recording::default();
    let mut relay = FrameRelay::new(OverlayStyle::default());

    relay.run(&mut source, &mut sink);

    assert_eq!(sink.delivered.len(), 4);
    for frame in &sink.delivered {
        assert_eq!(frame.geometry(), VGA);
        assert_eq!(frame.data().len(), VGA.byte_len());
        assert!(frame.data().iter().any(|&b| b == 255), "label missing");
    }
}

#[test]
fn read_error_on_third_read_stops_after_two_deliveries() {
    let mut source = Camera::failing_after(VGA, 2);
    let reads = Rc::clone(&source.reads);
    let mut sink = Recording::default();
    let mut relay = FrameRelay::new(OverlayStyle::default());

    let reason = relay.run(&mut source, &mut sink);

    assert_eq!(reason.category(), ErrorCategory::CaptureUnavailable);
    assert!(!reason.is_clean());
    assert_eq!(sink.delivered.len(), 2);
    assert_eq!(relay.relayed(), 2);
    assert_eq!(reads.get(), 3);
}

#[test]
fn single_rejection_stops_without_retry_and_releases_buffer() {
    let mut source = Camera::new(VGA, 10);
    let reads = Rc::clone(&source.reads);
    let consumer = Downstream {
        reject: vec![2],
        ..Downstream::default()
    };
    let mut sink = BufferSink::new(consumer, VGA);
    let stats = sink.stats();
    let mut relay = FrameRelay::new(OverlayStyle::default());

    assert_eq!(relay.relay_once(&mut source, &mut sink), Flow::Continue);
    match relay.relay_once(&mut source, &mut sink) {
        Flow::Stop(reason) => assert_eq!(reason.category(), ErrorCategory::DeliveryRejected),
        Flow::Continue => panic!("rejected submission must stop the relay"),
    }

    assert_eq!(sink.consumer().lengths.len(), 2);
    assert_eq!(reads.get(), 2);
    assert_eq!(stats.allocated(), 2);
    assert_eq!(stats.released(), 2);
    assert_eq!(stats.rejected(), 1);
    assert_eq!(stats.outstanding(), 0);
}

#[test]
fn five_vga_frames_into_buffer_sink() {
    let mut source = Camera::new(VGA, 5);
    let reads = Rc::clone(&source.reads);
    let mut sink = BufferSink::new(Downstream::default(), VGA);
    let stats = sink.stats();
    let mut relay = FrameRelay::new(OverlayStyle::default());

    for _ in 0..5 {
        assert_eq!(relay.relay_once(&mut source, &mut sink), Flow::Continue);
    }
    assert_eq!(
        relay.relay_once(&mut source, &mut sink),
        Flow::Stop(StopReason::EndOfStream)
    );

    assert_eq!(reads.get(), 6);
    assert_eq!(sink.consumer().lengths, vec![921_600; 5]);
    assert_eq!(stats.allocated(), 5);
    assert_eq!(stats.outstanding(), 0);
}
