//! Where annotated frames go: a window, or a byte-buffer consumer downstream

use std::collections::TryReserveError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::capture::{Frame, FrameGeometry};
use crate::error::StopReason;

/// Destination for one annotated frame per relay cycle.
///
/// `Ok(())` means keep going; any `Err` ends the run.
pub trait FrameSink {
    fn deliver(&mut self, frame: Frame) -> Result<(), StopReason>;
}

impl<K: FrameSink + ?Sized> FrameSink for Box<K> {
    fn deliver(&mut self, frame: Frame) -> Result<(), StopReason> {
        (**self).deliver(frame)
    }
}

/// A window that can render frames and report a cancel request
pub trait DisplaySurface {
    fn show(&mut self, frame: &Frame) -> Result<(), StopReason>;

    /// Short bounded wait for the cancel key
    fn poll_cancel_key(&mut self) -> bool;
}

/// Renders each frame and stops when the operator asks to
pub struct DisplaySink<D> {
    surface: D,
}

impl<D: DisplaySurface> DisplaySink<D> {
    pub fn new(surface: D) -> Self {
        Self { surface }
    }

    pub fn into_inner(self) -> D {
        self.surface
    }
}

impl<D: DisplaySurface> FrameSink for DisplaySink<D> {
    fn deliver(&mut self, frame: Frame) -> Result<(), StopReason> {
        self.surface.show(&frame)?;
        if self.surface.poll_cancel_key() {
            return Err(StopReason::UserRequested);
        }
        Ok(())
    }
}

/// Outcome of handing a transfer buffer downstream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Accepted,
    Rejected(String),
}

/// Accepts fixed-length packed pixel payloads, e.g. a GStreamer appsrc
pub trait BufferConsumer {
    fn submit(&mut self, buffer: TransferBuffer) -> Submission;
}

/// Allocation bookkeeping shared by a sink and its outstanding buffers
#[derive(Debug, Default)]
pub struct TransferStats {
    allocated: AtomicUsize,
    released: AtomicUsize,
    rejected: AtomicUsize,
}

impl TransferStats {
    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::Relaxed)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> usize {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Buffers allocated but not yet dropped
    pub fn outstanding(&self) -> usize {
        self.allocated().saturating_sub(self.released())
    }
}

/// Owned copy of one frame's pixels, released when dropped
#[derive(Debug)]
pub struct TransferBuffer {
    data: Vec<u8>,
    stats: Arc<TransferStats>,
}

impl TransferBuffer {
    fn allocate(len: usize, stats: &Arc<TransferStats>) -> Result<Self, TryReserveError> {
        let mut data = Vec::new();
        data.try_reserve_exact(len)?;
        stats.allocated.fetch_add(1, Ordering::Relaxed);
        Ok(Self {
            data,
            stats: Arc::clone(stats),
        })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl AsRef<[u8]> for TransferBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl AsMut<[u8]> for TransferBuffer {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl Drop for TransferBuffer {
    fn drop(&mut self) {
        self.stats.released.fetch_add(1, Ordering::Relaxed);
    }
}

/// Copies each frame into a freshly allocated buffer of exactly
/// `width * height * channels` bytes and submits it
pub struct BufferSink<C> {
    consumer: C,
    geometry: FrameGeometry,
    stats: Arc<TransferStats>,
}

impl<C: BufferConsumer> BufferSink<C> {
    /// `geometry` is the layout negotiated with the consumer; it is never renegotiated
    pub fn new(consumer: C, geometry: FrameGeometry) -> Self {
        Self {
            consumer,
            geometry,
            stats: Arc::new(TransferStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<TransferStats> {
        Arc::clone(&self.stats)
    }

    pub fn consumer(&self) -> &C {
        &self.consumer
    }
}

impl<C: BufferConsumer> FrameSink for BufferSink<C> {
    fn deliver(&mut self, frame: Frame) -> Result<(), StopReason> {
        if frame.geometry() != self.geometry {
            return Err(StopReason::DeliveryFailure(format!(
                "frame geometry {:?} does not match negotiated {:?}",
                frame.geometry(),
                self.geometry
            )));
        }

        // matching geometry means the payload is exactly byte_len() long
        let len = self.geometry.byte_len();
        let mut buffer = TransferBuffer::allocate(len, &self.stats).map_err(|e| {
            warn!("failed to allocate buffer: {}", e);
            StopReason::AllocationFailure { len }
        })?;
        buffer.data.extend_from_slice(frame.data());
        drop(frame);

        debug!(len, "submitting transfer buffer");
        match self.consumer.submit(buffer) {
            Submission::Accepted => Ok(()),
            Submission::Rejected(reason) => {
                self.stats.rejected.fetch_add(1, Ordering::Relaxed);
                Err(StopReason::DeliveryFailure(reason))
            }
        }
    }
}
