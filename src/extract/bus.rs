//! Pipeline bus notifications, drained once per tick by the driving loop

use std::time::Duration;

use color_eyre::Result;
use flume::{Receiver, RecvTimeoutError, Sender};
use tracing::{error, info, warn};

use crate::error::StopReason;

/// Bus messages the extraction loop acts on
#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
    EndOfStream,
    Error {
        source: Option<String>,
        message: String,
        debug: Option<String>,
    },
    Warning {
        source: Option<String>,
        message: String,
    },
    /// Fill level in percent
    Buffering(i32),
}

/// Playback state changes the bus handler may request.
///
/// Supplied explicitly by the caller so pause/resume always reach the
/// pipeline that owns the bus.
pub trait PlaybackControl {
    fn pause(&self) -> Result<()>;
    fn resume(&self) -> Result<()>;
}

/// What the loop does after one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusFlow {
    Continue,
    Stop(StopReason),
}

/// Sending half, handed to the pipeline's bus handler
pub type BusSender = Sender<BusEvent>;

/// Applies bus events in arrival order and tracks buffering state
pub struct BusDispatcher<'a, P: ?Sized> {
    events: Receiver<BusEvent>,
    playback: &'a P,
    buffering: bool,
}

impl<'a, P: PlaybackControl + ?Sized> BusDispatcher<'a, P> {
    pub fn new(events: Receiver<BusEvent>, playback: &'a P) -> Self {
        Self {
            events,
            playback,
            buffering: false,
        }
    }

    /// Whether the last buffering message paused playback
    pub fn is_buffering(&self) -> bool {
        self.buffering
    }

    pub fn handle(&mut self, event: BusEvent) -> BusFlow {
        match event {
            BusEvent::EndOfStream => {
                info!("End of Stream");
                BusFlow::Stop(StopReason::EndOfStream)
            }
            BusEvent::Error {
                source,
                message,
                debug: details,
            } => {
                let details = details.as_deref().unwrap_or("no debug info");
                error!(
                    "Error from {}: {} ({})",
                    source.as_deref().unwrap_or("pipeline"),
                    message,
                    details
                );
                BusFlow::Stop(StopReason::Upstream(message))
            }
            BusEvent::Warning { source, message } => {
                warn!(
                    "Warning from {}: {}",
                    source.as_deref().unwrap_or("pipeline"),
                    message
                );
                BusFlow::Continue
            }
            BusEvent::Buffering(percent) => {
                info!("Buffering ({:3}%)", percent);
                let result = if percent < 100 {
                    self.buffering = true;
                    self.playback.pause()
                } else {
                    self.buffering = false;
                    self.playback.resume()
                };

                match result {
                    Ok(()) => BusFlow::Continue,
                    Err(e) => BusFlow::Stop(StopReason::Upstream(format!(
                        "failed to change playback state while buffering: {}",
                        e
                    ))),
                }
            }
        }
    }

    /// Wait up to `tick` for the next event and apply it
    pub fn tick(&mut self, tick: Duration) -> BusFlow {
        match self.events.recv_timeout(tick) {
            Ok(event) => self.handle(event),
            Err(RecvTimeoutError::Timeout) => BusFlow::Continue,
            Err(RecvTimeoutError::Disconnected) => {
                BusFlow::Stop(StopReason::Upstream("bus closed".into()))
            }
        }
    }

    /// Drive ticks until an event stops the run
    pub fn run(&mut self, tick: Duration) -> StopReason {
        loop {
            if let BusFlow::Stop(reason) = self.tick(tick) {
                return reason;
            }
        }
    }
}

/// Unbounded so a streaming thread never blocks on the bus handler
pub fn channel() -> (BusSender, Receiver<BusEvent>) {
    flume::unbounded()
}
