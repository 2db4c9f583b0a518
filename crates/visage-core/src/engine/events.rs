//! Playback events and the dispatcher thread
//!
//! The render loop generates events; a dedicated dispatcher thread delivers
//! them to the single registered listener so a slow or misbehaving callback
//! can never stall rendering. Delivery is in generation order, at most once
//! per event. The channel is bounded: events that would pile up behind a
//! stalled listener are dropped with a warning instead of blocking the
//! render loop.

use std::thread;

use crossbeam::channel::{bounded, Sender, TrySendError};

use crate::error::EngineResult;
use crate::types::ModelInfo;

/// Error code carried by init-failed events raised before the backend ran
/// (missing model directory or marker). Backend failures carry their own
/// nonzero codes.
pub const CONFIG_ERROR_CODE: i32 = -1;

/// Events delivered to the avatar listener
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    /// Initialization succeeded; the engine is Ready
    InitSucceeded(ModelInfo),
    /// Initialization failed; the engine is Failed until re-init
    InitFailed {
        code: i32,
        subcode: i32,
        message: String,
    },
    /// The first audio frame of a stream reached the backend
    AudioPlayStarted,
    /// The backend finished rendering a stream
    AudioPlayEnded,
    /// The backend refused part of an audio stream
    AudioPlayFailed { code: i32, message: String },
    /// A motion clip started
    MotionStarted { name: String },
    /// A motion clip ran to completion (preempted clips never complete)
    MotionCompleted { name: String },
}

/// Callback surface implemented by the embedding application.
///
/// Invoked on the dispatcher thread, one event at a time. Implementations
/// should hand heavy work off elsewhere; the channel behind them is bounded.
pub trait AvatarListener: Send {
    fn on_event(&mut self, event: PlaybackEvent);
}

impl<F> AvatarListener for F
where
    F: FnMut(PlaybackEvent) + Send,
{
    fn on_event(&mut self, event: PlaybackEvent) {
        self(event)
    }
}

/// Sending half of the event channel, used by the render loop and by the
/// facade for pre-init configuration failures
#[derive(Clone)]
pub struct EventSender {
    tx: Sender<PlaybackEvent>,
}

impl EventSender {
    /// Enqueue an event for the dispatcher. Never blocks; a full channel
    /// drops the event.
    pub fn emit(&self, event: PlaybackEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                log::warn!("event dropped, listener too slow: {:?}", event);
            }
            // Dispatcher already gone during teardown; nothing to deliver to
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

/// Spawn the dispatcher thread.
///
/// The thread delivers events until every `EventSender` clone is dropped,
/// drains what is left in the channel, and exits.
pub fn spawn_dispatcher(
    capacity: usize,
    mut listener: Box<dyn AvatarListener>,
) -> EngineResult<(EventSender, thread::JoinHandle<()>)> {
    let (tx, rx) = bounded(capacity);

    let handle = thread::Builder::new()
        .name("avatar-events".into())
        .spawn(move || {
            log::info!("event dispatcher started");
            while let Ok(event) = rx.recv() {
                log::trace!("dispatch: {:?}", event);
                listener.on_event(event);
            }
            log::info!("event dispatcher stopped");
        })?;

    Ok((EventSender { tx }, handle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_events_delivered_in_order() {
        let (seen_tx, seen_rx) = crossbeam::channel::unbounded();
        let listener = Box::new(move |event: PlaybackEvent| {
            seen_tx.send(event).unwrap();
        });
        let (events, handle) = spawn_dispatcher(16, listener).unwrap();

        events.emit(PlaybackEvent::AudioPlayStarted);
        events.emit(PlaybackEvent::MotionStarted {
            name: "wave".into(),
        });
        events.emit(PlaybackEvent::AudioPlayEnded);
        drop(events);
        handle.join().unwrap();

        let seen: Vec<_> = seen_rx.try_iter().collect();
        assert_eq!(
            seen,
            vec![
                PlaybackEvent::AudioPlayStarted,
                PlaybackEvent::MotionStarted {
                    name: "wave".into()
                },
                PlaybackEvent::AudioPlayEnded,
            ]
        );
    }

    #[test]
    fn test_full_channel_drops_instead_of_blocking() {
        // No dispatcher draining this channel; emit must not block
        let (tx, rx) = bounded(2);
        let events = EventSender { tx };

        events.emit(PlaybackEvent::AudioPlayStarted);
        events.emit(PlaybackEvent::AudioPlayEnded);
        events.emit(PlaybackEvent::AudioPlayStarted); // dropped

        assert_eq!(rx.try_iter().count(), 2);
    }

    #[test]
    fn test_dispatcher_drains_backlog_before_exit() {
        let (seen_tx, seen_rx) = crossbeam::channel::unbounded();
        let listener = Box::new(move |event: PlaybackEvent| {
            std::thread::sleep(Duration::from_millis(1));
            seen_tx.send(event).unwrap();
        });
        let (events, handle) = spawn_dispatcher(64, listener).unwrap();

        for _ in 0..20 {
            events.emit(PlaybackEvent::AudioPlayStarted);
        }
        drop(events);
        handle.join().unwrap();

        assert_eq!(seen_rx.try_iter().count(), 20);
    }

    #[test]
    fn test_emit_after_dispatcher_gone_is_silent() {
        let (tx, rx) = bounded(4);
        let events = EventSender { tx };
        drop(rx);

        // Must not panic or block
        events.emit(PlaybackEvent::AudioPlayEnded);
    }
}
