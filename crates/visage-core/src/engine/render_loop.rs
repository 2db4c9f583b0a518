//! The render loop: one dedicated thread that owns the backend
//!
//! Every backend call in the process happens on this thread. Caller threads
//! submit `EngineCommand`s; the loop drains them between fixed-cadence
//! steps and drives the backend one frame per step. The cadence is the
//! frame period derived from the engine config (640 samples @ 16kHz =
//! 40ms = 25 fps by default).
//!
//! Each step, in order: drain commands, apply at most one lifecycle
//! transition, feed the next audio frame and resolved motion to the
//! backend, step the backend and forward its completion signals to the
//! event dispatcher, then apply the last queued volume change.
//!
//! The loop never blocks on I/O. It parks on the command channel with a
//! deadline of the next tick, so an idle engine costs a handful of wakeups
//! per second and a busy one never misses its cadence.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crossbeam::channel::{Receiver, Sender};

use crate::backend::{BackendError, RenderBackend};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::types::ModelInfo;

use super::audio_feed::AudioFeed;
use super::command::{command_channel, EngineCommand};
use super::events::{spawn_dispatcher, AvatarListener, EventSender, PlaybackEvent};
use super::motion::MotionScheduler;
use super::state::{EngineAtomics, EngineState};

/// Handle for submitting commands and reading engine state.
///
/// Submission never blocks; state reads go through relaxed atomics. The
/// handle is shared by reference across caller threads; the owning
/// [`Engine`] takes it back on shutdown, which is what lets the loop and
/// dispatcher threads wind down.
pub struct EngineHandle {
    command_tx: Sender<EngineCommand>,
    atomics: Arc<EngineAtomics>,
    events: EventSender,
}

impl EngineHandle {
    /// Submit a command to the render loop
    pub fn submit(&self, command: EngineCommand) -> EngineResult<()> {
        self.command_tx
            .send(command)
            .map_err(|_| EngineError::Closed)
    }

    /// Whether the engine currently accepts playback commands
    pub fn is_ready(&self) -> bool {
        self.atomics.is_ready()
    }

    /// Current lifecycle state
    pub fn state(&self) -> EngineState {
        self.atomics.state()
    }

    /// Last accepted output volume
    pub fn volume(&self) -> f32 {
        self.atomics.volume()
    }

    /// Whether an audio stream is currently playing
    pub fn is_speaking(&self) -> bool {
        self.atomics.is_speaking()
    }

    /// Frames rendered since the last successful init
    pub fn frames_rendered(&self) -> u64 {
        self.atomics.frames_rendered()
    }

    /// Emit an event on behalf of the engine. Used by the facade for
    /// failures detected before any command is worth submitting.
    pub(crate) fn emit(&self, event: PlaybackEvent) {
        self.events.emit(event);
    }
}

/// A running engine: the render loop and event dispatcher threads.
///
/// `shutdown` (or drop) releases the backend and joins both threads.
pub struct Engine {
    handle: Option<EngineHandle>,
    render_thread: Option<thread::JoinHandle<()>>,
    dispatch_thread: Option<thread::JoinHandle<()>>,
}

impl Engine {
    /// The submission handle, until shutdown
    pub fn handle(&self) -> Option<&EngineHandle> {
        self.handle.as_ref()
    }

    /// Stop the render loop, release the backend, and join both threads.
    /// Pending audio is discarded. Idempotent.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.submit(EngineCommand::Shutdown);
            // Dropping the handle closes the command and event channels;
            // the dispatcher drains and exits once the loop is gone.
            drop(handle);
        }
        if let Some(thread) = self.render_thread.take() {
            if thread.join().is_err() {
                log::error!("render loop panicked");
            }
        }
        if let Some(thread) = self.dispatch_thread.take() {
            if thread.join().is_err() {
                log::error!("event dispatcher panicked");
            }
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Start the render loop and event dispatcher for one avatar engine
pub fn start_engine(
    config: EngineConfig,
    backend: Box<dyn RenderBackend>,
    listener: Box<dyn AvatarListener>,
) -> EngineResult<Engine> {
    let config = config.sanitized();
    let (command_tx, command_rx) = command_channel();
    let (events, dispatch_thread) = spawn_dispatcher(config.event_capacity, listener)?;
    let atomics = Arc::new(EngineAtomics::new());

    let render_loop = RenderLoop {
        config,
        backend,
        command_rx,
        events: events.clone(),
        atomics: Arc::clone(&atomics),
        state: EngineState::Uninitialized,
        model: None,
        feed: AudioFeed::new(config.frame_bytes()),
        motions: MotionScheduler::new(),
        pending_inits: VecDeque::new(),
        pending_volume: None,
        last_tick: Instant::now(),
    };

    let render_thread = thread::Builder::new()
        .name("render-loop".into())
        .spawn(move || render_loop.run())?;

    Ok(Engine {
        handle: Some(EngineHandle {
            command_tx,
            atomics,
            events,
        }),
        render_thread: Some(render_thread),
        dispatch_thread: Some(dispatch_thread),
    })
}

/// Loop state, owned by the render thread
struct RenderLoop {
    config: EngineConfig,
    backend: Box<dyn RenderBackend>,
    command_rx: Receiver<EngineCommand>,
    events: EventSender,
    atomics: Arc<EngineAtomics>,
    state: EngineState,
    /// The loaded model, exclusively owned here. None outside Ready.
    model: Option<ModelInfo>,
    feed: AudioFeed,
    motions: MotionScheduler,
    /// Init requests run one per step, in arrival order
    pending_inits: VecDeque<PathBuf>,
    /// Last queued volume change, applied at the end of the step
    pending_volume: Option<f32>,
    last_tick: Instant,
}

impl RenderLoop {
    fn run(mut self) {
        log::info!(
            "render loop started ({} samples/frame, {:?} period)",
            self.config.samples_per_frame,
            self.config.frame_period()
        );

        loop {
            let period = self.config.frame_period();
            let remaining = period.saturating_sub(self.last_tick.elapsed());

            crossbeam::select! {
                recv(self.command_rx) -> result => {
                    match result {
                        Ok(cmd) => {
                            if self.apply_command(cmd) {
                                break;
                            }
                        }
                        // Every handle dropped: implicit shutdown
                        Err(_) => break,
                    }
                }
                default(remaining) => {}
            }

            if self.drain_commands() {
                break;
            }

            if self.last_tick.elapsed() >= period {
                self.last_tick = Instant::now();
                self.step();
            }
        }

        self.teardown();
        log::info!("render loop stopped");
    }

    /// Drain everything queued since the last drain. Returns true when
    /// shutdown was observed; nothing after it is drained.
    fn drain_commands(&mut self) -> bool {
        while let Ok(cmd) = self.command_rx.try_recv() {
            if self.apply_command(cmd) {
                return true;
            }
        }
        false
    }

    /// Apply one command. Returns true for shutdown.
    fn apply_command(&mut self, cmd: EngineCommand) -> bool {
        match cmd {
            EngineCommand::Shutdown => return true,
            EngineCommand::Init { model_dir } => self.pending_inits.push_back(model_dir),
            cmd if !self.state.accepts_playback() => {
                log::debug!(
                    "{} dropped in {} state",
                    cmd.name(),
                    self.state.name()
                );
            }
            EngineCommand::StartPush => self.feed.start_window(),
            EngineCommand::PushAudio { pcm } => {
                self.feed.push(pcm);
            }
            EngineCommand::StopPush => self.feed.close_window(),
            EngineCommand::StopAudio => {
                self.feed.cancel();
            }
            EngineCommand::Motion(request) => self.motions.request(*request),
            EngineCommand::SetVolume { volume } => {
                if (0.0..=1.0).contains(&volume) {
                    self.pending_volume = Some(volume);
                } else {
                    log::warn!("volume {} out of range, ignored", volume);
                }
            }
        }
        false
    }

    /// One fixed-cadence step
    fn step(&mut self) {
        // At most one lifecycle transition per step; an init consumes the
        // whole step (model loading dwarfs a frame period)
        if let Some(model_dir) = self.pending_inits.pop_front() {
            self.perform_init(model_dir);
            return;
        }

        if self.state != EngineState::Ready {
            return;
        }

        self.feed_audio();
        self.feed_motion();

        match self.backend.step() {
            Ok(signals) => {
                if signals.rendered {
                    self.atomics.record_frame();
                }
                if signals.audio_finished && self.feed.on_playback_complete() {
                    self.atomics.set_speaking(false);
                    self.events.emit(PlaybackEvent::AudioPlayEnded);
                }
                if let Some(name) = signals.motion_finished {
                    if self.motions.on_completed(&name) {
                        self.events.emit(PlaybackEvent::MotionCompleted { name });
                    }
                }
            }
            Err(e) => {
                self.on_fatal(e);
                return;
            }
        }

        if let Some(volume) = self.pending_volume.take() {
            self.backend.set_volume(volume);
            self.atomics.set_volume(volume);
            log::debug!("volume set to {:.2}", volume);
        }
    }

    /// Hand the next due audio frame to the backend
    fn feed_audio(&mut self) {
        let Some(frame) = self.feed.next_frame() else {
            return;
        };
        match self.backend.submit_audio_frame(&frame.pcm) {
            Ok(()) => {
                if frame.first {
                    self.atomics.set_speaking(true);
                    self.events.emit(PlaybackEvent::AudioPlayStarted);
                }
            }
            Err(e) => {
                log::warn!("backend refused audio frame: {}", e);
                self.events.emit(PlaybackEvent::AudioPlayFailed {
                    code: e.code,
                    message: e.message,
                });
                if frame.first {
                    // Nothing reached the backend; the stream just dissolves
                    self.feed.reset();
                } else {
                    // Drop the rest; play-ended follows the backend's signal
                    self.feed.cancel();
                }
            }
        }
    }

    /// Submit the resolved motion, if the scheduler releases one
    fn feed_motion(&mut self) {
        let table = self
            .model
            .as_ref()
            .map(|m| m.motions.as_slice())
            .unwrap_or(&[]);
        let Some(name) = self.motions.resolve(table) else {
            return;
        };
        match self.backend.submit_motion(&name) {
            Ok(true) => {
                self.motions.on_started(name.clone());
                self.events.emit(PlaybackEvent::MotionStarted { name });
            }
            // Unknown names are dropped without an event
            Ok(false) => log::debug!("motion '{}' unknown to backend, ignored", name),
            Err(e) => log::warn!("motion '{}' refused by backend: {}", name, e),
        }
    }

    /// Tear down any loaded model, then run backend init
    fn perform_init(&mut self, model_dir: PathBuf) {
        if !self.state.accepts_init() {
            log::warn!("init ignored in {} state", self.state.name());
            return;
        }
        if self.state == EngineState::Ready {
            self.release_model();
        }
        self.transition(EngineState::Initializing);

        match self.backend.init(&model_dir) {
            Ok(info) => {
                log::info!("model '{}' initialized", info.name);
                self.atomics.reset_frames();
                self.model = Some(info.clone());
                // A fresh backend session starts at its own default volume
                self.backend.set_volume(self.atomics.volume());
                self.transition(EngineState::Ready);
                self.events.emit(PlaybackEvent::InitSucceeded(info));
            }
            Err(e) => {
                log::error!("backend init failed: {}", e);
                self.model = None;
                self.transition(EngineState::Failed);
                self.events.emit(PlaybackEvent::InitFailed {
                    code: e.code,
                    subcode: e.subcode,
                    message: e.message,
                });
            }
        }
    }

    /// Release the current model and everything queued against it
    fn release_model(&mut self) {
        self.feed.reset();
        self.motions.reset();
        self.pending_volume = None;
        self.atomics.set_speaking(false);
        self.backend.shutdown();
        self.model = None;
    }

    /// A step error is unrecoverable until re-init
    fn on_fatal(&mut self, e: BackendError) {
        log::error!("backend fatal error: {}", e);
        let event = if self.feed.in_session() {
            PlaybackEvent::AudioPlayFailed {
                code: e.code,
                message: e.message,
            }
        } else {
            PlaybackEvent::InitFailed {
                code: e.code,
                subcode: e.subcode,
                message: e.message,
            }
        };
        self.release_model();
        self.transition(EngineState::Failed);
        self.events.emit(event);
    }

    fn teardown(&mut self) {
        self.transition(EngineState::ShuttingDown);
        self.release_model();
    }

    fn transition(&mut self, to: EngineState) {
        if self.state != to {
            log::info!("engine state {} -> {}", self.state.name(), to.name());
            self.state = to;
            self.atomics.set_state(to);
        }
    }
}
