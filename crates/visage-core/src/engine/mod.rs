//! Avatar engine - command queue, render loop, playback coordination
//!
//! This module contains the coordination core of the avatar engine:
//! - EngineCommand: the command queue between caller threads and the loop
//! - RenderLoop: the dedicated thread that exclusively owns the backend
//! - AudioFeed: reslices pushed PCM chunks into fixed-size frames
//! - MotionScheduler: single pending slot, newest wins
//! - PlaybackEvent: listener callbacks, delivered off-loop by a dispatcher

mod audio_feed;
mod command;
mod events;
mod motion;
mod render_loop;
mod state;

pub use audio_feed::*;
pub use command::*;
pub use events::*;
pub use motion::*;
pub use render_loop::*;
pub use state::*;
