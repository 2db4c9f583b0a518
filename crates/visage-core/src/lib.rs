//! Visage Core - Real-time digital human engine

pub mod avatar;
pub mod backend;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod types;
pub mod wav;

pub use avatar::*;
pub use types::*;
