//! # HELION Engine Shell
//!
//! Everything around the core: an explicit [`Engine`] context owning the
//! worker pool and world stack, TOML configuration, frame statistics, a
//! channel-backed replication delegate, and headless collaborator
//! implementations for tests and dedicated servers.
//!
//! The simulation itself lives in [`helion_core`] and is re-exported here
//! for convenience.

pub mod collab;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod stats;

pub use collab::{HeadlessPresenter, RecordingAudio, RecordingSolver};
pub use config::EngineConfig;
pub use engine::{Engine, FramePresenter};
pub use error::EngineError;
pub use events::{ChannelReplicator, ReplicationEvent};
pub use stats::{FrameStats, FrameStatsAccumulator};

pub use helion_core as core;
