//! Engine-level error type, wrapping the core and I/O layers.

use thiserror::Error;

use helion_core::EcsError;

/// Errors surfaced by the engine shell.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The configuration file did not parse.
    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// The configuration file could not be read.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A tick or world operation failed in the core.
    #[error(transparent)]
    Ecs(#[from] EcsError),

    /// `tick` was called with no world pushed.
    #[error("no active world")]
    NoWorld,
}
