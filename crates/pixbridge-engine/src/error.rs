//! Error types for engine calls.

use thiserror::Error;

/// Error type for engine calls and wrapper translation.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Error raised by the buffer layer or the translation registry.
    #[error(transparent)]
    Core(#[from] pixbridge_core::Error),

    /// Failure reported by the external engine while running a command.
    #[error("engine failed to run {command:?}: {message}")]
    Engine {
        /// Command being run
        command: String,
        /// Message reported by the engine
        message: String,
    },
}

impl EngineError {
    /// Creates an [`EngineError::Engine`] error.
    pub fn engine(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Engine {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Returns `true` for internal consistency errors, which abort the call.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Core(e) if e.is_fatal())
    }
}

/// Result type for engine calls.
pub type EngineResult<T> = Result<T, EngineError>;
