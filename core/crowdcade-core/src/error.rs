//! Error types for crowdcade-core operations.
//!
//! Each subsystem gets its own small enum; `ControllerError` aggregates them
//! via `From` impls for callers that only care about "the run failed".

use std::path::PathBuf;

/// Failures raised by a signal source (the social API adapter).
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Network or API-level failure. Non-fatal for a single poll cycle.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The payload decoded, but a required field was missing or mistyped.
    #[error("malformed payload: {0}")]
    Format(String),
}

/// Failures raised while persisting or restoring a session snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed snapshot: {path}: {details}")]
    Format { path: PathBuf, details: String },
}

/// Failures raised by the downstream actuator (the emulator).
#[derive(Debug, thiserror::Error)]
pub enum ActuatorError {
    #[error("input rejected: {0}")]
    Input(String),

    #[error("save state failed: {path}: {details}")]
    Save { path: PathBuf, details: String },

    #[error("load state failed: {path}: {details}")]
    Load { path: PathBuf, details: String },

    #[error("run loop failed: {0}")]
    Run(String),
}

/// Failures raised while writing overlay text fields.
#[derive(Debug, thiserror::Error)]
pub enum OverlayError {
    #[error("overlay write failed: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failures raised while managing the external broadcaster process.
#[derive(Debug, thiserror::Error)]
pub enum BroadcastError {
    #[error("failed to spawn broadcaster `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("broadcaster exited during startup with status {status}")]
    ExitedEarly { status: String },

    #[error("broadcaster is not running")]
    NotRunning,
}

/// Top-level error for controller operations.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("signal source error: {0}")]
    Source(#[from] SourceError),

    #[error("session store error: {0}")]
    Session(#[from] SessionError),

    #[error("actuator error: {0}")]
    Actuator(#[from] ActuatorError),

    #[error("overlay error: {0}")]
    Overlay(#[from] OverlayError),

    #[error("broadcast error: {0}")]
    Broadcast(#[from] BroadcastError),

    #[error("config error: {0}")]
    Config(String),
}

/// Convenience type alias for Results using ControllerError.
pub type Result<T> = std::result::Result<T, ControllerError>;
