//! # crowdcade-core
//!
//! Core library for Crowdcade: a crowd-consensus controller that turns live
//! audience reactions into emulator button presses, with text-file telemetry
//! for a broadcast overlay and crash-resumable session snapshots.
//!
//! ## Design Principles
//!
//! - **Threaded, not async**: timer loops are plain threads coordinated over
//!   channels; no runtime dependency.
//! - **Traits at the seams**: the signal source, the actuator, and the
//!   overlay sink are traits, so tests drive the controller with fakes.
//! - **Graceful degradation**: a missing or corrupt session snapshot means a
//!   fresh start, not a failed start. Poll failures keep the previous tally.
//! - **Single writer**: the controller owns all mutable state; every other
//!   component sees snapshots.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use crowdcade_core::{Controller, ControllerConfig, FileOverlaySink};
//!
//! let config = ControllerConfig::default();
//! let sink = Box::new(FileOverlaySink::new("./overlay".into())?);
//! let controller = Controller::new(config, source, sink, "/roms/game.nes".into());
//! controller.run(actuator)?;
//! ```

// Public modules
pub mod actuator;
pub mod broadcast;
pub mod config;
pub mod controller;
pub mod dispatch;
pub mod error;
pub mod resolver;
pub mod session;
pub mod signals;
pub mod source;
pub mod telemetry;
pub mod tracker;

// Re-export commonly used items at crate root
pub use actuator::Actuator;
pub use broadcast::BroadcastProcess;
pub use config::{ActionMapping, ControllerConfig};
pub use controller::{Controller, ControllerPhase};
pub use dispatch::{DispatchHandle, DispatchStats, Dispatcher};
pub use error::{
    ActuatorError, BroadcastError, ControllerError, OverlayError, Result, SessionError,
    SourceError,
};
pub use resolver::{resolve, resolve_action};
pub use session::{SessionSnapshot, SessionStore};
pub use signals::{Action, Comment, Reaction, Signal};
pub use source::SignalSource;
pub use telemetry::{FileOverlaySink, OverlayField, OverlaySink, TelemetryPublisher};
pub use tracker::ActivityTracker;
