//! Seam to the downstream actuator (the emulator).
//!
//! The run loop is thread-affine: `run` blocks and must own the thread that
//! calls it until the loop exits. Everything else may be called from worker
//! threads, so implementations provide their own interior synchronization.

use std::path::Path;

use crate::error::ActuatorError;
use crate::signals::Action;

pub trait Actuator: Send + Sync {
    /// Applies a press (`pressed = true`) or release of a single input.
    fn apply_input(&self, action: Action, pressed: bool) -> Result<(), ActuatorError>;

    /// Writes the actuator's own state to `path`.
    fn save_state(&self, path: &Path) -> Result<(), ActuatorError>;

    /// Restores the actuator's own state from `path`.
    fn load_state(&self, path: &Path) -> Result<(), ActuatorError>;

    /// Runs the actuator loop against the given resource. Blocks the calling
    /// thread until the loop exits.
    fn run(&self, resource: &Path) -> Result<(), ActuatorError>;
}
