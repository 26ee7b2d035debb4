//! Managed handle for the external broadcaster process.
//!
//! The controller does not embed any streaming logic; its only contract with
//! the broadcaster is the overlay text files (see `telemetry`). This handle
//! just owns the child process lifecycle: start, await-ready, stop.

use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::error::BroadcastError;

const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Spawns and supervises one broadcaster child process.
pub struct BroadcastProcess {
    program: String,
    args: Vec<String>,
    child: Option<Child>,
}

impl BroadcastProcess {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            child: None,
        }
    }

    pub fn is_running(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    pub fn start(&mut self) -> Result<(), BroadcastError> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| BroadcastError::Spawn {
                command: self.program.clone(),
                source: err,
            })?;

        info!(command = %self.program, pid = child.id(), "Broadcaster started");
        self.child = Some(child);
        Ok(())
    }

    /// Waits until the process has survived its startup window.
    ///
    /// An exit within the window is treated as a failed start; surviving it
    /// is as ready as we can observe without a push protocol.
    pub fn await_ready(&mut self, window: Duration) -> Result<(), BroadcastError> {
        let child = self.child.as_mut().ok_or(BroadcastError::NotRunning)?;
        let deadline = Instant::now() + window;

        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    return Err(BroadcastError::ExitedEarly {
                        status: status.to_string(),
                    });
                }
                Ok(None) => {
                    if Instant::now() >= deadline {
                        return Ok(());
                    }
                    std::thread::sleep(READY_POLL_INTERVAL);
                }
                Err(err) => {
                    warn!(error = %err, "Failed to poll broadcaster status");
                    return Ok(());
                }
            }
        }
    }

    pub fn stop(&mut self) -> Result<(), BroadcastError> {
        let mut child = self.child.take().ok_or(BroadcastError::NotRunning)?;
        if let Err(err) = child.kill() {
            warn!(error = %err, "Failed to kill broadcaster (may have already exited)");
        }
        match child.wait() {
            Ok(status) => info!(status = %status, "Broadcaster stopped"),
            Err(err) => warn!(error = %err, "Failed to reap broadcaster"),
        }
        Ok(())
    }
}

impl Drop for BroadcastProcess {
    fn drop(&mut self) {
        if self.child.is_some() {
            let _ = self.stop();
        }
    }
}
