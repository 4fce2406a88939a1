use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::ExitReport;

/// Lifecycle of a spawned command.
///
/// `Idle -> Running -> Exited | Killed`. Both terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProcessState {
    Idle,
    Running,
    /// The process ended on its own
    Exited {
        code: Option<i32>,
        signal: Option<i32>,
    },
    /// The process ended after a stop or detach request
    Killed {
        code: Option<i32>,
        signal: Option<i32>,
    },
}

impl ProcessState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Exited { .. } | Self::Killed { .. })
    }
}

/// Shared between the handle and the supervisor task. Updated under the
/// watch channel's lock, so a stop request and the exit classification
/// cannot interleave.
#[derive(Debug)]
pub(crate) struct Lifecycle {
    pub(crate) state: ProcessState,
    pub(crate) stop_requested: bool,
    pub(crate) report: Option<ExitReport>,
}

impl Lifecycle {
    pub(crate) fn idle() -> Self {
        Self {
            state: ProcessState::Idle,
            stop_requested: false,
            report: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Control {
    /// Ask the process to exit (SIGTERM on unix)
    Terminate,
    /// Kill the process outright
    Kill,
}

/// Cloneable stop/detach capability for a running command.
///
/// Unlike [`ProcessHandle`], dropping a `Stopper` does nothing, so it can be
/// moved into signal handlers or other tasks.
#[derive(Debug, Clone)]
pub struct Stopper {
    lifecycle: Arc<watch::Sender<Lifecycle>>,
    control: mpsc::UnboundedSender<Control>,
}

impl Stopper {
    /// Ask the process to terminate gracefully.
    ///
    /// Once this returns `true` the exit is reported as killed, even if the
    /// process was already on its way out. Returns `false` when the process
    /// is not running or a stop was already requested.
    pub fn request_stop(&self) -> bool {
        let issued = self.lifecycle.send_if_modified(|l| {
            if l.state.is_running() && !l.stop_requested {
                l.stop_requested = true;
                true
            } else {
                false
            }
        });
        if issued {
            debug!("Stop requested");
            let _ = self.control.send(Control::Terminate);
        }
        issued
    }

    /// The consumer of this process's output went away: kill it.
    ///
    /// The state becomes `Killed` right away and no further lines are
    /// delivered. The exit observer still fires once the process is reaped.
    /// Returns `false` when the process had already terminated.
    pub fn detach(&self) -> bool {
        let running = self.lifecycle.send_if_modified(|l| {
            if l.state.is_running() {
                l.stop_requested = true;
                l.state = ProcessState::Killed {
                    code: None,
                    signal: None,
                };
                true
            } else {
                false
            }
        });
        if running {
            debug!("Consumer detached, killing process");
            let _ = self.control.send(Control::Kill);
        }
        running
    }

    pub fn state(&self) -> ProcessState {
        self.lifecycle.borrow().state
    }
}

/// Handle to a command started by [`ProcessRunner`](crate::ProcessRunner).
///
/// Dropping the handle while the command runs counts as detaching: the
/// process is killed.
#[derive(Debug)]
pub struct ProcessHandle {
    pid: Option<u32>,
    program: String,
    stopper: Stopper,
}

impl ProcessHandle {
    pub(crate) fn new(
        pid: Option<u32>,
        program: String,
        lifecycle: Arc<watch::Sender<Lifecycle>>,
        control: mpsc::UnboundedSender<Control>,
    ) -> Self {
        Self {
            pid,
            program,
            stopper: Stopper { lifecycle, control },
        }
    }

    /// OS process id, as reported at spawn time.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn state(&self) -> ProcessState {
        self.stopper.state()
    }

    /// See [`Stopper::request_stop`].
    pub fn request_stop(&self) -> bool {
        self.stopper.request_stop()
    }

    /// See [`Stopper::detach`].
    pub fn detach(&self) -> bool {
        self.stopper.detach()
    }

    pub fn stopper(&self) -> Stopper {
        self.stopper.clone()
    }

    /// Wait until the process has terminated and its exit was reported.
    pub async fn wait(&self) -> ExitReport {
        let mut rx = self.stopper.lifecycle.subscribe();
        let report = match rx.wait_for(|l| l.report.is_some()).await {
            Ok(lifecycle) => lifecycle.report,
            // The sender lives in this handle, so the channel cannot close.
            Err(_) => None,
        };
        report.unwrap_or(ExitReport {
            code: None,
            signal: None,
            killed: true,
            duration: std::time::Duration::ZERO,
        })
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        self.stopper.detach();
    }
}
