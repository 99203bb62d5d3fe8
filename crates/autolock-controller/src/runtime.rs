//! Task lifecycle for the two control loops.
//!
//! [`start`] spawns the switch sampler and the scan loop into one
//! [`JoinSet`] and returns an [`AutolockHandle`]. Each loop gets its own
//! child of the controller's shutdown token, so a hold-to-shutdown gesture
//! stops both, while [`AutolockHandle::shutdown`] stops them in order:
//! sampler first, scan loop once the sampler has exited.
//!
//! ```text
//!                 shutdown token (controller)
//!                  /                      \
//!        sampler token                scan token
//!              |                          |
//!    ┌─────────────────┐        ┌──────────────────┐
//!    │ Switch sampler  │──────► │  LockController  │ ◄──── Scan loop
//!    │ (gestures)      │        │  (mutex)         │       (card session)
//!    └─────────────────┘        └──────────────────┘
//! ```

use tokio::task::{Id, JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::controller::LockController;
use crate::error::{ControllerError, Result};
use crate::sampler::SwitchSampler;
use crate::session::CardSession;

/// Counters reported by a loop when it exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopReport {
    /// Loop name.
    pub task: &'static str,
    /// Iterations started.
    pub iterations: u64,
    /// Gestures dispatched or cards read.
    pub events: u64,
    /// Iterations that hit a read failure.
    pub failures: u64,
}

impl LoopReport {
    pub fn new(task: &'static str) -> Self {
        Self {
            task,
            iterations: 0,
            events: 0,
            failures: 0,
        }
    }
}

/// Spawn both loops.
///
/// Must be called from within a Tokio runtime.
pub fn start(controller: LockController, sampler: SwitchSampler, session: CardSession) -> AutolockHandle {
    let root = controller.shutdown_token();
    let sampler_token = root.child_token();
    let scan_token = root.child_token();

    let mut tasks = JoinSet::new();
    let sampler_id = tasks
        .spawn(sampler.run(controller.clone(), sampler_token.clone()))
        .id();
    tasks.spawn(controller.clone().run_scan_loop(session, scan_token.clone()));

    info!("Autolock running");

    AutolockHandle {
        controller,
        root,
        sampler_token,
        scan_token,
        sampler_id,
        tasks,
    }
}

/// Running controller.
#[derive(Debug)]
pub struct AutolockHandle {
    controller: LockController,
    root: CancellationToken,
    sampler_token: CancellationToken,
    scan_token: CancellationToken,
    sampler_id: Id,
    tasks: JoinSet<LoopReport>,
}

impl AutolockHandle {
    /// The controller both loops drive.
    pub fn controller(&self) -> &LockController {
        &self.controller
    }

    /// Returns `true` once a shutdown gesture was handled.
    pub fn is_shutdown_requested(&self) -> bool {
        self.root.is_cancelled()
    }

    /// Resolves once a shutdown gesture was handled.
    pub async fn shutdown_requested(&self) {
        self.root.cancelled().await;
    }

    /// Wait for a shutdown gesture, then stop both loops.
    pub async fn wait(self) -> Result<Vec<LoopReport>> {
        self.root.cancelled().await;
        self.shutdown().await
    }

    /// Stop the sampler, then the scan loop, and collect their reports.
    ///
    /// Each loop finishes its current sleep or scan first.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::TaskPanicked`] if a loop panicked. The
    /// other loop is still stopped and joined.
    pub async fn shutdown(mut self) -> Result<Vec<LoopReport>> {
        let mut reports = Vec::with_capacity(2);
        let mut panicked = None;

        self.sampler_token.cancel();
        while let Some(result) = self.tasks.join_next_with_id().await {
            let sampler_done = Self::task_id(&result) == self.sampler_id;
            Self::collect(result, self.sampler_id, &mut reports, &mut panicked);
            if sampler_done {
                break;
            }
        }

        self.scan_token.cancel();
        while let Some(result) = self.tasks.join_next_with_id().await {
            Self::collect(result, self.sampler_id, &mut reports, &mut panicked);
        }

        for report in &reports {
            debug!(
                "{} exited after {} iterations ({} events, {} failures)",
                report.task, report.iterations, report.events, report.failures
            );
        }
        info!("Autolock stopped");

        match panicked {
            Some(e) => Err(e),
            None => Ok(reports),
        }
    }

    fn task_id(result: &std::result::Result<(Id, LoopReport), JoinError>) -> Id {
        match result {
            Ok((id, _)) => *id,
            Err(e) => e.id(),
        }
    }

    fn collect(
        result: std::result::Result<(Id, LoopReport), JoinError>,
        sampler_id: Id,
        reports: &mut Vec<LoopReport>,
        panicked: &mut Option<ControllerError>,
    ) {
        match result {
            Ok((_, report)) => reports.push(report),
            Err(e) if e.is_cancelled() => debug!("Loop task cancelled"),
            Err(e) => {
                let task = if e.id() == sampler_id {
                    "switch sampler"
                } else {
                    "scan loop"
                };
                error!("{} panicked: {}", task, e);
                panicked.get_or_insert(ControllerError::TaskPanicked {
                    task,
                    message: e.to_string(),
                });
            }
        }
    }
}
