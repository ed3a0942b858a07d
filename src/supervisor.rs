// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Run an evaluated session plan to completion
//!
//! Rules:
//!   - start requests are issued strictly in plan order, fire-and-forget;
//!     nothing waits for process N to be ready before starting N+1
//!   - a start failure is reported and does not cancel siblings
//!   - on-exit actions run in order when their process exits; the first
//!     shutdown action broadcasts a cancellation that terminates every
//!     other live process in the session
//!   - the run ends once every started process has been reaped

use std::process::ExitStatus;

use async_trait::async_trait;
use futures::future;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::{pin_mut, FutureExt};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::directive::Action;
use crate::session::{ResolvedProcess, SessionPlan};
use crate::Error;

/// Turns resolved start-requests into running processes.
#[async_trait]
pub trait Spawner {
    type Handle: ProcessHandle;

    async fn spawn(&mut self, process: &ResolvedProcess) -> Result<Self::Handle, Error>;
}

/// One running process owned by the session.
#[async_trait]
pub trait ProcessHandle: Send + 'static {
    /// Resolves once, with the process's exit status.
    async fn wait(&mut self) -> Result<ExitStatus, Error>;

    /// Ask the process to stop; the caller still reaps it with [`wait`].
    ///
    /// [`wait`]: Self::wait
    fn terminate(&mut self) -> Result<(), Error>;

    fn id(&self) -> Option<u32>;
}

/// What a session run amounted to.
#[derive(Debug, Default)]
pub struct SessionOutcome {
    /// Reason carried by the first shutdown action that ran, if any
    pub shutdown_reason: Option<String>,
    /// How many shutdown actions ran; only the first one broadcasts
    pub shutdown_requests: usize,
    /// How many started processes were reaped
    pub exited: usize,
}

pub struct Supervisor<S> {
    spawner: S,
}

impl<S: Spawner> Supervisor<S> {
    pub fn new(spawner: S) -> Self {
        Self { spawner }
    }

    pub async fn run(mut self, plan: SessionPlan) -> Result<SessionOutcome, Error> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut on_exit: Vec<Vec<Action>> = Vec::new();
        let mut monitors = FuturesUnordered::new();

        for process in plan.processes {
            match self.spawner.spawn(&process).await {
                Ok(handle) => {
                    let slot = on_exit.len();
                    on_exit.push(process.on_exit);
                    monitors.push(monitor(
                        slot,
                        process.program,
                        handle,
                        shutdown_rx.clone(),
                    ));
                }
                Err(e) => {
                    // siblings keep running, there is no rollback for a failed start
                    error!(program = %process.program, error = %e, "failed to start process");
                }
            }
        }

        let mut outcome = SessionOutcome::default();
        while let Some((slot, program, status)) = monitors.next().await {
            match status {
                Ok(status) if status.success() => info!(program = %program, "process exited"),
                Ok(status) => warn!(program = %program, status = %status, "process exited"),
                Err(e) => warn!(program = %program, error = %e, "lost track of process"),
            }
            outcome.exited += 1;

            for action in &on_exit[slot] {
                match action {
                    Action::Log { message } => info!("{}", message),
                    Action::Shutdown { reason } => {
                        outcome.shutdown_requests += 1;
                        if outcome.shutdown_reason.is_none() {
                            info!(reason = %reason, "shutdown requested");
                            outcome.shutdown_reason = Some(reason.clone());
                            // fails only once every monitor is gone, and then
                            // there is nothing left to cancel
                            let _ = shutdown_tx.broadcast(true);
                        }
                    }
                }
            }
        }

        Ok(outcome)
    }
}

/// Wait on one process, racing its exit against a session shutdown.
async fn monitor<H: ProcessHandle>(
    slot: usize,
    program: String,
    mut handle: H,
    mut shutdown: watch::Receiver<bool>,
) -> (usize, String, Result<ExitStatus, Error>) {
    {
        let mut wait = handle.wait().fuse();
        let shutdown = shutdown_requested(&mut shutdown).fuse();
        pin_mut!(shutdown);

        futures::select! {
            status = wait => return (slot, program, status),
            _ = shutdown => (),
        }
    }

    // the session is coming down, ask the process to stop and reap it
    if let Err(e) = handle.terminate() {
        warn!(program = %program, error = %e, "failed to signal process");
    }
    let status = handle.wait().await;
    (slot, program, status)
}

async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    while let Some(fired) = shutdown.recv().await {
        if fired {
            return;
        }
    }

    // sender gone without firing; stay pending so the exit branch wins
    future::pending::<()>().await
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io;
    use std::os::unix::process::ExitStatusExt;
    use std::sync::{Arc, Mutex};

    use tokio::runtime;
    use tokio::sync::mpsc;

    use super::*;
    use crate::ErrorKind;

    enum ExitPlan {
        /// exits on its own with this raw wait status
        Immediate(i32),
        /// runs until the session terminates it
        UntilShutdown,
        /// never starts at all
        FailToSpawn,
    }

    #[derive(Default)]
    struct Record {
        spawned: Vec<String>,
        terminated: Vec<String>,
    }

    struct FakeSpawner {
        plans: HashMap<&'static str, ExitPlan>,
        record: Arc<Mutex<Record>>,
    }

    impl FakeSpawner {
        fn new(plans: Vec<(&'static str, ExitPlan)>) -> (Self, Arc<Mutex<Record>>) {
            let record = Arc::new(Mutex::new(Record::default()));
            let spawner = Self {
                plans: plans.into_iter().collect(),
                record: Arc::clone(&record),
            };
            (spawner, record)
        }
    }

    struct FakeHandle {
        program: String,
        exit_tx: mpsc::UnboundedSender<i32>,
        exit_rx: mpsc::UnboundedReceiver<i32>,
        record: Arc<Mutex<Record>>,
    }

    #[async_trait]
    impl Spawner for FakeSpawner {
        type Handle = FakeHandle;

        async fn spawn(&mut self, process: &ResolvedProcess) -> Result<FakeHandle, Error> {
            let plan = self
                .plans
                .get(process.program.as_str())
                .unwrap_or(&ExitPlan::UntilShutdown);

            if let ExitPlan::FailToSpawn = plan {
                return Err(ErrorKind::Spawn {
                    program: process.program.clone(),
                    source: io::Error::new(io::ErrorKind::NotFound, "no such program"),
                }
                .into());
            }

            self.record
                .lock()
                .unwrap()
                .spawned
                .push(process.program.clone());

            let (exit_tx, exit_rx) = mpsc::unbounded_channel();
            if let ExitPlan::Immediate(raw) = plan {
                exit_tx.send(*raw).unwrap();
            }

            Ok(FakeHandle {
                program: process.program.clone(),
                exit_tx,
                exit_rx,
                record: Arc::clone(&self.record),
            })
        }
    }

    #[async_trait]
    impl ProcessHandle for FakeHandle {
        async fn wait(&mut self) -> Result<ExitStatus, Error> {
            match self.exit_rx.recv().await {
                Some(raw) => Ok(ExitStatus::from_raw(raw)),
                None => Err(Error::from("exit channel closed")),
            }
        }

        fn terminate(&mut self) -> Result<(), Error> {
            self.record
                .lock()
                .unwrap()
                .terminated
                .push(self.program.clone());

            // killed by SIGTERM, as far as the supervisor can tell
            self.exit_tx.send(15).unwrap();
            Ok(())
        }

        fn id(&self) -> Option<u32> {
            None
        }
    }

    fn runtime() -> runtime::Runtime {
        runtime::Builder::new()
            .basic_scheduler()
            .enable_all()
            .build()
            .expect("failed to initialize Tokio Runtime")
    }

    fn proc(program: &str, on_exit: Vec<Action>) -> ResolvedProcess {
        ResolvedProcess {
            program: program.to_string(),
            args: Vec::new(),
            params: Vec::new(),
            remaps: Vec::new(),
            on_exit,
        }
    }

    #[test]
    fn watchdog_exit_tears_down_the_session() {
        let (spawner, record) = FakeSpawner::new(vec![
            ("gz", ExitPlan::UntilShutdown),
            ("parameter_bridge", ExitPlan::UntilShutdown),
            ("minium", ExitPlan::Immediate(0)),
        ]);

        let plan = SessionPlan {
            processes: vec![
                proc("gz", Vec::new()),
                proc("parameter_bridge", Vec::new()),
                proc(
                    "minium",
                    vec![
                        Action::log("watchdog exited, stopping everything"),
                        Action::shutdown("watchdog timeout"),
                    ],
                ),
            ],
        };

        let outcome = runtime()
            .block_on(Supervisor::new(spawner).run(plan))
            .expect("run failed");

        assert_eq!(outcome.shutdown_reason.as_deref(), Some("watchdog timeout"));
        assert_eq!(outcome.shutdown_requests, 1);
        assert_eq!(outcome.exited, 3);

        let record = record.lock().unwrap();
        assert_eq!(record.spawned, vec!["gz", "parameter_bridge", "minium"]);
        assert!(record.terminated.contains(&"gz".to_string()));
        assert!(record.terminated.contains(&"parameter_bridge".to_string()));
        assert!(!record.terminated.contains(&"minium".to_string()));
    }

    #[test]
    fn start_requests_follow_plan_order() {
        let (spawner, record) = FakeSpawner::new(vec![
            ("a", ExitPlan::Immediate(0)),
            ("b", ExitPlan::Immediate(0)),
            ("c", ExitPlan::Immediate(0)),
        ]);

        let plan = SessionPlan {
            processes: vec![
                proc("a", Vec::new()),
                proc("b", Vec::new()),
                proc("c", Vec::new()),
            ],
        };

        runtime()
            .block_on(Supervisor::new(spawner).run(plan))
            .expect("run failed");

        assert_eq!(record.lock().unwrap().spawned, vec!["a", "b", "c"]);
    }

    #[test]
    fn spawn_failure_does_not_cancel_siblings() {
        let (spawner, record) = FakeSpawner::new(vec![
            ("broken", ExitPlan::FailToSpawn),
            ("gz", ExitPlan::Immediate(0)),
        ]);

        let plan = SessionPlan {
            processes: vec![proc("broken", Vec::new()), proc("gz", Vec::new())],
        };

        let outcome = runtime()
            .block_on(Supervisor::new(spawner).run(plan))
            .expect("run failed");

        assert_eq!(outcome.exited, 1);
        assert!(outcome.shutdown_reason.is_none());

        let record = record.lock().unwrap();
        assert_eq!(record.spawned, vec!["gz"]);
        assert!(record.terminated.is_empty());
    }

    #[test]
    fn session_without_shutdown_runs_to_natural_exit() {
        let (spawner, _record) = FakeSpawner::new(vec![
            ("a", ExitPlan::Immediate(0)),
            ("b", ExitPlan::Immediate(256)),
        ]);

        let plan = SessionPlan {
            processes: vec![proc("a", Vec::new()), proc("b", Vec::new())],
        };

        let outcome = runtime()
            .block_on(Supervisor::new(spawner).run(plan))
            .expect("run failed");

        assert_eq!(outcome.exited, 2);
        assert_eq!(outcome.shutdown_requests, 0);
        assert!(outcome.shutdown_reason.is_none());
    }
}
