//! The in-memory coordination kernel of the job master.
//!
//! [`JobMaster`] is the outward surface: admission of plans, worker
//! registration, heartbeat handling, and status queries. Underneath it sit
//! the plan tracker (capacity and retention over coordinators), the
//! per-plan coordinators, the doubly-indexed worker registry, and the
//! per-worker command queues.
//!
//! Nothing here is journaled; a restart discards all plan and worker state.

pub mod command;
pub mod coordinator;
pub mod id;
pub mod tracker;
pub mod workers;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::clock::{self, SharedClock};
use crate::config::MasterConfig;
use crate::error::{ForemanError, Result};
use crate::plan::{JobServerContext, PlanConfig};
use crate::wire::{JobServiceSummary, PlanInfo, TaskInfo, WorkerInfo, WorkerNetAddress};

pub use command::{CommandManager, JobCommand};
pub use coordinator::PlanCoordinator;
pub use id::JobIdGenerator;
pub use tracker::PlanTracker;
pub use workers::{MasterWorkerInfo, WorkerRegistry};

/// The job master: admits plans, tracks workers, and routes task reports
/// from heartbeats into the affected plan coordinators.
pub struct JobMaster {
    config: MasterConfig,
    clock: SharedClock,
    context: JobServerContext,
    command_manager: Arc<CommandManager>,
    plan_tracker: PlanTracker,
    job_id_generator: JobIdGenerator,
    next_worker_id: AtomicU64,
    workers: RwLock<WorkerRegistry>,
    /// Serializes admissions so capacity checks and purges do not interleave.
    run_lock: Mutex<()>,
    detector: Mutex<Option<CancellationToken>>,
}

impl JobMaster {
    pub fn new(config: MasterConfig, context: JobServerContext, clock: SharedClock) -> Arc<Self> {
        let plan_tracker = PlanTracker::new(
            config.job_capacity,
            config.finished_job_retention_ms,
            config.finished_job_purge_count,
            Arc::clone(&clock),
        );
        let job_id_generator = JobIdGenerator::new(clock.as_ref());
        let next_worker_id = AtomicU64::new(clock.now_ms());
        Arc::new(Self {
            config,
            clock,
            context,
            command_manager: Arc::new(CommandManager::new()),
            plan_tracker,
            job_id_generator,
            next_worker_id,
            workers: RwLock::new(WorkerRegistry::new()),
            run_lock: Mutex::new(()),
            detector: Mutex::new(None),
        })
    }

    /// Buries any plan left unfinished by a previous incarnation, then
    /// starts the lost-worker detection sweep.
    pub fn start(self: &Arc<Self>) {
        for coordinator in self.plan_tracker.coordinators() {
            if !coordinator.is_job_finished() {
                coordinator.set_job_as_failed("Job failed: Job master shut down during execution");
            }
        }
        let master = Arc::clone(self);
        let token = clock::schedule(
            "lost-worker-detection",
            Duration::from_millis(self.config.lost_worker_interval_ms),
            move || master.lost_worker_tick(),
        );
        *self.detector.lock().expect("detector lock poisoned") = Some(token);
    }

    /// Stops the lost-worker detection sweep.
    pub fn stop(&self) {
        if let Some(token) = self.detector.lock().expect("detector lock poisoned").take() {
            token.cancel();
        }
    }

    pub fn config(&self) -> &MasterConfig {
        &self.config
    }

    pub fn new_job_id(&self) -> u64 {
        self.job_id_generator.next()
    }

    /// Admits and starts a plan, returning its id.
    ///
    /// Admission runs to completion once started; cancellation of the
    /// surrounding RPC must not abort it, or the client's view and the
    /// master's state would diverge.
    pub fn run(&self, config: PlanConfig) -> Result<u64> {
        let _admission = self.run_lock.lock().expect("run lock poisoned");
        let job_id = self.new_job_id();
        let workers = self.worker_info_list();
        self.plan_tracker.run(
            config,
            Arc::clone(&self.command_manager),
            &self.context,
            &workers,
            job_id,
        )?;
        Ok(job_id)
    }

    pub fn cancel(&self, job_id: u64) -> Result<()> {
        let coordinator = self
            .plan_tracker
            .get_coordinator(job_id)
            .ok_or(ForemanError::JobDoesNotExist(job_id))?;
        coordinator.cancel();
        Ok(())
    }

    pub fn list(&self) -> Vec<u64> {
        self.plan_tracker.jobs()
    }

    pub fn get_status(&self, job_id: u64) -> Result<PlanInfo> {
        let coordinator = self
            .plan_tracker
            .get_coordinator(job_id)
            .ok_or(ForemanError::JobDoesNotExist(job_id))?;
        Ok(coordinator.plan_info_wire())
    }

    /// Summary over every live plan at the moment of the call.
    pub fn get_summary(&self) -> JobServiceSummary {
        let plans = self
            .plan_tracker
            .coordinators()
            .iter()
            .map(|c| c.plan_info_wire())
            .collect();
        JobServiceSummary::new(plans)
    }

    /// Registers a worker and returns its id. A worker re-registering from
    /// a known address must have restarted: the previous record is evicted
    /// and its in-flight tasks are failed.
    pub fn register_worker(&self, address: WorkerNetAddress) -> u64 {
        let mut workers = self.workers.write().expect("worker registry lock poisoned");
        if let Some(dead) = workers.get_by_address(&address) {
            let dead_id = dead.id();
            tracing::info!(
                address = %address,
                worker_id = dead_id,
                "Worker re-registering; failing tasks of its previous incarnation"
            );
            for coordinator in self.plan_tracker.coordinators() {
                coordinator.fail_tasks_for_worker(dead_id);
            }
            workers.remove(dead_id);
        }
        let worker_id = self.next_worker_id.fetch_add(1, Ordering::SeqCst);
        workers.insert(Arc::new(MasterWorkerInfo::new(
            worker_id,
            address.clone(),
            self.clock.now_ms(),
        )));
        tracing::info!(address = %address, worker_id, "Worker registered");
        worker_id
    }

    /// Snapshot of all registered workers.
    pub fn worker_info_list(&self) -> Vec<WorkerInfo> {
        let workers = self.workers.read().expect("worker registry lock poisoned");
        workers.iter().map(|w| w.to_worker_info()).collect()
    }

    /// Absorbs a worker's task reports and drains its pending commands.
    ///
    /// An unknown worker id gets a single register command back: the worker
    /// must forget its id and register before doing anything else.
    pub fn worker_heartbeat(&self, worker_id: u64, reports: Vec<TaskInfo>) -> Vec<JobCommand> {
        let host = {
            let workers = self.workers.read().expect("worker registry lock poisoned");
            let Some(worker) = workers.get_by_id(worker_id) else {
                return vec![JobCommand::Register];
            };
            // Stamped under the shared lock so the lost-worker detector
            // cannot clear this worker while the heartbeat is in flight.
            worker.touch(self.clock.now_ms());
            worker.address().host.clone()
        };

        let mut reports_per_job: HashMap<u64, Vec<TaskInfo>> = HashMap::new();
        for mut report in reports {
            report.worker_id = worker_id;
            report.worker_host = host.clone();
            reports_per_job.entry(report.job_id).or_default().push(report);
        }
        for (job_id, job_reports) in reports_per_job {
            match self.plan_tracker.get_coordinator(job_id) {
                Some(coordinator) => coordinator.update_tasks(job_reports),
                None => tracing::debug!(job_id, worker_id, "Dropping reports for unknown job"),
            }
        }

        self.command_manager.poll_all_pending(worker_id)
    }

    /// One sweep of the lost-worker detector.
    ///
    /// Tasks are failed under the shared lock; removal re-checks each
    /// candidate under the exclusive lock because a racing heartbeat may
    /// have revived it. Tasks already failed stay failed.
    pub fn lost_worker_tick(&self) {
        let timeout_ms = self.config.worker_timeout_ms;
        let mut lost: Vec<u64> = Vec::new();
        {
            let workers = self.workers.read().expect("worker registry lock poisoned");
            for worker in workers.iter() {
                let silent_ms = self.clock.now_ms().saturating_sub(worker.last_updated_ms());
                if silent_ms > timeout_ms {
                    tracing::warn!(
                        worker_id = worker.id(),
                        address = %worker.address(),
                        silent_ms,
                        "Worker timed out without a heartbeat"
                    );
                    lost.push(worker.id());
                    for coordinator in self.plan_tracker.coordinators() {
                        coordinator.fail_tasks_for_worker(worker.id());
                    }
                }
            }
        }
        if !lost.is_empty() {
            let mut workers = self.workers.write().expect("worker registry lock poisoned");
            for worker_id in lost {
                let still_silent = workers
                    .get_by_id(worker_id)
                    .map(|w| self.clock.now_ms().saturating_sub(w.last_updated_ms()) > timeout_ms)
                    .unwrap_or(false);
                if still_silent {
                    workers.remove(worker_id);
                }
            }
        }
    }
}
