use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};

use crate::clock::SharedClock;
use crate::error::{ForemanError, Result};
use crate::master::command::CommandManager;
use crate::master::coordinator::PlanCoordinator;
use crate::plan::{JobServerContext, PlanConfig};
use crate::wire::{Status, WorkerInfo};

/// Purged plans leave this many compact records visible through `jobs()`.
const HISTORY_CAPACITY: usize = 100;

/// Compact record of a purged plan.
#[derive(Debug, Clone)]
pub struct FinishedPlanRecord {
    pub job_id: u64,
    pub name: String,
    pub status: Status,
    pub error_message: String,
    pub last_updated_ms: u64,
}

/// The population of live plan coordinators, bounded by a hard capacity.
///
/// Admission runs one at a time (the facade serializes `run`); finished
/// plans past the retention window are purged to make room. Queries take
/// only the shared lock and may keep coordinator references after a purge;
/// the last holder releases them.
pub struct PlanTracker {
    capacity: u64,
    retention_ms: u64,
    purge_limit: i64,
    clock: SharedClock,
    coordinators: RwLock<HashMap<u64, Arc<PlanCoordinator>>>,
    history: Mutex<VecDeque<FinishedPlanRecord>>,
}

impl PlanTracker {
    pub fn new(capacity: u64, retention_ms: u64, purge_limit: i64, clock: SharedClock) -> Self {
        Self {
            capacity,
            retention_ms,
            purge_limit,
            clock,
            coordinators: RwLock::new(HashMap::new()),
            history: Mutex::new(VecDeque::with_capacity(HISTORY_CAPACITY)),
        }
    }

    /// Admits a plan under the given id, purging finished plans first when
    /// at capacity. The caller must serialize admissions.
    ///
    /// The coordinator is constructed before it is published, so a plan
    /// visible through `get_coordinator` already has its start commands
    /// enqueued (or its failed expansion recorded).
    pub fn run(
        &self,
        config: PlanConfig,
        command_manager: Arc<CommandManager>,
        ctx: &JobServerContext,
        workers: &[WorkerInfo],
        job_id: u64,
    ) -> Result<()> {
        if self.live_count() >= self.capacity as usize {
            self.purge_expired();
            if self.live_count() >= self.capacity as usize {
                tracing::warn!(job_id, capacity = self.capacity, "Job master at capacity");
                return Err(ForemanError::ResourceExhausted(self.capacity));
            }
        }

        let coordinator = PlanCoordinator::create(
            command_manager,
            ctx,
            workers,
            job_id,
            config,
            Arc::clone(&self.clock),
        )?;
        self.coordinators
            .write()
            .expect("coordinators lock poisoned")
            .insert(job_id, coordinator);
        Ok(())
    }

    pub fn get_coordinator(&self, job_id: u64) -> Option<Arc<PlanCoordinator>> {
        self.coordinators
            .read()
            .expect("coordinators lock poisoned")
            .get(&job_id)
            .cloned()
    }

    /// Ids of all live plans, followed by the retained ids of purged ones.
    pub fn jobs(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self
            .coordinators
            .read()
            .expect("coordinators lock poisoned")
            .keys()
            .copied()
            .collect();
        ids.sort_unstable();
        ids.extend(
            self.history
                .lock()
                .expect("history lock poisoned")
                .iter()
                .map(|r| r.job_id),
        );
        ids
    }

    /// Snapshot of the live coordinators, safe to iterate without holding
    /// any tracker lock.
    pub fn coordinators(&self) -> Vec<Arc<PlanCoordinator>> {
        self.coordinators
            .read()
            .expect("coordinators lock poisoned")
            .values()
            .cloned()
            .collect()
    }

    pub fn history(&self) -> Vec<FinishedPlanRecord> {
        self.history
            .lock()
            .expect("history lock poisoned")
            .iter()
            .cloned()
            .collect()
    }

    fn live_count(&self) -> usize {
        self.coordinators
            .read()
            .expect("coordinators lock poisoned")
            .len()
    }

    /// Removes finished coordinators older than the retention window,
    /// earliest-finished first, up to the purge limit per attempt.
    fn purge_expired(&self) {
        let now = self.clock.now_ms();
        let mut coordinators = self.coordinators.write().expect("coordinators lock poisoned");

        let mut finished: Vec<(u64, u64)> = coordinators
            .values()
            .filter(|c| c.is_job_finished())
            .map(|c| (c.last_status_change_ms(), c.job_id()))
            .collect();
        finished.sort_unstable();

        let mut purged = 0u64;
        let mut history = self.history.lock().expect("history lock poisoned");
        for (finished_ms, job_id) in finished {
            if self.purge_limit >= 0 && purged >= self.purge_limit as u64 {
                break;
            }
            if now.saturating_sub(finished_ms) < self.retention_ms {
                break;
            }
            if let Some(coordinator) = coordinators.remove(&job_id) {
                let info = coordinator.plan_info_wire();
                if history.len() == HISTORY_CAPACITY {
                    history.pop_front();
                }
                history.push_back(FinishedPlanRecord {
                    job_id,
                    name: info.name,
                    status: info.status,
                    error_message: info.error_message,
                    last_updated_ms: info.last_updated_ms,
                });
                purged += 1;
            }
        }
        if purged > 0 {
            tracing::info!(purged, "Purged finished plans past retention");
        }
    }
}
