use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::clock::SharedClock;
use crate::error::{ForemanError, Result};
use crate::master::command::CommandManager;
use crate::plan::{JobServerContext, PlanConfig, PlanDefinition};
use crate::wire::{PlanInfo, Status, TaskInfo, WorkerInfo};

/// Derives a plan's state from its tasks' states.
///
/// Any canceled task cancels the plan; otherwise any failed task fails it;
/// all tasks completed completes it; any running task keeps it running.
pub fn roll_up(statuses: impl IntoIterator<Item = Status>) -> Status {
    let mut any = false;
    let mut all_completed = true;
    let mut any_failed = false;
    let mut any_running = false;
    for status in statuses {
        any = true;
        match status {
            Status::Canceled => return Status::Canceled,
            Status::Failed => any_failed = true,
            Status::Running => any_running = true,
            Status::Created => {}
            Status::Completed => {}
        }
        if status != Status::Completed {
            all_completed = false;
        }
    }
    if any_failed {
        Status::Failed
    } else if any && all_completed {
        Status::Completed
    } else if any_running {
        Status::Running
    } else {
        Status::Created
    }
}

/// Mutable plan state, guarded by the coordinator's mutex.
struct PlanState {
    config: PlanConfig,
    description: String,
    status: Status,
    error_message: String,
    result: Option<Vec<u8>>,
    last_status_change_ms: u64,
    tasks: BTreeMap<u32, TaskInfo>,
}

/// Owns the state machine of one admitted plan.
///
/// Mutations (`update_tasks`, `cancel`, `fail_tasks_for_worker`,
/// `set_job_as_failed`) serialize on the internal mutex; reads return a
/// consistent point-in-time snapshot.
pub struct PlanCoordinator {
    job_id: u64,
    name: String,
    definition: Arc<dyn PlanDefinition>,
    command_manager: Arc<CommandManager>,
    clock: SharedClock,
    state: Mutex<PlanState>,
}

impl PlanCoordinator {
    /// Resolves the plan's definition, expands it against the worker
    /// snapshot, and enqueues a start command per task.
    ///
    /// A failed expansion still yields a coordinator, in state failed with
    /// the expansion error; only an unknown plan name is an admission error.
    pub fn create(
        command_manager: Arc<CommandManager>,
        ctx: &JobServerContext,
        workers: &[WorkerInfo],
        job_id: u64,
        config: PlanConfig,
        clock: SharedClock,
    ) -> Result<Arc<Self>> {
        let definition = ctx
            .registry()
            .get(&config.name)
            .ok_or_else(|| ForemanError::PlanDoesNotExist(config.name.clone()))?;

        let now = clock.now_ms();
        let name = config.name.clone();
        let description = serde_json::to_string(&config).unwrap_or_default();
        let expansion = definition.expand(&config, workers, ctx);

        let mut state = PlanState {
            config,
            description,
            status: Status::Created,
            error_message: String::new(),
            result: None,
            last_status_change_ms: now,
            tasks: BTreeMap::new(),
        };

        match expansion {
            Ok(assignments) if assignments.is_empty() && definition.complete_when_empty() => {
                tracing::info!(job_id, name = %name, "Plan expanded to no tasks, completing");
                state.status = Status::Completed;
            }
            Ok(assignments) => {
                for (index, assignment) in assignments.into_iter().enumerate() {
                    let task_id = index as u32;
                    let host = workers
                        .iter()
                        .find(|w| w.id == assignment.worker_id)
                        .map(|w| w.address.host.clone())
                        .unwrap_or_default();
                    let mut task = TaskInfo::new(job_id, task_id, assignment.worker_id, host);
                    task.last_updated_ms = now;
                    state.tasks.insert(task_id, task);
                    command_manager.submit_run_task(
                        assignment.worker_id,
                        job_id,
                        task_id,
                        assignment.args,
                    );
                }
                tracing::info!(
                    job_id,
                    name = %name,
                    tasks = state.tasks.len(),
                    "Plan expanded and tasks dispatched"
                );
            }
            Err(e) => {
                tracing::warn!(job_id, name = %name, error = %e, "Plan expansion failed");
                state.status = Status::Failed;
                state.error_message = e.to_string();
            }
        }

        Ok(Arc::new(Self {
            job_id,
            name,
            definition,
            command_manager,
            clock,
            state: Mutex::new(state),
        }))
    }

    pub fn job_id(&self) -> u64 {
        self.job_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Applies a batch of per-task reports, then recomputes the rolled-up
    /// state once for the whole batch.
    pub fn update_tasks(&self, reports: Vec<TaskInfo>) {
        let mut state = self.state.lock().expect("plan state lock poisoned");
        for report in reports {
            self.apply_report(&mut state, report);
        }
        self.refresh_status(&mut state);
    }

    /// Requests cancellation of every non-terminal task. The plan state is
    /// not flipped here; the workers' subsequent reports drive the roll-up,
    /// and a task completing before the cancel lands is accepted.
    pub fn cancel(&self) {
        let state = self.state.lock().expect("plan state lock poisoned");
        if state.status.is_finished() {
            return;
        }
        for task in state.tasks.values().filter(|t| !t.status.is_finished()) {
            self.command_manager
                .submit_cancel_task(task.worker_id, self.job_id, task.task_id);
        }
        tracing::info!(job_id = self.job_id, "Plan cancellation requested");
    }

    /// Fails every non-terminal task assigned to the given worker, as if the
    /// worker had reported the failure itself.
    pub fn fail_tasks_for_worker(&self, worker_id: u64) {
        let mut state = self.state.lock().expect("plan state lock poisoned");
        let now = self.clock.now_ms();
        let message = if self.definition.retryable() {
            format!("Worker {} is lost; the plan is safe to re-submit", worker_id)
        } else {
            format!("Worker {} is lost", worker_id)
        };
        let mut failed = 0;
        for task in state
            .tasks
            .values_mut()
            .filter(|t| t.worker_id == worker_id && !t.status.is_finished())
        {
            task.status = Status::Failed;
            task.error_message = message.clone();
            task.last_updated_ms = now;
            failed += 1;
        }
        if failed > 0 {
            tracing::warn!(
                job_id = self.job_id,
                worker_id,
                tasks = failed,
                "Failed tasks for lost worker"
            );
            self.refresh_status(&mut state);
        }
    }

    /// Forces the plan and all of its non-terminal tasks to failed.
    pub fn set_job_as_failed(&self, message: &str) {
        let mut state = self.state.lock().expect("plan state lock poisoned");
        let now = self.clock.now_ms();
        for task in state.tasks.values_mut().filter(|t| !t.status.is_finished()) {
            task.status = Status::Failed;
            task.error_message = message.to_string();
            task.last_updated_ms = now;
        }
        if !state.status.is_finished() {
            state.status = Status::Failed;
            state.error_message = message.to_string();
            state.last_status_change_ms = now;
            tracing::warn!(job_id = self.job_id, message, "Plan forced to failed");
        }
    }

    pub fn is_job_finished(&self) -> bool {
        self.state
            .lock()
            .expect("plan state lock poisoned")
            .status
            .is_finished()
    }

    /// Millisecond timestamp of the last roll-up transition; for a finished
    /// plan, the time it finished.
    pub fn last_status_change_ms(&self) -> u64 {
        self.state
            .lock()
            .expect("plan state lock poisoned")
            .last_status_change_ms
    }

    /// Copies the plan's current status; the copy is independent of further
    /// mutation.
    pub fn plan_info_wire(&self) -> PlanInfo {
        let state = self.state.lock().expect("plan state lock poisoned");
        PlanInfo {
            id: self.job_id,
            name: self.name.clone(),
            description: state.description.clone(),
            status: state.status,
            error_message: state.error_message.clone(),
            children: state.tasks.values().cloned().collect(),
            result: state.result.clone(),
            last_updated_ms: state.last_status_change_ms,
        }
    }

    /// Applies one report. A report for an unknown task or for a task
    /// already in a terminal state is dropped without touching its batch
    /// siblings.
    fn apply_report(&self, state: &mut PlanState, report: TaskInfo) {
        let Some(task) = state.tasks.get_mut(&report.task_id) else {
            tracing::warn!(
                job_id = self.job_id,
                task_id = report.task_id,
                "Dropping report for unknown task"
            );
            return;
        };
        if task.status.is_finished() {
            tracing::debug!(
                job_id = self.job_id,
                task_id = report.task_id,
                status = %task.status,
                "Dropping report for finished task"
            );
            return;
        }
        task.status = report.status;
        task.error_message = report.error_message;
        if report.result.is_some() {
            task.result = report.result;
        }
        if !report.worker_host.is_empty() {
            task.worker_host = report.worker_host;
        }
        task.last_updated_ms = task.last_updated_ms.max(self.clock.now_ms());
    }

    /// Recomputes the rolled-up state; on completion, invokes the
    /// definition's join hook and stores the aggregated result. A join
    /// failure leaves the plan failed with the join error.
    fn refresh_status(&self, state: &mut PlanState) {
        if state.status.is_finished() {
            return;
        }
        let new_status = roll_up(state.tasks.values().map(|t| t.status));
        if new_status == state.status {
            return;
        }
        if new_status == Status::Failed && state.error_message.is_empty() {
            if let Some(task) = state.tasks.values().find(|t| t.status == Status::Failed) {
                state.error_message = task.error_message.clone();
            }
        }
        if new_status == Status::Completed {
            let results = state
                .tasks
                .values()
                .map(|t| t.result.clone().unwrap_or_default())
                .collect();
            match self.definition.join(&state.config, results) {
                Ok(result) => {
                    state.result = Some(result);
                    state.status = Status::Completed;
                }
                Err(e) => {
                    tracing::error!(job_id = self.job_id, error = %e, "Result join failed");
                    state.status = Status::Failed;
                    state.error_message = e.to_string();
                }
            }
        } else {
            state.status = new_status;
        }
        state.last_status_change_ms = self.clock.now_ms();
        tracing::info!(job_id = self.job_id, status = %state.status, "Plan status changed");
    }
}
