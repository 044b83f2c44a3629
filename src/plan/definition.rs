use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::plan::PlanConfig;
use crate::wire::WorkerInfo;

/// One task produced by plan expansion: a target worker and the argument
/// payload it will execute with. Task ids are assigned by the coordinator,
/// densely from zero in the order returned.
#[derive(Debug, Clone)]
pub struct TaskAssignment {
    pub worker_id: u64,
    pub args: serde_json::Value,
}

/// Behavior of one plan type.
///
/// Expansion runs during admission against the worker snapshot taken at that
/// moment; workers registered later never receive tasks from the plan. Both
/// hooks may issue outbound calls through the server context.
pub trait PlanDefinition: Send + Sync {
    /// Turns a configuration into tasks, choosing a worker for each.
    fn expand(
        &self,
        config: &PlanConfig,
        workers: &[WorkerInfo],
        ctx: &JobServerContext,
    ) -> Result<Vec<TaskAssignment>>;

    /// Aggregates per-task result payloads once every task has completed,
    /// in task-id order.
    fn join(&self, config: &PlanConfig, results: Vec<Vec<u8>>) -> Result<Vec<u8>>;

    /// Whether an expansion yielding no tasks means the plan is trivially
    /// complete.
    fn complete_when_empty(&self) -> bool {
        true
    }

    /// Whether the plan can be safely re-submitted after a worker loss.
    fn retryable(&self) -> bool {
        false
    }
}

/// Lookup from plan name to definition.
#[derive(Default)]
pub struct PlanRegistry {
    definitions: HashMap<String, Arc<dyn PlanDefinition>>,
}

impl PlanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, definition: Arc<dyn PlanDefinition>) {
        self.definitions.insert(name.into(), definition);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn PlanDefinition>> {
        self.definitions.get(name).cloned()
    }
}

/// Context handed to plan definitions; the seam where embedders hang the
/// clients (storage, filesystem) their expansions and joins need.
#[derive(Clone)]
pub struct JobServerContext {
    registry: Arc<PlanRegistry>,
}

impl JobServerContext {
    pub fn new(registry: Arc<PlanRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &PlanRegistry {
        &self.registry
    }
}
