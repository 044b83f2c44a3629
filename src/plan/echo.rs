use crate::error::Result;
use crate::plan::{JobServerContext, PlanConfig, PlanDefinition, TaskAssignment};
use crate::wire::WorkerInfo;

/// Fans one task out to every worker in the snapshot; each task echoes its
/// argument payload back, and the join concatenates the echoes in task-id
/// order. Mostly useful for smoke-testing a deployment.
pub struct EchoPlanDefinition;

impl PlanDefinition for EchoPlanDefinition {
    fn expand(
        &self,
        config: &PlanConfig,
        workers: &[WorkerInfo],
        _ctx: &JobServerContext,
    ) -> Result<Vec<TaskAssignment>> {
        // Stable task numbering: tasks fan out in worker-id order.
        let mut workers: Vec<&WorkerInfo> = workers.iter().collect();
        workers.sort_by_key(|w| w.id);
        Ok(workers
            .into_iter()
            .map(|worker| TaskAssignment {
                worker_id: worker.id,
                args: config.options.clone(),
            })
            .collect())
    }

    fn join(&self, _config: &PlanConfig, results: Vec<Vec<u8>>) -> Result<Vec<u8>> {
        Ok(results.concat())
    }

    fn retryable(&self) -> bool {
        true
    }
}
