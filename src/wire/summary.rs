use crate::wire::{PlanInfo, Status};

/// Number of recently updated plans reported across all states.
const RECENT_ACTIVITIES: usize = 10;

/// Plans sharing one rolled-up state, most recently updated first.
#[derive(Debug, Clone)]
pub struct StatusSummary {
    pub status: Status,
    pub count: usize,
    pub jobs: Vec<PlanInfo>,
}

/// Service-wide view built over every live plan at the moment of the call.
#[derive(Debug, Clone)]
pub struct JobServiceSummary {
    pub summary_per_status: Vec<StatusSummary>,
    pub recent_activities: Vec<PlanInfo>,
}

impl JobServiceSummary {
    /// Groups plans by state; each group and the recent-activity list are
    /// ordered by last-updated descending, ties broken by id ascending.
    pub fn new(mut plans: Vec<PlanInfo>) -> Self {
        plans.sort_by(|a, b| {
            b.last_updated_ms
                .cmp(&a.last_updated_ms)
                .then(a.id.cmp(&b.id))
        });

        let recent_activities = plans.iter().take(RECENT_ACTIVITIES).cloned().collect();

        let summary_per_status = [
            Status::Created,
            Status::Canceled,
            Status::Failed,
            Status::Running,
            Status::Completed,
        ]
        .into_iter()
        .map(|status| {
            let jobs: Vec<PlanInfo> = plans.iter().filter(|p| p.status == status).cloned().collect();
            StatusSummary {
                status,
                count: jobs.len(),
                jobs,
            }
        })
        .collect();

        Self {
            summary_per_status,
            recent_activities,
        }
    }
}
