use crate::wire::{Status, TaskInfo};

/// Point-in-time snapshot of one plan, with its tasks as children.
#[derive(Debug, Clone)]
pub struct PlanInfo {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub status: Status,
    pub error_message: String,
    pub children: Vec<TaskInfo>,
    pub result: Option<Vec<u8>>,
    pub last_updated_ms: u64,
}

/// A plan or a task, behind one accessor surface.
///
/// Serialization branches on the variant: plans carry children, tasks carry a
/// worker host.
#[derive(Debug, Clone)]
pub enum JobInfo {
    Plan(PlanInfo),
    Task(TaskInfo),
}

impl JobInfo {
    pub fn id(&self) -> u64 {
        match self {
            JobInfo::Plan(p) => p.id,
            JobInfo::Task(t) => t.job_id,
        }
    }

    pub fn status(&self) -> Status {
        match self {
            JobInfo::Plan(p) => p.status,
            JobInfo::Task(t) => t.status,
        }
    }

    pub fn error_message(&self) -> &str {
        match self {
            JobInfo::Plan(p) => &p.error_message,
            JobInfo::Task(t) => &t.error_message,
        }
    }

    pub fn last_updated_ms(&self) -> u64 {
        match self {
            JobInfo::Plan(p) => p.last_updated_ms,
            JobInfo::Task(t) => t.last_updated_ms,
        }
    }
}
