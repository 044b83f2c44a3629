use crate::wire::Status;

/// Latest known status of one task.
///
/// The master owns `worker_id` and `worker_host`; reports arriving in
/// heartbeats have them stamped from the sending worker's registration before
/// they reach a coordinator.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskInfo {
    pub job_id: u64,
    pub task_id: u32,
    pub worker_id: u64,
    pub worker_host: String,
    pub status: Status,
    pub error_message: String,
    pub result: Option<Vec<u8>>,
    pub last_updated_ms: u64,
}

impl TaskInfo {
    pub fn new(job_id: u64, task_id: u32, worker_id: u64, worker_host: String) -> Self {
        Self {
            job_id,
            task_id,
            worker_id,
            worker_host,
            status: Status::Created,
            error_message: String::new(),
            result: None,
            last_updated_ms: 0,
        }
    }
}
