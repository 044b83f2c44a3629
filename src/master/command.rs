use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

/// A message from the master to one worker, delivered in the next heartbeat
/// response.
#[derive(Debug, Clone, PartialEq)]
pub enum JobCommand {
    /// The worker id is unknown; forget it and register again.
    Register,
    /// Start executing a task.
    RunTask {
        job_id: u64,
        task_id: u32,
        args: serde_json::Value,
    },
    /// Stop executing a task.
    CancelTask { job_id: u64, task_id: u32 },
    /// Re-run worker-side setup.
    Setup,
}

/// Per-worker FIFO queues of outbound commands.
///
/// Commands to one worker drain in enqueue order; queues for different
/// workers never contend with each other.
#[derive(Debug, Default)]
pub struct CommandManager {
    queues: RwLock<HashMap<u64, Arc<Mutex<Vec<JobCommand>>>>>,
}

impl CommandManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit_register(&self, worker_id: u64) {
        self.push(worker_id, JobCommand::Register);
    }

    pub fn submit_run_task(&self, worker_id: u64, job_id: u64, task_id: u32, args: serde_json::Value) {
        self.push(
            worker_id,
            JobCommand::RunTask {
                job_id,
                task_id,
                args,
            },
        );
    }

    pub fn submit_cancel_task(&self, worker_id: u64, job_id: u64, task_id: u32) {
        self.push(worker_id, JobCommand::CancelTask { job_id, task_id });
    }

    pub fn submit_setup(&self, worker_id: u64) {
        self.push(worker_id, JobCommand::Setup);
    }

    /// Atomically drains the worker's queue, returning the commands in the
    /// order they were submitted.
    pub fn poll_all_pending(&self, worker_id: u64) -> Vec<JobCommand> {
        let queue = {
            let queues = self.queues.read().expect("command queues lock poisoned");
            match queues.get(&worker_id) {
                Some(queue) => Arc::clone(queue),
                None => return Vec::new(),
            }
        };
        let mut queue = queue.lock().expect("command queue lock poisoned");
        std::mem::take(&mut *queue)
    }

    fn push(&self, worker_id: u64, command: JobCommand) {
        let queue = self.queue_for(worker_id);
        queue
            .lock()
            .expect("command queue lock poisoned")
            .push(command);
    }

    fn queue_for(&self, worker_id: u64) -> Arc<Mutex<Vec<JobCommand>>> {
        {
            let queues = self.queues.read().expect("command queues lock poisoned");
            if let Some(queue) = queues.get(&worker_id) {
                return Arc::clone(queue);
            }
        }
        let mut queues = self.queues.write().expect("command queues lock poisoned");
        Arc::clone(queues.entry(worker_id).or_default())
    }
}
