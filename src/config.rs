use std::net::SocketAddr;

/// Tunables for the job master.
///
/// All state lives in memory; none of these affect durability. Retention and
/// purge settings only bound how long finished plans stay queryable.
#[derive(Debug, Clone)]
pub struct MasterConfig {
    pub listen_addr: SocketAddr,
    /// Maximum number of live plans at any moment.
    pub job_capacity: u64,
    /// Minimum time a finished plan is retained before it may be purged.
    pub finished_job_retention_ms: u64,
    /// Maximum finished plans purged per admission attempt; -1 means unlimited.
    pub finished_job_purge_count: i64,
    /// Interval between lost-worker detection sweeps.
    pub lost_worker_interval_ms: u64,
    /// A worker silent for longer than this is considered lost.
    pub worker_timeout_ms: u64,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:50051".parse().unwrap(),
            job_capacity: 100,
            finished_job_retention_ms: 300_000,
            finished_job_purge_count: -1,
            lost_worker_interval_ms: 1_000,
            worker_timeout_ms: 60_000,
        }
    }
}
