/// Network identity of a worker process.
///
/// Uniquely identifies a worker within the registry; a second registration
/// from the same address evicts the first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct WorkerNetAddress {
    pub host: String,
    pub rpc_port: u16,
    pub data_port: u16,
    pub web_port: u16,
    pub domain_socket_path: String,
}

impl std::fmt::Display for WorkerNetAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.rpc_port)
    }
}

/// Snapshot of a registered worker handed to plan expansion and queries.
#[derive(Debug, Clone)]
pub struct WorkerInfo {
    pub id: u64,
    pub address: WorkerNetAddress,
    pub last_updated_ms: u64,
}
