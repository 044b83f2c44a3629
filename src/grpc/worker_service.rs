use std::sync::Arc;

use tonic::{Request, Response, Status};

use crate::grpc::convert::{address_from_proto, command_to_proto, task_info_from_proto};
use crate::master::JobMaster;
use crate::proto::job_master_worker_service_server::JobMasterWorkerService;
use crate::proto::{
    HeartbeatRequest, HeartbeatResponse, RegisterWorkerRequest, RegisterWorkerResponse,
};

/// gRPC surface for workers: registration and the heartbeat exchange.
pub struct WorkerService {
    master: Arc<JobMaster>,
}

impl WorkerService {
    pub fn new(master: Arc<JobMaster>) -> Self {
        Self { master }
    }
}

#[tonic::async_trait]
impl JobMasterWorkerService for WorkerService {
    async fn register_worker(
        &self,
        request: Request<RegisterWorkerRequest>,
    ) -> Result<Response<RegisterWorkerResponse>, Status> {
        let req = request.into_inner();
        let address = req
            .address
            .ok_or_else(|| Status::invalid_argument("Worker address is required"))?;
        let worker_id = self.master.register_worker(address_from_proto(address));
        Ok(Response::new(RegisterWorkerResponse { worker_id }))
    }

    async fn heartbeat(
        &self,
        request: Request<HeartbeatRequest>,
    ) -> Result<Response<HeartbeatResponse>, Status> {
        let req = request.into_inner();
        let reports = req.task_infos.into_iter().map(task_info_from_proto).collect();
        let commands = self.master.worker_heartbeat(req.worker_id, reports);
        Ok(Response::new(HeartbeatResponse {
            commands: commands.into_iter().map(command_to_proto).collect(),
        }))
    }
}
