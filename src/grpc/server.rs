use std::net::SocketAddr;
use std::sync::Arc;

use tonic::transport::Server;

use crate::grpc::client_service::ClientService;
use crate::grpc::worker_service::WorkerService;
use crate::master::JobMaster;
use crate::proto::job_master_client_service_server::JobMasterClientServiceServer;
use crate::proto::job_master_worker_service_server::JobMasterWorkerServiceServer;

pub struct GrpcServer {
    addr: SocketAddr,
    master: Arc<JobMaster>,
}

impl GrpcServer {
    pub fn new(addr: SocketAddr, master: Arc<JobMaster>) -> Self {
        Self { addr, master }
    }

    pub async fn run(self) -> Result<(), tonic::transport::Error> {
        let client_service = ClientService::new(Arc::clone(&self.master));
        let worker_service = WorkerService::new(Arc::clone(&self.master));

        tracing::info!(addr = %self.addr, "Starting gRPC server");

        Server::builder()
            .add_service(JobMasterClientServiceServer::new(client_service))
            .add_service(JobMasterWorkerServiceServer::new(worker_service))
            .serve(self.addr)
            .await
    }
}
