use std::sync::Arc;

use tonic::{Request, Response, Status};

use crate::grpc::convert::{error_to_status, job_info_to_proto, summary_to_proto};
use crate::master::JobMaster;
use crate::plan::PlanConfig;
use crate::wire::JobInfo;
use crate::proto::job_master_client_service_server::JobMasterClientService;
use crate::proto::{
    CancelRequest, CancelResponse, GetJobServiceSummaryRequest, GetJobServiceSummaryResponse,
    GetJobStatusRequest, GetJobStatusResponse, ListAllRequest, ListAllResponse, RunRequest,
    RunResponse,
};

/// gRPC surface for job clients.
pub struct ClientService {
    master: Arc<JobMaster>,
}

impl ClientService {
    pub fn new(master: Arc<JobMaster>) -> Self {
        Self { master }
    }
}

#[tonic::async_trait]
impl JobMasterClientService for ClientService {
    async fn run(&self, request: Request<RunRequest>) -> Result<Response<RunResponse>, Status> {
        let req = request.into_inner();
        let config = PlanConfig::from_bytes(&req.plan_config).map_err(error_to_status)?;

        // Admission may trigger outbound calls from the plan expander and
        // must run to completion even if this request is cancelled, so it is
        // detached from the request future.
        let master = Arc::clone(&self.master);
        let job_id = tokio::task::spawn_blocking(move || master.run(config))
            .await
            .map_err(|e| Status::internal(format!("Admission task failed: {}", e)))?
            .map_err(error_to_status)?;

        tracing::info!(job_id, "Plan admitted");
        Ok(Response::new(RunResponse { job_id }))
    }

    async fn cancel(
        &self,
        request: Request<CancelRequest>,
    ) -> Result<Response<CancelResponse>, Status> {
        let req = request.into_inner();
        self.master.cancel(req.job_id).map_err(error_to_status)?;
        Ok(Response::new(CancelResponse {}))
    }

    async fn list_all(
        &self,
        _request: Request<ListAllRequest>,
    ) -> Result<Response<ListAllResponse>, Status> {
        Ok(Response::new(ListAllResponse {
            job_ids: self.master.list(),
        }))
    }

    async fn get_job_status(
        &self,
        request: Request<GetJobStatusRequest>,
    ) -> Result<Response<GetJobStatusResponse>, Status> {
        let req = request.into_inner();
        let info = self.master.get_status(req.job_id).map_err(error_to_status)?;
        Ok(Response::new(GetJobStatusResponse {
            job_info: Some(job_info_to_proto(&JobInfo::Plan(info))),
        }))
    }

    async fn get_job_service_summary(
        &self,
        _request: Request<GetJobServiceSummaryRequest>,
    ) -> Result<Response<GetJobServiceSummaryResponse>, Status> {
        let summary = self.master.get_summary();
        Ok(Response::new(GetJobServiceSummaryResponse {
            summary: Some(summary_to_proto(&summary)),
        }))
    }
}
