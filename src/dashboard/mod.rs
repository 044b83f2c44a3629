//! Read-only JSON dashboard over the job master's state.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{extract::State, response::Html, routing::get, Json, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use crate::master::JobMaster;
use crate::wire::PlanInfo;

#[derive(Clone)]
pub struct DashboardState {
    pub master: Arc<JobMaster>,
}

#[derive(Serialize)]
struct JobResponse {
    id: u64,
    name: String,
    status: String,
    error: String,
    tasks: usize,
    result: Option<String>,
    last_updated_ms: u64,
}

#[derive(Serialize)]
struct WorkerResponse {
    id: u64,
    host: String,
    rpc_port: u16,
    last_updated_ms: u64,
}

#[derive(Serialize)]
struct SummaryGroupResponse {
    status: String,
    count: usize,
    job_ids: Vec<u64>,
}

pub async fn run_dashboard(addr: SocketAddr, state: DashboardState) {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(index_handler))
        .route("/api/jobs", get(list_jobs_handler))
        .route("/api/summary", get(summary_handler))
        .route("/api/workers", get(workers_handler))
        .layer(cors)
        .with_state(state);

    tracing::info!(addr = %addr, "Starting dashboard server");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = %addr, error = %e, "Failed to bind dashboard server");
            return;
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "Dashboard server failed");
    }
}

async fn index_handler() -> Html<&'static str> {
    Html(
        "<html><body><h1>foreman</h1>\
         <ul>\
         <li><a href=\"/api/jobs\">/api/jobs</a></li>\
         <li><a href=\"/api/summary\">/api/summary</a></li>\
         <li><a href=\"/api/workers\">/api/workers</a></li>\
         </ul></body></html>",
    )
}

async fn list_jobs_handler(State(state): State<DashboardState>) -> Json<Vec<JobResponse>> {
    let mut jobs: Vec<JobResponse> = state
        .master
        .get_summary()
        .summary_per_status
        .iter()
        .flat_map(|group| group.jobs.iter().map(job_response))
        .collect();
    jobs.sort_by_key(|j| j.id);
    Json(jobs)
}

async fn summary_handler(State(state): State<DashboardState>) -> Json<Vec<SummaryGroupResponse>> {
    let summary = state.master.get_summary();
    Json(
        summary
            .summary_per_status
            .iter()
            .map(|group| SummaryGroupResponse {
                status: group.status.to_string(),
                count: group.count,
                job_ids: group.jobs.iter().map(|p| p.id).collect(),
            })
            .collect(),
    )
}

async fn workers_handler(State(state): State<DashboardState>) -> Json<Vec<WorkerResponse>> {
    Json(
        state
            .master
            .worker_info_list()
            .into_iter()
            .map(|w| WorkerResponse {
                id: w.id,
                host: w.address.host,
                rpc_port: w.address.rpc_port,
                last_updated_ms: w.last_updated_ms,
            })
            .collect(),
    )
}

fn job_response(plan: &PlanInfo) -> JobResponse {
    JobResponse {
        id: plan.id,
        name: plan.name.clone(),
        status: plan.status.to_string(),
        error: plan.error_message.clone(),
        tasks: plan.children.len(),
        result: plan
            .result
            .as_ref()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned()),
        last_updated_ms: plan.last_updated_ms,
    }
}
