use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use foreman::clock::SystemClock;
use foreman::config::MasterConfig;
use foreman::dashboard::{run_dashboard, DashboardState};
use foreman::grpc::GrpcServer;
use foreman::master::JobMaster;
use foreman::plan::{EchoPlanDefinition, JobServerContext, PlanRegistry};
use foreman::shutdown::install_shutdown_handler;

#[derive(Parser, Debug)]
#[command(name = "foreman")]
#[command(about = "Control-plane job master for a distributed job service")]
struct Args {
    /// Port to listen on for gRPC
    #[arg(long, default_value = "50051")]
    port: u16,

    /// Port for the web dashboard (optional)
    #[arg(long)]
    dashboard_port: Option<u16>,

    /// Maximum number of live jobs
    #[arg(long, default_value = "100")]
    job_capacity: u64,

    /// Minimum retention of finished jobs, in milliseconds
    #[arg(long, default_value = "300000")]
    finished_job_retention_ms: u64,

    /// Maximum finished jobs purged per admission; -1 = unlimited
    #[arg(long, default_value = "-1", allow_hyphen_values = true)]
    finished_job_purge_count: i64,

    /// Interval between lost-worker sweeps, in milliseconds
    #[arg(long, default_value = "1000")]
    lost_worker_interval_ms: u64,

    /// A worker silent longer than this is lost, in milliseconds
    #[arg(long, default_value = "60000")]
    worker_timeout_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let listen_addr: SocketAddr = format!("0.0.0.0:{}", args.port).parse()?;
    let dashboard_addr: Option<SocketAddr> = match args.dashboard_port {
        Some(p) => Some(format!("0.0.0.0:{}", p).parse()?),
        None => None,
    };

    let config = MasterConfig {
        listen_addr,
        job_capacity: args.job_capacity,
        finished_job_retention_ms: args.finished_job_retention_ms,
        finished_job_purge_count: args.finished_job_purge_count,
        lost_worker_interval_ms: args.lost_worker_interval_ms,
        worker_timeout_ms: args.worker_timeout_ms,
    };

    let mut registry = PlanRegistry::new();
    registry.register("echo", Arc::new(EchoPlanDefinition));
    let context = JobServerContext::new(Arc::new(registry));

    tracing::info!(
        listen_addr = %config.listen_addr,
        dashboard_addr = ?dashboard_addr,
        job_capacity = config.job_capacity,
        "Starting foreman job master"
    );

    let master = JobMaster::new(config.clone(), context, Arc::new(SystemClock));
    master.start();

    if let Some(dashboard_addr) = dashboard_addr {
        let state = DashboardState {
            master: Arc::clone(&master),
        };
        tokio::spawn(async move {
            run_dashboard(dashboard_addr, state).await;
        });
    }

    let shutdown = install_shutdown_handler();
    let server = GrpcServer::new(config.listen_addr, Arc::clone(&master));

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "gRPC server failed");
            }
        }
        _ = shutdown.cancelled() => {
            tracing::info!("Shutting down");
        }
    }
    master.stop();

    Ok(())
}
