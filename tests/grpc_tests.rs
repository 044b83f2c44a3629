//! End-to-end exercise of the gRPC surface: a real server, a worker client
//! and a job client talking over localhost.


use std::time::Duration;

use foreman::grpc::GrpcServer;
use foreman::plan::PlanConfig;
use foreman::proto::job_master_client_service_client::JobMasterClientServiceClient;
use foreman::proto::job_master_worker_service_client::JobMasterWorkerServiceClient;
use foreman::proto::{
    self, GetJobStatusRequest, HeartbeatRequest, ListAllRequest, RegisterWorkerRequest, RunRequest,
};
use tonic::transport::Channel;

use test_harness::{test_config, test_master};

const PORT: u16 = 50951;

async fn connect_worker_client(endpoint: &'static str) -> JobMasterWorkerServiceClient<Channel> {
    for _ in 0..50 {
        if let Ok(client) = JobMasterWorkerServiceClient::connect(endpoint).await {
            return client;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("gRPC server did not come up on {}", endpoint);
}

#[tokio::test]
async fn test_round_trip_over_the_wire() {
    let (master, _clock) = test_master(test_config(100, 0, -1));
    let addr = format!("127.0.0.1:{}", PORT).parse().unwrap();
    let server = GrpcServer::new(addr, master);
    tokio::spawn(async move {
        let _ = server.run().await;
    });

    let endpoint: &'static str = "http://127.0.0.1:50951";
    let mut worker_client = connect_worker_client(endpoint).await;
    let mut client = JobMasterClientServiceClient::connect(endpoint)
        .await
        .expect("connect job client");

    let worker_id = worker_client
        .register_worker(RegisterWorkerRequest {
            address: Some(proto::WorkerNetAddress {
                host: "host-a".to_string(),
                rpc_port: 41000,
                data_port: 41001,
                web_port: 41002,
                domain_socket_path: String::new(),
            }),
        })
        .await
        .expect("register worker")
        .into_inner()
        .worker_id;

    // Malformed configuration bytes are rejected at the door.
    let bad = client
        .run(RunRequest {
            plan_config: b"not json".to_vec(),
        })
        .await
        .unwrap_err();
    assert_eq!(bad.code(), tonic::Code::InvalidArgument);

    // An unregistered plan name is NOT_FOUND.
    let unknown = client
        .run(RunRequest {
            plan_config: PlanConfig {
                name: "no-such-plan".to_string(),
                options: serde_json::Value::Null,
            }
            .to_bytes(),
        })
        .await
        .unwrap_err();
    assert_eq!(unknown.code(), tonic::Code::NotFound);

    let config = PlanConfig {
        name: "echo".to_string(),
        options: serde_json::json!({"message": "hi"}),
    };
    let job_id = client
        .run(RunRequest {
            plan_config: config.to_bytes(),
        })
        .await
        .expect("run plan")
        .into_inner()
        .job_id;

    // The first heartbeat picks up the start command with its payload.
    let commands = worker_client
        .heartbeat(HeartbeatRequest {
            worker_id,
            task_infos: Vec::new(),
        })
        .await
        .expect("heartbeat")
        .into_inner()
        .commands;
    assert_eq!(commands.len(), 1);
    let run_task = match &commands[0].command {
        Some(proto::job_command::Command::RunTask(cmd)) => cmd.clone(),
        other => panic!("expected a run-task command, got {:?}", other),
    };
    assert_eq!(run_task.job_id, job_id);
    assert_eq!(run_task.task_id, 0);
    let args: serde_json::Value = serde_json::from_slice(&run_task.args).expect("args json");
    assert_eq!(args["message"], "hi");

    // Completion report flows into the plan status.
    worker_client
        .heartbeat(HeartbeatRequest {
            worker_id,
            task_infos: vec![proto::TaskInfo {
                job_id,
                task_id: 0,
                status: proto::Status::Completed as i32,
                error_message: String::new(),
                worker_host: String::new(),
                result: Some(b"echoed".to_vec()),
                last_updated_ms: 0,
            }],
        })
        .await
        .expect("heartbeat");

    let info = client
        .get_job_status(GetJobStatusRequest { job_id })
        .await
        .expect("status")
        .into_inner()
        .job_info
        .expect("job info");
    assert_eq!(info.status, proto::Status::Completed as i32);
    assert_eq!(info.r#type, proto::JobType::Plan as i32);
    assert_eq!(info.name, "echo");
    assert_eq!(info.result.as_deref(), Some(b"echoed".as_slice()));
    assert_eq!(info.children.len(), 1);
    assert_eq!(info.children[0].worker_host, "host-a");

    let ids = client
        .list_all(ListAllRequest {})
        .await
        .expect("list")
        .into_inner()
        .job_ids;
    assert!(ids.contains(&job_id));

    // A status query for an id never issued is NOT_FOUND on the wire.
    let missing = client
        .get_job_status(GetJobStatusRequest { job_id: 1 })
        .await
        .unwrap_err();
    assert_eq!(missing.code(), tonic::Code::NotFound);

    // A heartbeat from a forgotten id is answered with a register command.
    let commands = worker_client
        .heartbeat(HeartbeatRequest {
            worker_id: 424_242,
            task_infos: Vec::new(),
        })
        .await
        .expect("heartbeat")
        .into_inner()
        .commands;
    assert_eq!(commands.len(), 1);
    assert!(matches!(
        commands[0].command,
        Some(proto::job_command::Command::Register(_))
    ));
}
