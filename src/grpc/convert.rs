//! Conversions between the kernel's wire shapes and the generated proto
//! messages. Serialization of a `JobInfo` branches on its variant.

use tonic::Status as GrpcStatus;

use crate::error::ForemanError;
use crate::master::JobCommand;
use crate::proto;
use crate::wire::{JobInfo, JobServiceSummary, PlanInfo, Status, TaskInfo, WorkerNetAddress};

pub fn status_to_proto(status: Status) -> proto::Status {
    match status {
        Status::Created => proto::Status::Created,
        Status::Canceled => proto::Status::Canceled,
        Status::Failed => proto::Status::Failed,
        Status::Running => proto::Status::Running,
        Status::Completed => proto::Status::Completed,
    }
}

pub fn status_from_proto(status: proto::Status) -> Status {
    match status {
        proto::Status::Canceled => Status::Canceled,
        proto::Status::Failed => Status::Failed,
        proto::Status::Running => Status::Running,
        proto::Status::Completed => Status::Completed,
        proto::Status::Created | proto::Status::Unspecified => Status::Created,
    }
}

/// Builds a report from a heartbeat entry. The worker id and host are
/// stamped by the master from the sender's registration, not trusted from
/// the wire.
pub fn task_info_from_proto(task: proto::TaskInfo) -> TaskInfo {
    let status = proto::Status::try_from(task.status).unwrap_or(proto::Status::Unspecified);
    TaskInfo {
        job_id: task.job_id,
        task_id: task.task_id,
        worker_id: 0,
        worker_host: String::new(),
        status: status_from_proto(status),
        error_message: task.error_message,
        result: task.result,
        last_updated_ms: task.last_updated_ms,
    }
}

/// Serializes a plan or task entry; the message layout branches on the tag.
pub fn job_info_to_proto(info: &JobInfo) -> proto::JobInfo {
    match info {
        JobInfo::Plan(plan) => plan_info_to_proto(plan),
        JobInfo::Task(task) => task_to_job_info(task),
    }
}

fn task_to_job_info(task: &TaskInfo) -> proto::JobInfo {
    proto::JobInfo {
        id: task.job_id,
        name: String::new(),
        description: String::new(),
        status: status_to_proto(task.status) as i32,
        error_message: task.error_message.clone(),
        children: Vec::new(),
        result: task.result.clone(),
        last_updated_ms: task.last_updated_ms,
        r#type: proto::JobType::Task as i32,
        task_id: task.task_id,
        worker_host: task.worker_host.clone(),
    }
}

pub fn plan_info_to_proto(plan: &PlanInfo) -> proto::JobInfo {
    proto::JobInfo {
        id: plan.id,
        name: plan.name.clone(),
        description: plan.description.clone(),
        status: status_to_proto(plan.status) as i32,
        error_message: plan.error_message.clone(),
        children: plan.children.iter().map(task_to_job_info).collect(),
        result: plan.result.clone(),
        last_updated_ms: plan.last_updated_ms,
        r#type: proto::JobType::Plan as i32,
        task_id: 0,
        worker_host: String::new(),
    }
}

pub fn summary_to_proto(summary: &JobServiceSummary) -> proto::JobServiceSummary {
    proto::JobServiceSummary {
        summary_per_status: summary
            .summary_per_status
            .iter()
            .map(|s| proto::StatusSummary {
                status: status_to_proto(s.status) as i32,
                count: s.count as u64,
                jobs: s.jobs.iter().map(plan_info_to_proto).collect(),
            })
            .collect(),
        recent_activities: summary
            .recent_activities
            .iter()
            .map(plan_info_to_proto)
            .collect(),
    }
}

pub fn address_from_proto(address: proto::WorkerNetAddress) -> WorkerNetAddress {
    WorkerNetAddress {
        host: address.host,
        rpc_port: address.rpc_port as u16,
        data_port: address.data_port as u16,
        web_port: address.web_port as u16,
        domain_socket_path: address.domain_socket_path,
    }
}

pub fn command_to_proto(command: JobCommand) -> proto::JobCommand {
    use proto::job_command::Command;

    let command = match command {
        JobCommand::Register => Command::Register(proto::RegisterCommand {}),
        JobCommand::RunTask {
            job_id,
            task_id,
            args,
        } => Command::RunTask(proto::RunTaskCommand {
            job_id,
            task_id,
            args: serde_json::to_vec(&args).unwrap_or_default(),
        }),
        JobCommand::CancelTask { job_id, task_id } => {
            Command::CancelTask(proto::CancelTaskCommand { job_id, task_id })
        }
        JobCommand::Setup => Command::Setup(proto::SetupCommand {}),
    };
    proto::JobCommand {
        command: Some(command),
    }
}

pub fn error_to_status(error: ForemanError) -> GrpcStatus {
    match error {
        ForemanError::PlanDoesNotExist(_) | ForemanError::JobDoesNotExist(_) => {
            GrpcStatus::not_found(error.to_string())
        }
        ForemanError::ResourceExhausted(_) => GrpcStatus::resource_exhausted(error.to_string()),
        ForemanError::InvalidArgument(_) => GrpcStatus::invalid_argument(error.to_string()),
        ForemanError::Internal(_) => GrpcStatus::internal(error.to_string()),
    }
}
