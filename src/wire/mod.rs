//! Plain data shapes exchanged with clients and workers.
//!
//! Everything here is transport-agnostic; the grpc layer converts to and
//! from the generated proto messages.

pub mod plan;
pub mod status;
pub mod summary;
pub mod task;
pub mod worker;

pub use plan::{JobInfo, PlanInfo};
pub use status::Status;
pub use summary::{JobServiceSummary, StatusSummary};
pub use task::TaskInfo;
pub use worker::{WorkerInfo, WorkerNetAddress};
