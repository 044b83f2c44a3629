use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForemanError {
    #[error("Plan definition does not exist: {0}")]
    PlanDoesNotExist(String),

    #[error("Job master is at full capacity of {0} jobs")]
    ResourceExhausted(u64),

    #[error("Job does not exist: {0}")]
    JobDoesNotExist(u64),

    #[error("Invalid plan configuration: {0}")]
    InvalidArgument(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, ForemanError>;
