/// Lifecycle state shared by plans and tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Created,
    Canceled,
    Failed,
    Running,
    Completed,
}

impl Status {
    /// Terminal states never transition again.
    pub fn is_finished(self) -> bool {
        matches!(self, Status::Canceled | Status::Failed | Status::Completed)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Created => write!(f, "created"),
            Status::Canceled => write!(f, "canceled"),
            Status::Failed => write!(f, "failed"),
            Status::Running => write!(f, "running"),
            Status::Completed => write!(f, "completed"),
        }
    }
}
