//! Scheduler error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("unknown task class: {0}")]
    UnknownTaskClass(String),

    #[error("invalid priority: {0}")]
    InvalidPriority(String),

    #[error("a parallel group needs at least one task")]
    EmptyGroup,

    #[error("task id already queued or running: {0}")]
    DuplicateTask(String),

    #[error("task not found in any queue: {0}")]
    TaskNotFound(String),

    #[error("routing table error: {0}")]
    Routing(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
