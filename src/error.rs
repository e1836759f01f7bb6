use thiserror::Error;

#[derive(Error, Debug)]
pub enum FarmError {
    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Job already exists: {0}")]
    DuplicateJob(String),

    #[error("Host not found: {0}")]
    HostNotFound(String),

    #[error("Invalid job spec '{0}': {1}")]
    InvalidJobSpec(String, String),

    #[error("Invalid host spec '{0}': {1}")]
    InvalidHostSpec(String, String),
}

pub type Result<T> = std::result::Result<T, FarmError>;
