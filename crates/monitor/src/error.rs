use thiserror::Error;

/// Errors produced by the monitoring library.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("token exchange failed: {0}")]
    Auth(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{tool} exited with code {code}: {stderr}")]
    Process {
        tool: String,
        code: i32,
        stderr: String,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, WatchError>;
