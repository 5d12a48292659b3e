use std::fmt::Display;

// Custom execution integration layer errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    InvalidConfig(String),
    InvalidEvent(String),
    RpcError(String),
    DecodeError(String),
    TransactionFailed(String),
    Reverted(String),
}

impl Display for ExecutionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for ExecutionError {}
