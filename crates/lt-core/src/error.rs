use derive_more::From;
use orion_error::{ErrorCode, StructError, UvsReason};

#[derive(Debug, Clone, PartialEq, thiserror::Error, From)]
pub enum TailReason {
    #[error("validation error")]
    Validation,
    #[error("fatal query error")]
    FatalQuery,
    #[error("retry ceiling exhausted")]
    RetriesExhausted,
    #[error("tail task aborted")]
    Aborted,
    #[error("{0}")]
    Uvs(UvsReason),
}

impl ErrorCode for TailReason {
    fn error_code(&self) -> i32 {
        match self {
            Self::Validation => 1001,
            Self::FatalQuery => 1002,
            Self::RetriesExhausted => 1003,
            Self::Aborted => 1004,
            Self::Uvs(u) => u.error_code(),
        }
    }
}

pub type TailError = StructError<TailReason>;
pub type TailResult<T> = Result<T, TailError>;
