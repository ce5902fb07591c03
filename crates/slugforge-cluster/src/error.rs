use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("cluster API error during {operation}: {message}")]
    Api { operation: String, message: String },

    #[error("timed out after {waited:?} waiting for pod {pod}")]
    DeadlineExceeded { pod: String, waited: Duration },

    #[error("giving up; pod {pod} went into failed status:\n{detail}")]
    PodFailed { pod: String, detail: String },
}

impl ClusterError {
    /// クラスタAPI呼び出しの失敗を操作名つきでラップ
    pub fn api(operation: impl Into<String>, message: impl ToString) -> Self {
        ClusterError::Api {
            operation: operation.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClusterError>;
