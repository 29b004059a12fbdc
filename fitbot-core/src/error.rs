use thiserror::Error;

/// Ways a whole turn can fail. Anything else is degraded and logged.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("message must not be empty")]
    EmptyMessage,

    /// The model call failed or timed out; nothing was written.
    #[error("AI error: {0}")]
    Upstream(String),

    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

impl TurnError {
    pub fn upstream(source: &anyhow::Error) -> Self {
        TurnError::Upstream(format!("{source:#}"))
    }
}
