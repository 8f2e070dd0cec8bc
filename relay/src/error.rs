/// Relay operation result.
pub type RelayResult<T, E = RelayError> = ::core::result::Result<T, E>;

/// Relay operation error.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("{requested} actions were requested, but at most {limit} fit into one relay call")]
    LimitExceeded { requested: usize, limit: usize },
    #[error("contract state init is unknown")]
    NoStateInit,
    #[error("getter `{method}` failed with exit code {exit_code}")]
    GetterFailed { method: &'static str, exit_code: i32 },
    #[error("getter `{method}` returned an unexpected stack")]
    UnexpectedStack { method: &'static str },
    #[error("cell error: {0}")]
    Cell(#[from] tycho_types::error::Error),
    #[error("dispatch failed")]
    Dispatch(#[from] anyhow::Error),
}

impl RelayError {
    /// Fails with [`RelayError::LimitExceeded`] if `requested` is above `limit`.
    #[inline]
    pub fn check_limit(requested: usize, limit: usize) -> RelayResult<()> {
        if requested > limit {
            Err(Self::LimitExceeded { requested, limit })
        } else {
            Ok(())
        }
    }
}
