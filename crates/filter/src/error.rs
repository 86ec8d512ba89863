use thiserror::Error;

/// Errors raised while compiling a filter.
#[derive(Debug, Error)]
pub enum FilterError {
    /// The filter is malformed or asks for something the schema does not allow.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid compiler options: {0}")]
    Options(#[from] serde_json::Error),
}

impl FilterError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        FilterError::InvalidQuery(reason.into())
    }
}
