use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    #[error("invalid configuration: {field} {reason}")]
    InvalidConfiguration { field: &'static str, reason: String },
    #[error("invalid solver bounds: {0}")]
    SolverBounds(String),
}

impl ProjectionError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ProjectionError::InvalidConfiguration {
            field,
            reason: reason.into(),
        }
    }
}
