use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    /// The distance matrix or coordinates can't be planned on. Raised before
    /// any search work is done.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// A size guard tripped, the search was refused or aborted.
    #[error("Planner {strategy} gave up: {reason}")]
    ResourceExceeded { strategy: String, reason: String },
}

impl PlanError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        PlanError::InvalidInput(reason.into())
    }

    pub fn exceeded(strategy: &str, reason: impl Into<String>) -> Self {
        PlanError::ResourceExceeded {
            strategy: strategy.to_string(),
            reason: reason.into(),
        }
    }
}
