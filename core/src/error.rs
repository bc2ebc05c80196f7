use thiserror::Error;

#[derive(Error, Debug)]
pub enum RiskError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Scenario '{scenario_id}': variable '{variable}' has {actual} values, horizon is {expected}")]
    InvalidScenario {
        scenario_id: String,
        variable: String,
        expected: usize,
        actual: usize,
    },

    #[error("Exposure '{exposure_id}' is invalid: {reason}")]
    InvalidExposure { exposure_id: String, reason: String },

    #[error("Unsupported export format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Insufficient data: {what}")]
    InsufficientData { what: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type RiskResult<T> = Result<T, RiskError>;
