#[derive(Debug, thiserror::Error)]
pub enum CohortError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid age range: minimum {min} is greater than maximum {max}")]
    InvalidAgeRange { min: u32, max: u32 },
    #[error("age {0} is outside the supported range 0-{max}", max = crate::constants::MAX_AGE)]
    AgeOutOfBounds(u32),
    #[error("a cohort submission is already in progress")]
    AlreadySubmitting,

    #[error("request failed: {0}")]
    Transport(Box<dyn std::error::Error + Send + Sync>),
    #[error("server responded with status {0}")]
    UnexpectedStatus(u16),
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("terminology error: {0}")]
    Snomed(#[from] snomed::SnomedError),
    #[error("failed to serialize cohort definition: {0}")]
    Serialization(serde_json::Error),
}

pub type CohortResult<T> = std::result::Result<T, CohortError>;
