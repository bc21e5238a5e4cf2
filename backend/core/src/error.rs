use thiserror::Error;

/// Top-level error type for the dripforge runtime.
#[derive(Debug, Error)]
pub enum DripError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("lead not found: {0}")]
    NotFound(String),

    #[error("invalid transition for lead {lead_id}: {message}")]
    InvalidTransition { lead_id: String, message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("template error: {0}")]
    Template(String),

    #[error("discovery error: {0}")]
    Discovery(String),

    #[error("delivery error: {0}")]
    Delivery(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, DripError>;

/// Outcome classification for a failed delivery.
///
/// The scheduler only looks at the variant: `Transient` is retried up to the
/// configured bound, `Permanent` marks the lead failed straight away.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("transient delivery failure: {0}")]
    Transient(String),

    #[error("permanent delivery failure: {0}")]
    Permanent(String),
}

impl DeliveryError {
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(DeliveryError::Permanent("550 no such user".into()).is_permanent());
        assert!(!DeliveryError::Transient("timeout".into()).is_permanent());
    }

    #[test]
    fn display_carries_classification() {
        let err = DeliveryError::Transient("connection reset".into());
        assert_eq!(err.to_string(), "transient delivery failure: connection reset");
    }
}
