use thiserror::Error;

use crate::domain::order::OrderStatus;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid order transition from {from:?} to {to:?}")]
    InvalidOrderTransition { from: OrderStatus, to: OrderStatus },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    /// Text that is safe to relay to the customer. Internal detail stays in
    /// the error itself and the structured logs.
    pub fn customer_reply(&self) -> &'static str {
        match self {
            Self::Domain(_) => {
                "I couldn't process that request. Please check the details and try again."
            }
            Self::Persistence(_) | Self::Integration(_) => {
                "I'm having trouble processing your request right now. \
                 Please try again in a moment, or contact our support team."
            }
            Self::Configuration(_) => {
                "Something went wrong on our side. Our team has been notified."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ApplicationError, DomainError};

    #[test]
    fn domain_error_has_user_safe_reply() {
        let error = ApplicationError::from(DomainError::InvariantViolation(
            "order total mismatch".to_owned(),
        ));
        assert!(error.customer_reply().contains("check the details"));
    }

    #[test]
    fn persistence_error_suggests_retry() {
        let error = ApplicationError::Persistence("database lock timeout".to_owned());
        assert!(error.customer_reply().contains("try again"));
        assert!(!error.customer_reply().contains("database"));
    }

    #[test]
    fn integration_error_shares_retry_reply_with_persistence() {
        let persistence = ApplicationError::Persistence("x".to_owned());
        let integration = ApplicationError::Integration("y".to_owned());
        assert_eq!(persistence.customer_reply(), integration.customer_reply());
    }
}
