use thiserror::Error;

use crate::types::{CustomerId, DecisionReason, LoanId};

#[derive(Error, Debug)]
pub enum CreditError {
    #[error("customer not found: {id}")]
    CustomerNotFound {
        id: CustomerId,
    },

    #[error("loan not found: {id}")]
    LoanNotFound {
        id: LoanId,
    },

    #[error("phone number already registered: {phone_number}")]
    DuplicatePhoneNumber {
        phone_number: String,
    },

    #[error("invalid request: {field}: {message}")]
    InvalidRequest {
        field: &'static str,
        message: String,
    },

    #[error("loan not approved: {reason} (credit score {credit_score})")]
    NotEligible {
        reason: DecisionReason,
        credit_score: u8,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("ingestion failed for {file}: {message}")]
    Ingestion {
        file: String,
        message: String,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CreditError {
    pub(crate) fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        CreditError::InvalidRequest {
            field,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CreditError>;
