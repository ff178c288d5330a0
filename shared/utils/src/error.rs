use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum ReportError {
    #[error("Authentication error: {message}")]
    Authentication { message: String },

    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Document unreadable: {message}")]
    DocumentUnreadable { message: String },

    #[error("Extraction error: {message}")]
    Extraction { message: String },

    #[error("Forwarding error after {attempts} attempt(s): {message}")]
    Forwarding { message: String, attempts: u32 },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl ReportError {
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn document_unreadable(message: impl Into<String>) -> Self {
        Self::DocumentUnreadable {
            message: message.into(),
        }
    }

    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction {
            message: message.into(),
        }
    }

    pub fn forwarding(message: impl Into<String>, attempts: u32) -> Self {
        Self::Forwarding {
            message: message.into(),
            attempts,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Authentication { .. } => "AUTHENTICATION_ERROR",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::DocumentUnreadable { .. } => "DOCUMENT_UNREADABLE",
            Self::Extraction { .. } => "EXTRACTION_ERROR",
            Self::Forwarding { .. } => "FORWARDING_ERROR",
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::Internal { .. } => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::Authentication { .. } => 401,
            Self::Validation { .. } => 400,
            Self::DocumentUnreadable { .. } => 400,
            Self::Extraction { .. } => 422,
            Self::Forwarding { .. } => 502,
            Self::Configuration { .. } => 500,
            Self::Internal { .. } => 500,
        }
    }
}

pub type ReportResult<T> = Result<T, ReportError>;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub message: String,
}

impl From<ReportError> for ErrorResponse {
    fn from(error: ReportError) -> Self {
        Self {
            error: error.to_string(),
            code: error.error_code().to_string(),
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for ReportError {
    fn from(error: serde_json::Error) -> Self {
        Self::internal(error.to_string())
    }
}
