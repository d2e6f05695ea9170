//! Structured error bodies shared by the HTTP surfaces of the marketplace
//! backend.
//!
//! Every non-2xx JSON response carries an [`ErrorResponse`]. Clients route on
//! `code` (stable, machine readable) and show `message` to the user.

use serde::{Deserialize, Serialize};

/// Unified API error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable error code, e.g. `NOT_CONVERSATION_PARTICIPANT`.
    pub code: String,

    /// Human readable explanation.
    pub message: String,

    /// HTTP status code mirrored into the body.
    pub status: u16,

    /// Error family, one of the constants in [`error_types`].
    pub error_type: String,

    /// Optional details, only populated outside production.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,

    /// Request trace id for log correlation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,

    /// RFC 3339 timestamp.
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(code: &str, message: &str, status: u16, error_type: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            status,
            error_type: error_type.to_string(),
            details: None,
            trace_id: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn with_details(mut self, details: String) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_trace_id(mut self, trace_id: String) -> Self {
        self.trace_id = Some(trace_id);
        self
    }
}

/// Error codes used by the messaging endpoints.
pub mod error_codes {
    // Authentication
    pub const AUTHENTICATION_FAILED: &str = "AUTHENTICATION_FAILED";

    // Validation
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";

    // Messaging
    pub const NOT_CONVERSATION_PARTICIPANT: &str = "NOT_CONVERSATION_PARTICIPANT";
    pub const USER_NOT_FOUND: &str = "USER_NOT_FOUND";

    // Database/System
    pub const PERSISTENCE_ERROR: &str = "PERSISTENCE_ERROR";
    pub const INTERNAL_SERVER_ERROR: &str = "INTERNAL_SERVER_ERROR";
    pub const SERVICE_UNAVAILABLE: &str = "SERVICE_UNAVAILABLE";
}

/// Error families.
pub mod error_types {
    pub const VALIDATION_ERROR: &str = "validation_error";
    pub const AUTHENTICATION_ERROR: &str = "authentication_error";
    pub const AUTHORIZATION_ERROR: &str = "authorization_error";
    pub const NOT_FOUND_ERROR: &str = "not_found_error";
    pub const SERVER_ERROR: &str = "server_error";
}
