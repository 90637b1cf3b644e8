use thiserror::Error;

use crate::contract::error::PlatformError;

#[derive(Error, Debug, Clone)]
pub enum DomainError {
    /// Caller-supplied data failed validation; nothing was sent to the platform.
    #[error("{message}")]
    Validation { message: String },

    #[error("{message}")]
    Forbidden { message: String },

    /// A platform call failed. `context` describes the failed step and is
    /// prepended to the platform's own message when non-empty.
    #[error("{}", render_platform(context, source))]
    Platform {
        context: String,
        #[source]
        source: PlatformError,
    },
}

fn render_platform(context: &str, source: &PlatformError) -> String {
    if context.is_empty() {
        source.to_string()
    } else {
        format!("{context}. Error: {source}")
    }
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn invalid_field(field: &str) -> Self {
        Self::validation(format!("error: {field} is not valid"))
    }

    pub fn invalid_body() -> Self {
        Self::validation("invalid request body")
    }

    pub fn secret_mismatch() -> Self {
        Self::Forbidden {
            message: "request URL: secret did not match".to_string(),
        }
    }

    /// Platform failure with a free-form context, e.g. "Invalid team name".
    pub fn platform(context: impl Into<String>, source: PlatformError) -> Self {
        Self::Platform {
            context: context.into(),
            source,
        }
    }

    /// Platform failure of a named action: "Failed to <action>. Error: ...".
    pub fn failed(action: &str, source: PlatformError) -> Self {
        Self::platform(format!("Failed to {action}"), source)
    }

    /// HTTP status this error maps to.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::Forbidden { .. } => 403,
            Self::Platform { source, .. } => source.status_code,
        }
    }
}
