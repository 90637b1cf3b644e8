use serde::Deserialize;
use thiserror::Error;

/// Failure reported by the chat platform for a single capability call.
///
/// Mirrors the platform's application error envelope so the gateway can
/// surface the original status code and message to its own caller.
#[derive(Error, Debug, Clone, PartialEq, Eq, Deserialize)]
#[error("{}", self.render())]
pub struct PlatformError {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub detailed_error: String,
    #[serde(default = "internal_status")]
    pub status_code: u16,
}

fn internal_status() -> u16 {
    500
}

impl PlatformError {
    pub fn new(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            message: message.into(),
            detailed_error: String::new(),
            status_code,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detailed_error = detail.into();
        self
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(500, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code == 404
    }

    fn render(&self) -> String {
        if self.detailed_error.is_empty() {
            self.message.clone()
        } else {
            format!("{}, {}", self.message, self.detailed_error)
        }
    }
}
