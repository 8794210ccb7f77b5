#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod app;
pub mod capabilities;
pub mod event;
pub mod model;
pub mod projection;
pub mod settings;

use serde::{Deserialize, Serialize};

pub use app::{App, CaseListItem, CaseListView, ModelOption, SettingsView, ViewModel};
pub use capabilities::{Capabilities, Effect};
pub use event::Event;
pub use model::{Case, CaseId, CaseStatus, Model, Priority, SortKey, StatusFilter, ViewParameters};
pub use settings::{LlmConfig, Provider, Settings};

/// Build-time default for the API base URL, matching the shell's
/// `VITE_API_URL` fallback. The settings screen can override it per session.
pub const DEFAULT_API_URL: &str = match option_env!("FAULTMAVEN_API_URL") {
    Some(url) => url,
    None => "http://localhost:8000",
};

pub const SETTINGS_STORAGE_KEY: &str = "faultmaven_settings";
pub const AUTH_TOKEN_STORAGE_KEY: &str = "auth_token";

pub const CASES_PATH: &str = "/v1/cases";
pub const SETTINGS_PATH: &str = "/v1/settings";
pub const HEALTH_PATH: &str = "/health";

pub const TEMPERATURE_MIN: f64 = 0.0;
pub const TEMPERATURE_MAX: f64 = 1.0;
pub const MAX_TOKENS_MIN: u32 = 100;
pub const MAX_TOKENS_MAX: u32 = 8000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// No token in the credential store; no request was made.
    Unauthenticated,
    /// The server rejected the token (401).
    AuthExpired,
    /// The token is valid but lacks access (403).
    Forbidden,
    /// Any other non-2xx from the cases endpoint.
    ServiceUnavailable,
    /// Network-level failure, or a body that failed to parse.
    TransportError,
    /// The local settings write failed.
    PersistenceError,
    /// The health probe got a non-2xx answer.
    Unreachable,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::AuthExpired => "AUTH_EXPIRED",
            Self::Forbidden => "FORBIDDEN",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::TransportError => "TRANSPORT_ERROR",
            Self::PersistenceError => "PERSISTENCE_ERROR",
            Self::Unreachable => "UNREACHABLE",
        }
    }
}

/// Failure surfaced to a view. Every kind is recoverable by an explicit
/// user action (refresh, save again, re-test the connection), so there is
/// no severity ladder here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
    pub internal_message: Option<String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            internal_message: None,
        }
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::Unauthenticated => "Authentication required. Please log in.".into(),
            ErrorKind::AuthExpired => "Authentication failed. Please log in again.".into(),
            ErrorKind::Forbidden => "You do not have permission to access cases.".into(),
            ErrorKind::ServiceUnavailable => {
                "Failed to fetch cases. Please try again later.".into()
            }
            ErrorKind::TransportError => self.message.clone(),
            ErrorKind::PersistenceError => "Failed to save settings. Please try again.".into(),
            ErrorKind::Unreachable => format!("Connection failed: {}", self.message),
        }
    }

    /// Classify a non-2xx status from the cases endpoint.
    #[must_use]
    pub fn from_case_status(status: u16) -> Self {
        let kind = match status {
            401 => ErrorKind::AuthExpired,
            403 => ErrorKind::Forbidden,
            _ => ErrorKind::ServiceUnavailable,
        };
        Self::new(kind, format!("HTTP {status}"))
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

/// Failure shape handed to the shell inside the view model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserFacingError {
    pub message: String,
    pub error_code: String,
}

impl From<&AppError> for UserFacingError {
    fn from(e: &AppError) -> Self {
        Self {
            message: e.user_facing_message(),
            error_code: e.code().to_string(),
        }
    }
}

#[must_use]
pub fn current_time_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Epoch milliseconds of an ISO-8601 timestamp, if it parses.
#[must_use]
pub fn parse_timestamp_ms(value: &str) -> Option<i64> {
    chrono::DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.timestamp_millis())
}

/// Relative display of a case timestamp: minutes, hours, then days,
/// falling back to a plain date after a week. Unparseable input is shown
/// verbatim rather than dropped.
#[must_use]
pub fn format_case_timestamp(value: &str, now_ms: u64) -> String {
    let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(value) else {
        return value.to_string();
    };

    let diff_ms = i64::try_from(now_ms)
        .unwrap_or(i64::MAX)
        .saturating_sub(parsed.timestamp_millis());
    if diff_ms < 0 {
        return "Just now".into();
    }

    let diff_mins = diff_ms / 60_000;
    if diff_mins < 60 {
        return format!("{diff_mins}m ago");
    }

    let diff_hours = diff_ms / 3_600_000;
    if diff_hours < 24 {
        return format!("{diff_hours}h ago");
    }

    let diff_days = diff_ms / 86_400_000;
    if diff_days < 7 {
        return format!("{diff_days}d ago");
    }

    parsed.format("%Y-%m-%d").to_string()
}
