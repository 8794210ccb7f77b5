use serde::{Deserialize, Serialize};
use std::fmt;

use crate::settings::Settings;
use crate::AppError;

/// Opaque server-assigned case identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaseId(pub String);

impl CaseId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl CaseStatus {
    /// Label with the wire underscore replaced, as the dashboard shows it.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in progress",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    /// Fixed sort rank: critical first.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// A remote troubleshooting case. Read-only on this side: the collection is
/// replaced wholesale on every successful load and never patched in place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub id: CaseId,
    pub title: String,
    pub description: String,
    pub status: CaseStatus,
    pub priority: Priority,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl StatusFilter {
    #[must_use]
    pub const fn matches(self, status: CaseStatus) -> bool {
        match self {
            Self::All => true,
            Self::Open => matches!(status, CaseStatus::Open),
            Self::InProgress => matches!(status, CaseStatus::InProgress),
            Self::Resolved => matches!(status, CaseStatus::Resolved),
            Self::Closed => matches!(status, CaseStatus::Closed),
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Open => "open",
            Self::InProgress => "in progress",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Created,
    #[default]
    Updated,
    Priority,
}

/// User-selected filter/sort for the case list. Ephemeral: reset to
/// defaults every time the list mounts, never persisted.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewParameters {
    pub filter: StatusFilter,
    pub sort: SortKey,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BannerKind {
    Success,
    Error,
}

/// Transient outcome message on the settings screen (save / probe result).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusBanner {
    pub kind: BannerKind,
    pub message: String,
}

impl StatusBanner {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: BannerKind::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: BannerKind::Error,
            message: message.into(),
        }
    }
}

/// Whole-core state. The auth token is deliberately absent: it is read from
/// the credential store at the moment of each request and never retained.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Model {
    pub settings: Settings,

    // Case list
    pub cases: Vec<Case>,
    pub view_params: ViewParameters,
    pub case_list_open: bool,
    pub is_loading: bool,
    pub load_error: Option<AppError>,

    // Settings screen
    pub is_saving: bool,
    pub is_testing_connection: bool,
    pub banner: Option<StatusBanner>,

    // Clock sample taken at the top of every update; view() formats
    // relative dates against it.
    pub view_timestamp_ms: u64,
}

impl Default for Model {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            cases: Vec::new(),
            view_params: ViewParameters::default(),
            case_list_open: false,
            is_loading: false,
            load_error: None,
            is_saving: false,
            is_testing_connection: false,
            banner: None,
            view_timestamp_ms: 0,
        }
    }
}

impl Model {
    pub fn touch(&mut self) {
        self.view_timestamp_ms = crate::current_time_ms();
    }

    /// Effective API base URL: the (possibly user-overridden) settings
    /// value, without a trailing slash so paths can be appended directly.
    #[must_use]
    pub fn api_base_url(&self) -> &str {
        self.settings.api_url.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_case_json() -> &'static str {
        r#"{
            "id": "case-1",
            "title": "Router keeps rebooting",
            "description": "Reboot loop every 10 minutes",
            "status": "in_progress",
            "priority": "high",
            "created_at": "2024-01-15T10:30:00Z",
            "updated_at": "2024-01-16T08:00:00Z",
            "tags": ["network", "hardware"]
        }"#
    }

    #[test]
    fn case_deserializes_from_wire_format() {
        let case: Case = serde_json::from_str(sample_case_json()).unwrap();
        assert_eq!(case.id, CaseId::new("case-1"));
        assert_eq!(case.status, CaseStatus::InProgress);
        assert_eq!(case.priority, Priority::High);
        assert_eq!(case.tags, vec!["network", "hardware"]);
    }

    #[test]
    fn case_tags_default_to_empty() {
        let json = r#"{
            "id": "case-2",
            "title": "t",
            "description": "d",
            "status": "open",
            "priority": "low",
            "created_at": "2024-01-15T10:30:00Z",
            "updated_at": "2024-01-15T10:30:00Z"
        }"#;
        let case: Case = serde_json::from_str(json).unwrap();
        assert!(case.tags.is_empty());
    }

    #[test]
    fn unknown_status_fails_the_parse() {
        let json = sample_case_json().replace("in_progress", "escalated");
        assert!(serde_json::from_str::<Case>(&json).is_err());
    }

    #[test]
    fn priority_rank_ordering() {
        assert!(Priority::Critical.rank() < Priority::High.rank());
        assert!(Priority::High.rank() < Priority::Medium.rank());
        assert!(Priority::Medium.rank() < Priority::Low.rank());
    }

    #[test]
    fn filter_matches_exact_status_only() {
        assert!(StatusFilter::All.matches(CaseStatus::Closed));
        assert!(StatusFilter::Open.matches(CaseStatus::Open));
        assert!(!StatusFilter::Open.matches(CaseStatus::Resolved));
    }

    #[test]
    fn view_parameters_default_to_all_and_updated() {
        let params = ViewParameters::default();
        assert_eq!(params.filter, StatusFilter::All);
        assert_eq!(params.sort, SortKey::Updated);
    }

    #[test]
    fn api_base_url_drops_trailing_slash() {
        let mut model = Model::default();
        model.settings.api_url = "http://localhost:8000/".into();
        assert_eq!(model.api_base_url(), "http://localhost:8000");
    }
}
