use serde::{Deserialize, Serialize};

use crux_http::HttpError;
use crux_kv::KeyValueOutput;

use crate::capabilities::Capabilities;
use crate::event::Event;
use crate::model::{
    Case, CaseStatus, Model, Priority, SortKey, StatusBanner, StatusFilter, ViewParameters,
};
use crate::projection::project;
use crate::settings::Settings;
use crate::{
    format_case_timestamp, AppError, ErrorKind, UserFacingError, AUTH_TOKEN_STORAGE_KEY,
    CASES_PATH, HEALTH_PATH, SETTINGS_PATH, SETTINGS_STORAGE_KEY,
};

type HttpResult = crux_http::Result<crux_http::Response<Vec<u8>>>;

/// Wire envelope of `GET /v1/cases`. A missing `cases` field is tolerated
/// and means an empty collection; anything else malformed fails the parse.
#[derive(Deserialize)]
struct CasesEnvelope {
    #[serde(default)]
    cases: Vec<Case>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CaseListItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: CaseStatus,
    pub status_label: String,
    pub priority: Priority,
    pub priority_label: String,
    pub tags: Vec<String>,
    pub created_display: String,
    pub updated_display: String,
    /// Link-out to the server's case detail; never fetched by the core.
    pub detail_url: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CaseListView {
    pub is_loading: bool,
    pub error: Option<UserFacingError>,
    pub items: Vec<CaseListItem>,
    pub shown_count: usize,
    pub total_count: usize,
    pub filter: StatusFilter,
    pub sort: SortKey,
    pub empty_hint: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ModelOption {
    pub value: String,
    pub label: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SettingsView {
    pub settings: Settings,
    pub model_options: Vec<ModelOption>,
    pub is_saving: bool,
    pub is_testing_connection: bool,
    pub banner: Option<StatusBanner>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ViewModel {
    pub case_list: CaseListView,
    pub settings: SettingsView,
}

#[derive(Default)]
pub struct App;

impl App {
    fn token_from(stored: Option<Vec<u8>>) -> Option<String> {
        let bytes = stored?;
        match String::from_utf8(bytes) {
            Ok(token) if !token.is_empty() => Some(token),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "auth token in credential store is not UTF-8");
                None
            }
        }
    }

    fn validate_base_url(base: &str) -> Result<(), AppError> {
        let parsed = url::Url::parse(base).map_err(|e| {
            AppError::new(ErrorKind::TransportError, format!("Invalid API URL: {base}"))
                .with_internal(e.to_string())
        })?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(AppError::new(
                ErrorKind::TransportError,
                format!("Invalid API URL: {base}"),
            ));
        }
        Ok(())
    }

    fn begin_case_load(model: &mut Model, caps: &Capabilities) {
        model.is_loading = true;
        model.load_error = None;
        caps.key_value
            .read(AUTH_TOKEN_STORAGE_KEY, Event::CaseTokenLoaded);
    }

    fn send_cases_request(
        token: &str,
        model: &Model,
        caps: &Capabilities,
    ) -> Result<(), AppError> {
        let base = model.api_base_url();
        Self::validate_base_url(base)?;

        let auth = format!("Bearer {token}");
        caps.http
            .get(format!("{base}{CASES_PATH}"))
            .header("Authorization", auth.as_str())
            .header("Content-Type", "application/json")
            .send(Event::CasesFetched);
        Ok(())
    }

    /// One load result, classified. Accepts a non-2xx status either as an
    /// `Ok` response or wrapped in the transport error, so the mapping
    /// holds regardless of how the shell's HTTP layer reports it.
    fn parse_cases_result(result: HttpResult) -> Result<Vec<Case>, AppError> {
        match result {
            Ok(mut response) => {
                if !response.status().is_success() {
                    return Err(AppError::from_case_status(u16::from(response.status())));
                }
                let body = response.take_body().unwrap_or_default();
                let envelope: CasesEnvelope =
                    serde_json::from_slice(&body).map_err(|e| {
                        AppError::new(ErrorKind::TransportError, e.to_string())
                    })?;
                Ok(envelope.cases)
            }
            Err(HttpError::Http { code, .. }) => Err(AppError::from_case_status(u16::from(code))),
            Err(e) => Err(AppError::new(ErrorKind::TransportError, e.to_string())),
        }
    }

    fn apply_cases_result(result: HttpResult, model: &mut Model) {
        model.is_loading = false;
        match Self::parse_cases_result(result) {
            Ok(cases) => {
                // Wholesale replacement; the server is the only writer.
                model.cases = cases;
                model.load_error = None;
            }
            Err(e) => {
                tracing::warn!(code = e.code(), "case load failed");
                model.load_error = Some(e);
            }
        }
    }

    fn send_settings_mirror(token: &str, model: &Model, caps: &Capabilities) {
        let base = model.api_base_url();
        if let Err(e) = Self::validate_base_url(base) {
            tracing::warn!(error = %e, "could not sync settings with backend");
            return;
        }

        let auth = format!("Bearer {token}");
        let builder = caps
            .http
            .put(format!("{base}{SETTINGS_PATH}"))
            .header("Authorization", auth.as_str())
            .header("Content-Type", "application/json");

        match builder.body_json(&model.settings) {
            Ok(request) => request.send(Event::SettingsMirrored),
            Err(e) => {
                tracing::warn!(error = %e, "could not sync settings with backend");
            }
        }
    }

    /// The mirror is advisory: every outcome lands here and goes no
    /// further than a log line. A 404 means the backend does not implement
    /// the endpoint, which is fine.
    fn log_mirror_result(result: HttpResult) {
        match result {
            Ok(response) => {
                let status = u16::from(response.status());
                if response.status().is_success() {
                    tracing::debug!(status, "settings synced with backend");
                } else if status == 404 {
                    tracing::debug!("settings endpoint not implemented, sync skipped");
                } else {
                    tracing::warn!(status, "could not sync settings with backend");
                }
            }
            Err(HttpError::Http { code, .. }) if u16::from(code) == 404 => {
                tracing::debug!("settings endpoint not implemented, sync skipped");
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not sync settings with backend");
            }
        }
    }

    fn send_health_probe(model: &Model, caps: &Capabilities) -> Result<(), AppError> {
        let base = model.api_base_url();
        Self::validate_base_url(base).map_err(|e| {
            AppError::new(
                ErrorKind::TransportError,
                "Cannot connect to API. Please check the URL.",
            )
            .with_internal(e.to_string())
        })?;

        // Unauthenticated by design: liveness only.
        caps.http
            .get(format!("{base}{HEALTH_PATH}"))
            .send(Event::ProbeCompleted);
        Ok(())
    }

    fn probe_outcome(result: HttpResult) -> Result<(), AppError> {
        match result {
            Ok(response) if response.status().is_success() => Ok(()),
            Ok(response) => Err(AppError::new(
                ErrorKind::Unreachable,
                response.status().canonical_reason(),
            )),
            Err(HttpError::Http { code, .. }) => Err(AppError::new(
                ErrorKind::Unreachable,
                code.canonical_reason(),
            )),
            Err(e) => Err(AppError::new(
                ErrorKind::TransportError,
                "Cannot connect to API. Please check the URL.",
            )
            .with_internal(e.to_string())),
        }
    }

    fn build_list_item(case: &Case, base: &str, now_ms: u64) -> CaseListItem {
        CaseListItem {
            id: case.id.0.clone(),
            title: case.title.clone(),
            description: case.description.clone(),
            status: case.status,
            status_label: case.status.label().to_string(),
            priority: case.priority,
            priority_label: case.priority.label().to_string(),
            tags: case.tags.clone(),
            created_display: format_case_timestamp(&case.created_at, now_ms),
            updated_display: format_case_timestamp(&case.updated_at, now_ms),
            detail_url: format!("{base}{CASES_PATH}/{}", case.id),
        }
    }

    fn empty_hint(filter: StatusFilter) -> String {
        match filter {
            StatusFilter::All => {
                "Get started by creating a case in the browser extension.".to_string()
            }
            other => format!("No {} cases found.", other.label()),
        }
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        model.touch();

        match event {
            Event::Started => {
                caps.key_value
                    .read(SETTINGS_STORAGE_KEY, Event::SettingsLoaded);
                caps.render.render();
            }

            Event::SettingsLoaded(output) => {
                if let KeyValueOutput::Read(stored) = output {
                    model.settings = match stored {
                        Some(bytes) => Settings::from_stored_bytes(&bytes),
                        None => Settings::default(),
                    };
                }
                caps.render.render();
            }

            Event::CaseListOpened => {
                model.case_list_open = true;
                model.view_params = ViewParameters::default();
                Self::begin_case_load(model, caps);
                caps.render.render();
            }

            Event::CaseListClosed => {
                model.case_list_open = false;
                model.is_loading = false;
            }

            Event::RefreshRequested => {
                if model.case_list_open {
                    Self::begin_case_load(model, caps);
                }
                caps.render.render();
            }

            Event::CaseTokenLoaded(output) => {
                let KeyValueOutput::Read(stored) = output else {
                    return;
                };
                if !model.case_list_open {
                    // List torn down while the credential read was pending.
                    return;
                }
                match Self::token_from(stored) {
                    Some(token) => {
                        if let Err(e) = Self::send_cases_request(&token, model, caps) {
                            model.is_loading = false;
                            model.load_error = Some(e);
                        }
                    }
                    None => {
                        model.is_loading = false;
                        model.load_error = Some(AppError::new(
                            ErrorKind::Unauthenticated,
                            "no auth token in credential store",
                        ));
                    }
                }
                caps.render.render();
            }

            Event::CasesFetched(result) => {
                if model.case_list_open {
                    Self::apply_cases_result(result, model);
                }
                caps.render.render();
            }

            Event::FilterChanged(filter) => {
                model.view_params.filter = filter;
                caps.render.render();
            }

            Event::SortChanged(sort) => {
                model.view_params.sort = sort;
                caps.render.render();
            }

            Event::ProviderSelected(provider) => {
                model.settings.llm.set_provider(provider);
                caps.render.render();
            }

            Event::ModelSelected(value) => {
                if let Err(e) = model.settings.llm.set_model(value) {
                    tracing::debug!(error = %e, "rejected model selection");
                }
                caps.render.render();
            }

            Event::TemperatureChanged(value) => {
                if let Err(e) = model.settings.llm.set_temperature(value) {
                    tracing::debug!(error = %e, "rejected temperature edit");
                }
                caps.render.render();
            }

            Event::MaxTokensChanged(value) => {
                if let Err(e) = model.settings.llm.set_max_tokens(value) {
                    tracing::debug!(error = %e, "rejected max_tokens edit");
                }
                caps.render.render();
            }

            Event::ApiUrlChanged(value) => {
                model.settings.api_url = value.trim().to_string();
                caps.render.render();
            }

            Event::DarkModeToggled(on) => {
                model.settings.dark_mode = on;
                caps.render.render();
            }

            Event::SaveRequested => {
                model.is_saving = true;
                model.banner = None;
                match serde_json::to_vec(&model.settings) {
                    Ok(bytes) => {
                        // The local write is the save's success criterion;
                        // mirroring only starts once it has landed.
                        caps.key_value
                            .write(SETTINGS_STORAGE_KEY, bytes, Event::SettingsPersisted);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to serialize settings");
                        model.is_saving = false;
                        model.banner = Some(StatusBanner::error(
                            AppError::new(ErrorKind::PersistenceError, e.to_string())
                                .user_facing_message(),
                        ));
                    }
                }
                caps.render.render();
            }

            Event::SettingsPersisted(output) => {
                let KeyValueOutput::Write(ok) = output else {
                    return;
                };
                model.is_saving = false;
                if ok {
                    model.banner = Some(StatusBanner::success("Settings saved successfully!"));
                    caps.key_value
                        .read(AUTH_TOKEN_STORAGE_KEY, Event::MirrorTokenLoaded);
                } else {
                    model.banner = Some(StatusBanner::error(
                        AppError::new(ErrorKind::PersistenceError, "local settings write failed")
                            .user_facing_message(),
                    ));
                }
                caps.render.render();
            }

            Event::MirrorTokenLoaded(output) => {
                let KeyValueOutput::Read(stored) = output else {
                    return;
                };
                // No token means the mirror is skipped entirely; that is
                // not an error.
                if let Some(token) = Self::token_from(stored) {
                    Self::send_settings_mirror(&token, model, caps);
                }
            }

            Event::SettingsMirrored(result) => {
                Self::log_mirror_result(result);
            }

            Event::ConnectionTestRequested => {
                model.is_testing_connection = true;
                model.banner = None;
                if let Err(e) = Self::send_health_probe(model, caps) {
                    model.is_testing_connection = false;
                    model.banner = Some(StatusBanner::error(e.user_facing_message()));
                }
                caps.render.render();
            }

            Event::ProbeCompleted(result) => {
                model.is_testing_connection = false;
                model.banner = Some(match Self::probe_outcome(result) {
                    Ok(()) => StatusBanner::success("Connection successful!"),
                    Err(e) => StatusBanner::error(e.user_facing_message()),
                });
                caps.render.render();
            }

            Event::BannerDismissed => {
                model.banner = None;
                caps.render.render();
            }
        }
    }

    fn view(&self, model: &Model) -> ViewModel {
        let base = model.api_base_url();
        let projected = project(&model.cases, &model.view_params);
        let items: Vec<CaseListItem> = projected
            .iter()
            .map(|case| Self::build_list_item(case, base, model.view_timestamp_ms))
            .collect();

        let empty_hint = if items.is_empty() && !model.is_loading {
            Some(Self::empty_hint(model.view_params.filter))
        } else {
            None
        };

        ViewModel {
            case_list: CaseListView {
                is_loading: model.is_loading,
                error: model.load_error.as_ref().map(UserFacingError::from),
                shown_count: items.len(),
                total_count: model.cases.len(),
                filter: model.view_params.filter,
                sort: model.view_params.sort,
                empty_hint,
                items,
            },
            settings: SettingsView {
                settings: model.settings.clone(),
                model_options: model
                    .settings
                    .llm
                    .provider
                    .model_options()
                    .iter()
                    .map(|(value, label)| ModelOption {
                        value: (*value).to_string(),
                        label: (*label).to_string(),
                    })
                    .collect(),
                is_saving: model.is_saving,
                is_testing_connection: model.is_testing_connection,
                banner: model.banner.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CaseId;
    use crux_core::App as _;
    use crux_http::http::StatusCode;
    use crux_http::testing::ResponseBuilder;

    fn ok_body(json: &str) -> HttpResult {
        Ok(ResponseBuilder::ok().body(json.as_bytes().to_vec()).build())
    }

    fn status_only(status: StatusCode) -> HttpResult {
        let response: crux_http::Response<Vec<u8>> = ResponseBuilder::with_status(status).build();
        Ok(response)
    }

    fn sample_case(id: &str, status: CaseStatus) -> Case {
        Case {
            id: CaseId::new(id),
            title: format!("case {id}"),
            description: "desc".into(),
            status,
            priority: Priority::Medium,
            created_at: "2024-01-15T10:30:00Z".into(),
            updated_at: "2024-01-16T10:30:00Z".into(),
            tags: vec!["network".into()],
        }
    }

    #[test]
    fn parse_success_with_cases() {
        let result = ok_body(
            r#"{"cases": [{
                "id": "c1", "title": "t", "description": "d",
                "status": "open", "priority": "low",
                "created_at": "2024-01-15T10:30:00Z",
                "updated_at": "2024-01-15T10:30:00Z"
            }]}"#,
        );
        let cases = App::parse_cases_result(result).unwrap();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].id, CaseId::new("c1"));
    }

    #[test]
    fn parse_tolerates_missing_cases_field() {
        let cases = App::parse_cases_result(ok_body("{}")).unwrap();
        assert!(cases.is_empty());
    }

    #[test]
    fn parse_rejects_malformed_json_as_transport_error() {
        let err = App::parse_cases_result(ok_body("{nope")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TransportError);
    }

    #[test]
    fn parse_classifies_statuses() {
        let err = App::parse_cases_result(status_only(StatusCode::Unauthorized)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::AuthExpired);

        let err = App::parse_cases_result(status_only(StatusCode::Forbidden)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);

        let err =
            App::parse_cases_result(status_only(StatusCode::InternalServerError)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ServiceUnavailable);
    }

    #[test]
    fn parse_preserves_transport_message() {
        let err =
            App::parse_cases_result(Err(HttpError::Io("connection refused".into()))).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TransportError);
        assert!(err.user_facing_message().contains("connection refused"));
    }

    #[test]
    fn probe_accepts_any_2xx() {
        assert!(App::probe_outcome(status_only(StatusCode::Ok)).is_ok());
        assert!(App::probe_outcome(status_only(StatusCode::NoContent)).is_ok());
    }

    #[test]
    fn probe_reports_status_text_for_non_2xx() {
        let err = App::probe_outcome(status_only(StatusCode::ServiceUnavailable)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unreachable);
        assert_eq!(
            err.user_facing_message(),
            "Connection failed: Service Unavailable"
        );
    }

    #[test]
    fn probe_maps_transport_failure() {
        let err = App::probe_outcome(Err(HttpError::Io("dns failure".into()))).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TransportError);
        assert_eq!(
            err.user_facing_message(),
            "Cannot connect to API. Please check the URL."
        );
    }

    #[test]
    fn token_from_handles_store_contents() {
        assert_eq!(App::token_from(None), None);
        assert_eq!(App::token_from(Some(Vec::new())), None);
        assert_eq!(
            App::token_from(Some(b"tok-123".to_vec())),
            Some("tok-123".to_string())
        );
        assert_eq!(App::token_from(Some(vec![0xff, 0xfe])), None);
    }

    #[test]
    fn validate_base_url_requires_http_scheme() {
        assert!(App::validate_base_url("http://localhost:8000").is_ok());
        assert!(App::validate_base_url("https://api.faultmaven.io").is_ok());
        assert!(App::validate_base_url("ftp://files").is_err());
        assert!(App::validate_base_url("not a url").is_err());
    }

    #[test]
    fn view_projects_counts_and_links() {
        let mut model = Model::default();
        model.cases = vec![
            sample_case("c1", CaseStatus::Open),
            sample_case("c2", CaseStatus::Closed),
        ];
        model.view_params.filter = StatusFilter::Open;

        let vm = App::default().view(&model);
        assert_eq!(vm.case_list.shown_count, 1);
        assert_eq!(vm.case_list.total_count, 2);
        assert_eq!(
            vm.case_list.items[0].detail_url,
            format!("{}/v1/cases/c1", model.api_base_url())
        );
        assert!(vm.case_list.empty_hint.is_none());
    }

    #[test]
    fn view_empty_hint_tracks_filter() {
        let mut model = Model::default();
        let vm = App::default().view(&model);
        assert_eq!(
            vm.case_list.empty_hint.as_deref(),
            Some("Get started by creating a case in the browser extension.")
        );

        model.view_params.filter = StatusFilter::InProgress;
        let vm = App::default().view(&model);
        assert_eq!(
            vm.case_list.empty_hint.as_deref(),
            Some("No in progress cases found.")
        );
    }

    #[test]
    fn view_exposes_current_provider_options() {
        let mut model = Model::default();
        model.settings.llm.set_provider(crate::Provider::Anthropic);
        let vm = App::default().view(&model);
        let values: Vec<&str> = vm
            .settings
            .model_options
            .iter()
            .map(|o| o.value.as_str())
            .collect();
        assert_eq!(values, vec!["claude-3-opus", "claude-3-sonnet", "claude-3-haiku"]);
        assert_eq!(vm.settings.model_options[0].label, "Claude 3 Opus");
    }

    #[test]
    fn relabelled_status_in_items() {
        let mut model = Model::default();
        model.cases = vec![sample_case("c1", CaseStatus::InProgress)];
        let vm = App::default().view(&model);
        assert_eq!(vm.case_list.items[0].status_label, "in progress");
    }
}
