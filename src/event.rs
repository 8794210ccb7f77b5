use serde::{Deserialize, Serialize};

use crux_kv::KeyValueOutput;

use crate::model::{SortKey, StatusFilter};
use crate::settings::Provider;

type HttpResult = crux_http::Result<crux_http::Response<Vec<u8>>>;

/// Everything that can happen to the core: user actions from the shell,
/// plus capability responses. HTTP results are runtime-only and skipped
/// for serialization, like the other Crux apps do.
#[derive(Serialize, Deserialize)]
pub enum Event {
    /// Shell start-up; loads persisted settings.
    Started,
    SettingsLoaded(KeyValueOutput),

    // --- Case list ---
    /// List screen mounted: parameters reset to defaults, load begins.
    CaseListOpened,
    /// List screen torn down: any in-flight load result is discarded.
    CaseListClosed,
    RefreshRequested,
    /// Credential-store answer for a pending case load.
    CaseTokenLoaded(KeyValueOutput),
    #[serde(skip)]
    CasesFetched(HttpResult),
    FilterChanged(StatusFilter),
    SortChanged(SortKey),

    // --- Settings form ---
    ProviderSelected(Provider),
    ModelSelected(String),
    TemperatureChanged(f64),
    MaxTokensChanged(u32),
    ApiUrlChanged(String),
    DarkModeToggled(bool),

    // --- Settings persistence ---
    SaveRequested,
    SettingsPersisted(KeyValueOutput),
    /// Credential-store answer for the post-save remote mirror.
    MirrorTokenLoaded(KeyValueOutput),
    #[serde(skip)]
    SettingsMirrored(HttpResult),

    // --- Connectivity probe ---
    ConnectionTestRequested,
    #[serde(skip)]
    ProbeCompleted(HttpResult),

    BannerDismissed,
}
