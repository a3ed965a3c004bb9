use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const SHARE_STATE_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewMode {
    Table,
    Chart,
    Map,
}

impl ViewMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Chart => "chart",
            Self::Map => "map",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
    Doughnut,
    Scatter,
    Radar,
    PolarArea,
}

impl ChartKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bar => "bar",
            Self::Line => "line",
            Self::Pie => "pie",
            Self::Doughnut => "doughnut",
            Self::Scatter => "scatter",
            Self::Radar => "radar",
            Self::PolarArea => "polarArea",
        }
    }
}

/// The `t` field of a share token: `table` or one of the chart kinds.
/// Absent means `table`. Map mode has no token form and encodes as absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewKind {
    Table,
    Bar,
    Line,
    Pie,
    Doughnut,
    Scatter,
    Radar,
    PolarArea,
}

impl ViewKind {
    pub fn from_view(mode: ViewMode, chart_kind: ChartKind) -> Option<Self> {
        match mode {
            ViewMode::Table | ViewMode::Map => None,
            ViewMode::Chart => Some(match chart_kind {
                ChartKind::Bar => Self::Bar,
                ChartKind::Line => Self::Line,
                ChartKind::Pie => Self::Pie,
                ChartKind::Doughnut => Self::Doughnut,
                ChartKind::Scatter => Self::Scatter,
                ChartKind::Radar => Self::Radar,
                ChartKind::PolarArea => Self::PolarArea,
            }),
        }
    }

    pub fn into_view(self) -> (ViewMode, Option<ChartKind>) {
        match self {
            Self::Table => (ViewMode::Table, None),
            Self::Bar => (ViewMode::Chart, Some(ChartKind::Bar)),
            Self::Line => (ViewMode::Chart, Some(ChartKind::Line)),
            Self::Pie => (ViewMode::Chart, Some(ChartKind::Pie)),
            Self::Doughnut => (ViewMode::Chart, Some(ChartKind::Doughnut)),
            Self::Scatter => (ViewMode::Chart, Some(ChartKind::Scatter)),
            Self::Radar => (ViewMode::Chart, Some(ChartKind::Radar)),
            Self::PolarArea => (ViewMode::Chart, Some(ChartKind::PolarArea)),
        }
    }
}

/// Wire schema of the share token payload: `{v, q, t?, n?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareableState {
    #[serde(rename = "v")]
    pub version: u32,
    #[serde(rename = "q")]
    pub query: String,
    #[serde(rename = "t", skip_serializing_if = "Option::is_none")]
    pub view_kind: Option<ViewKind>,
    #[serde(rename = "n", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl ShareableState {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            version: SHARE_STATE_VERSION,
            query: query.into(),
            view_kind: None,
            title: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
    pub row_count: u64,
    pub execution_time_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub file_count: u32,
    pub total_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_entry: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_entry: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageQuota {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_percent: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemplateCategory {
    Budget,
    Schools,
    Property,
    Government,
    Gis,
}

impl TemplateCategory {
    pub fn label(self) -> &'static str {
        match self {
            Self::Budget => "County Budget",
            Self::Schools => "Schools",
            Self::Property => "Property & Taxes",
            Self::Government => "Government",
            Self::Gis => "Maps & Parcels",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryTemplate {
    pub name: &'static str,
    pub description: &'static str,
    pub sql: &'static str,
    pub category: TemplateCategory,
}

#[derive(Debug, Clone)]
pub struct ViewState {
    pub mode: ViewMode,
    pub chart_kind: ChartKind,
    pub last_result: Option<QueryResult>,
    pub last_query: String,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            mode: ViewMode::Table,
            chart_kind: ChartKind::Bar,
            last_result: None,
            last_query: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "phase", rename_all = "kebab-case")]
pub enum ControllerPhase {
    Loading,
    Ready,
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareResponse {
    pub token: String,
    pub url: String,
    pub copied: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishNoteResponse {
    pub event_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BootSummary {
    pub token_present: bool,
    pub seeded_query: String,
    pub matched_template: Option<String>,
    pub auto_ran: bool,
    pub mode: ViewMode,
    pub chart_kind: ChartKind,
}

#[derive(Debug, Clone)]
pub struct PlaygroundConfig {
    /// Path for the on-disk engine database; `None` opens in memory.
    pub db_path: Option<PathBuf>,
    /// Editor text used when no share token seeds the session.
    pub default_query: String,
    /// Base URL that share links are built on.
    pub share_base_url: String,
    /// URL fragment present at boot, if any (with or without the `#`).
    pub fragment: Option<String>,
}

impl Default for PlaygroundConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            default_query: crate::templates::DEFAULT_QUERY.to_string(),
            share_base_url: "https://playground.county-data.org/".to_string(),
            fragment: None,
        }
    }
}
