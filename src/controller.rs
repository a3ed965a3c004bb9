use crate::collaborators::{CacheReporter, ChartRenderer, Clipboard, Editor, MessagingClient};
use crate::engine::QueryEngine;
use crate::errors::{AppError, AppResult};
use crate::format::{render_table, RenderedTable};
use crate::models::{
    BootSummary, CacheStats, ChartKind, ColumnInfo, ControllerPhase, PublishNoteResponse,
    QueryResult, QueryTemplate, ShareResponse, ShareableState, StorageQuota, ViewKind, ViewMode,
    ViewState, SHARE_STATE_VERSION,
};
use crate::{share, templates};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const CHART_CONTAINER: &str = "result-chart";

/// What the active view renders to. Table and map renderings carry the
/// bounded, escaped grid; chart mode additionally drives the chart
/// collaborator as an effect.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewRendering {
    Empty,
    Table(RenderedTable),
    Chart {
        kind: ChartKind,
        table: RenderedTable,
    },
    Map(RenderedTable),
}

/// Owns the single mutable [`ViewState`] and decides what to (re)render as
/// events arrive. Query execution is the only path that reaches the engine;
/// mode and chart-kind changes are pure re-renders over the cached result.
pub struct ViewController {
    engine: Arc<dyn QueryEngine>,
    editor: Arc<dyn Editor>,
    charts: Arc<dyn ChartRenderer>,
    clipboard: Arc<dyn Clipboard>,
    cache: Arc<dyn CacheReporter>,
    messaging: Option<Arc<dyn MessagingClient>>,
    state: Mutex<ViewState>,
    phase: Mutex<ControllerPhase>,
    default_query: String,
    share_base_url: String,
}

impl ViewController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        engine: Arc<dyn QueryEngine>,
        editor: Arc<dyn Editor>,
        charts: Arc<dyn ChartRenderer>,
        clipboard: Arc<dyn Clipboard>,
        cache: Arc<dyn CacheReporter>,
        messaging: Option<Arc<dyn MessagingClient>>,
        default_query: String,
        share_base_url: String,
    ) -> Self {
        Self {
            engine,
            editor,
            charts,
            clipboard,
            cache,
            messaging,
            state: Mutex::new(ViewState::default()),
            phase: Mutex::new(ControllerPhase::Loading),
            default_query,
            share_base_url,
        }
    }

    pub fn phase(&self) -> ControllerPhase {
        self.phase
            .lock()
            .map(|phase| phase.clone())
            .unwrap_or(ControllerPhase::Error {
                message: "controller phase mutex poisoned".to_string(),
            })
    }

    /// Loading → ready. Decodes the URL fragment, seeds the editor, applies
    /// the shared view kind, pre-matches a template, and auto-executes the
    /// seeded query exactly once iff a token was present. Decode failures
    /// silently fall back to the default query; an empty shared query is
    /// still present state, so it seeds the default text but keeps the
    /// auto-run.
    pub async fn initialize_from_fragment(&self, fragment: Option<&str>) -> BootSummary {
        let decoded = fragment.and_then(share::state_from_fragment);
        let token_present = decoded.is_some();

        let seeded_query = match &decoded {
            Some(state) if !state.query.is_empty() => state.query.clone(),
            _ => self.default_query.clone(),
        };
        self.editor.set_value(&seeded_query);

        if let Some(view_kind) = decoded.as_ref().and_then(|state| state.view_kind) {
            let (mode, chart_kind) = view_kind.into_view();
            if let Ok(mut state) = self.state.lock() {
                state.mode = mode;
                if let Some(kind) = chart_kind {
                    state.chart_kind = kind;
                }
            }
        }

        let matched_template = templates::find_match(&seeded_query).map(|t| t.name.to_string());

        if let Ok(mut phase) = self.phase.lock() {
            *phase = ControllerPhase::Ready;
        }

        if token_present {
            // Failures render inline like any other execution error; boot
            // still completes in the ready phase.
            if let Err(error) = self.execute_query(None).await {
                tracing::warn!(error = %error, "shared query failed on boot");
            }
        }

        let (mode, chart_kind) = {
            let state = self.state.lock();
            match state {
                Ok(state) => (state.mode, state.chart_kind),
                Err(_) => (ViewMode::Table, ChartKind::Bar),
            }
        };

        tracing::info!(
            token_present,
            auto_ran = token_present,
            mode = mode.as_str(),
            "playground initialized"
        );

        BootSummary {
            token_present,
            seeded_query,
            matched_template,
            auto_ran: token_present,
            mode,
            chart_kind,
        }
    }

    /// Executes `sql`, or the current editor text when `None`. Success
    /// updates `last_result` and `last_query` together and re-renders the
    /// active mode; failure clears `last_result`, keeps `last_query` at the
    /// attempted text, and leaves the phase ready. Overlapping executions
    /// are neither queued nor cancelled; completions land in arrival order.
    pub async fn execute_query(&self, sql: Option<String>) -> AppResult<QueryResult> {
        let sql = match sql {
            Some(text) => text,
            None => self.editor.value(),
        };
        let execution_id = Uuid::new_v4();
        tracing::debug!(execution = %execution_id, "query dispatched");

        let engine = self.engine.clone();
        let statement = sql.clone();
        let outcome = tokio::task::spawn_blocking(move || engine.execute_query(&statement))
            .await
            .map_err(|err| AppError::Internal(err.to_string()))?;

        match outcome {
            Ok(result) => {
                if let Ok(mut state) = self.state.lock() {
                    state.last_query = sql;
                    state.last_result = Some(result.clone());
                }
                tracing::info!(
                    execution = %execution_id,
                    rows = result.row_count,
                    elapsed_ms = result.execution_time_ms,
                    "query completed"
                );
                self.render_active_view();
                Ok(result)
            }
            Err(error) => {
                if let Ok(mut state) = self.state.lock() {
                    state.last_query = sql;
                    state.last_result = None;
                }
                tracing::warn!(execution = %execution_id, error = %error, "query failed");
                Err(error)
            }
        }
    }

    /// Pure re-render under the new mode; never reaches the engine.
    pub fn set_view_mode(&self, mode: ViewMode) -> ViewRendering {
        if let Ok(mut state) = self.state.lock() {
            state.mode = mode;
        }
        self.render_active_view()
    }

    /// Records the chart kind; re-renders immediately when chart mode is
    /// active, otherwise the kind takes effect on the next switch.
    pub fn set_chart_kind(&self, kind: ChartKind) -> ViewRendering {
        if let Ok(mut state) = self.state.lock() {
            state.chart_kind = kind;
        }
        self.render_active_view()
    }

    pub fn render_active_view(&self) -> ViewRendering {
        let (mode, kind, result) = match self.state.lock() {
            Ok(state) => (state.mode, state.chart_kind, state.last_result.clone()),
            Err(_) => return ViewRendering::Empty,
        };
        let Some(result) = result else {
            return ViewRendering::Empty;
        };
        let table = render_table(&result);

        match mode {
            ViewMode::Table => {
                self.charts.destroy(CHART_CONTAINER);
                ViewRendering::Table(table)
            }
            ViewMode::Chart => {
                if let Err(error) = self.charts.render(CHART_CONTAINER, kind, &result) {
                    tracing::warn!(error = %error, kind = kind.as_str(), "chart render failed");
                }
                ViewRendering::Chart { kind, table }
            }
            ViewMode::Map => {
                self.charts.destroy(CHART_CONTAINER);
                ViewRendering::Map(table)
            }
        }
    }

    /// Snapshots mode, chart kind, and editor text into a share link and
    /// writes it to the clipboard. A clipboard failure degrades to
    /// `copied: false` so the shell can offer manual copy.
    pub fn share(&self) -> AppResult<ShareResponse> {
        let (mode, chart_kind) = match self.state.lock() {
            Ok(state) => (state.mode, state.chart_kind),
            Err(_) => (ViewMode::Table, ChartKind::Bar),
        };
        let snapshot = ShareableState {
            version: SHARE_STATE_VERSION,
            query: self.editor.value(),
            view_kind: ViewKind::from_view(mode, chart_kind),
            title: None,
        };
        let token = share::encode(&snapshot)?;
        let url = format!("{}#share={token}", self.share_base_url);

        let copied = match self.clipboard.write_text(&url) {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(error = %error, "clipboard write failed, falling back to manual copy");
                false
            }
        };

        Ok(ShareResponse { token, url, copied })
    }

    /// Re-runs the matcher over the current editor text; called on every
    /// edit so the highlighted template tracks free-form changes.
    pub fn matched_template(&self) -> Option<&'static QueryTemplate> {
        templates::find_match(&self.editor.value())
    }

    /// Absence is a normal outcome, not an error.
    pub fn apply_template(&self, name: &str) -> Option<&'static QueryTemplate> {
        let template = templates::template_named(name)?;
        self.editor.set_value(template.sql);
        self.editor.focus();
        Some(template)
    }

    pub fn view_state(&self) -> ViewState {
        self.state
            .lock()
            .map(|state| state.clone())
            .unwrap_or_default()
    }

    pub fn loaded_tables(&self) -> AppResult<Vec<String>> {
        self.engine.loaded_tables()
    }

    pub fn table_schema(&self, table: &str) -> AppResult<Vec<ColumnInfo>> {
        self.engine.table_schema(table)
    }

    pub fn download_chart_png(&self, filename: &str) -> AppResult<()> {
        self.charts.download_png(CHART_CONTAINER, filename)
    }

    pub fn cache_stats(&self) -> AppResult<CacheStats> {
        self.cache.cache_stats()
    }

    pub fn storage_quota(&self) -> AppResult<StorageQuota> {
        self.cache.storage_quota()
    }

    pub fn clear_cache(&self) -> AppResult<()> {
        self.cache.clear_cache()
    }

    pub fn messaging_available(&self) -> bool {
        self.messaging.is_some()
    }

    /// Publishes the current editor query through the optional messaging
    /// collaborator. The shell omits the affordance when no signer was
    /// detected; a direct call reports `UNSUPPORTED`.
    pub fn publish_query_note(&self, comment: &str) -> AppResult<PublishNoteResponse> {
        let Some(client) = &self.messaging else {
            return Err(AppError::Unsupported(
                "No messaging signer detected".to_string(),
            ));
        };
        let query = self.editor.value();
        let summary = query_summary(&query);
        let response = client.publish_query_note(&query, &summary, comment)?;
        tracing::info!(event_id = %response.event_id, "query note published");
        Ok(response)
    }
}

/// First line of the query that is not a `--` comment, for note summaries.
fn query_summary(query: &str) -> String {
    static COMMENT_LINE: once_cell::sync::Lazy<regex::Regex> =
        once_cell::sync::Lazy::new(|| regex::Regex::new(r"^\s*--").expect("valid regex"));

    query
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !COMMENT_LINE.is_match(line))
        .unwrap_or("SQL query")
        .to_string()
}
