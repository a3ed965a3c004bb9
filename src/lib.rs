pub mod collaborators;
pub mod controller;
pub mod engine;
pub mod errors;
pub mod format;
pub mod models;
pub mod share;
pub mod templates;

use crate::collaborators::{
    BufferEditor, CacheReporter, ChartRenderer, Clipboard, Editor, FileCacheReporter,
    HeadlessChartRenderer, MemoryClipboard, MessagingClient,
};
use crate::controller::ViewController;
use crate::engine::SqliteEngine;
use crate::errors::{AppError, AppResult};
use crate::models::{BootSummary, ControllerPhase, PlaygroundConfig};
use std::path::Path;
use std::sync::Arc;
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// External components the controller talks to. `Default` wires the
/// in-memory implementations; a shell replaces them with real bindings.
/// `messaging` stays `None` when no signer was detected, and the cache
/// reporter defaults to one derived from the configured database path.
pub struct Collaborators {
    pub editor: Arc<dyn Editor>,
    pub charts: Arc<dyn ChartRenderer>,
    pub clipboard: Arc<dyn Clipboard>,
    pub cache: Option<Arc<dyn CacheReporter>>,
    pub messaging: Option<Arc<dyn MessagingClient>>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            editor: Arc::new(BufferEditor::default()),
            charts: Arc::new(HeadlessChartRenderer::default()),
            clipboard: Arc::new(MemoryClipboard::default()),
            cache: None,
            messaging: None,
        }
    }
}

/// Top-level orchestration: boots the engine and controller, runs the URL
/// fragment bootstrap, and exposes the ready (or failed) session.
pub struct Playground {
    controller: Option<Arc<ViewController>>,
    phase: ControllerPhase,
    boot_summary: Option<BootSummary>,
}

impl Playground {
    pub async fn boot(config: PlaygroundConfig, collaborators: Collaborators) -> Self {
        let engine = match &config.db_path {
            Some(path) => SqliteEngine::new(path),
            None => SqliteEngine::in_memory(),
        };
        let engine = match engine {
            Ok(engine) => Arc::new(engine),
            Err(error) => {
                tracing::error!(error = %error, "engine initialization failed");
                return Self {
                    controller: None,
                    phase: ControllerPhase::Error {
                        message: error.to_string(),
                    },
                    boot_summary: None,
                };
            }
        };

        let cache = collaborators
            .cache
            .unwrap_or_else(|| Arc::new(FileCacheReporter::new(config.db_path.clone())));

        let controller = Arc::new(ViewController::new(
            engine,
            collaborators.editor,
            collaborators.charts,
            collaborators.clipboard,
            cache,
            collaborators.messaging,
            config.default_query.clone(),
            config.share_base_url.clone(),
        ));
        let boot_summary = controller
            .initialize_from_fragment(config.fragment.as_deref())
            .await;

        Self {
            controller: Some(controller),
            phase: ControllerPhase::Ready,
            boot_summary: Some(boot_summary),
        }
    }

    pub fn phase(&self) -> ControllerPhase {
        self.phase.clone()
    }

    /// `None` only when boot failed; errored sessions expose no partial
    /// surface and are terminal until a fresh boot.
    pub fn controller(&self) -> Option<Arc<ViewController>> {
        self.controller.clone()
    }

    pub fn boot_summary(&self) -> Option<&BootSummary> {
        self.boot_summary.as_ref()
    }
}

/// Daily-rolling JSON logs under `<data_dir>/logs`, kept alive by a
/// process-wide writer guard. Safe to call more than once.
pub fn init_tracing(data_dir: &Path) -> AppResult<()> {
    let log_dir = data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).map_err(|error| AppError::Io(error.to_string()))?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "playground.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .with_writer(non_blocking)
        .try_init();
    Ok(())
}
