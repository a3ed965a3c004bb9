use crate::errors::{AppError, AppResult};
use crate::models::{CacheStats, ChartKind, PublishNoteResponse, QueryResult, StorageQuota};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

/// Code-editor collaborator. The shell binds a real editor component; the
/// in-memory [`BufferEditor`] backs headless use and tests.
pub trait Editor: Send + Sync {
    fn value(&self) -> String;
    fn set_value(&self, text: &str);
    fn focus(&self) {}
}

#[derive(Debug, Default)]
pub struct BufferEditor {
    text: Mutex<String>,
}

impl BufferEditor {
    pub fn new(initial: &str) -> Self {
        Self {
            text: Mutex::new(initial.to_string()),
        }
    }
}

impl Editor for BufferEditor {
    fn value(&self) -> String {
        self.text.lock().map(|text| text.clone()).unwrap_or_default()
    }

    fn set_value(&self, text: &str) {
        if let Ok(mut guard) = self.text.lock() {
            *guard = text.to_string();
        }
    }
}

/// Charting collaborator. Rendering correctness is owned by the chart
/// subsystem; the controller only dispatches render/destroy/export effects.
pub trait ChartRenderer: Send + Sync {
    fn render(&self, container: &str, kind: ChartKind, result: &QueryResult) -> AppResult<()>;
    fn destroy(&self, container: &str);
    fn download_png(&self, container: &str, filename: &str) -> AppResult<()>;
}

/// Records render calls instead of drawing; the default shell-less renderer.
#[derive(Debug, Default)]
pub struct HeadlessChartRenderer {
    rendered: Mutex<HashMap<String, ChartKind>>,
}

impl HeadlessChartRenderer {
    pub fn rendered_kind(&self, container: &str) -> Option<ChartKind> {
        self.rendered
            .lock()
            .ok()
            .and_then(|map| map.get(container).copied())
    }
}

impl ChartRenderer for HeadlessChartRenderer {
    fn render(&self, container: &str, kind: ChartKind, _result: &QueryResult) -> AppResult<()> {
        if let Ok(mut map) = self.rendered.lock() {
            map.insert(container.to_string(), kind);
        }
        Ok(())
    }

    fn destroy(&self, container: &str) {
        if let Ok(mut map) = self.rendered.lock() {
            map.remove(container);
        }
    }

    fn download_png(&self, container: &str, _filename: &str) -> AppResult<()> {
        match self.rendered_kind(container) {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound(format!("No chart in {container}"))),
        }
    }
}

pub trait Clipboard: Send + Sync {
    fn write_text(&self, text: &str) -> AppResult<()>;
}

#[derive(Debug, Default)]
pub struct MemoryClipboard {
    content: Mutex<Option<String>>,
}

impl MemoryClipboard {
    pub fn contents(&self) -> Option<String> {
        self.content.lock().ok().and_then(|slot| slot.clone())
    }
}

impl Clipboard for MemoryClipboard {
    fn write_text(&self, text: &str) -> AppResult<()> {
        let mut slot = self
            .content
            .lock()
            .map_err(|_| AppError::Internal("clipboard mutex poisoned".to_string()))?;
        *slot = Some(text.to_string());
        Ok(())
    }
}

/// On-disk cache/quota reporting collaborator.
pub trait CacheReporter: Send + Sync {
    fn cache_stats(&self) -> AppResult<CacheStats>;
    fn storage_quota(&self) -> AppResult<StorageQuota>;
    fn clear_cache(&self) -> AppResult<()>;
}

/// Reports over the engine's database file. In-memory engines have no
/// file, which reads as an empty cache.
#[derive(Debug, Default)]
pub struct FileCacheReporter {
    db_path: Option<PathBuf>,
}

impl FileCacheReporter {
    pub fn new(db_path: Option<PathBuf>) -> Self {
        Self { db_path }
    }
}

impl CacheReporter for FileCacheReporter {
    fn cache_stats(&self) -> AppResult<CacheStats> {
        let Some(path) = &self.db_path else {
            return Ok(CacheStats::default());
        };
        match std::fs::metadata(path) {
            Ok(meta) => {
                let modified = meta.modified().ok().map(chrono::DateTime::<chrono::Utc>::from);
                Ok(CacheStats {
                    file_count: 1,
                    total_size: meta.len(),
                    oldest_entry: modified,
                    newest_entry: modified,
                })
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(CacheStats::default()),
            Err(err) => Err(AppError::Io(err.to_string())),
        }
    }

    fn storage_quota(&self) -> AppResult<StorageQuota> {
        // Quota reporting depends on the host platform; unknown is a valid
        // answer per the contract.
        Ok(StorageQuota {
            usage_percent: None,
        })
    }

    fn clear_cache(&self) -> AppResult<()> {
        let Some(path) = &self.db_path else {
            return Ok(());
        };
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(AppError::Io(err.to_string())),
        }
    }
}

/// Optional signing/relay collaborator, feature-detected at boot. Event
/// signing lives entirely behind this seam.
pub trait MessagingClient: Send + Sync {
    fn connect(&self) -> AppResult<()>;
    fn public_key(&self) -> AppResult<String>;
    fn public_key_bech32(&self) -> AppResult<String>;
    fn publish_query_note(
        &self,
        query: &str,
        summary: &str,
        comment: &str,
    ) -> AppResult<PublishNoteResponse>;
}

#[cfg(test)]
mod tests {
    use super::{BufferEditor, Clipboard, Editor, FileCacheReporter, MemoryClipboard};
    use crate::collaborators::CacheReporter;

    #[test]
    fn buffer_editor_holds_text() {
        let editor = BufferEditor::new("SELECT 1");
        assert_eq!(editor.value(), "SELECT 1");
        editor.set_value("SELECT 2");
        assert_eq!(editor.value(), "SELECT 2");
    }

    #[test]
    fn memory_clipboard_round_trips() {
        let clipboard = MemoryClipboard::default();
        assert_eq!(clipboard.contents(), None);
        clipboard.write_text("token").expect("write");
        assert_eq!(clipboard.contents(), Some("token".to_string()));
    }

    #[test]
    fn pathless_cache_reads_as_empty() {
        let reporter = FileCacheReporter::new(None);
        let stats = reporter.cache_stats().expect("stats");
        assert_eq!(stats.file_count, 0);
        assert_eq!(stats.total_size, 0);
        reporter.clear_cache().expect("clear is a no-op");
    }
}
