//! Audit sink: an append-only NDJSON writer. Grounded
//! in the `Mutex<BufWriter<File>>` / `create_dir_all` / flush-on-write /
//! flush-on-drop idiom this codebase's lineage used for its own
//! append-only conversation log, generalized here to the one-method
//! `AuditSink` port instead of a bespoke conversation-event type.

use async_trait::async_trait;
use exception_platform_application::ports::{AuditError, AuditEvent, AuditSink};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub struct JsonlAuditSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl JsonlAuditSink {
    pub fn new(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, writer: Mutex::new(BufWriter::new(file)) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(serde::Serialize)]
struct AuditLine<'a> {
    event_type: &'a str,
    tenant_id: Option<&'a str>,
    exception_id: Option<&'a str>,
    timestamp: chrono::DateTime<chrono::Utc>,
    data: serde_json::Value,
}

#[async_trait]
impl AuditSink for JsonlAuditSink {
    async fn record(&self, event: AuditEvent) -> Result<(), AuditError> {
        let line = AuditLine {
            event_type: &event.event_type,
            tenant_id: event.tenant_id.as_ref().map(|t| t.as_str()),
            exception_id: event.exception_id.as_ref().map(|e| e.as_str()),
            timestamp: event.timestamp,
            data: event.data.into(),
        };
        let serialized = serde_json::to_string(&line).map_err(|e| AuditError::WriteFailed(e.to_string()))?;

        let mut writer = self.writer.lock().unwrap();
        writeln!(writer, "{serialized}").map_err(|e| AuditError::WriteFailed(e.to_string()))?;
        writer.flush().map_err(|e| AuditError::WriteFailed(e.to_string()))?;
        Ok(())
    }
}

impl Drop for JsonlAuditSink {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}
