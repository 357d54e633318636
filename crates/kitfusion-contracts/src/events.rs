use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Everything a session records in `events.jsonl`. The variant name becomes
/// the `type` field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    SessionStarted {
        out_dir: String,
        client: String,
        model: Option<String>,
    },
    SlotChanged {
        slot: &'static str,
        from: &'static str,
        to: &'static str,
        mime: Option<String>,
    },
    CameraFailed {
        slot: &'static str,
        kind: &'static str,
        message: String,
    },
    FilterSelected {
        filter: &'static str,
        css: String,
    },
    GenerationStarted {
        client: String,
        model: Option<String>,
        shot: String,
        scene: String,
        person_mime: String,
        garment_mime: String,
    },
    GenerationSucceeded {
        receipt: Option<String>,
        latency_s: f64,
        mime: String,
        bytes: usize,
    },
    GenerationFailed {
        receipt: Option<String>,
        latency_s: f64,
        kind: &'static str,
        message: String,
    },
    ExportCreated {
        path: String,
        filter: &'static str,
    },
    SessionFinished {
        state: &'static str,
        abandoned_request: bool,
    },
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SessionStarted { .. } => "session_started",
            Self::SlotChanged { .. } => "slot_changed",
            Self::CameraFailed { .. } => "camera_failed",
            Self::FilterSelected { .. } => "filter_selected",
            Self::GenerationStarted { .. } => "generation_started",
            Self::GenerationSucceeded { .. } => "generation_succeeded",
            Self::GenerationFailed { .. } => "generation_failed",
            Self::ExportCreated { .. } => "export_created",
            Self::SessionFinished { .. } => "session_finished",
        }
    }
}

#[derive(Serialize)]
struct EventLine<'a> {
    #[serde(flatten)]
    event: &'a SessionEvent,
    session_id: &'a str,
    ts: String,
}

/// Session-scoped `events.jsonl`. The log file is opened when the session
/// starts and every line carries the session id minted here.
#[derive(Debug, Clone)]
pub struct SessionLog {
    inner: Arc<SessionLogInner>,
}

#[derive(Debug)]
struct SessionLogInner {
    path: PathBuf,
    session_id: String,
    file: Mutex<File>,
}

impl SessionLog {
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        Ok(Self {
            inner: Arc::new(SessionLogInner {
                path,
                session_id: Uuid::new_v4().to_string(),
                file: Mutex::new(file),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    /// Appends one compact JSON line for `event`.
    pub fn record(&self, event: &SessionEvent) -> anyhow::Result<()> {
        let line = serde_json::to_string(&EventLine {
            event,
            session_id: &self.inner.session_id,
            ts: now_utc_iso(),
        })?;
        let mut file = self
            .inner
            .file
            .lock()
            .map_err(|_| anyhow::anyhow!("session log lock poisoned"))?;
        writeln!(file, "{line}")
            .with_context(|| format!("failed to append to {}", self.inner.path.display()))?;
        Ok(())
    }
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}
