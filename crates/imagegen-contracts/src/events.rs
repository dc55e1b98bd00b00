use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

pub type EventPayload = Map<String, Value>;

pub const REQUEST_STARTED: &str = "request_started";
pub const BACKEND_SKIPPED: &str = "backend_skipped";
pub const BACKEND_FAILED: &str = "backend_failed";
pub const BACKEND_SUCCEEDED: &str = "backend_succeeded";
pub const PLACEHOLDER_GENERATED: &str = "placeholder_generated";
pub const PLACEHOLDER_FAILED: &str = "placeholder_failed";
pub const REQUEST_FINISHED: &str = "request_finished";

const RESERVED_KEYS: [&str; 3] = ["type", "request_id", "ts"];

/// JSONL audit trail for one request. Each event is one compact object
/// carrying `type`, `request_id` and `ts`; payload keys with those names are
/// ignored.
#[derive(Debug, Clone)]
pub struct EventWriter {
    path: PathBuf,
    request_id: String,
}

impl EventWriter {
    pub fn new(path: impl Into<PathBuf>, request_id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            request_id: request_id.into(),
        }
    }

    pub fn for_new_request(path: impl Into<PathBuf>) -> Self {
        Self::new(path, format!("req-{}", Uuid::new_v4().simple()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Appends one event line and returns the object written.
    pub fn emit(&self, event_type: &str, payload: EventPayload) -> anyhow::Result<Value> {
        let mut event = EventPayload::new();
        event.insert("type".to_string(), Value::from(event_type));
        event.insert("request_id".to_string(), Value::from(self.request_id.as_str()));
        event.insert(
            "ts".to_string(),
            Value::from(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        event.extend(
            payload
                .into_iter()
                .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str())),
        );
        let event = Value::Object(event);

        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        writeln!(file, "{}", serde_json::to_string(&event)?)?;
        Ok(event)
    }
}

/// Every event in a JSONL file, skipping blank or malformed lines.
pub fn read_events(path: &Path) -> anyhow::Result<Vec<Value>> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(raw
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect())
}

/// The `type` of each event, in file order.
pub fn event_types(path: &Path) -> anyhow::Result<Vec<String>> {
    Ok(read_events(path)?
        .iter()
        .filter_map(|event| event.get("type").and_then(Value::as_str))
        .map(str::to_string)
        .collect())
}
