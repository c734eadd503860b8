//! # Session Info Decoding
//!
//! The capture embeds the simulator's session YAML (weekend, driver and session
//! details). It is decoded into [`SessionMetadata`]: a flat key/value map of every
//! leaf in the document plus a handful of derived fields the persistence layer needs.
//!
//! Keys are dotted paths with `[i]` sequence indices:
//!
//! ```text
//! WeekendInfo:
//!   TrackName: spa
//! DriverInfo:
//!   Drivers:
//!   - UserName: Jane Doe
//!
//! // Flattened:
//! WeekendInfo.TrackName         = spa
//! DriverInfo.Drivers[0].UserName = Jane Doe
//! ```
//!
//! Metadata never blocks telemetry: missing keys fall back to [`UNKNOWN`], and an
//! unparseable block is reported as [`DecodeError::SessionInfoCorrupt`] which the
//! pipeline downgrades to a warning.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_yaml_ng::Value;
use std::collections::BTreeMap;
use tracing::{debug, trace};

use crate::ibt::format::FormatHeader;
use crate::yaml_utils::{extract_session_yaml, preprocess_session_yaml};
use crate::{DecodeError, Result};

/// Placeholder for metadata the capture does not provide.
pub const UNKNOWN: &str = "unknown";

/// Session metadata decoded from the session info block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionMetadata {
    /// Every leaf of the session YAML keyed by dotted path
    pub values: BTreeMap<String, String>,
    pub track_name: String,
    pub car_name: String,
    pub driver_name: String,
    pub session_type: String,
    /// Session start from the disk sub-header
    pub started_at: Option<DateTime<Utc>>,
    /// Declared channel names, in dictionary order
    pub channels: Vec<String>,
}

impl Default for SessionMetadata {
    fn default() -> Self {
        Self {
            values: BTreeMap::new(),
            track_name: UNKNOWN.to_string(),
            car_name: UNKNOWN.to_string(),
            driver_name: UNKNOWN.to_string(),
            session_type: UNKNOWN.to_string(),
            started_at: None,
            channels: Vec::new(),
        }
    }
}

impl SessionMetadata {
    /// Metadata carrying only what the header itself provides.
    pub fn from_header(header: &FormatHeader) -> Self {
        Self { started_at: start_time(header.disk.start_date), ..Self::default() }
    }

    /// Parse session YAML text. The text is preprocessed first.
    pub fn parse(yaml: &str) -> Result<Self> {
        let cleaned = preprocess_session_yaml(yaml);
        if cleaned.trim().is_empty() {
            return Ok(Self::default());
        }

        let root: Value = serde_yaml_ng::from_str(&cleaned)
            .map_err(|e| DecodeError::SessionInfoCorrupt { details: e.to_string() })?;

        let root = match root {
            Value::Mapping(_) => root,
            Value::Null => return Ok(Self::default()),
            other => {
                return Err(DecodeError::SessionInfoCorrupt {
                    details: format!("expected a mapping at the document root, found {}", kind(&other)),
                });
            }
        };

        let mut values = BTreeMap::new();
        flatten("", &root, &mut values);

        let weekend = &root["WeekendInfo"];
        let track_name = text(&weekend["TrackDisplayName"]).or_else(|| text(&weekend["TrackName"]));

        let driver = player_driver(&root["DriverInfo"]);
        let car_name = driver.and_then(|d| text(&d["CarScreenName"]));
        let driver_name = driver.and_then(|d| text(&d["UserName"]));

        let session_type = current_session(&root["SessionInfo"]).and_then(|s| text(&s["SessionType"]));

        let or_unknown = |value: Option<String>| value.unwrap_or_else(|| UNKNOWN.to_string());
        Ok(Self {
            values,
            track_name: or_unknown(track_name),
            car_name: or_unknown(car_name),
            driver_name: or_unknown(driver_name),
            session_type: or_unknown(session_type),
            started_at: None,
            channels: Vec::new(),
        })
    }

    /// Look up a flattened key such as `WeekendInfo.TrackName`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Whether the session info block contributed no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Read the session info block described by `header`.
///
/// An absent block yields header-only metadata. Unparseable YAML is
/// [`DecodeError::SessionInfoCorrupt`].
pub fn read_session_info(capture: &[u8], header: &FormatHeader) -> Result<SessionMetadata> {
    if header.session_info_len == 0 {
        debug!("Capture has no session info block");
        return Ok(SessionMetadata::from_header(header));
    }

    let region = capture.get(header.session_info_range()).ok_or_else(|| {
        DecodeError::truncated_header("session info", "block extends beyond capture")
    })?;
    trace!(len = region.len(), "Extracting session info YAML");

    let yaml = extract_session_yaml(region);
    let mut metadata = SessionMetadata::parse(&yaml)?;
    metadata.started_at = start_time(header.disk.start_date);

    debug!(
        keys = metadata.values.len(),
        track = %metadata.track_name,
        car = %metadata.car_name,
        driver = %metadata.driver_name,
        "Session info decoded"
    );
    Ok(metadata)
}

fn start_time(start_date: i64) -> Option<DateTime<Utc>> {
    if start_date == 0 {
        return None;
    }
    DateTime::from_timestamp(start_date, 0)
}

/// Flatten a YAML tree into dotted leaf paths.
fn flatten(path: &str, value: &Value, out: &mut BTreeMap<String, String>) {
    match value {
        Value::Mapping(map) => {
            for (key, child) in map {
                let key = match key {
                    Value::String(s) => s.clone(),
                    other => leaf(other),
                };
                let child_path = if path.is_empty() { key } else { format!("{}.{}", path, key) };
                flatten(&child_path, child, out);
            }
        }
        Value::Sequence(seq) => {
            for (i, child) in seq.iter().enumerate() {
                flatten(&format!("{}[{}]", path, i), child, out);
            }
        }
        Value::Tagged(tagged) => flatten(path, &tagged.value, out),
        scalar => {
            out.insert(path.to_string(), leaf(scalar));
        }
    }
}

fn leaf(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Tagged(tagged) => leaf(&tagged.value),
        Value::Mapping(_) | Value::Sequence(_) => String::new(),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Non-empty text of a scalar.
fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(_) | Value::Number(_) | Value::Bool(_) => {
            Some(leaf(value).trim().to_string()).filter(|s| !s.is_empty())
        }
        _ => None,
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// The recording driver's entry: `CarIdx == DriverCarIdx`, else the first driver.
fn player_driver(driver_info: &Value) -> Option<&Value> {
    let drivers = driver_info["Drivers"].as_sequence()?;
    let player = as_i64(&driver_info["DriverCarIdx"]);
    player
        .and_then(|idx| drivers.iter().find(|d| as_i64(&d["CarIdx"]) == Some(idx)))
        .or_else(|| drivers.first())
}

/// The session matching `CurrentSessionNum`, else the last one listed.
fn current_session(session_info: &Value) -> Option<&Value> {
    let sessions = session_info["Sessions"].as_sequence()?;
    as_i64(&session_info["CurrentSessionNum"])
        .and_then(|num| sessions.iter().find(|s| as_i64(&s["SessionNum"]) == Some(num)))
        .or_else(|| sessions.last())
}
