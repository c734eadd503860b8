//! Persistence-shaped views of a decoded session.
//!
//! The decoder performs no I/O. These records and JSON documents are what a
//! storage layer writes: one metadata document and one document per lap, plus
//! session, lap and channel rows keyed by team and session identifiers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value as Json, json};

use crate::laps::Lap;
use crate::session::TelemetrySession;

/// Processing outcome stored with the session row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Decoded without recovery
    Ready,
    /// Decoded with warnings; some data may be missing
    Degraded,
    /// Header and channels present but no samples
    Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionRecord {
    pub team_id: String,
    pub session_id: String,
    pub track_name: String,
    pub car_name: String,
    pub driver_name: String,
    pub started_at: Option<DateTime<Utc>>,
    pub lap_count: usize,
    pub status: SessionStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LapRecord {
    pub team_id: String,
    pub session_id: String,
    pub lap_number: u32,
    pub lap_time_ms: Option<u64>,
    pub is_valid: bool,
    /// Set on the fastest valid lap only
    pub best: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelRecord {
    pub team_id: String,
    pub session_id: String,
    pub name: String,
    pub unit: Option<String>,
}

/// All relational records for one session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionRecords {
    pub session: SessionRecord,
    pub laps: Vec<LapRecord>,
    pub channels: Vec<ChannelRecord>,
}

impl TelemetrySession {
    pub fn status(&self) -> SessionStatus {
        if self.is_empty() {
            SessionStatus::Empty
        } else if self.is_degraded() {
            SessionStatus::Degraded
        } else {
            SessionStatus::Ready
        }
    }

    /// Session, lap and channel records keyed by the caller's identifiers.
    pub fn records(&self, team_id: &str, session_id: &str) -> SessionRecords {
        let metadata = self.metadata();
        let best = self.best_lap().map(Lap::number);

        let session = SessionRecord {
            team_id: team_id.to_string(),
            session_id: session_id.to_string(),
            track_name: metadata.track_name.clone(),
            car_name: metadata.car_name.clone(),
            driver_name: metadata.driver_name.clone(),
            started_at: metadata.started_at,
            lap_count: self.laps().len(),
            status: self.status(),
        };

        let laps = self
            .laps()
            .iter()
            .map(|lap| LapRecord {
                team_id: team_id.to_string(),
                session_id: session_id.to_string(),
                lap_number: lap.number(),
                lap_time_ms: lap.lap_time_ms(),
                is_valid: lap.is_valid(),
                best: best == Some(lap.number()),
            })
            .collect();

        let channels = self
            .channels()
            .iter()
            .map(|channel| ChannelRecord {
                team_id: team_id.to_string(),
                session_id: session_id.to_string(),
                name: channel.name.clone(),
                unit: channel.unit.clone(),
            })
            .collect();

        SessionRecords { session, laps, channels }
    }

    /// Metadata document: derived fields, channel list and caller identifiers.
    pub fn metadata_document(&self, team_id: &str, session_id: &str) -> Json {
        let metadata = self.metadata();
        json!({
            "track_name": metadata.track_name,
            "car_name": metadata.car_name,
            "driver_name": metadata.driver_name,
            "session_type": metadata.session_type,
            "started_at": metadata.started_at,
            "channels": metadata.channels,
            "lap_count": self.laps().len(),
            "warnings": self.warnings(),
            "team_id": team_id,
            "session_id": session_id,
        })
    }

    /// Per-lap document: the lap's rows as an array of `{channel: value}` objects.
    pub fn lap_document(&self, lap: &Lap) -> Json {
        Json::Array(
            lap.rows()
                .iter()
                .map(|row| serde_json::to_value(row).unwrap_or(Json::Null))
                .collect(),
        )
    }
}
