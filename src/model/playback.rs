//! Playback snapshot parsing and progress extrapolation

use serde_json::Value;
use tokio::time::Instant;

/// What the remote service says is playing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentKind {
    Track,
    Episode,
    Unknown,
}

/// The most recently polled playback status.
///
/// Rebuilt fresh on every successful poll, never merged with the previous
/// snapshot. The controller carries the device id separately.
#[derive(Clone, Debug)]
pub struct PlaybackSnapshot {
    pub is_playing: bool,
    pub kind: ContentKind,
    pub artist_or_show: String,
    pub title: String,
    pub track_id: Option<String>,
    pub progress_ms: Option<u64>,
    pub duration_ms: Option<u64>,
}

impl PlaybackSnapshot {
    /// Parse a currently-playing reply body.
    ///
    /// Returns `None` ("not playing") whenever the reply lacks
    /// `is_playing == true` or lacks a content item, even on a 200. That is
    /// deliberate normalization, not an error.
    pub fn from_reply(json: &Value) -> Option<Self> {
        match json.get("is_playing").and_then(Value::as_bool) {
            Some(true) => {}
            Some(false) => return None,
            None => {
                tracing::debug!(%json, "missing content, status unknown");
                return None;
            }
        }

        let item = json.get("item").filter(|item| item.is_object())?;

        let kind = match json.get("currently_playing_type").and_then(Value::as_str) {
            Some("track") => ContentKind::Track,
            Some("episode") => ContentKind::Episode,
            _ => ContentKind::Unknown,
        };

        let (artist_or_show, title) = match kind {
            ContentKind::Track => (
                item.pointer("/artists/0/name")
                    .and_then(Value::as_str)
                    .unwrap_or("Unknown Artist")
                    .to_string(),
                item.get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("Unknown Track")
                    .to_string(),
            ),
            ContentKind::Episode => (
                item.pointer("/show/name")
                    .and_then(Value::as_str)
                    .unwrap_or("Unknown Podcast")
                    .to_string(),
                item.get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("Unknown Episode")
                    .to_string(),
            ),
            ContentKind::Unknown => ("Unknown content".to_string(), String::new()),
        };

        Some(Self {
            is_playing: true,
            kind,
            artist_or_show,
            title,
            track_id: item.get("id").and_then(Value::as_str).map(str::to_string),
            progress_ms: json.get("progress_ms").and_then(Value::as_u64),
            duration_ms: item.get("duration_ms").and_then(Value::as_u64),
        })
    }
}

/// Extrapolates playback position between polls.
///
/// Anchored once per poll; position advances with elapsed wall time so the
/// display can tick once per second without re-polling.
pub struct ProgressTracker {
    position_ms: u64,
    duration_ms: u64,
    anchored_at: Instant,
}

impl ProgressTracker {
    pub fn new(position_ms: u64, duration_ms: u64) -> Self {
        Self {
            position_ms,
            duration_ms,
            anchored_at: Instant::now(),
        }
    }

    /// Extrapolated position; may run past the duration.
    pub fn position_ms(&self) -> u64 {
        self.position_ms
            .saturating_add(self.anchored_at.elapsed().as_millis() as u64)
    }

    pub fn remaining_ms(&self) -> u64 {
        self.duration_ms.saturating_sub(self.position_ms())
    }

    /// True once the extrapolated position has run past the known duration,
    /// meaning the snapshot is stale and a fresh poll is due.
    pub fn overran(&self) -> bool {
        self.position_ms() > self.duration_ms
    }

    /// Progress for rendering, clamped to 0–100.
    pub fn percent(&self) -> f64 {
        if self.duration_ms == 0 {
            return 0.0;
        }
        (self.position_ms() as f64 / self.duration_ms as f64 * 100.0).clamp(0.0, 100.0)
    }
}
