//! Spotify player API wrapper
//!
//! Translates raw [`ApiReply`]s from each playback endpoint into domain
//! outcomes, applying the per-endpoint status classification tables. Warn
//! statuses surface on the display and let the loop continue; anything
//! unclassified is fatal.

use std::time::Duration;

use reqwest::Method;

use crate::model::api::{ApiError, ApiReply, ReplyClassifier, RetryingHttpClient};
use crate::model::credentials::Credential;
use crate::model::playback::PlaybackSnapshot;

pub const API_BASE: &str = "https://api.spotify.com";

/// A usable device id is non-null and longer than this.
const MIN_DEVICE_ID_LEN: usize = 8;

const NO_DEVICE_NOTICE: Duration = Duration::from_secs(3);

/// Outcome of one currently-playing poll.
#[derive(Debug)]
pub enum CurrentlyPlaying {
    Playing(PlaybackSnapshot),
    NotPlaying,
    /// A transient warning was already surfaced; skip this iteration.
    Warned,
}

#[derive(Clone)]
pub struct SpotifyApi {
    client: RetryingHttpClient,
    classifier: ReplyClassifier,
    base_url: String,
    no_device_notice: Duration,
}

impl SpotifyApi {
    pub fn new(client: RetryingHttpClient, classifier: ReplyClassifier) -> Self {
        Self {
            client,
            classifier,
            base_url: API_BASE.to_string(),
            no_device_notice: NO_DEVICE_NOTICE,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_no_device_notice(mut self, duration: Duration) -> Self {
        self.no_device_notice = duration;
        self
    }

    pub async fn currently_playing(
        &self,
        credential: &Credential,
    ) -> Result<CurrentlyPlaying, ApiError> {
        let url = format!(
            "{}/v1/me/player/currently-playing?additional_types=track,episode",
            self.base_url
        );
        let reply = self.request(Method::GET, &url, credential).await;

        if !self
            .classifier
            .check("c-playing", &reply, &[200, 202, 204], &[0, 401, 403, 429])
            .await?
        {
            return Ok(CurrentlyPlaying::Warned);
        }

        if reply.status_code != 200 {
            return Ok(CurrentlyPlaying::NotPlaying);
        }

        Ok(match PlaybackSnapshot::from_reply(&reply.json) {
            Some(snapshot) => CurrentlyPlaying::Playing(snapshot),
            None => CurrentlyPlaying::NotPlaying,
        })
    }

    /// Id of the track currently playing, for save-track.
    pub async fn current_track_id(
        &self,
        credential: &Credential,
    ) -> Result<Option<String>, ApiError> {
        Ok(match self.currently_playing(credential).await? {
            CurrentlyPlaying::Playing(snapshot) => snapshot.track_id,
            _ => None,
        })
    }

    /// Device id of the active player, when one is reported and plausible.
    pub async fn current_device_id(
        &self,
        credential: &Credential,
    ) -> Result<Option<String>, ApiError> {
        let url = format!("{}/v1/me/player", self.base_url);
        let reply = self.request(Method::GET, &url, credential).await;

        if !self
            .classifier
            .check("player", &reply, &[200], &[202, 204, 401, 403, 429])
            .await?
        {
            return Ok(None);
        }

        let device_id = reply
            .json
            .pointer("/device/id")
            .and_then(serde_json::Value::as_str)
            .filter(|id| id.len() > MIN_DEVICE_ID_LEN)
            .map(str::to_string);
        if let Some(id) = &device_id {
            tracing::debug!(device_id = %id, "current device id");
        }
        Ok(device_id)
    }

    pub async fn pause(&self, credential: &Credential) -> Result<(), ApiError> {
        let url = format!("{}/v1/me/player/pause", self.base_url);
        let reply = self.request(Method::PUT, &url, credential).await;
        self.classifier
            .check("pause", &reply, &[200, 202, 204], &[0, 401, 403, 429])
            .await?;
        tracing::info!("playback paused");
        Ok(())
    }

    /// Returns `false` when the service reports no active device (404),
    /// which is surfaced on the display but never fatal.
    pub async fn resume(
        &self,
        credential: &Credential,
        device_id: Option<&str>,
    ) -> Result<bool, ApiError> {
        let url = self.with_device(format!("{}/v1/me/player/play", self.base_url), device_id);
        let reply = self.request(Method::PUT, &url, credential).await;
        self.classifier
            .check("resume", &reply, &[200, 202, 204, 404], &[403])
            .await?;

        if reply.status_code == 404 {
            tracing::warn!("no active device found");
            self.classifier
                .notice("no active device found", self.no_device_notice)
                .await;
            return Ok(false);
        }
        tracing::info!("playback resuming");
        Ok(true)
    }

    /// Same no-active-device handling as [`SpotifyApi::resume`].
    pub async fn next(
        &self,
        credential: &Credential,
        device_id: Option<&str>,
    ) -> Result<bool, ApiError> {
        let url = self.with_device(format!("{}/v1/me/player/next", self.base_url), device_id);
        let reply = self.request(Method::POST, &url, credential).await;
        self.classifier
            .check("next", &reply, &[200, 202, 204, 404], &[0, 401, 403, 429])
            .await?;

        if reply.status_code == 404 {
            tracing::warn!("no active device found");
            self.classifier
                .notice("no active device found", self.no_device_notice)
                .await;
            return Ok(false);
        }
        tracing::info!("playback next");
        Ok(true)
    }

    pub async fn save_track(
        &self,
        credential: &Credential,
        track_id: &str,
    ) -> Result<(), ApiError> {
        let url = format!("{}/v1/me/tracks?ids={}", self.base_url, track_id);
        let reply = self.request(Method::PUT, &url, credential).await;
        self.classifier
            .check("save track", &reply, &[200, 202, 204], &[0, 401, 403, 429])
            .await?;
        tracing::info!(track_id, "track saved");
        Ok(())
    }

    async fn request(&self, method: Method, url: &str, credential: &Credential) -> ApiReply {
        let headers = [(
            "Authorization",
            format!("Bearer {}", credential.access_token),
        )];
        self.client.request(method, url, None, &headers).await
    }

    fn with_device(&self, url: String, device_id: Option<&str>) -> String {
        match device_id {
            Some(id) => format!("{url}?device_id={id}"),
            None => url,
        }
    }
}
