//! The playing-window display loop
//!
//! While a track is playing, the controller ticks the display roughly once
//! per second from the extrapolated position instead of re-polling. A
//! button press ends the window early so the press is handled at the top of
//! the next iteration.

use std::time::Duration;

use tokio::time::{Instant, sleep};

use crate::display::ShowOptions;
use crate::model::playback::{PlaybackSnapshot, ProgressTracker};
use crate::model::Credential;

use super::PlaybackController;

impl PlaybackController {
    /// Show playback progress for one poll window.
    pub(crate) async fn play_window(
        &mut self,
        credential: &Credential,
        snapshot: &PlaybackSnapshot,
        window: Duration,
    ) -> anyhow::Result<()> {
        let (Some(progress_ms), Some(duration_ms)) = (snapshot.progress_ms, snapshot.duration_ms)
        else {
            // no timing information, plain artist/title for the whole window
            self.display.show(
                &snapshot.artist_or_show,
                &snapshot.title,
                ShowOptions::default(),
            );
            sleep(window).await;
            return Ok(());
        };

        let tracker = ProgressTracker::new(progress_ms, duration_ms);
        let window_started = Instant::now();

        loop {
            // pause slightly early rather than late: the request still has
            // to cross the network before the track actually ends
            if self.pause_after_current
                && tracker.remaining_ms() <= self.config.pause_after_current_threshold_ms
            {
                self.api.pause(credential).await?;
                return Ok(());
            }
            if tracker.overran() {
                return Ok(());
            }

            self.display.show(
                &snapshot.artist_or_show,
                &snapshot.title,
                ShowOptions::with_progress(tracker.percent(), self.config.show_progress_ticks),
            );

            if window_started.elapsed() >= window {
                return Ok(());
            }
            if self.wait_for_button_press(Duration::from_secs(1)).await {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::controller::testutil::{test_config, test_controller, test_credential};
    use crate::model::playback::{ContentKind, PlaybackSnapshot};

    fn snapshot(progress_ms: u64, duration_ms: u64) -> PlaybackSnapshot {
        PlaybackSnapshot {
            is_playing: true,
            kind: ContentKind::Track,
            artist_or_show: "Rick Astley".to_string(),
            title: "Never Gonna Give You Up".to_string(),
            track_id: Some("4uLU6hMCjMI75M1A2tKUQC".to_string()),
            progress_ms: Some(progress_ms),
            duration_ms: Some(duration_ms),
        }
    }

    #[tokio::test]
    async fn armed_pause_fires_before_the_track_ends() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/me/player/pause"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let mut controller = test_controller(test_config(), &server.uri());
        controller.pause_after_current = true;

        // 1000 ms remaining, within the 2000 ms early-trigger threshold
        controller
            .play_window(&test_credential(), &snapshot(59_000, 60_000), Duration::from_secs(5))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unarmed_playback_never_issues_a_pause() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/me/player/pause"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let mut controller = test_controller(test_config(), &server.uri());

        // overrun snapshot: returns immediately without a pause call
        controller
            .play_window(&test_credential(), &snapshot(61_000, 60_000), Duration::from_secs(5))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn fatal_pause_status_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/me/player/pause"))
            .respond_with(
                ResponseTemplate::new(418).set_body_json(json!({"error": "teapot"})),
            )
            .mount(&server)
            .await;

        let mut controller = test_controller(test_config(), &server.uri());
        controller.pause_after_current = true;

        let result = controller
            .play_window(&test_credential(), &snapshot(59_000, 60_000), Duration::from_secs(5))
            .await;
        assert!(result.is_err());
    }
}
