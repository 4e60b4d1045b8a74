//! Button event arbitration
//!
//! At most one button event is honored per loop iteration; play/pause wins
//! over next when both fired in the same window, and both flags are cleared
//! afterwards so starvation is bounded to a single iteration.

use crate::display::ShowOptions;
use crate::model::Credential;
use crate::model::api::APP_NAME;

use super::PlaybackController;

impl PlaybackController {
    pub(crate) async fn handle_buttons(
        &mut self,
        credential: &Credential,
        playing: bool,
    ) -> anyhow::Result<()> {
        if !self.check_button_presses() {
            return Ok(());
        }

        if self.button_playpause.was_pressed() {
            tracing::info!("play/pause button pressed");
            if playing {
                if self.button_playpause.was_long_pressed() {
                    self.display
                        .show(APP_NAME, "saving track", ShowOptions::status());
                    if let Some(track_id) = self.api.current_track_id(credential).await? {
                        self.api.save_track(credential, &track_id).await?;
                    }
                } else {
                    self.display
                        .show(APP_NAME, "pausing playback", ShowOptions::status());
                    // remember where playback lives so resume can address it
                    self.device_id = self.api.current_device_id(credential).await?;
                    self.api.pause(credential).await?;
                }
            } else {
                self.display
                    .show(APP_NAME, "resuming playback", ShowOptions::status());
                self.api
                    .resume(credential, self.device_id.as_deref())
                    .await?;
            }
        } else if self.button_next.was_pressed() {
            tracing::info!("next button pressed");
            if playing {
                if self.button_next.was_long_pressed() {
                    self.toggle_pause_after_current();
                } else {
                    self.display
                        .show(APP_NAME, "requesting next", ShowOptions::status());
                    self.api.next(credential, None).await?;
                }
            } else {
                self.display
                    .show(APP_NAME, "requesting next", ShowOptions::status());
                self.api
                    .next(credential, self.device_id.as_deref())
                    .await?;
            }
        }

        self.reset_button_presses();
        Ok(())
    }

    fn toggle_pause_after_current(&mut self) {
        if self.pause_after_current {
            self.display.disable_status_dot();
            self.display
                .show(APP_NAME, "not pausing after current", ShowOptions::status());
            self.pause_after_current = false;
        } else {
            self.display
                .enable_status_dot(self.config.api_request_dot_size);
            self.display
                .show(APP_NAME, "pausing after current", ShowOptions::status());
            self.pause_after_current = true;
        }
    }
}
