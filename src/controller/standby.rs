//! Idle countdown and standby handling
//!
//! While nothing is playing the controller counts down toward standby,
//! showing the remaining fraction as a progress bar. Standby itself blocks
//! at 1 s granularity until a button press or the coarse standby poll
//! interval wakes it; both timers are independent of the playing-state poll
//! cadence.

use std::time::Duration;

use tokio::time::Instant;

use crate::display::ShowOptions;
use crate::model::api::APP_NAME;

use super::{ControllerState, PlaybackController};

const STANDBY_PATTERN_REFRESH: Duration = Duration::from_secs(10);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StandbyOutcome {
    /// A button press woke the controller; the idle timer restarts.
    ButtonWake,
    /// The coarse standby poll interval elapsed; re-check playback status.
    PollDue,
    /// Nothing can ever wake this configuration, stop the loop.
    Shutdown,
}

impl PlaybackController {
    /// Count down toward standby for up to one poll window.
    ///
    /// Returns true once the idle duration reaches the standby threshold;
    /// false when the window or a button press ends the countdown first.
    pub(crate) async fn idle_countdown(&self, last_playing: Instant, window: Duration) -> bool {
        let idle_limit = Duration::from_secs(self.config.idle_standby_minutes * 60);
        let countdown_window = window.saturating_sub(Duration::from_secs(1));
        let started = Instant::now();

        loop {
            let standby_at = last_playing + idle_limit;
            let now = Instant::now();
            if now >= standby_at {
                return true;
            }

            let progress = if idle_limit.is_zero() {
                0.0
            } else {
                (standby_at - now).as_secs_f64() / idle_limit.as_secs_f64() * 100.0
            };
            self.display.show(
                "Spotify",
                "not playing",
                ShowOptions {
                    progress: Some(progress),
                    ticks: false,
                    separator: true,
                },
            );

            if self.wait_for_button_press(Duration::from_secs(1)).await {
                return false;
            }
            if started.elapsed() >= countdown_window {
                return false;
            }
        }
    }

    /// Block in standby until something warrants leaving it.
    pub(crate) async fn standby(&mut self) -> StandbyOutcome {
        debug_assert_eq!(self.state, ControllerState::Standby);
        tracing::info!("standby");
        self.reset_button_presses();

        if self.config.blank_display_on_standby {
            self.display.clear();
        } else {
            self.display.standby();
        }
        let mut pattern_refreshed = Instant::now();

        let buttons_configured =
            self.button_playpause.is_configured() || self.button_next.is_configured();
        let standby_poll =
            Duration::from_secs(self.config.standby_status_poll_interval_minutes * 60);
        if !buttons_configured && standby_poll.is_zero() {
            return StandbyOutcome::Shutdown;
        }

        let standby_started = Instant::now();
        loop {
            if !self.config.blank_display_on_standby
                && pattern_refreshed.elapsed() >= STANDBY_PATTERN_REFRESH
            {
                self.display.standby();
                pattern_refreshed = Instant::now();
            }

            if self.wait_for_button_press(Duration::from_secs(1)).await {
                break;
            }

            if !standby_poll.is_zero() && standby_started.elapsed() >= standby_poll {
                tracing::info!("standby status poll");
                return StandbyOutcome::PollDue;
            }
        }

        // a play/pause press survives into the main loop so pressing it in
        // standby resumes playback directly
        if !self.button_playpause.was_pressed() {
            self.reset_button_presses();
        }
        self.display
            .show(APP_NAME, "resuming operations", ShowOptions::status());
        StandbyOutcome::ButtonWake
    }
}
