//! Controller module - the main playback state machine
//!
//! Runs the single scheduling loop: ensure a valid credential, drain button
//! events, poll playback, extrapolate progress, and drive the idle/standby
//! lifecycle. Organized into submodules by responsibility:
//!
//! - `input`: button event arbitration
//! - `progress`: the playing-window display loop
//! - `standby`: idle countdown and standby handling

mod input;
mod progress;
mod standby;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, sleep};

pub use standby::StandbyOutcome;

use crate::button::ButtonMonitor;
use crate::config::Config;
use crate::display::{Display, ShowOptions};
use crate::model::api::APP_NAME;
use crate::model::{CredentialManager, CurrentlyPlaying, SpotifyApi};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerState {
    Bootstrapping,
    Polling,
    Standby,
}

pub struct PlaybackController {
    pub(crate) config: Config,
    pub(crate) api: SpotifyApi,
    pub(crate) credentials: CredentialManager,
    pub(crate) display: Arc<dyn Display>,
    pub(crate) button_playpause: ButtonMonitor,
    pub(crate) button_next: ButtonMonitor,
    state: ControllerState,
    /// Device last seen active; carried forward when a poll lacks one.
    pub(crate) device_id: Option<String>,
    /// Deferred pause armed for the end of the current track.
    pub(crate) pause_after_current: bool,
}

impl PlaybackController {
    pub fn new(
        config: Config,
        api: SpotifyApi,
        credentials: CredentialManager,
        display: Arc<dyn Display>,
        button_playpause: ButtonMonitor,
        button_next: ButtonMonitor,
    ) -> Self {
        Self {
            config,
            api,
            credentials,
            display,
            button_playpause,
            button_next,
            state: ControllerState::Bootstrapping,
            device_id: None,
            pause_after_current: false,
        }
    }

    /// Run until a fatal error or, in the button-less variant without a
    /// standby poll interval, until prolonged inactivity.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        self.display.show(APP_NAME, "start", ShowOptions::status());

        let mut credential = self.credentials.bootstrap().await?;
        self.display
            .show(APP_NAME, "tokenized", ShowOptions::status());
        self.set_state(ControllerState::Polling);

        let poll_window = Duration::from_secs(self.config.status_poll_interval_seconds);
        let mut playing = false;
        let mut last_playing = Instant::now();
        self.reset_button_presses();

        loop {
            credential = self.credentials.ensure_valid(credential).await?;
            if !credential.is_usable() {
                // refresh yielded nothing usable, try again shortly
                sleep(Duration::from_secs(1)).await;
                continue;
            }

            self.handle_buttons(&credential, playing).await?;

            match self.api.currently_playing(&credential).await? {
                CurrentlyPlaying::Warned => continue,
                CurrentlyPlaying::Playing(snapshot) => {
                    playing = true;
                    last_playing = Instant::now();
                    if self.device_id.is_none() {
                        self.device_id = self.api.current_device_id(&credential).await?;
                    }
                    self.play_window(&credential, &snapshot, poll_window)
                        .await?;
                }
                CurrentlyPlaying::NotPlaying => {
                    playing = false;
                    self.pause_after_current = false;
                    self.display.disable_status_dot();

                    if self.idle_countdown(last_playing, poll_window).await {
                        self.set_state(ControllerState::Standby);
                        match self.standby().await {
                            StandbyOutcome::ButtonWake => last_playing = Instant::now(),
                            StandbyOutcome::PollDue => {}
                            StandbyOutcome::Shutdown => {
                                tracing::info!(
                                    "idle with no buttons and no standby poll, stopping"
                                );
                                self.display.clear();
                                return Ok(());
                            }
                        }
                        self.set_state(ControllerState::Polling);
                    }
                }
            }
        }
    }

    pub(crate) fn set_state(&mut self, state: ControllerState) {
        if self.state != state {
            tracing::info!(from = ?self.state, to = ?state, "state transition");
            self.state = state;
        }
    }

    pub(crate) fn check_button_presses(&self) -> bool {
        self.button_playpause.was_pressed() || self.button_next.was_pressed()
    }

    pub(crate) fn reset_button_presses(&self) {
        self.button_playpause.reset_press();
        self.button_next.reset_press();
    }

    /// Poll button flags at coarse granularity until one is set or the
    /// timeout elapses. Returns whether a press is pending.
    pub(crate) async fn wait_for_button_press(&self, timeout: Duration) -> bool {
        let started = Instant::now();
        let mut pressed = self.check_button_presses();
        while !pressed && started.elapsed() < timeout {
            sleep(Duration::from_millis(50)).await;
            pressed = self.check_button_presses();
        }
        pressed
    }
}
