//! Display and buzzer collaborator contracts
//!
//! The core never touches pixels or PWM directly. It talks to whatever
//! renders the screen and drives the haptic feedback through these traits,
//! so a hardware integration only has to supply implementations. The
//! console/null implementations below are what the host build runs with.

use std::sync::Arc;

/// Rendering options for [`Display::show`].
///
/// Defaults mirror the renderer's own defaults: no progress bar, tick marks
/// on, artist/title separator on.
#[derive(Clone, Copy, Debug)]
pub struct ShowOptions {
    /// Progress bar fill, 0–100. `None` hides the bar.
    pub progress: Option<f64>,
    pub ticks: bool,
    pub separator: bool,
}

impl Default for ShowOptions {
    fn default() -> Self {
        Self {
            progress: None,
            ticks: true,
            separator: true,
        }
    }
}

impl ShowOptions {
    /// Status-text layout: two lines of text, no separator, no bar.
    pub fn status() -> Self {
        Self {
            separator: false,
            ..Self::default()
        }
    }

    pub fn with_progress(progress: f64, ticks: bool) -> Self {
        Self {
            progress: Some(progress),
            ticks,
            ..Self::default()
        }
    }
}

/// Contract the core needs from the pixel-level renderer.
pub trait Display: Send + Sync {
    fn show(&self, primary: &str, secondary: &str, opts: ShowOptions);

    /// Advance the low-activity standby pattern by one step.
    fn standby(&self);

    fn clear(&self);

    /// API-request indicator in the display corner.
    fn show_corner_dot(&self, size: u32);
    fn hide_corner_dot(&self, size: u32);

    /// Persistent status indicator (pause-after-current armed).
    fn enable_status_dot(&self, size: u32);
    fn disable_status_dot(&self);
}

/// Haptic/audible feedback collaborator.
pub trait Buzzer: Send + Sync {
    fn buzz(&self, duration_ms: u64);
}

/// Raw digital input level of one physical button.
///
/// Implementations map the electrical level to a logical "pressed" state;
/// the reference hardware uses a pull-up, so pressed means input low.
pub trait ButtonInput: Send + Sync {
    fn is_pressed(&self) -> bool;
}

pub type SharedDisplay = Arc<dyn Display>;

/// Text-only display for running the control loop on a host machine.
pub struct ConsoleDisplay;

impl Display for ConsoleDisplay {
    fn show(&self, primary: &str, secondary: &str, opts: ShowOptions) {
        match opts.progress {
            Some(progress) => println!("[display] {primary} / {secondary} ({progress:.0}%)"),
            None => println!("[display] {primary} / {secondary}"),
        }
    }

    fn standby(&self) {
        println!("[display] (standby)");
    }

    fn clear(&self) {
        println!("[display] (cleared)");
    }

    fn show_corner_dot(&self, _size: u32) {}

    fn hide_corner_dot(&self, _size: u32) {}

    fn enable_status_dot(&self, size: u32) {
        tracing::debug!(size, "status dot enabled");
    }

    fn disable_status_dot(&self) {
        tracing::debug!("status dot disabled");
    }
}

/// Display that draws nothing, for headless configurations.
pub struct NullDisplay;

impl Display for NullDisplay {
    fn show(&self, _primary: &str, _secondary: &str, _opts: ShowOptions) {}
    fn standby(&self) {}
    fn clear(&self) {}
    fn show_corner_dot(&self, _size: u32) {}
    fn hide_corner_dot(&self, _size: u32) {}
    fn enable_status_dot(&self, _size: u32) {}
    fn disable_status_dot(&self) {}
}

/// Buzzer that stays silent, for hardware without one.
pub struct NullBuzzer;

impl Buzzer for NullBuzzer {
    fn buzz(&self, _duration_ms: u64) {}
}
