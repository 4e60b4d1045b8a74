//! Debounced button monitoring
//!
//! Each physical button gets its own always-on task that turns the raw
//! input level into edge-triggered press/long-press events. The task is the
//! only writer of the press record; the controller is the only reader and
//! clears it explicitly, so a press is reported exactly once per physical
//! press cycle.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::{Instant, sleep};

use crate::display::{ButtonInput, Buzzer};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const DEBOUNCE: Duration = Duration::from_millis(30);

const PRESS_BUZZ_MS: u64 = 25;
const LONG_PRESS_BUZZ_MS: u64 = 100;

#[derive(Default)]
struct PressRecord {
    was_pressed: bool,
    duration_ms: u64,
}

/// Edge-triggered press state for one button.
///
/// `was_pressed`/`was_long_pressed` stay set until `reset_press` is called;
/// they never auto-clear. An unconfigured button is inert: no task runs and
/// no event is ever reported.
pub struct ButtonMonitor {
    record: Arc<Mutex<PressRecord>>,
    long_press_duration_ms: u64,
    configured: bool,
}

impl ButtonMonitor {
    /// Start monitoring a wired button.
    pub fn spawn(
        input: Arc<dyn ButtonInput>,
        long_press_duration_ms: u64,
        buzzer: Option<Arc<dyn Buzzer>>,
    ) -> Self {
        let record = Arc::new(Mutex::new(PressRecord::default()));
        let task_record = record.clone();
        tokio::spawn(async move {
            monitor(input, task_record, long_press_duration_ms, buzzer).await;
        });
        Self {
            record,
            long_press_duration_ms,
            configured: true,
        }
    }

    /// Placeholder for a button that is not wired up.
    pub fn inert(long_press_duration_ms: u64) -> Self {
        Self {
            record: Arc::new(Mutex::new(PressRecord::default())),
            long_press_duration_ms,
            configured: false,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    pub fn was_pressed(&self) -> bool {
        self.record.lock().unwrap().was_pressed
    }

    /// True only when a press is pending and its hold duration met the
    /// configured threshold.
    pub fn was_long_pressed(&self) -> bool {
        let record = self.record.lock().unwrap();
        record.was_pressed && record.duration_ms >= self.long_press_duration_ms
    }

    /// Clear the pending press. Idempotent.
    pub fn reset_press(&self) {
        let mut record = self.record.lock().unwrap();
        record.was_pressed = false;
        record.duration_ms = 0;
    }

    /// Discard any pending press, then block until the next one arrives.
    pub async fn wait_for_press(&self) {
        self.reset_press();
        loop {
            if self.was_pressed() {
                self.reset_press();
                return;
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    #[cfg(test)]
    pub(crate) fn inject_press(&self, duration_ms: u64) {
        let mut record = self.record.lock().unwrap();
        record.duration_ms = duration_ms;
        record.was_pressed = true;
    }

    /// Second handle onto the same press record, for injecting presses from
    /// a spawned task while the controller owns the monitor.
    #[cfg(test)]
    pub(crate) fn test_handle(&self) -> ButtonMonitor {
        ButtonMonitor {
            record: self.record.clone(),
            long_press_duration_ms: self.long_press_duration_ms,
            configured: self.configured,
        }
    }
}

/// Per-button task: Idle -> Debouncing -> Held -> Idle.
async fn monitor(
    input: Arc<dyn ButtonInput>,
    record: Arc<Mutex<PressRecord>>,
    long_press_duration_ms: u64,
    buzzer: Option<Arc<dyn Buzzer>>,
) {
    loop {
        if !input.is_pressed() {
            sleep(POLL_INTERVAL).await;
            continue;
        }

        let press_start = Instant::now();
        if let Some(buzzer) = &buzzer {
            buzzer.buzz(PRESS_BUZZ_MS);
        }

        sleep(DEBOUNCE).await;
        if !input.is_pressed() {
            // released within the debounce window, treat as noise
            continue;
        }

        // latched so the feedback fires once per hold
        let mut long_press_buzzed = false;
        while input.is_pressed() {
            if !long_press_buzzed
                && press_start.elapsed().as_millis() as u64 >= long_press_duration_ms
            {
                if let Some(buzzer) = &buzzer {
                    buzzer.buzz(LONG_PRESS_BUZZ_MS);
                }
                long_press_buzzed = true;
            }
            sleep(POLL_INTERVAL).await;
        }
        let duration_ms = press_start.elapsed().as_millis() as u64;

        sleep(DEBOUNCE).await;

        let mut pending = record.lock().unwrap();
        pending.duration_ms = duration_ms;
        pending.was_pressed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use crate::display::NullBuzzer;

    struct TestInput(Arc<AtomicBool>);

    impl ButtonInput for TestInput {
        fn is_pressed(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    struct RecordingBuzzer(Mutex<Vec<u64>>);

    impl Buzzer for RecordingBuzzer {
        fn buzz(&self, duration_ms: u64) {
            self.0.lock().unwrap().push(duration_ms);
        }
    }

    fn pressed_level() -> (Arc<AtomicBool>, Arc<dyn ButtonInput>) {
        let level = Arc::new(AtomicBool::new(false));
        let input = Arc::new(TestInput(level.clone()));
        (level, input)
    }

    #[tokio::test(start_paused = true)]
    async fn transition_shorter_than_debounce_emits_nothing() {
        let (level, input) = pressed_level();
        let button = ButtonMonitor::spawn(input, 1000, None);

        level.store(true, Ordering::SeqCst);
        sleep(Duration::from_millis(20)).await;
        level.store(false, Ordering::SeqCst);
        sleep(Duration::from_millis(200)).await;

        assert!(!button.was_pressed());
        assert!(!button.was_long_pressed());
    }

    #[tokio::test(start_paused = true)]
    async fn short_press_sets_pressed_but_not_long_pressed() {
        let (level, input) = pressed_level();
        let button = ButtonMonitor::spawn(input, 1000, None);

        level.store(true, Ordering::SeqCst);
        sleep(Duration::from_millis(100)).await;
        level.store(false, Ordering::SeqCst);
        sleep(Duration::from_millis(200)).await;

        assert!(button.was_pressed());
        assert!(!button.was_long_pressed());
    }

    #[tokio::test(start_paused = true)]
    async fn hold_past_threshold_reports_long_press() {
        let (level, input) = pressed_level();
        // silent feedback must not affect detection
        let button = ButtonMonitor::spawn(input, 1000, Some(Arc::new(NullBuzzer)));

        level.store(true, Ordering::SeqCst);
        sleep(Duration::from_millis(1200)).await;
        level.store(false, Ordering::SeqCst);
        sleep(Duration::from_millis(200)).await;

        assert!(button.was_pressed());
        assert!(button.was_long_pressed());
    }

    #[tokio::test(start_paused = true)]
    async fn long_press_feedback_fires_once_per_hold() {
        let (level, input) = pressed_level();
        let buzzer = Arc::new(RecordingBuzzer(Mutex::new(Vec::new())));
        let button = ButtonMonitor::spawn(input, 500, Some(buzzer.clone()));

        level.store(true, Ordering::SeqCst);
        sleep(Duration::from_millis(2000)).await;
        level.store(false, Ordering::SeqCst);
        sleep(Duration::from_millis(200)).await;

        assert!(button.was_long_pressed());
        let buzzes = buzzer.0.lock().unwrap().clone();
        assert_eq!(buzzes, vec![PRESS_BUZZ_MS, LONG_PRESS_BUZZ_MS]);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_press_is_idempotent() {
        let (level, input) = pressed_level();
        let button = ButtonMonitor::spawn(input, 1000, None);

        level.store(true, Ordering::SeqCst);
        sleep(Duration::from_millis(100)).await;
        level.store(false, Ordering::SeqCst);
        sleep(Duration::from_millis(200)).await;
        assert!(button.was_pressed());

        button.reset_press();
        assert!(!button.was_pressed());
        assert!(!button.was_long_pressed());

        button.reset_press();
        assert!(!button.was_pressed());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_press_discards_pending_press_and_waits_for_next() {
        let (level, input) = pressed_level();
        let button = Arc::new(ButtonMonitor::spawn(input, 1000, None));

        // press that should be discarded by wait_for_press
        level.store(true, Ordering::SeqCst);
        sleep(Duration::from_millis(100)).await;
        level.store(false, Ordering::SeqCst);
        sleep(Duration::from_millis(200)).await;
        assert!(button.was_pressed());

        let waiter = {
            let button = button.clone();
            tokio::spawn(async move { button.wait_for_press().await })
        };
        sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        level.store(true, Ordering::SeqCst);
        sleep(Duration::from_millis(100)).await;
        level.store(false, Ordering::SeqCst);
        sleep(Duration::from_millis(200)).await;

        waiter.await.unwrap();
        assert!(!button.was_pressed());
    }

    #[tokio::test]
    async fn inert_button_never_reports_presses() {
        let button = ButtonMonitor::inert(1000);
        assert!(!button.is_configured());
        assert!(!button.was_pressed());
        assert!(!button.was_long_pressed());
        button.reset_press();
    }
}
