// Keyflux Repeat Timer
// Synthesizes key repeats on a delay/interval schedule, evaluated once per
// ingestion poll cycle

use std::time::{Duration, Instant};

use crate::key::{KEY_BACKSPACE, KEY_DELETE};

/// Held time before the first repeat fires.
pub const INITIAL_DELAY: Duration = Duration::from_millis(500);
/// Interval between repeats for non-accelerating keys.
pub const REPEAT_INTERVAL_MS: u64 = 60;
/// Acceleration floor for backspace/delete.
pub const MIN_INTERVAL_MS: u64 = 10;

/// Two-state repeat machine: Idle while no key is tracked, Repeating while
/// one is held. Driven with explicit instants so the schedule is exact
/// regardless of poll jitter.
#[derive(Debug)]
pub struct RepeatTimer {
    active: Option<u16>,
    count: u32,
    last: Instant,
    interval: Duration,
}

impl RepeatTimer {
    pub fn new() -> Self {
        Self {
            active: None,
            count: 0,
            last: Instant::now(),
            interval: Duration::from_millis(REPEAT_INTERVAL_MS),
        }
    }

    /// (Re)start tracking for a pressed key. A press of a different key
    /// replaces the previous tracking entirely.
    pub fn key_pressed(&mut self, code: u16, now: Instant) {
        self.active = Some(code);
        self.count = 0;
        self.last = now;
        self.interval = Duration::from_millis(REPEAT_INTERVAL_MS);
    }

    /// Cancel tracking if the released key is the active one.
    pub fn key_released(&mut self, code: u16) {
        if self.active == Some(code) {
            self.reset();
        }
    }

    pub fn reset(&mut self) {
        self.active = None;
        self.count = 0;
        self.interval = Duration::from_millis(REPEAT_INTERVAL_MS);
    }

    pub fn active_code(&self) -> Option<u16> {
        self.active
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Evaluate the schedule. Returns the key code when a repeat is due.
    /// The first repeat waits INITIAL_DELAY; later ones wait the current
    /// interval. Backspace/delete shrink the interval 5ms per repeat fired,
    /// floored at MIN_INTERVAL_MS.
    pub fn poll(&mut self, now: Instant) -> Option<u16> {
        let code = self.active?;
        let due = if self.count == 0 {
            INITIAL_DELAY
        } else {
            self.interval
        };
        if now.duration_since(self.last) < due {
            return None;
        }

        self.count += 1;
        self.last = now;

        if code == KEY_BACKSPACE || code == KEY_DELETE {
            let ms = REPEAT_INTERVAL_MS
                .saturating_sub(5 * u64::from(self.count))
                .max(MIN_INTERVAL_MS);
            self.interval = Duration::from_millis(ms);
        }
        Some(code)
    }
}

impl Default for RepeatTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_A: u16 = 30;

    /// Walk the timer forward in 5ms poll steps, collecting fire times.
    fn drive(timer: &mut RepeatTimer, start: Instant, total: Duration) -> Vec<Duration> {
        let mut fires = Vec::new();
        let step = Duration::from_millis(5);
        let mut t = start;
        while t <= start + total {
            if timer.poll(t).is_some() {
                fires.push(t.duration_since(start));
            }
            t += step;
        }
        fires
    }

    #[test]
    fn test_no_repeat_before_initial_delay() {
        let start = Instant::now();
        let mut timer = RepeatTimer::new();
        timer.key_pressed(KEY_A, start);
        assert!(timer.poll(start + Duration::from_millis(495)).is_none());
        assert!(timer.poll(start + Duration::from_millis(500)).is_some());
    }

    #[test]
    fn test_held_key_fires_initial_plus_three() {
        let start = Instant::now();
        let mut timer = RepeatTimer::new();
        timer.key_pressed(KEY_A, start);

        // initialDelay + 3 * repeatInterval, plus one poll cycle of slack
        let fires = drive(&mut timer, start, Duration::from_millis(500 + 3 * 60 + 5));
        assert_eq!(fires.len(), 4);
        assert_eq!(fires[0], Duration::from_millis(500));
        assert_eq!(fires[1], Duration::from_millis(560));
        assert_eq!(fires[2], Duration::from_millis(620));
        assert_eq!(fires[3], Duration::from_millis(680));
    }

    #[test]
    fn test_release_stops_repeat() {
        let start = Instant::now();
        let mut timer = RepeatTimer::new();
        timer.key_pressed(KEY_A, start);
        timer.key_released(KEY_A);
        assert!(timer.active_code().is_none());
        assert!(timer.poll(start + Duration::from_secs(2)).is_none());
    }

    #[test]
    fn test_release_of_other_key_keeps_repeat() {
        let start = Instant::now();
        let mut timer = RepeatTimer::new();
        timer.key_pressed(KEY_A, start);
        timer.key_released(31);
        assert_eq!(timer.active_code(), Some(KEY_A));
    }

    #[test]
    fn test_new_press_replaces_tracking() {
        let start = Instant::now();
        let mut timer = RepeatTimer::new();
        timer.key_pressed(KEY_A, start);
        timer.poll(start + Duration::from_millis(500)).unwrap();
        assert_eq!(timer.count(), 1);

        timer.key_pressed(31, start + Duration::from_millis(600));
        assert_eq!(timer.active_code(), Some(31));
        assert_eq!(timer.count(), 0);
        // Fresh key waits the full initial delay again.
        assert!(timer.poll(start + Duration::from_millis(700)).is_none());
    }

    #[test]
    fn test_backspace_accelerates_with_floor() {
        let start = Instant::now();
        let mut timer = RepeatTimer::new();
        timer.key_pressed(KEY_BACKSPACE, start);

        let fires = drive(&mut timer, start, Duration::from_secs(2));
        assert!(fires.len() > 4);

        let first_interval = fires[1] - fires[0];
        let third_interval = fires[3] - fires[2];
        assert!(third_interval < first_interval);
        assert_eq!(first_interval, Duration::from_millis(55));

        // Intervals bottom out at the floor. Poll cadence is 5ms so the
        // observed spacing can never go below 10ms anyway; check the
        // schedule converged.
        let last_interval = fires[fires.len() - 1] - fires[fires.len() - 2];
        assert_eq!(last_interval, Duration::from_millis(MIN_INTERVAL_MS));
    }

    #[test]
    fn test_plain_key_does_not_accelerate() {
        let start = Instant::now();
        let mut timer = RepeatTimer::new();
        timer.key_pressed(KEY_A, start);

        let fires = drive(&mut timer, start, Duration::from_secs(1));
        for pair in fires.windows(2).skip(1) {
            assert_eq!(pair[1] - pair[0], Duration::from_millis(60));
        }
    }
}
