// Keyflux Safety Nets
// Stuck-key detection and the emergency exit chord

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::key::{key_name, KEY_ESC, KEY_LEFTALT, KEY_LEFTCTRL};

/// A key held longer than this without a release is reported as stuck.
pub const STUCK_THRESHOLD: Duration = Duration::from_secs(5);

/// The fixed exit chord, pressed in this order: LeftCtrl, LeftAlt, Esc.
pub const EXIT_CHORD: [u16; 3] = [KEY_LEFTCTRL, KEY_LEFTALT, KEY_ESC];

/// Chord keys must all arrive within this rolling window.
pub const EXIT_WINDOW: Duration = Duration::from_secs(1);

/// Tracks outstanding presses to spot dropped release events. Entries past
/// the staleness threshold are warned about once and dropped from tracking;
/// the key itself is not released.
#[derive(Debug, Default)]
pub struct StuckKeyTracker {
    pressed: HashMap<u16, Instant>,
}

impl StuckKeyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_pressed(&mut self, code: u16, now: Instant) {
        self.pressed.insert(code, now);
    }

    pub fn key_released(&mut self, code: u16) {
        self.pressed.remove(&code);
    }

    /// Remove and report every entry older than the threshold. Returns the
    /// swept codes so callers can assert on them.
    pub fn sweep(&mut self, now: Instant) -> Vec<u16> {
        let stuck: Vec<u16> = self
            .pressed
            .iter()
            .filter(|(_, pressed_at)| now.duration_since(**pressed_at) > STUCK_THRESHOLD)
            .map(|(code, _)| *code)
            .collect();
        for code in &stuck {
            self.pressed.remove(code);
            log::warn!(
                "key '{}' appears stuck (no release within {}s); press Ctrl+Alt+Esc to force exit if needed",
                key_name(*code),
                STUCK_THRESHOLD.as_secs()
            );
        }
        stuck
    }

    pub fn tracked(&self) -> usize {
        self.pressed.len()
    }
}

/// Accumulates exit-chord presses over a rolling 1-second window. Pure state
/// machine: `observe` reports a match, the caller decides to terminate.
#[derive(Debug, Default)]
pub struct ExitSequence {
    seen: Vec<u16>,
    last_update: Option<Instant>,
}

impl ExitSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one key press. Returns true when the accumulated sequence
    /// exactly equals the full chord, in order.
    pub fn observe(&mut self, code: u16, now: Instant) -> bool {
        if let Some(last) = self.last_update {
            if now.duration_since(last) > EXIT_WINDOW {
                self.seen.clear();
            }
        }

        if !EXIT_CHORD.contains(&code) {
            return false;
        }

        // A held chord key autorepeating must not duplicate its entry.
        if self.seen.last() != Some(&code) {
            self.seen.push(code);
        }
        self.last_update = Some(now);

        self.seen == EXIT_CHORD
    }

    pub fn partial_len(&self) -> usize {
        self.seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stuck_key_sweeps_after_threshold() {
        let start = Instant::now();
        let mut tracker = StuckKeyTracker::new();
        tracker.key_pressed(30, start);
        tracker.key_pressed(31, start + Duration::from_secs(3));

        let swept = tracker.sweep(start + Duration::from_secs(6));
        assert_eq!(swept, vec![30]);
        assert_eq!(tracker.tracked(), 1);
    }

    #[test]
    fn test_stuck_key_warns_only_once() {
        let start = Instant::now();
        let mut tracker = StuckKeyTracker::new();
        tracker.key_pressed(30, start);

        assert_eq!(tracker.sweep(start + Duration::from_secs(6)).len(), 1);
        // Entry was removed, so a later sweep finds nothing.
        assert!(tracker.sweep(start + Duration::from_secs(12)).is_empty());
    }

    #[test]
    fn test_release_clears_tracking() {
        let start = Instant::now();
        let mut tracker = StuckKeyTracker::new();
        tracker.key_pressed(30, start);
        tracker.key_released(30);
        assert!(tracker.sweep(start + Duration::from_secs(10)).is_empty());
    }

    #[test]
    fn test_exit_chord_in_order_fires() {
        let start = Instant::now();
        let mut seq = ExitSequence::new();
        assert!(!seq.observe(KEY_LEFTCTRL, start));
        assert!(!seq.observe(KEY_LEFTALT, start + Duration::from_millis(200)));
        assert!(seq.observe(KEY_ESC, start + Duration::from_millis(400)));
    }

    #[test]
    fn test_exit_chord_with_gap_does_not_fire() {
        let start = Instant::now();
        let mut seq = ExitSequence::new();
        assert!(!seq.observe(KEY_LEFTCTRL, start));
        assert!(!seq.observe(KEY_LEFTALT, start + Duration::from_millis(500)));
        // More than a second since the last chord key: window resets.
        assert!(!seq.observe(KEY_ESC, start + Duration::from_millis(1600)));
        assert_eq!(seq.partial_len(), 1);
    }

    #[test]
    fn test_partial_chord_does_not_fire() {
        let start = Instant::now();
        let mut seq = ExitSequence::new();
        assert!(!seq.observe(KEY_LEFTCTRL, start));
        assert!(!seq.observe(KEY_LEFTALT, start + Duration::from_millis(100)));
        assert_eq!(seq.partial_len(), 2);
    }

    #[test]
    fn test_wrong_order_does_not_fire() {
        let start = Instant::now();
        let mut seq = ExitSequence::new();
        assert!(!seq.observe(KEY_LEFTALT, start));
        assert!(!seq.observe(KEY_LEFTCTRL, start + Duration::from_millis(100)));
        assert!(!seq.observe(KEY_ESC, start + Duration::from_millis(200)));
    }

    #[test]
    fn test_repeated_chord_key_not_duplicated() {
        let start = Instant::now();
        let mut seq = ExitSequence::new();
        assert!(!seq.observe(KEY_LEFTCTRL, start));
        assert!(!seq.observe(KEY_LEFTCTRL, start + Duration::from_millis(50)));
        assert_eq!(seq.partial_len(), 1);
        assert!(!seq.observe(KEY_LEFTALT, start + Duration::from_millis(100)));
        assert!(seq.observe(KEY_ESC, start + Duration::from_millis(150)));
    }

    #[test]
    fn test_non_chord_key_is_ignored() {
        let start = Instant::now();
        let mut seq = ExitSequence::new();
        assert!(!seq.observe(KEY_LEFTCTRL, start));
        assert!(!seq.observe(30, start + Duration::from_millis(50)));
        // Non-chord keys neither extend nor clear the in-window sequence.
        assert_eq!(seq.partial_len(), 1);
    }
}
