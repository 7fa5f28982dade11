// Keyflux Input Layer - Semantic Events
// Normalized representation of raw device events

use std::time::SystemTime;

/// The kind of a semantic event produced by the ingestion loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Press,
    Release,
    /// Synthesized by the repeat timer while a key is held.
    Repeat,
    /// A tracked modifier changed state.
    ModifierChange,
    /// Carries the original press/release value for unconditional forwarding
    /// to the virtual device.
    RawForward,
}

/// A normalized key event. Produced by the ingestion loop, consumed exactly
/// once by the dispatch loop; ownership moves across the queue.
#[derive(Debug, Clone)]
pub struct SemanticEvent {
    pub kind: EventKind,
    /// Layout identifier for the key, e.g. "key_a".
    pub key: String,
    pub code: u16,
    pub active: bool,
    pub timestamp: SystemTime,
    /// Raw evdev value; only meaningful for RawForward events.
    pub value: i32,
}

impl SemanticEvent {
    pub fn press(key: String, code: u16, timestamp: SystemTime) -> Self {
        Self {
            kind: EventKind::Press,
            key,
            code,
            active: true,
            timestamp,
            value: 1,
        }
    }

    pub fn release(key: String, code: u16, timestamp: SystemTime) -> Self {
        Self {
            kind: EventKind::Release,
            key,
            code,
            active: false,
            timestamp,
            value: 0,
        }
    }

    pub fn repeat(key: String, code: u16, timestamp: SystemTime) -> Self {
        Self {
            kind: EventKind::Repeat,
            key,
            code,
            active: true,
            timestamp,
            value: 2,
        }
    }

    pub fn modifier_change(key: String, code: u16, active: bool, timestamp: SystemTime) -> Self {
        Self {
            kind: EventKind::ModifierChange,
            key,
            code,
            active,
            timestamp,
            value: if active { 1 } else { 0 },
        }
    }

    pub fn raw_forward(key: String, code: u16, value: i32, timestamp: SystemTime) -> Self {
        Self {
            kind: EventKind::RawForward,
            key,
            code,
            active: false,
            timestamp,
            value,
        }
    }
}
