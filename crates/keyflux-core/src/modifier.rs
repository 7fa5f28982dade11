// Keyflux Modifier Tracking
// Fixed modifier set and the shared state snapshot read by the dispatch loop

use parking_lot::RwLock;
use std::sync::Arc;

/// The closed set of tracked modifiers. Left and right variants map to the
/// same logical modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Shift,
    Ctrl,
    Alt,
    Super,
}

impl Modifier {
    /// All tracked modifiers, in a fixed order.
    pub const ALL: [Modifier; 4] = [
        Modifier::Shift,
        Modifier::Ctrl,
        Modifier::Alt,
        Modifier::Super,
    ];

    /// Map a key code to its logical modifier, if it is one.
    pub fn from_code(code: u16) -> Option<Modifier> {
        match code {
            42 | 54 => Some(Modifier::Shift),
            29 | 97 => Some(Modifier::Ctrl),
            56 | 100 => Some(Modifier::Alt),
            125 | 126 => Some(Modifier::Super),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Modifier::Shift => "shift",
            Modifier::Ctrl => "ctrl",
            Modifier::Alt => "alt",
            Modifier::Super => "super",
        }
    }

    fn index(&self) -> usize {
        match self {
            Modifier::Shift => 0,
            Modifier::Ctrl => 1,
            Modifier::Alt => 2,
            Modifier::Super => 3,
        }
    }
}

/// Snapshot of which logical modifiers are currently down.
///
/// A plain Copy struct: the ingestion loop is the only writer, the dispatch
/// loop only ever sees copies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierState {
    flags: [bool; 4],
}

impl ModifierState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, modifier: Modifier) -> bool {
        self.flags[modifier.index()]
    }

    pub fn set(&mut self, modifier: Modifier, active: bool) {
        self.flags[modifier.index()] = active;
    }

    /// True when the key should act as an unmodified system shortcut:
    /// Ctrl, Alt or Super is down. Shift alone does not count.
    pub fn shortcut_bypass(&self) -> bool {
        self.get(Modifier::Ctrl) || self.get(Modifier::Alt) || self.get(Modifier::Super)
    }

    /// Names of the currently active modifiers, for logging.
    pub fn active_names(&self) -> Vec<&'static str> {
        Modifier::ALL
            .iter()
            .filter(|m| self.get(**m))
            .map(|m| m.as_str())
            .collect()
    }
}

/// Shared handle to the modifier state. The ingestion loop writes, the
/// dispatch loop reads snapshot copies.
#[derive(Debug, Clone, Default)]
pub struct SharedModifiers {
    inner: Arc<RwLock<ModifierState>>,
}

impl SharedModifiers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, modifier: Modifier, active: bool) {
        self.inner.write().set(modifier, active);
    }

    pub fn snapshot(&self) -> ModifierState {
        *self.inner.read()
    }
}
