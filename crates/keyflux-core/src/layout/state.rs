// Keyflux Persisted State
// Active layout/layer and toggle flags, saved across sessions

use std::collections::BTreeMap;
use std::path::Path;

pub const DEFAULT_LAYOUT: &str = "default";
pub const DEFAULT_LAYER: &str = "base";

const TOGGLE_PREFIX: &str = "toggle_";

/// Errors for explicit state-file operations. Loading never surfaces these:
/// a missing or corrupt state file falls back to defaults.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse state file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize state: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Session state that survives restarts: which layout and base layer are
/// active, plus one flag per toggle-type layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedState {
    pub layout: String,
    pub layer: String,
    toggles: BTreeMap<String, bool>,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            layout: DEFAULT_LAYOUT.to_string(),
            layer: DEFAULT_LAYER.to_string(),
            toggles: BTreeMap::new(),
        }
    }
}

impl PersistedState {
    /// Load from the state file. Missing or unparseable files are non-fatal
    /// and produce defaults.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => {
                log::debug!("no state file at {}, using defaults", path.display());
                return Self::default();
            }
        };
        match Self::from_toml_str(&content) {
            Ok(state) => state,
            Err(e) => {
                log::warn!("state file corrupted ({}), using defaults", e);
                Self::default()
            }
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, StateError> {
        let table: toml::Table = toml::from_str(content)?;
        let mut state = Self::default();

        if let Some(layout) = table.get("layout").and_then(|v| v.as_str()) {
            state.layout = layout.to_string();
        }
        if let Some(layer) = table.get("layer").and_then(|v| v.as_str()) {
            state.layer = layer.to_string();
        }
        for (key, value) in &table {
            if let (Some(layer_name), Some(on)) = (key.strip_prefix(TOGGLE_PREFIX), value.as_bool())
            {
                state.toggles.insert(layer_name.to_string(), on);
            }
        }
        Ok(state)
    }

    pub fn to_toml_string(&self) -> Result<String, StateError> {
        let mut table = toml::Table::new();
        table.insert("layout".to_string(), toml::Value::String(self.layout.clone()));
        table.insert("layer".to_string(), toml::Value::String(self.layer.clone()));
        for (layer_name, on) in &self.toggles {
            table.insert(
                format!("{}{}", TOGGLE_PREFIX, layer_name),
                toml::Value::Boolean(*on),
            );
        }
        Ok(toml::to_string(&table)?)
    }

    /// Write the state file. Called on every toggle flip.
    pub fn save(&self, path: &Path) -> Result<(), StateError> {
        std::fs::write(path, self.to_toml_string()?)?;
        log::debug!(
            "state saved: layout={}, layer={}, {} toggle flag(s)",
            self.layout,
            self.layer,
            self.toggles.len()
        );
        Ok(())
    }

    pub fn toggle(&self, layer: &str) -> bool {
        self.toggles.get(layer).copied().unwrap_or(false)
    }

    pub fn set_toggle(&mut self, layer: &str, on: bool) {
        self.toggles.insert(layer.to_string(), on);
    }

    pub fn toggles(&self) -> &BTreeMap<String, bool> {
        &self.toggles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let state = PersistedState::default();
        assert_eq!(state.layout, "default");
        assert_eq!(state.layer, "base");
        assert!(!state.toggle("sym"));
    }

    #[test]
    fn test_round_trip_exact() {
        let mut state = PersistedState::default();
        state.layout = "colemak".to_string();
        state.set_toggle("num", true);
        state.set_toggle("greek", false);

        let serialized = state.to_toml_string().unwrap();
        let reloaded = PersistedState::from_toml_str(&serialized).unwrap();
        assert_eq!(reloaded, state);
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let state = PersistedState::load(&dir.path().join("state.toml"));
        assert_eq!(state, PersistedState::default());
    }

    #[test]
    fn test_load_corrupt_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.toml");
        std::fs::write(&path, "layout = [not valid").unwrap();
        assert_eq!(PersistedState::load(&path), PersistedState::default());
    }

    #[test]
    fn test_save_and_load_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.toml");

        let mut state = PersistedState::default();
        state.set_toggle("sym", true);
        state.save(&path).unwrap();

        let reloaded = PersistedState::load(&path);
        assert!(reloaded.toggle("sym"));
        assert_eq!(reloaded, state);
    }

    #[test]
    fn test_unrelated_keys_ignored() {
        let state =
            PersistedState::from_toml_str("layout = \"x\"\nextra = 3\ntoggle_sym = true\n")
                .unwrap();
        assert_eq!(state.layout, "x");
        assert!(state.toggle("sym"));
        assert_eq!(state.toggles().len(), 1);
    }
}
