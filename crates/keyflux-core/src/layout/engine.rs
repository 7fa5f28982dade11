// Keyflux Layer Engine
// Resolves key events to characters through the hold/toggle/onetime
// layer state machine

use indexmap::IndexMap;
use std::path::PathBuf;

use super::document::{LayerType, LayoutDocument};
use super::state::PersistedState;
use super::unicode;

/// Runtime layer state. Owned exclusively by the dispatch loop's call path.
#[derive(Debug, Default)]
struct LayerState {
    /// Toggle flags in document order; several may be set at once.
    toggles: IndexMap<String, bool>,
    /// Pending one-time layer, cleared after one resolved character.
    onetime: Option<String>,
    /// Active hold layer and the key code holding it.
    hold: Option<String>,
    hold_code: Option<u16>,
}

/// Owns the active layout document and decides what each key produces.
pub struct LayoutEngine {
    document: LayoutDocument,
    state: PersistedState,
    state_path: PathBuf,
    layers: LayerState,
}

impl LayoutEngine {
    /// Build the engine, seeding toggle flags from the persisted state so a
    /// reload reproduces the prior session's toggle set exactly.
    pub fn new(document: LayoutDocument, state: PersistedState, state_path: PathBuf) -> Self {
        let mut layers = LayerState::default();
        for layer in document.toggle_layers() {
            layers.toggles.insert(layer.to_string(), state.toggle(layer));
        }
        log::info!(
            "layout '{}' loaded: {} keys, {} layers, {} layer keys",
            document.name(),
            document.source_len(),
            document.layer_count(),
            document.layer_key_count()
        );
        Self {
            document,
            state,
            state_path,
            layers,
        }
    }

    /// Resolve a press/repeat of `key` to the character it produces, if any.
    /// None means either "forward to the system" (unknown key, empty token)
    /// or "consumed by a layer key".
    pub fn resolve(&mut self, key: &str, code: u16) -> Option<char> {
        let pos = self.document.position(key)?;

        let base_token = match self.document.token("base", pos) {
            Some(t) => t,
            None => {
                log::warn!("base layer missing from layout '{}'", self.document.name());
                return None;
            }
        };
        let canonical = clean_token(base_token);

        // A layer key may be registered under its key identifier or under
        // its base-grid token.
        let binding = self
            .document
            .binding(key)
            .or_else(|| self.document.binding(&canonical))
            .cloned();
        if let Some(binding) = binding {
            match binding.layer_type {
                LayerType::Hold => {
                    log::info!("hold layer '{}' activated", binding.layer);
                    self.layers.hold = Some(binding.layer);
                    self.layers.hold_code = Some(code);
                }
                LayerType::Toggle => {
                    // Flip based on whether the layer is the one currently
                    // resolved, not on its stored flag.
                    let active = self.current_layer() == binding.layer;
                    self.layers.toggles.insert(binding.layer.clone(), !active);
                    log::info!(
                        "toggle layer '{}' {}",
                        binding.layer,
                        if active { "deactivated" } else { "activated" }
                    );
                    self.persist_toggles();
                }
                LayerType::Onetime => {
                    log::info!("onetime layer '{}' activated", binding.layer);
                    self.layers.onetime = Some(binding.layer);
                }
            }
            return None;
        }

        let layer = self.current_layer().to_string();
        let token = match self.document.token(&layer, pos) {
            Some(t) => t.to_string(),
            None => {
                log::warn!("layer '{}' missing or position {} out of range", layer, pos);
                return None;
            }
        };

        // The one-time layer is consumed by this read, even if the token
        // decodes to nothing.
        if let Some(consumed) = self.layers.onetime.take() {
            log::debug!("onetime layer '{}' consumed", consumed);
        }

        decode_token(&token)
    }

    /// Hold-layer bookkeeping: releasing the trigger key deactivates it.
    pub fn on_key_release(&mut self, code: u16) {
        if self.layers.hold_code == Some(code) {
            if let Some(layer) = self.layers.hold.take() {
                log::debug!("hold layer '{}' deactivated", layer);
            }
            self.layers.hold_code = None;
        }
    }

    /// The layer resolution reads from right now, by priority:
    /// onetime > hold > first active toggle > base.
    pub fn current_layer(&self) -> &str {
        if let Some(layer) = &self.layers.onetime {
            return layer;
        }
        if let Some(layer) = &self.layers.hold {
            return layer;
        }
        for (layer, active) in &self.layers.toggles {
            if *active {
                return layer;
            }
        }
        "base"
    }

    pub fn document(&self) -> &LayoutDocument {
        &self.document
    }

    fn persist_toggles(&mut self) {
        for (layer, active) in &self.layers.toggles {
            self.state.set_toggle(layer, *active);
        }
        if let Err(e) = self.state.save(&self.state_path) {
            log::warn!("failed to save state to {}: {}", self.state_path.display(), e);
        }
    }
}

/// Strip quoting and whitespace from a grid token.
fn clean_token(token: &str) -> String {
    token
        .chars()
        .filter(|c| *c != '"' && *c != '\'' && !c.is_whitespace())
        .collect()
}

/// Decode a grid token into the character it emits: literal escape tokens
/// first, otherwise the leading UTF-8 sequence of the token's bytes.
fn decode_token(token: &str) -> Option<char> {
    match token {
        "" => None,
        "\\n" => Some('\n'),
        "\\t" => Some('\t'),
        "\\b" => Some('\u{8}'),
        "\\x1b" => Some('\u{1b}'),
        " " => Some(' '),
        _ => unicode::decode_char(token.as_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYOUT: &str = r#"
source = ["key_a", "key_s", "key_d", "key_f", "key_g", "key_h"]

[layers]
base = ["a", "s", "lysym", "lynum", "lyacc", "h"]
sym = ["!", "@", "", "", ""]
num = ["1", "2", "", "", ""]
acc = ["á", "é", "", "", ""]

[layer_keys.sym]
key = "lysym"
type = "hold"

[layer_keys.num]
key = "lynum"
type = "toggle"

[layer_keys.acc]
key = "lyacc"
type = "onetime"
"#;

    fn engine() -> (LayoutEngine, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let doc = LayoutDocument::from_toml_str(LAYOUT, "test").unwrap();
        let state_path = dir.path().join("state.toml");
        let engine = LayoutEngine::new(doc, PersistedState::default(), state_path);
        (engine, dir)
    }

    #[test]
    fn test_base_layer_resolution() {
        let (mut engine, _dir) = engine();
        assert_eq!(engine.resolve("key_a", 30), Some('a'));
        assert_eq!(engine.current_layer(), "base");
    }

    #[test]
    fn test_unknown_key_forwards() {
        let (mut engine, _dir) = engine();
        assert_eq!(engine.resolve("key_q", 16), None);
    }

    #[test]
    fn test_hold_layer_lifecycle() {
        let (mut engine, _dir) = engine();
        // Pressing the hold layer key produces nothing and activates sym.
        assert_eq!(engine.resolve("key_d", 32), None);
        assert_eq!(engine.current_layer(), "sym");
        assert_eq!(engine.resolve("key_a", 30), Some('!'));

        engine.on_key_release(32);
        assert_eq!(engine.current_layer(), "base");
        assert_eq!(engine.resolve("key_a", 30), Some('a'));
    }

    #[test]
    fn test_hold_release_of_other_key_keeps_layer() {
        let (mut engine, _dir) = engine();
        engine.resolve("key_d", 32);
        engine.on_key_release(30);
        assert_eq!(engine.current_layer(), "sym");
    }

    #[test]
    fn test_toggle_layer_flips_and_persists() {
        let (mut engine, dir) = engine();
        assert_eq!(engine.resolve("key_f", 33), None);
        assert_eq!(engine.current_layer(), "num");
        assert_eq!(engine.resolve("key_a", 30), Some('1'));

        // The flip was written to disk immediately.
        let saved = PersistedState::load(&dir.path().join("state.toml"));
        assert!(saved.toggle("num"));

        assert_eq!(engine.resolve("key_f", 33), None);
        assert_eq!(engine.current_layer(), "base");
        let saved = PersistedState::load(&dir.path().join("state.toml"));
        assert!(!saved.toggle("num"));
    }

    #[test]
    fn test_toggle_round_trip_restores_flag() {
        let dir = tempfile::tempdir().unwrap();
        let state_path = dir.path().join("state.toml");

        let doc = LayoutDocument::from_toml_str(LAYOUT, "test").unwrap();
        let mut engine = LayoutEngine::new(doc, PersistedState::default(), state_path.clone());
        engine.resolve("key_f", 33); // toggle num on

        // New session from the saved state.
        let doc = LayoutDocument::from_toml_str(LAYOUT, "test").unwrap();
        let reloaded = PersistedState::load(&state_path);
        let engine = LayoutEngine::new(doc, reloaded, state_path);
        assert_eq!(engine.current_layer(), "num");
    }

    #[test]
    fn test_onetime_layer_single_use() {
        let (mut engine, _dir) = engine();
        assert_eq!(engine.resolve("key_g", 34), None);
        assert_eq!(engine.current_layer(), "acc");

        assert_eq!(engine.resolve("key_a", 30), Some('á'));
        // Consumed: next press reads from base again.
        assert_eq!(engine.resolve("key_a", 30), Some('a'));
    }

    #[test]
    fn test_layer_priority_onetime_over_hold_over_toggle() {
        let (mut engine, _dir) = engine();
        engine.resolve("key_f", 33); // toggle num on
        engine.resolve("key_d", 32); // hold sym
        engine.resolve("key_g", 34); // onetime acc

        assert_eq!(engine.current_layer(), "acc");
        assert_eq!(engine.resolve("key_s", 31), Some('é'));
        // Onetime consumed, hold is next by priority.
        assert_eq!(engine.current_layer(), "sym");
        assert_eq!(engine.resolve("key_s", 31), Some('@'));

        engine.on_key_release(32);
        assert_eq!(engine.current_layer(), "num");
        assert_eq!(engine.resolve("key_s", 31), Some('2'));
    }

    #[test]
    fn test_empty_token_produces_nothing() {
        let (mut engine, _dir) = engine();
        engine.resolve("key_d", 32); // hold sym; key_h padded to "" in sym
        assert_eq!(engine.resolve("key_s", 31), Some('@'));
        assert_eq!(engine.resolve("key_h", 35), None);
    }

    #[test]
    fn test_onetime_consumed_even_on_empty_token() {
        let (mut engine, _dir) = engine();
        engine.resolve("key_g", 34); // onetime acc; key_h padded to "" in acc
        assert_eq!(engine.resolve("key_h", 35), None);
        assert_eq!(engine.current_layer(), "base");
    }

    #[test]
    fn test_clean_token() {
        assert_eq!(clean_token("\"lysym\""), "lysym");
        assert_eq!(clean_token("'a'"), "a");
        assert_eq!(clean_token("  spaced  "), "spaced");
    }

    #[test]
    fn test_decode_token_escapes() {
        assert_eq!(decode_token("\\n"), Some('\n'));
        assert_eq!(decode_token("\\t"), Some('\t'));
        assert_eq!(decode_token("\\b"), Some('\u{8}'));
        assert_eq!(decode_token("\\x1b"), Some('\u{1b}'));
        assert_eq!(decode_token(" "), Some(' '));
        assert_eq!(decode_token(""), None);
        assert_eq!(decode_token("ω"), Some('ω'));
        assert_eq!(decode_token("a"), Some('a'));
    }

    #[test]
    fn test_binding_by_key_identifier() {
        // The binding names the key identifier rather than a base-grid token.
        let toml = r#"
source = ["key_a", "key_b"]

[layers]
base = ["a", "b"]
sym = ["1", "2"]

[layer_keys.sym]
key = "key_b"
type = "hold"
"#;
        let dir = tempfile::tempdir().unwrap();
        let doc = LayoutDocument::from_toml_str(toml, "test").unwrap();
        let mut engine =
            LayoutEngine::new(doc, PersistedState::default(), dir.path().join("state.toml"));

        assert_eq!(engine.resolve("key_b", 48), None);
        assert_eq!(engine.current_layer(), "sym");
        assert_eq!(engine.resolve("key_a", 30), Some('1'));
        engine.on_key_release(48);
        assert_eq!(engine.resolve("key_a", 30), Some('a'));
    }
}
