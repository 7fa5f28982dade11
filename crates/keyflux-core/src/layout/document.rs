// Keyflux Layout Document
// Parses a layout file into an immutable, fixed-shape document

use indexmap::IndexMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Errors raised while loading a layout. All of these abort startup.
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("layout file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read layout file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse layout: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("layout has an empty 'source' list")]
    EmptySource,
}

/// How a layer is entered and left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerType {
    /// Active only while the trigger key is held.
    Hold,
    /// Flips on key press; persists across releases and sessions.
    Toggle,
    /// Active for exactly the next resolved character.
    Onetime,
}

impl LayerType {
    fn parse(s: &str) -> LayerType {
        match s.to_lowercase().as_str() {
            "toggle" => LayerType::Toggle,
            "onetime" => LayerType::Onetime,
            _ => LayerType::Hold,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LayerType::Hold => "hold",
            LayerType::Toggle => "toggle",
            LayerType::Onetime => "onetime",
        }
    }
}

/// A registered layer key: what it activates and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerKeyBinding {
    pub layer: String,
    pub layer_type: LayerType,
}

// Raw serde form, kept private: the public document is the normalized shape.
#[derive(Debug, Deserialize)]
struct RawLayout {
    source: Vec<String>,
    layers: IndexMap<String, Vec<String>>,
    #[serde(default)]
    layer_keys: IndexMap<String, RawLayerKey>,
}

#[derive(Debug, Deserialize)]
struct RawLayerKey {
    key: KeySpec,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum KeySpec {
    One(String),
    Many(Vec<String>),
}

impl KeySpec {
    fn into_vec(self) -> Vec<String> {
        match self {
            KeySpec::One(key) => vec![key],
            KeySpec::Many(keys) => keys,
        }
    }
}

/// The active layout: position index, normalized per-layer character grids
/// and layer-key bindings. Immutable for the whole session.
#[derive(Debug, Clone)]
pub struct LayoutDocument {
    name: String,
    positions: IndexMap<String, usize>,
    layers: IndexMap<String, Vec<String>>,
    layer_keys: IndexMap<String, LayerKeyBinding>,
}

impl LayoutDocument {
    /// Load and normalize a layout file.
    pub fn load(path: &Path, name: &str) -> Result<Self, LayoutError> {
        if !path.exists() {
            return Err(LayoutError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content, name)
    }

    /// Parse a layout from TOML and normalize it into the fixed shape.
    pub fn from_toml_str(content: &str, name: &str) -> Result<Self, LayoutError> {
        let raw: RawLayout = toml::from_str(content)?;
        Self::normalize(raw, name)
    }

    /// Pure transformation from the parsed tree to the fixed-shape document:
    /// every layer grid ends up exactly source-length, short grids padded
    /// with empty tokens, long grids truncated.
    fn normalize(raw: RawLayout, name: &str) -> Result<Self, LayoutError> {
        if raw.source.is_empty() {
            return Err(LayoutError::EmptySource);
        }

        let positions: IndexMap<String, usize> = raw
            .source
            .into_iter()
            .enumerate()
            .map(|(i, key)| (key, i))
            .collect();
        let source_len = positions.len();

        let layers: IndexMap<String, Vec<String>> = raw
            .layers
            .into_iter()
            .map(|(layer_name, grid)| {
                if grid.len() != source_len {
                    log::warn!(
                        "layer '{}' has {} entries, normalizing to {}",
                        layer_name,
                        grid.len(),
                        source_len
                    );
                }
                let normalized: Vec<String> = grid
                    .into_iter()
                    .chain(std::iter::repeat(String::new()))
                    .take(source_len)
                    .collect();
                (layer_name, normalized)
            })
            .collect();

        let mut layer_keys = IndexMap::new();
        for (layer_name, config) in raw.layer_keys {
            // The base layer is the fallback, never a layer-key target.
            if layer_name == "base" {
                log::warn!("ignoring layer_keys entry for the base layer");
                continue;
            }
            let layer_type = config
                .kind
                .as_deref()
                .map(LayerType::parse)
                .unwrap_or(LayerType::Hold);
            for key in config.key.into_vec() {
                layer_keys.insert(
                    key,
                    LayerKeyBinding {
                        layer: layer_name.clone(),
                        layer_type,
                    },
                );
            }
        }

        Ok(Self {
            name: name.to_string(),
            positions,
            layers,
            layer_keys,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_len(&self) -> usize {
        self.positions.len()
    }

    /// Ordinal position of a key identifier, if the layout maps it.
    pub fn position(&self, key: &str) -> Option<usize> {
        self.positions.get(key).copied()
    }

    pub fn has_layer(&self, layer: &str) -> bool {
        self.layers.contains_key(layer)
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Token at `pos` in `layer`. None if the layer is missing; positions
    /// are always in range after normalization.
    pub fn token(&self, layer: &str, pos: usize) -> Option<&str> {
        self.layers.get(layer)?.get(pos).map(String::as_str)
    }

    pub fn binding(&self, key: &str) -> Option<&LayerKeyBinding> {
        self.layer_keys.get(key)
    }

    pub fn layer_key_count(&self) -> usize {
        self.layer_keys.len()
    }

    /// Names of toggle-type layers, in document order (stable for the
    /// session, which fixes toggle-priority iteration).
    pub fn toggle_layers(&self) -> impl Iterator<Item = &str> {
        self.layer_keys
            .values()
            .filter(|b| b.layer_type == LayerType::Toggle)
            .map(|b| b.layer.as_str())
    }
}
