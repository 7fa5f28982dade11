// Keyflux Layout Engine
// Layout documents, persisted state and the layer state machine

mod document;
mod engine;
mod state;
pub mod unicode;

pub use document::{LayerKeyBinding, LayerType, LayoutDocument, LayoutError};
pub use engine::LayoutEngine;
pub use state::{PersistedState, StateError, DEFAULT_LAYER, DEFAULT_LAYOUT};
