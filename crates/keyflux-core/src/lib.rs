// Keyflux Core Library
// Device capture, event pipeline and layout resolution for keyboard remapping

pub mod cancel;
pub mod dispatch;
pub mod event;
pub mod input;
pub mod key;
pub mod layout;
pub mod modifier;
pub mod output;
pub mod paths;

pub use cancel::CancelToken;
pub use dispatch::DispatchLoop;
pub use event::ingest::{EventPipeline, IngestLoop};
pub use event::queue::EventQueue;
pub use event::repeat::RepeatTimer;
pub use event::safety::{ExitSequence, StuckKeyTracker};
pub use input::device::{DeviceError, GrabbedKeyboard, KeyboardCandidate};
pub use input::event::{EventKind, SemanticEvent};
pub use key::key_name;
pub use layout::{
    LayerKeyBinding, LayerType, LayoutDocument, LayoutEngine, LayoutError, PersistedState,
    StateError, DEFAULT_LAYER, DEFAULT_LAYOUT,
};
pub use modifier::{Modifier, ModifierState, SharedModifiers};
pub use output::{CharacterSink, Injector, VirtualKeyboard};
pub use paths::ConfigPaths;
