// Keyflux Input Layer
// Device selection and the semantic event model

pub mod device;
pub mod event;

pub use device::{
    acquire, candidate_order, endpoint_from_phys, list_candidates, score_candidate, DeviceError,
    GrabbedKeyboard, KeyboardCandidate,
};
pub use event::{EventKind, SemanticEvent};
