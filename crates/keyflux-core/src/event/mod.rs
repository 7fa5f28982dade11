// Keyflux Event Handling
// Queue, repeat timing, safety nets and the ingestion loop

pub mod ingest;
pub mod queue;
pub mod repeat;
pub mod safety;

pub use ingest::{EventPipeline, IngestLoop, POLL_INTERVAL};
pub use queue::EventQueue;
pub use repeat::{RepeatTimer, INITIAL_DELAY};
pub use safety::{ExitSequence, StuckKeyTracker, EXIT_CHORD, EXIT_WINDOW, STUCK_THRESHOLD};
