// Keyflux Dispatch Loop
// Consumes semantic events and drives the layout engine and output sink

use std::sync::Arc;
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::event::queue::EventQueue;
use crate::input::event::{EventKind, SemanticEvent};
use crate::layout::LayoutEngine;
use crate::modifier::SharedModifiers;
use crate::output::CharacterSink;

/// Poll timeout for the queue, bounds shutdown latency.
const DISPATCH_TIMEOUT: Duration = Duration::from_millis(100);

/// Main-thread consumer. Pulls semantic events off the queue, resolves
/// them through the layout engine and pushes output into the sink.
pub struct DispatchLoop<S: CharacterSink> {
    queue: Arc<EventQueue>,
    engine: LayoutEngine,
    modifiers: SharedModifiers,
    sink: S,
    cancel: CancelToken,
}

impl<S: CharacterSink> DispatchLoop<S> {
    pub fn new(
        queue: Arc<EventQueue>,
        engine: LayoutEngine,
        modifiers: SharedModifiers,
        sink: S,
        cancel: CancelToken,
    ) -> Self {
        Self {
            queue,
            engine,
            modifiers,
            sink,
            cancel,
        }
    }

    /// Run until cancelled. Returns the sink so the caller can release
    /// modifiers during shutdown.
    pub fn run(mut self) -> S {
        while !self.cancel.is_cancelled() {
            if let Some(event) = self.queue.pop(DISPATCH_TIMEOUT, &self.cancel) {
                self.handle(event);
            }
        }
        log::info!("dispatch loop stopped");
        self.sink
    }

    /// Process one semantic event.
    pub fn handle(&mut self, event: SemanticEvent) {
        match event.kind {
            EventKind::Release => {
                self.engine.on_key_release(event.code);
            }
            EventKind::RawForward => {
                self.sink.forward_raw_key(event.code, event.value);
            }
            EventKind::ModifierChange => {
                // State is already tracked on the ingestion side.
            }
            EventKind::Press | EventKind::Repeat => {
                let Some(ch) = self.engine.resolve(&event.key, event.code) else {
                    return;
                };
                let mods = self.modifiers.snapshot();
                if mods.shortcut_bypass() {
                    log::debug!(
                        "bypassing '{}' for shortcut chord ({})",
                        ch,
                        mods.active_names().join("+")
                    );
                    return;
                }
                if !self.sink.send_character(ch) {
                    log::warn!("failed to inject '{}'", ch);
                }
            }
        }
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}
