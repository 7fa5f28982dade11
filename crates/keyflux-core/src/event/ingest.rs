// Keyflux Ingestion Loop
// Drains the grabbed device on a fixed cadence and feeds the event queue

use std::io;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant, SystemTime};

use crate::cancel::CancelToken;
use crate::event::queue::EventQueue;
use crate::event::repeat::RepeatTimer;
use crate::event::safety::{ExitSequence, StuckKeyTracker};
use crate::input::{GrabbedKeyboard, SemanticEvent};
use crate::key::key_name;
use crate::modifier::{Modifier, SharedModifiers};

/// Fixed cadence of the poll loop; also bounds repeat-timer resolution.
pub const POLL_INTERVAL: Duration = Duration::from_millis(5);
/// Back-off after a genuine read error.
const ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Translates raw (code, value) events into semantic events, maintaining
/// repeat, modifier and safety state. Owned exclusively by the ingestion
/// thread; split out so tests can feed events without a device.
pub struct EventPipeline {
    queue: Arc<EventQueue>,
    modifiers: SharedModifiers,
    repeat: RepeatTimer,
    stuck: StuckKeyTracker,
    exit_sequence: ExitSequence,
}

impl EventPipeline {
    pub fn new(queue: Arc<EventQueue>, modifiers: SharedModifiers) -> Self {
        Self {
            queue,
            modifiers,
            repeat: RepeatTimer::new(),
            stuck: StuckKeyTracker::new(),
            exit_sequence: ExitSequence::new(),
        }
    }

    /// Process one raw key event. Returns true when the emergency exit chord
    /// completed; the caller must terminate the process.
    pub fn handle_raw(&mut self, code: u16, value: i32, now: Instant) -> bool {
        let ts = SystemTime::now();

        // Safety tracking first: a release must cancel repeat before any
        // other handling, so a repeat can never outlive its release.
        match value {
            1 => self.stuck.key_pressed(code, now),
            0 => {
                self.stuck.key_released(code);
                self.repeat.key_released(code);
            }
            _ => {}
        }

        if value == 1 && self.exit_sequence.observe(code, now) {
            return true;
        }

        if let Some(modifier) = Modifier::from_code(code) {
            self.modifiers.set(modifier, value > 0);
            let name = key_name(code);
            self.queue
                .push(SemanticEvent::modifier_change(name.clone(), code, value > 0, ts));
            self.queue.push(SemanticEvent::raw_forward(name, code, value, ts));
            // Modifiers never flow through repeat or press/release handling.
            return false;
        }

        match value {
            1 => {
                self.repeat.key_pressed(code, now);
                self.queue.push(SemanticEvent::press(key_name(code), code, ts));
            }
            0 => {
                self.queue.push(SemanticEvent::release(key_name(code), code, ts));
            }
            // Kernel autorepeat; we synthesize our own repeats.
            _ => {}
        }

        false
    }

    /// Sweep the stuck-key tracker once. Runs every poll cycle, since a
    /// stuck key by definition produces no further events to react to.
    pub fn sweep_stuck(&mut self, now: Instant) -> Vec<u16> {
        self.stuck.sweep(now)
    }

    /// Evaluate the repeat timer once; enqueues a Repeat event when due.
    pub fn tick_repeat(&mut self, now: Instant) {
        if let Some(code) = self.repeat.poll(now) {
            self.queue
                .push(SemanticEvent::repeat(key_name(code), code, SystemTime::now()));
        }
    }
}

/// The producer side: owns the grabbed keyboard for its whole lifetime and
/// runs until the cancel token fires. Dropping the keyboard at thread exit
/// releases the grab; the owner joins the handle before moving on.
pub struct IngestLoop {
    keyboard: GrabbedKeyboard,
    pipeline: EventPipeline,
    cancel: CancelToken,
}

impl IngestLoop {
    pub fn new(
        keyboard: GrabbedKeyboard,
        queue: Arc<EventQueue>,
        modifiers: SharedModifiers,
        cancel: CancelToken,
    ) -> Self {
        Self {
            keyboard,
            pipeline: EventPipeline::new(queue, modifiers),
            cancel,
        }
    }

    /// Spawn the ingestion thread.
    pub fn spawn(self) -> JoinHandle<()> {
        std::thread::Builder::new()
            .name("keyflux-ingest".to_string())
            .spawn(move || self.run())
            .expect("failed to spawn ingestion thread")
    }

    fn run(mut self) {
        log::info!("ingestion loop started for '{}'", self.keyboard.name());
        while !self.cancel.is_cancelled() {
            self.drain_available();
            let now = Instant::now();
            self.pipeline.tick_repeat(now);
            self.pipeline.sweep_stuck(now);
            std::thread::sleep(POLL_INTERVAL);
        }
        log::info!("ingestion loop stopped");
    }

    fn drain_available(&mut self) {
        match self.keyboard.fetch_key_events() {
            Ok(events) => {
                for (code, value) in events {
                    if self.pipeline.handle_raw(code, value, Instant::now()) {
                        // Last-resort safety valve: bypass all cleanup. The
                        // grab dies with the process.
                        log::error!("emergency exit chord pressed, terminating");
                        std::process::exit(0);
                    }
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) => {
                log::error!("input read error: {}; backing off", e);
                std::thread::sleep(ERROR_BACKOFF);
            }
        }
    }
}
