// Keyflux Output Layer
// Character injection and raw event forwarding

pub mod typer;
pub mod uinput;
pub mod window;

pub use typer::{ExternalTyper, TyperKind};
pub use uinput::{UInputError, VirtualKeyboard};
pub use window::{active_window_info, is_high_priority_injection_context, WindowInfo};

/// Downstream end of the pipeline. The dispatch loop drives one of these
/// with resolved characters and raw passthrough events.
pub trait CharacterSink {
    /// Emit a single resolved character. Returns false when injection
    /// failed and the character was lost.
    fn send_character(&mut self, ch: char) -> bool;

    /// Replay a raw key event unchanged.
    fn forward_raw_key(&mut self, code: u16, value: i32);

    /// Release every modifier on the output side.
    fn release_all_modifiers(&mut self);
}

/// Production sink. Control characters are tapped on the virtual device,
/// printable text goes through an external typing tool chosen per focused
/// window, and raw events are replayed on the virtual device.
pub struct Injector {
    keyboard: VirtualKeyboard,
    wtype: Option<ExternalTyper>,
    xdotool: Option<ExternalTyper>,
}

impl Injector {
    pub fn new() -> Result<Self, UInputError> {
        let wtype = ExternalTyper::probe(TyperKind::Wtype);
        let xdotool = ExternalTyper::probe(TyperKind::Xdotool);
        if wtype.is_none() && xdotool.is_none() {
            log::warn!("neither wtype nor xdotool found, character output disabled");
        }
        Ok(Self {
            keyboard: VirtualKeyboard::new()?,
            wtype,
            xdotool,
        })
    }

    /// Pick the typing tool for the currently focused window: xdotool for
    /// high-priority contexts when available, otherwise wtype with xdotool
    /// as fallback.
    fn pick_typer(&self) -> Option<&ExternalTyper> {
        if is_high_priority_injection_context() {
            if let Some(t) = self.xdotool.as_ref() {
                return Some(t);
            }
        }
        self.wtype.as_ref().or(self.xdotool.as_ref())
    }
}

impl CharacterSink for Injector {
    fn send_character(&mut self, ch: char) -> bool {
        if let Some(code) = uinput::control_key_for(ch) {
            return match self.keyboard.tap(code) {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("control tap failed: {}", e);
                    false
                }
            };
        }

        match self.pick_typer() {
            Some(typer) => typer.type_char(ch),
            None => false,
        }
    }

    fn forward_raw_key(&mut self, code: u16, value: i32) {
        if let Err(e) = self.keyboard.forward_raw(code, value) {
            log::warn!("raw forward of {} failed: {}", code, e);
        }
    }

    fn release_all_modifiers(&mut self) {
        self.keyboard.release_all_modifiers();
    }
}
