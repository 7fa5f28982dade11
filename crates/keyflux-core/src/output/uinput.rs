// Keyflux uinput Output Layer
// Virtual device for raw key forwarding and control-character taps

use evdev::{EventType, InputEvent};

use crate::key::{KEY_BACKSPACE, KEY_ENTER, KEY_ESC, KEY_SPACE, KEY_TAB};

/// Modifier key codes released by `release_all`, left and right variants.
const ALL_MODIFIER_CODES: [u16; 8] = [29, 97, 42, 54, 56, 100, 125, 126];

/// Error types for uinput operations
#[derive(Debug, thiserror::Error)]
pub enum UInputError {
    #[error("failed to create virtual device: {0}")]
    DeviceCreation(String),

    #[error("failed to write event: {0}")]
    WriteError(String),
}

/// Virtual uinput keyboard. Raw events from the grabbed physical device are
/// replayed through here so the rest of the system still sees them.
pub struct VirtualKeyboard {
    device: evdev::uinput::VirtualDevice,
}

impl VirtualKeyboard {
    pub fn new() -> Result<Self, UInputError> {
        use evdev::uinput::VirtualDeviceBuilder;
        use evdev::{AttributeSet, Key};

        fn creation(e: std::io::Error) -> UInputError {
            UInputError::DeviceCreation(e.to_string())
        }

        // Every key code the physical device could send must be replayable.
        let mut keys: AttributeSet<Key> = AttributeSet::new();
        for code in 0..256u16 {
            keys.insert(Key::new(code));
        }

        let device = VirtualDeviceBuilder::new()
            .map_err(creation)?
            .name("Keyflux Virtual Keyboard")
            .with_keys(&keys)
            .map_err(creation)?
            .build()
            .map_err(creation)?;

        log::info!("virtual output device created");
        Ok(Self { device })
    }

    /// Replay a raw key event with its original value, followed by SYN.
    pub fn forward_raw(&mut self, code: u16, value: i32) -> Result<(), UInputError> {
        self.emit(code, value)
    }

    /// Press-and-release tap, used for control characters.
    pub fn tap(&mut self, code: u16) -> Result<(), UInputError> {
        self.emit(code, 1)?;
        self.emit(code, 0)
    }

    /// Best-effort release of every modifier on the virtual device, so a
    /// shutdown can never leave Ctrl or Super latched downstream.
    pub fn release_all_modifiers(&mut self) {
        for code in ALL_MODIFIER_CODES {
            if let Err(e) = self.emit(code, 0) {
                log::warn!("failed to release modifier {}: {}", code, e);
            }
        }
    }

    fn emit(&mut self, code: u16, value: i32) -> Result<(), UInputError> {
        let key_event = InputEvent::new(EventType::KEY, code, value);
        // SYN is required for the kernel to process the key event.
        let syn_event = InputEvent::new(EventType::SYNCHRONIZATION, 0, 0);
        self.device
            .emit(&[key_event, syn_event])
            .map_err(|e: std::io::Error| UInputError::WriteError(e.to_string()))
    }
}

/// Key code that taps out a control character, when the character has one.
pub fn control_key_for(ch: char) -> Option<u16> {
    match ch {
        '\n' => Some(KEY_ENTER),
        ' ' => Some(KEY_SPACE),
        '\u{8}' => Some(KEY_BACKSPACE),
        '\t' => Some(KEY_TAB),
        '\u{1b}' => Some(KEY_ESC),
        _ => None,
    }
}
