// Keyflux Input Layer - Device Selection
// Finds the best physical keyboard and takes exclusive ownership of it

use std::cmp::Ordering;
use std::io;
use std::os::unix::io::AsRawFd;
use std::sync::OnceLock;

use evdev::{Device, EventType, InputEvent, Key};
use regex::Regex;

/// Reference set used to filter out media remotes and macro pads: A-Z, 0-9,
/// both Ctrls/Shifts/Alts, Tab, Esc, Backspace.
const REFERENCE_KEYS: [u16; 45] = [
    30, 48, 46, 32, 18, 33, 34, 35, 23, 36, // a b c d e f g h i j
    37, 38, 50, 49, 24, 25, 16, 19, 31, 20, // k l m n o p q r s t
    22, 47, 17, 45, 21, 44, // u v w x y z
    2, 3, 4, 5, 6, 7, 8, 9, 10, 11, // 1-9, 0
    29, 97, 42, 54, 56, 100, // ctrl, shift, alt pairs
    15, 1, 14, // tab, esc, backspace
];

/// Minimum number of reference keys a device must support.
const MIN_REFERENCE_KEYS: usize = 30;

/// Errors that can occur while acquiring the physical keyboard.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("no qualifying keyboard device found")]
    NoDeviceFound,

    #[error("failed to grab '{name}': {source}")]
    GrabFailed {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// A scored keyboard candidate, built once during selection.
#[derive(Debug, Clone)]
pub struct KeyboardCandidate {
    pub score: i32,
    /// Physical-port endpoint extracted from the phys string, when known.
    pub endpoint: Option<i32>,
    pub name: String,
}

/// Total order over candidates: higher score first, then lower known
/// endpoint (unknown endpoints sort last), then name ascending.
pub fn candidate_order(a: &KeyboardCandidate, b: &KeyboardCandidate) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| match (a.endpoint, b.endpoint) {
            (Some(ea), Some(eb)) => ea.cmp(&eb),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.name.cmp(&b.name))
}

/// Extract the endpoint number from a phys string like
/// "usb-0000:00:14.0-1/input0".
pub fn endpoint_from_phys(phys: &str) -> Option<i32> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let re = PATTERN.get_or_init(|| Regex::new(r"input(\d+)").expect("valid endpoint pattern"));
    re.captures(phys)?.get(1)?.as_str().parse().ok()
}

/// Score a surviving candidate. Endpoint 0 is the primary keyboard port on
/// most USB keyboards; "keyboard" in the advertised name is a weaker hint.
pub fn score_candidate(endpoint: Option<i32>, name: &str) -> i32 {
    let mut score = match endpoint {
        Some(0) => 100,
        Some(n) => 50 - n,
        None => 0,
    };
    if name.to_lowercase().contains("keyboard") {
        score += 10;
    }
    score
}

fn qualifies(device: &Device) -> bool {
    let events = device.supported_events();
    if !events.contains(EventType::KEY) {
        return false;
    }
    // LED capability distinguishes real keyboards from pointers and macro pads.
    if !events.contains(EventType::LED) {
        return false;
    }
    // Pointer axes mean mouse, trackpad or touch device.
    if events.contains(EventType::RELATIVE) || events.contains(EventType::ABSOLUTE) {
        return false;
    }

    let keys = match device.supported_keys() {
        Some(k) => k,
        None => return false,
    };
    let supported = REFERENCE_KEYS
        .iter()
        .filter(|code| keys.contains(Key::new(**code)))
        .count();
    supported >= MIN_REFERENCE_KEYS
}

fn scan() -> Vec<(KeyboardCandidate, Device)> {
    let mut candidates: Vec<(KeyboardCandidate, Device)> = Vec::new();

    for (path, device) in evdev::enumerate() {
        if !qualifies(&device) {
            continue;
        }

        let name = device.name().unwrap_or("Unknown").to_string();
        let endpoint = device.physical_path().and_then(endpoint_from_phys);
        let score = score_candidate(endpoint, &name);

        log::debug!(
            "candidate {}: score={} endpoint={:?} name='{}'",
            path.display(),
            score,
            endpoint,
            name
        );
        candidates.push((
            KeyboardCandidate {
                score,
                endpoint,
                name,
            },
            device,
        ));
    }

    candidates.sort_by(|a, b| candidate_order(&a.0, &b.0));
    candidates
}

/// List scored keyboard candidates without grabbing anything. Used by the
/// --list-devices CLI flag.
pub fn list_candidates() -> Vec<KeyboardCandidate> {
    scan().into_iter().map(|(candidate, _)| candidate).collect()
}

/// Enumerate, score and pick the best physical keyboard, then take exclusive
/// ownership of it. The grab is released when the returned handle drops.
pub fn acquire() -> Result<GrabbedKeyboard, DeviceError> {
    let mut candidates = scan();
    if candidates.is_empty() {
        return Err(DeviceError::NoDeviceFound);
    }

    for (candidate, _) in &candidates {
        log::info!(
            "keyboard candidate: score={} endpoint={} name='{}'",
            candidate.score,
            candidate
                .endpoint
                .map(|e| e.to_string())
                .unwrap_or_else(|| "n/a".to_string()),
            candidate.name
        );
    }

    let (candidate, mut device) = candidates.remove(0);
    // Clear any grab left behind by a crashed prior instance.
    let _ = device.ungrab();
    if let Err(source) = device.grab() {
        return Err(DeviceError::GrabFailed {
            name: candidate.name,
            source,
        });
    }
    set_nonblocking(&device)?;

    log::info!("grabbed keyboard '{}'", candidate.name);
    Ok(GrabbedKeyboard {
        device,
        name: candidate.name,
    })
}

fn set_nonblocking(device: &Device) -> io::Result<()> {
    let fd = device.as_raw_fd();
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    let rc = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// An exclusively grabbed physical keyboard, opened non-blocking.
pub struct GrabbedKeyboard {
    device: Device,
    name: String,
}

impl GrabbedKeyboard {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Drain all immediately available key events as (code, value) pairs.
    ///
    /// Returns WouldBlock when no data is pending; any other error is a
    /// genuine read failure.
    pub fn fetch_key_events(&mut self) -> io::Result<Vec<(u16, i32)>> {
        let events: Vec<InputEvent> = self.device.fetch_events()?.collect();
        Ok(events
            .into_iter()
            .filter(|ev| ev.event_type() == EventType::KEY)
            .map(|ev| (ev.code(), ev.value()))
            .collect())
    }
}

/// The grab must be released even during panic unwinding, otherwise the
/// physical keyboard stays dead to the rest of the system.
impl Drop for GrabbedKeyboard {
    fn drop(&mut self) {
        if let Err(e) = self.device.ungrab() {
            log::warn!("failed to ungrab '{}': {}", self.name, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(score: i32, endpoint: Option<i32>, name: &str) -> KeyboardCandidate {
        KeyboardCandidate {
            score,
            endpoint,
            name: name.to_string(),
        }
    }

    #[test]
    fn test_endpoint_from_phys() {
        assert_eq!(endpoint_from_phys("usb-0000:00:14.0-1/input0"), Some(0));
        assert_eq!(endpoint_from_phys("usb-0000:00:14.0-1/input3"), Some(3));
        assert_eq!(endpoint_from_phys("isa0060/serio0/input12"), Some(12));
        assert_eq!(endpoint_from_phys("no endpoint here"), None);
        assert_eq!(endpoint_from_phys(""), None);
    }

    #[test]
    fn test_score_candidate() {
        assert_eq!(score_candidate(Some(0), "Some Device"), 100);
        assert_eq!(score_candidate(Some(2), "Some Device"), 48);
        assert_eq!(score_candidate(None, "Some Device"), 0);
        assert_eq!(score_candidate(Some(0), "USB Keyboard"), 110);
        assert_eq!(score_candidate(None, "My KEYBOARD thing"), 10);
    }

    #[test]
    fn test_higher_score_wins() {
        let a = candidate(110, Some(0), "b-device");
        let b = candidate(48, Some(2), "a-device");
        assert_eq!(candidate_order(&a, &b), Ordering::Less);
        assert_eq!(candidate_order(&b, &a), Ordering::Greater);
    }

    #[test]
    fn test_equal_score_lower_endpoint_wins() {
        let a = candidate(50, Some(1), "z");
        let b = candidate(50, Some(3), "a");
        assert_eq!(candidate_order(&a, &b), Ordering::Less);
    }

    #[test]
    fn test_unknown_endpoint_sorts_last() {
        let known = candidate(10, Some(7), "z");
        let unknown = candidate(10, None, "a");
        assert_eq!(candidate_order(&known, &unknown), Ordering::Less);
        assert_eq!(candidate_order(&unknown, &known), Ordering::Greater);
    }

    #[test]
    fn test_name_breaks_remaining_ties() {
        let a = candidate(10, Some(1), "alpha");
        let b = candidate(10, Some(1), "beta");
        assert_eq!(candidate_order(&a, &b), Ordering::Less);
    }

    #[test]
    fn test_ordering_is_total_over_a_set() {
        let mut set = vec![
            candidate(0, None, "pad"),
            candidate(110, Some(0), "main keyboard"),
            candidate(48, Some(2), "aux"),
            candidate(48, Some(2), "aux-2"),
            candidate(10, None, "keyboard-ish"),
        ];
        set.sort_by(candidate_order);
        let names: Vec<&str> = set.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["main keyboard", "aux", "aux-2", "keyboard-ish", "pad"]
        );
    }
}
