// Keyflux External Typer
// Text injection through wtype or xdotool

use std::path::Path;
use std::process::Command;

/// Which external typing tool is available on this system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TyperKind {
    Wtype,
    Xdotool,
}

impl TyperKind {
    fn binary(&self) -> &'static str {
        match self {
            TyperKind::Wtype => "wtype",
            TyperKind::Xdotool => "xdotool",
        }
    }
}

/// Injects printable characters by shelling out to a typing tool.
/// wtype is preferred (Wayland native), xdotool is the X11 fallback.
pub struct ExternalTyper {
    kind: TyperKind,
}

impl ExternalTyper {
    /// Probe for a specific typing tool in the usual binary directories.
    pub fn probe(kind: TyperKind) -> Option<Self> {
        if tool_exists(kind.binary()) {
            Some(Self { kind })
        } else {
            None
        }
    }

    pub fn kind(&self) -> TyperKind {
        self.kind
    }

    /// Type a single character. Returns false when the tool fails to run
    /// or exits nonzero.
    pub fn type_char(&self, ch: char) -> bool {
        let text = ch.to_string();
        let result = match self.kind {
            TyperKind::Wtype => Command::new("wtype").arg(&text).status(),
            TyperKind::Xdotool => Command::new("xdotool")
                .args(["type", "--clearmodifiers", &text])
                .status(),
        };

        match result {
            Ok(status) if status.success() => true,
            Ok(status) => {
                log::warn!("{} exited with {}", self.kind.binary(), status);
                false
            }
            Err(e) => {
                log::warn!("failed to run {}: {}", self.kind.binary(), e);
                false
            }
        }
    }
}

fn tool_exists(name: &str) -> bool {
    for dir in ["/usr/bin", "/usr/local/bin"] {
        if Path::new(dir).join(name).exists() {
            return true;
        }
    }
    false
}
