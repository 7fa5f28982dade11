// Keyflux Active Window Detection
// Queries the compositor to pick the right injection strategy

use std::process::Command;

/// Window classes that identify Electron-based applications. These handle
/// synthetic wtype input poorly, so xdotool is preferred for them.
const ELECTRON_CLASSES: [&str; 6] = ["code", "discord", "slack", "vscodium", "codium", "godot"];

/// Window classes that identify terminal emulators.
const TERMINAL_CLASSES: [&str; 6] = [
    "terminal",
    "alacritty",
    "kitty",
    "foot",
    "konsole",
    "org.kde.konsole",
];

/// What the compositor reports about the focused window.
#[derive(Debug, Clone, Default)]
pub struct WindowInfo {
    pub title: String,
    pub class: String,
    pub is_electron: bool,
    pub is_terminal: bool,
}

impl WindowInfo {
    /// Classify a lowercased window class string.
    pub fn classify(title: String, class: String) -> Self {
        let lowered = class.to_lowercase();
        let is_electron = ELECTRON_CLASSES.iter().any(|app| lowered.contains(app));
        let is_terminal = TERMINAL_CLASSES.iter().any(|term| lowered.contains(term));
        Self {
            title,
            class: lowered,
            is_electron,
            is_terminal,
        }
    }
}

/// Query the focused window through hyprctl. Falls back to an empty class
/// with a TERM-based terminal guess when the query fails.
pub fn active_window_info() -> WindowInfo {
    match query_hyprctl() {
        Some(info) => info,
        None => WindowInfo {
            is_terminal: std::env::var_os("TERM").is_some(),
            ..WindowInfo::default()
        },
    }
}

/// Whether the focused window needs the higher-fidelity injection path.
/// Electron applications drop or mangle wtype input.
pub fn is_high_priority_injection_context() -> bool {
    active_window_info().is_electron
}

fn query_hyprctl() -> Option<WindowInfo> {
    let output = Command::new("hyprctl")
        .args(["activewindow", "-j"])
        .output()
        .ok()?;

    if !output.status.success() || output.stdout.is_empty() {
        return None;
    }

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).ok()?;
    let title = json
        .get("title")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let class = json
        .get("class")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    Some(WindowInfo::classify(title, class))
}
