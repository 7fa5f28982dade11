// Keyflux Key Naming
// Maps Linux key codes to the lowercase identifiers used in layout files

/// Backspace key code from input-event-codes.h.
pub const KEY_BACKSPACE: u16 = 14;
/// Delete key code.
pub const KEY_DELETE: u16 = 111;
/// Escape key code.
pub const KEY_ESC: u16 = 1;
/// Left Ctrl key code.
pub const KEY_LEFTCTRL: u16 = 29;
/// Left Alt key code.
pub const KEY_LEFTALT: u16 = 56;
/// Enter key code.
pub const KEY_ENTER: u16 = 28;
/// Space key code.
pub const KEY_SPACE: u16 = 57;
/// Tab key code.
pub const KEY_TAB: u16 = 15;

/// Map a key code to the identifier used in layout `source` lists
/// (e.g. 30 -> "key_a", 42 -> "key_leftshift").
///
/// Codes without a known name fall back to "key_<code>" so a layout can
/// still address them explicitly.
pub fn key_name(code: u16) -> String {
    match base_name(code) {
        Some(name) => name.to_string(),
        None => format!("key_{}", code),
    }
}

fn base_name(code: u16) -> Option<&'static str> {
    // Names follow KEY_* from input-event-codes.h, lowercased.
    let name = match code {
        1 => "key_esc",
        2 => "key_1",
        3 => "key_2",
        4 => "key_3",
        5 => "key_4",
        6 => "key_5",
        7 => "key_6",
        8 => "key_7",
        9 => "key_8",
        10 => "key_9",
        11 => "key_0",
        12 => "key_minus",
        13 => "key_equal",
        14 => "key_backspace",
        15 => "key_tab",
        16 => "key_q",
        17 => "key_w",
        18 => "key_e",
        19 => "key_r",
        20 => "key_t",
        21 => "key_y",
        22 => "key_u",
        23 => "key_i",
        24 => "key_o",
        25 => "key_p",
        26 => "key_leftbrace",
        27 => "key_rightbrace",
        28 => "key_enter",
        29 => "key_leftctrl",
        30 => "key_a",
        31 => "key_s",
        32 => "key_d",
        33 => "key_f",
        34 => "key_g",
        35 => "key_h",
        36 => "key_j",
        37 => "key_k",
        38 => "key_l",
        39 => "key_semicolon",
        40 => "key_apostrophe",
        41 => "key_grave",
        42 => "key_leftshift",
        43 => "key_backslash",
        44 => "key_z",
        45 => "key_x",
        46 => "key_c",
        47 => "key_v",
        48 => "key_b",
        49 => "key_n",
        50 => "key_m",
        51 => "key_comma",
        52 => "key_dot",
        53 => "key_slash",
        54 => "key_rightshift",
        55 => "key_kpasterisk",
        56 => "key_leftalt",
        57 => "key_space",
        58 => "key_capslock",
        59 => "key_f1",
        60 => "key_f2",
        61 => "key_f3",
        62 => "key_f4",
        63 => "key_f5",
        64 => "key_f6",
        65 => "key_f7",
        66 => "key_f8",
        67 => "key_f9",
        68 => "key_f10",
        69 => "key_numlock",
        70 => "key_scrolllock",
        71 => "key_kp7",
        72 => "key_kp8",
        73 => "key_kp9",
        74 => "key_kpminus",
        75 => "key_kp4",
        76 => "key_kp5",
        77 => "key_kp6",
        78 => "key_kpplus",
        79 => "key_kp1",
        80 => "key_kp2",
        81 => "key_kp3",
        82 => "key_kp0",
        83 => "key_kpdot",
        86 => "key_102nd",
        87 => "key_f11",
        88 => "key_f12",
        96 => "key_kpenter",
        97 => "key_rightctrl",
        98 => "key_kpslash",
        99 => "key_sysrq",
        100 => "key_rightalt",
        102 => "key_home",
        103 => "key_up",
        104 => "key_pageup",
        105 => "key_left",
        106 => "key_right",
        107 => "key_end",
        108 => "key_down",
        109 => "key_pagedown",
        110 => "key_insert",
        111 => "key_delete",
        119 => "key_pause",
        125 => "key_leftmeta",
        126 => "key_rightmeta",
        127 => "key_compose",
        _ => return None,
    };
    Some(name)
}
