// Keyflux Unicode Codec
// Explicit UTF-8 scalar encoding/decoding for layout tokens

/// Encode a Unicode scalar value as UTF-8. Returns None for values above
/// 0x10FFFF or in the surrogate range.
pub fn encode(scalar: u32) -> Option<Vec<u8>> {
    if (0xD800..=0xDFFF).contains(&scalar) || scalar > 0x10FFFF {
        return None;
    }
    let mut bytes = Vec::with_capacity(4);
    if scalar <= 0x7F {
        bytes.push(scalar as u8);
    } else if scalar <= 0x7FF {
        bytes.push(0xC0 | ((scalar >> 6) & 0x1F) as u8);
        bytes.push(0x80 | (scalar & 0x3F) as u8);
    } else if scalar <= 0xFFFF {
        bytes.push(0xE0 | ((scalar >> 12) & 0x0F) as u8);
        bytes.push(0x80 | ((scalar >> 6) & 0x3F) as u8);
        bytes.push(0x80 | (scalar & 0x3F) as u8);
    } else {
        bytes.push(0xF0 | ((scalar >> 18) & 0x07) as u8);
        bytes.push(0x80 | ((scalar >> 12) & 0x3F) as u8);
        bytes.push(0x80 | ((scalar >> 6) & 0x3F) as u8);
        bytes.push(0x80 | (scalar & 0x3F) as u8);
    }
    Some(bytes)
}

/// Decode the leading UTF-8 sequence of `bytes` into a scalar value,
/// following the standard continuation-byte pattern. Returns None for empty
/// input or a malformed sequence.
pub fn decode(bytes: &[u8]) -> Option<u32> {
    let first = *bytes.first()?;

    if first & 0x80 == 0x00 {
        return Some(u32::from(first));
    }
    if first & 0xE0 == 0xC0 && bytes.len() >= 2 {
        let b1 = bytes[1];
        if b1 & 0xC0 == 0x80 {
            return Some((u32::from(first & 0x1F) << 6) | u32::from(b1 & 0x3F));
        }
    } else if first & 0xF0 == 0xE0 && bytes.len() >= 3 {
        let (b1, b2) = (bytes[1], bytes[2]);
        if b1 & 0xC0 == 0x80 && b2 & 0xC0 == 0x80 {
            return Some(
                (u32::from(first & 0x0F) << 12)
                    | (u32::from(b1 & 0x3F) << 6)
                    | u32::from(b2 & 0x3F),
            );
        }
    } else if first & 0xF8 == 0xF0 && bytes.len() >= 4 {
        let (b1, b2, b3) = (bytes[1], bytes[2], bytes[3]);
        if b1 & 0xC0 == 0x80 && b2 & 0xC0 == 0x80 && b3 & 0xC0 == 0x80 {
            return Some(
                (u32::from(first & 0x07) << 18)
                    | (u32::from(b1 & 0x3F) << 12)
                    | (u32::from(b2 & 0x3F) << 6)
                    | u32::from(b3 & 0x3F),
            );
        }
    }
    None
}

/// Decode the leading UTF-8 sequence into a char, rejecting surrogates.
pub fn decode_char(bytes: &[u8]) -> Option<char> {
    decode(bytes).and_then(char::from_u32)
}
