//! Character encoding detection for byte input.
//!
//! YAML streams may be UTF-8, UTF-16 or UTF-32 in either byte order. The
//! encoding is picked once from the first four bytes using the byte-order
//! mark when present, otherwise from the position of the null bytes around
//! the first (necessarily ASCII) character.

/// Encoding of a byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Utf16Le,
    Utf16Be,
    Utf32Le,
    Utf32Be,
}

/// Result of decoding one character from the front of a byte slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    /// A character and the number of bytes it occupied.
    Char(char, usize),
    /// More bytes are needed.
    Incomplete,
    /// The bytes are not valid in this encoding.
    Invalid,
}

impl Encoding {
    /// Detect the encoding from up to the first four bytes of a stream.
    pub fn detect(bytes: &[u8]) -> Encoding {
        match bytes {
            [0x00, 0x00, 0xFE, 0xFF, ..] => Encoding::Utf32Be,
            [0x00, 0x00, 0x00, _, ..] => Encoding::Utf32Be,
            [0xFF, 0xFE, 0x00, 0x00, ..] => Encoding::Utf32Le,
            [_, 0x00, 0x00, 0x00, ..] => Encoding::Utf32Le,
            [0xFE, 0xFF, ..] => Encoding::Utf16Be,
            [0x00, _, ..] => Encoding::Utf16Be,
            [0xFF, 0xFE, ..] => Encoding::Utf16Le,
            [_, 0x00, ..] => Encoding::Utf16Le,
            _ => Encoding::Utf8,
        }
    }

    /// Human readable name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            Encoding::Utf8 => "UTF-8",
            Encoding::Utf16Le => "UTF-16LE",
            Encoding::Utf16Be => "UTF-16BE",
            Encoding::Utf32Le => "UTF-32LE",
            Encoding::Utf32Be => "UTF-32BE",
        }
    }

    /// Decode the first character of `bytes`.
    pub fn decode_char(self, bytes: &[u8]) -> Decoded {
        match self {
            Encoding::Utf8 => decode_utf8(bytes),
            Encoding::Utf16Le => decode_utf16(bytes, u16::from_le_bytes),
            Encoding::Utf16Be => decode_utf16(bytes, u16::from_be_bytes),
            Encoding::Utf32Le => decode_utf32(bytes, u32::from_le_bytes),
            Encoding::Utf32Be => decode_utf32(bytes, u32::from_be_bytes),
        }
    }
}

fn decode_utf8(bytes: &[u8]) -> Decoded {
    let Some(&first) = bytes.first() else {
        return Decoded::Incomplete;
    };
    let len = match first {
        0x00..=0x7F => 1,
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => return Decoded::Invalid,
    };
    if bytes.len() < len {
        return Decoded::Incomplete;
    }
    match std::str::from_utf8(&bytes[..len]) {
        Ok(s) => match s.chars().next() {
            Some(ch) => Decoded::Char(ch, len),
            None => Decoded::Invalid,
        },
        Err(_) => Decoded::Invalid,
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> Decoded {
    if bytes.len() < 2 {
        return Decoded::Incomplete;
    }
    let first = unit([bytes[0], bytes[1]]);
    if !(0xD800..=0xDFFF).contains(&first) {
        return match char::from_u32(u32::from(first)) {
            Some(ch) => Decoded::Char(ch, 2),
            None => Decoded::Invalid,
        };
    }
    if first >= 0xDC00 {
        return Decoded::Invalid;
    }
    if bytes.len() < 4 {
        return Decoded::Incomplete;
    }
    let second = unit([bytes[2], bytes[3]]);
    match char::decode_utf16([first, second]).next() {
        Some(Ok(ch)) => Decoded::Char(ch, 4),
        _ => Decoded::Invalid,
    }
}

fn decode_utf32(bytes: &[u8], unit: fn([u8; 4]) -> u32) -> Decoded {
    if bytes.len() < 4 {
        return Decoded::Incomplete;
    }
    match char::from_u32(unit([bytes[0], bytes[1], bytes[2], bytes[3]])) {
        Some(ch) => Decoded::Char(ch, 4),
        None => Decoded::Invalid,
    }
}
