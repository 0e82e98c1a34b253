// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! Core rules of the Augmented BNF (ABNF) used throughout the HTTP grammar.
//!
//! # References
//! * [RFC 5234 Appendix B.1. Core Rules](https://www.rfc-editor.org/rfc/rfc5234.html#appendix-B.1)

/// Is the character a visible (printing) character.
///
/// ```text
/// VCHAR          =  %x21-7E
/// ```
#[inline]
pub fn is_visible_character(byte: u8) -> bool {
    matches!(byte, 0x21..=0x7E)
}

/// ```text
/// DIGIT          =  %x30-39
/// ```
#[inline]
pub fn is_digit(byte: u8) -> bool {
    byte.is_ascii_digit()
}

/// Returns the numeric value of a hexadecimal digit, accepting both cases.
///
/// ```text
/// HEXDIG         =  DIGIT / "A" / "B" / "C" / "D" / "E" / "F"
/// ```
#[inline]
pub fn hex_digit_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Parses a non-empty run of `DIGIT`s into a `u64`, rejecting signs,
/// whitespace and overflow, all of which `str::parse` would treat
/// differently.
pub fn parse_decimal(value: &str) -> Option<u64> {
    if value.is_empty() || !value.bytes().all(is_digit) {
        return None;
    }

    value.parse().ok()
}
