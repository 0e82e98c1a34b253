// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! This module contains HTTP syntax semantics shared by the request parser,
//! the cookie codec and the header validation.
//!
//! # References
//! * [RFC 9110](https://www.rfc-editor.org/rfc/rfc9110.html)

use crate::{
    abnf,
    HttpParseError,
};

/// Validate a field character. Note that in HTTP, UTF-8 is optional (US-ASCII),
/// and isn't used before validating the content.
///
/// ```text
/// field-vchar    = VCHAR / obs-text
/// obs-text       = %x80-FF
/// ```
#[inline]
fn is_field_value_character(byte: u8) -> bool {
    abnf::is_visible_character(byte) || matches!(byte, 0x80..=0xFF)
}

/// Is the given character a character that can occur anywhere in the
/// request-target? Only the control characters and non-ASCII octets are
/// excluded here, the structure is checked by `RequestTarget::parse`.
///
/// # [HTTP/1.1 (RFC 9112) Definitions](https://www.rfc-editor.org/rfc/rfc9112.html#name-request-target)
/// ```text
/// request-target = origin-form
///                / absolute-form
///                / authority-form
///                / asterisk-form
/// ```
pub fn is_request_target_character(byte: u8) -> bool {
    !matches!(byte, 0x00..=0x20 | 0x7F..=0xFF)
}

/// Is the given character a `tchar`?
///
/// ```text
/// tchar          = "!" / "#" / "$" / "%" / "&" / "'" / "*"
///                / "+" / "-" / "." / "^" / "_" / "`" / "|" / "~"
///                / DIGIT / ALPHA
///                ; any VCHAR, except delimiters
/// ```
#[inline]
pub fn is_token_character(byte: u8) -> bool {
    validate_token_character(byte).is_ok()
}

/// Returns whether or not the character is whitespace according to the HTTP
/// specification, which is `U+0020 SPACE` and `U+0009 CHARACTER TABULATION`.
///
/// ```text
/// OWS            = *( SP / HTAB )
/// ```
#[inline]
pub fn is_whitespace_character(character: char) -> bool {
    character == ' ' || character == '\t'
}

/// Strips the optional whitespace (`OWS`) surrounding a field value.
pub fn trim_whitespace(value: &str) -> &str {
    value.trim_matches(is_whitespace_character)
}

pub fn validate_field_content(value: &[u8]) -> Result<(), HttpParseError> {
    if value.iter().all(|byte| is_field_value_character(*byte) || *byte == b' ' || *byte == b'\t') {
        Ok(())
    } else {
        Err(HttpParseError::FieldValueContainsInvalidCharacters)
    }
}

pub fn validate_token(value: &str) -> Result<(), HttpParseError> {
    if value.is_empty() {
        return Err(HttpParseError::TokenEmpty);
    }

    for character in value.bytes() {
        validate_token_character(character)?;
    }

    Ok(())
}

fn validate_token_character(character: u8) -> Result<(), HttpParseError> {
    match character {
        b' ' | b'\t' => Err(HttpParseError::TokenContainsWhitespace),

        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' |
        b'^' | b'_' | b'`' | b'|' | b'~' => Ok(()),

        b'0'..=b'9' => Ok(()),
        b'A'..=b'Z' => Ok(()),
        b'a'..=b'z' => Ok(()),

        b'"' | b'(' | b')' | b',' | b'/' | b':' | b';' | b'<' | b'=' | b'>' |
        b'?' | b'@' | b'[' | b'\\' | b']' | b'{' | b'}' => Err(HttpParseError::TokenContainsDelimiter),

        _ => Err(HttpParseError::TokenContainsNonVisibleAscii),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0x00, false)]
    #[case(0x1F, false)]
    #[case(b'A', true)]
    #[case(b'~', true)]
    #[case(0xFF, true)]
    fn test_is_field_value_character(#[case] input: u8, #[case] expected: bool) {
        assert_eq!(is_field_value_character(input), expected, "character isn't matching: {}", input);
    }

    #[rstest]
    #[case(b'/', true)]
    #[case(b'%', true)]
    #[case(b'?', true)]
    #[case(b' ', false)]
    #[case(0x7F, false)]
    #[case(0xC3, false)]
    fn test_is_request_target_character(#[case] input: u8, #[case] expected: bool) {
        assert_eq!(is_request_target_character(input), expected);
    }

    #[test]
    fn test_validate_token() {
        assert_eq!(validate_token(""), Err(HttpParseError::TokenEmpty));
        assert_eq!(validate_token("Content-Type"), Ok(()));
        assert_eq!(validate_token(" hello"), Err(HttpParseError::TokenContainsWhitespace));
        assert_eq!(validate_token("Host "), Err(HttpParseError::TokenContainsWhitespace));
        assert_eq!(validate_token("a:b"), Err(HttpParseError::TokenContainsDelimiter));
    }

    #[test]
    fn test_validate_field_content() {
        assert_eq!(validate_field_content(b"text/html; q=0.9"), Ok(()));
        assert_eq!(validate_field_content(b"tab\tseparated"), Ok(()));
        assert_eq!(validate_field_content(b"bell\x07"), Err(HttpParseError::FieldValueContainsInvalidCharacters));
    }

    #[test]
    fn test_trim_whitespace() {
        assert_eq!(trim_whitespace(" \tvalue \t"), "value");
        assert_eq!(trim_whitespace("in ner"), "in ner");
    }
}
