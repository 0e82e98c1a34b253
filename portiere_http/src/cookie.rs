// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! Cookies, and the percent-encoding used for their values.
//!
//! # References
//! * [RFC 6265](https://www.rfc-editor.org/rfc/rfc6265.html)

use std::fmt::{self, Write};
use std::time::{Duration, SystemTime};

use crate::{
    abnf,
    syntax,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CookieDecodeError {
    /// A `%` wasn't followed by two hexadecimal digits. The position is the
    /// byte offset of the `%`.
    MalformedEscape {
        position: usize,
    },

    /// The decoded octets aren't valid UTF-8.
    InvalidUtf8,
}

impl fmt::Display for CookieDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CookieDecodeError::MalformedEscape { position } => write!(f, "malformed percent-escape at offset {position}"),
            CookieDecodeError::InvalidUtf8 => f.write_str("decoded cookie value is not valid UTF-8"),
        }
    }
}

impl std::error::Error for CookieDecodeError {}

/// Characters that are sent unescaped: the `tchar`s except for `%`, which
/// introduces an escape.
#[inline]
fn is_unreserved(byte: u8) -> bool {
    byte != b'%' && syntax::is_token_character(byte)
}

/// Percent-encodes the string, so it can be used as a cookie value. Every
/// byte of the UTF-8 representation outside the unreserved set is written as
/// `%XX` with uppercase hexadecimal digits.
#[must_use]
pub fn encode_cookie_component(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for byte in value.bytes() {
        if is_unreserved(byte) {
            result.push(byte as char);
        } else {
            _ = write!(result, "%{byte:02X}");
        }
    }
    result
}

/// Decodes a string produced by [`encode_cookie_component`]. Malformed escapes
/// are errors, never skipped.
pub fn decode_cookie_component(value: &str) -> Result<String, CookieDecodeError> {
    let bytes = value.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());

    let mut position = 0;
    while position < bytes.len() {
        if bytes[position] != b'%' {
            result.push(bytes[position]);
            position += 1;
            continue;
        }

        let high = bytes.get(position + 1).copied().and_then(abnf::hex_digit_value);
        let low = bytes.get(position + 2).copied().and_then(abnf::hex_digit_value);
        let (Some(high), Some(low)) = (high, low) else {
            return Err(CookieDecodeError::MalformedEscape { position });
        };

        result.push(high << 4 | low);
        position += 3;
    }

    String::from_utf8(result).map_err(|_| CookieDecodeError::InvalidUtf8)
}

/// Splits a `Cookie` request header into its name-value pairs. Pairs without
/// a `=` are skipped and the surrounding quotes of a value are removed.
///
/// ```text
/// cookie-string = cookie-pair *( ";" SP cookie-pair )
/// ```
pub fn parse_cookie_header(value: &str) -> impl Iterator<Item = (&str, &str)> {
    value.split(';')
        .filter_map(|pair| pair.split_once('='))
        .map(|(name, value)| {
            let value = syntax::trim_whitespace(value);
            let value = value.strip_prefix('"')
                .and_then(|value| value.strip_suffix('"'))
                .unwrap_or(value);
            (syntax::trim_whitespace(name), value)
        })
        .filter(|(name, _)| !name.is_empty())
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// A builder for the value of a `Set-Cookie` response header.
///
/// ```
/// use portiere_http::{SameSite, SetCookie};
///
/// let cookie = SetCookie::new("greeting", "hello world")
///     .path("/")
///     .http_only()
///     .same_site(SameSite::Lax);
/// assert_eq!(cookie.to_string(), "greeting=hello%20world; Path=/; HttpOnly; SameSite=Lax");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetCookie {
    name: String,
    value: String,
    path: Option<String>,
    domain: Option<String>,
    max_age: Option<Duration>,
    expires: Option<SystemTime>,
    secure: bool,
    http_only: bool,
    same_site: Option<SameSite>,
}

impl SetCookie {
    /// Creates a cookie. The name must be a token; the value is encoded with
    /// [`encode_cookie_component`] when it is rendered.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        debug_assert!(syntax::validate_token(&name).is_ok(), "cookie name must be a token: {name:?}");
        Self {
            name,
            value: value.into(),
            path: None,
            domain: None,
            max_age: None,
            expires: None,
            secure: false,
            http_only: false,
            same_site: None,
        }
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn expires(mut self, expires: SystemTime) -> Self {
        self.expires = Some(expires);
        self
    }

    pub fn secure(mut self) -> Self {
        self.secure = true;
        self
    }

    pub fn http_only(mut self) -> Self {
        self.http_only = true;
        self
    }

    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }
}

impl fmt::Display for SetCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, encode_cookie_component(&self.value))?;

        if let Some(path) = &self.path {
            write!(f, "; Path={path}")?;
        }
        if let Some(domain) = &self.domain {
            write!(f, "; Domain={domain}")?;
        }
        if let Some(max_age) = &self.max_age {
            write!(f, "; Max-Age={}", max_age.as_secs())?;
        }
        if let Some(expires) = &self.expires {
            write!(f, "; Expires={}", httpdate::fmt_http_date(*expires))?;
        }
        if self.secure {
            f.write_str("; Secure")?;
        }
        if self.http_only {
            f.write_str("; HttpOnly")?;
        }
        if let Some(same_site) = &self.same_site {
            write!(f, "; SameSite={}", same_site.as_str())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("String full of spaces.", "String%20full%20of%20spaces.")]
    #[case("møøse", "m%C3%B8%C3%B8se")]
    #[case("!#$&'*+-.^_`|~", "!#$&'*+-.^_`|~")]
    #[case("AZaz09", "AZaz09")]
    #[case("100%", "100%25")]
    #[case("a=b;c,d\"e", "a%3Db%3Bc%2Cd%22e")]
    #[case("", "")]
    fn test_encode_cookie_component(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(encode_cookie_component(input), expected);
        assert_eq!(decode_cookie_component(expected).as_deref(), Ok(input));
    }

    #[rstest]
    #[case("abc%", 3)]
    #[case("abc%4", 3)]
    #[case("%G0", 0)]
    #[case("x%0x", 1)]
    #[case("ok%20then%", 9)]
    fn test_decode_malformed_escape(#[case] input: &str, #[case] position: usize) {
        assert_eq!(decode_cookie_component(input), Err(CookieDecodeError::MalformedEscape { position }));
    }

    #[test]
    fn test_decode_lowercase_hex_and_invalid_utf8() {
        assert_eq!(decode_cookie_component("m%c3%b8se").as_deref(), Ok("møse"));
        assert_eq!(decode_cookie_component("%C3"), Err(CookieDecodeError::InvalidUtf8));
        assert_eq!(decode_cookie_component("%FF%FE"), Err(CookieDecodeError::InvalidUtf8));
    }

    #[test]
    fn test_round_trip_unicode() {
        for input in ["日本語", "emoji 🦀 crab", "tab\tnew\nline", "\u{0}", "ü/ä?ö#"] {
            assert_eq!(decode_cookie_component(&encode_cookie_component(input)).as_deref(), Ok(input));
        }
    }

    #[test]
    fn test_parse_cookie_header() {
        let pairs: Vec<_> = parse_cookie_header("session=abc123; theme=\"dark\";flag; empty=; =x").collect();
        assert_eq!(pairs, vec![("session", "abc123"), ("theme", "dark"), ("empty", "")]);
    }

    #[test]
    fn test_set_cookie_all_attributes() {
        let cookie = SetCookie::new("id", "a b")
            .path("/app")
            .domain("example.org")
            .max_age(Duration::from_secs(3600))
            .expires(SystemTime::UNIX_EPOCH + Duration::from_secs(784111777))
            .secure()
            .http_only()
            .same_site(SameSite::Strict);

        assert_eq!(
            cookie.to_string(),
            "id=a%20b; Path=/app; Domain=example.org; Max-Age=3600; Expires=Sun, 06 Nov 1994 08:49:37 GMT; Secure; HttpOnly; SameSite=Strict"
        );
    }
}
