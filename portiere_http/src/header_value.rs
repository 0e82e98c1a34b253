// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fmt::Write;
use std::time::SystemTime;

use crate::{
    ContentRangeHeaderValue,
    MediaType,
};

/// Represents a value of a header.
///
/// Typed variants keep values like dates, lengths and ranges in their native
/// form until the response is serialized, so shared code paths don't have to
/// format and re-parse them.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum HeaderValue {
    StaticString(&'static str),
    String(String),
    ContentRange(ContentRangeHeaderValue),
    DateTime(SystemTime),
    MediaType(MediaType),
    Size(u64),
}

impl HeaderValue {
    /// Returns the value as a string, but does not convert it to a string if
    /// it is some other non-convertible type.
    #[must_use]
    pub fn as_str_no_convert(&self) -> Option<&str> {
        match self {
            HeaderValue::StaticString(string) => Some(string),
            HeaderValue::String(string) => Some(string),
            HeaderValue::MediaType(media_type) => Some(media_type.as_str()),
            _ => None,
        }
    }

    pub fn append_to_message(&self, response_text: &mut String) {
        match self {
            HeaderValue::StaticString(string) => {
                response_text.push_str(string);
            }
            HeaderValue::String(string) => {
                response_text.push_str(string);
            }
            HeaderValue::ContentRange(content_range) => {
                _ = write!(response_text, "{content_range}");
            }
            HeaderValue::DateTime(date_time) => {
                _ = write!(response_text, "{}", httpdate::HttpDate::from(*date_time));
            }
            HeaderValue::MediaType(media_type) => {
                response_text.push_str(media_type.as_str());
            }
            HeaderValue::Size(size) => {
                _ = write!(response_text, "{size}");
            }
        }
    }

    /// Get the header in string form.
    #[allow(clippy::inherent_to_string)]
    pub fn to_string(&self) -> String {
        let mut result = String::new();
        self.append_to_message(&mut result);
        result
    }

    /// Parses the value as a decimal number. Only digits are accepted.
    #[must_use]
    pub fn parse_number(&self) -> Option<u64> {
        match self {
            HeaderValue::StaticString(string) => crate::abnf::parse_decimal(string),
            HeaderValue::String(string) => crate::abnf::parse_decimal(string),
            HeaderValue::Size(size) => Some(*size),
            _ => None,
        }
    }

    /// Calculate the length of the header value in string characters.
    pub fn string_length(&self) -> usize {
        match self {
            Self::StaticString(str) => return str.len(),
            Self::String(str) => return str.len(),
            Self::MediaType(media_type) => return media_type.as_str().len(),
            Self::ContentRange(_) | Self::DateTime(_) | Self::Size(_) => (),
        }

        let mut tmp_str = String::new();
        self.append_to_message(&mut tmp_str);
        tmp_str.len()
    }

    /// Iterates over the comma-separated elements of a list-based field,
    /// with surrounding whitespace removed and empty elements skipped.
    pub fn list_elements(&self) -> impl Iterator<Item = &str> {
        self.as_str_no_convert()
            .unwrap_or("")
            .split(',')
            .map(crate::syntax::trim_whitespace)
            .filter(|element| !element.is_empty())
    }
}

impl From<ContentRangeHeaderValue> for HeaderValue {
    fn from(value: ContentRangeHeaderValue) -> Self {
        HeaderValue::ContentRange(value)
    }
}

impl From<&'static str> for HeaderValue {
    fn from(string: &'static str) -> HeaderValue {
        HeaderValue::StaticString(string)
    }
}

impl From<String> for HeaderValue {
    fn from(string: String) -> HeaderValue {
        HeaderValue::String(string)
    }
}

impl From<SystemTime> for HeaderValue {
    fn from(date_time: SystemTime) -> HeaderValue {
        HeaderValue::DateTime(date_time)
    }
}

impl From<MediaType> for HeaderValue {
    fn from(media_type: MediaType) -> HeaderValue {
        HeaderValue::MediaType(media_type)
    }
}

impl From<u64> for HeaderValue {
    fn from(size: u64) -> HeaderValue {
        HeaderValue::Size(size)
    }
}

impl From<usize> for HeaderValue {
    fn from(size: usize) -> HeaderValue {
        HeaderValue::Size(size as u64)
    }
}
