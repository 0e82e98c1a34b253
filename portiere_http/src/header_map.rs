// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::time::SystemTime;

use crate::{
    syntax,
    ContentRangeHeaderValue,
    HeaderName,
    HeaderValue,
    MediaType,
};

/// An ordered, multi-valued map of header fields. Lookups are
/// case-insensitive through `HeaderName`, and values keep the order in which
/// they were received or appended.
#[derive(Clone, Debug, Default)]
pub struct HeaderMap {
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl HeaderMap {
    pub fn new() -> HeaderMap {
        HeaderMap::default()
    }

    /// Appends a header to the list of headers. This is used for headers that
    /// can be duplicated, such as `Set-Cookie`.
    pub fn append_possible_duplicate(&mut self, header_name: HeaderName, value: HeaderValue) {
        self.headers.push((header_name, value));
    }

    #[must_use]
    pub fn contains(&self, header_name: &HeaderName) -> bool {
        self.headers.iter().any(|(name, _)| name == header_name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Returns the first value for the given name.
    #[must_use]
    pub fn get(&self, header_name: &HeaderName) -> Option<&HeaderValue> {
        self.headers.iter()
            .find(|(name, _)| name == header_name)
            .map(|(_, value)| value)
    }

    /// Returns every value for the given name, in insertion order.
    pub fn get_all<'a>(&'a self, header_name: &'a HeaderName) -> impl Iterator<Item = &'a HeaderValue> + 'a {
        self.headers.iter()
            .filter(move |(name, _)| name == header_name)
            .map(|(_, value)| value)
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(HeaderName, HeaderValue)> {
        self.headers.iter()
    }

    /// Finds the first field that can't be written to a message as-is, such
    /// as a value containing CR or LF.
    pub fn first_invalid_field(&self) -> Option<&HeaderName> {
        self.headers.iter()
            .find(|(name, value)| {
                let valid_name = match name {
                    HeaderName::Other(name) => syntax::validate_token(name).is_ok(),
                    _ => true,
                };
                !valid_name || syntax::validate_field_content(value.to_string().as_bytes()).is_err()
            })
            .map(|(name, _)| name)
    }

    pub fn remove(&mut self, header_name: &HeaderName) {
        self.headers.retain(|(name, _)| name != header_name);
    }

    /// Sets the value of the header, replacing every existing value of it.
    /// The position of the first occurrence is kept.
    pub fn set(&mut self, header_name: HeaderName, value: HeaderValue) {
        let Some(index) = self.headers.iter().position(|(name, _)| name == &header_name) else {
            self.headers.push((header_name, value));
            return;
        };

        self.headers[index].1 = value;

        let mut position = 0;
        self.headers.retain(|(name, _)| {
            let keep = position <= index || name != &header_name;
            position += 1;
            keep
        });
    }
}

//
// Header-specific methods
//
impl HeaderMap {
    /// Checks whether any of the `Connection` fields contains the given
    /// option, case-insensitively.
    #[must_use]
    pub fn has_connection_option(&self, option: &str) -> bool {
        self.get_all(&HeaderName::Connection)
            .flat_map(HeaderValue::list_elements)
            .any(|element| element.eq_ignore_ascii_case(option))
    }

    pub fn set_content_length(&mut self, length: u64) {
        self.set(HeaderName::ContentLength, HeaderValue::Size(length));
    }

    pub fn set_content_range(&mut self, range: ContentRangeHeaderValue) {
        self.set(HeaderName::ContentRange, HeaderValue::ContentRange(range));
    }

    pub fn set_content_type(&mut self, media_type: MediaType) {
        self.set(HeaderName::ContentType, HeaderValue::MediaType(media_type));
    }

    pub fn set_date(&mut self, date_time: SystemTime) {
        self.set(HeaderName::Date, HeaderValue::DateTime(date_time));
    }

    pub fn set_last_modified(&mut self, date_time: SystemTime) {
        self.set(HeaderName::LastModified, HeaderValue::DateTime(date_time));
    }
}
