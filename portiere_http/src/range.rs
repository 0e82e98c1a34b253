// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! Byte-range arithmetic for the `Range` request header.
//!
//! # References
//! * [RFC 9110 Section 14](https://www.rfc-editor.org/rfc/rfc9110.html#section-14)

use std::fmt;

use crate::{
    abnf,
    syntax,
};

/// A single `range-spec` as it was requested, before it is validated
/// against the length of the representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RangeSpec {
    /// `start-`
    StartPointToEnd { start: u64 },

    /// `start-end`, both inclusive.
    Points {
        start: u64,
        end: u64,
    },

    /// `-suffix`, meaning the last `suffix` bytes.
    Suffix { suffix: u64 },
}

impl RangeSpec {
    fn parse(value: &str) -> Option<Self> {
        let (start, end) = value.split_once('-')?;
        if start.is_empty() {
            return Some(RangeSpec::Suffix { suffix: abnf::parse_decimal(end)? });
        }

        let start = abnf::parse_decimal(start)?;
        if end.is_empty() {
            return Some(RangeSpec::StartPointToEnd { start });
        }

        Some(RangeSpec::Points { start, end: abnf::parse_decimal(end)? })
    }

    /// Normalizes the spec against a representation of `complete_length`
    /// bytes. Returns `None` if the range can't be satisfied.
    #[must_use]
    pub fn resolve(&self, complete_length: u64) -> Option<ByteRange> {
        if complete_length == 0 {
            return None;
        }

        let last = complete_length - 1;
        let (start, end) = match *self {
            RangeSpec::StartPointToEnd { start } => (start, last),
            RangeSpec::Points { start, end } => (start, end),
            RangeSpec::Suffix { suffix: 0 } => return None,
            RangeSpec::Suffix { suffix } => (complete_length.saturating_sub(suffix), last),
        };

        if start > last || end > last || start > end {
            return None;
        }

        Some(ByteRange { start, end })
    }
}

/// The parsed value of a `Range` header with the `bytes` unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRangeList {
    pub ranges: Vec<RangeSpec>,
}

impl HttpRangeList {
    /// Parses a `Range` value. Returns `None` when the syntax isn't
    /// understood, in which case the header must be ignored.
    ///
    /// ```text
    /// Range = ranges-specifier
    /// ranges-specifier = range-unit "=" range-set
    /// range-set        = 1#range-spec
    /// ```
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let (unit, range_set) = value.split_once('=')?;
        if !syntax::trim_whitespace(unit).eq_ignore_ascii_case("bytes") {
            return None;
        }

        let mut ranges = Vec::new();
        for range in range_set.split(',') {
            let range = syntax::trim_whitespace(range);
            if range.is_empty() {
                continue;
            }

            ranges.push(RangeSpec::parse(range)?);
        }

        if ranges.is_empty() {
            return None;
        }

        Some(Self { ranges })
    }

    /// Validates every range against the same length. Invalid ranges are
    /// dropped; the request fails only if none of them are satisfiable.
    pub fn resolve(&self, complete_length: u64) -> Result<Vec<ByteRange>, RangeNotSatisfiable> {
        let ranges: Vec<ByteRange> = self.ranges.iter()
            .filter_map(|range| range.resolve(complete_length))
            .collect();

        if ranges.is_empty() {
            return Err(RangeNotSatisfiable { complete_length });
        }

        Ok(ranges)
    }
}

/// A validated, inclusive byte range: `start <= end < complete_length`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// The number of bytes in this range, which is never zero.
    #[allow(clippy::len_without_is_empty)]
    #[must_use]
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    #[must_use]
    pub fn content_range(&self, complete_length: u64) -> ContentRangeHeaderValue {
        ContentRangeHeaderValue::Range {
            start: self.start,
            end: self.end,
            complete_length: Some(complete_length),
        }
    }
}

/// None of the requested ranges overlap the representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeNotSatisfiable {
    pub complete_length: u64,
}

impl RangeNotSatisfiable {
    #[must_use]
    pub fn content_range(&self) -> ContentRangeHeaderValue {
        ContentRangeHeaderValue::Unsatisfied { complete_length: self.complete_length }
    }
}

/// The `Content-Range` header field indicates where in a full body a partial
/// message belongs.
///
/// ### References
/// * [RFC 9110](https://httpwg.org/specs/rfc9110.html#field.content-range)
/// * [MDN `Content-Range` header](https://developer.mozilla.org/en-US/docs/Web/HTTP/Headers/Content-Range)
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContentRangeHeaderValue {
    Range {
        /// The start of the range, inclusive.
        start: u64,

        /// The end of the range, inclusive.
        end: u64,

        /// Complete length of the **resource**, not the body.
        complete_length: Option<u64>,
    },

    /// Used for 416 Range Not Satisfiable.
    ///
    /// ### RFC 9110, section 14.4:
    /// > A server generating a 416 (Range Not Satisfiable) response to a
    /// byte-range request SHOULD send a Content-Range header field with an
    /// unsatisfied-range value, as in the following example:
    /// > ```text
    /// > Content-Range: bytes */1234
    /// > ```
    Unsatisfied {
        /// The complete length of the resource.
        complete_length: u64
    },
}

impl fmt::Display for ContentRangeHeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentRangeHeaderValue::Range { start, end, complete_length } => {
                debug_assert!(start <= end, "`start` must not be past `end` for Content-Range");
                match complete_length {
                    Some(complete_length) => {
                        debug_assert!(end < complete_length, "`end` must be less than `complete_length` for Content-Range");
                        write!(f, "bytes {start}-{end}/{complete_length}")
                    }
                    None => write!(f, "bytes {start}-{end}/*"),
                }
            }
            ContentRangeHeaderValue::Unsatisfied { complete_length } => {
                write!(f, "bytes */{complete_length}")
            }
        }
    }
}
