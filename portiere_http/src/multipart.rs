// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! Framing of `multipart/byteranges` bodies, used when more than one range
//! of a representation is sent.
//!
//! # References
//! * [RFC 9110 Section 14.6](https://www.rfc-editor.org/rfc/rfc9110.html#section-14.6)
//! * [RFC 2046 Section 5.1.1](https://www.rfc-editor.org/rfc/rfc2046.html#section-5.1.1)

use std::fmt::Write;

use rand::RngCore;

use crate::{
    ByteRange,
    MediaType,
};

const BOUNDARY_PREFIX: &str = "portiere-";

/// Generates a boundary of the prefix followed by 32 lowercase hexadecimal
/// characters. The random part makes a collision with the content of the
/// parts practically impossible.
#[must_use]
pub fn generate_boundary() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);

    let mut boundary = String::with_capacity(BOUNDARY_PREFIX.len() + 32);
    boundary.push_str(BOUNDARY_PREFIX);
    for byte in bytes {
        _ = write!(boundary, "{byte:02x}");
    }
    boundary
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Multipart {
    pub boundary: String,

    /// The media type of the representation, repeated in every part.
    pub content_type: MediaType,
}

impl Multipart {
    pub fn new(content_type: MediaType) -> Self {
        Self {
            boundary: generate_boundary(),
            content_type,
        }
    }

    /// The value of the `Content-Type` header of the whole message.
    #[must_use]
    pub fn content_type_header(&self) -> String {
        format!("{}; boundary={}", MediaType::MULTIPART_BYTERANGES.as_str(), self.boundary)
    }

    /// The delimiter and header section preceding the data of a part.
    #[must_use]
    pub fn part_header(&self, range: &ByteRange, complete_length: u64) -> String {
        format!(
            "\r\n--{}\r\nContent-Type: {}\r\nContent-Range: {}\r\n\r\n",
            self.boundary,
            self.content_type.as_str(),
            range.content_range(complete_length),
        )
    }

    #[must_use]
    pub fn closing_delimiter(&self) -> String {
        format!("\r\n--{}--\r\n", self.boundary)
    }

    /// The exact number of bytes the framed body will consist of.
    #[must_use]
    pub fn encoded_length(&self, ranges: &[ByteRange], complete_length: u64) -> u64 {
        let parts: u64 = ranges.iter()
            .map(|range| self.part_header(range, complete_length).len() as u64 + range.len())
            .sum();
        parts + self.closing_delimiter().len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_boundary() {
        let boundary = generate_boundary();
        assert!(boundary.starts_with(BOUNDARY_PREFIX));
        assert_eq!(boundary.len(), BOUNDARY_PREFIX.len() + 32);
        assert!(boundary[BOUNDARY_PREFIX.len()..].bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));
        assert_ne!(boundary, generate_boundary());
    }

    #[test]
    fn test_multipart_framing() {
        let multipart = Multipart {
            boundary: String::from("XYZ"),
            content_type: MediaType::PLAIN_TEXT,
        };
        let range = ByteRange { start: 0, end: 4 };

        assert_eq!(multipart.content_type_header(), "multipart/byteranges; boundary=XYZ");
        assert_eq!(
            multipart.part_header(&range, 10),
            "\r\n--XYZ\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Range: bytes 0-4/10\r\n\r\n"
        );
        assert_eq!(multipart.closing_delimiter(), "\r\n--XYZ--\r\n");

        let ranges = [range, ByteRange { start: 8, end: 9 }];
        let expected = multipart.part_header(&ranges[0], 10).len() + 5
            + multipart.part_header(&ranges[1], 10).len() + 2
            + multipart.closing_delimiter().len();
        assert_eq!(multipart.encoded_length(&ranges, 10), expected as u64);
    }
}
