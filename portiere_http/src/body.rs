// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fmt;

use tokio::io::{AsyncRead, AsyncSeek};

use crate::{
    ByteRange,
    Multipart,
};

/// A source that can be read from any offset, such as a `tokio::fs::File` or
/// an in-memory `std::io::Cursor`.
pub trait SeekableStream: AsyncRead + AsyncSeek + Send + Unpin {}

impl<T> SeekableStream for T
    where T: AsyncRead + AsyncSeek + Send + Unpin {}

pub enum BodyKind {
    Bytes(Vec<u8>),
    StaticString(&'static str),
    String(String),

    /// A seekable stream with a known length, sent in full.
    Stream {
        handle: Box<dyn SeekableStream>,
        length: u64,
    },

    /// Parts of a seekable stream, produced when a range request was
    /// honored. With one range, the data is sent as-is; with multiple, every
    /// range is framed as a part of the `multipart` body.
    Ranges {
        handle: Box<dyn SeekableStream>,
        complete_length: u64,
        ranges: Vec<ByteRange>,
        multipart: Option<Multipart>,
    },

    /// A stream of which the length isn't known beforehand.
    Unsized(Box<dyn AsyncRead + Send + Unpin>),
}

impl BodyKind {
    /// The number of bytes of the body on the wire, if it can be known
    /// before sending it.
    #[must_use]
    pub fn known_length(&self) -> Option<u64> {
        match self {
            BodyKind::Bytes(bytes) => Some(bytes.len() as u64),
            BodyKind::StaticString(string) => Some(string.len() as u64),
            BodyKind::String(string) => Some(string.len() as u64),
            BodyKind::Stream { length, .. } => Some(*length),
            BodyKind::Ranges { complete_length, ranges, multipart, .. } => match multipart {
                Some(multipart) => Some(multipart.encoded_length(ranges, *complete_length)),
                None => Some(ranges.iter().map(ByteRange::len).sum()),
            },
            BodyKind::Unsized(..) => None,
        }
    }
}

impl fmt::Debug for BodyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyKind::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            BodyKind::StaticString(string) => f.debug_tuple("StaticString").field(string).finish(),
            BodyKind::String(string) => f.debug_tuple("String").field(string).finish(),
            BodyKind::Stream { length, .. } => f.debug_struct("Stream").field("length", length).finish_non_exhaustive(),
            BodyKind::Ranges { complete_length, ranges, multipart, .. } => f.debug_struct("Ranges")
                .field("complete_length", complete_length)
                .field("ranges", ranges)
                .field("multipart", multipart)
                .finish_non_exhaustive(),
            BodyKind::Unsized(..) => f.write_str("Unsized"),
        }
    }
}

impl From<&'static str> for BodyKind {
    fn from(value: &'static str) -> Self {
        BodyKind::StaticString(value)
    }
}

impl From<String> for BodyKind {
    fn from(value: String) -> Self {
        BodyKind::String(value)
    }
}

impl From<Vec<u8>> for BodyKind {
    fn from(value: Vec<u8>) -> Self {
        BodyKind::Bytes(value)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::MediaType;

    #[test]
    fn test_known_length() {
        assert_eq!(BodyKind::from("hello").known_length(), Some(5));
        assert_eq!(BodyKind::from(vec![0u8; 3]).known_length(), Some(3));
        assert_eq!(BodyKind::Unsized(Box::new(Cursor::new(Vec::new()))).known_length(), None);

        let body = BodyKind::Ranges {
            handle: Box::new(Cursor::new(vec![0u8; 1000])),
            complete_length: 1000,
            ranges: vec![ByteRange { start: 500, end: 699 }],
            multipart: None,
        };
        assert_eq!(body.known_length(), Some(200));
    }

    #[test]
    fn test_known_length_multipart() {
        let multipart = Multipart::new(MediaType::OCTET_STREAM);
        let ranges = vec![ByteRange { start: 0, end: 9 }, ByteRange { start: 20, end: 29 }];
        let expected = multipart.encoded_length(&ranges, 100);
        let body = BodyKind::Ranges {
            handle: Box::new(Cursor::new(vec![0u8; 100])),
            complete_length: 100,
            ranges,
            multipart: Some(multipart),
        };
        assert_eq!(body.known_length(), Some(expected));
    }
}
