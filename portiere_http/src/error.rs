// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use strum_macros::AsRefStr;

use std::{fmt, io};

#[derive(Debug)]
pub enum Error {
    ParseError(HttpParseError),

    /// The peer closed the stream before the expected data arrived.
    EndOfStream,

    Other(io::Error),
}

impl From<HttpParseError> for Error {
    fn from(error: HttpParseError) -> Self {
        Error::ParseError(error)
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        if error.kind() == io::ErrorKind::UnexpectedEof {
            return Error::EndOfStream;
        }

        Error::Other(error)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ParseError(error) => write!(f, "parse error: {}", error.as_ref()),
            Error::EndOfStream => f.write_str("end of stream"),
            Error::Other(error) => write!(f, "i/o error: {error}"),
        }
    }
}

impl std::error::Error for Error {}

/// An error that can occur while parsing an HTTP request.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, AsRefStr)]
pub enum HttpParseError {
    /// Both `Content-Length` and `Transfer-Encoding` were present, or the
    /// `Content-Length` field occurred multiple times with different values.
    ConflictingFraming,

    /// The header didn't contain a colon, it's only the name.
    ///
    /// ## Example:
    /// ```text
    /// Content-Type
    /// ```
    HeaderDoesNotContainColon,

    /// The body exceeded the configured maximum size.
    BodyTooLarge,

    /// The field value contained control characters.
    FieldValueContainsInvalidCharacters,

    /// The chunk-size line of a chunked body was not a hexadecimal number.
    ///
    /// ## Example:
    /// ```text
    /// 1G\r\n
    /// ```
    InvalidChunkSize,

    /// The `Content-Length` field was malformed, meaning it contained
    /// non-numeric characters, was too large, was negative, or was the empty
    /// string.
    ///
    /// ## Example:
    /// ```text
    /// Content-Length: 123abc
    /// ```
    InvalidContentLength,

    /// The line ended with CR but not followed by an LF.
    ///
    /// ## Example:
    /// ```text
    /// Content-Length: 123\r
    /// ```
    InvalidCRLF,

    /// The HTTP version was not of the form `HTTP/<digit>.<digit>`.
    ///
    /// ## Examples:
    /// ```text
    /// HTTP/1.
    /// REST/1.1
    /// HTTP/1.1.1
    /// ```
    InvalidHttpVersion,

    /// The request target contained a control character or a byte outside of
    /// US-ASCII.
    InvalidOctetInRequestTarget,

    /// The request-line didn't consist of exactly three parts separated by a
    /// single space.
    ///
    /// ## Examples:
    /// ```text
    /// GET /
    /// GET  / HTTP/1.1
    /// ```
    InvalidRequestLine,

    /// The request-target format is unknown or unsupported.
    ///
    /// ## Examples:
    /// ```text
    /// GET not-beginning-with-a-solidus HTTP/1.1
    /// OPTIONS *** HTTP/1.1
    /// CONNECT example.org:443 HTTP/1.1
    /// ```
    InvalidRequestTarget,

    /// A line was longer than the configured maximum.
    LineTooLong,

    /// The method was too large.
    ///
    /// ## Example:
    /// ```text
    /// THIS-IS-A-VERY-LONG-METHOD-CONTAINING-MANY-CHARACTERS / HTTP/1.1
    /// ```
    MethodTooLarge,

    /// A header line started with whitespace (`obs-fold`), which RFC 9112
    /// allows a server to reject.
    ObsoleteLineFolding,

    /// The request-target (e.g. URI) was too large.
    RequestTargetTooLarge,

    TokenContainsDelimiter,
    TokenContainsNonVisibleAscii,
    TokenContainsWhitespace,
    TokenEmpty,

    /// The request contained more header fields than allowed.
    TooManyHeaders,

    /// The version was syntactically valid, but isn't HTTP/1.0 or HTTP/1.1.
    ///
    /// ## Examples:
    /// ```text
    /// PRI * HTTP/2.0
    /// GET / HTTP/3.0
    /// ```
    UnsupportedHttpVersion,

    /// The final transfer coding wasn't `chunked`, so the end of the body
    /// can't be determined.
    UnsupportedTransferCoding,
}
