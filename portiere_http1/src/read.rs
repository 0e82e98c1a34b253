// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use tokio::io::AsyncRead;

use portiere_http::{
    abnf,
    syntax,
    Error,
    HeaderMap,
    HeaderName,
    HeaderValue,
    HttpParseError,
    HttpVersion,
    Method,
    Request,
    RequestBody,
    RequestTarget,
};

use crate::ByteReader;

/// Indicates the maximum length of a certain HTTP entity.
pub(crate) struct MaximumLength(pub usize);

impl MaximumLength {
    /// The maximum length of a method name.
    pub const METHOD: MaximumLength = MaximumLength(16);

    /// The maximum length of a request target, including the query string.
    pub const REQUEST_TARGET: MaximumLength = MaximumLength(1024);

    /// The maximum number of hexadecimal digits of a chunk size, which keeps
    /// the size within a `u64`.
    pub const CHUNK_SIZE_DIGITS: MaximumLength = MaximumLength(16);
}

/// How the end of the request body is determined.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum BodyFraming {
    None,
    ContentLength(u64),
    Chunked,
}

/// Determines the framing of the body, as per
/// [RFC 9112 Section 6.3](https://www.rfc-editor.org/rfc/rfc9112.html#section-6.3).
pub(crate) fn determine_body_framing(headers: &HeaderMap) -> Result<BodyFraming, HttpParseError> {
    if headers.contains(&HeaderName::TransferEncoding) {
        if headers.contains(&HeaderName::ContentLength) {
            return Err(HttpParseError::ConflictingFraming);
        }

        let mut codings = headers.get_all(&HeaderName::TransferEncoding)
            .flat_map(HeaderValue::list_elements);

        // Only `chunked` is understood, and it must be applied exactly once.
        return match (codings.next(), codings.next()) {
            (Some(coding), None) if coding.eq_ignore_ascii_case("chunked") => Ok(BodyFraming::Chunked),
            _ => Err(HttpParseError::UnsupportedTransferCoding),
        };
    }

    let mut content_length = None;
    for value in headers.get_all(&HeaderName::ContentLength) {
        let mut elements = 0;
        for element in value.list_elements() {
            elements += 1;
            let length = abnf::parse_decimal(element).ok_or(HttpParseError::InvalidContentLength)?;
            match content_length {
                Some(previous) if previous != length => return Err(HttpParseError::ConflictingFraming),
                _ => content_length = Some(length),
            }
        }

        if elements == 0 {
            return Err(HttpParseError::InvalidContentLength);
        }
    }

    Ok(match content_length {
        Some(length) => BodyFraming::ContentLength(length),
        None => BodyFraming::None,
    })
}

/// Reads the headers from the stream.
pub(crate) async fn read_headers<R>(reader: &mut ByteReader<R>, maximum_header_count: usize) -> Result<HeaderMap, Error>
        where R: AsyncRead + Unpin {
    let mut header_map = HeaderMap::new();

    loop {
        let line = reader.read_line().await?;
        if line.is_empty() {
            return Ok(header_map);
        }

        if line.starts_with([' ', '\t']) {
            return Err(Error::ParseError(HttpParseError::ObsoleteLineFolding));
        }

        let Some((name, value)) = line.split_once(':') else {
            return Err(Error::ParseError(HttpParseError::HeaderDoesNotContainColon));
        };

        // No whitespace is allowed between the field name and the colon.
        syntax::validate_token(name)?;

        let value = syntax::trim_whitespace(value);
        syntax::validate_field_content(value.as_bytes())?;

        if header_map.len() == maximum_header_count {
            return Err(Error::ParseError(HttpParseError::TooManyHeaders));
        }

        header_map.append_possible_duplicate(HeaderName::from(name), HeaderValue::from(value.to_string()));
    }
}

/// Parses the `HTTP-version`.
///
/// ```text
/// HTTP-version  = HTTP-name "/" DIGIT "." DIGIT
/// HTTP-name     = %s"HTTP"
/// ```
fn parse_http_version(input: &str) -> Result<HttpVersion, HttpParseError> {
    let Some(version) = input.strip_prefix("HTTP/") else {
        return Err(HttpParseError::InvalidHttpVersion);
    };

    match version.as_bytes() {
        b"1.0" => Ok(HttpVersion::Http10),
        b"1.1" => Ok(HttpVersion::Http11),
        [major, b'.', minor] if abnf::is_digit(*major) && abnf::is_digit(*minor) => {
            Err(HttpParseError::UnsupportedHttpVersion)
        }
        _ => Err(HttpParseError::InvalidHttpVersion),
    }
}

/// Parses the request-line.
///
/// ```text
/// request-line   = method SP request-target SP HTTP-version
/// ```
pub(crate) fn parse_request_line(line: &str) -> Result<(Method, RequestTarget, HttpVersion), HttpParseError> {
    let mut parts = line.split(' ');
    let (Some(method), Some(target), Some(version), None) = (parts.next(), parts.next(), parts.next(), parts.next()) else {
        return Err(HttpParseError::InvalidRequestLine);
    };

    if method.len() > MaximumLength::METHOD.0 {
        return Err(HttpParseError::MethodTooLarge);
    }
    syntax::validate_token(method)?;

    if target.is_empty() {
        return Err(HttpParseError::InvalidRequestLine);
    }
    if target.len() > MaximumLength::REQUEST_TARGET.0 {
        return Err(HttpParseError::RequestTargetTooLarge);
    }

    let version = parse_http_version(version)?;
    let target = RequestTarget::parse(target)?;

    Ok((Method::from(method), target, version))
}

/// Read the request-line from the stream. A single empty line preceding it is
/// ignored, as recommended by
/// [RFC 9112 Section 2.2](https://www.rfc-editor.org/rfc/rfc9112.html#section-2.2).
pub(crate) async fn read_request_line<R>(reader: &mut ByteReader<R>) -> Result<(Method, RequestTarget, HttpVersion), Error>
        where R: AsyncRead + Unpin {
    let mut line = reader.read_line().await?;
    if line.is_empty() {
        line = reader.read_line().await?;
    }

    Ok(parse_request_line(&line)?)
}

/// Reads the request body from the stream and stores it in the request.
pub(crate) async fn read_request_body<R>(reader: &mut ByteReader<R>, request: &mut Request, maximum_body_size: u64) -> Result<(), Error>
        where R: AsyncRead + Unpin {
    let data = match determine_body_framing(&request.headers)? {
        BodyFraming::None => return Ok(()),
        BodyFraming::ContentLength(length) => {
            if length > maximum_body_size {
                return Err(Error::ParseError(HttpParseError::BodyTooLarge));
            }

            let length = usize::try_from(length).map_err(|_| HttpParseError::BodyTooLarge)?;
            reader.read_bytes(length).await?
        }
        BodyFraming::Chunked => read_request_body_chunked(reader, maximum_body_size).await?,
    };

    request.body = RequestBody::new(data);
    Ok(())
}

/// Parses the `chunk-size` of a chunk line, ignoring any chunk extensions.
///
/// ```text
/// chunk          = chunk-size [ chunk-ext ] CRLF
///                  chunk-data CRLF
/// chunk-size     = 1*HEXDIG
/// ```
fn parse_chunk_size(line: &str) -> Result<u64, HttpParseError> {
    let size = match line.split_once(';') {
        Some((size, _extensions)) => syntax::trim_whitespace(size),
        None => line,
    };

    if size.is_empty() || size.len() > MaximumLength::CHUNK_SIZE_DIGITS.0 {
        return Err(HttpParseError::InvalidChunkSize);
    }

    size.bytes().try_fold(0u64, |value, byte| {
        let digit = abnf::hex_digit_value(byte).ok_or(HttpParseError::InvalidChunkSize)?;
        Ok(value << 4 | u64::from(digit))
    })
}

/// Reads the body of a request, assuming that the body is encoded using chunked
/// transfer encoding. Trailer fields are read and discarded.
async fn read_request_body_chunked<R>(reader: &mut ByteReader<R>, maximum_body_size: u64) -> Result<Vec<u8>, Error>
        where R: AsyncRead + Unpin {
    let mut body = Vec::new();

    loop {
        let size = parse_chunk_size(&reader.read_line().await?)?;
        if size == 0 {
            break;
        }

        (body.len() as u64).checked_add(size)
            .filter(|total| *total <= maximum_body_size)
            .ok_or(HttpParseError::BodyTooLarge)?;

        let size = usize::try_from(size).map_err(|_| HttpParseError::BodyTooLarge)?;
        body.extend_from_slice(&reader.read_bytes(size).await?);

        if !reader.read_line().await?.is_empty() {
            return Err(Error::ParseError(HttpParseError::InvalidCRLF));
        }
    }

    while !reader.read_line().await?.is_empty() {}

    Ok(body)
}
