// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use tokio::io::{
    AsyncRead,
    AsyncReadExt,
    BufReader,
};

use portiere_http::{
    Error,
    HttpParseError,
};

/// The default maximum length of a line, excluding the CRLF.
pub const DEFAULT_MAXIMUM_LINE_LENGTH: usize = 8192;

/// Reads the lines and octets of HTTP/1.x messages from a stream.
///
/// The reader is buffered and is kept for the lifetime of the connection, so
/// data of a following request that was already received isn't lost between
/// exchanges.
pub struct ByteReader<R> {
    inner: BufReader<R>,
    maximum_line_length: usize,
}

impl<R> ByteReader<R>
        where R: AsyncRead + Unpin {
    pub fn new(inner: R) -> Self {
        Self::with_maximum_line_length(inner, DEFAULT_MAXIMUM_LINE_LENGTH)
    }

    pub fn with_maximum_line_length(inner: R, maximum_line_length: usize) -> Self {
        Self {
            inner: BufReader::new(inner),
            maximum_line_length,
        }
    }

    pub fn maximum_line_length(&self) -> usize {
        self.maximum_line_length
    }

    /// Reads a line terminated by CRLF, and returns it without the CRLF.
    ///
    /// Octets are mapped one-to-one onto characters (ISO 8859-1), since
    /// HTTP/1.x fields aren't necessarily UTF-8.
    ///
    /// # Errors
    /// * [`HttpParseError::InvalidCRLF`] when a CR isn't followed by an LF,
    ///   or an LF isn't preceded by a CR.
    /// * [`HttpParseError::LineTooLong`] when the line is longer than the
    ///   maximum line length.
    /// * [`Error::EndOfStream`] when the stream ends before the CRLF.
    pub async fn read_line(&mut self) -> Result<String, Error> {
        let mut line = String::new();
        let mut length = 0;

        loop {
            match self.inner.read_u8().await? {
                b'\r' => {
                    if self.inner.read_u8().await? == b'\n' {
                        return Ok(line);
                    }

                    return Err(Error::ParseError(HttpParseError::InvalidCRLF));
                }
                b'\n' => return Err(Error::ParseError(HttpParseError::InvalidCRLF)),
                byte => {
                    if length == self.maximum_line_length {
                        return Err(Error::ParseError(HttpParseError::LineTooLong));
                    }

                    length += 1;
                    line.push(byte as char);
                }
            }
        }
    }

    /// Reads exactly `length` octets.
    pub async fn read_bytes(&mut self, length: usize) -> Result<Vec<u8>, Error> {
        let mut buffer = vec![0; length];
        self.inner.read_exact(&mut buffer).await?;
        Ok(buffer)
    }

    pub fn get_mut(&mut self) -> &mut R {
        self.inner.get_mut()
    }

    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }
}
