// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! The HTTP/1.0 and HTTP/1.1 wire protocol: parsing requests from a
//! connection, and framing the responses to them.

mod read;
pub mod reader;

pub(crate) use read::*;
pub use reader::ByteReader;

use std::{
    io::{self, SeekFrom},
    net::SocketAddr,
    time::Instant,
};

use tokio::{
    io::{
        split,
        AsyncRead,
        AsyncReadExt,
        AsyncSeekExt,
        AsyncWrite,
        AsyncWriteExt,
        BufWriter,
    },
    net::{TcpListener, TcpStream},
    task,
    time::timeout,
};
use tracing::{debug, error, info, warn, Instrument};

use portiere_http::{
    BodyKind,
    ByteRange,
    Error,
    HeaderName,
    HeaderValue,
    HttpParseError,
    HttpVersion,
    Method,
    Multipart,
    Request,
    Response,
    SeekableStream,
};

use portiere_http_handling::{
    finish_response_error,
    finish_response_normal,
    handle_parse_error,
    handle_request,
    responses,
    PortiereConfig,
    PortiereSettings,
};

/// The size of the buffer used to copy streamed bodies.
const TRANSFER_BUFFER_SIZE: usize = 16384;

/// `EMFILE`: the process ran out of file descriptors.
#[cfg(unix)]
const ERRNO_EMFILE: i32 = 24;

/// The strategy to use for transferring the response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStrategy {
    /// The body is delimited by the `Content-Length`.
    Full,

    /// The body is sent using the `chunked` transfer coding.
    Chunked,

    /// The body is delimited by closing the connection, only for HTTP/1.0
    /// clients with bodies of unknown length.
    UntilClose,
}

/// What should happen with the connection after an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionDirective {
    KeepAlive,
    Close,
}

#[derive(Debug)]
pub enum ExchangeError {
    /// The client closed the connection, possibly in the middle of a request.
    Closed,
    MalformedData,
    TimedOut,
    Io(io::Error),
}

impl From<io::Error> for ExchangeError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// Plans out the `TransferStrategy` for the given response, and sets the
/// framing headers accordingly.
fn determine_transfer_strategy(response: &mut Response, version: HttpVersion) -> TransferStrategy {
    response.headers.remove(&HeaderName::TransferEncoding);

    if response.status.forbids_content() {
        response.headers.remove(&HeaderName::ContentLength);
        response.body = None;
        return TransferStrategy::Full;
    }

    let Some(body) = &response.body else {
        response.headers.set_content_length(0);
        return TransferStrategy::Full;
    };

    if let Some(length) = body.known_length() {
        response.headers.set_content_length(length);
        return TransferStrategy::Full;
    }

    response.headers.remove(&HeaderName::ContentLength);
    if version.supports_chunked() {
        response.headers.set(HeaderName::TransferEncoding, HeaderValue::StaticString("chunked"));
        TransferStrategy::Chunked
    } else {
        response.headers.set(HeaderName::Connection, HeaderValue::StaticString("close"));
        TransferStrategy::UntilClose
    }
}

/// Whether the client wants the connection to stay open after this exchange.
///
/// # References
/// * [RFC 9112 Section 9.3](https://www.rfc-editor.org/rfc/rfc9112.html#section-9.3)
fn request_wants_keep_alive(request: &Request) -> bool {
    if request.headers.has_connection_option("close") {
        return false;
    }

    request.version.is_persistent_by_default() || request.headers.has_connection_option("keep-alive")
}

fn expects_continue(request: &Request) -> bool {
    request.version == HttpVersion::Http11
        && request.headers.get(&HeaderName::Expect)
            .and_then(HeaderValue::as_str_no_convert)
            .is_some_and(|value| value.eq_ignore_ascii_case("100-continue"))
}

/// Sends the error response for a malformed request. The connection can't be
/// used for another exchange afterwards, since the framing may be lost.
async fn send_parse_error<W>(writer: &mut W, error: HttpParseError, version: HttpVersion) -> Result<ConnectionDirective, ExchangeError>
        where W: AsyncWrite + Unpin {
    debug!(error = error.as_ref(), "malformed request");

    let mut response = handle_parse_error(error);
    finish_response_error(&mut response);
    send_response(writer, response, version, false).await?;
    Err(ExchangeError::MalformedData)
}

async fn send_request_timeout<W>(writer: &mut W, version: HttpVersion) -> ExchangeError
        where W: AsyncWrite + Unpin {
    _ = send_response(writer, responses::create_request_timeout(), version, false).await;
    ExchangeError::TimedOut
}

/// Reads a single request, handles it and sends the response back to the
/// client.
pub async fn handle_exchange<R, W>(reader: &mut ByteReader<R>, writer: &mut W, settings: &PortiereSettings) -> Result<ConnectionDirective, ExchangeError>
        where R: AsyncRead + Unpin,
              W: AsyncWrite + Unpin {
    // Errors are answered in the version of the request, once it is known.
    let mut version = HttpVersion::Http11;
    let request = timeout(settings.read_headers_timeout, async {
        let (method, target, request_version) = read_request_line(reader).await?;
        version = request_version;
        let headers = read_headers(reader, settings.maximum_header_count).await?;
        Ok::<_, Error>(Request::new(method, target, request_version, headers))
    }).await;

    let mut request = match request {
        Ok(Ok(request)) => request,
        Ok(Err(Error::ParseError(error))) => return send_parse_error(writer, error, version).await,
        Ok(Err(Error::EndOfStream)) => return Err(ExchangeError::Closed),
        Ok(Err(Error::Other(error))) => return Err(error.into()),
        Err(_) => return Err(send_request_timeout(writer, version).await),
    };

    let start = Instant::now();

    if expects_continue(&request) && determine_body_framing(&request.headers).is_ok_and(|framing| framing != BodyFraming::None) {
        writer.write_all(b"HTTP/1.1 100 Continue\r\n\r\n").await?;
        writer.flush().await?;
    }

    match timeout(settings.read_body_timeout, read_request_body(reader, &mut request, settings.maximum_body_size)).await {
        Ok(Ok(())) => (),
        Ok(Err(Error::ParseError(error))) => return send_parse_error(writer, error, request.version).await,
        Ok(Err(Error::EndOfStream)) => return Err(ExchangeError::Closed),
        Ok(Err(Error::Other(error))) => return Err(error.into()),
        Err(_) => return Err(send_request_timeout(writer, request.version).await),
    }

    let mut response = handle_request(&mut request, settings).await;
    finish_response_normal(&mut response);
    response.prepare(&request);

    if let Some(name) = response.headers.first_invalid_field() {
        error!(header = name.to_string_h1(), "response contains a header that can't be sent");
        response = responses::create_internal_server_error();
        finish_response_normal(&mut response);
        response.prepare(&request);
    }

    let keep_alive = request_wants_keep_alive(&request)
        && !response.headers.has_connection_option("close")
        && (request.version.supports_chunked() || !matches!(response.body, Some(BodyKind::Unsized(..))));

    response.headers.set(HeaderName::Connection, HeaderValue::StaticString(if keep_alive { "keep-alive" } else { "close" }));

    let status = response.status.code();
    send_response(writer, response, request.version, request.method == Method::Head).await?;

    let elapsed = start.elapsed();
    debug!(method = %request.method, target = request.target.as_str(), status, ?elapsed, "handled exchange");

    Ok(if keep_alive { ConnectionDirective::KeepAlive } else { ConnectionDirective::Close })
}

/// Send the response to the client. The response is consumed, so its headers
/// can't change after the first byte is written.
pub async fn send_response<W>(writer: &mut W, mut response: Response, version: HttpVersion, is_head: bool) -> Result<(), io::Error>
        where W: AsyncWrite + Unpin {
    let transfer_strategy = determine_transfer_strategy(&mut response, version);

    let mut response_text = String::with_capacity(1024);
    response_text.push_str(version.as_str());
    response_text.push(' ');
    response_text.push_str(&response.status.to_string());
    response_text.push_str("\r\n");

    for (name, value) in response.headers.iter() {
        response_text.push_str(name.to_string_h1());
        response_text.push_str(": ");
        value.append_to_message(&mut response_text);
        response_text.push_str("\r\n");
    }

    response_text.push_str("\r\n");

    writer.write_all(response_text.as_bytes()).await?;

    if let (Some(body), false) = (response.body, is_head) {
        match body {
            BodyKind::Bytes(bytes) => writer.write_all(&bytes).await?,
            BodyKind::StaticString(string) => writer.write_all(string.as_bytes()).await?,
            BodyKind::String(string) => writer.write_all(string.as_bytes()).await?,
            BodyKind::Stream { mut handle, length } => {
                transfer_body_exact(writer, &mut handle, 0, length).await?;
            }
            BodyKind::Ranges { mut handle, complete_length, ranges, multipart } => {
                transfer_body_ranges(writer, &mut handle, complete_length, &ranges, multipart.as_ref()).await?;
            }
            BodyKind::Unsized(mut handle) => match transfer_strategy {
                TransferStrategy::Chunked => transfer_body_chunked(writer, &mut handle).await?,
                _ => {
                    transfer_body_full(writer, &mut handle).await?;
                }
            },
        }
    }

    writer.flush().await
}

/// Serves a connection until either side closes it, or a request can't be
/// handled.
pub async fn serve_connection<S>(stream: S, settings: &PortiereSettings)
        where S: AsyncRead + AsyncWrite {
    let (reader, writer) = split(stream);
    let mut reader = ByteReader::with_maximum_line_length(reader, settings.maximum_line_length);
    let mut writer = BufWriter::new(writer);

    loop {
        match handle_exchange(&mut reader, &mut writer, settings).await {
            Ok(ConnectionDirective::KeepAlive) => continue,
            Ok(ConnectionDirective::Close) | Err(ExchangeError::Closed) => break,
            Err(error) => {
                debug!(?error, "connection ended");
                break;
            }
        }
    }

    _ = writer.shutdown().await;
}

/// Process a single socket connection.
async fn process_socket(stream: TcpStream, config: PortiereConfig) {
    _ = stream.set_nodelay(true);

    match &config.tls {
        Some(tls) => match tls.acceptor().accept(stream).await {
            Ok(stream) => serve_connection(stream, &config.settings).await,
            Err(error) => debug!(%error, "TLS handshake failed"),
        },
        None => serve_connection(stream, &config.settings).await,
    }
}

/// Start the HTTP/1.x server on the given address.
pub async fn start(address: &str, config: PortiereConfig) -> io::Result<()> {
    let listener = TcpListener::bind(address).await?;
    info!(address = %listener.local_addr()?, tls = config.tls.is_some(), "started listening");
    serve(listener, config).await
}

/// Accepts connections from the listener, handling every connection in its
/// own task.
pub async fn serve(listener: TcpListener, config: PortiereConfig) -> io::Result<()> {
    loop {
        let (stream, peer): (TcpStream, SocketAddr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                #[cfg(unix)]
                if e.raw_os_error() == Some(ERRNO_EMFILE) {
                    task::yield_now().await;
                    continue;
                }

                warn!(error = %e, "error accepting connection");
                continue;
            }
        };

        let config = config.clone();
        task::spawn(async move {
            process_socket(stream, config).await;
        }.instrument(tracing::debug_span!("connection", %peer)));
    }
}

/// Transfer the body, using the `Transfer-Encoding: chunked` algorithm.
async fn transfer_body_chunked<O, I>(output: &mut O, input: &mut I) -> Result<(), io::Error>
        where O: AsyncWrite + Unpin,
              I: AsyncRead + Unpin {
    let mut buf = vec![0; TRANSFER_BUFFER_SIZE];
    loop {
        let len = input.read(&mut buf).await?;

        if len == 0 {
            break;
        }

        output.write_all(format!("{:X}\r\n", len).as_bytes()).await?;
        output.write_all(&buf[0..len]).await?;
        output.write_all(b"\r\n").await?;
    }

    output.write_all(b"0\r\n\r\n").await?;

    Ok(())
}

/// Transfer the body, using the full contents of the input, without any
/// `Transfer-Encoding` or ranges. Returns the number of bytes transferred.
async fn transfer_body_full<O, I>(output: &mut O, input: &mut I) -> Result<u64, io::Error>
        where O: AsyncWrite + Unpin,
              I: AsyncRead + Unpin {
    let mut buf = vec![0; TRANSFER_BUFFER_SIZE];
    let mut transferred = 0;

    loop {
        let len = input.read(&mut buf).await?;
        if len == 0 {
            return Ok(transferred);
        }

        output.write_all(&buf[0..len]).await?;
        transferred += len as u64;
    }
}

/// Transfers exactly `length` bytes, starting at `start`. Since the length
/// was already announced, a stream ending early is an error.
async fn transfer_body_exact<O>(output: &mut O, input: &mut Box<dyn SeekableStream>, start: u64, length: u64) -> Result<(), io::Error>
        where O: AsyncWrite + Unpin {
    input.seek(SeekFrom::Start(start)).await?;

    let mut limited = (&mut *input).take(length);
    let transferred = transfer_body_full(output, &mut limited).await?;
    if transferred != length {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "body stream ended before its announced length"));
    }

    Ok(())
}

/// Transfer the body, using the ranges that were resolved for the request.
async fn transfer_body_ranges<O>(output: &mut O, input: &mut Box<dyn SeekableStream>, complete_length: u64,
                                 ranges: &[ByteRange], multipart: Option<&Multipart>) -> Result<(), io::Error>
        where O: AsyncWrite + Unpin {
    for range in ranges {
        if let Some(multipart) = multipart {
            output.write_all(multipart.part_header(range, complete_length).as_bytes()).await?;
        }

        transfer_body_exact(output, input, range.start, range.len()).await?;
    }

    if let Some(multipart) = multipart {
        output.write_all(multipart.closing_delimiter().as_bytes()).await?;
    }

    Ok(())
}
