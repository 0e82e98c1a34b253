// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use tracing::{error, warn};

use crate::{
    BodyKind,
    HeaderMap,
    HeaderName,
    HeaderValue,
    HttpRangeList,
    HttpVersion,
    MediaType,
    Method,
    Multipart,
    Request,
    SeekableStream,
    SetCookie,
    StatusCode,
    StatusCodeClass,
};

/// The values a template is rendered with.
pub type TemplateValues = BTreeMap<String, String>;

/// Selects what `Response::prepare` does before the response is sent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResponseKind {
    /// Sent exactly as constructed.
    Plain,

    /// A textual or in-memory body, for which a `Content-Type` is ensured.
    Text,

    Redirect {
        location: String,
    },

    /// A seekable body of known length, of which the client can request
    /// parts with the `Range` header.
    Ranged,

    /// Rendered by the template renderer of the server before preparing.
    Template {
        name: String,
        values: TemplateValues,
    },
}

#[derive(Debug)]
pub struct Response {
    pub version: HttpVersion,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Option<BodyKind>,
    pub kind: ResponseKind,
    prepared: bool,
}

impl Response {
    pub fn with_status(status: StatusCode) -> Self {
        Self {
            version: HttpVersion::Http11,
            status,
            headers: HeaderMap::new(),
            body: None,
            kind: ResponseKind::Plain,
            prepared: false,
        }
    }

    pub fn with_status_and_string_body(status: StatusCode, body: impl Into<Cow<'static, str>>) -> Self {
        let mut response = Self::with_status(status);
        response.headers.set_content_type(MediaType::PLAIN_TEXT);
        response.body = Some(match body.into() {
            Cow::Owned(body) => BodyKind::String(body),
            Cow::Borrowed(body) => BodyKind::StaticString(body),
        });
        response
    }

    pub fn bad_request(message: &'static str) -> Self {
        Self::with_status_and_string_body(StatusCode::BadRequest, message)
    }

    pub fn forbidden(message: &'static str) -> Self {
        Self::with_status_and_string_body(StatusCode::Forbidden, message)
    }

    pub fn not_found(message: &'static str) -> Self {
        Self::with_status_and_string_body(StatusCode::NotFound, message)
    }

    /// A `200 OK` response with a text body. The `Content-Type` defaults to
    /// `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<Cow<'static, str>>) -> Self {
        let mut response = Self::with_status(StatusCode::Ok);
        response.kind = ResponseKind::Text;
        response.body = Some(match body.into() {
            Cow::Owned(body) => BodyKind::String(body),
            Cow::Borrowed(body) => BodyKind::StaticString(body),
        });
        response
    }

    pub fn bytes(body: Vec<u8>, media_type: MediaType) -> Self {
        let mut response = Self::with_status(StatusCode::Ok);
        response.kind = ResponseKind::Text;
        response.headers.set_content_type(media_type);
        response.body = Some(BodyKind::Bytes(body));
        response
    }

    /// A `302 Found` redirect to the given location. The location is sent
    /// as-is, so a location containing CR or LF makes the response fail with
    /// `500 Internal Server Error` when it is sent.
    pub fn redirect(location: impl Into<String>) -> Self {
        Self::redirect_with_status(location, StatusCode::Found)
    }

    /// A redirect with a specific 3xx status. Statuses that aren't redirects
    /// are replaced with `302 Found`.
    pub fn redirect_with_status(location: impl Into<String>, status: StatusCode) -> Self {
        let status = if status.class() == StatusCodeClass::Redirection && status != StatusCode::NotModified {
            status
        } else {
            warn!(status = status.code(), "redirect requested with a non-redirection status, using 302 Found");
            StatusCode::Found
        };

        let mut response = Self::with_status(status);
        response.kind = ResponseKind::Redirect { location: location.into() };
        response
    }

    /// A response of which the client can request byte ranges.
    pub fn ranged(handle: impl SeekableStream + 'static, length: u64, media_type: MediaType) -> Self {
        let mut response = Self::with_status(StatusCode::Ok);
        response.kind = ResponseKind::Ranged;
        response.headers.set_content_type(media_type);
        response.body = Some(BodyKind::Stream {
            handle: Box::new(handle),
            length,
        });
        response
    }

    /// Opens the file as a ranged response, with the media type derived from
    /// its extension.
    pub async fn file(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let file = tokio::fs::File::open(path).await?;
        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"));
        }

        let media_type = MediaType::from_path(&path.to_string_lossy()).clone();
        let mut response = Self::ranged(file, metadata.len(), media_type);
        if let Ok(modified) = metadata.modified() {
            response.headers.set_last_modified(modified);
        }
        Ok(response)
    }

    pub fn template(name: impl Into<String>, values: TemplateValues) -> Self {
        let mut response = Self::with_status(StatusCode::Ok);
        response.kind = ResponseKind::Template {
            name: name.into(),
            values,
        };
        response
    }

    /// Sets the header, replacing any previous values. Values that can't be
    /// sent, such as ones with CR or LF, replace the whole response with
    /// `500 Internal Server Error` when it is sent.
    pub fn with_header(mut self, name: HeaderName, value: impl Into<HeaderValue>) -> Self {
        self.headers.set(name, value.into());
        self
    }

    pub fn set_cookie(&mut self, cookie: &SetCookie) {
        self.headers.append_possible_duplicate(HeaderName::SetCookie, HeaderValue::String(cookie.to_string()));
    }

    #[must_use]
    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// Computes the headers that depend on the request. Only the first call
    /// has effect.
    pub fn prepare(&mut self, request: &Request) {
        if self.prepared {
            return;
        }
        self.prepared = true;
        self.version = request.version;

        match &self.kind {
            ResponseKind::Plain => (),
            ResponseKind::Text => {
                if !self.headers.contains(&HeaderName::ContentType) {
                    self.headers.set_content_type(MediaType::PLAIN_TEXT);
                }
                if let Some(length) = self.body.as_ref().and_then(BodyKind::known_length) {
                    self.headers.set_content_length(length);
                }
            }
            ResponseKind::Redirect { location } => {
                let location = location.clone();
                self.headers.set(HeaderName::Location, HeaderValue::String(location));
            }
            ResponseKind::Ranged => self.prepare_ranged(request),
            ResponseKind::Template { name, .. } => {
                error!(template = %name, "template response reached serialization without being rendered");
                self.status = StatusCode::InternalServerError;
                self.headers = HeaderMap::new();
                self.body = None;
            }
        }
    }

    fn prepare_ranged(&mut self, request: &Request) {
        self.headers.set(HeaderName::AcceptRanges, HeaderValue::StaticString("bytes"));

        let Some(BodyKind::Stream { handle, length }) = self.body.take() else {
            return;
        };

        let ranges = if self.status == StatusCode::Ok
                && matches!(request.method, Method::Get | Method::Head)
                && self.if_range_matches(request) {
            request.headers.get(&HeaderName::Range)
                .and_then(HeaderValue::as_str_no_convert)
                .and_then(HttpRangeList::parse)
        } else {
            None
        };

        let Some(ranges) = ranges else {
            self.headers.set_content_length(length);
            self.body = Some(BodyKind::Stream { handle, length });
            return;
        };

        let ranges = match ranges.resolve(length) {
            Ok(ranges) => ranges,
            Err(error) => {
                self.status = StatusCode::RangeNotSatisfiable;
                self.headers.set_content_range(error.content_range());
                self.headers.set_content_length(0);
                return;
            }
        };

        self.status = StatusCode::PartialContent;
        let multipart = if ranges.len() == 1 {
            self.headers.set_content_range(ranges[0].content_range(length));
            None
        } else {
            let content_type = match self.headers.get(&HeaderName::ContentType) {
                Some(HeaderValue::MediaType(media_type)) => media_type.clone(),
                Some(value) => MediaType::Custom(value.to_string()),
                None => MediaType::OCTET_STREAM,
            };
            let multipart = Multipart::new(content_type);
            self.headers.set(HeaderName::ContentType, HeaderValue::String(multipart.content_type_header()));
            Some(multipart)
        };

        let body = BodyKind::Ranges {
            handle,
            complete_length: length,
            ranges,
            multipart,
        };
        if let Some(length) = body.known_length() {
            self.headers.set_content_length(length);
        }
        self.body = Some(body);
    }

    /// A `Range` is only honored when the `If-Range` validator, if any,
    /// equals the current `ETag` or `Last-Modified`.
    fn if_range_matches(&self, request: &Request) -> bool {
        let Some(if_range) = request.headers.get(&HeaderName::IfRange) else {
            return true;
        };

        let if_range = if_range.to_string();
        [HeaderName::ETag, HeaderName::LastModified].iter()
            .filter_map(|name| self.headers.get(name))
            .any(|validator| validator.to_string() == if_range)
    }
}
