// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use phf::phf_map;
use unicase::UniCase;

/// A field name. Well-known names get their own variant; other names are
/// stored lowercased, which makes every comparison case-insensitive.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HeaderName {
    Other(String),

    Accept,
    AcceptEncoding,
    AcceptLanguage,
    AcceptRanges,
    Allow,
    Authorization,
    CacheControl,
    Connection,
    ContentDisposition,
    ContentEncoding,
    ContentLength,
    ContentLocation,
    ContentRange,
    ContentType,
    Cookie,
    Date,
    ETag,
    Expect,
    Host,
    IfModifiedSince,
    IfNoneMatch,
    IfRange,
    KeepAlive,
    LastModified,
    Location,
    Origin,
    Range,
    Referer,
    RetryAfter,
    Server,
    SetCookie,
    TE,
    Trailer,
    TransferEncoding,
    Upgrade,
    UserAgent,
    Vary,
    XContentTypeOptions,
}

static STRING_TO_HEADER_NAME_MAP: phf::Map<UniCase<&'static str>, HeaderName> = phf_map!(
    UniCase::ascii("accept") => HeaderName::Accept,
    UniCase::ascii("accept-encoding") => HeaderName::AcceptEncoding,
    UniCase::ascii("accept-language") => HeaderName::AcceptLanguage,
    UniCase::ascii("accept-ranges") => HeaderName::AcceptRanges,
    UniCase::ascii("allow") => HeaderName::Allow,
    UniCase::ascii("authorization") => HeaderName::Authorization,
    UniCase::ascii("cache-control") => HeaderName::CacheControl,
    UniCase::ascii("connection") => HeaderName::Connection,
    UniCase::ascii("content-disposition") => HeaderName::ContentDisposition,
    UniCase::ascii("content-encoding") => HeaderName::ContentEncoding,
    UniCase::ascii("content-length") => HeaderName::ContentLength,
    UniCase::ascii("content-location") => HeaderName::ContentLocation,
    UniCase::ascii("content-range") => HeaderName::ContentRange,
    UniCase::ascii("content-type") => HeaderName::ContentType,
    UniCase::ascii("cookie") => HeaderName::Cookie,
    UniCase::ascii("date") => HeaderName::Date,
    UniCase::ascii("etag") => HeaderName::ETag,
    UniCase::ascii("expect") => HeaderName::Expect,
    UniCase::ascii("host") => HeaderName::Host,
    UniCase::ascii("if-modified-since") => HeaderName::IfModifiedSince,
    UniCase::ascii("if-none-match") => HeaderName::IfNoneMatch,
    UniCase::ascii("if-range") => HeaderName::IfRange,
    UniCase::ascii("keep-alive") => HeaderName::KeepAlive,
    UniCase::ascii("last-modified") => HeaderName::LastModified,
    UniCase::ascii("location") => HeaderName::Location,
    UniCase::ascii("origin") => HeaderName::Origin,
    UniCase::ascii("range") => HeaderName::Range,
    UniCase::ascii("referer") => HeaderName::Referer,
    UniCase::ascii("retry-after") => HeaderName::RetryAfter,
    UniCase::ascii("server") => HeaderName::Server,
    UniCase::ascii("set-cookie") => HeaderName::SetCookie,
    UniCase::ascii("te") => HeaderName::TE,
    UniCase::ascii("trailer") => HeaderName::Trailer,
    UniCase::ascii("transfer-encoding") => HeaderName::TransferEncoding,
    UniCase::ascii("upgrade") => HeaderName::Upgrade,
    UniCase::ascii("user-agent") => HeaderName::UserAgent,
    UniCase::ascii("vary") => HeaderName::Vary,
    UniCase::ascii("x-content-type-options") => HeaderName::XContentTypeOptions,
);

impl From<String> for HeaderName {
    fn from(mut value: String) -> Self {
        match STRING_TO_HEADER_NAME_MAP.get(&UniCase::ascii(value.as_str())) {
            Some(header_name) => header_name.clone(),
            None => {
                value.make_ascii_lowercase();
                HeaderName::Other(value)
            }
        }
    }
}

impl From<&str> for HeaderName {
    fn from(value: &str) -> Self {
        match STRING_TO_HEADER_NAME_MAP.get(&UniCase::ascii(value)) {
            Some(header_name) => header_name.clone(),
            None => HeaderName::Other(value.to_ascii_lowercase()),
        }
    }
}

impl HeaderName {
    /// The name as it is written in HTTP/1.x messages.
    #[must_use]
    pub fn to_string_h1(&self) -> &str {
        match self {
            HeaderName::Other(str) => str,

            HeaderName::Accept => "Accept",
            HeaderName::AcceptEncoding => "Accept-Encoding",
            HeaderName::AcceptLanguage => "Accept-Language",
            HeaderName::AcceptRanges => "Accept-Ranges",
            HeaderName::Allow => "Allow",
            HeaderName::Authorization => "Authorization",
            HeaderName::CacheControl => "Cache-Control",
            HeaderName::Connection => "Connection",
            HeaderName::ContentDisposition => "Content-Disposition",
            HeaderName::ContentEncoding => "Content-Encoding",
            HeaderName::ContentLength => "Content-Length",
            HeaderName::ContentLocation => "Content-Location",
            HeaderName::ContentRange => "Content-Range",
            HeaderName::ContentType => "Content-Type",
            HeaderName::Cookie => "Cookie",
            HeaderName::Date => "Date",
            HeaderName::ETag => "ETag",
            HeaderName::Expect => "Expect",
            HeaderName::Host => "Host",
            HeaderName::IfModifiedSince => "If-Modified-Since",
            HeaderName::IfNoneMatch => "If-None-Match",
            HeaderName::IfRange => "If-Range",
            HeaderName::KeepAlive => "Keep-Alive",
            HeaderName::LastModified => "Last-Modified",
            HeaderName::Location => "Location",
            HeaderName::Origin => "Origin",
            HeaderName::Range => "Range",
            HeaderName::Referer => "Referer",
            HeaderName::RetryAfter => "Retry-After",
            HeaderName::Server => "Server",
            HeaderName::SetCookie => "Set-Cookie",
            HeaderName::TE => "TE",
            HeaderName::Trailer => "Trailer",
            HeaderName::TransferEncoding => "Transfer-Encoding",
            HeaderName::Upgrade => "Upgrade",
            HeaderName::UserAgent => "User-Agent",
            HeaderName::Vary => "Vary",
            HeaderName::XContentTypeOptions => "X-Content-Type-Options",
        }
    }
}
