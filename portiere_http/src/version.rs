// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HttpVersion {
    Http10,
    Http11,
}

impl HttpVersion {
    /// The `HTTP-version` as it appears in the request and status lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVersion::Http10 => "HTTP/1.0",
            HttpVersion::Http11 => "HTTP/1.1",
        }
    }

    /// Whether connections using this version are persistent when neither
    /// party sends a `Connection` option.
    pub fn is_persistent_by_default(&self) -> bool {
        *self >= HttpVersion::Http11
    }

    /// Whether this version understands the chunked transfer coding.
    pub fn supports_chunked(&self) -> bool {
        *self >= HttpVersion::Http11
    }
}
