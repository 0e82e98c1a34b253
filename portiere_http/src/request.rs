// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::borrow::Cow;

use crate::{
    cookie,
    HeaderMap,
    HeaderName,
    HttpVersion,
    Method,
    RequestTarget,
};

/// The content of a request, read completely before the handler is invoked.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestBody {
    data: Vec<u8>,
}

impl RequestBody {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// A reader over the content; `&[u8]` implements `tokio::io::AsyncRead`
    /// as well as `std::io::Read`.
    #[must_use]
    pub fn reader(&self) -> &[u8] {
        &self.data
    }

    pub fn text(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.data)
    }
}

#[derive(Debug)]
pub struct Request {
    pub method: Method,
    pub target: RequestTarget,
    pub version: HttpVersion,
    pub headers: HeaderMap,
    pub body: RequestBody,

    /// The values bound to the placeholders of the matched route, filled in
    /// before the handler is invoked.
    pub path_params: Vec<(String, String)>,
}

impl Request {
    pub fn new(method: Method, target: RequestTarget, version: HttpVersion, headers: HeaderMap) -> Self {
        Self {
            method,
            target,
            version,
            headers,
            body: RequestBody::default(),
            path_params: Vec::new(),
        }
    }

    /// The percent-decoded path, or `*` for the asterisk-form.
    #[must_use]
    pub fn path(&self) -> &str {
        match self.target.origin() {
            Some(origin) => &origin.path,
            None => "*",
        }
    }

    /// The path as it was received, still percent-encoded.
    #[must_use]
    pub fn raw_path(&self) -> &str {
        self.target.as_str()
    }

    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.target.origin().and_then(|origin| origin.query.as_deref())
    }

    /// Decodes the query as `application/x-www-form-urlencoded` pairs.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let Some(query) = self.query() else {
            return Vec::new();
        };

        query.split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
                (decode_form_component(name), decode_form_component(value))
            })
            .collect()
    }

    /// The cookies of every `Cookie` header. Values that aren't valid
    /// percent-encoding are passed as-is.
    #[must_use]
    pub fn cookies(&self) -> Vec<(String, String)> {
        self.headers.get_all(&HeaderName::Cookie)
            .filter_map(|value| value.as_str_no_convert())
            .flat_map(cookie::parse_cookie_header)
            .map(|(name, value)| {
                let value = cookie::decode_cookie_component(value)
                    .unwrap_or_else(|_| value.to_string());
                (name.to_string(), value)
            })
            .collect()
    }

    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.cookies()
            .into_iter()
            .find(|(cookie_name, _)| cookie_name == name)
            .map(|(_, value)| value)
    }

    #[must_use]
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.iter()
            .find(|(param, _)| param == name)
            .map(|(_, value)| value.as_str())
    }
}

fn decode_form_component(value: &str) -> String {
    let value: Cow<str> = if value.contains('+') {
        Cow::Owned(value.replace('+', " "))
    } else {
        Cow::Borrowed(value)
    };

    String::from_utf8_lossy(&urlencoding::decode_binary(value.as_bytes())).into_owned()
}
