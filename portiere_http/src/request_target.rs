// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use crate::{
    syntax,
    HttpParseError,
};

/// The path and query of a request target.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct OriginForm {
    /// The path exactly as received, still percent-encoded.
    pub raw_path: String,

    /// The percent-decoded path.
    pub path: String,

    /// The query without the leading `?`, still percent-encoded.
    pub query: Option<String>,
}

impl OriginForm {
    fn parse(input: &str) -> Result<Self, HttpParseError> {
        let (raw_path, query) = match input.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (input, None),
        };

        let raw_path = if raw_path.is_empty() { "/" } else { raw_path };
        let path = urlencoding::decode(raw_path)
            .map_err(|_| HttpParseError::InvalidRequestTarget)?
            .into_owned();

        Ok(Self {
            raw_path: raw_path.to_string(),
            path,
            query,
        })
    }
}

/// ```text
/// request-target = origin-form
///                / absolute-form
///                / authority-form
///                / asterisk-form
/// ```
///
/// The authority-form is only used by `CONNECT`, which isn't supported.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum RequestTarget {
    Origin(OriginForm),
    Absolute {
        authority: String,
        origin: OriginForm,
    },
    Asterisk,
}

impl RequestTarget {
    pub fn parse(input: &str) -> Result<Self, HttpParseError> {
        if !input.bytes().all(syntax::is_request_target_character) {
            return Err(HttpParseError::InvalidOctetInRequestTarget);
        }

        if input == "*" {
            return Ok(Self::Asterisk);
        }

        if input.starts_with('/') {
            return Ok(Self::Origin(OriginForm::parse(input)?));
        }

        let Some((scheme, rest)) = input.split_once("://") else {
            return Err(HttpParseError::InvalidRequestTarget);
        };

        if !scheme.eq_ignore_ascii_case("http") && !scheme.eq_ignore_ascii_case("https") {
            return Err(HttpParseError::InvalidRequestTarget);
        }

        let authority_end = rest.find(['/', '?']).unwrap_or(rest.len());
        let (authority, origin) = rest.split_at(authority_end);
        if authority.is_empty() {
            return Err(HttpParseError::InvalidRequestTarget);
        }

        Ok(Self::Absolute {
            authority: authority.to_string(),
            origin: OriginForm::parse(origin)?,
        })
    }

    /// The origin-form part of the target, if there is one.
    #[must_use]
    pub fn origin(&self) -> Option<&OriginForm> {
        match self {
            RequestTarget::Origin(origin) => Some(origin),
            RequestTarget::Absolute { origin, .. } => Some(origin),
            RequestTarget::Asterisk => None,
        }
    }

    /// Returns the request target as a string, for logging.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            RequestTarget::Origin(origin) => &origin.raw_path,
            RequestTarget::Absolute { origin, .. } => &origin.raw_path,
            RequestTarget::Asterisk => "*",
        }
    }
}
