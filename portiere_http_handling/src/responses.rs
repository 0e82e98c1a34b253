// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! This module creates complete responses for handling common cases.

use itertools::Itertools;

use portiere_http::{
    HeaderName,
    HeaderValue,
    Method,
    Response,
    StatusCode,
};

/// Create a response for when the request times out.
pub fn create_request_timeout() -> Response {
    let mut response = Response::with_status_and_string_body(StatusCode::RequestTimeout, "Request Timed Out");
    super::finish_response_error(&mut response);
    response
}

/// The cause of the error is never exposed to the client.
pub fn create_internal_server_error() -> Response {
    Response::with_status_and_string_body(StatusCode::InternalServerError, "Internal Server Error")
}

pub fn create_not_found() -> Response {
    Response::not_found("Not Found")
}

/// A `405 Method Not Allowed`, or for `OPTIONS` requests a `204 No Content`
/// advertising the same methods.
///
/// # References
/// * [RFC 9110 Section 9.3.7](https://www.rfc-editor.org/rfc/rfc9110.html#name-options)
/// * [RFC 9110 Section 15.5.6](https://www.rfc-editor.org/rfc/rfc9110.html#name-405-method-not-allowed)
pub fn create_method_not_allowed(method: &Method, allowed: &[Method]) -> Response {
    let mut response = if *method == Method::Options {
        Response::with_status(StatusCode::NoContent)
    } else {
        Response::with_status_and_string_body(StatusCode::MethodNotAllowed, "Method Not Allowed")
    };

    let allowed = allowed.iter().map(Method::as_str).join(", ");
    response.headers.set(HeaderName::Allow, HeaderValue::String(allowed));
    response
}

/// Handle an `OPTIONS` request for the '*' resource, meaning the global
/// capabilities of the server.
pub fn create_options_asterisk() -> Response {
    let mut response = Response::with_status(StatusCode::NoContent);
    response.headers.set(HeaderName::Allow, HeaderValue::from("DELETE, GET, HEAD, OPTIONS, POST, PUT"));
    response
}
