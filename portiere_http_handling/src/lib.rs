// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! Request handling that is independent of the wire protocol: routing,
//! invoking handlers, rendering templates, and the finishing touches every
//! response gets.

pub mod config;
pub mod handler;
pub mod responses;
pub mod router;
pub mod template;
pub mod tls;

pub use config::*;
pub use handler::*;
pub use router::*;
pub use template::*;
pub use tls::*;

use std::{
    panic::AssertUnwindSafe,
    time::SystemTime,
};

use futures::FutureExt;
use tracing::{debug, error};

use portiere_http::{
    HeaderName,
    HeaderValue,
    HttpParseError,
    Method,
    Request,
    RequestTarget,
    Response,
    ResponseKind,
    StatusCode,
};

/// Finishes a response that ends the connection.
pub fn finish_response_error(response: &mut Response) {
    response.headers.set(HeaderName::Connection, HeaderValue::from("close"));
    finish_response_general(response)
}

/// Finishes a response for both normal and error response.
fn finish_response_general(response: &mut Response) {
    response.headers.set(HeaderName::Server, HeaderValue::from("portiere"));
    response.headers.set(HeaderName::XContentTypeOptions, HeaderValue::from("nosniff"));

    if !response.headers.contains(&HeaderName::Date) {
        response.headers.set_date(SystemTime::now());
    }
}

/// Finishes a response for a normal (OK) response.
pub fn finish_response_normal(response: &mut Response) {
    finish_response_general(response)
}

/// Handles a `HttpParseError`.
///
/// The body only contains the reason phrase, since explaining the error in
/// detail might expose internals to the client.
pub fn handle_parse_error(error: HttpParseError) -> Response {
    let status = status_for_parse_error(error);
    debug!(error = error.as_ref(), status = status.code(), "rejecting malformed request");
    Response::with_status_and_string_body(status, status.reason_phrase())
}

fn status_for_parse_error(error: HttpParseError) -> StatusCode {
    match error {
        HttpParseError::BodyTooLarge => StatusCode::ContentTooLarge,
        HttpParseError::RequestTargetTooLarge => StatusCode::URITooLong,
        HttpParseError::TooManyHeaders => StatusCode::RequestHeaderFieldsTooLarge,
        HttpParseError::UnsupportedTransferCoding => StatusCode::NotImplemented,
        HttpParseError::UnsupportedHttpVersion => StatusCode::HTTPVersionNotSupported,
        _ => StatusCode::BadRequest,
    }
}

/// Handles a request: routes it, invokes the handler and renders the
/// template if the handler asked for one.
///
/// The path parameters of the matched route are stored in the request before
/// the handler is invoked.
pub async fn handle_request(request: &mut Request, settings: &crate::PortiereSettings) -> Response {
    if request.target == RequestTarget::Asterisk {
        if request.method == Method::Options {
            return responses::create_options_asterisk();
        }

        // Method is not OPTIONS, so a request-target of "*" is not allowed.
        return Response::bad_request("Invalid Target");
    }

    let route = match settings.router.resolve(&request.method, request.raw_path()) {
        Ok(route) => route,
        Err(RoutingFailure::NotFound) => return responses::create_not_found(),
        Err(RoutingFailure::MethodNotAllowed { allowed }) => {
            return responses::create_method_not_allowed(&request.method, &allowed);
        }
    };

    request.path_params = route.params;

    let response = match AssertUnwindSafe(route.handler.handle(request)).catch_unwind().await {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            error!(pattern = %route.pattern, error = %e, "handler failed");
            return responses::create_internal_server_error();
        }
        Err(..) => {
            error!(pattern = %route.pattern, "handler panicked");
            return responses::create_internal_server_error();
        }
    };

    render_template(response, settings)
}

/// Replaces a `Response::template` with the rendered response, keeping the
/// status and headers the handler gave it.
fn render_template(response: Response, settings: &crate::PortiereSettings) -> Response {
    let ResponseKind::Template { name, values } = &response.kind else {
        return response;
    };

    let Some(renderer) = &settings.template_renderer else {
        error!(template = %name, "no template renderer is configured");
        return responses::create_internal_server_error();
    };

    match renderer.render(name, values) {
        Ok(mut rendered) => {
            rendered.status = response.status;
            for (header_name, value) in response.headers.iter() {
                rendered.headers.append_possible_duplicate(header_name.clone(), value.clone());
            }
            rendered
        }
        Err(e) => {
            error!(template = %name, error = %e, "failed to render template");
            responses::create_internal_server_error()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use portiere_http::{
        BodyKind,
        HeaderMap,
        HttpVersion,
        TemplateValues,
    };
    use rstest::rstest;

    struct EchoRenderer;

    impl TemplateRenderer for EchoRenderer {
        fn render(&self, name: &str, values: &TemplateValues) -> Result<Response, anyhow::Error> {
            if name == "broken" {
                anyhow::bail!("template {name} doesn't exist");
            }

            let values = values.iter().map(|(key, value)| format!("{key}={value}")).collect::<Vec<_>>().join(",");
            Ok(Response::text(format!("{name}:{values}")))
        }
    }

    fn settings() -> PortiereSettings {
        let mut router = Router::new();
        router.get("/hello/{name}", |request: &Request| -> HandlerResult {
            Ok(Response::text(format!("Hello, {}", request.path_param("name").unwrap_or_default())))
        }).unwrap();
        router.get("/fail", |_: &Request| -> HandlerResult {
            Err(anyhow::anyhow!("secret database password"))
        }).unwrap();
        router.get("/panic", |_: &Request| -> HandlerResult {
            panic!("handler bug")
        }).unwrap();
        router.get("/template/{name}", |request: &Request| -> HandlerResult {
            let mut values = TemplateValues::new();
            values.insert("user".into(), "ann".into());
            let name = request.path_param("name").unwrap_or_default().to_string();
            Ok(Response::template(name, values)
                .with_header(HeaderName::SetCookie, "seen=1"))
        }).unwrap();
        router.post("/form", |_: &Request| -> HandlerResult { Ok(Response::with_status(StatusCode::Created)) }).unwrap();

        let mut settings = PortiereSettings::with_router(router);
        settings.template_renderer = Some(Arc::new(EchoRenderer));
        settings
    }

    fn request(method: Method, target: &str) -> Request {
        Request::new(method, RequestTarget::parse(target).unwrap(), HttpVersion::Http11, HeaderMap::new())
    }

    fn body_text(response: &Response) -> &str {
        match &response.body {
            Some(BodyKind::String(body)) => body.as_str(),
            Some(BodyKind::StaticString(body)) => *body,
            _ => "",
        }
    }

    #[rstest]
    #[case(HttpParseError::InvalidCRLF, StatusCode::BadRequest)]
    #[case(HttpParseError::ConflictingFraming, StatusCode::BadRequest)]
    #[case(HttpParseError::InvalidContentLength, StatusCode::BadRequest)]
    #[case(HttpParseError::ObsoleteLineFolding, StatusCode::BadRequest)]
    #[case(HttpParseError::RequestTargetTooLarge, StatusCode::URITooLong)]
    #[case(HttpParseError::LineTooLong, StatusCode::BadRequest)]
    #[case(HttpParseError::TooManyHeaders, StatusCode::RequestHeaderFieldsTooLarge)]
    #[case(HttpParseError::UnsupportedTransferCoding, StatusCode::NotImplemented)]
    #[case(HttpParseError::UnsupportedHttpVersion, StatusCode::HTTPVersionNotSupported)]
    #[case(HttpParseError::BodyTooLarge, StatusCode::ContentTooLarge)]
    fn test_handle_parse_error(#[case] error: HttpParseError, #[case] expected: StatusCode) {
        let response = handle_parse_error(error);
        assert_eq!(response.status, expected);
        assert_eq!(body_text(&response), expected.reason_phrase());
    }

    #[test]
    fn test_finish_response() {
        let mut response = Response::text("ok");
        finish_response_normal(&mut response);
        assert_eq!(response.headers.get(&HeaderName::Server), Some(&HeaderValue::from("portiere")));
        assert!(response.headers.contains(&HeaderName::Date));
        assert!(!response.headers.has_connection_option("close"));

        finish_response_error(&mut response);
        assert!(response.headers.has_connection_option("close"));
    }

    #[tokio::test]
    async fn test_handle_request_binds_params() {
        let mut request = request(Method::Get, "/hello/w%C3%B6rld");
        let response = handle_request(&mut request, &settings()).await;
        assert_eq!(response.status, StatusCode::Ok);
        assert_eq!(body_text(&response), "Hello, w\u{f6}rld");
        assert_eq!(request.path_param("name"), Some("w\u{f6}rld"));
    }

    #[rstest]
    #[case("/fail")]
    #[case("/panic")]
    #[tokio::test]
    async fn test_handle_request_handler_failure(#[case] target: &str) {
        let response = handle_request(&mut request(Method::Get, target), &settings()).await;
        assert_eq!(response.status, StatusCode::InternalServerError);
        assert!(!body_text(&response).contains("secret"));
    }

    #[tokio::test]
    async fn test_handle_request_routing_failures() {
        let settings = settings();

        let response = handle_request(&mut request(Method::Get, "/missing"), &settings).await;
        assert_eq!(response.status, StatusCode::NotFound);

        let response = handle_request(&mut request(Method::Get, "/form"), &settings).await;
        assert_eq!(response.status, StatusCode::MethodNotAllowed);
        assert_eq!(response.headers.get(&HeaderName::Allow), Some(&HeaderValue::from("OPTIONS, POST".to_string())));

        let response = handle_request(&mut request(Method::Options, "/form"), &settings).await;
        assert_eq!(response.status, StatusCode::NoContent);
        assert!(response.headers.contains(&HeaderName::Allow));
    }

    #[tokio::test]
    async fn test_handle_request_asterisk() {
        let settings = settings();

        let response = handle_request(&mut request(Method::Options, "*"), &settings).await;
        assert_eq!(response.status, StatusCode::NoContent);

        let response = handle_request(&mut request(Method::Get, "*"), &settings).await;
        assert_eq!(response.status, StatusCode::BadRequest);
    }

    #[tokio::test]
    async fn test_handle_request_template() {
        let settings = settings();

        let response = handle_request(&mut request(Method::Get, "/template/profile"), &settings).await;
        assert_eq!(response.status, StatusCode::Ok);
        assert_eq!(response.kind, ResponseKind::Text);
        assert_eq!(body_text(&response), "profile:user=ann");
        assert!(response.headers.contains(&HeaderName::SetCookie));

        let response = handle_request(&mut request(Method::Get, "/template/broken"), &settings).await;
        assert_eq!(response.status, StatusCode::InternalServerError);

        let mut without_renderer = settings.clone();
        without_renderer.template_renderer = None;
        let response = handle_request(&mut request(Method::Get, "/template/profile"), &without_renderer).await;
        assert_eq!(response.status, StatusCode::InternalServerError);
    }
}
