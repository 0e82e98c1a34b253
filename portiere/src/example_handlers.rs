// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::{
    io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;

use portiere_http::{
    Request,
    Response,
    SetCookie,
};
use portiere_http_handling::{
    Handler,
    HandlerResult,
    RouteError,
    Router,
};

pub fn register(router: &mut Router, wwwroot: &Path) -> Result<(), RouteError> {
    router.get("/", index)?;
    router.get("/page/{name}", page)?;
    router.get("/old/{name}", old_page)?;
    router.get("/files/{*path}", StaticFiles::new(wwwroot))?;
    Ok(())
}

fn index(_: &Request) -> HandlerResult {
    Ok(Response::text("Welcome to portiere!"))
}

/// Greets the visitor, counting the visits with a cookie.
fn page(request: &Request) -> HandlerResult {
    let name = request.path_param("name").unwrap_or_default();
    let visits = request.cookie("visits")
        .and_then(|visits| visits.parse::<u32>().ok())
        .unwrap_or(0)
        .saturating_add(1);

    let mut response = Response::text(format!("This is page {name}, visit {visits}."));
    response.set_cookie(&SetCookie::new("visits", visits.to_string()).path("/page").http_only());
    Ok(response)
}

fn old_page(request: &Request) -> HandlerResult {
    let name = request.path_param("name").unwrap_or_default();
    Ok(Response::redirect(format!("/page/{}", urlencoding::encode(name))))
}

/// Serves the files of a directory, with support for range requests.
pub struct StaticFiles {
    root: PathBuf,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }
}

#[async_trait]
impl Handler for StaticFiles {
    async fn handle(&self, request: &Request) -> HandlerResult {
        let relative = request.path_param("path").unwrap_or_default();
        let Some(path) = resolve_path(&self.root, relative) else {
            return Ok(Response::forbidden("Forbidden"));
        };

        match Response::file(&path).await {
            Ok(response) => Ok(response),
            Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::InvalidInput) => {
                Ok(Response::not_found("Not Found"))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Joins the decoded path onto the root, refusing anything that could
/// escape it.
fn resolve_path(root: &Path, relative: &str) -> Option<PathBuf> {
    let mut path = root.to_path_buf();

    for component in relative.split('/') {
        match component {
            "" | "." => continue,
            ".." => return None,
            component if component.contains(['\\', '\0', ':']) => return None,
            component => path.push(component),
        }
    }

    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use portiere_http::{
        BodyKind,
        HeaderMap,
        HeaderName,
        HeaderValue,
        HttpVersion,
        Method,
        RequestTarget,
        StatusCode,
    };
    use rstest::rstest;

    fn request(target: &str, params: &[(&str, &str)]) -> Request {
        let mut request = Request::new(Method::Get, RequestTarget::parse(target).unwrap(), HttpVersion::Http11, HeaderMap::new());
        request.path_params = params.iter().map(|(name, value)| (name.to_string(), value.to_string())).collect();
        request
    }

    #[rstest]
    #[case("index.html", Some("index.html"))]
    #[case("css/./site.css", Some("css/site.css"))]
    #[case("a//b", Some("a/b"))]
    #[case("", Some(""))]
    #[case("../etc/passwd", None)]
    #[case("css/../../secret", None)]
    #[case("c:\\windows", None)]
    fn test_resolve_path(#[case] relative: &str, #[case] expected: Option<&str>) {
        let root = Path::new("/srv/www");
        assert_eq!(resolve_path(root, relative), expected.map(|expected| root.join(expected)));
    }

    #[test]
    fn test_page_counts_visits() {
        let mut request = request("/page/home", &[("name", "home")]);
        request.headers.append_possible_duplicate(HeaderName::Cookie, HeaderValue::from("visits=41; theme=dark"));

        let response = page(&request).unwrap();
        assert!(matches!(&response.body, Some(BodyKind::String(body)) if body == "This is page home, visit 42."));
        assert_eq!(response.headers.get(&HeaderName::SetCookie),
            Some(&HeaderValue::String("visits=42; Path=/page; HttpOnly".to_string())));
    }

    #[test]
    fn test_old_page_redirects() {
        let mut response = old_page(&request("/old/about%20us", &[("name", "about us")])).unwrap();
        response.prepare(&request("/old/about%20us", &[]));
        assert_eq!(response.status, StatusCode::Found);
        assert_eq!(response.headers.get(&HeaderName::Location), Some(&HeaderValue::String("/page/about%20us".to_string())));
    }

    #[tokio::test]
    async fn test_static_files() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("hello.txt"), "hello").unwrap();
        std::fs::create_dir(root.path().join("sub")).unwrap();

        let handler = StaticFiles::new(root.path());

        let response = handler.handle(&request("/files/hello.txt", &[("path", "hello.txt")])).await.unwrap();
        assert_eq!(response.status, StatusCode::Ok);
        assert!(matches!(response.body, Some(BodyKind::Stream { length: 5, .. })));

        let response = handler.handle(&request("/files/missing", &[("path", "missing")])).await.unwrap();
        assert_eq!(response.status, StatusCode::NotFound);

        let response = handler.handle(&request("/files/sub", &[("path", "sub")])).await.unwrap();
        assert_eq!(response.status, StatusCode::NotFound);

        let response = handler.handle(&request("/files/../x", &[("path", "../x")])).await.unwrap();
        assert_eq!(response.status, StatusCode::Forbidden);
    }
}
