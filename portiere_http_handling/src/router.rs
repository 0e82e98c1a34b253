// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! The routing table, mapping a method and path onto a [`Handler`].

use std::{
    borrow::Cow,
    fmt,
    sync::Arc,
};

use portiere_http::Method;

use crate::Handler;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),

    /// `{name}` or `:name`, binding exactly one non-empty segment.
    Placeholder(String),

    /// `*` or `{*name}`, binding the remainder of the path.
    Wildcard(Option<String>),
}

impl Segment {
    fn parse(segment: &str) -> Result<Self, &'static str> {
        if segment == "*" {
            return Ok(Segment::Wildcard(None));
        }

        if let Some(inner) = segment.strip_prefix('{') {
            let Some(inner) = inner.strip_suffix('}') else {
                return Err("unterminated placeholder");
            };

            let (name, wildcard) = match inner.strip_prefix('*') {
                Some(name) => (name, true),
                None => (inner, false),
            };

            validate_name(name)?;
            return Ok(if wildcard {
                Segment::Wildcard(Some(name.to_string()))
            } else {
                Segment::Placeholder(name.to_string())
            });
        }

        if let Some(name) = segment.strip_prefix(':') {
            validate_name(name)?;
            return Ok(Segment::Placeholder(name.to_string()));
        }

        if segment.contains(['{', '}']) {
            return Err("braces in a literal segment");
        }

        Ok(Segment::Literal(segment.to_string()))
    }

    /// Compares the shape of the segments, ignoring the names of
    /// placeholders.
    fn same_shape(&self, other: &Segment) -> bool {
        match (self, other) {
            (Segment::Literal(a), Segment::Literal(b)) => a == b,
            (Segment::Placeholder(..), Segment::Placeholder(..)) => true,
            (Segment::Wildcard(..), Segment::Wildcard(..)) => true,
            _ => false,
        }
    }

    /// Whether some path segment could match both segments. Wildcards are
    /// handled by the pattern.
    fn overlaps(&self, other: &Segment) -> bool {
        match (self, other) {
            (Segment::Literal(a), Segment::Literal(b)) => a == b,
            (Segment::Literal(literal), _) | (_, Segment::Literal(literal)) => !literal.is_empty(),
            _ => true,
        }
    }
}

fn validate_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("empty placeholder name");
    }

    if name.contains(['{', '}', '*', '/']) {
        return Err("invalid character in placeholder name");
    }

    Ok(())
}

/// A path pattern such as `/users/{id}/posts/*`.
#[derive(Clone, Debug)]
pub struct RoutePattern {
    source: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    pub fn parse(pattern: &str) -> Result<Self, RouteError> {
        let invalid = |reason| RouteError::InvalidPattern {
            pattern: pattern.to_string(),
            reason,
        };

        let Some(path) = pattern.strip_prefix('/') else {
            return Err(invalid("pattern doesn't start with a slash"));
        };

        let segments = path.split('/')
            .map(Segment::parse)
            .collect::<Result<Vec<_>, _>>()
            .map_err(invalid)?;

        let wildcard_position = segments.iter().position(|segment| matches!(segment, Segment::Wildcard(..)));
        if wildcard_position.is_some_and(|position| position != segments.len() - 1) {
            return Err(invalid("wildcard isn't the final segment"));
        }

        Ok(Self {
            source: pattern.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    fn dynamic_segment_count(&self) -> usize {
        self.segments.iter()
            .filter(|segment| !matches!(segment, Segment::Literal(..)))
            .count()
    }

    fn has_wildcard(&self) -> bool {
        matches!(self.segments.last(), Some(Segment::Wildcard(..)))
    }

    /// Lower is more specific.
    fn precedence(&self) -> (usize, bool) {
        (self.dynamic_segment_count(), self.has_wildcard())
    }

    fn same_shape(&self, other: &RoutePattern) -> bool {
        self.segments.len() == other.segments.len()
            && self.segments.iter().zip(&other.segments).all(|(a, b)| a.same_shape(b))
    }

    /// The segments before the wildcard, if any.
    fn fixed_segments(&self) -> &[Segment] {
        match self.segments.split_last() {
            Some((Segment::Wildcard(..), fixed)) => fixed,
            _ => &self.segments,
        }
    }

    /// Whether some path is matched by both patterns. A wildcard matches any
    /// remainder, so only the segments before it have to be compatible.
    fn overlaps(&self, other: &RoutePattern) -> bool {
        let (ours, theirs) = (self.fixed_segments(), other.fixed_segments());

        let lengths_compatible = match (self.has_wildcard(), other.has_wildcard()) {
            (false, false) => ours.len() == theirs.len(),
            (true, false) => ours.len() <= theirs.len(),
            (false, true) => theirs.len() <= ours.len(),
            (true, true) => true,
        };

        lengths_compatible && ours.iter().zip(theirs).all(|(a, b)| a.overlaps(b))
    }

    /// Matches the percent-decoded segments of a path, returning the bound
    /// parameters.
    fn matches(&self, path: &[Cow<'_, str>]) -> Option<Vec<(String, String)>> {
        let mut params = Vec::new();

        for (index, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Wildcard(name) => {
                    let remainder = path.get(index..).unwrap_or_default().join("/");
                    params.push((name.clone().unwrap_or_else(|| "*".to_string()), remainder));
                    return Some(params);
                }
                Segment::Literal(literal) => {
                    if path.get(index)?.as_ref() != literal {
                        return None;
                    }
                }
                Segment::Placeholder(name) => {
                    let value = path.get(index)?;
                    if value.is_empty() {
                        return None;
                    }
                    params.push((name.clone(), value.to_string()));
                }
            }
        }

        if path.len() != self.segments.len() {
            return None;
        }

        Some(params)
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// A route with the same method and an equivalent pattern already
    /// exists.
    Duplicate {
        method: Method,
        pattern: String,
    },

    InvalidPattern {
        pattern: String,
        reason: &'static str,
    },

    /// An existing route for the same method is equally specific and matches
    /// some of the same paths.
    Ambiguous {
        method: Method,
        pattern: String,
        existing: String,
    },
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::Duplicate { method, pattern } => write!(f, "duplicate route: {method} {pattern}"),
            RouteError::InvalidPattern { pattern, reason } => write!(f, "invalid route pattern \"{pattern}\": {reason}"),
            RouteError::Ambiguous { method, pattern, existing } => {
                write!(f, "ambiguous route: {method} {pattern} conflicts with {existing}")
            }
        }
    }
}

impl std::error::Error for RouteError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingFailure {
    NotFound,

    /// Routes exist for the path, but not for the method of the request.
    MethodNotAllowed {
        allowed: Vec<Method>,
    },
}

pub struct RouteMatch {
    pub handler: Arc<dyn Handler>,
    pub params: Vec<(String, String)>,

    /// The pattern of the matched route, as registered.
    pub pattern: String,
}

struct Route {
    method: Method,
    pattern: RoutePattern,
    handler: Arc<dyn Handler>,
}

/// The routing table. Routes are registered before the server starts, after
/// which the table is shared immutably between connections.
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, method: Method, pattern: &str, handler: Arc<dyn Handler>) -> Result<(), RouteError> {
        let pattern = RoutePattern::parse(pattern)?;

        if self.routes.iter().any(|route| route.method == method && route.pattern.same_shape(&pattern)) {
            return Err(RouteError::Duplicate {
                method,
                pattern: pattern.source,
            });
        }

        let conflicting = self.routes.iter().find(|route| {
            route.method == method
                && route.pattern.precedence() == pattern.precedence()
                && route.pattern.overlaps(&pattern)
        });
        if let Some(route) = conflicting {
            return Err(RouteError::Ambiguous {
                method,
                existing: route.pattern.source.clone(),
                pattern: pattern.source,
            });
        }

        self.routes.push(Route {
            method,
            pattern,
            handler,
        });
        Ok(())
    }

    pub fn get(&mut self, pattern: &str, handler: impl Handler + 'static) -> Result<(), RouteError> {
        self.register(Method::Get, pattern, Arc::new(handler))
    }

    pub fn post(&mut self, pattern: &str, handler: impl Handler + 'static) -> Result<(), RouteError> {
        self.register(Method::Post, pattern, Arc::new(handler))
    }

    pub fn put(&mut self, pattern: &str, handler: impl Handler + 'static) -> Result<(), RouteError> {
        self.register(Method::Put, pattern, Arc::new(handler))
    }

    pub fn delete(&mut self, pattern: &str, handler: impl Handler + 'static) -> Result<(), RouteError> {
        self.register(Method::Delete, pattern, Arc::new(handler))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Finds the most specific route for the method and the raw
    /// (percent-encoded) path. `HEAD` requests fall back to the `GET` route.
    pub fn resolve(&self, method: &Method, path: &str) -> Result<RouteMatch, RoutingFailure> {
        let segments: Vec<Cow<'_, str>> = path.strip_prefix('/')
            .unwrap_or(path)
            .split('/')
            .map(|segment| urlencoding::decode(segment).unwrap_or(Cow::Borrowed(segment)))
            .collect();

        let mut candidates: Vec<(&Route, Vec<(String, String)>)> = self.routes.iter()
            .filter_map(|route| route.pattern.matches(&segments).map(|params| (route, params)))
            .collect();

        if candidates.is_empty() {
            return Err(RoutingFailure::NotFound);
        }

        // Equally specific candidates differ in their method.
        candidates.sort_by_key(|(route, _)| route.pattern.precedence());

        let position = candidates.iter().position(|(route, _)| route.method == *method)
            .or_else(|| {
                if *method != Method::Head {
                    return None;
                }
                candidates.iter().position(|(route, _)| route.method == Method::Get)
            });

        let Some(position) = position else {
            return Err(RoutingFailure::MethodNotAllowed {
                allowed: allowed_methods(candidates.iter().map(|(route, _)| &route.method)),
            });
        };

        let (route, params) = candidates.swap_remove(position);
        Ok(RouteMatch {
            handler: Arc::clone(&route.handler),
            params,
            pattern: route.pattern.source.clone(),
        })
    }
}

/// Sorted and de-duplicated, with `HEAD` for `GET` routes and `OPTIONS`
/// which is always answered.
fn allowed_methods<'a>(methods: impl Iterator<Item = &'a Method>) -> Vec<Method> {
    let mut allowed: Vec<Method> = methods.cloned().collect();
    if allowed.contains(&Method::Get) {
        allowed.push(Method::Head);
    }
    allowed.push(Method::Options);

    allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    allowed.dedup();
    allowed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HandlerResult;
    use portiere_http::{
        Request,
        Response,
    };
    use rstest::rstest;

    fn ok(_: &Request) -> HandlerResult {
        Ok(Response::text("ok"))
    }

    fn router(routes: &[(Method, &str)]) -> Router {
        let mut router = Router::new();
        for (method, pattern) in routes {
            router.register(method.clone(), pattern, Arc::new(ok)).unwrap();
        }
        router
    }

    fn resolved_pattern(router: &Router, method: Method, path: &str) -> Option<String> {
        router.resolve(&method, path).ok().map(|route| route.pattern)
    }

    #[rstest]
    #[case("")]
    #[case("users")]
    #[case("/users/{}")]
    #[case("/users/:")]
    #[case("/users/{id")]
    #[case("/files/*/more")]
    #[case("/files/{*rest}/more")]
    #[case("/users/a{b}")]
    fn test_invalid_patterns(#[case] pattern: &str) {
        let mut router = Router::new();
        let result = router.get(pattern, ok);
        assert!(matches!(result, Err(RouteError::InvalidPattern { .. })), "{pattern}: {result:?}");
    }

    #[rstest]
    #[case("/a/{x}", "/a/{y}")]
    #[case("/a/{x}", "/a/:y")]
    #[case("/files/*", "/files/{*rest}")]
    #[case("/", "/")]
    fn test_duplicate_routes(#[case] first: &str, #[case] second: &str) {
        let mut router = Router::new();
        router.get(first, ok).unwrap();
        assert_eq!(router.get(second, ok), Err(RouteError::Duplicate {
            method: Method::Get,
            pattern: second.to_string(),
        }));

        router.post(second, ok).unwrap();
        assert_eq!(router.len(), 2);
    }

    #[test]
    fn test_resolve_literal_and_placeholder() {
        let router = router(&[
            (Method::Get, "/"),
            (Method::Get, "/users/{id}"),
            (Method::Get, "/users/me"),
            (Method::Get, "/users/:id/posts/{post}"),
        ]);

        assert_eq!(resolved_pattern(&router, Method::Get, "/"), Some("/".into()));
        assert_eq!(resolved_pattern(&router, Method::Get, "/users/me"), Some("/users/me".into()));
        assert_eq!(resolved_pattern(&router, Method::Get, "/users/42"), Some("/users/{id}".into()));
        assert_eq!(resolved_pattern(&router, Method::Get, "/users/42/posts/7"), Some("/users/:id/posts/{post}".into()));
        assert_eq!(resolved_pattern(&router, Method::Get, "/users/"), None);
        assert_eq!(resolved_pattern(&router, Method::Get, "/users"), None);
        assert_eq!(resolved_pattern(&router, Method::Get, "/users/42/posts"), None);

        let route = router.resolve(&Method::Get, "/users/42/posts/7").unwrap();
        assert_eq!(route.params, vec![
            ("id".to_string(), "42".to_string()),
            ("post".to_string(), "7".to_string()),
        ]);
    }

    #[test]
    fn test_resolve_decodes_params() {
        let router = router(&[(Method::Get, "/page/{name}")]);
        let route = router.resolve(&Method::Get, "/page/hello%20world").unwrap();
        assert_eq!(route.params, vec![("name".to_string(), "hello world".to_string())]);

        // An encoded slash stays within its segment.
        let route = router.resolve(&Method::Get, "/page/a%2Fb").unwrap();
        assert_eq!(route.params, vec![("name".to_string(), "a/b".to_string())]);
    }

    #[test]
    fn test_resolve_wildcard() {
        let router = router(&[
            (Method::Get, "/files/{*path}"),
            (Method::Get, "/files/readme"),
            (Method::Get, "/files/{name}"),
        ]);

        assert_eq!(resolved_pattern(&router, Method::Get, "/files/readme"), Some("/files/readme".into()));
        assert_eq!(resolved_pattern(&router, Method::Get, "/files/other"), Some("/files/{name}".into()));

        let route = router.resolve(&Method::Get, "/files/css/site.css").unwrap();
        assert_eq!(route.pattern, "/files/{*path}");
        assert_eq!(route.params, vec![("path".to_string(), "css/site.css".to_string())]);

        let route = router.resolve(&Method::Get, "/files").unwrap();
        assert_eq!(route.params, vec![("path".to_string(), String::new())]);
    }

    #[rstest]
    #[case("/{a}/static", "/static/{b}")]
    #[case("/{a}/b/{c}", "/{x}/{y}/c")]
    #[case("/files/*", "/*")]
    #[case("/a/{x}/*", "/{y}/b/{*rest}")]
    fn test_ambiguous_routes(#[case] first: &str, #[case] second: &str) {
        let mut router = Router::new();
        router.get(first, ok).unwrap();
        assert_eq!(router.get(second, ok), Err(RouteError::Ambiguous {
            method: Method::Get,
            pattern: second.to_string(),
            existing: first.to_string(),
        }));

        router.post(second, ok).unwrap();
        assert_eq!(router.len(), 2);
    }

    #[rstest]
    #[case("/{a}/static", "/{b}/dynamic")]
    #[case("/{a}/static", "/static/{b}/more")]
    #[case("/users/{id}", "/users/me")]
    #[case("/files/{name}", "/files/*")]
    #[case("/a/{x}", "/b/*")]
    #[case("/a/", "/{x}/{y}")]
    fn test_unambiguous_routes(#[case] first: &str, #[case] second: &str) {
        let mut router = Router::new();
        router.get(first, ok).unwrap();
        router.get(second, ok).unwrap();
        assert_eq!(router.len(), 2);
    }

    #[test]
    fn test_resolve_equally_specific_routes_of_other_methods() {
        let router = router(&[
            (Method::Get, "/{a}/static"),
            (Method::Post, "/static/{b}"),
        ]);
        assert_eq!(resolved_pattern(&router, Method::Get, "/static/static"), Some("/{a}/static".into()));
        assert_eq!(resolved_pattern(&router, Method::Post, "/static/static"), Some("/static/{b}".into()));
    }

    #[test]
    fn test_resolve_not_found() {
        let router = router(&[(Method::Get, "/a")]);
        assert_eq!(router.resolve(&Method::Get, "/b").err(), Some(RoutingFailure::NotFound));
        assert_eq!(Router::new().resolve(&Method::Get, "/").err(), Some(RoutingFailure::NotFound));
    }

    #[test]
    fn test_resolve_method_not_allowed() {
        let router = router(&[
            (Method::Post, "/items/{id}"),
            (Method::Get, "/items/{id}"),
            (Method::Delete, "/items/{id}"),
            (Method::Put, "/items/special"),
        ]);

        assert_eq!(router.resolve(&Method::Patch, "/items/1").err(), Some(RoutingFailure::MethodNotAllowed {
            allowed: vec![Method::Delete, Method::Get, Method::Head, Method::Options, Method::Post],
        }));

        assert_eq!(router.resolve(&Method::Patch, "/items/special").err(), Some(RoutingFailure::MethodNotAllowed {
            allowed: vec![Method::Delete, Method::Get, Method::Head, Method::Options, Method::Post, Method::Put],
        }));
    }

    #[test]
    fn test_resolve_head_falls_back_to_get() {
        let mut router = router(&[(Method::Get, "/page")]);
        assert_eq!(resolved_pattern(&router, Method::Head, "/page"), Some("/page".into()));

        router.register(Method::Post, "/form", Arc::new(ok)).unwrap();
        assert_eq!(router.resolve(&Method::Head, "/form").err(), Some(RoutingFailure::MethodNotAllowed {
            allowed: vec![Method::Options, Method::Post],
        }));
    }
}
