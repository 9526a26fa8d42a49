//! Request routing: maps URL patterns and HTTP methods to middleware chains.
//!
//! | Pattern       | Matches                    | Captured params                    |
//! |---------------|----------------------------|------------------------------------|
//! | `/users`      | `/users`, `/users/`        | *(none)*                           |
//! | `/users/:id`  | `/users/42`                | `id → "42"`                        |
//! | `/files/*`    | `/files/docs/readme.txt`   | `wildcard → "/docs/readme.txt"`    |
//!
//! Routes are kept ordered by specificity, compared segment by segment: a literal
//! segment beats a `:param`, which beats `*`. Among equally specific routes the one
//! registered first wins. So `/users/posts` is tried before `/users/:id` no matter
//! which controller registered it. A path that matches only under other methods
//! answers `405 Method Not Allowed` with an `Allow` header.

use std::fmt;
use std::sync::Arc;

use crate::context::{Context, PathParams};
use crate::middleware::{MiddlewareHandler, Next};
use crate::{Method, Request, Response, StatusCode};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    Rest,
}

impl Segment {
    fn rank(&self) -> u8 {
        match self {
            Segment::Literal(_) => 0,
            Segment::Param(_) => 1,
            Segment::Rest => 2,
        }
    }
}

// A compiled route pattern. Empty and repeated slashes are ignored; `*` ends it.
#[derive(Debug, Clone)]
struct Pattern {
    segments: Vec<Segment>,
}

impl Pattern {
    fn parse(pattern: &str) -> Self {
        let mut segments = Vec::new();
        for part in pattern.split('/').filter(|s| !s.is_empty()) {
            if part == "*" {
                segments.push(Segment::Rest);
                break;
            }
            segments.push(match part.strip_prefix(':') {
                Some(name) => Segment::Param(name.to_owned()),
                None => Segment::Literal(part.to_owned()),
            });
        }
        Self { segments }
    }

    fn matches(&self, path: &str) -> Option<PathParams> {
        let mut parts = path.split('/').filter(|s| !s.is_empty());
        let mut params = PathParams::new();

        for segment in &self.segments {
            match segment {
                Segment::Literal(literal) => {
                    if parts.next()? != literal.as_str() {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    params.insert(name.clone(), parts.next()?.to_owned());
                }
                Segment::Rest => {
                    let rest: String = parts.map(|p| format!("/{p}")).collect();
                    params.insert("wildcard".to_owned(), rest);
                    return Some(params);
                }
            }
        }

        parts.next().is_none().then_some(params)
    }

    fn rank(&self) -> Vec<u8> {
        self.segments.iter().map(Segment::rank).collect()
    }

    // Two patterns with the same shape match exactly the same paths.
    fn same_shape(&self, other: &Pattern) -> bool {
        self.segments.len() == other.segments.len()
            && self.segments.iter().zip(&other.segments).all(|(a, b)| match (a, b) {
                (Segment::Literal(x), Segment::Literal(y)) => x == y,
                _ => a.rank() == b.rank(),
            })
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => write!(f, "/{s}")?,
                Segment::Param(name) => write!(f, "/:{name}")?,
                Segment::Rest => f.write_str("/*")?,
            }
        }
        Ok(())
    }
}

struct Route {
    method: Method,
    pattern: Pattern,
    rank: Vec<u8>,
    chain: Arc<[MiddlewareHandler]>,
    info: RouteInfo,
}

/// Introspection record for one registered route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    pub method: Method,
    /// Normalized pattern, e.g. `/users/:id`.
    pub pattern: String,
    /// `Controller::action` for convention routes.
    pub name: Option<String>,
    /// Middleware names in execution order.
    pub middleware: Vec<String>,
}

impl fmt::Display for RouteInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<7} {}", self.method.as_str(), self.pattern)?;
        if let Some(name) = &self.name {
            write!(f, " -> {name}")?;
        }
        if !self.middleware.is_empty() {
            write!(f, " [{}]", self.middleware.join(", "))?;
        }
        Ok(())
    }
}

/// Dispatches requests to the middleware chain of the most specific matching route.
///
/// ```rust,no_run
/// use conroute::{Method, Response, Router, StatusCode};
/// use conroute::middleware::from_fn;
///
/// let mut router = Router::new();
/// let ping = from_fn(|_ctx, _next| async { Response::new(StatusCode::Ok).body("pong") });
/// router.route_with(Method::Get, "/ping", vec![ping], None, Vec::new());
/// ```
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a middleware chain for `method` + `path`.
    ///
    /// The last entry of `chain` must produce the response; if every entry calls
    /// `next`, the request ends with the pipeline's `500` fallback.
    pub fn route_with(
        &mut self,
        method: Method,
        path: &str,
        chain: Vec<MiddlewareHandler>,
        name: Option<String>,
        middleware: Vec<String>,
    ) {
        let pattern = Pattern::parse(path);
        let rank = pattern.rank();
        let info = RouteInfo {
            method: method.clone(),
            pattern: pattern.to_string(),
            name,
            middleware,
        };
        let at = self
            .routes
            .iter()
            .position(|r| r.rank > rank)
            .unwrap_or(self.routes.len());
        self.routes.insert(
            at,
            Route {
                method,
                pattern,
                rank,
                chain: chain.into(),
                info,
            },
        );
    }

    /// `true` when a route for `method` with exactly this pattern is registered.
    pub fn contains(&self, method: &Method, path: &str) -> bool {
        let pattern = Pattern::parse(path).to_string();
        self.routes
            .iter()
            .any(|r| &r.method == method && r.info.pattern == pattern)
    }

    /// The registered route that would shadow `path` under `method`: same method and
    /// the same pattern up to parameter names (`/users/:id` vs `/users/:slug`).
    pub fn conflicting(&self, method: &Method, path: &str) -> Option<&RouteInfo> {
        let pattern = Pattern::parse(path);
        self.routes
            .iter()
            .find(|r| &r.method == method && r.pattern.same_shape(&pattern))
            .map(|r| &r.info)
    }

    /// The route table in matching order.
    pub fn routes(&self) -> impl Iterator<Item = &RouteInfo> {
        self.routes.iter().map(|r| &r.info)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Runs the chain of the first matching route.
    ///
    /// Unknown paths answer `404 Not Found`; paths registered only under other methods
    /// answer `405 Method Not Allowed` listing the allowed methods.
    pub async fn route(&self, request: Request) -> Response {
        let found = self.routes.iter().find_map(|route| {
            if &route.method == request.method() {
                route.pattern.matches(request.path()).map(|params| (route, params))
            } else {
                None
            }
        });
        if let Some((route, params)) = found {
            let ctx = Context::with_params(request, params);
            return Next::new(Arc::clone(&route.chain)).run(ctx).await;
        }

        let mut allowed: Vec<&str> = Vec::new();
        for route in &self.routes {
            let method = route.method.as_str();
            if !allowed.contains(&method) && route.pattern.matches(request.path()).is_some() {
                allowed.push(method);
            }
        }

        if allowed.is_empty() {
            Response::new(StatusCode::NotFound)
        } else {
            Response::new(StatusCode::MethodNotAllowed).header("Allow", allowed.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::from_fn;

    fn make_request(method: &str, path: &str) -> Request {
        let raw = format!("{method} {path} HTTP/1.1\r\nHost: localhost\r\n\r\n");
        let (req, _) = Request::parse(raw.as_bytes()).unwrap();
        req
    }

    // Endpoint answering with `label` as its body.
    fn tagged(label: &'static str) -> Vec<MiddlewareHandler> {
        vec![from_fn(move |ctx: Context, _next| async move {
            let id = ctx.params().get("id").unwrap_or("-").to_owned();
            Response::new(StatusCode::Ok).body(format!("{label}:{id}"))
        })]
    }

    async fn body_of(router: &Router, method: &str, path: &str) -> String {
        let res = router.route(make_request(method, path)).await;
        String::from_utf8(res.body_ref().to_vec()).unwrap()
    }

    fn add(router: &mut Router, method: Method, path: &str, label: &'static str) {
        router.route_with(method, path, tagged(label), None, Vec::new());
    }

    // ── Pattern ───────────────────────────────────────────────────────────────

    #[test]
    fn pattern_normalizes_slashes() {
        assert_eq!(Pattern::parse("/").to_string(), "/");
        assert_eq!(Pattern::parse("").to_string(), "/");
        assert_eq!(Pattern::parse("/users/").to_string(), "/users");
        assert_eq!(Pattern::parse("//users//:id").to_string(), "/users/:id");
        assert_eq!(Pattern::parse("/files/*/ignored").to_string(), "/files/*");
    }

    #[test]
    fn pattern_literals_and_params() {
        let pat = Pattern::parse("/users/:id/posts/:post_id");
        let params = pat.matches("/users/7/posts/99/").unwrap();
        assert_eq!(params.get("id"), Some("7"));
        assert_eq!(params.get("post_id"), Some("99"));
        assert!(pat.matches("/users/7/posts").is_none());
        assert!(pat.matches("/users/7/posts/99/extra").is_none());
        assert!(pat.matches("/people/7/posts/99").is_none());
    }

    #[test]
    fn pattern_root_matches_only_root() {
        let pat = Pattern::parse("/");
        assert!(pat.matches("/").is_some());
        assert!(pat.matches("/other").is_none());
    }

    #[test]
    fn pattern_wildcard_captures_tail() {
        let pat = Pattern::parse("/files/*");
        let params = pat.matches("/files/docs/readme.txt").unwrap();
        assert_eq!(params.get("wildcard"), Some("/docs/readme.txt"));
        assert_eq!(pat.matches("/files").unwrap().get("wildcard"), Some(""));
        assert!(pat.matches("/filesystem/a").is_none());
    }

    #[test]
    fn pattern_shapes_ignore_param_names() {
        let id = Pattern::parse("/users/:id");
        assert!(id.same_shape(&Pattern::parse("/users/:slug")));
        assert!(!id.same_shape(&Pattern::parse("/users/active")));
        assert!(!id.same_shape(&Pattern::parse("/users/:id/posts")));
    }

    // ── Router ────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn empty_router_returns_404() {
        let router = Router::new();
        assert!(router.is_empty());
        let res = router.route(make_request("GET", "/")).await;
        assert_eq!(res.status(), StatusCode::NotFound);
    }

    #[tokio::test]
    async fn literal_beats_param_regardless_of_order() {
        let mut router = Router::new();
        add(&mut router, Method::Get, "/users/:id", "show");
        add(&mut router, Method::Get, "/users/*", "files");
        add(&mut router, Method::Get, "/users/posts", "posts");

        assert_eq!(body_of(&router, "GET", "/users/posts").await, "posts:-");
        assert_eq!(body_of(&router, "GET", "/users/9").await, "show:9");
        assert_eq!(body_of(&router, "GET", "/users/9/avatar").await, "files:-");
        let order: Vec<&str> = router.routes().map(|r| r.pattern.as_str()).collect();
        assert_eq!(order, ["/users/posts", "/users/:id", "/users/*"]);
    }

    #[tokio::test]
    async fn equally_specific_routes_keep_registration_order() {
        let mut router = Router::new();
        add(&mut router, Method::Get, "/path", "first");
        add(&mut router, Method::Get, "/path", "second");
        assert_eq!(router.len(), 2);
        assert_eq!(body_of(&router, "GET", "/path").await, "first:-");
    }

    #[tokio::test]
    async fn other_method_returns_405_with_allow() {
        let mut router = Router::new();
        add(&mut router, Method::Get, "/users", "list");
        add(&mut router, Method::Post, "/users", "create");
        let res = router.route(make_request("DELETE", "/users")).await;
        assert_eq!(res.status(), StatusCode::MethodNotAllowed);
        assert_eq!(res.headers().get("allow"), Some("GET, POST"));
    }

    #[tokio::test]
    async fn query_string_is_ignored_for_matching() {
        let mut router = Router::new();
        add(&mut router, Method::Get, "/users/:id", "show");
        assert_eq!(body_of(&router, "GET", "/users/3?expand=1").await, "show:3");
    }

    #[tokio::test]
    async fn runs_route_chain_in_order() {
        let mut router = Router::new();
        let guard = from_fn(|ctx, next| async move {
            if ctx.params().get("id") == Some("0") {
                Response::new(StatusCode::Forbidden)
            } else {
                next.run(ctx).await
            }
        });
        let endpoint = from_fn(|_ctx, _next| async { Response::new(StatusCode::Ok) });
        router.route_with(
            Method::Get,
            "/items/:id",
            vec![guard, endpoint],
            Some("ItemsController::show".into()),
            vec!["guard".into()],
        );

        assert_eq!(
            router.route(make_request("GET", "/items/0")).await.status(),
            StatusCode::Forbidden
        );
        assert_eq!(
            router.route(make_request("GET", "/items/7")).await.status(),
            StatusCode::Ok
        );
    }

    #[test]
    fn lists_and_finds_routes() {
        let mut router = Router::new();
        add(&mut router, Method::Get, "/users/", "list");
        router.route_with(
            Method::Delete,
            "/users/:id",
            Vec::new(),
            Some("UsersController::destroy".into()),
            vec!["auth".into()],
        );

        let table: Vec<String> = router.routes().map(ToString::to_string).collect();
        assert_eq!(
            table,
            vec![
                "GET     /users".to_string(),
                "DELETE  /users/:id -> UsersController::destroy [auth]".to_string(),
            ]
        );
        assert!(router.contains(&Method::Delete, "/users/:id/"));
        assert!(!router.contains(&Method::Get, "/users/:id"));

        let clash = router.conflicting(&Method::Delete, "/users/:slug").unwrap();
        assert_eq!(clash.name.as_deref(), Some("UsersController::destroy"));
        assert!(router.conflicting(&Method::Get, "/users/:slug").is_none());
    }
}
