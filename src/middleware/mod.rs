//! Middleware pipeline — composable before/after request handler logic.
//!
//! Each route owns an ordered middleware chain whose last entry is the controller
//! action itself. Controllers refer to middleware by name; the names are resolved
//! through a [`MiddlewareRegistry`] when routes are built.
//!
//! ## Core types
//!
//! - [`Middleware`] — trait implemented by all middleware.
//! - [`Next`] — cursor into the remaining middleware chain; call [`Next::run`] to
//!   advance to the next layer.
//! - [`MiddlewareHandler`] — type-erased, cheaply-cloneable middleware function.
//! - [`from_middleware`] / [`from_fn`] — build a [`MiddlewareHandler`].
//! - [`MiddlewareRegistry`] — middleware-name → middleware lookup table.
//! - [`LoggerMiddleware`] — built-in request/response logger, registered as `"logger"`.

use std::{collections::HashMap, future::Future, pin::Pin, sync::Arc};
use tokio::time::Instant;

use crate::{Response, context::Context};

/// A cursor into the remaining middleware chain for a single request.
///
/// `Next` is passed to each middleware's [`Middleware::handle`] implementation.
/// Calling [`Next::run`] advances the cursor by one position and invokes the next
/// middleware (or returns a fallback `500` response when the chain is exhausted
/// without any middleware generating a response).
///
/// `Next` is consumed on each call to [`run`](Self::run), so it cannot be called
/// more than once per middleware invocation.
///
/// # Examples
///
/// ```rust,no_run
/// use std::pin::Pin;
/// use conroute::{Response, context::Context, middleware::{Middleware, Next}};
///
/// struct PassThrough;
///
/// impl Middleware for PassThrough {
///     fn handle(
///         &self,
///         ctx: Context,
///         next: Next,
///     ) -> Pin<Box<dyn std::future::Future<Output = Response> + Send>> {
///         Box::pin(async move { next.run(ctx).await })
///     }
/// }
/// ```
pub struct Next {
    middlewares: Arc<[MiddlewareHandler]>,
    // Tracks which middleware to invoke on the next `run` call.
    index: usize,
}

/// A type-erased, reference-counted middleware function.
///
/// Every entry in a route's chain is stored as a `MiddlewareHandler`, including the
/// terminal action endpoint (which simply never calls `next`).
pub type MiddlewareHandler = Arc<
    dyn Fn(Context, Next) -> Pin<Box<dyn Future<Output = Response> + Send>> + Send + Sync + 'static,
>;

/// Converts a [`Middleware`] implementation into a [`MiddlewareHandler`].
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use conroute::middleware::{LoggerMiddleware, from_middleware};
///
/// let handler = from_middleware(Arc::new(LoggerMiddleware));
/// ```
pub fn from_middleware<M>(middleware: Arc<M>) -> MiddlewareHandler
where
    M: Middleware + 'static,
{
    Arc::new(move |ctx: Context, next: Next| middleware.handle(ctx, next))
}

/// Converts an async closure into a [`MiddlewareHandler`].
///
/// # Examples
///
/// ```rust,no_run
/// use conroute::{Response, StatusCode, middleware::from_fn};
///
/// let auth = from_fn(|ctx, next| async move {
///     if ctx.request().headers().contains("authorization") {
///         next.run(ctx).await
///     } else {
///         Response::new(StatusCode::Unauthorized)
///     }
/// });
/// ```
pub fn from_fn<F, Fut>(f: F) -> MiddlewareHandler
where
    F: Fn(Context, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    Arc::new(move |ctx: Context, next: Next| {
        Box::pin(f(ctx, next)) as Pin<Box<dyn Future<Output = Response> + Send>>
    })
}

impl Next {
    /// Creates a new `Next` positioned at the start of the given middleware chain.
    pub fn new(middlewares: impl Into<Arc<[MiddlewareHandler]>>) -> Self {
        Self {
            middlewares: middlewares.into(),
            index: 0,
        }
    }

    /// Number of middleware still to run, including the one `run` would call next.
    pub fn remaining(&self) -> usize {
        self.middlewares.len().saturating_sub(self.index)
    }

    /// Invokes the next middleware in the chain and returns its response.
    ///
    /// If no handler remains (i.e. the chain is exhausted without producing a
    /// response), a `500 Internal Server Error` response is returned.
    pub async fn run(mut self, ctx: Context) -> Response {
        if self.index < self.middlewares.len() {
            let handler = Arc::clone(&self.middlewares[self.index]);
            self.index += 1;
            handler(ctx, self).await
        } else {
            Response::new(crate::StatusCode::InternalServerError)
                .body("No response generated by middleware pipeline")
        }
    }
}

/// The core trait for all middleware.
///
/// Implementors receive a [`Context`] and a [`Next`] cursor. They may:
///
/// - **Pass through** — call `next.run(ctx).await` without modification.
/// - **Short-circuit** — return a [`Response`] directly without calling `next`.
/// - **Decorate** — call `next.run(ctx).await`, inspect the response, and return
///   a modified copy.
///
/// Implementations must be `Send + Sync` because middleware is shared across Tokio
/// tasks, and `handle` must return a `Send` future.
pub trait Middleware: Send + Sync {
    fn handle(&self, ctx: Context, next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>>;
}

/// Built-in middleware that logs each request's method, path, status, and duration.
///
/// Emits a single `tracing::info!` record after the downstream handler completes.
pub struct LoggerMiddleware;

impl Middleware for LoggerMiddleware {
    fn handle(&self, ctx: Context, next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        Box::pin(async move {
            let start = Instant::now();
            let method = ctx.request().method().as_str().to_string();
            let path = ctx.request().path().to_string();

            let response = next.run(ctx).await;

            tracing::info!(
                method = %method,
                path = %path,
                status = response.status().as_u16(),
                elapsed = ?start.elapsed(),
                "request completed"
            );

            response
        })
    }
}

/// Middleware-name → middleware lookup table.
///
/// Built once at startup; the route builder resolves every middleware name a
/// controller or action declares against it.
///
/// # Examples
///
/// ```rust
/// use conroute::middleware::MiddlewareRegistry;
///
/// let registry = MiddlewareRegistry::with_defaults();
/// assert!(registry.contains("logger"));
/// assert!(registry.get("auth").is_none());
/// ```
#[derive(Clone, Default)]
pub struct MiddlewareRegistry {
    entries: HashMap<String, MiddlewareHandler>,
}

impl MiddlewareRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in middleware (`"logger"`).
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("logger", LoggerMiddleware);
        registry
    }

    /// Registers `middleware` under `name`, replacing any previous entry.
    pub fn register<M>(&mut self, name: impl Into<String>, middleware: M)
    where
        M: Middleware + 'static,
    {
        self.insert(name, from_middleware(Arc::new(middleware)));
    }

    /// Registers an async closure under `name`.
    pub fn register_fn<F, Fut>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(Context, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.insert(name, from_fn(f));
    }

    /// Registers an already type-erased handler under `name`.
    pub fn insert(&mut self, name: impl Into<String>, handler: MiddlewareHandler) {
        let name = name.into();
        if self.entries.insert(name.clone(), handler).is_some() {
            tracing::debug!(middleware = %name, "middleware replaced");
        }
    }

    pub fn get(&self, name: &str) -> Option<MiddlewareHandler> {
        self.entries.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Request, StatusCode};

    fn ctx(path: &str) -> Context {
        let raw = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n");
        let (req, _) = Request::parse(raw.as_bytes()).unwrap();
        Context::new(req)
    }

    fn endpoint(status: StatusCode) -> MiddlewareHandler {
        from_fn(move |_ctx, _next| async move { Response::new(status) })
    }

    #[tokio::test]
    async fn empty_chain_falls_back_to_500() {
        let res = Next::new(Vec::<MiddlewareHandler>::new()).run(ctx("/")).await;
        assert_eq!(res.status(), StatusCode::InternalServerError);
    }

    #[tokio::test]
    async fn chain_runs_in_order_and_reaches_endpoint() {
        let tag = from_fn(|ctx, next| async move {
            let mut res = next.run(ctx).await;
            res.add_header("X-Tagged", "1");
            res
        });
        let res = Next::new(vec![tag, endpoint(StatusCode::Accepted)])
            .run(ctx("/"))
            .await;
        assert_eq!(res.status(), StatusCode::Accepted);
        assert_eq!(res.headers().get("x-tagged"), Some("1"));
    }

    #[tokio::test]
    async fn middleware_can_short_circuit() {
        let deny = from_fn(|_ctx, _next| async { Response::new(StatusCode::Forbidden) });
        let res = Next::new(vec![deny, endpoint(StatusCode::Ok)])
            .run(ctx("/"))
            .await;
        assert_eq!(res.status(), StatusCode::Forbidden);
    }

    #[tokio::test]
    async fn logger_passes_response_through() {
        let logger = from_middleware(Arc::new(LoggerMiddleware));
        let res = Next::new(vec![logger, endpoint(StatusCode::Created)])
            .run(ctx("/users"))
            .await;
        assert_eq!(res.status(), StatusCode::Created);
    }

    #[test]
    fn registry_lookup() {
        let mut registry = MiddlewareRegistry::with_defaults();
        registry.register_fn("auth", |ctx, next| async move { next.run(ctx).await });

        assert_eq!(registry.names(), vec!["auth", "logger"]);
        assert!(registry.get("auth").is_some());
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn next_remaining_counts_down() {
        let next = Next::new(vec![endpoint(StatusCode::Ok), endpoint(StatusCode::Ok)]);
        assert_eq!(next.remaining(), 2);
    }
}
