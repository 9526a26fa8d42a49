//! Controllers and their declarative action tables.
//!
//! A controller lists its actions by name. The names follow the routing convention
//! (see [`convention`](crate::convention)): `list`, `create`, `show`, `update` and
//! `destroy` map to the usual resource routes, any other name starts with the HTTP
//! verb it answers to.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use conroute::{ActionError, Context};
//! use conroute::controller::{Action, Controller};
//!
//! struct UsersController;
//!
//! impl UsersController {
//!     async fn list(self: Arc<Self>, _ctx: Context) -> Result<Vec<String>, ActionError> {
//!         Ok(vec!["ada".into(), "grace".into()])
//!     }
//!
//!     async fn get_active(self: Arc<Self>, _ctx: Context) -> Result<Vec<String>, ActionError> {
//!         Ok(vec!["ada".into()])
//!     }
//! }
//!
//! impl Controller for UsersController {
//!     fn name(&self) -> &str {
//!         "UsersController"
//!     }
//!
//!     fn actions(self: Arc<Self>) -> Vec<Action> {
//!         vec![
//!             Action::method("list", &self, Self::list),
//!             Action::method("get_active", &self, Self::get_active).middleware("auth"),
//!         ]
//!     }
//! }
//! ```

use std::{fmt, future::Future, pin::Pin, sync::Arc};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use validator::Validate;

use crate::{
    ActionError, Method, StatusCode,
    context::Context,
    convention::{self, RouteTarget},
    error::ConventionError,
    reply,
    validation::{self, BodyValidator},
};

/// Boxed future returned by an [`ActionHandler`].
pub type ActionFuture = Pin<Box<dyn Future<Output = Result<Value, ActionError>> + Send>>;

/// Type-erased controller action. The result is already converted to JSON.
pub type ActionHandler = Arc<dyn Fn(Context) -> ActionFuture + Send + Sync + 'static>;

/// Conversion trait for async action functions.
///
/// Any `Fn(Context) -> impl Future<Output = Result<T, E>>` where `T: Serialize` and
/// `E: Into<ActionError>` implements it through the blanket impl below.
pub trait IntoAction: Send + Sync + 'static {
    fn call(&self, ctx: Context) -> ActionFuture;
}

impl<H, F, T, E> IntoAction for H
where
    H: Fn(Context) -> F + Send + Sync + 'static,
    F: Future<Output = Result<T, E>> + Send + 'static,
    T: Serialize,
    E: Into<ActionError>,
{
    fn call(&self, ctx: Context) -> ActionFuture {
        let fut = (self)(ctx);
        Box::pin(async move {
            match fut.await {
                Ok(result) => reply::to_json(&result),
                Err(e) => Err(e.into()),
            }
        })
    }
}

/// An object whose actions become HTTP routes by naming convention.
pub trait Controller: Send + Sync + 'static {
    /// Name matched against controller folders, e.g. `UserProfilesController` for a
    /// folder called `user-profiles`.
    fn name(&self) -> &str;

    /// The controller's action table.
    fn actions(self: Arc<Self>) -> Vec<Action>;

    /// Middleware names applied to every action of this controller, outermost first.
    fn middleware(&self) -> Vec<String> {
        Vec::new()
    }
}

/// One entry of a controller's action table.
pub struct Action {
    name: String,
    handler: ActionHandler,
    middleware: Vec<String>,
    validator: Option<BodyValidator>,
    method: Option<Method>,
    path: Option<String>,
    status: StatusCode,
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("middleware", &self.middleware)
            .field("validator", &self.validator)
            .field("method", &self.method)
            .field("path", &self.path)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl Action {
    /// An action backed by a closure.
    pub fn new(name: impl Into<String>, handler: impl IntoAction) -> Self {
        Self {
            name: name.into(),
            handler: Arc::new(move |ctx| handler.call(ctx)),
            middleware: Vec::new(),
            validator: None,
            method: None,
            path: None,
            status: StatusCode::Ok,
        }
    }

    /// An action backed by a controller method taking `self: Arc<Self>`.
    pub fn method<C, F, Fut, T, E>(name: impl Into<String>, controller: &Arc<C>, f: F) -> Self
    where
        C: Send + Sync + 'static,
        F: Fn(Arc<C>, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Serialize,
        E: Into<ActionError>,
    {
        let controller = Arc::clone(controller);
        Self::new(name, move |ctx: Context| f(Arc::clone(&controller), ctx))
    }

    /// Adds a middleware by registered name. Runs after controller-wide middleware.
    #[must_use]
    pub fn middleware(mut self, name: impl Into<String>) -> Self {
        self.middleware.push(name.into());
        self
    }

    /// Validates the JSON body as `T` before the action runs.
    #[must_use]
    pub fn validate<T>(mut self) -> Self
    where
        T: DeserializeOwned + Validate + Send + Sync + 'static,
    {
        self.validator = Some(validation::json_body::<T>());
        self
    }

    /// Overrides the conventional sub-path; the verb still comes from the name.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Declares verb and sub-path explicitly, bypassing the naming convention.
    #[must_use]
    pub fn route(mut self, method: Method, path: impl Into<String>) -> Self {
        self.method = Some(method);
        self.path = Some(path.into());
        self
    }

    /// Status used for successful responses (default `200 OK`).
    #[must_use]
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn middleware_names(&self) -> &[String] {
        &self.middleware
    }

    pub fn validator(&self) -> Option<&BodyValidator> {
        self.validator.as_ref()
    }

    pub fn success_status(&self) -> StatusCode {
        self.status
    }

    pub fn handler(&self) -> ActionHandler {
        Arc::clone(&self.handler)
    }

    /// Where this action is mounted relative to its controller.
    ///
    /// # Errors
    ///
    /// Fails when the verb has to come from the name and the name does not start
    /// with one.
    pub fn target(&self, id_param: &str) -> Result<RouteTarget, ConventionError> {
        let path = self.path.as_deref().map(normalize_sub_path);
        match (&self.method, path) {
            (Some(method), Some(path)) => Ok(RouteTarget {
                method: method.clone(),
                path,
            }),
            (_, path) => {
                let mut target = convention::resolve_action(&self.name, id_param)?;
                if let Some(path) = path {
                    target.path = path;
                }
                Ok(target)
            }
        }
    }
}

// "" and "/" mean the controller root; anything else gets exactly one leading slash.
fn normalize_sub_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Request;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, Validate)]
    struct Rename {
        #[validate(length(min = 1))]
        name: String,
    }

    struct Counter {
        start: u32,
    }

    impl Counter {
        async fn show(self: Arc<Self>, ctx: Context) -> Result<Value, ActionError> {
            let id: u32 = ctx.param_as("id")?;
            Ok(json!({ "value": self.start + id }))
        }
    }

    fn ctx() -> Context {
        let (req, _) = Request::parse(b"GET /counter/2 HTTP/1.1\r\n\r\n").unwrap();
        let mut params = crate::context::PathParams::new();
        params.insert("id".into(), "2".into());
        Context::with_params(req, params)
    }

    #[test]
    fn conventional_targets() {
        let list = Action::new("list", |_ctx| async { Ok::<_, ActionError>(()) });
        assert_eq!(list.target("id").unwrap().method, Method::Get);

        let custom = Action::new("postResetPassword", |_ctx| async { Ok::<_, ActionError>(()) });
        let t = custom.target("id").unwrap();
        assert_eq!((t.method, t.path.as_str()), (Method::Post, "/reset-password"));
    }

    #[test]
    fn path_override_keeps_verb_from_name() {
        let action = Action::new("get_avatar", |_ctx| async { Ok::<_, ActionError>(()) })
            .path("/:id/avatar/");
        let t = action.target("id").unwrap();
        assert_eq!((t.method, t.path.as_str()), (Method::Get, "/:id/avatar"));
    }

    #[test]
    fn explicit_route_bypasses_convention() {
        let action = Action::new("healthcheck", |_ctx| async { Ok::<_, ActionError>(()) })
            .route(Method::Get, "/");
        let t = action.target("id").unwrap();
        assert_eq!((t.method, t.path.as_str()), (Method::Get, ""));
    }

    #[test]
    fn unknown_verb_without_route_fails() {
        let action = Action::new("healthcheck", |_ctx| async { Ok::<_, ActionError>(()) });
        assert!(action.target("id").is_err());
    }

    #[test]
    fn builder_records_middleware_validator_and_status() {
        let action = Action::new("create", |_ctx| async { Ok::<_, ActionError>(()) })
            .middleware("auth")
            .middleware("audit")
            .validate::<Rename>()
            .status(StatusCode::Created);
        assert_eq!(action.middleware_names(), ["auth", "audit"]);
        assert!(action.validator().is_some());
        assert_eq!(action.success_status(), StatusCode::Created);
    }

    #[tokio::test]
    async fn method_action_reaches_controller_state() {
        let counter = Arc::new(Counter { start: 40 });
        let action = Action::method("show", &counter, Counter::show);
        let value = (action.handler())(ctx()).await.unwrap();
        assert_eq!(value, json!({ "value": 42 }));
    }

    #[tokio::test]
    async fn action_errors_are_converted() {
        let action = Action::new("show", |ctx: Context| async move {
            ctx.param_as::<u32>("missing").map(|_| ())
        });
        let err = (action.handler())(ctx()).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BadRequest);
    }
}
