//! Convention-based route building.
//!
//! [`RouteBuilder`] collects controllers and named middleware, decides where every
//! controller is mounted (by folder discovery or by name), turns each action into a
//! route through the naming convention, and registers the resulting middleware chains
//! on a [`Router`].
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use conroute::{ActionError, Context, RouteBuilder, RoutesConfig};
//! use conroute::controller::{Action, Controller};
//!
//! struct HealthController;
//!
//! impl Controller for HealthController {
//!     fn name(&self) -> &str {
//!         "HealthController"
//!     }
//!
//!     fn actions(self: Arc<Self>) -> Vec<Action> {
//!         vec![Action::new("list", |_ctx: Context| async { Ok::<_, ActionError>(()) })]
//!     }
//! }
//!
//! let router = RouteBuilder::new(RoutesConfig::default().base_path("/api"))
//!     .controller(HealthController)
//!     .global("logger")
//!     .build()?;
//! // GET /api/health -> "ok"
//! # Ok::<(), conroute::BuildError>(())
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::config::RoutesConfig;
use crate::context::Context;
use crate::controller::{Action, ActionHandler, Controller};
use crate::convention;
use crate::discovery;
use crate::error::{ActionError, BuildError};
use crate::middleware::{Middleware, MiddlewareHandler, MiddlewareRegistry, Next};
use crate::reply::{self, ErrorHandler};
use crate::router::Router;
use crate::{Response, StatusCode};

// A controller bound to the URL prefix it serves under.
struct Mount {
    prefix: String,
    controller: Arc<dyn Controller>,
}

/// Builds a [`Router`] from controllers by convention.
pub struct RouteBuilder {
    config: RoutesConfig,
    controllers: Vec<Arc<dyn Controller>>,
    mounts: Vec<Mount>,
    middleware: MiddlewareRegistry,
    global: Vec<String>,
    errors: ErrorHandler,
}

impl RouteBuilder {
    /// A builder with the built-in middleware and the default error handler.
    pub fn new(config: RoutesConfig) -> Self {
        Self {
            config,
            controllers: Vec::new(),
            mounts: Vec::new(),
            middleware: MiddlewareRegistry::with_defaults(),
            global: Vec::new(),
            errors: reply::default_error_handler(),
        }
    }

    /// Registers a controller by its [`Controller::name`].
    ///
    /// With a controllers directory configured, the controller is mounted where its
    /// folder is found; otherwise it is mounted at `/<kebab-case name>`.
    #[must_use]
    pub fn controller<C: Controller>(mut self, controller: C) -> Self {
        self.controllers.push(Arc::new(controller));
        self
    }

    /// Mounts a controller at an explicit prefix, independent of discovery.
    #[must_use]
    pub fn mount<C: Controller>(mut self, prefix: impl Into<String>, controller: C) -> Self {
        self.mounts.push(Mount {
            prefix: prefix.into(),
            controller: Arc::new(controller),
        });
        self
    }

    /// Registers a named middleware.
    #[must_use]
    pub fn middleware<M: Middleware + 'static>(mut self, name: impl Into<String>, middleware: M) -> Self {
        self.middleware.register(name, middleware);
        self
    }

    /// Registers a named middleware closure.
    #[must_use]
    pub fn middleware_fn<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Context, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.middleware.register_fn(name, f);
        self
    }

    /// Applies a registered middleware to every generated route, outermost first.
    #[must_use]
    pub fn global(mut self, name: impl Into<String>) -> Self {
        self.global.push(name.into());
        self
    }

    /// Replaces the error pipeline used for validation and action failures.
    #[must_use]
    pub fn error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ActionError) -> Response + Send + Sync + 'static,
    {
        self.errors = Arc::new(handler);
        self
    }

    /// Builds the router.
    ///
    /// # Errors
    ///
    /// Any [`BuildError`]: invalid configuration, an unreadable controllers directory,
    /// a folder without a controller (strict mode), an action name without a verb, an
    /// unknown middleware name, or two actions claiming the same method and path.
    pub fn build(self) -> Result<Router, BuildError> {
        self.config.validate()?;

        let mounts = self.mount_points()?;
        let redact: Arc<[String]> = self.config.redact_fields.clone().into();
        let mut router = Router::new();

        for mount in &mounts {
            let controller_name = mount.controller.name().to_owned();
            let controller_middleware = mount.controller.middleware();

            for action in Arc::clone(&mount.controller).actions() {
                let target = action
                    .target(&self.config.id_param)
                    .map_err(|source| BuildError::Convention {
                        controller: controller_name.clone(),
                        action: action.name().to_owned(),
                        source,
                    })?;
                let path = convention::join_path(&[
                    self.config.base_path.as_str(),
                    mount.prefix.as_str(),
                    target.path.as_str(),
                ]);
                let route_name = format!("{controller_name}::{}", action.name());

                // `/users/:id` and `/users/:slug` match the same requests.
                if let Some(first) = router.conflicting(&target.method, &path) {
                    return Err(BuildError::DuplicateRoute {
                        method: target.method,
                        path,
                        first: first.name.clone().unwrap_or_else(|| first.pattern.clone()),
                        second: route_name,
                    });
                }

                let names: Vec<String> = self
                    .global
                    .iter()
                    .chain(&controller_middleware)
                    .chain(action.middleware_names())
                    .cloned()
                    .collect();
                let chain = self.chain_for(&controller_name, &action, &names, &redact)?;

                tracing::debug!(
                    method = %target.method,
                    path = %path,
                    controller = %controller_name,
                    action = action.name(),
                    middleware = ?names,
                    "route registered"
                );
                router.route_with(target.method, &path, chain, Some(route_name), names);
            }
        }

        tracing::info!(
            routes = router.len(),
            controllers = mounts.len(),
            "convention routes built"
        );
        Ok(router)
    }

    // Decide the prefix of every controller: discovered folders or derived names, then
    // explicit mounts.
    fn mount_points(&self) -> Result<Vec<Mount>, BuildError> {
        let mut by_name: HashMap<&str, &Arc<dyn Controller>> = HashMap::new();
        for controller in &self.controllers {
            if by_name.insert(controller.name(), controller).is_some() {
                return Err(BuildError::DuplicateController {
                    controller: controller.name().to_owned(),
                });
            }
        }

        let mut mounts = Vec::new();

        match &self.config.controllers_dir {
            Some(root) => {
                let folders = discovery::discover(root, &self.config.controller_file)?;
                let mut mounted: Vec<&str> = Vec::new();

                for folder in folders {
                    match by_name.get(folder.controller_name.as_str()) {
                        Some(controller) => {
                            mounted.push(controller.name());
                            mounts.push(Mount {
                                prefix: folder.url_prefix,
                                controller: Arc::clone(controller),
                            });
                        }
                        None if self.config.strict => {
                            return Err(BuildError::UnregisteredController {
                                dir: folder.dir,
                                controller: folder.controller_name,
                            });
                        }
                        None => {
                            tracing::warn!(
                                dir = %folder.dir.display(),
                                controller = %folder.controller_name,
                                "controller folder has no registered controller, skipping"
                            );
                        }
                    }
                }

                for controller in &self.controllers {
                    if !mounted.contains(&controller.name()) {
                        tracing::warn!(
                            controller = controller.name(),
                            root = %root.display(),
                            "registered controller has no folder and is not mounted"
                        );
                    }
                }
            }
            None => {
                for controller in &self.controllers {
                    mounts.push(Mount {
                        prefix: convention::join_path(&[convention::resource_segment(
                            controller.name(),
                        )
                        .as_str()]),
                        controller: Arc::clone(controller),
                    });
                }
            }
        }

        for mount in &self.mounts {
            mounts.push(Mount {
                prefix: mount.prefix.clone(),
                controller: Arc::clone(&mount.controller),
            });
        }

        Ok(mounts)
    }

    // Resolve middleware names and append validation and the action endpoint.
    fn chain_for(
        &self,
        controller: &str,
        action: &Action,
        names: &[String],
        redact: &Arc<[String]>,
    ) -> Result<Vec<MiddlewareHandler>, BuildError> {
        let mut chain = Vec::with_capacity(names.len() + 2);
        for name in names {
            let handler = self
                .middleware
                .get(name)
                .ok_or_else(|| BuildError::UnknownMiddleware {
                    controller: controller.to_owned(),
                    action: action.name().to_owned(),
                    middleware: name.clone(),
                })?;
            chain.push(handler);
        }

        if let Some(validator) = action.validator() {
            chain.push(validator.clone().into_middleware(Arc::clone(&self.errors)));
        }

        chain.push(endpoint(
            action.handler(),
            action.success_status(),
            Arc::clone(redact),
            Arc::clone(&self.errors),
        ));
        Ok(chain)
    }
}

// Terminal chain entry: run the action and shape its result or error into a response.
fn endpoint(
    handler: ActionHandler,
    status: StatusCode,
    redact: Arc<[String]>,
    errors: ErrorHandler,
) -> MiddlewareHandler {
    Arc::new(move |ctx: Context, _next: Next| {
        let fut = handler(ctx);
        let redact = Arc::clone(&redact);
        let errors = Arc::clone(&errors);
        Box::pin(async move {
            match fut.await {
                Ok(value) => reply::json_reply(value, status, &redact),
                Err(err) => errors(&err),
            }
        }) as Pin<Box<dyn Future<Output = Response> + Send>>
    })
}
