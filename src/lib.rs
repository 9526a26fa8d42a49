//! # conroute
//!
//! Convention-based routing on top of a small async HTTP/1.1 server.
//!
//! Controllers describe their actions by name; the [`RouteBuilder`] turns
//! `list`/`create`/`show`/`update`/`destroy` and verb-prefixed names such as
//! `get_active` or `postResetPassword` into routes, mounts each controller under the
//! folder it lives in (or a segment derived from its name), wires named middleware and
//! body validation in front of each action, and shapes every result into JSON.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use conroute::{ActionError, Context, RouteBuilder, RoutesConfig, Server};
//! use conroute::controller::{Action, Controller};
//!
//! struct UsersController;
//!
//! impl UsersController {
//!     async fn show(self: Arc<Self>, ctx: Context) -> Result<serde_json::Value, ActionError> {
//!         let id: u64 = ctx.param_as("id")?;
//!         Ok(serde_json::json!({ "id": id, "password": "never sent" }))
//!     }
//! }
//!
//! impl Controller for UsersController {
//!     fn name(&self) -> &str {
//!         "UsersController"
//!     }
//!
//!     fn actions(self: Arc<Self>) -> Vec<Action> {
//!         vec![Action::method("show", &self, Self::show)]
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let router = RouteBuilder::new(RoutesConfig::load()?)
//!         .controller(UsersController)
//!         .build()?;
//!
//!     Server::bind("127.0.0.1:8080").await?.serve(router).await?;
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod config;
pub mod context;
pub mod controller;
pub mod convention;
pub mod discovery;
pub mod error;
pub mod http;
pub mod middleware;
pub mod reply;
pub mod router;
pub mod server;
pub mod validation;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use builder::RouteBuilder;
pub use config::RoutesConfig;
pub use context::Context;
pub use controller::{Action, Controller};
pub use error::{ActionError, BuildError};
pub use http::{Headers, Method, Request, Response, StatusCode};
pub use router::Router;
pub use server::{Server, ServerError};
