//! In-memory users API wired entirely by naming convention.
//!
//! ```bash
//! ROUTES_BASE_PATH=/api DEMO_TOKEN=secret RUST_LOG=conroute=debug \
//!     cargo run --example users_api
//!
//! curl localhost:8080/api/users
//! curl -XPOST localhost:8080/api/users -d '{"email":"ada@example.com","name":"Ada","password":"correct horse"}'
//! curl localhost:8080/api/users/active
//! curl -XDELETE -H 'Authorization: Bearer secret' localhost:8080/api/users/1
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use conroute::controller::{Action, Controller};
use conroute::{ActionError, Context, Response, RouteBuilder, RoutesConfig, Server, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;
use tracing_subscriber::EnvFilter;
use validator::Validate;

#[derive(Debug, Clone, Serialize)]
struct User {
    id: u64,
    email: String,
    name: String,
    active: bool,
    // Stripped from every reply by the default redaction list.
    password: String,
}

#[derive(Debug, Deserialize, Validate)]
struct CreateUser {
    #[validate(email)]
    email: String,
    #[validate(length(min = 1, max = 64))]
    name: String,
    #[validate(length(min = 8))]
    password: String,
}

#[derive(Debug, Deserialize, Validate)]
struct UpdateUser {
    #[validate(length(min = 1, max = 64))]
    name: Option<String>,
    active: Option<bool>,
}

#[derive(Default)]
struct Store {
    next_id: u64,
    users: BTreeMap<u64, User>,
}

#[derive(Default)]
struct UsersController {
    store: RwLock<Store>,
}

impl UsersController {
    async fn list(self: Arc<Self>, _ctx: Context) -> Result<Vec<User>, ActionError> {
        Ok(self.store.read().await.users.values().cloned().collect())
    }

    async fn create(self: Arc<Self>, mut ctx: Context) -> Result<User, ActionError> {
        let input: CreateUser = ctx.take_validated()?;
        let mut store = self.store.write().await;
        if store.users.values().any(|u| u.email == input.email) {
            return Err(ActionError::conflict(format!("{} is taken", input.email)));
        }
        store.next_id += 1;
        let user = User {
            id: store.next_id,
            email: input.email,
            name: input.name,
            active: true,
            password: input.password,
        };
        store.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn show(self: Arc<Self>, ctx: Context) -> Result<User, ActionError> {
        let id: u64 = ctx.param_as("id")?;
        self.store
            .read()
            .await
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| ActionError::not_found(format!("user {id} not found")))
    }

    async fn update(self: Arc<Self>, mut ctx: Context) -> Result<User, ActionError> {
        let id: u64 = ctx.param_as("id")?;
        let patch: UpdateUser = ctx.take_validated()?;
        let mut store = self.store.write().await;
        let user = store
            .users
            .get_mut(&id)
            .ok_or_else(|| ActionError::not_found(format!("user {id} not found")))?;
        if let Some(name) = patch.name {
            user.name = name;
        }
        if let Some(active) = patch.active {
            user.active = active;
        }
        Ok(user.clone())
    }

    async fn destroy(self: Arc<Self>, ctx: Context) -> Result<(), ActionError> {
        let id: u64 = ctx.param_as("id")?;
        match self.store.write().await.users.remove(&id) {
            Some(_) => Ok(()),
            None => Err(ActionError::not_found(format!("user {id} not found"))),
        }
    }

    async fn get_active(self: Arc<Self>, _ctx: Context) -> Result<Vec<User>, ActionError> {
        let store = self.store.read().await;
        Ok(store.users.values().filter(|u| u.active).cloned().collect())
    }
}

impl Controller for UsersController {
    fn name(&self) -> &str {
        "UsersController"
    }

    fn actions(self: Arc<Self>) -> Vec<Action> {
        vec![
            Action::method("list", &self, Self::list),
            Action::method("create", &self, Self::create)
                .validate::<CreateUser>()
                .status(StatusCode::Created),
            Action::method("show", &self, Self::show),
            Action::method("update", &self, Self::update).validate::<UpdateUser>(),
            Action::method("destroy", &self, Self::destroy).middleware("auth"),
            Action::method("get_active", &self, Self::get_active),
        ]
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = RoutesConfig::load()?;
    let token = std::env::var("DEMO_TOKEN").unwrap_or_else(|_| "secret".to_string());
    let expected = format!("Bearer {token}");

    let router = RouteBuilder::new(config)
        .controller(UsersController::default())
        .middleware_fn("auth", move |ctx, next| {
            let authorized = ctx.request().headers().get("authorization") == Some(expected.as_str());
            async move {
                if authorized {
                    next.run(ctx).await
                } else {
                    Response::new(StatusCode::Unauthorized)
                        .json(&serde_json::json!({ "error": { "code": "unauthorized" } }))
                }
            }
        })
        .global("logger")
        .build()?;

    for route in router.routes() {
        info!("{route}");
    }

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    Server::bind(&addr).await?.serve(router).await?;
    Ok(())
}
