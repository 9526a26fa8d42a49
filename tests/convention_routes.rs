use std::fs;
use std::sync::Arc;

use conroute::controller::{Action, Controller};
use conroute::{
    ActionError, BuildError, Context, Method, Request, Response, RouteBuilder, RoutesConfig,
    StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tempfile::TempDir;
use validator::Validate;

// A controllers root holding a `controller.rs` marker in each folder.
fn controllers_tree(folders: &[&str]) -> TempDir {
    let root = TempDir::new().unwrap();
    for folder in folders {
        let dir = root.path().join(folder);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("controller.rs"), "").unwrap();
    }
    root
}

#[derive(Debug, Deserialize, Validate)]
struct NewProfile {
    #[validate(length(min = 2))]
    handle: String,
    password: String,
}

struct UserProfilesController;

impl UserProfilesController {
    async fn list(self: Arc<Self>, _ctx: Context) -> Result<Value, ActionError> {
        Ok(json!([
            { "handle": "ada", "password": "x", "meta": { "password": "y", "age": 36 } }
        ]))
    }

    async fn create(self: Arc<Self>, mut ctx: Context) -> Result<Value, ActionError> {
        let profile: NewProfile = ctx.take_validated()?;
        Ok(json!({ "handle": profile.handle, "password": profile.password }))
    }

    async fn show(self: Arc<Self>, ctx: Context) -> Result<Value, ActionError> {
        Ok(json!({ "id": ctx.param("id")? }))
    }

    async fn get_recent(self: Arc<Self>, _ctx: Context) -> Result<&'static str, ActionError> {
        Ok("recent")
    }

    async fn post_reset_password(self: Arc<Self>, _ctx: Context) -> Result<(), ActionError> {
        Ok(())
    }
}

impl Controller for UserProfilesController {
    fn name(&self) -> &str {
        "UserProfilesController"
    }

    fn actions(self: Arc<Self>) -> Vec<Action> {
        vec![
            Action::method("show", &self, Self::show),
            Action::method("list", &self, Self::list),
            Action::method("create", &self, Self::create).validate::<NewProfile>(),
            Action::method("get_recent", &self, Self::get_recent),
            Action::method("post_reset_password", &self, Self::post_reset_password),
        ]
    }

    fn middleware(&self) -> Vec<String> {
        vec!["tag".to_string()]
    }
}

struct OrdersController;

impl Controller for OrdersController {
    fn name(&self) -> &str {
        "OrdersController"
    }

    fn actions(self: Arc<Self>) -> Vec<Action> {
        vec![Action::new("list", |_ctx: Context| async { Ok::<_, ActionError>(json!([])) })]
    }
}

fn request(method: &str, path: &str, body: &str) -> Request {
    let raw = format!(
        "{method} {path} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    );
    Request::parse(raw.as_bytes()).unwrap().0
}

fn body(res: &Response) -> Value {
    serde_json::from_slice(res.body_ref()).unwrap()
}

fn builder(tree: &TempDir) -> RouteBuilder {
    RouteBuilder::new(
        RoutesConfig::default()
            .controllers_dir(tree.path())
            .base_path("/api"),
    )
    .middleware_fn("tag", |ctx, next| async move {
        next.run(ctx).await.header("X-Tag", "profiles")
    })
}

#[test]
fn folders_decide_the_mount_point() {
    let tree = controllers_tree(&["admin/UserProfiles", "orders", "_drafts/orders"]);
    let router = builder(&tree)
        .controller(UserProfilesController)
        .controller(OrdersController)
        .build()
        .unwrap();

    let listing: Vec<String> = router.routes().map(ToString::to_string).collect();
    assert_eq!(
        listing,
        vec![
            "GET     /api/orders -> OrdersController::list",
            "GET     /api/admin/user-profiles -> UserProfilesController::list [tag]",
            "POST    /api/admin/user-profiles -> UserProfilesController::create [tag]",
            "GET     /api/admin/user-profiles/recent -> UserProfilesController::get_recent [tag]",
            "POST    /api/admin/user-profiles/reset-password -> UserProfilesController::post_reset_password [tag]",
            "GET     /api/admin/user-profiles/:id -> UserProfilesController::show [tag]",
        ]
    );
    assert!(router.contains(&Method::Get, "/api/orders"));
    assert!(!router.contains(&Method::Get, "/api/drafts/orders"));
}

#[tokio::test]
async fn requests_flow_through_the_generated_chain() {
    let tree = controllers_tree(&["admin/user-profiles"]);
    let router = builder(&tree)
        .controller(UserProfilesController)
        .build()
        .unwrap();

    let listed = router
        .route(request("GET", "/api/admin/user-profiles", ""))
        .await;
    assert_eq!(listed.status(), StatusCode::Ok);
    assert_eq!(listed.headers().get("x-tag"), Some("profiles"));
    assert_eq!(body(&listed), json!([{ "handle": "ada", "meta": { "age": 36 } }]));

    let recent = router
        .route(request("GET", "/api/admin/user-profiles/recent", ""))
        .await;
    assert_eq!(body(&recent), json!("recent"));

    let shown = router
        .route(request("GET", "/api/admin/user-profiles/42", ""))
        .await;
    assert_eq!(body(&shown), json!({ "id": "42" }));

    let reset = router
        .route(request("POST", "/api/admin/user-profiles/reset-password", ""))
        .await;
    assert_eq!(body(&reset), json!("ok"));
}

#[tokio::test]
async fn validation_failures_skip_the_action() {
    let tree = controllers_tree(&["admin/user-profiles"]);
    let router = builder(&tree)
        .controller(UserProfilesController)
        .build()
        .unwrap();

    let invalid = router
        .route(request(
            "POST",
            "/api/admin/user-profiles",
            r#"{"handle":"a","password":"pw"}"#,
        ))
        .await;
    assert_eq!(invalid.status(), StatusCode::UnprocessableEntity);
    let err = body(&invalid);
    assert_eq!(err["error"]["code"], "validation_error");
    assert!(err["error"]["details"].get("handle").is_some());

    let malformed = router
        .route(request("POST", "/api/admin/user-profiles", "{"))
        .await;
    assert_eq!(malformed.status(), StatusCode::BadRequest);

    let created = router
        .route(request(
            "POST",
            "/api/admin/user-profiles",
            r#"{"handle":"ada","password":"pw"}"#,
        ))
        .await;
    assert_eq!(created.status(), StatusCode::Ok);
    assert_eq!(body(&created), json!({ "handle": "ada" }));
}

#[tokio::test]
async fn unknown_paths_and_methods() {
    let tree = controllers_tree(&["orders"]);
    let router = builder(&tree).controller(OrdersController).build().unwrap();

    let missing = router.route(request("GET", "/api/nothing", "")).await;
    assert_eq!(missing.status(), StatusCode::NotFound);

    let wrong_method = router.route(request("DELETE", "/api/orders", "")).await;
    assert_eq!(wrong_method.status(), StatusCode::MethodNotAllowed);
    assert_eq!(wrong_method.headers().get("allow"), Some("GET"));
}

struct UsersController;

impl Controller for UsersController {
    fn name(&self) -> &str {
        "UsersController"
    }

    fn actions(self: Arc<Self>) -> Vec<Action> {
        vec![Action::new("show", |ctx: Context| async move {
            Ok::<_, ActionError>(json!({ "user": ctx.param("id")? }))
        })]
    }
}

struct PostsController;

impl Controller for PostsController {
    fn name(&self) -> &str {
        "PostsController"
    }

    fn actions(self: Arc<Self>) -> Vec<Action> {
        vec![Action::new("list", |_ctx: Context| async {
            Ok::<_, ActionError>(json!(["first post"]))
        })]
    }
}

#[tokio::test]
async fn nested_folder_is_not_shadowed_by_parent_id_route() {
    let tree = controllers_tree(&["users", "users/posts"]);
    let router = builder(&tree)
        .controller(UsersController)
        .controller(PostsController)
        .build()
        .unwrap();

    let posts = router.route(request("GET", "/api/users/posts", "")).await;
    assert_eq!(posts.status(), StatusCode::Ok);
    assert_eq!(body(&posts), json!(["first post"]));

    let user = router.route(request("GET", "/api/users/7", "")).await;
    assert_eq!(body(&user), json!({ "user": "7" }));
}

#[test]
fn strict_mode_rejects_orphan_folders() {
    let tree = controllers_tree(&["orders", "invoices"]);
    let err = builder(&tree)
        .controller(OrdersController)
        .build()
        .err()
        .unwrap();
    assert!(matches!(
        err,
        BuildError::UnregisteredController { ref controller, .. } if controller == "InvoicesController"
    ));
}

#[test]
fn lenient_mode_skips_orphan_folders() {
    let tree = controllers_tree(&["orders", "invoices"]);
    let router = RouteBuilder::new(
        RoutesConfig::default()
            .controllers_dir(tree.path())
            .strict(false),
    )
    .controller(OrdersController)
    .build()
    .unwrap();
    assert_eq!(router.len(), 1);
    assert!(router.contains(&Method::Get, "/orders"));
}

#[test]
fn missing_controllers_dir_fails() {
    let err = RouteBuilder::new(
        RoutesConfig::default().controllers_dir("/definitely/not/a/controllers/dir"),
    )
    .build()
    .err()
    .unwrap();
    assert!(matches!(err, BuildError::ControllersDir { .. }));
}
