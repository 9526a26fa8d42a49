//! Request body validation attached to controller actions.
//!
//! Rules live on the payload type through `#[derive(validator::Validate)]`. An action
//! opts in with [`Action::validate`](crate::controller::Action::validate); the builder
//! then inserts a validation middleware right before the action. On success the parsed
//! payload is stored in the request extensions as [`Validated<T>`], on failure the
//! request is answered by the error pipeline and the action never runs.

use std::{any::type_name, future::Future, pin::Pin, sync::Arc};

use serde::de::DeserializeOwned;
use validator::Validate;

use crate::{
    ActionError, Response,
    context::Context,
    middleware::{MiddlewareHandler, Next},
    reply::ErrorHandler,
};

/// A payload that passed its validation rules.
#[derive(Debug, Clone)]
pub struct Validated<T>(pub T);

/// Type-erased "parse, validate, stash" step for one payload type.
#[derive(Clone)]
pub struct BodyValidator {
    type_name: &'static str,
    check: Arc<dyn Fn(&mut Context) -> Result<(), ActionError> + Send + Sync>,
}

impl std::fmt::Debug for BodyValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodyValidator")
            .field("type_name", &self.type_name)
            .finish()
    }
}

impl BodyValidator {
    /// Name of the payload type, used in route listings and logs.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Parses and validates the body of `ctx`, storing the result on success.
    pub fn check(&self, ctx: &mut Context) -> Result<(), ActionError> {
        (self.check)(ctx)
    }

    /// Wraps this validator into a middleware that answers failures through `errors`.
    pub fn into_middleware(self, errors: ErrorHandler) -> MiddlewareHandler {
        Arc::new(move |mut ctx: Context, next: Next| {
            let outcome = self.check(&mut ctx);
            let errors = Arc::clone(&errors);
            let validator = self.type_name;
            Box::pin(async move {
                match outcome {
                    Ok(()) => next.run(ctx).await,
                    Err(err) => {
                        tracing::debug!(
                            payload = validator,
                            path = %ctx.request().path(),
                            error = %err,
                            "request body rejected"
                        );
                        errors(&err)
                    }
                }
            }) as Pin<Box<dyn Future<Output = Response> + Send>>
        })
    }
}

/// Parses a JSON request body. An empty or all-whitespace body reads as `{}`, so
/// payloads whose fields are all optional accept a bodiless request.
pub(crate) fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        serde_json::from_slice(b"{}")
    } else {
        serde_json::from_slice(body)
    }
}

/// Builds a validator for JSON bodies of type `T`.
pub fn json_body<T>() -> BodyValidator
where
    T: DeserializeOwned + Validate + Send + Sync + 'static,
{
    BodyValidator {
        type_name: type_name::<T>(),
        check: Arc::new(|ctx: &mut Context| -> Result<(), ActionError> {
            let value: T = parse_json(ctx.request().body())?;
            value.validate()?;
            ctx.extensions_mut().insert(Validated(value));
            Ok(())
        }),
    }
}
