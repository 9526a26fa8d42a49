//! Response shaping. Turns action results and errors into JSON responses.
//!
//! Every action result is serialized to JSON; a `null` result (including `()`) is
//! replaced by the string `"ok"`, and sensitive keys such as `password` are removed
//! at every depth before the body is written.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Value, json};

use crate::{ActionError, Response, StatusCode};

/// Body sent when an action returns nothing.
pub const DEFAULT_BODY: &str = "ok";

/// The error pipeline: renders an [`ActionError`] raised by validation or an action.
pub type ErrorHandler = Arc<dyn Fn(&ActionError) -> Response + Send + Sync + 'static>;

/// Removes every object key listed in `fields`, recursing into nested objects and
/// arrays.
///
/// ```
/// use serde_json::json;
/// use conroute::reply::redact_fields;
///
/// let mut user = json!({ "name": "ada", "password": "hunter2", "tokens": [{ "password": "x" }] });
/// redact_fields(&mut user, &["password".to_string()]);
/// assert_eq!(user, json!({ "name": "ada", "tokens": [{}] }));
/// ```
pub fn redact_fields(value: &mut Value, fields: &[String]) {
    match value {
        Value::Object(map) => {
            map.retain(|key, _| !fields.iter().any(|f| f == key));
            for child in map.values_mut() {
                redact_fields(child, fields);
            }
        }
        Value::Array(items) => {
            for item in items {
                redact_fields(item, fields);
            }
        }
        _ => {}
    }
}

/// Normalizes a handler result into a JSON value: `null` becomes `"ok"` and the
/// `redact` keys are stripped.
pub fn shape(value: Value, redact: &[String]) -> Value {
    let mut value = match value {
        Value::Null => Value::String(DEFAULT_BODY.to_owned()),
        other => other,
    };
    redact_fields(&mut value, redact);
    value
}

/// Converts an action result into a JSON value.
///
/// # Errors
///
/// Returns [`ActionError::Internal`] when `result` cannot be represented as JSON
/// (e.g. a map with non-string keys).
pub fn to_json<T>(result: &T) -> Result<Value, ActionError>
where
    T: Serialize + ?Sized,
{
    serde_json::to_value(result)
        .map_err(|e| ActionError::internal(format!("response is not serializable: {e}")))
}

/// Builds the JSON response for a handler result.
pub fn json_reply(value: Value, status: StatusCode, redact: &[String]) -> Response {
    Response::new(status).json(&shape(value, redact))
}

/// Builds the default [`ErrorHandler`].
///
/// Renders `{"error": {"code", "message", "details"}}` with the error's status.
/// Server errors are logged at `error` level and their message is replaced by the
/// generic reason phrase; client errors are logged at `debug`.
pub fn default_error_handler() -> ErrorHandler {
    Arc::new(|err: &ActionError| {
        let status = err.status();
        let message = if err.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %err, "action failed");
            status.canonical_reason().to_owned()
        } else {
            tracing::debug!(status = status.as_u16(), error = %err, "request rejected");
            err.to_string()
        };

        Response::new(status).json(&json!({
            "error": {
                "code": err.code(),
                "message": message,
                "details": err.details(),
            }
        }))
    })
}
