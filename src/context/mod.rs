//! Per-request context — path parameters, request extensions, and the validated body.
//!
//! A [`Context`] is created by the router for every matched request and travels
//! through the middleware chain into the controller action.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
};

use serde::de::DeserializeOwned;
use validator::Validate;

use crate::{
    ActionError, Request,
    validation::{self, Validated},
};

/// Type-erased request extensions map — used to inject per-request state
/// into handlers without requiring handlers to know about each other's types.
#[derive(Default)]
pub struct Extensions {
    map: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any previous value of the same type.
    pub fn insert<T>(&mut self, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.map.insert(TypeId::of::<T>(), Box::new(value));
    }

    pub fn get<T>(&self) -> Option<&T>
    where
        T: Send + Sync + 'static,
    {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }

    pub fn get_mut<T>(&mut self) -> Option<&mut T>
    where
        T: Send + Sync + 'static,
    {
        self.map
            .get_mut(&TypeId::of::<T>())
            .and_then(|value| value.downcast_mut::<T>())
    }

    pub fn remove<T>(&mut self) -> Option<T>
    where
        T: Send + Sync + 'static,
    {
        self.map
            .remove(&TypeId::of::<T>())
            .and_then(|value| value.downcast::<T>().ok())
            .map(|value| *value)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Path parameters extracted from the matched route, e.g. `id` for `/users/:id`.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct PathParams {
    map: HashMap<String, String>,
}

impl PathParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: String, value: String) {
        self.map.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Everything a middleware or controller action knows about the current request.
pub struct Context {
    request: Request,
    params: PathParams,
    extensions: Extensions,
}

impl Context {
    /// Create a context with no path parameters.
    pub fn new(request: Request) -> Self {
        Self::with_params(request, PathParams::new())
    }

    /// Create a context carrying the parameters captured by the router.
    pub fn with_params(request: Request, params: PathParams) -> Self {
        Self {
            request,
            params,
            extensions: Extensions::new(),
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn params(&self) -> &PathParams {
        &self.params
    }

    /// Returns a path parameter or a `400 Bad Request` error naming the missing key.
    pub fn param(&self, key: &str) -> Result<&str, ActionError> {
        self.params
            .get(key)
            .ok_or_else(|| ActionError::bad_request(format!("missing path parameter `{key}`")))
    }

    /// Parses a path parameter, e.g. a numeric `id`.
    pub fn param_as<T: std::str::FromStr>(&self, key: &str) -> Result<T, ActionError> {
        let raw = self.param(key)?;
        raw.parse()
            .map_err(|_| ActionError::bad_request(format!("invalid path parameter `{key}`: {raw}")))
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Deserializes the request body as JSON without running validation rules.
    /// An empty body reads as `{}`, the same as for validated actions.
    pub fn json<T>(&self) -> Result<T, serde_json::Error>
    where
        T: DeserializeOwned,
    {
        validation::parse_json(self.request.body())
    }

    /// Returns the body validated by the action's validation middleware, if any.
    pub fn validated<T>(&self) -> Option<&T>
    where
        T: Send + Sync + 'static,
    {
        self.extensions.get::<Validated<T>>().map(|v| &v.0)
    }

    /// Takes the validated body out of the context.
    ///
    /// When no validation middleware ran for `T`, the body is parsed and validated here
    /// instead, so a handler can call this unconditionally.
    pub fn take_validated<T>(&mut self) -> Result<T, ActionError>
    where
        T: DeserializeOwned + Validate + Send + Sync + 'static,
    {
        if let Some(Validated(value)) = self.extensions.remove::<Validated<T>>() {
            return Ok(value);
        }
        let value: T = self.json()?;
        value.validate()?;
        Ok(value)
    }
}
