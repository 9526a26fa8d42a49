//! Route builder configuration.
//!
//! Values can be set in code through the builder-style setters or loaded from the
//! environment with [`RoutesConfig::from_env`]:
//!
//! ```bash
//! export ROUTES_CONTROLLERS_DIR="src/controllers"
//! export ROUTES_CONTROLLER_FILE="controller.rs"
//! export ROUTES_BASE_PATH="/api"
//! export ROUTES_ID_PARAM="id"
//! export ROUTES_REDACT_FIELDS="password,password_hash"
//! export ROUTES_STRICT="true"
//! ```
//!
//! [`RoutesConfig::load`] additionally reads a `.env` file from the working directory
//! when one exists.

use std::env;
use std::path::PathBuf;

use crate::error::ConfigError;

/// Configuration for [`RouteBuilder`](crate::builder::RouteBuilder).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutesConfig {
    /// Root of the controller folder tree. When `None`, registered controllers are
    /// mounted under a segment derived from their name.
    pub controllers_dir: Option<PathBuf>,
    /// File whose presence marks a directory as a controller folder.
    pub controller_file: String,
    /// Prefix for every generated route, e.g. `/api`.
    pub base_path: String,
    /// Parameter name used by `show`, `update` and `destroy`.
    pub id_param: String,
    /// Object keys removed from every JSON reply.
    pub redact_fields: Vec<String>,
    /// Fail the build when a controller folder has no registered controller.
    pub strict: bool,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            controllers_dir: None,
            controller_file: "controller.rs".to_string(),
            base_path: String::new(),
            id_param: "id".to_string(),
            redact_fields: vec!["password".to_string()],
            strict: true,
        }
    }
}

impl RoutesConfig {
    /// Loads `.env` (if present) and then reads the environment.
    ///
    /// # Errors
    ///
    /// See [`RoutesConfig::from_env`].
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_env()
    }

    /// Reads `ROUTES_*` variables, falling back to the defaults for unset ones.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for unparsable or invalid values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    // Shared by `from_env` and the tests, which cannot safely mutate the process env.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(dir) = lookup("ROUTES_CONTROLLERS_DIR").filter(|v| !v.trim().is_empty()) {
            config.controllers_dir = Some(PathBuf::from(dir));
        }
        if let Some(file) = lookup("ROUTES_CONTROLLER_FILE") {
            config.controller_file = file.trim().to_string();
        }
        if let Some(base) = lookup("ROUTES_BASE_PATH") {
            config.base_path = base.trim().to_string();
        }
        if let Some(id) = lookup("ROUTES_ID_PARAM") {
            config.id_param = id.trim().to_string();
        }
        if let Some(fields) = lookup("ROUTES_REDACT_FIELDS") {
            config.redact_fields = fields
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(strict) = lookup("ROUTES_STRICT") {
            config.strict = parse_bool("ROUTES_STRICT", &strict)?;
        }

        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn controllers_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.controllers_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn controller_file(mut self, name: impl Into<String>) -> Self {
        self.controller_file = name.into();
        self
    }

    #[must_use]
    pub fn base_path(mut self, base: impl Into<String>) -> Self {
        self.base_path = base.into();
        self
    }

    #[must_use]
    pub fn id_param(mut self, name: impl Into<String>) -> Self {
        self.id_param = name.into();
        self
    }

    #[must_use]
    pub fn redact_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.redact_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Checks the values that would otherwise produce broken routes.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::BasePath`] — a non-empty base path without a leading `/`.
    /// - [`ConfigError::IdParam`] — an id parameter that is not an identifier.
    /// - [`ConfigError::ControllerFile`] — an empty marker file name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.base_path.is_empty() && !self.base_path.starts_with('/') {
            return Err(ConfigError::BasePath(self.base_path.clone()));
        }

        let id_ok = !self.id_param.is_empty()
            && self
                .id_param
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !id_ok {
            return Err(ConfigError::IdParam(self.id_param.clone()));
        }

        if self.controller_file.trim().is_empty() {
            return Err(ConfigError::ControllerFile);
        }

        Ok(())
    }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidVar {
            var,
            value: value.to_string(),
            reason: "expected true or false",
        }),
    }
}
