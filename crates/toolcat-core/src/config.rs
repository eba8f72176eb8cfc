//! Configuration for toolcat.
//!
//! Settings live in `toolcat.toml`. The file is located with the following
//! resolution order:
//!
//! 1. `TOOLCAT_CONFIG_PATH` environment variable
//! 2. Current directory
//! 3. Parent directories (walk up to filesystem root)
//! 4. XDG config directory (`~/.config/toolcat/toolcat.toml`)
//!
//! A missing file is not an error; [`Config::default`] is used instead.
//!
//! Any string value written as `env:NAME` is read from the environment
//! variable `NAME` when it is used, so secrets can stay out of the file:
//!
//! ```toml
//! [model]
//! id = "gemini-1.5-flash-8b"
//! api_key = "env:GEMINI_API_KEY"
//!
//! [backend]
//! base_url = "http://127.0.0.1:5000"
//!
//! [graph]
//! mode = "app"
//! client_id = "env:CLIENT_ID"
//! tenant_id = "env:TENANT_ID"
//! client_secret = "env:CLIENT_SECRET"
//! user_id = "7e00cad8-6276-4c23-89f7-d3ea1c5fd1b8"
//!
//! [dispatch]
//! validate_arguments = true
//! ```
//!
//! In user mode the device-code sign-in asks for [`DEFAULT_USER_SCOPES`]
//! unless `graph.user_scopes` overrides it. `Sites.Read.All` needs admin
//! consent in most tenants.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

/// Name of the configuration file searched for on disk.
pub const CONFIG_FILE_NAME: &str = "toolcat.toml";

/// Environment variable that points directly at a configuration file.
pub const CONFIG_PATH_ENV: &str = "TOOLCAT_CONFIG_PATH";

const ENV_PREFIX: &str = "env:";

/// Errors that can occur while locating, loading, or validating
/// configuration.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    /// A value is present but unusable.
    #[error("invalid value for '{field}': {reason}")]
    Invalid { field: String, reason: String },

    /// A value refers to an environment variable that is not set.
    #[error("environment variable '{var}' referenced by '{field}' is not set")]
    MissingEnv { field: String, var: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        reason: reason.into(),
    }
}

/// Reads `value`, following an `env:NAME` reference if present.
///
/// # Errors
///
/// Returns [`ConfigError::MissingEnv`] if the referenced variable is unset.
pub fn resolve_value(field: &str, value: &str) -> Result<String, ConfigError> {
    match value.strip_prefix(ENV_PREFIX) {
        Some(var) => std::env::var(var).map_err(|_| ConfigError::MissingEnv {
            field: field.to_string(),
            var: var.to_string(),
        }),
        None => Ok(value.to_string()),
    }
}

/// Project configuration from `toolcat.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Decision-maker model settings.
    pub model: ModelConfig,
    /// REST backend that serves `POST /interact`.
    pub backend: BackendConfig,
    /// Directory-service credentials and endpoints.
    pub graph: GraphConfig,
    pub dispatch: DispatchConfig,
}

impl Config {
    /// Loads and parses a config file from the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] if the file cannot be read and
    /// [`ConfigError::Parse`] if it is not valid TOML for this schema.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents =
            fs::read_to_string(path).map_err(|_e| ConfigError::NotFound(path.to_path_buf()))?;
        Ok(toml::from_str(&contents)?)
    }

    /// Loads the config found by the resolution order, or the defaults if
    /// no file exists.
    ///
    /// # Errors
    ///
    /// Returns `Err(ConfigError)` if a config file was found but could not
    /// be read or parsed.
    pub fn load_resolved() -> Result<Self, ConfigError> {
        let current = std::env::current_dir()?;
        let env_override = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);

        match resolve_path_with(env_override.as_deref(), &current, xdg_config_path()) {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Checks the sections every command depends on.
    ///
    /// Directory-service settings are checked separately with
    /// [`GraphConfig::validate`] because only some commands need them.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for the first unusable value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.model.validate()?;
        self.backend.validate()
    }
}

/// Finds the config file path following the resolution order.
///
/// `env_override` wins if it points at an existing file. Otherwise `start`
/// and its ancestors are searched for `toolcat.toml`, then `xdg` is used if
/// it exists.
#[must_use]
pub fn resolve_path_with(
    env_override: Option<&Path>,
    start: &Path,
    xdg: Option<PathBuf>,
) -> Option<PathBuf> {
    if let Some(path) = env_override
        && path.is_file()
    {
        return Some(path.to_path_buf());
    }

    if let Some(path) = start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|path| path.is_file())
    {
        return Some(path);
    }

    xdg.filter(|path| path.is_file())
}

fn xdg_config_path() -> Option<PathBuf> {
    Some(dirs::config_dir()?.join("toolcat").join(CONFIG_FILE_NAME))
}

fn check_url(field: &str, url: &str) -> Result<(), ConfigError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(invalid(field, format!("'{url}' is not an absolute http(s) URL")))
    }
}

/// Decision-maker model settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model used to choose a function.
    pub id: String,
    /// Model used for free-text completions such as inbox summaries.
    pub completion_id: String,
    pub temperature: f32,
    pub api_key: String,
    pub endpoint: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            id: "gemini-1.5-flash-8b".to_string(),
            completion_id: "gemini-2.0-flash-exp".to_string(),
            temperature: 0.0,
            api_key: "env:GEMINI_API_KEY".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }
}

impl ModelConfig {
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for an empty model id, a temperature
    /// outside `0.0..=2.0`, or a relative endpoint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id.trim().is_empty() {
            return Err(invalid("model.id", "must not be empty"));
        }
        if self.completion_id.trim().is_empty() {
            return Err(invalid("model.completion_id", "must not be empty"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(invalid(
                "model.temperature",
                format!("{} is outside 0.0..=2.0", self.temperature),
            ));
        }
        check_url("model.endpoint", &self.endpoint)
    }

    /// The API key, with any `env:` reference resolved.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnv`] if the referenced variable is
    /// unset, or [`ConfigError::Invalid`] if the key is empty.
    pub fn api_key(&self) -> Result<String, ConfigError> {
        let key = resolve_value("model.api_key", &self.api_key)?;
        if key.is_empty() {
            return Err(invalid("model.api_key", "must not be empty"));
        }
        Ok(key)
    }
}

/// REST backend settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
        }
    }
}

impl BackendConfig {
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the base URL is not absolute.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_url("backend.base_url", &self.base_url)
    }
}

/// Which identity the directory-service client acts as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// App-only access to one configured user's data.
    App,
    /// Delegated access as the signed-in user.
    #[default]
    User,
}

/// Directory-service settings.
/// Delegated scopes covering every user-mode function: mail, calendar,
/// contacts, To Do and Planner, OneDrive, and SharePoint search.
pub const DEFAULT_USER_SCOPES: &[&str] = &[
    "User.Read",
    "Mail.Read",
    "Mail.Send",
    "Calendars.Read",
    "Contacts.Read",
    "Tasks.Read",
    "Files.Read",
    "Sites.Read.All",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub mode: AuthMode,
    pub client_id: String,
    pub tenant_id: String,
    /// Required in [`AuthMode::App`].
    pub client_secret: Option<String>,
    /// User whose data is read in [`AuthMode::App`].
    pub user_id: Option<String>,
    /// Scopes requested in [`AuthMode::User`]. Narrowing this list makes
    /// the extractors for the dropped resources fail with 403.
    pub user_scopes: Vec<String>,
    pub endpoint: String,
    pub authority: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            mode: AuthMode::default(),
            client_id: "env:CLIENT_ID".to_string(),
            tenant_id: "env:TENANT_ID".to_string(),
            client_secret: None,
            user_id: None,
            user_scopes: DEFAULT_USER_SCOPES.iter().map(ToString::to_string).collect(),
            endpoint: "https://graph.microsoft.com/v1.0".to_string(),
            authority: "https://login.microsoftonline.com".to_string(),
        }
    }
}

impl GraphConfig {
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for relative URLs, an empty scope
    /// list in user mode, or app mode without a client secret or user id.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_url("graph.endpoint", &self.endpoint)?;
        check_url("graph.authority", &self.authority)?;

        match self.mode {
            AuthMode::App => {
                if self.client_secret.as_deref().is_none_or(str::is_empty) {
                    return Err(invalid("graph.client_secret", "required in app mode"));
                }
                if self.user_id.as_deref().is_none_or(str::is_empty) {
                    return Err(invalid("graph.user_id", "required in app mode"));
                }
            }
            AuthMode::User => {
                if self.user_scopes.is_empty() {
                    return Err(invalid("graph.user_scopes", "must not be empty"));
                }
            }
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnv`] if an `env:` reference is unset.
    pub fn client_id(&self) -> Result<String, ConfigError> {
        resolve_value("graph.client_id", &self.client_id)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnv`] if an `env:` reference is unset.
    pub fn tenant_id(&self) -> Result<String, ConfigError> {
        resolve_value("graph.tenant_id", &self.tenant_id)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if no secret is configured, or
    /// [`ConfigError::MissingEnv`] if an `env:` reference is unset.
    pub fn client_secret(&self) -> Result<String, ConfigError> {
        let secret = self
            .client_secret
            .as_deref()
            .ok_or_else(|| invalid("graph.client_secret", "not configured"))?;
        resolve_value("graph.client_secret", secret)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if no user id is configured, or
    /// [`ConfigError::MissingEnv`] if an `env:` reference is unset.
    pub fn user_id(&self) -> Result<String, ConfigError> {
        let user_id = self
            .user_id
            .as_deref()
            .ok_or_else(|| invalid("graph.user_id", "not configured"))?;
        resolve_value("graph.user_id", user_id)
    }
}

/// Dispatch behaviour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Check arguments against declared types, ranges, and enums before
    /// invoking a handler.
    pub validate_arguments: bool,
}

impl DispatchConfig {
    #[must_use]
    pub fn policy(self) -> crate::ArgumentPolicy {
        if self.validate_arguments {
            crate::ArgumentPolicy::Enforce
        } else {
            crate::ArgumentPolicy::PassThrough
        }
    }
}
