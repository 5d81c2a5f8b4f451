//! Environment loader.
//!
//! This module provides the [`ConfigLoader`], which reads the storefront's
//! variables from an [`EnvSource`] and validates them.

use std::path::PathBuf;

use crate::source::{EnvSource, ProcessEnv};
use crate::{ConfigError, Environment, LogFormat, StorefrontConfig};

/// Environment variable names.
pub mod vars {
    /// Backend service base URL (required).
    pub const BACKEND_URL: &str = "BACKEND_URL";
    /// Backend service API key (required).
    pub const BACKEND_KEY: &str = "BACKEND_KEY";
    /// Session signing secret (required).
    pub const SESSION_SECRET: &str = "SESSION_SECRET";
    /// Listen port.
    pub const PORT: &str = "PORT";
    /// Listen host.
    pub const HOST: &str = "HOST";
    /// Deployment environment name.
    pub const ENVIRONMENT_NAME: &str = "ENVIRONMENT_NAME";
    /// Static asset root.
    pub const STATIC_DIR: &str = "STATIC_DIR";
    /// Log filter directive.
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
    /// Log output format (`json` or `pretty`).
    pub const LOG_FORMAT: &str = "LOG_FORMAT";

    /// Required variables, in the order they are reported.
    pub const REQUIRED: [&str; 3] = [BACKEND_URL, BACKEND_KEY, SESSION_SECRET];
}

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_STATIC_DIR: &str = "public";

/// Loads [`StorefrontConfig`] from an environment source.
///
/// # Example
///
/// ```no_run
/// use storefront_config::ConfigLoader;
///
/// # fn main() -> Result<(), storefront_config::ConfigError> {
/// let config = ConfigLoader::new().with_dotenv().load()?;
/// # Ok(())
/// # }
/// ```
pub struct ConfigLoader {
    source: Box<dyn EnvSource>,
    dotenv: Option<DotenvStatus>,
}

/// Outcome of looking for a `.env` file.
///
/// Loading happens before logging is installed, so the loader only records
/// the outcome; [`DotenvStatus::log`] emits it later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DotenvStatus {
    /// The file at this path was loaded.
    Loaded(PathBuf),
    /// No file was found.
    NotFound,
    /// A file was found but could not be read or parsed.
    Failed(String),
}

impl DotenvStatus {
    fn from_result(result: dotenvy::Result<PathBuf>) -> Self {
        match result {
            Ok(path) => Self::Loaded(path),
            Err(e) if e.not_found() => Self::NotFound,
            Err(e) => Self::Failed(e.to_string()),
        }
    }

    /// Logs the outcome.
    pub fn log(&self) {
        match self {
            Self::Loaded(path) => tracing::debug!(path = %path.display(), "loaded .env file"),
            Self::NotFound => tracing::debug!("no .env file found"),
            Self::Failed(error) => tracing::warn!(error = %error, "failed to load .env file"),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConfigLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigLoader").finish_non_exhaustive()
    }
}

impl ConfigLoader {
    /// Create a loader reading the process environment.
    #[must_use]
    pub fn new() -> Self {
        Self::from_source(ProcessEnv)
    }

    /// Create a loader reading from the given source.
    #[must_use]
    pub fn from_source(source: impl EnvSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            dotenv: None,
        }
    }

    /// Load a `.env` file into the process environment.
    ///
    /// A missing file is not an error. Variables already set in the process
    /// environment win over the file.
    #[must_use]
    pub fn with_dotenv(mut self) -> Self {
        self.dotenv = Some(DotenvStatus::from_result(dotenvy::dotenv()));
        self
    }

    /// Like [`with_dotenv`](Self::with_dotenv), for a specific file.
    #[must_use]
    pub fn with_dotenv_file(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let result = dotenvy::from_path(&path).map(|()| path);
        self.dotenv = Some(DotenvStatus::from_result(result));
        self
    }

    /// The `.env` outcome, if a file was looked for.
    #[must_use]
    pub const fn dotenv_status(&self) -> Option<&DotenvStatus> {
        self.dotenv.as_ref()
    }

    /// Validate and return the configuration.
    ///
    /// Required variables are checked first and every missing one is
    /// reported together.
    pub fn load(&self) -> Result<StorefrontConfig, ConfigError> {
        let missing: Vec<&str> = vars::REQUIRED
            .iter()
            .copied()
            .filter(|key| self.non_blank(key).is_none())
            .collect();

        if !missing.is_empty() {
            return Err(ConfigError::missing_variables(missing));
        }

        let backend_url = self.required(vars::BACKEND_URL)?;
        let backend_key = self.required(vars::BACKEND_KEY)?;
        let session_secret = self.required(vars::SESSION_SECRET)?;

        let environment = self
            .non_blank(vars::ENVIRONMENT_NAME)
            .map_or_else(Environment::default, |name| Environment::from_name(&name));

        let port = match self.non_blank(vars::PORT) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| {
                ConfigError::invalid_value(vars::PORT, format!("expected a port number, got '{raw}'"))
            })?,
            None => DEFAULT_PORT,
        };

        let host = self
            .non_blank(vars::HOST)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let static_dir = PathBuf::from(
            self.non_blank(vars::STATIC_DIR)
                .unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string()),
        );

        let log_level = self.non_blank(vars::LOG_LEVEL).unwrap_or_else(|| {
            if environment.is_development() {
                "debug".to_string()
            } else {
                "info".to_string()
            }
        });

        let log_format = match self.non_blank(vars::LOG_FORMAT) {
            Some(raw) => parse_log_format(&raw).ok_or_else(|| {
                ConfigError::invalid_value(vars::LOG_FORMAT, "expected 'json' or 'pretty'")
            })?,
            None => LogFormat::default_for(environment),
        };

        Ok(StorefrontConfig {
            backend_url,
            backend_key,
            session_secret,
            environment,
            host,
            port,
            static_dir,
            log_level,
            log_format,
        })
    }

    // Value of `key` unless unset or whitespace-only
    fn non_blank(&self, key: &str) -> Option<String> {
        self.source.get(key).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.non_blank(key)
            .ok_or_else(|| ConfigError::missing_variables([key]))
    }
}

fn parse_log_format(value: &str) -> Option<LogFormat> {
    match value.trim().to_ascii_lowercase().as_str() {
        "json" => Some(LogFormat::Json),
        "pretty" | "text" => Some(LogFormat::Pretty),
        _ => None,
    }
}
