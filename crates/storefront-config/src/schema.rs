//! Configuration types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development. Error details are exposed to clients.
    #[default]
    Development,
    /// Automated tests.
    Test,
    /// Production. Error details stay in the logs.
    Production,
}

impl Environment {
    /// Maps an `ENVIRONMENT_NAME` value. Unknown names are development.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "test" => Self::Test,
            _ => Self::Development,
        }
    }

    /// Returns true in production.
    #[must_use]
    pub const fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Returns true in development.
    #[must_use]
    pub const fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Test => "test",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs (production).
    Json,
    /// Human-readable pretty format (development).
    Pretty,
}

impl LogFormat {
    /// Default format for an environment.
    #[must_use]
    pub const fn default_for(environment: Environment) -> Self {
        if environment.is_production() {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Validated storefront configuration.
///
/// Immutable once loaded. `Debug` never prints the backend key or the
/// session secret.
#[derive(Clone, PartialEq, Eq)]
pub struct StorefrontConfig {
    /// Base URL of the backend data/auth service.
    pub backend_url: String,
    /// API key for the backend service.
    pub backend_key: String,
    /// Secret used to sign session cookies.
    pub session_secret: String,
    /// Deployment environment.
    pub environment: Environment,
    /// Listen host.
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// Root directory for static assets.
    pub static_dir: PathBuf,
    /// Log filter directive.
    pub log_level: String,
    /// Log output format.
    pub log_format: LogFormat,
}

impl StorefrontConfig {
    /// `host:port` listen address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns true in production.
    #[must_use]
    pub const fn is_production(&self) -> bool {
        self.environment.is_production()
    }

    /// Startup summary with secrets replaced by `***`.
    #[must_use]
    pub fn redacted_summary(&self) -> Vec<(&'static str, String)> {
        vec![
            ("ENVIRONMENT_NAME", self.environment.to_string()),
            ("BACKEND_URL", redact(&self.backend_url)),
            ("BACKEND_KEY", redact(&self.backend_key)),
            ("SESSION_SECRET", redact(&self.session_secret)),
            ("HOST", self.host.clone()),
            ("PORT", self.port.to_string()),
            ("STATIC_DIR", self.static_dir.display().to_string()),
        ]
    }
}

fn redact(value: &str) -> String {
    if value.is_empty() {
        "Not set".to_string()
    } else {
        "***".to_string()
    }
}

impl fmt::Debug for StorefrontConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorefrontConfig")
            .field("backend_url", &self.backend_url)
            .field("backend_key", &"***")
            .field("session_secret", &"***")
            .field("environment", &self.environment)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("static_dir", &self.static_dir)
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StorefrontConfig {
        StorefrontConfig {
            backend_url: "https://db.example".to_string(),
            backend_key: "key-123".to_string(),
            session_secret: "secret-456".to_string(),
            environment: Environment::Production,
            host: "127.0.0.1".to_string(),
            port: 8080,
            static_dir: PathBuf::from("public"),
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
        }
    }

    #[test]
    fn test_environment_from_name() {
        assert_eq!(Environment::from_name("production"), Environment::Production);
        assert_eq!(Environment::from_name("PROD"), Environment::Production);
        assert_eq!(Environment::from_name("test"), Environment::Test);
        assert_eq!(Environment::from_name("staging"), Environment::Development);
        assert_eq!(Environment::from_name(""), Environment::Development);
    }

    #[test]
    fn test_default_log_format() {
        assert_eq!(LogFormat::default_for(Environment::Production), LogFormat::Json);
        assert_eq!(LogFormat::default_for(Environment::Development), LogFormat::Pretty);
    }

    #[test]
    fn test_debug_hides_secrets() {
        let debug = format!("{:?}", sample());
        assert!(!debug.contains("key-123"));
        assert!(!debug.contains("secret-456"));
        assert!(debug.contains("https://db.example"));
    }

    #[test]
    fn test_redacted_summary() {
        let summary = sample().redacted_summary();
        let lookup = |k: &str| summary.iter().find(|(key, _)| *key == k).map(|(_, v)| v.clone());
        assert_eq!(lookup("BACKEND_KEY").as_deref(), Some("***"));
        assert_eq!(lookup("SESSION_SECRET").as_deref(), Some("***"));
        assert_eq!(lookup("PORT").as_deref(), Some("8080"));
    }

    #[test]
    fn test_bind_addr() {
        assert_eq!(sample().bind_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_environment_serializes_lowercase() {
        let json = serde_json::to_string(&Environment::Production).unwrap();
        assert_eq!(json, "\"production\"");
    }
}
