use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;

/// Gemini REST API base URL.
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Vision-capable model used when `GEMINI_MODEL` is unset.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Canvas snapshots are sent inline as base64, so allow well past axum's 2MB default.
const DEFAULT_MAX_REQUEST_BYTES: usize = 16 * 1024 * 1024;

/// Settings read once at startup and handed to [`crate::startup::Application`].
#[derive(Debug, Clone)]
pub struct CalculatorConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub gemini: GeminiSettings,
    pub max_request_bytes: usize,
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    /// Left unset when `GEMINI_API_KEY` is missing; analysis then fails per request.
    pub api_key: Option<Secret<String>>,
    pub model: String,
    pub api_base: String,
}

/// Deployment environment tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Production => "production",
        }
    }

    pub fn default_log_level(&self) -> &'static str {
        match self {
            Environment::Dev => "debug",
            Environment::Production => "info",
        }
    }
}

impl FromStr for Environment {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Dev),
            "prod" | "production" => Ok(Environment::Production),
            other => Err(AppError::ConfigError(anyhow::anyhow!(
                "ENVIRONMENT must be 'dev' or 'production', got '{}'",
                other
            ))),
        }
    }
}

impl CalculatorConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        Self::from_vars(common, |key| env::var(key).ok())
    }

    /// Build the config from an arbitrary variable source. Blank values count
    /// as unset.
    pub fn from_vars<F>(common: core_config::Config, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let environment = match var("ENVIRONMENT") {
            Some(tag) => tag.parse()?,
            None => Environment::Dev,
        };

        let max_request_bytes = match var("MAX_REQUEST_BYTES") {
            Some(raw) => raw.parse().map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!(
                    "MAX_REQUEST_BYTES must be a byte count: {}",
                    e
                ))
            })?,
            None => DEFAULT_MAX_REQUEST_BYTES,
        };

        Ok(CalculatorConfig {
            common,
            environment,
            gemini: GeminiSettings {
                api_key: var("GEMINI_API_KEY").map(Secret::new),
                model: var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
                api_base: var("GEMINI_API_BASE")
                    .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string()),
            },
            max_request_bytes,
            otlp_endpoint: var("OTLP_ENDPOINT"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<CalculatorConfig, AppError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CalculatorConfig::from_vars(core_config::Config::default(), |key| {
            vars.get(key).cloned()
        })
    }

    #[test]
    fn defaults_without_any_variables() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.environment, Environment::Dev);
        assert!(config.gemini.api_key.is_none());
        assert_eq!(config.gemini.model, DEFAULT_GEMINI_MODEL);
        assert_eq!(config.gemini.api_base, DEFAULT_GEMINI_API_BASE);
        assert_eq!(config.max_request_bytes, DEFAULT_MAX_REQUEST_BYTES);
        assert!(config.otlp_endpoint.is_none());
    }

    #[test]
    fn reads_gemini_settings() {
        let config = config_from(&[
            ("GEMINI_API_KEY", "secret-key"),
            ("GEMINI_MODEL", "gemini-2.0-flash"),
            ("ENVIRONMENT", "production"),
        ])
        .unwrap();

        assert_eq!(config.environment, Environment::Production);
        assert_eq!(
            config.gemini.api_key.as_ref().map(|k| k.expose_secret().as_str()),
            Some("secret-key")
        );
        assert_eq!(config.gemini.model, "gemini-2.0-flash");
    }

    #[test]
    fn blank_api_key_is_treated_as_missing() {
        let config = config_from(&[("GEMINI_API_KEY", "   ")]).unwrap();
        assert!(config.gemini.api_key.is_none());
    }

    #[test]
    fn api_key_is_redacted_in_debug_output() {
        let config = config_from(&[("GEMINI_API_KEY", "secret-key")]).unwrap();
        assert!(!format!("{:?}", config).contains("secret-key"));
    }

    #[test]
    fn rejects_unknown_environment() {
        let err = config_from(&[("ENVIRONMENT", "staging")]).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[test]
    fn rejects_non_numeric_body_limit() {
        assert!(config_from(&[("MAX_REQUEST_BYTES", "lots")]).is_err());
    }

    #[test]
    fn environment_tags_are_case_insensitive() {
        assert_eq!("PROD".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("Dev".parse::<Environment>().unwrap(), Environment::Dev);
    }
}
