//! Environment-driven configuration for the gateway binary.
//!
//! All knobs are read once at startup into [`GatewayConfig`]; a missing
//! upstream URL or credential aborts bootstrap instead of surfacing later as
//! a per-request failure.

use std::{env, time::Duration};

use thiserror::Error;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_RATE_LIMIT_MAX_REQUESTS: u32 = 100;
pub const DEFAULT_RATE_LIMIT_WINDOW: Duration = Duration::from_secs(900);

/// Whether internal fault details may be echoed back to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeMode {
    Development,
    Production,
}

impl RuntimeMode {
    fn from_label(label: Option<&str>) -> Self {
        match label {
            Some(value) if value.eq_ignore_ascii_case("development") => Self::Development,
            _ => Self::Production,
        }
    }

    pub fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    movie_api_base_url: String,
    movie_api_key: String,
    host: String,
    port: u16,
    rate_limit_max_requests: u32,
    rate_limit_window: Duration,
    mode: RuntimeMode,
}

impl GatewayConfig {
    /// Builds a configuration with defaults for everything except the two
    /// upstream settings. Blank values are rejected the same way the
    /// environment loader rejects them.
    pub fn new(
        movie_api_base_url: impl Into<String>,
        movie_api_key: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let movie_api_base_url = non_blank(movie_api_base_url.into()).ok_or(
            ConfigError::MissingVar {
                key: "MOVIE_API_BASE_URL",
            },
        )?;
        let movie_api_key = non_blank(movie_api_key.into()).ok_or(ConfigError::MissingVar {
            key: "MOVIE_API_KEY",
        })?;

        Ok(Self {
            movie_api_base_url,
            movie_api_key,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            rate_limit_max_requests: DEFAULT_RATE_LIMIT_MAX_REQUESTS,
            rate_limit_window: DEFAULT_RATE_LIMIT_WINDOW,
            mode: RuntimeMode::Production,
        })
    }

    /// Hydrates `.env` (if present) and reads the process variables. Missing
    /// or malformed entries surface as `ConfigError` so the binary can refuse
    /// to start.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        hydrate_env_file()?;

        let mut config = Self::new(
            get_required_var("MOVIE_API_BASE_URL")?,
            get_required_var("MOVIE_API_KEY")?,
        )?;

        if let Some(host) = get_optional_var("HOST") {
            config.host = host;
        }
        if let Some(port) = parse_optional::<u16>("PORT")? {
            config.port = port;
        }
        if let Some(points) = parse_optional::<u32>("RATE_LIMIT_MAX_REQUESTS")? {
            let window = config.rate_limit_window;
            config = config.with_rate_limit(points, window)?;
        }
        if let Some(window_ms) = parse_optional::<u64>("RATE_LIMIT_WINDOW_MS")? {
            if window_ms == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "RATE_LIMIT_WINDOW_MS",
                    reason: "must be greater than zero",
                });
            }
            config.rate_limit_window = Duration::from_millis(window_ms);
        }
        config.mode = RuntimeMode::from_label(get_optional_var("APP_ENV").as_deref());

        Ok(config)
    }

    pub fn with_rate_limit(
        mut self,
        max_requests: u32,
        window: Duration,
    ) -> Result<Self, ConfigError> {
        if max_requests == 0 {
            return Err(ConfigError::InvalidValue {
                key: "RATE_LIMIT_MAX_REQUESTS",
                reason: "must be greater than zero",
            });
        }
        if window.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "RATE_LIMIT_WINDOW_MS",
                reason: "must be greater than zero",
            });
        }
        self.rate_limit_max_requests = max_requests;
        self.rate_limit_window = window;
        Ok(self)
    }

    pub fn with_mode(mut self, mode: RuntimeMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_listener(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    pub fn movie_api_base_url(&self) -> &str {
        &self.movie_api_base_url
    }

    pub fn movie_api_key(&self) -> &str {
        &self.movie_api_key
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }

    pub fn rate_limit_max_requests(&self) -> u32 {
        self.rate_limit_max_requests
    }

    pub fn rate_limit_window(&self) -> Duration {
        self.rate_limit_window
    }

    pub fn mode(&self) -> RuntimeMode {
        self.mode
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn get_required_var(key: &'static str) -> Result<String, ConfigError> {
    env::var(key)
        .ok()
        .and_then(non_blank)
        .ok_or(ConfigError::MissingVar { key })
}

fn get_optional_var(key: &'static str) -> Option<String> {
    env::var(key).ok().and_then(non_blank)
}

fn parse_optional<T>(key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr<Err = std::num::ParseIntError>,
{
    get_optional_var(key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|source| ConfigError::InvalidNumber { key, source })
        })
        .transpose()
}

pub fn hydrate_env_file() -> Result<(), ConfigError> {
    if env::var_os("MOVIE_GATEWAY_SKIP_DOTENV").is_some() {
        return Ok(());
    }
    match dotenvy::dotenv() {
        Ok(_) => {}
        Err(dotenvy::Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(ConfigError::Dotenv { source: err }),
    }

    Ok(())
}

/// Errors emitted when `.env` hydration or environment parsing fails.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable `{key}`")]
    MissingVar { key: &'static str },
    #[error("invalid integer in `{key}`: {source}")]
    InvalidNumber {
        key: &'static str,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("invalid value in `{key}`: {reason}")]
    InvalidValue {
        key: &'static str,
        reason: &'static str,
    },
    #[error("failed to load .env file: {source}")]
    Dotenv {
        #[from]
        source: dotenvy::Error,
    },
}
