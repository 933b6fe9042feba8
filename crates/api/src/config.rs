use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderValue;

/// Configuration could not be loaded from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be set")]
    Missing { var: &'static str },

    #[error("{var} has an invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Where telemetry records go after a successful compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryMode {
    /// Insert within the request, before responding.
    Inline,
    /// Enqueue and let a background writer insert.
    Deferred,
}

impl FromStr for TelemetryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inline" => Ok(Self::Inline),
            "deferred" => Ok(Self::Deferred),
            other => Err(format!("expected 'inline' or 'deferred', got '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("expected 'pretty' or 'json', got '{other}'")),
        }
    }
}

/// Compiler binary and job storage settings.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Path to the Tailwind CLI binary.
    pub binary: PathBuf,
    /// Version string recorded with telemetry.
    pub version: String,
    /// Root directory for job workspaces.
    pub storage_root: PathBuf,
    /// Maximum wall-clock time of one compiler run.
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub mode: TelemetryMode,
    /// Capacity of the deferred queue.
    pub queue_capacity: usize,
}

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `120`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for queued telemetry to drain (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Postgres connection string (required).
    pub database_url: String,
    /// Target of `GET /`.
    pub redirect_url: String,
    pub log_format: LogFormat,
    pub compiler: CompilerConfig,
    pub telemetry: TelemetryConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                   |
    /// |----------------------------|---------------------------|
    /// | `HOST`                     | `0.0.0.0`                 |
    /// | `PORT`                     | `3000`                    |
    /// | `CORS_ORIGINS`             | `http://localhost:5173`   |
    /// | `REQUEST_TIMEOUT_SECS`     | `120`                     |
    /// | `SHUTDOWN_TIMEOUT_SECS`    | `30`                      |
    /// | `DATABASE_URL`             | required                  |
    /// | `REDIRECT_URL`             | `https://tailwindcss.com` |
    /// | `LOG_FORMAT`               | `pretty`                  |
    /// | `TAILWIND_BIN`             | `./bin/tailwindcss`       |
    /// | `TAILWIND_VERSION`         | `3.2.4`                   |
    /// | `STORAGE_ROOT`             | `./var/jobs`              |
    /// | `COMPILER_TIMEOUT_SECS`    | `60`                      |
    /// | `TELEMETRY_MODE`           | `deferred`                |
    /// | `TELEMETRY_QUEUE_CAPACITY` | `1024`                    |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let cors_origins: Vec<String> = env
            .string("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        for origin in &cors_origins {
            if let Err(e) = origin.parse::<HeaderValue>() {
                return Err(ConfigError::Invalid {
                    var: "CORS_ORIGINS",
                    value: origin.clone(),
                    reason: e.to_string(),
                });
            }
        }

        let compiler = CompilerConfig {
            binary: env.string("TAILWIND_BIN", "./bin/tailwindcss").into(),
            version: env.string("TAILWIND_VERSION", "3.2.4"),
            storage_root: env.string("STORAGE_ROOT", "./var/jobs").into(),
            timeout: Duration::from_secs(env.parse("COMPILER_TIMEOUT_SECS", 60u64)?),
        };

        let telemetry = TelemetryConfig {
            mode: env.parse("TELEMETRY_MODE", TelemetryMode::Deferred)?,
            queue_capacity: env.parse("TELEMETRY_QUEUE_CAPACITY", 1024usize)?,
        };

        Ok(Self {
            host: env.string("HOST", "0.0.0.0"),
            port: env.parse("PORT", 3000u16)?,
            cors_origins,
            request_timeout_secs: env.parse("REQUEST_TIMEOUT_SECS", 120u64)?,
            shutdown_timeout_secs: env.parse("SHUTDOWN_TIMEOUT_SECS", 30u64)?,
            database_url: env.required("DATABASE_URL")?,
            redirect_url: env.string("REDIRECT_URL", "https://tailwindcss.com"),
            log_format: env.parse("LOG_FORMAT", LogFormat::Pretty)?,
            compiler,
            telemetry,
        })
    }
}

struct Env<'a, F>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    fn string(&self, var: &str, default: &str) -> String {
        (self.0)(var).unwrap_or_else(|| default.to_string())
    }

    fn required(&self, var: &'static str) -> Result<String, ConfigError> {
        (self.0)(var)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing { var })
    }

    fn parse<T>(&self, var: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match (self.0)(var) {
            None => Ok(default),
            Some(value) => {
                let parsed = value.trim().parse::<T>();
                parsed.map_err(|e| ConfigError::Invalid {
                    var,
                    reason: e.to_string(),
                    value,
                })
            }
        }
    }
}
