use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderValue;
use scenecast_queue::QueueConfig;
use scenecast_worker::SimulatedConfig;

/// A configuration variable could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be set")]
    Missing { var: &'static str },

    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Where job rows and the work queue live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueBackend {
    /// In-memory store with an in-process FIFO. State is lost on restart.
    Memory,
    /// PostgreSQL store polled for queued rows.
    Postgres,
}

impl FromStr for QueueBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => Err(format!("expected 'memory' or 'postgres', got '{other}'")),
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
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("expected 'pretty' or 'json', got '{other}'")),
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development except
/// `DATABASE_URL`, which is required by the `postgres` backend.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for in-flight jobs (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// WebSocket ping interval (default: `30`).
    pub heartbeat_interval_secs: u64,
    pub queue_backend: QueueBackend,
    pub database_url: Option<String>,
    /// Worker pool size; `0` means unbounded (default: `4`).
    pub max_concurrency: usize,
    pub poll_interval_ms: u64,
    /// Per-job watchdog; `0` disables it (default).
    pub job_timeout_secs: u64,
    pub recover_on_start: bool,
    pub sim_steps: u32,
    pub sim_step_delay_ms: u64,
    /// Directory holding uploaded video blobs.
    pub upload_dir: String,
    pub max_upload_bytes: usize,
    /// Submit a `scene_detection` job for every upload unless the form
    /// overrides it (default: `true`).
    pub auto_detect_scenes: bool,
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            cors_origins: vec!["http://localhost:5173".into()],
            request_timeout_secs: 30,
            shutdown_timeout_secs: 30,
            heartbeat_interval_secs: 30,
            queue_backend: QueueBackend::Memory,
            database_url: None,
            max_concurrency: 4,
            poll_interval_ms: 1000,
            job_timeout_secs: 0,
            recover_on_start: true,
            sim_steps: 10,
            sim_step_delay_ms: 500,
            upload_dir: "storage/uploads".into(),
            max_upload_bytes: 512 * 1024 * 1024,
            auto_detect_scenes: true,
            log_format: LogFormat::Pretty,
        }
    }
}

/// Parse `var` with `FromStr`, keeping `default` when unset or blank.
fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        Some(value) if !value.trim().is_empty() => {
            value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                var,
                value: value.clone(),
                reason: e.to_string(),
            })
        }
        _ => Ok(default),
    }
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                   | Default                 |
    /// |---------------------------|-------------------------|
    /// | `HOST`                    | `0.0.0.0`               |
    /// | `PORT`                    | `3000`                  |
    /// | `CORS_ORIGINS`            | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`    | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`   | `30`                    |
    /// | `HEARTBEAT_INTERVAL_SECS` | `30`                    |
    /// | `QUEUE_BACKEND`           | `memory`                |
    /// | `DATABASE_URL`            | required for `postgres` |
    /// | `QUEUE_MAX_CONCURRENCY`   | `4`                     |
    /// | `QUEUE_POLL_INTERVAL_MS`  | `1000`                  |
    /// | `QUEUE_RECOVER_ON_START`  | `true`                  |
    /// | `JOB_TIMEOUT_SECS`        | `0`                     |
    /// | `SIM_STEPS`               | `10`                    |
    /// | `SIM_STEP_DELAY_MS`       | `500`                   |
    /// | `UPLOAD_DIR`              | `storage/uploads`       |
    /// | `MAX_UPLOAD_BYTES`        | `536870912`             |
    /// | `AUTO_DETECT_SCENES`      | `true`                  |
    /// | `LOG_FORMAT`              | `pretty`                |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let host = lookup("HOST")
            .filter(|h| !h.trim().is_empty())
            .unwrap_or(defaults.host);

        let cors_origins = match lookup("CORS_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => defaults.cors_origins,
        };
        for origin in &cors_origins {
            HeaderValue::from_str(origin).map_err(|e| ConfigError::Invalid {
                var: "CORS_ORIGINS",
                value: origin.clone(),
                reason: e.to_string(),
            })?;
        }

        let queue_backend = parse_var(&lookup, "QUEUE_BACKEND", defaults.queue_backend)?;
        let database_url = lookup("DATABASE_URL").filter(|u| !u.trim().is_empty());
        if queue_backend == QueueBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing {
                var: "DATABASE_URL",
            });
        }

        let sim_steps = parse_var(&lookup, "SIM_STEPS", defaults.sim_steps)?;
        if sim_steps == 0 {
            return Err(ConfigError::Invalid {
                var: "SIM_STEPS",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }

        Ok(Self {
            host,
            port: parse_var(&lookup, "PORT", defaults.port)?,
            cors_origins,
            request_timeout_secs: parse_var(
                &lookup,
                "REQUEST_TIMEOUT_SECS",
                defaults.request_timeout_secs,
            )?,
            shutdown_timeout_secs: parse_var(
                &lookup,
                "SHUTDOWN_TIMEOUT_SECS",
                defaults.shutdown_timeout_secs,
            )?,
            heartbeat_interval_secs: parse_var(
                &lookup,
                "HEARTBEAT_INTERVAL_SECS",
                defaults.heartbeat_interval_secs,
            )?
            .max(1),
            queue_backend,
            database_url,
            max_concurrency: parse_var(&lookup, "QUEUE_MAX_CONCURRENCY", defaults.max_concurrency)?,
            poll_interval_ms: parse_var(&lookup, "QUEUE_POLL_INTERVAL_MS", defaults.poll_interval_ms)?
                .max(1),
            job_timeout_secs: parse_var(&lookup, "JOB_TIMEOUT_SECS", defaults.job_timeout_secs)?,
            recover_on_start: parse_var(
                &lookup,
                "QUEUE_RECOVER_ON_START",
                defaults.recover_on_start,
            )?,
            sim_steps,
            sim_step_delay_ms: parse_var(&lookup, "SIM_STEP_DELAY_MS", defaults.sim_step_delay_ms)?,
            upload_dir: lookup("UPLOAD_DIR")
                .filter(|d| !d.trim().is_empty())
                .unwrap_or(defaults.upload_dir),
            max_upload_bytes: parse_var(&lookup, "MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            auto_detect_scenes: parse_var(
                &lookup,
                "AUTO_DETECT_SCENES",
                defaults.auto_detect_scenes,
            )?,
            log_format: parse_var(&lookup, "LOG_FORMAT", defaults.log_format)?,
        })
    }

    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            max_concurrency: self.max_concurrency,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            job_timeout: (self.job_timeout_secs > 0)
                .then(|| Duration::from_secs(self.job_timeout_secs)),
            recover_on_start: self.recover_on_start,
        }
    }

    pub fn simulated_config(&self) -> SimulatedConfig {
        SimulatedConfig {
            steps: self.sim_steps,
            step_delay: Duration::from_millis(self.sim_step_delay_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|var| map.get(var).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.queue_backend, QueueBackend::Memory);
        assert_eq!(config.max_concurrency, 4);
        assert_eq!(config.max_upload_bytes, 536_870_912);
        assert!(config.auto_detect_scenes);
        assert!(config.queue_config().job_timeout.is_none());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("PORT", "8080"),
            ("CORS_ORIGINS", "http://a.test, http://b.test,"),
            ("QUEUE_MAX_CONCURRENCY", "0"),
            ("JOB_TIMEOUT_SECS", "90"),
            ("LOG_FORMAT", "json"),
            ("AUTO_DETECT_SCENES", "false"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert_eq!(config.queue_config().max_concurrency, 0);
        assert_eq!(config.queue_config().job_timeout, Some(Duration::from_secs(90)));
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(!config.auto_detect_scenes);
    }

    #[test]
    fn invalid_value_names_the_variable() {
        let err = load(&[("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "PORT", .. }));
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn postgres_backend_requires_database_url() {
        let err = load(&[("QUEUE_BACKEND", "postgres")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { var: "DATABASE_URL" }));

        let config = load(&[
            ("QUEUE_BACKEND", "postgres"),
            ("DATABASE_URL", "postgres://localhost/scenecast"),
        ])
        .unwrap();
        assert_eq!(config.queue_backend, QueueBackend::Postgres);
    }

    #[test]
    fn zero_sim_steps_is_rejected() {
        assert!(load(&[("SIM_STEPS", "0")]).is_err());
    }
}
