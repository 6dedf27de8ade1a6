use std::time::Duration;

use seo_writer_core::article::DEFAULT_WORD_LIMIT;
use seo_writer_core::quota::DEFAULT_MONTHLY_LIMIT;
use seo_writer_core::staleness::DEFAULT_STALENESS_SECS;

use crate::auth::jwt::JwtConfig;

/// Default dispatch timeout in seconds.
const DEFAULT_DISPATCH_TIMEOUT_SECS: u64 = 5;

/// Default interval between background reaper sweeps in seconds.
const DEFAULT_REAPER_INTERVAL_SECS: u64 = 60;

/// Server configuration loaded from environment variables.
///
/// Everything except the secrets and the worker URL has a default suitable
/// for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// PostgreSQL URL. `None` selects the in-memory stores.
    pub database_url: Option<String>,
    /// JWT token configuration (secret, expiry).
    pub jwt: JwtConfig,
    /// Outbound dispatch and inbound callback settings.
    pub worker: WorkerConfig,
    /// Job lifecycle and quota settings.
    pub jobs: JobSettings,
}

/// How to reach the worker and how the worker reaches us.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Endpoint that receives dispatch requests.
    pub webhook_url: String,
    /// Secret the worker presents in `x-webhook-secret` on callbacks.
    pub callback_secret: String,
    /// Upper bound on a single dispatch call.
    pub dispatch_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct JobSettings {
    /// Age after which a non-terminal job is failed by the reaper.
    pub staleness_secs: u64,
    /// Interval of the background reaper task.
    pub reaper_interval_secs: u64,
    /// Word limit applied when a submission omits one.
    pub default_word_limit: i32,
    /// Monthly limit for newly created quota counters.
    pub monthly_quota_limit: i32,
}

impl JobSettings {
    pub fn staleness(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.staleness_secs as i64)
    }

    pub fn reaper_interval(&self) -> Duration {
        Duration::from_secs(self.reaper_interval_secs)
    }
}

impl WorkerConfig {
    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatch_timeout_secs)
    }
}

fn env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + ToString,
{
    std::env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .unwrap_or_else(|_| panic!("{key} must be a valid {}", std::any::type_name::<T>()))
}

fn required(key: &str) -> String {
    let value = std::env::var(key).unwrap_or_else(|_| panic!("{key} must be set in the environment"));
    assert!(!value.trim().is_empty(), "{key} must not be empty");
    value
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                    |
    /// |--------------------------|----------------------------|
    /// | `HOST`                   | `0.0.0.0`                  |
    /// | `PORT`                   | `3000`                     |
    /// | `CORS_ORIGINS`           | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`   | `30`                       |
    /// | `DATABASE_URL`           | unset (in-memory stores)   |
    /// | `WORKER_WEBHOOK_URL`     | **required**               |
    /// | `WORKER_CALLBACK_SECRET` | **required**               |
    /// | `DISPATCH_TIMEOUT_SECS`  | `5`                        |
    /// | `JOB_STALENESS_SECS`     | `600`                      |
    /// | `REAPER_INTERVAL_SECS`   | `60`                       |
    /// | `DEFAULT_WORD_LIMIT`     | `1000`                     |
    /// | `MONTHLY_QUOTA_LIMIT`    | `100`                      |
    ///
    /// # Panics
    ///
    /// Panics on missing required values, unparseable numbers, or a dispatch
    /// timeout that is not strictly below the staleness threshold.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = env_or("PORT", 3000);

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = env_or("REQUEST_TIMEOUT_SECS", 30);

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let worker = WorkerConfig {
            webhook_url: required("WORKER_WEBHOOK_URL"),
            callback_secret: required("WORKER_CALLBACK_SECRET"),
            dispatch_timeout_secs: env_or("DISPATCH_TIMEOUT_SECS", DEFAULT_DISPATCH_TIMEOUT_SECS),
        };

        let jobs = JobSettings {
            staleness_secs: env_or("JOB_STALENESS_SECS", DEFAULT_STALENESS_SECS),
            reaper_interval_secs: env_or("REAPER_INTERVAL_SECS", DEFAULT_REAPER_INTERVAL_SECS),
            default_word_limit: env_or("DEFAULT_WORD_LIMIT", DEFAULT_WORD_LIMIT),
            monthly_quota_limit: env_or("MONTHLY_QUOTA_LIMIT", DEFAULT_MONTHLY_LIMIT),
        };

        let config = Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            database_url,
            jwt: JwtConfig::from_env(),
            worker,
            jobs,
        };
        config.validate();
        config
    }

    /// Cross-field checks applied after loading.
    ///
    /// # Panics
    ///
    /// Panics when the settings cannot work together.
    pub fn validate(&self) {
        assert!(
            self.worker.dispatch_timeout_secs < self.jobs.staleness_secs,
            "DISPATCH_TIMEOUT_SECS ({}) must be below JOB_STALENESS_SECS ({})",
            self.worker.dispatch_timeout_secs,
            self.jobs.staleness_secs,
        );
        assert!(self.jobs.reaper_interval_secs > 0, "REAPER_INTERVAL_SECS must be positive");
        assert!(self.jobs.default_word_limit > 0, "DEFAULT_WORD_LIMIT must be positive");
        assert!(self.jobs.monthly_quota_limit >= 0, "MONTHLY_QUOTA_LIMIT must not be negative");
    }
}
