use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

/// Runtime configuration resolved from environment variables.
///
/// Every value has a default; unparsable values fall back to the default
/// rather than aborting startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the HTTP listener binds to
    pub port: u16,

    /// Deployment environment name, informational only
    pub environment: String,

    /// CORS allowed origin, `*` for any
    pub cors_origin: String,

    /// Rate limit window duration
    pub rate_limit_window: Duration,

    /// Maximum requests per client per window
    pub rate_limit_max: u32,

    /// Cadence of the expired rate-limit record sweep
    pub cleanup_interval: Duration,

    /// How long in-flight requests may drain after a termination signal
    pub shutdown_grace: Duration,

    /// Base URL of the sentiment inference collaborator
    pub sentiment_api_url: String,

    /// Default log level when RUST_LOG is not set
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            environment: "development".to_string(),
            cors_origin: "*".to_string(),
            rate_limit_window: Duration::from_millis(900_000),
            rate_limit_max: 100,
            cleanup_interval: Duration::from_secs(300),
            shutdown_grace: Duration::from_secs(10),
            sentiment_api_url: "http://127.0.0.1:8600".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Self {
            port: env_parse("PORT", defaults.port),
            environment: env_string("APP_ENV", &defaults.environment),
            cors_origin: env_string("CORS_ORIGIN", &defaults.cors_origin),
            rate_limit_window: Duration::from_millis(env_parse(
                "RATE_LIMIT_WINDOW",
                defaults.rate_limit_window.as_millis() as u64,
            )),
            rate_limit_max: env_parse("RATE_LIMIT_MAX", defaults.rate_limit_max),
            cleanup_interval: Duration::from_secs(env_parse(
                "CLEANUP_INTERVAL",
                defaults.cleanup_interval.as_secs(),
            )),
            shutdown_grace: Duration::from_secs(env_parse(
                "SHUTDOWN_GRACE_PERIOD",
                defaults.shutdown_grace.as_secs(),
            )),
            sentiment_api_url: env_string("SENTIMENT_API_URL", &defaults.sentiment_api_url),
            log_level: env_string("LOG_LEVEL", &defaults.log_level),
        }
    }
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
{
    match env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, default = %default, "invalid value, using default");
                default
            }
        },
        Err(_) => default,
    }
}
