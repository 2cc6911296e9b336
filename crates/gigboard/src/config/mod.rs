use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

const DEFAULT_ENRICHMENT_CONCURRENCY: usize = 8;
const DEFAULT_ENRICHMENT_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_TOP_WORKERS_LIMIT: usize = 10;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the marketplace service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub ranking: RankingConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            ranking: RankingConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Tunables for the directory ranking fan-out.
///
/// The concurrency bound protects the application store from a burst of
/// reputation scans when the directory is large; it has no effect on ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankingConfig {
    pub enrichment_concurrency: usize,
    pub enrichment_timeout: Duration,
    pub default_limit: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            enrichment_concurrency: DEFAULT_ENRICHMENT_CONCURRENCY,
            enrichment_timeout: Duration::from_millis(DEFAULT_ENRICHMENT_TIMEOUT_MS),
            default_limit: DEFAULT_TOP_WORKERS_LIMIT,
        }
    }
}

impl RankingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let enrichment_concurrency = match env::var("RANKING_ENRICHMENT_CONCURRENCY") {
            Ok(raw) => match raw.trim().parse::<usize>() {
                Ok(value) if value > 0 => value,
                _ => return Err(ConfigError::InvalidConcurrency(raw)),
            },
            Err(_) => defaults.enrichment_concurrency,
        };

        let enrichment_timeout = match env::var("RANKING_ENRICHMENT_TIMEOUT_MS") {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(value) if value > 0 => Duration::from_millis(value),
                _ => return Err(ConfigError::InvalidTimeout(raw)),
            },
            Err(_) => defaults.enrichment_timeout,
        };

        let default_limit = match env::var("RANKING_DEFAULT_LIMIT") {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidLimit(raw))?,
            Err(_) => defaults.default_limit,
        };

        Ok(Self {
            enrichment_concurrency,
            enrichment_timeout,
            default_limit,
        })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidConcurrency(String),
    InvalidTimeout(String),
    InvalidLimit(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidConcurrency(raw) => write!(
                f,
                "RANKING_ENRICHMENT_CONCURRENCY must be a positive integer (found '{raw}')"
            ),
            ConfigError::InvalidTimeout(raw) => write!(
                f,
                "RANKING_ENRICHMENT_TIMEOUT_MS must be a positive number of milliseconds (found '{raw}')"
            ),
            ConfigError::InvalidLimit(raw) => write!(
                f,
                "RANKING_DEFAULT_LIMIT must be a non-negative integer (found '{raw}')"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidConcurrency(_)
            | ConfigError::InvalidTimeout(_)
            | ConfigError::InvalidLimit(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("RANKING_ENRICHMENT_CONCURRENCY");
        env::remove_var("RANKING_ENRICHMENT_TIMEOUT_MS");
        env::remove_var("RANKING_DEFAULT_LIMIT");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.ranking, RankingConfig::default());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn reads_ranking_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("RANKING_ENRICHMENT_CONCURRENCY", "3");
        env::set_var("RANKING_ENRICHMENT_TIMEOUT_MS", "250");
        env::set_var("RANKING_DEFAULT_LIMIT", "25");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.ranking.enrichment_concurrency, 3);
        assert_eq!(config.ranking.enrichment_timeout, Duration::from_millis(250));
        assert_eq!(config.ranking.default_limit, 25);
        reset_env();
    }

    #[test]
    fn rejects_zero_concurrency() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("RANKING_ENRICHMENT_CONCURRENCY", "0");
        match AppConfig::load() {
            Err(ConfigError::InvalidConcurrency(raw)) => assert_eq!(raw, "0"),
            other => panic!("expected invalid concurrency, got {other:?}"),
        }
        reset_env();
    }
}
