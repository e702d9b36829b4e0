use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::ops::RangeInclusive;

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

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub voting: VotingConfig,
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

        let voting = VotingConfig::from_env()?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            voting,
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

/// Dials governing the voting surface.
///
/// The resubmission threshold is a heuristic inherited from production
/// behavior; it stays configurable rather than baked in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VotingConfig {
    pub min_rating: u8,
    pub max_rating: u8,
    pub thank_you_millis: u64,
    pub resubmission_threshold_minutes: i64,
}

const DEFAULT_THANK_YOU_MILLIS: u64 = 1200;
const DEFAULT_RESUBMISSION_THRESHOLD_MINUTES: i64 = 5;

impl VotingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let thank_you_millis = match env::var("APP_THANK_YOU_MS") {
            Ok(raw) => raw
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidDuration { key: "APP_THANK_YOU_MS" })?,
            Err(_) => DEFAULT_THANK_YOU_MILLIS,
        };

        let resubmission_threshold_minutes = match env::var("APP_RESUBMIT_THRESHOLD_MIN") {
            Ok(raw) => raw.parse::<i64>().map_err(|_| ConfigError::InvalidDuration {
                key: "APP_RESUBMIT_THRESHOLD_MIN",
            })?,
            Err(_) => DEFAULT_RESUBMISSION_THRESHOLD_MINUTES,
        };

        Ok(Self {
            thank_you_millis,
            resubmission_threshold_minutes,
            ..Self::default()
        })
    }

    pub fn rating_bounds(&self) -> RangeInclusive<u8> {
        self.min_rating..=self.max_rating
    }

    pub fn thank_you_delay(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.thank_you_millis as i64)
    }

    pub fn resubmission_threshold(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.resubmission_threshold_minutes)
    }
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self {
            min_rating: 1,
            max_rating: 10,
            thank_you_millis: DEFAULT_THANK_YOU_MILLIS,
            resubmission_threshold_minutes: DEFAULT_RESUBMISSION_THRESHOLD_MINUTES,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidDuration { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidDuration { key } => {
                write!(f, "{key} must be a non-negative integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidDuration { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
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
        env::remove_var("APP_THANK_YOU_MS");
        env::remove_var("APP_RESUBMIT_THRESHOLD_MIN");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.voting.thank_you_millis, 1200);
        assert_eq!(config.voting.resubmission_threshold_minutes, 5);
    }

    #[test]
    fn voting_overrides_are_honored() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_THANK_YOU_MS", "900");
        env::set_var("APP_RESUBMIT_THRESHOLD_MIN", "10");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.voting.thank_you_millis, 900);
        assert_eq!(
            config.voting.resubmission_threshold(),
            chrono::Duration::minutes(10)
        );
    }

    #[test]
    fn invalid_thank_you_duration_is_rejected() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_THANK_YOU_MS", "soon");
        match AppConfig::load() {
            Err(ConfigError::InvalidDuration { key }) => assert_eq!(key, "APP_THANK_YOU_MS"),
            other => panic!("expected duration error, got {other:?}"),
        }
    }

    #[test]
    fn rating_bounds_cover_the_ten_point_scale() {
        let config = VotingConfig::default();
        assert!(config.rating_bounds().contains(&1));
        assert!(config.rating_bounds().contains(&10));
        assert!(!config.rating_bounds().contains(&0));
        assert!(!config.rating_bounds().contains(&11));
    }
}
