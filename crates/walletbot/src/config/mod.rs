use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::i18n::Language;

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
    pub wallet: WalletConfig,
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
        let log_format = match env::var("APP_LOG_FORMAT") {
            Ok(raw) => LogFormat::parse(&raw).ok_or(ConfigError::InvalidValue {
                name: "APP_LOG_FORMAT",
            })?,
            Err(_) => LogFormat::Compact,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                log_format,
            },
            wallet: WalletConfig::from_env()?,
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
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Full,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Some(Self::Compact),
            "full" => Some(Self::Full),
            _ => None,
        }
    }
}

/// Wallet defaults applied to new conversations, plus growth limits.
#[derive(Debug, Clone, PartialEq)]
pub struct WalletConfig {
    /// Opening balance credited to every new session.
    pub seed_balance: Decimal,
    /// Minutes of inactivity after which a session is discarded.
    pub session_ttl_minutes: i64,
    pub default_language: Language,
    /// Open (pending) loan applications allowed per applicant.
    pub max_pending_loans: usize,
    /// Transactions kept on each session, newest first.
    pub history_limit: usize,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            seed_balance: Decimal::from(500),
            session_ttl_minutes: 30,
            default_language: Language::English,
            max_pending_loans: 3,
            history_limit: 20,
        }
    }
}

impl WalletConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let seed_balance = read_var("WALLET_SEED_BALANCE", defaults.seed_balance)?;
        if seed_balance.is_sign_negative() {
            return Err(ConfigError::InvalidValue {
                name: "WALLET_SEED_BALANCE",
            });
        }

        let session_ttl_minutes =
            read_var("WALLET_SESSION_TTL_MINUTES", defaults.session_ttl_minutes)?;
        if session_ttl_minutes <= 0
            || chrono::Duration::try_minutes(session_ttl_minutes).is_none()
        {
            return Err(ConfigError::InvalidValue {
                name: "WALLET_SESSION_TTL_MINUTES",
            });
        }

        Ok(Self {
            seed_balance,
            session_ttl_minutes,
            default_language: read_var("WALLET_DEFAULT_LANGUAGE", defaults.default_language)?,
            max_pending_loans: read_var("WALLET_MAX_PENDING_LOANS", defaults.max_pending_loans)?,
            history_limit: read_var("WALLET_HISTORY_LIMIT", defaults.history_limit)?,
        })
    }
}

fn read_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue { name }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidValue { name: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidValue { name } => write!(f, "{name} has an invalid value"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidValue { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
