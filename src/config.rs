use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_SCHEDULE_MULTIPLIER: u32 = 2;

/// Top-level configuration for the calculator service.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub tables: TableConfig,
    pub limits: LimitsConfig,
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Optional distribution-period table overrides.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableConfig {
    pub joint_table_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimitsConfig {
    /// Amortization schedules stop after `term * schedule_multiplier` periods.
    pub schedule_multiplier: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            schedule_multiplier: DEFAULT_SCHEDULE_MULTIPLIER,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("FINCALC_PORT must be a valid u16, got '{0}'")]
    InvalidPort(String),
    #[error("FINCALC_HOST must parse to an IPv4 or IPv6 address")]
    InvalidHost(#[from] std::net::AddrParseError),
    #[error("FINCALC_MAX_SCHEDULE_MULTIPLIER must be an integer >= 1, got '{0}'")]
    InvalidScheduleMultiplier(String),
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("FINCALC_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = match lookup("FINCALC_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw))?,
            None => DEFAULT_PORT,
        };
        let log_level = lookup("FINCALC_LOG_LEVEL").unwrap_or_else(|| "info".to_string());
        let joint_table_path = lookup("FINCALC_JOINT_TABLE")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);
        let schedule_multiplier = match lookup("FINCALC_MAX_SCHEDULE_MULTIPLIER") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(v) if v >= 1 => v,
                _ => return Err(ConfigError::InvalidScheduleMultiplier(raw)),
            },
            None => DEFAULT_SCHEDULE_MULTIPLIER,
        };

        Ok(Self {
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            tables: TableConfig { joint_table_path },
            limits: LimitsConfig {
                schedule_multiplier,
            },
        })
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }
        let ip: IpAddr = self.host.parse()?;
        Ok(SocketAddr::new(ip, self.port))
    }
}
