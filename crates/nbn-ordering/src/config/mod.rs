use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::workflows::ordering::{
    FulfillmentSettings, OrderWorkerConfig, PlanType, UnknownPlanType, WorkerPoolConfig,
};

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

/// Top-level configuration for the order worker service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub gateway: GatewayConfig,
    pub workers: WorkerConfig,
    pub registry: RegistryConfig,
    pub qualifying_plan: PlanType,
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

        let endpoint = env::var("NBN_ORDER_ENDPOINT")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        let timeout_secs =
            parse_positive("NBN_ORDER_TIMEOUT_SECS", 30).ok_or(ConfigError::InvalidTimeout)?;

        let qualifying_plan = env::var("NBN_QUALIFYING_PLAN_TYPE")
            .unwrap_or_else(|_| "nbn".to_string())
            .parse::<PlanType>()
            .map_err(|source| ConfigError::InvalidPlanType { source })?;

        let concurrency = parse_positive("ORDER_WORKER_CONCURRENCY", 4)
            .ok_or(ConfigError::InvalidConcurrency)?;
        let sweep_secs = env::var("ORDER_SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| "300".to_string())
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidSweepInterval)?;

        let registry_path = env::var("APPLICATION_REGISTRY_PATH")
            .unwrap_or_else(|_| "data/applications.json".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            gateway: GatewayConfig {
                endpoint,
                timeout: Duration::from_secs(timeout_secs),
            },
            workers: WorkerConfig {
                concurrency: concurrency as usize,
                sweep_interval: (sweep_secs > 0).then(|| Duration::from_secs(sweep_secs)),
            },
            registry: RegistryConfig {
                path: PathBuf::from(registry_path),
            },
            qualifying_plan,
        })
    }

    /// Pipeline wiring derived from this configuration.
    pub fn fulfillment_settings(&self) -> FulfillmentSettings {
        FulfillmentSettings {
            qualifying_plan: self.qualifying_plan,
            worker: OrderWorkerConfig {
                endpoint: self.gateway.endpoint.clone(),
            },
            pool: WorkerPoolConfig::default().with_concurrency(self.workers.concurrency),
        }
    }
}

/// `default` when unset; `None` when set to anything but a positive integer.
fn parse_positive(key: &str, default: u64) -> Option<u64> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse::<u64>().ok().filter(|value| *value > 0),
        Err(_) => Some(default),
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Outbound NBN order gateway. A missing endpoint is not a load error; every
/// order attempt fails until one is configured.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub endpoint: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub concurrency: usize,
    /// `None` disables the periodic sweep.
    pub sweep_interval: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub path: PathBuf,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTimeout,
    InvalidConcurrency,
    InvalidSweepInterval,
    InvalidPlanType { source: UnknownPlanType },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTimeout => {
                write!(f, "NBN_ORDER_TIMEOUT_SECS must be a positive number of seconds")
            }
            ConfigError::InvalidConcurrency => {
                write!(f, "ORDER_WORKER_CONCURRENCY must be a positive integer")
            }
            ConfigError::InvalidSweepInterval => write!(
                f,
                "ORDER_SWEEP_INTERVAL_SECS must be a whole number of seconds (0 disables)"
            ),
            ConfigError::InvalidPlanType { source } => {
                write!(f, "NBN_QUALIFYING_PLAN_TYPE is invalid: {source}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPlanType { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidTimeout
            | ConfigError::InvalidConcurrency
            | ConfigError::InvalidSweepInterval => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::env_guard;
    use std::env;

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "NBN_ORDER_ENDPOINT",
            "NBN_ORDER_TIMEOUT_SECS",
            "NBN_QUALIFYING_PLAN_TYPE",
            "ORDER_WORKER_CONCURRENCY",
            "ORDER_SWEEP_INTERVAL_SECS",
            "APPLICATION_REGISTRY_PATH",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard();
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.gateway.endpoint, None);
        assert_eq!(config.gateway.timeout, Duration::from_secs(30));
        assert_eq!(config.workers.concurrency, 4);
        assert_eq!(config.workers.sweep_interval, Some(Duration::from_secs(300)));
        assert_eq!(config.registry.path, PathBuf::from("data/applications.json"));
        assert_eq!(config.qualifying_plan, PlanType::Nbn);
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard();
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn blank_endpoint_is_treated_as_unset() {
        let _lock = env_guard();
        reset_env();
        env::set_var("NBN_ORDER_ENDPOINT", "   ");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.gateway.endpoint, None);

        env::set_var("NBN_ORDER_ENDPOINT", " https://b2b.example/orders ");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(
            config.fulfillment_settings().worker.endpoint(),
            Some("https://b2b.example/orders")
        );
        reset_env();
    }

    #[test]
    fn zero_sweep_interval_disables_periodic_sweeps() {
        let _lock = env_guard();
        reset_env();
        env::set_var("ORDER_SWEEP_INTERVAL_SECS", "0");
        env::set_var("ORDER_WORKER_CONCURRENCY", "8");
        env::set_var("NBN_QUALIFYING_PLAN_TYPE", "Opticomm");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.workers.sweep_interval, None);

        let settings = config.fulfillment_settings();
        assert_eq!(settings.pool.concurrency, 8);
        assert_eq!(settings.qualifying_plan, PlanType::Opticomm);
        reset_env();
    }

    #[test]
    fn rejects_invalid_numeric_settings() {
        let _lock = env_guard();
        reset_env();

        env::set_var("NBN_ORDER_TIMEOUT_SECS", "0");
        assert!(matches!(AppConfig::load(), Err(ConfigError::InvalidTimeout)));
        reset_env();

        env::set_var("ORDER_WORKER_CONCURRENCY", "none");
        assert!(matches!(AppConfig::load(), Err(ConfigError::InvalidConcurrency)));
        reset_env();

        env::set_var("ORDER_SWEEP_INTERVAL_SECS", "-5");
        assert!(matches!(AppConfig::load(), Err(ConfigError::InvalidSweepInterval)));
        reset_env();
    }

    #[test]
    fn rejects_unknown_plan_type() {
        let _lock = env_guard();
        reset_env();
        env::set_var("NBN_QUALIFYING_PLAN_TYPE", "satellite");
        let err = AppConfig::load().expect_err("unknown plan type");
        assert!(err.to_string().contains("NBN_QUALIFYING_PLAN_TYPE"));
        reset_env();
    }
}
