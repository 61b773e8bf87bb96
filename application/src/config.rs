//! [`Config`]-related definitions.

use std::time;

use common::Distance;
use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use serde::Deserialize;
use smart_default::SmartDefault;

/// Application configuration.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    /// Service configuration.
    pub service: Service,

    /// Postgres configuration.
    pub postgres: Postgres,

    /// Log configuration.
    pub log: Log,
}

impl Config {
    /// Creates a new [`Config`] by:
    /// - loading it from the provided `path` (if any);
    /// - merging it with the environment variables (if any);
    /// - using default values for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(path: impl AsRef<str>) -> Result<Self, ConfigError> {
        ConfigBuilder::<DefaultState>::default()
            .add_source(config::File::with_name(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix("CONF").separator("."))
            .build()?
            .try_deserialize()
    }
}

/// Service configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Service {
    /// Marketplace rules.
    pub marketplace: Marketplace,

    /// Service tasks configuration.
    pub tasks: Tasks,
}

impl From<Service> for service::Config {
    fn from(value: Service) -> Self {
        let Service {
            marketplace:
                Marketplace {
                    offer_ttl,
                    buy_request_ttl,
                    default_delivery_radius_km,
                },
            tasks:
                Tasks {
                    expire,
                    clean_stale_matches,
                },
        } = value;
        Self {
            marketplace: service::Marketplace {
                offer_ttl,
                buy_request_ttl,
                default_delivery_radius: Distance::from_km(
                    default_delivery_radius_km,
                ),
            },
            expire: service::task::expire::Config {
                interval: expire.interval,
            },
            clean_stale_matches: service::task::clean_stale_matches::Config {
                interval: clean_stale_matches.interval,
            },
        }
    }
}

/// Marketplace rules.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Marketplace {
    /// Time an offer stays pending before it expires.
    #[default(time::Duration::from_secs(60 * 60 * 24 * 7))]
    #[serde(with = "humantime_serde")]
    pub offer_ttl: time::Duration,

    /// Time a buy request stays published, unless requested otherwise.
    #[default(time::Duration::from_secs(60 * 60 * 24 * 30))]
    #[serde(with = "humantime_serde")]
    pub buy_request_ttl: time::Duration,

    /// Delivery radius (in kilometers) of a buy request not specifying its
    /// own one.
    #[default(50)]
    pub default_delivery_radius_km: u32,
}

/// Service tasks configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Tasks {
    /// `Expire` task configuration.
    #[default(Task {
        interval: time::Duration::from_secs(60),
    })]
    pub expire: Task,

    /// `CleanStaleMatches` task configuration.
    pub clean_stale_matches: Task,
}

/// Service task configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Task {
    /// Task execution interval.
    #[default(time::Duration::from_secs(60 * 60))]
    #[serde(with = "humantime_serde")]
    pub interval: time::Duration,
}

/// Postgres configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Postgres {
    /// Host to connect to.
    #[default("127.0.0.1".to_owned())]
    pub host: String,

    /// Port to connect to.
    #[default(5432)]
    pub port: u16,

    /// User to connect as.
    #[default("postgres".to_owned())]
    pub user: String,

    /// Password to connect with.
    #[default("postgres".to_owned())]
    pub password: String,

    /// Database name to connect to.
    #[default("postgres".to_owned())]
    pub dbname: String,
}

impl From<Postgres> for service::infra::postgres::Config {
    fn from(value: Postgres) -> Self {
        let Postgres {
            host,
            port,
            user,
            password,
            dbname,
        } = value;

        Self {
            host: Some(host),
            port: Some(port),
            user: Some(user),
            password: Some(password),
            dbname: Some(dbname),
            ..Self::default()
        }
    }
}

/// Log configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Log level.
    pub level: LogLevel,
}

/// Log level.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Designates very low priority, often extremely verbose, information.
    Trace,

    /// Designates lower priority information.
    Debug,

    /// Designates useful information.
    #[default]
    Info,

    /// Designates hazardous situations.
    Warn,

    /// Designates very serious errors.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use super::Service;

    #[test]
    fn converts_into_service_config() {
        let mut conf = Service::default();
        conf.marketplace.offer_ttl = Duration::from_secs(60);
        conf.tasks.expire.interval = Duration::from_secs(5);

        let conf = service::Config::from(conf);

        assert_eq!(conf.marketplace.offer_ttl, Duration::from_secs(60));
        assert_eq!(
            conf.marketplace.buy_request_ttl,
            Duration::from_secs(60 * 60 * 24 * 30),
        );
        assert_eq!(conf.expire.interval, Duration::from_secs(5));
        assert_eq!(
            conf.clean_stale_matches.interval,
            Duration::from_secs(60 * 60),
        );
    }
}
