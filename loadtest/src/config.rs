//! Configuration of a load test run.
//!
//! Configuration is loaded from the following sources, in order of precedence (highest first):
//!
//! 1. Environment variables (prefixed with `LOADTEST__`)
//! 2. YAML configuration file (specified via `-c` or `--config` flag)
//! 3. Defaults
//!
//! Nested fields are separated with double underscores, for example
//! `LOADTEST__WAIT_TIME__MAX=10s`. The same configuration in YAML:
//!
//! ```yaml
//! host: http://localhost:8080
//! users: 20
//! duration: 5m
//! wait_time:
//!   min: 1s
//!   max: 10s
//! tasks:
//!   browse_home: 10
//!   create_company: 0
//! ```
//!
//! Login credentials are not part of this configuration. Every virtual user reads them from
//! `LOCUST_USERNAME` and `LOCUST_PASSWORD` when it starts, see [`Credentials::from_env`].

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use figment::providers::{Env, Format, Serialized, Yaml};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::workload::{TaskSet, TaskWeights, WaitTime};

/// Environment variable prefix for all configuration options.
const ENV_PREFIX: &str = "LOADTEST__";

/// Environment variable holding the login username.
pub const USERNAME_ENV: &str = "LOCUST_USERNAME";
/// Environment variable holding the login password.
pub const PASSWORD_ENV: &str = "LOCUST_PASSWORD";

/// Configuration of a load test run.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Base URL of the target API.
    ///
    /// # Default
    ///
    /// `http://localhost:8080`
    pub host: String,

    /// Number of virtual users.
    ///
    /// # Default
    ///
    /// `1`
    pub users: usize,

    /// Virtual users started per second until [`Config::users`] are running.
    ///
    /// # Default
    ///
    /// `1.0`
    pub spawn_rate: f64,

    /// How long the test runs, ramp-up included.
    ///
    /// # Default
    ///
    /// `60s`
    #[serde(with = "humantime_serde")]
    pub duration: Duration,

    /// Pause of a virtual user between two tasks.
    pub wait_time: WaitTimeConfig,

    /// Timeout of a single request.
    ///
    /// # Default
    ///
    /// `30s`
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Seed of the random number generators.
    ///
    /// Virtual user `n` uses `seed + n`. A random seed is chosen if this is not set.
    pub seed: Option<u64>,

    /// Selection weights of the tasks.
    pub tasks: TaskWeights,
}

/// Bounds of the uniformly distributed pause between two tasks.
///
/// Used in: [`Config::wait_time`]
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct WaitTimeConfig {
    /// Shortest pause.
    ///
    /// # Default
    ///
    /// `1s`
    #[serde(with = "humantime_serde")]
    pub min: Duration,

    /// Longest pause.
    ///
    /// # Default
    ///
    /// `5s`
    #[serde(with = "humantime_serde")]
    pub max: Duration,
}

impl Default for WaitTimeConfig {
    fn default() -> Self {
        Self {
            min: Duration::from_secs(1),
            max: Duration::from_secs(5),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "http://localhost:8080".into(),
            users: 1,
            spawn_rate: 1.0,
            duration: Duration::from_secs(60),
            wait_time: WaitTimeConfig::default(),
            request_timeout: Duration::from_secs(30),
            seed: None,
            tasks: TaskWeights::default(),
        }
    }
}

impl Config {
    /// Loads configuration from defaults, the optional YAML file at `path`, and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML file cannot be read or parsed, or if environment variables
    /// contain invalid values.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = figment::Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        let config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        Ok(config)
    }

    /// Checks the values that cannot be expressed in the types alone.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.users > 0, "at least one user is required");
        self.spawn_interval()?;
        url::Url::parse(&self.host).map_err(|source| Error::InvalidHost {
            host: self.host.clone(),
            source,
        })?;
        self.wait_time()?;
        self.task_set()?;
        Ok(())
    }

    /// The delay between starting two virtual users.
    pub fn spawn_interval(&self) -> Result<Duration> {
        ensure!(
            self.spawn_rate.is_finite() && self.spawn_rate > 0.0,
            "spawn rate must be positive, got {}",
            self.spawn_rate
        );
        Duration::try_from_secs_f64(1.0 / self.spawn_rate)
            .with_context(|| format!("spawn rate {} is too low", self.spawn_rate))
    }

    /// The pause between two tasks.
    pub fn wait_time(&self) -> Result<WaitTime> {
        WaitTime::between(self.wait_time.min, self.wait_time.max)
    }

    /// The weighted task selection.
    pub fn task_set(&self) -> Result<TaskSet> {
        TaskSet::new(self.tasks.clone())
    }
}

/// Login credentials of the virtual users.
#[derive(Debug)]
pub struct Credentials {
    /// Login username.
    pub username: String,
    /// Login password.
    pub password: SecretString,
}

impl Credentials {
    /// Reads the credentials from `LOCUST_USERNAME` and `LOCUST_PASSWORD`.
    pub fn from_env() -> crate::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the credentials through `lookup`, which resolves an environment variable name.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> crate::Result<Self> {
        let username = lookup(USERNAME_ENV).ok_or(Error::MissingCredential(USERNAME_ENV))?;
        let password = lookup(PASSWORD_ENV).ok_or(Error::MissingCredential(PASSWORD_ENV))?;

        Ok(Self {
            username,
            password: password.into(),
        })
    }
}
