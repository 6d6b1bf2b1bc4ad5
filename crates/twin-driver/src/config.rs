//! Run configuration: TOML file, then command-line overrides.
//!
//! ```toml
//! run_for_secs = 10
//! delay_ms = 5000
//! period_ms = 1000
//! grace_ms = 2000
//! malformed = "drop"
//! matcher_core = 2
//! log_level = "debug"
//! phone_prefix = "+7-915-"
//! login_stem = "Mobiou"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, ValueEnum};
use serde::Deserialize;
use twin_core::{EngineConfig, MalformedPolicy};

use crate::error::ConfigError;

#[derive(Parser, Debug, Default)]
#[command(name = "twin")]
#[command(about = "Pairs records that share an identifier within a time window")]
#[command(version)]
pub struct Cli {
    /// TOML config file; flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// How long to run before shutting down, in seconds
    #[arg(long)]
    pub run_for_secs: Option<u64>,

    /// Age at which a buffered record expires, in milliseconds
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Generator period, in milliseconds
    #[arg(long)]
    pub period_ms: Option<u64>,

    /// How long each worker gets to acknowledge shutdown, in milliseconds
    #[arg(long)]
    pub grace_ms: Option<u64>,

    /// What the matcher does with records whose identifiers are both empty
    #[arg(long, value_enum)]
    pub malformed: Option<MalformedMode>,

    /// Pin the matcher thread to this core
    #[arg(long)]
    pub matcher_core: Option<usize>,

    /// Log level (RUST_LOG takes precedence)
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MalformedMode {
    #[default]
    Drop,
    Accept,
}

impl From<MalformedMode> for MalformedPolicy {
    fn from(mode: MalformedMode) -> Self {
        match mode {
            MalformedMode::Drop => MalformedPolicy::Drop,
            MalformedMode::Accept => MalformedPolicy::Accept,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub run_for_secs: u64,
    pub delay_ms: u64,
    pub period_ms: u64,
    pub grace_ms: u64,
    pub malformed: MalformedMode,
    pub matcher_core: Option<usize>,
    pub log_level: String,
    pub phone_prefix: String,
    pub login_stem: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            run_for_secs: 10,
            delay_ms: 5_000,
            period_ms: 1_000,
            grace_ms: 2_000,
            malformed: MalformedMode::Drop,
            matcher_core: None,
            log_level: "info".to_string(),
            phone_prefix: "+7-915-".to_string(),
            login_stem: "Mobiou".to_string(),
        }
    }
}

impl RunConfig {
    /// Defaults, overlaid with the file named by `--config`, overlaid with
    /// any flags, then validated.
    pub fn resolve(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(v) = cli.run_for_secs {
            self.run_for_secs = v;
        }
        if let Some(v) = cli.delay_ms {
            self.delay_ms = v;
        }
        if let Some(v) = cli.period_ms {
            self.period_ms = v;
        }
        if let Some(v) = cli.grace_ms {
            self.grace_ms = v;
        }
        if let Some(v) = cli.malformed {
            self.malformed = v;
        }
        if cli.matcher_core.is_some() {
            self.matcher_core = cli.matcher_core;
        }
        if let Some(v) = &cli.log_level {
            self.log_level = v.clone();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.delay_ms == 0 {
            return Err(ConfigError::Invalid("delay_ms must be greater than zero".into()));
        }
        if self.period_ms == 0 {
            return Err(ConfigError::Invalid("period_ms must be greater than zero".into()));
        }
        if self.grace_ms == 0 {
            return Err(ConfigError::Invalid("grace_ms must be greater than zero".into()));
        }
        Ok(())
    }

    pub fn run_for(&self) -> Duration {
        Duration::from_secs(self.run_for_secs)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }

    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            delay: self.delay(),
            malformed: self.malformed.into(),
        }
    }
}
