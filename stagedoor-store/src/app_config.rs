use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    /// How long an unconfirmed hold keeps its seats.
    #[serde(default = "default_hold_duration")]
    pub hold_duration_seconds: u64,
    /// How often the reaper sweeps for overdue holds.
    #[serde(default = "default_reaper_interval")]
    pub reaper_interval_seconds: u64,
    /// Retry cap for the ledger's optimistic seat-count writes.
    #[serde(default = "default_reserve_retries")]
    pub reserve_max_retries: u32,
}

fn default_port() -> u16 {
    8080
}

fn default_hold_duration() -> u64 {
    600
}

fn default_reaper_interval() -> u64 {
    30
}

fn default_reserve_retries() -> u32 {
    8
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            hold_duration_seconds: default_hold_duration(),
            reaper_interval_seconds: default_reaper_interval(),
            reserve_max_retries: default_reserve_retries(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Base configuration file, then the environment-specific one,
            // then a local override; all optional since every key defaults.
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(config::File::with_name("config/local").required(false))
            // Settings from the environment, e.g. STAGEDOOR__SERVER__PORT=9000
            .add_source(config::Environment::with_prefix("STAGEDOOR").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
