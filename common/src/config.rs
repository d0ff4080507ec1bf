use serde::Deserialize;
use std::{fs, path::Path};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yml::Error),
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CommonConfig {
    pub project_name: String,
    pub database_url: String,
}

/// Weight ceilings and depot location for the ordering workflow.
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub cart_ceiling_kg: f64,
    pub load_ceiling_kg: f64,
    pub depot: DepotConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DepotConfig {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_m: f64,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SeedConfig {
    pub log_level: String,
    pub catalog_file: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub common: CommonConfig,
    pub service: ServiceConfig,
    pub seed: SeedConfig,
}

impl Config {
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(config_path)?;
        let config = serde_yml::from_str(&contents)?;

        Ok(config)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            cart_ceiling_kg: 20.0,
            load_ceiling_kg: 25.0,
            depot: DepotConfig::default(),
        }
    }
}

impl Default for DepotConfig {
    fn default() -> Self {
        Self {
            name: "Depot".to_string(),
            latitude: 22.170257,
            longitude: 114.131376,
            altitude_m: 161.0,
        }
    }
}
