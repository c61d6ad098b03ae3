/// Configuration Module
///
/// Resolves all runtime parameters from the environment exactly once at
/// startup. The resulting value is passed into constructors explicitly;
/// there is no process-wide mutable configuration.
use anyhow::{Context, Result};
use std::env;

/// Warehouse connection parameters, consumed when opening a session.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    pub host: String,
    pub database: String,
    pub user: String,
    pub password: String,
    pub port: u16,
}

/// External storage parameters, substituted into the load statement text.
///
/// The pipeline never talks to storage itself; the warehouse pulls from
/// these locations server-side during COPY.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub log_data: String,
    pub log_jsonpath: String,
    pub song_data: String,
    pub iam_role_arn: String,
    pub region: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub warehouse: WarehouseConfig,
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let require = |key: &str| {
            get(key).with_context(|| format!("{} not found in environment. Please check your .env file", key))
        };

        let port = match get("WAREHOUSE_PORT") {
            Some(raw) => raw.parse::<u16>().with_context(|| format!("WAREHOUSE_PORT is not a valid port: {}", raw))?,
            None => 5439,
        };

        Ok(Self {
            warehouse: WarehouseConfig {
                host: require("WAREHOUSE_HOST")?,
                database: require("WAREHOUSE_DB")?,
                user: require("WAREHOUSE_USER")?,
                password: require("WAREHOUSE_PASSWORD")?,
                port,
            },
            storage: StorageConfig {
                log_data: require("S3_LOG_DATA")?,
                log_jsonpath: require("S3_LOG_JSONPATH")?,
                song_data: require("S3_SONG_DATA")?,
                iam_role_arn: require("IAM_ROLE_ARN")?,
                region: get("AWS_REGION").unwrap_or_else(|| "us-west-2".to_string()),
            },
        })
    }
}
