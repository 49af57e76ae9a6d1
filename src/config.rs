use crate::ingest::DedupPolicy;
use crate::query::DEFAULT_PAGE_SIZE;
use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings read from `MOMO_*` environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// SMS backup export used by `import` and `POST /import-xml`
    #[serde(default = "default_sms_xml_path")]
    pub sms_xml_path: PathBuf,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error), used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Page size when `limit` is given but unusable
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    /// Skip messages already stored with the same TxId and date
    #[serde(default)]
    pub dedup: bool,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("data/transactions.db")
}

fn default_sms_xml_path() -> PathBuf {
    PathBuf::from("data/modified_sms_v2.xml")
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("MOMO"))
            .build()?
            .try_deserialize()
    }

    pub fn dedup_policy(&self) -> DedupPolicy {
        if self.dedup {
            DedupPolicy::TransactionIdAndDate
        } else {
            DedupPolicy::None
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: default_database_path(),
            sms_xml_path: default_sms_xml_path(),
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            default_page_size: default_page_size(),
            dedup: false,
        }
    }
}
