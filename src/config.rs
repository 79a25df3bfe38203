use std::path::PathBuf;

use clap::Parser;

pub const DEFAULT_PROCESSED_PATH: &str = "Data/Data After Milestone 1.csv";
pub const DEFAULT_RAW_PATH: &str = "Data/Original Data.csv";
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 2020;
pub const DEFAULT_MAX_SESSIONS: usize = 1024;

/// Sales dashboard server.
#[derive(Debug, Clone, Parser)]
#[command(name = "sales-dashboard", version, about)]
pub struct Config {
    /// Processed transaction table (CSV).
    #[arg(long = "data", env = "DASHBOARD_DATA", default_value = DEFAULT_PROCESSED_PATH)]
    pub processed: PathBuf,

    /// Raw transaction table (CSV), used for discount statistics.
    #[arg(long, env = "DASHBOARD_RAW", default_value = DEFAULT_RAW_PATH)]
    pub raw: PathBuf,

    #[arg(long, env = "DASHBOARD_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    #[arg(long, env = "DASHBOARD_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// strftime format of the `Order Date` column.
    #[arg(long, env = "DASHBOARD_DATE_FORMAT", default_value = DEFAULT_DATE_FORMAT)]
    pub date_format: String,

    /// Live sessions kept before the least recently used one is dropped.
    #[arg(long, env = "DASHBOARD_MAX_SESSIONS", default_value_t = DEFAULT_MAX_SESSIONS)]
    pub max_sessions: usize,
}

impl Config {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
