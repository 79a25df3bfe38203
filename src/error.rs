use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("InvalidData: {0}")]
    InvalidData(String),

    #[error("Unknown control: {0}")]
    UnknownControl(String),

    #[error("Invalid value for control {control}: {reason}")]
    InvalidControlValue { control: String, reason: String },

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Unknown figure: {0}")]
    UnknownFigure(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
