//! fc-project: forecast configuration file format, validation and the
//! tabular inputs it points at.

pub mod migrate;
pub mod schema;
pub mod tables;
pub mod validate;

pub use migrate::{LATEST_VERSION, migrate_to_latest};
pub use schema::*;
pub use validate::{ValidationError, validate_config};

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Migration error: {what}")]
    Migration { what: String },

    #[error("Table {path}: {what}")]
    Table { path: String, what: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub fn load_yaml(path: &std::path::Path) -> ProjectResult<ForecastConfig> {
    let content = std::fs::read_to_string(path)?;
    let mut config: ForecastConfig = serde_yaml::from_str(&content)?;
    config = migrate_to_latest(config)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn save_yaml(path: &std::path::Path, config: &ForecastConfig) -> ProjectResult<()> {
    validate_config(config)?;
    let content = serde_yaml::to_string(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
