//! Schema migration framework.

use crate::ProjectError;
use crate::schema::{FloodDef, ForecastConfig};

pub const LATEST_VERSION: u32 = 1;

pub fn migrate_to_latest(mut config: ForecastConfig) -> Result<ForecastConfig, ProjectError> {
    while config.version < LATEST_VERSION {
        config = migrate_one_version(config)?;
    }
    Ok(config)
}

fn migrate_one_version(config: ForecastConfig) -> Result<ForecastConfig, ProjectError> {
    match config.version {
        0 => migrate_v0_to_v1(config),
        v => Err(ProjectError::Migration {
            what: format!("No migration path from version {}", v),
        }),
    }
}

/// Version 0 files predate the flood stage.
fn migrate_v0_to_v1(mut config: ForecastConfig) -> Result<ForecastConfig, ProjectError> {
    if config.flood.is_none() {
        config.flood = Some(FloodDef::default());
    }
    config.version = 1;
    Ok(config)
}
