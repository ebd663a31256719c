use std::env;
use std::path::{Path, PathBuf};

use log::{info, warn};
use thiserror::Error;

use crate::db::tlc::{
    lib_tlc::RAW_DATA_FOLDER, taxi_zone_lookup::TaxiZoneLookupArchive,
    yellow_tripdata::YellowTripdataArchive,
};
use crate::utils::lib_dbfs::{DbfsRestTree, LandingTree, MountedTree};

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("environment variable {0} is required when {1} is set")]
    Missing(&'static str, &'static str),
}

pub struct ProdDb {}

impl ProdDb {
    /// Load `.env/{env}.env` into the process environment.  A missing file is
    /// not an error, variables may come from the shell.
    pub fn load_env(env: &str) {
        let path = format!(".env/{}.env", env);
        match dotenvy::from_path(Path::new(&path)) {
            Ok(()) => info!("loaded configuration from {}", path),
            Err(e) => warn!("no configuration loaded from {}: {}", path, e),
        }
    }

    pub fn taxi_zone_lookup() -> TaxiZoneLookupArchive {
        TaxiZoneLookupArchive::default()
    }

    pub fn yellow_tripdata() -> YellowTripdataArchive {
        YellowTripdataArchive {
            staging_dir: env::var("TAXI_STAGING_DIR").ok().map(PathBuf::from),
            ..Default::default()
        }
    }

    /// The DBFS REST API when `DATABRICKS_HOST` is set, the local mount otherwise.
    pub fn landing_tree() -> Result<Box<dyn LandingTree>, ConfigError> {
        landing_tree_from(|key| env::var(key).ok())
    }
}

fn landing_tree_from<F>(var: F) -> Result<Box<dyn LandingTree>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = var("DATABRICKS_HOST").filter(|h| !h.is_empty()) {
        let token = var("DATABRICKS_TOKEN")
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::Missing("DATABRICKS_TOKEN", "DATABRICKS_HOST"))?;
        return Ok(Box::new(DbfsRestTree::new(&host, &token, RAW_DATA_FOLDER)));
    }
    let mount = var("DBFS_MOUNT").unwrap_or_else(|| "/dbfs".to_string());
    Ok(Box::new(MountedTree::new(
        Path::new(&mount).join(RAW_DATA_FOLDER),
    )))
}
