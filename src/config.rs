use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::catalog::FacetCatalog;
use crate::search::DEFAULT_PAGE_SIZE;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: PathBuf,
    /// JSON facet catalog; the built-in job board catalog when unset.
    pub catalog: Option<PathBuf>,
    pub page_size: usize,
    /// Overrides every facet's own suggestion limit when set.
    pub suggestion_limit: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: default_database_path(),
            catalog: None,
            page_size: DEFAULT_PAGE_SIZE,
            suggestion_limit: None,
        }
    }
}

impl Config {
    /// Loads `explicit`, else `$JOBSIEVE_CONFIG`, else the user config file.
    /// A missing file means defaults. `$JOBSIEVE_DB` overrides the database.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = explicit
            .map(PathBuf::from)
            .or_else(|| std::env::var("JOBSIEVE_CONFIG").ok().map(PathBuf::from))
            .or_else(default_config_path);

        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };

        if let Ok(db) = std::env::var("JOBSIEVE_DB") {
            config.database = PathBuf::from(db);
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn load_catalog(&self) -> Result<FacetCatalog> {
        match &self.catalog {
            Some(path) => FacetCatalog::from_json_file(path)
                .with_context(|| format!("Failed to load facet catalog: {}", path.display())),
            None => Ok(FacetCatalog::job_board()),
        }
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", "jobsieve")
}

fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
}

fn default_database_path() -> PathBuf {
    // Use XDG data directory or fallback
    match project_dirs() {
        Some(dirs) => dirs.data_dir().join("jobsieve.db"),
        None => PathBuf::from("jobsieve.db"),
    }
}
