//! Configuration management for the CLI
//!
//! The optional stages file lists named clusters, each reached through its
//! own kubeconfig:
//!
//! ```json
//! {
//!   "refresh_seconds": 5,
//!   "stage_index": 0,
//!   "stages": [{ "name": "dev", "config_file": "/home/me/.kube/dev.conf" }]
//! }
//! ```

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Refresh interval used when neither the flag nor the stages file sets one
pub const DEFAULT_REFRESH_SECONDS: u64 = 5;

/// A named cluster target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
    #[serde(alias = "configFile")]
    pub config_file: String,
}

/// CLI configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Seconds between refreshes in watch mode
    #[serde(default, alias = "refreshSeconds")]
    pub refresh_seconds: Option<u64>,
    /// Stage used when none is selected on the command line
    #[serde(default, alias = "stageIndex")]
    pub stage_index: usize,
    #[serde(default)]
    pub stages: Vec<Stage>,
}

impl Config {
    /// Load configuration from `path`, or from the default location.
    ///
    /// A missing default file yields an empty configuration; a missing
    /// explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (config_path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match Self::default_path() {
                Some(p) => (p, false),
                None => return Ok(Self::default()),
            },
        };

        if !explicit && !config_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", config_path.display()))
    }

    /// `~/.config/kubtop/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|home| home.join(".config").join("kubtop").join("config.json"))
    }

    /// Find a stage by name, or by index when `selector` is a number
    pub fn stage(&self, selector: &str) -> Result<&Stage> {
        if let Some(stage) = self.stages.iter().find(|s| s.name == selector) {
            return Ok(stage);
        }
        if let Ok(index) = selector.parse::<usize>() {
            if let Some(stage) = self.stages.get(index) {
                return Ok(stage);
            }
        }
        bail!(
            "Unknown stage '{}' (configured: {})",
            selector,
            self.stage_names().join(", ")
        )
    }

    /// The stage selected by `stage_index`, if any stages are configured
    pub fn default_stage(&self) -> Option<&Stage> {
        self.stages.get(self.stage_index).or_else(|| self.stages.first())
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn refresh_seconds(&self) -> u64 {
        self.refresh_seconds.unwrap_or(DEFAULT_REFRESH_SECONDS)
    }
}

/// Where a query is pointed, and how it was chosen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Display name: the stage name, or the kubeconfig path
    pub name: String,
    pub kubeconfig: String,
}

/// Resolve the kubeconfig to query.
///
/// Precedence: explicit `--kubeconfig`, then `--stage`, then the stages file's
/// default stage, then `$KUBECONFIG`, then `~/.kube/config`.
pub fn resolve_target(
    config: &Config,
    kubeconfig: Option<&str>,
    stage: Option<&str>,
) -> Result<Target> {
    if let Some(path) = kubeconfig {
        return Ok(Target {
            name: path.to_string(),
            kubeconfig: path.to_string(),
        });
    }

    let stage = match stage {
        Some(selector) => Some(config.stage(selector)?),
        None => config.default_stage(),
    };
    if let Some(stage) = stage {
        return Ok(Target {
            name: stage.name.clone(),
            kubeconfig: stage.config_file.clone(),
        });
    }

    let path = kubeconfig_path()?;
    let path = path.to_string_lossy().into_owned();
    Ok(Target {
        name: path.clone(),
        kubeconfig: path,
    })
}

/// `$KUBECONFIG`, else `~/.kube/config`
pub fn kubeconfig_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("KUBECONFIG") {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    let home = dirs_next::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".kube").join("config"))
}
