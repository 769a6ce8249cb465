//! Stages command: list the clusters configured in the stages file

use anyhow::Result;
use serde::Serialize;
use tabled::Tabled;

use crate::config::Config;
use crate::output::{print_info, print_table, OutputFormat};

#[derive(Tabled, Serialize)]
struct StageRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Stage")]
    name: String,
    #[tabled(rename = "Kubeconfig")]
    config_file: String,
    #[tabled(rename = "Default")]
    default: String,
}

fn rows(config: &Config) -> Vec<StageRow> {
    let default_name = config.default_stage().map(|s| s.name.as_str());
    config
        .stages
        .iter()
        .enumerate()
        .map(|(index, stage)| StageRow {
            index,
            name: stage.name.clone(),
            config_file: stage.config_file.clone(),
            default: if Some(stage.name.as_str()) == default_name {
                "*".to_string()
            } else {
                String::new()
            },
        })
        .collect()
}

/// List configured stages
pub fn list_stages(config: &Config, format: OutputFormat) -> Result<()> {
    if config.stages.is_empty() {
        if let OutputFormat::Table = format {
            let location = Config::default_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "the config file".to_string());
            print_info(&format!(
                "No stages configured; add them to {} or pass --kubeconfig",
                location
            ));
            return Ok(());
        }
    }

    print_table(&rows(config), format)?;

    if let OutputFormat::Table = format {
        print_info(&format!(
            "Refresh interval: {}s",
            config.refresh_seconds()
        ));
    }
    Ok(())
}
