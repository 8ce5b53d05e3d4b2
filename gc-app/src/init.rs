//! Configuration scaffolding for `geminichat init`.
//!
//! Writes `~/.geminichat/config.toml` from the repository template without
//! overwriting an existing file.

use anyhow::Result;
use std::path::{Path, PathBuf};

const CONFIG_TEMPLATE: &str = include_str!("../../config-templates/config.toml");

#[derive(Debug, Clone)]
pub struct InitReport {
    pub path: PathBuf,
    pub created: bool,
}

pub async fn initialize_default() -> Result<InitReport> {
    initialize_at(&crate::config::default_config_path()).await
}

pub async fn initialize_at(target: &Path) -> Result<InitReport> {
    match tokio::fs::metadata(target).await {
        Ok(_) => Ok(InitReport {
            path: target.to_path_buf(),
            created: false,
        }),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| anyhow::anyhow!("create config dir {}: {e}", parent.display()))?;
            }
            tokio::fs::write(target, CONFIG_TEMPLATE)
                .await
                .map_err(|e| anyhow::anyhow!("write config template {}: {e}", target.display()))?;
            Ok(InitReport {
                path: target.to_path_buf(),
                created: true,
            })
        }
        Err(err) => Err(anyhow::anyhow!(
            "inspect config path {}: {err}",
            target.display()
        )),
    }
}
