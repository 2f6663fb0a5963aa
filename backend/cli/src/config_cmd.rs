//! CLI Config Command
//!
//! `config show | path | init` over the YAML config file.

use std::path::Path;

use anyhow::{bail, Context, Result};

use sightline_config::defaults::{
    DEFAULT_API_VERSION, DEFAULT_BIND, DEFAULT_LOG_DIR, DEFAULT_LOG_LEVEL, DEFAULT_PORT,
    DEFAULT_TIMEOUT_SECS,
};
use sightline_config::{
    load_and_prepare, redact, write_config, LoggingConfig, ServerConfig, SightlineConfig,
    VisionConfig, CURRENT_VERSION,
};

use crate::terminal_output::{note_info, note_success};

/// Print the effective file config as YAML with secrets masked.
pub async fn show(path: &Path) -> Result<()> {
    let config = load_and_prepare(path).await?;
    let value = serde_json::to_value(&config).context("Failed to serialize config")?;
    let yaml = serde_yaml::to_string(&redact(&value)).context("Failed to render config")?;
    note_info(&format!("Config file: {}", path.display()));
    print!("{yaml}");
    Ok(())
}

pub fn path(path: &Path) {
    println!("{}", path.display());
}

/// The file `config init` writes. The key is left out so it is read from
/// `AZURE_VISION_KEY` at runtime instead of sitting on disk.
pub fn template(endpoint: Option<String>) -> SightlineConfig {
    SightlineConfig {
        version: Some(CURRENT_VERSION),
        vision: Some(VisionConfig {
            endpoint,
            api_version: Some(DEFAULT_API_VERSION.to_string()),
            timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
            ..Default::default()
        }),
        server: Some(ServerConfig {
            bind: Some(DEFAULT_BIND.to_string()),
            port: Some(DEFAULT_PORT),
        }),
        logging: Some(LoggingConfig {
            level: Some(DEFAULT_LOG_LEVEL.to_string()),
            dir: Some(DEFAULT_LOG_DIR.to_string()),
        }),
    }
}

pub async fn init(path: &Path, endpoint: Option<String>, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "Config already exists at {} (use --force to overwrite)",
            path.display()
        );
    }
    write_config(&template(endpoint), path).await?;
    note_success(&format!("Wrote {}", path.display()));
    note_info("Set AZURE_VISION_KEY in your environment to supply the subscription key");
    Ok(())
}
