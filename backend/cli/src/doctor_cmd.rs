//! CLI Doctor Command
//!
//! Checks that the config loads, credentials are present and the log
//! directory is writable.

use std::path::Path;

use anyhow::Result;

use sightline_config::{load_and_prepare, validate};
use sightline_understanding::RequestBuilder;

use crate::config::Config;

/// Executes the full doctor diagnosis. Returns whether every check passed.
pub async fn run(config_path: &Path) -> Result<bool> {
    println!("\n🔍 Running Sightline Doctor...\n");

    let Some(file) = check_config_file(config_path).await else {
        println!("\n❌ Config could not be loaded. Fix it and run doctor again.");
        return Ok(false);
    };
    let config = Config::from_file_and_env(&file);

    let mut is_ok = check_validation(&file);
    is_ok &= check_credentials(&config);
    is_ok &= check_log_dir(Path::new(&config.log_dir)).await;

    println!();
    if is_ok {
        println!("✅ All checks passed! Sightline is ready to analyze images.");
    } else {
        println!("❌ Some checks failed! Please fix the errors above.");
    }

    Ok(is_ok)
}

async fn check_config_file(path: &Path) -> Option<sightline_config::SightlineConfig> {
    println!("Checking Config File:");
    if !path.exists() {
        println!("  🟡 {} not found (using defaults; `sightline config init` creates one)", path.display());
    }
    match load_and_prepare(path).await {
        Ok(config) => {
            if path.exists() {
                println!("  🟢 {} loaded", path.display());
            }
            Some(config)
        }
        Err(e) => {
            println!("  🔴 {e:#}");
            None
        }
    }
}

fn check_validation(file: &sightline_config::SightlineConfig) -> bool {
    println!("Checking Config Values:");
    let report = validate(file);
    for warning in &report.warnings {
        println!("  🟡 {}: {}", warning.path, warning.message);
    }
    for error in &report.errors {
        println!("  🔴 {}: {}", error.path, error.message);
    }
    if report.errors.is_empty() && report.warnings.is_empty() {
        println!("  🟢 no problems found");
    }
    report.is_valid()
}

/// The key itself is never printed, only whether one is present.
fn check_credentials(config: &Config) -> bool {
    println!("Checking Credentials:");
    let analysis_config = config.analysis_config();
    let mut all_good = true;

    if analysis_config.endpoint.trim().is_empty() {
        println!("  🔴 endpoint is missing (set AZURE_VISION_ENDPOINT or vision.endpoint)");
        all_good = false;
    } else {
        println!("  🟢 endpoint {}", analysis_config.endpoint.trim());
    }

    if analysis_config.credential.trim().is_empty() {
        println!("  🔴 API key is missing (set AZURE_VISION_KEY or vision.apiKey)");
        all_good = false;
    } else {
        println!("  🟢 API key is set");
    }

    if all_good {
        if let Err(e) = RequestBuilder::new().validate_config(&analysis_config) {
            println!("  🔴 {e}");
            all_good = false;
        }
    }

    all_good
}

async fn check_log_dir(dir: &Path) -> bool {
    println!("Checking Log Directory:");
    if let Err(e) = tokio::fs::create_dir_all(dir).await {
        println!("  🔴 cannot create {}: {e}", dir.display());
        return false;
    }
    let probe = dir.join(".sightline-doctor");
    match tokio::fs::write(&probe, b"ok").await {
        Ok(()) => {
            let _ = tokio::fs::remove_file(&probe).await;
            println!("  🟢 {} is writable", dir.display());
            true
        }
        Err(e) => {
            println!("  🔴 {} is not writable: {e}", dir.display());
            false
        }
    }
}
