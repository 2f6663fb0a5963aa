//! CLI Status Command
//!
//! Queries the health endpoint of a running `sightline serve`.

use std::time::Duration;

use anyhow::Result;
use serde_json::Value;

use crate::config::Config;

/// Address a local client should dial for the configured bind address.
pub fn health_url(config: &Config) -> String {
    let host = match config.bind_address.as_str() {
        "0.0.0.0" | "::" | "[::]" => "127.0.0.1",
        other => other,
    };
    format!("http://{host}:{}/api/health", config.port)
}

/// Returns whether a server answered.
pub async fn run(config: &Config) -> Result<bool> {
    println!("\n📊 Sightline Status\n");

    let url = health_url(config);
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(3))
        .build()?;

    match client.get(&url).send().await {
        Ok(resp) if resp.status().is_success() => {
            let body: Value = resp.json().await?;
            println!("Server:   🟢 running at {url}");
            if let Some(version) = body.get("version").and_then(Value::as_str) {
                println!("Version:  {version}");
            }
            if let Some(sessions) = body.get("sessions").and_then(Value::as_u64) {
                println!("Sessions: {sessions}");
            }
            if let Some(uptime) = body.get("uptime_seconds").and_then(Value::as_u64) {
                println!("Uptime:   {uptime}s");
            }
            Ok(true)
        }
        Ok(resp) => {
            println!("Server:   🟡 {url} answered {}", resp.status());
            Ok(false)
        }
        Err(_) => {
            println!("Server:   🔴 not running on port {}", config.port);
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_url_dials_loopback_for_wildcard_bind() {
        let config = Config {
            bind_address: "0.0.0.0".into(),
            port: 9090,
            ..Config::default()
        };
        assert_eq!(health_url(&config), "http://127.0.0.1:9090/api/health");

        let config = Config {
            bind_address: "10.0.0.5".into(),
            ..Config::default()
        };
        assert_eq!(health_url(&config), "http://10.0.0.5:8080/api/health");
    }
}
