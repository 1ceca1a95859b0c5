//! CLI configuration for endpoint and default region.
//!
//! The config file is user-owned JSON under the platform config directory.
//! Flags beat environment variables beat the file, so scripted and
//! interactive use resolve the same way.
use crate::stack::Region;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_SCHEMA_VERSION: u32 = 1;

pub const ENDPOINT_ENV: &str = "STACKCTL_ENDPOINT";
pub const REGION_ENV: &str = "STACKCTL_REGION";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    pub schema_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_region: Option<Region>,
}

/// Default config file location under the platform config directory.
pub fn default_config_path() -> Result<PathBuf> {
    let base = dirs::config_dir().ok_or_else(|| anyhow!("no config directory on this platform"))?;
    Ok(base.join("stackctl").join("config.json"))
}

/// Load the default config file. Platforms without a config directory
/// simply have no file; flags and environment still work there.
pub fn load_default_config() -> Result<Option<CliConfig>> {
    let Some(base) = dirs::config_dir() else {
        return Ok(None);
    };
    load_config(&base.join("stackctl").join("config.json"))
}

/// Load the config file if present. A missing file is not an error.
pub fn load_config(path: &Path) -> Result<Option<CliConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: CliConfig =
        serde_json::from_slice(&bytes).context("parse stackctl config JSON")?;
    validate_config(&config)?;
    Ok(Some(config))
}

/// Persist a config in a stable JSON format.
pub fn write_config(path: &Path, config: &CliConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("create config dir")?;
    }
    let text = serde_json::to_string_pretty(config).context("serialize stackctl config")?;
    fs::write(path, text.as_bytes()).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Stub config written by `config init`; endpoint is a placeholder to edit.
pub fn config_stub_value() -> CliConfig {
    CliConfig {
        schema_version: CONFIG_SCHEMA_VERSION,
        endpoint: Some("https://provisioning.example.net".to_string()),
        default_region: Some(Region::UsEast1),
    }
}

pub fn validate_config(config: &CliConfig) -> Result<()> {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported stackctl config schema_version {}",
            config.schema_version
        ));
    }
    if let Some(endpoint) = config.endpoint.as_deref() {
        if endpoint.trim().is_empty() {
            return Err(anyhow!("endpoint must be non-empty when set"));
        }
    }
    Ok(())
}

/// Resolve the endpoint: flag, then environment, then config file.
pub fn resolve_endpoint(
    flag: Option<&str>,
    env: Option<&str>,
    config: Option<&CliConfig>,
) -> Result<String> {
    if let Some(endpoint) = flag {
        return Ok(endpoint.to_string());
    }
    if let Some(endpoint) = env {
        return Ok(endpoint.to_string());
    }
    if let Some(endpoint) = config.and_then(|config| config.endpoint.clone()) {
        return Ok(endpoint);
    }
    Err(anyhow!(
        "no endpoint configured (pass --endpoint, set {ENDPOINT_ENV}, or run `stackctl config init`)"
    ))
}

/// Resolve the region with the same precedence as the endpoint.
pub fn resolve_region(
    flag: Option<Region>,
    env: Option<&str>,
    config: Option<&CliConfig>,
) -> Result<Region> {
    if let Some(region) = flag {
        return Ok(region);
    }
    if let Some(raw) = env {
        return Region::parse_wire(raw)
            .ok_or_else(|| anyhow!("unknown region {raw:?} in {REGION_ENV}"));
    }
    if let Some(region) = config.and_then(|config| config.default_region) {
        return Ok(region);
    }
    Err(anyhow!(
        "no region configured (pass --region, set {REGION_ENV}, or run `stackctl config init`)"
    ))
}
