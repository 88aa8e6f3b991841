//! Harness configuration.
//!
//! Every field has a default that reproduces the fixed harness behavior, so
//! a run needs no config file at all. When `mockbot.json` exists in the
//! working directory (or `--config` names a file) it is loaded and
//! validated before anything else happens.
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_SCHEMA_VERSION: u32 = 1;
pub const DEFAULT_CONFIG_FILE: &str = "mockbot.json";
/// Control program spliced when nothing else is configured.
pub const DEFAULT_TARGET: &str = "transbot.ctl";
/// Reasoning engine process cleaned up before a run.
pub const DEFAULT_ENGINE_PROCESS: &str = "NAR";
pub const DEFAULT_CLEANUP_TIMEOUT_MS: u64 = 2_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarnessConfig {
    pub schema_version: u32,
    #[serde(default = "default_target")]
    pub target: PathBuf,
    #[serde(default = "default_import_markers")]
    pub import_markers: Vec<String>,
    /// `null` disables startup cleanup.
    #[serde(default = "default_engine_process")]
    pub engine_process: Option<String>,
    #[serde(default = "default_cleanup_timeout_ms")]
    pub cleanup_timeout_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_point: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<u64>,
}

fn default_target() -> PathBuf {
    PathBuf::from(DEFAULT_TARGET)
}

fn default_import_markers() -> Vec<String> {
    vec!["import".to_string()]
}

fn default_engine_process() -> Option<String> {
    Some(DEFAULT_ENGINE_PROCESS.to_string())
}

fn default_cleanup_timeout_ms() -> u64 {
    DEFAULT_CLEANUP_TIMEOUT_MS
}

pub fn default_config() -> HarnessConfig {
    HarnessConfig {
        schema_version: CONFIG_SCHEMA_VERSION,
        target: default_target(),
        import_markers: default_import_markers(),
        engine_process: default_engine_process(),
        cleanup_timeout_ms: default_cleanup_timeout_ms(),
        seed: None,
        entry_point: None,
        max_steps: None,
    }
}

/// Render a pretty JSON config stub with every default spelled out.
pub fn config_stub() -> String {
    serde_json::to_string_pretty(&default_config()).expect("serialize config stub")
}

pub fn load_config(path: &Path) -> Result<HarnessConfig> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: HarnessConfig = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config JSON {}", path.display()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Pick the config for a run: an explicit path must exist; otherwise
/// `mockbot.json` in `cwd` is used when present, else the defaults.
pub fn resolve_config(explicit: Option<&Path>, cwd: &Path) -> Result<HarnessConfig> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    let implicit = cwd.join(DEFAULT_CONFIG_FILE);
    if implicit.is_file() {
        tracing::debug!(path = %implicit.display(), "using config from working directory");
        return load_config(&implicit);
    }
    Ok(default_config())
}

pub fn validate_config(config: &HarnessConfig) -> Result<()> {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported config schema_version {}",
            config.schema_version
        ));
    }
    if config.target.as_os_str().is_empty() {
        return Err(anyhow!("target must not be empty"));
    }
    if config.import_markers.is_empty() {
        return Err(anyhow!("import_markers must list at least one marker"));
    }
    if config.import_markers.iter().any(|m| m.trim().is_empty()) {
        return Err(anyhow!("import_markers entries must not be blank"));
    }
    if let Some(name) = &config.engine_process {
        if name.trim().is_empty() || name.contains('/') {
            return Err(anyhow!(
                "engine_process must be a bare process name (got {name:?})"
            ));
        }
    }
    if config.cleanup_timeout_ms == 0 {
        return Err(anyhow!("cleanup_timeout_ms must be positive"));
    }
    if let Some(entry) = &config.entry_point {
        if entry.trim().is_empty() {
            return Err(anyhow!("entry_point must not be blank"));
        }
    }
    if config.max_steps == Some(0) {
        return Err(anyhow!("max_steps must be positive when set"));
    }
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
