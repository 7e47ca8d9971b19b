//! Engine configuration stored under `.planloop/config.toml`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Engine configuration (TOML).
///
/// This file is intended to be edited by humans and must remain stable and
/// automatable. Missing fields default to sensible values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Planning attempts allowed per run.
    pub max_attempts: u32,

    /// Consecutive unparseable oracle responses before the planner is
    /// declared unusable.
    pub parse_failure_limit: u32,

    /// Total per-attempt wall-clock budget in seconds (oracle + execution).
    pub attempt_timeout_secs: u64,

    /// Ceiling for a single tool invocation in seconds.
    pub tool_timeout_secs: u64,

    /// Truncate tool stdout/stderr beyond this many bytes.
    pub tool_output_limit_bytes: usize,

    /// Truncate oracle output beyond this many bytes.
    pub oracle_output_limit_bytes: usize,

    pub oracle: OracleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OracleConfig {
    /// Command that produces a plan from a prompt on stdin
    /// (e.g. `["ollama","run","qwen3:8b"]`).
    pub command: Vec<String>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            command: vec![
                "ollama".to_string(),
                "run".to_string(),
                "qwen3:8b".to_string(),
            ],
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            parse_failure_limit: 2,
            attempt_timeout_secs: 10 * 60,
            tool_timeout_secs: 2 * 60,
            tool_output_limit_bytes: 100_000,
            oracle_output_limit_bytes: 200_000,
            oracle: OracleConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(anyhow!("max_attempts must be > 0"));
        }
        if self.parse_failure_limit == 0 {
            return Err(anyhow!("parse_failure_limit must be > 0"));
        }
        if self.attempt_timeout_secs == 0 {
            return Err(anyhow!("attempt_timeout_secs must be > 0"));
        }
        if self.tool_timeout_secs == 0 {
            return Err(anyhow!("tool_timeout_secs must be > 0"));
        }
        if self.tool_output_limit_bytes == 0 {
            return Err(anyhow!("tool_output_limit_bytes must be > 0"));
        }
        if self.oracle_output_limit_bytes == 0 {
            return Err(anyhow!("oracle_output_limit_bytes must be > 0"));
        }
        if self.oracle.command.is_empty() || self.oracle.command[0].trim().is_empty() {
            return Err(anyhow!("oracle.command must be a non-empty array"));
        }
        Ok(())
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `EngineConfig::default()`.
pub fn load_config(path: &Path) -> Result<EngineConfig> {
    if !path.exists() {
        let cfg = EngineConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: EngineConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &EngineConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, EngineConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        let cfg = EngineConfig::default();
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "max_attempts = 5\n").expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.max_attempts, 5);
        assert_eq!(cfg.parse_failure_limit, EngineConfig::default().parse_failure_limit);
    }

    #[test]
    fn empty_oracle_command_is_rejected() {
        let cfg = EngineConfig {
            oracle: OracleConfig { command: Vec::new() },
            ..EngineConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
