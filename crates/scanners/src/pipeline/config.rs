use crate::core::CorrelatorConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One immutable behavior snapshot per scan. Resolved once before phase 1;
/// nothing reads feature state anywhere else at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// When false, the composite pass contributes no findings (cheap/fast
    /// scan mode). The phase still runs and reports zero units.
    #[serde(default = "default_true")]
    pub enable_composite: bool,

    /// When true and the repository defines a backing data schema, a schema
    /// digest is fed into the rule pass as extra context.
    #[serde(default)]
    pub schema_introspection: bool,

    /// Concurrent in-flight model requests within one phase.
    #[serde(default = "default_concurrent_requests")]
    pub max_concurrent_requests: usize,

    /// Per-request timeout; firing excludes that unit without failing the
    /// phase.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Attempts per model call, counting the first.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Chunk size ceiling, in lines.
    #[serde(default = "default_chunk_max_lines")]
    pub chunk_max_lines: usize,

    #[serde(default)]
    pub correlator: CorrelatorConfig,
}

fn default_true() -> bool {
    true
}
fn default_concurrent_requests() -> usize {
    4
}
fn default_request_timeout_secs() -> u64 {
    60
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_chunk_max_lines() -> usize {
    200
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            enable_composite: true,
            schema_introspection: false,
            max_concurrent_requests: default_concurrent_requests(),
            request_timeout_secs: default_request_timeout_secs(),
            retry_attempts: default_retry_attempts(),
            chunk_max_lines: default_chunk_max_lines(),
            correlator: CorrelatorConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn from_yaml_file(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_composite() {
        let config = PipelineConfig::default();
        assert!(config.enable_composite);
        assert!(!config.schema_introspection);
        assert_eq!(config.max_concurrent_requests, 4);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let config: PipelineConfig =
            serde_yaml::from_str("enable_composite: false\nchunk_max_lines: 50\n").unwrap();
        assert!(!config.enable_composite);
        assert_eq!(config.chunk_max_lines, 50);
        assert_eq!(config.retry_attempts, 3);
    }
}
