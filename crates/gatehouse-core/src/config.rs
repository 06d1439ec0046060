use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GatehouseError, Result};

/// Top-level Gatehouse configuration.
///
/// Every section carries serde defaults, so an empty file is a valid config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub agents: AgentsConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum attempts running at once within one wave (0 = unbounded).
    #[serde(default)]
    pub max_parallel: usize,
    /// Per-node attempt timeout. Unset means no timeout.
    #[serde(default)]
    pub node_timeout_secs: Option<u64>,
    /// Return an error on stall instead of a report with pending nodes.
    /// Off by default, so a stalled run still yields its summary and context.
    #[serde(default = "default_fail_on_stall")]
    pub fail_on_stall: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_parallel: 0,
            node_timeout_secs: None,
            fail_on_stall: default_fail_on_stall(),
        }
    }
}

fn default_fail_on_stall() -> bool { false }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Retry delay unit; attempt `n` waits `n * retry_base_delay_ms` first.
    #[serde(default = "default_retry_base_delay")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            retry_base_delay_ms: default_retry_base_delay(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_connect_timeout() -> u64 { 10 }
fn default_retry_base_delay() -> u64 { 1000 }
fn default_user_agent() -> String { format!("gatehouse/{}", env!("CARGO_PKG_VERSION")) }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsConfig {
    /// Stock agents sleep for a short while to mimic real model calls.
    #[serde(default = "default_simulate_latency")]
    pub simulate_latency: bool,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            simulate_latency: default_simulate_latency(),
        }
    }
}

fn default_simulate_latency() -> bool { true }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String { "127.0.0.1:8080".to_string() }

impl AppConfig {
    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| GatehouseError::ConfigNotFound(path.display().to_string()))?;

        Self::parse(&content)
    }

    /// Parse config text, expanding `${ENV_VAR}` references first.
    pub fn parse(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content);

        toml::from_str(&expanded).map_err(|e| GatehouseError::Config(e.to_string()))
    }

    /// Load from `path` when it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| GatehouseError::Config(e.to_string()))
    }
}

/// Expand `${ENV_VAR}` patterns in a string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }
            match std::env::var(&var_name) {
                Ok(val) => result.push_str(&val),
                Err(_) => {
                    // Keep original if env var not set
                    result.push_str(&format!("${{{}}}", var_name));
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}
