//! Scripted agents and fixtures shared by Gatehouse tests.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use serde_json::json;

use gatehouse_core::config::AppConfig;
use gatehouse_core::context::WorkflowContext;
use gatehouse_core::error::{GatehouseError, Result};
use gatehouse_core::traits::Agent;
use gatehouse_core::types::AgentResult;

// ── StaticAgent ─────────────────────────────────────────────────

/// Returns a fixed success or failure result and counts its calls.
pub struct StaticAgent {
    id: String,
    succeed: bool,
    calls: AtomicUsize,
}

impl StaticAgent {
    pub fn succeed(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            succeed: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn fail(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            succeed: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Agent for StaticAgent {
    fn agent_id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        "Returns a canned result"
    }

    fn execute<'a>(&'a self, _ctx: &'a WorkflowContext) -> BoxFuture<'a, Result<AgentResult>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.succeed {
                Ok(AgentResult::success(&self.id, json!({ "agent": self.id })))
            } else {
                Ok(AgentResult::failure(&self.id, format!("{} failed", self.id)))
            }
        })
    }
}

// ── ErroringAgent ───────────────────────────────────────────────

/// Returns `Err` from `execute`.
pub struct ErroringAgent {
    id: String,
}

impl ErroringAgent {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl Agent for ErroringAgent {
    fn agent_id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        "Always errors"
    }

    fn execute<'a>(&'a self, _ctx: &'a WorkflowContext) -> BoxFuture<'a, Result<AgentResult>> {
        Box::pin(async move {
            Err::<AgentResult, _>(GatehouseError::agent(&self.id, "scripted error"))
        })
    }
}

// ── PanickingAgent ──────────────────────────────────────────────

/// Panics inside `execute`.
pub struct PanickingAgent {
    id: String,
}

impl PanickingAgent {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl Agent for PanickingAgent {
    fn agent_id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        "Always panics"
    }

    fn execute<'a>(&'a self, _ctx: &'a WorkflowContext) -> BoxFuture<'a, Result<AgentResult>> {
        Box::pin(explode(&self.id))
    }
}

async fn explode(id: &str) -> Result<AgentResult> {
    panic!("scripted panic in {}", id)
}

// ── SlowAgent ───────────────────────────────────────────────────

/// Sleeps, then succeeds.
pub struct SlowAgent {
    id: String,
    delay: Duration,
}

impl SlowAgent {
    pub fn new(id: impl Into<String>, delay_ms: u64) -> Self {
        Self {
            id: id.into(),
            delay: Duration::from_millis(delay_ms),
        }
    }
}

impl Agent for SlowAgent {
    fn agent_id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        "Sleeps before succeeding"
    }

    fn execute<'a>(&'a self, _ctx: &'a WorkflowContext) -> BoxFuture<'a, Result<AgentResult>> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            Ok(AgentResult::success(
                &self.id,
                json!({ "sleptMs": self.delay.as_millis() as u64 }),
            ))
        })
    }
}

// ── ProbeAgent ──────────────────────────────────────────────────

/// Succeeds and records which of `watch` agent ids already had a result
/// when it ran. Share it through `Arc` to inspect afterwards.
pub struct ProbeAgent {
    id: String,
    watch: Vec<String>,
    seen: Mutex<Vec<String>>,
}

impl ProbeAgent {
    pub fn new(id: impl Into<String>, watch: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            watch: watch.iter().map(|s| s.to_string()).collect(),
            seen: Mutex::new(vec![]),
        })
    }

    /// Watched ids that had a result at execution time.
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Agent for ProbeAgent {
    fn agent_id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        "Records visible predecessor results"
    }

    fn execute<'a>(&'a self, ctx: &'a WorkflowContext) -> BoxFuture<'a, Result<AgentResult>> {
        Box::pin(async move {
            let present: Vec<String> = self
                .watch
                .iter()
                .filter(|id| ctx.get_result(id).is_some())
                .cloned()
                .collect();
            if let Ok(mut seen) = self.seen.lock() {
                *seen = present.clone();
            }
            Ok(AgentResult::success(&self.id, json!({ "seen": present })))
        })
    }
}

// ── Fixtures ────────────────────────────────────────────────────

/// Config tuned for tests: no simulated latency, millisecond retry delays.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.agents.simulate_latency = false;
    config.http.retry_base_delay_ms = 1;
    config.http.connect_timeout_secs = 2;
    config
}

/// Write `contents` to a `gatehouse.toml` in a fresh temp dir.
///
/// Keep the returned `TempDir` alive for as long as the path is used.
pub fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("gatehouse.toml");
    std::fs::write(&path, contents).expect("write config");
    (dir, path)
}

/// Render a config as TOML text.
pub fn config_toml(config: &AppConfig) -> String {
    toml::to_string_pretty(config).expect("serialize config")
}
