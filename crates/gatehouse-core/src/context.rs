use std::collections::{BTreeMap, HashMap};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::{AgentResult, RunId};

/// Shared per-run store that agents read inputs from and write results to.
///
/// Both maps are sharded (`DashMap`), so agents running in the same wave can
/// write distinct keys concurrently. Reads never block on a missing key:
/// absence is reported as `None` / `false`.
///
/// Results are write-once: the first result recorded for an agent id wins.
#[derive(Debug)]
pub struct WorkflowContext {
    workflow_id: RunId,
    data: DashMap<String, serde_json::Value>,
    results: DashMap<String, AgentResult>,
}

impl WorkflowContext {
    pub fn new() -> Self {
        Self::with_id(RunId::new())
    }

    pub fn with_id(workflow_id: RunId) -> Self {
        Self {
            workflow_id,
            data: DashMap::new(),
            results: DashMap::new(),
        }
    }

    /// Create a context seeded with initial data.
    pub fn from_map(data: HashMap<String, serde_json::Value>) -> Self {
        let ctx = Self::new();
        for (k, v) in data {
            ctx.data.insert(k, v);
        }
        ctx
    }

    /// Builder-style seed, used while preparing a run.
    pub fn with_value(self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.set_value(key, value);
        self
    }

    pub fn workflow_id(&self) -> &RunId {
        &self.workflow_id
    }

    /// Set a value (overwrites an existing key).
    pub fn set_value(&self, key: impl Into<String>, value: serde_json::Value) {
        self.data.insert(key.into(), value);
    }

    /// Get a copy of a value by key.
    pub fn get_value(&self, key: &str) -> Option<serde_json::Value> {
        self.data.get(key).map(|v| v.value().clone())
    }

    /// Get a value as a string, if it's a string.
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.data
            .get(key)
            .and_then(|v| v.value().as_str().map(|s| s.to_string()))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Record an agent's result. Returns `false` if a result for this agent
    /// id already exists; the existing result is kept.
    pub fn record_result(&self, agent_id: impl Into<String>, result: AgentResult) -> bool {
        match self.results.entry(agent_id.into()) {
            Entry::Occupied(existing) => {
                warn!(
                    workflow_id = %self.workflow_id,
                    agent_id = %existing.key(),
                    "Result already recorded for agent, ignoring second write"
                );
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(result);
                true
            }
        }
    }

    /// Get a copy of an agent's result.
    pub fn get_result(&self, agent_id: &str) -> Option<AgentResult> {
        self.results.get(agent_id).map(|r| r.value().clone())
    }

    /// True iff a result exists for `agent_id` and it succeeded.
    pub fn is_unit_satisfied(&self, agent_id: &str) -> bool {
        self.results
            .get(agent_id)
            .is_some_and(|r| r.value().success)
    }

    pub fn result_count(&self) -> usize {
        self.results.len()
    }

    /// All recorded results, sorted by agent id.
    pub fn results(&self) -> Vec<AgentResult> {
        let mut all: Vec<AgentResult> = self.results.iter().map(|r| r.value().clone()).collect();
        all.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        all
    }

    /// A point-in-time, serializable copy of the context.
    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            workflow_id: self.workflow_id.to_string(),
            data: self
                .data
                .iter()
                .map(|e| (e.key().clone(), e.value().clone()))
                .collect(),
            agent_results: self
                .results
                .iter()
                .map(|e| (e.key().clone(), e.value().clone()))
                .collect(),
        }
    }
}

impl Default for WorkflowContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable view of a [`WorkflowContext`], keys sorted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSnapshot {
    pub workflow_id: String,
    pub data: BTreeMap<String, serde_json::Value>,
    pub agent_results: BTreeMap<String, AgentResult>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_basic_operations() {
        let ctx = WorkflowContext::new().with_value("input", json!("x"));
        ctx.set_value("count", json!(42));

        assert_eq!(ctx.get_str("input"), Some("x".to_string()));
        assert_eq!(ctx.get_value("count"), Some(json!(42)));
        assert_eq!(ctx.get_value("missing"), None);
        assert!(ctx.contains_key("count"));
    }

    #[test]
    fn test_overwrite_value() {
        let ctx = WorkflowContext::new();
        ctx.set_value("k", json!(1));
        ctx.set_value("k", json!(2));
        assert_eq!(ctx.get_value("k"), Some(json!(2)));
    }

    #[test]
    fn test_unit_satisfied_requires_success() {
        let ctx = WorkflowContext::new();
        assert!(!ctx.is_unit_satisfied("a"));

        ctx.record_result("a", AgentResult::success("a", json!(null)));
        ctx.record_result("b", AgentResult::failure("b", "nope"));

        assert!(ctx.is_unit_satisfied("a"));
        assert!(!ctx.is_unit_satisfied("b"));
        assert!(ctx.get_result("b").is_some());
    }

    #[test]
    fn test_result_is_write_once() {
        let ctx = WorkflowContext::new();
        assert!(ctx.record_result("a", AgentResult::failure("a", "first")));
        assert!(!ctx.record_result("a", AgentResult::success("a", json!(1))));

        let r = ctx.get_result("a").unwrap();
        assert!(!r.success);
        assert_eq!(r.error_message.as_deref(), Some("first"));
        assert_eq!(ctx.result_count(), 1);
    }

    #[test]
    fn test_from_map_and_snapshot() {
        let mut map = HashMap::new();
        map.insert("topic".to_string(), json!("graphs"));
        let ctx = WorkflowContext::from_map(map);
        ctx.record_result("z", AgentResult::success("z", json!(1)));
        ctx.record_result("a", AgentResult::success("a", json!(2)));

        let snap = ctx.snapshot();
        assert_eq!(snap.workflow_id, ctx.workflow_id().to_string());
        assert_eq!(snap.data.get("topic"), Some(&json!("graphs")));
        let keys: Vec<_> = snap.agent_results.keys().cloned().collect();
        assert_eq!(keys, vec!["a", "z"]);

        let ids: Vec<_> = ctx.results().into_iter().map(|r| r.agent_id).collect();
        assert_eq!(ids, vec!["a", "z"]);
    }

    #[test]
    fn test_concurrent_distinct_key_writes() {
        let ctx = Arc::new(WorkflowContext::new());
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let ctx = ctx.clone();
                std::thread::spawn(move || {
                    let id = format!("agent-{}", i);
                    ctx.set_value(format!("key-{}", i), json!(i));
                    ctx.record_result(id.clone(), AgentResult::success(id, json!(i)))
                })
            })
            .collect();

        for h in handles {
            assert!(h.join().unwrap());
        }
        assert_eq!(ctx.result_count(), 16);
        assert!((0..16).all(|i| ctx.is_unit_satisfied(&format!("agent-{}", i))));
    }
}
