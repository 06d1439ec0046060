use serde::Serialize;

use gatehouse_core::context::ContextSnapshot;

use super::node::NodeStatus;

/// Node counts for one run, cross-referenced with the context's results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSummary {
    pub workflow_id: String,
    pub total_nodes: usize,
    pub completed_nodes: usize,
    pub successful_nodes: usize,
    pub failed_nodes: usize,
}

impl ExecutionSummary {
    /// Nodes that never executed.
    pub fn pending_nodes(&self) -> usize {
        self.total_nodes - self.completed_nodes
    }
}

/// Result of executing an entire graph.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    #[serde(flatten)]
    pub summary: ExecutionSummary,
    /// Waves dispatched.
    pub rounds: usize,
    /// Node ids left unexecuted when the run stalled.
    pub pending: Vec<String>,
    pub stalled: bool,
    pub elapsed_ms: u64,
    pub nodes: Vec<NodeStatus>,
    pub context: ContextSnapshot,
}

impl ExecutionReport {
    /// Every node ran and every agent succeeded.
    pub fn succeeded(&self) -> bool {
        !self.stalled
            && self.summary.failed_nodes == 0
            && self.summary.completed_nodes == self.summary.total_nodes
    }
}
