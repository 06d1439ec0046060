use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use gatehouse_core::context::WorkflowContext;
use gatehouse_core::traits::Agent;

use super::operator::LogicalOperator;

/// A node in the workflow graph.
///
/// Wraps one agent together with the agent ids it depends on and the gate
/// applied to them. Dependencies name *agent* ids, not node ids.
pub struct WorkflowNode {
    /// Unique identifier for this node within its graph.
    pub node_id: String,
    agent: Arc<dyn Agent>,
    dependencies: Vec<String>,
    operator: LogicalOperator,
    executed: bool,
    ready: bool,
    round: Option<usize>,
}

impl WorkflowNode {
    /// Create a node with no dependencies and an AND gate.
    pub fn new(node_id: impl Into<String>, agent: Arc<dyn Agent>) -> Self {
        Self {
            node_id: node_id.into(),
            agent,
            dependencies: vec![],
            operator: LogicalOperator::default(),
            executed: false,
            ready: false,
            round: None,
        }
    }

    /// Set the predecessor agent ids.
    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Add one predecessor agent id.
    pub fn depends_on(mut self, agent_id: impl Into<String>) -> Self {
        self.dependencies.push(agent_id.into());
        self
    }

    /// Set the gate operator.
    pub fn with_operator(mut self, operator: LogicalOperator) -> Self {
        self.operator = operator;
        self
    }

    pub fn agent(&self) -> &Arc<dyn Agent> {
        &self.agent
    }

    pub fn agent_id(&self) -> &str {
        self.agent.agent_id()
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn operator(&self) -> LogicalOperator {
        self.operator
    }

    pub fn is_executed(&self) -> bool {
        self.executed
    }

    /// Readiness from the last evaluation.
    pub fn last_ready(&self) -> bool {
        self.ready
    }

    /// 1-based round the node was dispatched in.
    pub fn round(&self) -> Option<usize> {
        self.round
    }

    /// Evaluate the gate against `ctx` and cache the answer.
    pub fn is_ready(&mut self, ctx: &WorkflowContext) -> bool {
        self.ready = self.operator.evaluate(&self.dependencies, ctx);
        self.ready
    }

    /// Flag the node as executed. Never unset.
    pub(crate) fn mark_executed(&mut self, round: usize) {
        if !self.executed {
            self.executed = true;
            self.round = Some(round);
        }
    }

    pub fn status(&self) -> NodeStatus {
        NodeStatus {
            node_id: self.node_id.clone(),
            agent_id: self.agent_id().to_string(),
            dependencies: self.dependencies.clone(),
            operator: self.operator,
            executed: self.executed,
            ready: self.ready,
            round: self.round,
        }
    }
}

impl fmt::Debug for WorkflowNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowNode")
            .field("node_id", &self.node_id)
            .field("agent_id", &self.agent_id())
            .field("dependencies", &self.dependencies)
            .field("operator", &self.operator)
            .field("executed", &self.executed)
            .field("round", &self.round)
            .finish()
    }
}

/// Serializable view of a node's state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStatus {
    pub node_id: String,
    pub agent_id: String,
    pub dependencies: Vec<String>,
    pub operator: LogicalOperator,
    pub executed: bool,
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round: Option<usize>,
}
