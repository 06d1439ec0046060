use futures::future::BoxFuture;

use crate::context::WorkflowContext;
use crate::error::Result;
use crate::types::AgentResult;

/// One independently executable unit of work in a workflow.
///
/// `execute` either returns a result (success or failure) or an error. The
/// engine converts an error, or a panic, into a failure [`AgentResult`] at
/// the dispatch boundary, so an agent never aborts a run.
pub trait Agent: Send + Sync + 'static {
    /// Agent id. Downstream nodes name this id as a dependency.
    fn agent_id(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// Run the agent against the shared context.
    fn execute<'a>(&'a self, ctx: &'a WorkflowContext) -> BoxFuture<'a, Result<AgentResult>>;

    /// Pre-condition check callers may use before wiring the agent into a
    /// graph. The engine does not consult it; readiness inside a graph is
    /// decided by the node's gate.
    fn can_execute(&self, ctx: &WorkflowContext) -> bool {
        let _ = ctx;
        true
    }
}
