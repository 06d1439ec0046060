pub mod agents;
pub mod graph;
pub mod workflows;

pub use agents::AgentCatalogue;
pub use graph::{
    ExecutionReport, ExecutionSummary, LogicalOperator, NodeStatus, WorkflowDag, WorkflowNode,
};
pub use workflows::{execute_workflow, prepare_context, WorkflowKind, WorkflowRequest, WorkflowRunner};
