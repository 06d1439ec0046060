//! Workflow graph engine.
//!
//! A workflow is a set of `WorkflowNode`s, each wrapping one agent plus the
//! agent ids it waits on and a `LogicalOperator` gate. `WorkflowDag` runs the
//! graph in rounds: every node whose gate is open is dispatched at once, and
//! the next round starts only after the whole wave has finished. Results flow
//! between nodes through the shared `WorkflowContext`.

pub mod executor;
pub mod node;
pub mod operator;
pub mod report;

pub use executor::WorkflowDag;
pub use node::{NodeStatus, WorkflowNode};
pub use operator::LogicalOperator;
pub use report::{ExecutionReport, ExecutionSummary};
