use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use gatehouse_core::config::EngineConfig;
use gatehouse_core::context::WorkflowContext;
use gatehouse_core::error::{GatehouseError, Result};
use gatehouse_core::event::{WorkflowEvent, WorkflowEventBus};
use gatehouse_core::traits::Agent;
use gatehouse_core::types::AgentResult;

use super::node::WorkflowNode;
use super::report::{ExecutionReport, ExecutionSummary};

/// Executes a workflow DAG in synchronized rounds.
///
/// Each round collects every unexecuted node whose gate is open, runs all of
/// them concurrently, and waits for the whole wave before re-evaluating
/// gates. The run ends when every node has executed or no pending node can
/// ever become ready (a stall).
pub struct WorkflowDag {
    workflow_id: String,
    nodes: Vec<WorkflowNode>,
    index: HashMap<String, usize>,
    config: EngineConfig,
    event_bus: Option<Arc<WorkflowEventBus>>,
}

impl WorkflowDag {
    pub fn new(workflow_id: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            nodes: Vec::new(),
            index: HashMap::new(),
            config: EngineConfig::default(),
            event_bus: None,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Publish progress events on `bus` while running.
    pub fn with_event_bus(mut self, bus: Arc<WorkflowEventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Add a node. Node ids must be unique within the graph.
    pub fn add_node(&mut self, node: WorkflowNode) -> Result<()> {
        if self.index.contains_key(&node.node_id) {
            return Err(GatehouseError::DuplicateNode(node.node_id.clone()));
        }
        if let Some(other) = self.nodes.iter().find(|n| n.agent_id() == node.agent_id()) {
            warn!(
                workflow_id = %self.workflow_id,
                agent_id = %node.agent_id(),
                first = %other.node_id,
                second = %node.node_id,
                "Two nodes wrap the same agent id; only the first result will be kept"
            );
        }
        debug!(workflow_id = %self.workflow_id, node_id = %node.node_id, "Adding node");
        self.index.insert(node.node_id.clone(), self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    /// Builder-style [`add_node`](Self::add_node).
    pub fn with_node(mut self, node: WorkflowNode) -> Result<Self> {
        self.add_node(node)?;
        Ok(self)
    }

    pub fn node(&self, node_id: &str) -> Option<&WorkflowNode> {
        self.index.get(node_id).map(|&i| &self.nodes[i])
    }

    /// Nodes in declaration order.
    pub fn nodes(&self) -> &[WorkflowNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ids of nodes that have not executed, in declaration order.
    pub fn pending_node_ids(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|n| !n.is_executed())
            .map(|n| n.node_id.clone())
            .collect()
    }

    /// Indices of unexecuted nodes whose gate is currently open.
    ///
    /// Refreshes the cached readiness of every unexecuted node.
    pub fn check_can_execute(&mut self, ctx: &WorkflowContext) -> Vec<usize> {
        self.nodes
            .iter_mut()
            .enumerate()
            .filter(|(_, n)| !n.is_executed())
            .filter_map(|(i, n)| n.is_ready(ctx).then_some(i))
            .collect()
    }

    /// Run the graph to completion or stall.
    ///
    /// Agent errors, panics and timeouts become failure results and never
    /// abort the run. With `fail_on_stall` set, a stall returns
    /// [`GatehouseError::Stalled`]; the context and node flags stay
    /// inspectable either way.
    pub async fn execute(&mut self, ctx: Arc<WorkflowContext>) -> Result<ExecutionReport> {
        let start = Instant::now();
        let mut rounds = 0usize;
        let mut stalled = false;

        info!(
            workflow_id = %self.workflow_id,
            nodes = self.nodes.len(),
            "Starting workflow"
        );
        self.publish(WorkflowEvent::WorkflowStarted {
            workflow_id: self.workflow_id.clone(),
            total_nodes: self.nodes.len(),
        });

        loop {
            let ready = self.check_can_execute(&ctx);
            if ready.is_empty() {
                let pending = self.pending_node_ids();
                if !pending.is_empty() {
                    stalled = true;
                    warn!(
                        workflow_id = %self.workflow_id,
                        pending = ?pending,
                        "Workflow stalled: no pending node can become ready"
                    );
                    self.publish(WorkflowEvent::WorkflowStalled {
                        workflow_id: self.workflow_id.clone(),
                        pending: pending.clone(),
                    });
                    if self.config.fail_on_stall {
                        return Err(GatehouseError::Stalled {
                            workflow_id: self.workflow_id.clone(),
                            pending,
                        });
                    }
                }
                break;
            }

            rounds += 1;
            self.run_round(rounds, ready, &ctx).await;
        }

        let summary = self.summarize(&ctx);
        let elapsed_ms = start.elapsed().as_millis() as u64;

        info!(
            workflow_id = %self.workflow_id,
            rounds,
            completed = summary.completed_nodes,
            successful = summary.successful_nodes,
            failed = summary.failed_nodes,
            elapsed_ms,
            "Workflow finished"
        );
        self.publish(WorkflowEvent::WorkflowCompleted {
            workflow_id: self.workflow_id.clone(),
            rounds,
            successful_nodes: summary.successful_nodes,
            failed_nodes: summary.failed_nodes,
        });

        Ok(ExecutionReport {
            summary,
            rounds,
            pending: self.pending_node_ids(),
            stalled,
            elapsed_ms,
            nodes: self.nodes.iter().map(WorkflowNode::status).collect(),
            context: ctx.snapshot(),
        })
    }

    /// Dispatch one wave and wait for all of it.
    async fn run_round(&mut self, round: usize, ready: Vec<usize>, ctx: &Arc<WorkflowContext>) {
        let node_ids: Vec<String> = ready.iter().map(|&i| self.nodes[i].node_id.clone()).collect();
        info!(
            workflow_id = %self.workflow_id,
            round,
            nodes = ?node_ids,
            "Dispatching round"
        );
        self.publish(WorkflowEvent::RoundStarted {
            workflow_id: self.workflow_id.clone(),
            round,
            node_ids,
        });

        let limiter = (self.config.max_parallel > 0)
            .then(|| Arc::new(Semaphore::new(self.config.max_parallel)));
        let timeout = self.config.node_timeout_secs.map(Duration::from_secs);

        let mut tasks = JoinSet::new();
        for &idx in &ready {
            let agent = Arc::clone(self.nodes[idx].agent());
            let ctx = Arc::clone(ctx);
            let limiter = limiter.clone();
            tasks.spawn(async move {
                let _permit = match limiter {
                    Some(sem) => sem.acquire_owned().await.ok(),
                    None => None,
                };
                let result = attempt(agent.as_ref(), &ctx, timeout).await;
                let success = result.success;
                ctx.record_result(agent.agent_id(), result);
                (idx, success)
            });
        }

        let mut joined = HashSet::new();
        while let Some(outcome) = tasks.join_next().await {
            match outcome {
                Ok((idx, success)) => {
                    joined.insert(idx);
                    let node = &self.nodes[idx];
                    debug!(
                        workflow_id = %self.workflow_id,
                        node_id = %node.node_id,
                        agent_id = %node.agent_id(),
                        success,
                        "Node finished"
                    );
                    self.publish(WorkflowEvent::NodeCompleted {
                        workflow_id: self.workflow_id.clone(),
                        node_id: node.node_id.clone(),
                        agent_id: node.agent_id().to_string(),
                        round,
                        success,
                    });
                }
                Err(e) => {
                    error!(workflow_id = %self.workflow_id, error = %e, "Node task did not complete");
                }
            }
        }

        // Barrier reached: every dispatched node is executed, whatever happened to its task.
        for idx in ready {
            let node = &mut self.nodes[idx];
            if !joined.contains(&idx) && ctx.get_result(node.agent_id()).is_none() {
                ctx.record_result(
                    node.agent_id(),
                    AgentResult::failure(node.agent_id(), "agent task aborted"),
                );
            }
            node.mark_executed(round);
        }
    }

    /// Count nodes by outcome. Idempotent, and valid after a stall.
    pub fn summarize(&self, ctx: &WorkflowContext) -> ExecutionSummary {
        let completed: Vec<&WorkflowNode> = self.nodes.iter().filter(|n| n.is_executed()).collect();
        let successful = completed
            .iter()
            .filter(|n| ctx.is_unit_satisfied(n.agent_id()))
            .count();

        ExecutionSummary {
            workflow_id: self.workflow_id.clone(),
            total_nodes: self.nodes.len(),
            completed_nodes: completed.len(),
            successful_nodes: successful,
            failed_nodes: completed.len() - successful,
        }
    }

    fn publish(&self, event: WorkflowEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }
}

/// Run one agent, folding errors, panics and timeouts into a failure result.
async fn attempt(
    agent: &dyn Agent,
    ctx: &WorkflowContext,
    timeout: Option<Duration>,
) -> AgentResult {
    let agent_id = agent.agent_id();
    let run = AssertUnwindSafe(agent.execute(ctx)).catch_unwind();

    let outcome = match timeout {
        Some(limit) => match tokio::time::timeout(limit, run).await {
            Ok(outcome) => outcome,
            Err(_) => {
                let err = GatehouseError::AgentTimeout {
                    agent: agent_id.to_string(),
                    timeout_secs: limit.as_secs(),
                };
                warn!(agent_id, error = %err, "Agent timed out");
                return AgentResult::failure(agent_id, err.to_string());
            }
        },
        None => run.await,
    };

    match outcome {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            warn!(agent_id, error = %e, "Agent returned an error");
            AgentResult::failure(agent_id, e.to_string())
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            error!(agent_id, panic = %message, "Agent panicked");
            AgentResult::failure(agent_id, format!("Agent panicked: {}", message))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::LogicalOperator;
    use gatehouse_test_utils::{ErroringAgent, PanickingAgent, SlowAgent, StaticAgent};

    fn node(id: &str, agent: impl Agent) -> WorkflowNode {
        WorkflowNode::new(id, Arc::new(agent))
    }

    #[test]
    fn test_duplicate_node_id_rejected() {
        let mut dag = WorkflowDag::new("wf");
        dag.add_node(node("n1", StaticAgent::succeed("a"))).unwrap();
        let err = dag.add_node(node("n1", StaticAgent::succeed("b"))).unwrap_err();
        assert!(matches!(err, GatehouseError::DuplicateNode(ref id) if id == "n1"));
        assert_eq!(dag.len(), 1);
    }

    #[test]
    fn test_check_can_execute_only_roots_initially() {
        let mut dag = WorkflowDag::new("wf")
            .with_node(node("n1", StaticAgent::succeed("a")))
            .unwrap()
            .with_node(node("n2", StaticAgent::succeed("b")).depends_on("a"))
            .unwrap();
        let ctx = WorkflowContext::new();
        assert_eq!(dag.check_can_execute(&ctx), vec![0]);
        assert!(!dag.node("n2").unwrap().last_ready());
    }

    #[tokio::test]
    async fn test_round_barrier_orders_chain() {
        let mut dag = WorkflowDag::new("chain")
            .with_node(node("n1", StaticAgent::succeed("a")))
            .unwrap()
            .with_node(node("n2", StaticAgent::succeed("b")).depends_on("a"))
            .unwrap()
            .with_node(node("n3", StaticAgent::succeed("c")).depends_on("b"))
            .unwrap();

        let report = dag.execute(Arc::new(WorkflowContext::new())).await.unwrap();

        assert_eq!(report.rounds, 3);
        assert_eq!(dag.node("n1").unwrap().round(), Some(1));
        assert_eq!(dag.node("n2").unwrap().round(), Some(2));
        assert_eq!(dag.node("n3").unwrap().round(), Some(3));
        assert!(report.succeeded());
    }

    #[tokio::test]
    async fn test_independent_nodes_share_first_round() {
        let mut dag = WorkflowDag::new("fan")
            .with_node(node("n1", SlowAgent::new("a", 150)))
            .unwrap()
            .with_node(node("n2", SlowAgent::new("b", 150)))
            .unwrap();

        let started = Instant::now();
        let report = dag.execute(Arc::new(WorkflowContext::new())).await.unwrap();

        assert_eq!(report.rounds, 1);
        assert!(started.elapsed() < Duration::from_millis(290));
    }

    #[tokio::test]
    async fn test_max_parallel_serializes_wave() {
        let config = EngineConfig {
            max_parallel: 1,
            ..EngineConfig::default()
        };
        let mut dag = WorkflowDag::new("narrow")
            .with_config(config)
            .with_node(node("n1", SlowAgent::new("a", 40)))
            .unwrap()
            .with_node(node("n2", SlowAgent::new("b", 40)))
            .unwrap();

        let started = Instant::now();
        let report = dag.execute(Arc::new(WorkflowContext::new())).await.unwrap();

        assert_eq!(report.rounds, 1);
        assert!(started.elapsed() >= Duration::from_millis(80));
    }

    #[tokio::test]
    async fn test_error_and_panic_become_failures() {
        let mut dag = WorkflowDag::new("faults")
            .with_node(node("n1", ErroringAgent::new("err")))
            .unwrap()
            .with_node(node("n2", PanickingAgent::new("boom")))
            .unwrap()
            .with_node(node("n3", StaticAgent::succeed("ok")))
            .unwrap();
        let ctx = Arc::new(WorkflowContext::new());

        let report = dag.execute(ctx.clone()).await.unwrap();

        assert_eq!(report.summary.completed_nodes, 3);
        assert_eq!(report.summary.successful_nodes, 1);
        assert_eq!(report.summary.failed_nodes, 2);
        let panicked = ctx.get_result("boom").unwrap();
        assert!(!panicked.success);
        assert!(panicked.error_message.unwrap().contains("panicked"));
        assert!(!ctx.get_result("err").unwrap().success);
    }

    #[tokio::test]
    async fn test_node_timeout_recorded_as_failure() {
        let config = EngineConfig {
            node_timeout_secs: Some(0),
            ..EngineConfig::default()
        };
        let mut dag = WorkflowDag::new("slow")
            .with_config(config)
            .with_node(node("n1", SlowAgent::new("sleepy", 200)))
            .unwrap();
        let ctx = Arc::new(WorkflowContext::new());

        dag.execute(ctx.clone()).await.unwrap();

        let result = ctx.get_result("sleepy").unwrap();
        assert!(!result.success);
        assert!(result.error_message.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_cycle_stalls_with_error() {
        let mut dag = WorkflowDag::new("cycle")
            .with_config(EngineConfig {
                fail_on_stall: true,
                ..EngineConfig::default()
            })
            .with_node(node("na", StaticAgent::succeed("a")).depends_on("b"))
            .unwrap()
            .with_node(node("nb", StaticAgent::succeed("b")).depends_on("a"))
            .unwrap();
        let ctx = Arc::new(WorkflowContext::new());

        let err = dag.execute(ctx.clone()).await.unwrap_err();
        match err {
            GatehouseError::Stalled { workflow_id, pending } => {
                assert_eq!(workflow_id, "cycle");
                assert_eq!(pending, vec!["na", "nb"]);
            }
            other => panic!("expected stall, got {other}"),
        }
        assert_eq!(ctx.result_count(), 0);
        assert_eq!(dag.summarize(&ctx).completed_nodes, 0);
    }

    #[tokio::test]
    async fn test_stall_reported_when_not_fatal() {
        let config = EngineConfig {
            fail_on_stall: false,
            ..EngineConfig::default()
        };
        let mut dag = WorkflowDag::new("blocked")
            .with_config(config)
            .with_node(node("n1", StaticAgent::fail("a")))
            .unwrap()
            .with_node(node("n2", StaticAgent::succeed("b")).depends_on("a"))
            .unwrap();

        let report = dag.execute(Arc::new(WorkflowContext::new())).await.unwrap();

        assert!(report.stalled);
        assert_eq!(report.pending, vec!["n2"]);
        assert_eq!(report.rounds, 1);
        assert_eq!(report.summary.pending_nodes(), 1);
        assert!(!report.succeeded());
    }

    #[tokio::test]
    async fn test_not_gate_runs_only_before_predecessor_succeeds() {
        let mut dag = WorkflowDag::new("not")
            .with_config(EngineConfig {
                fail_on_stall: false,
                ..EngineConfig::default()
            })
            .with_node(node("guard", StaticAgent::succeed("a")))
            .unwrap()
            .with_node(
                node("fallback", StaticAgent::succeed("b"))
                    .depends_on("a")
                    .with_operator(LogicalOperator::Not),
            )
            .unwrap();

        let report = dag.execute(Arc::new(WorkflowContext::new())).await.unwrap();

        // Both are open in round 1: NOT sees no successful predecessor yet.
        assert_eq!(report.rounds, 1);
        assert_eq!(report.summary.completed_nodes, 2);
    }

    #[tokio::test]
    async fn test_summarize_is_idempotent() {
        let mut dag = WorkflowDag::new("twice")
            .with_node(node("n1", StaticAgent::succeed("a")))
            .unwrap();
        let ctx = Arc::new(WorkflowContext::new());
        dag.execute(ctx.clone()).await.unwrap();

        assert_eq!(dag.summarize(&ctx), dag.summarize(&ctx));
    }

    #[tokio::test]
    async fn test_events_published_in_order() {
        let bus = Arc::new(WorkflowEventBus::default());
        let mut rx = bus.subscribe();
        let mut dag = WorkflowDag::new("events")
            .with_event_bus(bus.clone())
            .with_node(node("n1", StaticAgent::succeed("a")))
            .unwrap();

        dag.execute(Arc::new(WorkflowContext::new())).await.unwrap();

        assert!(matches!(rx.recv().await.unwrap(), WorkflowEvent::WorkflowStarted { total_nodes: 1, .. }));
        assert!(matches!(rx.recv().await.unwrap(), WorkflowEvent::RoundStarted { round: 1, .. }));
        assert!(matches!(rx.recv().await.unwrap(), WorkflowEvent::NodeCompleted { success: true, .. }));
        assert!(matches!(rx.recv().await.unwrap(), WorkflowEvent::WorkflowCompleted { rounds: 1, .. }));
    }

    #[tokio::test]
    async fn test_empty_graph_finishes_immediately() {
        let mut dag = WorkflowDag::new("empty");
        let report = dag.execute(Arc::new(WorkflowContext::new())).await.unwrap();
        assert_eq!(report.rounds, 0);
        assert_eq!(report.summary.total_nodes, 0);
        assert!(report.succeeded());
    }
}
