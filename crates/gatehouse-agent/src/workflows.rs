use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use gatehouse_core::config::{AppConfig, EngineConfig};
use gatehouse_core::context::WorkflowContext;
use gatehouse_core::error::{GatehouseError, Result};
use gatehouse_core::event::WorkflowEventBus;
use gatehouse_core::types::RunId;
use gatehouse_http::ApiRequest;

use crate::agents::{
    AgentCatalogue, API_CALL_ID, API_CONFIG_KEY, DATA_PROCESSOR_ID, INPUT_KEY, VALIDATION_ID,
};
use crate::graph::{ExecutionReport, LogicalOperator, WorkflowDag, WorkflowNode};

/// Input used when a request carries none.
pub const DEFAULT_INPUT: &str = "default input data";

/// The canned workflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowKind {
    /// data-processor AND validation -> report.
    Sample,
    /// data-processor OR validation -> report.
    Complex,
    /// data-processor -> api-call -> report.
    Api,
    /// data-processor -> (api-call, validation) -> AND -> report.
    ParallelApi,
}

impl WorkflowKind {
    pub fn all() -> [WorkflowKind; 4] {
        [Self::Sample, Self::Complex, Self::Api, Self::ParallelApi]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sample => "sample",
            Self::Complex => "complex",
            Self::Api => "api",
            Self::ParallelApi => "parallel-api",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Sample => "Data processing AND validation, then a report",
            Self::Complex => "Data processing OR validation, then a report",
            Self::Api => "Data processing, then an API call, then a report",
            Self::ParallelApi => "Data processing, then an API call and validation in parallel, then a report",
        }
    }

    /// Whether the workflow contains the API call agent.
    pub fn uses_api(&self) -> bool {
        matches!(self, Self::Api | Self::ParallelApi)
    }

    /// Build a fresh graph for this workflow.
    pub fn build(&self, agents: &AgentCatalogue, engine: &EngineConfig) -> Result<WorkflowDag> {
        let workflow_id = format!("{}-workflow-{}", self.as_str(), Uuid::new_v4());
        let dag = WorkflowDag::new(workflow_id).with_config(engine.clone());

        let dag = match self {
            Self::Sample | Self::Complex => {
                let operator = if *self == Self::Sample {
                    LogicalOperator::And
                } else {
                    LogicalOperator::Or
                };
                dag.with_node(WorkflowNode::new("node-1", agents.data_processor.clone()))?
                    .with_node(WorkflowNode::new("node-2", agents.validation.clone()))?
                    .with_node(
                        WorkflowNode::new("node-3", agents.report_generator.clone())
                            .with_dependencies([DATA_PROCESSOR_ID, VALIDATION_ID])
                            .with_operator(operator),
                    )?
            }
            Self::Api => dag
                .with_node(WorkflowNode::new("node-1", agents.data_processor.clone()))?
                .with_node(
                    WorkflowNode::new("node-2", agents.api_call.clone()).depends_on(DATA_PROCESSOR_ID),
                )?
                .with_node(
                    WorkflowNode::new("node-3", agents.report_generator.clone()).depends_on(API_CALL_ID),
                )?,
            Self::ParallelApi => dag
                .with_node(WorkflowNode::new("node-1", agents.data_processor.clone()))?
                .with_node(
                    WorkflowNode::new("node-2", agents.api_call.clone()).depends_on(DATA_PROCESSOR_ID),
                )?
                .with_node(
                    WorkflowNode::new("node-3", agents.validation.clone()).depends_on(DATA_PROCESSOR_ID),
                )?
                .with_node(
                    WorkflowNode::new("node-4", agents.report_generator.clone())
                        .with_dependencies([API_CALL_ID, VALIDATION_ID])
                        .with_operator(LogicalOperator::And),
                )?,
        };

        info!(workflow_id = %dag.workflow_id(), kind = self.as_str(), "Created workflow");
        Ok(dag)
    }
}

impl FromStr for WorkflowKind {
    type Err = GatehouseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sample" => Ok(Self::Sample),
            "complex" => Ok(Self::Complex),
            "api" => Ok(Self::Api),
            "parallel-api" | "parallel_api" => Ok(Self::ParallelApi),
            other => Err(GatehouseError::Config(format!("Unknown workflow: {}", other))),
        }
    }
}

impl fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller input for one workflow run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRequest {
    #[serde(default)]
    pub input: Option<serde_json::Value>,
    #[serde(default)]
    pub api_config: Option<serde_json::Value>,
}

impl WorkflowRequest {
    pub fn with_input(input: impl Into<serde_json::Value>) -> Self {
        Self {
            input: Some(input.into()),
            api_config: None,
        }
    }

    pub fn api_config(mut self, request: &ApiRequest) -> Result<Self> {
        self.api_config = Some(serde_json::to_value(request)?);
        Ok(self)
    }
}

/// Seed a context for `dag` from a request.
///
/// A present but malformed `apiConfig` is rejected before anything runs.
pub fn prepare_context(dag: &WorkflowDag, request: &WorkflowRequest) -> Result<WorkflowContext> {
    let input = request.input.clone().unwrap_or_else(|| json!(DEFAULT_INPUT));
    let ctx = WorkflowContext::with_id(RunId::from_string(dag.workflow_id()))
        .with_value(INPUT_KEY, input)
        .with_value("startTime", json!(Utc::now()));

    if let Some(config) = &request.api_config {
        ApiRequest::from_json(config)?;
        ctx.set_value(API_CONFIG_KEY, config.clone());
    }
    Ok(ctx)
}

/// Run a prepared graph against a context and report on it.
pub async fn execute_workflow(dag: &mut WorkflowDag, ctx: WorkflowContext) -> Result<ExecutionReport> {
    info!(workflow_id = %dag.workflow_id(), "Executing workflow");
    dag.execute(Arc::new(ctx)).await
}

/// Builds and runs canned workflows with shared agents and config.
#[derive(Clone)]
pub struct WorkflowRunner {
    agents: AgentCatalogue,
    engine: EngineConfig,
    event_bus: Option<Arc<WorkflowEventBus>>,
}

impl WorkflowRunner {
    pub fn new(agents: AgentCatalogue, engine: EngineConfig) -> Self {
        Self {
            agents,
            engine,
            event_bus: None,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(AgentCatalogue::from_config(config)?, config.engine.clone()))
    }

    pub fn with_event_bus(mut self, bus: Arc<WorkflowEventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn agents(&self) -> &AgentCatalogue {
        &self.agents
    }

    pub async fn run(&self, kind: WorkflowKind, request: &WorkflowRequest) -> Result<ExecutionReport> {
        let mut dag = kind.build(&self.agents, &self.engine)?;
        if let Some(bus) = &self.event_bus {
            dag = dag.with_event_bus(bus.clone());
        }
        let ctx = prepare_context(&dag, request)?;
        execute_workflow(&mut dag, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_test_utils::test_config;

    fn catalogue() -> AgentCatalogue {
        AgentCatalogue::from_config(&test_config()).unwrap()
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("sample".parse::<WorkflowKind>().unwrap(), WorkflowKind::Sample);
        assert_eq!("Parallel-API".parse::<WorkflowKind>().unwrap(), WorkflowKind::ParallelApi);
        assert!("serial".parse::<WorkflowKind>().is_err());
        for kind in WorkflowKind::all() {
            assert_eq!(kind.as_str().parse::<WorkflowKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_build_shapes() {
        let agents = catalogue();
        let engine = EngineConfig::default();

        let sample = WorkflowKind::Sample.build(&agents, &engine).unwrap();
        assert!(sample.workflow_id().starts_with("sample-workflow-"));
        assert_eq!(sample.len(), 3);
        assert_eq!(sample.node("node-3").unwrap().operator(), LogicalOperator::And);

        let complex = WorkflowKind::Complex.build(&agents, &engine).unwrap();
        assert_eq!(complex.node("node-3").unwrap().operator(), LogicalOperator::Or);

        let parallel = WorkflowKind::ParallelApi.build(&agents, &engine).unwrap();
        assert_eq!(parallel.len(), 4);
        assert_eq!(
            parallel.node("node-4").unwrap().dependencies(),
            [API_CALL_ID, VALIDATION_ID]
        );
    }

    #[test]
    fn test_each_build_gets_a_fresh_id() {
        let agents = catalogue();
        let engine = EngineConfig::default();
        let a = WorkflowKind::Api.build(&agents, &engine).unwrap();
        let b = WorkflowKind::Api.build(&agents, &engine).unwrap();
        assert_ne!(a.workflow_id(), b.workflow_id());
    }

    #[test]
    fn test_prepare_context_defaults_and_validation() {
        let dag = WorkflowKind::Sample
            .build(&catalogue(), &EngineConfig::default())
            .unwrap();

        let ctx = prepare_context(&dag, &WorkflowRequest::default()).unwrap();
        assert_eq!(ctx.get_str(INPUT_KEY).as_deref(), Some(DEFAULT_INPUT));
        assert_eq!(ctx.workflow_id().as_str(), dag.workflow_id());
        assert!(!ctx.contains_key(API_CONFIG_KEY));

        let bad = WorkflowRequest {
            input: None,
            api_config: Some(json!({"method": "GET"})),
        };
        assert!(matches!(
            prepare_context(&dag, &bad),
            Err(GatehouseError::InvalidApiConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_sample_workflow_runs_two_rounds() {
        let runner = WorkflowRunner::new(catalogue(), EngineConfig::default());
        let report = runner
            .run(WorkflowKind::Sample, &WorkflowRequest::with_input("hello"))
            .await
            .unwrap();

        assert_eq!(report.rounds, 2);
        assert_eq!(report.summary.total_nodes, 3);
        assert_eq!(report.summary.successful_nodes, 3);
        assert!(report.context.agent_results.contains_key("report-generator-agent"));
    }
}
