use futures::future::BoxFuture;
use serde_json::json;
use tracing::info;

use gatehouse_core::context::WorkflowContext;
use gatehouse_core::error::Result;
use gatehouse_core::traits::Agent;
use gatehouse_core::types::AgentResult;

use super::{display_value, simulate_latency, INPUT_KEY};

pub const DATA_PROCESSOR_ID: &str = "data-processor-agent";

const DEFAULT_INPUT: &str = "default input data";

/// Cleans and restructures the workflow input.
pub struct DataProcessorAgent {
    simulate_latency: bool,
}

impl DataProcessorAgent {
    pub fn new(simulate_latency: bool) -> Self {
        Self { simulate_latency }
    }
}

fn process(input: &str) -> String {
    format!("Processed data: [{}] -> cleaned structured data", input)
}

impl Agent for DataProcessorAgent {
    fn agent_id(&self) -> &str {
        DATA_PROCESSOR_ID
    }

    fn description(&self) -> &str {
        "Data processor: cleans and transforms the workflow input"
    }

    fn execute<'a>(&'a self, ctx: &'a WorkflowContext) -> BoxFuture<'a, Result<AgentResult>> {
        Box::pin(async move {
            let original = ctx
                .get_value(INPUT_KEY)
                .unwrap_or_else(|| json!(DEFAULT_INPUT));
            let processed = process(&display_value(&original));

            simulate_latency(self.simulate_latency, 1000).await;

            info!(agent_id = DATA_PROCESSOR_ID, size = processed.chars().count(), "Data processed");
            Ok(AgentResult::success(
                DATA_PROCESSOR_ID,
                json!({
                    "originalData": original,
                    "dataSize": processed.chars().count(),
                    "processedData": processed,
                }),
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_processes_input() {
        let ctx = WorkflowContext::new().with_value(INPUT_KEY, json!("raw"));
        let result = DataProcessorAgent::new(false).execute(&ctx).await.unwrap();

        assert!(result.success);
        assert_eq!(result.field("originalData"), Some(&json!("raw")));
        let processed = result.field("processedData").unwrap().as_str().unwrap();
        assert!(processed.contains("[raw]"));
        assert_eq!(
            result.field("dataSize"),
            Some(&json!(processed.chars().count()))
        );
    }

    #[tokio::test]
    async fn test_missing_input_uses_default() {
        let ctx = WorkflowContext::new();
        let result = DataProcessorAgent::new(false).execute(&ctx).await.unwrap();
        assert_eq!(result.field("originalData"), Some(&json!(DEFAULT_INPUT)));
    }

    #[test]
    fn test_always_executable() {
        assert!(DataProcessorAgent::new(false).can_execute(&WorkflowContext::new()));
    }
}
