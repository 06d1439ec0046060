use std::fmt::Write as _;

use chrono::Utc;
use futures::future::BoxFuture;
use serde_json::{json, Value};
use tracing::info;

use gatehouse_core::context::WorkflowContext;
use gatehouse_core::error::{GatehouseError, Result};
use gatehouse_core::traits::Agent;
use gatehouse_core::types::AgentResult;

use super::{display_value, simulate_latency, API_CALL_ID, DATA_PROCESSOR_ID, VALIDATION_ID};

pub const REPORT_GENERATOR_ID: &str = "report-generator-agent";

/// Assembles a final report from the upstream agents' results.
///
/// A successful data-processor result is required. Validation and API call
/// sections are included when those agents ran in the same workflow.
pub struct ReportGeneratorAgent {
    simulate_latency: bool,
}

impl ReportGeneratorAgent {
    pub fn new(simulate_latency: bool) -> Self {
        Self { simulate_latency }
    }
}

fn summarize_result(result: &AgentResult) -> Value {
    let mut summary = json!({
        "agentId": result.agent_id,
        "success": result.success,
        "executionTime": result.execution_time,
    });
    if let Some(err) = &result.error_message {
        summary["errorMessage"] = json!(err);
    }
    summary
}

fn field_text(result: &AgentResult, key: &str) -> String {
    result.field(key).map(display_value).unwrap_or_else(|| "n/a".into())
}

fn render_report(
    workflow_id: &str,
    data: &AgentResult,
    validation: Option<&AgentResult>,
    api: Option<&AgentResult>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Workflow Execution Report ===");
    let _ = writeln!(out, "Workflow ID: {}", workflow_id);
    let _ = writeln!(out, "Generated at: {}\n", Utc::now().to_rfc3339());

    let _ = writeln!(out, "## Data processing");
    let _ = writeln!(out, "- Original data: {}", field_text(data, "originalData"));
    let _ = writeln!(out, "- Processed data: {}", field_text(data, "processedData"));
    let _ = writeln!(out, "- Data size: {} chars\n", field_text(data, "dataSize"));

    if let Some(v) = validation {
        let _ = writeln!(out, "## Validation");
        if v.success {
            let _ = writeln!(out, "- Valid: {}", field_text(v, "isValid"));
            let _ = writeln!(out, "- Score: {}", field_text(v, "validationScore"));
            let _ = writeln!(out, "- Report: {}\n", field_text(v, "validationReport"));
        } else {
            let _ = writeln!(out, "- Failed: {}\n", v.error_message.as_deref().unwrap_or("unknown"));
        }
    }

    if let Some(a) = api {
        let _ = writeln!(out, "## API call");
        if a.success {
            let _ = writeln!(out, "- Call succeeded: {}", field_text(a, "callSuccess"));
            let status = a
                .field("apiResponse")
                .and_then(|r| r.get("statusCode"))
                .map(display_value)
                .unwrap_or_else(|| "n/a".into());
            let _ = writeln!(out, "- Status code: {}\n", status);
        } else {
            let _ = writeln!(out, "- Failed: {}\n", a.error_message.as_deref().unwrap_or("unknown"));
        }
    }

    let _ = writeln!(out, "## Summary");
    let _ = writeln!(
        out,
        "Upstream agents completed; data processing produced a structured result."
    );
    out.push_str("=== End of report ===");
    out
}

impl Agent for ReportGeneratorAgent {
    fn agent_id(&self) -> &str {
        REPORT_GENERATOR_ID
    }

    fn description(&self) -> &str {
        "Report generator: builds a combined report from upstream results"
    }

    fn execute<'a>(&'a self, ctx: &'a WorkflowContext) -> BoxFuture<'a, Result<AgentResult>> {
        Box::pin(async move {
            let data = ctx
                .get_result(DATA_PROCESSOR_ID)
                .filter(|r| r.success)
                .ok_or_else(|| {
                    GatehouseError::agent(
                        REPORT_GENERATOR_ID,
                        format!("{} has not completed successfully", DATA_PROCESSOR_ID),
                    )
                })?;
            let validation = ctx.get_result(VALIDATION_ID);
            let api = ctx.get_result(API_CALL_ID);

            let report = render_report(
                ctx.workflow_id().as_str(),
                &data,
                validation.as_ref(),
                api.as_ref(),
            );

            let mut payload = json!({
                "generatedAt": Utc::now(),
                "dataProcessorSummary": summarize_result(&data),
            });
            if let Some(v) = &validation {
                payload["validationSummary"] = summarize_result(v);
            }
            if let Some(a) = &api {
                payload["apiCallSummary"] = summarize_result(a);
            }

            simulate_latency(self.simulate_latency, 1200).await;

            info!(agent_id = REPORT_GENERATOR_ID, length = report.len(), "Report generated");
            payload["finalReport"] = json!(report);
            Ok(AgentResult::success(REPORT_GENERATOR_ID, payload))
        })
    }

    fn can_execute(&self, ctx: &WorkflowContext) -> bool {
        ctx.is_unit_satisfied(DATA_PROCESSOR_ID)
    }
}
