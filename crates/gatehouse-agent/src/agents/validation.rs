use futures::future::BoxFuture;
use serde_json::json;
use tracing::info;

use gatehouse_core::context::WorkflowContext;
use gatehouse_core::error::Result;
use gatehouse_core::traits::Agent;
use gatehouse_core::types::AgentResult;

use super::{display_value, simulate_latency, INPUT_KEY};

pub const VALIDATION_ID: &str = "validation-agent";

const DEFAULT_INPUT: &str = "default validation data";
const INVALID_SCORE: f64 = 0.3;

/// Checks that the workflow input is present and non-blank, and scores it.
pub struct ValidationAgent {
    simulate_latency: bool,
}

impl ValidationAgent {
    pub fn new(simulate_latency: bool) -> Self {
        Self { simulate_latency }
    }
}

struct Verdict {
    valid: bool,
    score: f64,
    report: &'static str,
}

fn validate(input: &str) -> Verdict {
    if input.trim().is_empty() {
        Verdict {
            valid: false,
            score: INVALID_SCORE,
            report: "Validation failed: input is empty or malformed",
        }
    } else {
        Verdict {
            valid: true,
            score: 0.85 + rand::random::<f64>() * 0.15,
            report: "Validation passed: format correct, content complete",
        }
    }
}

impl Agent for ValidationAgent {
    fn agent_id(&self) -> &str {
        VALIDATION_ID
    }

    fn description(&self) -> &str {
        "Validation: checks input integrity and scores it"
    }

    fn execute<'a>(&'a self, ctx: &'a WorkflowContext) -> BoxFuture<'a, Result<AgentResult>> {
        Box::pin(async move {
            let input = ctx
                .get_value(INPUT_KEY)
                .unwrap_or_else(|| json!(DEFAULT_INPUT));
            let verdict = validate(&display_value(&input));

            simulate_latency(self.simulate_latency, 800).await;

            info!(
                agent_id = VALIDATION_ID,
                valid = verdict.valid,
                score = verdict.score,
                "Validation complete"
            );
            Ok(AgentResult::success(
                VALIDATION_ID,
                json!({
                    "inputData": input,
                    "isValid": verdict.valid,
                    "validationScore": verdict.score,
                    "validationReport": verdict.report,
                }),
            ))
        })
    }
}
