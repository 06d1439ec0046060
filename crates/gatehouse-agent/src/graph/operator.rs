use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use gatehouse_core::context::WorkflowContext;
use gatehouse_core::error::GatehouseError;

/// Gate that decides when a node is released, based on which of its
/// predecessor agents have succeeded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum LogicalOperator {
    /// Every predecessor succeeded.
    #[default]
    And,
    /// At least one predecessor succeeded.
    Or,
    /// No predecessor has succeeded (yet). Once any one succeeds the node
    /// is blocked for the rest of the run.
    Not,
}

impl LogicalOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
        }
    }

    pub fn all() -> [LogicalOperator; 3] {
        [Self::And, Self::Or, Self::Not]
    }

    /// Evaluate the gate over `predecessors` (agent ids) against `ctx`.
    ///
    /// An empty predecessor list is always open, whatever the operator.
    pub fn evaluate(&self, predecessors: &[String], ctx: &WorkflowContext) -> bool {
        if predecessors.is_empty() {
            return true;
        }
        let mut satisfied = predecessors.iter().map(|id| ctx.is_unit_satisfied(id));
        match self {
            Self::And => satisfied.all(|s| s),
            Self::Or => satisfied.any(|s| s),
            Self::Not => !satisfied.any(|s| s),
        }
    }
}

impl FromStr for LogicalOperator {
    type Err = GatehouseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AND" => Ok(Self::And),
            "OR" => Ok(Self::Or),
            "NOT" => Ok(Self::Not),
            _ => Err(GatehouseError::UnknownOperator(s.to_string())),
        }
    }
}

impl TryFrom<String> for LogicalOperator {
    type Error = GatehouseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
