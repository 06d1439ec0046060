use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatehouseError {
    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    #[error("Unknown gate operator: {0} (expected AND, OR or NOT)")]
    UnknownOperator(String),

    #[error("Duplicate node id in workflow: {0}")]
    DuplicateNode(String),

    #[error("Invalid API config: {0}")]
    InvalidApiConfig(String),

    // Agent errors
    #[error("Agent {agent} failed: {message}")]
    AgentFailure { agent: String, message: String },

    #[error("Agent {agent} timed out after {timeout_secs}s")]
    AgentTimeout { agent: String, timeout_secs: u64 },

    // Engine errors
    #[error("Workflow {workflow_id} stalled with {} unexecuted node(s): {}", .pending.len(), .pending.join(", "))]
    Stalled {
        workflow_id: String,
        pending: Vec<String>,
    },

    // Transport errors
    #[error("Transport error: {0}")]
    Transport(String),

    // Gateway errors
    #[error("Gateway error: {0}")]
    Gateway(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GatehouseError {
    /// Shorthand for an agent-level fault.
    pub fn agent(agent: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AgentFailure {
            agent: agent.into(),
            message: message.into(),
        }
    }

    /// Whether this error is a structural problem that must abort a run
    /// before or while it executes.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::ConfigNotFound(_)
                | Self::UnknownOperator(_)
                | Self::DuplicateNode(_)
                | Self::InvalidApiConfig(_)
                | Self::Stalled { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, GatehouseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stalled_message_lists_pending_nodes() {
        let err = GatehouseError::Stalled {
            workflow_id: "wf-1".into(),
            pending: vec!["node-a".into(), "node-b".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("wf-1"));
        assert!(msg.contains("2 unexecuted"));
        assert!(msg.contains("node-a, node-b"));
    }

    #[test]
    fn test_structural_classification() {
        assert!(GatehouseError::UnknownOperator("XOR".into()).is_structural());
        assert!(GatehouseError::DuplicateNode("n1".into()).is_structural());
        assert!(!GatehouseError::agent("a", "boom").is_structural());
        assert!(!GatehouseError::Transport("refused".into()).is_structural());
    }
}
