use serde::Serialize;

/// Progress events published while a workflow runs.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    /// Run started.
    WorkflowStarted { workflow_id: String, total_nodes: usize },
    /// A wave of ready nodes is about to be dispatched.
    RoundStarted {
        workflow_id: String,
        round: usize,
        node_ids: Vec<String>,
    },
    /// A node's agent finished (successfully or not).
    NodeCompleted {
        workflow_id: String,
        node_id: String,
        agent_id: String,
        round: usize,
        success: bool,
    },
    /// No unexecuted node can become ready.
    WorkflowStalled {
        workflow_id: String,
        pending: Vec<String>,
    },
    /// Run finished.
    WorkflowCompleted {
        workflow_id: String,
        rounds: usize,
        successful_nodes: usize,
        failed_nodes: usize,
    },
}

impl WorkflowEvent {
    pub fn workflow_id(&self) -> &str {
        match self {
            Self::WorkflowStarted { workflow_id, .. }
            | Self::RoundStarted { workflow_id, .. }
            | Self::NodeCompleted { workflow_id, .. }
            | Self::WorkflowStalled { workflow_id, .. }
            | Self::WorkflowCompleted { workflow_id, .. } => workflow_id,
        }
    }
}

/// Event bus using tokio broadcast channel.
/// All subscribers receive all events.
pub struct WorkflowEventBus {
    tx: tokio::sync::broadcast::Sender<WorkflowEvent>,
}

impl WorkflowEventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = tokio::sync::broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: WorkflowEvent) {
        // Ignore error if no receivers
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<WorkflowEvent> {
        self.tx.subscribe()
    }
}

impl Default for WorkflowEventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_published_events() {
        let bus = WorkflowEventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(WorkflowEvent::WorkflowStarted {
            workflow_id: "wf".into(),
            total_nodes: 3,
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.workflow_id(), "wf");
        assert!(matches!(event, WorkflowEvent::WorkflowStarted { total_nodes: 3, .. }));
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let bus = WorkflowEventBus::new(4);
        bus.publish(WorkflowEvent::WorkflowStalled {
            workflow_id: "wf".into(),
            pending: vec!["a".into()],
        });
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = WorkflowEvent::RoundStarted {
            workflow_id: "wf".into(),
            round: 2,
            node_ids: vec!["n2".into()],
        };
        let v = serde_json::to_value(&event).unwrap();
        assert_eq!(v["type"], "round_started");
        assert_eq!(v["round"], 2);
    }
}
