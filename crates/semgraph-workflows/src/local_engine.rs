//! In-process reference [`WorkflowEngine`] (spec.md §6, SPEC_FULL.md §4):
//! signals and queries over `tokio::sync::{mpsc, watch}`, standing in for
//! a durable-execution binding (e.g. Temporal). Grounded in the teacher's
//! `codegraph-queue`/`codegraph-concurrent` channel patterns.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use semgraph_core::{CodeGraphError, Result, WorkflowEngine};
use tokio::sync::{mpsc, watch};

#[derive(Debug, Clone)]
pub struct Signal {
    pub name: String,
    pub payload: serde_json::Value,
}

struct Execution {
    state: watch::Sender<serde_json::Value>,
    signals: mpsc::Sender<Signal>,
}

/// Fixed workflow id per `(org_id, repo_id)` (spec.md §4.7): callers
/// reuse the same workflow id across pushes so `signal_workflow` reaches
/// an already-running debounce loop (signal-with-start semantics).
pub fn workflow_id(org_id: &str, repo_id: &str) -> String {
    format!("{org_id}/{repo_id}")
}

#[derive(Default)]
pub struct LocalWorkflowEngine {
    executions: DashMap<String, Execution>,
}

impl LocalWorkflowEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking a workflow and returns the signal receiver plus a
    /// watch handle the workflow body uses to publish its current state
    /// for `get_workflow_execution` queries.
    pub fn register(&self, workflow_id: &str, initial_state: serde_json::Value) -> (mpsc::Receiver<Signal>, watch::Sender<serde_json::Value>) {
        let (signal_tx, signal_rx) = mpsc::channel(32);
        let (state_tx, _state_rx) = watch::channel(initial_state);
        self.executions.insert(workflow_id.to_string(), Execution { state: state_tx.clone(), signals: signal_tx });
        (signal_rx, state_tx)
    }

    pub fn unregister(&self, workflow_id: &str) {
        self.executions.remove(workflow_id);
    }

    pub fn is_running(&self, workflow_id: &str) -> bool {
        self.executions.contains_key(workflow_id)
    }
}

#[async_trait]
impl WorkflowEngine for LocalWorkflowEngine {
    async fn start_workflow(&self, workflow_id: &str, workflow_type: &str, input: serde_json::Value) -> Result<()> {
        if self.executions.contains_key(workflow_id) {
            return Ok(()); // signal-with-start: already running, nothing to start
        }
        let state = serde_json::json!({"workflow_type": workflow_type, "input": input, "status": "starting"});
        self.register(workflow_id, state);
        Ok(())
    }

    async fn signal_workflow(&self, workflow_id: &str, signal_name: &str, payload: serde_json::Value) -> Result<()> {
        let Some(execution) = self.executions.get(workflow_id) else {
            return Err(CodeGraphError::Workflow(format!("no running workflow {workflow_id}")));
        };
        execution
            .signals
            .send(Signal { name: signal_name.to_string(), payload })
            .await
            .map_err(|e| CodeGraphError::Workflow(e.to_string()))
    }

    async fn get_workflow_execution(&self, workflow_id: &str) -> Result<Option<serde_json::Value>> {
        Ok(self.executions.get(workflow_id).map(|e| e.state.borrow().clone()))
    }
}

/// Listing support for a simple admin view; not part of the port.
pub fn running_workflows(engine: &LocalWorkflowEngine) -> HashMap<String, serde_json::Value> {
    engine.executions.iter().map(|e| (e.key().clone(), e.value().state.borrow().clone())).collect()
}
