//! Heavy-compute / light-llm task queues (spec.md §5). Grounded in the
//! teacher's `codegraph-queue::Queue`: an mpsc channel per queue, with
//! the priority-queue front end dropped since this scheduling model has
//! no priority concept, only two fixed lanes.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, Receiver, Sender};
use tracing::warn;
use uuid::Uuid;

/// A unit of work submitted to one of the two lanes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub name: String,
    pub payload: serde_json::Value,
}

impl Task {
    pub fn new(name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self { id: Uuid::new_v4(), name: name.into(), payload }
    }
}

/// Workspace prep, SCIP, tree-sitter parsing, entity writes, reindex
/// batches (spec.md §5 "Heavy-compute queue"). Activities on this lane
/// heartbeat at least once a minute.
pub struct HeavyComputeQueue {
    sender: Sender<Task>,
}

/// Embeddings, justification, ontology, health report, ADR synthesis,
/// feature aggregation, pipeline-run tracking, pipeline-log archival
/// (spec.md §5 "Light-llm queue").
pub struct LightLlmQueue {
    sender: Sender<Task>,
}

const DEFAULT_BUFFER: usize = 256;
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

macro_rules! impl_queue {
    ($ty:ident) => {
        impl $ty {
            pub fn new() -> (Self, Receiver<Task>) {
                let (sender, receiver) = mpsc::channel(DEFAULT_BUFFER);
                (Self { sender }, receiver)
            }

            pub async fn submit(&self, task: Task) -> bool {
                if self.sender.send(task).await.is_err() {
                    warn!(queue = stringify!($ty), "receiver dropped, task lost");
                    return false;
                }
                true
            }
        }
    };
}

impl_queue!(HeavyComputeQueue);
impl_queue!(LightLlmQueue);
