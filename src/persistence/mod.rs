//! Persistence layer for flow run history

#[cfg(feature = "sqlite")]
pub mod store;

#[cfg(feature = "sqlite")]
pub use store::SqliteRunStore;

pub use crate::core::RunStatus;
use crate::core::RunState;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Summary of one flow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Unique run ID
    pub run_id: Uuid,

    /// Flow name from the configuration file
    pub flow_name: String,

    /// Tool family that was driven (par, synthesis, power, sim)
    pub tool: String,

    /// Final status
    pub status: RunStatus,

    /// Step the run started from, if resumed mid-flow
    pub start_step: Option<String>,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When the run reached a terminal status
    pub completed_at: Option<DateTime<Utc>>,

    /// Step actions that succeeded
    pub completed_steps: usize,

    /// Steps in the flow
    pub total_steps: usize,
}

impl RunSummary {
    pub fn from_run_state(
        run: &RunState,
        flow_name: &str,
        tool: &str,
        start_step: Option<&str>,
    ) -> Self {
        Self {
            run_id: run.run_id,
            flow_name: flow_name.to_string(),
            tool: tool.to_string(),
            status: run.status,
            start_step: start_step.map(String::from),
            started_at: run.started_at.unwrap_or_else(Utc::now),
            completed_at: run.completed_at,
            completed_steps: run.completed_steps,
            total_steps: run.total_steps,
        }
    }
}

/// Trait for persistence backends
#[async_trait::async_trait]
pub trait RunStore: Send + Sync {
    /// Save a flow run
    async fn save_run(&self, run: &RunSummary) -> Result<()>;

    /// Load a run by ID
    async fn load_run(&self, run_id: Uuid) -> Result<Option<RunSummary>>;

    /// List all runs for a flow
    async fn list_runs(&self, flow_name: &str) -> Result<Vec<RunSummary>>;

    /// List all flow names
    async fn list_flows(&self) -> Result<Vec<String>>;
}

/// In-memory persistence (for testing or `--no-history` runs)
pub struct InMemoryRunStore {
    runs: tokio::sync::RwLock<std::collections::HashMap<Uuid, RunSummary>>,
    by_flow: tokio::sync::RwLock<std::collections::HashMap<String, Vec<Uuid>>>,
}

impl InMemoryRunStore {
    pub fn new() -> Self {
        Self {
            runs: tokio::sync::RwLock::new(std::collections::HashMap::new()),
            by_flow: tokio::sync::RwLock::new(std::collections::HashMap::new()),
        }
    }
}

impl Default for InMemoryRunStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RunStore for InMemoryRunStore {
    async fn save_run(&self, run: &RunSummary) -> Result<()> {
        let mut runs = self.runs.write().await;
        runs.insert(run.run_id, run.clone());

        let mut by_flow = self.by_flow.write().await;
        by_flow
            .entry(run.flow_name.clone())
            .or_insert_with(Vec::new)
            .push(run.run_id);

        Ok(())
    }

    async fn load_run(&self, run_id: Uuid) -> Result<Option<RunSummary>> {
        let runs = self.runs.read().await;
        Ok(runs.get(&run_id).cloned())
    }

    async fn list_runs(&self, flow_name: &str) -> Result<Vec<RunSummary>> {
        let runs = self.runs.read().await;
        let by_flow = self.by_flow.read().await;

        if let Some(ids) = by_flow.get(flow_name) {
            Ok(ids.iter().filter_map(|id| runs.get(id).cloned()).collect())
        } else {
            Ok(Vec::new())
        }
    }

    async fn list_flows(&self) -> Result<Vec<String>> {
        let by_flow = self.by_flow.read().await;
        let mut flows: Vec<String> = by_flow.keys().cloned().collect();
        flows.sort();
        Ok(flows)
    }
}
