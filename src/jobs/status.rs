//! Job classification and aggregate status

use std::collections::BTreeMap;
use std::fmt;

use batchfleet_api::{Job, JobStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a job is in its lifecycle, as far as the orchestrator cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionState {
    Pending,
    Running,
    Succeeded,
    /// Retries exhausted; the control plane gave up on the job.
    Failed,
}

impl CompletionState {
    pub const ALL: [CompletionState; 4] = [
        CompletionState::Pending,
        CompletionState::Running,
        CompletionState::Succeeded,
        CompletionState::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionState::Pending => "pending",
            CompletionState::Running => "running",
            CompletionState::Succeeded => "succeeded",
            CompletionState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CompletionState::Succeeded | CompletionState::Failed)
    }
}

impl fmt::Display for CompletionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a job from the status the job controller reports.
///
/// A job whose pods failed but which still has retries left is pending, not
/// failed: only the `Failed` condition marks the end of its backoff.
pub fn classify(status: Option<&JobStatus>) -> CompletionState {
    let Some(status) = status else {
        return CompletionState::Pending;
    };

    if status.has_condition("Complete") || status.succeeded.unwrap_or(0) > 0 {
        CompletionState::Succeeded
    } else if status.has_condition("Failed") {
        CompletionState::Failed
    } else if status.active.unwrap_or(0) > 0 {
        CompletionState::Running
    } else {
        CompletionState::Pending
    }
}

/// A job as read back from the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub name: String,
    pub namespace: String,
    pub creation_time: Option<DateTime<Utc>>,
    pub state: CompletionState,
    /// Failed pod attempts so far.
    pub backoff_count: u32,
}

impl JobRecord {
    pub fn from_job(job: &Job, namespace: &str) -> Self {
        let status = job.status.as_ref();
        Self {
            name: job.name().to_string(),
            namespace: job
                .metadata
                .namespace
                .clone()
                .unwrap_or_else(|| namespace.to_string()),
            creation_time: job.metadata.creation_timestamp,
            state: classify(status),
            backoff_count: status.and_then(|s| s.failed).unwrap_or(0),
        }
    }
}

/// Job counts per state at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub total: usize,
    pub by_state: BTreeMap<CompletionState, usize>,
    pub timestamp: DateTime<Utc>,
}

impl StatusSnapshot {
    /// A snapshot with every state present at zero.
    pub fn empty() -> Self {
        Self {
            total: 0,
            by_state: CompletionState::ALL.iter().map(|s| (*s, 0)).collect(),
            timestamp: Utc::now(),
        }
    }

    pub fn record(&mut self, state: CompletionState) {
        self.total += 1;
        *self.by_state.entry(state).or_insert(0) += 1;
    }

    pub fn count(&self, state: CompletionState) -> usize {
        self.by_state.get(&state).copied().unwrap_or(0)
    }

    /// True once every job has reached a terminal state.
    pub fn is_settled(&self) -> bool {
        self.count(CompletionState::Pending) == 0 && self.count(CompletionState::Running) == 0
    }
}

impl FromIterator<CompletionState> for StatusSnapshot {
    fn from_iter<I: IntoIterator<Item = CompletionState>>(iter: I) -> Self {
        let mut snapshot = Self::empty();
        for state in iter {
            snapshot.record(state);
        }
        snapshot
    }
}

impl fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "total={}", self.total)?;
        for state in CompletionState::ALL {
            write!(f, " {}={}", state, self.count(state))?;
        }
        Ok(())
    }
}
