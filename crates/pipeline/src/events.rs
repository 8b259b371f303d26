//! Transaction progress events.
//!
//! Events for one `tx_id` are phase-monotonic: a later event always reflects
//! equal-or-greater progress, with `error` the only phase reachable out of
//! order. Each event is a full snapshot, not a delta.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pipeline phase, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxPhase {
    Simulating,
    Proving,
    Sending,
    Mining,
    Complete,
    Error,
}

impl TxPhase {
    /// Position in the strict phase order. `Error` ranks above everything:
    /// it may follow any phase but nothing follows it.
    pub fn rank(self) -> u8 {
        match self {
            Self::Simulating => 0,
            Self::Proving => 1,
            Self::Sending => 2,
            Self::Mining => 3,
            Self::Complete => 4,
            Self::Error => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Simulating => "simulating",
            Self::Proving => "proving",
            Self::Sending => "sending",
            Self::Mining => "mining",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for TxPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One timed sub-step within a phase breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubStep {
    pub name: String,
    pub duration_ms: u64,
}

/// Timing breakdown of one completed phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseBreakdown {
    /// Phase name as in [`TxPhase::as_str`].
    pub name: String,
    pub duration_ms: u64,
    /// Finer sub-steps when the backend reported statistics; includes an
    /// `unaccounted` entry for time the backend did not attribute.
    pub steps: Vec<SubStep>,
}

/// Snapshot of one in-flight transaction's progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxProgressEvent {
    /// Fresh per submission, never reused.
    pub tx_id: Uuid,
    pub phase: TxPhase,
    /// Wall-clock start of the submission.
    pub started_at: DateTime<Utc>,
    /// Cumulative per-phase durations (phase name → milliseconds).
    pub durations_ms: BTreeMap<String, u64>,
    /// Ordered breakdowns of every completed phase so far.
    pub breakdowns: Vec<PhaseBreakdown>,
    /// Normalized failure message; set only on `error` events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
