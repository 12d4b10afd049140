use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crosspay_types::StepKind;

/// Per-step execution state machine:
/// `Pending -> Submitted -> Confirming -> {Confirmed | Failed}`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepState {
    Pending,
    Submitted,
    Confirming,
    Confirmed,
    Failed,
}

/// What happened to one step
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOutcome {
    pub index: usize,
    pub kind: StepKind,
    pub description: String,
    pub state: StepState,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,

    /// Submission attempts made (0 if never submitted)
    pub attempts: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Terminal disposition of a route execution.
///
/// Confirmed steps are never rolled back; this layer cannot reverse
/// blockchain operations. The three variants exist so a caller always knows
/// whether funds moved: `NotStarted` guarantees nothing was submitted,
/// `PartiallyExecuted` names the furthest confirmed step, `Completed`
/// carries the settlement hash of the final step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ExecutionOutcome {
    #[serde(rename_all = "camelCase")]
    Completed { settlement_hash: String },

    #[serde(rename_all = "camelCase")]
    PartiallyExecuted {
        completed_steps: usize,
        failed_step: usize,
    },

    #[serde(rename_all = "camelCase")]
    NotStarted { reason: String },
}

/// Full account of one route execution
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    /// Route fingerprint (stable id over the step sequence)
    pub route_id: String,

    pub outcome: ExecutionOutcome,

    pub steps: Vec<StepOutcome>,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ExecutionReport {
    pub fn is_complete(&self) -> bool {
        matches!(self.outcome, ExecutionOutcome::Completed { .. })
    }

    pub fn confirmed_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.state == StepState::Confirmed)
            .count()
    }

    pub fn settlement_hash(&self) -> Option<&str> {
        match &self.outcome {
            ExecutionOutcome::Completed { settlement_hash } => Some(settlement_hash),
            _ => None,
        }
    }
}
