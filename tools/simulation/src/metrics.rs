//! Outcome counters for simulation runs
//!
//! Counts attempted and successful ledger calls per action, rejections per
//! error kind, and throughput.

use escrow::errors::LedgerError;
use serde::{Deserialize, Serialize};

/// Ledger entry point exercised by one simulation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimAction {
    Create,
    Complete,
    Cancel,
}

/// Rejection counts by error kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionCounts {
    pub validation: u64,
    pub authorization: u64,
    pub state: u64,
    pub transfer: u64,
    pub reentrancy: u64,
    pub other: u64,
}

impl RejectionCounts {
    pub fn total(&self) -> u64 {
        self.validation + self.authorization + self.state + self.transfer + self.reentrancy + self.other
    }

    fn record(&mut self, err: &LedgerError) {
        match err {
            LedgerError::Validation(_) => self.validation += 1,
            LedgerError::Authorization(_) => self.authorization += 1,
            LedgerError::State(_) => self.state += 1,
            LedgerError::Transfer(_) => self.transfer += 1,
            LedgerError::Reentrancy => self.reentrancy += 1,
            LedgerError::ConservationViolated { .. } | LedgerError::Config(_) => self.other += 1,
        }
    }
}

/// Aggregated simulation metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimMetrics {
    pub steps: u64,
    pub create_attempts: u64,
    pub complete_attempts: u64,
    pub cancel_attempts: u64,
    pub created: u64,
    pub completed: u64,
    pub cancelled: u64,
    pub rejected: RejectionCounts,
    pub audits_passed: u64,
    /// Wall-clock time; excluded from determinism comparisons.
    #[serde(default)]
    pub elapsed_ns: u64,
}

impl SimMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one ledger call.
    pub fn record<T>(&mut self, action: SimAction, result: &Result<T, LedgerError>) {
        self.steps += 1;
        let (attempts, successes) = match action {
            SimAction::Create => (&mut self.create_attempts, &mut self.created),
            SimAction::Complete => (&mut self.complete_attempts, &mut self.completed),
            SimAction::Cancel => (&mut self.cancel_attempts, &mut self.cancelled),
        };
        *attempts += 1;
        match result {
            Ok(_) => *successes += 1,
            Err(err) => self.rejected.record(err),
        }
    }

    pub fn record_audit(&mut self) {
        self.audits_passed += 1;
    }

    pub fn set_elapsed(&mut self, ns: u64) {
        self.elapsed_ns = ns;
    }

    /// Operations still holding a deposit.
    pub fn open_operations(&self) -> u64 {
        self.created - self.completed - self.cancelled
    }

    /// Throughput: ledger calls per second.
    pub fn steps_per_second(&self) -> f64 {
        if self.elapsed_ns == 0 {
            return 0.0;
        }
        self.steps as f64 / (self.elapsed_ns as f64 / 1_000_000_000.0)
    }

    /// Counters with wall-clock fields cleared, for comparing runs.
    pub fn deterministic(&self) -> Self {
        Self {
            elapsed_ns: 0,
            ..self.clone()
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Steps: {} | Created: {} | Completed: {} | Cancelled: {} | Rejected: {} | Open: {} | Throughput: {:.0} steps/s",
            self.steps,
            self.created,
            self.completed,
            self.cancelled,
            self.rejected.total(),
            self.open_operations(),
            self.steps_per_second(),
        )
    }
}
