//! Withdrawal safety gate
//!
//! Every withdrawal, and every swap that spends collateral, is checked against
//! the health factor the protocol predicts for the account afterwards.

use serde::{Deserialize, Serialize};

/// Default floor for the simulated post-withdrawal health factor
pub const DEFAULT_MIN_HEALTH_FACTOR: f64 = 1.05;

/// Outcome of a gate check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "reason", rename_all = "snake_case")]
pub enum GateDecision {
    Allow,
    Reject(String),
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateDecision::Allow)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SafetyGate {
    min_health_factor: f64,
}

impl Default for SafetyGate {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_HEALTH_FACTOR)
    }
}

impl SafetyGate {
    pub fn new(min_health_factor: f64) -> Self {
        Self { min_health_factor }
    }

    pub fn min_health_factor(&self) -> f64 {
        self.min_health_factor
    }

    /// Check a withdrawal against the simulated health factor
    ///
    /// # Arguments
    /// * `current` - Health factor before the action
    /// * `simulated` - Health factor the protocol predicts after it
    pub fn check_withdraw(&self, current: f64, simulated: f64) -> GateDecision {
        // NaN never clears the floor
        if simulated >= self.min_health_factor {
            tracing::debug!(current, simulated, "Safety gate passed");
            return GateDecision::Allow;
        }

        let reason = format!(
            "Withdrawal would reduce health factor to {:.2} (currently {:.2}), below minimum threshold of {:.2}",
            simulated, current, self.min_health_factor
        );
        tracing::warn!(
            current,
            simulated,
            min = self.min_health_factor,
            "Safety gate rejected action"
        );
        GateDecision::Reject(reason)
    }
}
