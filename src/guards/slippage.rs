//! Slippage guard
//!
//! Blocks swaps that request more slippage than the configured maximum.

use super::{GuardDecision, OperationContext, OperationGuard};
use crate::gateway::Operation;
use async_trait::async_trait;

/// Guard that blocks swaps with excessive slippage
pub struct SlippageGuard {
    /// Maximum allowed slippage (e.g., 1.0 for 1%)
    max_slippage_percent: f64,
}

impl SlippageGuard {
    /// Create a new slippage guard
    ///
    /// # Arguments
    /// * `max_slippage_percent` - Maximum allowed slippage percentage (e.g., 1.0 for 1%)
    pub fn new(max_slippage_percent: f64) -> Self {
        Self {
            max_slippage_percent,
        }
    }
}

#[async_trait]
impl OperationGuard for SlippageGuard {
    async fn check(&self, context: &OperationContext) -> GuardDecision {
        let Operation::Swap {
            slippage_percent, ..
        } = context.operation
        else {
            return GuardDecision::Allow;
        };

        if slippage_percent > self.max_slippage_percent {
            return GuardDecision::Block(format!(
                "Requested slippage {:.2}% exceeds maximum allowed {:.2}%",
                slippage_percent, self.max_slippage_percent
            ));
        }

        tracing::debug!(
            requested_slippage = slippage_percent,
            max_slippage = self.max_slippage_percent,
            "Slippage check passed"
        );

        GuardDecision::Allow
    }

    fn name(&self) -> &'static str {
        "SlippageGuard"
    }
}
