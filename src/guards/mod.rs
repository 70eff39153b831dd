//! Execution guards
//!
//! Every operation bound for the ledger passes through an ordered guard
//! pipeline. Any guard can block it; every guard is told how it ended.

mod audit_log;
mod policy;
mod slippage;

pub use audit_log::AuditLog;
pub use policy::{PolicyConfig, PolicyGuard};
pub use slippage::SlippageGuard;

use crate::gateway::{GatewayError, GatewayResult, Ledger, Operation, TxDigest};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Operation being evaluated by the pipeline
#[derive(Debug, Clone)]
pub struct OperationContext {
    /// Correlates start and complete entries
    pub id: Uuid,
    pub operation: Operation,
}

impl OperationContext {
    pub fn new(operation: Operation) -> Self {
        Self {
            id: Uuid::new_v4(),
            operation,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GuardDecision {
    Allow,
    Block(String),
}

#[async_trait]
pub trait OperationGuard: Send + Sync {
    /// Decide whether the operation may reach the ledger
    async fn check(&self, context: &OperationContext) -> GuardDecision;

    /// Called once the operation was submitted or blocked
    async fn on_complete(
        &self,
        _context: &OperationContext,
        _result: &GatewayResult<TxDigest>,
        _duration_ms: u64,
    ) {
    }

    fn name(&self) -> &'static str;
}

/// Ledger wrapper that runs the guard pipeline before submitting
pub struct GuardedLedger {
    inner: Arc<dyn Ledger>,
    guards: Vec<Arc<dyn OperationGuard>>,
}

impl GuardedLedger {
    pub fn new(inner: Arc<dyn Ledger>) -> Self {
        Self {
            inner,
            guards: Vec::new(),
        }
    }

    /// Append a guard; guards run in insertion order
    pub fn with_guard(mut self, guard: Arc<dyn OperationGuard>) -> Self {
        self.guards.push(guard);
        self
    }

    async fn complete(
        &self,
        context: &OperationContext,
        result: &GatewayResult<TxDigest>,
        duration_ms: u64,
    ) {
        for guard in &self.guards {
            guard.on_complete(context, result, duration_ms).await;
        }
    }
}

#[async_trait]
impl Ledger for GuardedLedger {
    async fn submit(&self, operation: &Operation) -> GatewayResult<TxDigest> {
        let context = OperationContext::new(operation.clone());
        let start = Instant::now();

        for guard in &self.guards {
            if let GuardDecision::Block(reason) = guard.check(&context).await {
                tracing::warn!(
                    guard = guard.name(),
                    kind = operation.kind(),
                    reason = %reason,
                    "Operation blocked"
                );
                let result = Err(GatewayError::Blocked(reason));
                self.complete(&context, &result, 0).await;
                return result;
            }
        }

        let result = self.inner.submit(operation).await;
        let duration_ms = start.elapsed().as_millis() as u64;
        self.complete(&context, &result, duration_ms).await;
        result
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::Amount;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingLedger {
        submitted: AtomicUsize,
    }

    #[async_trait]
    impl Ledger for CountingLedger {
        async fn submit(&self, _operation: &Operation) -> GatewayResult<TxDigest> {
            self.submitted.fetch_add(1, Ordering::SeqCst);
            Ok(TxDigest("0xdigest".to_string()))
        }

        fn name(&self) -> &'static str {
            "CountingLedger"
        }
    }

    struct DenyWithdrawals;

    #[async_trait]
    impl OperationGuard for DenyWithdrawals {
        async fn check(&self, context: &OperationContext) -> GuardDecision {
            match context.operation {
                Operation::Withdraw { .. } => GuardDecision::Block("no withdrawals".to_string()),
                _ => GuardDecision::Allow,
            }
        }

        fn name(&self) -> &'static str {
            "DenyWithdrawals"
        }
    }

    #[tokio::test]
    async fn blocked_operation_never_reaches_ledger() {
        let inner = Arc::new(CountingLedger::default());
        let ledger = GuardedLedger::new(inner.clone()).with_guard(Arc::new(DenyWithdrawals));

        let result = ledger
            .submit(&Operation::Withdraw {
                token: "USDC".to_string(),
                amount: Amount(1),
            })
            .await;
        assert!(matches!(result, Err(GatewayError::Blocked(ref r)) if r == "no withdrawals"));
        assert_eq!(inner.submitted.load(Ordering::SeqCst), 0);

        let digest = ledger.submit(&Operation::ClaimRewards).await.unwrap();
        assert_eq!(digest.0, "0xdigest");
        assert_eq!(inner.submitted.load(Ordering::SeqCst), 1);
    }
}
