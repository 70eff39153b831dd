//! Audit log guard
//!
//! Appends every ledger operation to a JSONL file for compliance and
//! debugging.

use super::{GuardDecision, OperationContext, OperationGuard};
use crate::gateway::{GatewayResult, Operation, TxDigest};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Entry in the audit log
#[derive(Debug, Serialize)]
struct AuditEntry<'a> {
    id: Uuid,
    timestamp: DateTime<Utc>,
    entry_type: &'static str,
    kind: &'static str,
    operation: &'a Operation,
    digest: Option<&'a TxDigest>,
    error: Option<String>,
    duration_ms: u64,
    status: &'static str,
}

/// Writer for audit log entries
struct AuditLogWriter {
    path: PathBuf,
}

impl AuditLogWriter {
    fn write(&self, entry: &AuditEntry<'_>) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let json = serde_json::to_string(entry)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }
}

/// Guard that records every operation; it never blocks
pub struct AuditLog {
    writer: Arc<Mutex<AuditLogWriter>>,
}

impl AuditLog {
    /// Create a new audit log
    ///
    /// # Arguments
    /// * `log_path` - Path to the audit log file (JSONL format)
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            writer: Arc::new(Mutex::new(AuditLogWriter {
                path: log_path.into(),
            })),
        }
    }

    async fn record(&self, entry: AuditEntry<'_>) {
        let writer = self.writer.lock().await;
        if let Err(e) = writer.write(&entry) {
            tracing::warn!(error = %e, "Failed to write audit log entry");
        }
    }
}

#[async_trait]
impl OperationGuard for AuditLog {
    async fn check(&self, context: &OperationContext) -> GuardDecision {
        self.record(AuditEntry {
            id: context.id,
            timestamp: Utc::now(),
            entry_type: "operation_start",
            kind: context.operation.kind(),
            operation: &context.operation,
            digest: None,
            error: None,
            duration_ms: 0,
            status: "pending",
        })
        .await;

        GuardDecision::Allow
    }

    async fn on_complete(
        &self,
        context: &OperationContext,
        result: &GatewayResult<TxDigest>,
        duration_ms: u64,
    ) {
        let (digest, error, status) = match result {
            Ok(digest) => (Some(digest), None, "success"),
            Err(e) => (None, Some(e.to_string()), "error"),
        };

        self.record(AuditEntry {
            id: context.id,
            timestamp: Utc::now(),
            entry_type: "operation_complete",
            kind: context.operation.kind(),
            operation: &context.operation,
            digest,
            error,
            duration_ms,
            status,
        })
        .await;
    }

    fn name(&self) -> &'static str {
        "AuditLog"
    }
}
