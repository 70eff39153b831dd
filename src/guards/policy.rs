//! Policy enforcement guard for ledger operations.

use super::{GuardDecision, OperationContext, OperationGuard};
use crate::config::{PolicyDefaultMode, PolicySettings};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

/// Operation kinds a rule may name
const OPERATION_KINDS: [&str; 4] = ["supply", "withdraw", "swap", "claim_rewards"];

#[derive(Debug, Clone)]
struct PolicyDecision {
    allowed: bool,
    rule_id: Option<String>,
    reason: String,
}

#[derive(Debug, Clone)]
pub struct PolicyConfig {
    mode: PolicyDefaultMode,
    rules: HashMap<String, PolicyDecision>,
}

impl PolicyConfig {
    pub fn allow_all() -> Self {
        Self::with_mode(PolicyDefaultMode::AllowAll)
    }

    fn with_mode(mode: PolicyDefaultMode) -> Self {
        Self {
            mode,
            rules: HashMap::new(),
        }
    }

    /// Load the policy named by `settings`, falling back to its default mode
    pub async fn load(settings: &PolicySettings) -> crate::Result<Self> {
        let Some(ref file) = settings.policy_file else {
            if settings.require_file {
                return Err(crate::Error::Config(
                    "policy file required but none configured".to_string(),
                ));
            }
            return Ok(Self::with_mode(settings.default_mode));
        };

        let path = Path::new(file);
        if !path.exists() {
            if settings.require_file {
                return Err(crate::Error::Config(format!(
                    "policy file {} not found",
                    path.display()
                )));
            }
            warn!(path = %path.display(), "Policy file missing, using default mode");
            return Ok(Self::with_mode(settings.default_mode));
        }

        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| crate::Error::Config(e.to_string()))?;
        Self::parse(&contents, settings.default_mode)
    }

    fn parse(contents: &str, fallback: PolicyDefaultMode) -> crate::Result<Self> {
        let parsed: PolicyFile = serde_json::from_str(contents)?;

        let mode = match parsed.mode.as_deref() {
            Some("default-deny") => PolicyDefaultMode::DefaultDeny,
            Some("allow-all") => PolicyDefaultMode::AllowAll,
            None => fallback,
            Some(other) => {
                warn!(mode = other, "Unknown policy mode, using default mode");
                fallback
            }
        };

        let mut rules = HashMap::new();
        for rule in parsed.rules {
            if !OPERATION_KINDS.contains(&rule.operation.as_str()) {
                warn!(
                    operation = %rule.operation,
                    "Unknown operation in policy.json; skipping rule"
                );
                continue;
            }

            rules.insert(
                rule.operation,
                PolicyDecision {
                    allowed: rule.allowed,
                    rule_id: rule.rule_id,
                    reason: rule.reason.unwrap_or_else(|| "policy rule".to_string()),
                },
            );
        }

        Ok(Self { mode, rules })
    }

    fn decision_for(&self, kind: &str) -> PolicyDecision {
        if let Some(decision) = self.rules.get(kind) {
            return decision.clone();
        }

        match self.mode {
            PolicyDefaultMode::AllowAll => PolicyDecision {
                allowed: true,
                rule_id: None,
                reason: "allowed by default policy".to_string(),
            },
            PolicyDefaultMode::DefaultDeny => PolicyDecision {
                allowed: false,
                rule_id: None,
                reason: "denied by default policy".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct PolicyGuard {
    policy: PolicyConfig,
}

impl PolicyGuard {
    pub fn new(policy: PolicyConfig) -> Self {
        Self { policy }
    }
}

#[async_trait::async_trait]
impl OperationGuard for PolicyGuard {
    async fn check(&self, context: &OperationContext) -> GuardDecision {
        let kind = context.operation.kind();
        let decision = self.policy.decision_for(kind);
        if decision.allowed {
            return GuardDecision::Allow;
        }

        let rule_id = decision
            .rule_id
            .as_ref()
            .map(|id| format!(" rule_id={}", id))
            .unwrap_or_default();
        GuardDecision::Block(format!(
            "Policy denied {}: {}{}",
            kind, decision.reason, rule_id
        ))
    }

    fn name(&self) -> &'static str {
        "PolicyGuard"
    }
}

#[derive(Debug, Clone, Deserialize)]
struct PolicyFile {
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    rules: Vec<PolicyRule>,
}

#[derive(Debug, Clone, Deserialize)]
struct PolicyRule {
    operation: String,
    allowed: bool,
    rule_id: Option<String>,
    reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::Amount;
    use crate::gateway::Operation;
    use std::io::Write;

    fn swap() -> OperationContext {
        OperationContext::new(Operation::Swap {
            from_token: "SUI".to_string(),
            to_token: "USDC".to_string(),
            amount_in: Amount(1),
            min_amount_out: Amount(1),
            slippage_percent: 0.5,
            route: vec![],
            from_collateral: false,
        })
    }

    #[test]
    fn default_allow_policy_allows_unknown_operations() {
        let policy = PolicyConfig::allow_all();
        assert!(policy.decision_for("swap").allowed);
    }

    #[test]
    fn default_deny_policy_blocks_unknown_operations() {
        let policy = PolicyConfig::with_mode(PolicyDefaultMode::DefaultDeny);
        assert!(!policy.decision_for("swap").allowed);
    }

    #[test]
    fn rule_overrides_default_mode() {
        let policy = PolicyConfig::parse(
            r#"{"mode": "default-deny", "rules": [
                {"operation": "claim_rewards", "allowed": true, "rule_id": "allow:claim"},
                {"operation": "bridge", "allowed": true}
            ]}"#,
            PolicyDefaultMode::AllowAll,
        )
        .unwrap();
        assert!(policy.decision_for("claim_rewards").allowed);
        assert!(!policy.decision_for("withdraw").allowed);
        assert!(!policy.rules.contains_key("bridge"));
    }

    #[tokio::test]
    async fn guard_reports_rule_id() {
        let policy = PolicyConfig::parse(
            r#"{"rules": [{"operation": "swap", "allowed": false, "rule_id": "no-swaps", "reason": "swaps paused"}]}"#,
            PolicyDefaultMode::AllowAll,
        )
        .unwrap();
        let decision = PolicyGuard::new(policy).check(&swap()).await;
        assert_eq!(
            decision,
            GuardDecision::Block("Policy denied swap: swaps paused rule_id=no-swaps".to_string())
        );
    }

    #[tokio::test]
    async fn missing_required_file_fails_closed() {
        let settings = PolicySettings {
            default_mode: PolicyDefaultMode::AllowAll,
            policy_file: Some("/nonexistent/policy.json".to_string()),
            require_file: true,
        };
        assert!(matches!(
            PolicyConfig::load(&settings).await,
            Err(crate::Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn loads_policy_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"mode": "default-deny", "rules": [{{"operation": "supply", "allowed": true}}]}}"#
        )
        .unwrap();

        let settings = PolicySettings {
            default_mode: PolicyDefaultMode::AllowAll,
            policy_file: Some(file.path().display().to_string()),
            require_file: false,
        };
        let policy = PolicyConfig::load(&settings).await.unwrap();
        assert!(policy.decision_for("supply").allowed);
        assert!(!policy.decision_for("swap").allowed);
    }
}
