//! Agent runner module
//!
//! Periodically optimizes and health-checks the configured account, and in
//! auto-execute mode carries out gated withdrawals and reward claims.

use crate::actions::{
    Action, ActionError, ActionOutcome, ActionSet, Capabilities, CheckHealthInput, HarvestInput,
    OptimizeYieldInput, WithdrawInput,
};
use crate::config::Config;
use crate::engine::report::{HealthReport, OptimizationReport};
use crate::engine::types::ActionKind;
use crate::gateway::Ledger;
use crate::guards::{AuditLog, GuardedLedger, PolicyConfig, PolicyGuard, SlippageGuard};
use crate::narrator::Narrator;
use crate::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Wrap a ledger in the configured guard pipeline
pub async fn guarded_ledger(config: &Config, inner: Arc<dyn Ledger>) -> Result<Arc<dyn Ledger>> {
    let mut ledger = GuardedLedger::new(inner);

    // 1. Audit log, ahead of every guard that can block
    if let Some(audit_path) = &config.audit_log_path {
        ledger = ledger.with_guard(Arc::new(AuditLog::new(audit_path)));
        info!(audit_path = %audit_path, "Added audit log guard");
    }

    // 2. Policy
    let policy = PolicyConfig::load(&config.policy).await?;
    ledger = ledger.with_guard(Arc::new(PolicyGuard::new(policy)));
    info!(
        default_mode = ?config.policy.default_mode,
        policy_file = ?config.policy.policy_file,
        "Added policy guard"
    );

    // 3. Slippage
    let max_slippage = config.risk.max_slippage_percent;
    ledger = ledger.with_guard(Arc::new(SlippageGuard::new(max_slippage)));
    info!(max_slippage, "Added slippage guard");

    Ok(Arc::new(ledger))
}

/// What one monitoring cycle produced
#[derive(Debug, Default)]
pub struct CycleOutcome {
    pub optimization: Option<OptimizationReport>,
    pub health: Option<HealthReport>,
    /// Outcomes of actions executed automatically, in execution order
    pub executed: Vec<ActionOutcome>,
}

/// Agent runner that monitors one account
pub struct AgentRunner {
    config: Config,
    dry_run: bool,
    address: String,
    actions: ActionSet,
}

impl AgentRunner {
    /// Create a new agent runner for the capabilities' signing account
    pub fn new(
        config: Config,
        dry_run: bool,
        capabilities: Capabilities,
        narrator: Option<Arc<dyn Narrator>>,
    ) -> Self {
        let address = capabilities.address.clone();
        let actions = ActionSet::new(capabilities, &config, narrator);
        Self {
            config,
            dry_run,
            address,
            actions,
        }
    }

    /// Run cycles every `check_interval_ms` until interrupted
    pub async fn run(&self) -> Result<()> {
        info!(
            address = %self.address,
            interval_ms = self.config.check_interval_ms,
            auto_execute = self.config.auto_execute,
            dry_run = self.dry_run,
            "Starting agent runner"
        );

        let period = Duration::from_millis(self.config.check_interval_ms.max(1));
        let mut ticker = tokio::time::interval(period);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_once().await;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted, stopping agent runner");
                    return Ok(());
                }
            }
        }
    }

    /// One optimize / health / execute cycle. Failures are logged, never fatal.
    pub async fn run_once(&self) -> CycleOutcome {
        let mut outcome = CycleOutcome::default();

        match self
            .actions
            .optimize_yield
            .run(OptimizeYieldInput {
                address: self.address.clone(),
                risk_level: None,
            })
            .await
        {
            Ok(report) => outcome.optimization = Some(report),
            Err(e) => warn!(error = %e, "Optimization failed"),
        }

        match self
            .actions
            .check_health
            .run(CheckHealthInput {
                address: self.address.clone(),
            })
            .await
        {
            Ok(report) => {
                info!(
                    health_factor = report.health_factor,
                    status = %report.status,
                    borrowing = report.borrowing_positions.len(),
                    "Health check"
                );
                for recommendation in &report.recommendations {
                    info!(recommendation = %recommendation, "Health recommendation");
                }
                outcome.health = Some(report);
            }
            Err(e) => warn!(error = %e, "Health check failed"),
        }

        if let Some(ref report) = outcome.optimization {
            outcome.executed = self.act_on(report).await;
        }
        outcome
    }

    async fn act_on(&self, report: &OptimizationReport) -> Vec<ActionOutcome> {
        let execute = self.config.auto_execute && !self.dry_run;
        let mut executed = Vec::new();

        for strategy in &report.strategies {
            info!(
                token = %strategy.token,
                action = strategy.kind.name(),
                priority = strategy.priority.value(),
                reason = %strategy.reason,
                "Recommended strategy"
            );

            match &strategy.kind {
                ActionKind::Withdraw { amount } if amount.is_zero() => {
                    debug!(token = %strategy.token, "Nothing supplied to withdraw");
                }
                ActionKind::Withdraw { amount } if execute => {
                    let result = self
                        .actions
                        .withdraw
                        .execute(WithdrawInput {
                            token: strategy.token.clone(),
                            amount: *amount,
                        })
                        .await;
                    executed.push(result);
                }
                ActionKind::Withdraw { amount } => {
                    info!(token = %strategy.token, amount = %amount, "Dry run, withdrawal not executed");
                }
                ActionKind::Supply { amount } if amount.is_zero() => {
                    info!(token = %strategy.token, "Supply size left to the operator");
                }
                _ => {}
            }
        }

        if execute {
            if let Some(result) = self.harvest().await {
                executed.push(result);
            }
        }
        executed
    }

    async fn harvest(&self) -> Option<ActionOutcome> {
        let result = self
            .actions
            .harvest_rewards
            .run(HarvestInput {
                address: self.address.clone(),
            })
            .await;
        match result {
            Err(ActionError::Rejected(reason)) => {
                debug!(reason = %reason, "Skipping harvest");
                None
            }
            other => Some(ActionOutcome::from_result(
                crate::actions::HarvestRewardsAction::VERB,
                other,
            )),
        }
    }
}
