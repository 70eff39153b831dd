//! Account health check

use super::{validate_address, Action, ActionResult, Capabilities};
use crate::engine::report::HealthReport;
use crate::engine::snapshot::PositionReader;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CheckHealthInput {
    /// Sui address to inspect
    pub address: String,
}

pub struct CheckHealthAction {
    capabilities: Capabilities,
}

impl CheckHealthAction {
    pub fn new(capabilities: Capabilities) -> Self {
        Self { capabilities }
    }
}

#[async_trait]
impl Action for CheckHealthAction {
    const NAME: &'static str = "check_health";
    const VERB: &'static str = "check health";

    type Input = CheckHealthInput;
    type Output = HealthReport;

    fn description(&self) -> &'static str {
        "Report an account's health factor, solvency status and borrowing positions"
    }

    async fn run(&self, input: CheckHealthInput) -> ActionResult<HealthReport> {
        validate_address(&input.address)?;

        let portfolio =
            PositionReader::read(self.capabilities.account.as_ref(), &input.address).await?;
        let report = HealthReport::build(input.address, &portfolio);

        tracing::info!(
            address = %report.address,
            health_factor = report.health_factor,
            status = %report.status,
            "Checked account health"
        );
        Ok(report)
    }
}
