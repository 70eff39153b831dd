//! Yield optimization and risk scoring engine
//!
//! Readers pull pool and account state through the gateway capabilities; the
//! rest of the pipeline is pure:
//!
//! snapshot -> risk -> ranker -> strategy -> safety

pub mod ranker;
pub mod report;
pub mod risk;
pub mod safety;
pub mod snapshot;
pub mod strategy;
pub mod types;

pub use ranker::OpportunityRanker;
pub use report::{BorrowingPosition, HealthReport, OptimizationReport, RankedOpportunity};
pub use risk::{RiskAssessor, SolvencyStatus};
pub use safety::{GateDecision, SafetyGate};
pub use snapshot::{
    MarketSnapshot, MarketSnapshotReader, PortfolioSnapshot, PositionReader,
};
pub use strategy::{StrategyGenerator, Thresholds};
pub use types::{
    ActionKind, Amount, Position, Positions, Priority, RiskLevel, RiskTag, StrategyAction,
    TokenSnapshot, YieldOpportunity,
};
