//! Nudge Core Library
//!
//! Shared functionality for the Nudge behavioral finance coach:
//! - Database access and migrations (transactions, metrics log, nudges)
//! - CSV import/export for transaction history
//! - Spending analytics and trend projection
//! - Z-score anomaly detection
//! - Weighted financial health score with snapshot history
//! - Overspending risk classifier with explainable factors
//! - Rule-based behavioral nudges and insights

pub mod analytics;
pub mod anomaly;
pub mod db;
pub mod error;
pub mod health;
pub mod import;
pub mod models;
pub mod nudge;
pub mod risk;

mod stats;

pub use analytics::AnalyticsEngine;
pub use anomaly::{AnomalyDetector, DetectorConfig};
pub use db::{Database, TransactionInsertResult};
pub use error::{Error, Result};
pub use health::{HealthScoreEngine, ScoreWeights};
pub use import::{export_csv, import_csv, ImportStats};
pub use models::{
    AmountAnomaly, AnomalySummary, BudgetRow, Category, CategoryAnomaly, CategorySpend,
    ComponentScore, DailySpend, DeliveryMetrics, FactorSeverity, FrequencyAnalysis,
    HealthSnapshot, InsightItem, InsightSeverity, NewTransaction, Nudge, NudgeRecord, NudgeTone,
    NudgeType, OverspendPeriod, RiskFactor, RiskFeatures, RiskLevel, RiskResult, ScoreDelta,
    ScoreResult, SpendingProjection, SummaryStats, Transaction, TransactionSource, Trend,
    WeeklyComparison, WeeklyTrendPoint,
};
pub use nudge::BehaviorEngine;
pub use risk::{default_model_path, global_model, ModelArtifact, RiskPredictor};
