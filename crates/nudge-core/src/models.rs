//! Domain models for Nudge

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The category used for delivery-specific metrics
pub const DELIVERY_CATEGORY: &str = "Food Delivery";

/// Suggested monthly budget (INR) for categories not in the fixed set
pub const DEFAULT_BUDGET: f64 = 5000.0;

/// Transaction source - how it entered the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransactionSource {
    /// Imported from an uploaded CSV
    CsvUpload,
    /// Pulled from the email sync pipeline
    GmailSync,
    /// Manually entered
    #[default]
    ManualEntry,
    /// Generated by the demo simulator
    Simulation,
}

impl TransactionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CsvUpload => "csv_upload",
            Self::GmailSync => "gmail_sync",
            Self::ManualEntry => "manual_entry",
            Self::Simulation => "simulation",
        }
    }
}

impl std::str::FromStr for TransactionSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv_upload" => Ok(Self::CsvUpload),
            "gmail_sync" => Ok(Self::GmailSync),
            "manual_entry" => Ok(Self::ManualEntry),
            "simulation" => Ok(Self::Simulation),
            _ => Err(format!("Unknown transaction source: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The fixed spending categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    FoodDelivery,
    Groceries,
    Transportation,
    Entertainment,
    Utilities,
    Healthcare,
    Shopping,
    Education,
    Investment,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FoodDelivery => "Food Delivery",
            Self::Groceries => "Groceries",
            Self::Transportation => "Transportation",
            Self::Entertainment => "Entertainment",
            Self::Utilities => "Utilities",
            Self::Healthcare => "Healthcare",
            Self::Shopping => "Shopping",
            Self::Education => "Education",
            Self::Investment => "Investment",
            Self::Other => "Other",
        }
    }

    pub fn all() -> [Category; 10] {
        [
            Self::FoodDelivery,
            Self::Groceries,
            Self::Transportation,
            Self::Entertainment,
            Self::Utilities,
            Self::Healthcare,
            Self::Shopping,
            Self::Education,
            Self::Investment,
            Self::Other,
        ]
    }

    /// Suggested monthly budget in INR
    pub fn suggested_budget(&self) -> f64 {
        match self {
            Self::FoodDelivery => 6000.0,
            Self::Groceries => 8000.0,
            Self::Transportation => 5000.0,
            Self::Entertainment => 2000.0,
            Self::Utilities => 5000.0,
            Self::Healthcare => 3000.0,
            Self::Shopping => 15000.0,
            Self::Education => 10000.0,
            Self::Investment => 20000.0,
            Self::Other => 5000.0,
        }
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Category::all()
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown category: {}", s))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Suggested budget for a category string, falling back to the default bucket
/// for anything outside the fixed set
pub fn suggested_budget_for(category: &str) -> f64 {
    category
        .parse::<Category>()
        .map(|c| c.suggested_budget())
        .unwrap_or(DEFAULT_BUDGET)
}

/// A financial transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    /// Calendar day; the model carries no time-of-day
    pub date: NaiveDate,
    /// Category label; values outside the fixed set fall back to the
    /// default budget bucket in scoring logic
    pub category: String,
    /// Non-negative spend amount
    pub amount: f64,
    pub source: TransactionSource,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// A new transaction to be inserted (before DB insertion)
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub date: NaiveDate,
    pub category: String,
    pub amount: f64,
    pub source: TransactionSource,
    pub description: String,
}

/// A persisted health score snapshot (append-only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub id: i64,
    pub user_id: i64,
    pub health_score: f64,
    /// Hand-weighted risk proxy in [0, 1]; distinct from the classifier output
    pub overspend_risk: f64,
    pub volatility: f64,
    pub delivery_ratio: f64,
    pub anomaly_count: i64,
    pub calculated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Analytics results
// ---------------------------------------------------------------------------

/// Descriptive statistics over a transaction set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryStats {
    pub total_transactions: usize,
    pub total_spent: f64,
    pub average_transaction: f64,
    pub median_transaction: f64,
    pub max_transaction: f64,
    pub min_transaction: f64,
    pub date_range_days: i64,
}

/// Per-category aggregate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySpend {
    pub category: String,
    pub total: f64,
    pub count: usize,
    pub average: f64,
}

/// Delivery-specific metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveryMetrics {
    pub delivery_total: f64,
    pub delivery_count: usize,
    /// Delivery share of total spend, as a percentage
    pub delivery_percentage: f64,
    pub total_spending: f64,
    pub avg_delivery_order: f64,
}

/// Week-over-week direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Increasing => "increasing",
            Self::Decreasing => "decreasing",
            Self::Stable => "stable",
        }
    }
}

/// Spend over the last week vs the week before
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyComparison {
    pub current_week: f64,
    pub previous_week: f64,
    pub change_percentage: f64,
    pub trend: Trend,
}

/// One day of aggregated spend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySpend {
    pub date: NaiveDate,
    pub amount: f64,
}

/// Aggregated spend for one day of the week (Monday-first ordering)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayOfWeekSpend {
    pub weekday: chrono::Weekday,
    pub amount: f64,
}

/// Whether a weekly trend point was observed or projected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendPointKind {
    Actual,
    Projected,
}

/// One week of the trailing trend, observed or linearly projected
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyTrendPoint {
    /// Week index; 1 is the oldest observed week
    pub week: i64,
    pub amount: f64,
    pub kind: TrendPointKind,
}

/// Actual spend vs suggested budget for one category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetRow {
    pub category: String,
    pub actual: f64,
    pub budget: f64,
    /// actual / budget, as a percentage rounded to whole points
    pub percentage: f64,
}

/// Naive forward projection from the historical daily average
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpendingProjection {
    pub projected_amount: f64,
    pub daily_average: f64,
    pub projection_days: u32,
}

// ---------------------------------------------------------------------------
// Anomaly results
// ---------------------------------------------------------------------------

/// A transaction flagged as a whole-population amount outlier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmountAnomaly {
    pub transaction_id: i64,
    pub date: NaiveDate,
    pub category: String,
    pub amount: f64,
    pub z_score: f64,
    /// Percent above (or below, negative) the population mean
    pub deviation_pct: f64,
    pub description: String,
}

/// A transaction flagged as an outlier within its own category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryAnomaly {
    pub transaction_id: i64,
    pub date: NaiveDate,
    pub category: String,
    pub amount: f64,
    pub z_score: f64,
    pub category_average: f64,
    pub deviation_pct: f64,
    pub description: String,
}

/// A day with an unusual number of transactions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalousDay {
    pub date: NaiveDate,
    pub count: usize,
    pub deviation_pct: f64,
}

/// Frequency anomaly analysis over daily transaction counts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrequencyAnalysis {
    pub average_daily_transactions: f64,
    pub anomalous_days: Vec<AnomalousDay>,
}

/// A transaction exceeding the overspend threshold
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverspendPeriod {
    pub transaction_id: i64,
    pub date: NaiveDate,
    pub category: String,
    pub amount: f64,
    pub threshold: f64,
    pub excess: f64,
}

/// Bundle of all anomaly detections for one transaction set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalySummary {
    pub total_amount_anomalies: usize,
    pub total_category_anomalies: usize,
    pub amount_anomalies: Vec<AmountAnomaly>,
    pub category_anomalies: Vec<CategoryAnomaly>,
    pub frequency_analysis: Option<FrequencyAnalysis>,
    /// Amount anomalies as a percentage of all transactions
    pub anomaly_rate: f64,
}

// ---------------------------------------------------------------------------
// Health score results
// ---------------------------------------------------------------------------

/// One scored component of the health score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentScore {
    /// Normalized score in [0, 100]
    pub score: f64,
    /// The raw metric the score was derived from
    pub value: f64,
    /// Fixed weight in the composite
    pub weight: f64,
}

/// Per-component breakdown of the health score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub delivery_ratio: ComponentScore,
    pub volatility: ComponentScore,
    pub anomaly_frequency: ComponentScore,
    pub overspending: ComponentScore,
}

/// The composite health score with breakdown, grade, and status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Weighted composite in [0, 100], rounded to one decimal
    pub final_score: f64,
    pub components: ScoreBreakdown,
    pub grade: String,
    pub status: String,
}

/// Score movement between the two most recent snapshots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreDelta {
    pub previous_score: f64,
    pub current_score: f64,
    pub change: f64,
    pub calculated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Risk results
// ---------------------------------------------------------------------------

/// The 4-dimensional feature vector fed to the classifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskFeatures {
    pub delivery_ratio: f64,
    pub volatility: f64,
    pub anomaly_count: usize,
    pub budget_breach_count: usize,
}

impl RiskFeatures {
    pub fn as_array(&self) -> [f64; 4] {
        [
            self.delivery_ratio,
            self.volatility,
            self.anomaly_count as f64,
            self.budget_breach_count as f64,
        ]
    }
}

/// Classifier risk band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Moderate => "Moderate",
            Self::High => "High",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Severity of a rule-triggered risk factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FactorSeverity {
    Moderate,
    High,
}

impl FactorSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Moderate => "Moderate",
            Self::High => "High",
        }
    }
}

/// A rule-triggered explanatory risk signal, distinct from the classifier
/// probability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskFactor {
    pub factor: String,
    pub value: String,
    pub severity: FactorSeverity,
}

/// Classifier output for one user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskResult {
    /// P(risk = 1), rounded to three decimals
    pub risk_probability: f64,
    pub risk_percentage: f64,
    /// Binary class at the 0.5 boundary
    pub risk_class: u8,
    pub risk_level: RiskLevel,
    /// The raw (unscaled) feature values, for display
    pub features: RiskFeatures,
}

// ---------------------------------------------------------------------------
// Nudges and insights
// ---------------------------------------------------------------------------

/// Kinds of behavioral nudge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NudgeType {
    HighDelivery,
    Improvement,
    Warning,
}

impl NudgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HighDelivery => "high_delivery",
            Self::Improvement => "improvement",
            Self::Warning => "warning",
        }
    }
}

/// Tone a nudge is delivered in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NudgeTone {
    Encouraging,
    Warning,
    Informative,
    Motivational,
}

impl NudgeTone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Encouraging => "encouraging",
            Self::Warning => "warning",
            Self::Informative => "informative",
            Self::Motivational => "motivational",
        }
    }
}

impl std::str::FromStr for NudgeTone {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "encouraging" => Ok(Self::Encouraging),
            "warning" => Ok(Self::Warning),
            "informative" => Ok(Self::Informative),
            "motivational" => Ok(Self::Motivational),
            _ => Err(format!("Unknown nudge tone: {}", s)),
        }
    }
}

/// A generated behavioral nudge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Nudge {
    pub text: String,
    pub tone: NudgeTone,
    pub nudge_type: NudgeType,
}

/// A persisted nudge with its creation time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NudgeRecord {
    pub text: String,
    pub tone: NudgeTone,
    pub created_at: DateTime<Utc>,
}

/// Severity of a summary insight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightSeverity {
    Low,
    Medium,
    High,
}

/// One behavioral insight with a suggested action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightItem {
    pub category: String,
    pub message: String,
    pub action: String,
    pub severity: InsightSeverity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_round_trip() {
        for src in [
            TransactionSource::CsvUpload,
            TransactionSource::GmailSync,
            TransactionSource::ManualEntry,
            TransactionSource::Simulation,
        ] {
            let parsed: TransactionSource = src.as_str().parse().unwrap();
            assert_eq!(parsed, src);
        }
        assert!("carrier_pigeon".parse::<TransactionSource>().is_err());
    }

    #[test]
    fn test_budget_fallback_for_unknown_category() {
        assert_eq!(suggested_budget_for("Food Delivery"), 6000.0);
        assert_eq!(suggested_budget_for("Investment"), 20000.0);
        // Anything outside the fixed set lands in the default bucket
        assert_eq!(suggested_budget_for("Crypto Lessons"), DEFAULT_BUDGET);
    }

    #[test]
    fn test_category_parse_is_case_insensitive() {
        assert_eq!("groceries".parse::<Category>().unwrap(), Category::Groceries);
        assert_eq!(
            "food delivery".parse::<Category>().unwrap(),
            Category::FoodDelivery
        );
    }
}
