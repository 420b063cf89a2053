//! Spending analytics over a user's transaction history
//!
//! Pure aggregation: every operation is deterministic for a given
//! transaction set and reference date, and degrades to zeros or empty
//! collections on missing data instead of erroring. Time-relative windows
//! (weekly comparison, trend projection) are anchored to the engine's
//! reference date so they can be pinned in tests.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::db::Database;
use crate::error::Result;
use crate::models::{
    suggested_budget_for, BudgetRow, CategorySpend, DailySpend, DayOfWeekSpend, DeliveryMetrics,
    SpendingProjection, SummaryStats, Transaction, Trend, TrendPointKind, WeeklyComparison,
    WeeklyTrendPoint, DELIVERY_CATEGORY,
};
use crate::stats;

/// Number of trailing weeks aggregated for the trend chart
const TREND_HISTORY_WEEKS: i64 = 8;

/// Number of weeks projected past the observed trend
const TREND_PROJECTION_WEEKS: i64 = 4;

/// Analytics engine over one user's transaction set
pub struct AnalyticsEngine {
    transactions: Vec<Transaction>,
    reference_date: NaiveDate,
}

impl AnalyticsEngine {
    /// Build an engine over a freshly loaded transaction set for a user
    pub fn for_user(db: &Database, user_id: i64) -> Result<Self> {
        let transactions = db.list_transactions(user_id)?;
        Ok(Self::new(transactions))
    }

    /// Build an engine over an already-loaded transaction set
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Self::with_reference_date(transactions, chrono::Local::now().date_naive())
    }

    /// Build an engine with a pinned reference date for time-relative windows
    pub fn with_reference_date(transactions: Vec<Transaction>, reference_date: NaiveDate) -> Self {
        Self {
            transactions,
            reference_date,
        }
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.reference_date
    }

    fn amounts(&self) -> Vec<f64> {
        self.transactions.iter().map(|t| t.amount).collect()
    }

    /// Comprehensive summary statistics; all zeros for an empty set
    pub fn summary_stats(&self) -> SummaryStats {
        if self.transactions.is_empty() {
            return SummaryStats::default();
        }

        let amounts = self.amounts();
        let min_date = self.transactions.iter().map(|t| t.date).min().unwrap();
        let max_date = self.transactions.iter().map(|t| t.date).max().unwrap();

        SummaryStats {
            total_transactions: self.transactions.len(),
            total_spent: amounts.iter().sum(),
            average_transaction: stats::mean(&amounts),
            median_transaction: stats::median(&amounts),
            max_transaction: amounts.iter().cloned().fold(f64::MIN, f64::max),
            min_transaction: amounts.iter().cloned().fold(f64::MAX, f64::min),
            date_range_days: (max_date - min_date).num_days(),
        }
    }

    /// Spending breakdown by category, descending by total
    pub fn category_breakdown(&self) -> Vec<CategorySpend> {
        let mut by_category: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
        for tx in &self.transactions {
            let entry = by_category.entry(tx.category.as_str()).or_insert((0.0, 0));
            entry.0 += tx.amount;
            entry.1 += 1;
        }

        let mut breakdown: Vec<CategorySpend> = by_category
            .into_iter()
            .map(|(category, (total, count))| CategorySpend {
                category: category.to_string(),
                total,
                count,
                average: total / count as f64,
            })
            .collect();

        breakdown.sort_by(|a, b| b.total.partial_cmp(&a.total).unwrap_or(std::cmp::Ordering::Equal));
        breakdown
    }

    /// Delivery-specific metrics
    pub fn delivery_metrics(&self) -> DeliveryMetrics {
        if self.transactions.is_empty() {
            return DeliveryMetrics::default();
        }

        let total_spending: f64 = self.transactions.iter().map(|t| t.amount).sum();
        let delivery: Vec<&Transaction> = self
            .transactions
            .iter()
            .filter(|t| t.category == DELIVERY_CATEGORY)
            .collect();

        let delivery_total: f64 = delivery.iter().map(|t| t.amount).sum();
        let delivery_count = delivery.len();

        DeliveryMetrics {
            delivery_total,
            delivery_count,
            delivery_percentage: if total_spending > 0.0 {
                delivery_total / total_spending * 100.0
            } else {
                0.0
            },
            total_spending,
            avg_delivery_order: if delivery_count > 0 {
                delivery_total / delivery_count as f64
            } else {
                0.0
            },
        }
    }

    /// Delivery spending as a fraction of total spending; 0 on zero total
    pub fn delivery_ratio(&self) -> f64 {
        let metrics = self.delivery_metrics();
        if metrics.total_spending == 0.0 {
            return 0.0;
        }
        metrics.delivery_total / metrics.total_spending
    }

    /// Spending volatility: sample standard deviation of per-day totals
    ///
    /// Aggregates by calendar day first, so a burst of small same-day
    /// purchases reads the same as one large one. Needs at least 2 distinct
    /// days of history.
    pub fn volatility(&self) -> f64 {
        if self.transactions.len() < 2 {
            return 0.0;
        }

        let daily: Vec<f64> = self
            .spending_trend()
            .into_iter()
            .map(|d| d.amount)
            .collect();

        stats::sample_std_dev(&daily)
    }

    /// Spending over the last 7 days vs the 7 days before that
    ///
    /// Previous-week totals of zero yield a 0% change rather than a
    /// division blowup.
    pub fn weekly_comparison(&self) -> WeeklyComparison {
        if self.transactions.is_empty() {
            return WeeklyComparison {
                current_week: 0.0,
                previous_week: 0.0,
                change_percentage: 0.0,
                trend: Trend::Stable,
            };
        }

        let today = self.reference_date;
        let one_week_ago = today - Duration::days(7);
        let two_weeks_ago = today - Duration::days(14);

        let current_total: f64 = self
            .transactions
            .iter()
            .filter(|t| t.date >= one_week_ago && t.date <= today)
            .map(|t| t.amount)
            .sum();

        let previous_total: f64 = self
            .transactions
            .iter()
            .filter(|t| t.date >= two_weeks_ago && t.date < one_week_ago)
            .map(|t| t.amount)
            .sum();

        let change_pct = if previous_total > 0.0 {
            (current_total - previous_total) / previous_total * 100.0
        } else {
            0.0
        };

        let trend = if change_pct > 10.0 {
            Trend::Increasing
        } else if change_pct < -10.0 {
            Trend::Decreasing
        } else {
            Trend::Stable
        };

        WeeklyComparison {
            current_week: current_total,
            previous_week: previous_total,
            change_percentage: change_pct,
            trend,
        }
    }

    /// Per-day spend totals, ascending by date
    pub fn spending_trend(&self) -> Vec<DailySpend> {
        let mut daily: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for tx in &self.transactions {
            *daily.entry(tx.date).or_insert(0.0) += tx.amount;
        }

        daily
            .into_iter()
            .map(|(date, amount)| DailySpend { date, amount })
            .collect()
    }

    /// Spend grouped by day of week, Monday first
    pub fn weekly_spending_pattern(&self) -> Vec<DayOfWeekSpend> {
        let mut by_day: BTreeMap<u32, f64> = BTreeMap::new();
        for tx in &self.transactions {
            *by_day
                .entry(tx.date.weekday().num_days_from_monday())
                .or_insert(0.0) += tx.amount;
        }

        by_day
            .into_iter()
            .map(|(day_num, amount)| DayOfWeekSpend {
                weekday: weekday_from_monday_offset(day_num),
                amount,
            })
            .collect()
    }

    /// The day of week carrying the most spend, if any spend exists
    pub fn peak_spending_day(&self) -> Option<DayOfWeekSpend> {
        self.weekly_spending_pattern()
            .into_iter()
            .max_by(|a, b| a.amount.partial_cmp(&b.amount).unwrap_or(std::cmp::Ordering::Equal))
    }

    /// Trailing 8-week totals with a 4-week linear projection
    ///
    /// Weeks are counted back from the reference date; week 1 is the oldest.
    /// The projection extends the last observed week by the mean
    /// week-over-week delta, floored at zero, and needs at least two
    /// observed weeks; otherwise only actuals are returned.
    pub fn monthly_trend_with_projection(&self) -> Vec<WeeklyTrendPoint> {
        let today = self.reference_date;
        let mut weekly: BTreeMap<i64, f64> = BTreeMap::new();

        for tx in &self.transactions {
            let days_ago = (today - tx.date).num_days();
            if !(0..=TREND_HISTORY_WEEKS * 7).contains(&days_ago) {
                continue;
            }
            let week = TREND_HISTORY_WEEKS - days_ago / 7;
            if week > 0 {
                *weekly.entry(week).or_insert(0.0) += tx.amount;
            }
        }

        let mut points: Vec<WeeklyTrendPoint> = weekly
            .iter()
            .map(|(&week, &amount)| WeeklyTrendPoint {
                week,
                amount,
                kind: TrendPointKind::Actual,
            })
            .collect();

        if points.len() < 2 {
            return points;
        }

        let amounts: Vec<f64> = points.iter().map(|p| p.amount).collect();
        let diffs: Vec<f64> = amounts.windows(2).map(|w| w[1] - w[0]).collect();
        let avg_growth = stats::mean(&diffs);
        let last_amount = *amounts.last().unwrap();
        let last_week = points.last().unwrap().week;

        for step in 1..=TREND_PROJECTION_WEEKS {
            points.push(WeeklyTrendPoint {
                week: last_week + step,
                amount: (last_amount + avg_growth * step as f64).max(0.0),
                kind: TrendPointKind::Projected,
            });
        }

        points
    }

    /// Actual spend per category against the suggested budgets
    ///
    /// Categories outside the fixed set are kept and compared against the
    /// default budget. Sorted descending by actual spend.
    pub fn budget_comparison(&self) -> Vec<BudgetRow> {
        let mut rows: Vec<BudgetRow> = self
            .category_breakdown()
            .into_iter()
            .map(|c| {
                let budget = suggested_budget_for(&c.category);
                BudgetRow {
                    percentage: (c.total / budget * 100.0).round(),
                    category: c.category,
                    actual: c.total,
                    budget,
                }
            })
            .collect();

        rows.sort_by(|a, b| b.actual.partial_cmp(&a.actual).unwrap_or(std::cmp::Ordering::Equal));
        rows
    }

    /// Project future spend from the historical daily average
    pub fn project_future_spending(&self, days: u32) -> SpendingProjection {
        if self.transactions.is_empty() {
            return SpendingProjection {
                projection_days: days,
                ..SpendingProjection::default()
            };
        }

        let stats = self.summary_stats();
        let range_days = stats.date_range_days.max(1);
        let daily_average = stats.total_spent / range_days as f64;

        SpendingProjection {
            projected_amount: daily_average * days as f64,
            daily_average,
            projection_days: days,
        }
    }
}

fn weekday_from_monday_offset(offset: u32) -> Weekday {
    match offset {
        0 => Weekday::Mon,
        1 => Weekday::Tue,
        2 => Weekday::Wed,
        3 => Weekday::Thu,
        4 => Weekday::Fri,
        5 => Weekday::Sat,
        _ => Weekday::Sun,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionSource;

    fn tx(id: i64, date: &str, category: &str, amount: f64) -> Transaction {
        Transaction {
            id,
            user_id: 1,
            date: date.parse().unwrap(),
            category: category.to_string(),
            amount,
            source: TransactionSource::ManualEntry,
            description: String::new(),
            created_at: chrono::Utc::now(),
        }
    }

    fn ref_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 16).unwrap()
    }

    #[test]
    fn test_empty_set_degrades_to_zeros() {
        let engine = AnalyticsEngine::with_reference_date(vec![], ref_date());

        let stats = engine.summary_stats();
        assert_eq!(stats.total_transactions, 0);
        assert_eq!(stats.total_spent, 0.0);
        assert_eq!(stats.median_transaction, 0.0);

        assert_eq!(engine.delivery_ratio(), 0.0);
        assert_eq!(engine.volatility(), 0.0);
        assert!(engine.category_breakdown().is_empty());
        assert!(engine.spending_trend().is_empty());
        assert!(engine.monthly_trend_with_projection().is_empty());
        assert_eq!(engine.weekly_comparison().change_percentage, 0.0);
        assert_eq!(engine.project_future_spending(30).projected_amount, 0.0);
    }

    #[test]
    fn test_summary_stats() {
        let engine = AnalyticsEngine::with_reference_date(
            vec![
                tx(1, "2026-03-01", "Groceries", 100.0),
                tx(2, "2026-03-05", "Groceries", 300.0),
                tx(3, "2026-03-11", "Shopping", 200.0),
            ],
            ref_date(),
        );

        let stats = engine.summary_stats();
        assert_eq!(stats.total_transactions, 3);
        assert_eq!(stats.total_spent, 600.0);
        assert_eq!(stats.average_transaction, 200.0);
        assert_eq!(stats.median_transaction, 200.0);
        assert_eq!(stats.max_transaction, 300.0);
        assert_eq!(stats.min_transaction, 100.0);
        assert_eq!(stats.date_range_days, 10);
    }

    #[test]
    fn test_category_breakdown_sorted_descending() {
        let engine = AnalyticsEngine::with_reference_date(
            vec![
                tx(1, "2026-03-01", "Groceries", 100.0),
                tx(2, "2026-03-02", "Shopping", 500.0),
                tx(3, "2026-03-03", "Groceries", 200.0),
            ],
            ref_date(),
        );

        let breakdown = engine.category_breakdown();
        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown[0].category, "Shopping");
        assert_eq!(breakdown[0].total, 500.0);
        assert_eq!(breakdown[1].category, "Groceries");
        assert_eq!(breakdown[1].count, 2);
        assert_eq!(breakdown[1].average, 150.0);
    }

    #[test]
    fn test_delivery_metrics_and_ratio() {
        let engine = AnalyticsEngine::with_reference_date(
            vec![
                tx(1, "2026-03-01", "Food Delivery", 400.0),
                tx(2, "2026-03-02", "Food Delivery", 200.0),
                tx(3, "2026-03-03", "Groceries", 900.0),
            ],
            ref_date(),
        );

        let metrics = engine.delivery_metrics();
        assert_eq!(metrics.delivery_total, 600.0);
        assert_eq!(metrics.delivery_count, 2);
        assert_eq!(metrics.total_spending, 1500.0);
        assert_eq!(metrics.avg_delivery_order, 300.0);
        assert!((metrics.delivery_percentage - 40.0).abs() < 1e-9);
        assert!((engine.delivery_ratio() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_volatility_needs_two_distinct_days() {
        // Two transactions on the same day collapse to one daily total
        let engine = AnalyticsEngine::with_reference_date(
            vec![
                tx(1, "2026-03-01", "Groceries", 100.0),
                tx(2, "2026-03-01", "Shopping", 500.0),
            ],
            ref_date(),
        );
        assert_eq!(engine.volatility(), 0.0);

        // Daily totals 200 and 400: sample std dev is sqrt(20000)
        let engine = AnalyticsEngine::with_reference_date(
            vec![
                tx(1, "2026-03-01", "Groceries", 200.0),
                tx(2, "2026-03-02", "Groceries", 400.0),
            ],
            ref_date(),
        );
        assert!((engine.volatility() - 20000f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_weekly_comparison_windows_and_trend() {
        let today = ref_date();
        let engine = AnalyticsEngine::with_reference_date(
            vec![
                // Current week: [today-7, today]
                tx(1, &(today - Duration::days(2)).to_string(), "Groceries", 600.0),
                // Previous week: [today-14, today-7)
                tx(2, &(today - Duration::days(9)).to_string(), "Groceries", 400.0),
                // Outside both windows
                tx(3, &(today - Duration::days(20)).to_string(), "Groceries", 9999.0),
            ],
            today,
        );

        let cmp = engine.weekly_comparison();
        assert_eq!(cmp.current_week, 600.0);
        assert_eq!(cmp.previous_week, 400.0);
        assert!((cmp.change_percentage - 50.0).abs() < 1e-9);
        assert_eq!(cmp.trend, Trend::Increasing);
    }

    #[test]
    fn test_weekly_comparison_zero_previous_week() {
        let today = ref_date();
        let engine = AnalyticsEngine::with_reference_date(
            vec![tx(1, &(today - Duration::days(1)).to_string(), "Groceries", 500.0)],
            today,
        );

        let cmp = engine.weekly_comparison();
        assert_eq!(cmp.previous_week, 0.0);
        assert_eq!(cmp.change_percentage, 0.0);
        assert_eq!(cmp.trend, Trend::Stable);
    }

    #[test]
    fn test_weekly_spending_pattern_monday_first() {
        let engine = AnalyticsEngine::with_reference_date(
            vec![
                // 2026-03-09 is a Monday, 2026-03-14 a Saturday
                tx(1, "2026-03-09", "Groceries", 100.0),
                tx(2, "2026-03-14", "Shopping", 900.0),
                tx(3, "2026-03-09", "Utilities", 50.0),
            ],
            ref_date(),
        );

        let pattern = engine.weekly_spending_pattern();
        assert_eq!(pattern.len(), 2);
        assert_eq!(pattern[0].weekday, Weekday::Mon);
        assert_eq!(pattern[0].amount, 150.0);
        assert_eq!(pattern[1].weekday, Weekday::Sat);

        let peak = engine.peak_spending_day().unwrap();
        assert_eq!(peak.weekday, Weekday::Sat);
    }

    #[test]
    fn test_trend_projection_extends_by_mean_growth() {
        let today = ref_date();
        // Weekly totals 100, 200, 300 -> mean growth 100
        let engine = AnalyticsEngine::with_reference_date(
            vec![
                tx(1, &(today - Duration::days(17)).to_string(), "Groceries", 100.0),
                tx(2, &(today - Duration::days(10)).to_string(), "Groceries", 200.0),
                tx(3, &(today - Duration::days(3)).to_string(), "Groceries", 300.0),
            ],
            today,
        );

        let points = engine.monthly_trend_with_projection();
        let actuals: Vec<&WeeklyTrendPoint> = points
            .iter()
            .filter(|p| p.kind == TrendPointKind::Actual)
            .collect();
        let projected: Vec<&WeeklyTrendPoint> = points
            .iter()
            .filter(|p| p.kind == TrendPointKind::Projected)
            .collect();

        assert_eq!(actuals.len(), 3);
        assert_eq!(projected.len(), 4);
        assert_eq!(projected[0].amount, 400.0);
        assert_eq!(projected[3].amount, 700.0);
        assert_eq!(projected[0].week, actuals.last().unwrap().week + 1);
    }

    #[test]
    fn test_trend_projection_floors_at_zero() {
        let today = ref_date();
        // Weekly totals 500, 100 -> growth -400; projections bottom out at 0
        let engine = AnalyticsEngine::with_reference_date(
            vec![
                tx(1, &(today - Duration::days(10)).to_string(), "Groceries", 500.0),
                tx(2, &(today - Duration::days(3)).to_string(), "Groceries", 100.0),
            ],
            today,
        );

        let points = engine.monthly_trend_with_projection();
        let projected: Vec<&WeeklyTrendPoint> = points
            .iter()
            .filter(|p| p.kind == TrendPointKind::Projected)
            .collect();
        assert_eq!(projected[0].amount, 0.0);
        assert!(projected.iter().all(|p| p.amount >= 0.0));
    }

    #[test]
    fn test_trend_projection_requires_two_weeks() {
        let today = ref_date();
        let engine = AnalyticsEngine::with_reference_date(
            vec![tx(1, &(today - Duration::days(3)).to_string(), "Groceries", 100.0)],
            today,
        );

        let points = engine.monthly_trend_with_projection();
        assert_eq!(points.len(), 1);
        assert!(points.iter().all(|p| p.kind == TrendPointKind::Actual));
    }

    #[test]
    fn test_budget_comparison_includes_unknown_category() {
        let engine = AnalyticsEngine::with_reference_date(
            vec![
                tx(1, "2026-03-01", "Groceries", 4000.0),
                tx(2, "2026-03-02", "Llama Grooming", 2500.0),
            ],
            ref_date(),
        );

        let rows = engine.budget_comparison();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].category, "Groceries");
        assert_eq!(rows[0].budget, 8000.0);
        assert_eq!(rows[0].percentage, 50.0);

        // Unrecognized category is kept and priced against the default budget
        let unknown = &rows[1];
        assert_eq!(unknown.category, "Llama Grooming");
        assert_eq!(unknown.budget, crate::models::DEFAULT_BUDGET);
        assert_eq!(unknown.percentage, 50.0);
    }

    #[test]
    fn test_project_future_spending() {
        let engine = AnalyticsEngine::with_reference_date(
            vec![
                tx(1, "2026-03-01", "Groceries", 100.0),
                tx(2, "2026-03-11", "Groceries", 300.0),
            ],
            ref_date(),
        );

        let projection = engine.project_future_spending(30);
        assert_eq!(projection.daily_average, 40.0);
        assert_eq!(projection.projected_amount, 1200.0);
        assert_eq!(projection.projection_days, 30);
    }
}
