//! Financial health score engine
//!
//! Maps four raw behavioral metrics (delivery ratio, volatility, anomaly
//! frequency, overspending rate) through piecewise-linear normalization
//! curves into component scores, then combines them with fixed weights into
//! a 0-100 composite. Snapshots are appended to the metrics log so score
//! movement can be tracked over time.

use tracing::info;

use crate::analytics::AnalyticsEngine;
use crate::anomaly::AnomalyDetector;
use crate::db::Database;
use crate::error::Result;
use crate::models::{ComponentScore, ScoreBreakdown, ScoreDelta, ScoreResult, HealthSnapshot};
use crate::stats::round1;

/// Delivery ratio above which spending is considered high
const HIGH_DELIVERY_RATIO: f64 = 0.25;

/// Fixed component weights; not user-adjustable at runtime
#[derive(Debug, Clone, Copy)]
pub struct ScoreWeights {
    pub delivery_ratio: f64,
    pub volatility: f64,
    pub anomaly_frequency: f64,
    pub overspending: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            delivery_ratio: 0.30,
            volatility: 0.25,
            anomaly_frequency: 0.25,
            overspending: 0.20,
        }
    }
}

/// Health score engine for one user
pub struct HealthScoreEngine<'a> {
    db: &'a Database,
    user_id: i64,
    analytics: AnalyticsEngine,
    detector: AnomalyDetector,
    weights: ScoreWeights,
}

impl<'a> HealthScoreEngine<'a> {
    /// Build the engine over a fresh transaction load for the user
    pub fn new(db: &'a Database, user_id: i64) -> Result<Self> {
        let transactions = db.list_transactions(user_id)?;
        Ok(Self::from_parts(
            db,
            user_id,
            AnalyticsEngine::new(transactions.clone()),
            AnomalyDetector::new(transactions),
        ))
    }

    /// Build the engine from pre-constructed analytics and detector
    /// (lets tests pin the analytics reference date)
    pub fn from_parts(
        db: &'a Database,
        user_id: i64,
        analytics: AnalyticsEngine,
        detector: AnomalyDetector,
    ) -> Self {
        Self {
            db,
            user_id,
            analytics,
            detector,
            weights: ScoreWeights::default(),
        }
    }

    pub fn analytics(&self) -> &AnalyticsEngine {
        &self.analytics
    }

    pub fn detector(&self) -> &AnomalyDetector {
        &self.detector
    }

    /// Calculate the composite health score with per-component breakdown
    pub fn calculate_health_score(&self) -> ScoreResult {
        let delivery_ratio = self.analytics.delivery_ratio();
        let volatility = self.analytics.volatility();
        let anomaly_count = self.detector.anomaly_count();
        let overspend_count = self.detector.detect_overspending_periods().len();
        let total_transactions = self.analytics.transactions().len();
        let avg_amount = self.analytics.summary_stats().average_transaction;

        let delivery_score = Self::delivery_score(delivery_ratio);
        let volatility_score = Self::volatility_score(volatility, avg_amount);
        let anomaly_score = Self::anomaly_score(anomaly_count, total_transactions);
        let overspend_score = Self::overspend_score(overspend_count, total_transactions);

        let final_score = round1(
            (delivery_score * self.weights.delivery_ratio
                + volatility_score * self.weights.volatility
                + anomaly_score * self.weights.anomaly_frequency
                + overspend_score * self.weights.overspending)
                .clamp(0.0, 100.0),
        );

        ScoreResult {
            final_score,
            components: ScoreBreakdown {
                delivery_ratio: ComponentScore {
                    score: round1(delivery_score),
                    value: round1(delivery_ratio * 100.0),
                    weight: self.weights.delivery_ratio,
                },
                volatility: ComponentScore {
                    score: round1(volatility_score),
                    value: (volatility * 100.0).round() / 100.0,
                    weight: self.weights.volatility,
                },
                anomaly_frequency: ComponentScore {
                    score: round1(anomaly_score),
                    value: anomaly_count as f64,
                    weight: self.weights.anomaly_frequency,
                },
                overspending: ComponentScore {
                    score: round1(overspend_score),
                    value: overspend_count as f64,
                    weight: self.weights.overspending,
                },
            },
            grade: Self::grade(final_score).to_string(),
            status: Self::status(final_score).to_string(),
        }
    }

    /// Score the delivery spending ratio (lower is better)
    pub fn delivery_score(ratio: f64) -> f64 {
        let t = HIGH_DELIVERY_RATIO;
        let score = if ratio <= t * 0.5 {
            100.0
        } else if ratio <= t {
            100.0 - ((ratio - t * 0.5) / (t * 0.5)) * 20.0
        } else if ratio <= t * 2.0 {
            80.0 - ((ratio - t) / t) * 50.0
        } else {
            30.0 - (ratio - t * 2.0) * 100.0
        };
        score.clamp(0.0, 100.0)
    }

    /// Score spending volatility, normalized by the mean transaction amount
    /// (lower is better); a zero mean amount scores 100
    pub fn volatility_score(volatility: f64, avg_amount: f64) -> f64 {
        if avg_amount == 0.0 {
            return 100.0;
        }

        let nv = volatility / avg_amount;
        let score = if nv <= 0.2 {
            100.0
        } else if nv <= 0.5 {
            100.0 - (nv - 0.2) / 0.3 * 20.0
        } else if nv <= 1.0 {
            80.0 - (nv - 0.5) / 0.5 * 40.0
        } else {
            40.0 - (nv - 1.0) * 30.0
        };
        score.clamp(0.0, 100.0)
    }

    /// Score the anomaly rate (lower is better); an empty set scores 100
    pub fn anomaly_score(anomaly_count: usize, total_transactions: usize) -> f64 {
        if total_transactions == 0 {
            return 100.0;
        }

        let rate = anomaly_count as f64 / total_transactions as f64;
        let score = if rate == 0.0 {
            100.0
        } else if rate <= 0.05 {
            100.0 - (rate / 0.05) * 10.0
        } else if rate <= 0.15 {
            90.0 - ((rate - 0.05) / 0.10) * 40.0
        } else {
            50.0 - (rate - 0.15) * 200.0
        };
        score.clamp(0.0, 100.0)
    }

    /// Score the overspending rate (lower is better); an empty set scores 100
    pub fn overspend_score(overspend_count: usize, total_transactions: usize) -> f64 {
        if total_transactions == 0 {
            return 100.0;
        }

        let rate = overspend_count as f64 / total_transactions as f64;
        let score = if rate == 0.0 {
            100.0
        } else if rate <= 0.1 {
            100.0 - (rate / 0.1) * 20.0
        } else if rate <= 0.25 {
            80.0 - ((rate - 0.1) / 0.15) * 40.0
        } else {
            40.0 - (rate - 0.25) * 100.0
        };
        score.clamp(0.0, 100.0)
    }

    fn grade(score: f64) -> &'static str {
        if score >= 90.0 {
            "A+ Excellent"
        } else if score >= 80.0 {
            "A Good"
        } else if score >= 70.0 {
            "B Fair"
        } else if score >= 60.0 {
            "C Needs Improvement"
        } else if score >= 50.0 {
            "D Poor"
        } else {
            "F Critical"
        }
    }

    fn status(score: f64) -> &'static str {
        if score >= 80.0 {
            "Healthy"
        } else if score >= 60.0 {
            "Moderate"
        } else {
            "At Risk"
        }
    }

    /// Compute the score and append a snapshot to the metrics log
    ///
    /// Alongside the health score this stores a hand-weighted overspend-risk
    /// proxy. The proxy and the classifier-based RiskPredictor output are
    /// intentionally distinct signals and are never unified.
    pub fn save_metrics(&self) -> Result<ScoreResult> {
        let score_data = self.calculate_health_score();
        let delivery_ratio = self.analytics.delivery_ratio();
        let volatility = self.analytics.volatility();
        let anomaly_count = self.detector.anomaly_count();

        let overspend_risk = Self::simple_risk(delivery_ratio, volatility, anomaly_count);

        self.db.insert_health_snapshot(
            self.user_id,
            score_data.final_score,
            overspend_risk,
            volatility,
            delivery_ratio,
            anomaly_count as i64,
        )?;

        info!(
            user_id = self.user_id,
            score = score_data.final_score,
            overspend_risk,
            "Health snapshot saved"
        );

        Ok(score_data)
    }

    /// Hand-weighted overspending risk proxy in [0, 1]
    fn simple_risk(delivery_ratio: f64, volatility: f64, anomaly_count: usize) -> f64 {
        let risk = delivery_ratio * 0.4
            + (volatility / 1000.0).min(1.0) * 0.3
            + (anomaly_count as f64 / 10.0).min(1.0) * 0.3;
        risk.clamp(0.0, 1.0)
    }

    /// Score movement between the two most recent snapshots, if both exist
    pub fn previous_score(&self) -> Result<Option<ScoreDelta>> {
        let snapshots = self.db.recent_health_snapshots(self.user_id, 2)?;

        if snapshots.len() < 2 {
            return Ok(None);
        }

        let current = &snapshots[0];
        let previous = &snapshots[1];

        Ok(Some(ScoreDelta {
            previous_score: previous.health_score,
            current_score: current.health_score,
            change: current.health_score - previous.health_score,
            calculated_at: previous.calculated_at,
        }))
    }

    /// Recent score history, newest first
    pub fn score_history(&self, limit: i64) -> Result<Vec<HealthSnapshot>> {
        self.db.recent_health_snapshots(self.user_id, limit)
    }
}
