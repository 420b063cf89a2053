//! Overspending risk prediction
//!
//! Extracts the 4-dimensional feature vector from the analytics and
//! anomaly engines, runs it through the persisted classifier, and
//! produces explainable rule-based risk factors and recommendations
//! alongside the probability.

use tracing::debug;

use crate::analytics::AnalyticsEngine;
use crate::anomaly::AnomalyDetector;
use crate::db::Database;
use crate::error::Result;
use crate::models::{FactorSeverity, RiskFactor, RiskFeatures, RiskLevel, RiskResult};

mod model;

pub use model::{
    default_model_path, global_model, FeatureScaler, LogisticModel, ModelArtifact, MODEL_FEATURES,
};

/// Risk predictor for one user
pub struct RiskPredictor<'a> {
    analytics: AnalyticsEngine,
    detector: AnomalyDetector,
    artifact: &'a ModelArtifact,
}

impl<'a> RiskPredictor<'a> {
    /// Build the predictor over a fresh transaction load for the user
    pub fn new(db: &Database, user_id: i64, artifact: &'a ModelArtifact) -> Result<Self> {
        let transactions = db.list_transactions(user_id)?;
        Ok(Self::from_parts(
            AnalyticsEngine::new(transactions.clone()),
            AnomalyDetector::new(transactions),
            artifact,
        ))
    }

    /// Build the predictor from pre-constructed engines
    pub fn from_parts(
        analytics: AnalyticsEngine,
        detector: AnomalyDetector,
        artifact: &'a ModelArtifact,
    ) -> Self {
        Self {
            analytics,
            detector,
            artifact,
        }
    }

    /// Extract the live feature vector; all zeros on empty history
    pub fn extract_features(&self) -> RiskFeatures {
        if self.analytics.transactions().is_empty() {
            return RiskFeatures::default();
        }

        RiskFeatures {
            delivery_ratio: self.analytics.delivery_ratio(),
            volatility: self.analytics.volatility(),
            anomaly_count: self.detector.anomaly_count(),
            budget_breach_count: self.detector.detect_overspending_periods().len(),
        }
    }

    /// Classify the user's overspending risk
    pub fn predict_overspend_risk(&self) -> RiskResult {
        let features = self.extract_features();
        let scaled = self.artifact.scaler.transform(features.as_array());

        let probability = self.artifact.model.predict_proba(scaled);
        let risk_class = self.artifact.model.predict(scaled);

        let risk_level = if probability < 0.3 {
            RiskLevel::Low
        } else if probability < 0.6 {
            RiskLevel::Moderate
        } else {
            RiskLevel::High
        };

        debug!(probability, level = risk_level.as_str(), "Risk prediction");

        RiskResult {
            risk_probability: (probability * 1000.0).round() / 1000.0,
            risk_percentage: (probability * 1000.0).round() / 10.0,
            risk_class,
            risk_level,
            features,
        }
    }

    /// Rule-based risk factors, independent of the classifier
    ///
    /// Mirrors the thresholds the bootstrap labels were generated with, so
    /// the explanation stays consistent with what the model was taught.
    pub fn risk_factors(&self) -> Vec<RiskFactor> {
        let features = self.extract_features();
        let mut factors = Vec::new();

        if features.delivery_ratio > 0.25 {
            factors.push(RiskFactor {
                factor: "High Delivery Spending".to_string(),
                value: format!("{:.1}%", features.delivery_ratio * 100.0),
                severity: if features.delivery_ratio > 0.4 {
                    FactorSeverity::High
                } else {
                    FactorSeverity::Moderate
                },
            });
        }

        if features.volatility > 300.0 {
            factors.push(RiskFactor {
                factor: "Spending Volatility".to_string(),
                value: format!("₹{:.0}", features.volatility),
                severity: if features.volatility > 500.0 {
                    FactorSeverity::High
                } else {
                    FactorSeverity::Moderate
                },
            });
        }

        if features.anomaly_count > 3 {
            factors.push(RiskFactor {
                factor: "Unusual Transactions".to_string(),
                value: format!("{} anomalies", features.anomaly_count),
                severity: if features.anomaly_count > 6 {
                    FactorSeverity::High
                } else {
                    FactorSeverity::Moderate
                },
            });
        }

        if features.budget_breach_count > 1 {
            factors.push(RiskFactor {
                factor: "Budget Breaches".to_string(),
                value: format!("{} incidents", features.budget_breach_count),
                severity: if features.budget_breach_count > 3 {
                    FactorSeverity::High
                } else {
                    FactorSeverity::Moderate
                },
            });
        }

        factors
    }

    /// Suggestions matched to the triggered risk factors
    pub fn recommendations(&self) -> Vec<String> {
        let risk_factors = self.risk_factors();

        if risk_factors.is_empty() {
            return vec!["Keep up the excellent spending habits!".to_string()];
        }

        let mut recommendations: Vec<String> = risk_factors
            .iter()
            .map(|factor| match factor.factor.as_str() {
                "High Delivery Spending" => {
                    "Reduce food delivery orders by cooking at home more often"
                }
                "Spending Volatility" => {
                    "Create a monthly budget and stick to it for consistency"
                }
                "Unusual Transactions" => {
                    "Review large or unusual transactions to ensure they're necessary"
                }
                _ => "Set spending alerts to avoid exceeding your budget",
            })
            .map(str::to_string)
            .collect();

        recommendations.push("Enable transaction notifications for better awareness".to_string());
        recommendations.push("Set specific savings goals to stay motivated".to_string());

        recommendations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Transaction, TransactionSource};
    use chrono::NaiveDate;

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

    fn predictor_for(transactions: Vec<Transaction>, artifact: &ModelArtifact) -> RiskPredictor<'_> {
        let reference = NaiveDate::from_ymd_opt(2026, 3, 31).unwrap();
        RiskPredictor::from_parts(
            AnalyticsEngine::with_reference_date(transactions.clone(), reference),
            AnomalyDetector::new(transactions),
            artifact,
        )
    }

    /// The end-to-end scenario fixture: ~41% delivery spend and one outlier
    fn scenario_transactions() -> Vec<Transaction> {
        vec![
            tx(1, "2026-03-02", "Food Delivery", 475.0),
            tx(2, "2026-03-05", "Food Delivery", 475.0),
            tx(3, "2026-03-09", "Food Delivery", 475.0),
            tx(4, "2026-03-12", "Food Delivery", 475.0),
            tx(5, "2026-03-03", "Groceries", 100.0),
            tx(6, "2026-03-06", "Groceries", 100.0),
            tx(7, "2026-03-10", "Transportation", 100.0),
            tx(8, "2026-03-14", "Entertainment", 100.0),
            tx(9, "2026-03-18", "Utilities", 100.0),
            tx(10, "2026-03-22", "Groceries", 100.0),
            tx(11, "2026-03-26", "Healthcare", 100.0),
            tx(12, "2026-03-28", "Shopping", 2000.0),
        ]
    }

    #[test]
    fn test_empty_history_features_and_low_risk() {
        let artifact = ModelArtifact::train_bootstrap();
        let predictor = predictor_for(vec![], &artifact);

        assert_eq!(predictor.extract_features(), RiskFeatures::default());

        let result = predictor.predict_overspend_risk();
        assert_eq!(result.risk_level, RiskLevel::Low);
        assert_eq!(result.risk_class, 0);
        assert!(result.risk_probability < 0.3);
    }

    #[test]
    fn test_scenario_predicts_high_risk_with_delivery_factor() {
        let artifact = ModelArtifact::train_bootstrap();
        let predictor = predictor_for(scenario_transactions(), &artifact);

        let features = predictor.extract_features();
        assert!(features.delivery_ratio > 0.4);
        assert_eq!(features.anomaly_count, 1);
        assert!(features.volatility > 500.0);
        assert_eq!(features.budget_breach_count, 5);

        let result = predictor.predict_overspend_risk();
        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(result.risk_class, 1);
        assert_eq!(result.features, features);

        let factors = predictor.risk_factors();
        let delivery = factors
            .iter()
            .find(|f| f.factor == "High Delivery Spending")
            .expect("delivery factor present");
        assert_eq!(delivery.severity, FactorSeverity::High);

        let volatility = factors
            .iter()
            .find(|f| f.factor == "Spending Volatility")
            .expect("volatility factor present");
        assert_eq!(volatility.severity, FactorSeverity::High);

        // Budget breaches: 5 incidents is past the High boundary
        let breaches = factors.iter().find(|f| f.factor == "Budget Breaches").unwrap();
        assert_eq!(breaches.severity, FactorSeverity::High);
    }

    #[test]
    fn test_quiet_history_triggers_no_factors() {
        let artifact = ModelArtifact::train_bootstrap();
        let predictor = predictor_for(
            vec![
                tx(1, "2026-03-02", "Groceries", 100.0),
                tx(2, "2026-03-09", "Groceries", 105.0),
                tx(3, "2026-03-16", "Groceries", 95.0),
                tx(4, "2026-03-23", "Groceries", 100.0),
            ],
            &artifact,
        );

        assert!(predictor.risk_factors().is_empty());
        let recs = predictor.recommendations();
        assert_eq!(recs.len(), 1);
        assert!(recs[0].contains("excellent"));
    }

    #[test]
    fn test_recommendations_cover_factors_plus_general() {
        let artifact = ModelArtifact::train_bootstrap();
        let predictor = predictor_for(scenario_transactions(), &artifact);

        let factors = predictor.risk_factors();
        let recs = predictor.recommendations();
        // One suggestion per factor plus the two general ones
        assert_eq!(recs.len(), factors.len() + 2);
        assert!(recs.iter().any(|r| r.contains("cooking at home")));
        assert!(recs.iter().any(|r| r.contains("savings goals")));
    }

    #[test]
    fn test_risk_percentage_matches_probability() {
        let artifact = ModelArtifact::train_bootstrap();
        let predictor = predictor_for(scenario_transactions(), &artifact);

        let result = predictor.predict_overspend_risk();
        assert!((result.risk_percentage - result.risk_probability * 100.0).abs() < 0.1);
        assert!((0.0..=1.0).contains(&result.risk_probability));
    }
}
