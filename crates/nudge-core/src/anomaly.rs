//! Statistical anomaly detection over a user's transaction history
//!
//! Z-score on raw amounts is deliberate: the domain is small day-to-day
//! consumer spending with a roughly bounded upper range, so plain deviation
//! from the mean works without robust statistics. Known limitation: a single
//! heavy-tailed payment (an annual premium, say) inflates the mean and std
//! for everything around it.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::debug;

use crate::db::Database;
use crate::error::Result;
use crate::models::{
    AmountAnomaly, AnomalousDay, AnomalySummary, CategoryAnomaly, FrequencyAnalysis,
    OverspendPeriod, Transaction,
};
use crate::stats;

/// Detection configuration
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Z-score above which a transaction is flagged (inclusive)
    pub z_threshold: f64,
    /// Multiple of the mean amount above which a transaction counts as an
    /// overspending period
    pub overspend_threshold: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            z_threshold: 2.0,
            overspend_threshold: 1.2,
        }
    }
}

/// Minimum sub-population size for Z-score detection
const MIN_SAMPLES: usize = 3;

/// Z-score outlier detector over one user's transaction set
pub struct AnomalyDetector {
    transactions: Vec<Transaction>,
    config: DetectorConfig,
}

impl AnomalyDetector {
    /// Build a detector over a freshly loaded transaction set for a user
    pub fn for_user(db: &Database, user_id: i64) -> Result<Self> {
        let transactions = db.list_transactions(user_id)?;
        Ok(Self::new(transactions))
    }

    /// Build a detector over an already-loaded transaction set
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Self::with_config(transactions, DetectorConfig::default())
    }

    pub fn with_config(transactions: Vec<Transaction>, config: DetectorConfig) -> Self {
        Self {
            transactions,
            config,
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Flag transactions whose amount is a population-wide outlier
    ///
    /// Computes population mean/std over all amounts and flags
    /// `|z| >= threshold`. Needs at least 3 transactions and nonzero
    /// spread; otherwise returns empty.
    pub fn detect_amount_anomalies(&self) -> Vec<AmountAnomaly> {
        let all: Vec<&Transaction> = self.transactions.iter().collect();
        Self::flag_outliers(&all, self.config.z_threshold)
            .into_iter()
            .map(|(tx, z, mean)| AmountAnomaly {
                transaction_id: tx.id,
                date: tx.date,
                category: tx.category.clone(),
                amount: tx.amount,
                z_score: z,
                deviation_pct: deviation_pct(tx.amount, mean),
                description: tx.description.clone(),
            })
            .collect()
    }

    /// Flag transactions that are outliers within their own category
    ///
    /// Same Z-score method, applied independently per category
    /// sub-population.
    pub fn detect_category_anomalies(&self) -> Vec<CategoryAnomaly> {
        let mut by_category: BTreeMap<&str, Vec<&Transaction>> = BTreeMap::new();
        for tx in &self.transactions {
            by_category.entry(tx.category.as_str()).or_default().push(tx);
        }

        let mut anomalies = Vec::new();
        for (category, txs) in by_category {
            for (tx, z, mean) in Self::flag_outliers(&txs, self.config.z_threshold) {
                debug!(category, transaction_id = tx.id, z, "Category anomaly");
                anomalies.push(CategoryAnomaly {
                    transaction_id: tx.id,
                    date: tx.date,
                    category: category.to_string(),
                    amount: tx.amount,
                    z_score: z,
                    category_average: mean,
                    deviation_pct: deviation_pct(tx.amount, mean),
                    description: tx.description.clone(),
                });
            }
        }

        anomalies
    }

    /// Flag days with an unusual number of transactions
    ///
    /// Z-score over per-day transaction counts (sample std); needs at
    /// least 3 distinct days.
    pub fn detect_frequency_anomalies(&self) -> Option<FrequencyAnalysis> {
        let mut daily_counts: BTreeMap<NaiveDate, usize> = BTreeMap::new();
        for tx in &self.transactions {
            *daily_counts.entry(tx.date).or_insert(0) += 1;
        }

        if daily_counts.len() < MIN_SAMPLES {
            return None;
        }

        let counts: Vec<f64> = daily_counts.values().map(|&c| c as f64).collect();
        let mean = stats::mean(&counts);
        let std = stats::sample_std_dev(&counts);

        if std == 0.0 {
            return None;
        }

        let anomalous_days = daily_counts
            .iter()
            .filter(|(_, &count)| ((count as f64 - mean) / std).abs() >= self.config.z_threshold)
            .map(|(&date, &count)| AnomalousDay {
                date,
                count,
                deviation_pct: deviation_pct(count as f64, mean),
            })
            .collect();

        Some(FrequencyAnalysis {
            average_daily_transactions: mean,
            anomalous_days,
        })
    }

    /// Transactions exceeding the overspend multiple of the mean amount
    pub fn detect_overspending_periods(&self) -> Vec<OverspendPeriod> {
        if self.transactions.is_empty() {
            return Vec::new();
        }

        let amounts: Vec<f64> = self.transactions.iter().map(|t| t.amount).collect();
        let threshold = stats::mean(&amounts) * self.config.overspend_threshold;

        self.transactions
            .iter()
            .filter(|tx| tx.amount > threshold)
            .map(|tx| OverspendPeriod {
                transaction_id: tx.id,
                date: tx.date,
                category: tx.category.clone(),
                amount: tx.amount,
                threshold,
                excess: tx.amount - threshold,
            })
            .collect()
    }

    /// Number of population-wide amount anomalies
    pub fn anomaly_count(&self) -> usize {
        self.detect_amount_anomalies().len()
    }

    /// Bundle all detections plus the overall anomaly rate
    pub fn summary(&self) -> AnomalySummary {
        let amount_anomalies = self.detect_amount_anomalies();
        let category_anomalies = self.detect_category_anomalies();
        let frequency_analysis = self.detect_frequency_anomalies();

        let anomaly_rate = if self.transactions.is_empty() {
            0.0
        } else {
            amount_anomalies.len() as f64 / self.transactions.len() as f64 * 100.0
        };

        AnomalySummary {
            total_amount_anomalies: amount_anomalies.len(),
            total_category_anomalies: category_anomalies.len(),
            amount_anomalies,
            category_anomalies,
            frequency_analysis,
            anomaly_rate,
        }
    }

    /// Z-score outliers over a transaction slice: (transaction, z, mean)
    ///
    /// The comparison is inclusive: a single spike over an otherwise flat
    /// history sits exactly at z = sqrt(n - 1) and should still be flagged.
    fn flag_outliers<'t>(
        transactions: &[&'t Transaction],
        z_threshold: f64,
    ) -> Vec<(&'t Transaction, f64, f64)> {
        if transactions.len() < MIN_SAMPLES {
            return Vec::new();
        }

        let amounts: Vec<f64> = transactions.iter().map(|t| t.amount).collect();
        let mean = stats::mean(&amounts);
        let std = stats::population_std_dev(&amounts);

        if std == 0.0 {
            return Vec::new();
        }

        transactions
            .iter()
            .filter_map(|&tx| {
                let z = ((tx.amount - mean) / std).abs();
                (z >= z_threshold).then_some((tx, z, mean))
            })
            .collect()
    }
}

/// Percent above (negative: below) a reference mean; 0 when the mean is 0
fn deviation_pct(value: f64, mean: f64) -> f64 {
    if mean == 0.0 {
        return 0.0;
    }
    (value - mean) / mean * 100.0
}
