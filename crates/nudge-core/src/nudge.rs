//! Behavioral nudge generation
//!
//! Rule-based: nudge type selection, template personalization, and summary
//! insights are all derived from the analytics and health score engines.
//! Template rotation is keyed off the user's persisted nudge count so output
//! is deterministic for a given database state.

use chrono::Datelike;
use tracing::debug;

use crate::db::Database;
use crate::error::Result;
use crate::health::HealthScoreEngine;
use crate::models::{InsightItem, InsightSeverity, Nudge, NudgeRecord, NudgeTone, NudgeType};

const HIGH_DELIVERY_TEMPLATES: [&str; 3] = [
    "Your delivery spending is higher than usual. Consider cooking at home twice this week!",
    "Delivery orders make up {percent}% of your spending. Small changes can save big!",
    "Challenge: reduce delivery orders by 20% this month. You can do it!",
];

const IMPROVEMENT_TEMPLATES: [&str; 3] = [
    "Great job! Your financial health score improved by {points} points!",
    "You're on track! Keep up the good spending habits!",
    "Excellent progress! Your spending discipline is showing results!",
];

const WARNING_TEMPLATES: [&str; 3] = [
    "Overspending risk detected. Review your budget this week.",
    "Your spending volatility is high. Try to maintain consistency.",
    "Alert: you're {percent}% over your average spending this period.",
];

const DAILY_TIPS: [&str; 10] = [
    "Track every expense, no matter how small. Awareness is the first step to better finances.",
    "Set a specific savings goal for this month. You'll be more motivated to stick to your budget.",
    "Review your spending every Sunday. Weekly check-ins prevent monthly surprises.",
    "Meal prep on weekends to reduce impulse food delivery orders during the week.",
    "Use cash for discretionary spending. It creates a psychological barrier to overspending.",
    "The 50/30/20 rule: 50% needs, 30% wants, 20% savings. Balance is key!",
    "Wait 24 hours before making non-essential purchases. Impulse fades, savings grow.",
    "Find free or low-cost entertainment options. Your wallet will thank you!",
    "Unsubscribe from promotional emails. Out of sight, out of cart!",
    "Challenge yourself: one no-spend day per week. Make it a game!",
];

/// Behavioral nudge engine for one user
pub struct BehaviorEngine<'a> {
    db: &'a Database,
    user_id: i64,
    health: HealthScoreEngine<'a>,
}

impl<'a> BehaviorEngine<'a> {
    /// Build the engine over a fresh transaction load for the user
    pub fn new(db: &'a Database, user_id: i64) -> Result<Self> {
        let health = HealthScoreEngine::new(db, user_id)?;
        Ok(Self::from_parts(db, user_id, health))
    }

    /// Build the engine from a pre-constructed health score engine
    /// (lets tests pin the analytics reference date)
    pub fn from_parts(db: &'a Database, user_id: i64, health: HealthScoreEngine<'a>) -> Self {
        Self {
            db,
            user_id,
            health,
        }
    }

    /// Generate and persist a nudge; `None` auto-selects the type
    pub fn generate_nudge(&self, kind: Option<NudgeType>) -> Result<Nudge> {
        let nudge_type = match kind {
            Some(k) => k,
            None => self.determine_nudge_type()?,
        };

        let templates: &[&str] = match nudge_type {
            NudgeType::HighDelivery => &HIGH_DELIVERY_TEMPLATES,
            NudgeType::Improvement => &IMPROVEMENT_TEMPLATES,
            NudgeType::Warning => &WARNING_TEMPLATES,
        };

        // Rotate through the templates by how many nudges the user has seen
        let index = self.db.count_nudges(self.user_id)? as usize % templates.len();
        let text = self.personalize(templates[index]);
        let tone = Self::tone_for(nudge_type);

        self.db.insert_nudge(self.user_id, &text, tone)?;
        debug!(user_id = self.user_id, nudge_type = nudge_type.as_str(), "Nudge generated");

        Ok(Nudge {
            text,
            tone,
            nudge_type,
        })
    }

    /// Pick the most relevant nudge type from current behavior
    fn determine_nudge_type(&self) -> Result<NudgeType> {
        // Celebrate a meaningful score improvement first
        if let Some(delta) = self.health.previous_score()? {
            if delta.change > 5.0 {
                return Ok(NudgeType::Improvement);
            }
        }

        let delivery = self.health.analytics().delivery_metrics();
        if delivery.delivery_percentage > 25.0 {
            return Ok(NudgeType::HighDelivery);
        }

        let weekly = self.health.analytics().weekly_comparison();
        if weekly.change_percentage > 20.0 {
            return Ok(NudgeType::Warning);
        }

        Ok(NudgeType::Improvement)
    }

    /// Fill template placeholders from live metrics
    fn personalize(&self, template: &str) -> String {
        let delivery = self.health.analytics().delivery_metrics();
        let weekly = self.health.analytics().weekly_comparison();

        template
            .replace(
                "{percent}",
                &format!("{:.1}", delivery.delivery_percentage),
            )
            .replace(
                "{points}",
                &format!("{:.0}", weekly.change_percentage.abs()),
            )
    }

    fn tone_for(nudge_type: NudgeType) -> NudgeTone {
        match nudge_type {
            NudgeType::HighDelivery => NudgeTone::Warning,
            NudgeType::Improvement => NudgeTone::Encouraging,
            NudgeType::Warning => NudgeTone::Warning,
        }
    }

    /// Most recent nudges for the user, newest first
    pub fn recent_nudges(&self, limit: i64) -> Result<Vec<NudgeRecord>> {
        self.db.recent_nudges(self.user_id, limit)
    }

    /// A daily financial tip, rotating with the calendar
    pub fn daily_tip(&self) -> &'static str {
        let day = self.health.analytics().reference_date().ordinal() as usize;
        DAILY_TIPS[day % DAILY_TIPS.len()]
    }

    /// Behavioral insights across delivery share, weekly trend, and score
    pub fn summary_insights(&self) -> Result<Vec<InsightItem>> {
        let delivery = self.health.analytics().delivery_metrics();
        let weekly = self.health.analytics().weekly_comparison();
        let score = self.health.calculate_health_score();

        let mut insights = Vec::new();

        if delivery.delivery_percentage > 20.0 {
            insights.push(InsightItem {
                category: "Delivery Spending".to_string(),
                message: format!(
                    "Food delivery represents {:.1}% of your spending",
                    delivery.delivery_percentage
                ),
                action: "Consider cooking at home more often".to_string(),
                severity: if delivery.delivery_percentage > 30.0 {
                    InsightSeverity::High
                } else {
                    InsightSeverity::Medium
                },
            });
        }

        if weekly.change_percentage.abs() > 15.0 {
            let increased = weekly.change_percentage > 0.0;
            insights.push(InsightItem {
                category: "Spending Trend".to_string(),
                message: format!(
                    "Your spending {} by {:.1}% this week",
                    if increased { "increased" } else { "decreased" },
                    weekly.change_percentage.abs()
                ),
                action: if increased {
                    "Review your recent transactions".to_string()
                } else {
                    "Great job maintaining discipline!".to_string()
                },
                severity: if increased {
                    InsightSeverity::Medium
                } else {
                    InsightSeverity::Low
                },
            });
        }

        if score.final_score < 60.0 {
            insights.push(InsightItem {
                category: "Financial Health".to_string(),
                message: format!(
                    "Your health score is {:.1} - {}",
                    score.final_score, score.status
                ),
                action: "Focus on reducing variable expenses and increasing consistency"
                    .to_string(),
                severity: InsightSeverity::High,
            });
        }

        Ok(insights)
    }
}
