use crate::domain::finding::{Finding, RiskCategory, RiskLevel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const CATEGORY_CAP: f64 = 100.0;

// Weights sum to 1.0 so the overall score stays on the 0..=100 scale.
const CATEGORY_WEIGHTS: [(RiskCategory, f64); 4] = [
    (RiskCategory::Structural, 0.30),
    (RiskCategory::Legal, 0.20),
    (RiskCategory::Financial, 0.25),
    (RiskCategory::Market, 0.25),
];

/// Aggregated risk for one scoring run. Only ever constructed by
/// [`RiskScore::compute`]; the risk level is derived from the overall score
/// on read rather than stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskScore {
    pub overall_score: f64,
    pub category_scores: BTreeMap<RiskCategory, f64>,
    pub findings: Vec<Finding>,
}

impl RiskScore {
    /// Fold findings into capped per-category scores and a weighted overall
    /// score. Pure and total: an empty input yields a zero score.
    pub fn compute(findings: Vec<Finding>) -> Self {
        let mut points: BTreeMap<RiskCategory, f64> =
            RiskCategory::ALL.iter().map(|c| (*c, 0.0)).collect();
        for finding in &findings {
            *points.entry(finding.category).or_insert(0.0) += finding.severity.points();
        }

        let category_scores: BTreeMap<RiskCategory, f64> = points
            .into_iter()
            .map(|(cat, pts)| (cat, pts.min(CATEGORY_CAP)))
            .collect();

        let overall: f64 = CATEGORY_WEIGHTS
            .iter()
            .map(|(cat, weight)| category_scores.get(cat).copied().unwrap_or(0.0) * weight)
            .sum();

        Self {
            overall_score: round1(overall),
            category_scores,
            findings,
        }
    }

    /// Tier thresholds are inclusive on the lower tier: exactly 25 is still
    /// low, exactly 50 moderate, exactly 75 high.
    pub fn risk_level(&self) -> RiskLevel {
        if self.overall_score <= 25.0 {
            RiskLevel::Low
        } else if self.overall_score <= 50.0 {
            RiskLevel::Moderate
        } else if self.overall_score <= 75.0 {
            RiskLevel::High
        } else {
            RiskLevel::Critical
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
