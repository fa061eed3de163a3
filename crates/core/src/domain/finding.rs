use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    Structural,
    Legal,
    Financial,
    Market,
}

impl RiskCategory {
    pub const ALL: [RiskCategory; 4] = [
        RiskCategory::Structural,
        RiskCategory::Legal,
        RiskCategory::Financial,
        RiskCategory::Market,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskCategory::Structural => "structural",
            RiskCategory::Legal => "legal",
            RiskCategory::Financial => "financial",
            RiskCategory::Market => "market",
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "structural" => Ok(RiskCategory::Structural),
            "legal" => Ok(RiskCategory::Legal),
            "financial" => Ok(RiskCategory::Financial),
            "market" => Ok(RiskCategory::Market),
            other => anyhow::bail!("unknown risk category: {other}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Points a single finding of this severity contributes to its category.
    pub fn points(&self) -> f64 {
        match self {
            Severity::Low => 5.0,
            Severity::Medium => 15.0,
            Severity::High => 30.0,
            Severity::Critical => 50.0,
        }
    }
}

impl FromStr for Severity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => anyhow::bail!("unknown severity: {other}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Moderate => "moderate",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single categorized risk observation. Findings are immutable once built
/// and accumulate per scoring run; equal findings are counted again, not
/// deduplicated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub category: RiskCategory,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    /// Provenance tag, e.g. "ai_extraction" or "ep_online".
    pub source: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_round_trips_through_str() {
        for cat in RiskCategory::ALL {
            assert_eq!(cat.as_str().parse::<RiskCategory>().unwrap(), cat);
        }
    }

    #[test]
    fn rejects_unknown_enum_values() {
        assert!("environmental".parse::<RiskCategory>().is_err());
        assert!("severe".parse::<Severity>().is_err());
    }

    #[test]
    fn serde_uses_snake_case_strings() {
        let v = serde_json::to_value(RiskCategory::Structural).unwrap();
        assert_eq!(v, serde_json::json!("structural"));
        let s: Severity = serde_json::from_value(serde_json::json!("critical")).unwrap();
        assert_eq!(s, Severity::Critical);
    }
}
