use crate::domain::finding::{Finding, RiskCategory, Severity};
use crate::market::MarketData;

const EP_ONLINE_SOURCE: &str = "ep_online";

/// Deterministic rules turning market enrichment data into additional
/// findings for the aggregator. Each rule is independent and additive;
/// extend by appending more rules here.
pub fn market_findings(market_data: &MarketData) -> Vec<Finding> {
    let mut findings = Vec::new();

    if let Some(label) = market_data
        .energy_label_data
        .as_ref()
        .and_then(|e| e.energy_label.as_deref())
    {
        match label {
            "F" | "G" => findings.push(Finding {
                category: RiskCategory::Financial,
                severity: Severity::Medium,
                title: "Poor energy label".to_string(),
                description: format!(
                    "Energy label {label} indicates high energy costs and potential mandatory \
                     renovation requirements."
                ),
                source: EP_ONLINE_SOURCE.to_string(),
            }),
            "D" | "E" => findings.push(Finding {
                category: RiskCategory::Financial,
                severity: Severity::Low,
                title: "Below-average energy label".to_string(),
                description: format!(
                    "Energy label {label} means moderate energy costs. Consider insulation \
                     improvements."
                ),
                source: EP_ONLINE_SOURCE.to_string(),
            }),
            _ => {}
        }
    }

    findings
}
