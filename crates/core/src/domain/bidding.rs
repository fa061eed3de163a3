use crate::domain::risk::RiskScore;
use crate::market::MarketData;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BiddingStrategy {
    Conservative,
    Competitive,
    Aggressive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiddingAdvice {
    pub strategy: BiddingStrategy,
    pub min_price: f64,
    pub max_price: f64,
    pub recommended_price: f64,
    pub explanation: String,
}

pub type AdviceSet = BTreeMap<BiddingStrategy, BiddingAdvice>;

/// Price recommendations for all three strategies, with the multiplier bands
/// shifted by the combined risk and market adjustment. The caller must guard
/// `asking_price > 0`.
pub fn generate_advice(
    asking_price: f64,
    risk_score: &RiskScore,
    market_data: Option<&MarketData>,
) -> AdviceSet {
    let base_adj = risk_adjustment(risk_score.overall_score) + market_adjustment(market_data);

    let mut advice = AdviceSet::new();
    advice.insert(
        BiddingStrategy::Conservative,
        banded(
            BiddingStrategy::Conservative,
            asking_price,
            (0.88, 0.95, 0.92),
            base_adj,
            conservative_explanation(risk_score),
        ),
    );
    advice.insert(
        BiddingStrategy::Competitive,
        banded(
            BiddingStrategy::Competitive,
            asking_price,
            (0.96, 1.04, 1.00),
            base_adj,
            competitive_explanation(risk_score),
        ),
    );
    advice.insert(
        BiddingStrategy::Aggressive,
        banded(
            BiddingStrategy::Aggressive,
            asking_price,
            (1.02, 1.13, 1.07),
            base_adj,
            aggressive_explanation(risk_score),
        ),
    );
    advice
}

/// Initial-estimate advice produced before market enrichment is available:
/// fixed bands, no risk or market adjustment. Superseded by
/// [`generate_advice`] once enrichment completes.
pub fn initial_advice(asking_price: f64) -> AdviceSet {
    let mut advice = AdviceSet::new();
    advice.insert(
        BiddingStrategy::Conservative,
        banded(
            BiddingStrategy::Conservative,
            asking_price,
            (0.90, 0.97, 0.93),
            0.0,
            "Conservative strategy: bid below asking price, suitable for properties with \
             significant risks or in a buyer's market."
                .to_string(),
        ),
    );
    advice.insert(
        BiddingStrategy::Competitive,
        banded(
            BiddingStrategy::Competitive,
            asking_price,
            (0.97, 1.05, 1.00),
            0.0,
            "Competitive strategy: bid around asking price. Balanced approach for average \
             market conditions."
                .to_string(),
        ),
    );
    advice.insert(
        BiddingStrategy::Aggressive,
        banded(
            BiddingStrategy::Aggressive,
            asking_price,
            (1.03, 1.15, 1.08),
            0.0,
            "Aggressive strategy: bid above asking price. Suitable for high-demand properties \
             or in a strong seller's market."
                .to_string(),
        ),
    );
    advice
}

fn banded(
    strategy: BiddingStrategy,
    asking_price: f64,
    (min_f, max_f, rec_f): (f64, f64, f64),
    adjustment: f64,
    explanation: String,
) -> BiddingAdvice {
    BiddingAdvice {
        strategy,
        min_price: (asking_price * (min_f + adjustment)).round(),
        max_price: (asking_price * (max_f + adjustment)).round(),
        recommended_price: (asking_price * (rec_f + adjustment)).round(),
        explanation,
    }
}

// Higher risk lowers every band uniformly.
fn risk_adjustment(overall_score: f64) -> f64 {
    if overall_score >= 75.0 {
        -0.05
    } else if overall_score >= 50.0 {
        -0.03
    } else if overall_score >= 25.0 {
        -0.01
    } else {
        0.0
    }
}

// A heated market (price index > 110) pushes bids up, a cooling one
// (index < 95) down. Missing or unparsable index leaves bands unchanged.
fn market_adjustment(market_data: Option<&MarketData>) -> f64 {
    let Some(index) = market_data
        .and_then(|m| m.area_statistics.as_ref())
        .and_then(|s| s.price_index)
    else {
        return 0.0;
    };

    if index > 110.0 {
        0.02
    } else if index < 95.0 {
        -0.02
    } else {
        0.0
    }
}

fn conservative_explanation(risk_score: &RiskScore) -> String {
    let mut parts = vec!["Conservative strategy: bid below asking price.".to_string()];
    if risk_score.overall_score >= 50.0 {
        parts.push(format!(
            "Risk score is {}/100 ({}), justifying a lower bid.",
            risk_score.overall_score,
            risk_score.risk_level()
        ));
    }
    parts.push(
        "This approach is suitable for properties with notable risks or in a buyer's market."
            .to_string(),
    );
    parts.join(" ")
}

fn competitive_explanation(risk_score: &RiskScore) -> String {
    let mut parts = vec![
        "Competitive strategy: bid around asking price.".to_string(),
        "Balanced approach for average market conditions.".to_string(),
    ];
    if risk_score.overall_score < 30.0 {
        parts.push("The low risk profile supports bidding at or near asking price.".to_string());
    }
    parts.join(" ")
}

fn aggressive_explanation(risk_score: &RiskScore) -> String {
    let mut parts = vec![
        "Aggressive strategy: bid above asking price.".to_string(),
        "Suitable for high-demand properties or when you want to maximize your chances."
            .to_string(),
    ];
    if risk_score.overall_score < 25.0 {
        parts.push(
            "The property's low risk score makes it a strong candidate for a premium bid."
                .to_string(),
        );
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::AreaStatistics;

    fn score_of(overall: f64) -> RiskScore {
        let mut score = RiskScore::compute(Vec::new());
        score.overall_score = overall;
        score
    }

    fn market_with_index(price_index: Option<f64>) -> MarketData {
        MarketData {
            area_statistics: Some(AreaStatistics {
                municipality: "Utrecht".to_string(),
                avg_purchase_price: None,
                num_transactions: None,
                price_index,
                period: None,
            }),
            ..MarketData::default()
        }
    }

    #[test]
    fn high_risk_shifts_conservative_band_down() {
        let advice = generate_advice(100_000.0, &score_of(80.0), None);
        let conservative = &advice[&BiddingStrategy::Conservative];
        // 0.88 - 0.05 and 0.95 - 0.05.
        assert_eq!(conservative.min_price, 83_000.0);
        assert_eq!(conservative.max_price, 90_000.0);
        assert_eq!(conservative.recommended_price, 87_000.0);
    }

    #[test]
    fn zero_risk_no_market_keeps_base_bands() {
        let advice = generate_advice(400_000.0, &score_of(0.0), None);
        assert_eq!(
            advice[&BiddingStrategy::Competitive].recommended_price,
            400_000.0
        );
        assert_eq!(advice[&BiddingStrategy::Aggressive].max_price, 452_000.0);
    }

    #[test]
    fn recommended_price_is_monotonic_in_risk() {
        let asking = 350_000.0;
        let scores = [0.0, 24.9, 25.0, 49.9, 50.0, 74.9, 75.0, 100.0];
        for strategy in [
            BiddingStrategy::Conservative,
            BiddingStrategy::Competitive,
            BiddingStrategy::Aggressive,
        ] {
            let mut last = f64::INFINITY;
            for overall in scores {
                let advice = generate_advice(asking, &score_of(overall), None);
                let recommended = advice[&strategy].recommended_price;
                assert!(
                    recommended <= last,
                    "recommended price rose from {last} to {recommended} at score {overall}"
                );
                last = recommended;
            }
        }
    }

    #[test]
    fn heated_market_raises_bids() {
        let base = generate_advice(200_000.0, &score_of(0.0), None);
        let heated = generate_advice(200_000.0, &score_of(0.0), Some(&market_with_index(Some(120.0))));
        assert_eq!(
            heated[&BiddingStrategy::Competitive].recommended_price,
            base[&BiddingStrategy::Competitive].recommended_price + 4_000.0
        );
    }

    #[test]
    fn cooling_market_lowers_bids() {
        let advice = generate_advice(200_000.0, &score_of(0.0), Some(&market_with_index(Some(90.0))));
        assert_eq!(
            advice[&BiddingStrategy::Competitive].recommended_price,
            196_000.0
        );
    }

    #[test]
    fn neutral_or_missing_index_leaves_bands_unchanged() {
        let base = generate_advice(200_000.0, &score_of(0.0), None);
        for market in [market_with_index(Some(100.0)), market_with_index(None), MarketData::default()] {
            let advice = generate_advice(200_000.0, &score_of(0.0), Some(&market));
            assert_eq!(
                advice[&BiddingStrategy::Aggressive].recommended_price,
                base[&BiddingStrategy::Aggressive].recommended_price
            );
        }
    }

    #[test]
    fn risk_and_market_adjustments_compose() {
        // Risk >= 75 (-0.05) plus heated market (+0.02) nets -0.03.
        let advice = generate_advice(100_000.0, &score_of(80.0), Some(&market_with_index(Some(115.0))));
        assert_eq!(advice[&BiddingStrategy::Conservative].min_price, 85_000.0);
    }

    #[test]
    fn explanations_mention_risk_only_past_their_thresholds() {
        let risky = generate_advice(100_000.0, &score_of(60.0), None);
        assert!(risky[&BiddingStrategy::Conservative]
            .explanation
            .contains("Risk score is 60/100"));
        assert!(!risky[&BiddingStrategy::Competitive]
            .explanation
            .contains("low risk profile"));
        assert!(!risky[&BiddingStrategy::Aggressive]
            .explanation
            .contains("premium bid"));

        let safe = generate_advice(100_000.0, &score_of(10.0), None);
        assert!(!safe[&BiddingStrategy::Conservative]
            .explanation
            .contains("Risk score"));
        assert!(safe[&BiddingStrategy::Competitive]
            .explanation
            .contains("low risk profile"));
        assert!(safe[&BiddingStrategy::Aggressive]
            .explanation
            .contains("premium bid"));
    }

    #[test]
    fn initial_advice_uses_the_fixed_bands() {
        let advice = initial_advice(100_000.0);
        assert_eq!(advice.len(), 3);
        let conservative = &advice[&BiddingStrategy::Conservative];
        assert_eq!(conservative.min_price, 90_000.0);
        assert_eq!(conservative.max_price, 97_000.0);
        assert_eq!(conservative.recommended_price, 93_000.0);
        let aggressive = &advice[&BiddingStrategy::Aggressive];
        assert_eq!(aggressive.max_price, 115_000.0);
        assert_eq!(aggressive.recommended_price, 108_000.0);
    }

    #[test]
    fn prices_round_to_whole_units() {
        let advice = generate_advice(333_333.0, &score_of(0.0), None);
        for item in advice.values() {
            assert_eq!(item.min_price.fract(), 0.0);
            assert_eq!(item.max_price.fract(), 0.0);
            assert_eq!(item.recommended_price.fract(), 0.0);
        }
    }
}
