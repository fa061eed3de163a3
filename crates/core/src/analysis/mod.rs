use crate::ai::{AiGateway, RiskCandidate};
use crate::domain::analysis::{AnalysisResult, AnalysisStatus};
use crate::domain::bidding;
use crate::domain::document::{DocumentType, SessionDocument};
use crate::domain::finding::Finding;
use crate::domain::risk::RiskScore;
use crate::domain::rules;
use crate::market::intelligence::MarketIntelligence;
use serde_json::Value;
use uuid::Uuid;

#[async_trait::async_trait]
pub trait DocumentSource: Send + Sync {
    async fn documents_for_session(
        &self,
        session_id: Uuid,
    ) -> anyhow::Result<Vec<SessionDocument>>;
}

/// Sequences one analysis run: document classification, AI extraction,
/// scoring, optional market enrichment with a second scoring pass, and
/// terminal-state stamping. Never returns an error; every failure is
/// captured in the returned result.
pub struct AnalysisPipeline {
    ai: Box<dyn AiGateway>,
    documents: Box<dyn DocumentSource>,
    market: Option<MarketIntelligence>,
}

impl AnalysisPipeline {
    pub fn new(
        ai: Box<dyn AiGateway>,
        documents: Box<dyn DocumentSource>,
        market: Option<MarketIntelligence>,
    ) -> Self {
        Self {
            ai,
            documents,
            market,
        }
    }

    pub async fn run(&self, session_id: Uuid) -> AnalysisResult {
        let mut analysis = AnalysisResult::new(session_id);
        analysis.status = AnalysisStatus::Extracting;

        let documents = match self.documents.documents_for_session(session_id).await {
            Ok(documents) => documents,
            Err(err) => {
                analysis.fail(format!("failed to load session documents: {err:#}"));
                return analysis;
            }
        };
        if documents.is_empty() {
            analysis.fail("No documents found for this session");
            return analysis;
        }

        let (combined_text, first_doc_type) = self.combine_documents(&documents).await;
        if combined_text.trim().is_empty() {
            analysis.fail("Could not extract text from any documents");
            return analysis;
        }
        let doc_type = first_doc_type.unwrap_or(DocumentType::Other);

        analysis.status = AnalysisStatus::Analyzing;
        let findings = match self.analyze(&mut analysis, &combined_text, doc_type).await {
            Ok(findings) => findings,
            Err(err) => {
                analysis.fail(format!("AI analysis failed: {err:#}"));
                return analysis;
            }
        };

        analysis.status = AnalysisStatus::Scoring;
        let asking_price = asking_price(analysis.property_data.as_ref());
        analysis.risk_score = Some(RiskScore::compute(findings.clone()));
        if let Some(price) = asking_price {
            analysis.bidding_advice = Some(bidding::initial_advice(price));
        }

        // Second pass: market enrichment refines the score and the advice.
        // Best-effort by construction; a failed lookup leaves its field
        // empty and the run still completes.
        if let Some(market) = &self.market {
            if let Some((address, postal_code)) = address_parts(analysis.property_data.as_ref()) {
                analysis.status = AnalysisStatus::Enriching;
                let market_data = market.enrich(&address, &postal_code).await;

                analysis.status = AnalysisStatus::Scoring;
                let mut all_findings = findings;
                all_findings.extend(rules::market_findings(&market_data));
                let rescored = RiskScore::compute(all_findings);

                if let Some(price) = asking_price {
                    analysis.bidding_advice =
                        Some(bidding::generate_advice(price, &rescored, Some(&market_data)));
                }
                analysis.risk_score = Some(rescored);
                analysis.market_position = Some(market_data);
            }
        }

        analysis.complete();
        analysis
    }

    /// Classify each document and concatenate the usable ones in document
    /// order. A document without text or with a failing classification is
    /// skipped, not fatal.
    async fn combine_documents(
        &self,
        documents: &[SessionDocument],
    ) -> (String, Option<DocumentType>) {
        let mut combined = String::new();
        let mut first_doc_type = None;

        for doc in documents {
            let Some(text) = doc.extracted_text.as_deref().filter(|t| !t.trim().is_empty())
            else {
                tracing::warn!(filename = %doc.filename, "document has no extractable text; skipping");
                continue;
            };

            let doc_type = match self.ai.classify_document(text).await {
                Ok(doc_type) => doc_type,
                Err(err) => {
                    tracing::warn!(
                        filename = %doc.filename,
                        error = %format!("{err:#}"),
                        "document classification failed; skipping"
                    );
                    continue;
                }
            };

            if first_doc_type.is_none() {
                first_doc_type = Some(doc_type);
            }
            combined.push_str(&format!("\n\n--- {} ({doc_type}) ---\n{text}", doc.filename));
        }

        (combined, first_doc_type)
    }

    async fn analyze(
        &self,
        analysis: &mut AnalysisResult,
        text: &str,
        doc_type: DocumentType,
    ) -> anyhow::Result<Vec<Finding>> {
        let property_data = self.ai.extract_property_data(text, doc_type).await?;

        let candidates = self.ai.detect_risks(text, doc_type).await?;
        let findings = findings_from_candidates(candidates);

        let sw = self
            .ai
            .identify_strengths_weaknesses(text, &property_data)
            .await?;
        analysis.strengths = sw.strengths;
        analysis.weaknesses = sw.weaknesses;
        analysis.property_data = Some(property_data);

        Ok(findings)
    }
}

/// Convert raw AI risk candidates into findings, dropping entries whose
/// category or severity is not a known enum value.
pub fn findings_from_candidates(candidates: Vec<RiskCandidate>) -> Vec<Finding> {
    candidates
        .into_iter()
        .filter_map(|candidate| {
            let parsed = candidate
                .category
                .parse()
                .and_then(|category| Ok((category, candidate.severity.parse()?)));
            match parsed {
                Ok((category, severity)) => Some(Finding {
                    category,
                    severity,
                    title: candidate.title,
                    description: candidate.description,
                    source: "ai_extraction".to_string(),
                }),
                Err(err) => {
                    tracing::warn!(
                        title = %candidate.title,
                        error = %err,
                        "dropping malformed risk candidate"
                    );
                    None
                }
            }
        })
        .collect()
}

fn asking_price(property_data: Option<&Value>) -> Option<f64> {
    let price = property_data?.get("asking_price")?.as_f64()?;
    (price > 0.0).then_some(price)
}

fn address_parts(property_data: Option<&Value>) -> Option<(String, String)> {
    let data = property_data?;
    let address = data.get("address")?.as_str()?.trim();
    let postal_code = data.get("postal_code")?.as_str()?.trim();
    if address.is_empty() || postal_code.is_empty() {
        return None;
    }
    Some((address.to_string(), postal_code.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{Provider, StrengthsWeaknesses};
    use crate::domain::bidding::BiddingStrategy;
    use crate::domain::finding::{RiskCategory, Severity};
    use crate::market::{
        AreaStatistics, AreaStatisticsProvider, BuildingData, BuildingRegistry, EnergyLabelData,
        EnergyLabelRegistry,
    };
    use serde_json::json;

    struct StubGateway {
        property_data: Value,
        risks: Vec<Value>,
        fail_classify: bool,
        fail_extract: bool,
    }

    impl Default for StubGateway {
        fn default() -> Self {
            Self {
                property_data: json!({
                    "address": "Domplein 29",
                    "postal_code": "3512 JE",
                    "asking_price": 400_000.0
                }),
                risks: vec![json!({
                    "category": "structural",
                    "severity": "high",
                    "title": "Foundation issues",
                    "description": "Pre-1970 wooden piles"
                })],
                fail_classify: false,
                fail_extract: false,
            }
        }
    }

    #[async_trait::async_trait]
    impl AiGateway for StubGateway {
        fn provider(&self) -> Provider {
            Provider::Anthropic
        }

        async fn classify_document(&self, _text: &str) -> anyhow::Result<DocumentType> {
            if self.fail_classify {
                anyhow::bail!("model overloaded");
            }
            Ok(DocumentType::PurchaseAgreement)
        }

        async fn extract_property_data(
            &self,
            _text: &str,
            _doc_type: DocumentType,
        ) -> anyhow::Result<Value> {
            if self.fail_extract {
                anyhow::bail!("rate limited");
            }
            Ok(self.property_data.clone())
        }

        async fn detect_risks(
            &self,
            _text: &str,
            _doc_type: DocumentType,
        ) -> anyhow::Result<Vec<RiskCandidate>> {
            Ok(self
                .risks
                .iter()
                .map(|r| serde_json::from_value(r.clone()).unwrap())
                .collect())
        }

        async fn identify_strengths_weaknesses(
            &self,
            _text: &str,
            _property_data: &Value,
        ) -> anyhow::Result<StrengthsWeaknesses> {
            Ok(StrengthsWeaknesses {
                strengths: vec!["Central location".to_string()],
                weaknesses: vec!["Old foundation".to_string()],
            })
        }
    }

    struct StubDocuments {
        documents: Vec<SessionDocument>,
    }

    #[async_trait::async_trait]
    impl DocumentSource for StubDocuments {
        async fn documents_for_session(
            &self,
            _session_id: Uuid,
        ) -> anyhow::Result<Vec<SessionDocument>> {
            Ok(self.documents.clone())
        }
    }

    fn doc(filename: &str, text: Option<&str>) -> SessionDocument {
        SessionDocument {
            id: Uuid::new_v4(),
            filename: filename.to_string(),
            extracted_text: text.map(str::to_string),
            document_type: None,
        }
    }

    struct StubBag;

    #[async_trait::async_trait]
    impl BuildingRegistry for StubBag {
        async fn lookup_building(
            &self,
            _address: &str,
            _postal_code: &str,
        ) -> anyhow::Result<Option<BuildingData>> {
            Ok(Some(BuildingData {
                bag_id: None,
                address: None,
                municipality: Some("Utrecht".to_string()),
                province: None,
                lat: None,
                lon: None,
                year_built: Some(1912),
                usage_purpose: None,
                floor_area: None,
            }))
        }
    }

    struct StubEnergy;

    #[async_trait::async_trait]
    impl EnergyLabelRegistry for StubEnergy {
        async fn lookup_label(
            &self,
            _postal_code: &str,
            _house_number: &str,
        ) -> anyhow::Result<Option<EnergyLabelData>> {
            Ok(Some(EnergyLabelData {
                energy_label: Some("G".to_string()),
                energy_index: None,
                registration_date: None,
                valid_until: None,
            }))
        }
    }

    struct StubStats;

    #[async_trait::async_trait]
    impl AreaStatisticsProvider for StubStats {
        async fn area_statistics(
            &self,
            municipality: &str,
        ) -> anyhow::Result<Option<AreaStatistics>> {
            Ok(Some(AreaStatistics {
                municipality: municipality.to_string(),
                avg_purchase_price: None,
                num_transactions: None,
                price_index: Some(120.0),
                period: None,
            }))
        }
    }

    fn market() -> MarketIntelligence {
        MarketIntelligence::new(Box::new(StubBag), Box::new(StubEnergy), Box::new(StubStats))
    }

    fn pipeline(
        gateway: StubGateway,
        documents: Vec<SessionDocument>,
        market: Option<MarketIntelligence>,
    ) -> AnalysisPipeline {
        AnalysisPipeline::new(
            Box::new(gateway),
            Box::new(StubDocuments { documents }),
            market,
        )
    }

    #[tokio::test]
    async fn zero_documents_fails_with_the_missing_input_message() {
        let p = pipeline(StubGateway::default(), Vec::new(), None);
        let result = p.run(Uuid::new_v4()).await;
        assert_eq!(result.status, AnalysisStatus::Failed);
        assert_eq!(
            result.error_message.as_deref(),
            Some("No documents found for this session")
        );
        assert!(result.completed_at.is_none());
    }

    #[tokio::test]
    async fn all_documents_without_text_fails() {
        let p = pipeline(
            StubGateway::default(),
            vec![doc("a.pdf", None), doc("b.pdf", Some("   "))],
            None,
        );
        let result = p.run(Uuid::new_v4()).await;
        assert_eq!(result.status, AnalysisStatus::Failed);
        assert_eq!(
            result.error_message.as_deref(),
            Some("Could not extract text from any documents")
        );
    }

    #[tokio::test]
    async fn all_classifications_failing_also_fails() {
        let gateway = StubGateway {
            fail_classify: true,
            ..StubGateway::default()
        };
        let p = pipeline(gateway, vec![doc("a.pdf", Some("koopakte"))], None);
        let result = p.run(Uuid::new_v4()).await;
        assert_eq!(result.status, AnalysisStatus::Failed);
    }

    #[tokio::test]
    async fn ai_phase_error_fails_with_the_underlying_message() {
        let gateway = StubGateway {
            fail_extract: true,
            ..StubGateway::default()
        };
        let p = pipeline(gateway, vec![doc("a.pdf", Some("koopakte"))], None);
        let result = p.run(Uuid::new_v4()).await;
        assert_eq!(result.status, AnalysisStatus::Failed);
        let message = result.error_message.unwrap();
        assert!(message.starts_with("AI analysis failed:"));
        assert!(message.contains("rate limited"));
    }

    #[tokio::test]
    async fn single_pass_without_market_completes_with_initial_advice() {
        let p = pipeline(
            StubGateway::default(),
            vec![doc("a.pdf", Some("koopakte")), doc("broken.pdf", None)],
            None,
        );
        let result = p.run(Uuid::new_v4()).await;

        assert_eq!(result.status, AnalysisStatus::Complete);
        assert!(result.completed_at.is_some());
        assert_eq!(result.strengths, vec!["Central location".to_string()]);

        let score = result.risk_score.as_ref().unwrap();
        // One structural/high finding: 30 * 0.30.
        assert_eq!(score.overall_score, 9.0);

        let advice = result.bidding_advice.as_ref().unwrap();
        assert_eq!(
            advice[&BiddingStrategy::Conservative].recommended_price,
            // Initial-estimate band: 0.93 of asking.
            372_000.0
        );
        assert!(result.market_position.is_none());
    }

    #[tokio::test]
    async fn second_pass_rescored_with_market_finding_and_adjusted_advice() {
        let p = pipeline(
            StubGateway::default(),
            vec![doc("a.pdf", Some("koopakte"))],
            Some(market()),
        );
        let result = p.run(Uuid::new_v4()).await;

        assert_eq!(result.status, AnalysisStatus::Complete);
        let score = result.risk_score.as_ref().unwrap();
        // structural/high (9.0) plus the label-G financial finding (15 * 0.25).
        assert_eq!(score.overall_score, 12.8);
        assert_eq!(score.findings.len(), 2);
        assert!(score
            .findings
            .iter()
            .any(|f| f.source == "ep_online" && f.category == RiskCategory::Financial
                && f.severity == Severity::Medium));

        let market_position = result.market_position.as_ref().unwrap();
        assert_eq!(
            market_position
                .area_statistics
                .as_ref()
                .and_then(|s| s.price_index),
            Some(120.0)
        );

        // Adjusted advice replaces the initial estimate: heated market
        // (+0.02), risk below 25 (no risk adjustment).
        let advice = result.bidding_advice.as_ref().unwrap();
        assert_eq!(
            advice[&BiddingStrategy::Competitive].recommended_price,
            408_000.0
        );
    }

    #[tokio::test]
    async fn missing_asking_price_yields_no_advice() {
        let gateway = StubGateway {
            property_data: json!({"address": "Domplein 29", "postal_code": "3512 JE"}),
            ..StubGateway::default()
        };
        let p = pipeline(gateway, vec![doc("a.pdf", Some("koopakte"))], Some(market()));
        let result = p.run(Uuid::new_v4()).await;
        assert_eq!(result.status, AnalysisStatus::Complete);
        assert!(result.bidding_advice.is_none());
        // Enrichment still ran.
        assert!(result.market_position.is_some());
    }

    #[tokio::test]
    async fn missing_address_skips_the_enrichment_pass() {
        let gateway = StubGateway {
            property_data: json!({"postal_code": "3512 JE", "asking_price": 300_000.0}),
            ..StubGateway::default()
        };
        let p = pipeline(gateway, vec![doc("a.pdf", Some("koopakte"))], Some(market()));
        let result = p.run(Uuid::new_v4()).await;
        assert_eq!(result.status, AnalysisStatus::Complete);
        assert!(result.market_position.is_none());
        // Advice stays in initial-estimate mode.
        let advice = result.bidding_advice.as_ref().unwrap();
        assert_eq!(
            advice[&BiddingStrategy::Competitive].recommended_price,
            300_000.0
        );
    }

    #[test]
    fn malformed_candidates_are_dropped_not_fatal() {
        let candidates: Vec<RiskCandidate> = vec![
            serde_json::from_value(json!({
                "category": "structural", "severity": "high",
                "title": "ok", "description": ""
            }))
            .unwrap(),
            serde_json::from_value(json!({
                "category": "environmental", "severity": "high",
                "title": "bad category", "description": ""
            }))
            .unwrap(),
            serde_json::from_value(json!({
                "category": "legal", "severity": "severe",
                "title": "bad severity", "description": ""
            }))
            .unwrap(),
        ];

        let findings = findings_from_candidates(candidates);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].title, "ok");
        assert_eq!(findings[0].source, "ai_extraction");
    }

    #[test]
    fn asking_price_guard_rejects_non_positive_values() {
        assert_eq!(asking_price(Some(&json!({"asking_price": 100.0}))), Some(100.0));
        assert_eq!(asking_price(Some(&json!({"asking_price": 0.0}))), None);
        assert_eq!(asking_price(Some(&json!({"asking_price": -5.0}))), None);
        assert_eq!(asking_price(Some(&json!({"asking_price": "high"}))), None);
        assert_eq!(asking_price(Some(&json!({}))), None);
        assert_eq!(asking_price(None), None);
    }

    #[test]
    fn address_parts_require_both_fields_non_empty() {
        assert_eq!(
            address_parts(Some(&json!({"address": "A 1", "postal_code": "1234 AB"}))),
            Some(("A 1".to_string(), "1234 AB".to_string()))
        );
        assert_eq!(address_parts(Some(&json!({"address": "A 1"}))), None);
        assert_eq!(
            address_parts(Some(&json!({"address": "", "postal_code": "1234 AB"}))),
            None
        );
        assert_eq!(address_parts(None), None);
    }
}
