pub mod anthropic;
pub mod error;
pub mod gemini;
pub mod json;
pub mod prompts;

use crate::config::Settings;
use crate::domain::document::DocumentType;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    Gemini,
}

/// Raw risk candidate as returned by a provider. Category and severity stay
/// stringly typed here; malformed values are dropped during conversion to
/// domain findings rather than failing the batch.
#[derive(Debug, Clone, Deserialize)]
pub struct RiskCandidate {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StrengthsWeaknesses {
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
}

#[async_trait::async_trait]
pub trait AiGateway: Send + Sync {
    fn provider(&self) -> Provider;

    async fn classify_document(&self, text: &str) -> anyhow::Result<DocumentType>;

    async fn extract_property_data(
        &self,
        text: &str,
        doc_type: DocumentType,
    ) -> anyhow::Result<serde_json::Value>;

    async fn detect_risks(
        &self,
        text: &str,
        doc_type: DocumentType,
    ) -> anyhow::Result<Vec<RiskCandidate>>;

    async fn identify_strengths_weaknesses(
        &self,
        text: &str,
        property_data: &serde_json::Value,
    ) -> anyhow::Result<StrengthsWeaknesses>;
}

pub fn gateway_from_settings(settings: &Settings) -> anyhow::Result<Box<dyn AiGateway>> {
    match settings.ai_provider.as_deref().unwrap_or("anthropic") {
        "anthropic" => Ok(Box::new(anthropic::AnthropicGateway::from_settings(
            settings,
        )?)),
        "gemini" => Ok(Box::new(gemini::GeminiGateway::from_settings(settings)?)),
        other => anyhow::bail!("unknown AI_PROVIDER: {other}"),
    }
}

/// Clip prompt input to a character limit without splitting a code point.
pub(crate) fn clip(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_respects_char_boundaries() {
        assert_eq!(clip("abcdef", 3), "abc");
        assert_eq!(clip("ab", 10), "ab");
        // Multi-byte chars must not be split.
        assert_eq!(clip("ééé", 2), "éé");
    }

    #[test]
    fn risk_candidate_tolerates_missing_keys() {
        let c: RiskCandidate = serde_json::from_value(serde_json::json!({
            "category": "legal",
            "title": "Erfpacht"
        }))
        .unwrap();
        assert_eq!(c.category, "legal");
        assert_eq!(c.severity, "");
    }
}
