use crate::ai::error::AiDiagnosticsError;
use crate::ai::prompts::{self, ToolSpec};
use crate::ai::{clip, json, AiGateway, Provider, RiskCandidate, StrengthsWeaknesses};
use crate::config::Settings;
use crate::domain::document::DocumentType;
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

const CLASSIFY_MAX_TOKENS: u32 = 50;
const EXTRACT_MAX_TOKENS: u32 = 2000;
const RISKS_MAX_TOKENS: u32 = 3000;
const STRENGTHS_MAX_TOKENS: u32 = 2000;

#[derive(Debug, Clone)]
pub struct GeminiGateway {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiGateway {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_google_api_key()?.to_string();
        let base_url =
            std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let timeout_secs = std::env::var("GEMINI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            model,
        })
    }

    async fn generate_content(
        &self,
        req: GenerateContentRequest,
    ) -> anyhow::Result<GenerateContentResponse> {
        let mut headers = HeaderMap::new();
        headers.insert("x-goog-api-key", HeaderValue::from_str(&self.api_key)?);

        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );
        let res = self
            .http
            .post(url)
            .headers(headers)
            .json(&req)
            .send()
            .await
            .context("Gemini request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read Gemini response body")?;
        if !status.is_success() {
            let raw_response_json = serde_json::from_str::<Value>(&text).ok();
            return Err(AiDiagnosticsError {
                provider: Provider::Gemini,
                stage: "http",
                detail: format!("status={status}"),
                raw_output: Some(text),
                raw_response_json,
            }
            .into());
        }

        serde_json::from_str::<GenerateContentResponse>(&text)
            .with_context(|| format!("failed to decode Gemini response: {text}"))
    }

    fn tool_request(
        prompt: String,
        tool: &ToolSpec,
        max_output_tokens: u32,
    ) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content::user(prompt)],
            tools: Some(vec![GeminiTool {
                function_declarations: vec![FunctionDeclaration {
                    name: tool.name,
                    description: tool.description,
                    parameters: tool.input_schema.clone(),
                }],
            }]),
            tool_config: Some(ToolConfig {
                function_calling_config: FunctionCallingConfig {
                    mode: "ANY",
                    allowed_function_names: vec![tool.name],
                },
            }),
            generation_config: Some(GenerationConfig { max_output_tokens }),
        }
    }

    /// Run a forced-function request and return the call arguments; falls
    /// back to salvaging JSON from a plain-text part.
    async fn call_function(
        &self,
        prompt: String,
        tool: &ToolSpec,
        max_output_tokens: u32,
    ) -> anyhow::Result<Value> {
        let res = self
            .generate_content(Self::tool_request(prompt, tool, max_output_tokens))
            .await?;

        if let Some(args) = res.function_call_args(tool.name) {
            return Ok(args);
        }

        let text = res.text();
        if !text.trim().is_empty() {
            if let Ok(value) = json::parse_object(&text) {
                return Ok(value);
            }
        }

        Err(AiDiagnosticsError {
            provider: Provider::Gemini,
            stage: "function_call",
            detail: format!("no {} function call in response", tool.name),
            raw_output: Some(text),
            raw_response_json: None,
        }
        .into())
    }
}

#[async_trait::async_trait]
impl AiGateway for GeminiGateway {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    async fn classify_document(&self, text: &str) -> anyhow::Result<DocumentType> {
        let prompt = prompts::classify_prompt(clip(text, prompts::CLASSIFY_MAX_CHARS));
        let res = self
            .generate_content(GenerateContentRequest {
                contents: vec![Content::user(prompt)],
                tools: None,
                tool_config: None,
                generation_config: Some(GenerationConfig {
                    max_output_tokens: CLASSIFY_MAX_TOKENS,
                }),
            })
            .await?;

        let label = res.text().trim().to_lowercase();
        Ok(label.parse().unwrap_or(DocumentType::Other))
    }

    async fn extract_property_data(
        &self,
        text: &str,
        doc_type: DocumentType,
    ) -> anyhow::Result<Value> {
        let prompt = prompts::extract_property_data_prompt(
            doc_type.as_str(),
            clip(text, prompts::EXTRACT_MAX_CHARS),
        );
        self.call_function(
            prompt,
            &prompts::extract_property_data_tool(),
            EXTRACT_MAX_TOKENS,
        )
        .await
    }

    async fn detect_risks(
        &self,
        text: &str,
        doc_type: DocumentType,
    ) -> anyhow::Result<Vec<RiskCandidate>> {
        let prompt =
            prompts::detect_risks_prompt(doc_type.as_str(), clip(text, prompts::RISKS_MAX_CHARS));
        let args = self
            .call_function(prompt, &prompts::detect_risks_tool(), RISKS_MAX_TOKENS)
            .await?;

        let risks = args.get("risks").cloned().unwrap_or(Value::Array(Vec::new()));
        serde_json::from_value(risks).context("failed to decode detect_risks function output")
    }

    async fn identify_strengths_weaknesses(
        &self,
        text: &str,
        property_data: &Value,
    ) -> anyhow::Result<StrengthsWeaknesses> {
        let prompt = prompts::strengths_weaknesses_prompt(
            property_data,
            clip(text, prompts::STRENGTHS_MAX_CHARS),
        );
        let args = self
            .call_function(
                prompt,
                &prompts::strengths_weaknesses_tool(),
                STRENGTHS_MAX_TOKENS,
            )
            .await?;

        serde_json::from_value(args)
            .context("failed to decode identify_strengths_weaknesses function output")
    }
}

#[derive(Debug, Clone, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,

    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTool>>,
    #[serde(rename = "toolConfig", skip_serializing_if = "Option::is_none")]
    tool_config: Option<ToolConfig>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn user(text: String) -> Self {
        Self {
            role: Some("user".to_string()),
            parts: vec![Part {
                text: Some(text),
                function_call: None,
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(
        default,
        rename = "functionCall",
        skip_serializing_if = "Option::is_none"
    )]
    function_call: Option<FunctionCall>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Clone, Serialize)]
struct GeminiTool {
    #[serde(rename = "functionDeclarations")]
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Clone, Serialize)]
struct FunctionDeclaration {
    name: &'static str,
    description: &'static str,
    parameters: Value,
}

#[derive(Debug, Clone, Serialize)]
struct ToolConfig {
    #[serde(rename = "functionCallingConfig")]
    function_calling_config: FunctionCallingConfig,
}

#[derive(Debug, Clone, Serialize)]
struct FunctionCallingConfig {
    mode: &'static str,
    #[serde(rename = "allowedFunctionNames")]
    allowed_function_names: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
struct GenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

impl GenerateContentResponse {
    fn text(&self) -> String {
        let mut out = String::new();
        for candidate in &self.candidates {
            let Some(content) = &candidate.content else {
                continue;
            };
            for part in &content.parts {
                if let Some(text) = &part.text {
                    if !out.is_empty() {
                        out.push('\n');
                    }
                    out.push_str(text);
                }
            }
        }
        out
    }

    fn function_call_args(&self, name: &str) -> Option<Value> {
        for candidate in &self.candidates {
            let Some(content) = candidate.content.as_ref() else {
                continue;
            };
            for part in &content.parts {
                if let Some(call) = &part.function_call {
                    if call.name == name {
                        return Some(call.args.clone());
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pulls_args_from_function_call_parts() {
        let v = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{
                        "functionCall": {
                            "name": "detect_risks",
                            "args": {"risks": [{"category": "legal", "severity": "medium",
                                                "title": "Erfpacht", "description": "Ground lease"}]}
                        }
                    }]
                }
            }]
        });
        let res: GenerateContentResponse = serde_json::from_value(v).unwrap();
        let args = res.function_call_args("detect_risks").unwrap();
        assert_eq!(args["risks"][0]["category"], "legal");
        assert!(res.function_call_args("other_tool").is_none());
    }

    #[test]
    fn concatenates_text_parts() {
        let v = json!({
            "candidates": [{
                "content": {"parts": [{"text": "energy_label"}]}
            }]
        });
        let res: GenerateContentResponse = serde_json::from_value(v).unwrap();
        assert_eq!(res.text(), "energy_label");
    }

    #[test]
    fn tolerates_empty_candidates() {
        let res: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(res.text(), "");
        assert!(res.function_call_args("x").is_none());
    }
}
