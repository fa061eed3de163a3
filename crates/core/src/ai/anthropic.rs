use crate::ai::error::AiDiagnosticsError;
use crate::ai::prompts::{self, ToolSpec};
use crate::ai::{clip, AiGateway, Provider, RiskCandidate, StrengthsWeaknesses};
use crate::config::Settings;
use crate::domain::document::DocumentType;
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

const CLASSIFY_MAX_TOKENS: u32 = 50;
const EXTRACT_MAX_TOKENS: u32 = 2000;
const RISKS_MAX_TOKENS: u32 = 3000;
const STRENGTHS_MAX_TOKENS: u32 = 2000;

#[derive(Debug, Clone)]
pub struct AnthropicGateway {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl AnthropicGateway {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_anthropic_api_key()?.to_string();
        let base_url =
            std::env::var("ANTHROPIC_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let timeout_secs = std::env::var("ANTHROPIC_TIMEOUT_SECS")
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

    async fn create_message(
        &self,
        req: CreateMessageRequest,
    ) -> anyhow::Result<CreateMessageResponse> {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_str(&self.api_key)?);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );

        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .headers(headers)
            .json(&req)
            .send()
            .await
            .context("Anthropic request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read Anthropic response body")?;
        if !status.is_success() {
            let raw_response_json = serde_json::from_str::<Value>(&text).ok();
            return Err(AiDiagnosticsError {
                provider: Provider::Anthropic,
                stage: "http",
                detail: format!("status={status}"),
                raw_output: Some(text),
                raw_response_json,
            }
            .into());
        }

        serde_json::from_str::<CreateMessageResponse>(&text)
            .with_context(|| format!("failed to decode Anthropic response: {text}"))
    }

    fn tool_request(&self, prompt: String, tool: &ToolSpec, max_tokens: u32) -> CreateMessageRequest {
        CreateMessageRequest {
            model: self.model.clone(),
            max_tokens,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            tools: Some(vec![Tool {
                name: tool.name,
                description: tool.description,
                input_schema: tool.input_schema.clone(),
            }]),
            tool_choice: Some(ToolChoice::Tool { name: tool.name }),
        }
    }

    /// Run a forced-tool request and return the tool input payload.
    async fn call_tool(
        &self,
        prompt: String,
        tool: &ToolSpec,
        max_tokens: u32,
    ) -> anyhow::Result<Value> {
        let res = self
            .create_message(self.tool_request(prompt, tool, max_tokens))
            .await?;
        match response_tool_input(&res, tool.name) {
            Some(input) => Ok(input),
            None => Err(AiDiagnosticsError {
                provider: Provider::Anthropic,
                stage: "tool_use",
                detail: format!("no {} tool_use block in response", tool.name),
                raw_output: Some(response_text(&res)),
                raw_response_json: None,
            }
            .into()),
        }
    }
}

fn response_text(res: &CreateMessageResponse) -> String {
    let mut out = String::new();
    for block in &res.content {
        if let ContentBlock::Text { text } = block {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(text);
        }
    }
    out
}

fn response_tool_input(res: &CreateMessageResponse, tool_name: &str) -> Option<Value> {
    for block in &res.content {
        if let ContentBlock::ToolUse { name, input, .. } = block {
            if name == tool_name {
                return Some(input.clone());
            }
        }
    }
    None
}

#[async_trait::async_trait]
impl AiGateway for AnthropicGateway {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    async fn classify_document(&self, text: &str) -> anyhow::Result<DocumentType> {
        let prompt = prompts::classify_prompt(clip(text, prompts::CLASSIFY_MAX_CHARS));
        let res = self
            .create_message(CreateMessageRequest {
                model: self.model.clone(),
                max_tokens: CLASSIFY_MAX_TOKENS,
                messages: vec![Message {
                    role: "user",
                    content: prompt,
                }],
                tools: None,
                tool_choice: None,
            })
            .await?;

        let label = response_text(&res).trim().to_lowercase();
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
        self.call_tool(prompt, &prompts::extract_property_data_tool(), EXTRACT_MAX_TOKENS)
            .await
    }

    async fn detect_risks(
        &self,
        text: &str,
        doc_type: DocumentType,
    ) -> anyhow::Result<Vec<RiskCandidate>> {
        let prompt =
            prompts::detect_risks_prompt(doc_type.as_str(), clip(text, prompts::RISKS_MAX_CHARS));
        let input = self
            .call_tool(prompt, &prompts::detect_risks_tool(), RISKS_MAX_TOKENS)
            .await?;

        let risks = input.get("risks").cloned().unwrap_or(Value::Array(Vec::new()));
        serde_json::from_value(risks).context("failed to decode detect_risks tool output")
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
        let input = self
            .call_tool(
                prompt,
                &prompts::strengths_weaknesses_tool(),
                STRENGTHS_MAX_TOKENS,
            )
            .await?;

        serde_json::from_value(input)
            .context("failed to decode identify_strengths_weaknesses tool output")
    }
}

#[derive(Debug, Clone, Serialize)]
struct CreateMessageRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,

    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct Tool {
    name: &'static str,
    description: &'static str,
    input_schema: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
enum ToolChoice {
    #[serde(rename = "tool")]
    Tool { name: &'static str },
}

#[derive(Debug, Clone, Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "tool_use")]
    ToolUse {
        #[serde(default)]
        id: String,
        #[serde(default)]
        name: String,
        #[serde(default)]
        input: Value,
    },

    #[serde(rename = "thinking")]
    Thinking {
        #[serde(default)]
        thinking: String,
        #[serde(default)]
        signature: String,
    },

    #[serde(rename = "redacted_thinking")]
    RedactedThinking {
        #[serde(default)]
        data: String,
    },

    #[serde(other)]
    Unknown,
}
