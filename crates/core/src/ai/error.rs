use crate::ai::Provider;
use serde_json::Value;
use std::fmt;

/// Provider failure with enough context to debug a bad response offline.
#[derive(Debug, Clone)]
pub struct AiDiagnosticsError {
    pub provider: Provider,
    pub stage: &'static str,
    pub detail: String,
    pub raw_output: Option<String>,
    pub raw_response_json: Option<Value>,
}

impl fmt::Display for AiDiagnosticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AI gateway error (provider={:?}, stage={}): {}",
            self.provider, self.stage, self.detail
        )
    }
}

impl std::error::Error for AiDiagnosticsError {}
