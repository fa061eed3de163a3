use crate::domain::bidding::AdviceSet;
use crate::domain::risk::RiskScore;
use crate::market::MarketData;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Pending,
    Extracting,
    Analyzing,
    Enriching,
    Scoring,
    Complete,
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Extracting => "extracting",
            AnalysisStatus::Analyzing => "analyzing",
            AnalysisStatus::Enriching => "enriching",
            AnalysisStatus::Scoring => "scoring",
            AnalysisStatus::Complete => "complete",
            AnalysisStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisStatus::Complete | AnalysisStatus::Failed)
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AnalysisStatus::Pending),
            "extracting" => Ok(AnalysisStatus::Extracting),
            "analyzing" => Ok(AnalysisStatus::Analyzing),
            "enriching" => Ok(AnalysisStatus::Enriching),
            "scoring" => Ok(AnalysisStatus::Scoring),
            "complete" => Ok(AnalysisStatus::Complete),
            "failed" => Ok(AnalysisStatus::Failed),
            other => anyhow::bail!("unknown analysis status: {other}"),
        }
    }
}

/// Aggregate root for one session's analysis run. Mutated in place as the
/// pipeline advances; treated as immutable once a terminal status is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub id: Uuid,
    pub session_id: Uuid,
    pub status: AnalysisStatus,
    pub property_data: Option<serde_json::Value>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub risk_score: Option<RiskScore>,
    pub market_position: Option<MarketData>,
    pub bidding_advice: Option<AdviceSet>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl AnalysisResult {
    pub fn new(session_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            status: AnalysisStatus::Pending,
            property_data: None,
            strengths: Vec::new(),
            weaknesses: Vec::new(),
            risk_score: None,
            market_position: None,
            bidding_advice: None,
            created_at: Utc::now(),
            completed_at: None,
            error_message: None,
        }
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = AnalysisStatus::Failed;
        self.error_message = Some(message.into());
    }

    pub fn complete(&mut self) {
        self.status = AnalysisStatus::Complete;
        self.completed_at = Some(Utc::now());
    }
}
