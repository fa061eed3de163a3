use crate::market::{EnergyLabelData, EnergyLabelRegistry};
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://public.ep-online.nl/api/v3";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Energy label lookups against the EP-Online public API. Without an API key
/// every lookup short-circuits to `None`.
#[derive(Debug, Clone)]
pub struct EpOnlineClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl EpOnlineClient {
    pub fn new(api_key: Option<String>) -> Result<Self> {
        let base_url =
            std::env::var("EP_ONLINE_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let timeout_secs = std::env::var("EP_ONLINE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build EP-Online http client")?;

        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }
}

#[async_trait::async_trait]
impl EnergyLabelRegistry for EpOnlineClient {
    async fn lookup_label(
        &self,
        postal_code: &str,
        house_number: &str,
    ) -> Result<Option<EnergyLabelData>> {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::info!("EP-Online API key not configured; skipping energy label lookup");
            return Ok(None);
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&format!("Bearer {api_key}"))?,
        );

        let url = format!(
            "{}/PandEnergielabel/Adres",
            self.base_url.trim_end_matches('/')
        );
        let postcode = postal_code.replace(' ', "");

        let res = self
            .http
            .get(url)
            .headers(headers)
            .query(&[("postcode", postcode.as_str()), ("huisnummer", house_number)])
            .send()
            .await
            .context("EP-Online request failed")?;

        let status = res.status();
        anyhow::ensure!(status.is_success(), "EP-Online HTTP {status}");

        // The endpoint returns either a single record or a list of records.
        let body: LabelResponse = res
            .json()
            .await
            .context("failed to decode EP-Online response")?;

        let record = match body {
            LabelResponse::Many(records) => records.into_iter().next(),
            LabelResponse::One(record) => Some(*record),
        };

        Ok(record.map(|r| EnergyLabelData {
            energy_label: r.label_letter,
            energy_index: r.energie_index,
            registration_date: r.opnamedatum,
            valid_until: r.geldig_tot,
        }))
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LabelResponse {
    Many(Vec<LabelRecord>),
    One(Box<LabelRecord>),
}

#[derive(Debug, Deserialize)]
struct LabelRecord {
    #[serde(default, rename = "labelLetter")]
    label_letter: Option<String>,
    #[serde(default, rename = "energieIndex")]
    energie_index: Option<f64>,
    #[serde(default)]
    opnamedatum: Option<String>,
    #[serde(default, rename = "geldigTot")]
    geldig_tot: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_list_response() {
        let v = serde_json::json!([{
            "labelLetter": "C",
            "energieIndex": 1.4,
            "opnamedatum": "2021-03-01",
            "geldigTot": "2031-03-01"
        }]);
        let parsed: LabelResponse = serde_json::from_value(v).unwrap();
        let LabelResponse::Many(records) = parsed else {
            panic!("expected list response");
        };
        assert_eq!(records[0].label_letter.as_deref(), Some("C"));
        assert_eq!(records[0].energie_index, Some(1.4));
    }

    #[test]
    fn decodes_a_single_record_response() {
        let v = serde_json::json!({"labelLetter": "G"});
        let parsed: LabelResponse = serde_json::from_value(v).unwrap();
        let LabelResponse::One(record) = parsed else {
            panic!("expected single-record response");
        };
        assert_eq!(record.label_letter.as_deref(), Some("G"));
        assert!(record.energie_index.is_none());
    }
}
