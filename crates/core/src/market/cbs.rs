use crate::market::{AreaStatistics, AreaStatisticsProvider};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://odata4.cbs.nl/CBS";
// Existing-home purchase price dataset.
const HOUSING_DATASET: &str = "83913NED";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Housing statistics from the CBS StatLine OData API.
#[derive(Debug, Clone)]
pub struct CbsStatLineClient {
    http: reqwest::Client,
    base_url: String,
}

impl CbsStatLineClient {
    pub fn new() -> Result<Self> {
        let base_url =
            std::env::var("CBS_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let timeout_secs = std::env::var("CBS_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build CBS http client")?;

        Ok(Self { http, base_url })
    }
}

#[async_trait::async_trait]
impl AreaStatisticsProvider for CbsStatLineClient {
    async fn area_statistics(&self, municipality: &str) -> Result<Option<AreaStatistics>> {
        // OData string literals escape single quotes by doubling them
        // (e.g. 's-Hertogenbosch).
        let safe_municipality = municipality.replace('\'', "''");
        let filter = format!("contains(RegioS, '{safe_municipality}')");

        let url = format!(
            "{}/{HOUSING_DATASET}/Observations",
            self.base_url.trim_end_matches('/')
        );

        let res = self
            .http
            .get(url)
            .query(&[
                ("$filter", filter.as_str()),
                ("$top", "5"),
                ("$orderby", "Perioden desc"),
            ])
            .send()
            .await
            .context("CBS StatLine request failed")?;

        let status = res.status();
        anyhow::ensure!(status.is_success(), "CBS StatLine HTTP {status}");

        let body: ObservationsResponse = res
            .json()
            .await
            .context("failed to decode CBS StatLine response")?;

        let Some(latest) = body.value.into_iter().next() else {
            return Ok(None);
        };

        Ok(Some(AreaStatistics {
            municipality: municipality.to_string(),
            avg_purchase_price: latest.avg_purchase_price,
            num_transactions: latest.num_transactions,
            price_index: latest.price_index,
            period: latest.period,
        }))
    }
}

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    #[serde(default)]
    value: Vec<Observation>,
}

// Non-numeric values for a numeric column are treated as absent rather than
// failing the whole observation.
#[derive(Debug, Deserialize)]
struct Observation {
    #[serde(
        default,
        rename = "GemiddeldeVerkoopprijs_1",
        deserialize_with = "lenient_f64"
    )]
    avg_purchase_price: Option<f64>,
    #[serde(default, rename = "AantalVerkopen_2")]
    num_transactions: Option<i64>,
    #[serde(
        default,
        rename = "PrijsindexBestaandeKoopwoningen_3",
        deserialize_with = "lenient_f64"
    )]
    price_index: Option<f64>,
    #[serde(default, rename = "Perioden")]
    period: Option<String>,
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_f64())
}
