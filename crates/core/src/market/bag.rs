use crate::market::{BuildingData, BuildingRegistry};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.pdok.nl/bzk/locatieserver/search/v3_1";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Building lookups against the PDOK Locatieserver (public, no API key).
#[derive(Debug, Clone)]
pub struct PdokBagClient {
    http: reqwest::Client,
    base_url: String,
}

impl PdokBagClient {
    pub fn new() -> Result<Self> {
        let base_url =
            std::env::var("PDOK_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let timeout_secs = std::env::var("PDOK_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build PDOK http client")?;

        Ok(Self { http, base_url })
    }
}

#[async_trait::async_trait]
impl BuildingRegistry for PdokBagClient {
    async fn lookup_building(
        &self,
        address: &str,
        postal_code: &str,
    ) -> Result<Option<BuildingData>> {
        let url = format!("{}/free", self.base_url.trim_end_matches('/'));
        let query = format!("{address} {postal_code}");

        let res = self
            .http
            .get(url)
            .query(&[("q", query.as_str()), ("fq", "type:adres"), ("rows", "1")])
            .send()
            .await
            .context("PDOK request failed")?;

        let status = res.status();
        anyhow::ensure!(status.is_success(), "PDOK HTTP {status}");

        let body: SearchResponse = res
            .json()
            .await
            .context("failed to decode PDOK response")?;

        let Some(doc) = body.response.docs.into_iter().next() else {
            return Ok(None);
        };

        let (lon, lat) = doc
            .centroide_ll
            .as_deref()
            .and_then(parse_point)
            .map_or((None, None), |(lon, lat)| (Some(lon), Some(lat)));

        Ok(Some(BuildingData {
            bag_id: doc.nummeraanduiding_id,
            address: doc.weergavenaam,
            municipality: doc.gemeentenaam,
            province: doc.provincienaam,
            lat,
            lon,
            year_built: doc.bouwjaar,
            usage_purpose: doc.gebruiksdoel,
            floor_area: doc.oppervlakte,
        }))
    }
}

// Centroids come back as WKT, e.g. "POINT(5.12 52.09)".
fn parse_point(wkt: &str) -> Option<(f64, f64)> {
    let inner = wkt.strip_prefix("POINT(")?.strip_suffix(')')?;
    let mut parts = inner.split_whitespace();
    let lon = parts.next()?.parse::<f64>().ok()?;
    let lat = parts.next()?.parse::<f64>().ok()?;
    Some((lon, lat))
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    response: SearchDocs,
}

#[derive(Debug, Deserialize)]
struct SearchDocs {
    #[serde(default)]
    docs: Vec<AddressDoc>,
}

#[derive(Debug, Deserialize)]
struct AddressDoc {
    #[serde(default)]
    nummeraanduiding_id: Option<String>,
    #[serde(default)]
    weergavenaam: Option<String>,
    #[serde(default)]
    gemeentenaam: Option<String>,
    #[serde(default)]
    provincienaam: Option<String>,
    #[serde(default)]
    centroide_ll: Option<String>,
    #[serde(default)]
    bouwjaar: Option<i32>,
    #[serde(default)]
    gebruiksdoel: Option<Vec<String>>,
    #[serde(default)]
    oppervlakte: Option<f64>,
}
