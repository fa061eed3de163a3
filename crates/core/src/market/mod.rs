pub mod bag;
pub mod cbs;
pub mod ep_online;
pub mod intelligence;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingData {
    pub bag_id: Option<String>,
    pub address: Option<String>,
    pub municipality: Option<String>,
    pub province: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub year_built: Option<i32>,
    pub usage_purpose: Option<Vec<String>>,
    pub floor_area: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergyLabelData {
    pub energy_label: Option<String>,
    pub energy_index: Option<f64>,
    pub registration_date: Option<String>,
    pub valid_until: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaStatistics {
    pub municipality: String,
    pub avg_purchase_price: Option<f64>,
    pub num_transactions: Option<i64>,
    pub price_index: Option<f64>,
    pub period: Option<String>,
}

/// Enrichment payload attached to an analysis. Every field is independently
/// optional; a failed lookup leaves its field at `None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketData {
    pub bag_data: Option<BuildingData>,
    pub energy_label_data: Option<EnergyLabelData>,
    pub area_statistics: Option<AreaStatistics>,
}

#[async_trait::async_trait]
pub trait BuildingRegistry: Send + Sync {
    async fn lookup_building(
        &self,
        address: &str,
        postal_code: &str,
    ) -> anyhow::Result<Option<BuildingData>>;
}

#[async_trait::async_trait]
pub trait EnergyLabelRegistry: Send + Sync {
    async fn lookup_label(
        &self,
        postal_code: &str,
        house_number: &str,
    ) -> anyhow::Result<Option<EnergyLabelData>>;
}

#[async_trait::async_trait]
pub trait AreaStatisticsProvider: Send + Sync {
    async fn area_statistics(&self, municipality: &str)
        -> anyhow::Result<Option<AreaStatistics>>;
}
