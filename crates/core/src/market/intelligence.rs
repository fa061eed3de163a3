use crate::config::Settings;
use crate::market::{
    bag::PdokBagClient, cbs::CbsStatLineClient, ep_online::EpOnlineClient, AreaStatisticsProvider,
    BuildingRegistry, EnergyLabelRegistry, MarketData,
};
use anyhow::Result;

/// Best-effort enrichment over the external registries. Individual lookup
/// failures degrade to `None` for that field; `enrich` itself never fails.
pub struct MarketIntelligence {
    bag: Box<dyn BuildingRegistry>,
    energy: Box<dyn EnergyLabelRegistry>,
    stats: Box<dyn AreaStatisticsProvider>,
}

impl MarketIntelligence {
    pub fn new(
        bag: Box<dyn BuildingRegistry>,
        energy: Box<dyn EnergyLabelRegistry>,
        stats: Box<dyn AreaStatisticsProvider>,
    ) -> Self {
        Self { bag, energy, stats }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::new(
            Box::new(PdokBagClient::new()?),
            Box::new(EpOnlineClient::new(settings.ep_online_api_key.clone())?),
            Box::new(CbsStatLineClient::new()?),
        ))
    }

    pub async fn enrich(&self, address: &str, postal_code: &str) -> MarketData {
        let mut data = MarketData::default();

        if !address.is_empty() && !postal_code.is_empty() {
            data.bag_data = match self.bag.lookup_building(address, postal_code).await {
                Ok(found) => found,
                Err(err) => {
                    tracing::warn!(error = %format!("{err:#}"), "building registry lookup failed");
                    None
                }
            };
        }

        if !postal_code.is_empty() {
            if let Some(house_number) = first_digit_run(address) {
                data.energy_label_data =
                    match self.energy.lookup_label(postal_code, &house_number).await {
                        Ok(found) => found,
                        Err(err) => {
                            tracing::warn!(error = %format!("{err:#}"), "energy label lookup failed");
                            None
                        }
                    };
            }
        }

        // The statistics lookup needs the municipality resolved by the
        // building lookup above, so it cannot run ahead of it.
        let municipality = data
            .bag_data
            .as_ref()
            .and_then(|b| b.municipality.as_deref());
        if let Some(municipality) = municipality {
            data.area_statistics = match self.stats.area_statistics(municipality).await {
                Ok(found) => found,
                Err(err) => {
                    tracing::warn!(error = %format!("{err:#}"), "area statistics lookup failed");
                    None
                }
            };
        }

        data
    }
}

/// First run of digits in an address string, used as the house number for
/// energy label lookups.
pub fn first_digit_run(address: &str) -> Option<String> {
    let start = address.find(|c: char| c.is_ascii_digit())?;
    let digits: String = address[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    Some(digits)
}
