use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Cached display metadata for an airline, keyed by IATA code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Airline {
    pub iata_code: String,
    pub icao_code: String,
    pub business_name: String,
    pub common_name: Option<String>,
}

/// Airline entry as the provider reports it; any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderAirline {
    pub iata_code: Option<String>,
    pub icao_code: Option<String>,
    pub business_name: Option<String>,
    pub common_name: Option<String>,
}

impl ProviderAirline {
    /// Only fully resolved records are worth caching.
    pub fn resolve(self) -> Option<Airline> {
        let iata_code = self.iata_code.filter(|c| !c.trim().is_empty())?;
        let icao_code = self.icao_code.filter(|c| !c.trim().is_empty())?;
        let business_name = self
            .business_name
            .filter(|n| !n.trim().is_empty() && !n.eq_ignore_ascii_case("UNDEFINED"))?;

        Some(Airline {
            iata_code: iata_code.trim().to_uppercase(),
            icao_code: icao_code.trim().to_uppercase(),
            business_name,
            common_name: self.common_name,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AirlineAdmission {
    Saved(Airline),
    AlreadyExists(Airline),
    NotFound,
}
