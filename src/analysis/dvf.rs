//! DVF client - official French transaction data as a `MarketData`
//! implementation.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::AnalysisError;
use crate::traits::market::MarketData;
use crate::types::market::ComparableTransaction;
use crate::types::record::PropertyType;

const DEFAULT_BASE_URL: &str = "https://api.cquest.org/dvf";

/// Client for the public DVF API.
///
/// Requests one district (postal code) at a time; window and property
/// filtering are finished client-side because the API's own filters are
/// coarse.
pub struct DvfClient {
    client: reqwest::Client,
    base_url: String,
}

impl Default for DvfClient {
    fn default() -> Self {
        Self::new()
    }
}

impl DvfClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different endpoint (tests, mirrors).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Response envelope of the DVF API.
#[derive(Debug, Deserialize)]
struct DvfResponse {
    #[serde(default)]
    resultats: Vec<DvfRow>,
}

/// One mutation row. The API is loose with numeric types, so amounts
/// come in as raw JSON values and are coerced below.
#[derive(Debug, Deserialize)]
struct DvfRow {
    #[serde(default)]
    date_mutation: Option<String>,
    #[serde(default)]
    nature_mutation: Option<String>,
    #[serde(default)]
    valeur_fonciere: Option<Value>,
    #[serde(default)]
    surface_relle_bati: Option<Value>,
    #[serde(default)]
    type_local: Option<String>,
    #[serde(default)]
    numero_voie: Option<String>,
    #[serde(default)]
    voie: Option<String>,
    #[serde(default)]
    code_postal: Option<String>,
}

impl DvfRow {
    fn into_transaction(self, district: &str) -> Option<ComparableTransaction> {
        // Only actual sales are comparables
        if let Some(nature) = &self.nature_mutation {
            if !nature.eq_ignore_ascii_case("vente") {
                return None;
            }
        }

        let sale_date =
            NaiveDate::parse_from_str(self.date_mutation.as_deref()?, "%Y-%m-%d").ok()?;
        let sale_price = coerce_f64(self.valeur_fonciere.as_ref())?;
        if sale_price <= 0.0 {
            return None;
        }

        let address = format!(
            "{} {}",
            self.numero_voie.unwrap_or_default(),
            self.voie.unwrap_or_default()
        )
        .trim()
        .to_string();

        Some(ComparableTransaction {
            address,
            district: self.code_postal.unwrap_or_else(|| district.to_string()),
            sale_price,
            surface: coerce_f64(self.surface_relle_bati.as_ref()).filter(|s| *s > 0.0),
            sale_date,
            property_type: self.type_local.as_deref().map(property_type_from_label),
        })
    }
}

/// Coerce an API value that may arrive as a number or a string.
fn coerce_f64(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.replace(',', ".").parse().ok(),
        _ => None,
    }
}

fn property_type_from_label(label: &str) -> PropertyType {
    let lower = label.to_lowercase();
    if lower.starts_with("appartement") {
        PropertyType::Apartment
    } else if lower.starts_with("maison") {
        PropertyType::House
    } else if lower.starts_with("local") {
        PropertyType::Commercial
    } else if lower.starts_with("dépendance") {
        PropertyType::Parking
    } else if lower.starts_with("terrain") {
        PropertyType::Land
    } else {
        PropertyType::Other
    }
}

#[async_trait]
impl MarketData for DvfClient {
    async fn comparables(
        &self,
        district: &str,
        _window_months: u32,
        property_type: Option<PropertyType>,
    ) -> Result<Vec<ComparableTransaction>, AnalysisError> {
        let mut request = self
            .client
            .get(&self.base_url)
            .query(&[("code_postal", district)]);
        if let Some(property_type) = property_type {
            request = request.query(&[("type_local", property_type.dvf_label())]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AnalysisError::MarketData(Box::new(e)))?
            .error_for_status()
            .map_err(|e| AnalysisError::MarketData(Box::new(e)))?;

        let body: DvfResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::MarketData(Box::new(e)))?;

        let transactions: Vec<ComparableTransaction> = body
            .resultats
            .into_iter()
            .filter_map(|row| row.into_transaction(district))
            .collect();

        debug!(district, count = transactions.len(), "DVF rows retrieved");
        Ok(transactions)
    }
}
