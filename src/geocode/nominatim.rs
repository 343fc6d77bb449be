//! HTTP client for a Nominatim-compatible `/search` endpoint.

use reqwest::{Client, Url};

use super::{GeocodeError, GeocodeService, Place};
use crate::config::GeocoderConfig;

/// Queries `GET {endpoint}?format=json&q=...&limit=N`.
#[derive(Debug, Clone)]
pub struct NominatimClient {
    client: Client,
    endpoint: Url,
}

impl NominatimClient {
    pub fn new(config: &GeocoderConfig) -> Result<Self, GeocodeError> {
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|e| GeocodeError::Endpoint(format!("{}: {e}", config.endpoint)))?;
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout())
            .build()?;
        tracing::debug!(endpoint = %endpoint, "geocoding client ready");
        Ok(Self { client, endpoint })
    }

    /// Full request URL for `query`.
    pub fn search_url(&self, query: &str, limit: usize) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("format", "json")
            .append_pair("q", query)
            .append_pair("addressdetails", "1")
            .append_pair("limit", &limit.max(1).to_string());
        url
    }
}

impl GeocodeService for NominatimClient {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Place>, GeocodeError> {
        let url = self.search_url(query, limit);
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status));
        }

        let places: Vec<Place> = response.json().await?;
        tracing::debug!(query = %query, results = places.len(), "geocoding response");
        Ok(places)
    }
}
