//! HTTP client for the Amadeus flight-shopping API

use crate::offer::normalize_offers;
use crate::settings::AmadeusSettings;
use crate::{Flight, FlightError, SearchRequest};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

const LOCATION_PAGE_LIMIT: &str = "15";

/// Airport or city suggestion for the search box
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub name: String,
    pub iata_code: String,
    pub city_name: String,
    pub country_name: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LocationsResponse {
    data: Option<Vec<RawLocation>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawLocation {
    name: Option<String>,
    iata_code: Option<String>,
    address: Option<RawAddress>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawAddress {
    city_code: Option<String>,
    city_name: Option<String>,
    country_name: Option<String>,
}

impl From<RawLocation> for Location {
    fn from(raw: RawLocation) -> Self {
        let address = raw.address.unwrap_or_default();
        let non_empty = |s: Option<String>| s.filter(|v| !v.is_empty());

        Self {
            name: raw.name.unwrap_or_default(),
            iata_code: non_empty(raw.iata_code)
                .or_else(|| non_empty(address.city_code))
                .unwrap_or_default(),
            city_name: address.city_name.unwrap_or_default(),
            country_name: address.country_name.unwrap_or_default(),
        }
    }
}

/// Drop repeated codes. A repeated code keeps the slot of its first
/// occurrence but takes the data of its last one.
pub fn dedupe_locations(locations: Vec<Location>) -> Vec<Location> {
    let mut unique: Vec<Location> = Vec::with_capacity(locations.len());
    for location in locations {
        match unique.iter_mut().find(|l| l.iata_code == location.iata_code) {
            Some(existing) => *existing = location,
            None => unique.push(location),
        }
    }
    unique
}

/// Client for the shopping and reference-data endpoints
pub struct AmadeusClient {
    http_client: Client,
    settings: AmadeusSettings,
}

impl AmadeusClient {
    pub fn new(settings: AmadeusSettings) -> Result<Self, FlightError> {
        debug!(base_url = %settings.base_url, "Creating Amadeus client");
        let http_client = Client::builder().build()?;
        Ok(Self { http_client, settings })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    /// Exchange the configured client credentials for a bearer token.
    #[instrument(level = "debug", skip(self))]
    pub async fn access_token(&self) -> Result<String, FlightError> {
        let client_id = self
            .settings
            .client_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(FlightError::MissingCredential("amadeus.client_id"))?;
        let client_secret = self
            .settings
            .client_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(FlightError::MissingCredential("amadeus.client_secret"))?;

        let response = self
            .http_client
            .post(self.url("/v1/security/oauth2/token"))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id),
                ("client_secret", client_secret),
            ])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            error!(status = %status, "Token request rejected");
            return Err(FlightError::AuthError(text));
        }

        let token: TokenResponse = serde_json::from_str(&text)?;
        token
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| FlightError::AuthError("token response has no access_token".to_string()))
    }

    /// Search flight offers and normalize them. Upstream order is kept.
    #[instrument(level = "info", skip(self, request), fields(origin = %request.origin, destination = %request.destination))]
    pub async fn search_offers(&self, request: &SearchRequest) -> Result<Vec<Flight>, FlightError> {
        request.validate()?;

        let token = self.access_token().await?;
        debug!("Access token obtained");

        let query = request.query_pairs(self.settings.max_results);
        info!(params = query.len(), "Requesting flight offers");

        let start_time = std::time::Instant::now();
        let response = self
            .http_client
            .get(self.url("/v2/shopping/flight-offers"))
            .query(&query)
            .bearer_auth(token)
            .send()
            .await?;
        let status = response.status();

        info!(
            status = %status,
            duration_ms = start_time.elapsed().as_millis(),
            "HTTP request completed"
        );

        let body = response.text().await?;
        if !status.is_success() {
            error!(status = %status, "Flight offers request failed");
            return Err(FlightError::Upstream { status: status.as_u16(), body });
        }

        let start_parse = std::time::Instant::now();
        let result = normalize_offers(&body);
        match &result {
            Ok(flights) => info!(
                parse_duration_ms = start_parse.elapsed().as_millis(),
                flights_found = flights.len(),
                "Offer normalization completed"
            ),
            Err(e) => error!(error = %e, "Offer normalization failed"),
        }

        result
    }

    /// Airports and cities matching `keyword`, deduplicated by code.
    #[instrument(level = "info", skip(self))]
    pub async fn search_locations(&self, keyword: &str) -> Result<Vec<Location>, FlightError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(FlightError::MissingInput("query".to_string()));
        }

        let token = self.access_token().await?;
        let response = self
            .http_client
            .get(self.url("/v1/reference-data/locations"))
            .query(&[
                ("subType", "AIRPORT,CITY"),
                ("keyword", keyword),
                ("page[limit]", LOCATION_PAGE_LIMIT),
            ])
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "Location search failed");
            return Err(FlightError::Upstream { status: status.as_u16(), body });
        }

        let payload: LocationsResponse = response.json().await?;
        let locations: Vec<Location> = payload.data.unwrap_or_default().into_iter().map(Location::from).collect();

        let unique = dedupe_locations(locations);
        debug!(locations = unique.len(), "Location search completed");
        Ok(unique)
    }
}
