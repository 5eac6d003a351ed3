//! Trip-report video lookup for a flight

use crate::callsign::CallsignClient;
use crate::settings::{AdsbSettings, YoutubeSettings};
use crate::FlightError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// Fixed tail of every review query
pub const REVIEW_QUERY_SUFFIX: &str = "trip report review simply aviation economy";

/// Airline codes (and the odd route-database name) mapped to the name
/// reviewers put in their video titles
pub const AIRLINE_NAMES: &[(&str, &str)] = &[
    ("SATA International", "Azores"),
    ("AI", "Air India"),
    ("BA", "British Airways"),
    ("AF", "Air France"),
    ("KL", "KLM Royal Dutch Airlines"),
    ("LH", "Lufthansa"),
    ("SQ", "Singapore Airlines"),
    ("CX", "Cathay Pacific"),
    ("EK", "Emirates"),
    ("QR", "Qatar Airways"),
    ("VS", "Virgin Atlantic"),
    ("DL", "Delta Air Lines"),
    ("AA", "American Airlines"),
    ("UA", "United Airlines"),
    ("QF", "Qantas"),
    ("AC", "Air Canada"),
];

pub fn display_airline(airline: &str) -> String {
    AIRLINE_NAMES
        .iter()
        .find(|(key, _)| *key == airline)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| airline.to_string())
        .trim()
        .to_string()
}

/// Carrier part of a flight code: its first two characters
pub fn airline_fallback(flight_code: &str) -> String {
    flight_code.chars().take(2).collect()
}

pub fn build_review_query(airline: &str, service_class: Option<&str>) -> String {
    let mut parts = vec![airline];
    if let Some(class) = service_class {
        parts.push(class);
    }
    parts.push(REVIEW_QUERY_SUFFIX);
    parts.join(" ")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoResult {
    pub video_id: Option<String>,
    pub airline: String,
    pub service_class: Option<String>,
    pub query: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchResponse {
    items: Vec<SearchItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SearchItem {
    id: SearchItemId,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SearchItemId {
    video_id: Option<String>,
}

/// YouTube search plus ADSBdb airline lookup
pub struct VideoClient {
    http_client: Client,
    routes: CallsignClient,
    settings: YoutubeSettings,
}

impl VideoClient {
    pub fn new(adsb: AdsbSettings, settings: YoutubeSettings) -> Result<Self, FlightError> {
        Ok(Self {
            http_client: Client::builder().build()?,
            routes: CallsignClient::new(adsb)?,
            settings,
        })
    }

    /// Best review video for a flight. `airline` and `service_class` are
    /// optional; a blank airline is looked up from the flight code.
    #[instrument(level = "info", skip(self))]
    pub async fn find(
        &self,
        flight_code: &str,
        airline: Option<&str>,
        service_class: Option<&str>,
    ) -> Result<VideoResult, FlightError> {
        let flight_code = flight_code.trim();
        if flight_code.is_empty() {
            return Err(FlightError::MissingInput("flightCode".to_string()));
        }
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(FlightError::MissingCredential("youtube.api_key"))?;

        let service_class = service_class.map(str::trim).filter(|s| !s.is_empty());
        let airline = match airline.map(str::trim).filter(|s| !s.is_empty()) {
            Some(given) => given.to_string(),
            None => self.lookup_airline(flight_code).await,
        };
        let airline = display_airline(&airline);
        let query = build_review_query(&airline, service_class);

        let video_id = self.search(&query, api_key).await?;
        info!(query = %query, found = video_id.is_some(), "Review video search completed");

        Ok(VideoResult {
            video_id,
            airline,
            service_class: service_class.map(str::to_string),
            query,
        })
    }

    async fn lookup_airline(&self, flight_code: &str) -> String {
        match self.routes.route(flight_code).await {
            Some(route) => route
                .airline_name()
                .map(str::to_string)
                .unwrap_or_else(|| airline_fallback(flight_code)),
            None => {
                warn!(flight_code, "Airline lookup failed, using flight code prefix");
                airline_fallback(flight_code)
            }
        }
    }

    async fn search(&self, query: &str, api_key: &str) -> Result<Option<String>, FlightError> {
        let url = format!("{}/search", self.settings.api_url.trim_end_matches('/'));
        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("part", "snippet"),
                ("q", query),
                ("type", "video"),
                ("maxResults", "1"),
                ("key", api_key),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FlightError::Upstream { status: status.as_u16(), body });
        }

        let body: SearchResponse = response.json().await?;
        Ok(body.items.into_iter().next().and_then(|item| item.id.video_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_airline() {
        assert_eq!(display_airline("AC"), "Air Canada");
        assert_eq!(display_airline("SATA International"), "Azores");
        assert_eq!(display_airline("WS"), "WS");
        assert_eq!(display_airline("WestJet "), "WestJet");
    }

    #[test]
    fn test_airline_fallback() {
        assert_eq!(airline_fallback("WS425"), "WS");
        assert_eq!(airline_fallback("A"), "A");
    }

    #[test]
    fn test_build_review_query() {
        assert_eq!(
            build_review_query("Air Canada", Some("business class")),
            "Air Canada business class trip report review simply aviation economy"
        );
        assert_eq!(build_review_query("WS", None), "WS trip report review simply aviation economy");
    }

    #[test]
    fn test_search_response_takes_first_item() {
        let body: SearchResponse = serde_json::from_str(
            r#"{ "items": [ { "id": { "kind": "youtube#video", "videoId": "abc" } }, { "id": { "videoId": "def" } } ] }"#,
        )
        .unwrap();
        assert_eq!(body.items.into_iter().next().and_then(|i| i.id.video_id).as_deref(), Some("abc"));

        let empty: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.items.is_empty());
    }

    fn client(api_key: Option<&str>) -> VideoClient {
        VideoClient::new(
            AdsbSettings {
                adsbdb_url: "http://127.0.0.1:9/v0".to_string(),
                opensky_url: "http://127.0.0.1:9/api".to_string(),
                user_agent: "flight-scout-test".to_string(),
            },
            YoutubeSettings {
                api_url: "http://127.0.0.1:9/youtube/v3".to_string(),
                api_key: api_key.map(str::to_string),
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_input_checks() {
        let err = client(Some("key")).find(" ", None, None).await.unwrap_err();
        assert!(matches!(err, FlightError::MissingInput(_)));

        let err = client(None).find("AC856", None, None).await.unwrap_err();
        assert!(matches!(err, FlightError::MissingCredential(_)));
    }

    #[tokio::test]
    async fn test_airline_lookup_falls_back_to_prefix() {
        assert_eq!(client(Some("key")).lookup_airline("QF1").await, "QF");
    }
}
