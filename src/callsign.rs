//! Live route and airframe lookup by callsign
//!
//! Route comes from ADSBdb. When the route names no airframe, the OpenSky
//! state-vector snapshot is searched for the callsign to find its ICAO24
//! address. Every step is best-effort: a failed call leaves its part of
//! the result empty.

use crate::settings::AdsbSettings;
use crate::FlightError;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

pub const PLACEHOLDER_PHOTO: &str = "https://via.placeholder.com/300x200?text=No+Image";
pub const PLACEHOLDER_THUMBNAIL: &str = "https://via.placeholder.com/150x100?text=No+Image";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteAirline {
    pub name: Option<String>,
    pub icao: Option<String>,
    pub iata: Option<String>,
    pub country: Option<String>,
    pub callsign: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteAirport {
    pub iata_code: Option<String>,
    pub icao_code: Option<String>,
    pub name: Option<String>,
    pub municipality: Option<String>,
    pub country_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Airframe hint some routes carry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteAircraft {
    pub registration: Option<String>,
    pub icao24: Option<String>,
    pub mode_s: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightRoute {
    pub callsign: Option<String>,
    pub callsign_icao: Option<String>,
    pub callsign_iata: Option<String>,
    pub airline: Option<RouteAirline>,
    pub origin: Option<RouteAirport>,
    pub destination: Option<RouteAirport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aircraft: Option<RouteAircraft>,
}

impl FlightRoute {
    fn airframe(&self) -> Option<&RouteAircraft> {
        self.aircraft.as_ref()
    }

    pub fn registration(&self) -> Option<&str> {
        self.airframe()
            .and_then(|a| a.registration.as_deref())
            .filter(|s| !s.is_empty())
    }

    /// ICAO24 address, falling back to the Mode S code
    pub fn icao24(&self) -> Option<&str> {
        let airframe = self.airframe()?;
        airframe
            .icao24
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| airframe.mode_s.as_deref().filter(|s| !s.is_empty()))
    }

    pub fn airline_name(&self) -> Option<&str> {
        self.airline
            .as_ref()
            .and_then(|a| a.name.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AircraftInfo {
    #[serde(rename = "type")]
    pub aircraft_type: Option<String>,
    pub icao_type: Option<String>,
    pub manufacturer: Option<String>,
    pub mode_s: Option<String>,
    pub registration: Option<String>,
    pub registered_owner: Option<String>,
    pub registered_owner_country_name: Option<String>,
    pub registered_owner_operator_flag_code: Option<String>,
    pub url_photo: Option<String>,
    pub url_photo_thumbnail: Option<String>,
}

impl AircraftInfo {
    fn with_placeholders(mut self) -> Self {
        if self.url_photo.as_deref().map_or(true, str::is_empty) {
            self.url_photo = Some(PLACEHOLDER_PHOTO.to_string());
        }
        if self.url_photo_thumbnail.as_deref().map_or(true, str::is_empty) {
            self.url_photo_thumbnail = Some(PLACEHOLDER_THUMBNAIL.to_string());
        }
        self
    }
}

/// What is known about a callsign right now
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallsignInfo {
    pub ok: bool,
    pub flight_route: Option<FlightRoute>,
    pub aircraft: Option<AircraftInfo>,
}

#[derive(Debug, Deserialize)]
struct AdsbEnvelope<T> {
    response: Option<T>,
}

#[derive(Debug, Deserialize)]
struct RouteBody {
    flightroute: Option<FlightRoute>,
}

#[derive(Debug, Deserialize)]
struct AircraftBody {
    aircraft: Option<AircraftInfo>,
}

#[derive(Debug, Deserialize)]
struct StatesSnapshot {
    states: Option<Vec<Value>>,
}

/// ICAO24 of the first state vector whose trimmed callsign is exactly
/// `callsign`. State vectors are arrays: `[icao24, callsign, ...]`.
pub fn find_icao24(states: &[Value], callsign: &str) -> Option<String> {
    states.iter().find_map(|state| {
        let fields = state.as_array()?;
        let cs = fields.get(1)?.as_str()?.trim();
        if cs != callsign {
            return None;
        }
        fields.first()?.as_str().filter(|id| !id.is_empty()).map(str::to_string)
    })
}

/// `base` with `segments` appended, each percent-encoded as one path segment
pub fn endpoint(base: &str, segments: &[&str]) -> Option<Url> {
    let mut url = match Url::parse(base) {
        Ok(url) => url,
        Err(e) => {
            warn!(base, error = %e, "Lookup base URL is invalid");
            return None;
        }
    };
    url.path_segments_mut().ok()?.pop_if_empty().extend(segments);
    Some(url)
}

/// ADSBdb + OpenSky client
pub struct CallsignClient {
    http_client: Client,
    settings: AdsbSettings,
}

impl CallsignClient {
    pub fn new(settings: AdsbSettings) -> Result<Self, FlightError> {
        let http_client = Client::builder().user_agent(settings.user_agent.clone()).build()?;
        Ok(Self { http_client, settings })
    }

    /// Upper-case and trim; the form every lookup uses
    pub fn normalize(callsign: &str) -> String {
        callsign.trim().to_uppercase()
    }

    #[instrument(level = "info", skip(self))]
    pub async fn resolve(&self, callsign: &str) -> Result<CallsignInfo, FlightError> {
        let callsign = Self::normalize(callsign);
        if callsign.is_empty() {
            return Err(FlightError::MissingInput("callsign".to_string()));
        }

        let flight_route = self.route(&callsign).await;

        let registration = flight_route.as_ref().and_then(|r| r.registration()).map(str::to_string);
        let mut icao24 = flight_route.as_ref().and_then(|r| r.icao24()).map(str::to_string);

        if registration.is_none() && icao24.is_none() {
            icao24 = self.live_icao24(&callsign).await;
        }

        let aircraft = match registration.or(icao24) {
            Some(id) => self.aircraft(&id.to_uppercase(), &callsign).await,
            None => None,
        };

        info!(
            route_found = flight_route.is_some(),
            aircraft_found = aircraft.is_some(),
            "Callsign resolved"
        );

        Ok(CallsignInfo {
            ok: true,
            flight_route,
            aircraft,
        })
    }

    /// Route for a callsign from ADSBdb
    pub async fn route(&self, callsign: &str) -> Option<FlightRoute> {
        let url = endpoint(&self.settings.adsbdb_url, &["callsign", callsign])?;
        let body: AdsbEnvelope<RouteBody> = self.get_json(url, &[]).await?;
        body.response.and_then(|r| r.flightroute)
    }

    async fn live_icao24(&self, callsign: &str) -> Option<String> {
        let url = endpoint(&self.settings.opensky_url, &["states", "all"])?;
        let snapshot: StatesSnapshot = self.get_json(url, &[("callsign", callsign)]).await?;
        let found = find_icao24(&snapshot.states.unwrap_or_default(), callsign);
        debug!(found = ?found, "Searched live state vectors");
        found
    }

    async fn aircraft(&self, id: &str, callsign: &str) -> Option<AircraftInfo> {
        let url = endpoint(&self.settings.adsbdb_url, &["aircraft", id])?;
        let body: AdsbEnvelope<AircraftBody> = self.get_json(url, &[("callsign", callsign)]).await?;
        body.response
            .and_then(|r| r.aircraft)
            .map(AircraftInfo::with_placeholders)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url, query: &[(&str, &str)]) -> Option<T> {
        let path = url.path().to_string();
        let response = match self.http_client.get(url).query(query).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(path = %path, error = %e, "Lookup request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            debug!(path = %path, status = %response.status(), "Lookup returned no data");
            return None;
        }

        match response.json::<T>().await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!(path = %path, error = %e, "Lookup response could not be decoded");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_find_icao24_exact_trimmed_match() {
        let states = vec![
            json!(["abc123", "ACA8560 ", 1]),
            json!(["c0ffee", "ACA856  ", 1]),
            json!("not a state"),
        ];
        assert_eq!(find_icao24(&states, "ACA856").as_deref(), Some("c0ffee"));
        assert_eq!(find_icao24(&states, "ACA85"), None);
        assert_eq!(find_icao24(&[], "ACA856"), None);
    }

    #[test]
    fn test_route_airframe_ids() {
        let route: FlightRoute = serde_json::from_value(json!({
            "callsign": "ACA856",
            "airline": { "name": " Air Canada ", "icao": "ACA" },
            "aircraft": { "mode_s": "C05F1A" }
        }))
        .unwrap();

        assert_eq!(route.registration(), None);
        assert_eq!(route.icao24(), Some("C05F1A"));
        assert_eq!(route.airline_name(), Some("Air Canada"));

        let bare: FlightRoute = serde_json::from_value(json!({ "callsign": "X" })).unwrap();
        assert_eq!(bare.icao24(), None);
        assert_eq!(bare.airline_name(), None);
    }

    #[test]
    fn test_aircraft_placeholders() {
        let aircraft: AircraftInfo = serde_json::from_value(json!({
            "type": "777-333ER",
            "registration": "C-FITW",
            "url_photo": ""
        }))
        .unwrap();
        let aircraft = aircraft.with_placeholders();

        assert_eq!(aircraft.aircraft_type.as_deref(), Some("777-333ER"));
        assert_eq!(aircraft.url_photo.as_deref(), Some(PLACEHOLDER_PHOTO));
        assert_eq!(aircraft.url_photo_thumbnail.as_deref(), Some(PLACEHOLDER_THUMBNAIL));

        let json = serde_json::to_value(&aircraft).unwrap();
        assert_eq!(json["type"], "777-333ER");
    }

    #[test]
    fn test_endpoint_encodes_each_segment() {
        let url = endpoint("http://127.0.0.1:9/v0/", &["callsign", "AC/1"]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9/v0/callsign/AC%2F1");
        assert_eq!(url.query(), None);

        let url = endpoint("https://api.adsbdb.com/v0", &["aircraft", "AC?1#X"]).unwrap();
        assert_eq!(url.as_str(), "https://api.adsbdb.com/v0/aircraft/AC%3F1%23X");
        assert_eq!(url.fragment(), None);

        assert!(endpoint("not a url", &["callsign", "ACA856"]).is_none());
    }

    #[test]
    fn test_normalize_callsign() {
        assert_eq!(CallsignClient::normalize("  aca856 "), "ACA856");
    }

    #[tokio::test]
    async fn test_resolve_degrades_to_empty_result() {
        let client = CallsignClient::new(AdsbSettings {
            adsbdb_url: "http://127.0.0.1:9/v0".to_string(),
            opensky_url: "http://127.0.0.1:9/api".to_string(),
            user_agent: "flight-scout-test".to_string(),
        })
        .unwrap();

        let info = client.resolve("aca856").await.unwrap();
        assert!(info.ok);
        assert!(info.flight_route.is_none());
        assert!(info.aircraft.is_none());

        assert!(matches!(client.resolve("   ").await, Err(FlightError::MissingInput(_))));
    }

    #[test]
    fn test_info_serializes_camel_case() {
        let json = serde_json::to_value(CallsignInfo { ok: true, ..Default::default() }).unwrap();
        assert_eq!(json, json!({ "ok": true, "flightRoute": null, "aircraft": null }));
    }
}
