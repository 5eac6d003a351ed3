//! Offer normalization
//!
//! Turns the raw flight-offers body returned by the shopping provider into
//! the [`Flight`] / [`Itinerary`] / [`Segment`] shape every view consumes.
//! Upstream order is preserved and absent fields stay absent.

use crate::FlightError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Total or per-traveler price, amounts kept as the provider's decimal strings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Price {
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub total: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub base: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub grand_total: Option<String>,
}

impl Price {
    /// "`<total> <currency>`" as shown on result cards
    pub fn label(&self) -> String {
        format!(
            "{} {}",
            self.total.as_deref().unwrap_or(""),
            self.currency.as_deref().unwrap_or("")
        )
        .trim()
        .to_string()
    }

    /// Total as a number, for display-time currency conversion only
    pub fn total_amount(&self) -> Option<f64> {
        self.total.as_deref().and_then(|t| t.trim().parse::<f64>().ok())
    }
}

/// Passenger category of a fare line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TravelerType {
    Adult,
    Child,
    HeldInfant,
    Other(String),
}

impl From<String> for TravelerType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "ADULT" => TravelerType::Adult,
            "CHILD" => TravelerType::Child,
            "HELD_INFANT" => TravelerType::HeldInfant,
            _ => TravelerType::Other(value),
        }
    }
}

impl From<TravelerType> for String {
    fn from(value: TravelerType) -> Self {
        match value {
            TravelerType::Adult => "ADULT".to_string(),
            TravelerType::Child => "CHILD".to_string(),
            TravelerType::HeldInfant => "HELD_INFANT".to_string(),
            TravelerType::Other(other) => other,
        }
    }
}

/// One passenger's fare line
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelerPricing {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traveler_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fare_option: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traveler_type: Option<TravelerType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
}

/// Departure or arrival point of a segment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iata_code: Option<String>,
    /// Local-to-airport timestamp, no zone normalization
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at: Option<String>,
}

impl Endpoint {
    pub fn code(&self) -> &str {
        self.iata_code.as_deref().unwrap_or("")
    }

    pub fn time(&self) -> &str {
        self.at.as_deref().unwrap_or("")
    }
}

/// One non-stop flown leg
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flight_number: Option<String>,
    #[serde(default)]
    pub departure: Endpoint,
    #[serde(default)]
    pub arrival: Endpoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aircraft: Option<String>,
}

impl Segment {
    /// Carrier code followed by flight number, e.g. `AC856`
    pub fn callsign(&self) -> Option<String> {
        match (&self.carrier, &self.flight_number) {
            (Some(carrier), Some(number)) => Some(format!("{}{}", carrier, number)),
            _ => None,
        }
    }
}

/// One directional leg group (outbound or return)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Itinerary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

impl Itinerary {
    pub fn first_segment(&self) -> Option<&Segment> {
        self.segments.first()
    }

    pub fn last_segment(&self) -> Option<&Segment> {
        self.segments.last()
    }
}

/// Normalized flight offer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    #[serde(default)]
    pub travelers: Vec<TravelerPricing>,
    #[serde(default)]
    pub itineraries: Vec<Itinerary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub co2_emissions: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_emissions: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validating_airline_codes: Vec<String>,
    /// Cabin of the first traveler's first segment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cabin: Option<String>,
}

impl Flight {
    pub fn outbound(&self) -> Option<&Itinerary> {
        self.itineraries.first()
    }

    pub fn inbound(&self) -> Option<&Itinerary> {
        self.itineraries.get(1)
    }

    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.itineraries.iter().flat_map(|it| it.segments.iter())
    }

    /// Carrier of the very first segment, used for logos and headings
    pub fn lead_carrier(&self) -> Option<&str> {
        self.outbound()
            .and_then(|it| it.first_segment())
            .and_then(|seg| seg.carrier.as_deref())
    }
}

// Provider-side shapes. Every field is read on its own: a field of the
// wrong type reads as absent without taking its siblings with it.

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawOffer {
    #[serde(deserialize_with = "lenient_string")]
    id: Option<String>,
    #[serde(deserialize_with = "lenient")]
    price: Option<Price>,
    #[serde(deserialize_with = "lenient_list")]
    traveler_pricings: Option<Vec<RawTravelerPricing>>,
    #[serde(deserialize_with = "lenient_list")]
    itineraries: Option<Vec<RawItinerary>>,
    #[serde(deserialize_with = "lenient_list")]
    validating_airline_codes: Option<Vec<String>>,
    #[serde(deserialize_with = "lenient")]
    co2_emissions: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    average_emissions: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawTravelerPricing {
    #[serde(deserialize_with = "lenient_string")]
    traveler_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    fare_option: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    traveler_type: Option<String>,
    #[serde(deserialize_with = "lenient")]
    price: Option<Price>,
    #[serde(deserialize_with = "lenient_list")]
    fare_details_by_segment: Option<Vec<RawFareDetail>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawFareDetail {
    #[serde(deserialize_with = "lenient_string")]
    cabin: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawItinerary {
    #[serde(deserialize_with = "lenient_string")]
    duration: Option<String>,
    #[serde(deserialize_with = "lenient_list")]
    segments: Option<Vec<RawSegment>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawSegment {
    #[serde(deserialize_with = "lenient_string")]
    carrier_code: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    number: Option<String>,
    #[serde(deserialize_with = "lenient")]
    departure: Option<RawEndpoint>,
    #[serde(deserialize_with = "lenient")]
    arrival: Option<RawEndpoint>,
    #[serde(deserialize_with = "lenient_string")]
    duration: Option<String>,
    #[serde(deserialize_with = "lenient")]
    aircraft: Option<RawAircraft>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawEndpoint {
    #[serde(deserialize_with = "lenient_string")]
    iata_code: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    at: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAircraft {
    #[serde(deserialize_with = "lenient_string")]
    code: Option<String>,
}

/// Accept identifiers and amounts the provider sometimes sends as numbers.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Any value; one of the wrong type reads as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// An array whose entries are decoded one by one. A non-array reads as
/// absent; an entry of the wrong shape keeps its slot as a default value.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .map(|item| serde_json::from_value(item).unwrap_or_default())
                .collect(),
        ),
        _ => None,
    })
}

/// Normalize a raw response body.
///
/// Accepts either a bare array of offers or the provider envelope
/// `{ "data": [...] }`. A body that is not JSON, or is neither an array nor
/// an object, is rejected as a whole; no partial list is ever returned.
pub fn normalize_offers(body: &str) -> Result<Vec<Flight>, FlightError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| FlightError::MalformedPayload(format!("response is not valid JSON: {}", e)))?;
    normalize_value(&value)
}

/// Normalize an already decoded response body.
pub fn normalize_value(value: &Value) -> Result<Vec<Flight>, FlightError> {
    let offers: &[Value] = match value {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("data") {
            Some(Value::Array(items)) => items.as_slice(),
            None | Some(Value::Null) => &[][..],
            Some(other) => {
                return Err(FlightError::MalformedPayload(format!(
                    "`data` should be an array, found {}",
                    kind_of(other)
                )))
            }
        },
        other => {
            return Err(FlightError::MalformedPayload(format!(
                "expected an array or object, found {}",
                kind_of(other)
            )))
        }
    };

    let flights: Vec<Flight> = offers.iter().enumerate().map(|(i, offer)| normalize_offer(i, offer)).collect();
    debug!(offers = flights.len(), "Normalized flight offers");
    Ok(flights)
}

fn normalize_offer(index: usize, offer: &Value) -> Flight {
    let raw = match RawOffer::deserialize(offer) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(index, error = %e, "Offer has an unexpected shape, keeping it as an empty entry");
            RawOffer::default()
        }
    };

    let traveler_pricings = raw.traveler_pricings.unwrap_or_default();

    let cabin = traveler_pricings
        .first()
        .and_then(|tp| tp.fare_details_by_segment.as_ref())
        .and_then(|details| details.first())
        .and_then(|detail| detail.cabin.clone());

    let travelers = traveler_pricings
        .into_iter()
        .map(|tp| TravelerPricing {
            traveler_id: tp.traveler_id,
            fare_option: tp.fare_option,
            traveler_type: tp.traveler_type.map(TravelerType::from),
            price: tp.price,
        })
        .collect();

    let itineraries = raw
        .itineraries
        .unwrap_or_default()
        .into_iter()
        .map(|it| Itinerary {
            duration: it.duration,
            segments: it.segments.unwrap_or_default().into_iter().map(normalize_segment).collect(),
        })
        .collect();

    Flight {
        id: raw.id,
        price: raw.price,
        travelers,
        itineraries,
        co2_emissions: raw.co2_emissions,
        average_emissions: raw.average_emissions,
        validating_airline_codes: raw.validating_airline_codes.unwrap_or_default(),
        cabin,
    }
}

fn normalize_segment(seg: RawSegment) -> Segment {
    let endpoint = |raw: Option<RawEndpoint>| {
        raw.map(|e| Endpoint {
            iata_code: e.iata_code,
            at: e.at,
        })
        .unwrap_or_default()
    };

    Segment {
        carrier: seg.carrier_code,
        flight_number: seg.number,
        departure: endpoint(seg.departure),
        arrival: endpoint(seg.arrival),
        duration: seg.duration,
        aircraft: seg.aircraft.and_then(|a| a.code),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_offer(id: &str) -> Value {
        json!({
            "type": "flight-offer",
            "id": id,
            "validatingAirlineCodes": ["AC"],
            "price": { "currency": "CAD", "total": "1043.27", "base": "612.00", "grandTotal": "1043.27" },
            "itineraries": [{
                "duration": "PT6H55M",
                "segments": [{
                    "departure": { "iataCode": "YYZ", "terminal": "1", "at": "2025-09-06T21:30:00" },
                    "arrival": { "iataCode": "LHR", "terminal": "2", "at": "2025-09-07T09:25:00" },
                    "carrierCode": "AC",
                    "number": "856",
                    "aircraft": { "code": "77W" },
                    "duration": "PT6H55M"
                }]
            }],
            "travelerPricings": [{
                "travelerId": "1",
                "fareOption": "STANDARD",
                "travelerType": "ADULT",
                "price": { "currency": "CAD", "total": "1043.27" },
                "fareDetailsBySegment": [{ "segmentId": "1", "cabin": "ECONOMY" }]
            }]
        })
    }

    #[test]
    fn test_normalize_preserves_length_and_order() {
        let body = json!([sample_offer("3"), sample_offer("1"), sample_offer("2")]);
        let flights = normalize_value(&body).unwrap();

        let ids: Vec<_> = flights.iter().map(|f| f.id.as_deref().unwrap()).collect();
        assert_eq!(ids, vec!["3", "1", "2"]);
    }

    #[test]
    fn test_normalize_maps_segment_fields() {
        let flights = normalize_value(&json!([sample_offer("1")])).unwrap();
        let flight = &flights[0];

        let price = flight.price.as_ref().unwrap();
        assert_eq!(price.total.as_deref(), Some("1043.27"));
        assert_eq!(price.currency.as_deref(), Some("CAD"));
        assert_eq!(flight.cabin.as_deref(), Some("ECONOMY"));
        assert_eq!(flight.validating_airline_codes, vec!["AC".to_string()]);

        let itinerary = &flight.itineraries[0];
        assert_eq!(itinerary.duration.as_deref(), Some("PT6H55M"));

        let seg = &itinerary.segments[0];
        assert_eq!(seg.carrier.as_deref(), Some("AC"));
        assert_eq!(seg.flight_number.as_deref(), Some("856"));
        assert_eq!(seg.departure.code(), "YYZ");
        assert_eq!(seg.arrival.time(), "2025-09-07T09:25:00");
        assert_eq!(seg.aircraft.as_deref(), Some("77W"));
        assert_eq!(seg.callsign().as_deref(), Some("AC856"));

        let traveler = &flight.travelers[0];
        assert_eq!(traveler.traveler_id.as_deref(), Some("1"));
        assert_eq!(traveler.traveler_type, Some(TravelerType::Adult));
    }

    #[test]
    fn test_missing_traveler_pricings_is_empty_not_absent() {
        let mut offer = sample_offer("1");
        offer.as_object_mut().unwrap().remove("travelerPricings");

        let flights = normalize_value(&json!([offer])).unwrap();
        assert!(flights[0].travelers.is_empty());

        let serialized = serde_json::to_value(&flights[0]).unwrap();
        assert_eq!(serialized["travelers"], json!([]));
    }

    #[test]
    fn test_missing_arrays_are_empty() {
        let body = json!([
            { "id": "1", "price": { "total": "10.00", "currency": "USD" } },
            { "id": "2", "itineraries": [{ "duration": "PT1H" }] }
        ]);
        let flights = normalize_value(&body).unwrap();

        assert_eq!(flights.len(), 2);
        assert!(flights[0].itineraries.is_empty());
        assert_eq!(flights[1].itineraries.len(), 1);
        assert!(flights[1].itineraries[0].segments.is_empty());
    }

    #[test]
    fn test_missing_fields_stay_absent() {
        let body = json!([{
            "itineraries": [{ "segments": [{ "departure": { "iataCode": "YYZ" } }] }]
        }]);
        let flights = normalize_value(&body).unwrap();
        let seg = &flights[0].itineraries[0].segments[0];

        assert!(flights[0].id.is_none());
        assert!(flights[0].price.is_none());
        assert!(seg.carrier.is_none());
        assert!(seg.flight_number.is_none());
        assert!(seg.duration.is_none());
        assert!(seg.departure.at.is_none());
        assert!(seg.arrival.iata_code.is_none());
        assert_eq!(seg.arrival.code(), "");
    }

    #[test]
    fn test_envelope_and_numeric_ids() {
        let body = r#"{ "meta": { "count": 1 }, "data": [ { "id": 7, "itineraries": [ { "segments": [ { "number": 425, "carrierCode": "WS" } ] } ] } ] }"#;
        let flights = normalize_offers(body).unwrap();

        assert_eq!(flights[0].id.as_deref(), Some("7"));
        assert_eq!(flights[0].itineraries[0].segments[0].flight_number.as_deref(), Some("425"));
    }

    #[test]
    fn test_envelope_without_data_is_empty() {
        let flights = normalize_offers(r#"{ "errors": [] }"#).unwrap();
        assert!(flights.is_empty());
    }

    #[test]
    fn test_unparseable_body_is_rejected() {
        assert!(matches!(normalize_offers("<html>oops</html>"), Err(FlightError::MalformedPayload(_))));
        assert!(matches!(normalize_offers("42"), Err(FlightError::MalformedPayload(_))));
        assert!(matches!(normalize_offers(r#"{"data": "nope"}"#), Err(FlightError::MalformedPayload(_))));
    }

    #[test]
    fn test_odd_entry_keeps_its_slot() {
        let body = json!([sample_offer("1"), "garbage", sample_offer("2")]);
        let flights = normalize_value(&body).unwrap();

        assert_eq!(flights.len(), 3);
        assert_eq!(flights[1], Flight::default());
        assert_eq!(flights[2].id.as_deref(), Some("2"));
    }

    #[test]
    fn test_numeric_price_keeps_the_rest_of_the_offer() {
        let body = json!([{
            "id": "9",
            "price": { "currency": "USD", "total": 100.5, "grandTotal": 100.5 },
            "itineraries": [{
                "segments": [{
                    "carrierCode": "AC",
                    "number": "1",
                    "departure": { "iataCode": "YYZ" },
                    "arrival": { "iataCode": "LHR" }
                }]
            }]
        }]);
        let flights = normalize_value(&body).unwrap();
        let flight = &flights[0];

        assert_eq!(flight.id.as_deref(), Some("9"));
        let price = flight.price.as_ref().unwrap();
        assert_eq!(price.total.as_deref(), Some("100.5"));
        assert_eq!(price.total_amount(), Some(100.5));
        assert_eq!(price.currency.as_deref(), Some("USD"));
        assert_eq!(flight.itineraries.len(), 1);
        assert_eq!(flight.itineraries[0].segments[0].callsign().as_deref(), Some("AC1"));
        assert_eq!(flight.itineraries[0].segments[0].arrival.code(), "LHR");
    }

    #[test]
    fn test_mistyped_field_is_absent_on_its_own() {
        let body = json!([
            { "id": "10", "itineraries": [{ "duration": "PT2H", "segments": {} }] },
            {
                "id": "11",
                "price": "free",
                "co2Emissions": "lots",
                "travelerPricings": [{ "travelerType": "ADULT", "fareDetailsBySegment": "ECONOMY" }],
                "itineraries": [{ "segments": [{ "carrierCode": "WS", "departure": "YYC" }, 7] }]
            }
        ]);
        let flights = normalize_value(&body).unwrap();

        assert_eq!(flights[0].id.as_deref(), Some("10"));
        assert_eq!(flights[0].itineraries.len(), 1);
        assert_eq!(flights[0].itineraries[0].duration.as_deref(), Some("PT2H"));
        assert!(flights[0].itineraries[0].segments.is_empty());

        let flight = &flights[1];
        assert_eq!(flight.id.as_deref(), Some("11"));
        assert!(flight.price.is_none());
        assert!(flight.co2_emissions.is_none());
        assert!(flight.cabin.is_none());
        assert_eq!(flight.travelers[0].traveler_type, Some(TravelerType::Adult));

        let segments = &flight.itineraries[0].segments;
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].carrier.as_deref(), Some("WS"));
        assert_eq!(segments[0].departure, Endpoint::default());
        assert_eq!(segments[1], Segment::default());
    }

    #[test]
    fn test_unknown_traveler_type_is_kept() {
        let body = json!([{ "travelerPricings": [{ "travelerType": "SENIOR" }] }]);
        let flights = normalize_value(&body).unwrap();
        assert_eq!(
            flights[0].travelers[0].traveler_type,
            Some(TravelerType::Other("SENIOR".to_string()))
        );
    }

    #[test]
    fn test_flight_json_round_trips_through_storage_shape() {
        let flights = normalize_value(&json!([sample_offer("1")])).unwrap();
        let stored = serde_json::to_string(&flights[0]).unwrap();
        let restored: Flight = serde_json::from_str(&stored).unwrap();
        assert_eq!(restored, flights[0]);
    }

    #[test]
    fn test_price_label_and_amount() {
        let price = Price {
            currency: Some("EUR".to_string()),
            total: Some("245.10".to_string()),
            ..Default::default()
        };
        assert_eq!(price.label(), "245.10 EUR");
        assert_eq!(price.total_amount(), Some(245.10));
    }
}
