//! # Flight Scout
//!
//! Flight search proxy. Talks to the Amadeus flight-shopping API, reshapes
//! the offers it returns into a stable [`Flight`] shape, and enriches a
//! selected flight with airports, route edges, distances, aircraft names,
//! booking links and currency conversion.

pub mod booking;
pub mod callsign;
pub mod client;
pub mod currency;
pub mod geo;
pub mod offer;
pub mod reference;
pub mod route;
#[cfg(feature = "server")]
pub mod server;
pub mod session;
pub mod settings;
pub mod timefmt;
pub mod video;
pub mod view;

use std::str::FromStr;
use thiserror::Error;

// Re-export main types for convenience
pub use client::{AmadeusClient, Location};
pub use currency::{convert, convert_amount, Money, RateClient, RateTable};
pub use offer::{normalize_offers, normalize_value, Flight, Itinerary, Price, Segment, TravelerPricing, TravelerType};
pub use reference::{AircraftTable, Airport, AirportTable, ReferenceData};
pub use route::{derive_airports, derive_routes, MapView, RouteEdge};
pub use settings::Settings;

/// Error types for the flight-scout library
#[derive(Error, Debug)]
pub enum FlightError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON handling failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Malformed upstream payload: {0}")]
    MalformedPayload(String),

    #[error("Upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("Missing required input: {0}")]
    MissingInput(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] ::config::ConfigError),

    #[error("Session store error: {0}")]
    StoreError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Passenger counts for a search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Passengers {
    pub adults: u32,
    pub children: u32,
    pub infants: u32,
}

impl Default for Passengers {
    fn default() -> Self {
        Self {
            adults: 1,
            children: 0,
            infants: 0,
        }
    }
}

/// Trip type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripType {
    OneWay,
    RoundTrip,
}

impl FromStr for TripType {
    type Err = FlightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "round-trip" | "roundtrip" => Ok(TripType::RoundTrip),
            "one-way" | "oneway" => Ok(TripType::OneWay),
            _ => Err(FlightError::InvalidParameter(format!("Invalid trip type: {}", s))),
        }
    }
}

/// Cabin requested from the shopping provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TravelClass {
    Economy,
    PremiumEconomy,
    Business,
    First,
}

impl TravelClass {
    /// Code the shopping provider expects in `travelClass`
    pub fn provider_code(&self) -> &'static str {
        match self {
            TravelClass::Economy => "ECONOMY",
            TravelClass::PremiumEconomy => "PREMIUM_ECONOMY",
            TravelClass::Business => "BUSINESS",
            TravelClass::First => "FIRST",
        }
    }
}

impl FromStr for TravelClass {
    type Err = FlightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "economy" => Ok(TravelClass::Economy),
            "premium economy" | "premium-economy" | "premium_economy" => Ok(TravelClass::PremiumEconomy),
            "business" => Ok(TravelClass::Business),
            "first" => Ok(TravelClass::First),
            _ => Err(FlightError::InvalidParameter(format!("Invalid travel class: {}", s))),
        }
    }
}

/// Complete flight search request with all parameters
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub origin: String,
    pub destination: String,
    pub departure_date: String,
    pub return_date: Option<String>,
    pub passengers: Passengers,
    pub travel_class: Option<TravelClass>,
    pub trip_type: TripType,
}

impl SearchRequest {
    /// One-way economy search for a single adult
    pub fn one_way(origin: &str, destination: &str, departure_date: &str) -> Self {
        Self {
            origin: origin.to_string(),
            destination: destination.to_string(),
            departure_date: departure_date.to_string(),
            return_date: None,
            passengers: Passengers::default(),
            travel_class: None,
            trip_type: TripType::OneWay,
        }
    }

    /// Reject the request before any network call when a required field is blank.
    pub fn validate(&self) -> Result<(), FlightError> {
        let missing: Vec<&str> = [
            ("origin", &self.origin),
            ("destination", &self.destination),
            ("departure date", &self.departure_date),
        ]
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

        if !missing.is_empty() {
            return Err(FlightError::MissingInput(missing.join(", ")));
        }
        Ok(())
    }

    /// Query string for the flight-offers endpoint.
    ///
    /// `returnDate` is only sent for round trips; children and infants only
    /// when non-zero.
    pub fn query_pairs(&self, max_results: u32) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("originLocationCode".to_string(), self.origin.trim().to_uppercase()),
            ("destinationLocationCode".to_string(), self.destination.trim().to_uppercase()),
            ("departureDate".to_string(), self.departure_date.trim().to_string()),
            ("max".to_string(), max_results.to_string()),
            ("adults".to_string(), self.passengers.adults.max(1).to_string()),
        ];

        if self.passengers.children > 0 {
            pairs.push(("children".to_string(), self.passengers.children.to_string()));
        }
        if self.passengers.infants > 0 {
            pairs.push(("infants".to_string(), self.passengers.infants.to_string()));
        }

        if let (TripType::RoundTrip, Some(return_date)) = (self.trip_type, &self.return_date) {
            if !return_date.trim().is_empty() {
                pairs.push(("returnDate".to_string(), return_date.trim().to_string()));
            }
        }

        if let Some(class) = self.travel_class {
            pairs.push(("travelClass".to_string(), class.provider_code().to_string()));
        }

        pairs
    }
}

/// Main public API function: load settings, search, normalize
pub async fn search_flights(request: SearchRequest) -> Result<Vec<Flight>, FlightError> {
    let settings = Settings::load()?;
    let client = AmadeusClient::new(settings.amadeus)?;
    client.search_offers(&request).await
}
