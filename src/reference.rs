//! Static airport and aircraft reference tables
//!
//! Loaded once at startup and shared read-only. Lookups never fail: an
//! unknown airport code displays as itself, an unknown aircraft type code
//! likewise.

use crate::settings::DataSettings;
use crate::FlightError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info};

const BUNDLED_AIRPORTS: &str = include_str!("../data/airports.json");
const BUNDLED_AIRCRAFT: &str = include_str!("../data/aircraft.json");

/// Label used when a segment carries no aircraft code at all
pub const AIRCRAFT_TBA: &str = "Aircraft TBA";

/// Latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Airport reference entry, indexed by IATA code
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Airport {
    pub code: String,
    pub icao: Option<String>,
    pub name: String,
    pub city: Option<String>,
    pub country: Option<String>,
    pub coordinates: Option<Coordinates>,
}

/// Row of the airports file, keyed by ICAO code
#[derive(Debug, Deserialize)]
struct AirportRecord {
    icao: Option<String>,
    iata: Option<String>,
    name: String,
    city: Option<String>,
    country: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

/// Airport lookup by IATA code
#[derive(Debug, Clone, Default)]
pub struct AirportTable {
    by_iata: HashMap<String, Airport>,
}

impl AirportTable {
    /// Parse an ICAO-keyed airports document. Rows without an IATA code
    /// cannot be looked up and are skipped. When several rows share an
    /// IATA code, the one with the lowest ICAO key is kept.
    pub fn from_json_str(json: &str) -> Result<Self, FlightError> {
        let records: BTreeMap<String, AirportRecord> = serde_json::from_str(json)?;

        let mut by_iata: HashMap<String, Airport> = HashMap::new();
        for record in records.into_values() {
            let Some(code) = record.iata.filter(|iata| !iata.trim().is_empty()) else {
                continue;
            };
            let coordinates = match (record.lat, record.lon) {
                (Some(lat), Some(lon)) => Some(Coordinates { lat, lon }),
                _ => None,
            };
            by_iata.entry(code.clone()).or_insert(Airport {
                code,
                icao: record.icao,
                name: record.name,
                city: record.city,
                country: record.country,
                coordinates,
            });
        }

        debug!(airports = by_iata.len(), "Airport table indexed by IATA");
        Ok(Self { by_iata })
    }

    pub fn from_path(path: &Path) -> Result<Self, FlightError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Small table compiled into the binary
    pub fn bundled() -> Result<Self, FlightError> {
        Self::from_json_str(BUNDLED_AIRPORTS)
    }

    pub fn len(&self) -> usize {
        self.by_iata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_iata.is_empty()
    }

    pub fn by_code(&self, code: &str) -> Option<&Airport> {
        self.by_iata.get(code)
    }

    /// Display name, falling back to the code itself
    pub fn name(&self, code: &str) -> String {
        self.by_code(code)
            .map(|a| a.name.clone())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| code.to_string())
    }

    /// City, or an empty string when unknown
    pub fn city(&self, code: &str) -> String {
        self.by_code(code).and_then(|a| a.city.clone()).unwrap_or_default()
    }

    /// Coordinates, `(0, 0)` when the airport is unknown or either
    /// component is missing or zero.
    pub fn coords(&self, code: &str) -> Coordinates {
        self.by_code(code)
            .and_then(|a| a.coordinates)
            .filter(|c| c.lat != 0.0 && c.lon != 0.0)
            .unwrap_or_default()
    }
}

/// Aircraft type code to display name
#[derive(Debug, Clone, Default)]
pub struct AircraftTable {
    names: HashMap<String, String>,
}

impl AircraftTable {
    pub fn from_json_str(json: &str) -> Result<Self, FlightError> {
        let names: HashMap<String, String> = serde_json::from_str(json)?;
        Ok(Self { names })
    }

    pub fn from_path(path: &Path) -> Result<Self, FlightError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn bundled() -> Result<Self, FlightError> {
        Self::from_json_str(BUNDLED_AIRCRAFT)
    }

    pub fn name(&self, code: Option<&str>) -> String {
        match code.filter(|c| !c.is_empty()) {
            Some(code) => self.names.get(code).cloned().unwrap_or_else(|| code.to_string()),
            None => AIRCRAFT_TBA.to_string(),
        }
    }
}

/// Both reference tables, built once and shared behind an `Arc`
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub airports: AirportTable,
    pub aircraft: AircraftTable,
}

impl ReferenceData {
    pub fn bundled() -> Result<Self, FlightError> {
        Ok(Self {
            airports: AirportTable::bundled()?,
            aircraft: AircraftTable::bundled()?,
        })
    }

    /// Use configured files where given, the bundled tables otherwise.
    pub fn load(settings: &DataSettings) -> Result<Self, FlightError> {
        let airports = match &settings.airports_path {
            Some(path) => AirportTable::from_path(Path::new(path))?,
            None => AirportTable::bundled()?,
        };
        let aircraft = match &settings.aircraft_path {
            Some(path) => AircraftTable::from_path(Path::new(path))?,
            None => AircraftTable::bundled()?,
        };

        info!(airports = airports.len(), "Reference data loaded");
        Ok(Self { airports, aircraft })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_tables_load() {
        let data = ReferenceData::bundled().unwrap();
        assert!(!data.airports.is_empty());
        assert_eq!(data.airports.name("LHR"), "London Heathrow Airport");
        assert_eq!(data.airports.city("YYZ"), "Toronto");
    }

    #[test]
    fn test_unknown_airport_falls_back_to_code() {
        let table = AirportTable::bundled().unwrap();
        assert!(table.by_code("QQQ").is_none());
        assert_eq!(table.name("QQQ"), "QQQ");
        assert_eq!(table.city("QQQ"), "");
        assert_eq!(table.coords("QQQ"), Coordinates { lat: 0.0, lon: 0.0 });
    }

    #[test]
    fn test_rows_without_iata_are_not_indexed() {
        let json = r#"{
            "ZZZZ": { "icao": "ZZZZ", "name": "No Code Field", "lat": 1.0, "lon": 2.0 },
            "XBLK": { "icao": "XBLK", "iata": "", "name": "Blank Code Field" },
            "CYYZ": { "icao": "CYYZ", "iata": "YYZ", "name": "Pearson", "city": "Toronto", "lat": 43.67, "lon": -79.63 }
        }"#;
        let table = AirportTable::from_json_str(json).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.coords("YYZ"), Coordinates { lat: 43.67, lon: -79.63 });
    }

    #[test]
    fn test_shared_iata_code_keeps_lowest_icao_row() {
        let json = r#"{
            "ZZZX": { "icao": "ZZZX", "iata": "DUP", "name": "Second Row" },
            "AAAX": { "icao": "AAAX", "iata": "DUP", "name": "First Row" },
            "MMMX": { "icao": "MMMX", "iata": "DUP", "name": "Middle Row" }
        }"#;
        for _ in 0..8 {
            let table = AirportTable::from_json_str(json).unwrap();
            assert_eq!(table.len(), 1);
            assert_eq!(table.name("DUP"), "First Row");
            assert_eq!(table.by_code("DUP").unwrap().icao.as_deref(), Some("AAAX"));
        }
    }

    #[test]
    fn test_zero_or_missing_coordinates_resolve_to_origin() {
        let json = r#"{
            "AAAA": { "iata": "AAA", "name": "Equator Strip", "lat": 0.0, "lon": 10.0 },
            "BBBB": { "iata": "BBB", "name": "Unsurveyed" }
        }"#;
        let table = AirportTable::from_json_str(json).unwrap();
        assert_eq!(table.coords("AAA"), Coordinates::default());
        assert_eq!(table.coords("BBB"), Coordinates::default());
        assert_eq!(table.city("BBB"), "");
    }

    #[test]
    fn test_aircraft_names() {
        let table = AircraftTable::bundled().unwrap();
        assert_eq!(table.name(Some("77W")), "Boeing 777-300ER");
        assert_eq!(table.name(Some("XYZ")), "XYZ");
        assert_eq!(table.name(None), AIRCRAFT_TBA);
        assert_eq!(table.name(Some("")), AIRCRAFT_TBA);
    }

    #[test]
    fn test_load_prefers_configured_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("airports.json");
        std::fs::write(&path, r#"{ "EGLL": { "iata": "LHR", "name": "Heathrow" } }"#).unwrap();

        let settings = DataSettings {
            airports_path: Some(path.to_string_lossy().into_owned()),
            aircraft_path: None,
        };
        let data = ReferenceData::load(&settings).unwrap();
        assert_eq!(data.airports.len(), 1);
        assert_eq!(data.airports.name("LHR"), "Heathrow");
        assert_eq!(data.aircraft.name(Some("320")), "Airbus A320");
    }
}
