//! Great-circle distances over a flight's route

use crate::offer::Flight;
use crate::reference::AirportTable;

const EARTH_RADIUS_KM: f64 = 6371.0;
const MILES_PER_KM: f64 = 0.621371;

/// Calculates the distance between two coordinates in km using the
/// haversine formula. Inputs are not range-checked; NaN propagates.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);

    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

pub fn km_to_miles(km: f64) -> f64 {
    km * MILES_PER_KM
}

/// Sum of every segment's great-circle length across all itineraries.
/// A leg whose distance is not finite contributes nothing.
pub fn route_distance_km(flight: &Flight, airports: &AirportTable) -> f64 {
    flight
        .segments()
        .map(|seg| {
            let dep = airports.coords(seg.departure.code());
            let arr = airports.coords(seg.arrival.code());
            haversine_km(dep.lat, dep.lon, arr.lat, arr.lon)
        })
        .filter(|km| km.is_finite())
        .sum()
}

/// Route distance rounded for display: (km, miles)
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct RouteDistance {
    pub km: u64,
    pub miles: u64,
}

impl RouteDistance {
    pub fn from_km(km: f64) -> Self {
        let km = if km.is_finite() { km.max(0.0) } else { 0.0 };
        Self {
            km: km.round() as u64,
            miles: km_to_miles(km).round() as u64,
        }
    }
}
