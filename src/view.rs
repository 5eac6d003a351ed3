//! Result-card and detail-page view models built from a normalized flight

use crate::geo::{route_distance_km, RouteDistance};
use crate::offer::{Flight, Itinerary, Segment};
use crate::reference::ReferenceData;
use crate::route::MapView;
use crate::timefmt::{clock_label, date_label, day_offset, format_duration, layover, total_duration};
use serde::Serialize;

/// Compact one-line view of an itinerary
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItinerarySummary {
    pub origin: String,
    pub destination: String,
    pub departure_time: String,
    pub departure_date: String,
    pub arrival_time: String,
    pub arrival_date: String,
    /// `+N` when the arrival is N whole days after departure
    pub day_offset: String,
    pub total_duration: String,
    pub stops: usize,
    pub stops_label: String,
}

impl ItinerarySummary {
    pub fn from_itinerary(itinerary: &Itinerary) -> Option<Self> {
        let first = itinerary.first_segment()?;
        let last = itinerary.last_segment()?;

        let dep = first.departure.time();
        let arr = last.arrival.time();

        Some(Self {
            origin: first.departure.code().to_string(),
            destination: last.arrival.code().to_string(),
            departure_time: clock_label(dep),
            departure_date: date_label(dep),
            arrival_time: clock_label(arr),
            arrival_date: date_label(arr),
            day_offset: day_offset(dep, arr),
            total_duration: total_duration(dep, arr),
            stops: itinerary.segments.len().saturating_sub(1),
            stops_label: stops_label(itinerary),
        })
    }
}

/// `Non-stop`, `1 stop LHR`, `2 stops LHR`; only the first stop is named.
pub fn stops_label(itinerary: &Itinerary) -> String {
    let stops = itinerary.segments.len().saturating_sub(1);
    if stops == 0 {
        return "Non-stop".to_string();
    }

    let first_stop = itinerary.segments[0].arrival.code();
    let plural = if stops > 1 { "s" } else { "" };
    format!("{} stop{} {}", stops, plural, first_stop).trim_end().to_string()
}

/// How an offer's emissions compare to the route average
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EmissionsVerdict {
    BelowAverage,
    AtOrAboveAverage,
    Unknown,
}

impl EmissionsVerdict {
    pub fn of(flight: &Flight) -> Self {
        match (flight.co2_emissions, flight.average_emissions) {
            (Some(co2), Some(avg)) if co2 != 0.0 && avg != 0.0 => {
                if co2 < avg {
                    EmissionsVerdict::BelowAverage
                } else {
                    EmissionsVerdict::AtOrAboveAverage
                }
            }
            _ => EmissionsVerdict::Unknown,
        }
    }
}

/// Search result card
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightCard {
    pub id: Option<String>,
    pub carrier: String,
    pub price_label: String,
    pub outbound: Option<ItinerarySummary>,
    pub inbound: Option<ItinerarySummary>,
    pub co2_emissions: Option<f64>,
    pub emissions: EmissionsVerdict,
}

impl FlightCard {
    pub fn from_flight(flight: &Flight) -> Self {
        Self {
            id: flight.id.clone(),
            carrier: flight.lead_carrier().unwrap_or("").to_string(),
            price_label: flight.price.as_ref().map(|p| p.label()).unwrap_or_default(),
            outbound: flight.outbound().and_then(ItinerarySummary::from_itinerary),
            inbound: flight.inbound().and_then(ItinerarySummary::from_itinerary),
            co2_emissions: flight.co2_emissions,
            emissions: EmissionsVerdict::of(flight),
        }
    }
}

/// One segment as laid out on the detail page
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentDetail {
    pub carrier: String,
    pub flight_number: String,
    pub callsign: Option<String>,
    pub departure_code: String,
    pub departure_name: String,
    pub departure_city: String,
    pub departure_time: String,
    pub departure_date: String,
    pub arrival_code: String,
    pub arrival_name: String,
    pub arrival_city: String,
    pub arrival_time: String,
    pub arrival_date: String,
    pub duration: String,
    pub aircraft: String,
    /// Ground time before the next segment of the same itinerary
    pub layover_after: Option<String>,
}

impl SegmentDetail {
    fn build(seg: &Segment, next: Option<&Segment>, reference: &ReferenceData) -> Self {
        let airports = &reference.airports;
        let dep = seg.departure.code();
        let arr = seg.arrival.code();

        Self {
            carrier: seg.carrier.clone().unwrap_or_default(),
            flight_number: seg.flight_number.clone().unwrap_or_default(),
            callsign: seg.callsign(),
            departure_code: dep.to_string(),
            departure_name: airports.name(dep),
            departure_city: airports.city(dep),
            departure_time: clock_label(seg.departure.time()),
            departure_date: date_label(seg.departure.time()),
            arrival_code: arr.to_string(),
            arrival_name: airports.name(arr),
            arrival_city: airports.city(arr),
            arrival_time: clock_label(seg.arrival.time()),
            arrival_date: date_label(seg.arrival.time()),
            duration: format_duration(seg.duration.as_deref().unwrap_or("")),
            aircraft: reference.aircraft.name(seg.aircraft.as_deref()),
            layover_after: next
                .map(|n| layover(seg.arrival.time(), n.departure.time()))
                .filter(|l| !l.is_empty()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryDetail {
    pub label: &'static str,
    pub segments: Vec<SegmentDetail>,
}

/// Everything the detail page shows for the selected flight
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightDetail {
    pub id: Option<String>,
    pub price_label: String,
    pub itineraries: Vec<ItineraryDetail>,
    pub map: MapView,
    pub distance: RouteDistance,
}

impl FlightDetail {
    pub fn build(flight: &Flight, reference: &ReferenceData) -> Self {
        let itineraries = flight
            .itineraries
            .iter()
            .enumerate()
            .map(|(i, itinerary)| {
                let segs = &itinerary.segments;
                ItineraryDetail {
                    label: if i == 0 { "Outbound Flight" } else { "Return Flight" },
                    segments: segs
                        .iter()
                        .enumerate()
                        .map(|(j, seg)| SegmentDetail::build(seg, segs.get(j + 1), reference))
                        .collect(),
                }
            })
            .collect();

        Self {
            id: flight.id.clone(),
            price_label: flight.price.as_ref().map(|p| p.label()).unwrap_or_default(),
            itineraries,
            map: MapView::from_flight(flight, &reference.airports),
            distance: RouteDistance::from_km(route_distance_km(flight, &reference.airports)),
        }
    }
}

/// Inputs for the review-video lookup of a detail page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewQuery {
    pub flight_code: String,
    pub airline: String,
    pub service_class: String,
}

impl ReviewQuery {
    /// `slug` is the detail page id, e.g. `WS-425-2025-09-06T12:00:00`,
    /// which reduces to the flight code `WS425`.
    pub fn from_flight(flight: &Flight, slug: &str) -> Self {
        let parts: Vec<&str> = slug.split('-').collect();
        let flight_code = if parts.len() >= 2 {
            format!("{}{}", parts[0], parts[1])
        } else {
            slug.to_string()
        };

        let airline = flight.validating_airline_codes.first().cloned().unwrap_or_default();

        Self {
            flight_code,
            airline,
            service_class: pretty_cabin(flight.cabin.as_deref().unwrap_or("")),
        }
    }
}

/// `economy` stays as is; other cabins read `business class`, etc.
pub fn pretty_cabin(cabin: &str) -> String {
    let lower = cabin.to_lowercase();
    if lower == "economy" {
        lower
    } else if lower.is_empty() {
        String::new()
    } else {
        format!("{} class", lower)
    }
}

/// Detail page slug for a flight: `<carrier>-<number>-<departure time>`
pub fn detail_slug(flight: &Flight) -> Option<String> {
    let seg = flight.outbound()?.first_segment()?;
    Some(format!(
        "{}-{}-{}",
        seg.carrier.as_deref()?,
        seg.flight_number.as_deref()?,
        seg.departure.time()
    ))
}
