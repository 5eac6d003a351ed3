//! Deep links into third-party booking sites

use crate::offer::Flight;
use serde::Serialize;

/// Route and dates a booking link is built from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingQuery {
    pub origin: String,
    pub destination: String,
    /// `YYYY-MM-DD`
    pub departure_date: String,
    pub return_date: Option<String>,
    pub adults: u32,
    pub cabin: Option<String>,
}

impl BookingQuery {
    /// Origin/destination/dates of a selected flight: first departure and
    /// last arrival of the outbound, return date from the inbound's first
    /// departure.
    pub fn from_flight(flight: &Flight, adults: u32) -> Option<Self> {
        let outbound = flight.outbound()?;
        let first = outbound.first_segment()?;
        let last = outbound.last_segment()?;

        let date_of = |ts: &str| ts.split('T').next().unwrap_or("").to_string();

        Some(Self {
            origin: first.departure.code().to_string(),
            destination: last.arrival.code().to_string(),
            departure_date: date_of(first.departure.time()),
            return_date: flight
                .inbound()
                .and_then(|it| it.first_segment())
                .map(|seg| date_of(seg.departure.time()))
                .filter(|d| !d.is_empty()),
            adults: adults.max(1),
            cabin: flight.cabin.clone(),
        })
    }

    fn return_date(&self) -> Option<&str> {
        self.return_date.as_deref().map(str::trim).filter(|d| !d.is_empty())
    }
}

/// Skyscanner only knows three cabins; anything else searches economy.
fn skyscanner_cabin(cabin: Option<&str>) -> &'static str {
    match cabin.map(|c| c.to_lowercase()).as_deref() {
        Some("business") => "business",
        Some("first") => "first",
        _ => "economy",
    }
}

pub fn kayak_url(query: &BookingQuery) -> String {
    match query.return_date() {
        Some(ret) => format!(
            "https://www.kayak.com/flights/{}-{}/{}/{}?sort=bestflight_a",
            query.origin, query.destination, query.departure_date, ret
        ),
        None => format!(
            "https://www.kayak.com/flights/{}-{}/{}?fs=fdDir%3Dfalse&ucs=1k37tp8&sort=bestflight_a",
            query.origin, query.destination, query.departure_date
        ),
    }
}

pub fn skyscanner_url(query: &BookingQuery) -> String {
    let ret = query.return_date().map(|r| format!("/{}", r)).unwrap_or_default();
    format!(
        "https://www.skyscanner.com/transport/flights/{}/{}/{}{}/?adults={}&cabinclass={}",
        query.origin,
        query.destination,
        query.departure_date,
        ret,
        query.adults,
        skyscanner_cabin(query.cabin.as_deref())
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingLinks {
    pub kayak: String,
    pub skyscanner: String,
}

impl BookingLinks {
    pub fn new(query: &BookingQuery) -> Self {
        Self {
            kayak: kayak_url(query),
            skyscanner: skyscanner_url(query),
        }
    }
}
