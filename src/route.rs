//! Airport markers and directed route edges for the map view

use crate::offer::Flight;
use crate::reference::AirportTable;
use serde::{Deserialize, Serialize};

/// Edge color for outbound legs and for legs without a mirrored return
pub const OUTBOUND_COLOR: &str = "limegreen";
/// Edge color for return legs and for legs flown in both directions
pub const RETURN_COLOR: &str = "deepskyblue";

/// One airport pin; the same airport appears once per segment endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AirportMarker {
    pub code: String,
    pub name: String,
    pub city: String,
    pub lat: f64,
    pub lon: f64,
}

/// Directed leg, tagged with the position of its itinerary in the flight
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteEdge {
    pub from: String,
    pub to: String,
    pub itinerary_index: usize,
}

impl RouteEdge {
    /// Color keyed on the owning itinerary: outbound vs. return
    pub fn leg_color(&self) -> &'static str {
        if self.itinerary_index == 0 {
            OUTBOUND_COLOR
        } else {
            RETURN_COLOR
        }
    }

    /// True when the other itinerary flies exactly the reverse of this edge
    pub fn is_mirrored(&self, edges: &[RouteEdge]) -> bool {
        let other = match self.itinerary_index {
            0 => 1,
            1 => 0,
            _ => return false,
        };
        edges
            .iter()
            .any(|e| e.itinerary_index == other && e.from == self.to && e.to == self.from)
    }
}

/// Both endpoints of every segment, in segment order, duplicates kept.
pub fn derive_airports(flight: &Flight, airports: &AirportTable) -> Vec<AirportMarker> {
    flight
        .segments()
        .flat_map(|seg| [seg.departure.code(), seg.arrival.code()])
        .map(|code| {
            let coords = airports.coords(code);
            AirportMarker {
                code: code.to_string(),
                name: airports.name(code),
                city: airports.city(code),
                lat: coords.lat,
                lon: coords.lon,
            }
        })
        .collect()
}

/// One edge per segment, itineraries in order, segments in order.
pub fn derive_routes(flight: &Flight) -> Vec<RouteEdge> {
    flight
        .itineraries
        .iter()
        .enumerate()
        .flat_map(|(itinerary_index, itinerary)| {
            itinerary.segments.iter().map(move |seg| RouteEdge {
                from: seg.departure.code().to_string(),
                to: seg.arrival.code().to_string(),
                itinerary_index,
            })
        })
        .collect()
}

/// Edge ready for drawing
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapEdge {
    #[serde(flatten)]
    pub edge: RouteEdge,
    pub color: &'static str,
    pub mirrored: bool,
    pub from_coords: (f64, f64),
    pub to_coords: (f64, f64),
}

/// Markers and edges for one flight
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    pub airports: Vec<AirportMarker>,
    pub routes: Vec<MapEdge>,
}

impl MapView {
    /// Edges whose endpoints have no marker are left out of `routes`;
    /// duplicate markers are harmless.
    pub fn from_flight(flight: &Flight, airports: &AirportTable) -> Self {
        let markers = derive_airports(flight, airports);
        let edges = derive_routes(flight);

        let find = |code: &str| markers.iter().find(|m| m.code == code).map(|m| (m.lat, m.lon));

        let routes = edges
            .iter()
            .filter_map(|edge| {
                let from_coords = find(&edge.from)?;
                let to_coords = find(&edge.to)?;
                Some(MapEdge {
                    edge: edge.clone(),
                    color: edge.leg_color(),
                    mirrored: edge.is_mirrored(&edges),
                    from_coords,
                    to_coords,
                })
            })
            .collect();

        Self {
            airports: markers,
            routes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offer::{Endpoint, Itinerary, Segment};

    fn leg(from: &str, to: &str) -> Segment {
        Segment {
            departure: Endpoint { iata_code: Some(from.to_string()), at: None },
            arrival: Endpoint { iata_code: Some(to.to_string()), at: None },
            ..Default::default()
        }
    }

    fn flight(itineraries: Vec<Vec<Segment>>) -> Flight {
        Flight {
            itineraries: itineraries
                .into_iter()
                .map(|segments| Itinerary { duration: None, segments })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_one_way_edges_are_outbound_only() {
        let f = flight(vec![vec![leg("YVR", "YYZ"), leg("YYZ", "LHR")]]);
        let edges = derive_routes(&f);

        assert_eq!(edges.len(), 2);
        assert!(edges.iter().all(|e| e.itinerary_index == 0));
        assert_eq!(edges[0].from, "YVR");
        assert_eq!(edges[1].to, "LHR");
    }

    #[test]
    fn test_round_trip_edges_cover_both_itineraries() {
        let f = flight(vec![vec![leg("YYZ", "LHR")], vec![leg("LHR", "CDG"), leg("CDG", "YYZ")]]);
        let edges = derive_routes(&f);

        let indexes: Vec<usize> = edges.iter().map(|e| e.itinerary_index).collect();
        assert_eq!(indexes, vec![0, 1, 1]);
        assert_eq!(edges[0].leg_color(), OUTBOUND_COLOR);
        assert_eq!(edges[2].leg_color(), RETURN_COLOR);
    }

    #[test]
    fn test_airports_keep_duplicates() {
        let airports = AirportTable::bundled().unwrap();
        let f = flight(vec![vec![leg("YVR", "YYZ"), leg("YYZ", "LHR")]]);
        let markers = derive_airports(&f, &airports);

        let codes: Vec<&str> = markers.iter().map(|m| m.code.as_str()).collect();
        assert_eq!(codes, vec!["YVR", "YYZ", "YYZ", "LHR"]);
        assert_eq!(markers[1], markers[2]);
        assert_eq!(markers[3].city, "London");
    }

    #[test]
    fn test_mirrored_legs() {
        let f = flight(vec![vec![leg("YYZ", "LHR"), leg("LHR", "CDG")], vec![leg("CDG", "FRA"), leg("LHR", "YYZ")]]);
        let edges = derive_routes(&f);

        assert!(edges[0].is_mirrored(&edges));
        assert!(!edges[1].is_mirrored(&edges));
        assert!(!edges[2].is_mirrored(&edges));
        assert!(edges[3].is_mirrored(&edges));
    }

    #[test]
    fn test_map_view_tolerates_unknown_and_missing_codes() {
        let airports = AirportTable::bundled().unwrap();
        let mut odd = leg("QQQ", "YYZ");
        odd.arrival.iata_code = None;
        let f = flight(vec![vec![odd, leg("YYZ", "LHR")]]);

        let view = MapView::from_flight(&f, &airports);
        assert_eq!(view.airports.len(), 4);
        assert_eq!(view.airports[0].name, "QQQ");
        assert_eq!(view.airports[1].code, "");
        assert_eq!(view.routes.len(), 2);
        assert_eq!(view.routes[0].from_coords, (0.0, 0.0));
    }
}
