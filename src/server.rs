//! JSON HTTP API over the search, lookup and selection operations

use crate::booking::{BookingLinks, BookingQuery};
use crate::callsign::CallsignClient;
use crate::client::AmadeusClient;
use crate::currency::{RateClient, RateTable, SharedRates};
use crate::offer::Flight;
use crate::reference::ReferenceData;
use crate::session::{select_flight, selected_flight, SessionStore};
use crate::settings::Settings;
use crate::video::VideoClient;
use crate::view::{FlightCard, FlightDetail, ReviewQuery};
use crate::{FlightError, Passengers, SearchRequest, TravelClass, TripType};
use axum::{
    extract::{Path, Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct AppState {
    pub amadeus: Arc<AmadeusClient>,
    pub callsigns: Arc<CallsignClient>,
    pub videos: Arc<VideoClient>,
    pub rate_client: Arc<RateClient>,
    pub rates: SharedRates,
    pub reference: Arc<ReferenceData>,
    pub store: Arc<dyn SessionStore>,
}

impl AppState {
    pub fn new(settings: &Settings, reference: ReferenceData, store: Arc<dyn SessionStore>) -> Result<Self, FlightError> {
        Ok(Self {
            amadeus: Arc::new(AmadeusClient::new(settings.amadeus.clone())?),
            callsigns: Arc::new(CallsignClient::new(settings.adsb.clone())?),
            videos: Arc::new(VideoClient::new(settings.adsb.clone(), settings.youtube.clone())?),
            rate_client: Arc::new(RateClient::new(settings.rates.clone())?),
            rates: SharedRates::default(),
            reference: Arc::new(reference),
            store,
        })
    }
}

/// `FlightError` rendered as `{ "error": ... }` with a fitting status
#[derive(Debug)]
pub struct ApiError(pub FlightError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            FlightError::MissingInput(_) | FlightError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            FlightError::Upstream { .. } | FlightError::AuthError(_) | FlightError::MalformedPayload(_) => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<FlightError> for ApiError {
    fn from(err: FlightError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    Router::new()
        .route("/api/searchFlights", get(search_flights))
        .route("/api/airports", get(airports))
        .route("/api/route/{callsign}", get(route_by_callsign))
        .route("/api/getFlightVideo", get(flight_video))
        .route("/api/rates", get(rates))
        .route("/api/flight/selected", get(selected).post(select))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Query string of `/api/searchFlights`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub date: Option<String>,
    pub return_date: Option<String>,
    pub adults: Option<String>,
    pub children: Option<String>,
    pub infants: Option<String>,
    pub flight_type: Option<String>,
    pub service_class: Option<String>,
}

impl SearchParams {
    /// Unparseable counts fall back to their defaults; an unknown trip type
    /// is one-way and an unknown cabin is not sent.
    pub fn into_request(self) -> SearchRequest {
        let count = |v: Option<String>| v.and_then(|s| s.trim().parse::<u32>().ok());

        SearchRequest {
            origin: self.origin.unwrap_or_default(),
            destination: self.destination.unwrap_or_default(),
            departure_date: self.date.unwrap_or_default(),
            return_date: self.return_date,
            passengers: Passengers {
                adults: count(self.adults).filter(|n| *n > 0).unwrap_or(1),
                children: count(self.children).unwrap_or(0),
                infants: count(self.infants).unwrap_or(0),
            },
            travel_class: self.service_class.and_then(|s| s.parse::<TravelClass>().ok()),
            trip_type: self
                .flight_type
                .and_then(|s| s.parse::<TripType>().ok())
                .unwrap_or(TripType::OneWay),
        }
    }
}

async fn search_flights(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Flight>>, ApiError> {
    let request = params.into_request();
    let flights = state.amadeus.search_offers(&request).await?;
    Ok(Json(flights))
}

#[derive(Debug, Deserialize)]
struct AirportParams {
    query: Option<String>,
}

/// Always a JSON array; failures are signalled by status only.
async fn airports(State(state): State<AppState>, Query(params): Query<AirportParams>) -> Response {
    let Some(query) = params.query.filter(|q| !q.trim().is_empty()) else {
        return (StatusCode::BAD_REQUEST, Json(json!([]))).into_response();
    };

    match state.amadeus.search_locations(&query).await {
        Ok(locations) => Json(locations).into_response(),
        Err(e) => {
            error!(error = %e, "Airport search failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!([]))).into_response()
        }
    }
}

async fn route_by_callsign(State(state): State<AppState>, Path(callsign): Path<String>) -> Response {
    match state.callsigns.resolve(&callsign).await {
        Ok(info) => Json(info).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "ok": false, "error": e.to_string() })),
        )
            .into_response(),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoParams {
    flight_code: Option<String>,
    airline: Option<String>,
    service_class: Option<String>,
}

async fn flight_video(State(state): State<AppState>, Query(params): Query<VideoParams>) -> Result<Response, ApiError> {
    let result = state
        .videos
        .find(
            params.flight_code.as_deref().unwrap_or(""),
            params.airline.as_deref(),
            params.service_class.as_deref(),
        )
        .await?;
    Ok(Json(result).into_response())
}

/// The table loaded at startup; fixed for the life of the process.
async fn rates(State(state): State<AppState>) -> Json<RateTable> {
    Json(state.rates.snapshot().await)
}

async fn select(State(state): State<AppState>, Json(flight): Json<Flight>) -> Result<StatusCode, ApiError> {
    select_flight(state.store.as_ref(), &flight)?;
    info!(id = ?flight.id, "Flight selected");
    Ok(StatusCode::NO_CONTENT)
}

/// Detail page payload for the stored selection
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedFlightView {
    pub flight: Flight,
    pub card: FlightCard,
    pub detail: FlightDetail,
    pub booking: Option<BookingLinks>,
    pub review: Option<ReviewQuery>,
}

impl SelectedFlightView {
    pub fn build(flight: Flight, reference: &ReferenceData, slug: Option<&str>, adults: u32) -> Self {
        Self {
            card: FlightCard::from_flight(&flight),
            detail: FlightDetail::build(&flight, reference),
            booking: BookingQuery::from_flight(&flight, adults).map(|q| BookingLinks::new(&q)),
            review: slug.map(|s| ReviewQuery::from_flight(&flight, s)),
            flight,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SelectedParams {
    slug: Option<String>,
    adults: Option<u32>,
}

async fn selected(State(state): State<AppState>, Query(params): Query<SelectedParams>) -> Result<Response, ApiError> {
    let Some(flight) = selected_flight(state.store.as_ref())? else {
        warn!("No flight selected");
        return Ok((StatusCode::NOT_FOUND, Json(json!({ "error": "No flight selected" }))).into_response());
    };

    let view = SelectedFlightView::build(
        flight,
        &state.reference,
        params.slug.as_deref(),
        params.adults.unwrap_or(1),
    );
    Ok(Json(view).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_params_defaults() {
        let request = SearchParams {
            origin: Some("YYZ".to_string()),
            destination: Some("LHR".to_string()),
            date: Some("2025-09-06".to_string()),
            adults: Some("abc".to_string()),
            flight_type: Some("multiCity".to_string()),
            service_class: Some("steerage".to_string()),
            ..Default::default()
        }
        .into_request();

        assert_eq!(request.passengers, Passengers::default());
        assert_eq!(request.trip_type, TripType::OneWay);
        assert_eq!(request.travel_class, None);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_search_params_round_trip() {
        let request = SearchParams {
            return_date: Some("2025-09-20".to_string()),
            adults: Some("2".to_string()),
            children: Some("1".to_string()),
            flight_type: Some("roundTrip".to_string()),
            service_class: Some("Premium Economy".to_string()),
            ..Default::default()
        }
        .into_request();

        assert_eq!(request.trip_type, TripType::RoundTrip);
        assert_eq!(request.passengers.adults, 2);
        assert_eq!(request.passengers.children, 1);
        assert_eq!(request.travel_class, Some(TravelClass::PremiumEconomy));
        assert!(matches!(request.validate(), Err(FlightError::MissingInput(_))));
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(ApiError(FlightError::MissingInput("origin".into())).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError(FlightError::Upstream { status: 429, body: String::new() }).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError(FlightError::MissingCredential("youtube.api_key")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_rates_route_serves_loaded_table() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::load_from(dir.path()).unwrap();
        settings.rates.url = "http://127.0.0.1:9/latest".to_string();
        let store = Arc::new(crate::session::MemoryStore::new());
        let state = AppState::new(&settings, ReferenceData::bundled().unwrap(), store).unwrap();

        let loaded = RateTable::new(std::collections::HashMap::from([
            ("USD".to_string(), 1.0),
            ("EUR".to_string(), 0.9),
        ]));
        let Json(first) = rates(State(state.clone())).await;
        assert_eq!(first, RateTable::default());

        let state = AppState {
            rates: SharedRates::new(loaded.clone()),
            ..state
        };
        let Json(served) = rates(State(state)).await;
        assert_eq!(served, loaded);
    }

    #[test]
    fn test_selected_view_without_slug() {
        let reference = ReferenceData::bundled().unwrap();
        let view = SelectedFlightView::build(Flight::default(), &reference, None, 1);
        assert!(view.booking.is_none());
        assert!(view.review.is_none());
        assert!(view.detail.itineraries.is_empty());
    }
}
