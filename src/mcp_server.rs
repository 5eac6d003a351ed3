// src/mcp_server.rs

use rmcp::{
    ServerHandler, ServiceExt,
    model::{ServerCapabilities, ServerInfo},
    schemars, tool,
    transport::stdio,
};
use flight_scout::booking::{BookingLinks, BookingQuery};
use flight_scout::callsign::CallsignClient;
use flight_scout::currency::{convert, RateClient, RateTable, SharedRates, BASE_CURRENCY};
use flight_scout::session::{select_flight, selected_flight, MemoryStore};
use flight_scout::video::VideoClient;
use flight_scout::view::{detail_slug, FlightCard, FlightDetail, ReviewQuery};
use flight_scout::{
    AmadeusClient, Flight, FlightError, Passengers, ReferenceData, SearchRequest, Settings, TravelClass, TripType,
};
use serde::Deserialize;
use anyhow::Result;
use tracing::{info, warn, error, debug};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Flight search MCP server
#[derive(Clone)]
pub struct FlightServer {
    amadeus: Arc<AmadeusClient>,
    callsigns: Arc<CallsignClient>,
    videos: Arc<VideoClient>,
    rate_client: Arc<RateClient>,
    rates: SharedRates,
    reference: Arc<ReferenceData>,
    store: Arc<MemoryStore>,
    last_results: Arc<Mutex<Vec<Flight>>>,
}

impl FlightServer {
    pub fn new(settings: &Settings) -> Result<Self, FlightError> {
        Ok(Self {
            amadeus: Arc::new(AmadeusClient::new(settings.amadeus.clone())?),
            callsigns: Arc::new(CallsignClient::new(settings.adsb.clone())?),
            videos: Arc::new(VideoClient::new(settings.adsb.clone(), settings.youtube.clone())?),
            rate_client: Arc::new(RateClient::new(settings.rates.clone())?),
            rates: SharedRates::default(),
            reference: Arc::new(ReferenceData::load(&settings.data)?),
            store: Arc::new(MemoryStore::new()),
            last_results: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Initialize logging to file
    fn init_logging() -> Result<()> {
        let log_dir = PathBuf::from("logs");
        std::fs::create_dir_all(&log_dir)?;

        let file_appender = tracing_appender::rolling::daily(&log_dir, "flight-scout-mcp.log");

        tracing_subscriber::registry()
            .with(
                EnvFilter::new("info")
                    .add_directive("flight_scout=debug".parse()?)
                    .add_directive("reqwest=info".parse()?)
            )
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(file_appender)
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .json()
            )
            .init();

        info!("Logging initialized - logs will be written to logs/flight-scout-mcp.log.*");
        Ok(())
    }

    async fn current_rates(&self) -> RateTable {
        self.rates.get_or_load(&self.rate_client).await
    }
}

fn error_json(context: &str, e: impl std::fmt::Display) -> String {
    serde_json::json!({ "error": format!("{}: {}", context, e) }).to_string()
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| error_json("Failed to serialize results", e))
}

#[derive(Debug, Deserialize, Clone, schemars::JsonSchema)]
pub struct FlightSearchParams {
    #[schemars(description = "Origin airport IATA code (e.g., YYZ)")]
    pub origin: String,
    #[schemars(description = "Destination airport IATA code (e.g., LHR)")]
    pub destination: String,
    #[schemars(description = "Departure date in YYYY-MM-DD format")]
    pub departure_date: String,
    #[schemars(description = "Return date in YYYY-MM-DD format for round trips")]
    pub return_date: Option<String>,
    #[schemars(description = "Number of adult passengers (default 1)")]
    pub adults: Option<u32>,
    #[schemars(description = "Number of child passengers")]
    pub children: Option<u32>,
    #[schemars(description = "Number of infants")]
    pub infants: Option<u32>,
    #[schemars(description = "Travel class: economy, premium economy, business, first")]
    pub travel_class: Option<String>,
    #[schemars(description = "Trip type: one-way or round-trip")]
    pub trip_type: Option<String>,
    #[schemars(description = "Currency code to show converted prices in (USD, CAD, EUR, GBP, INR, JPY)")]
    pub currency: Option<String>,
}

impl FlightSearchParams {
    fn into_request(self) -> Result<SearchRequest, FlightError> {
        let trip_type = match (&self.trip_type, &self.return_date) {
            (Some(t), _) => t.parse::<TripType>()?,
            (None, Some(_)) => TripType::RoundTrip,
            (None, None) => TripType::OneWay,
        };
        let travel_class = self.travel_class.as_deref().map(str::parse::<TravelClass>).transpose()?;

        Ok(SearchRequest {
            origin: self.origin,
            destination: self.destination,
            departure_date: self.departure_date,
            return_date: self.return_date,
            passengers: Passengers {
                adults: self.adults.unwrap_or(1),
                children: self.children.unwrap_or(0),
                infants: self.infants.unwrap_or(0),
            },
            travel_class,
            trip_type,
        })
    }
}

#[derive(Debug, Deserialize, Clone, schemars::JsonSchema)]
pub struct AirportQuery {
    #[schemars(description = "Airport or city name fragment (e.g., 'toron')")]
    pub query: String,
}

#[derive(Debug, Deserialize, Clone, schemars::JsonSchema)]
pub struct CallsignQuery {
    #[schemars(description = "Flight callsign or flight code (e.g., ACA856, AC856)")]
    pub callsign: String,
}

#[derive(Debug, Deserialize, Clone, schemars::JsonSchema)]
pub struct VideoQuery {
    #[schemars(description = "Flight code (e.g., AC856)")]
    pub flight_code: String,
    #[schemars(description = "Airline name or code; looked up from the flight code when omitted")]
    pub airline: Option<String>,
    #[schemars(description = "Service class, e.g. 'business class'")]
    pub service_class: Option<String>,
}

#[derive(Debug, Deserialize, Clone, schemars::JsonSchema)]
pub struct ConvertParams {
    #[schemars(description = "Amount to convert")]
    pub amount: f64,
    #[schemars(description = "Source currency code (default USD)")]
    pub from: Option<String>,
    #[schemars(description = "Target currency code")]
    pub to: String,
}

#[derive(Debug, Deserialize, Clone, schemars::JsonSchema)]
pub struct SelectParams {
    #[schemars(description = "0-based index into the results of the last search_flights call")]
    pub index: usize,
}

#[derive(Debug, Deserialize, Clone, schemars::JsonSchema)]
pub struct BookingParams {
    #[schemars(description = "Number of adult passengers (default 1)")]
    pub adults: Option<u32>,
}

#[tool(tool_box)]
impl FlightServer {
    #[tool(description = "Search flight offers between two airports. Results are numbered; use select_flight with an index to pick one.")]
    async fn search_flights(
        &self,
        #[tool(aggr)] params: FlightSearchParams,
    ) -> String {
        info!(
            origin = params.origin,
            destination = params.destination,
            departure_date = params.departure_date,
            return_date = params.return_date.as_deref(),
            adults = params.adults.unwrap_or(1),
            travel_class = params.travel_class.as_deref(),
            "Flight search request received"
        );

        let currency = params.currency.clone().map(|c| c.to_uppercase());
        let request = match params.into_request() {
            Ok(request) => request,
            Err(e) => {
                warn!("Invalid search parameters: {}", e);
                return error_json("Invalid search parameters", e);
            }
        };

        let flights = match self.amadeus.search_offers(&request).await {
            Ok(flights) => flights,
            Err(e) => {
                error!("Flight search failed: {}", e);
                return error_json("Flight search failed", e);
            }
        };

        let rates = match &currency {
            Some(_) => self.current_rates().await,
            None => RateTable::default(),
        };

        let results: Vec<serde_json::Value> = flights
            .iter()
            .enumerate()
            .map(|(index, flight)| {
                let converted = currency.as_deref().and_then(|target| {
                    let price = flight.price.as_ref()?;
                    let from = price.currency.as_deref().unwrap_or(BASE_CURRENCY);
                    Some(convert(price.total_amount()?, from, target, &rates).to_string())
                });
                serde_json::json!({
                    "index": index,
                    "card": FlightCard::from_flight(flight),
                    "converted_price": converted,
                })
            })
            .collect();

        info!(flights_found = flights.len(), "Flight search completed successfully");
        *self.last_results.lock().await = flights;

        to_json(&serde_json::json!({
            "total_flights": results.len(),
            "flights": results,
        }))
    }

    #[tool(description = "Suggest airports and cities matching a keyword")]
    async fn search_airports(
        &self,
        #[tool(aggr)] params: AirportQuery,
    ) -> String {
        match self.amadeus.search_locations(&params.query).await {
            Ok(locations) => to_json(&locations),
            Err(e) => {
                error!("Airport search failed: {}", e);
                error_json("Airport search failed", e)
            }
        }
    }

    #[tool(description = "Look up the live route and aircraft (with photo) for a callsign")]
    async fn lookup_callsign(
        &self,
        #[tool(aggr)] params: CallsignQuery,
    ) -> String {
        match self.callsigns.resolve(&params.callsign).await {
            Ok(info) => to_json(&info),
            Err(e) => error_json("Callsign lookup failed", e),
        }
    }

    #[tool(description = "Find a trip-report review video for a flight")]
    async fn find_review_video(
        &self,
        #[tool(aggr)] params: VideoQuery,
    ) -> String {
        match self
            .videos
            .find(&params.flight_code, params.airline.as_deref(), params.service_class.as_deref())
            .await
        {
            Ok(result) => to_json(&result),
            Err(e) => {
                error!("Video lookup failed: {}", e);
                error_json("Video lookup failed", e)
            }
        }
    }

    #[tool(description = "Convert an amount between currencies at the latest exchange rates")]
    async fn convert_price(
        &self,
        #[tool(aggr)] params: ConvertParams,
    ) -> String {
        let rates = self.current_rates().await;
        let from = params.from.as_deref().unwrap_or(BASE_CURRENCY).to_uppercase();
        let money = convert(params.amount, &from, &params.to.to_uppercase(), &rates);
        serde_json::json!({
            "amount": money.amount,
            "currency": money.currency,
            "display": money.to_string(),
        })
        .to_string()
    }

    #[tool(description = "Select one flight from the last search results for detail and booking tools")]
    async fn select_flight(
        &self,
        #[tool(aggr)] params: SelectParams,
    ) -> String {
        let results = self.last_results.lock().await;
        let Some(flight) = results.get(params.index) else {
            warn!(index = params.index, available = results.len(), "Selection out of range");
            return error_json("Invalid selection", format!("no result at index {}", params.index));
        };

        match select_flight(self.store.as_ref(), flight) {
            Ok(()) => {
                debug!(index = params.index, "Flight selected");
                serde_json::json!({ "selected": params.index, "id": flight.id }).to_string()
            }
            Err(e) => error_json("Selection failed", e),
        }
    }

    #[tool(description = "Detail view of the selected flight: segments, layovers, aircraft, map markers and route distance")]
    async fn selected_flight_detail(&self) -> String {
        let flight = match selected_flight(self.store.as_ref()) {
            Ok(Some(flight)) => flight,
            Ok(None) => return r#"{"error": "No flight selected"}"#.to_string(),
            Err(e) => return error_json("Could not read selection", e),
        };

        let review = detail_slug(&flight).map(|slug| ReviewQuery::from_flight(&flight, &slug));
        to_json(&serde_json::json!({
            "card": FlightCard::from_flight(&flight),
            "detail": FlightDetail::build(&flight, &self.reference),
            "review": review,
        }))
    }

    #[tool(description = "Kayak and Skyscanner links for the selected flight")]
    async fn booking_links(
        &self,
        #[tool(aggr)] params: BookingParams,
    ) -> String {
        let flight = match selected_flight(self.store.as_ref()) {
            Ok(Some(flight)) => flight,
            Ok(None) => return r#"{"error": "No flight selected"}"#.to_string(),
            Err(e) => return error_json("Could not read selection", e),
        };

        match BookingQuery::from_flight(&flight, params.adults.unwrap_or(1)) {
            Some(query) => to_json(&BookingLinks::new(&query)),
            None => r#"{"error": "Selected flight has no outbound segments"}"#.to_string(),
        }
    }
}

#[tool(tool_box)]
impl ServerHandler for FlightServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some("A flight search server. Search offers, select one, then ask for its detail view, booking links, review video or the live route of its callsign.".into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = FlightServer::init_logging() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    info!("Starting MCP Flight Scout server");

    let settings = Settings::load()?;
    let server = FlightServer::new(&settings)?;
    let transport = stdio();

    let service = server.serve(transport).await?;
    info!("MCP service started, waiting for requests");

    service.waiting().await?;

    info!("MCP service shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> FlightSearchParams {
        FlightSearchParams {
            origin: "YYZ".to_string(),
            destination: "LHR".to_string(),
            departure_date: "2025-09-06".to_string(),
            return_date: None,
            adults: None,
            children: None,
            infants: None,
            travel_class: None,
            trip_type: None,
            currency: None,
        }
    }

    #[test]
    fn test_search_params_infer_trip_type() {
        let request = params().into_request().unwrap();
        assert_eq!(request.trip_type, TripType::OneWay);
        assert_eq!(request.passengers.adults, 1);

        let mut round = params();
        round.return_date = Some("2025-09-20".to_string());
        assert_eq!(round.into_request().unwrap().trip_type, TripType::RoundTrip);
    }

    #[test]
    fn test_search_params_reject_unknown_class() {
        let mut bad = params();
        bad.travel_class = Some("steerage".to_string());
        assert!(bad.into_request().is_err());
    }

    #[test]
    fn test_error_json_shape() {
        let json: serde_json::Value = serde_json::from_str(&error_json("Flight search failed", "boom")).unwrap();
        assert_eq!(json["error"], "Flight search failed: boom");
    }
}
