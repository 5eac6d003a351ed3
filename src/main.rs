//! CLI interface for flight-scout

use clap::{Parser, Subcommand};
use flight_scout::booking::{BookingLinks, BookingQuery};
use flight_scout::callsign::CallsignClient;
use flight_scout::currency::{convert, RateClient, RateTable, BASE_CURRENCY};
use flight_scout::session::{select_flight, selected_flight, FileStore};
use flight_scout::video::VideoClient;
use flight_scout::view::{detail_slug, FlightCard, FlightDetail, ReviewQuery};
use flight_scout::{
    AmadeusClient, Passengers, ReferenceData, SearchRequest, Settings, TravelClass, TripType,
};
use std::fs;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "flight-scout")]
#[command(about = "Search flight offers and explore a selected flight")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search for flight offers
    Search {
        /// Origin airport code
        #[arg(short, long)]
        from: String,
        /// Destination airport code
        #[arg(short, long)]
        to: String,
        /// Departure date (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,
        /// Return date for round trips (YYYY-MM-DD)
        #[arg(short, long)]
        return_date: Option<String>,
        /// Number of adults
        #[arg(long, default_value = "1")]
        adults: u32,
        /// Number of children
        #[arg(long, default_value = "0")]
        children: u32,
        /// Number of infants
        #[arg(long, default_value = "0")]
        infants: u32,
        /// Travel class (economy, premium-economy, business, first)
        #[arg(long)]
        class: Option<String>,
        /// Trip type (one-way, round-trip)
        #[arg(long, default_value = "one-way")]
        trip_type: String,
        /// Show prices converted to this currency
        #[arg(long, env = "FLIGHT_SCOUT_CURRENCY")]
        currency: Option<String>,
        /// Store the N-th result (0-based) as the selected flight
        #[arg(long)]
        select: Option<usize>,
        /// Output file for JSON results
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Suggest airports and cities for a keyword
    Airports {
        query: String,
    },
    /// Live route and aircraft for a callsign
    Callsign {
        callsign: String,
    },
    /// Find a trip-report video
    Video {
        #[arg(long)]
        flight_code: String,
        #[arg(long)]
        airline: Option<String>,
        #[arg(long)]
        service_class: Option<String>,
    },
    /// Convert an amount between currencies at the latest rates
    Convert {
        amount: f64,
        #[arg(long, default_value = BASE_CURRENCY)]
        from: String,
        #[arg(long)]
        to: String,
    },
    /// Detail view of the selected flight
    Detail,
    /// Booking links for the selected flight
    Links {
        #[arg(long, default_value = "1")]
        adults: u32,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("flight_scout=info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::load()?;
    let store = FileStore::new(&settings.session.store_path);

    match cli.command {
        Commands::Search {
            from,
            to,
            date,
            return_date,
            adults,
            children,
            infants,
            class,
            trip_type,
            currency,
            select,
            output,
        } => {
            let trip_type = if return_date.is_some() {
                TripType::RoundTrip
            } else {
                trip_type.parse::<TripType>()?
            };
            let travel_class = class.map(|c| c.parse::<TravelClass>()).transpose()?;

            let request = SearchRequest {
                origin: from,
                destination: to,
                departure_date: date,
                return_date,
                passengers: Passengers { adults, children, infants },
                travel_class,
                trip_type,
            };

            let client = AmadeusClient::new(settings.amadeus.clone())?;
            println!("Searching for flights...");
            let flights = match client.search_offers(&request).await {
                Ok(flights) => flights,
                Err(e) => {
                    eprintln!("Error searching for flights: {}", e);
                    std::process::exit(1);
                }
            };

            let json = serde_json::to_string_pretty(&flights)?;
            if let Some(output_file) = output {
                fs::write(&output_file, &json)?;
                println!("Results saved to {}", output_file);
            } else {
                println!("{}", json);
            }

            let rates = match &currency {
                Some(_) => {
                    let mut table = RateTable::default();
                    RateClient::new(settings.rates.clone())?.refresh(&mut table).await;
                    table
                }
                None => RateTable::default(),
            };

            println!("\nFound {} flights", flights.len());
            for (i, flight) in flights.iter().enumerate() {
                let card = FlightCard::from_flight(flight);
                let stops = card.outbound.as_ref().map(|o| o.stops_label.as_str()).unwrap_or("");
                let shown = match (&currency, flight.price.as_ref()) {
                    (Some(target), Some(price)) => match price.total_amount() {
                        Some(amount) => {
                            let from = price.currency.as_deref().unwrap_or(BASE_CURRENCY);
                            convert(amount, from, target, &rates).to_string()
                        }
                        None => card.price_label.clone(),
                    },
                    _ => card.price_label.clone(),
                };
                println!("[{}] {} {} - {}", i, card.carrier, stops, shown);
            }

            if let Some(index) = select {
                match flights.get(index) {
                    Some(flight) => {
                        select_flight(&store, flight)?;
                        println!("Selected flight {}", index);
                    }
                    None => eprintln!("No result at index {}", index),
                }
            }
        }
        Commands::Airports { query } => {
            let client = AmadeusClient::new(settings.amadeus)?;
            let locations = client.search_locations(&query).await?;
            println!("{}", serde_json::to_string_pretty(&locations)?);
        }
        Commands::Callsign { callsign } => {
            let client = CallsignClient::new(settings.adsb)?;
            let info = client.resolve(&callsign).await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Commands::Video {
            flight_code,
            airline,
            service_class,
        } => {
            let client = VideoClient::new(settings.adsb, settings.youtube)?;
            let result = client
                .find(&flight_code, airline.as_deref(), service_class.as_deref())
                .await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Convert { amount, from, to } => {
            let mut rates = RateTable::default();
            RateClient::new(settings.rates)?.refresh(&mut rates).await;
            println!("{}", convert(amount, &from.to_uppercase(), &to.to_uppercase(), &rates));
        }
        Commands::Detail => {
            let Some(flight) = selected_flight(&store)? else {
                eprintln!("No flight selected. Run `search --select N` first.");
                std::process::exit(1);
            };
            let reference = ReferenceData::load(&settings.data)?;
            let detail = FlightDetail::build(&flight, &reference);
            println!("{}", serde_json::to_string_pretty(&detail)?);

            if let Some(slug) = detail_slug(&flight) {
                let review = ReviewQuery::from_flight(&flight, &slug);
                println!("\nReview lookup: {} {} {}", review.flight_code, review.airline, review.service_class);
            }
        }
        Commands::Links { adults } => {
            let Some(flight) = selected_flight(&store)? else {
                eprintln!("No flight selected. Run `search --select N` first.");
                std::process::exit(1);
            };
            match BookingQuery::from_flight(&flight, adults) {
                Some(query) => println!("{}", serde_json::to_string_pretty(&BookingLinks::new(&query))?),
                None => eprintln!("Selected flight has no outbound segments"),
            }
        }
    }

    Ok(())
}
