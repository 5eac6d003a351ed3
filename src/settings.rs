//! Layered configuration
//!
//! Built-in defaults, then `config/default` and `config/local` when present,
//! then `FLIGHT_SCOUT__SECTION__KEY` environment variables.

use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub amadeus: AmadeusSettings,
    pub adsb: AdsbSettings,
    pub youtube: YoutubeSettings,
    pub rates: RatesSettings,
    #[serde(default)]
    pub data: DataSettings,
    pub session: SessionSettings,
    pub server: ServerSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AmadeusSettings {
    pub base_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub max_results: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AdsbSettings {
    pub adsbdb_url: String,
    pub opensky_url: String,
    pub user_agent: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct YoutubeSettings {
    pub api_url: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RatesSettings {
    pub url: String,
    pub base: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DataSettings {
    pub airports_path: Option<String>,
    pub aircraft_path: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionSettings {
    pub store_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub port: u16,
}

impl Settings {
    /// Load from `config/` in the working directory plus the environment.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(Path::new("config"))
    }

    pub fn load_from(dir: &Path) -> Result<Self, config::ConfigError> {
        let s = Self::defaults()?
            .add_source(config::File::from(dir.join("default")).required(false))
            .add_source(config::File::from(dir.join("local")).required(false))
            .add_source(config::Environment::with_prefix("FLIGHT_SCOUT").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
        config::Config::builder()
            .set_default("amadeus.base_url", "https://test.api.amadeus.com")?
            .set_default("amadeus.max_results", 20)?
            .set_default("adsb.adsbdb_url", "https://api.adsbdb.com/v0")?
            .set_default("adsb.opensky_url", "https://opensky-network.org/api")?
            .set_default("adsb.user_agent", concat!("flight-scout/", env!("CARGO_PKG_VERSION")))?
            .set_default("youtube.api_url", "https://www.googleapis.com/youtube/v3")?
            .set_default("rates.url", "https://api.exchangerate.host/latest")?
            .set_default("rates.base", "USD")?
            .set_default("session.store_path", "selected_flight.json")?
            .set_default("server.port", 3000)
    }
}
