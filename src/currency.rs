//! Currency conversion against a USD-based rate table

use crate::settings::RatesSettings;
use crate::FlightError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

/// Reference currency the rate provider quotes against
pub const BASE_CURRENCY: &str = "USD";

/// Currencies offered by the selector
pub const SUPPORTED_CURRENCIES: [&str; 6] = ["USD", "CAD", "EUR", "GBP", "INR", "JPY"];

/// Currency code -> units per one USD
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RateTable(HashMap<String, f64>);

impl Default for RateTable {
    fn default() -> Self {
        Self(HashMap::from([(BASE_CURRENCY.to_string(), 1.0)]))
    }
}

impl RateTable {
    pub fn new(rates: HashMap<String, f64>) -> Self {
        Self(rates)
    }

    /// Re-express quotes made against `base` as units per one USD.
    pub fn from_quotes(base: &str, mut quotes: HashMap<String, f64>) -> Result<Self, FlightError> {
        let base = base.trim().to_uppercase();
        if base == BASE_CURRENCY {
            return Ok(Self(quotes));
        }

        quotes.entry(base.clone()).or_insert(1.0);
        let usd = quotes
            .get(BASE_CURRENCY)
            .copied()
            .filter(|r| r.is_finite() && *r > 0.0)
            .ok_or_else(|| {
                FlightError::MalformedPayload(format!("rates quoted against {} carry no usable USD rate", base))
            })?;

        Ok(Self(quotes.into_iter().map(|(code, rate)| (code, rate / usd)).collect()))
    }

    /// Usable rate for `code`. Unknown codes and rates that could not be
    /// divided by (zero, negative, non-finite) read as absent.
    pub fn rate(&self, code: &str) -> Option<f64> {
        self.0.get(code).copied().filter(|r| r.is_finite() && *r > 0.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Convert `amount` from one currency to another through the base currency.
/// A currency missing from the table is assumed to be at par with USD.
pub fn convert_amount(amount: f64, from: &str, to: &str, rates: &RateTable) -> f64 {
    let in_base = if from == BASE_CURRENCY {
        amount
    } else {
        amount / rates.rate(from).unwrap_or(1.0)
    };
    in_base * rates.rate(to).unwrap_or(1.0)
}

/// Convert and wrap the result for display in the target currency.
pub fn convert(amount: f64, from: &str, to: &str, rates: &RateTable) -> Money {
    Money {
        amount: convert_amount(amount, from, to, rates),
        currency: to.to_string(),
    }
}

/// Amount in a given currency, displayed as `$1,234.56`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Money {
    pub amount: f64,
    pub currency: String,
}

impl Money {
    pub fn symbol(&self) -> String {
        match self.currency.as_str() {
            "USD" => "$".to_string(),
            "CAD" => "CA$".to_string(),
            "EUR" => "€".to_string(),
            "GBP" => "£".to_string(),
            "INR" => "₹".to_string(),
            "JPY" => "¥".to_string(),
            other => format!("{} ", other),
        }
    }

    /// Grouped amount with two decimals and no symbol, e.g. `1,234.50`
    pub fn plain(&self) -> String {
        let fixed = format!("{:.2}", self.amount.abs());
        let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

        let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
        for (i, digit) in int_part.chars().enumerate() {
            if i > 0 && (int_part.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(digit);
        }

        let sign = if self.amount < 0.0 && fixed.chars().any(|c| c != '0' && c != '.') {
            "-"
        } else {
            ""
        };
        format!("{}{}.{}", sign, grouped, frac_part)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plain = self.plain();
        match plain.strip_prefix('-') {
            Some(unsigned) => write!(f, "-{}{}", self.symbol(), unsigned),
            None => write!(f, "{}{}", self.symbol(), plain),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    base: Option<String>,
    rates: Option<HashMap<String, f64>>,
}

/// Client for the exchange-rate provider
pub struct RateClient {
    http_client: Client,
    settings: RatesSettings,
}

impl RateClient {
    pub fn new(settings: RatesSettings) -> Result<Self, FlightError> {
        let http_client = Client::builder().build()?;
        Ok(Self { http_client, settings })
    }

    /// Fetch the latest table for the configured base currency
    #[instrument(level = "debug", skip(self), fields(base = %self.settings.base))]
    pub async fn latest(&self) -> Result<RateTable, FlightError> {
        let response = self
            .http_client
            .get(&self.settings.url)
            .query(&[("base", self.settings.base.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FlightError::Upstream { status: status.as_u16(), body });
        }

        let payload: RatesResponse = response.json().await?;
        let rates = payload
            .rates
            .ok_or_else(|| FlightError::MalformedPayload("rate response has no `rates`".to_string()))?;
        let base = payload.base.unwrap_or_else(|| self.settings.base.clone());

        debug!(currencies = rates.len(), quoted_against = %base, "Fetched exchange rates");
        RateTable::from_quotes(&base, rates)
    }

    /// Replace `table` with fresh rates; on any failure keep what is there.
    pub async fn refresh(&self, table: &mut RateTable) {
        match self.latest().await {
            Ok(fresh) => {
                info!(currencies = fresh.len(), "Exchange rates refreshed");
                *table = fresh;
            }
            Err(e) => {
                warn!(error = %e, "Exchange rate fetch failed, keeping previous rates");
            }
        }
    }
}

/// Session rate table shared between request handlers.
///
/// Readers never wait on the network: a fetch runs without holding the
/// lock and the fresh table is swapped in afterwards.
#[derive(Debug, Clone, Default)]
pub struct SharedRates(Arc<RwLock<RateTable>>);

impl SharedRates {
    pub fn new(table: RateTable) -> Self {
        Self(Arc::new(RwLock::new(table)))
    }

    pub async fn snapshot(&self) -> RateTable {
        self.0.read().await.clone()
    }

    /// Fetch and install fresh rates; on failure the current table stays.
    pub async fn load(&self, client: &RateClient) -> RateTable {
        match client.latest().await {
            Ok(fresh) => {
                info!(currencies = fresh.len(), "Exchange rates loaded");
                *self.0.write().await = fresh.clone();
                fresh
            }
            Err(e) => {
                warn!(error = %e, "Exchange rate fetch failed, keeping current rates");
                self.snapshot().await
            }
        }
    }

    /// Current table, fetching first if only the USD default is present.
    pub async fn get_or_load(&self, client: &RateClient) -> RateTable {
        let current = self.snapshot().await;
        if current.len() > 1 {
            return current;
        }
        self.load(client).await
    }
}
