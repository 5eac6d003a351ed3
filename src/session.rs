//! Selected-flight persistence between the results list and the detail view
//!
//! The store is a plain string key/value map. Exactly one key is used,
//! [`SELECTED_FLIGHT_KEY`], holding the JSON of the flight the user picked.
//! Writes replace the previous value.

use crate::offer::Flight;
use crate::FlightError;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, RwLock};
use tracing::{debug, error};

pub const SELECTED_FLIGHT_KEY: &str = "selectedFlight";

pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, FlightError>;
    fn set(&self, key: &str, value: String) -> Result<(), FlightError>;
    fn remove(&self, key: &str) -> Result<(), FlightError>;
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> FlightError {
    FlightError::StoreError("store lock poisoned".to_string())
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, FlightError> {
        Ok(self.entries.read().map_err(poisoned)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<(), FlightError> {
        self.entries.write().map_err(poisoned)?.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), FlightError> {
        self.entries.write().map_err(poisoned)?.remove(key);
        Ok(())
    }
}

/// Store backed by one JSON object on disk, so a selection survives
/// between CLI invocations.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn read_all(&self) -> Result<HashMap<String, String>, FlightError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(HashMap::new());
        }
        serde_json::from_str(&raw)
            .map_err(|e| FlightError::StoreError(format!("{}: {}", self.path.display(), e)))
    }

    fn write_all(&self, entries: &HashMap<String, String>) -> Result<(), FlightError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(entries)?)?;
        Ok(())
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, FlightError> {
        let _guard = self.lock.lock().map_err(poisoned)?;
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: String) -> Result<(), FlightError> {
        let _guard = self.lock.lock().map_err(poisoned)?;
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value);
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), FlightError> {
        let _guard = self.lock.lock().map_err(poisoned)?;
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

/// Persist `flight` as the current selection, replacing any earlier one.
pub fn select_flight(store: &dyn SessionStore, flight: &Flight) -> Result<(), FlightError> {
    let json = serde_json::to_string(flight)?;
    store.set(SELECTED_FLIGHT_KEY, json)?;
    debug!(id = ?flight.id, "Selected flight stored");
    Ok(())
}

/// The current selection. A value that no longer parses is reported and
/// treated as no selection.
pub fn selected_flight(store: &dyn SessionStore) -> Result<Option<Flight>, FlightError> {
    let Some(raw) = store.get(SELECTED_FLIGHT_KEY)? else {
        return Ok(None);
    };

    match serde_json::from_str::<Flight>(&raw) {
        Ok(flight) => Ok(Some(flight)),
        Err(e) => {
            error!(error = %e, "Stored flight could not be parsed");
            Ok(None)
        }
    }
}

pub fn clear_selection(store: &dyn SessionStore) -> Result<(), FlightError> {
    store.remove(SELECTED_FLIGHT_KEY)
}
