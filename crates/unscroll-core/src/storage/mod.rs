mod config;
pub mod database;

pub use config::Config;
pub use database::{Database, SessionRecord, Stats};

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::DatabaseError;

/// Namespaced key-value persistence.
///
/// The engine only performs read-modify-write on independent keys and
/// never needs multi-key transactions. [`Database`] is the production
/// implementation; [`MemStore`] backs simulations and tests.
pub trait Store {
    fn get(&self, key: &str) -> Result<Option<String>, DatabaseError>;
    fn set(&self, key: &str, value: &str) -> Result<(), DatabaseError>;
}

impl Store for Database {
    fn get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        self.kv_get(key).map_err(DatabaseError::from)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.kv_set(key, value).map_err(DatabaseError::from)
    }
}

/// In-memory store for simulations and tests.
#[derive(Debug, Default)]
pub struct MemStore {
    map: RefCell<HashMap<String, String>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemStore {
    fn get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        Ok(self.map.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.map.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Returns `~/.config/unscroll[-dev]/` based on UNSCROLL_ENV.
///
/// Set UNSCROLL_ENV=dev to use a development data directory.
///
/// # Errors
/// Returns an error if the home directory cannot be determined or if
/// creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("UNSCROLL_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("unscroll-dev")
    } else {
        base_dir.join("unscroll")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
