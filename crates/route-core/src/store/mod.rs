// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Key-value persistence for the saved route and the weather API key.
//!
//! Each stored value is a whole string read and written in one operation.
//! The [`KeyValueBackend`] trait abstracts where those strings live so the
//! stores can run against memory in tests and against files in the app.

mod backend;

pub use backend::{FileBackend, KeyValueBackend, MemoryBackend};

use log::{info, warn};
use thiserror::Error;

use crate::document::{DocumentError, GeoDocument};

/// Well-known key of the saved route document.
pub const ROUTE_KEY: &str = "savedRouteGeoJSON";

/// Well-known key of the OpenWeatherMap API key.
pub const API_KEY_KEY: &str = "userOwmApiKey";

/// Errors from persisted state.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("stored data under '{key}' is corrupt and has been removed: {source}")]
    Corrupt {
        key: &'static str,
        #[source]
        source: DocumentError,
    },

    #[error("could not serialize value for '{key}': {source}")]
    Serialize {
        key: &'static str,
        #[source]
        source: DocumentError,
    },

    #[error("storage I/O error for '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

/// Single-slot store for the current route.
///
/// `save` always overwrites; there is exactly one saved route at a time.
#[derive(Debug)]
pub struct RouteStore<B> {
    backend: B,
}

impl<B: KeyValueBackend> RouteStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn save(&mut self, doc: &GeoDocument) -> Result<(), StoreError> {
        let json = doc.to_json().map_err(|source| StoreError::Serialize {
            key: ROUTE_KEY,
            source,
        })?;
        self.backend.set(ROUTE_KEY, &json)?;
        info!("Saved route with {} features", doc.len());
        Ok(())
    }

    /// Load the saved route; `Ok(None)` when nothing was saved.
    ///
    /// A payload that does not parse as a valid document is removed before
    /// the error is returned, so the following load reports nothing saved.
    pub fn load(&mut self) -> Result<Option<GeoDocument>, StoreError> {
        let Some(json) = self.backend.get(ROUTE_KEY)? else {
            return Ok(None);
        };

        match GeoDocument::from_json(&json) {
            Ok(doc) => Ok(Some(doc)),
            Err(source) => {
                warn!("Saved route is corrupt, removing it: {}", source);
                self.backend.remove(ROUTE_KEY)?;
                Err(StoreError::Corrupt {
                    key: ROUTE_KEY,
                    source,
                })
            }
        }
    }

    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.backend.remove(ROUTE_KEY)
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

/// Slot for the user-supplied OpenWeatherMap API key.
#[derive(Debug)]
pub struct ApiKeyStore<B> {
    backend: B,
}

impl<B: KeyValueBackend> ApiKeyStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn load(&self) -> Result<Option<String>, StoreError> {
        Ok(self.backend.get(API_KEY_KEY)?.and_then(normalize_key))
    }

    /// Save a key; a blank key clears the slot instead.
    ///
    /// Returns the key that is now stored.
    pub fn save(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        match normalize_key(key.to_string()) {
            Some(key) => {
                self.backend.set(API_KEY_KEY, &key)?;
                info!("Saved OpenWeatherMap API key");
                Ok(Some(key))
            }
            None => {
                self.clear()?;
                Ok(None)
            }
        }
    }

    pub fn clear(&mut self) -> Result<(), StoreError> {
        info!("Cleared OpenWeatherMap API key");
        self.backend.remove(API_KEY_KEY)
    }
}

fn normalize_key(key: String) -> Option<String> {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == key.len() {
        Some(key)
    } else {
        Some(trimmed.to_string())
    }
}
