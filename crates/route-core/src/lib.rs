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

//! Route import, persistence and map layer state for the trailmap viewer.
//!
//! This library holds everything about the map workflow that does not touch
//! the network. It is organised in layers that can be used independently:
//!
//! - **Document layer**: [`GeoDocument`], a GeoJSON-compatible feature collection
//! - **Import layer**: GPX and KML conversion into a [`GeoDocument`]
//! - **Store layer**: single-slot route persistence and the API key slot, over
//!   a pluggable [`KeyValueBackend`]
//! - **Layer controller**: the four overlay layers, their visibility and the viewport
//!
//! # Quick Start
//!
//! ```
//! use route_core::{import, Dialect, LayerContent, LayerController, LayerId, Viewport};
//!
//! let gpx = r#"<?xml version="1.0"?>
//! <gpx version="1.1" creator="example" xmlns="http://www.topografix.com/GPX/1/1">
//!   <wpt lat="51.5" lon="-0.1"><name>Start</name></wpt>
//! </gpx>"#;
//!
//! let dialect = Dialect::from_file_name("morning-ride.GPX").unwrap();
//! let doc = import(gpx, dialect).unwrap();
//! assert_eq!(doc.features[0].popup_label(), "Start");
//!
//! let mut layers = LayerController::new(Viewport::default());
//! layers.set_layer_content(LayerId::Route, LayerContent::Route(doc));
//! layers.set_visible(LayerId::Route, true);
//! assert!(layers.fit_to_content(LayerId::Route));
//! ```
//!
//! # Persistence
//!
//! ```
//! use route_core::{GeoDocument, MemoryBackend, RouteStore};
//!
//! let mut store = RouteStore::new(MemoryBackend::default());
//! assert!(store.load().unwrap().is_none());
//!
//! store.save(&GeoDocument::default()).unwrap();
//! assert_eq!(store.load().unwrap(), Some(GeoDocument::default()));
//! ```

pub mod document;
pub mod import;
pub mod layers;
pub mod projection;
pub mod store;
pub mod viewport;

pub use document::{DocumentError, Feature, GeoDocument, Geometry, Position, Properties, RouteSummary};
pub use import::{import, Dialect, ImportError};
pub use layers::{LayerContent, LayerController, LayerId, Marker, OverlayLayer, TileOverlay};
pub use projection::WebMercator;
pub use store::{ApiKeyStore, FileBackend, KeyValueBackend, MemoryBackend, RouteStore, StoreError};
pub use viewport::{Bounds, LatLon, Viewport};
