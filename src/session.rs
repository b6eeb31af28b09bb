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

//! Map session state and control panel actions.
//!
//! A [`MapSession`] owns the layer controller, both stores and the weather
//! credential. It is driven from a single task: user actions call its
//! methods directly, and weather fetches run on spawned tasks that report
//! back through [`SessionEvent`]s fed to [`MapSession::handle_event`].
//!
//! Every weather request gets a new generation number and cancels the one
//! before it. A response is rendered only if its generation is still the
//! latest, so a slow answer for an old viewport never overwrites a newer one.

use std::sync::Arc;

use chrono::{DateTime, Local};
use log::{debug, info};
use route_core::{
    import, ApiKeyStore, Dialect, GeoDocument, KeyValueBackend, LatLon, LayerContent, LayerController,
    LayerId, Marker, RouteStore, RouteSummary, Viewport,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::AppError;
use crate::gas::GasPriceProvider;
use crate::map::NexradRadarSource;
use crate::network::HttpTransport;
use crate::weather::{WeatherClient, WeatherError, WeatherObservation};

const EVENT_BUFFER: usize = 16;

/// Zoom used when centering on the user's position
pub const LOCATE_ZOOM: u8 = 15;

pub const LOCATION_LABEL: &str = "You are here!";

/// Results delivered back to the session task.
#[derive(Debug)]
pub enum SessionEvent {
    WeatherFetched {
        generation: u64,
        result: Result<Vec<WeatherObservation>, WeatherError>,
    },
}

/// What handling an event changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// The weather layer now shows this many stations.
    WeatherUpdated { stations: usize },
    /// A superseded response was dropped.
    Stale,
}

/// Application state behind the map and its control panel.
pub struct MapSession<B, T> {
    layers: LayerController,
    routes: RouteStore<B>,
    api_keys: ApiKeyStore<B>,
    api_key: Option<String>,
    weather: Arc<WeatherClient<T>>,
    gas: Box<dyn GasPriceProvider>,
    weather_generation: u64,
    in_flight: Option<CancellationToken>,
    event_tx: mpsc::Sender<SessionEvent>,
    event_rx: mpsc::Receiver<SessionEvent>,
    location: Option<Marker>,
    last_weather_update: Option<DateTime<Local>>,
}

impl<B, T> std::fmt::Debug for MapSession<B, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapSession")
            .field("viewport", self.layers.viewport())
            .field("has_api_key", &self.api_key.is_some())
            .field("weather_generation", &self.weather_generation)
            .finish_non_exhaustive()
    }
}

impl<B, T> MapSession<B, T>
where
    B: KeyValueBackend + Clone,
    T: HttpTransport,
{
    /// Open a session over `backend`, restoring the saved API key.
    pub fn new(
        backend: B,
        weather: WeatherClient<T>,
        gas: Box<dyn GasPriceProvider>,
        viewport: Viewport,
    ) -> Result<Self, AppError> {
        let api_keys = ApiKeyStore::new(backend.clone());
        let api_key = api_keys.load()?;
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);

        Ok(Self {
            layers: LayerController::new(viewport),
            routes: RouteStore::new(backend),
            api_keys,
            api_key,
            weather: Arc::new(weather),
            gas,
            weather_generation: 0,
            in_flight: None,
            event_tx,
            event_rx,
            location: None,
            last_weather_update: None,
        })
    }

    /// Key to use when none was saved, e.g. from the config file.
    #[must_use]
    pub fn with_fallback_api_key(mut self, key: Option<String>) -> Self {
        if self.api_key.is_none() {
            self.api_key = key;
        }
        self
    }

    #[must_use]
    pub fn layers(&self) -> &LayerController {
        &self.layers
    }

    #[must_use]
    pub fn viewport(&self) -> &Viewport {
        self.layers.viewport()
    }

    #[must_use]
    pub fn location_marker(&self) -> Option<&Marker> {
        self.location.as_ref()
    }

    #[must_use]
    pub fn last_weather_update(&self) -> Option<DateTime<Local>> {
        self.last_weather_update
    }

    // Routes

    /// Import a GPX or KML file, replacing the route layer and framing it.
    pub fn import_route(&mut self, file_name: &str, raw_text: &str) -> Result<RouteSummary, AppError> {
        let dialect = Dialect::from_file_name(file_name)?;
        let doc = import(raw_text, dialect)?;
        info!("Route loaded successfully from {}", file_name);
        Ok(self.show_route(doc))
    }

    /// Persist the displayed route. Returns `false` when there is none.
    pub fn save_current_route(&mut self) -> Result<bool, AppError> {
        let LayerContent::Route(doc) = self.layers.content(LayerId::Route) else {
            info!("No current route to save");
            return Ok(false);
        };
        self.routes.save(doc)?;
        Ok(true)
    }

    /// Show the saved route. `Ok(None)` when nothing is saved.
    ///
    /// A corrupt saved route is removed and reported as an error.
    pub fn load_saved_route(&mut self) -> Result<Option<RouteSummary>, AppError> {
        match self.routes.load()? {
            Some(doc) => {
                info!("Route loaded from storage");
                Ok(Some(self.show_route(doc)))
            }
            None => {
                info!("No saved route found");
                Ok(None)
            }
        }
    }

    pub fn clear_saved_route(&mut self) -> Result<(), AppError> {
        self.routes.clear()?;
        Ok(())
    }

    fn show_route(&mut self, doc: GeoDocument) -> RouteSummary {
        let summary = doc.summary();
        self.layers.set_layer_content(LayerId::Route, LayerContent::Route(doc));
        self.layers.set_visible(LayerId::Route, true);
        self.fit_route();
        summary
    }

    /// Frame the route layer. Returns `false` when there is no route geometry.
    pub fn fit_route(&mut self) -> bool {
        let fitted = self.layers.fit_to_content(LayerId::Route);
        if fitted {
            self.after_viewport_change();
        }
        fitted
    }

    // Weather credential

    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// The weather toggle can only be switched on with a key present.
    #[must_use]
    pub fn weather_toggle_available(&self) -> bool {
        self.api_key.is_some()
    }

    /// Save a new key. A blank key clears it instead; returns whether a key is now set.
    pub fn save_api_key(&mut self, key: &str) -> Result<bool, AppError> {
        match self.api_keys.save(key)? {
            Some(key) => {
                self.api_key = Some(key);
                Ok(true)
            }
            None => {
                self.forget_api_key();
                Ok(false)
            }
        }
    }

    pub fn clear_api_key(&mut self) -> Result<(), AppError> {
        self.api_keys.clear()?;
        self.forget_api_key();
        Ok(())
    }

    fn forget_api_key(&mut self) {
        self.api_key = None;
        if self.weather_enabled() {
            info!("API key cleared, weather layer disabled");
        }
        self.disable_weather();
    }

    // Toggles

    #[must_use]
    pub fn weather_enabled(&self) -> bool {
        self.layers.is_visible(LayerId::Weather)
    }

    #[must_use]
    pub fn gas_enabled(&self) -> bool {
        self.layers.is_visible(LayerId::GasPrice)
    }

    /// Switch the weather layer. Turning it on starts a refresh and returns
    /// its generation; without a key it fails and the layer stays off.
    pub fn set_weather_enabled(&mut self, enabled: bool) -> Result<Option<u64>, AppError> {
        if !enabled {
            self.disable_weather();
            return Ok(None);
        }
        if self.api_key.is_none() {
            self.disable_weather();
            return Err(WeatherError::MissingCredential.into());
        }

        self.layers.set_visible(LayerId::Weather, true);
        Ok(Some(self.request_weather_refresh()))
    }

    fn disable_weather(&mut self) {
        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
        // Anything still on its way is now stale.
        self.weather_generation += 1;
        self.layers.set_layer_content(LayerId::Weather, LayerContent::Empty);
        self.layers.set_visible(LayerId::Weather, false);
    }

    pub fn set_gas_enabled(&mut self, enabled: bool) {
        if enabled {
            self.layers.set_visible(LayerId::GasPrice, true);
            self.refresh_gas_prices();
        } else {
            self.layers.set_layer_content(LayerId::GasPrice, LayerContent::Empty);
            self.layers.set_visible(LayerId::GasPrice, false);
        }
    }

    fn refresh_gas_prices(&mut self) {
        let stations = self.gas.stations(self.layers.viewport());
        self.layers
            .set_layer_content(LayerId::GasPrice, LayerContent::Markers(stations));
    }

    pub fn set_radar_enabled(&mut self, enabled: bool) {
        if enabled {
            self.layers
                .set_layer_content(LayerId::Radar, LayerContent::Tiles(NexradRadarSource::overlay()));
            self.layers.set_visible(LayerId::Radar, true);
        } else {
            self.layers.set_visible(LayerId::Radar, false);
            self.layers.set_layer_content(LayerId::Radar, LayerContent::Empty);
        }
    }

    // Viewport

    /// Move the map; active weather and gas layers are refreshed for the new view.
    pub fn move_viewport(&mut self, viewport: Viewport) {
        self.layers.set_viewport(viewport);
        self.after_viewport_change();
    }

    /// Center on a position at street zoom and mark it.
    pub fn center_on(&mut self, position: LatLon) {
        self.location = Some(Marker::new(position, LOCATION_LABEL));
        let viewport = self.layers.viewport().moved_to(position, LOCATE_ZOOM);
        self.move_viewport(viewport);
    }

    fn after_viewport_change(&mut self) {
        if self.weather_enabled() {
            self.request_weather_refresh();
        }
        if self.gas_enabled() {
            self.refresh_gas_prices();
        }
    }

    /// Start a weather fetch for the current viewport, superseding any
    /// request still in flight. Must be called within a tokio runtime.
    pub fn request_weather_refresh(&mut self) -> u64 {
        if let Some(previous) = self.in_flight.take() {
            debug!("Cancelling weather request {}", self.weather_generation);
            previous.cancel();
        }

        self.weather_generation += 1;
        let generation = self.weather_generation;
        let cancel_token = CancellationToken::new();
        self.in_flight = Some(cancel_token.clone());

        let client = Arc::clone(&self.weather);
        let viewport = *self.layers.viewport();
        let api_key = self.api_key.clone();
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            let result = tokio::select! {
                () = cancel_token.cancelled() => {
                    debug!("Weather request {} cancelled", generation);
                    return;
                }
                result = client.refresh(&viewport, api_key.as_deref()) => result,
            };
            let _ = event_tx
                .send(SessionEvent::WeatherFetched { generation, result })
                .await;
        });

        debug!("Started weather request {}", generation);
        generation
    }

    // Events

    /// Receive the next background result.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.event_rx.recv().await
    }

    /// Apply a background result. Superseded responses are dropped unrendered.
    pub fn handle_event(&mut self, event: SessionEvent) -> Result<EventOutcome, AppError> {
        match event {
            SessionEvent::WeatherFetched { generation, result } => {
                if generation != self.weather_generation {
                    debug!(
                        "Discarding stale weather response {} (latest is {})",
                        generation, self.weather_generation
                    );
                    return Ok(EventOutcome::Stale);
                }
                self.in_flight = None;

                let observations = result?;
                let markers: Vec<Marker> = observations.iter().map(WeatherObservation::to_marker).collect();
                let stations = markers.len();
                self.layers
                    .set_layer_content(LayerId::Weather, LayerContent::Markers(markers));
                self.last_weather_update = Some(Local::now());
                Ok(EventOutcome::WeatherUpdated { stations })
            }
        }
    }

    /// Wait for the latest weather request to finish and apply it.
    ///
    /// Returns `Ok(None)` when nothing is in flight.
    pub async fn settle_weather(&mut self) -> Result<Option<EventOutcome>, AppError> {
        while self.in_flight.is_some() {
            let Some(event) = self.next_event().await else {
                break;
            };
            match self.handle_event(event)? {
                EventOutcome::Stale => {}
                outcome => return Ok(Some(outcome)),
            }
        }
        Ok(None)
    }
}
