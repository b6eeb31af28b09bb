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

//! Overlay layer state.
//!
//! The [`LayerController`] owns the four overlay layers and the viewport.
//! Content and visibility are independent: a layer can be filled while
//! hidden, and hiding a layer never discards what it holds. Content is
//! only ever replaced wholesale through [`LayerController::set_layer_content`].

use std::fmt;
use std::str::FromStr;

use geo::{BoundingRect, MultiPoint, Point};
use log::debug;

use crate::document::GeoDocument;
use crate::viewport::{Bounds, LatLon, Viewport, MAX_ZOOM};

/// Identifier of an overlay layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LayerId {
    Route,
    Weather,
    GasPrice,
    Radar,
}

impl LayerId {
    pub const ALL: [LayerId; 4] = [Self::Route, Self::Weather, Self::GasPrice, Self::Radar];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Route => "route",
            Self::Weather => "weather",
            Self::GasPrice => "gasPrice",
            Self::Radar => "radar",
        }
    }

    fn index(self) -> usize {
        match self {
            Self::Route => 0,
            Self::Weather => 1,
            Self::GasPrice => 2,
            Self::Radar => 3,
        }
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayerId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "route" => Ok(Self::Route),
            "weather" => Ok(Self::Weather),
            "gasprice" | "gas" => Ok(Self::GasPrice),
            "radar" | "nexrad" => Ok(Self::Radar),
            other => Err(format!("unknown layer '{other}'")),
        }
    }
}

/// A point marker with a popup label.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub position: LatLon,
    pub label: String,
    pub icon_url: Option<String>,
}

impl Marker {
    pub fn new(position: LatLon, label: impl Into<String>) -> Self {
        Self {
            position,
            label: label.into(),
            icon_url: None,
        }
    }

    #[must_use]
    pub fn with_icon(mut self, icon_url: impl Into<String>) -> Self {
        self.icon_url = Some(icon_url.into());
        self
    }
}

/// An externally hosted tiled image overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileOverlay {
    pub name: String,
    pub url: String,
    pub attribution: String,
    pub z_index: i32,
}

/// What a layer currently displays.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LayerContent {
    #[default]
    Empty,
    Route(GeoDocument),
    Markers(Vec<Marker>),
    Tiles(TileOverlay),
}

impl LayerContent {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Route(doc) => doc.is_empty(),
            Self::Markers(markers) => markers.is_empty(),
            Self::Tiles(_) => false,
        }
    }

    /// Geographic extent, `None` for content without geometry.
    #[must_use]
    pub fn bounds(&self) -> Option<Bounds> {
        match self {
            Self::Route(doc) => doc.bounds(),
            Self::Markers(markers) => {
                let points: MultiPoint<f64> = markers
                    .iter()
                    .map(|m| Point::new(m.position.lon, m.position.lat))
                    .collect();
                points.bounding_rect().map(Bounds::from)
            }
            Self::Empty | Self::Tiles(_) => None,
        }
    }

    /// Number of drawable items.
    #[must_use]
    pub fn item_count(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Route(doc) => doc.len(),
            Self::Markers(markers) => markers.len(),
            Self::Tiles(_) => 1,
        }
    }
}

/// A named, togglable layer.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayLayer {
    pub id: LayerId,
    pub visible: bool,
    pub content: LayerContent,
}

impl OverlayLayer {
    fn new(id: LayerId) -> Self {
        Self {
            id,
            visible: false,
            content: LayerContent::Empty,
        }
    }
}

/// Owner of the overlay layers and the viewport.
#[derive(Debug, Clone)]
pub struct LayerController {
    layers: [OverlayLayer; 4],
    viewport: Viewport,
    max_zoom: u8,
}

impl LayerController {
    #[must_use]
    pub fn new(viewport: Viewport) -> Self {
        Self {
            layers: LayerId::ALL.map(OverlayLayer::new),
            viewport,
            max_zoom: MAX_ZOOM,
        }
    }

    /// Limit the zoom used when fitting to content.
    #[must_use]
    pub fn with_max_zoom(mut self, max_zoom: u8) -> Self {
        self.max_zoom = max_zoom.min(MAX_ZOOM);
        self
    }

    #[must_use]
    pub fn layer(&self, id: LayerId) -> &OverlayLayer {
        &self.layers[id.index()]
    }

    #[must_use]
    pub fn content(&self, id: LayerId) -> &LayerContent {
        &self.layer(id).content
    }

    #[must_use]
    pub fn is_visible(&self, id: LayerId) -> bool {
        self.layer(id).visible
    }

    /// Layers currently on the map, in drawing order.
    pub fn visible_layers(&self) -> impl Iterator<Item = &OverlayLayer> {
        self.layers.iter().filter(|layer| layer.visible)
    }

    /// Replace a layer's content. The previous content is dropped.
    pub fn set_layer_content(&mut self, id: LayerId, content: LayerContent) {
        debug!("Layer {} now holds {} items", id, content.item_count());
        self.layers[id.index()].content = content;
    }

    /// Add or remove a layer from the map. Content is untouched.
    pub fn set_visible(&mut self, id: LayerId, visible: bool) {
        let layer = &mut self.layers[id.index()];
        if layer.visible != visible {
            debug!("Layer {} {}", id, if visible { "shown" } else { "hidden" });
        }
        layer.visible = visible;
    }

    /// Move the viewport to frame a layer's geometry.
    ///
    /// Returns `false` and leaves the viewport alone when the layer has no
    /// geometry to frame.
    pub fn fit_to_content(&mut self, id: LayerId) -> bool {
        let Some(bounds) = self.content(id).bounds() else {
            debug!("Layer {} has no extent to fit", id);
            return false;
        };
        self.viewport = self.viewport.fitted_to(bounds, self.max_zoom);
        debug!(
            "Fitted viewport to layer {}: center {} zoom {}",
            id, self.viewport.center, self.viewport.zoom
        );
        true
    }

    #[must_use]
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }
}

impl Default for LayerController {
    fn default() -> Self {
        Self::new(Viewport::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Feature, Geometry};

    fn route(lon: f64, lat: f64) -> GeoDocument {
        GeoDocument::new(vec![Feature::new(Geometry::LineString {
            coordinates: vec![vec![lon, lat], vec![lon + 0.05, lat + 0.02]],
        })])
    }

    fn markers() -> LayerContent {
        LayerContent::Markers(vec![
            Marker::new(LatLon::new(40.0, -74.0), "A"),
            Marker::new(LatLon::new(40.5, -73.5), "B"),
        ])
    }

    #[test]
    fn test_all_layers_start_hidden_and_empty() {
        let layers = LayerController::default();
        for id in LayerId::ALL {
            assert!(!layers.is_visible(id));
            assert!(layers.content(id).is_empty());
        }
        assert_eq!(layers.visible_layers().count(), 0);
    }

    #[test]
    fn test_visibility_toggle_preserves_content() {
        let mut layers = LayerController::default();
        layers.set_layer_content(LayerId::Weather, markers());
        layers.set_visible(LayerId::Weather, true);
        layers.set_visible(LayerId::Weather, false);
        layers.set_visible(LayerId::Weather, true);
        assert_eq!(layers.content(LayerId::Weather), &markers());
    }

    #[test]
    fn test_content_can_be_staged_while_hidden() {
        let mut layers = LayerController::default();
        layers.set_layer_content(LayerId::GasPrice, markers());
        assert!(!layers.is_visible(LayerId::GasPrice));
        assert_eq!(layers.content(LayerId::GasPrice).item_count(), 2);
    }

    #[test]
    fn test_new_route_replaces_previous() {
        let mut layers = LayerController::default();
        layers.set_layer_content(LayerId::Route, LayerContent::Route(route(-0.1, 51.5)));
        layers.set_layer_content(LayerId::Route, LayerContent::Route(route(2.3, 48.8)));

        let bounds = layers.content(LayerId::Route).bounds().unwrap();
        assert!((bounds.west - 2.3).abs() < 1e-9);
        assert_eq!(layers.content(LayerId::Route).item_count(), 1);
    }

    #[test]
    fn test_fit_to_empty_layer_is_noop() {
        let mut layers = LayerController::default();
        let before = *layers.viewport();
        assert!(!layers.fit_to_content(LayerId::Route));
        assert_eq!(*layers.viewport(), before);

        layers.set_layer_content(
            LayerId::Radar,
            LayerContent::Tiles(TileOverlay {
                name: "radar".to_string(),
                url: "https://example.test/wms".to_string(),
                attribution: String::new(),
                z_index: 5,
            }),
        );
        assert!(!layers.fit_to_content(LayerId::Radar));
        assert_eq!(*layers.viewport(), before);
    }

    #[test]
    fn test_fit_to_route_centers_on_it() {
        let mut layers = LayerController::default();
        layers.set_layer_content(LayerId::Route, LayerContent::Route(route(2.3, 48.8)));
        assert!(layers.fit_to_content(LayerId::Route));

        let viewport = layers.viewport();
        let bounds = viewport.bounds();
        assert!(bounds.contains(LatLon::new(48.8, 2.3)));
        assert!(bounds.contains(LatLon::new(48.82, 2.35)));
        assert!(viewport.zoom > 10);
    }

    #[test]
    fn test_fit_to_markers() {
        let mut layers = LayerController::default().with_max_zoom(15);
        layers.set_layer_content(LayerId::Weather, markers());
        assert!(layers.fit_to_content(LayerId::Weather));
        assert!(layers.viewport().bounds().contains(LatLon::new(40.25, -73.75)));
    }

    #[test]
    fn test_layer_id_parsing() {
        assert_eq!("gasPrice".parse::<LayerId>().unwrap(), LayerId::GasPrice);
        assert_eq!("RADAR".parse::<LayerId>().unwrap(), LayerId::Radar);
        assert!("traffic".parse::<LayerId>().is_err());
    }
}
