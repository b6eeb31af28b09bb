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

//! Geographic positions, bounding boxes and the map viewport.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::projection::{WebMercator, MAX_LATITUDE, TILE_SIZE};

/// Highest zoom level served by the base map.
pub const MAX_ZOOM: u8 = 19;

// Slack for floating point error when comparing projected spans against the viewport.
const FIT_EPSILON_PX: f64 = 1e-6;

/// A WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    #[must_use]
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Offset by the given number of degrees.
    #[must_use]
    pub fn offset(self, d_lat: f64, d_lon: f64) -> Self {
        Self::new(self.lat + d_lat, self.lon + d_lon)
    }

    /// Finite, with latitude in -90..=90 and longitude in -180..=180.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }

    /// Latitude clamped to the Web Mercator limit, longitude wrapped into -180..=180.
    #[must_use]
    pub fn normalized(self) -> Self {
        let lon = if (-180.0..=180.0).contains(&self.lon) {
            self.lon
        } else {
            (self.lon + 180.0).rem_euclid(360.0) - 180.0
        };
        Self::new(self.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE), lon)
    }
}

impl fmt::Display for LatLon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}, {:.5}", self.lat, self.lon)
    }
}

/// Geographic bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Bounds {
    #[must_use]
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self { west, south, east, north }
    }

    /// Bounds of a single position.
    #[must_use]
    pub fn from_point(point: LatLon) -> Self {
        Self::new(point.lon, point.lat, point.lon, point.lat)
    }

    /// Smallest bounds containing both.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self::new(
            self.west.min(other.west),
            self.south.min(other.south),
            self.east.max(other.east),
            self.north.max(other.north),
        )
    }

    #[must_use]
    pub fn contains(&self, point: LatLon) -> bool {
        (self.south..=self.north).contains(&point.lat) && (self.west..=self.east).contains(&point.lon)
    }
}

impl From<geo::Rect<f64>> for Bounds {
    fn from(rect: geo::Rect<f64>) -> Self {
        Self::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "W {:.5} S {:.5} E {:.5} N {:.5}",
            self.west, self.south, self.east, self.north
        )
    }
}

/// The visible portion of the map: a center, an integer zoom and a pixel size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub center: LatLon,
    pub zoom: u8,
    pub width_px: u32,
    pub height_px: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            center: LatLon::new(51.505, -0.09),
            zoom: 13,
            width_px: 1280,
            height_px: 800,
        }
    }
}

impl Viewport {
    /// The center is normalized so the map never points off the world.
    #[must_use]
    pub fn new(center: LatLon, zoom: u8, width_px: u32, height_px: u32) -> Self {
        Self {
            center: center.normalized(),
            zoom: zoom.min(MAX_ZOOM),
            width_px,
            height_px,
        }
    }

    /// Same pixel size, new center and zoom.
    #[must_use]
    pub fn moved_to(self, center: LatLon, zoom: u8) -> Self {
        Self::new(center, zoom, self.width_px, self.height_px)
    }

    /// Geographic bounds currently visible.
    #[must_use]
    pub fn bounds(&self) -> Bounds {
        let zoom = self.zoom;
        let world = 2_f64.powi(i32::from(zoom));
        let half_w = f64::from(self.width_px) / TILE_SIZE / 2.0;
        let half_h = f64::from(self.height_px) / TILE_SIZE / 2.0;

        let cx = WebMercator::lon_to_x(self.center.lon, zoom);
        let cy = WebMercator::lat_to_y(self.center.lat, zoom);

        Bounds::new(
            WebMercator::tile_to_lon(cx - half_w, zoom),
            WebMercator::tile_to_lat((cy + half_h).min(world), zoom),
            WebMercator::tile_to_lon(cx + half_w, zoom),
            WebMercator::tile_to_lat((cy - half_h).max(0.0), zoom),
        )
    }

    /// Viewport of the same pixel size showing `bounds` as closely as possible.
    ///
    /// Picks the largest zoom (up to `max_zoom`) at which the projected bounds
    /// fit inside the pixel size, and centers on their projected midpoint.
    #[must_use]
    pub fn fitted_to(&self, bounds: Bounds, max_zoom: u8) -> Self {
        let width = f64::from(self.width_px);
        let height = f64::from(self.height_px);

        let zoom = (0..=max_zoom.min(MAX_ZOOM))
            .rev()
            .find(|&z| {
                let span_x = (WebMercator::lon_to_x(bounds.east, z) - WebMercator::lon_to_x(bounds.west, z)) * TILE_SIZE;
                let span_y = (WebMercator::lat_to_y(bounds.south, z) - WebMercator::lat_to_y(bounds.north, z)) * TILE_SIZE;
                span_x <= width + FIT_EPSILON_PX && span_y <= height + FIT_EPSILON_PX
            })
            .unwrap_or(0);

        let mid_x = (WebMercator::lon_to_x(bounds.west, 0) + WebMercator::lon_to_x(bounds.east, 0)) / 2.0;
        let mid_y = (WebMercator::lat_to_y(bounds.north, 0) + WebMercator::lat_to_y(bounds.south, 0)) / 2.0;
        let center = LatLon::new(WebMercator::tile_to_lat(mid_y, 0), WebMercator::tile_to_lon(mid_x, 0));

        self.moved_to(center, zoom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile_bounds(x: u32, y: u32, zoom: u8) -> Bounds {
        Bounds::new(
            WebMercator::tile_to_lon(f64::from(x), zoom),
            WebMercator::tile_to_lat(f64::from(y) + 1.0, zoom),
            WebMercator::tile_to_lon(f64::from(x) + 1.0, zoom),
            WebMercator::tile_to_lat(f64::from(y), zoom),
        )
    }

    #[test]
    fn test_single_tile_fits_at_its_own_zoom() {
        let viewport = Viewport::new(LatLon::new(0.0, 0.0), 0, 256, 256);
        let fitted = viewport.fitted_to(tile_bounds(4, 2, 3), MAX_ZOOM);
        assert_eq!(fitted.zoom, 3);
        assert!((fitted.center.lon - 22.5).abs() < 1e-9);
    }

    #[test]
    fn test_point_bounds_fit_at_max_zoom() {
        let point = LatLon::new(47.6, -122.3);
        let fitted = Viewport::default().fitted_to(Bounds::from_point(point), 17);
        assert_eq!(fitted.zoom, 17);
        assert!((fitted.center.lat - point.lat).abs() < 1e-9);
        assert!((fitted.center.lon - point.lon).abs() < 1e-9);
    }

    #[test]
    fn test_world_bounds_fall_back_to_zoom_zero() {
        let viewport = Viewport::new(LatLon::new(0.0, 0.0), 5, 100, 100);
        let fitted = viewport.fitted_to(Bounds::new(-180.0, -85.0, 180.0, 85.0), MAX_ZOOM);
        assert_eq!(fitted.zoom, 0);
    }

    #[test]
    fn test_viewport_bounds_contain_center() {
        let viewport = Viewport::default();
        let bounds = viewport.bounds();
        assert!(bounds.contains(viewport.center));
        assert!(bounds.west < bounds.east);
        assert!(bounds.south < bounds.north);
    }

    #[test]
    fn test_center_is_kept_on_the_map() {
        let viewport = Viewport::default().moved_to(LatLon::new(200.0, 500.0), 10);
        assert!((viewport.center.lat - MAX_LATITUDE).abs() < 1e-9);
        assert!((viewport.center.lon - 140.0).abs() < 1e-9);

        let viewport = Viewport::default().moved_to(LatLon::new(-95.0, -190.0), 10);
        assert!((viewport.center.lat + MAX_LATITUDE).abs() < 1e-9);
        assert!((viewport.center.lon - 170.0).abs() < 1e-9);

        let edge = Viewport::default().moved_to(LatLon::new(10.0, 180.0), 10);
        assert_eq!(edge.center, LatLon::new(10.0, 180.0));
    }

    #[test]
    fn test_position_validity() {
        assert!(LatLon::new(90.0, -180.0).is_valid());
        assert!(!LatLon::new(95.0, 0.0).is_valid());
        assert!(!LatLon::new(0.0, 500.0).is_valid());
        assert!(!LatLon::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_union() {
        let a = Bounds::new(0.0, 0.0, 1.0, 1.0);
        let b = Bounds::new(-1.0, 0.5, 0.5, 2.0);
        assert_eq!(a.union(b), Bounds::new(-1.0, 0.0, 1.0, 2.0));
    }
}
