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

//! Web Mercator projection utilities.
//!
//! Coordinates are expressed in tile units: at zoom `z` the world spans
//! `2^z` tiles of [`TILE_SIZE`] pixels in each direction.

use std::f64::consts::PI;

/// Edge length of a raster tile in pixels.
pub const TILE_SIZE: f64 = 256.0;

/// Latitude limit of the square Web Mercator world.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Web Mercator projection utilities
#[derive(Debug, Clone, Copy)]
pub struct WebMercator;

impl WebMercator {
    fn world_size(zoom: u8) -> f64 {
        2_f64.powi(i32::from(zoom))
    }

    /// Convert latitude to Web Mercator Y coordinate in tile units
    #[must_use]
    pub fn lat_to_y(lat: f64, zoom: u8) -> f64 {
        let lat_rad = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
        let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0;
        y * Self::world_size(zoom)
    }

    /// Convert longitude to Web Mercator X coordinate in tile units
    #[must_use]
    pub fn lon_to_x(lon: f64, zoom: u8) -> f64 {
        ((lon + 180.0) / 360.0) * Self::world_size(zoom)
    }

    /// Convert tile coordinates back to latitude
    #[must_use]
    pub fn tile_to_lat(y: f64, zoom: u8) -> f64 {
        let n = Self::world_size(zoom);
        let lat_rad = (PI * (1.0 - 2.0 * y / n)).sinh().atan();
        lat_rad.to_degrees()
    }

    /// Convert tile coordinates back to longitude
    #[must_use]
    pub fn tile_to_lon(x: f64, zoom: u8) -> f64 {
        x / Self::world_size(zoom) * 360.0 - 180.0
    }

    /// Convert latitude to EPSG:3857 northing in metres.
    #[must_use]
    pub fn lat_to_meters(lat: f64) -> f64 {
        let lat_rad = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
        EARTH_RADIUS_METERS * (PI / 4.0 + lat_rad / 2.0).tan().ln()
    }

    /// Convert longitude to EPSG:3857 easting in metres.
    #[must_use]
    pub fn lon_to_meters(lon: f64) -> f64 {
        EARTH_RADIUS_METERS * lon.to_radians()
    }

    /// EPSG:3857 extent `(min_x, min_y, max_x, max_y)` of a tile, as used in WMS `BBOX`.
    #[must_use]
    pub fn tile_bounds_meters(x: u32, y: u32, zoom: u8) -> (f64, f64, f64, f64) {
        let west = Self::tile_to_lon(f64::from(x), zoom);
        let east = Self::tile_to_lon(f64::from(x) + 1.0, zoom);
        let north = Self::tile_to_lat(f64::from(y), zoom);
        let south = Self::tile_to_lat(f64::from(y) + 1.0, zoom);
        (
            Self::lon_to_meters(west),
            Self::lat_to_meters(south),
            Self::lon_to_meters(east),
            Self::lat_to_meters(north),
        )
    }
}

const EARTH_RADIUS_METERS: f64 = 6_378_137.0;
