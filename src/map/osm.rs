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

use route_core::viewport::MAX_ZOOM;
use walkers::sources::{Attribution, TileSource};
use walkers::TileId;

use crate::config::DEFAULT_TILE_URL;

/// Base map raster tiles from an OpenStreetMap style `{z}/{x}/{y}` template.
#[derive(Debug, Clone)]
pub struct OpenStreetMapSource {
    url_template: String,
}

impl OpenStreetMapSource {
    pub fn new(url_template: impl Into<String>) -> Self {
        Self {
            url_template: url_template.into(),
        }
    }
}

impl Default for OpenStreetMapSource {
    fn default() -> Self {
        Self::new(DEFAULT_TILE_URL)
    }
}

impl TileSource for OpenStreetMapSource {
    fn tile_url(&self, tile_id: TileId) -> String {
        self.url_template
            .replace("{z}", &tile_id.zoom.to_string())
            .replace("{x}", &tile_id.x.to_string())
            .replace("{y}", &tile_id.y.to_string())
    }

    fn attribution(&self) -> Attribution {
        Attribution {
            text: "© OpenStreetMap contributors",
            url: "https://www.openstreetmap.org/copyright",
            logo_light: None,
            logo_dark: None,
        }
    }

    fn max_zoom(&self) -> u8 {
        MAX_ZOOM
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_template() {
        let source = OpenStreetMapSource::default();
        let url = source.tile_url(TileId { x: 4093, y: 2723, zoom: 13 });
        assert_eq!(url, "https://tile.openstreetmap.org/13/4093/2723.png");
        assert_eq!(source.max_zoom(), 19);
    }

    #[test]
    fn test_custom_template() {
        let source = OpenStreetMapSource::new("http://localhost:8080/tiles/{z}/{x}/{y}.webp");
        assert_eq!(
            source.tile_url(TileId { x: 1, y: 2, zoom: 3 }),
            "http://localhost:8080/tiles/3/1/2.webp"
        );
    }
}
