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

//! NEXRAD base reflectivity from the Iowa Environmental Mesonet WMS.

use route_core::{TileOverlay, WebMercator};
use walkers::sources::{Attribution, TileSource};
use walkers::TileId;

pub const WMS_URL: &str = "https://mesonet.agron.iastate.edu/cgi-bin/wms/nexrad/n0r.cgi";
pub const WMS_LAYER: &str = "nexrad-n0r-900913";

const ATTRIBUTION: &str = "© Iowa State University IEM";
const TILE_PIXELS: u32 = 256;

/// Drawn above the base map and route.
pub const RADAR_Z_INDEX: i32 = 5;

/// Radar overlay requested as 256 px EPSG:3857 WMS GetMap tiles.
#[derive(Debug, Clone, Copy, Default)]
pub struct NexradRadarSource;

impl NexradRadarSource {
    /// Layer content describing this overlay.
    #[must_use]
    pub fn overlay() -> TileOverlay {
        TileOverlay {
            name: "NEXRAD radar".to_string(),
            url: WMS_URL.to_string(),
            attribution: ATTRIBUTION.to_string(),
            z_index: RADAR_Z_INDEX,
        }
    }
}

impl TileSource for NexradRadarSource {
    fn tile_url(&self, tile_id: TileId) -> String {
        let (min_x, min_y, max_x, max_y) = WebMercator::tile_bounds_meters(tile_id.x, tile_id.y, tile_id.zoom);
        format!(
            "{WMS_URL}?SERVICE=WMS&REQUEST=GetMap&VERSION=1.1.1&LAYERS={WMS_LAYER}&STYLES=\
             &FORMAT=image%2Fpng&TRANSPARENT=true&SRS=EPSG%3A3857\
             &BBOX={min_x},{min_y},{max_x},{max_y}&WIDTH={TILE_PIXELS}&HEIGHT={TILE_PIXELS}"
        )
    }

    fn attribution(&self) -> Attribution {
        Attribution {
            text: ATTRIBUTION,
            url: "https://mesonet.agron.iastate.edu/",
            logo_light: None,
            logo_dark: None,
        }
    }

    fn tile_size(&self) -> u32 {
        TILE_PIXELS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(url: &str) -> Vec<f64> {
        let param = url
            .split('&')
            .find_map(|p| p.strip_prefix("BBOX="))
            .expect("BBOX parameter");
        param.split(',').map(|v| v.parse().unwrap()).collect()
    }

    #[test]
    fn test_world_tile_bbox() {
        let url = NexradRadarSource.tile_url(TileId { x: 0, y: 0, zoom: 0 });
        assert!(url.starts_with(WMS_URL));
        assert!(url.contains("LAYERS=nexrad-n0r-900913"));
        assert!(url.contains("SRS=EPSG%3A3857"));
        assert!(url.contains("TRANSPARENT=true"));

        let extent = 20_037_508.342_789_244;
        let bbox = bbox(&url);
        assert_eq!(bbox.len(), 4);
        assert!((bbox[0] + extent).abs() < 1e-3);
        assert!((bbox[1] + extent).abs() < 1e-3);
        assert!((bbox[2] - extent).abs() < 1e-3);
        assert!((bbox[3] - extent).abs() < 1e-3);
    }

    #[test]
    fn test_tile_bbox_is_ordered() {
        let url = NexradRadarSource.tile_url(TileId { x: 2, y: 1, zoom: 2 });
        let bbox = bbox(&url);
        assert!(bbox[0] < bbox[2]);
        assert!(bbox[1] < bbox[3]);
        assert!(bbox[0].abs() < 1e-6);
        assert!(bbox[1].abs() < 1e-6);
    }

    #[test]
    fn test_overlay_descriptor() {
        let overlay = NexradRadarSource::overlay();
        assert_eq!(overlay.z_index, 5);
        assert_eq!(overlay.attribution, "© Iowa State University IEM");
    }
}
