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

//! Gas price markers.
//!
//! There is no live price source yet. [`PlaceholderGasPrices`] marks three
//! sample stations around the map center; a real feed only needs to
//! implement [`GasPriceProvider`].

use log::warn;
use route_core::{Marker, Viewport};

/// Offset in degrees of the outer placeholder stations from the center
const PLACEHOLDER_OFFSET_DEG: f64 = 0.005;

/// Source of gas station markers for the visible area.
pub trait GasPriceProvider: Send {
    fn stations(&self, viewport: &Viewport) -> Vec<Marker>;
}

/// Three fixed sample stations relative to the viewport center.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderGasPrices;

impl GasPriceProvider for PlaceholderGasPrices {
    fn stations(&self, viewport: &Viewport) -> Vec<Marker> {
        warn!("Gas price API integration is pending, showing placeholder stations");

        let center = viewport.center;
        vec![
            Marker::new(center, "Sample Gas Station (Central)\nPrice: $X.XX"),
            Marker::new(
                center.offset(PLACEHOLDER_OFFSET_DEG, -PLACEHOLDER_OFFSET_DEG),
                "Sample Gas Station (SW)\nPrice: $Y.YY",
            ),
            Marker::new(
                center.offset(-PLACEHOLDER_OFFSET_DEG, PLACEHOLDER_OFFSET_DEG),
                "Sample Gas Station (NE)\nPrice: $Z.ZZ",
            ),
        ]
    }
}
