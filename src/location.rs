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

//! Current position lookup.

use log::{info, warn};
use route_core::LatLon;
use serde_json::Value;
use thiserror::Error;

use crate::network::HttpTransport;

/// IP geolocation services tried in order, with their latitude and longitude fields
const IP_LOOKUPS: [(&str, &str, &str); 2] = [
    ("https://ipapi.co/json/", "latitude", "longitude"),
    ("http://ip-api.com/json/", "lat", "lon"),
];

#[derive(Debug, Error)]
#[error("could not determine your location from any source")]
pub struct LocateError;

/// Find the current position: the configured override when set, otherwise
/// IP-based geolocation.
pub async fn locate<T: HttpTransport>(
    override_position: Option<LatLon>,
    transport: &T,
) -> Result<LatLon, LocateError> {
    if let Some(position) = override_position {
        info!("Using configured location override {}", position);
        return Ok(position);
    }

    info!("Falling back to IP-based geolocation...");

    for (url, lat_field, lon_field) in IP_LOOKUPS {
        match transport.get(url).await {
            Ok(response) if response.is_success() => {
                if let Some(position) = parse_position(&response.body, lat_field, lon_field) {
                    info!("Location found via {}: {}", url, position);
                    return Ok(position);
                }
                warn!("No coordinates in response from {}", url);
            }
            Ok(response) => warn!("Location lookup via {} returned HTTP {}", url, response.status),
            Err(e) => warn!("Location lookup via {} failed: {}", url, e),
        }
    }

    Err(LocateError)
}

fn parse_position(body: &str, lat_field: &str, lon_field: &str) -> Option<LatLon> {
    let value: Value = serde_json::from_str(body).ok()?;
    let lat = value.get(lat_field).and_then(Value::as_f64)?;
    let lon = value.get(lon_field).and_then(Value::as_f64)?;
    Some(LatLon::new(lat, lon))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::fake::FakeTransport;

    #[tokio::test]
    async fn test_override_skips_network() {
        let transport = FakeTransport::new();
        let position = locate(Some(LatLon::new(47.6, -122.3)), &transport).await.unwrap();
        assert_eq!(position, LatLon::new(47.6, -122.3));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_first_service() {
        let transport = FakeTransport::new().respond(200, r#"{"ip": "x", "latitude": 51.5, "longitude": -0.1}"#);
        let position = locate(None, &transport).await.unwrap();
        assert_eq!(position, LatLon::new(51.5, -0.1));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_falls_back_to_second_service() {
        let transport = FakeTransport::new()
            .respond(429, r#"{"error": true, "reason": "RateLimited"}"#)
            .respond(200, r#"{"status": "success", "lat": 40.7, "lon": -74.0}"#);
        let position = locate(None, &transport).await.unwrap();
        assert_eq!(position, LatLon::new(40.7, -74.0));
        assert_eq!(transport.urls()[1], "http://ip-api.com/json/");
    }

    #[tokio::test]
    async fn test_all_sources_fail() {
        let transport = FakeTransport::new().fail("offline").respond(200, "{}");
        assert!(locate(None, &transport).await.is_err());
    }
}
