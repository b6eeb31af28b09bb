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

//! OpenWeatherMap `box/city` client.

use log::{debug, info, warn};
use reqwest::Url;
use route_core::{LatLon, Marker, Viewport};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::config::DEFAULT_WEATHER_BASE_URL;
use crate::network::{HttpResponse, HttpTransport};

/// Environment variable consulted for a key when none is saved or configured
pub const API_KEY_ENV: &str = "OPENWEATHERMAP_API_KEY";

const ICON_BASE_URL: &str = "https://openweathermap.org/img/wn";

/// Errors from a weather refresh.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WeatherError {
    /// No API key; no request was made.
    #[error("OpenWeatherMap API key is missing, enter and save it first")]
    MissingCredential,

    /// The request failed or the provider answered with an error.
    #[error("could not fetch weather data: {}", describe_upstream(.status, .message))]
    Upstream { status: Option<u16>, message: String },
}

fn describe_upstream(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(status) => format!("HTTP error {status}: {message}"),
        None => message.to_string(),
    }
}

/// One weather station reading.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherObservation {
    pub name: String,
    pub position: LatLon,
    /// Degrees Celsius, absent when the provider omits it
    pub temperature_c: Option<f64>,
    pub description: String,
    pub icon: String,
}

impl WeatherObservation {
    #[must_use]
    pub fn icon_url(&self) -> String {
        format!("{ICON_BASE_URL}/{}@2x.png", self.icon)
    }

    /// Station name over "temperature, condition".
    #[must_use]
    pub fn popup_label(&self) -> String {
        match self.temperature_c {
            Some(temp) => format!("{}\n{}°C, {}", self.name, temp, self.description),
            None => format!("{}\n{}", self.name, self.description),
        }
    }

    #[must_use]
    pub fn to_marker(&self) -> Marker {
        Marker::new(self.position, self.popup_label()).with_icon(self.icon_url())
    }
}

#[derive(Debug, Deserialize)]
struct BoxCityResponse {
    #[serde(default)]
    list: Value,
}

impl BoxCityResponse {
    /// Station records; a missing, null or `false` list means none.
    fn into_records(self) -> Result<Vec<Value>, String> {
        match self.list {
            Value::Array(records) => Ok(records),
            Value::Null | Value::Bool(false) => Ok(Vec::new()),
            other => Err(format!("unexpected station list: {other}")),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StationRecord {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    coord: Option<StationCoord>,
    #[serde(default)]
    main: Option<StationReadings>,
    #[serde(default)]
    weather: Vec<StationCondition>,
}

#[derive(Debug, Deserialize)]
struct StationCoord {
    #[serde(rename = "Lat", alias = "lat")]
    lat: Option<f64>,
    #[serde(rename = "Lon", alias = "lon")]
    lon: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct StationReadings {
    temp: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct StationCondition {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    icon: Option<String>,
}

impl StationRecord {
    fn into_observation(self) -> Option<WeatherObservation> {
        let coord = self.coord?;
        let (lat, lon) = (coord.lat?, coord.lon?);
        if !lat.is_finite() || !lon.is_finite() {
            return None;
        }
        let condition = self.weather.into_iter().next()?;

        Some(WeatherObservation {
            name: self.name.unwrap_or_default(),
            position: LatLon::new(lat, lon),
            temperature_c: self.main.and_then(|m| m.temp),
            description: condition.description.unwrap_or_default(),
            icon: condition.icon.unwrap_or_default(),
        })
    }
}

/// Fetches observations for a viewport.
#[derive(Debug)]
pub struct WeatherClient<T> {
    transport: T,
    base_url: String,
}

impl<T: HttpTransport> WeatherClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            base_url: DEFAULT_WEATHER_BASE_URL.to_string(),
        }
    }

    /// Point the client at another API root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn request_url(&self, viewport: &Viewport, api_key: &str) -> Result<String, WeatherError> {
        let bounds = viewport.bounds();
        let mut url = Url::parse(&format!(
            "{}/box/city?bbox={},{},{},{},{}",
            self.base_url, bounds.west, bounds.south, bounds.east, bounds.north, viewport.zoom
        ))
        .map_err(|e| WeatherError::Upstream {
            status: None,
            message: format!("invalid weather API URL '{}': {e}", self.base_url),
        })?;
        url.query_pairs_mut()
            .append_pair("appid", api_key)
            .append_pair("units", "metric");
        Ok(url.into())
    }

    /// Observations inside the viewport.
    ///
    /// Without a key this fails with [`WeatherError::MissingCredential`]
    /// before any request is made. Records lacking a coordinate or a
    /// condition are skipped.
    pub async fn refresh(
        &self,
        viewport: &Viewport,
        api_key: Option<&str>,
    ) -> Result<Vec<WeatherObservation>, WeatherError> {
        let Some(api_key) = api_key.map(str::trim).filter(|key| !key.is_empty()) else {
            return Err(WeatherError::MissingCredential);
        };

        debug!(
            "Requesting weather for {} at zoom {}",
            viewport.bounds(),
            viewport.zoom
        );

        let response = self
            .transport
            .get(&self.request_url(viewport, api_key)?)
            .await
            .map_err(|e| WeatherError::Upstream {
                status: None,
                message: e.to_string(),
            })?;

        if !response.is_success() {
            return Err(WeatherError::Upstream {
                status: Some(response.status),
                message: provider_message(&response),
            });
        }

        let observations = parse_observations(&response.body).map_err(|e| WeatherError::Upstream {
            status: Some(response.status),
            message: format!("invalid response body: {e}"),
        })?;

        info!("Received {} weather observations", observations.len());
        Ok(observations)
    }
}

/// The provider's own `message` when the error body carries one.
fn provider_message(response: &HttpResponse) -> String {
    serde_json::from_str::<Value>(&response.body)
        .ok()
        .and_then(|body| body.get("message").and_then(Value::as_str).map(str::to_string))
        .filter(|message| !message.trim().is_empty())
        .or_else(|| response.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| "request failed".to_string())
}

fn parse_observations(body: &str) -> Result<Vec<WeatherObservation>, String> {
    let response: BoxCityResponse = serde_json::from_str(body).map_err(|e| e.to_string())?;
    let records = response.into_records()?;
    if records.is_empty() {
        info!("No weather stations found for the current view");
    }

    let observations = records
        .into_iter()
        .filter_map(|record| {
            let observation = serde_json::from_value::<StationRecord>(record.clone())
                .ok()
                .and_then(StationRecord::into_observation);
            if observation.is_none() {
                warn!("Skipping weather station due to missing data: {}", record);
            }
            observation
        })
        .collect();
    Ok(observations)
}

/// Pick the API key to use: a saved key first, then the config file, then
/// the `OPENWEATHERMAP_API_KEY` environment variable.
#[must_use]
pub fn resolve_api_key(saved_key: Option<&str>, config_key: Option<&str>) -> Option<String> {
    resolve_from(saved_key, config_key, std::env::var(API_KEY_ENV).ok())
}

/// Where [`resolve_api_key`] found its key, for display.
#[must_use]
pub fn api_key_source(saved_key: Option<&str>, config_key: Option<&str>) -> Option<&'static str> {
    let env_key = std::env::var(API_KEY_ENV).ok();
    if non_blank(saved_key).is_some() {
        Some("saved key")
    } else if non_blank(config_key).is_some() {
        Some("config file")
    } else if non_blank(env_key.as_deref()).is_some() {
        Some("environment variable")
    } else {
        None
    }
}

fn non_blank(key: Option<&str>) -> Option<&str> {
    key.map(str::trim).filter(|k| !k.is_empty())
}

fn resolve_from(saved_key: Option<&str>, config_key: Option<&str>, env_key: Option<String>) -> Option<String> {
    non_blank(saved_key)
        .or_else(|| non_blank(config_key))
        .or_else(|| non_blank(env_key.as_deref()))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::fake::FakeTransport;

    const BODY: &str = r#"{
        "cod": 200,
        "calctime": 0.3,
        "cnt": 4,
        "list": [
            {"id": 2643743, "name": "London", "coord": {"Lon": -0.12574, "Lat": 51.50853},
             "main": {"temp": 14.2, "humidity": 72},
             "weather": [{"id": 800, "main": "Clear", "description": "clear sky", "icon": "01d"}]},
            {"id": 1, "name": "Nowhere", "main": {"temp": 10.0},
             "weather": [{"description": "mist", "icon": "50d"}]},
            {"id": 2, "name": "Greenwich", "coord": {"Lon": 0.0, "Lat": 51.48},
             "main": {"temp": 13.0}, "weather": []},
            {"id": 3, "name": "Croydon", "coord": {"Lon": -0.1, "Lat": 51.37},
             "weather": [{"description": "light rain", "icon": "10d"}]}
        ]
    }"#;

    #[tokio::test]
    async fn test_missing_key_makes_no_request() {
        let client = WeatherClient::new(FakeTransport::new().respond(200, BODY));

        assert_eq!(
            client.refresh(&Viewport::default(), None).await,
            Err(WeatherError::MissingCredential)
        );
        assert_eq!(
            client.refresh(&Viewport::default(), Some("  ")).await,
            Err(WeatherError::MissingCredential)
        );
        assert_eq!(client.transport().calls(), 0);
    }

    #[tokio::test]
    async fn test_request_url_covers_viewport() {
        let client = WeatherClient::new(FakeTransport::new().respond(200, r#"{"list": []}"#));
        let viewport = Viewport::default();
        let bounds = viewport.bounds();

        let observations = client.refresh(&viewport, Some("k123")).await.unwrap();
        assert!(observations.is_empty());

        let urls = client.transport().urls();
        assert_eq!(urls.len(), 1);
        assert_eq!(
            urls[0],
            format!(
                "https://api.openweathermap.org/data/2.5/box/city?bbox={},{},{},{},13&appid=k123&units=metric",
                bounds.west, bounds.south, bounds.east, bounds.north
            )
        );
    }

    #[tokio::test]
    async fn test_api_key_is_url_encoded() {
        let client = WeatherClient::new(FakeTransport::new().respond(200, r#"{"list": []}"#));
        client.refresh(&Viewport::default(), Some("a b&units=x")).await.unwrap();

        let url = &client.transport().urls()[0];
        assert!(url.ends_with("&appid=a+b%26units%3Dx&units=metric"), "{url}");
    }

    #[tokio::test]
    async fn test_null_station_list_means_no_stations() {
        for body in [r#"{"list": null}"#, r#"{"cod": 200}"#, r#"{"list": false}"#] {
            let client = WeatherClient::new(FakeTransport::new().respond(200, body));
            assert_eq!(client.refresh(&Viewport::default(), Some("k")).await, Ok(Vec::new()));
        }

        let client = WeatherClient::new(FakeTransport::new().respond(200, r#"{"list": {"name": "x"}}"#));
        assert!(matches!(
            client.refresh(&Viewport::default(), Some("k")).await,
            Err(WeatherError::Upstream { status: Some(200), .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_records_are_skipped() {
        let client = WeatherClient::new(FakeTransport::new().respond(200, BODY));
        let observations = client.refresh(&Viewport::default(), Some("k")).await.unwrap();

        assert_eq!(observations.len(), 2);
        assert_eq!(observations[0].name, "London");
        assert_eq!(observations[0].position, LatLon::new(51.50853, -0.12574));
        assert_eq!(observations[0].temperature_c, Some(14.2));
        assert_eq!(observations[1].name, "Croydon");
        assert_eq!(observations[1].temperature_c, None);
    }

    #[tokio::test]
    async fn test_upstream_error_prefers_provider_message() {
        let body = r#"{"cod": 401, "message": "Invalid API key. Please see https://openweathermap.org/faq#error401 for more info."}"#;
        let client = WeatherClient::new(FakeTransport::new().respond(401, body));

        match client.refresh(&Viewport::default(), Some("bad")).await {
            Err(WeatherError::Upstream { status, message }) => {
                assert_eq!(status, Some(401));
                assert!(message.starts_with("Invalid API key"));
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_upstream_error_falls_back_to_status_text() {
        let client = WeatherClient::new(FakeTransport::new().respond(503, "<html>down</html>"));
        let err = client.refresh(&Viewport::default(), Some("k")).await.unwrap_err();
        assert_eq!(
            err,
            WeatherError::Upstream {
                status: Some(503),
                message: "Service Unavailable".to_string()
            }
        );
        assert_eq!(
            err.to_string(),
            "could not fetch weather data: HTTP error 503: Service Unavailable"
        );
    }

    #[tokio::test]
    async fn test_transport_failure_has_no_status() {
        let client = WeatherClient::new(FakeTransport::new().fail("connection refused"));
        let err = client.refresh(&Viewport::default(), Some("k")).await.unwrap_err();
        assert_eq!(
            err,
            WeatherError::Upstream {
                status: None,
                message: "connection refused".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_base_url_override() {
        let client = WeatherClient::new(FakeTransport::new().respond(200, "{}"))
            .with_base_url("http://127.0.0.1:8080/owm/");
        client.refresh(&Viewport::default(), Some("k")).await.unwrap();
        assert!(client.transport().urls()[0].starts_with("http://127.0.0.1:8080/owm/box/city?bbox="));
    }

    #[test]
    fn test_marker_rendering() {
        let observation = WeatherObservation {
            name: "London".to_string(),
            position: LatLon::new(51.5, -0.12),
            temperature_c: Some(14.5),
            description: "clear sky".to_string(),
            icon: "01d".to_string(),
        };
        let marker = observation.to_marker();
        assert_eq!(marker.label, "London\n14.5°C, clear sky");
        assert_eq!(
            marker.icon_url.as_deref(),
            Some("https://openweathermap.org/img/wn/01d@2x.png")
        );
    }

    #[test]
    fn test_key_resolution_order() {
        assert_eq!(
            resolve_from(Some("saved"), Some("config"), Some("env".to_string())).as_deref(),
            Some("saved")
        );
        assert_eq!(
            resolve_from(Some(" "), Some("config"), Some("env".to_string())).as_deref(),
            Some("config")
        );
        assert_eq!(
            resolve_from(None, None, Some("env".to_string())).as_deref(),
            Some("env")
        );
        assert_eq!(resolve_from(None, Some(""), Some(String::new())), None);
    }
}
