//! Weather overlay.
//!
//! Point observations for the visible map area from the OpenWeatherMap
//! `box/city` endpoint, rendered as markers on the weather layer.

pub mod openweathermap;

pub use openweathermap::{
    api_key_source, resolve_api_key, WeatherClient, WeatherError, WeatherObservation, API_KEY_ENV,
};
