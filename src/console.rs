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

//! Line based control panel.
//!
//! Reads commands from stdin and applies them to a [`MapSession`] while
//! background weather results arrive on the same task.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{error, info};
use route_core::{KeyValueBackend, LatLon, LayerContent, LayerId, RouteSummary, Viewport};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::error::AppError;
use crate::location::locate;
use crate::network::HttpTransport;
use crate::session::{EventOutcome, MapSession};

const HELP: &str = "\
commands:
  import <file>           load a .gpx or .kml route
  save | load | forget    save, load or delete the stored route
  key <value> | key clear set or clear the OpenWeatherMap API key
  weather on|off          toggle the weather layer
  gas on|off              toggle the gas price layer
  radar on|off            toggle the NEXRAD radar overlay
  goto <lat> <lon> [zoom] move the map
  pan <dlat> <dlon>       shift the map center by degrees
  zoom <level>            change zoom
  fit                     frame the current route
  locate                  center on your position
  status                  show layers and viewport
  quit";

/// One control panel action.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Help,
    Import(PathBuf),
    SaveRoute,
    LoadRoute,
    ForgetRoute,
    SetKey(String),
    ClearKey,
    Toggle(LayerId, bool),
    Goto(LatLon, Option<u8>),
    Pan(f64, f64),
    Zoom(u8),
    Fit,
    Locate,
    Status,
    Quit,
}

impl FromStr for ConsoleCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err("empty command".to_string());
        };
        let args: Vec<&str> = words.collect();

        let command = match (verb.to_ascii_lowercase().as_str(), args.as_slice()) {
            ("help" | "?", []) => Self::Help,
            ("import", [_, ..]) => Self::Import(PathBuf::from(args.join(" "))),
            ("save", []) => Self::SaveRoute,
            ("load", []) => Self::LoadRoute,
            ("forget", []) => Self::ForgetRoute,
            ("key", ["clear"]) | ("key", []) => Self::ClearKey,
            ("key", [key]) => Self::SetKey((*key).to_string()),
            ("weather" | "gas" | "radar", [state]) => {
                let layer = verb.parse::<LayerId>()?;
                Self::Toggle(layer, parse_switch(state)?)
            }
            ("goto", [lat, lon]) => Self::Goto(position(lat, lon)?, None),
            ("goto", [lat, lon, zoom]) => Self::Goto(position(lat, lon)?, Some(zoom_level(zoom)?)),
            ("pan", [d_lat, d_lon]) => Self::Pan(number(d_lat)?, number(d_lon)?),
            ("zoom", [zoom]) => Self::Zoom(zoom_level(zoom)?),
            ("fit", []) => Self::Fit,
            ("locate", []) => Self::Locate,
            ("status", []) => Self::Status,
            ("quit" | "exit", []) => Self::Quit,
            _ => return Err(format!("unrecognised command '{}', try 'help'", line.trim())),
        };
        Ok(command)
    }
}

fn parse_switch(word: &str) -> Result<bool, String> {
    match word.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        other => Err(format!("expected on or off, got '{other}'")),
    }
}

fn number(word: &str) -> Result<f64, String> {
    word.parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| format!("'{word}' is not a number"))
}

fn position(lat: &str, lon: &str) -> Result<LatLon, String> {
    let position = LatLon::new(number(lat)?, number(lon)?);
    if position.is_valid() {
        Ok(position)
    } else {
        Err(format!("{lat},{lon} is outside valid coordinates"))
    }
}

fn zoom_level(word: &str) -> Result<u8, String> {
    word.parse::<u8>()
        .map_err(|e| format!("invalid zoom '{word}': {e}"))
}

/// Run the interactive session until `quit` or end of input.
pub async fn run<B, T>(
    mut session: MapSession<B, T>,
    location_override: Option<LatLon>,
    locate_transport: &T,
) -> Result<(), AppError>
where
    B: KeyValueBackend + Clone,
    T: HttpTransport,
{
    println!("{HELP}");
    print_status(&session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Ok(Some(line)) = line else {
                    info!("Input closed, ending session");
                    return Ok(());
                };
                if line.trim().is_empty() {
                    continue;
                }

                match line.parse::<ConsoleCommand>() {
                    Ok(ConsoleCommand::Quit) => return Ok(()),
                    Ok(command) => {
                        if let Err(e) = apply(&mut session, command, location_override, locate_transport).await {
                            error!("{}", e);
                        }
                    }
                    Err(message) => println!("{message}"),
                }
            }

            Some(event) = session.next_event() => {
                match session.handle_event(event) {
                    Ok(EventOutcome::WeatherUpdated { stations }) => {
                        println!("Weather updated: {stations} stations");
                    }
                    Ok(EventOutcome::Stale) => {}
                    Err(e) => error!("{}", e),
                }
            }
        }
    }
}

async fn apply<B, T>(
    session: &mut MapSession<B, T>,
    command: ConsoleCommand,
    location_override: Option<LatLon>,
    locate_transport: &T,
) -> Result<(), AppError>
where
    B: KeyValueBackend + Clone,
    T: HttpTransport,
{
    match command {
        ConsoleCommand::Help => println!("{HELP}"),
        ConsoleCommand::Import(path) => {
            let text = read_route_file(&path)?;
            let file_name = path.file_name().map_or_else(String::new, |n| n.to_string_lossy().into_owned());
            let summary = session.import_route(&file_name, &text)?;
            println!("Route loaded successfully: {}", describe_summary(&summary));
        }
        ConsoleCommand::SaveRoute => {
            if session.save_current_route()? {
                println!("Current route saved");
            } else {
                println!("No current route to save");
            }
        }
        ConsoleCommand::LoadRoute => match session.load_saved_route()? {
            Some(summary) => println!("Route loaded from storage: {}", describe_summary(&summary)),
            None => println!("No saved route found"),
        },
        ConsoleCommand::ForgetRoute => {
            session.clear_saved_route()?;
            println!("Saved route deleted");
        }
        ConsoleCommand::SetKey(key) => {
            if session.save_api_key(&key)? {
                println!("OpenWeatherMap API key saved");
            } else {
                println!("OpenWeatherMap API key cleared, weather layer disabled");
            }
        }
        ConsoleCommand::ClearKey => {
            session.clear_api_key()?;
            println!("OpenWeatherMap API key cleared, weather layer disabled");
        }
        ConsoleCommand::Toggle(layer, enabled) => {
            match layer {
                LayerId::Weather => {
                    session.set_weather_enabled(enabled)?;
                }
                LayerId::GasPrice => session.set_gas_enabled(enabled),
                LayerId::Radar => session.set_radar_enabled(enabled),
                LayerId::Route => {}
            }
            print_layer(session, layer);
        }
        ConsoleCommand::Goto(center, zoom) => {
            let zoom = zoom.unwrap_or(session.viewport().zoom);
            session.move_viewport(session.viewport().moved_to(center, zoom));
            print_viewport(session.viewport());
        }
        ConsoleCommand::Pan(d_lat, d_lon) => {
            let viewport = *session.viewport();
            session.move_viewport(viewport.moved_to(viewport.center.offset(d_lat, d_lon), viewport.zoom));
            print_viewport(session.viewport());
        }
        ConsoleCommand::Zoom(zoom) => {
            let viewport = *session.viewport();
            session.move_viewport(viewport.moved_to(viewport.center, zoom));
            print_viewport(session.viewport());
        }
        ConsoleCommand::Fit => {
            if session.fit_route() {
                print_viewport(session.viewport());
            } else {
                println!("No route to fit");
            }
        }
        ConsoleCommand::Locate => {
            let position = locate(location_override, locate_transport).await?;
            session.center_on(position);
            println!("You are here! {position}");
        }
        ConsoleCommand::Status => print_status(session),
        ConsoleCommand::Quit => {}
    }
    Ok(())
}

pub fn read_route_file(path: &Path) -> Result<String, AppError> {
    std::fs::read_to_string(path).map_err(|source| AppError::ReadFile {
        path: path.to_path_buf(),
        source,
    })
}

#[must_use]
pub fn describe_summary(summary: &RouteSummary) -> String {
    format!(
        "{} features, {} points, {:.2} km",
        summary.features,
        summary.points,
        summary.length_meters / 1000.0
    )
}

pub fn print_viewport(viewport: &Viewport) {
    println!(
        "Map centered on {} at zoom {} ({})",
        viewport.center,
        viewport.zoom,
        viewport.bounds()
    );
}

/// Print a layer's state and its popups.
pub fn print_layer<B, T>(session: &MapSession<B, T>, id: LayerId)
where
    B: KeyValueBackend + Clone,
    T: HttpTransport,
{
    let layer = session.layers().layer(id);
    let state = if layer.visible { "on" } else { "off" };

    match &layer.content {
        LayerContent::Empty => println!("[{id}] {state}, empty"),
        LayerContent::Route(doc) => {
            println!("[{id}] {state}, {} features", doc.len());
            for feature in &doc.features {
                println!("  - {}", feature.popup_label());
            }
        }
        LayerContent::Markers(markers) => {
            println!("[{id}] {state}, {} markers", markers.len());
            for marker in markers {
                println!("  - {} @ {}", marker.label.replace('\n', " | "), marker.position);
            }
        }
        LayerContent::Tiles(overlay) => {
            println!("[{id}] {state}, {} ({}, z-index {})", overlay.name, overlay.attribution, overlay.z_index);
        }
    }
}

pub fn print_status<B, T>(session: &MapSession<B, T>)
where
    B: KeyValueBackend + Clone,
    T: HttpTransport,
{
    print_viewport(session.viewport());
    if session.weather_toggle_available() {
        println!("Weather toggle available");
    } else {
        println!("Weather toggle disabled: no OpenWeatherMap API key");
    }
    if let Some(updated) = session.last_weather_update() {
        println!("Weather last updated {}", updated.format("%H:%M:%S"));
    }
    if let Some(marker) = session.location_marker() {
        println!("{} {}", marker.label, marker.position);
    }
    for id in LayerId::ALL {
        print_layer(session, id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toggles() {
        assert_eq!(
            "weather on".parse::<ConsoleCommand>().unwrap(),
            ConsoleCommand::Toggle(LayerId::Weather, true)
        );
        assert_eq!(
            "GAS off".parse::<ConsoleCommand>().unwrap(),
            ConsoleCommand::Toggle(LayerId::GasPrice, false)
        );
        assert!("radar maybe".parse::<ConsoleCommand>().is_err());
    }

    #[test]
    fn test_parse_key() {
        assert_eq!(
            "key abc123".parse::<ConsoleCommand>().unwrap(),
            ConsoleCommand::SetKey("abc123".to_string())
        );
        assert_eq!("key clear".parse::<ConsoleCommand>().unwrap(), ConsoleCommand::ClearKey);
        assert_eq!("key".parse::<ConsoleCommand>().unwrap(), ConsoleCommand::ClearKey);
    }

    #[test]
    fn test_parse_movement() {
        assert_eq!(
            "goto 48.85 2.35 12".parse::<ConsoleCommand>().unwrap(),
            ConsoleCommand::Goto(LatLon::new(48.85, 2.35), Some(12))
        );
        assert_eq!(
            "pan -0.01 0.02".parse::<ConsoleCommand>().unwrap(),
            ConsoleCommand::Pan(-0.01, 0.02)
        );
        assert!("zoom 300".parse::<ConsoleCommand>().is_err());
        assert!("goto north south".parse::<ConsoleCommand>().is_err());
        assert!("goto 200 500".parse::<ConsoleCommand>().is_err());
        assert!("goto 45 -190 3".parse::<ConsoleCommand>().is_err());
    }

    #[test]
    fn test_parse_import_keeps_spaces() {
        assert_eq!(
            "import My Rides/loop.gpx".parse::<ConsoleCommand>().unwrap(),
            ConsoleCommand::Import(PathBuf::from("My Rides/loop.gpx"))
        );
    }

    #[test]
    fn test_unknown_command() {
        let err = "teleport".parse::<ConsoleCommand>().unwrap_err();
        assert!(err.contains("try 'help'"));
    }

    #[test]
    fn test_describe_summary() {
        let summary = RouteSummary {
            features: 2,
            points: 10,
            length_meters: 12_340.0,
        };
        assert_eq!(describe_summary(&summary), "2 features, 10 points, 12.34 km");
    }
}
