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

mod config;
mod console;
mod error;
mod gas;
mod location;
mod map;
mod network;
mod session;
mod weather;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use log::{error, info};
use route_core::{FileBackend, LatLon, LayerId, WebMercator};
use walkers::sources::TileSource;
use walkers::TileId;

use config::AppConfig;
use console::{describe_summary, print_layer, print_status, read_route_file};
use error::AppError;
use gas::PlaceholderGasPrices;
use map::{NexradRadarSource, OpenStreetMapSource};
use network::ReqwestTransport;
use session::{EventOutcome, MapSession};
use weather::{api_key_source, resolve_api_key, WeatherClient, API_KEY_ENV};

type Session = MapSession<FileBackend, ReqwestTransport>;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory for the saved route and API key
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a GPX or KML file and show it
    Import {
        path: PathBuf,

        /// Also store it as the saved route
        #[arg(long)]
        save: bool,
    },
    /// Show the saved route
    Load,
    /// Delete the saved route
    Clear,
    /// Manage the OpenWeatherMap API key
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },
    /// Fetch weather stations for the map area
    Weather(ViewArgs),
    /// Show gas price markers around the map center
    Gas(ViewArgs),
    /// Show the NEXRAD radar overlay and its tile for the map center
    Radar(ViewArgs),
    /// Center the map on your current position
    Locate,
    /// Print the configuration, optionally updating values first
    Config(ConfigArgs),
    /// Drive the map from an interactive control panel (default)
    Interactive,
}

#[derive(Subcommand, Debug)]
enum KeyAction {
    /// Save a key; a blank key clears it
    Set { key: String },
    /// Remove the saved key
    Clear,
    /// Show whether a key is available and where it comes from
    Show,
}

#[derive(Args, Debug, Default)]
struct ConfigArgs {
    /// Base map tile URL template with {z}, {x} and {y}
    #[arg(long)]
    tile_url: Option<String>,

    /// Startup zoom level
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=19))]
    default_zoom: Option<u8>,

    /// Startup map center as LAT,LON
    #[arg(long, value_parser = parse_lat_lon, allow_hyphen_values = true)]
    default_center: Option<LatLon>,

    /// OpenWeatherMap API root
    #[arg(long)]
    weather_base_url: Option<String>,
}

impl ConfigArgs {
    /// Apply the given values; returns whether anything changed.
    fn apply(self, config: &mut AppConfig) -> bool {
        let mut changed = false;
        if let Some(tile_url) = self.tile_url {
            config.tile_url = tile_url;
            changed = true;
        }
        if let Some(zoom) = self.default_zoom {
            config.default_zoom = zoom;
            changed = true;
        }
        if let Some(center) = self.default_center {
            config.default_latitude = center.lat;
            config.default_longitude = center.lon;
            changed = true;
        }
        if let Some(url) = self.weather_base_url {
            config.weather_base_url = url;
            changed = true;
        }
        changed
    }
}

fn parse_lat_lon(value: &str) -> Result<LatLon, String> {
    let (lat, lon) = value
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LON, got '{value}'"))?;
    let position = LatLon::new(latitude(lat.trim())?, longitude(lon.trim())?);
    if !position.is_valid() {
        return Err(format!("{value} is outside valid coordinates"));
    }
    Ok(position)
}

fn latitude(value: &str) -> Result<f64, String> {
    degrees(value, 90.0).map_err(|e| format!("invalid latitude: {e}"))
}

fn longitude(value: &str) -> Result<f64, String> {
    degrees(value, 180.0).map_err(|e| format!("invalid longitude: {e}"))
}

fn degrees(value: &str, limit: f64) -> Result<f64, String> {
    let degrees: f64 = value.parse().map_err(|e| format!("{e}"))?;
    if (-limit..=limit).contains(&degrees) {
        Ok(degrees)
    } else {
        Err(format!("{value} is outside -{limit}..={limit}"))
    }
}

#[derive(Args, Debug, Default)]
struct ViewArgs {
    /// Map center latitude
    #[arg(long, allow_hyphen_values = true, requires = "lon", value_parser = latitude)]
    lat: Option<f64>,

    /// Map center longitude
    #[arg(long, allow_hyphen_values = true, requires = "lat", value_parser = longitude)]
    lon: Option<f64>,

    /// Map zoom level
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=19))]
    zoom: Option<u8>,
}

impl ViewArgs {
    fn apply(&self, session: &mut Session) {
        let viewport = *session.viewport();
        let center = match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => LatLon::new(lat, lon),
            _ => viewport.center,
        };
        let zoom = self.zoom.unwrap_or(viewport.zoom);
        session.move_viewport(viewport.moved_to(center, zoom));
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = Some(data_dir);
    }

    let data_dir = config.resolved_data_dir();
    info!("Using data directory {:?}", data_dir);

    let transport = ReqwestTransport::new()?;
    let weather = WeatherClient::new(transport.clone()).with_base_url(config.weather_base_url.clone());
    let mut session = MapSession::new(
        FileBackend::new(data_dir),
        weather,
        Box::new(PlaceholderGasPrices),
        config.initial_viewport(),
    )?
    .with_fallback_api_key(resolve_api_key(None, config.openweathermap_api_key.as_deref()));

    match cli.command.unwrap_or(Command::Interactive) {
        Command::Import { path, save } => {
            let text = read_route_file(&path)?;
            let file_name = path
                .file_name()
                .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
            let summary = session.import_route(&file_name, &text)?;
            println!("Route loaded successfully: {}", describe_summary(&summary));
            print_layer(&session, LayerId::Route);
            if save && session.save_current_route()? {
                println!("Current route saved");
            }
        }
        Command::Load => match session.load_saved_route()? {
            Some(summary) => {
                println!("Route loaded from storage: {}", describe_summary(&summary));
                print_layer(&session, LayerId::Route);
            }
            None => println!("No saved route found"),
        },
        Command::Clear => {
            session.clear_saved_route()?;
            println!("Saved route deleted");
        }
        Command::Key { action } => match action {
            KeyAction::Set { key } => {
                if session.save_api_key(&key)? {
                    println!("OpenWeatherMap API key saved");
                } else {
                    println!("OpenWeatherMap API key cleared, weather layer disabled");
                }
            }
            KeyAction::Clear => {
                session.clear_api_key()?;
                println!("OpenWeatherMap API key cleared, weather layer disabled");
            }
            KeyAction::Show => {
                match api_key_source(session.api_key(), config.openweathermap_api_key.as_deref()) {
                    Some(source) => println!("OpenWeatherMap API key available from {source}"),
                    None => println!(
                        "No OpenWeatherMap API key, weather layer unavailable. \
                         Save one with `key set` or set {API_KEY_ENV}"
                    ),
                }
            }
        },
        Command::Weather(view) => {
            view.apply(&mut session);
            session.set_weather_enabled(true)?;
            if let Some(EventOutcome::WeatherUpdated { stations }) = session.settle_weather().await? {
                info!("Weather layer shows {} stations", stations);
            }
            print_layer(&session, LayerId::Weather);
        }
        Command::Gas(view) => {
            view.apply(&mut session);
            session.set_gas_enabled(true);
            print_layer(&session, LayerId::GasPrice);
        }
        Command::Radar(view) => {
            view.apply(&mut session);
            session.set_radar_enabled(true);
            print_layer(&session, LayerId::Radar);
            println!("Center tile: {}", center_tile_url(&NexradRadarSource, &session));
            println!("Base map:    {}", center_tile_url(&OpenStreetMapSource::new(&config.tile_url), &session));
        }
        Command::Locate => {
            let position = location::locate(config.gps_override(), &transport).await?;
            session.center_on(position);
            print_status(&session);
        }
        Command::Config(args) => {
            if args.apply(&mut config) {
                config.save()?;
                println!("Configuration updated");
            }
            println!("Configuration file: {}", AppConfig::get_config_path()?.display());
            println!("{config:#?}");
        }
        Command::Interactive => {
            console::run(session, config.gps_override(), &transport).await?;
        }
    }

    Ok(())
}

/// URL of the tile under the viewport center.
fn center_tile_url(source: &impl TileSource, session: &Session) -> String {
    let viewport = session.viewport();
    let zoom = viewport.zoom;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, reason = "tile indices are non-negative and bounded by 2^zoom")]
    let tile_id = TileId {
        x: WebMercator::lon_to_x(viewport.center.lon, zoom).floor() as u32,
        y: WebMercator::lat_to_y(viewport.center.lat, zoom).floor() as u32,
        zoom,
    };
    source.tile_url(tile_id)
}
