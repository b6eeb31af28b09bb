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

use std::path::PathBuf;

use route_core::{ImportError, StoreError};
use thiserror::Error;

use crate::location::LocateError;
use crate::network::TransportError;
use crate::weather::WeatherError;

/// Every failure a user action can end in.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Weather(#[from] WeatherError),

    #[error(transparent)]
    Locate(#[from] LocateError),

    #[error("HTTP client error: {0}")]
    Transport(#[from] TransportError),

    #[error("configuration error: {0}")]
    Config(#[from] confy::ConfyError),

    #[error("could not read {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
