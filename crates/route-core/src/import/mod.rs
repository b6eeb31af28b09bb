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

//! Route import from geographic track files.
//!
//! Two dialects are supported: GPX and KML. Both are converted into a
//! [`GeoDocument`] following the usual track-to-GeoJSON conventions, so a
//! route looks the same whichever file it came from.

mod from_gpx;
mod from_kml;

use std::fmt;

use log::info;
use thiserror::Error;

use crate::document::GeoDocument;

/// Errors that can occur while importing a route file.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("could not parse {dialect} file: {message}")]
    Parse { dialect: Dialect, message: String },

    #[error("unsupported file type '{0}': expected a .gpx or .kml file")]
    UnsupportedDialect(String),
}

/// Supported track file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Gpx,
    Kml,
}

impl Dialect {
    /// Infer the dialect from the file name's suffix, ignoring case.
    ///
    /// A bare `.gpx` counts as a GPX file.
    pub fn from_file_name(name: &str) -> Result<Self, ImportError> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".gpx") {
            Ok(Self::Gpx)
        } else if lower.ends_with(".kml") {
            Ok(Self::Kml)
        } else {
            Err(ImportError::UnsupportedDialect(name.to_string()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gpx => "GPX",
            Self::Kml => "KML",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convert the text of a track file into a [`GeoDocument`].
pub fn import(raw_text: &str, dialect: Dialect) -> Result<GeoDocument, ImportError> {
    let doc = match dialect {
        Dialect::Gpx => from_gpx::to_document(raw_text),
        Dialect::Kml => from_kml::to_document(raw_text),
    }
    .map_err(|message| ImportError::Parse { dialect, message })?;

    doc.validate().map_err(|e| ImportError::Parse {
        dialect,
        message: e.to_string(),
    })?;

    info!("Imported {} document with {} features", dialect, doc.len());
    Ok(doc)
}
