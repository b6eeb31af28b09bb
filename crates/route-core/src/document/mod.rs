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

//! Normalized geographic documents.
//!
//! A [`GeoDocument`] is an ordered feature collection that serializes as a
//! GeoJSON `FeatureCollection`. Every route, whether imported from a file or
//! loaded from storage, is represented this way.

mod geometry;

pub use geometry::{Geometry, Position};

use geo::{BoundingRect, Distance, GeometryCollection, Haversine, Point};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::viewport::Bounds;

/// Popup label used when a feature carries neither `name` nor `desc`.
pub const FALLBACK_LABEL: &str = "Route Feature";

/// Feature properties: string keys to JSON scalars.
pub type Properties = serde_json::Map<String, Value>;

/// Errors produced when reading a serialized document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("invalid GeoJSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("feature {index} has an empty geometry")]
    EmptyGeometry { index: usize },

    #[error("feature {index} has a position with fewer than two finite numbers")]
    InvalidPosition { index: usize },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
enum CollectionTag {
    #[default]
    FeatureCollection,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
enum FeatureTag {
    #[default]
    Feature,
}

/// A single geographic feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default)]
    tag: FeatureTag,

    pub geometry: Geometry,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub properties: Properties,
}

impl Feature {
    #[must_use]
    pub fn new(geometry: Geometry) -> Self {
        Self {
            tag: FeatureTag::Feature,
            geometry,
            properties: Properties::new(),
        }
    }

    /// Set a property, builder style.
    #[must_use]
    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    /// Human readable label: `name`, else `desc`, else [`FALLBACK_LABEL`].
    #[must_use]
    pub fn popup_label(&self) -> String {
        ["name", "desc"]
            .iter()
            .find_map(|key| self.properties.get(*key).and_then(label_text))
            .unwrap_or_else(|| FALLBACK_LABEL.to_string())
    }
}

// Empty strings, zero, false and null do not count as a label.
fn label_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Properties, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Properties>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Aggregate statistics for display after an import or load.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteSummary {
    pub features: usize,
    pub points: usize,
    pub length_meters: f64,
}

/// Normalized feature collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoDocument {
    #[serde(rename = "type", default)]
    tag: CollectionTag,

    pub features: Vec<Feature>,
}

impl GeoDocument {
    #[must_use]
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            tag: CollectionTag::FeatureCollection,
            features,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Parse and validate a serialized document.
    pub fn from_json(text: &str) -> Result<Self, DocumentError> {
        let doc: Self = serde_json::from_str(text)?;
        doc.validate()?;
        Ok(doc)
    }

    pub fn to_json(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Check that every feature has a usable geometry.
    pub fn validate(&self) -> Result<(), DocumentError> {
        for (index, feature) in self.features.iter().enumerate() {
            if feature.geometry.is_empty() {
                return Err(DocumentError::EmptyGeometry { index });
            }
            if !feature.geometry.positions().all(is_valid_position) {
                return Err(DocumentError::InvalidPosition { index });
            }
        }
        Ok(())
    }

    /// Bounding box of every feature, `None` for an empty document.
    #[must_use]
    pub fn bounds(&self) -> Option<Bounds> {
        let collection: GeometryCollection<f64> = self
            .features
            .iter()
            .filter_map(|f| f.geometry.to_geo())
            .collect();
        collection.bounding_rect().map(Bounds::from)
    }

    /// Feature count, position count and Haversine length of all line work.
    #[must_use]
    pub fn summary(&self) -> RouteSummary {
        let points = self.features.iter().map(|f| f.geometry.positions().count()).sum();
        let length_meters = self
            .features
            .iter()
            .flat_map(|f| f.geometry.lines())
            .map(line_length)
            .sum();

        RouteSummary {
            features: self.features.len(),
            points,
            length_meters,
        }
    }
}

impl FromIterator<Feature> for GeoDocument {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

fn is_valid_position(position: &Position) -> bool {
    position.len() >= 2 && position.iter().all(|c| c.is_finite())
}

fn line_length(line: &[Position]) -> f64 {
    line.windows(2)
        .map(|pair| {
            let a = Point::new(pair[0][0], pair[0][1]);
            let b = Point::new(pair[1][0], pair[1][1]);
            Haversine::distance(a, b)
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GeoDocument {
        GeoDocument::new(vec![
            Feature::new(Geometry::LineString {
                coordinates: vec![vec![-0.1, 51.5], vec![-0.09, 51.51, 12.0]],
            })
            .with_property("name", "Thames loop"),
            Feature::new(Geometry::Point {
                coordinates: vec![-0.12, 51.49],
            })
            .with_property("desc", "Cafe stop"),
        ])
    }

    #[test]
    fn test_popup_label_precedence() {
        let both = Feature::new(Geometry::Point { coordinates: vec![0.0, 0.0] })
            .with_property("name", "Name")
            .with_property("desc", "Desc");
        assert_eq!(both.popup_label(), "Name");

        let desc_only = Feature::new(Geometry::Point { coordinates: vec![0.0, 0.0] })
            .with_property("name", "")
            .with_property("desc", "Desc");
        assert_eq!(desc_only.popup_label(), "Desc");

        let neither = Feature::new(Geometry::Point { coordinates: vec![0.0, 0.0] });
        assert_eq!(neither.popup_label(), FALLBACK_LABEL);
    }

    #[test]
    fn test_json_round_trip_is_structural() {
        let doc = sample();
        let text = doc.to_json().unwrap();
        assert!(text.contains("\"type\":\"FeatureCollection\""));
        assert!(text.contains("\"type\":\"Feature\""));
        assert_eq!(GeoDocument::from_json(&text).unwrap(), doc);
    }

    #[test]
    fn test_accepts_null_properties() {
        let text = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","geometry":{"type":"Point","coordinates":[1.0,2.0]},"properties":null}
        ]}"#;
        let doc = GeoDocument::from_json(text).unwrap();
        assert!(doc.features[0].properties.is_empty());
    }

    #[test]
    fn test_rejects_empty_geometry() {
        let text = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","geometry":{"type":"LineString","coordinates":[]},"properties":{}}
        ]}"#;
        assert!(matches!(
            GeoDocument::from_json(text),
            Err(DocumentError::EmptyGeometry { index: 0 })
        ));
    }

    #[test]
    fn test_rejects_short_position() {
        let text = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","geometry":{"type":"Point","coordinates":[1.0]},"properties":{}}
        ]}"#;
        assert!(matches!(
            GeoDocument::from_json(text),
            Err(DocumentError::InvalidPosition { index: 0 })
        ));
    }

    #[test]
    fn test_rejects_wrong_collection_type() {
        let text = r#"{"type":"Feature","features":[]}"#;
        assert!(matches!(GeoDocument::from_json(text), Err(DocumentError::Json(_))));
    }

    #[test]
    fn test_bounds_and_summary() {
        let doc = sample();
        let bounds = doc.bounds().unwrap();
        assert_eq!(bounds, Bounds::new(-0.12, 51.49, -0.09, 51.51));

        let summary = doc.summary();
        assert_eq!(summary.features, 2);
        assert_eq!(summary.points, 3);
        // ~1.3 km between the two line vertices
        assert!(summary.length_meters > 1_000.0 && summary.length_meters < 1_600.0);
    }

    #[test]
    fn test_empty_document_has_no_bounds() {
        assert!(GeoDocument::default().bounds().is_none());
    }
}
