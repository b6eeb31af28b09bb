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

//! KML to GeoDocument conversion.
//!
//! Every `Placemark` in the document becomes one feature, however deeply it
//! is nested in `Document` and `Folder` elements. Placemarks without a
//! supported geometry are skipped.

use log::{debug, warn};
use roxmltree::{Document, Node};

use crate::document::{Feature, GeoDocument, Geometry, Position};

pub(super) fn to_document(raw_text: &str) -> Result<GeoDocument, String> {
    let xml = Document::parse(raw_text).map_err(|e| e.to_string())?;

    let root = xml.root_element();
    if !root.has_tag_name("kml") {
        return Err(format!(
            "root element is <{}>, expected <kml>",
            root.tag_name().name()
        ));
    }

    let features: Vec<Feature> = root
        .descendants()
        .filter(|node| node.has_tag_name("Placemark"))
        .filter_map(placemark_feature)
        .collect();

    debug!("KML produced {} features", features.len());
    Ok(GeoDocument::new(features))
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|c| c.has_tag_name(name))
}

fn child_text(node: Node<'_, '_>, name: &str) -> Option<String> {
    child(node, name)
        .and_then(|c| c.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn placemark_feature(placemark: Node<'_, '_>) -> Option<Feature> {
    let Some(geometry) = placemark.children().filter(Node::is_element).find_map(geometry) else {
        debug!("Skipping placemark without geometry");
        return None;
    };

    let mut feature = Feature::new(geometry);
    for key in ["name", "description", "styleUrl"] {
        if let Some(text) = child_text(placemark, key) {
            feature = feature.with_property(key, text);
        }
    }

    if let Some(extended) = child(placemark, "ExtendedData") {
        for data in extended.children().filter(|c| c.has_tag_name("Data")) {
            if let (Some(name), Some(value)) = (data.attribute("name"), child_text(data, "value")) {
                feature = feature.with_property(name, value);
            }
        }
    }

    Some(feature)
}

fn geometry(node: Node<'_, '_>) -> Option<Geometry> {
    match node.tag_name().name() {
        "Point" => coordinates(node)?
            .into_iter()
            .next()
            .map(|coordinates| Geometry::Point { coordinates }),
        "LineString" => coordinates(node)
            .filter(|c| !c.is_empty())
            .map(|coordinates| Geometry::LineString { coordinates }),
        "Polygon" => polygon(node),
        "MultiGeometry" => {
            let mut geometries: Vec<Geometry> =
                node.children().filter(Node::is_element).filter_map(geometry).collect();
            match geometries.len() {
                0 => None,
                1 => geometries.pop(),
                _ => Some(Geometry::GeometryCollection { geometries }),
            }
        }
        _ => None,
    }
}

fn polygon(node: Node<'_, '_>) -> Option<Geometry> {
    let ring = |boundary: Node<'_, '_>| {
        child(boundary, "LinearRing")
            .and_then(coordinates)
            .filter(|c| !c.is_empty())
    };

    let outer = child(node, "outerBoundaryIs").and_then(ring)?;
    let mut rings = vec![outer];
    rings.extend(
        node.children()
            .filter(|c| c.has_tag_name("innerBoundaryIs"))
            .filter_map(ring),
    );

    Some(Geometry::Polygon { coordinates: rings })
}

/// Positions from a `<coordinates>` child: whitespace separated `lon,lat[,alt]` tuples.
fn coordinates(node: Node<'_, '_>) -> Option<Vec<Position>> {
    let text = child(node, "coordinates")?.text()?;
    let positions = text
        .split_whitespace()
        .filter_map(|tuple| {
            let position: Result<Position, _> = tuple.split(',').map(str::parse::<f64>).collect();
            match position {
                Ok(position) if position.len() >= 2 && position.iter().all(|v| v.is_finite()) => Some(position),
                _ => {
                    warn!("Skipping malformed KML coordinate '{}'", tuple);
                    None
                }
            }
        })
        .collect();
    Some(positions)
}
