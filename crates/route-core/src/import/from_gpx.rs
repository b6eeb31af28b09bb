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

//! GPX to GeoDocument conversion.
//!
//! Tracks become line features, routes become line features and waypoints
//! become point features, in that order.

use ::gpx::{Gpx, Route, Track, Waypoint};
use log::debug;
use serde_json::Value;

use crate::document::{Feature, GeoDocument, Geometry, Position};

pub(super) fn to_document(raw_text: &str) -> Result<GeoDocument, String> {
    let gpx: Gpx = ::gpx::read(raw_text.as_bytes()).map_err(|e| e.to_string())?;

    debug!(
        "GPX contains {} tracks, {} routes, {} waypoints",
        gpx.tracks.len(),
        gpx.routes.len(),
        gpx.waypoints.len()
    );

    let tracks = gpx.tracks.iter().filter_map(track_feature);
    let routes = gpx.routes.iter().filter_map(route_feature);
    let waypoints = gpx.waypoints.iter().map(waypoint_feature);

    Ok(tracks.chain(routes).chain(waypoints).collect())
}

fn position(waypoint: &Waypoint) -> Position {
    let point = waypoint.point();
    let mut position = vec![point.x(), point.y()];
    if let Some(elevation) = waypoint.elevation.filter(|e| e.is_finite()) {
        position.push(elevation);
    }
    position
}

fn time_string(waypoint: &Waypoint) -> Option<String> {
    waypoint.time.as_ref().and_then(|time| time.format().ok())
}

fn with_text_properties(
    mut feature: Feature,
    name: Option<&String>,
    desc: Option<&String>,
    cmt: Option<&String>,
) -> Feature {
    for (key, value) in [("name", name), ("desc", desc), ("cmt", cmt)] {
        if let Some(value) = value {
            feature = feature.with_property(key, value.as_str());
        }
    }
    feature
}

fn track_feature(track: &Track) -> Option<Feature> {
    let lines: Vec<Vec<Position>> = track
        .segments
        .iter()
        .filter(|segment| !segment.points.is_empty())
        .map(|segment| segment.points.iter().map(position).collect())
        .collect();

    let geometry = match lines.len() {
        0 => return None,
        1 => Geometry::LineString {
            coordinates: lines.into_iter().flatten().collect(),
        },
        _ => Geometry::MultiLineString { coordinates: lines },
    };

    let mut feature = with_text_properties(
        Feature::new(geometry),
        track.name.as_ref(),
        track.description.as_ref(),
        track.comment.as_ref(),
    );

    // Times are only meaningful when every point has one.
    let times: Option<Vec<Value>> = track
        .segments
        .iter()
        .flat_map(|segment| segment.points.iter())
        .map(|point| time_string(point).map(Value::from))
        .collect();
    if let Some(times) = times.filter(|t| !t.is_empty()) {
        feature = feature.with_property("coordTimes", times);
    }

    Some(feature)
}

fn route_feature(route: &Route) -> Option<Feature> {
    if route.points.is_empty() {
        return None;
    }

    let geometry = Geometry::LineString {
        coordinates: route.points.iter().map(position).collect(),
    };
    Some(with_text_properties(
        Feature::new(geometry),
        route.name.as_ref(),
        route.description.as_ref(),
        route.comment.as_ref(),
    ))
}

fn waypoint_feature(waypoint: &Waypoint) -> Feature {
    let geometry = Geometry::Point {
        coordinates: position(waypoint),
    };
    let feature = with_text_properties(
        Feature::new(geometry),
        waypoint.name.as_ref(),
        waypoint.description.as_ref(),
        waypoint.comment.as_ref(),
    );

    match time_string(waypoint) {
        Some(time) => feature.with_property("time", time),
        None => feature,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="trailmap-tests" xmlns="http://www.topografix.com/GPX/1/1">
  <wpt lat="51.5010" lon="-0.1420">
    <ele>12.5</ele>
    <name>Palace</name>
  </wpt>
  <wpt lat="51.5080" lon="-0.0760">
    <desc>Tower</desc>
  </wpt>
  <rte>
    <name>Embankment</name>
    <rtept lat="51.5007" lon="-0.1246"/>
    <rtept lat="51.5080" lon="-0.0990"/>
  </rte>
  <trk>
    <name>Morning loop</name>
    <desc>Around the park</desc>
    <trkseg>
      <trkpt lat="51.5073" lon="-0.1657"><time>2024-05-01T07:00:00Z</time></trkpt>
      <trkpt lat="51.5090" lon="-0.1600"><time>2024-05-01T07:05:00Z</time></trkpt>
      <trkpt lat="51.5110" lon="-0.1550"><time>2024-05-01T07:10:00Z</time></trkpt>
    </trkseg>
  </trk>
  <trk>
    <name>Split</name>
    <trkseg>
      <trkpt lat="51.0" lon="0.0"/>
      <trkpt lat="51.1" lon="0.1"/>
    </trkseg>
    <trkseg>
      <trkpt lat="51.2" lon="0.2"/>
      <trkpt lat="51.3" lon="0.3"/>
    </trkseg>
  </trk>
  <trk>
    <name>Empty</name>
  </trk>
</gpx>"#;

    #[test]
    fn test_feature_count_matches_source() {
        let doc = to_document(SAMPLE).unwrap();
        // two tracks with points, one route, two waypoints
        assert_eq!(doc.len(), 5);
    }

    #[test]
    fn test_feature_order_and_geometry() {
        let doc = to_document(SAMPLE).unwrap();

        assert!(matches!(
            &doc.features[0].geometry,
            Geometry::LineString { coordinates } if coordinates.len() == 3
        ));
        assert!(matches!(
            &doc.features[1].geometry,
            Geometry::MultiLineString { coordinates } if coordinates.len() == 2
        ));
        assert!(matches!(
            &doc.features[2].geometry,
            Geometry::LineString { coordinates } if coordinates.len() == 2
        ));
        assert!(matches!(&doc.features[3].geometry, Geometry::Point { .. }));
        assert!(matches!(&doc.features[4].geometry, Geometry::Point { .. }));
    }

    #[test]
    fn test_properties_and_labels() {
        let doc = to_document(SAMPLE).unwrap();

        assert_eq!(doc.features[0].popup_label(), "Morning loop");
        assert_eq!(doc.features[0].properties["desc"], "Around the park");
        assert_eq!(
            doc.features[0].properties["coordTimes"].as_array().map(Vec::len),
            Some(3)
        );
        assert!(!doc.features[1].properties.contains_key("coordTimes"));
        assert_eq!(doc.features[2].popup_label(), "Embankment");
        assert_eq!(doc.features[3].popup_label(), "Palace");
        assert_eq!(doc.features[4].popup_label(), "Tower");
    }

    #[test]
    fn test_positions_are_lon_lat_ele() {
        let doc = to_document(SAMPLE).unwrap();
        match &doc.features[3].geometry {
            Geometry::Point { coordinates } => {
                assert_eq!(coordinates.len(), 3);
                assert!((coordinates[0] - (-0.142)).abs() < 1e-9);
                assert!((coordinates[1] - 51.501).abs() < 1e-9);
                assert!((coordinates[2] - 12.5).abs() < 1e-9);
            }
            other => panic!("expected point, got {other:?}"),
        }
    }

    #[test]
    fn test_non_finite_elevation_is_dropped() {
        let gpx = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="trailmap-tests" xmlns="http://www.topografix.com/GPX/1/1">
  <wpt lat="51.5" lon="-0.1"><ele>NaN</ele><name>Summit</name></wpt>
</gpx>"#;
        // The parser may reject the value outright; if it accepts it, the
        // elevation must not reach the document.
        if let Ok(doc) = to_document(gpx) {
            match &doc.features[0].geometry {
                Geometry::Point { coordinates } => assert_eq!(coordinates, &vec![-0.1, 51.5]),
                other => panic!("expected point, got {other:?}"),
            }
            assert!(doc.validate().is_ok());
        }
    }
}
