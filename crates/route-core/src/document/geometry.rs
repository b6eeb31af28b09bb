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

use geo::{Coord, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use serde::{Deserialize, Serialize};

/// `[longitude, latitude]` or `[longitude, latitude, elevation]`.
pub type Position = Vec<f64>;

/// GeoJSON geometry object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Position },
    MultiPoint { coordinates: Vec<Position> },
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
    GeometryCollection { geometries: Vec<Geometry> },
}

impl Geometry {
    /// True when there is nothing to draw.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Point { coordinates } => coordinates.is_empty(),
            Self::MultiPoint { coordinates } | Self::LineString { coordinates } => coordinates.is_empty(),
            Self::MultiLineString { coordinates } => coordinates.iter().all(Vec::is_empty),
            Self::Polygon { coordinates } => coordinates.first().map_or(true, Vec::is_empty),
            Self::MultiPolygon { coordinates } => coordinates
                .iter()
                .all(|polygon| polygon.first().map_or(true, Vec::is_empty)),
            Self::GeometryCollection { geometries } => {
                geometries.is_empty() || geometries.iter().any(Self::is_empty)
            }
        }
    }

    /// Every position, in document order.
    pub fn positions(&self) -> impl Iterator<Item = &Position> + '_ {
        let mut out = Vec::new();
        self.collect_positions(&mut out);
        out.into_iter()
    }

    fn collect_positions<'a>(&'a self, out: &mut Vec<&'a Position>) {
        match self {
            Self::Point { coordinates } => out.push(coordinates),
            Self::MultiPoint { coordinates } | Self::LineString { coordinates } => out.extend(coordinates),
            Self::MultiLineString { coordinates } | Self::Polygon { coordinates } => {
                out.extend(coordinates.iter().flatten());
            }
            Self::MultiPolygon { coordinates } => out.extend(coordinates.iter().flatten().flatten()),
            Self::GeometryCollection { geometries } => {
                for geometry in geometries {
                    geometry.collect_positions(out);
                }
            }
        }
    }

    /// Line work (not polygon rings) for length measurement.
    pub fn lines(&self) -> impl Iterator<Item = &[Position]> + '_ {
        let mut out = Vec::new();
        self.collect_lines(&mut out);
        out.into_iter()
    }

    fn collect_lines<'a>(&'a self, out: &mut Vec<&'a [Position]>) {
        match self {
            Self::LineString { coordinates } => out.push(coordinates),
            Self::MultiLineString { coordinates } => out.extend(coordinates.iter().map(Vec::as_slice)),
            Self::GeometryCollection { geometries } => {
                for geometry in geometries {
                    geometry.collect_lines(out);
                }
            }
            _ => {}
        }
    }

    /// Convert to a `geo` geometry for spatial algorithms.
    ///
    /// Positions with fewer than two ordinates are dropped.
    #[must_use]
    pub fn to_geo(&self) -> Option<geo::Geometry<f64>> {
        if self.is_empty() {
            return None;
        }

        let geometry = match self {
            Self::Point { coordinates } => geo::Geometry::Point(Point::from(to_coord(coordinates)?)),
            Self::MultiPoint { coordinates } => geo::Geometry::MultiPoint(MultiPoint::new(
                coordinates.iter().filter_map(|p| to_coord(p).map(Point::from)).collect(),
            )),
            Self::LineString { coordinates } => geo::Geometry::LineString(to_line(coordinates)),
            Self::MultiLineString { coordinates } => geo::Geometry::MultiLineString(MultiLineString::new(
                coordinates.iter().map(|line| to_line(line)).collect(),
            )),
            Self::Polygon { coordinates } => geo::Geometry::Polygon(to_polygon(coordinates)),
            Self::MultiPolygon { coordinates } => geo::Geometry::MultiPolygon(MultiPolygon::new(
                coordinates.iter().map(|rings| to_polygon(rings)).collect(),
            )),
            Self::GeometryCollection { geometries } => geo::Geometry::GeometryCollection(
                geometries
                    .iter()
                    .filter_map(Self::to_geo)
                    .collect::<GeometryCollection<f64>>(),
            ),
        };
        Some(geometry)
    }
}

fn to_coord(position: &[f64]) -> Option<Coord<f64>> {
    match position {
        [x, y, ..] => Some(Coord { x: *x, y: *y }),
        _ => None,
    }
}

fn to_line(positions: &[Position]) -> LineString<f64> {
    LineString::new(positions.iter().filter_map(|p| to_coord(p)).collect())
}

fn to_polygon(rings: &[Vec<Position>]) -> Polygon<f64> {
    let mut rings = rings.iter().map(|ring| to_line(ring));
    let exterior = rings.next().unwrap_or_else(|| LineString::new(Vec::new()));
    Polygon::new(exterior, rings.collect())
}
