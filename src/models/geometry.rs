//! GeoJSON-shaped geometry as delivered by the extraction step, and its
//! conversion into `geo` types.

use geo::{Centroid, Coord, LineString, MultiPolygon, Point, Polygon};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

type Position = [f64; 2];

/// Geometry in GeoJSON layout: `{"type": "...", "coordinates": [...]}`,
/// positions as `[lon, lat]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum RawGeometry {
    #[serde(deserialize_with = "de::position")]
    Point(Position),
    #[serde(deserialize_with = "de::positions")]
    LineString(Vec<Position>),
    #[serde(deserialize_with = "de::rings")]
    Polygon(Vec<Vec<Position>>),
    #[serde(deserialize_with = "de::polygons")]
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

/// Positions may carry altitude or other extra members; only the first
/// two are kept.
mod de {
    use serde::{Deserialize, Deserializer};

    use super::Position;

    #[derive(Deserialize)]
    #[serde(try_from = "Vec<f64>")]
    struct AnyPosition(Position);

    impl TryFrom<Vec<f64>> for AnyPosition {
        type Error = String;

        fn try_from(values: Vec<f64>) -> std::result::Result<Self, Self::Error> {
            match values.as_slice() {
                [x, y, ..] => Ok(AnyPosition([*x, *y])),
                _ => Err(format!(
                    "position needs at least 2 coordinates, got {}",
                    values.len()
                )),
            }
        }
    }

    fn unwrap_all(positions: Vec<AnyPosition>) -> Vec<Position> {
        positions.into_iter().map(|p| p.0).collect()
    }

    pub(super) fn position<'de, D: Deserializer<'de>>(
        d: D,
    ) -> std::result::Result<Position, D::Error> {
        AnyPosition::deserialize(d).map(|p| p.0)
    }

    pub(super) fn positions<'de, D: Deserializer<'de>>(
        d: D,
    ) -> std::result::Result<Vec<Position>, D::Error> {
        Vec::<AnyPosition>::deserialize(d).map(unwrap_all)
    }

    pub(super) fn rings<'de, D: Deserializer<'de>>(
        d: D,
    ) -> std::result::Result<Vec<Vec<Position>>, D::Error> {
        Vec::<Vec<AnyPosition>>::deserialize(d)
            .map(|rings| rings.into_iter().map(unwrap_all).collect())
    }

    pub(super) fn polygons<'de, D: Deserializer<'de>>(
        d: D,
    ) -> std::result::Result<Vec<Vec<Vec<Position>>>, D::Error> {
        Vec::<Vec<Vec<AnyPosition>>>::deserialize(d).map(|polygons| {
            polygons
                .into_iter()
                .map(|rings| rings.into_iter().map(unwrap_all).collect())
                .collect()
        })
    }
}

impl RawGeometry {
    /// Build polygon geometry for a boundary. Only areal types are accepted.
    pub fn to_multi_polygon(&self, id: &str) -> Result<MultiPolygon<f64>> {
        match self {
            RawGeometry::Polygon(rings) => Ok(MultiPolygon::new(vec![build_polygon(id, rings)?])),
            RawGeometry::MultiPolygon(polys) => {
                if polys.is_empty() {
                    return Err(Error::malformed(id, "empty multipolygon"));
                }
                let polygons = polys
                    .iter()
                    .map(|rings| build_polygon(id, rings))
                    .collect::<Result<Vec<_>>>()?;
                Ok(MultiPolygon::new(polygons))
            }
            other => Err(Error::malformed(
                id,
                format!("expected polygon geometry, got {}", other.kind()),
            )),
        }
    }

    /// The point used for containment tests: the point itself, otherwise
    /// the centroid of the line or polygon.
    pub fn representative_point(&self, id: &str) -> Result<Point<f64>> {
        let centroid = match self {
            RawGeometry::Point(p) => return Ok(Point::from(to_coord(id, p)?)),
            RawGeometry::LineString(positions) => {
                if positions.is_empty() {
                    return Err(Error::malformed(id, "empty line"));
                }
                let coords = positions
                    .iter()
                    .map(|p| to_coord(id, p))
                    .collect::<Result<Vec<_>>>()?;
                LineString::new(coords).centroid()
            }
            RawGeometry::Polygon(_) | RawGeometry::MultiPolygon(_) => {
                self.to_multi_polygon(id)?.centroid()
            }
        };

        centroid
            .filter(|p| p.x().is_finite() && p.y().is_finite())
            .ok_or_else(|| Error::malformed(id, "no centroid"))
    }

    fn kind(&self) -> &'static str {
        match self {
            RawGeometry::Point(_) => "Point",
            RawGeometry::LineString(_) => "LineString",
            RawGeometry::Polygon(_) => "Polygon",
            RawGeometry::MultiPolygon(_) => "MultiPolygon",
        }
    }
}

fn to_coord(id: &str, position: &Position) -> Result<Coord<f64>> {
    let [x, y] = *position;
    if !x.is_finite() || !y.is_finite() {
        return Err(Error::malformed(id, "non-finite coordinate"));
    }
    Ok(Coord { x, y })
}

/// Close the ring if needed; a usable ring has at least 4 positions.
fn build_ring(id: &str, positions: &[Position]) -> Result<LineString<f64>> {
    let mut ring = positions
        .iter()
        .map(|p| to_coord(id, p))
        .collect::<Result<Vec<_>>>()?;

    if ring.len() >= 3 && ring.first() != ring.last() {
        ring.push(ring[0]);
    }

    if ring.len() < 4 {
        return Err(Error::malformed(
            id,
            format!("ring has {} positions", positions.len()),
        ));
    }

    Ok(LineString::new(ring))
}

fn build_polygon(id: &str, rings: &[Vec<Position>]) -> Result<Polygon<f64>> {
    let (exterior, interiors) = rings
        .split_first()
        .ok_or_else(|| Error::malformed(id, "polygon without rings"))?;

    let exterior = build_ring(id, exterior)?;
    let interiors = interiors
        .iter()
        .map(|ring| build_ring(id, ring))
        .collect::<Result<Vec<_>>>()?;

    Ok(Polygon::new(exterior, interiors))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Position> {
        vec![[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0], [0.0, 0.0]]
    }

    #[test]
    fn test_parse_geojson_layout() {
        let geometry: RawGeometry =
            serde_json::from_str(r#"{"type":"Point","coordinates":[81.6,28.05]}"#).unwrap();
        assert_eq!(geometry, RawGeometry::Point([81.6, 28.05]));
    }

    #[test]
    fn test_altitude_is_ignored() {
        let point: RawGeometry =
            serde_json::from_str(r#"{"type":"Point","coordinates":[85.32,27.71,1400.0]}"#).unwrap();
        assert_eq!(point, RawGeometry::Point([85.32, 27.71]));

        let polygon: RawGeometry = serde_json::from_str(
            r#"{"type":"Polygon","coordinates":[[[0,0,5],[2,0,5],[2,2,5],[0,2,5],[0,0,5]]]}"#,
        )
        .unwrap();
        assert_eq!(polygon, RawGeometry::Polygon(vec![square()]));

        let short: std::result::Result<RawGeometry, _> =
            serde_json::from_str(r#"{"type":"Point","coordinates":[85.32]}"#);
        assert!(short.is_err());
    }

    #[test]
    fn test_open_ring_is_closed() {
        let open = vec![[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0]];
        let mp = RawGeometry::Polygon(vec![open]).to_multi_polygon("b1").unwrap();
        let exterior = mp.0[0].exterior();
        assert_eq!(exterior.0.first(), exterior.0.last());
        assert_eq!(exterior.0.len(), 5);
    }

    #[test]
    fn test_short_ring_rejected() {
        let err = RawGeometry::Polygon(vec![vec![[0.0, 0.0], [1.0, 1.0]]])
            .to_multi_polygon("b2")
            .unwrap_err();
        assert!(matches!(err, Error::MalformedGeometry { .. }));
    }

    #[test]
    fn test_non_finite_rejected() {
        let err = RawGeometry::Point([f64::NAN, 1.0])
            .representative_point("p1")
            .unwrap_err();
        assert!(matches!(err, Error::MalformedGeometry { .. }));
    }

    #[test]
    fn test_polygon_centroid() {
        let point = RawGeometry::Polygon(vec![square()])
            .representative_point("p2")
            .unwrap();
        assert!((point.x() - 1.0).abs() < 1e-9);
        assert!((point.y() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_point_is_not_a_boundary() {
        assert!(RawGeometry::Point([1.0, 1.0]).to_multi_polygon("b3").is_err());
    }
}
