//! Readers for the extraction output: newline-delimited JSON boundary and
//! place records.

use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::models::{AdminLevel, AdministrativeBoundary, Place, RawGeometry, Tags};

#[derive(Debug, Deserialize)]
struct BoundaryRecord {
    id: i64,
    #[serde(default)]
    source_id: Option<String>,
    #[serde(default)]
    tags: Tags,
    geometry: RawGeometry,
}

/// Counters for one input file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    /// Records that are valid but not relevant (unnamed, other admin levels)
    pub ignored: usize,
    /// Unparsable lines and unusable geometry
    pub malformed: usize,
}

/// Load boundaries at the province, district, municipality and ward levels.
pub fn load_boundaries(path: &Path) -> Result<(Vec<AdministrativeBoundary>, LoadReport)> {
    info!("Loading boundaries from {}", path.display());
    let file = File::open(path)?;
    read_boundaries(BufReader::new(file))
}

pub fn read_boundaries<R: BufRead>(reader: R) -> Result<(Vec<AdministrativeBoundary>, LoadReport)> {
    let mut boundaries = Vec::new();
    let mut report = LoadReport::default();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let record: BoundaryRecord = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                warn!("Skipping boundary line {}: {}", line_no + 1, e);
                report.malformed += 1;
                continue;
            }
        };

        let source_id = record
            .source_id
            .clone()
            .unwrap_or_else(|| format!("relation/{}", record.id));

        let Some(level) = record
            .tags
            .admin_level_code()
            .and_then(AdminLevel::from_osm_level)
        else {
            debug!("Ignoring boundary {} at admin_level {:?}", source_id, record.tags.admin_level);
            report.ignored += 1;
            continue;
        };

        let name = match record.tags.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                debug!("Ignoring unnamed boundary {}", source_id);
                report.ignored += 1;
                continue;
            }
        };

        let boundary = record
            .geometry
            .to_multi_polygon(&source_id)
            .and_then(|geometry| {
                AdministrativeBoundary::new(
                    record.id,
                    source_id.clone(),
                    level,
                    name,
                    record.tags,
                    geometry,
                )
            });

        match boundary {
            Ok(b) => {
                boundaries.push(b);
                report.loaded += 1;
            }
            Err(e) => {
                warn!("Skipping boundary {}: {}", source_id, e);
                report.malformed += 1;
            }
        }
    }

    info!(
        "Loaded {} boundaries ({} ignored, {} malformed)",
        report.loaded, report.ignored, report.malformed
    );

    Ok((boundaries, report))
}

/// Load named places. Geometry is validated later, per place, by the resolver.
pub fn load_places(path: &Path) -> Result<(Vec<Place>, LoadReport)> {
    info!("Loading places from {}", path.display());
    let file = File::open(path)?;
    read_places(BufReader::new(file))
}

pub fn read_places<R: BufRead>(reader: R) -> Result<(Vec<Place>, LoadReport)> {
    let mut places = Vec::new();
    let mut report = LoadReport::default();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let place: Place = match serde_json::from_str(&line) {
            Ok(p) => p,
            Err(e) => {
                warn!("Skipping place line {}: {}", line_no + 1, e);
                report.malformed += 1;
                continue;
            }
        };

        if place.name().map_or(true, |n| n.trim().is_empty()) {
            report.ignored += 1;
            continue;
        }

        places.push(place);
        report.loaded += 1;
    }

    info!(
        "Loaded {} places ({} ignored, {} malformed)",
        report.loaded, report.ignored, report.malformed
    );

    Ok((places, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    const BOUNDARIES: &str = r#"
{"id":1,"tags":{"name":"Banke","admin_level":"6","boundary":"administrative"},"geometry":{"type":"Polygon","coordinates":[[[81.5,27.9],[82.0,27.9],[82.0,28.3],[81.5,28.3]]]}}
{"id":2,"tags":{"name":"Nepal","admin_level":"2"},"geometry":{"type":"Polygon","coordinates":[[[80,26],[89,26],[89,31],[80,31],[80,26]]]}}
{"id":3,"tags":{"admin_level":"9"},"geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,0]]]}}
{"id":4,"tags":{"name":"Broken-01","admin_level":"9"},"geometry":{"type":"Polygon","coordinates":[[[0,0],[1,1]]]}}
not json
"#;

    #[test]
    fn test_read_boundaries() {
        let (boundaries, report) = read_boundaries(Cursor::new(BOUNDARIES)).unwrap();
        assert_eq!(boundaries.len(), 1);
        assert_eq!(boundaries[0].name, "Banke");
        assert_eq!(boundaries[0].level, AdminLevel::District);
        assert_eq!(boundaries[0].source_id, "relation/1");
        assert_eq!(boundaries[0].boundary_type.as_deref(), Some("administrative"));
        assert_eq!(
            report,
            LoadReport {
                loaded: 1,
                ignored: 2,
                malformed: 2
            }
        );
    }

    #[test]
    fn test_load_places_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"id":1,"category":"place","tags":{{"name":"Kathmandu","place":"city"}},"geometry":{{"type":"Point","coordinates":[85.32,27.71]}}}}"#
        )
        .unwrap();
        writeln!(file, r#"{{"id":2,"category":"road","tags":{{"name":"Ring Road"}}}}"#).unwrap();
        writeln!(file, r#"{{"id":3,"category":"poi","tags":{{}}}}"#).unwrap();
        writeln!(file, r#"{{"id":4,"category":"spaceport","tags":{{"name":"x"}}}}"#).unwrap();

        let (places, report) = load_places(file.path()).unwrap();
        assert_eq!(places.len(), 2);
        assert!(places[1].geometry.is_none());
        assert_eq!(report.ignored, 1);
        assert_eq!(report.malformed, 1);
    }

    #[test]
    fn test_read_places_tolerates_altitude_and_numeric_tags() {
        let lines = r#"
{"id":1,"category":"place","tags":{"name":"Kathmandu","place":"city"},"geometry":{"type":"Point","coordinates":[85.32,27.71,1400]}}
{"id":2,"category":"place","tags":{"name":"Patan","population":226728,"admin_level":8},"geometry":{"type":"Point","coordinates":[85.32,27.67]}}
{"id":3,"category":"road","tags":{"name":"Arniko Highway"},"geometry":{"type":"LineString","coordinates":[[85.40,27.67,1300],[85.45,27.68,1350]]}}
"#;
        let (places, report) = read_places(Cursor::new(lines)).unwrap();
        assert_eq!(
            report,
            LoadReport {
                loaded: 3,
                ignored: 0,
                malformed: 0
            }
        );
        assert_eq!(places[0].geometry, Some(RawGeometry::Point([85.32, 27.71])));
        assert_eq!(places[1].tags.admin_level.as_deref(), Some("8"));
        assert_eq!(
            places[2].geometry,
            Some(RawGeometry::LineString(vec![[85.40, 27.67], [85.45, 27.68]]))
        );
    }
}
