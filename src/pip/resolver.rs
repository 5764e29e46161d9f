//! Hierarchy resolution: assigns province, district, municipality and
//! ward to each place from the boundary catalog.

use geo::Point;
use indicatif::ProgressBar;
use rayon::prelude::*;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

use super::BoundaryCatalog;
use crate::error::{Error, Result};
use crate::models::{
    AdminLevel, AdminName, AdministrativeBoundary, GeoPoint, Place, PlaceCategory,
    ResolvedHierarchy, Tags,
};

/// "Nepalgunj-01" -> "Nepalgunj"
static WARD_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+)-[0-9]+$").expect("valid ward suffix pattern"));

/// Localized ward names may carry Devanagari numerals.
static WARD_SUFFIX_LOCALIZED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+)-\d+$").expect("valid ward suffix pattern"));

/// A place after resolution, with the point its hierarchy was computed from.
#[derive(Debug, Clone)]
pub struct ResolvedPlace {
    pub place: Place,
    pub location: Option<GeoPoint>,
}

/// Counters for one batch run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveReport {
    pub total: usize,
    pub resolved: usize,
    /// Places dropped because of malformed geometry
    pub skipped: usize,
    /// Places without geometry, kept with an empty hierarchy
    pub without_geometry: usize,
    /// Places with a value at each level
    pub filled: BTreeMap<AdminLevel, usize>,
}

/// Point-in-polygon hierarchy resolver over a shared, read-only catalog.
pub struct HierarchyResolver {
    catalog: Arc<BoundaryCatalog>,
}

impl HierarchyResolver {
    pub fn new(catalog: Arc<BoundaryCatalog>) -> Self {
        Self { catalog }
    }

    /// Resolve all four levels for a point, then infer a missing
    /// municipality from the ward.
    pub fn resolve_point(&self, point: Point<f64>) -> ResolvedHierarchy {
        self.resolve_up_to(point, None)
    }

    /// Resolve levels coarser than `limit` (all levels when `None`).
    fn resolve_up_to(&self, point: Point<f64>, limit: Option<AdminLevel>) -> ResolvedHierarchy {
        let mut hierarchy = ResolvedHierarchy::default();
        let mut ward_boundary: Option<&Arc<AdministrativeBoundary>> = None;

        for level in AdminLevel::all() {
            if limit.is_some_and(|limit| *level >= limit) {
                break;
            }
            let Some(boundary) = self.catalog.smallest_containing(point, *level) else {
                continue;
            };
            match level {
                AdminLevel::Ward => {
                    hierarchy.ward = boundary.ward_number();
                    ward_boundary = Some(boundary);
                }
                _ => hierarchy.set_name(*level, boundary.admin_name()),
            }
        }

        if let Some(ward) = ward_boundary {
            fill_municipality_from_ward(&mut hierarchy, &ward.name, ward.name_ne.as_deref());
        }

        debug!(
            "Resolved ({}, {}): province={:?} district={:?} municipality={:?} ward={:?}",
            point.x(),
            point.y(),
            hierarchy.province.as_ref().map(|n| &n.name),
            hierarchy.district.as_ref().map(|n| &n.name),
            hierarchy.municipality.as_ref().map(|n| &n.name),
            hierarchy.ward
        );

        hierarchy
    }

    /// Hierarchy of an administrative boundary indexed as a place: its own
    /// level is itself, finer levels stay empty, coarser levels come from
    /// its centroid.
    fn resolve_boundary_place(
        &self,
        point: Point<f64>,
        level: AdminLevel,
        tags: &Tags,
    ) -> ResolvedHierarchy {
        let mut hierarchy = self.resolve_up_to(point, Some(level));
        let Some(name) = tags.name.as_deref() else {
            return hierarchy;
        };

        match level {
            AdminLevel::Ward => {
                hierarchy.ward = tags
                    .ward_source()
                    .and_then(crate::models::admin::parse_ward_number);
                fill_municipality_from_ward(&mut hierarchy, name, tags.name_ne.as_deref());
            }
            _ => hierarchy.set_name(
                level,
                AdminName {
                    name: name.to_string(),
                    name_ne: tags.name_ne.clone(),
                },
            ),
        }

        hierarchy
    }

    /// Resolve a single place. Malformed geometry is an error for this
    /// place only; a missing geometry leaves the hierarchy empty.
    pub fn resolve_place(&self, mut place: Place) -> Result<ResolvedPlace> {
        let Some(geometry) = place.geometry.as_ref() else {
            return Ok(ResolvedPlace {
                place,
                location: None,
            });
        };

        let point = geometry.representative_point(&place.doc_id())?;

        place.hierarchy = match (place.category, place.admin_level()) {
            (PlaceCategory::AdminBoundary, Some(level)) => {
                self.resolve_boundary_place(point, level, &place.tags)
            }
            _ => self.resolve_point(point),
        };

        Ok(ResolvedPlace {
            place,
            location: Some(point.into()),
        })
    }

    /// Resolve a batch on a bounded worker pool. Output keeps input order;
    /// places that fail are logged, counted and left out.
    pub fn resolve_all(
        &self,
        places: Vec<Place>,
        workers: usize,
        progress: Option<&ProgressBar>,
    ) -> Result<(Vec<ResolvedPlace>, ResolveReport)> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("resolve-{i}"))
            .build()
            .map_err(|e| Error::Config(format!("failed to build worker pool: {e}")))?;

        let total = places.len();
        let outcomes: Vec<(i64, Result<ResolvedPlace>)> = pool.install(|| {
            places
                .into_par_iter()
                .map(|place| {
                    let id = place.id;
                    let outcome = self.resolve_place(place);
                    if let Some(pb) = progress {
                        pb.inc(1);
                    }
                    (id, outcome)
                })
                .collect()
        });

        let mut report = ResolveReport {
            total,
            ..ResolveReport::default()
        };
        let mut resolved = Vec::with_capacity(total);

        for (id, outcome) in outcomes {
            match outcome {
                Ok(rp) => {
                    if rp.location.is_none() {
                        report.without_geometry += 1;
                    }
                    for level in AdminLevel::all() {
                        if rp.place.hierarchy.is_resolved(*level) {
                            *report.filled.entry(*level).or_default() += 1;
                        }
                    }
                    resolved.push(rp);
                }
                Err(e) => {
                    warn!("Skipping place {}: {}", id, e);
                    report.skipped += 1;
                }
            }
        }
        report.resolved = resolved.len();

        Ok((resolved, report))
    }
}

/// Municipality candidate from a ward name ending in "-<digits>".
pub fn municipality_from_ward_name(ward_name: &str) -> Option<String> {
    strip_ward_suffix(&WARD_SUFFIX, ward_name)
}

fn strip_ward_suffix(pattern: &Regex, ward_name: &str) -> Option<String> {
    let stem = pattern.captures(ward_name.trim())?.get(1)?.as_str().trim_end();
    (!stem.is_empty()).then(|| stem.to_string())
}

/// Only fills an empty municipality; an existing value is never replaced.
fn fill_municipality_from_ward(
    hierarchy: &mut ResolvedHierarchy,
    ward_name: &str,
    ward_name_ne: Option<&str>,
) {
    if hierarchy.municipality.is_some() {
        return;
    }
    if let Some(name) = municipality_from_ward_name(ward_name) {
        hierarchy.municipality = Some(AdminName {
            name,
            name_ne: ward_name_ne.and_then(|n| strip_ward_suffix(&WARD_SUFFIX_LOCALIZED, n)),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawGeometry;
    use crate::pip::index::tests::rect_boundary;

    fn resolver(boundaries: Vec<AdministrativeBoundary>) -> HierarchyResolver {
        HierarchyResolver::new(Arc::new(BoundaryCatalog::build(boundaries)))
    }

    fn nepalgunj() -> Vec<AdministrativeBoundary> {
        vec![
            rect_boundary(1, AdminLevel::Province, "Lumbini Province", (0.0, 0.0, 10.0, 10.0)),
            rect_boundary(2, AdminLevel::District, "Banke", (0.0, 0.0, 5.0, 5.0)),
            rect_boundary(3, AdminLevel::Ward, "Nepalgunj-01", (1.0, 1.0, 2.0, 2.0)),
        ]
    }

    fn point_place(id: i64, lon: f64, lat: f64) -> Place {
        Place::new(
            id,
            PlaceCategory::Place,
            Tags {
                name: Some(format!("place {id}")),
                ..Tags::default()
            },
            Some(RawGeometry::Point([lon, lat])),
        )
    }

    #[test]
    fn test_resolves_every_level() {
        let mut boundaries = nepalgunj();
        boundaries.push(rect_boundary(
            4,
            AdminLevel::Municipality,
            "Nepalgunj Sub-Metropolitan City",
            (0.5, 0.5, 3.0, 3.0),
        ));
        let h = resolver(boundaries).resolve_point(Point::new(1.5, 1.5));

        assert_eq!(h.province.unwrap().name, "Lumbini Province");
        assert_eq!(h.district.unwrap().name, "Banke");
        assert_eq!(h.municipality.unwrap().name, "Nepalgunj Sub-Metropolitan City");
        assert_eq!(h.ward, Some(1));
    }

    #[test]
    fn test_municipality_inferred_from_ward() {
        let h = resolver(nepalgunj()).resolve_point(Point::new(1.5, 1.5));
        assert_eq!(h.municipality.unwrap().name, "Nepalgunj");
    }

    #[test]
    fn test_inference_never_overwrites() {
        let mut h = ResolvedHierarchy {
            municipality: Some(AdminName::new("Foo")),
            ..ResolvedHierarchy::default()
        };
        fill_municipality_from_ward(&mut h, "Nepalgunj-01", None);
        assert_eq!(h.municipality.unwrap().name, "Foo");
    }

    #[test]
    fn test_ward_name_patterns() {
        assert_eq!(municipality_from_ward_name("Nepalgunj-01").as_deref(), Some("Nepalgunj"));
        assert_eq!(
            municipality_from_ward_name("Bheri Ganga-12").as_deref(),
            Some("Bheri Ganga")
        );
        assert_eq!(municipality_from_ward_name("Ward 5"), None);
        assert_eq!(municipality_from_ward_name("-05"), None);
        assert_eq!(municipality_from_ward_name("नेपालगन्ज-०१"), None);
        assert_eq!(
            strip_ward_suffix(&WARD_SUFFIX_LOCALIZED, "नेपालगन्ज-०१").as_deref(),
            Some("नेपालगन्ज")
        );
    }

    #[test]
    fn test_outside_everything_is_null() {
        let h = resolver(nepalgunj()).resolve_point(Point::new(50.0, 50.0));
        assert_eq!(h, ResolvedHierarchy::default());
    }

    #[test]
    fn test_levels_resolved_independently() {
        // District lies outside the province; both are still assigned.
        let h = resolver(vec![
            rect_boundary(1, AdminLevel::Province, "Koshi", (0.0, 0.0, 2.0, 2.0)),
            rect_boundary(2, AdminLevel::District, "Stray", (1.0, 1.0, 30.0, 30.0)),
        ])
        .resolve_point(Point::new(1.5, 1.5));
        assert_eq!(h.province.unwrap().name, "Koshi");
        assert_eq!(h.district.unwrap().name, "Stray");
    }

    #[test]
    fn test_admin_boundary_place_resolves_itself() {
        let r = resolver(nepalgunj());
        let place = Place::new(
            3,
            PlaceCategory::AdminBoundary,
            Tags {
                name: Some("Nepalgunj-01".into()),
                admin_level: Some("9".into()),
                ..Tags::default()
            },
            Some(RawGeometry::Point([1.5, 1.5])),
        );
        let h = r.resolve_place(place).unwrap().place.hierarchy;
        assert_eq!(h.ward, Some(1));
        assert_eq!(h.municipality.unwrap().name, "Nepalgunj");
        assert_eq!(h.district.unwrap().name, "Banke");

        let district = Place::new(
            2,
            PlaceCategory::AdminBoundary,
            Tags {
                name: Some("Banke".into()),
                admin_level: Some("6".into()),
                ..Tags::default()
            },
            Some(RawGeometry::Point([1.5, 1.5])),
        );
        let h = r.resolve_place(district).unwrap().place.hierarchy;
        assert_eq!(h.district.unwrap().name, "Banke");
        assert_eq!(h.province.unwrap().name, "Lumbini Province");
        assert!(h.municipality.is_none());
        assert!(h.ward.is_none());
    }

    #[test]
    fn test_batch_skips_malformed_and_is_idempotent() {
        let r = resolver(nepalgunj());
        let places = vec![
            point_place(1, 1.5, 1.5),
            point_place(2, f64::NAN, 1.0),
            Place::new(3, PlaceCategory::Road, Tags::default(), None),
            point_place(4, 4.0, 4.0),
        ];

        let (first, report) = r.resolve_all(places.clone(), 2, None).unwrap();
        assert_eq!(report.total, 4);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.resolved, 3);
        assert_eq!(report.without_geometry, 1);
        assert_eq!(report.filled.get(&AdminLevel::Ward), Some(&1));
        assert_eq!(report.filled.get(&AdminLevel::District), Some(&2));
        assert_eq!(
            first.iter().map(|rp| rp.place.id).collect::<Vec<_>>(),
            vec![1, 3, 4]
        );

        let (second, _) = r.resolve_all(places, 4, None).unwrap();
        let hierarchies = |v: &[ResolvedPlace]| {
            v.iter()
                .map(|rp| rp.place.hierarchy.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(hierarchies(&first), hierarchies(&second));
    }
}
