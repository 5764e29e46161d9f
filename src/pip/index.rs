//! Boundary catalog: per-level R-trees over administrative boundaries.

use geo::{Contains, Point};
use rstar::{RTree, RTreeObject, AABB};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::models::{AdminLevel, AdministrativeBoundary};

/// Wrapper for R-tree indexing of admin boundaries
#[derive(Clone)]
pub(crate) struct IndexedBoundary {
    pub boundary: Arc<AdministrativeBoundary>,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedBoundary {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl IndexedBoundary {
    fn new(boundary: AdministrativeBoundary) -> Option<Self> {
        let (min_x, min_y, max_x, max_y) = boundary.bbox()?;
        Some(Self {
            boundary: Arc::new(boundary),
            envelope: AABB::from_corners([min_x, min_y], [max_x, max_y]),
        })
    }
}

/// Read-only set of boundaries, loaded once per resolution run and shared
/// across workers.
pub struct BoundaryCatalog {
    trees: BTreeMap<AdminLevel, RTree<IndexedBoundary>>,
}

impl BoundaryCatalog {
    /// Build one R-tree per administrative level
    pub fn build(boundaries: Vec<AdministrativeBoundary>) -> Self {
        info!("Building boundary catalog for {} boundaries...", boundaries.len());

        let mut grouped: BTreeMap<AdminLevel, Vec<IndexedBoundary>> = BTreeMap::new();
        for indexed in boundaries.into_iter().filter_map(IndexedBoundary::new) {
            grouped
                .entry(indexed.boundary.level)
                .or_default()
                .push(indexed);
        }

        let trees: BTreeMap<_, _> = grouped
            .into_iter()
            .map(|(level, indexed)| (level, RTree::bulk_load(indexed)))
            .collect();

        for (level, tree) in &trees {
            info!("  {:?}: {} boundaries", level, tree.size());
        }

        Self { trees }
    }

    /// Boundaries at `level` whose bounding box contains the point.
    pub fn candidates(
        &self,
        point: Point<f64>,
        level: AdminLevel,
    ) -> impl Iterator<Item = &Arc<AdministrativeBoundary>> {
        let query_envelope = AABB::from_point([point.x(), point.y()]);
        self.trees
            .get(&level)
            .into_iter()
            .flat_map(move |tree| tree.locate_in_envelope_intersecting(&query_envelope))
            .map(|ib| &ib.boundary)
    }

    /// Boundaries at `level` whose polygon strictly contains the point.
    /// Points on a boundary edge are not contained.
    pub fn containing(
        &self,
        point: Point<f64>,
        level: AdminLevel,
    ) -> impl Iterator<Item = &Arc<AdministrativeBoundary>> {
        self.candidates(point, level)
            .filter(move |b| b.geometry.contains(&point))
    }

    /// The smallest boundary at `level` strictly containing the point.
    /// Equal areas fall back to the lowest boundary id.
    pub fn smallest_containing(
        &self,
        point: Point<f64>,
        level: AdminLevel,
    ) -> Option<&Arc<AdministrativeBoundary>> {
        self.containing(point, level)
            .min_by(|a, b| a.area.total_cmp(&b.area).then(a.id.cmp(&b.id)))
    }

    /// Number of boundaries at a level
    pub fn count_at_level(&self, level: AdminLevel) -> usize {
        self.trees.get(&level).map_or(0, |t| t.size())
    }

    /// Get total number of indexed boundaries
    pub fn len(&self) -> usize {
        self.trees.values().map(|t| t.size()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
