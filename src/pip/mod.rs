//! Point-in-Polygon (PIP) hierarchy resolution.
//!
//! Indexes administrative boundaries in per-level R-trees and assigns
//! each place the smallest enclosing boundary at every level.

mod index;
mod resolver;

pub use index::BoundaryCatalog;
pub use resolver::{municipality_from_ward_name, HierarchyResolver, ResolveReport, ResolvedPlace};
