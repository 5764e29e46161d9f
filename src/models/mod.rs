//! Core data models for hierarchy resolution and search.

pub mod admin;
pub mod document;
pub mod geometry;
pub mod place;
pub mod tags;

pub use admin::{AdminLevel, AdminName, AdministrativeBoundary, ResolvedHierarchy};
pub use document::{BoostTable, SearchDocument};
pub use geometry::RawGeometry;
pub use place::{GeoPoint, Place, PlaceCategory};
pub use tags::Tags;
