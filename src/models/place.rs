//! Places as delivered by the extraction step, before and after resolution.

use serde::{Deserialize, Serialize};

use super::{AdminLevel, AdministrativeBoundary, RawGeometry, ResolvedHierarchy, Tags};

/// Category of an indexed entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceCategory {
    /// Settlements and localities (place=city, village, ...)
    Place,
    /// Points of interest (amenities, shops, ...)
    #[serde(rename = "poi")]
    PointOfInterest,
    /// Named roads
    Road,
    /// Administrative boundaries indexed as searchable entities
    AdminBoundary,
}

impl PlaceCategory {
    /// Value of the `entity_type` document field
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaceCategory::Place => "place",
            PlaceCategory::PointOfInterest => "poi",
            PlaceCategory::Road => "road",
            PlaceCategory::AdminBoundary => "admin_boundary",
        }
    }

    /// Prefix of the document id, keeps ids unique across categories
    pub fn id_prefix(&self) -> &'static str {
        match self {
            PlaceCategory::AdminBoundary => "admin",
            other => other.as_str(),
        }
    }
}

impl std::fmt::Display for PlaceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Geographic point (lat/lon)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl From<geo::Point<f64>> for GeoPoint {
    fn from(p: geo::Point<f64>) -> Self {
        Self { lat: p.y(), lon: p.x() }
    }
}

/// A searchable entity with its derived hierarchy fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Place {
    pub id: i64,
    pub category: PlaceCategory,
    #[serde(default)]
    pub tags: Tags,
    /// Raw geometry; absent for entities exported without one
    #[serde(default)]
    pub geometry: Option<RawGeometry>,

    /// Filled by the resolver
    #[serde(default, skip_deserializing)]
    pub hierarchy: ResolvedHierarchy,
}

impl Place {
    pub fn new(id: i64, category: PlaceCategory, tags: Tags, geometry: Option<RawGeometry>) -> Self {
        Self {
            id,
            category,
            tags,
            geometry,
            hierarchy: ResolvedHierarchy::default(),
        }
    }

    /// A boundary as a searchable entity, located at its centroid.
    pub fn from_boundary(boundary: &AdministrativeBoundary) -> Self {
        let mut tags = boundary.tags.clone();
        tags.name = Some(boundary.name.clone());
        tags.admin_level = Some(boundary.level.to_osm_level().to_string());

        let centroid = boundary.centroid;
        Self::new(
            boundary.id,
            PlaceCategory::AdminBoundary,
            tags,
            Some(RawGeometry::Point([centroid.x(), centroid.y()])),
        )
    }

    /// Stable document id: "<category prefix>_<id>"
    pub fn doc_id(&self) -> String {
        format!("{}_{}", self.category.id_prefix(), self.id)
    }

    pub fn name(&self) -> Option<&str> {
        self.tags.name.as_deref()
    }

    pub fn name_ne(&self) -> Option<&str> {
        self.tags.name_ne.as_deref()
    }

    /// English name, falling back to the primary name
    pub fn name_en(&self) -> Option<&str> {
        self.tags.name_en.as_deref().or_else(|| self.name())
    }

    /// Place subtype (`place=*` tag)
    pub fn place_type(&self) -> Option<&str> {
        self.tags.place.as_deref()
    }

    /// Administrative level for admin boundary entities
    pub fn admin_level(&self) -> Option<AdminLevel> {
        self.tags.admin_level_code().and_then(AdminLevel::from_osm_level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_record() {
        let place: Place = serde_json::from_str(
            r#"{"id":7,"category":"poi","tags":{"name":"Bir Hospital"},
                "geometry":{"type":"Point","coordinates":[85.31,27.70]}}"#,
        )
        .unwrap();

        assert_eq!(place.category, PlaceCategory::PointOfInterest);
        assert_eq!(place.doc_id(), "poi_7");
        assert_eq!(place.name_en(), Some("Bir Hospital"));
        assert_eq!(place.hierarchy, ResolvedHierarchy::default());
    }

    #[test]
    fn test_admin_boundary_doc_id() {
        let place = Place::new(3, PlaceCategory::AdminBoundary, Tags::default(), None);
        assert_eq!(place.doc_id(), "admin_3");
        assert_eq!(place.category.as_str(), "admin_boundary");
    }
}
