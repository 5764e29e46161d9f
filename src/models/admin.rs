//! Administrative hierarchy types for PIP lookup.

use geo::{Area, BoundingRect, Centroid, MultiPolygon, Point};
use serde::{Deserialize, Serialize};

use super::Tags;
use crate::error::{Error, Result};

/// Administrative levels resolved for every place, with their fixed
/// OSM `admin_level` codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AdminLevel {
    /// Province (admin_level=4)
    Province,
    /// District (admin_level=6)
    District,
    /// Municipality / rural municipality (admin_level=7)
    Municipality,
    /// Ward (admin_level=9)
    Ward,
}

impl AdminLevel {
    /// Convert OSM admin_level number to AdminLevel
    pub fn from_osm_level(level: u8) -> Option<Self> {
        match level {
            4 => Some(AdminLevel::Province),
            6 => Some(AdminLevel::District),
            7 => Some(AdminLevel::Municipality),
            9 => Some(AdminLevel::Ward),
            _ => None,
        }
    }

    /// Get the OSM admin_level number
    pub fn to_osm_level(&self) -> u8 {
        match self {
            AdminLevel::Province => 4,
            AdminLevel::District => 6,
            AdminLevel::Municipality => 7,
            AdminLevel::Ward => 9,
        }
    }

    /// All levels, coarsest first
    pub fn all() -> &'static [AdminLevel] {
        &[
            AdminLevel::Province,
            AdminLevel::District,
            AdminLevel::Municipality,
            AdminLevel::Ward,
        ]
    }

    /// Document field holding this level
    pub fn field_name(&self) -> &'static str {
        match self {
            AdminLevel::Province => "province",
            AdminLevel::District => "district",
            AdminLevel::Municipality => "municipality",
            AdminLevel::Ward => "ward",
        }
    }
}

/// A single administrative polygon, immutable for a resolution run.
#[derive(Debug, Clone)]
pub struct AdministrativeBoundary {
    pub id: i64,
    /// Identifier in the upstream dataset, e.g. "relation/4583240"
    pub source_id: String,
    pub name: String,
    pub name_ne: Option<String>,
    pub level: AdminLevel,
    /// Boundary classification tag, e.g. "administrative"
    pub boundary_type: Option<String>,
    pub tags: Tags,
    pub geometry: MultiPolygon<f64>,
    pub centroid: Point<f64>,
    /// Planar area in squared degrees; only compared between boundaries.
    pub area: f64,
}

impl AdministrativeBoundary {
    pub fn new(
        id: i64,
        source_id: String,
        level: AdminLevel,
        name: String,
        tags: Tags,
        geometry: MultiPolygon<f64>,
    ) -> Result<Self> {
        let centroid = geometry
            .centroid()
            .ok_or_else(|| Error::malformed(&source_id, "boundary has no centroid"))?;

        Ok(Self {
            id,
            name_ne: tags.name_ne.clone(),
            boundary_type: tags.boundary.clone(),
            area: geometry.unsigned_area(),
            source_id,
            name,
            level,
            tags,
            geometry,
            centroid,
        })
    }

    /// Get the bounding box of this boundary
    pub fn bbox(&self) -> Option<(f64, f64, f64, f64)> {
        self.geometry
            .bounding_rect()
            .map(|rect| (rect.min().x, rect.min().y, rect.max().x, rect.max().y))
    }

    /// Ward number from the `ward` tag, else `ref`, else the name, keeping
    /// only ASCII digits. `None` when nothing numeric remains.
    pub fn ward_number(&self) -> Option<u32> {
        self.tags
            .ward_source()
            .or(Some(self.name.as_str()))
            .and_then(parse_ward_number)
    }

    pub fn admin_name(&self) -> AdminName {
        AdminName {
            name: self.name.clone(),
            name_ne: self.name_ne.clone(),
        }
    }
}

/// Strip everything that is not `0-9` and parse what is left.
///
/// Devanagari or superscript digits are not ASCII and are dropped, so
/// "वडा ५" yields `None`. Values beyond `u32` also yield `None`.
pub fn parse_ward_number(raw: &str) -> Option<u32> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Name of a resolved parent region plus its localized variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminName {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_ne: Option<String>,
}

impl AdminName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            name_ne: None,
        }
    }
}

/// The four derived hierarchy fields of a place. Each level is resolved
/// independently; nothing here guarantees the district lies inside the
/// province.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedHierarchy {
    pub province: Option<AdminName>,
    pub district: Option<AdminName>,
    pub municipality: Option<AdminName>,
    pub ward: Option<u32>,
}

impl ResolvedHierarchy {
    /// Set a string level. Ward is numeric, use the `ward` field directly.
    pub fn set_name(&mut self, level: AdminLevel, name: AdminName) {
        match level {
            AdminLevel::Province => self.province = Some(name),
            AdminLevel::District => self.district = Some(name),
            AdminLevel::Municipality => self.municipality = Some(name),
            AdminLevel::Ward => {}
        }
    }

    pub fn name(&self, level: AdminLevel) -> Option<&AdminName> {
        match level {
            AdminLevel::Province => self.province.as_ref(),
            AdminLevel::District => self.district.as_ref(),
            AdminLevel::Municipality => self.municipality.as_ref(),
            AdminLevel::Ward => None,
        }
    }

    pub fn is_resolved(&self, level: AdminLevel) -> bool {
        match level {
            AdminLevel::Ward => self.ward.is_some(),
            _ => self.name(level).is_some(),
        }
    }
}
