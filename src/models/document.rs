//! Flattened search document built from a resolved place.

use serde::{Deserialize, Serialize};

use super::{AdminLevel, GeoPoint, Place, PlaceCategory};

/// Static relevance multipliers per category and subtype.
///
/// Not computed; the defaults are the production table and the config
/// file may override single entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostTable {
    /// place=city | town
    pub city_town: f64,
    /// place=village | suburb
    pub village: f64,
    /// place=hamlet
    pub hamlet: f64,
    /// Any other place subtype
    pub other_place: f64,
    pub province_boundary: f64,
    /// District and municipality boundaries
    pub district_municipality_boundary: f64,
    pub ward_boundary: f64,
    pub point_of_interest: f64,
    pub road: f64,
}

impl Default for BoostTable {
    fn default() -> Self {
        Self {
            city_town: 2.0,
            village: 1.5,
            hamlet: 1.0,
            other_place: 1.2,
            province_boundary: 1.5,
            district_municipality_boundary: 1.8,
            ward_boundary: 1.2,
            point_of_interest: 0.5,
            road: 0.3,
        }
    }
}

impl BoostTable {
    pub fn boost_for(&self, place: &Place) -> f64 {
        match place.category {
            PlaceCategory::Place => match place.place_type() {
                Some("city") | Some("town") => self.city_town,
                Some("village") | Some("suburb") => self.village,
                Some("hamlet") => self.hamlet,
                _ => self.other_place,
            },
            PlaceCategory::AdminBoundary => match place.admin_level() {
                Some(AdminLevel::Province) => self.province_boundary,
                Some(AdminLevel::District) | Some(AdminLevel::Municipality) => {
                    self.district_municipality_boundary
                }
                Some(AdminLevel::Ward) | None => self.ward_boundary,
            },
            PlaceCategory::PointOfInterest => self.point_of_interest,
            PlaceCategory::Road => self.road,
        }
    }
}

/// Document stored in the search index, one per place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDocument {
    pub id: String,
    pub entity_type: PlaceCategory,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_ne: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_en: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_level: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub ward: Option<u32>,
    #[serde(default)]
    pub municipality: Option<String>,
    #[serde(default)]
    pub municipality_ne: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub district_ne: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub province_ne: Option<String>,
    pub country: String,
    pub boost_score: f64,
    pub search_text: String,
}

impl SearchDocument {
    /// Denormalize a resolved place. Returns `None` for unnamed places,
    /// which are never indexed.
    pub fn build(
        place: &Place,
        location: Option<GeoPoint>,
        boosts: &BoostTable,
        country: &str,
    ) -> Option<Self> {
        let name = place.name()?.trim();
        if name.is_empty() {
            return None;
        }

        let h = &place.hierarchy;
        let localized = |n: &Option<super::AdminName>| {
            n.as_ref()
                .map(|n| n.name_ne.clone().unwrap_or_else(|| n.name.clone()))
        };

        Some(Self {
            id: place.doc_id(),
            entity_type: place.category,
            name: name.to_string(),
            name_ne: place.name_ne().map(str::to_string),
            name_en: place.name_en().map(str::to_string),
            place_type: place.place_type().map(str::to_string),
            admin_level: place.admin_level().map(|l| l.to_osm_level()),
            location,
            ward: h.ward,
            municipality: h.municipality.as_ref().map(|n| n.name.clone()),
            municipality_ne: localized(&h.municipality),
            district: h.district.as_ref().map(|n| n.name.clone()),
            district_ne: localized(&h.district),
            province: h.province.as_ref().map(|n| n.name.clone()),
            province_ne: localized(&h.province),
            country: country.to_string(),
            boost_score: boosts.boost_for(place),
            search_text: search_text(place),
        })
    }
}

/// All name variants, de-duplicated, joined by spaces.
fn search_text(place: &Place) -> String {
    let mut parts: Vec<&str> = Vec::with_capacity(3);
    for variant in [place.name(), place.name_ne(), place.name_en()]
        .into_iter()
        .flatten()
    {
        let variant = variant.trim();
        if !variant.is_empty() && !parts.contains(&variant) {
            parts.push(variant);
        }
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AdminName, Tags};

    fn place(category: PlaceCategory, tags: Tags) -> Place {
        Place::new(1, category, tags, None)
    }

    fn named(name: &str) -> Tags {
        Tags {
            name: Some(name.into()),
            ..Tags::default()
        }
    }

    #[test]
    fn test_boost_table() {
        let boosts = BoostTable::default();
        let with_place = |subtype: &str| {
            let mut tags = named("x");
            tags.place = Some(subtype.into());
            boosts.boost_for(&place(PlaceCategory::Place, tags))
        };
        let with_level = |level: &str| {
            let mut tags = named("x");
            tags.admin_level = Some(level.into());
            boosts.boost_for(&place(PlaceCategory::AdminBoundary, tags))
        };

        assert_eq!(with_place("city"), 2.0);
        assert_eq!(with_place("town"), 2.0);
        assert_eq!(with_place("village"), 1.5);
        assert_eq!(with_place("hamlet"), 1.0);
        assert_eq!(with_place("locality"), 1.2);
        assert_eq!(with_level("4"), 1.5);
        assert_eq!(with_level("6"), 1.8);
        assert_eq!(with_level("7"), 1.8);
        assert_eq!(with_level("9"), 1.2);
        assert_eq!(boosts.boost_for(&place(PlaceCategory::PointOfInterest, named("x"))), 0.5);
        assert_eq!(boosts.boost_for(&place(PlaceCategory::Road, named("x"))), 0.3);
    }

    #[test]
    fn test_build_document() {
        let mut tags = named("Kathmandu");
        tags.name_ne = Some("काठमाडौं".into());
        tags.place = Some("city".into());
        let mut p = place(PlaceCategory::Place, tags);
        p.hierarchy.district = Some(AdminName::new("Kathmandu"));
        p.hierarchy.province = Some(AdminName {
            name: "Bagmati Province".into(),
            name_ne: Some("बागमती प्रदेश".into()),
        });
        p.hierarchy.ward = Some(1);

        let doc = SearchDocument::build(&p, None, &BoostTable::default(), "Nepal").unwrap();
        assert_eq!(doc.id, "place_1");
        assert_eq!(doc.name_en.as_deref(), Some("Kathmandu"));
        assert_eq!(doc.search_text, "Kathmandu काठमाडौं");
        assert_eq!(doc.district_ne.as_deref(), Some("Kathmandu"));
        assert_eq!(doc.province_ne.as_deref(), Some("बागमती प्रदेश"));
        assert_eq!(doc.municipality, None);
        assert_eq!(doc.ward, Some(1));
        assert_eq!(doc.boost_score, 2.0);
    }

    #[test]
    fn test_unnamed_place_is_not_indexed() {
        let p = place(PlaceCategory::Road, Tags::default());
        assert!(SearchDocument::build(&p, None, &BoostTable::default(), "Nepal").is_none());
    }
}
