//! Tag bag attached to boundaries and places by the extraction step.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Known OSM-style tags as typed fields; every other key lands in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tags {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Localized (Nepali) name
    #[serde(rename = "name:ne", default, skip_serializing_if = "Option::is_none")]
    pub name_ne: Option<String>,

    #[serde(rename = "name:en", default, skip_serializing_if = "Option::is_none")]
    pub name_en: Option<String>,

    #[serde(
        default,
        deserialize_with = "scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub admin_level: Option<String>,

    /// Boundary classification, e.g. "administrative"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boundary: Option<String>,

    #[serde(
        default,
        deserialize_with = "scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub ward: Option<String>,

    #[serde(
        rename = "ref",
        default,
        deserialize_with = "scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub reference: Option<String>,

    /// Place subtype, e.g. "city", "village"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place: Option<String>,

    /// Untyped tags keep whatever JSON value the extract carried.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Numeric codes such as `admin_level` or `ref` arrive as either strings or
/// numbers depending on the extractor.
fn scalar_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

impl Tags {
    /// Raw text a ward number is read from: `ward`, else `ref`, else `name`.
    pub fn ward_source(&self) -> Option<&str> {
        [&self.ward, &self.reference, &self.name]
            .into_iter()
            .filter_map(|v| v.as_deref())
            .find(|v| !v.trim().is_empty())
    }

    /// Numeric admin level, if the tag is present and parses.
    pub fn admin_level_code(&self) -> Option<u8> {
        self.admin_level.as_deref()?.trim().parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_and_extra_keys() {
        let tags: Tags = serde_json::from_str(
            r#"{"name":"Nepalgunj-01","name:ne":"नेपालगन्ज-०१","admin_level":"9","ref":"1","wikidata":"Q1"}"#,
        )
        .unwrap();

        assert_eq!(tags.name.as_deref(), Some("Nepalgunj-01"));
        assert_eq!(tags.reference.as_deref(), Some("1"));
        assert_eq!(tags.extra.get("wikidata"), Some(&Value::from("Q1")));
        assert_eq!(tags.admin_level_code(), Some(9));
        assert!(tags.extra.get("name").is_none());
        assert_eq!(tags.ward_source(), Some("1"));
    }

    #[test]
    fn test_numeric_tag_values() {
        let tags: Tags = serde_json::from_str(
            r#"{"name":"Patan","admin_level":9,"ref":4,"population":226728,"capital":true}"#,
        )
        .unwrap();

        assert_eq!(tags.admin_level_code(), Some(9));
        assert_eq!(tags.reference.as_deref(), Some("4"));
        assert_eq!(tags.ward_source(), Some("4"));
        assert_eq!(tags.extra.get("population"), Some(&Value::from(226728)));
        assert_eq!(tags.extra.get("capital"), Some(&Value::Bool(true)));
    }
}
