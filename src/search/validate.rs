//! Checks the top-ranked result against the caller's expected hierarchy.

use serde::{Deserialize, Serialize};

use super::HierarchyFilters;
use crate::models::{AdminLevel, SearchDocument};

/// Reported for fields the top result has no value for
pub const UNRESOLVED: &str = "null";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mismatch {
    pub field: String,
    pub expected: String,
    pub actual: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub message: Option<String>,
    pub mismatches: Vec<Mismatch>,
}

impl ValidationResult {
    fn no_results() -> Self {
        Self {
            valid: false,
            message: Some("No results found matching the provided criteria".to_string()),
            mismatches: Vec::new(),
        }
    }
}

/// `None` when no filter was supplied. Otherwise only the first
/// (top-ranked) document is compared; mismatches are listed ward first,
/// then municipality, district and province.
pub fn validate_hierarchy(
    filters: &HierarchyFilters,
    ranked: &[SearchDocument],
) -> Option<ValidationResult> {
    if filters.is_empty() {
        return None;
    }
    let Some(top) = ranked.first() else {
        return Some(ValidationResult::no_results());
    };

    let mut mismatches = Vec::new();

    if let Some(expected) = filters.ward {
        if top.ward != Some(expected) {
            mismatches.push(Mismatch {
                field: AdminLevel::Ward.field_name().to_string(),
                expected: expected.to_string(),
                actual: top
                    .ward
                    .map_or_else(|| UNRESOLVED.to_string(), |w| w.to_string()),
            });
        }
    }

    for (level, actual) in [
        (AdminLevel::Municipality, &top.municipality),
        (AdminLevel::District, &top.district),
        (AdminLevel::Province, &top.province),
    ] {
        let Some(expected) = filters.name(level) else {
            continue;
        };
        let matches = actual
            .as_deref()
            .is_some_and(|actual| same_name(actual, expected));
        if !matches {
            mismatches.push(Mismatch {
                field: level.field_name().to_string(),
                expected: expected.to_string(),
                actual: actual.clone().unwrap_or_else(|| UNRESOLVED.to_string()),
            });
        }
    }

    let message = if mismatches.is_empty() {
        "All parent locations match".to_string()
    } else {
        format!(
            "Found {} mismatch(es) in parent location hierarchy",
            mismatches.len()
        )
    };

    Some(ValidationResult {
        valid: mismatches.is_empty(),
        message: Some(message),
        mismatches,
    })
}

/// Case-insensitive comparison after trimming
pub(crate) fn same_name(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim(), b.trim());
    a == b || a.to_lowercase() == b.to_lowercase()
}
