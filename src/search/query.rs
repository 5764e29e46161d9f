//! Typed search request and query.
//!
//! `SearchQuery` is what backends execute. It is built once per request
//! from the caller's input and rendered by each backend in its own way.

use serde::Serialize;

use crate::config::SearchConfig;
use crate::error::{Error, Result};
use crate::models::AdminLevel;

/// One field of the primary fuzzy match with its weight
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldWeight {
    pub field: &'static str,
    pub weight: f64,
}

impl FieldWeight {
    const fn new(field: &'static str, weight: f64) -> Self {
        Self { field, weight }
    }

    /// Elasticsearch notation, e.g. `name^3`
    pub fn boosted(&self) -> String {
        if self.weight == 1.0 {
            self.field.to_string()
        } else {
            format!("{}^{}", self.field, self.weight)
        }
    }
}

/// Exact name fields x3, fuzzy-analyzed variants x2, combined text x1.
pub const NAME_FIELDS: [FieldWeight; 7] = [
    FieldWeight::new("name", 3.0),
    FieldWeight::new("name_ne", 3.0),
    FieldWeight::new("name_en", 3.0),
    FieldWeight::new("name.fuzzy", 2.0),
    FieldWeight::new("name_ne.fuzzy", 2.0),
    FieldWeight::new("name_en.fuzzy", 2.0),
    FieldWeight::new("search_text", 1.0),
];

/// Edit-distance tolerance policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Fuzziness {
    /// Scales with term length: 0 edits up to 2 chars, 1 up to 5, else 2
    #[default]
    Auto,
}

impl Fuzziness {
    pub fn max_edits(&self, term: &str) -> usize {
        match self {
            Fuzziness::Auto => match term.chars().count() {
                0..=2 => 0,
                3..=5 => 1,
                _ => 2,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Fuzziness::Auto => "AUTO",
        }
    }
}

/// Required clause narrowing the candidate pool to one hierarchy value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterClause {
    Ward(u32),
    /// Matches the level's name or localized name, case-insensitively
    Name { level: AdminLevel, value: String },
}

impl FilterClause {
    /// Keyword fields a name clause is matched against
    pub fn keyword_fields(level: AdminLevel) -> [String; 2] {
        let field = level.field_name();
        [format!("{field}.keyword"), format!("{field}_ne.keyword")]
    }
}

/// Caller-asserted expected hierarchy. Blank strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HierarchyFilters {
    pub ward: Option<u32>,
    pub municipality: Option<String>,
    pub district: Option<String>,
    pub province: Option<String>,
}

impl HierarchyFilters {
    pub fn new(
        ward: Option<u32>,
        municipality: Option<String>,
        district: Option<String>,
        province: Option<String>,
    ) -> Self {
        Self {
            ward,
            municipality: non_blank(municipality),
            district: non_blank(district),
            province: non_blank(province),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ward.is_none()
            && self.municipality.is_none()
            && self.district.is_none()
            && self.province.is_none()
    }

    /// Expected name at a string level
    pub fn name(&self, level: AdminLevel) -> Option<&str> {
        match level {
            AdminLevel::Province => self.province.as_deref(),
            AdminLevel::District => self.district.as_deref(),
            AdminLevel::Municipality => self.municipality.as_deref(),
            AdminLevel::Ward => None,
        }
    }

    pub fn clauses(&self) -> Vec<FilterClause> {
        let mut clauses = Vec::new();
        if let Some(ward) = self.ward {
            clauses.push(FilterClause::Ward(ward));
        }
        for level in [
            AdminLevel::Municipality,
            AdminLevel::District,
            AdminLevel::Province,
        ] {
            if let Some(value) = self.name(level) {
                clauses.push(FilterClause::Name {
                    level,
                    value: value.trim().to_string(),
                });
            }
        }
        clauses
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Public search operation input
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub query: String,
    /// Absent means the configured default; out-of-range values are clamped
    pub limit: Option<i64>,
    pub filters: HierarchyFilters,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_filters(mut self, filters: HierarchyFilters) -> Self {
        self.filters = filters;
        self
    }
}

/// Backend-independent query
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub text: String,
    pub fields: Vec<FieldWeight>,
    pub fuzziness: Fuzziness,
    pub filters: Vec<FilterClause>,
    pub size: usize,
    /// Deadline handed to the backend
    pub timeout_ms: u64,
}

impl SearchQuery {
    pub fn build(request: &SearchRequest, config: &SearchConfig) -> Result<Self> {
        let text = request.query.trim();
        if text.is_empty() {
            return Err(Error::InvalidRequest("query must not be empty".into()));
        }

        let size = match request.limit {
            None => config.default_limit,
            Some(limit) => limit.clamp(1, config.max_limit as i64) as usize,
        };

        Ok(Self {
            text: text.to_string(),
            fields: NAME_FIELDS.to_vec(),
            fuzziness: Fuzziness::Auto,
            filters: request.filters.clauses(),
            size,
            timeout_ms: config.timeout_ms,
        })
    }
}
