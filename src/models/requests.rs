//! Request DTOs for the resource API
//!
//! Query-string parameters accepted by the HTTP endpoints.

use serde::Deserialize;

use crate::fetch::FetchOptions;
use crate::models::FilterSet;

/// Academic years served by the catalogue endpoints.
pub const KNOWN_YEARS: [&str; 4] = ["1st Year", "2nd Year", "3rd Year", "4th Year"];

/// Resource types served by the catalogue endpoints.
pub const KNOWN_RESOURCE_TYPES: [&str; 3] = ["Sem Paper", "CT Paper", "Study Material"];

/// Query string for `GET /resources`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcesQuery {
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub degree: Option<String>,
    #[serde(default)]
    pub specialisation: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub elective: Option<String>,
    #[serde(default)]
    pub use_cache: Option<bool>,
    #[serde(default)]
    pub max_results: Option<usize>,
}

impl ResourcesQuery {
    /// Filters to look up. The resource type travels separately.
    pub fn filters(&self) -> FilterSet {
        FilterSet {
            year: self.year.clone(),
            degree: self.degree.clone(),
            specialisation: self.specialisation.clone(),
            subject: self.subject.clone(),
            elective: self.elective.clone(),
            resource_type: None,
        }
    }

    pub fn resource_type(&self) -> &str {
        self.resource_type.as_deref().unwrap_or_default()
    }

    /// Applies per-request overrides to the server defaults.
    pub fn options(&self, defaults: FetchOptions) -> FetchOptions {
        FetchOptions {
            use_cache: self.use_cache.unwrap_or(defaults.use_cache),
            max_results: self.max_results.unwrap_or(defaults.max_results),
            ..defaults
        }
    }
}

/// Query string for `GET /subjects` and `GET /search`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogQuery {
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default, rename = "type")]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
}

impl CatalogQuery {
    /// Validates year and type, returning them in that order.
    ///
    /// Returns an error message if either is missing or not a known value.
    pub fn year_and_type(&self) -> Result<(&str, &str), String> {
        let (Some(year), Some(resource_type)) = (
            non_empty(self.year.as_deref()),
            non_empty(self.resource_type.as_deref()),
        ) else {
            return Err("Year and type are required".to_string());
        };

        if !KNOWN_YEARS.contains(&year) || !KNOWN_RESOURCE_TYPES.contains(&resource_type) {
            return Err("Invalid year or type".to_string());
        }
        Ok((year, resource_type))
    }

    /// Validates year, type and subject for a search.
    pub fn search_terms(&self) -> Result<(&str, &str, &str), String> {
        let Some(subject) = non_empty(self.subject.as_deref()) else {
            return Err("Year, type, and subject are required".to_string());
        };
        let (year, resource_type) = self.year_and_type().map_err(|e| {
            if e.ends_with("required") {
                "Year, type, and subject are required".to_string()
            } else {
                e
            }
        })?;
        Ok((year, resource_type, subject))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
