//! Filter and record types shared by the cache and the fetcher.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// == Filter Set ==
/// User-selected academic attributes narrowing a resource search.
///
/// Empty strings count as unset. `subject` and `elective` are expected to be
/// mutually exclusive; callers enforce that.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degree: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialisation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elective: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
}

impl FilterSet {
    /// Field names in their serialized form.
    pub const FIELDS: [&'static str; 6] = [
        "year",
        "degree",
        "specialisation",
        "subject",
        "elective",
        "resourceType",
    ];

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_year(mut self, year: impl Into<String>) -> Self {
        self.year = Some(year.into());
        self
    }

    pub fn with_degree(mut self, degree: impl Into<String>) -> Self {
        self.degree = Some(degree.into());
        self
    }

    pub fn with_specialisation(mut self, specialisation: impl Into<String>) -> Self {
        self.specialisation = Some(specialisation.into());
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_elective(mut self, elective: impl Into<String>) -> Self {
        self.elective = Some(elective.into());
        self
    }

    pub fn with_resource_type(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type.into());
        self
    }

    /// Returns the value of a field by serialized name, skipping empty values.
    pub fn get(&self, name: &str) -> Option<&str> {
        let slot = match name {
            "year" => &self.year,
            "degree" => &self.degree,
            "specialisation" => &self.specialisation,
            "subject" => &self.subject,
            "elective" => &self.elective,
            "resourceType" => &self.resource_type,
            _ => return None,
        };
        slot.as_deref().filter(|v| !v.is_empty())
    }

    /// Sets a field by serialized name. Unknown names are ignored.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let slot = match name {
            "year" => &mut self.year,
            "degree" => &mut self.degree,
            "specialisation" => &mut self.specialisation,
            "subject" => &mut self.subject,
            "elective" => &mut self.elective,
            "resourceType" => &mut self.resource_type,
            _ => return,
        };
        *slot = Some(value.into());
    }

    /// Populated fields keyed by name, in sorted order.
    pub fn populated(&self) -> BTreeMap<&'static str, &str> {
        Self::FIELDS
            .iter()
            .filter_map(|name| self.get(name).map(|value| (*name, value)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.populated().is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for FilterSet
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut filters = FilterSet::default();
        for (name, value) in iter {
            filters.set(name.as_ref(), value);
        }
        filters
    }
}

// == Resource Record ==
/// A document returned by the store: backend id plus arbitrary fields.
///
/// Treated as an opaque payload by the cache and the fetcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ResourceRecord {
    /// Builds a record from a backend id and the document's fields.
    ///
    /// A document that carries its own `id` field keeps that value as its
    /// id, and the field is lifted out so the record serializes one `id`.
    pub fn new(id: impl Into<String>, mut fields: Map<String, Value>) -> Self {
        let id = match fields.remove("id") {
            Some(Value::String(own)) => own,
            Some(Value::Null) | None => id.into(),
            Some(other) => other.to_string(),
        };
        Self { id, fields }
    }

    /// Returns a string-valued field.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}
