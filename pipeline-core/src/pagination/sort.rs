//! Allow-list of sortable fields for one resource kind.

use std::collections::BTreeMap;

use crate::error::{CoreError, Result};

use super::{SortDirection, SortOrder};

/// Maps API-visible field names to storage columns for one resource kind.
///
/// Client-supplied sort keys only ever reach the storage layer through
/// [`SortFields::resolve`], which returns the registered column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortFields {
    resource: String,
    key_field: String,
    default_field: String,
    fields: BTreeMap<String, String>,
}

impl SortFields {
    /// Creates the mapping with the primary key registered as a sortable
    /// field and as the default sort.
    pub fn new(
        resource: impl Into<String>,
        key_field: impl Into<String>,
        key_column: impl Into<String>,
    ) -> Self {
        let key_field = key_field.into();
        let mut fields = BTreeMap::new();
        fields.insert(key_field.clone(), key_column.into());

        Self {
            resource: resource.into(),
            default_field: key_field.clone(),
            key_field,
            fields,
        }
    }

    /// Registers a sortable field.
    pub fn with_field(mut self, field: impl Into<String>, column: impl Into<String>) -> Self {
        self.fields.insert(field.into(), column.into());
        self
    }

    /// Selects the field used when the client does not ask for one. Unknown
    /// fields are ignored and the primary key stays the default.
    pub fn with_default(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        if self.fields.contains_key(&field) {
            self.default_field = field;
        }
        self
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn key_column(&self) -> &str {
        // The key field is inserted in `new` and never removed.
        self.fields
            .get(&self.key_field)
            .map(String::as_str)
            .unwrap_or(self.key_field.as_str())
    }

    pub fn column_for(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Ascending order on the default field.
    pub fn default_order(&self) -> SortOrder {
        SortOrder {
            field: self.default_field.clone(),
            column: self
                .column_for(&self.default_field)
                .unwrap_or(self.key_column())
                .to_string(),
            direction: SortDirection::Ascending,
        }
    }

    /// Resolves a client `sort_by` string.
    ///
    /// Accepted forms are `""`, `"<field>"`, `"<field> asc"` and
    /// `"<field> desc"`; the direction keyword is case-insensitive.
    pub fn resolve(&self, sort_by: &str) -> Result<SortOrder> {
        let mut parts = sort_by.split_whitespace();
        let Some(field) = parts.next() else {
            return Ok(self.default_order());
        };

        let direction = match parts.next() {
            None => SortDirection::Ascending,
            Some(keyword) if keyword.eq_ignore_ascii_case("asc") => SortDirection::Ascending,
            Some(keyword) if keyword.eq_ignore_ascii_case("desc") => SortDirection::Descending,
            Some(keyword) => {
                return Err(CoreError::invalid_input(format!(
                    "Invalid sort direction '{}' in sort_by '{}'. Use 'asc' or 'desc'",
                    keyword, sort_by
                )));
            }
        };

        if parts.next().is_some() {
            return Err(CoreError::invalid_input(format!(
                "Invalid sort_by '{}'. Expected '<field>' or '<field> desc'",
                sort_by
            )));
        }

        let column = self.column_for(field).ok_or_else(|| {
            CoreError::invalid_input(format!(
                "Cannot sort {} by unsupported field '{}'. Supported fields: {}",
                self.resource,
                field,
                self.field_names().collect::<Vec<_>>().join(", ")
            ))
        })?;

        Ok(SortOrder {
            field: field.to_string(),
            column: column.to_string(),
            direction,
        })
    }
}
