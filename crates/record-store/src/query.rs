use crate::{Record, RecordId};

/// Builder for record listings.
///
/// A query always targets one entity type. Field filters compare top-level
/// body fields for equality; results come back in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordQuery {
    /// The entity type to list.
    pub entity_type: String,

    /// Top-level fields that must equal the given values.
    pub field_filters: Vec<(String, serde_json::Value)>,

    /// Restrict to these ids.
    pub ids: Option<Vec<RecordId>>,

    /// Maximum number of records to return.
    pub limit: Option<usize>,

    /// Number of records to skip.
    pub offset: Option<usize>,
}

impl RecordQuery {
    /// Creates a query listing every record of `entity_type`.
    pub fn for_entity(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            field_filters: Vec::new(),
            ids: None,
            limit: None,
            offset: None,
        }
    }

    /// Requires a top-level field to equal `value`.
    pub fn field_eq(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.field_filters.push((name.into(), value.into()));
        self
    }

    /// Restricts the listing to the given ids.
    pub fn ids(mut self, ids: Vec<RecordId>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Limits the number of records returned.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips this many records before returning results.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if `record` satisfies the type, id and field filters.
    ///
    /// Limit and offset are applied by the store.
    pub fn matches(&self, record: &Record) -> bool {
        if record.entity_type != self.entity_type {
            return false;
        }
        if let Some(ref ids) = self.ids
            && !ids.contains(&record.id)
        {
            return false;
        }
        self.field_filters
            .iter()
            .all(|(name, value)| record.field(name) == Some(value))
    }

    /// The field filters as a single JSON object, suitable for containment checks.
    pub fn filter_object(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .field_filters
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        serde_json::Value::Object(map)
    }
}
