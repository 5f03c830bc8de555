use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{RecordId, Result, StoreError};

/// Version number of a stored record, used for optimistic concurrency control.
///
/// A freshly created record is at version 1; every update increments it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a new version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the version (0) of a record that does not exist yet.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the version (1) a record gets when it is created.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// A named value that must be unique among records of one entity type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UniqueKey {
    pub name: String,
    pub value: String,
}

impl UniqueKey {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A pointer from one record to another.
///
/// The target must exist when the reference is written, and the target
/// cannot be deleted while the reference is held.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordRef {
    pub entity_type: String,
    pub id: RecordId,
}

impl RecordRef {
    pub fn new(entity_type: impl Into<String>, id: RecordId) -> Self {
        Self {
            entity_type: entity_type.into(),
            id,
        }
    }
}

impl std::fmt::Display for RecordRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.id)
    }
}

/// A stored record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Identifier, unique within the entity type.
    pub id: RecordId,

    /// The kind of record (e.g. "vendor", "listing").
    pub entity_type: String,

    /// Incremented on every update.
    pub version: Version,

    /// The record body; always a JSON object.
    pub fields: serde_json::Value,

    /// Unique keys currently claimed by this record.
    pub unique_keys: Vec<UniqueKey>,

    /// Records this record points at.
    pub references: Vec<RecordRef>,

    /// Assigned by the store on create.
    pub created_at: DateTime<Utc>,

    /// Assigned by the store on create and every update.
    pub updated_at: DateTime<Utc>,
}

impl Record {
    /// Deserializes the record body into a typed value.
    pub fn deserialize_fields<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.fields.clone())?)
    }

    /// Returns a top-level field of the record body.
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.fields.get(name)
    }

    /// Returns a reference pointing at this record.
    pub fn to_ref(&self) -> RecordRef {
        RecordRef::new(self.entity_type.clone(), self.id)
    }
}

/// A record to be created.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    /// Preset identifier; the store generates one when absent.
    pub id: Option<RecordId>,
    pub entity_type: String,
    pub fields: serde_json::Value,
    pub unique_keys: Vec<UniqueKey>,
    pub references: Vec<RecordRef>,
}

impl NewRecord {
    /// Creates a new record builder.
    pub fn builder() -> NewRecordBuilder {
        NewRecordBuilder::default()
    }
}

/// Builder for constructing new records.
#[derive(Debug, Default)]
pub struct NewRecordBuilder {
    id: Option<RecordId>,
    entity_type: Option<String>,
    fields: Option<serde_json::Value>,
    unique_keys: Vec<UniqueKey>,
    references: Vec<RecordRef>,
}

impl NewRecordBuilder {
    /// Presets the record id. If not set, the store assigns a new one.
    pub fn id(mut self, id: RecordId) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the entity type.
    pub fn entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    /// Sets the body from a serializable value.
    pub fn fields<T: Serialize>(mut self, fields: &T) -> Result<Self> {
        self.fields = Some(serde_json::to_value(fields)?);
        Ok(self)
    }

    /// Sets the body from a raw JSON value.
    pub fn fields_raw(mut self, fields: serde_json::Value) -> Self {
        self.fields = Some(fields);
        self
    }

    /// Claims a unique key.
    pub fn unique_key(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.unique_keys.push(UniqueKey::new(name, value));
        self
    }

    /// Claims several unique keys.
    pub fn unique_keys(mut self, keys: impl IntoIterator<Item = UniqueKey>) -> Self {
        self.unique_keys.extend(keys);
        self
    }

    /// Adds a reference to another record.
    pub fn reference(mut self, entity_type: impl Into<String>, id: RecordId) -> Self {
        self.references.push(RecordRef::new(entity_type, id));
        self
    }

    /// Adds several references.
    pub fn references(mut self, refs: impl IntoIterator<Item = RecordRef>) -> Self {
        self.references.extend(refs);
        self
    }

    /// Builds the record, failing if the entity type or body is missing.
    pub fn build(self) -> Result<NewRecord> {
        let entity_type = self
            .entity_type
            .ok_or_else(|| StoreError::Validation("entity_type is required".to_string()))?;
        let fields = self
            .fields
            .ok_or_else(|| StoreError::Validation("fields are required".to_string()))?;

        Ok(NewRecord {
            id: self.id,
            entity_type,
            fields,
            unique_keys: self.unique_keys,
            references: self.references,
        })
    }
}

/// Full replacement of a stored record's body.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordUpdate {
    pub fields: serde_json::Value,
    pub unique_keys: Vec<UniqueKey>,
    pub references: Vec<RecordRef>,
    /// When set, the update fails unless the record is at this version.
    pub expected_version: Option<Version>,
}

impl RecordUpdate {
    /// Creates an update replacing the body with `fields`, releasing all
    /// unique keys and references unless they are set again.
    pub fn new(fields: serde_json::Value) -> Self {
        Self {
            fields,
            unique_keys: Vec::new(),
            references: Vec::new(),
            expected_version: None,
        }
    }

    /// Creates an update from a serializable value.
    pub fn from_value<T: Serialize>(fields: &T) -> Result<Self> {
        Ok(Self::new(serde_json::to_value(fields)?))
    }

    /// Sets the unique keys the record claims after the update.
    pub fn unique_keys(mut self, keys: Vec<UniqueKey>) -> Self {
        self.unique_keys = keys;
        self
    }

    /// Sets the references the record holds after the update.
    pub fn references(mut self, refs: Vec<RecordRef>) -> Self {
        self.references = refs;
        self
    }

    /// Requires the stored record to be at `version`.
    pub fn expect_version(mut self, version: Version) -> Self {
        self.expected_version = Some(version);
        self
    }
}
