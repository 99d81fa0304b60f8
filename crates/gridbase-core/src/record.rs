//! Record snapshots
//!
//! A record is the row a formula evaluates against: a read-only map of
//! field id to cell value plus the row's bookkeeping timestamps. The
//! engine never writes back into a record.

use ahash::AHashMap;
use chrono::{DateTime, Utc};
use serde_json::Value as Json;

use crate::value::CellValue;

/// One row of a table at a point in time.
#[derive(Debug, Clone, Default)]
pub struct Record {
    id: String,
    fields: AHashMap<String, CellValue>,
    created_time: Option<DateTime<Utc>>,
    last_modified_time: Option<DateTime<Utc>>,
}

impl Record {
    /// Empty record with the given id
    pub fn new<S: Into<String>>(id: S) -> Self {
        Record {
            id: id.into(),
            ..Record::default()
        }
    }

    /// Record populated from a JSON object of `fieldId -> cell value`
    pub fn from_json<S: Into<String>>(id: S, fields: Json) -> Self {
        let mut record = Record::new(id);
        if let Json::Object(map) = fields {
            for (field_id, value) in map {
                record.fields.insert(field_id, CellValue::from(value));
            }
        }
        record
    }

    /// Set one field's cell value
    pub fn set<S: Into<String>, V: Into<CellValue>>(mut self, field_id: S, value: V) -> Self {
        self.fields.insert(field_id.into(), value.into());
        self
    }

    /// Set the creation timestamp
    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_time = Some(at);
        self
    }

    /// Set the last-modification timestamp
    pub fn modified_at(mut self, at: DateTime<Utc>) -> Self {
        self.last_modified_time = Some(at);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Cell value for a field, if the record stores one
    pub fn cell_value(&self, field_id: &str) -> Option<&CellValue> {
        self.fields.get(field_id)
    }

    pub fn created_time(&self) -> Option<DateTime<Utc>> {
        self.created_time
    }

    pub fn last_modified_time(&self) -> Option<DateTime<Utc>> {
        self.last_modified_time
    }
}
