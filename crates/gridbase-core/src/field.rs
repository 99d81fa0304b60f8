//! Field descriptors
//!
//! A field describes one column of a table: its id, the static type of its
//! cell values and whether a cell holds one value or many. The formula
//! engine only ever sees fields through the [`Field`] trait; concrete field
//! kinds (text, number, link, lookup, ...) live in the host application.

use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::value::CellValue;

/// Static type of a cell value.
///
/// Multi-valued cells reuse the same tags: a lookup of numbers is
/// `Number` with `is_multiple_cell_value() == true`, and the tag then
/// describes the element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CellValueType {
    String,
    Number,
    Boolean,
    DateTime,
}

impl fmt::Display for CellValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CellValueType::String => "string",
            CellValueType::Number => "number",
            CellValueType::Boolean => "boolean",
            CellValueType::DateTime => "datetime",
        };
        write!(f, "{}", name)
    }
}

/// Descriptor contract a host field must satisfy to participate in formula
/// evaluation. The engine never mutates a field.
pub trait Field: Send + Sync {
    /// Stable field id, the token written inside `{...}` in expressions.
    fn id(&self) -> &str;

    /// Static type of this field's cell values (element type for
    /// multi-valued fields).
    fn cell_value_type(&self) -> CellValueType;

    /// Whether a cell of this field holds an array of values.
    fn is_multiple_cell_value(&self) -> bool;

    /// Render a full cell value as display text. `None` means blank.
    fn cell_value_to_string(&self, value: &CellValue) -> Option<String> {
        match value {
            CellValue::Null => None,
            CellValue::Array(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .map(|item| self.item_to_string(item).unwrap_or_default())
                    .collect();
                Some(parts.join(", "))
            }
            v => self.item_to_string(v),
        }
    }

    /// Render one element of a multi-valued cell as display text.
    ///
    /// The default covers plain scalars; fields with structured payloads
    /// (links, attachments) override this to pick out their text part.
    fn item_to_string(&self, item: &CellValue) -> Option<String> {
        match item {
            CellValue::Null => None,
            CellValue::Object(_) => None,
            v => Some(v.to_string()),
        }
    }
}

/// Field descriptors a formula depends on, keyed by field id.
pub type FieldMap = AHashMap<String, Arc<dyn Field>>;

/// Plain descriptor for hosts (and tests) whose fields need no custom
/// rendering.
#[derive(Debug, Clone)]
pub struct BasicField {
    id: String,
    value_type: CellValueType,
    multiple: bool,
}

impl BasicField {
    /// Single-valued field of the given type
    pub fn new<S: Into<String>>(id: S, value_type: CellValueType) -> Self {
        BasicField {
            id: id.into(),
            value_type,
            multiple: false,
        }
    }

    /// Multi-valued field of the given element type
    pub fn multi<S: Into<String>>(id: S, value_type: CellValueType) -> Self {
        BasicField {
            id: id.into(),
            value_type,
            multiple: true,
        }
    }
}

impl Field for BasicField {
    fn id(&self) -> &str {
        &self.id
    }

    fn cell_value_type(&self) -> CellValueType {
        self.value_type
    }

    fn is_multiple_cell_value(&self) -> bool {
        self.multiple
    }
}

/// Build a [`FieldMap`] from any iterator of fields.
pub fn field_map<I, F>(fields: I) -> FieldMap
where
    I: IntoIterator<Item = F>,
    F: Field + 'static,
{
    fields
        .into_iter()
        .map(|f| (f.id().to_string(), Arc::new(f) as Arc<dyn Field>))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cell_value_type_serde_names() {
        assert_eq!(serde_json::to_string(&CellValueType::DateTime).unwrap(), "\"dateTime\"");
        let t: CellValueType = serde_json::from_str("\"number\"").unwrap();
        assert_eq!(t, CellValueType::Number);
    }

    #[test]
    fn test_default_cell_value_to_string() {
        let f = BasicField::new("fld1", CellValueType::Number);
        assert_eq!(
            f.cell_value_to_string(&CellValue::Number(2.5)),
            Some("2.5".to_string())
        );
        assert_eq!(f.cell_value_to_string(&CellValue::Null), None);

        let multi = BasicField::multi("fld2", CellValueType::String);
        let value = CellValue::from(vec!["a", "b"]);
        assert_eq!(multi.cell_value_to_string(&value), Some("a, b".to_string()));
    }

    #[test]
    fn test_default_item_to_string_skips_objects() {
        let f = BasicField::new("fld1", CellValueType::String);
        let obj = CellValue::from(json!({ "recordId": "rec1", "text": "Alpha" }));
        assert_eq!(f.item_to_string(&obj), None);
    }

    #[test]
    fn test_field_map_builder() {
        let map = field_map(vec![
            BasicField::new("fldA", CellValueType::Number),
            BasicField::new("fldB", CellValueType::String),
        ]);
        assert_eq!(map.len(), 2);
        assert_eq!(map["fldA"].cell_value_type(), CellValueType::Number);
    }
}
