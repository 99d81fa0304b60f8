//! # gridbase-core
//!
//! Core data model for the gridbase record grid.
//!
//! This crate provides the types shared by the formula engine and its host:
//! - [`CellValue`] - Runtime cell payloads (scalars, arrays, structured shapes)
//! - [`CellValueType`] - The static type of a field's cells
//! - [`Field`] - Descriptor contract a host field implements
//! - [`Record`] - Read-only snapshot of one row
//!
//! ## Example
//!
//! ```rust
//! use gridbase_core::{field_map, BasicField, CellValueType, Record};
//!
//! let fields = field_map(vec![
//!     BasicField::new("fldPrice", CellValueType::Number),
//!     BasicField::new("fldName", CellValueType::String),
//! ]);
//!
//! let record = Record::new("rec1").set("fldPrice", 9.5).set("fldName", "Tea");
//! assert_eq!(record.cell_value("fldName").unwrap().to_string(), "Tea");
//! assert!(fields.contains_key("fldPrice"));
//! ```

pub mod field;
pub mod record;
pub mod value;

// Re-exports for convenience
pub use field::{field_map, BasicField, CellValueType, Field, FieldMap};
pub use record::Record;
pub use value::{iso_string, CellValue};
