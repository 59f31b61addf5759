//! Model trait and field descriptors
//!
//! This module defines the contract between derived model structs and the
//! mapping engine. The derive macro emits a static [`FieldDef`] table per
//! struct; everything else (schema building, marshal, scan) works from that
//! table at runtime.

use type_mapping::{PgValue, ValueError};

/// How a declared field participates in the generated table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A plain column.
    Column,
    /// A nested struct whose fields are spliced into the parent table.
    Embedded,
    /// Never mapped and never stored.
    Excluded,
}

/// Static description of one declared struct field.
///
/// Instances are generated at compile time and handed to the engine as a
/// `&'static [FieldDef]` slice in declaration order.
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    /// Field identifier as written in the struct.
    pub name: &'static str,
    /// Normalized Rust type string, e.g. `Vec<String>`.
    pub rust_type: &'static str,
    pub kind: FieldKind,
    pub primary_key: bool,
    pub unique: bool,
    pub not_null: bool,
    pub index: bool,
    /// Composite index group this column belongs to, if any.
    pub index_group: Option<&'static str>,
    /// Field table of the nested struct, set for embedded fields.
    pub embedded_fields: Option<fn() -> &'static [FieldDef]>,
}

impl FieldDef {
    /// A bare column descriptor with no constraints. The derive macro starts
    /// from this and fills in what the field attributes declare.
    pub const fn column(name: &'static str, rust_type: &'static str) -> Self {
        FieldDef {
            name,
            rust_type,
            kind: FieldKind::Column,
            primary_key: false,
            unique: false,
            not_null: false,
            index: false,
            index_group: None,
            embedded_fields: None,
        }
    }

    pub const fn embedded(name: &'static str, fields: fn() -> &'static [FieldDef]) -> Self {
        FieldDef {
            name,
            rust_type: "",
            kind: FieldKind::Embedded,
            primary_key: false,
            unique: false,
            not_null: false,
            index: false,
            index_group: None,
            embedded_fields: Some(fields),
        }
    }

    pub const fn excluded(name: &'static str) -> Self {
        FieldDef {
            name,
            rust_type: "",
            kind: FieldKind::Excluded,
            primary_key: false,
            unique: false,
            not_null: false,
            index: false,
            index_group: None,
            embedded_fields: None,
        }
    }

    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub const fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub const fn indexed(mut self) -> Self {
        self.index = true;
        self
    }

    pub const fn index_group(mut self, group: &'static str) -> Self {
        self.index_group = Some(group);
        self
    }
}

/// A struct that maps to a database table.
///
/// Implemented via `#[derive(Model)]`; the methods dispatch on field
/// identifiers so the engine never needs reflection.
pub trait Model {
    /// Struct name as written in source, before naming conversion.
    fn struct_name() -> &'static str;

    /// Field descriptors in declaration order.
    fn fields() -> &'static [FieldDef];

    /// A fresh instance with every field blank, used as the scan target.
    fn blank() -> Self
    where
        Self: Sized;

    /// Wire value of the named field, delegating into embedded structs.
    /// `None` means no field of that name exists anywhere in the struct.
    fn value_of(&self, field: &str) -> Option<PgValue>;

    /// Decode `value` into the named field, delegating into embedded
    /// structs. Returns `Ok(None)` when the field claimed the value and
    /// `Ok(Some(value))` when no field of that name exists, handing the
    /// value back untouched.
    fn apply_column(&mut self, field: &str, value: PgValue)
        -> Result<Option<PgValue>, ValueError>;
}
