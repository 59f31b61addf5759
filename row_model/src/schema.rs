//! Table schema construction and DDL generation
//!
//! A [`TableSchema`] is built once per registered model by walking its field
//! descriptors in declaration order, flattening embedded structs into the
//! parent table and collecting index declarations along the way. The schema
//! then renders the `CREATE TABLE` and `CREATE INDEX` statements and drives
//! row marshaling and scanning.

use std::collections::HashSet;

use thiserror::Error;
use type_mapping::{pg_column_type, UnsupportedType};

use crate::model::{FieldDef, FieldKind};
use crate::naming::NamingStrategy;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("duplicate column {column} in table {table}")]
    DuplicateColumn { table: String, column: String },

    #[error("field {field} in table {table}: {source}")]
    UnsupportedField {
        table: String,
        field: &'static str,
        #[source]
        source: UnsupportedType,
    },

    #[error("table {table} has no mappable columns")]
    NoColumns { table: String },
}

/// One column of a generated table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    /// Source field identifier, used to address the field on the model.
    pub field: &'static str,
    /// Column name after naming conversion.
    pub name: String,
    pub sql_type: &'static str,
    pub primary_key: bool,
    pub unique: bool,
    pub not_null: bool,
}

/// One index of a generated table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDef {
    pub name: String,
    pub columns: Vec<String>,
    /// JSONB columns are indexed with GIN instead of the default method.
    pub gin: bool,
}

/// The table layout derived from a model struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub table: String,
    /// Columns in flattened declaration order.
    pub columns: Vec<ColumnDef>,
    /// Single-column indexes first, composite groups after.
    pub indexes: Vec<IndexDef>,
}

/// Build the schema for `struct_name` from its field descriptors.
pub fn build_schema(
    struct_name: &str,
    fields: &'static [FieldDef],
    naming: &dyn NamingStrategy,
) -> Result<TableSchema, SchemaError> {
    let mut builder = SchemaBuilder {
        table: naming.table_name(struct_name),
        naming,
        columns: Vec::new(),
        seen: HashSet::new(),
        singles: Vec::new(),
        groups: Vec::new(),
    };
    builder.walk(fields)?;
    builder.finish()
}

struct SchemaBuilder<'a> {
    table: String,
    naming: &'a dyn NamingStrategy,
    columns: Vec<ColumnDef>,
    seen: HashSet<String>,
    singles: Vec<IndexDef>,
    /// Composite groups in discovery order, members in first-seen order.
    groups: Vec<(String, Vec<String>)>,
}

impl SchemaBuilder<'_> {
    fn walk(&mut self, fields: &'static [FieldDef]) -> Result<(), SchemaError> {
        for field in fields {
            match field.kind {
                FieldKind::Excluded => continue,
                FieldKind::Embedded => {
                    if let Some(nested) = field.embedded_fields {
                        self.walk(nested())?;
                    }
                }
                FieldKind::Column => self.column(field)?,
            }
        }
        Ok(())
    }

    fn column(&mut self, field: &FieldDef) -> Result<(), SchemaError> {
        let name = self.naming.column_name(field.name);
        if !self.seen.insert(name.clone()) {
            return Err(SchemaError::DuplicateColumn {
                table: self.table.clone(),
                column: name,
            });
        }
        let sql_type =
            pg_column_type(field.rust_type).map_err(|source| SchemaError::UnsupportedField {
                table: self.table.clone(),
                field: field.name,
                source,
            })?;

        match field.index_group {
            Some(group) => match self.groups.iter_mut().find(|(g, _)| g == group) {
                Some((_, members)) => members.push(name.clone()),
                None => self.groups.push((group.to_string(), vec![name.clone()])),
            },
            None if field.index => self.singles.push(IndexDef {
                name: format!("idx_{}_{}", self.table, name),
                columns: vec![name.clone()],
                gin: sql_type == "JSONB",
            }),
            None => {}
        }

        self.columns.push(ColumnDef {
            field: field.name,
            name,
            sql_type,
            primary_key: field.primary_key,
            unique: field.unique,
            not_null: field.not_null,
        });
        Ok(())
    }

    fn finish(self) -> Result<TableSchema, SchemaError> {
        if self.columns.is_empty() {
            return Err(SchemaError::NoColumns { table: self.table });
        }
        let mut indexes = self.singles;
        for (group, members) in self.groups {
            indexes.push(IndexDef {
                name: format!("idx_{}_{}", self.table, group),
                columns: members,
                gin: false,
            });
        }
        Ok(TableSchema {
            table: self.table,
            columns: self.columns,
            indexes,
        })
    }
}

impl TableSchema {
    /// Render the `CREATE TABLE IF NOT EXISTS` statement.
    ///
    /// One column per line, constraints in the order PRIMARY KEY, UNIQUE,
    /// NOT NULL.
    pub fn create_table_sql(&self) -> String {
        let lines: Vec<String> = self
            .columns
            .iter()
            .map(|column| {
                let mut line = format!("{} {}", column.name, column.sql_type);
                if column.primary_key {
                    line.push_str(" PRIMARY KEY");
                }
                if column.unique {
                    line.push_str(" UNIQUE");
                }
                if column.not_null {
                    line.push_str(" NOT NULL");
                }
                line
            })
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n);",
            self.table,
            lines.join(",\n")
        )
    }

    /// Render one `CREATE INDEX IF NOT EXISTS` statement per index.
    pub fn create_index_sql(&self) -> Vec<String> {
        self.indexes
            .iter()
            .map(|index| {
                let using = if index.gin { " USING GIN" } else { "" };
                format!(
                    "CREATE INDEX IF NOT EXISTS {} ON {}{} ({});",
                    index.name,
                    self.table,
                    using,
                    index.columns.join(", ")
                )
            })
            .collect()
    }

    /// Column names in schema order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}
