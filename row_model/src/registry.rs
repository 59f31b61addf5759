//! Model registry
//!
//! Schemas are built once, at registration, and looked up by model type
//! afterwards. Using an unregistered model is an error rather than an
//! implicit registration, so the set of tables a program touches is always
//! explicit in its startup code.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::model::Model;
use crate::naming::{NamingStrategy, SnakeCase};
use crate::schema::{build_schema, SchemaError, TableSchema};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("model {model} is not registered")]
pub struct NotRegistered {
    pub model: &'static str,
}

/// Holds the table schema of every registered model.
pub struct Registry {
    naming: Arc<dyn NamingStrategy>,
    schemas: HashMap<TypeId, Arc<TableSchema>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::with_naming(Arc::new(SnakeCase))
    }

    pub fn with_naming(naming: Arc<dyn NamingStrategy>) -> Self {
        Registry {
            naming,
            schemas: HashMap::new(),
        }
    }

    /// Build and store the schema for `T`. Registering the same model again
    /// rebuilds its schema.
    pub fn register<T: Model + 'static>(&mut self) -> Result<Arc<TableSchema>, SchemaError> {
        let schema = Arc::new(build_schema(
            T::struct_name(),
            T::fields(),
            self.naming.as_ref(),
        )?);
        self.schemas.insert(TypeId::of::<T>(), Arc::clone(&schema));
        Ok(schema)
    }

    pub fn schema_of<T: Model + 'static>(&self) -> Result<Arc<TableSchema>, NotRegistered> {
        self.schemas
            .get(&TypeId::of::<T>())
            .cloned()
            .ok_or(NotRegistered {
                model: T::struct_name(),
            })
    }

    pub fn is_registered<T: Model + 'static>(&self) -> bool {
        self.schemas.contains_key(&TypeId::of::<T>())
    }

    /// Table names of all registered models, in no particular order.
    pub fn table_names(&self) -> Vec<&str> {
        self.schemas
            .values()
            .map(|schema| schema.table.as_str())
            .collect()
    }

    /// Every registered schema, in no particular order.
    pub fn schemas(&self) -> impl Iterator<Item = &Arc<TableSchema>> {
        self.schemas.values()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldDef;
    use type_mapping::{FromPgValue, PgValue, ValueError};

    #[derive(Debug, Default)]
    struct Widget {
        id: i64,
    }

    impl Model for Widget {
        fn struct_name() -> &'static str {
            "Widget"
        }

        fn fields() -> &'static [FieldDef] {
            const FIELDS: &[FieldDef] = &[FieldDef::column("id", "i64").primary_key()];
            FIELDS
        }

        fn blank() -> Self {
            Widget::default()
        }

        fn value_of(&self, field: &str) -> Option<PgValue> {
            match field {
                "id" => Some(PgValue::Int(self.id)),
                _ => None,
            }
        }

        fn apply_column(
            &mut self,
            field: &str,
            value: PgValue,
        ) -> Result<Option<PgValue>, ValueError> {
            match field {
                "id" => {
                    self.id = i64::from_pg_value(value)?;
                    Ok(None)
                }
                _ => Ok(Some(value)),
            }
        }
    }

    #[test]
    fn registration_builds_and_caches_the_schema() {
        let mut registry = Registry::new();
        assert!(!registry.is_registered::<Widget>());

        let schema = registry.register::<Widget>().unwrap();
        assert_eq!(schema.table, "widget");
        assert!(registry.is_registered::<Widget>());
        assert_eq!(registry.len(), 1);

        let looked_up = registry.schema_of::<Widget>().unwrap();
        assert_eq!(looked_up.table, "widget");
    }

    #[test]
    fn unregistered_models_are_an_error() {
        let registry = Registry::new();
        let err = registry.schema_of::<Widget>().unwrap_err();
        assert_eq!(err, NotRegistered { model: "Widget" });
        assert_eq!(err.to_string(), "model Widget is not registered");
    }

    #[test]
    fn table_names_lists_registered_models() {
        let mut registry = Registry::new();
        registry.register::<Widget>().unwrap();
        assert_eq!(registry.table_names(), vec!["widget"]);
    }
}
