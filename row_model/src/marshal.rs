//! Row marshaling
//!
//! Turns model instances into positional wire rows ordered by the table
//! schema. Excluded fields never made it into the schema, so they are
//! filtered out here for free.

use thiserror::Error;
use type_mapping::PgValue;

use crate::model::Model;
use crate::schema::TableSchema;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarshalError {
    #[error("model {model} has no value for column {column}")]
    MissingField { model: &'static str, column: String },
}

/// Produce one positional row per model, in input order.
///
/// Values within a row follow the schema's column order. An empty batch
/// produces an empty row set.
pub fn marshal_rows<T: Model>(
    schema: &TableSchema,
    models: &[T],
) -> Result<Vec<Vec<PgValue>>, MarshalError> {
    let mut rows = Vec::with_capacity(models.len());
    for model in models {
        let mut row = Vec::with_capacity(schema.columns.len());
        for column in &schema.columns {
            match model.value_of(column.field) {
                Some(value) => row.push(value),
                // Only possible when the schema was built for another model.
                None => {
                    return Err(MarshalError::MissingField {
                        model: T::struct_name(),
                        column: column.name.clone(),
                    })
                }
            }
        }
        rows.push(row);
    }
    Ok(rows)
}
