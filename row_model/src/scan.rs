//! Row scanning
//!
//! Decodes wire rows back into model structs. Result columns are matched to
//! fields by name through the schema; columns the schema does not know are
//! ignored, NULL values leave the field blank.

use std::collections::HashMap;

use thiserror::Error;
use type_mapping::ValueError;

use crate::model::Model;
use crate::schema::TableSchema;
use crate::transport::ResultStream;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("column {column}: {source}")]
    Decode {
        column: String,
        #[source]
        source: ValueError,
    },

    #[error("model {model} has no field for column {column}")]
    UnknownField { model: &'static str, column: String },
}

/// Drain `stream` into a vector of models, one per row.
///
/// Each row starts from [`Model::blank`] and is filled column by column
/// through the model's typed setters. A value that does not decode fails the
/// whole call.
pub fn scan_rows<T: Model>(
    schema: &TableSchema,
    stream: &mut dyn ResultStream,
) -> Result<Vec<T>, ScanError> {
    let mut field_for: HashMap<&str, &'static str> = HashMap::new();
    for column in &schema.columns {
        field_for.insert(column.name.as_str(), column.field);
    }

    // Resolve result positions to target fields once, before any rows.
    let columns: Vec<String> = stream.columns().to_vec();
    let targets: Vec<Option<&'static str>> = columns
        .iter()
        .map(|name| field_for.get(name.as_str()).copied())
        .collect();

    let mut models = Vec::new();
    while let Some(row) = stream.next_row() {
        let mut model = T::blank();
        for (position, value) in row.into_iter().enumerate() {
            let Some(field) = targets.get(position).copied().flatten() else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            match model.apply_column(field, value) {
                Ok(None) => {}
                Ok(Some(_)) => {
                    return Err(ScanError::UnknownField {
                        model: T::struct_name(),
                        column: columns[position].clone(),
                    })
                }
                Err(source) => {
                    return Err(ScanError::Decode {
                        column: columns[position].clone(),
                        source,
                    })
                }
            }
        }
        models.push(model);
    }
    Ok(models)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldDef;
    use crate::naming::SnakeCase;
    use crate::schema::build_schema;
    use crate::transport::MemoryRows;
    use std::net::IpAddr;
    use type_mapping::{FromPgValue, PgValue};

    #[derive(Debug, Default, PartialEq)]
    struct Device {
        id: i64,
        label: String,
        peers: Vec<IpAddr>,
        scratch: i32,
    }

    impl Model for Device {
        fn struct_name() -> &'static str {
            "Device"
        }

        fn fields() -> &'static [FieldDef] {
            const FIELDS: &[FieldDef] = &[
                FieldDef::column("id", "i64").primary_key(),
                FieldDef::column("label", "String"),
                FieldDef::column("peers", "Vec<IpAddr>"),
                FieldDef::excluded("scratch"),
            ];
            FIELDS
        }

        fn blank() -> Self {
            Device::default()
        }

        fn value_of(&self, field: &str) -> Option<PgValue> {
            match field {
                "id" => Some(PgValue::Int(self.id)),
                "label" => Some(PgValue::Text(self.label.clone())),
                "peers" => Some(PgValue::Array(
                    self.peers
                        .iter()
                        .map(|ip| PgValue::Text(ip.to_string()))
                        .collect(),
                )),
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
                "label" => {
                    self.label = String::from_pg_value(value)?;
                    Ok(None)
                }
                "peers" => {
                    self.peers = Vec::<IpAddr>::from_pg_value(value)?;
                    Ok(None)
                }
                _ => Ok(Some(value)),
            }
        }
    }

    fn device_schema() -> TableSchema {
        build_schema("Device", Device::fields(), &SnakeCase).unwrap()
    }

    #[test]
    fn rows_scan_into_models_in_order() {
        let mut stream = MemoryRows::new(vec!["id".to_string(), "label".to_string()]);
        stream.push_row(vec![PgValue::Int(1), PgValue::Text("alpha".into())]);
        stream.push_row(vec![PgValue::Int(2), PgValue::Text("beta".into())]);

        let devices: Vec<Device> = scan_rows(&device_schema(), &mut stream).unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].id, 1);
        assert_eq!(devices[0].label, "alpha");
        assert_eq!(devices[1].id, 2);
    }

    #[test]
    fn text_ip_arrays_decode_through_the_field_type() {
        let mut stream = MemoryRows::new(vec!["id".to_string(), "peers".to_string()]);
        stream.push_row(vec![
            PgValue::Int(7),
            PgValue::Text("{192.168.1.1,10.0.0.1}".into()),
        ]);

        let devices: Vec<Device> = scan_rows(&device_schema(), &mut stream).unwrap();
        assert_eq!(
            devices[0].peers,
            vec![
                "192.168.1.1".parse::<IpAddr>().unwrap(),
                "10.0.0.1".parse::<IpAddr>().unwrap()
            ]
        );
    }

    #[test]
    fn unknown_result_columns_are_ignored() {
        let mut stream = MemoryRows::new(vec![
            "id".to_string(),
            "row_number".to_string(),
            "label".to_string(),
        ]);
        stream.push_row(vec![
            PgValue::Int(3),
            PgValue::Int(99),
            PgValue::Text("gamma".into()),
        ]);

        let devices: Vec<Device> = scan_rows(&device_schema(), &mut stream).unwrap();
        assert_eq!(devices[0].id, 3);
        assert_eq!(devices[0].label, "gamma");
    }

    #[test]
    fn null_values_leave_fields_blank() {
        let mut stream = MemoryRows::new(vec!["id".to_string(), "label".to_string()]);
        stream.push_row(vec![PgValue::Int(4), PgValue::Null]);

        let devices: Vec<Device> = scan_rows(&device_schema(), &mut stream).unwrap();
        assert_eq!(devices[0].label, "");
    }

    #[test]
    fn excluded_fields_are_never_scanned() {
        // A result column named like the excluded field is not in the schema.
        let mut stream = MemoryRows::new(vec!["id".to_string(), "scratch".to_string()]);
        stream.push_row(vec![PgValue::Int(5), PgValue::Int(42)]);

        let devices: Vec<Device> = scan_rows(&device_schema(), &mut stream).unwrap();
        assert_eq!(devices[0].scratch, 0);
    }

    #[test]
    fn decode_failures_name_the_column() {
        let mut stream = MemoryRows::new(vec!["id".to_string()]);
        stream.push_row(vec![PgValue::Text("not a number".into())]);

        let err = scan_rows::<Device>(&device_schema(), &mut stream).unwrap_err();
        match err {
            ScanError::Decode { column, .. } => assert_eq!(column, "id"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_stream_scans_to_empty_vec() {
        let mut stream = MemoryRows::new(vec!["id".to_string()]);
        let devices: Vec<Device> = scan_rows(&device_schema(), &mut stream).unwrap();
        assert!(devices.is_empty());
    }
}
