//! sqlx-backed transport
//!
//! This module implements the engine's transport traits on top of a
//! PostgreSQL pool. Bulk inserts go through `COPY ... FROM STDIN` in text
//! format; queries run over the simple query protocol via `raw_sql`, so
//! every result value arrives as text and is re-typed here by its declared
//! column type. Array values are deliberately left as their `{...}` literals
//! and decoded by the target field's conversion during scanning.

use std::ops::DerefMut;
use std::str::FromStr;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDateTime};
use ipnetwork::IpNetwork;
use row_model::{BulkSink, DdlExecutor, MemoryRows};
use sqlx::postgres::{PgConnection, PgCopyIn, PgPool, PgRow};
use sqlx::{Column, Row, TypeInfo};
use tracing::{debug, trace};
use type_mapping::PgValue;

/// Runs schema statements on the pool.
pub struct PgDdl<'a> {
    pool: &'a PgPool,
}

impl<'a> PgDdl<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        PgDdl { pool }
    }
}

#[async_trait]
impl DdlExecutor for PgDdl<'_> {
    type Error = sqlx::Error;

    async fn execute_ddl(&self, sql: &str) -> Result<(), sqlx::Error> {
        debug!(statement = %sql, "executing ddl");
        sqlx::query(sql).execute(self.pool).await?;
        Ok(())
    }
}

/// Streams marshaled rows into a table through COPY.
pub struct PgCopySink<'a> {
    pool: &'a PgPool,
}

impl<'a> PgCopySink<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        PgCopySink { pool }
    }
}

#[async_trait]
impl BulkSink for PgCopySink<'_> {
    type Error = sqlx::Error;

    async fn send_rows(
        &self,
        table: &str,
        columns: &[String],
        rows: Vec<Vec<PgValue>>,
    ) -> Result<u64, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        copy_rows(&mut conn, table, columns, rows).await
    }
}

/// COPY `rows` into `table` on an already-acquired connection.
pub(crate) async fn copy_rows(
    conn: &mut PgConnection,
    table: &str,
    columns: &[String],
    rows: Vec<Vec<PgValue>>,
) -> Result<u64, sqlx::Error> {
    let statement = format!("COPY {} ({}) FROM STDIN", table, columns.join(", "));
    debug!(table, rows = rows.len(), "copy begin");
    let sink = conn.copy_in_raw(&statement).await?;
    drain_rows(sink, rows).await
}

async fn drain_rows<C>(mut sink: PgCopyIn<C>, rows: Vec<Vec<PgValue>>) -> Result<u64, sqlx::Error>
where
    C: DerefMut<Target = PgConnection>,
{
    let mut buf = String::with_capacity(rows.len() * 64);
    for row in &rows {
        for (i, value) in row.iter().enumerate() {
            if i > 0 {
                buf.push('\t');
            }
            encode_copy_value(value, &mut buf);
        }
        buf.push('\n');
    }
    trace!(bytes = buf.len(), "copy payload encoded");
    sink.send(buf.into_bytes()).await?;
    sink.finish().await
}

pub(crate) async fn run_ddl(conn: &mut PgConnection, sql: &str) -> Result<(), sqlx::Error> {
    debug!(statement = %sql, "executing ddl");
    sqlx::query(sql).execute(&mut *conn).await?;
    Ok(())
}

/// Fetch a result set over the simple query protocol and buffer it.
pub(crate) async fn fetch_stream(pool: &PgPool, sql: &str) -> Result<MemoryRows, sqlx::Error> {
    let rows = sqlx::raw_sql(sql).fetch_all(pool).await?;
    rows_to_stream(rows)
}

pub(crate) async fn fetch_stream_on(
    conn: &mut PgConnection,
    sql: &str,
) -> Result<MemoryRows, sqlx::Error> {
    let rows = sqlx::raw_sql(sql).fetch_all(&mut *conn).await?;
    rows_to_stream(rows)
}

fn rows_to_stream(rows: Vec<PgRow>) -> Result<MemoryRows, sqlx::Error> {
    let columns: Vec<String> = match rows.first() {
        Some(row) => row.columns().iter().map(|c| c.name().to_string()).collect(),
        None => Vec::new(),
    };
    let mut stream = MemoryRows::new(columns);
    for row in &rows {
        let mut values = Vec::with_capacity(row.len());
        for (i, column) in row.columns().iter().enumerate() {
            // Simple-protocol results are always text encoded.
            let text: Option<String> = row.try_get_unchecked(i)?;
            let value = match text {
                None => PgValue::Null,
                Some(text) => decode_wire_text(column.type_info().name(), &text).map_err(
                    |message| sqlx::Error::ColumnDecode {
                        index: column.name().to_string(),
                        source: message.into(),
                    },
                )?,
            };
            values.push(value);
        }
        stream.push_row(values);
    }
    debug!(rows = stream.len(), "fetched result set");
    Ok(stream)
}

/// Re-type a text wire value by its declared column type.
///
/// Types outside the match, array types in particular, stay as text and are
/// interpreted later against the target field.
fn decode_wire_text(type_name: &str, text: &str) -> Result<PgValue, String> {
    let value = match type_name {
        "BOOL" => PgValue::Bool(text == "t" || text == "true"),
        "INT2" | "INT4" | "INT8" => PgValue::Int(
            text.parse()
                .map_err(|_| format!("invalid integer literal {text:?}"))?,
        ),
        "FLOAT4" | "FLOAT8" => PgValue::Float(
            text.parse()
                .map_err(|_| format!("invalid float literal {text:?}"))?,
        ),
        "NUMERIC" => PgValue::Numeric(
            BigDecimal::from_str(text).map_err(|_| format!("invalid numeric literal {text:?}"))?,
        ),
        "TIMESTAMP" | "TIMESTAMPTZ" => PgValue::Timestamp(
            parse_timestamp(text).ok_or_else(|| format!("invalid timestamp literal {text:?}"))?,
        ),
        "JSON" | "JSONB" => PgValue::Json(
            serde_json::from_str(text).map_err(|e| format!("invalid json payload: {e}"))?,
        ),
        "BYTEA" => PgValue::Bytes(parse_bytea(text)?),
        "INET" | "CIDR" => PgValue::Inet(
            IpNetwork::from_str(text.trim())
                .map_err(|_| format!("invalid network literal {text:?}"))?,
        ),
        _ => PgValue::Text(text.to_string()),
    };
    Ok(value)
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(naive);
    }
    // timestamptz output carries a zone suffix like "+00"
    DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%#z")
        .ok()
        .map(|dt| dt.naive_utc())
}

fn parse_bytea(text: &str) -> Result<Vec<u8>, String> {
    match text.strip_prefix("\\x") {
        Some(digits) => {
            hex::decode(digits).map_err(|_| format!("invalid bytea literal {text:?}"))
        }
        None => Ok(text.as_bytes().to_vec()),
    }
}

/// Append one value in COPY text format.
fn encode_copy_value(value: &PgValue, out: &mut String) {
    match value {
        PgValue::Null => out.push_str("\\N"),
        PgValue::Bool(true) => out.push('t'),
        PgValue::Bool(false) => out.push('f'),
        PgValue::Int(v) => out.push_str(&v.to_string()),
        PgValue::Float(v) => out.push_str(&float_text(*v)),
        PgValue::Numeric(d) => out.push_str(&d.to_string()),
        PgValue::Text(s) => escape_copy_text(s, out),
        PgValue::Bytes(b) => {
            out.push_str("\\\\x");
            out.push_str(&hex::encode(b));
        }
        PgValue::Timestamp(dt) => out.push_str(&dt.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        PgValue::Json(v) => {
            let payload = v.to_string();
            escape_copy_text(&payload, out);
        }
        PgValue::Inet(net) => out.push_str(&net.to_string()),
        PgValue::Array(items) => {
            let literal = encode_array_literal(items);
            escape_copy_text(&literal, out);
        }
    }
}

/// Escape a COPY text field: backslash, tab, newline, carriage return.
fn escape_copy_text(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
}

/// Render an array as a `{...}` literal. Text elements are always quoted;
/// numeric and network elements are safe bare.
fn encode_array_literal(items: &[PgValue]) -> String {
    let mut body = String::from("{");
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            body.push(',');
        }
        match item {
            PgValue::Null => body.push_str("NULL"),
            PgValue::Text(s) => {
                body.push('"');
                for c in s.chars() {
                    match c {
                        '"' => body.push_str("\\\""),
                        '\\' => body.push_str("\\\\"),
                        _ => body.push(c),
                    }
                }
                body.push('"');
            }
            PgValue::Int(v) => body.push_str(&v.to_string()),
            PgValue::Float(v) => body.push_str(&float_text(*v)),
            PgValue::Numeric(d) => body.push_str(&d.to_string()),
            PgValue::Bool(true) => body.push('t'),
            PgValue::Bool(false) => body.push('f'),
            PgValue::Inet(net) => body.push_str(&net.to_string()),
            other => {
                // No array column type carries these; keep the literal
                // well-formed if one ever slips through.
                let mut elem = String::new();
                encode_copy_value(other, &mut elem);
                body.push('"');
                for c in elem.chars() {
                    match c {
                        '"' => body.push_str("\\\""),
                        '\\' => body.push_str("\\\\"),
                        _ => body.push(c),
                    }
                }
                body.push('"');
            }
        }
    }
    body.push('}');
    body
}

fn float_text(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v == f64::INFINITY {
        "Infinity".to_string()
    } else if v == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else {
        v.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;

    fn encoded(value: &PgValue) -> String {
        let mut out = String::new();
        encode_copy_value(value, &mut out);
        out
    }

    #[test]
    fn null_encodes_as_backslash_n() {
        assert_eq!(encoded(&PgValue::Null), "\\N");
    }

    #[test]
    fn bools_encode_as_single_letters() {
        assert_eq!(encoded(&PgValue::Bool(true)), "t");
        assert_eq!(encoded(&PgValue::Bool(false)), "f");
    }

    #[test]
    fn text_control_characters_are_escaped() {
        let value = PgValue::Text("a\tb\nc\\d".into());
        assert_eq!(encoded(&value), "a\\tb\\nc\\\\d");
    }

    #[test]
    fn bytes_encode_as_escaped_hex() {
        let value = PgValue::Bytes(vec![0x68, 0x69]);
        assert_eq!(encoded(&value), "\\\\x6869");
    }

    #[test]
    fn timestamps_use_postgres_text_format() {
        let dt = NaiveDateTime::parse_from_str("2021-03-04 05:06:07.25", "%Y-%m-%d %H:%M:%S%.f")
            .unwrap();
        assert_eq!(encoded(&PgValue::Timestamp(dt)), "2021-03-04 05:06:07.250");
    }

    #[test]
    fn string_array_elements_are_quoted() {
        let value = PgValue::Array(vec![
            PgValue::Text("plain".into()),
            PgValue::Text("wo,rld".into()),
            PgValue::Text("qu\"ote".into()),
        ]);
        assert_eq!(encoded(&value), r#"{"plain","wo,rld","qu\\"ote"}"#);
    }

    #[test]
    fn ip_array_elements_are_bare() {
        let ip: IpAddr = "192.168.1.1".parse().unwrap();
        let value = PgValue::Array(vec![
            PgValue::Inet(IpNetwork::from(ip)),
            PgValue::Null,
        ]);
        assert_eq!(encoded(&value), "{192.168.1.1/32,NULL}");
    }

    #[test]
    fn int_arrays_render_bare_elements() {
        let value = PgValue::Array(vec![PgValue::Int(1), PgValue::Int(2), PgValue::Int(3)]);
        assert_eq!(encoded(&value), "{1,2,3}");
    }

    #[test]
    fn wire_text_decodes_by_declared_type() {
        assert_eq!(decode_wire_text("INT8", "42"), Ok(PgValue::Int(42)));
        assert_eq!(decode_wire_text("BOOL", "t"), Ok(PgValue::Bool(true)));
        assert_eq!(
            decode_wire_text("TEXT", "hello"),
            Ok(PgValue::Text("hello".into()))
        );
        assert_eq!(
            decode_wire_text("FLOAT8", "1.5"),
            Ok(PgValue::Float(1.5))
        );
    }

    #[test]
    fn numeric_text_keeps_full_precision() {
        let value = decode_wire_text("NUMERIC", "18446744073709551615").unwrap();
        assert_eq!(
            value,
            PgValue::Numeric(BigDecimal::from(u64::MAX))
        );
    }

    #[test]
    fn timestamp_text_parses_with_and_without_zone() {
        let plain = decode_wire_text("TIMESTAMP", "2004-10-19 10:23:54").unwrap();
        let zoned = decode_wire_text("TIMESTAMPTZ", "2004-10-19 10:23:54+00").unwrap();
        assert_eq!(plain, zoned);
    }

    #[test]
    fn bytea_text_round_trips() {
        assert_eq!(
            decode_wire_text("BYTEA", "\\x6869"),
            Ok(PgValue::Bytes(b"hi".to_vec()))
        );
    }

    #[test]
    fn network_text_parses_with_and_without_prefix() {
        let bare = decode_wire_text("INET", "10.0.0.1").unwrap();
        let prefixed = decode_wire_text("CIDR", "10.0.0.1/32").unwrap();
        assert_eq!(bare, prefixed);
    }

    #[test]
    fn array_types_pass_through_as_text() {
        assert_eq!(
            decode_wire_text("TEXT[]", "{a,b}"),
            Ok(PgValue::Text("{a,b}".into()))
        );
        assert_eq!(
            decode_wire_text("CIDR[]", "{192.168.1.1/32,10.0.0.1/32}"),
            Ok(PgValue::Text("{192.168.1.1/32,10.0.0.1/32}".into()))
        );
    }

    #[test]
    fn bad_literals_name_the_problem() {
        let err = decode_wire_text("INT8", "forty-two").unwrap_err();
        assert!(err.contains("integer"));
    }
}
