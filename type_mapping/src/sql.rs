//! SQL type conversion
//!
//! Maps the Rust field types recorded by the derive macro to the
//! PostgreSQL column types emitted in DDL.

use thiserror::Error;

/// A field type with no PostgreSQL column mapping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported type {0}")]
pub struct UnsupportedType(pub String);

/// Path prefixes stripped before matching so that `std::net::IpAddr`
/// and `IpAddr` resolve to the same column type.
const PATH_PREFIXES: &[&str] = &[
    "std::collections::",
    "std::net::",
    "core::net::",
    "alloc::vec::",
    "chrono::",
    "serde_json::",
    "ipnetwork::",
];

/// Map a Rust type name to its PostgreSQL column type for DDL generation.
///
/// The table is closed: any type outside it fails with [`UnsupportedType`]
/// naming the offending type. `Option<..>` is accepted only around the
/// timestamp and IP/network types (one level, mirroring nullable pointers),
/// and sequences never nest.
pub fn pg_column_type(rust_type: &str) -> Result<&'static str, UnsupportedType> {
    let ty = canonical(rust_type);

    if let Some(elem) = ty.strip_prefix("Vec<").and_then(|t| t.strip_suffix('>')) {
        return element_column_type(elem).ok_or_else(|| UnsupportedType(rust_type.to_string()));
    }
    if is_map_type(&ty) {
        return Ok("JSONB");
    }
    scalar_column_type(&ty).ok_or_else(|| UnsupportedType(rust_type.to_string()))
}

fn canonical(rust_type: &str) -> String {
    let mut ty: String = rust_type.chars().filter(|c| !c.is_whitespace()).collect();
    for prefix in PATH_PREFIXES {
        ty = ty.replace(prefix, "");
    }
    ty
}

fn is_map_type(ty: &str) -> bool {
    ty.starts_with("HashMap<") || ty.starts_with("BTreeMap<") || ty.starts_with("Map<")
}

fn scalar_column_type(ty: &str) -> Option<&'static str> {
    match ty {
        "i16" => Some("SMALLINT"),
        "i32" | "isize" => Some("INTEGER"),
        "i64" => Some("BIGINT"),
        "f32" => Some("FLOAT4"),
        "u64" | "usize" | "f64" => Some("NUMERIC"),
        "String" => Some("TEXT"),
        "bool" => Some("BOOLEAN"),
        // serde_json::Value is the raw-JSON payload type
        "Value" => Some("JSONB"),
        "NaiveDateTime" | "DateTime<Utc>" => Some("TIMESTAMP"),
        "Option<NaiveDateTime>" | "Option<DateTime<Utc>>" => Some("TIMESTAMP"),
        "IpAddr" | "Option<IpAddr>" => Some("CIDR"),
        "IpNetwork" | "Option<IpNetwork>" => Some("INET"),
        _ => None,
    }
}

fn element_column_type(elem: &str) -> Option<&'static str> {
    match elem {
        "u8" => Some("BYTEA"),
        "String" => Some("TEXT[]"),
        "i16" => Some("SMALLINT[]"),
        "i32" | "isize" => Some("INTEGER[]"),
        "i64" => Some("BIGINT[]"),
        "f32" => Some("FLOAT4[]"),
        "u64" | "usize" | "f64" => Some("NUMERIC[]"),
        "IpAddr" | "Option<IpAddr>" => Some("CIDR[]"),
        "IpNetwork" | "Option<IpNetwork>" => Some("INET[]"),
        _ => None,
    }
}
