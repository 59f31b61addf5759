//! Runtime value model
//!
//! `PgValue` is the dynamic value passed between the mapping engine and the
//! transport: marshaled rows carry it into the bulk sink, and scanned rows
//! carry it back out of the result stream. The conversion traits hold the
//! type-specific decode rules applied while scanning.

use std::collections::{BTreeMap, HashMap};
use std::net::{IpAddr, Ipv4Addr};

use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::{DateTime, NaiveDateTime, Utc};
use ipnetwork::IpNetwork;
use serde_json::Value as JsonValue;
use thiserror::Error;

/// PostgreSQL wire values as the engine sees them.
///
/// Integer columns of every width travel as `Int` (the 64-bit wire value);
/// array columns read from the database arrive as their `{...}` text
/// representation and are decoded by the target field's conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum PgValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Numeric(BigDecimal),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(NaiveDateTime),
    Json(JsonValue),
    Inet(IpNetwork),
    Array(Vec<PgValue>),
}

impl PgValue {
    /// Short wire-kind name used in decode errors.
    pub fn kind(&self) -> &'static str {
        match self {
            PgValue::Null => "NULL",
            PgValue::Bool(_) => "BOOLEAN",
            PgValue::Int(_) => "BIGINT",
            PgValue::Float(_) => "FLOAT",
            PgValue::Numeric(_) => "NUMERIC",
            PgValue::Text(_) => "TEXT",
            PgValue::Bytes(_) => "BYTEA",
            PgValue::Timestamp(_) => "TIMESTAMP",
            PgValue::Json(_) => "JSON",
            PgValue::Inet(_) => "INET",
            PgValue::Array(_) => "ARRAY",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, PgValue::Null)
    }
}

/// A value that could not be converted into its target field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("cannot decode {found} into {expected}")]
    Decode {
        expected: &'static str,
        found: &'static str,
    },
    #[error("value out of range for {target}")]
    OutOfRange { target: &'static str },
    #[error("invalid array payload: {payload}")]
    InvalidArrayFormat { payload: String },
}

fn decode_err<T>(expected: &'static str, found: &PgValue) -> Result<T, ValueError> {
    Err(ValueError::Decode {
        expected,
        found: found.kind(),
    })
}

/// Conversion from a struct field into its wire value.
pub trait ToPgValue {
    fn to_pg_value(&self) -> PgValue;
}

/// Conversion from a wire value into a struct field.
pub trait FromPgValue: Sized {
    fn from_pg_value(value: PgValue) -> Result<Self, ValueError>;
}

/// Blank field values used when allocating a fresh scan target.
///
/// Mirrors `Default` but also covers the network types that have no
/// `Default` impl in std.
pub trait PgDefault {
    fn pg_default() -> Self;
}

// ---------------------------------------------------------------------------
// PgDefault

macro_rules! pg_default_via_default {
    ($($t:ty),* $(,)?) => {
        $(impl PgDefault for $t {
            fn pg_default() -> Self {
                <$t>::default()
            }
        })*
    };
}

pg_default_via_default!(i16, i32, i64, isize, u32, u64, usize, f32, f64, bool, String, JsonValue);

impl<T> PgDefault for Vec<T> {
    fn pg_default() -> Self {
        Vec::new()
    }
}

impl<T> PgDefault for Option<T> {
    fn pg_default() -> Self {
        None
    }
}

impl<K, V> PgDefault for HashMap<K, V> {
    fn pg_default() -> Self {
        HashMap::new()
    }
}

impl<K: Ord, V> PgDefault for BTreeMap<K, V> {
    fn pg_default() -> Self {
        BTreeMap::new()
    }
}

impl PgDefault for NaiveDateTime {
    fn pg_default() -> Self {
        DateTime::<Utc>::UNIX_EPOCH.naive_utc()
    }
}

impl PgDefault for DateTime<Utc> {
    fn pg_default() -> Self {
        DateTime::UNIX_EPOCH
    }
}

impl PgDefault for IpAddr {
    fn pg_default() -> Self {
        IpAddr::V4(Ipv4Addr::UNSPECIFIED)
    }
}

impl PgDefault for IpNetwork {
    fn pg_default() -> Self {
        IpNetwork::from(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
    }
}

// ---------------------------------------------------------------------------
// ToPgValue

macro_rules! int_to_pg {
    ($($t:ty),* $(,)?) => {
        $(impl ToPgValue for $t {
            fn to_pg_value(&self) -> PgValue {
                PgValue::Int(*self as i64)
            }
        })*
    };
}

int_to_pg!(i16, i32, i64, isize, u32);

impl ToPgValue for u64 {
    fn to_pg_value(&self) -> PgValue {
        PgValue::Numeric(BigDecimal::from(*self))
    }
}

impl ToPgValue for usize {
    fn to_pg_value(&self) -> PgValue {
        PgValue::Numeric(BigDecimal::from(*self as u64))
    }
}

impl ToPgValue for f32 {
    fn to_pg_value(&self) -> PgValue {
        PgValue::Float(f64::from(*self))
    }
}

impl ToPgValue for f64 {
    fn to_pg_value(&self) -> PgValue {
        PgValue::Float(*self)
    }
}

impl ToPgValue for bool {
    fn to_pg_value(&self) -> PgValue {
        PgValue::Bool(*self)
    }
}

impl ToPgValue for String {
    fn to_pg_value(&self) -> PgValue {
        PgValue::Text(self.clone())
    }
}

impl ToPgValue for Vec<u8> {
    fn to_pg_value(&self) -> PgValue {
        PgValue::Bytes(self.clone())
    }
}

impl ToPgValue for NaiveDateTime {
    fn to_pg_value(&self) -> PgValue {
        PgValue::Timestamp(*self)
    }
}

impl ToPgValue for DateTime<Utc> {
    fn to_pg_value(&self) -> PgValue {
        PgValue::Timestamp(self.naive_utc())
    }
}

impl ToPgValue for JsonValue {
    fn to_pg_value(&self) -> PgValue {
        PgValue::Json(self.clone())
    }
}

impl ToPgValue for IpAddr {
    fn to_pg_value(&self) -> PgValue {
        PgValue::Inet(IpNetwork::from(*self))
    }
}

impl ToPgValue for IpNetwork {
    fn to_pg_value(&self) -> PgValue {
        PgValue::Inet(*self)
    }
}

impl<T: ToPgValue> ToPgValue for Option<T> {
    fn to_pg_value(&self) -> PgValue {
        match self {
            Some(v) => v.to_pg_value(),
            None => PgValue::Null,
        }
    }
}

macro_rules! seq_to_pg {
    ($($t:ty),* $(,)?) => {
        $(impl ToPgValue for Vec<$t> {
            fn to_pg_value(&self) -> PgValue {
                PgValue::Array(self.iter().map(|v| v.to_pg_value()).collect())
            }
        })*
    };
}

seq_to_pg!(
    String,
    i16,
    i32,
    i64,
    isize,
    u64,
    usize,
    f32,
    f64,
    IpAddr,
    IpNetwork,
    Option<IpAddr>,
    Option<IpNetwork>,
);

impl ToPgValue for HashMap<String, JsonValue> {
    fn to_pg_value(&self) -> PgValue {
        PgValue::Json(JsonValue::Object(
            self.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        ))
    }
}

impl ToPgValue for BTreeMap<String, JsonValue> {
    fn to_pg_value(&self) -> PgValue {
        PgValue::Json(JsonValue::Object(
            self.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        ))
    }
}

impl ToPgValue for HashMap<String, String> {
    fn to_pg_value(&self) -> PgValue {
        PgValue::Json(JsonValue::Object(
            self.iter()
                .map(|(k, v)| (k.clone(), JsonValue::String(v.clone())))
                .collect(),
        ))
    }
}

impl ToPgValue for BTreeMap<String, String> {
    fn to_pg_value(&self) -> PgValue {
        PgValue::Json(JsonValue::Object(
            self.iter()
                .map(|(k, v)| (k.clone(), JsonValue::String(v.clone())))
                .collect(),
        ))
    }
}

// ---------------------------------------------------------------------------
// FromPgValue

impl FromPgValue for i64 {
    fn from_pg_value(value: PgValue) -> Result<Self, ValueError> {
        match value {
            PgValue::Int(v) => Ok(v),
            other => decode_err("i64", &other),
        }
    }
}

macro_rules! narrow_int_from_pg {
    ($($t:ty),* $(,)?) => {
        $(impl FromPgValue for $t {
            fn from_pg_value(value: PgValue) -> Result<Self, ValueError> {
                match value {
                    PgValue::Int(v) => <$t>::try_from(v)
                        .map_err(|_| ValueError::OutOfRange { target: stringify!($t) }),
                    other => decode_err(stringify!($t), &other),
                }
            }
        })*
    };
}

narrow_int_from_pg!(i16, i32, isize, u32);

impl FromPgValue for u64 {
    fn from_pg_value(value: PgValue) -> Result<Self, ValueError> {
        match value {
            PgValue::Int(v) => {
                u64::try_from(v).map_err(|_| ValueError::OutOfRange { target: "u64" })
            }
            PgValue::Numeric(d) => d.to_u64().ok_or(ValueError::OutOfRange { target: "u64" }),
            other => decode_err("u64", &other),
        }
    }
}

impl FromPgValue for usize {
    fn from_pg_value(value: PgValue) -> Result<Self, ValueError> {
        let wide = u64::from_pg_value(value)?;
        usize::try_from(wide).map_err(|_| ValueError::OutOfRange { target: "usize" })
    }
}

impl FromPgValue for f32 {
    fn from_pg_value(value: PgValue) -> Result<Self, ValueError> {
        match value {
            PgValue::Float(v) => Ok(v as f32),
            other => decode_err("f32", &other),
        }
    }
}

impl FromPgValue for f64 {
    fn from_pg_value(value: PgValue) -> Result<Self, ValueError> {
        match value {
            PgValue::Float(v) => Ok(v),
            PgValue::Numeric(d) => d.to_f64().ok_or(ValueError::OutOfRange { target: "f64" }),
            other => decode_err("f64", &other),
        }
    }
}

impl FromPgValue for bool {
    fn from_pg_value(value: PgValue) -> Result<Self, ValueError> {
        match value {
            PgValue::Bool(v) => Ok(v),
            other => decode_err("bool", &other),
        }
    }
}

impl FromPgValue for String {
    fn from_pg_value(value: PgValue) -> Result<Self, ValueError> {
        match value {
            PgValue::Text(v) => Ok(v),
            other => decode_err("String", &other),
        }
    }
}

impl FromPgValue for Vec<u8> {
    fn from_pg_value(value: PgValue) -> Result<Self, ValueError> {
        match value {
            PgValue::Bytes(v) => Ok(v),
            other => decode_err("Vec<u8>", &other),
        }
    }
}

impl FromPgValue for NaiveDateTime {
    fn from_pg_value(value: PgValue) -> Result<Self, ValueError> {
        match value {
            PgValue::Timestamp(v) => Ok(v),
            other => decode_err("NaiveDateTime", &other),
        }
    }
}

impl FromPgValue for DateTime<Utc> {
    fn from_pg_value(value: PgValue) -> Result<Self, ValueError> {
        match value {
            PgValue::Timestamp(v) => Ok(v.and_utc()),
            other => decode_err("DateTime<Utc>", &other),
        }
    }
}

impl FromPgValue for JsonValue {
    fn from_pg_value(value: PgValue) -> Result<Self, ValueError> {
        match value {
            PgValue::Json(v) => Ok(v),
            other => decode_err("serde_json::Value", &other),
        }
    }
}

impl FromPgValue for HashMap<String, JsonValue> {
    fn from_pg_value(value: PgValue) -> Result<Self, ValueError> {
        match value {
            PgValue::Json(JsonValue::Object(map)) => Ok(map.into_iter().collect()),
            other => decode_err("JSON object", &other),
        }
    }
}

impl FromPgValue for BTreeMap<String, JsonValue> {
    fn from_pg_value(value: PgValue) -> Result<Self, ValueError> {
        match value {
            PgValue::Json(JsonValue::Object(map)) => Ok(map.into_iter().collect()),
            other => decode_err("JSON object", &other),
        }
    }
}

impl FromPgValue for HashMap<String, String> {
    fn from_pg_value(value: PgValue) -> Result<Self, ValueError> {
        match value {
            PgValue::Json(JsonValue::Object(map)) => map
                .into_iter()
                .map(|(k, v)| match v {
                    JsonValue::String(s) => Ok((k, s)),
                    other => decode_err("JSON string values", &PgValue::Json(other)),
                })
                .collect(),
            other => decode_err("JSON object", &other),
        }
    }
}

impl FromPgValue for BTreeMap<String, String> {
    fn from_pg_value(value: PgValue) -> Result<Self, ValueError> {
        let map: HashMap<String, String> = HashMap::from_pg_value(value)?;
        Ok(map.into_iter().collect())
    }
}

impl FromPgValue for IpAddr {
    fn from_pg_value(value: PgValue) -> Result<Self, ValueError> {
        match value {
            PgValue::Inet(net) => Ok(net.ip()),
            PgValue::Text(s) => {
                ip_from_token(s.trim()).ok_or(ValueError::Decode {
                    expected: "IpAddr",
                    found: "TEXT",
                })
            }
            other => decode_err("IpAddr", &other),
        }
    }
}

impl FromPgValue for IpNetwork {
    fn from_pg_value(value: PgValue) -> Result<Self, ValueError> {
        match value {
            PgValue::Inet(net) => Ok(net),
            PgValue::Text(s) => s.trim().parse().map_err(|_| ValueError::Decode {
                expected: "IpNetwork",
                found: "TEXT",
            }),
            other => decode_err("IpNetwork", &other),
        }
    }
}

impl<T: FromPgValue> FromPgValue for Option<T> {
    fn from_pg_value(value: PgValue) -> Result<Self, ValueError> {
        match value {
            PgValue::Null => Ok(None),
            other => T::from_pg_value(other).map(Some),
        }
    }
}

impl FromPgValue for Vec<String> {
    fn from_pg_value(value: PgValue) -> Result<Self, ValueError> {
        match value {
            PgValue::Array(values) => values.into_iter().map(String::from_pg_value).collect(),
            PgValue::Text(payload) => text_array_required(&payload),
            PgValue::Bytes(raw) => text_array_required(&utf8_payload(raw)?),
            other => decode_err("Vec<String>", &other),
        }
    }
}

macro_rules! int_seq_from_pg {
    ($($t:ty),* $(,)?) => {
        $(impl FromPgValue for Vec<$t> {
            fn from_pg_value(value: PgValue) -> Result<Self, ValueError> {
                match value {
                    PgValue::Array(values) => {
                        values.into_iter().map(<$t>::from_pg_value).collect()
                    }
                    PgValue::Text(payload) => int_tokens::<$t>(&payload),
                    PgValue::Bytes(raw) => match std::str::from_utf8(&raw) {
                        // A braces payload is the text representation; anything
                        // else is raw 8-bit wire units widened per element.
                        Ok(s) if s.trim_start().starts_with('{') => int_tokens::<$t>(s),
                        _ => Ok(raw.iter().map(|b| *b as $t).collect()),
                    },
                    other => decode_err(concat!("Vec<", stringify!($t), ">"), &other),
                }
            }
        })*
    };
}

int_seq_from_pg!(i16, i32, i64, isize);

macro_rules! numeric_seq_from_pg {
    ($($t:ty),* $(,)?) => {
        $(impl FromPgValue for Vec<$t> {
            fn from_pg_value(value: PgValue) -> Result<Self, ValueError> {
                match value {
                    PgValue::Array(values) => {
                        values.into_iter().map(<$t>::from_pg_value).collect()
                    }
                    PgValue::Text(payload) => parse_text_array(payload.as_str())?
                        .into_iter()
                        .map(|token| {
                            let token = token.ok_or_else(|| ValueError::InvalidArrayFormat {
                                payload: "NULL".to_string(),
                            })?;
                            token.trim().parse::<$t>().map_err(|_| {
                                ValueError::InvalidArrayFormat { payload: token }
                            })
                        })
                        .collect(),
                    other => decode_err(concat!("Vec<", stringify!($t), ">"), &other),
                }
            }
        })*
    };
}

numeric_seq_from_pg!(u64, usize, f32, f64);

impl FromPgValue for Vec<IpAddr> {
    fn from_pg_value(value: PgValue) -> Result<Self, ValueError> {
        let addrs: Vec<Option<IpAddr>> = nullable_array(value, "Vec<IpAddr>", |token| {
            ip_from_token(token).ok_or_else(|| ValueError::InvalidArrayFormat {
                payload: token.to_string(),
            })
        })?;
        addrs
            .into_iter()
            .map(|addr| {
                addr.ok_or_else(|| ValueError::InvalidArrayFormat {
                    payload: "NULL".to_string(),
                })
            })
            .collect()
    }
}

impl FromPgValue for Vec<Option<IpAddr>> {
    fn from_pg_value(value: PgValue) -> Result<Self, ValueError> {
        nullable_array(value, "Vec<Option<IpAddr>>", |token| {
            ip_from_token(token).ok_or_else(|| ValueError::InvalidArrayFormat {
                payload: token.to_string(),
            })
        })
    }
}

impl FromPgValue for Vec<IpNetwork> {
    fn from_pg_value(value: PgValue) -> Result<Self, ValueError> {
        let nets: Vec<Option<IpNetwork>> = nullable_array(value, "Vec<IpNetwork>", net_from_token)?;
        nets.into_iter()
            .map(|net| {
                net.ok_or_else(|| ValueError::InvalidArrayFormat {
                    payload: "NULL".to_string(),
                })
            })
            .collect()
    }
}

impl FromPgValue for Vec<Option<IpNetwork>> {
    fn from_pg_value(value: PgValue) -> Result<Self, ValueError> {
        nullable_array(value, "Vec<Option<IpNetwork>>", net_from_token)
    }
}

/// Decode an array-of-network-ish value where elements may be NULL.
fn nullable_array<T: FromPgValue>(
    value: PgValue,
    expected: &'static str,
    from_token: fn(&str) -> Result<T, ValueError>,
) -> Result<Vec<Option<T>>, ValueError> {
    match value {
        PgValue::Array(values) => values
            .into_iter()
            .map(|v| match v {
                PgValue::Null => Ok(None),
                PgValue::Text(s) => from_token(s.trim()).map(Some),
                other => Option::<T>::from_pg_value(other),
            })
            .collect(),
        PgValue::Text(payload) => token_array(&payload, from_token),
        PgValue::Bytes(raw) => token_array(&utf8_payload(raw)?, from_token),
        other => decode_err(expected, &other),
    }
}

fn token_array<T>(
    payload: &str,
    from_token: fn(&str) -> Result<T, ValueError>,
) -> Result<Vec<Option<T>>, ValueError> {
    parse_text_array(payload)?
        .into_iter()
        .map(|token| match token {
            None => Ok(None),
            Some(token) => from_token(token.trim()).map(Some),
        })
        .collect()
}

fn ip_from_token(token: &str) -> Option<IpAddr> {
    token
        .parse::<IpAddr>()
        .ok()
        .or_else(|| token.parse::<IpNetwork>().ok().map(|net| net.ip()))
}

fn net_from_token(token: &str) -> Result<IpNetwork, ValueError> {
    token.parse().map_err(|_| ValueError::InvalidArrayFormat {
        payload: token.to_string(),
    })
}

fn int_tokens<T: TryFrom<i64>>(payload: &str) -> Result<Vec<T>, ValueError> {
    parse_text_array(payload)?
        .into_iter()
        .map(|token| {
            let token = token.ok_or_else(|| ValueError::InvalidArrayFormat {
                payload: "NULL".to_string(),
            })?;
            let wide: i64 = token
                .trim()
                .parse()
                .map_err(|_| ValueError::InvalidArrayFormat { payload: token })?;
            T::try_from(wide).map_err(|_| ValueError::OutOfRange { target: "integer array" })
        })
        .collect()
}

fn text_array_required(payload: &str) -> Result<Vec<String>, ValueError> {
    parse_text_array(payload)?
        .into_iter()
        .map(|token| {
            token.ok_or_else(|| ValueError::InvalidArrayFormat {
                payload: "NULL".to_string(),
            })
        })
        .collect()
}

fn utf8_payload(raw: Vec<u8>) -> Result<String, ValueError> {
    String::from_utf8(raw).map_err(|_| ValueError::Decode {
        expected: "UTF-8 array payload",
        found: "BYTEA",
    })
}

/// Split a Postgres `{...}` array literal into elements.
///
/// `None` marks the unquoted literal `NULL`. Quoted elements may contain
/// commas, braces, and backslash escapes.
pub fn parse_text_array(payload: &str) -> Result<Vec<Option<String>>, ValueError> {
    let inner = payload.trim().trim_matches(|c| c == '{' || c == '}');
    if inner.is_empty() {
        return Ok(Vec::new());
    }

    let mut elements = Vec::new();
    let mut current = String::new();
    let mut quoted_element = false;
    let mut in_quotes = false;
    let mut chars = inner.chars();

    let finish = |current: &mut String, quoted: &mut bool, elements: &mut Vec<Option<String>>| {
        let raw = std::mem::take(current);
        if *quoted {
            elements.push(Some(raw));
        } else {
            let trimmed = raw.trim();
            if trimmed == "NULL" {
                elements.push(None);
            } else {
                elements.push(Some(trimmed.to_string()));
            }
        }
        *quoted = false;
    };

    while let Some(c) = chars.next() {
        match c {
            '"' if !in_quotes => {
                in_quotes = true;
                quoted_element = true;
            }
            '"' => in_quotes = false,
            '\\' if in_quotes => match chars.next() {
                Some(escaped) => current.push(escaped),
                None => {
                    return Err(ValueError::InvalidArrayFormat {
                        payload: payload.to_string(),
                    })
                }
            },
            ',' if !in_quotes => finish(&mut current, &mut quoted_element, &mut elements),
            _ => current.push(c),
        }
    }
    if in_quotes {
        return Err(ValueError::InvalidArrayFormat {
            payload: payload.to_string(),
        });
    }
    finish(&mut current, &mut quoted_element, &mut elements);
    Ok(elements)
}
