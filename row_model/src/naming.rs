//! Identifier naming strategies
//!
//! Struct and field identifiers are converted to table and column names
//! through a [`NamingStrategy`]. The default converts to snake_case the way
//! PostgreSQL identifiers are conventionally written.

/// Converts Rust identifiers into SQL identifiers and back.
pub trait NamingStrategy: Send + Sync {
    /// Table name for a struct identifier.
    fn table_name(&self, struct_name: &str) -> String;

    /// Column name for a field identifier.
    fn column_name(&self, field_name: &str) -> String;

    /// Rust identifier for a column name, the inverse conversion.
    fn identifier(&self, column_name: &str) -> String {
        upper_camel(column_name)
    }
}

/// The default strategy: `PascalCase` and `camelCase` become `snake_case`,
/// identifiers that are already snake_case pass through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnakeCase;

impl NamingStrategy for SnakeCase {
    fn table_name(&self, struct_name: &str) -> String {
        snake_case(struct_name)
    }

    fn column_name(&self, field_name: &str) -> String {
        snake_case(field_name)
    }
}

/// Convert an identifier to snake_case.
///
/// An underscore is inserted before every uppercase letter except the first
/// character, then the whole string is lowercased. Uppercase runs split per
/// letter: `UserID` becomes `user_i_d`, so acronyms are best written in
/// camel form (`UserId`).
pub fn snake_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 4);
    for (i, c) in input.chars().enumerate() {
        if i > 0 && c.is_ascii_uppercase() {
            out.push('_');
        }
        out.extend(c.to_lowercase());
    }
    out
}

/// Convert a snake_case name back to an UpperCamelCase identifier.
///
/// The inverse of [`snake_case`] for single-case input; acronym casing is
/// not recoverable (`http_server` becomes `HttpServer`).
pub fn upper_camel(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for segment in input.split('_').filter(|s| !s.is_empty()) {
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}
