//! Procedural macros for database row models
//!
//! This crate provides the `Model` derive and the `#[model]` attribute macro.
//! The derive reads the field attributes of a struct and emits a static field
//! descriptor table plus the typed accessors the mapping engine dispatches
//! through; it generates no SQL itself.

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod codegen;
mod model_macro;
mod parsing;

use model_macro::model_attribute;
use parsing::parse_model_fields;

/// Derive macro for the `Model` trait.
///
/// Field attributes:
/// - `#[primary_key]`, `#[unique]`, `#[not_null]` add the column constraint
/// - `#[index]` creates a single-column index, `#[index(group = "name")]`
///   adds the column to a composite index
/// - `#[embed]` splices a nested model's columns into this table
/// - `#[skip]` keeps the field out of the table entirely
///
/// It's usually written through the `#[model]` attribute macro, which adds
/// the standard derives as well:
/// ```ignore
/// use rowhaus::model;
///
/// #[model]
/// pub struct Device {
///     #[primary_key]
///     pub id: i64,
///     #[index]
///     pub hostname: String,
///     #[skip]
///     pub scratch: Vec<u8>,
/// }
/// ```
#[proc_macro_derive(Model, attributes(primary_key, unique, not_null, index, skip, embed))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let fields = match parse_model_fields(&input) {
        Ok(fields) => fields,
        Err(e) => return e.to_compile_error().into(),
    };

    codegen::generate_model_impl(&input.ident, &fields).into()
}

/// Convenience attribute macro that adds the standard derives for a row model
///
/// Usage:
/// ```ignore
/// use rowhaus::model;
///
/// #[model]
/// pub struct Device {
///     #[primary_key]
///     pub id: i64,
///     pub hostname: String,
/// }
/// ```
#[proc_macro_attribute]
pub fn model(attr: TokenStream, item: TokenStream) -> TokenStream {
    model_attribute(attr, item)
}
