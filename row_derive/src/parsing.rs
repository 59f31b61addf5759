//! Field attribute parsing
//!
//! This module turns the attributes on a model struct's fields into a flat
//! mapping description the code generator works from, rejecting attribute
//! combinations that make no sense at compile time.

use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::{
    Data, DeriveInput, Error, Field, Fields, Ident, LitStr, Meta, Result, Token, Type,
};

/// How one struct field maps into the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldMapping {
    Column {
        primary_key: bool,
        unique: bool,
        not_null: bool,
        index: bool,
        index_group: Option<String>,
    },
    Embedded,
    Excluded,
}

pub struct ParsedField {
    pub ident: Ident,
    pub ty: Type,
    /// Normalized type string with all whitespace removed, e.g. `Vec<String>`.
    pub rust_type: String,
    pub mapping: FieldMapping,
}

pub fn parse_model_fields(input: &DeriveInput) -> Result<Vec<ParsedField>> {
    if let Some(param) = input.generics.params.first() {
        return Err(Error::new_spanned(
            param,
            "Model cannot be derived for generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(Error::new_spanned(
                    &input.ident,
                    "Model can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(Error::new_spanned(
                &input.ident,
                "Model can only be derived for structs with named fields",
            ))
        }
    };

    fields.iter().map(parse_field).collect()
}

fn parse_field(field: &Field) -> Result<ParsedField> {
    let ident = field
        .ident
        .clone()
        .ok_or_else(|| Error::new_spanned(field, "field must have a name"))?;

    let mut skip = false;
    let mut embed = false;
    let mut primary_key = false;
    let mut unique = false;
    let mut not_null = false;
    let mut index = false;
    let mut index_group = None;

    for attr in &field.attrs {
        if attr.path().is_ident("skip") {
            skip = true;
        } else if attr.path().is_ident("embed") {
            embed = true;
        } else if attr.path().is_ident("primary_key") {
            primary_key = true;
        } else if attr.path().is_ident("unique") {
            unique = true;
        } else if attr.path().is_ident("not_null") {
            not_null = true;
        } else if attr.path().is_ident("index") {
            match &attr.meta {
                Meta::Path(_) => {
                    if index || index_group.is_some() {
                        return Err(Error::new_spanned(attr, "duplicate index attribute"));
                    }
                    index = true;
                }
                Meta::List(list) => {
                    if index || index_group.is_some() {
                        return Err(Error::new_spanned(attr, "duplicate index attribute"));
                    }
                    let args: IndexArgs = list.parse_args()?;
                    index_group = Some(args.group);
                }
                Meta::NameValue(_) => {
                    return Err(Error::new_spanned(
                        attr,
                        "expected #[index] or #[index(group = \"name\")]",
                    ))
                }
            }
        }
        // Attributes from other macros are left alone.
    }

    let constrained = primary_key || unique || not_null || index || index_group.is_some();
    if skip && (embed || constrained) {
        return Err(Error::new_spanned(
            field,
            "skipped fields cannot carry other mapping attributes",
        ));
    }
    if embed && constrained {
        return Err(Error::new_spanned(
            field,
            "embedded fields cannot carry column attributes",
        ));
    }

    let mapping = if skip {
        FieldMapping::Excluded
    } else if embed {
        FieldMapping::Embedded
    } else {
        FieldMapping::Column {
            primary_key,
            unique,
            not_null,
            index,
            index_group,
        }
    };

    let ty = field.ty.clone();
    // Normalize by removing all whitespace for consistent matching.
    let rust_type = quote!(#ty).to_string().replace(" ", "");

    Ok(ParsedField {
        ident,
        ty,
        rust_type,
        mapping,
    })
}

struct IndexArgs {
    group: String,
}

impl Parse for IndexArgs {
    fn parse(input: ParseStream) -> Result<Self> {
        let key: Ident = input.parse()?;
        if key != "group" {
            return Err(Error::new(key.span(), "expected `group = \"name\"`"));
        }
        let _: Token![=] = input.parse()?;
        let value: LitStr = input.parse()?;
        let group = value.value();
        if group.is_empty() {
            return Err(Error::new(value.span(), "index group name cannot be empty"));
        }
        Ok(IndexArgs { group })
    }
}
