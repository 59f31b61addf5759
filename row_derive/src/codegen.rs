//! Model impl generation
//!
//! Generates the `Model` trait implementation from parsed field mappings.
//! The generated code reaches the engine through the `rowhaus` facade crate,
//! which re-exports `row_model` and `type_mapping` for exactly this purpose.

use proc_macro2::TokenStream;
use quote::quote;
use syn::Ident;

use crate::parsing::{FieldMapping, ParsedField};

pub fn generate_model_impl(name: &Ident, fields: &[ParsedField]) -> TokenStream {
    let struct_name = name.to_string();

    let field_defs = fields.iter().map(field_def_tokens);
    let blank_inits = fields.iter().map(blank_tokens);
    let value_arms = fields.iter().filter_map(value_arm);
    let value_chain = fields.iter().filter_map(value_chain_step);
    let apply_arms = fields.iter().filter_map(apply_arm);
    let apply_chain = fields.iter().filter_map(apply_chain_step);

    quote! {
        impl ::rowhaus::row_model::Model for #name {
            fn struct_name() -> &'static str {
                #struct_name
            }

            fn fields() -> &'static [::rowhaus::row_model::FieldDef] {
                const FIELDS: &[::rowhaus::row_model::FieldDef] = &[#(#field_defs),*];
                FIELDS
            }

            fn blank() -> Self {
                Self {
                    #(#blank_inits),*
                }
            }

            fn value_of(&self, field: &str) -> Option<::rowhaus::type_mapping::PgValue> {
                match field {
                    #(#value_arms)*
                    _ => {
                        #(#value_chain)*
                        None
                    }
                }
            }

            fn apply_column(
                &mut self,
                field: &str,
                value: ::rowhaus::type_mapping::PgValue,
            ) -> Result<
                Option<::rowhaus::type_mapping::PgValue>,
                ::rowhaus::type_mapping::ValueError,
            > {
                match field {
                    #(#apply_arms)*
                    _ => {
                        #(#apply_chain)*
                        Ok(Some(value))
                    }
                }
            }
        }
    }
}

fn field_def_tokens(field: &ParsedField) -> TokenStream {
    let name = field.ident.to_string();
    match &field.mapping {
        FieldMapping::Excluded => quote! {
            ::rowhaus::row_model::FieldDef::excluded(#name)
        },
        FieldMapping::Embedded => {
            let ty = &field.ty;
            quote! {
                ::rowhaus::row_model::FieldDef::embedded(
                    #name,
                    <#ty as ::rowhaus::row_model::Model>::fields,
                )
            }
        }
        FieldMapping::Column {
            primary_key,
            unique,
            not_null,
            index,
            index_group,
        } => {
            let rust_type = &field.rust_type;
            let mut def = quote! {
                ::rowhaus::row_model::FieldDef::column(#name, #rust_type)
            };
            if *primary_key {
                def = quote! { #def.primary_key() };
            }
            if *unique {
                def = quote! { #def.unique() };
            }
            if *not_null {
                def = quote! { #def.not_null() };
            }
            if *index {
                def = quote! { #def.indexed() };
            }
            if let Some(group) = index_group {
                def = quote! { #def.index_group(#group) };
            }
            def
        }
    }
}

fn blank_tokens(field: &ParsedField) -> TokenStream {
    let ident = &field.ident;
    let ty = &field.ty;
    match &field.mapping {
        FieldMapping::Embedded => quote! {
            #ident: <#ty as ::rowhaus::row_model::Model>::blank()
        },
        // Skipped fields only need to exist; Default covers them.
        FieldMapping::Excluded => quote! {
            #ident: Default::default()
        },
        FieldMapping::Column { .. } => quote! {
            #ident: <#ty as ::rowhaus::type_mapping::PgDefault>::pg_default()
        },
    }
}

fn value_arm(field: &ParsedField) -> Option<TokenStream> {
    matches!(field.mapping, FieldMapping::Column { .. }).then(|| {
        let ident = &field.ident;
        let name = field.ident.to_string();
        quote! {
            #name => Some(::rowhaus::type_mapping::ToPgValue::to_pg_value(&self.#ident)),
        }
    })
}

fn value_chain_step(field: &ParsedField) -> Option<TokenStream> {
    matches!(field.mapping, FieldMapping::Embedded).then(|| {
        let ident = &field.ident;
        quote! {
            if let Some(found) = ::rowhaus::row_model::Model::value_of(&self.#ident, field) {
                return Some(found);
            }
        }
    })
}

fn apply_arm(field: &ParsedField) -> Option<TokenStream> {
    matches!(field.mapping, FieldMapping::Column { .. }).then(|| {
        let ident = &field.ident;
        let name = field.ident.to_string();
        quote! {
            #name => {
                self.#ident = ::rowhaus::type_mapping::FromPgValue::from_pg_value(value)?;
                Ok(None)
            }
        }
    })
}

fn apply_chain_step(field: &ParsedField) -> Option<TokenStream> {
    matches!(field.mapping, FieldMapping::Embedded).then(|| {
        let ident = &field.ident;
        quote! {
            let value = match ::rowhaus::row_model::Model::apply_column(
                &mut self.#ident,
                field,
                value,
            )? {
                None => return Ok(None),
                Some(returned) => returned,
            };
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::parse_model_fields;
    use syn::{parse_quote, DeriveInput};

    fn generate(input: DeriveInput) -> String {
        let fields = parse_model_fields(&input).unwrap();
        generate_model_impl(&input.ident, &fields)
            .to_string()
            .replace(' ', "")
    }

    #[test]
    fn columns_become_descriptor_entries() {
        let code = generate(parse_quote! {
            struct Device {
                #[primary_key]
                id: i64,
                name: String,
            }
        });
        assert!(code.contains("fnstruct_name()->&'staticstr{\"Device\"}"));
        assert!(code.contains("FieldDef::column(\"id\",\"i64\").primary_key()"));
        assert!(code.contains("FieldDef::column(\"name\",\"String\")"));
    }

    #[test]
    fn embeds_reference_the_nested_field_table() {
        let code = generate(parse_quote! {
            struct Outer {
                #[embed]
                inner: Inner,
            }
        });
        assert!(code.contains("FieldDef::embedded(\"inner\","));
        assert!(code.contains("<Inneras::rowhaus::row_model::Model>::fields"));
        assert!(code.contains("inner:<Inneras::rowhaus::row_model::Model>::blank()"));
    }

    #[test]
    fn skipped_fields_use_plain_default() {
        let code = generate(parse_quote! {
            struct Device {
                id: i64,
                #[skip]
                scratch: u32,
            }
        });
        assert!(code.contains("FieldDef::excluded(\"scratch\")"));
        assert!(code.contains("scratch:Default::default()"));
    }

    #[test]
    fn setters_dispatch_by_field_name() {
        let code = generate(parse_quote! {
            struct Device {
                id: i64,
            }
        });
        assert!(code.contains("\"id\"=>{self.id="));
        assert!(code.contains("from_pg_value(value)?"));
    }
}
