use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput};

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
pub fn model_attribute(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);

    let name = &input.ident;
    let attrs = &input.attrs;
    let vis = &input.vis;
    let generics = &input.generics;

    // Extract fields from the struct
    let fields = match &input.data {
        Data::Struct(data) => &data.fields,
        _ => {
            return syn::Error::new_spanned(name, "model can only be used on structs")
                .to_compile_error()
                .into()
        }
    };

    // Add all the necessary derives to the struct
    let expanded = quote! {
        #[derive(Debug, Clone, PartialEq, ::rowhaus::Model)]
        #(#attrs)*
        #vis struct #name #generics #fields
    };

    TokenStream::from(expanded)
}
