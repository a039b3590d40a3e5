use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{DeriveInput, LitStr};

pub fn derive_query(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let mut name = None;
    for attr in &input.attrs {
        if !attr.path().is_ident("query") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                name = Some(value);
                Ok(())
            } else {
                Err(meta.error("expected `name`"))
            }
        })?;
    }

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let name_fn = name_fn(input, name.as_ref());

    Ok(quote! {
        impl #impl_generics routed_rust::Query for #ident #ty_generics #where_clause {
            #name_fn
        }
    })
}

/// `fn name()` for a derived request type.
///
/// Generic types keep the trait default (`type_name`), so each instantiation
/// gets its own name.
pub(crate) fn name_fn(input: &DeriveInput, name: Option<&LitStr>) -> TokenStream2 {
    let ident = &input.ident;
    match name {
        Some(name) => quote! {
            fn name() -> &'static str {
                #name
            }
        },
        None if input.generics.params.is_empty() => quote! {
            fn name() -> &'static str {
                ::core::concat!(::core::module_path!(), "::", ::core::stringify!(#ident))
            }
        },
        None => TokenStream2::new(),
    }
}
