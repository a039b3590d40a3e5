use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{DeriveInput, LitInt, LitStr};

pub fn derive_command(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

#[derive(Default)]
struct CommandAttrs {
    name: Option<LitStr>,
    queue: Option<LitStr>,
    delay_seconds: Option<u64>,
    deferred: bool,
}

impl CommandAttrs {
    fn is_async(&self) -> bool {
        self.deferred || self.queue.is_some() || self.delay_seconds.is_some()
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let attrs = parse_attrs(input)?;
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let name_fn = crate::query::name_fn(input, attrs.name.as_ref());

    let async_fn = if attrs.is_async() {
        let queue = match &attrs.queue {
            Some(queue) => {
                quote! { ::core::option::Option::Some(::std::string::String::from(#queue)) }
            }
            None => quote! { ::core::option::Option::None },
        };
        let delay = match attrs.delay_seconds {
            Some(seconds) => quote! { ::core::option::Option::Some(#seconds) },
            None => quote! { ::core::option::Option::None },
        };
        quote! {
            fn async_options() -> ::core::option::Option<routed_rust::AsyncCommand> {
                ::core::option::Option::Some(routed_rust::AsyncCommand {
                    queue: #queue,
                    delay_seconds: #delay,
                })
            }
        }
    } else {
        TokenStream2::new()
    };

    Ok(quote! {
        impl #impl_generics routed_rust::Command for #ident #ty_generics #where_clause {
            #name_fn
            #async_fn
        }
    })
}

fn parse_attrs(input: &DeriveInput) -> syn::Result<CommandAttrs> {
    let mut attrs = CommandAttrs::default();

    for attr in &input.attrs {
        if !attr.path().is_ident("command") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                attrs.name = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("queue") {
                attrs.queue = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("delay_seconds") {
                let seconds: LitInt = meta.value()?.parse()?;
                attrs.delay_seconds = Some(seconds.base10_parse()?);
            } else if meta.path.is_ident("deferred") {
                attrs.deferred = true;
            } else {
                return Err(meta.error(
                    "expected `name`, `queue`, `delay_seconds` or `deferred`",
                ));
            }
            Ok(())
        })?;
    }

    Ok(attrs)
}
