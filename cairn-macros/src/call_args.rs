use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{parse2, parse_quote, Data, DeriveInput, Field, Fields, Index};

/// `#[call_args(skip)]`
fn is_skipped(field: &Field) -> syn::Result<bool> {
    let mut skip = false;
    for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("call_args")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                skip = true;
                Ok(())
            } else {
                Err(meta.error("unsupported call_args option, expected `skip`"))
            }
        })?;
    }
    Ok(skip)
}

pub fn derive_call_args(input: TokenStream) -> TokenStream {
    let input = match parse2::<DeriveInput>(input) {
        Ok(input) => input,
        Err(err) => return err.to_compile_error(),
    };

    match expand(input) {
        Ok(tokens) => tokens,
        Err(err) => err.to_compile_error(),
    }
}

fn expand(mut input: DeriveInput) -> syn::Result<TokenStream> {
    let name = &input.ident;

    let fields = match &input.data {
        Data::Struct(data_struct) => &data_struct.fields,
        _ => {
            return Err(syn::Error::new_spanned(name, "CallArgs can only be derived for structs"));
        }
    };

    let mut pushes = Vec::new();
    let mut bounded_types = Vec::new();

    match fields {
        Fields::Named(fields_named) => {
            for field in &fields_named.named {
                if is_skipped(field)? {
                    continue;
                }
                let Some(ident) = field.ident.as_ref() else { continue };
                let kwarg = ident.unraw().to_string();
                pushes.push(quote! {
                    key.push_kwarg(#kwarg, ::cairn_core::memo::IntoArg::to_arg(&self.#ident));
                });
                bounded_types.push(field.ty.clone());
            }
        }
        Fields::Unnamed(fields_unnamed) => {
            for (i, field) in fields_unnamed.unnamed.iter().enumerate() {
                if is_skipped(field)? {
                    continue;
                }
                let index = Index::from(i);
                pushes.push(quote! {
                    key.push_arg(::cairn_core::memo::IntoArg::to_arg(&self.#index));
                });
                bounded_types.push(field.ty.clone());
            }
        }
        Fields::Unit => {}
    }

    // Generic fields must be convertible too
    if !input.generics.params.is_empty() {
        let where_clause = input.generics.make_where_clause();
        for ty in &bounded_types {
            where_clause.predicates.push(parse_quote!(#ty: ::cairn_core::memo::IntoArg));
        }
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let name = &input.ident;

    Ok(quote! {
        impl #impl_generics ::cairn_core::memo::CallArgs for #name #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn append_to(&self, key: &mut ::cairn_core::memo::CallKey) {
                #(#pushes)*
            }
        }
    })
}
