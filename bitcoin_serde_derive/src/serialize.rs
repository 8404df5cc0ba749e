use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;

pub fn impl_ser_macro(ast: &syn::DeriveInput) -> TokenStream {
    let name = ast.ident.clone();
    match ast.data {
        syn::Data::Struct(ref data) => {
            let statements: Vec<TokenStream2> = data
                .fields
                .iter()
                .enumerate()
                .map(|(index, field)| serialize_field(field, index))
                .collect();

            let expanded = quote! {
                impl BitcoinSerialize for #name {
                    fn bitcoin_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
                    where
                        W: std::io::Write,
                    {
                        #(#statements)*
                        Ok(())
                    }
                }
            };
            TokenStream::from(expanded)
        }
        syn::Data::Enum(ref data) => {
            let variants: Vec<TokenStream2> = data
                .variants
                .iter()
                .map(|variant| serialize_variant(variant, &name))
                .collect();

            let expanded = quote! {
                impl BitcoinSerialize for #name {
                    fn bitcoin_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
                    where
                        W: std::io::Write,
                    {
                        match *self {
                            #(#variants)*
                        }
                        Ok(())
                    }
                }
            };
            TokenStream::from(expanded)
        }
        syn::Data::Union(_) => unimplemented!("cannot derive BtcSerialize for unions"),
    }
}

fn serialize_field(field: &syn::Field, index: usize) -> TokenStream2 {
    match field.ident.clone() {
        Some(id) => quote! { self.#id.bitcoin_serialize(&mut target)?; },
        None => {
            let index = syn::Index::from(index);
            quote! { self.#index.bitcoin_serialize(&mut target)?; }
        }
    }
}

fn serialize_variant(variant: &syn::Variant, name: &syn::Ident) -> TokenStream2 {
    let ident = variant.ident.clone();

    let bindings: Vec<syn::Ident> = variant
        .fields
        .iter()
        .enumerate()
        .map(|(index, field)| match field.ident.clone() {
            Some(id) => id,
            None => quote::format_ident!("field_{}", index),
        })
        .collect();

    let statements: Vec<TokenStream2> = bindings
        .iter()
        .map(|binding| quote! { #binding.bitcoin_serialize(&mut target)?; })
        .collect();

    match variant.fields {
        syn::Fields::Named(_) => quote! {
            #name::#ident { #(ref #bindings,)* } => {
                #(#statements)*
            },
        },
        syn::Fields::Unnamed(_) => quote! {
            #name::#ident ( #(ref #bindings,)* ) => {
                #(#statements)*
            },
        },
        syn::Fields::Unit => quote! {
            #name::#ident => {},
        },
    }
}
