use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;

pub fn impl_deser_macro(ast: &syn::DeriveInput) -> TokenStream {
    let name = ast.ident.clone();

    let data = match ast.data {
        syn::Data::Struct(ref data) => data,
        // An enum's wire layout depends on how the discriminant is encoded,
        // which the derive cannot guess.
        _ => unimplemented!("BtcDeserialize can only be derived for structs"),
    };

    let statements: Vec<TokenStream2> = data.fields.iter().map(deserialize_field).collect();

    let expanded = match data.fields {
        syn::Fields::Unnamed(_) => quote! {
            impl BitcoinDeserialize for #name {
                fn bitcoin_deserialize<R: std::io::Read>(mut target: R) -> Result<Self, SerializationError> {
                    Ok(#name (
                        #(#statements)*
                    ))
                }
            }
        },
        _ => quote! {
            impl BitcoinDeserialize for #name {
                fn bitcoin_deserialize<R: std::io::Read>(mut target: R) -> Result<Self, SerializationError> {
                    Ok(#name {
                        #(#statements)*
                    })
                }
            }
        },
    };

    TokenStream::from(expanded)
}

fn deserialize_field(field: &syn::Field) -> TokenStream2 {
    let ty = field.ty.clone();
    match field.ident.clone() {
        Some(name) => {
            quote! { #name: <#ty as BitcoinDeserialize>::bitcoin_deserialize(&mut target)?, }
        }
        None => {
            quote! { <#ty as BitcoinDeserialize>::bitcoin_deserialize(&mut target)?, }
        }
    }
}
