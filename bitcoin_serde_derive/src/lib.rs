//! Derive macros for the `BitcoinSerialize` and `BitcoinDeserialize` traits.
//!
//! The generated impls concatenate the field encodings in declaration order,
//! which is exactly the layout of most wire and database records. Types with
//! any other layout (length prefixes that aren't CompactInts, sentinel
//! values, tagged unions) implement the traits by hand instead.

extern crate proc_macro;
use proc_macro::TokenStream;

mod deserialize;
mod serialize;

#[proc_macro_derive(BtcDeserialize)]
pub fn deserializable(input: TokenStream) -> TokenStream {
    let ast = syn::parse(input).unwrap();
    deserialize::impl_deser_macro(&ast)
}

#[proc_macro_derive(BtcSerialize)]
pub fn serializable(input: TokenStream) -> TokenStream {
    let ast = syn::parse(input).unwrap();
    serialize::impl_ser_macro(&ast)
}
