//! Proc-macro attributes for entry points, grounded in
//! `compio-macros`'s `#[compio::main]`/`#[compio::test]`.

mod item_fn;

mod main_fn;

mod test_fn;

use proc_macro::TokenStream;
use proc_macro2::{Ident, Span};
use proc_macro_crate::{crate_name, FoundCrate};
use quote::{quote, ToTokens};
use syn::parse_macro_input;

/// Wraps an `async fn main` body in a fresh [`rinoo_runtime::Runtime`]
/// and blocks on it.
#[proc_macro_attribute]
pub fn main(args: TokenStream, item: TokenStream) -> TokenStream {
    parse_macro_input!(item as main_fn::RinooMain)
        .with_args(parse_macro_input!(args as item_fn::RawAttr))
        .into_token_stream()
        .into()
}

/// Wraps an `async fn` test body in a fresh [`rinoo_runtime::Runtime`]
/// and blocks on it, emitting a plain `#[test]`.
#[proc_macro_attribute]
pub fn test(_args: TokenStream, item: TokenStream) -> TokenStream {
    parse_macro_input!(item as test_fn::RinooTest)
        .into_token_stream()
        .into()
}

fn retrieve_runtime_mod() -> proc_macro2::TokenStream {
    match crate_name("rinoo-runtime") {
        Ok(FoundCrate::Itself) => quote!(crate),
        Ok(FoundCrate::Name(name)) => {
            let ident = Ident::new(&name, Span::call_site());
            quote!(::#ident)
        }
        Err(_) => match crate_name("rinoo") {
            Ok(FoundCrate::Itself) => quote!(crate::runtime),
            Ok(FoundCrate::Name(name)) => {
                let ident = Ident::new(&name, Span::call_site());
                quote!(::#ident::runtime)
            }
            Err(_) => panic!("cannot find rinoo-runtime or rinoo in Cargo.toml dependencies"),
        },
    }
}
