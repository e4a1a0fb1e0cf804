extern crate proc_macro;

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, FnArg, ItemFn, Pat, PatType};

/// Wraps an async method into a MongoDB multi-document transaction.
///
/// The method body is moved into `{name}_inner` and the original name
/// becomes a wrapper that starts a transaction on the `session`
/// argument, commits on `Ok` and aborts on `Err`. The method must take
/// `&self` and a `session: &mut Session` argument.
#[proc_macro_attribute]
pub fn tx(_args: TokenStream, input: TokenStream) -> TokenStream {
    let input_fn = parse_macro_input!(input as ItemFn);
    let vis = &input_fn.vis;
    let block = &input_fn.block;
    let fn_name = &input_fn.sig.ident;
    let fn_args = &input_fn.sig.inputs;
    let fn_return = &input_fn.sig.output;

    let mut has_session = false;
    let mut arg_list = Vec::new();
    for arg in fn_args {
        match arg {
            FnArg::Typed(PatType { pat, .. }) => {
                if let Pat::Ident(ident) = pat.as_ref() {
                    if ident.ident == "session" {
                        has_session = true;
                    }
                }
                arg_list.push(quote! { #pat });
            }
            FnArg::Receiver(_) => {
                arg_list.push(quote!(self));
            }
        }
    }

    if !has_session {
        return TokenStream::from(quote! {
            compile_error!("#[tx] requires a `session` argument");
        });
    }

    let wrapped_fn_name = quote::format_ident!("{}_inner", fn_name);
    let gen = quote! {
        #vis async fn #wrapped_fn_name(#fn_args) #fn_return {
            #block
        }

        #vis async fn #fn_name(#fn_args) #fn_return {
            session.start_transaction().await?;
            match Self::#wrapped_fn_name(#(#arg_list),*).await {
                Ok(result) => {
                    session.commit_transaction().await?;
                    Ok(result)
                }
                Err(err) => {
                    session.abort_transaction().await?;
                    Err(err)
                }
            }
        }
    };

    TokenStream::from(gen)
}
