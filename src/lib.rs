//! # Templatize
//!
//! Compiles handlebars-like HTML templates into JavaScript render functions.
//!
//! ```text
//! Hello {{name}}!   =>   function(m0){return 'Hello '+m0.name+'!';}
//! ```
//!
//! ## Directives
//!
//! | Tag | Output |
//! |---|---|
//! | `{{path}}` | value of `path` on the current model, unescaped |
//! | `{{#each path}}...{{/each}}` | `_.map` over `path`, one nesting level deeper |
//! | `{{#hide path}}...{{/hide}}` | body only when `path` is falsy |
//! | `{{@selectedIf path}}` / `{{@checkedIf path}}` | `selected` / `checked` when `path == value` |
//! | `{{> name}}` | `p.name(model)` |
//! | `{{@key}}` | key or index of the innermost `#each` |
//!
//! `../` walks one `#each` level up; `this` is the model itself.
//!
//! ## Runtime Contract
//!
//! 1. The model at nesting depth `d` is bound to `m{d}`, its iteration key to
//!    `k{d}`. The root model is `m0`.
//! 2. The caller supplies `_` (with a lodash-compatible `map`) and `p` (the
//!    partials namespace) in the scope where the function is evaluated.
//! 3. Values are spliced in as-is; templates are trusted.

#[cfg(feature = "napi")]
use napi_derive::napi;

mod cache;
mod compiler;
mod directive;
mod emit;
mod error;
mod minify;
mod options;
mod scope;
mod translate;
mod verify;

#[cfg(test)]
mod property_tests;

pub use cache::CompileCache;
pub use compiler::{compile, try_compile, Compiler};
pub use error::*;
pub use minify::{HtmlMinifier, Minifier};
pub use options::{CompileOptions, MinifyOptions};
pub use verify::verify_output;

/// Node binding: compiles `source`, deep-merging `options` onto the defaults.
/// Invalid options are reported as a JS error; everything else degrades to
/// the error-marker function like [`compile`].
#[cfg(feature = "napi")]
#[napi]
pub fn templatize_native(
    source: String,
    options: Option<serde_json::Value>,
) -> napi::Result<String> {
    let options = match options {
        Some(value) => CompileOptions::from_json(&value)
            .map_err(|e| napi::Error::from_reason(e.to_string()))?,
        None => CompileOptions::default(),
    };
    Ok(Compiler::new(options).compile(&source))
}
