//! Output verification.
//!
//! Parses a generated render function as JavaScript and checks that every
//! identifier it reads is either bound inside the function (`m*`/`k*`
//! parameters) or part of the runtime contract (`_` for the map helper, `p`
//! for partials). Catches template expressions that are not valid JavaScript
//! and expressions that would escape to global scope at render time.

use lazy_static::lazy_static;
use oxc_allocator::Allocator;
use oxc_ast::ast::{BindingIdentifier, IdentifierReference};
use oxc_ast_visit::Visit;
use oxc_parser::Parser;
use oxc_span::SourceType;
use std::collections::HashSet;

use crate::error::{CompilerError, ERR_OUTPUT_SCOPE, ERR_OUTPUT_SYNTAX};
use crate::scope::PARTIALS_NAME;
use crate::translate::MAP_METHOD;

lazy_static! {
    pub static ref RUNTIME_GLOBALS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        s.insert(PARTIALS_NAME);
        // `_.map` -> `_`
        s.insert(MAP_METHOD.split('.').next().unwrap_or(MAP_METHOD));
        s
    };
}

pub fn verify_output(code: &str) -> Result<(), CompilerError> {
    let allocator = Allocator::default();
    let source_type = SourceType::default();
    let ret = Parser::new(&allocator, code, source_type).parse_expression();

    let expr = match ret {
        Ok(expr) => expr,
        Err(errors) => {
            let message = format!("Generated code is not a valid expression: {:?}", errors);
            return Err(CompilerError::with_details(
                ERR_OUTPUT_SYNTAX,
                &message,
                0,
                0,
                Some(code.to_string()),
                vec!["Template expressions must be plain property paths.".to_string()],
            ));
        }
    };

    let mut collector = ReferenceCollector::default();
    collector.visit_expression(&expr);

    let mut unknown: Vec<&str> = collector
        .references
        .iter()
        .map(String::as_str)
        .filter(|name| !RUNTIME_GLOBALS.contains(*name) && !collector.bindings.contains(*name))
        .collect();
    unknown.sort_unstable();
    unknown.dedup();

    match unknown.first() {
        Some(first) => Err(CompilerError::with_details(
            ERR_OUTPUT_SCOPE,
            &format!("Unknown identifier '{}' in generated code.", first),
            0,
            0,
            Some(code.to_string()),
            unknown.iter().map(|name| format!("unbound: {}", name)).collect(),
        )),
        None => Ok(()),
    }
}

#[derive(Default)]
struct ReferenceCollector {
    references: Vec<String>,
    bindings: HashSet<String>,
}

impl<'a> Visit<'a> for ReferenceCollector {
    fn visit_identifier_reference(&mut self, ident: &IdentifierReference<'a>) {
        self.references.push(ident.name.to_string());
    }

    fn visit_binding_identifier(&mut self, ident: &BindingIdentifier<'a>) {
        self.bindings.insert(ident.name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_render_function() {
        let code = "function(m0){return 'Hello '+_.map(m0.items, function(m1,k1) { return ''+k1+p.row(m1)+'';}).join('')+'';}";
        assert!(verify_output(code).is_ok());
    }

    #[test]
    fn test_rejects_syntax_errors() {
        let err = verify_output("function(m0){return ''+m0.#if ready+'';}").unwrap_err();
        assert_eq!(err.code, ERR_OUTPUT_SYNTAX);
    }

    #[test]
    fn test_rejects_free_identifiers() {
        let err = verify_output("function(m0){return ''+m0.format(locale)+'';}").unwrap_err();
        assert_eq!(err.code, ERR_OUTPUT_SCOPE);
        assert!(err.message.contains("locale"));
    }

    #[test]
    fn test_rejects_unbound_model() {
        // Key of an iteration that was never opened.
        let err = verify_output("function(m0){return ''+k0+'';}").unwrap_err();
        assert_eq!(err.code, ERR_OUTPUT_SCOPE);
    }
}
