//! Property tests for the compiler invariants.

#[cfg(test)]
mod tests {
    use crate::compiler::{compile, escape_source, try_compile};
    use crate::directive::{scan, DirectiveKind, DirectiveMatch, Segment};
    use crate::emit::{EPILOGUE, PROLOGUE};
    use crate::options::CompileOptions;
    use crate::scope::ScopeTracker;
    use crate::translate::translate;
    use proptest::prelude::*;

    /// Builds a well-nested template from a list of operations:
    /// 0 = open each, 1 = open hide, 2 = close innermost, 3 = interpolation.
    fn balanced_template(ops: &[u8]) -> String {
        let mut out = String::new();
        let mut open: Vec<&str> = Vec::new();
        for (i, op) in ops.iter().enumerate() {
            match op {
                0 => {
                    out.push_str(&format!("{{{{#each list{}}}}}", i));
                    open.push("{{/each}}");
                }
                1 => {
                    out.push_str(&format!("{{{{#hide flag{}}}}}", i));
                    open.push("{{/hide}}");
                }
                2 => {
                    if let Some(close) = open.pop() {
                        out.push_str(close);
                    }
                }
                _ => out.push_str("<b>{{../value}}</b>"),
            }
        }
        while let Some(close) = open.pop() {
            out.push_str(close);
        }
        out
    }

    proptest! {
        #[test]
        fn prop_plain_text_is_escaped_and_wrapped(source in "[^{}]*") {
            let expected = format!("{}{}{}", PROLOGUE, escape_source(source.trim()).text, EPILOGUE);
            prop_assert_eq!(compile(&source, None), expected);
        }

        #[test]
        fn prop_balanced_blocks_restore_depth(ops in prop::collection::vec(0u8..4, 0..24)) {
            let template = balanced_template(&ops);
            let escaped = escape_source(&template);
            let mut tracker = ScopeTracker::new();
            for segment in scan(&escaped.text) {
                if let Segment::Directive(directive) = segment {
                    translate(&directive, &mut tracker);
                }
            }
            prop_assert_eq!(tracker.depth(), 0);
            prop_assert!(tracker.open_frames().is_empty());

            let strict = CompileOptions { strict_scopes: true, ..CompileOptions::default() };
            prop_assert!(try_compile(&template, Some(&strict)).is_ok());
        }

        #[test]
        fn prop_relative_resolution(depth in 0usize..12, markers in 0usize..12, field in "[a-z]{1,8}") {
            let mut tracker = ScopeTracker::new();
            for _ in 0..depth {
                tracker.enter();
            }
            let expression = format!("{}{}", "../".repeat(markers), field);
            let expected = format!("m{}.{}", depth.saturating_sub(markers), field);
            prop_assert_eq!(tracker.resolve_relative(&expression), expected);
        }

        #[test]
        fn prop_unknown_keyword_matches_interpolation(
            sigil in "[#@/]",
            word in "[a-z]{1,8}",
            arg in "[a-z]{0,6}",
        ) {
            prop_assume!(!matches!(
                format!("{}{}", sigil, word).as_str(),
                "#each" | "/each" | "#hide" | "/hide" | "@key"
            ));
            let inner = format!("{}{} {}", sigil, word, arg).trim().to_string();
            let tag = format!("{{{{{}}}}}", inner);

            let scanned = match scan(&tag).pop() {
                Some(Segment::Directive(directive)) => directive,
                other => panic!("expected a directive, got {:?}", other),
            };
            prop_assert_eq!(scanned.kind, DirectiveKind::Interpolation);

            let bare = DirectiveMatch {
                kind: DirectiveKind::Interpolation,
                expression: inner.clone(),
                span: 0..tag.len(),
            };
            let mut left = ScopeTracker::new();
            let mut right = ScopeTracker::new();
            prop_assert_eq!(
                translate(&scanned, &mut left).code,
                translate(&bare, &mut right).code
            );
        }
    }
}
