//! Directive scanning.
//!
//! A single left-to-right regex pass splits the (already escaped) template into
//! literal spans and directive tags.

use lazy_static::lazy_static;
use regex::Regex;
use std::ops::Range;

lazy_static! {
    /// `{{ keyword expression }}`, where the keyword is optional. Anything
    /// that is not one of the fixed keywords is captured as a bare expression.
    static ref DIRECTIVE_RE: Regex = Regex::new(
        r"\{\{\s*(#each\b|/each\b|#hide\b|/hide\b|@selectedIf\b|@checkedIf\b|@key\b|>)?\s*(.*?)\s*\}\}"
    )
    .unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DirectiveKind {
    Each,
    EachEnd,
    Hide,
    HideEnd,
    SelectedIf,
    CheckedIf,
    Partial,
    Key,
    Interpolation,
}

impl DirectiveKind {
    fn from_keyword(keyword: Option<&str>) -> Self {
        match keyword {
            Some("#each") => DirectiveKind::Each,
            Some("/each") => DirectiveKind::EachEnd,
            Some("#hide") => DirectiveKind::Hide,
            Some("/hide") => DirectiveKind::HideEnd,
            Some("@selectedIf") => DirectiveKind::SelectedIf,
            Some("@checkedIf") => DirectiveKind::CheckedIf,
            Some("@key") => DirectiveKind::Key,
            Some(">") => DirectiveKind::Partial,
            _ => DirectiveKind::Interpolation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DirectiveMatch {
    pub(crate) kind: DirectiveKind,
    /// Trimmed text following the keyword.
    pub(crate) expression: String,
    /// Byte range of the whole tag in the scanned text.
    pub(crate) span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment<'a> {
    Literal(&'a str),
    Directive(DirectiveMatch),
}

/// Splits `text` into literal spans and directives, in source order.
/// Empty literal spans are not emitted.
pub(crate) fn scan(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut last_end = 0;

    for caps in DIRECTIVE_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };

        if whole.start() > last_end {
            segments.push(Segment::Literal(&text[last_end..whole.start()]));
        }

        let keyword = caps.get(1).map(|m| m.as_str());
        let expression = caps.get(2).map(|m| m.as_str().trim()).unwrap_or("");
        segments.push(Segment::Directive(DirectiveMatch {
            kind: DirectiveKind::from_keyword(keyword),
            expression: expression.to_string(),
            span: whole.range(),
        }));

        last_end = whole.end();
    }

    if last_end < text.len() {
        segments.push(Segment::Literal(&text[last_end..]));
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directives(text: &str) -> Vec<(DirectiveKind, String)> {
        scan(text)
            .into_iter()
            .filter_map(|s| match s {
                Segment::Directive(d) => Some((d.kind, d.expression)),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_scan_literals_and_directives() {
        let segments = scan("Hello {{name}}!");
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], Segment::Literal("Hello "));
        assert_eq!(
            segments[1],
            Segment::Directive(DirectiveMatch {
                kind: DirectiveKind::Interpolation,
                expression: "name".to_string(),
                span: 6..14,
            })
        );
        assert_eq!(segments[2], Segment::Literal("!"));
    }

    #[test]
    fn test_scan_keywords() {
        let found = directives(
            "{{#each items}}{{/each}}{{#hide flag}}{{/hide}}{{@selectedIf id}}{{@checkedIf on}}{{> header}}{{@key}}",
        );
        assert_eq!(
            found,
            vec![
                (DirectiveKind::Each, "items".to_string()),
                (DirectiveKind::EachEnd, String::new()),
                (DirectiveKind::Hide, "flag".to_string()),
                (DirectiveKind::HideEnd, String::new()),
                (DirectiveKind::SelectedIf, "id".to_string()),
                (DirectiveKind::CheckedIf, "on".to_string()),
                (DirectiveKind::Partial, "header".to_string()),
                (DirectiveKind::Key, String::new()),
            ]
        );
    }

    #[test]
    fn test_scan_trims_inner_whitespace() {
        assert_eq!(
            directives("{{   #each   ../rows   }}"),
            vec![(DirectiveKind::Each, "../rows".to_string())]
        );
        assert_eq!(
            directives("{{>footer}}"),
            vec![(DirectiveKind::Partial, "footer".to_string())]
        );
    }

    #[test]
    fn test_unknown_keyword_is_interpolation() {
        assert_eq!(
            directives("{{#if ready}}{{@keys}}{{#eachitems}}"),
            vec![
                (DirectiveKind::Interpolation, "#if ready".to_string()),
                (DirectiveKind::Interpolation, "@keys".to_string()),
                (DirectiveKind::Interpolation, "#eachitems".to_string()),
            ]
        );
    }

    #[test]
    fn test_scan_without_directives() {
        assert_eq!(scan("<p>plain</p>"), vec![Segment::Literal("<p>plain</p>")]);
        assert!(scan("").is_empty());
    }

    #[test]
    fn test_unterminated_tag_is_literal() {
        assert_eq!(scan("{{name"), vec![Segment::Literal("{{name")]);
    }
}
