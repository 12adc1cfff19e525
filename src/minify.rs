//! HTML minification pre-pass.
//!
//! The compiler only depends on the [`Minifier`] trait; [`HtmlMinifier`] is the
//! default implementation, built on html5ever. Directive tags are swapped for
//! lowercase placeholders before parsing so the HTML parser neither lowercases
//! nor splits them (`<option {{@selectedIf id}}>` would otherwise turn into two
//! mangled attributes), then restored after serialization.
//!
//! Parsing normalizes the markup: missing end tags are added and stray ones
//! dropped. Content the HTML parser relocates (text directly inside `<table>`,
//! for example) would move directives out of the blocks they belong to, so the
//! restored output must carry every directive exactly once and in source order.
//! Anything else is a [`MinifyError`].

use html5ever::tendril::TendrilSink;
use html5ever::{parse_document, parse_fragment, Attribute, LocalName, Namespace, ParseOpts, QualName};
use lazy_static::lazy_static;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use regex::{Captures, Regex};
use std::collections::HashSet;

use crate::error::MinifyError;
use crate::options::MinifyOptions;

/// Minifier collaborator. Closures with the same shape are minifiers too.
pub trait Minifier {
    fn minify(&self, source: &str, options: &MinifyOptions) -> Result<String, MinifyError>;
}

impl<F> Minifier for F
where
    F: Fn(&str, &MinifyOptions) -> Result<String, MinifyError>,
{
    fn minify(&self, source: &str, options: &MinifyOptions) -> Result<String, MinifyError> {
        self(source, options)
    }
}

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

lazy_static! {
    static ref TAG_RE: Regex = Regex::new(r"(?s)\{\{.*?\}\}").unwrap();
    static ref WHITESPACE_RE: Regex = Regex::new(r"[ \t\n\r\x0C]+").unwrap();
    static ref UNQUOTED_VALUE_RE: Regex = Regex::new(r#"^[^ \t\n\r\x0C"'`=<>]+$"#).unwrap();

    static ref VOID_TAGS: HashSet<&'static str> = [
        "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
        "source", "track", "wbr",
    ]
    .into_iter()
    .collect();

    static ref RAW_TEXT_TAGS: HashSet<&'static str> = ["script", "style"].into_iter().collect();

    static ref PREFORMATTED_TAGS: HashSet<&'static str> = ["pre", "textarea"].into_iter().collect();

    static ref INLINE_TAGS: HashSet<&'static str> = [
        "a", "abbr", "b", "bdi", "bdo", "br", "button", "cite", "code", "data", "dfn", "em", "i",
        "img", "input", "kbd", "label", "mark", "q", "s", "samp", "select", "small", "span",
        "strong", "sub", "sup", "textarea", "time", "u", "var", "wbr",
    ]
    .into_iter()
    .collect();

    static ref BOOLEAN_ATTRIBUTES: HashSet<&'static str> = [
        "allowfullscreen", "async", "autofocus", "autoplay", "checked", "compact", "controls",
        "declare", "default", "defaultchecked", "defaultmuted", "defaultselected", "defer",
        "disabled", "enabled", "formnovalidate", "hidden", "indeterminate", "inert", "ismap",
        "itemscope", "loop", "multiple", "muted", "nohref", "noresize", "noshade", "novalidate",
        "nowrap", "open", "pauseonexit", "readonly", "required", "reversed", "scoped",
        "seamless", "selected", "sortable", "truespeed", "typemustmatch", "visible",
    ]
    .into_iter()
    .collect();

    static ref EMPTY_REMOVABLE_ATTRIBUTES: HashSet<&'static str> =
        ["class", "id", "style", "title", "lang", "dir"].into_iter().collect();

    static ref OPTIONAL_END_TAGS: HashSet<&'static str> = [
        "li", "dt", "dd", "option", "optgroup", "tr", "td", "th", "thead", "tbody", "tfoot",
        "colgroup", "rt", "rp",
    ]
    .into_iter()
    .collect();
}

/// Default attribute values that can be dropped without changing meaning.
fn is_redundant_attribute(tag: &str, name: &str, value: &str) -> bool {
    let value = value.trim().to_ascii_lowercase();
    matches!(
        (tag, name, value.as_str()),
        ("script", "type", "text/javascript")
            | ("script", "language", "javascript")
            | ("style", "type", "text/css")
            | ("link", "type", "text/css")
            | ("form", "method", "get")
            | ("input", "type", "text")
            | ("area", "shape", "rect")
    )
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlMinifier;

impl HtmlMinifier {
    pub fn new() -> Self {
        Self
    }
}

impl Minifier for HtmlMinifier {
    fn minify(&self, source: &str, options: &MinifyOptions) -> Result<String, MinifyError> {
        let (protected, placeholders) = Placeholders::protect(source)?;
        let is_document = protected.to_lowercase().contains("<html");

        let dom = if is_document {
            parse_document(RcDom::default(), ParseOpts::default())
                .from_utf8()
                .read_from(&mut protected.as_bytes())
        } else {
            let context = QualName::new(
                None,
                Namespace::from(HTML_NAMESPACE),
                LocalName::from("body"),
            );
            parse_fragment(RcDom::default(), ParseOpts::default(), context, vec![])
                .from_utf8()
                .read_from(&mut protected.as_bytes())
        }
        .map_err(|e| MinifyError(format!("Failed to parse HTML: {}", e)))?;

        let mut serializer = Serializer {
            options,
            placeholders: &placeholders,
            out: String::with_capacity(protected.len()),
        };

        let roots: Vec<Handle> = if is_document {
            dom.document.children.borrow().clone()
        } else {
            // Fragment parsing nests the content under a synthetic <html> root.
            let document_children = dom.document.children.borrow();
            let fragment = match document_children.first() {
                Some(root) => root.children.borrow().clone(),
                None => vec![],
            };
            fragment
        };
        serializer.write_children(None, &roots, false);

        placeholders.restore(&serializer.out)
    }
}

/// Directive tags swapped out of the markup while it goes through the parser.
///
/// Placeholders look like `__tpl{salt}_{index}__`, lowercase so attribute-name
/// lowercasing leaves them alone. The salt is picked so the source never
/// already contains the prefix.
struct Placeholders {
    pattern: Regex,
    tags: Vec<String>,
}

impl Placeholders {
    fn protect(source: &str) -> Result<(String, Self), MinifyError> {
        let lowered = source.to_ascii_lowercase();
        let mut salt = 0u32;
        while lowered.contains(&format!("__tpl{}_", salt)) {
            salt += 1;
        }
        let prefix = format!("__tpl{}_", salt);
        let pattern = Regex::new(&format!(r"{}(\d+)__", prefix))
            .map_err(|e| MinifyError(format!("Invalid placeholder pattern: {}", e)))?;

        let mut tags = Vec::new();
        let protected = TAG_RE
            .replace_all(source, |caps: &Captures| {
                tags.push(caps[0].to_string());
                format!("{}{}__", prefix, tags.len() - 1)
            })
            .into_owned();

        Ok((protected, Self { pattern, tags }))
    }

    fn is_placeholder(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }

    /// Puts the directive tags back. Every placeholder must come back exactly
    /// once, in the order it was handed out.
    fn restore(&self, text: &str) -> Result<String, MinifyError> {
        let mut expected = 0usize;
        let mut out = String::with_capacity(text.len());
        let mut last_end = 0;

        for caps in self.pattern.captures_iter(text) {
            let (Some(whole), Some(index)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let found = index.as_str().parse::<usize>().ok();
            let tag = match found.filter(|idx| *idx == expected).and_then(|idx| self.tags.get(idx)) {
                Some(tag) => tag,
                None => {
                    let moved = found
                        .and_then(|idx| self.tags.get(idx))
                        .map_or(whole.as_str(), String::as_str);
                    return Err(MinifyError(format!(
                        "HTML parsing moved '{}' out of source order",
                        moved
                    )));
                }
            };
            out.push_str(&text[last_end..whole.start()]);
            out.push_str(tag);
            last_end = whole.end();
            expected += 1;
        }

        if let Some(dropped) = self.tags.get(expected) {
            return Err(MinifyError(format!("HTML parsing dropped '{}'", dropped)));
        }
        out.push_str(&text[last_end..]);
        Ok(out)
    }
}

struct Serializer<'a> {
    options: &'a MinifyOptions,
    placeholders: &'a Placeholders,
    out: String,
}

impl Serializer<'_> {
    fn write_children(&mut self, parent: Option<&str>, children: &[Handle], preserve: bool) {
        let parent_is_block = parent.map_or(true, |tag| !INLINE_TAGS.contains(tag));

        for (idx, child) in children.iter().enumerate() {
            match &child.data {
                NodeData::Document => self.write_children(None, &child.children.borrow(), preserve),
                NodeData::Doctype {
                    name,
                    public_id,
                    system_id,
                } => {
                    if self.options.use_short_doctype {
                        self.out.push_str("<!doctype html>");
                    } else {
                        self.write_doctype(&name.to_string(), &public_id.to_string(), &system_id.to_string());
                    }
                }
                NodeData::Text { contents } => {
                    let text = contents.borrow().to_string();
                    if let Some(tag) = parent.filter(|tag| RAW_TEXT_TAGS.contains(*tag)) {
                        self.write_raw_text(tag, &text);
                    } else if preserve || !self.options.collapse_whitespace {
                        self.out.push_str(&escape_text(&text));
                    } else {
                        let prev = idx.checked_sub(1).and_then(|i| children.get(i));
                        let next = children.get(idx + 1);
                        self.write_collapsed_text(&text, prev, next, parent_is_block);
                    }
                }
                NodeData::Comment { contents } => {
                    if !self.options.remove_comments {
                        self.out.push_str("<!--");
                        self.out.push_str(&contents.to_string());
                        self.out.push_str("-->");
                    }
                }
                NodeData::Element {
                    name,
                    attrs,
                    template_contents,
                    ..
                } => {
                    let tag = name.local.to_string();
                    self.out.push('<');
                    self.out.push_str(&tag);
                    for attr in attrs.borrow().iter() {
                        self.write_attribute(&tag, attr);
                    }
                    self.out.push('>');

                    if VOID_TAGS.contains(tag.as_str()) {
                        continue;
                    }

                    let preserve_children = preserve || PREFORMATTED_TAGS.contains(tag.as_str());
                    let content = template_contents.borrow().clone();
                    match content {
                        Some(fragment) => self.write_children(
                            Some(&tag),
                            &fragment.children.borrow(),
                            preserve_children,
                        ),
                        None => {
                            self.write_children(Some(&tag), &child.children.borrow(), preserve_children)
                        }
                    }

                    if !(self.options.remove_optional_tags && OPTIONAL_END_TAGS.contains(tag.as_str())) {
                        self.out.push_str("</");
                        self.out.push_str(&tag);
                        self.out.push('>');
                    }
                }
                NodeData::ProcessingInstruction { .. } => {}
            }
        }
    }

    fn write_doctype(&mut self, name: &str, public_id: &str, system_id: &str) {
        self.out.push_str("<!DOCTYPE ");
        self.out.push_str(name);
        if !public_id.is_empty() {
            self.out.push_str(&format!(" PUBLIC \"{}\"", public_id));
        }
        if !system_id.is_empty() {
            if public_id.is_empty() {
                self.out.push_str(" SYSTEM");
            }
            self.out.push_str(&format!(" \"{}\"", system_id));
        }
        self.out.push('>');
    }

    fn write_raw_text(&mut self, tag: &str, text: &str) {
        let text = if self.options.remove_comments_from_cdata {
            strip_comment_wrapper(text)
        } else {
            text
        };
        if self.options.collapse_whitespace && tag == "style" {
            self.out.push_str(text.trim());
        } else {
            self.out.push_str(text);
        }
    }

    fn write_collapsed_text(
        &mut self,
        text: &str,
        prev: Option<&Handle>,
        next: Option<&Handle>,
        parent_is_block: bool,
    ) {
        let collapsed = WHITESPACE_RE.replace_all(text, " ");
        if collapsed.trim().is_empty() {
            if prev.is_some_and(is_inline) && next.is_some_and(is_inline) {
                self.out.push(' ');
            }
            return;
        }

        let mut collapsed = collapsed.as_ref();
        let at_block_start = match prev {
            Some(prev) => !is_inline(prev),
            None => parent_is_block,
        };
        let at_block_end = match next {
            Some(next) => !is_inline(next),
            None => parent_is_block,
        };
        if at_block_start {
            collapsed = collapsed.trim_start();
        }
        if at_block_end {
            collapsed = collapsed.trim_end();
        }
        self.out.push_str(&escape_text(collapsed));
    }

    fn write_attribute(&mut self, tag: &str, attr: &Attribute) {
        let name = attr.name.local.to_string();
        let value = attr.value.to_string();

        if value.is_empty() && self.placeholders.is_placeholder(&name) {
            self.out.push(' ');
            self.out.push_str(&name);
            return;
        }
        if self.options.remove_empty_attributes
            && value.trim().is_empty()
            && (EMPTY_REMOVABLE_ATTRIBUTES.contains(name.as_str()) || name.starts_with("on"))
        {
            return;
        }
        if self.options.remove_redundant_attributes && is_redundant_attribute(tag, &name, &value) {
            return;
        }

        self.out.push(' ');
        self.out.push_str(&name);

        if self.options.collapse_boolean_attributes && BOOLEAN_ATTRIBUTES.contains(name.as_str()) {
            return;
        }
        if self.options.remove_attribute_quotes
            && UNQUOTED_VALUE_RE.is_match(&value)
            && !self.placeholders.is_placeholder(&value)
        {
            self.out.push('=');
            self.out.push_str(&value.replace('&', "&amp;"));
            return;
        }
        self.out.push_str("=\"");
        self.out.push_str(&escape_attribute(&value));
        self.out.push('"');
    }
}

fn is_inline(handle: &Handle) -> bool {
    match &handle.data {
        NodeData::Text { .. } => true,
        NodeData::Element { name, .. } => INLINE_TAGS.contains(name.local.to_string().as_str()),
        _ => false,
    }
}

fn strip_comment_wrapper(text: &str) -> &str {
    let trimmed = text.trim();
    match trimmed
        .strip_prefix("<!--")
        .and_then(|rest| rest.strip_suffix("-->"))
    {
        Some(inner) => inner.trim(),
        None => text,
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('\u{a0}', "&nbsp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('\u{a0}', "&nbsp;")
        .replace('"', "&quot;")
}
