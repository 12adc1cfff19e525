//! Compiler entry point.
//!
//! Pipeline for one template:
//! 1. trim
//! 2. minify (when enabled by the options)
//! 3. escape quotes and line breaks for a single-quoted JS string
//! 4. scan directives and translate them in order, threading one
//!    call-scoped [`ScopeTracker`]
//! 5. wrap the body in `function(m0){return '...';}`

use rayon::prelude::*;
use std::borrow::Cow;

use crate::directive::{scan, DirectiveMatch, Segment};
use crate::emit::{error_function, FragmentBuilder};
use crate::error::{CompilerError, ERR_SCOPE_UNBALANCED, ERR_SCOPE_UNCLOSED};
use crate::minify::{HtmlMinifier, Minifier};
use crate::options::CompileOptions;
use crate::scope::{CloseOutcome, ScopePolicy, ScopeTracker};
use crate::translate::translate;
use crate::verify::verify_output;

/// Template text escaped for a single-quoted JavaScript string literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EscapedSource {
    pub(crate) text: String,
    /// Byte offsets in `text` where each source line starts.
    line_starts: Vec<usize>,
}

impl EscapedSource {
    /// 1-based line and column of a byte offset, counted in characters of
    /// the unescaped source.
    pub(crate) fn locate(&self, offset: usize) -> (u32, u32) {
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        };
        let start = self.line_starts.get(line_idx).copied().unwrap_or(0);
        let end = offset.min(self.text.len());
        let column = self.text.get(start..end).map_or(0, |line| {
            // Every quote on the line was written with one extra backslash.
            line.chars().count() - line.matches('\'').count()
        });
        (line_idx as u32 + 1, column as u32 + 1)
    }
}

/// Escapes `'` and replaces every line break (`\r\n`, `\n\r`, `\n`, `\r`)
/// with the two characters `\n`. Applied exactly once; already-escaped input
/// is escaped again.
pub(crate) fn escape_source(source: &str) -> EscapedSource {
    let mut text = String::with_capacity(source.len() + source.len() / 8);
    let mut line_starts = vec![0];
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' => text.push_str("\\'"),
            '\r' | '\n' => {
                let pair = if c == '\r' { '\n' } else { '\r' };
                if chars.peek() == Some(&pair) {
                    chars.next();
                }
                text.push_str("\\n");
                line_starts.push(text.len());
            }
            _ => text.push(c),
        }
    }

    EscapedSource { text, line_starts }
}

pub struct Compiler<M = HtmlMinifier> {
    options: CompileOptions,
    minifier: M,
}

impl Compiler<HtmlMinifier> {
    pub fn new(options: CompileOptions) -> Self {
        Self::with_minifier(options, HtmlMinifier::new())
    }
}

impl Default for Compiler<HtmlMinifier> {
    fn default() -> Self {
        Self::new(CompileOptions::default())
    }
}

impl<M: Minifier> Compiler<M> {
    pub fn with_minifier(options: CompileOptions, minifier: M) -> Self {
        Self { options, minifier }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compiles a template, degrading any failure to the error-marker
    /// function `function(m0){return 'ERROR';}`.
    pub fn compile(&self, source: &str) -> String {
        match self.try_compile(source) {
            Ok(code) => code,
            Err(err) => {
                log::error!("template compilation failed: {}", err);
                error_function()
            }
        }
    }

    pub fn try_compile(&self, source: &str) -> Result<String, CompilerError> {
        let mut tracker = ScopeTracker::new();
        let source = source.trim();

        let prepared = if self.options.should_minify(source) {
            log::debug!("minifying template ({} bytes)", source.len());
            Cow::Owned(self.minifier.minify(source, &self.options.htmlmin)?)
        } else {
            Cow::Borrowed(source)
        };

        let escaped = escape_source(&prepared);
        let mut builder = FragmentBuilder::new();

        for segment in scan(&escaped.text) {
            match segment {
                Segment::Literal(text) => builder.push_literal(text),
                Segment::Directive(directive) => {
                    let fragment = translate(&directive, &mut tracker);
                    if let Some(outcome) = fragment.close {
                        self.check_close(outcome, &directive, &escaped)?;
                    }
                    builder.push_fragment(fragment.code);
                }
            }
        }

        self.check_unclosed(&tracker)?;
        log::debug!("translated {} fragments", builder.parts().len());

        let code = builder.finish();
        if self.options.verify_output {
            verify_output(&code)?;
        }
        Ok(code)
    }

    fn check_close(
        &self,
        outcome: CloseOutcome,
        directive: &DirectiveMatch,
        escaped: &EscapedSource,
    ) -> Result<(), CompilerError> {
        let message = match outcome {
            CloseOutcome::Balanced => return Ok(()),
            CloseOutcome::Unmatched => "Close tag without a matching open tag.".to_string(),
            CloseOutcome::Mismatched { innermost } => format!(
                "Close tag crosses an open {} block; expected {{{{{}}}}} first.",
                innermost.open_tag(),
                innermost.close_tag()
            ),
        };

        let (line, column) = escaped.locate(directive.span.start);
        let tag = escaped.text.get(directive.span.clone()).unwrap_or_default();

        match self.options.scope_policy() {
            ScopePolicy::Clamp => {
                log::warn!("{} ({}:{}, {})", message, line, column, tag);
                Ok(())
            }
            ScopePolicy::Strict => Err(CompilerError::with_details(
                ERR_SCOPE_UNBALANCED,
                &message,
                line,
                column,
                Some(tag.to_string()),
                vec![],
            )),
        }
    }

    fn check_unclosed(&self, tracker: &ScopeTracker) -> Result<(), CompilerError> {
        let Some(innermost) = tracker.open_frames().last() else {
            return Ok(());
        };
        let message = format!(
            "{} block(s) left open at end of template; missing {{{{{}}}}}.",
            tracker.open_frames().len(),
            innermost.close_tag()
        );

        match self.options.scope_policy() {
            ScopePolicy::Clamp => {
                log::warn!("{}", message);
                Ok(())
            }
            ScopePolicy::Strict => Err(CompilerError::unlocated(ERR_SCOPE_UNCLOSED, &message)),
        }
    }
}

impl<M: Minifier + Sync> Compiler<M> {
    /// Compiles named templates in parallel; each template gets its own scope
    /// tracker. Output order matches input order.
    pub fn compile_batch<'a>(&self, templates: &[(&'a str, &str)]) -> Vec<(&'a str, String)> {
        templates
            .par_iter()
            .map(|(name, source)| (*name, self.compile(source)))
            .collect()
    }
}

/// Compiles `source` with `options` (defaults when `None`).
pub fn compile(source: &str, options: Option<&CompileOptions>) -> String {
    match options {
        Some(options) => Compiler::new(options.clone()).compile(source),
        None => Compiler::default().compile(source),
    }
}

pub fn try_compile(source: &str, options: Option<&CompileOptions>) -> Result<String, CompilerError> {
    match options {
        Some(options) => Compiler::new(options.clone()).try_compile(source),
        None => Compiler::default().try_compile(source),
    }
}
