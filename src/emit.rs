//! Output assembly.

/// Opens the render function and its string literal.
pub(crate) const PROLOGUE: &str = "function(m0){return '";
/// Closes the string literal and the render function.
pub(crate) const EPILOGUE: &str = "';}";
/// Body rendered when compilation fails.
pub(crate) const ERROR_MARKER: &str = "ERROR";

/// Ordered list of emitted parts, joined once at the end.
#[derive(Debug, Default)]
pub(crate) struct FragmentBuilder {
    parts: Vec<String>,
}

impl FragmentBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Literal text must already be escaped for a single-quoted string.
    pub(crate) fn push_literal(&mut self, text: &str) {
        self.parts.push(text.to_string());
    }

    pub(crate) fn push_fragment(&mut self, code: String) {
        self.parts.push(code);
    }

    pub(crate) fn parts(&self) -> &[String] {
        &self.parts
    }

    pub(crate) fn finish(self) -> String {
        wrap(&self.parts.concat())
    }
}

pub(crate) fn wrap(body: &str) -> String {
    format!("{}{}{}", PROLOGUE, body, EPILOGUE)
}

pub(crate) fn error_function() -> String {
    wrap(ERROR_MARKER)
}
