use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_MINIFY: &str = "T-ERR-MINIFY";
pub const ERR_SCOPE_UNBALANCED: &str = "T-ERR-SCOPE-UNBALANCED";
pub const ERR_SCOPE_UNCLOSED: &str = "T-ERR-SCOPE-UNCLOSED";
pub const ERR_OUTPUT_SYNTAX: &str = "T-ERR-OUTPUT-SYNTAX";
pub const ERR_OUTPUT_SCOPE: &str = "T-ERR-OUTPUT-SCOPE";
pub const ERR_OPTIONS: &str = "T-ERR-OPTIONS";

fn error_type(code: &str) -> &'static str {
    match code {
        ERR_MINIFY => "MINIFY_FAILURE",
        ERR_SCOPE_UNBALANCED | ERR_SCOPE_UNCLOSED => "UNBALANCED_SCOPE",
        ERR_OUTPUT_SYNTAX | ERR_OUTPUT_SCOPE => "INVALID_OUTPUT",
        ERR_OPTIONS => "INVALID_OPTIONS",
        _ => "COMPILER_ERROR",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILER ERROR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("[{code}] {message} (line {line}, column {column})")]
pub struct CompilerError {
    pub code: String,
    pub error_type: String,
    pub message: String,
    pub line: u32,
    pub column: u32,
    pub context: Option<String>,
    pub hints: Vec<String>,
}

impl CompilerError {
    pub fn new(code: &str, message: &str, line: u32, column: u32) -> Self {
        Self::with_details(code, message, line, column, None, vec![])
    }

    pub fn with_details(
        code: &str,
        message: &str,
        line: u32,
        column: u32,
        context: Option<String>,
        hints: Vec<String>,
    ) -> Self {
        CompilerError {
            code: code.to_string(),
            error_type: error_type(code).to_string(),
            message: message.to_string(),
            line,
            column,
            context,
            hints,
        }
    }

    /// Errors that are not tied to a template position report line 0.
    pub fn unlocated(code: &str, message: &str) -> Self {
        Self::new(code, message, 0, 0)
    }
}

/// Failure signalled by a minifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct MinifyError(pub String);

impl From<MinifyError> for CompilerError {
    fn from(err: MinifyError) -> Self {
        CompilerError::with_details(
            ERR_MINIFY,
            &format!("HTML minification failed: {}", err),
            0,
            0,
            None,
            vec!["Disable htmlminEnable/htmlminMultiLines to compile the raw source.".to_string()],
        )
    }
}

impl From<serde_json::Error> for CompilerError {
    fn from(err: serde_json::Error) -> Self {
        CompilerError::unlocated(ERR_OPTIONS, &format!("Invalid compile options: {}", err))
    }
}
