//! Compile-time error type shared by the lexer and parser.

/// A syntax-level failure: malformed tokens, bad indentation, or an
/// unparseable statement. Produced before any instrumentation is installed,
/// so a program that fails here never yields trace steps.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct SyntaxError {
    /// 1-based source line where the error was detected.
    pub line: u32,
    pub message: String,
}

impl SyntaxError {
    pub fn new(line: u32, message: impl Into<String>) -> Self {
        SyntaxError {
            line,
            message: message.into(),
        }
    }
}
