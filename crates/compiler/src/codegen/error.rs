//! Code generation error types.

/// Error type for code generation operations.
///
/// This allows proper error propagation using `?` for both logical errors
/// (invalid constant expressions, non-addressable nodes) and formatting
/// errors while writing into the assembly buffer.
#[derive(Debug)]
pub enum CodeGenError {
    /// A logical error; carries the rendered diagnostic.
    Logic(String),
    /// A formatting error when writing assembly text.
    Format(std::fmt::Error),
}

impl std::fmt::Display for CodeGenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodeGenError::Logic(s) => write!(f, "{}", s),
            CodeGenError::Format(e) => write!(f, "assembly generation error: {}", e),
        }
    }
}

impl std::error::Error for CodeGenError {}

impl From<String> for CodeGenError {
    fn from(s: String) -> Self {
        CodeGenError::Logic(s)
    }
}

impl From<std::fmt::Error> for CodeGenError {
    fn from(e: std::fmt::Error) -> Self {
        CodeGenError::Format(e)
    }
}
