//! mcc compiler library.
//!
//! Compiles a small subset of C to x86-64 GNU assembly in one pass:
//! tokenize, parse/resolve/check, generate. The assembly is returned as a
//! string; assembling and linking are left to the system toolchain:
//!
//! ```text
//! mcc prog.c > prog.s && cc prog.s -o prog
//! ```
//!
//! Every stage reports failure as a rendered three-line diagnostic (source
//! line, caret, message) in the `Err` string; the first error aborts the
//! compilation.

pub mod asm;
pub mod ast;
pub mod codegen;
pub mod diag;
pub mod parser;
pub mod token;
pub mod types;
pub mod unicode;

pub use asm::Syntax;
pub use ast::Program;
pub use codegen::{CodeGen, CodeGenError};
pub use parser::Parser;
pub use types::Type;

use std::fs;
use std::path::Path;

/// Compile source text to assembly in the given flavor.
pub fn compile_source(source: &str, syntax: Syntax) -> Result<String, String> {
    let mut parser = Parser::new(source);
    let program = parser.parse()?;
    let mut codegen = CodeGen::new(source, syntax);
    codegen.generate(&program).map_err(|e| e.to_string())
}

/// Read and compile a source file.
pub fn compile_file(path: &Path, syntax: Syntax) -> Result<String, String> {
    let source = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    compile_source(&source, syntax)
}
