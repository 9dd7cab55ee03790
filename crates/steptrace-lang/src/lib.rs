//! Front end for the traced teaching language.
//!
//! [`compile`] turns source text into a [`CodeUnit`]: the parsed program body
//! bound to the canonical form of its logical path. The path is what the
//! tracing engine later compares frame origins against, so canonicalization
//! must happen exactly once, here.
//!
//! Syntax-level failures (`SyntaxError`) are deliberately a separate type
//! from the engine's runtime errors: a program that fails to compile was
//! never instrumented and produces an empty trace.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;

use std::path::{Component, Path, PathBuf};

pub use error::SyntaxError;

/// A compiled program: the parsed body plus the canonical path used for
/// frame-origin attribution.
#[derive(Debug, Clone)]
pub struct CodeUnit {
    /// Canonical absolute path of the script this unit was compiled from.
    pub path: PathBuf,
    pub body: Vec<ast::Stmt>,
}

/// Compiles source text into a [`CodeUnit`] attributed to `path`.
pub fn compile(source: &str, path: impl AsRef<Path>) -> Result<CodeUnit, SyntaxError> {
    let tokens = lexer::lex(source)?;
    let body = parser::parse(tokens)?;
    Ok(CodeUnit {
        path: canonical_script_path(path.as_ref()),
        body,
    })
}

/// Produces the canonical form of a script path for frame matching.
///
/// Prefers the filesystem's answer; for logical paths that do not exist on
/// disk (common when the source arrived over stdin) falls back to a lexical
/// normalization of the absolute path, so two spellings of the same location
/// still compare equal.
pub fn canonical_script_path(path: &Path) -> PathBuf {
    if let Ok(real) = std::fs::canonicalize(path) {
        return real;
    }
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    let mut out = PathBuf::new();
    for comp in absolute.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_attaches_canonical_path() {
        let unit = compile("x = 1\n", "student.py").unwrap();
        assert!(unit.path.is_absolute());
        assert_eq!(unit.body.len(), 1);
    }

    #[test]
    fn compile_reports_syntax_errors() {
        let err = compile("def f(:\n    pass", "student.py").unwrap_err();
        assert_eq!(err.line, 1);
    }

    #[test]
    fn two_spellings_compare_equal() {
        let a = canonical_script_path(Path::new("work/./student.py"));
        let b = canonical_script_path(Path::new("work/ignored/../student.py"));
        assert_eq!(a, b);
    }
}
