//! Fatal diagnostics for the compiler.
//!
//! Every error the compiler can produce is a single `EccoError` value,
//! carrying the source location it fired at and a human-readable message.
//! There is no recovery: the first diagnostic raised aborts compilation
//! with the variant's exit code (see `spec.md` §6/§7).

use std::fmt;
use std::path::PathBuf;

/// A line/column pair as tracked by the lexer at the moment a diagnostic
/// is produced. Per `spec.md` §7 this fixes the location at the point of
/// `advance()` rather than at the token that actually caused the error -
/// an accepted imprecision inherited from the source system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSpan {
    pub line: usize,
    pub column: usize,
}

impl SourceSpan {
    pub fn new(line: usize, column: usize) -> Self {
        SourceSpan { line, column }
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// The eight fatal error categories, each mapped to a fixed process exit
/// code. Construction is cheap; every variant is raised exactly once, at
/// the single logical point named in `spec.md` §7.
#[derive(Debug, Clone)]
pub enum EccoError {
    /// Generic catch-all, including divide-by-zero during constant folding.
    Fatal { span: SourceSpan, message: String },
    /// The input source file could not be found.
    FileNotFound { path: PathBuf, message: String },
    /// Opening/reading/writing the input or one of the two output streams failed.
    FileError { path: PathBuf, message: String },
    /// Unknown character in the lexer, or an unexpected token in the parser.
    SyntaxError { span: SourceSpan, message: String },
    /// A generator-side invariant was violated - signals a compiler bug.
    InternalTypeError { span: SourceSpan, message: String },
    /// Redeclaration, undeclared use, const write, or prototype/definition mismatch.
    IdentifierError { span: SourceSpan, message: String },
    /// `EOF` reached while an expression was still open.
    EofMissingSemicolon { span: SourceSpan, message: String },
    /// Non-constant, negative, or multi-dimensional array length.
    ArrayError { span: SourceSpan, message: String },
}

impl EccoError {
    /// The process exit code this diagnostic terminates the compiler with.
    pub fn exit_code(&self) -> i32 {
        match self {
            EccoError::Fatal { .. } => 1,
            EccoError::FileNotFound { .. } => 2,
            EccoError::FileError { .. } => 3,
            EccoError::SyntaxError { .. } => 4,
            EccoError::InternalTypeError { .. } => 5,
            EccoError::IdentifierError { .. } => 6,
            EccoError::EofMissingSemicolon { .. } => 7,
            EccoError::ArrayError { .. } => 8,
        }
    }

    /// The short category name printed alongside the message.
    pub fn category(&self) -> &'static str {
        match self {
            EccoError::Fatal { .. } => "fatal error",
            EccoError::FileNotFound { .. } => "file not found",
            EccoError::FileError { .. } => "file error",
            EccoError::SyntaxError { .. } => "syntax error",
            EccoError::InternalTypeError { .. } => "internal type error",
            EccoError::IdentifierError { .. } => "identifier error",
            EccoError::EofMissingSemicolon { .. } => "missing semicolon",
            EccoError::ArrayError { .. } => "array error",
        }
    }
}

impl fmt::Display for EccoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EccoError::FileNotFound { path, message } | EccoError::FileError { path, message } => {
                write!(f, "{}: {}: {}", self.category(), path.display(), message)
            }
            EccoError::Fatal { span, message }
            | EccoError::SyntaxError { span, message }
            | EccoError::InternalTypeError { span, message }
            | EccoError::IdentifierError { span, message }
            | EccoError::EofMissingSemicolon { span, message }
            | EccoError::ArrayError { span, message } => {
                write!(f, "{}: {}: {}", self.category(), span, message)
            }
        }
    }
}

impl std::error::Error for EccoError {}

/// The `--logging` filter level. Gates `tracing` event output only; it
/// never suppresses a fatal `EccoError`, which is always printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
#[clap(rename_all = "UPPER")]
pub enum LogLevel {
    None,
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// The `tracing_subscriber::EnvFilter` directive for this level.
    pub fn filter_directive(self) -> &'static str {
        match self {
            LogLevel::None => "off",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
            LogLevel::Critical => "error",
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_match_spec() {
        let span = SourceSpan::new(1, 1);
        assert_eq!(EccoError::Fatal { span, message: String::new() }.exit_code(), 1);
        assert_eq!(
            EccoError::FileNotFound { path: "x".into(), message: String::new() }.exit_code(),
            2
        );
        assert_eq!(
            EccoError::FileError { path: "x".into(), message: String::new() }.exit_code(),
            3
        );
        assert_eq!(EccoError::SyntaxError { span, message: String::new() }.exit_code(), 4);
        assert_eq!(EccoError::InternalTypeError { span, message: String::new() }.exit_code(), 5);
        assert_eq!(EccoError::IdentifierError { span, message: String::new() }.exit_code(), 6);
        assert_eq!(
            EccoError::EofMissingSemicolon { span, message: String::new() }.exit_code(),
            7
        );
        assert_eq!(EccoError::ArrayError { span, message: String::new() }.exit_code(), 8);
    }

    #[test]
    fn display_includes_location_and_category() {
        let err = EccoError::SyntaxError {
            span: SourceSpan::new(3, 7),
            message: "unexpected token".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("syntax error"));
        assert!(text.contains("3:7"));
        assert!(text.contains("unexpected token"));
    }

    #[test]
    fn log_level_ordering() {
        assert!(LogLevel::None < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Critical);
    }
}
