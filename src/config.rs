//! Compilation configuration threaded through the pipeline instead of
//! relying on globals (`spec.md` §9's Design Notes).

use crate::diagnostics::LogLevel;
use std::path::PathBuf;

/// Options that shape a single compilation, built from the CLI in
/// `main.rs` or constructed directly by a library caller.
#[derive(Debug, Clone)]
pub struct CompilationConfig {
    /// `spec.md` §4.5: `0` disables folding, `1`/`2` run it to a fixpoint.
    /// The subset has no optimization levels beyond local folding, so `1`
    /// and `2` currently behave identically.
    pub opt_level: u8,
    /// Defaults to the input's stem with a `.ll` extension when unset.
    pub output_path: Option<PathBuf>,
    pub logging: LogLevel,
}

impl CompilationConfig {
    pub fn new() -> Self {
        CompilationConfig::default()
    }

    pub fn with_opt_level(mut self, opt_level: u8) -> Self {
        self.opt_level = opt_level;
        self
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    pub fn with_logging(mut self, logging: LogLevel) -> Self {
        self.logging = logging;
        self
    }
}

impl Default for CompilationConfig {
    fn default() -> Self {
        CompilationConfig {
            opt_level: 1,
            output_path: None,
            logging: LogLevel::Info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_opt_level_is_one() {
        assert_eq!(CompilationConfig::default().opt_level, 1);
    }

    #[test]
    fn builder_methods_chain() {
        let config = CompilationConfig::new()
            .with_opt_level(0)
            .with_output_path("out.ll")
            .with_logging(LogLevel::Debug);

        assert_eq!(config.opt_level, 0);
        assert_eq!(config.output_path, Some(PathBuf::from("out.ll")));
        assert_eq!(config.logging, LogLevel::Debug);
    }
}
