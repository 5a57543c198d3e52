//! ECCO compiler library.
//!
//! Drives the single-pass pipeline described in `spec.md` §2: lex and
//! parse a source file into a typed [`Program`], fold literal-only
//! subtrees with the optimizer, then hand the result to the LIR
//! generator. The library never touches an assembler or linker - its
//! only product is the textual LIR string.

pub mod ast;
pub mod codegen;
pub mod config;
pub mod diagnostics;
pub mod lexer;
pub mod optimizer;
pub mod parser;
pub mod symtab;
pub mod token;
pub mod types;

pub use ast::Program;
pub use config::CompilationConfig;
pub use diagnostics::{EccoError, LogLevel, SourceSpan};
pub use parser::Parser;

use std::fs;
use std::path::Path;

use tracing::{debug, info};

/// Compile a source file on disk, writing the generated LIR to `output`.
pub fn compile_file(source_path: &Path, output_path: &Path, config: &CompilationConfig) -> Result<(), EccoError> {
    let source = fs::read_to_string(source_path).map_err(|e| EccoError::FileNotFound {
        path: source_path.to_path_buf(),
        message: e.to_string(),
    })?;

    let ir = compile_source(&source, config)?;

    fs::write(output_path, ir).map_err(|e| EccoError::FileError {
        path: output_path.to_path_buf(),
        message: e.to_string(),
    })?;

    info!(path = %output_path.display(), "wrote LIR output");
    Ok(())
}

/// Compile a source string to textual LIR, applying the optimizer at
/// `config.opt_level` before code generation.
pub fn compile_source(source: &str, config: &CompilationConfig) -> Result<String, EccoError> {
    info!(opt_level = config.opt_level, "starting compilation");

    let mut parser = Parser::new(source);
    let program = parser.parse_program()?;
    debug!(items = program.items.len(), "parsed program");

    let program = optimize_program(program, config.opt_level)?;
    debug!("optimizer pass complete");

    let ir = codegen::codegen_program(&program, config.opt_level)?;
    debug!(bytes = ir.len(), "code generation complete");

    Ok(ir)
}

/// Apply the constant-folding optimizer to every function body and
/// global initializer in `program` (`spec.md` §4.5). Struct/union/enum
/// declarations carry no expressions and pass through unchanged.
fn optimize_program(mut program: Program, opt_level: u8) -> Result<Program, EccoError> {
    for item in &mut program.items {
        match item {
            ast::TopLevelItem::Function(node) => {
                if let Some(body) = node.left.take() {
                    node.left = Some(Box::new(optimizer::optimize(*body, opt_level)?));
                }
            }
            ast::TopLevelItem::GlobalVarDecl(node) => {
                *node = optimizer::optimize(node.clone(), opt_level)?;
            }
            ast::TopLevelItem::StructDecl(_) | ast::TopLevelItem::UnionDecl(_) => {}
        }
    }
    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_minimal_program_to_ir() {
        let source = "int main() { return 0; }";
        let ir = compile_source(source, &CompilationConfig::default()).unwrap();
        assert!(ir.contains("define i32 @main()"));
        assert!(ir.contains("target triple"));
    }

    #[test]
    fn propagates_syntax_errors() {
        let source = "int main() { return ; }";
        let result = compile_source(source, &CompilationConfig::default());
        assert!(matches!(result, Err(EccoError::SyntaxError { .. })));
    }

    #[test]
    fn compile_file_reports_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let config = CompilationConfig::default();
        let result = compile_file(
            Path::new("/nonexistent/path/to/source.ec"),
            &dir.path().join("out.ll"),
            &config,
        );
        assert!(matches!(result, Err(EccoError::FileNotFound { .. })));
    }

    #[test]
    fn compile_file_writes_ir_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let source_path = dir.path().join("main.ec");
        let output_path = dir.path().join("main.ll");
        fs::write(&source_path, "int main(){ print 1; }").unwrap();

        compile_file(&source_path, &output_path, &CompilationConfig::default()).unwrap();

        let written = fs::read_to_string(&output_path).unwrap();
        assert!(written.contains("call i32 @printint(i32 1)"));
    }

    fn ir(source: &str) -> String {
        compile_source(source, &CompilationConfig::default()).expect("compilation should succeed")
    }

    #[test]
    fn arithmetic_with_precedence_folds_to_a_literal() {
        let out = ir("int main(){ print 2+3*4; }");
        assert!(out.contains("call i32 @printint(i32 14)"));
        assert!(!out.contains("mul"));
    }

    #[test]
    fn global_assignment_and_read() {
        let out = ir("int x; int main(){ x=5; print x+1; }");
        assert!(out.contains("@x = global i32 0"));
        assert!(out.contains("store i32 5, ptr @x"));
        assert!(out.contains("add nsw i32"));
    }

    #[test]
    fn while_loop_sum_emits_loop_labels_and_comparison() {
        let out = ir("int main(){ int i; int s; i=1; s=0; while(i<=5){ s=s+i; i=i+1; } print s; }");
        assert!(out.contains("while.cond"));
        assert!(out.contains("while.body"));
        assert!(out.contains("while.end"));
        assert!(out.contains("icmp sle"));
    }

    #[test]
    fn function_call_and_return() {
        let out = ir("int sq(int n){ return n*n; } int main(){ print sq(6); print sq(7); }");
        assert!(out.contains("define i32 @sq(i32 %n)"));
        assert!(out.contains("call i32 @sq(i32 6)"));
        assert!(out.contains("call i32 @sq(i32 7)"));
        assert!(out.contains("mul nsw i32"));
    }

    #[test]
    fn pointers_take_address_and_store_through_dereference() {
        let out = ir("int main(){ int x; int *p; x=9; p=&x; print *p; *p=12; print x; }");
        assert_eq!(out.matches("call i32 @printint").count(), 2);
        assert!(out.contains("store i32 12, ptr"));
    }

    #[test]
    fn arrays_index_with_getelementptr() {
        let out = ir("int main(){ int a[3]; a[0]=10; a[1]=20; a[2]=30; print a[0]+a[1]+a[2]; }");
        assert!(out.contains("getelementptr inbounds [3 x i32]"));
    }

    #[test]
    fn if_else_emits_both_branches() {
        let out = ir("int main(){ int x; x=3; if(x<5){ print 1; } else { print 2; } }");
        assert!(out.contains("icmp slt"));
        assert!(out.contains("if.then"));
        assert!(out.contains("if.else"));
        assert!(out.contains("if.end"));
    }

    #[test]
    fn constant_folding_leaves_no_runtime_arithmetic() {
        let out = ir("int main(){ print (1+2)*(3+4); }");
        assert!(out.contains("call i32 @printint(i32 21)"));
        assert!(!out.contains("add nsw"));
        assert!(!out.contains("mul nsw"));
    }

    #[test]
    fn optimizer_is_idempotent_across_opt_levels() {
        let once = ir("int main(){ print (1+2)*(3+4); }");
        let twice = compile_source(
            "int main(){ print (1+2)*(3+4); }",
            &CompilationConfig::new().with_opt_level(2),
        )
        .unwrap();
        assert!(once.contains("i32 21)"));
        assert!(twice.contains("i32 21)"));
    }
}
