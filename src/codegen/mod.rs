//! AST -> textual LIR (`spec.md` §4.6). A module is assembled in two
//! streams: the running text of function bodies (`CodeGen::out`) and a
//! separate globals buffer, spliced together at the end so that string
//! and symbol constants never have to be forward-declared mid-stream
//! (`spec.md` §5's two-output-stream contract).

mod expr;
mod globals;
mod runtime;
mod state;
mod stmt;
mod values;

use crate::ast::{AstNode, Program, TopLevelItem};
use crate::diagnostics::EccoError;
use crate::symtab::{SlotValue, SymbolTableEntry};
use crate::types::PrimitiveKind;

use state::{CodeGen, GLOBALS_PLACEHOLDER};

const TARGET_TRIPLE: &str = "x86_64-pc-linux-gnu";
const DATA_LAYOUT: &str = "e-m:e-p270:32:32-p271:32:32-p272:64:64-i64:64-i128:128-f80:128-n8:16:32:64-S128";

/// Generate the full module text for `program`. `program` must already
/// have passed through the constant-folding optimizer; code generation
/// performs no folding of its own.
pub fn codegen_program(program: &Program, opt_level: u8) -> Result<String, EccoError> {
    let mut cg = CodeGen::new(opt_level);
    cg.emit_printint();

    // Register every top-level symbol before generating any function
    // body, so forward references (a function calling one declared
    // later in the file) resolve the same way the parser already
    // permitted via its own single GST.
    for item in &program.items {
        match item {
            TopLevelItem::StructDecl(s) => {
                cg.types.declare_struct(s.clone());
                cg.emit_struct_decl(s);
            }
            TopLevelItem::UnionDecl(u) => {
                cg.types.declare_union(u.clone());
                cg.emit_union_decl(u);
            }
            TopLevelItem::GlobalVarDecl(node) => {
                let decl = global_decl_node(node);
                let name = decl.name().expect("global VAR_DECL always carries its name").to_string();
                cg.emit_global_var(node)?;
                let mut entry = SymbolTableEntry::new(name.clone(), decl.ty.clone(), decl.is_rvalue);
                entry.latest_value = SlotValue::Slot(format!("@{}", name));
                cg.symtab.declare(entry, decl.span)?;
            }
            TopLevelItem::Function(node) => {
                let name = node.name().expect("Function node always carries its name").to_string();
                if cg.symtab.lookup(&name).is_none() {
                    let entry = SymbolTableEntry::new(name, node.ty.clone(), false);
                    cg.symtab.declare(entry, node.span)?;
                }
            }
        }
    }

    for item in &program.items {
        if let TopLevelItem::Function(node) = item {
            if node.left.is_some() {
                cg.codegen_function(node)?;
            }
        }
    }

    cg.emit_postamble();

    let mut module = String::new();
    module.push_str("; ModuleID = 'ecco'\n");
    module.push_str("source_filename = \"ecco\"\n");
    module.push_str(&format!("target datalayout = \"{}\"\n", DATA_LAYOUT));
    module.push_str(&format!("target triple = \"{}\"\n\n", TARGET_TRIPLE));
    module.push_str(GLOBALS_PLACEHOLDER);
    module.push('\n');
    module.push_str(&cg.out);

    Ok(module.replace(GLOBALS_PLACEHOLDER, &cg.globals))
}

/// Unwraps a global declaration's `VAR_DECL` node, whether or not it
/// carries an initializer (`AST_GLUE(VAR_DECL, ASSIGN(..))`).
fn global_decl_node(node: &AstNode) -> &AstNode {
    match node.kind {
        crate::token::TokenKind::AstGlue => node.left.as_ref().unwrap(),
        _ => node,
    }
}

impl CodeGen {
    fn codegen_function(&mut self, node: &AstNode) -> Result<(), EccoError> {
        let name = node.name().expect("Function node always carries its name");
        let fn_ty = node.ty.as_function().expect("Function node always carries a FunctionType").clone();

        self.reg_counter = 0;
        self.free_slots.clear();
        self.symtab.push();

        let params: Vec<String> = fn_ty
            .args
            .iter()
            .map(|(pname, ptype)| format!("{} %{}", ptype.llvm_type(), pname))
            .collect();
        let return_ty = fn_ty.return_type.llvm_type();
        self.out.push_str(&format!("define {} @{}({}) {{\n", return_ty, name, params.join(", ")));
        self.out.push_str("entry:\n");

        for (pname, ptype) in &fn_ty.args {
            let addr = self.alloca(&ptype.llvm_type());
            self.emit(format!("store {} %{}, ptr {}", ptype.llvm_type(), pname, addr));
            let mut entry = SymbolTableEntry::new(pname.clone(), crate::types::TypeDescriptor::Number(ptype.clone()), true);
            entry.latest_value = SlotValue::Slot(addr);
            self.symtab.declare(entry, node.span)?;
        }

        let body = node.left.as_ref().expect("a defined function always has a body");
        self.codegen_statement(body)?;

        // A function whose body falls through without an explicit
        // `return` terminates with `ret void`/a zeroed return value, so
        // every basic block stays terminated as LLVM requires. A body
        // that already ended in `return` left its block terminated.
        if !self.terminated {
            if fn_ty.return_type.kind == PrimitiveKind::Void {
                self.emit("ret void");
            } else {
                self.emit(format!("ret {} 0", return_ty));
            }
        }

        self.out.push_str("}\n\n");
        self.symtab.pop();
        Ok(())
    }
}
