//! Statement code generation: declarations, control flow, `print`, and
//! `return` (`spec.md` §4.6).

use crate::ast::AstNode;
use crate::codegen::state::CodeGen;
use crate::diagnostics::EccoError;
use crate::symtab::SymbolTableEntry;
use crate::token::TokenKind;
use crate::types::{PrimitiveKind, TypeDescriptor};

impl CodeGen {
    pub(super) fn codegen_statement(&mut self, node: &AstNode) -> Result<(), EccoError> {
        match node.kind {
            TokenKind::Unknown => Ok(()),
            TokenKind::AstGlue => {
                self.codegen_statement(node.left.as_ref().unwrap())?;
                self.codegen_statement(node.right.as_ref().unwrap())
            }
            TokenKind::VarDecl => self.codegen_var_decl(node),
            TokenKind::Print => self.codegen_print(node),
            TokenKind::If => self.codegen_if(node),
            TokenKind::While => self.codegen_while(node),
            TokenKind::Return => self.codegen_return(node),
            _ => {
                // A bare expression statement (assignment, or a
                // discarded function call).
                self.codegen_expr(node).map(|_| ())
            }
        }
    }

    fn codegen_var_decl(&mut self, node: &AstNode) -> Result<(), EccoError> {
        let name = node.name().expect("VAR_DECL always carries its name");
        let llvm_type = match &node.ty {
            TypeDescriptor::Number(n) => n.llvm_type(),
            TypeDescriptor::Array(a) => format!("[{} x {}]", a.length, a.element.kind.llvm_name()),
            TypeDescriptor::Struct(s) => format!("%{}", s.name),
            TypeDescriptor::Union(u) => format!("{{ {} }}", u.widest_field().llvm_name()),
            TypeDescriptor::Function(_) | TypeDescriptor::Enum(_) => {
                return Err(EccoError::InternalTypeError {
                    span: node.span,
                    message: "a function or enum type cannot be a local variable".to_string(),
                })
            }
        };
        let addr = self.alloca(&llvm_type);
        let entry = SymbolTableEntry::new(name.to_string(), node.ty.clone(), node.is_rvalue);
        self.declare_local(name, entry, addr, node.span)
    }

    fn codegen_print(&mut self, node: &AstNode) -> Result<(), EccoError> {
        let value = self.codegen_expr(node.left.as_ref().unwrap())?;
        let value = self.ensure_loaded(value);
        let value = self.int_resize(value, PrimitiveKind::Int);
        self.emit(format!("call i32 @printint(i32 {})", value.operand()));
        Ok(())
    }

    fn codegen_if(&mut self, node: &AstNode) -> Result<(), EccoError> {
        let cond = self.codegen_expr(node.left.as_ref().unwrap())?;
        let cond = self.ensure_loaded(cond);

        let then_label = self.new_label("if.then");
        let else_label = self.new_label("if.else");
        let end_label = self.new_label("if.end");
        let has_else = node.right.is_some();

        self.emit(format!(
            "br i1 {}, label %{}, label %{}",
            cond.operand(),
            then_label,
            if has_else { else_label.clone() } else { end_label.clone() }
        ));

        self.emit_label(&then_label);
        self.codegen_statement(node.middle.as_ref().unwrap())?;
        if !self.terminated {
            self.emit(format!("br label %{}", end_label));
        }

        if let Some(else_branch) = &node.right {
            self.emit_label(&else_label);
            self.codegen_statement(else_branch)?;
            if !self.terminated {
                self.emit(format!("br label %{}", end_label));
            }
        }

        self.emit_label(&end_label);
        Ok(())
    }

    fn codegen_while(&mut self, node: &AstNode) -> Result<(), EccoError> {
        let cond_label = self.new_label("while.cond");
        let body_label = self.new_label("while.body");
        let end_label = self.new_label("while.end");

        self.emit(format!("br label %{}", cond_label));
        self.emit_label(&cond_label);
        let cond = self.codegen_expr(node.left.as_ref().unwrap())?;
        let cond = self.ensure_loaded(cond);
        self.emit(format!("br i1 {}, label %{}, label %{}", cond.operand(), body_label, end_label));

        self.emit_label(&body_label);
        self.codegen_statement(node.middle.as_ref().unwrap())?;
        if !self.terminated {
            self.emit(format!("br label %{}", cond_label));
        }

        self.emit_label(&end_label);
        Ok(())
    }

    fn codegen_return(&mut self, node: &AstNode) -> Result<(), EccoError> {
        match &node.left {
            Some(expr) => {
                let value = self.codegen_expr(expr)?;
                let value = self.ensure_loaded(value);
                self.emit(format!("ret {} {}", value.llvm_type(), value.operand()));
            }
            None => self.emit("ret void"),
        }
        Ok(())
    }
}
