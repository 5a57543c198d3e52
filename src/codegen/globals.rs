//! Global variable and string-constant emission into the module-wide
//! globals buffer that gets spliced into the output stream once code
//! generation finishes (`spec.md` §4.6/§5's two-output-stream design).

use std::fmt::Write as _;

use crate::ast::AstNode;
use crate::codegen::state::CodeGen;
use crate::diagnostics::EccoError;
use crate::token::TokenKind;
use crate::types::TypeDescriptor;

impl CodeGen {
    /// `@name = global <type> <initializer>`. Initializers must already
    /// be constant-folded to a literal by the optimizer; a non-constant
    /// global initializer is an internal error since the parser only
    /// ever produces `GLOBAL = CONSTANT` or an un-initialized declaration.
    pub(super) fn emit_global_var(&mut self, node: &AstNode) -> Result<(), EccoError> {
        // `node` is either a bare VAR_DECL, or AST_GLUE(VAR_DECL, ASSIGN(value, name)).
        let (decl, init) = match node.kind {
            TokenKind::VarDecl => (node, None),
            TokenKind::AstGlue => {
                let decl = node.left.as_ref().unwrap();
                let assign = node.right.as_ref().unwrap();
                (decl.as_ref(), Some(assign.left.as_ref().unwrap()))
            }
            _ => unreachable!("global declarations are VAR_DECL or AST_GLUE(VAR_DECL, ASSIGN)"),
        };

        let name = decl.name().expect("global VAR_DECL always carries its name");
        let llvm_type = self.global_llvm_type(&decl.ty);
        let initializer = match init {
            Some(expr) if expr.is_integer_literal() => expr.int_value().unwrap().to_string(),
            Some(_) => {
                return Err(EccoError::InternalTypeError {
                    span: decl.span,
                    message: "global initializer did not fold to a constant".to_string(),
                })
            }
            None => self.zero_initializer(&decl.ty),
        };

        writeln!(self.globals, "@{} = global {} {}", name, llvm_type, initializer).unwrap();
        Ok(())
    }

    fn global_llvm_type(&self, ty: &TypeDescriptor) -> String {
        match ty {
            TypeDescriptor::Number(n) => n.llvm_type(),
            TypeDescriptor::Array(a) => format!("[{} x {}]", a.length, a.element.kind.llvm_name()),
            TypeDescriptor::Struct(s) => format!("%{}", s.name),
            TypeDescriptor::Union(u) => format!("{{ {} }}", u.widest_field().llvm_name()),
            TypeDescriptor::Function(_) | TypeDescriptor::Enum(_) => {
                unreachable!("functions and enum members are never emitted as globals")
            }
        }
    }

    fn zero_initializer(&self, ty: &TypeDescriptor) -> String {
        match ty {
            TypeDescriptor::Array(_) | TypeDescriptor::Struct(_) | TypeDescriptor::Union(_) => {
                "zeroinitializer".to_string()
            }
            _ => "0".to_string(),
        }
    }

    /// `%Name = type { ... }`, emitted once per struct/union declaration
    /// (unions are laid out as a single widest-field slot, per `spec.md`
    /// §4.6).
    pub(super) fn emit_struct_decl(&mut self, s: &crate::types::StructType) {
        let fields: Vec<String> = s.fields.iter().map(|(_, t)| self.global_llvm_type(t)).collect();
        writeln!(self.globals, "%{} = type {{ {} }}", s.name, fields.join(", ")).unwrap();
    }

    pub(super) fn emit_union_decl(&mut self, u: &crate::types::UnionType) {
        writeln!(self.globals, "%{} = type {{ {} }}", u.name, u.widest_field().llvm_name()).unwrap();
    }
}
