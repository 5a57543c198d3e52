//! Expression code generation. Every expression node evaluates to an
//! `LirValue`; nodes that denote a place to store into (identifiers,
//! dereferences, array/field access) return an *address* - callers that
//! need the value call `ensure_loaded` (`spec.md` §4.6).

use crate::ast::AstNode;
use crate::codegen::state::CodeGen;
use crate::codegen::values::LirValue;
use crate::diagnostics::EccoError;
use crate::symtab::SlotValue;
use crate::token::TokenKind;
use crate::types::{widen, PrimitiveKind, TypeDescriptor};

impl CodeGen {
    pub(super) fn codegen_expr(&mut self, node: &AstNode) -> Result<LirValue, EccoError> {
        match node.kind {
            TokenKind::IntegerLiteral => self.codegen_integer_literal(node),
            TokenKind::Identifier => self.codegen_identifier(node),
            TokenKind::Amp => self.codegen_address_of(node),
            TokenKind::Dereference => self.codegen_dereference(node),
            TokenKind::ArrayAccess => self.codegen_array_access(node),
            TokenKind::FieldAccess => self.codegen_field_access(node),
            TokenKind::Plus | TokenKind::Minus | TokenKind::Star | TokenKind::Slash => {
                self.codegen_arith(node)
            }
            TokenKind::Eq | TokenKind::NotEq | TokenKind::Lt | TokenKind::LtEq | TokenKind::Gt | TokenKind::GtEq => {
                self.codegen_compare(node)
            }
            TokenKind::Assign => self.codegen_assign(node),
            TokenKind::FunctionCall => self.codegen_call(node),
            other => Err(EccoError::InternalTypeError {
                span: node.span,
                message: format!("{:?} cannot be generated as an expression", other),
            }),
        }
    }

    /// At `--opt>=1` a literal folds straight to a `CONSTANT`. At
    /// `--opt=0` it is stored to and reloaded from a stack slot instead,
    /// so the two code paths produce equivalent output modulo register
    /// numbering (`spec.md` §4.6/§9).
    fn codegen_integer_literal(&mut self, node: &AstNode) -> Result<LirValue, EccoError> {
        let value = node.int_value().unwrap();
        if self.opt_level == 0 {
            let slot = self.claim_literal_slot();
            self.emit(format!("store i32 {}, ptr {}", value, slot));
            let reg = self.new_register();
            self.emit(format!("{} = load i32, ptr {}", reg, slot));
            self.release_literal_slot(slot);
            Ok(LirValue::register(reg, PrimitiveKind::Int, 0))
        } else {
            Ok(LirValue::constant(value, PrimitiveKind::Int))
        }
    }

    fn codegen_identifier(&mut self, node: &AstNode) -> Result<LirValue, EccoError> {
        let name = node.name().expect("Identifier node always carries a name");
        let entry = self.symtab.lookup(name).cloned().ok_or_else(|| EccoError::InternalTypeError {
            span: node.span,
            message: format!("'{}' reached codegen without a generator-side declaration", name),
        })?;

        if entry.is_enum_value {
            let value = entry.ty.as_number().map(|n| n.value).unwrap_or(0);
            return Ok(LirValue::constant(value, PrimitiveKind::Int));
        }

        let SlotValue::Slot(addr) = entry.latest_value else {
            return Err(EccoError::InternalTypeError {
                span: node.span,
                message: format!("'{}' has no allocated storage at use site", name),
            });
        };

        let mut value = match &entry.ty {
            TypeDescriptor::Number(n) => LirValue::address(addr, n.kind, n.pointer_depth),
            TypeDescriptor::Array(a) => {
                let mut v = LirValue::address(addr, a.element.kind, a.element.pointer_depth);
                v.array_of = Some(Box::new(a.clone()));
                v
            }
            TypeDescriptor::Struct(s) => {
                let mut v = LirValue::address(addr, PrimitiveKind::Int, 0);
                v.struct_of = Some(s.clone());
                v
            }
            TypeDescriptor::Union(u) => {
                let mut v = LirValue::address(addr, u.widest_field(), 0);
                v.union_of = Some(u.clone());
                v
            }
            TypeDescriptor::Function(_) | TypeDescriptor::Enum(_) => {
                return Err(EccoError::InternalTypeError {
                    span: node.span,
                    message: format!("'{}' is not a variable", name),
                })
            }
        };
        value.kind = crate::codegen::values::ValueKind::VirtualRegister;
        Ok(value)
    }

    fn codegen_address_of(&mut self, node: &AstNode) -> Result<LirValue, EccoError> {
        let operand = node.left.as_ref().expect("& always has an operand");
        let inner = self.codegen_expr(operand)?;
        if !inner.is_address {
            return Err(EccoError::InternalTypeError {
                span: node.span,
                message: "cannot take the address of a non-lvalue".to_string(),
            });
        }
        Ok(LirValue::register(inner.name, inner.prim_kind, inner.pointer_depth + 1))
    }

    fn codegen_dereference(&mut self, node: &AstNode) -> Result<LirValue, EccoError> {
        let operand = node.left.as_ref().expect("* always has an operand");
        let inner = self.codegen_expr(operand)?;
        let pointer_value = self.ensure_loaded(inner);
        if pointer_value.pointer_depth == 0 {
            return Err(EccoError::InternalTypeError {
                span: node.span,
                message: "cannot dereference a non-pointer value".to_string(),
            });
        }
        Ok(LirValue::address(
            pointer_value.name,
            pointer_value.prim_kind,
            pointer_value.pointer_depth - 1,
        ))
    }

    fn codegen_array_access(&mut self, node: &AstNode) -> Result<LirValue, EccoError> {
        let base_node = node.left.as_ref().expect("array access has a base");
        let index_node = node.right.as_ref().expect("array access has an index");
        let base = self.codegen_expr(base_node)?;
        let index = self.codegen_expr(index_node)?;
        let index = self.ensure_loaded(index);
        let index = self.int_resize(index, PrimitiveKind::Int);

        if let Some(array) = base.array_of.clone() {
            let elem_ty = array.element.kind.llvm_name();
            let reg = self.new_register();
            self.emit(format!(
                "{} = getelementptr inbounds [{} x {}], ptr {}, i32 0, i32 {}",
                reg,
                array.length,
                elem_ty,
                base.operand(),
                index.operand()
            ));
            return Ok(LirValue::address(reg, array.element.kind, array.element.pointer_depth));
        }

        // Indexing a plain pointer: load the pointer value first, then GEP
        // by one flat element.
        let pointer_value = self.ensure_loaded(base);
        if pointer_value.pointer_depth == 0 {
            return Err(EccoError::InternalTypeError {
                span: node.span,
                message: "cannot index a non-array, non-pointer value".to_string(),
            });
        }
        let elem_kind = pointer_value.prim_kind;
        let reg = self.new_register();
        self.emit(format!(
            "{} = getelementptr inbounds {}, ptr {}, i32 {}",
            reg,
            elem_kind.llvm_name(),
            pointer_value.operand(),
            index.operand()
        ));
        Ok(LirValue::address(reg, elem_kind, pointer_value.pointer_depth - 1))
    }

    fn codegen_field_access(&mut self, node: &AstNode) -> Result<LirValue, EccoError> {
        let base_node = node.left.as_ref().expect("field access has a base");
        let field = node.name().expect("field access always names a field");
        let base = self.codegen_expr(base_node)?;

        if let Some(union) = &base.union_of {
            let field_ty = union.fields.iter().find(|(n, _)| n == field).map(|(_, t)| t).ok_or_else(|| {
                EccoError::IdentifierError {
                    span: node.span,
                    message: format!("'{}' has no member '{}'", union.name, field),
                }
            })?;
            return Ok(self.descriptor_address(base.name.clone(), field_ty));
        }

        if let Some(s) = base.struct_of.clone() {
            let idx = s.field_index(field).ok_or_else(|| EccoError::IdentifierError {
                span: node.span,
                message: format!("'{}' has no member '{}'", s.name, field),
            })?;
            let field_ty = s.field_type(field).unwrap().clone();
            let reg = self.new_register();
            self.emit(format!(
                "{} = getelementptr inbounds %{}, ptr {}, i32 0, i32 {}",
                reg, s.name, base.operand(), idx
            ));
            return Ok(self.descriptor_address(reg, &field_ty));
        }

        Err(EccoError::InternalTypeError {
            span: node.span,
            message: "field access on a value that is not a struct or union".to_string(),
        })
    }

    fn descriptor_address(&self, addr: String, ty: &TypeDescriptor) -> LirValue {
        match ty {
            TypeDescriptor::Number(n) => LirValue::address(addr, n.kind, n.pointer_depth),
            TypeDescriptor::Struct(s) => {
                let mut v = LirValue::address(addr, PrimitiveKind::Int, 0);
                v.struct_of = Some(s.clone());
                v
            }
            TypeDescriptor::Union(u) => {
                let mut v = LirValue::address(addr, u.widest_field(), 0);
                v.union_of = Some(u.clone());
                v
            }
            TypeDescriptor::Array(a) => {
                let mut v = LirValue::address(addr, a.element.kind, a.element.pointer_depth);
                v.array_of = Some(Box::new(a.clone()));
                v
            }
            TypeDescriptor::Function(_) | TypeDescriptor::Enum(_) => {
                LirValue::address(addr, PrimitiveKind::Int, 0)
            }
        }
    }

    fn codegen_arith(&mut self, node: &AstNode) -> Result<LirValue, EccoError> {
        let left = self.codegen_expr(node.left.as_ref().unwrap())?;
        let left = self.ensure_loaded(left);
        let right = self.codegen_expr(node.right.as_ref().unwrap())?;
        let right = self.ensure_loaded(right);

        if left.pointer_depth > 0 || right.pointer_depth > 0 {
            return Err(EccoError::InternalTypeError {
                span: node.span,
                message: "pointer arithmetic is not supported".to_string(),
            });
        }

        let target = widen(left.prim_kind, right.prim_kind);
        let left = self.int_resize(left, target);
        let right = self.int_resize(right, target);

        // Division is deliberately emitted as `udiv` (not `sdiv`) even
        // though comparisons are always signed - an intentional quirk
        // carried over unchanged (`spec.md` §9).
        let op = match node.kind {
            TokenKind::Plus => "add nsw",
            TokenKind::Minus => "sub nsw",
            TokenKind::Star => "mul nsw",
            TokenKind::Slash => "udiv",
            _ => unreachable!(),
        };
        let reg = self.new_register();
        self.emit(format!("{} = {} {} {}, {}", reg, op, target.llvm_name(), left.operand(), right.operand()));
        Ok(LirValue::register(reg, target, 0))
    }

    fn codegen_compare(&mut self, node: &AstNode) -> Result<LirValue, EccoError> {
        let left = self.codegen_expr(node.left.as_ref().unwrap())?;
        let left = self.ensure_loaded(left);
        let right = self.codegen_expr(node.right.as_ref().unwrap())?;
        let right = self.ensure_loaded(right);

        let target = widen(left.prim_kind, right.prim_kind);
        let left = self.int_resize(left, target);
        let right = self.int_resize(right, target);

        let op = match node.kind {
            TokenKind::Eq => "eq",
            TokenKind::NotEq => "ne",
            TokenKind::Lt => "slt",
            TokenKind::LtEq => "sle",
            TokenKind::Gt => "sgt",
            TokenKind::GtEq => "sge",
            _ => unreachable!(),
        };
        let reg = self.new_register();
        self.emit(format!("{} = icmp {} {} {}, {}", reg, op, target.llvm_name(), left.operand(), right.operand()));
        Ok(LirValue::register(reg, PrimitiveKind::Bool, 0))
    }

    fn codegen_assign(&mut self, node: &AstNode) -> Result<LirValue, EccoError> {
        let value = self.codegen_expr(node.left.as_ref().unwrap())?;
        let value = self.ensure_loaded(value);

        let target_node = node.right.as_ref().unwrap();
        if let TokenKind::Identifier = target_node.kind {
            let name = target_node.name().unwrap();
            let entry = self.symtab.lookup(name).ok_or_else(|| EccoError::InternalTypeError {
                span: node.span,
                message: format!("'{}' reached codegen without a generator-side declaration", name),
            })?;
            if !entry.writeable {
                return Err(EccoError::IdentifierError {
                    span: node.span,
                    message: format!("cannot assign to const '{}'", name),
                });
            }
        }

        let target = self.codegen_expr(target_node)?;
        let resized = self.int_resize(value, target.prim_kind);
        let store_ty = target.llvm_type();
        self.emit(format!("store {} {}, ptr {}", store_ty, resized.operand(), target.operand()));
        Ok(resized)
    }

    fn codegen_call(&mut self, node: &AstNode) -> Result<LirValue, EccoError> {
        let name = node.name().expect("FunctionCall node always carries the callee name");
        let fn_ty = self
            .symtab
            .lookup(name)
            .and_then(|e| e.ty.as_function())
            .cloned()
            .ok_or_else(|| EccoError::InternalTypeError {
                span: node.span,
                message: format!("'{}' reached codegen without a known function type", name),
            })?;

        let mut arg_text = Vec::with_capacity(node.call_args.len());
        for (arg, (_, param_ty)) in node.call_args.iter().zip(fn_ty.args.iter()) {
            let value = self.codegen_expr(arg)?;
            let value = self.ensure_loaded(value);
            let value = self.int_resize(value, param_ty.kind);
            arg_text.push(format!("{} {}", value.llvm_type(), value.operand()));
        }

        if fn_ty.return_type.kind == PrimitiveKind::Void {
            self.emit(format!("call void @{}({})", name, arg_text.join(", ")));
            Ok(LirValue::none())
        } else {
            let reg = self.new_register();
            self.emit(format!(
                "{} = call {} @{}({})",
                reg,
                fn_ty.return_type.llvm_type(),
                name,
                arg_text.join(", ")
            ));
            Ok(LirValue::register(reg, fn_ty.return_type.kind, fn_ty.return_type.pointer_depth))
        }
    }
}
