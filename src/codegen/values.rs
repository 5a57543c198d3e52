//! `LIRValue`: what an expression's code generation hands back to its
//! caller (`spec.md` §3).

use crate::types::{ArrayType, PrimitiveKind, StructType, UnionType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    None,
    VirtualRegister,
    Label,
    Constant,
}

/// A typed LIR operand: a virtual register name (`%7`), a label
/// (`if.end.3`), or a literal constant, carrying enough type information
/// for the caller to decide whether a load, a `getelementptr`, or a
/// width coercion is needed before it can be used.
#[derive(Debug, Clone)]
pub struct LirValue {
    pub kind: ValueKind,
    pub name: String,
    pub prim_kind: PrimitiveKind,
    pub pointer_depth: u32,
    pub array_of: Option<Box<ArrayType>>,
    pub struct_of: Option<StructType>,
    pub union_of: Option<UnionType>,
    /// Set when this register is itself an address (an `alloca` result
    /// or a GEP) rather than a loaded value - `ensure_loaded` checks
    /// this before emitting a `load`.
    pub is_address: bool,
}

impl LirValue {
    pub fn none() -> Self {
        LirValue {
            kind: ValueKind::None,
            name: String::new(),
            prim_kind: PrimitiveKind::Void,
            pointer_depth: 0,
            array_of: None,
            struct_of: None,
            union_of: None,
            is_address: false,
        }
    }

    pub fn constant(value: i64, prim_kind: PrimitiveKind) -> Self {
        LirValue {
            kind: ValueKind::Constant,
            name: value.to_string(),
            prim_kind,
            pointer_depth: 0,
            array_of: None,
            struct_of: None,
            union_of: None,
            is_address: false,
        }
    }

    pub fn register(name: impl Into<String>, prim_kind: PrimitiveKind, pointer_depth: u32) -> Self {
        LirValue {
            kind: ValueKind::VirtualRegister,
            name: name.into(),
            prim_kind,
            pointer_depth,
            array_of: None,
            struct_of: None,
            union_of: None,
            is_address: false,
        }
    }

    pub fn address(name: impl Into<String>, prim_kind: PrimitiveKind, pointer_depth: u32) -> Self {
        let mut v = Self::register(name, prim_kind, pointer_depth);
        v.is_address = true;
        v
    }

    pub fn is_pointer(&self) -> bool {
        self.pointer_depth > 0
    }

    /// The textual LLVM type this value's *pointee* has (what a `load`
    /// from this address, or the value itself if not an address, would
    /// be typed as).
    pub fn llvm_type(&self) -> String {
        if self.pointer_depth > 0 {
            "ptr".to_string()
        } else {
            self.prim_kind.llvm_name().to_string()
        }
    }

    /// The operand text to splice into an instruction: `%7`, `42`, `@g`.
    pub fn operand(&self) -> &str {
        &self.name
    }
}
