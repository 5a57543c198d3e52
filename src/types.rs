//! Primitive kinds and the `TypeDescriptor` lattice (`spec.md` §3).
//!
//! Ordered mappings (field/argument lists) are `Vec<(String, T)>` rather
//! than a `HashMap` so that declaration order - which is semantically
//! significant for struct layout and call-argument binding - is
//! preserved without a side table.

use std::collections::HashMap;

/// Integer/pointer primitive widths, in a fixed total order used for
/// implicit widening (`BOOL < CHAR < SHORT < INT < LONG`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PrimitiveKind {
    Bool,
    Char,
    Short,
    Int,
    Long,
    Void,
}

impl PrimitiveKind {
    /// Bit width of the LLVM integer type, e.g. `i32` for `Int`.
    pub fn bit_width(self) -> u32 {
        match self {
            PrimitiveKind::Bool => 1,
            PrimitiveKind::Char => 8,
            PrimitiveKind::Short => 16,
            PrimitiveKind::Int => 32,
            PrimitiveKind::Long => 64,
            PrimitiveKind::Void => 0,
        }
    }

    /// The textual LLVM type name for this primitive at pointer depth 0.
    pub fn llvm_name(self) -> &'static str {
        match self {
            PrimitiveKind::Bool => "i1",
            PrimitiveKind::Char => "i8",
            PrimitiveKind::Short => "i16",
            PrimitiveKind::Int => "i32",
            PrimitiveKind::Long => "i64",
            PrimitiveKind::Void => "void",
        }
    }

    pub fn from_keyword(kind: crate::token::TokenKind) -> Option<PrimitiveKind> {
        use crate::token::TokenKind;
        Some(match kind {
            TokenKind::Char => PrimitiveKind::Char,
            TokenKind::Short => PrimitiveKind::Short,
            TokenKind::Int => PrimitiveKind::Int,
            TokenKind::Long => PrimitiveKind::Long,
            TokenKind::Void => PrimitiveKind::Void,
            _ => return None,
        })
    }
}

/// An integer or pointer-to-N-levels-of-integer type, with an optional
/// initializer value attached for declarations.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberType {
    pub kind: PrimitiveKind,
    pub value: i64,
    pub pointer_depth: u32,
}

impl NumberType {
    pub fn new(kind: PrimitiveKind) -> Self {
        NumberType { kind, value: 0, pointer_depth: 0 }
    }

    pub fn pointer_to(kind: PrimitiveKind, depth: u32) -> Self {
        NumberType { kind, value: 0, pointer_depth: depth }
    }

    pub fn is_pointer(&self) -> bool {
        self.pointer_depth > 0
    }

    /// The LLVM textual type for this number: the primitive name if
    /// `pointer_depth == 0`, else `ptr` (all pointers are opaque `ptr` in
    /// the target's LLVM IR dialect).
    pub fn llvm_type(&self) -> String {
        if self.pointer_depth > 0 {
            "ptr".to_string()
        } else {
            self.kind.llvm_name().to_string()
        }
    }
}

/// Fixed-size one-dimensional array (`spec.md` disallows multi-dimensional
/// arrays as a Non-goal; `dimension` is always 1 and exists only to make
/// that restriction explicit at the type level).
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayType {
    pub element: NumberType,
    pub length: i64,
    pub dimension: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionType {
    pub return_type: NumberType,
    pub args: Vec<(String, NumberType)>,
    pub is_prototype: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructType {
    pub name: String,
    pub fields: Vec<(String, TypeDescriptor)>,
}

impl StructType {
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|(n, _)| n == name)
    }

    pub fn field_type(&self, name: &str) -> Option<&TypeDescriptor> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionType {
    pub name: String,
    pub fields: Vec<(String, TypeDescriptor)>,
}

impl UnionType {
    /// The widest primitive among the union's fields - unions are
    /// emitted as `{ widestPrimitive }` (`spec.md` §4.6).
    pub fn widest_field(&self) -> PrimitiveKind {
        self.fields
            .iter()
            .filter_map(|(_, t)| match t {
                TypeDescriptor::Number(n) if n.pointer_depth == 0 => Some(n.kind),
                _ => None,
            })
            .max()
            .unwrap_or(PrimitiveKind::Int)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumType {
    pub name: String,
    pub members: Vec<(String, i64)>,
}

/// The tagged type-descriptor variant at the heart of the type system.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    Number(NumberType),
    Array(ArrayType),
    Function(FunctionType),
    Struct(StructType),
    Union(UnionType),
    Enum(EnumType),
}

impl TypeDescriptor {
    /// The type assigned to AST nodes before the parser has filled in a
    /// real type - `void`, pointer depth 0.
    pub fn void() -> Self {
        TypeDescriptor::Number(NumberType::new(PrimitiveKind::Void))
    }

    pub fn as_number(&self) -> Option<&NumberType> {
        match self {
            TypeDescriptor::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayType> {
        match self {
            TypeDescriptor::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionType> {
        match self {
            TypeDescriptor::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructType> {
        match self {
            TypeDescriptor::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_union(&self) -> Option<&UnionType> {
        match self {
            TypeDescriptor::Union(u) => Some(u),
            _ => None,
        }
    }
}

/// Widen `narrower` toward `wider` - zero-extend is the only direction
/// an arithmetic/comparison operand is ever widened; widening toward a
/// strictly narrower kind is a contradiction in terms and never invoked.
pub fn widen(narrower: PrimitiveKind, wider: PrimitiveKind) -> PrimitiveKind {
    std::cmp::max(narrower, wider)
}

/// Flattened, ordered struct/union/enum registry keyed by tag name, used
/// by the parser when resolving `struct NAME` / `union NAME` references
/// in `match_type`.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    structs: HashMap<String, StructType>,
    unions: HashMap<String, UnionType>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        TypeRegistry::default()
    }

    pub fn declare_struct(&mut self, s: StructType) {
        self.structs.insert(s.name.clone(), s);
    }

    pub fn declare_union(&mut self, u: UnionType) {
        self.unions.insert(u.name.clone(), u);
    }

    pub fn lookup_struct(&self, name: &str) -> Option<&StructType> {
        self.structs.get(name)
    }

    pub fn lookup_union(&self, name: &str) -> Option<&UnionType> {
        self.unions.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_ordering() {
        assert!(PrimitiveKind::Bool < PrimitiveKind::Char);
        assert!(PrimitiveKind::Char < PrimitiveKind::Short);
        assert!(PrimitiveKind::Short < PrimitiveKind::Int);
        assert!(PrimitiveKind::Int < PrimitiveKind::Long);
    }

    #[test]
    fn widen_picks_wider_kind() {
        assert_eq!(widen(PrimitiveKind::Char, PrimitiveKind::Int), PrimitiveKind::Int);
        assert_eq!(widen(PrimitiveKind::Long, PrimitiveKind::Int), PrimitiveKind::Long);
    }

    #[test]
    fn pointer_type_is_ptr_in_llvm() {
        let t = NumberType::pointer_to(PrimitiveKind::Int, 1);
        assert_eq!(t.llvm_type(), "ptr");
        let t = NumberType::new(PrimitiveKind::Int);
        assert_eq!(t.llvm_type(), "i32");
    }

    #[test]
    fn union_widest_field() {
        let u = UnionType {
            name: "U".to_string(),
            fields: vec![
                ("a".to_string(), TypeDescriptor::Number(NumberType::new(PrimitiveKind::Char))),
                ("b".to_string(), TypeDescriptor::Number(NumberType::new(PrimitiveKind::Long))),
            ],
        };
        assert_eq!(u.widest_field(), PrimitiveKind::Long);
    }
}
