//! Symbol-table stack: one global table (GST) plus a stack of local
//! tables (LST), per `spec.md` §3/§4.3/§9.
//!
//! Each scope is a small FNV-1a hash table (`spec.md` §9's "string-keyed
//! hash symbol table" design note) rather than `std`'s default SipHash -
//! symbol names are short and adversarial-input resistance is not a
//! concern for a compiler's own identifier table.

use crate::diagnostics::{EccoError, SourceSpan};
use crate::types::TypeDescriptor;
use std::collections::HashMap;
use std::hash::{BuildHasherDefault, Hasher};

#[derive(Default)]
pub struct FnvHasher(u64);

impl Hasher for FnvHasher {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
        const PRIME: u64 = 0x100000001b3;
        let mut hash = if self.0 == 0 { OFFSET_BASIS } else { self.0 };
        for byte in bytes {
            hash ^= *byte as u64;
            hash = hash.wrapping_mul(PRIME);
        }
        self.0 = hash;
    }
}

type FnvMap<V> = HashMap<String, V, BuildHasherDefault<FnvHasher>>;

/// A value a local variable's declaration resolves to in the LIR
/// generator: either an unallocated name (not yet codegen'd) or a
/// stack-slot register name, once `VAR_DECL` has emitted its `alloca`.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotValue {
    Unallocated,
    Slot(String),
}

/// One entry in a scope: the declared type, whether the name may be
/// written to, whether it is an `enum` member (loaded as a `CONSTANT`
/// rather than via memory), and the most recently allocated slot.
#[derive(Debug, Clone)]
pub struct SymbolTableEntry {
    pub name: String,
    pub ty: TypeDescriptor,
    pub writeable: bool,
    pub is_enum_value: bool,
    pub latest_value: SlotValue,
}

impl SymbolTableEntry {
    pub fn new(name: impl Into<String>, ty: TypeDescriptor, writeable: bool) -> Self {
        SymbolTableEntry {
            name: name.into(),
            ty,
            writeable,
            is_enum_value: false,
            latest_value: SlotValue::Unallocated,
        }
    }
}

#[derive(Default)]
struct Scope {
    entries: FnvMap<SymbolTableEntry>,
}

/// Exactly one global table (index 0) plus a stack of local tables.
/// `lookup` searches innermost-outward; `declare` always targets the
/// current (innermost, or global if no locals are pushed) table.
pub struct SymbolTableStack {
    global: Scope,
    locals: Vec<Scope>,
}

impl SymbolTableStack {
    pub fn new() -> Self {
        SymbolTableStack { global: Scope::default(), locals: Vec::new() }
    }

    /// Enter a new local scope (function body or block).
    pub fn push(&mut self) {
        self.locals.push(Scope::default());
    }

    /// Leave the innermost local scope.
    pub fn pop(&mut self) {
        self.locals.pop();
    }

    pub fn in_global_scope(&self) -> bool {
        self.locals.is_empty()
    }

    fn current_scope_mut(&mut self) -> &mut Scope {
        self.locals.last_mut().unwrap_or(&mut self.global)
    }

    /// Insert `entry` into the current (innermost local, or global)
    /// scope. Raises `IdentifierError` if the name already exists in
    /// *that same* table - shadowing an outer scope is allowed.
    pub fn declare(&mut self, entry: SymbolTableEntry, span: SourceSpan) -> Result<(), EccoError> {
        let name = entry.name.clone();
        let scope = self.current_scope_mut();
        if scope.entries.contains_key(&name) {
            return Err(EccoError::IdentifierError {
                span,
                message: format!("redeclaration of '{}'", name),
            });
        }
        scope.entries.insert(name, entry);
        Ok(())
    }

    /// Register each enum member as a global integer constant.
    pub fn declare_enum(
        &mut self,
        members: &[(String, i64)],
        span: SourceSpan,
    ) -> Result<(), EccoError> {
        for (name, value) in members {
            let mut entry = SymbolTableEntry::new(
                name.clone(),
                TypeDescriptor::Number(crate::types::NumberType {
                    kind: crate::types::PrimitiveKind::Int,
                    value: *value,
                    pointer_depth: 0,
                }),
                false,
            );
            entry.is_enum_value = true;
            if self.global.entries.contains_key(name) {
                return Err(EccoError::IdentifierError {
                    span,
                    message: format!("redeclaration of '{}'", name),
                });
            }
            self.global.entries.insert(name.clone(), entry);
        }
        Ok(())
    }

    /// Look up `name`, searching from the innermost local scope outward
    /// to the global table.
    pub fn lookup(&self, name: &str) -> Option<&SymbolTableEntry> {
        for scope in self.locals.iter().rev() {
            if let Some(entry) = scope.entries.get(name) {
                return Some(entry);
            }
        }
        self.global.entries.get(name)
    }

    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut SymbolTableEntry> {
        for scope in self.locals.iter_mut().rev() {
            if scope.entries.contains_key(name) {
                return scope.entries.get_mut(name);
            }
        }
        self.global.entries.get_mut(name)
    }

    /// `true` if `name` exists in GST but not shadowed by a local.
    pub fn is_global(&self, name: &str) -> bool {
        !self.locals.iter().any(|scope| scope.entries.contains_key(name))
            && self.global.entries.contains_key(name)
    }
}

impl Default for SymbolTableStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NumberType, PrimitiveKind};

    fn int_entry(name: &str) -> SymbolTableEntry {
        SymbolTableEntry::new(name, TypeDescriptor::Number(NumberType::new(PrimitiveKind::Int)), true)
    }

    #[test]
    fn declare_then_lookup_global() {
        let mut st = SymbolTableStack::new();
        st.declare(int_entry("x"), SourceSpan::new(1, 1)).unwrap();
        assert!(st.lookup("x").is_some());
    }

    #[test]
    fn redeclaration_in_same_scope_errors() {
        let mut st = SymbolTableStack::new();
        st.declare(int_entry("x"), SourceSpan::new(1, 1)).unwrap();
        let err = st.declare(int_entry("x"), SourceSpan::new(2, 1)).unwrap_err();
        assert_eq!(err.exit_code(), 6);
    }

    #[test]
    fn local_shadows_global() {
        let mut st = SymbolTableStack::new();
        st.declare(int_entry("x"), SourceSpan::new(1, 1)).unwrap();
        st.push();
        st.declare(int_entry("x"), SourceSpan::new(2, 1)).unwrap();
        assert!(!st.is_global("x"));
        st.pop();
        assert!(st.is_global("x"));
    }

    #[test]
    fn lookup_walks_outward() {
        let mut st = SymbolTableStack::new();
        st.declare(int_entry("g"), SourceSpan::new(1, 1)).unwrap();
        st.push();
        st.declare(int_entry("l"), SourceSpan::new(2, 1)).unwrap();
        assert!(st.lookup("g").is_some());
        assert!(st.lookup("l").is_some());
        st.pop();
        assert!(st.lookup("l").is_none());
    }

    #[test]
    fn enum_members_are_global_constants() {
        let mut st = SymbolTableStack::new();
        st.declare_enum(&[("RED".to_string(), 0), ("GREEN".to_string(), 1)], SourceSpan::new(1, 1))
            .unwrap();
        let red = st.lookup("RED").unwrap();
        assert!(red.is_enum_value);
        assert_eq!(red.ty.as_number().unwrap().value, 0);
    }
}
