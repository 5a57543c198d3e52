//! Per-compilation code generation state: a module-wide label counter
//! and globals buffer, plus the per-function register counter and
//! output stream that are reset at the start of each function
//! (`spec.md` §4.6/§5).

use std::fmt::Write as _;

use crate::codegen::values::{LirValue, ValueKind};
use crate::diagnostics::{EccoError, SourceSpan};
use crate::symtab::{SlotValue, SymbolTableStack};
use crate::types::{PrimitiveKind, TypeRegistry};

pub(super) struct CodeGen {
    /// Everything emitted so far for the function currently being
    /// generated; functions are assembled one at a time and appended to
    /// `module_text` once complete.
    pub(super) out: String,
    /// Global variable definitions and string/format constants,
    /// accumulated across the whole module and spliced into the final
    /// text at the `GLOBALS_PLACEHOLDER` position (`spec.md` §4.6).
    pub(super) globals: String,
    /// Shared across every function: LLVM requires module-unique labels.
    pub(super) label_counter: u32,
    /// Reset to zero at the start of each function.
    pub(super) reg_counter: u32,
    pub(super) types: TypeRegistry,
    /// The generator's own symbol table, built while walking the AST in
    /// lockstep with the scopes the parser already validated. Entries
    /// here additionally track each variable's allocated address.
    pub(super) symtab: SymbolTableStack,
    /// Whether the current basic block already ends in a terminator
    /// (`ret`/`br`). A fresh label clears this; `codegen_function` uses
    /// it to avoid emitting a second terminator after an explicit
    /// `return`.
    pub(super) terminated: bool,
    /// `0` disables constant folding: integer literals are stored to and
    /// reloaded from a stack slot instead of becoming a bare `CONSTANT`
    /// (`spec.md` §4.6/§9).
    pub(super) opt_level: u8,
    /// Per-function free-slot list for literal storage at `--opt=0`,
    /// reset alongside `reg_counter` at each function start (`spec.md`
    /// §9's "Free registers" list).
    pub(super) free_slots: Vec<String>,
}

pub(super) const GLOBALS_PLACEHOLDER: &str = "\0ECCO_GLOBALS_PLACEHOLDER\0";

impl CodeGen {
    pub(super) fn new(opt_level: u8) -> Self {
        CodeGen {
            out: String::new(),
            globals: String::new(),
            label_counter: 0,
            reg_counter: 0,
            types: TypeRegistry::new(),
            symtab: SymbolTableStack::new(),
            terminated: false,
            opt_level,
            free_slots: Vec::new(),
        }
    }

    /// A stack slot to store a folded-out literal into at `--opt=0`:
    /// reuse one freed by an earlier literal in this function, or
    /// allocate a fresh one.
    pub(super) fn claim_literal_slot(&mut self) -> String {
        self.free_slots.pop().unwrap_or_else(|| self.alloca("i32"))
    }

    pub(super) fn release_literal_slot(&mut self, slot: String) {
        self.free_slots.push(slot);
    }

    pub(super) fn new_register(&mut self) -> String {
        let name = format!("%r{}", self.reg_counter);
        self.reg_counter += 1;
        name
    }

    pub(super) fn new_label(&mut self, prefix: &str) -> String {
        let name = format!("{}.{}", prefix, self.label_counter);
        self.label_counter += 1;
        name
    }

    pub(super) fn emit(&mut self, line: impl AsRef<str>) {
        let line = line.as_ref();
        self.terminated = line.starts_with("ret ") || line == "ret void" || line.starts_with("br ");
        self.out.push_str("  ");
        self.out.push_str(line);
        self.out.push('\n');
    }

    pub(super) fn emit_label(&mut self, label: &str) {
        // LLVM requires the preceding block to be terminated; every
        // call site of `emit_label` follows a `br`/`ret` emitted just
        // above, so this only ever introduces a fresh block.
        writeln!(self.out, "{}:", label).unwrap();
        self.terminated = false;
    }

    pub(super) fn alloca(&mut self, llvm_type: &str) -> String {
        let reg = self.new_register();
        self.emit(format!("{} = alloca {}", reg, llvm_type));
        reg
    }

    /// Load through `value` if it is an address rather than an
    /// already-loaded value (`spec.md` §4.6's `ensure_loaded`).
    pub(super) fn ensure_loaded(&mut self, value: LirValue) -> LirValue {
        if !value.is_address {
            return value;
        }
        let loaded_type = value.llvm_type();
        let reg = self.new_register();
        self.emit(format!("{} = load {}, ptr {}", reg, loaded_type, value.operand()));
        LirValue::register(reg, value.prim_kind, value.pointer_depth)
    }

    /// Widen or truncate an integer value to `target` (`spec.md` §4.6). A
    /// constant is adjusted in place with no emitted instruction; widths
    /// that already match the target are likewise a no-op.
    pub(super) fn int_resize(&mut self, value: LirValue, target: PrimitiveKind) -> LirValue {
        if value.pointer_depth > 0 || value.prim_kind == target {
            return value;
        }
        if value.kind == ValueKind::Constant {
            let resized = clamp_constant(value.name.parse().unwrap_or(0), target);
            return LirValue::constant(resized, target);
        }
        let from_width = value.prim_kind.bit_width();
        let to_width = target.bit_width();
        if from_width == to_width {
            return LirValue { prim_kind: target, ..value };
        }
        let reg = self.new_register();
        let op = if to_width > from_width { "zext" } else { "trunc" };
        self.emit(format!(
            "{} = {} {} {} to {}",
            reg,
            op,
            value.prim_kind.llvm_name(),
            value.operand(),
            target.llvm_name()
        ));
        LirValue::register(reg, target, 0)
    }

    pub(super) fn declare_local(
        &mut self,
        name: &str,
        entry: crate::symtab::SymbolTableEntry,
        addr: String,
        span: SourceSpan,
    ) -> Result<(), EccoError> {
        let mut entry = entry;
        entry.latest_value = SlotValue::Slot(addr);
        self.symtab.declare(entry, span)
    }
}

/// Truncate `value` to `target`'s bit width with two's-complement
/// wraparound, matching what a `trunc` instruction would have produced
/// had the value not been a constant.
fn clamp_constant(value: i64, target: PrimitiveKind) -> i64 {
    match target.bit_width() {
        1 => value & 1,
        8 => value as i8 as i64,
        16 => value as i16 as i64,
        32 => value as i32 as i64,
        _ => value,
    }
}
