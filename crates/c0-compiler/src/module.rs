//! Compiled module: the global table and the function table.

use crate::instruction::Instruction;
use c0_common::Span;
use serde::Serialize;

/// Size in bytes of a scalar global slot.
pub const SLOT_BYTES: usize = 8;

/// A compiled module.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Module {
    /// Global entries, indexed by global id.
    pub globals: Vec<GlobalEntry>,
    /// Functions, indexed by function id. Function 0 is the start function.
    pub functions: Vec<Function>,
}

impl Module {
    /// Find a function by name.
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions
            .iter()
            .find(|function| self.global_text(function.name_id) == Some(name))
    }

    /// Contents of a global as UTF-8 text, if valid.
    pub fn global_text(&self, id: u32) -> Option<&str> {
        let entry = self.globals.get(usize::try_from(id).ok()?)?;
        std::str::from_utf8(&entry.value).ok()
    }

    /// Total instruction count across functions.
    pub fn instruction_count(&self) -> usize {
        self.functions.iter().map(|f| f.body.len()).sum()
    }
}

/// A global table entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlobalEntry {
    /// Read-only marker.
    pub is_const: bool,
    /// Raw contents: zeroed for variable slots, UTF-8 bytes for strings.
    pub value: Vec<u8>,
}

impl GlobalEntry {
    /// Zero-initialized scalar slot.
    pub fn slot(is_const: bool) -> Self {
        Self {
            is_const,
            value: vec![0; SLOT_BYTES],
        }
    }

    /// Constant string payload.
    pub fn string(text: &str) -> Self {
        Self {
            is_const: true,
            value: text.as_bytes().to_vec(),
        }
    }
}

/// A compiled function.
///
/// Equality compares the encoded fields only; `span` is not written to the
/// binary module.
#[derive(Debug, Clone, Serialize)]
pub struct Function {
    /// Global id of the function's name.
    pub name_id: u32,
    /// Return slots: 0 for `void`, 1 for `int`.
    pub return_slots: u32,
    /// Parameter slots.
    pub param_slots: u32,
    /// Local variable slots.
    pub local_slots: u32,
    /// Body instructions.
    pub body: Vec<Instruction>,
    /// Position of the declaration, for diagnostics.
    pub span: Span,
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        self.name_id == other.name_id
            && self.return_slots == other.return_slots
            && self.param_slots == other.param_slots
            && self.local_slots == other.local_slots
            && self.body == other.body
    }
}

impl Eq for Function {}

impl Function {
    /// Empty function named by global `name_id`.
    pub fn new(name_id: u32) -> Self {
        Self {
            name_id,
            return_slots: 0,
            param_slots: 0,
            local_slots: 0,
            body: Vec::new(),
            span: Span::default(),
        }
    }

    /// Empty function declared at `span`.
    pub fn declared_at(name_id: u32, span: Span) -> Self {
        Self {
            span,
            ..Self::new(name_id)
        }
    }
}
