//! Scoped symbol table and module assembly.
//!
//! Symbols live in an append-only arena. A separate live index lists the
//! records visible from the current scope, innermost last. Leaving a scope
//! truncates the live index; the records stay in the arena.
//!
//! The table also owns the module under construction: every declaration
//! allocates its storage (global slot, local slot, parameter slot or
//! function entry) at the moment it is declared.

use crate::instruction::{Instruction, Operation};
use crate::module::{Function, GlobalEntry, Module};
use c0_common::{CompileError, CompileResult, ErrorCode, Span};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Scope depth of the global frame.
pub const GLOBAL_DEPTH: u32 = 1;

/// What a symbol names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SymbolKind {
    /// `let` or `const` variable.
    Variable,
    /// Function parameter.
    Parameter,
    /// Function.
    Function,
    /// String literal stored in the global table.
    StringConstant,
}

/// Declared element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ValueType {
    /// 64-bit integer.
    Int,
    /// No value.
    #[default]
    Void,
    /// String address.
    String,
}

impl ValueType {
    /// Stack slots occupied by a value of this type.
    pub fn slots(self) -> u32 {
        match self {
            ValueType::Void => 0,
            ValueType::Int | ValueType::String => 1,
        }
    }
}

/// Index of a record in the symbol arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(usize);

/// A declared symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolEntry {
    /// Source name.
    pub name: String,
    /// Symbol kind.
    pub kind: SymbolKind,
    /// Element type; the return type for functions.
    pub ty: ValueType,
    /// Scope depth at declaration.
    pub depth: u32,
    /// Whether assignment is forbidden.
    pub is_constant: bool,
    /// Whether the symbol has been assigned.
    pub is_initialized: bool,
    /// Table-wide unique id, allocated in declaration order.
    pub slot: u64,
    /// Frame-relative offset: global id, local index, parameter index or
    /// function index depending on `kind` and `depth`.
    pub offset: u32,
    /// Declaration location.
    pub span: Span,
}

/// Arguments to [`SymbolTable::declare`].
#[derive(Debug, Clone, Copy)]
pub struct Declaration<'a> {
    /// Source name.
    pub name: &'a str,
    /// Symbol kind.
    pub kind: SymbolKind,
    /// Element type.
    pub ty: ValueType,
    /// Whether assignment is forbidden.
    pub constant: bool,
    /// Whether the symbol starts out assigned.
    pub initialized: bool,
    /// Declaration location.
    pub span: Span,
}

impl<'a> Declaration<'a> {
    /// Mutable, uninitialized declaration.
    pub fn new(name: &'a str, kind: SymbolKind, ty: ValueType, span: Span) -> Self {
        Self {
            name,
            kind,
            ty,
            constant: false,
            initialized: false,
            span,
        }
    }

    /// Set the constant flag.
    #[must_use]
    pub fn constant(mut self, constant: bool) -> Self {
        self.constant = constant;
        self
    }

    /// Set the initialized flag.
    #[must_use]
    pub fn initialized(mut self, initialized: bool) -> Self {
        self.initialized = initialized;
        self
    }
}

/// Parameter and return types of a callable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Signature {
    /// Parameter types in declaration order.
    pub params: Vec<ValueType>,
    /// Return type.
    pub ret: ValueType,
}

/// Resolved call target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallTarget {
    /// Callee signature.
    pub signature: Signature,
    /// `call <index>` or `callname <global id>`.
    pub call: Instruction,
}

/// Built-in library functions resolved by name: (name, parameter count, return type).
pub const BUILTINS: [(&str, usize, ValueType); 6] = [
    ("getint", 0, ValueType::Int),
    ("getchar", 0, ValueType::Int),
    ("putint", 1, ValueType::Void),
    ("putchar", 1, ValueType::Void),
    ("putstr", 1, ValueType::Void),
    ("putln", 0, ValueType::Void),
];

/// Scoped symbol table owning the module under construction.
#[derive(Debug)]
pub struct SymbolTable {
    records: Vec<SymbolEntry>,
    live: Vec<usize>,
    next_slot: u64,
    module: Module,
    signatures: Vec<Signature>,
    current: usize,
    current_symbol: Option<usize>,
    builtins_enabled: bool,
    builtin_ids: HashMap<&'static str, u32>,
}

impl SymbolTable {
    /// Create a table whose function 0 is the start function `start_name`.
    pub fn new(start_name: &str, builtins_enabled: bool) -> Self {
        let mut table = Self {
            records: Vec::new(),
            live: Vec::new(),
            next_slot: 0,
            module: Module::default(),
            signatures: Vec::new(),
            current: 0,
            current_symbol: None,
            builtins_enabled,
            builtin_ids: HashMap::new(),
        };
        let name_id = table.push_global(GlobalEntry::string(start_name));
        table.module.functions.push(Function::new(name_id));
        table.signatures.push(Signature::default());
        table
    }

    /// Declare a symbol at `depth`.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateDeclaration` if the name is already declared at `depth`.
    pub fn declare(&mut self, decl: Declaration<'_>, depth: u32) -> CompileResult<SymbolId> {
        let duplicate = self.live.iter().any(|&i| {
            let entry = &self.records[i];
            entry.depth == depth && entry.name == decl.name
        });
        if duplicate {
            return Err(CompileError::analyse(
                ErrorCode::DuplicateDeclaration,
                decl.span,
            ));
        }

        let offset = match decl.kind {
            SymbolKind::Function => self.push_function(decl.name, decl.ty, decl.span),
            SymbolKind::Parameter => {
                let function = &mut self.module.functions[self.current];
                let index = function.param_slots;
                function.param_slots += 1;
                self.signatures[self.current].params.push(decl.ty);
                index
            }
            SymbolKind::Variable if depth <= GLOBAL_DEPTH => {
                self.push_global(GlobalEntry::slot(decl.constant))
            }
            SymbolKind::Variable => {
                let function = &mut self.module.functions[self.current];
                let index = function.local_slots;
                function.local_slots += 1;
                index
            }
            SymbolKind::StringConstant => self.push_global(GlobalEntry::string(decl.name)),
        };

        let id = self.push_record(decl, depth, offset);
        match decl.kind {
            SymbolKind::StringConstant => {}
            SymbolKind::Function => {
                self.current_symbol = Some(id.0);
                self.live.push(id.0);
            }
            SymbolKind::Variable | SymbolKind::Parameter => self.live.push(id.0),
        }
        Ok(id)
    }

    /// Find the innermost visible symbol named `name`.
    ///
    /// # Errors
    ///
    /// Returns `NotDeclared` if no such symbol is visible.
    pub fn lookup(&self, name: &str, span: Span) -> CompileResult<&SymbolEntry> {
        self.find(name)
            .map(|i| &self.records[i])
            .ok_or_else(|| CompileError::analyse(ErrorCode::NotDeclared, span))
    }

    /// Check that `name` may be the target of an assignment.
    ///
    /// # Errors
    ///
    /// Returns `NotDeclared`, `AssignedToFunction` or `AssignToConstant`.
    pub fn check_assignable(&self, name: &str, span: Span) -> CompileResult<SymbolId> {
        let index = self
            .find(name)
            .ok_or_else(|| CompileError::analyse(ErrorCode::NotDeclared, span))?;
        let entry = &self.records[index];
        if entry.kind == SymbolKind::Function {
            return Err(CompileError::analyse(ErrorCode::AssignedToFunction, span));
        }
        if entry.is_constant {
            return Err(CompileError::analyse(ErrorCode::AssignToConstant, span));
        }
        Ok(SymbolId(index))
    }

    /// Mark the innermost visible `name` as assigned.
    ///
    /// # Errors
    ///
    /// Returns `NotDeclared` if no such symbol is visible.
    pub fn mark_initialized(&mut self, name: &str, span: Span) -> CompileResult<()> {
        let index = self
            .find(name)
            .ok_or_else(|| CompileError::analyse(ErrorCode::NotDeclared, span))?;
        self.records[index].is_initialized = true;
        Ok(())
    }

    /// Mark a known symbol as assigned.
    pub fn initialize(&mut self, id: SymbolId) {
        self.records[id.0].is_initialized = true;
    }

    /// Discard every symbol declared at `depth` or deeper. The global frame is kept.
    pub fn exit_scope(&mut self, depth: u32) {
        let depth = depth.max(GLOBAL_DEPTH + 1);
        let keep = self
            .live
            .iter()
            .rposition(|&i| self.records[i].depth < depth)
            .map_or(0, |pos| pos + 1);
        self.live.truncate(keep);
    }

    /// Store a string literal as a new global and return its id.
    ///
    /// Every call allocates a fresh entry, equal contents included.
    pub fn add_global_string(&mut self, text: &str, span: Span) -> u32 {
        let id = self.push_global(GlobalEntry::string(text));
        let decl = Declaration::new(text, SymbolKind::StringConstant, ValueType::String, span)
            .constant(true)
            .initialized(true);
        self.push_record(decl, GLOBAL_DEPTH, id);
        id
    }

    /// Resolve the callee of a call expression.
    ///
    /// # Errors
    ///
    /// Returns `ExpectNameToken` if the name is not a function and
    /// `NotDeclared` if nothing by that name is visible.
    pub fn resolve_call(&mut self, name: &str, span: Span) -> CompileResult<CallTarget> {
        if let Some(index) = self.find(name) {
            let entry = &self.records[index];
            if entry.kind != SymbolKind::Function {
                return Err(CompileError::analyse(ErrorCode::ExpectNameToken, span));
            }
            let function = entry.offset;
            let signature = self.signatures[function as usize].clone();
            return Ok(CallTarget {
                signature,
                call: Instruction::indexed(Operation::Call, function),
            });
        }

        let builtin = BUILTINS
            .iter()
            .find(|(builtin, _, _)| *builtin == name)
            .copied()
            .filter(|_| self.builtins_enabled);
        let Some((builtin, arity, ret)) = builtin else {
            return Err(CompileError::analyse(ErrorCode::NotDeclared, span));
        };
        let id = match self.builtin_ids.get(builtin) {
            Some(&id) => id,
            None => {
                let id = self.push_global(GlobalEntry::string(builtin));
                self.builtin_ids.insert(builtin, id);
                id
            }
        };
        Ok(CallTarget {
            signature: Signature {
                params: vec![ValueType::Int; arity],
                ret,
            },
            call: Instruction::indexed(Operation::CallName, id),
        })
    }

    /// Append code to the start function (global depth) or the current function.
    pub fn append_instructions(&mut self, depth: u32, code: Vec<Instruction>) {
        let target = if depth <= GLOBAL_DEPTH { 0 } else { self.current };
        self.module.functions[target].body.extend(code);
    }

    /// Set the return type of the function being analysed.
    pub fn set_return_type(&mut self, ty: ValueType) {
        self.module.functions[self.current].return_slots = ty.slots();
        self.signatures[self.current].ret = ty;
        if let Some(index) = self.current_symbol {
            self.records[index].ty = ty;
        }
    }

    /// Return type of the function being analysed.
    pub fn current_return_type(&self) -> ValueType {
        self.signatures[self.current].ret
    }

    /// The function being analysed.
    pub fn current_function(&self) -> &Function {
        &self.module.functions[self.current]
    }

    /// Read access to a record.
    pub fn entry(&self, id: SymbolId) -> &SymbolEntry {
        &self.records[id.0]
    }

    /// Finish the start function and return the module.
    ///
    /// The start function calls `main_name` if a function by that name was
    /// declared in the global frame.
    pub fn finish(mut self, main_name: &str) -> Module {
        let main = self
            .live
            .iter()
            .map(|&i| &self.records[i])
            .find(|entry| {
                entry.kind == SymbolKind::Function
                    && entry.depth == GLOBAL_DEPTH
                    && entry.name == main_name
            })
            .map(|entry| entry.offset);
        match main {
            Some(index) => {
                let ret = self.module.functions[index as usize].return_slots;
                let start = &mut self.module.functions[0].body;
                start.push(Instruction::indexed(Operation::StackAlloc, ret));
                start.push(Instruction::indexed(Operation::Call, index));
                if ret > 0 {
                    start.push(Instruction::indexed(Operation::PopN, ret));
                }
            }
            None => warn!(entry = main_name, "Entry function not declared"),
        }
        debug!(
            globals = self.module.globals.len(),
            functions = self.module.functions.len(),
            symbols = self.records.len(),
            "Module finished"
        );
        self.module
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.live
            .iter()
            .rev()
            .copied()
            .find(|&i| self.records[i].name == name)
    }

    fn push_record(&mut self, decl: Declaration<'_>, depth: u32, offset: u32) -> SymbolId {
        let id = SymbolId(self.records.len());
        self.records.push(SymbolEntry {
            name: decl.name.to_string(),
            kind: decl.kind,
            ty: decl.ty,
            depth,
            is_constant: decl.constant,
            is_initialized: decl.initialized,
            slot: self.next_slot,
            offset,
            span: decl.span,
        });
        self.next_slot += 1;
        id
    }

    #[allow(clippy::cast_possible_truncation)]
    fn push_global(&mut self, entry: GlobalEntry) -> u32 {
        let id = self.module.globals.len() as u32;
        self.module.globals.push(entry);
        id
    }

    #[allow(clippy::cast_possible_truncation)]
    fn push_function(&mut self, name: &str, ret: ValueType, span: Span) -> u32 {
        let name_id = self.push_global(GlobalEntry::string(name));
        let mut function = Function::declared_at(name_id, span);
        function.return_slots = ret.slots();
        self.current = self.module.functions.len();
        self.module.functions.push(function);
        self.signatures.push(Signature {
            params: Vec::new(),
            ret,
        });
        self.current as u32
    }
}
