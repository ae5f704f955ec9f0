//! Branch assembly for conditions, `if` chains and `while` loops.
//!
//! Fragments are built first and stitched together by an [`Assembler`].
//! Branches name a symbolic [`Label`]; relative displacements are filled in
//! by [`Assembler::finish`] once every fragment's length is known. A
//! displacement is relative to the instruction after the branch.

use crate::frontend::TokenKind;
use crate::instruction::{Instruction, Operation};
use c0_common::{CompileError, CompileResult, ErrorCode, Span};

/// Symbolic branch target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(usize);

/// Instruction buffer with label-based branches.
#[derive(Debug, Default)]
pub struct Assembler {
    code: Vec<Instruction>,
    labels: Vec<Option<usize>>,
    fixups: Vec<(usize, Label)>,
}

impl Assembler {
    /// Empty assembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an unbound label.
    pub fn new_label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }

    /// Bind `label` to the next instruction position.
    pub fn bind(&mut self, label: Label) {
        self.labels[label.0] = Some(self.code.len());
    }

    /// Append a fragment.
    pub fn extend(&mut self, code: impl IntoIterator<Item = Instruction>) {
        self.code.extend(code);
    }

    /// Append a branch to `target` with a placeholder displacement.
    pub fn branch(&mut self, op: Operation, target: Label) {
        self.fixups.push((self.code.len(), target));
        self.code.push(Instruction::with_operand(op, 0));
    }

    /// Resolve every branch and return the finished code.
    ///
    /// # Errors
    ///
    /// Returns `UnresolvedBranch` if a branch targets a label never bound.
    #[allow(clippy::cast_possible_wrap)]
    pub fn finish(mut self) -> CompileResult<Vec<Instruction>> {
        for (at, label) in self.fixups {
            let target = self.labels[label.0].ok_or_else(|| {
                CompileError::analyse(ErrorCode::UnresolvedBranch, Span::default())
            })?;
            self.code[at].operand = Some(target as i64 - (at as i64 + 1));
        }
        Ok(self.code)
    }
}

/// Relational operators usable in a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    Le,
    /// `>=`
    Ge,
}

impl Relation {
    /// Relation for a token kind, if it is one.
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::Eq => Some(Relation::Eq),
            TokenKind::Neq => Some(Relation::Ne),
            TokenKind::Lt => Some(Relation::Lt),
            TokenKind::Gt => Some(Relation::Gt),
            TokenKind::Le => Some(Relation::Le),
            TokenKind::Ge => Some(Relation::Ge),
            _ => None,
        }
    }

    /// Predicate reducing the compare result, and the branch taken when the
    /// relation does not hold.
    fn lowering(self) -> (Option<Operation>, Operation) {
        match self {
            // cmp.i is 0 exactly when equal
            Relation::Eq => (None, Operation::BrTrue),
            Relation::Ne => (None, Operation::BrFalse),
            Relation::Lt => (Some(Operation::SetLt), Operation::BrFalse),
            Relation::Gt => (Some(Operation::SetGt), Operation::BrFalse),
            // set.gt is 1 exactly when `<=` fails
            Relation::Le => (Some(Operation::SetGt), Operation::BrTrue),
            Relation::Ge => (Some(Operation::SetLt), Operation::BrTrue),
        }
    }
}

/// Evaluated condition plus the branch that leaves it when false.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    /// Code leaving the tested value on the stack.
    pub code: Vec<Instruction>,
    /// Conditional branch taken when the condition is false.
    pub exit: Operation,
}

impl Condition {
    /// `left <relation> right`.
    pub fn compare(left: Vec<Instruction>, relation: Relation, right: Vec<Instruction>) -> Self {
        let (predicate, exit) = relation.lowering();
        let mut code = left;
        code.extend(right);
        code.push(Instruction::new(Operation::CmpI));
        code.extend(predicate.map(Instruction::new));
        Self { code, exit }
    }

    /// Bare expression tested for nonzero.
    pub fn truthy(value: Vec<Instruction>) -> Self {
        Self {
            code: value,
            exit: Operation::BrFalse,
        }
    }
}

/// One arm of an `if` chain. A trailing `else` has no condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    /// Guard, or `None` for `else`.
    pub condition: Option<Condition>,
    /// Block code.
    pub block: Vec<Instruction>,
}

/// `if` / `else if` / `else` chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IfChain {
    clauses: Vec<Clause>,
}

impl IfChain {
    /// Empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a guarded clause.
    pub fn add_clause(&mut self, condition: Condition, block: Vec<Instruction>) {
        self.clauses.push(Clause {
            condition: Some(condition),
            block,
        });
    }

    /// Append the final `else` block.
    pub fn add_else(&mut self, block: Vec<Instruction>) {
        self.clauses.push(Clause {
            condition: None,
            block,
        });
    }

    /// Assemble the chain. The first clause whose guard holds runs; the
    /// others are skipped.
    ///
    /// # Errors
    ///
    /// Returns `UnresolvedBranch` only on an internal labelling fault.
    pub fn generate(self) -> CompileResult<Vec<Instruction>> {
        let mut asm = Assembler::new();
        let end = asm.new_label();
        let last = self.clauses.len().saturating_sub(1);
        for (index, clause) in self.clauses.into_iter().enumerate() {
            let next = asm.new_label();
            if let Some(condition) = clause.condition {
                asm.extend(condition.code);
                asm.branch(condition.exit, next);
            }
            asm.extend(clause.block);
            if index != last {
                asm.branch(Operation::Br, end);
            }
            asm.bind(next);
        }
        asm.bind(end);
        asm.finish()
    }
}

/// `while` loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhileLoop {
    /// Loop guard, evaluated before every iteration.
    pub condition: Condition,
    /// Loop body.
    pub body: Vec<Instruction>,
}

impl WhileLoop {
    /// Assemble the loop.
    ///
    /// # Errors
    ///
    /// Returns `UnresolvedBranch` only on an internal labelling fault.
    pub fn generate(self) -> CompileResult<Vec<Instruction>> {
        let mut asm = Assembler::new();
        let head = asm.new_label();
        let exit = asm.new_label();
        asm.bind(head);
        asm.extend(self.condition.code);
        asm.branch(self.condition.exit, exit);
        asm.extend(self.body);
        asm.branch(Operation::Br, head);
        asm.bind(exit);
        asm.finish()
    }
}
