//! Stack machine instructions.
//!
//! Each instruction is an operation plus an optional immediate. The
//! immediate's encoded width depends on the operation, see
//! [`Operation::operand`].

use serde::Serialize;
use std::fmt;

/// Encoded width of an instruction's immediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandWidth {
    /// No immediate.
    None,
    /// Unsigned 32-bit slot count or index.
    U32,
    /// Unsigned 64-bit literal.
    U64,
    /// Signed 32-bit branch displacement.
    I32,
}

/// Virtual machine operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Operation {
    /// Do nothing.
    Nop,
    /// Push a 64-bit literal.
    Push,
    /// Discard one slot.
    Pop,
    /// Discard N slots.
    PopN,
    /// Duplicate the top slot.
    Dup,

    // Addressing
    /// Address of a local-frame slot.
    LocA,
    /// Address of an argument-frame slot.
    ArgA,
    /// Address of a global slot.
    GlobA,

    // Memory
    /// Load 64 bits through an address.
    Load64,
    /// Store 64 bits through an address.
    Store64,
    /// Reserve N zeroed stack slots.
    StackAlloc,

    // Arithmetic
    /// Integer addition.
    AddI,
    /// Integer subtraction.
    SubI,
    /// Integer multiplication.
    MulI,
    /// Integer division.
    DivI,
    /// Integer negation.
    NegI,

    // Comparison
    /// Three-way integer compare: -1, 0 or 1.
    CmpI,
    /// 1 if the compare result is negative.
    SetLt,
    /// 1 if the compare result is positive.
    SetGt,

    // Control flow
    /// Unconditional relative branch.
    Br,
    /// Branch if the popped value is zero.
    BrFalse,
    /// Branch if the popped value is nonzero.
    BrTrue,
    /// Call by function index.
    Call,
    /// Return from the current function.
    Ret,
    /// Call by the global id of the function's name.
    CallName,
}

impl Operation {
    /// Every operation, in opcode order.
    pub const ALL: [Operation; 25] = [
        Operation::Nop,
        Operation::Push,
        Operation::Pop,
        Operation::PopN,
        Operation::Dup,
        Operation::LocA,
        Operation::ArgA,
        Operation::GlobA,
        Operation::Load64,
        Operation::Store64,
        Operation::StackAlloc,
        Operation::AddI,
        Operation::SubI,
        Operation::MulI,
        Operation::DivI,
        Operation::CmpI,
        Operation::NegI,
        Operation::SetLt,
        Operation::SetGt,
        Operation::Br,
        Operation::BrFalse,
        Operation::BrTrue,
        Operation::Call,
        Operation::Ret,
        Operation::CallName,
    ];

    /// Binary opcode.
    pub const fn opcode(self) -> u8 {
        match self {
            Operation::Nop => 0x00,
            Operation::Push => 0x01,
            Operation::Pop => 0x02,
            Operation::PopN => 0x03,
            Operation::Dup => 0x04,
            Operation::LocA => 0x0a,
            Operation::ArgA => 0x0b,
            Operation::GlobA => 0x0c,
            Operation::Load64 => 0x13,
            Operation::Store64 => 0x17,
            Operation::StackAlloc => 0x1a,
            Operation::AddI => 0x20,
            Operation::SubI => 0x21,
            Operation::MulI => 0x22,
            Operation::DivI => 0x23,
            Operation::CmpI => 0x30,
            Operation::NegI => 0x34,
            Operation::SetLt => 0x39,
            Operation::SetGt => 0x3a,
            Operation::Br => 0x41,
            Operation::BrFalse => 0x42,
            Operation::BrTrue => 0x43,
            Operation::Call => 0x48,
            Operation::Ret => 0x49,
            Operation::CallName => 0x4a,
        }
    }

    /// Look up an operation by opcode.
    pub fn from_opcode(opcode: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.opcode() == opcode)
    }

    /// Width of the immediate that follows the opcode.
    pub const fn operand(self) -> OperandWidth {
        match self {
            Operation::Push => OperandWidth::U64,
            Operation::PopN
            | Operation::LocA
            | Operation::ArgA
            | Operation::GlobA
            | Operation::StackAlloc
            | Operation::Call
            | Operation::CallName => OperandWidth::U32,
            Operation::Br | Operation::BrFalse | Operation::BrTrue => OperandWidth::I32,
            _ => OperandWidth::None,
        }
    }

    /// Whether this is a relative branch.
    pub const fn is_branch(self) -> bool {
        matches!(self, Operation::Br | Operation::BrFalse | Operation::BrTrue)
    }

    /// Assembly mnemonic.
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Operation::Nop => "nop",
            Operation::Push => "push",
            Operation::Pop => "pop",
            Operation::PopN => "popn",
            Operation::Dup => "dup",
            Operation::LocA => "loca",
            Operation::ArgA => "arga",
            Operation::GlobA => "globa",
            Operation::Load64 => "load.64",
            Operation::Store64 => "store.64",
            Operation::StackAlloc => "stackalloc",
            Operation::AddI => "add.i",
            Operation::SubI => "sub.i",
            Operation::MulI => "mul.i",
            Operation::DivI => "div.i",
            Operation::NegI => "neg.i",
            Operation::CmpI => "cmp.i",
            Operation::SetLt => "set.lt",
            Operation::SetGt => "set.gt",
            Operation::Br => "br",
            Operation::BrFalse => "br.false",
            Operation::BrTrue => "br.true",
            Operation::Call => "call",
            Operation::Ret => "ret",
            Operation::CallName => "callname",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// A single instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Instruction {
    /// Operation to perform.
    pub op: Operation,
    /// Immediate operand. `push` stores the raw 64-bit pattern.
    pub operand: Option<i64>,
}

impl Instruction {
    /// Instruction without an immediate.
    pub const fn new(op: Operation) -> Self {
        Self { op, operand: None }
    }

    /// Instruction with an immediate.
    pub const fn with_operand(op: Operation, operand: i64) -> Self {
        Self {
            op,
            operand: Some(operand),
        }
    }

    /// `push value`.
    #[allow(clippy::cast_possible_wrap)]
    pub const fn push(value: u64) -> Self {
        Self::with_operand(Operation::Push, value as i64)
    }

    /// Instruction with a 32-bit index or count.
    pub fn indexed(op: Operation, index: u32) -> Self {
        Self::with_operand(op, i64::from(index))
    }

    /// Immediate, or zero when absent.
    pub fn operand_or_zero(&self) -> i64 {
        self.operand.unwrap_or(0)
    }
}

impl fmt::Display for Instruction {
    #[allow(clippy::cast_sign_loss)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.op.operand(), self.operand) {
            (OperandWidth::U64, Some(value)) => write!(f, "{} {}", self.op, value as u64),
            (_, Some(value)) => write!(f, "{} {}", self.op, value),
            (_, None) => write!(f, "{}", self.op),
        }
    }
}
