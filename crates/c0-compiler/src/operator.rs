//! Deferred emission of binary operators.
//!
//! Operands are emitted as soon as they are parsed, while operators wait on
//! an [`OperatorStack`] until precedence decides their position. One stack
//! serves one complete expression; it is consumed by [`OperatorStack::finish`],
//! which flushes whatever is still pending.

use crate::frontend::TokenKind;
use crate::instruction::{Instruction, Operation};

/// Arithmetic binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
}

impl BinaryOperator {
    /// Operator for a token kind, if it is one.
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::Plus => Some(BinaryOperator::Add),
            TokenKind::Minus => Some(BinaryOperator::Sub),
            TokenKind::Mul => Some(BinaryOperator::Mul),
            TokenKind::Div => Some(BinaryOperator::Div),
            _ => None,
        }
    }

    /// Binding strength; higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOperator::Add | BinaryOperator::Sub => 1,
            BinaryOperator::Mul | BinaryOperator::Div => 2,
        }
    }

    /// Arithmetic instruction for this operator.
    pub fn instruction(self) -> Instruction {
        Instruction::new(match self {
            BinaryOperator::Add => Operation::AddI,
            BinaryOperator::Sub => Operation::SubI,
            BinaryOperator::Mul => Operation::MulI,
            BinaryOperator::Div => Operation::DivI,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Operator(BinaryOperator),
    Group,
}

/// Operators waiting to be emitted for one expression.
#[derive(Debug, Default)]
#[must_use = "pending operators are lost unless the stack is finished"]
pub struct OperatorStack {
    pending: Vec<Pending>,
}

impl OperatorStack {
    /// Empty stack for a new expression.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `op`, first emitting every pending operator that binds at
    /// least as tightly.
    pub fn push(&mut self, op: BinaryOperator, out: &mut Vec<Instruction>) {
        while let Some(&Pending::Operator(top)) = self.pending.last() {
            if top.precedence() < op.precedence() {
                break;
            }
            out.push(top.instruction());
            self.pending.pop();
        }
        self.pending.push(Pending::Operator(op));
    }

    /// Enter a parenthesized group.
    pub fn open_group(&mut self) {
        self.pending.push(Pending::Group);
    }

    /// Leave a parenthesized group, emitting the operators pending inside it.
    pub fn close_group(&mut self, out: &mut Vec<Instruction>) {
        while let Some(pending) = self.pending.pop() {
            match pending {
                Pending::Operator(op) => out.push(op.instruction()),
                Pending::Group => break,
            }
        }
    }

    /// Emit every pending operator and consume the stack.
    pub fn finish(mut self, out: &mut Vec<Instruction>) {
        while let Some(pending) = self.pending.pop() {
            if let Pending::Operator(op) = pending {
                out.push(op.instruction());
            }
        }
    }
}
