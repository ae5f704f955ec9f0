//! Binary module encoding.
//!
//! Layout, all integers big-endian:
//!
//! ```text
//! magic: u32, version: u32
//! globals.count: u32
//!   is_const: u8, len: u32, bytes[len]
//! functions.count: u32
//!   name: u32, ret_slots: u32, param_slots: u32, loc_slots: u32,
//!   body.count: u32, instructions
//! instruction: opcode u8, then u64 / u32 / i32 immediate or nothing
//! ```

use crate::instruction::{Instruction, OperandWidth, Operation};
use crate::module::{Function, GlobalEntry, Module};
use c0_common::ModuleConfig;
use std::io::Write;
use thiserror::Error;

/// Failure to decode a binary module.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The magic number does not match.
    #[error("bad magic number {found:#010x}, expected {expected:#010x}")]
    BadMagic {
        /// Configured magic number.
        expected: u32,
        /// Magic number read.
        found: u32,
    },

    /// The version does not match.
    #[error("unsupported module version {found}, expected {expected}")]
    UnsupportedVersion {
        /// Configured version.
        expected: u32,
        /// Version read.
        found: u32,
    },

    /// Input ended inside a field.
    #[error("unexpected end of module at byte {0}")]
    Truncated(usize),

    /// An opcode with no known operation.
    #[error("unknown opcode {opcode:#04x} at byte {offset}")]
    UnknownOpcode {
        /// Opcode byte.
        opcode: u8,
        /// Position of the opcode.
        offset: usize,
    },

    /// Bytes remain after the function table.
    #[error("{0} trailing bytes after module")]
    TrailingBytes(usize),
}

/// Encode `module` with the given header.
pub fn emit(module: &Module, header: &ModuleConfig) -> Vec<u8> {
    let mut out = Vec::new();
    put_u32(&mut out, header.magic);
    put_u32(&mut out, header.version);

    put_len(&mut out, module.globals.len());
    for global in &module.globals {
        out.push(u8::from(global.is_const));
        put_len(&mut out, global.value.len());
        out.extend_from_slice(&global.value);
    }

    put_len(&mut out, module.functions.len());
    for function in &module.functions {
        put_u32(&mut out, function.name_id);
        put_u32(&mut out, function.return_slots);
        put_u32(&mut out, function.param_slots);
        put_u32(&mut out, function.local_slots);
        put_len(&mut out, function.body.len());
        for instruction in &function.body {
            put_instruction(&mut out, instruction);
        }
    }
    out
}

/// Encode `module` into `sink`.
///
/// # Errors
///
/// Returns any I/O error raised by the sink.
pub fn write_module<W: Write>(
    module: &Module,
    header: &ModuleConfig,
    mut sink: W,
) -> std::io::Result<()> {
    sink.write_all(&emit(module, header))?;
    sink.flush()
}

/// Decode a module previously produced by [`emit`].
///
/// # Errors
///
/// Returns a [`DecodeError`] for a header mismatch, truncation, unknown
/// opcodes or trailing bytes.
pub fn decode(bytes: &[u8], header: &ModuleConfig) -> Result<Module, DecodeError> {
    let mut reader = Reader { bytes, pos: 0 };

    let magic = reader.u32()?;
    if magic != header.magic {
        return Err(DecodeError::BadMagic {
            expected: header.magic,
            found: magic,
        });
    }
    let version = reader.u32()?;
    if version != header.version {
        return Err(DecodeError::UnsupportedVersion {
            expected: header.version,
            found: version,
        });
    }

    let mut module = Module::default();
    for _ in 0..reader.u32()? {
        let is_const = reader.u8()? != 0;
        let len = reader.u32()? as usize;
        let value = reader.take(len)?.to_vec();
        module.globals.push(GlobalEntry { is_const, value });
    }

    for _ in 0..reader.u32()? {
        let mut function = Function::new(reader.u32()?);
        function.return_slots = reader.u32()?;
        function.param_slots = reader.u32()?;
        function.local_slots = reader.u32()?;
        for _ in 0..reader.u32()? {
            function.body.push(reader.instruction()?);
        }
        module.functions.push(function);
    }

    match bytes.len() - reader.pos {
        0 => Ok(module),
        rest => Err(DecodeError::TrailingBytes(rest)),
    }
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

#[allow(clippy::cast_possible_truncation)]
fn put_len(out: &mut Vec<u8>, len: usize) {
    put_u32(out, len as u32);
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn put_instruction(out: &mut Vec<u8>, instruction: &Instruction) {
    out.push(instruction.op.opcode());
    let operand = instruction.operand_or_zero();
    match instruction.op.operand() {
        OperandWidth::None => {}
        OperandWidth::U64 => out.extend_from_slice(&(operand as u64).to_be_bytes()),
        OperandWidth::U32 => out.extend_from_slice(&(operand as u32).to_be_bytes()),
        OperandWidth::I32 => out.extend_from_slice(&(operand as i32).to_be_bytes()),
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(DecodeError::Truncated(self.bytes.len()))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut array = [0; N];
        array.copy_from_slice(self.take(N)?);
        Ok(array)
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.array::<1>()?[0])
    }

    fn u32(&mut self) -> Result<u32, DecodeError> {
        self.array().map(u32::from_be_bytes)
    }

    #[allow(clippy::cast_possible_wrap)]
    fn instruction(&mut self) -> Result<Instruction, DecodeError> {
        let offset = self.pos;
        let opcode = self.u8()?;
        let op = Operation::from_opcode(opcode)
            .ok_or(DecodeError::UnknownOpcode { opcode, offset })?;
        let operand = match op.operand() {
            OperandWidth::None => None,
            OperandWidth::U64 => Some(u64::from_be_bytes(self.array()?) as i64),
            OperandWidth::U32 => Some(i64::from(u32::from_be_bytes(self.array()?))),
            OperandWidth::I32 => Some(i64::from(i32::from_be_bytes(self.array()?))),
        };
        Ok(Instruction { op, operand })
    }
}
