//! Common utilities for acceptance tests.
//!
//! Provides:
//! - A reference interpreter for compiled modules
//! - Helpers to compile and run a program in one step

#![allow(dead_code)]

use c0_compiler::instruction::Operation;
use c0_compiler::module::Module;
use c0_compiler::Compiler;
use std::collections::VecDeque;

/// Upper bound on executed instructions per run.
pub const STEP_LIMIT: u64 = 5_000_000;

/// Addresses with this bit set name global slots.
const GLOBAL_TAG: u64 = 1 << 63;

/// Result of running a program to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunResult {
    /// Everything written by the output builtins.
    pub output: String,
    /// Instructions executed.
    pub steps: u64,
    /// Highest operand stack depth reached.
    pub peak_stack: usize,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    function: usize,
    pc: usize,
    args: usize,
    locals: usize,
}

/// Minimal interpreter for the navm instruction subset the compiler emits.
///
/// Stack slots hold raw 64-bit values. A stack address is a slot index; a
/// global address is the global id tagged with [`GLOBAL_TAG`].
pub struct Vm<'m> {
    module: &'m Module,
    globals: Vec<u64>,
    stack: Vec<u64>,
    frames: Vec<Frame>,
    input: VecDeque<i64>,
    result: RunResult,
}

impl<'m> Vm<'m> {
    /// Prepare `module` with the given `getint`/`getchar` input.
    pub fn new(module: &'m Module, input: &[i64]) -> Self {
        Self {
            module,
            globals: vec![0; module.globals.len()],
            stack: Vec::new(),
            frames: Vec::new(),
            input: input.iter().copied().collect(),
            result: RunResult::default(),
        }
    }

    /// Run function 0 until it falls off its end.
    pub fn run(mut self) -> Result<RunResult, String> {
        self.enter(0)?;
        while let Some(frame) = self.frames.last().copied() {
            let body = &self.module.functions[frame.function].body;
            let Some(&instruction) = body.get(frame.pc) else {
                if frame.function == 0 && self.frames.len() == 1 {
                    self.frames.pop();
                    break;
                }
                return Err(format!("function {} ran past its end", frame.function));
            };

            self.result.steps += 1;
            if self.result.steps > STEP_LIMIT {
                return Err("step limit exceeded".to_string());
            }
            self.top_frame().pc += 1;
            self.step(instruction.op, instruction.operand_or_zero())?;
            self.result.peak_stack = self.result.peak_stack.max(self.stack.len());
        }
        Ok(self.result)
    }

    #[allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]
    fn step(&mut self, op: Operation, operand: i64) -> Result<(), String> {
        let index = usize::try_from(operand).unwrap_or(usize::MAX);
        match op {
            Operation::Nop => {}
            Operation::Push => self.stack.push(operand as u64),
            Operation::Pop => {
                self.pop()?;
            }
            Operation::PopN => {
                let keep = self
                    .stack
                    .len()
                    .checked_sub(index)
                    .ok_or("popn underflow")?;
                self.stack.truncate(keep);
            }
            Operation::Dup => {
                let top = self.pop()?;
                self.stack.extend([top, top]);
            }
            Operation::LocA => self.stack.push((self.frame().locals + index) as u64),
            Operation::ArgA => self.stack.push((self.frame().args + index) as u64),
            Operation::GlobA => self.stack.push(GLOBAL_TAG | operand as u64),
            Operation::Load64 => {
                let address = self.pop()?;
                let value = self.read(address)?;
                self.stack.push(value);
            }
            Operation::Store64 => {
                let value = self.pop()?;
                let address = self.pop()?;
                self.write(address, value)?;
            }
            Operation::StackAlloc => self.stack.resize(self.stack.len() + index, 0),
            Operation::AddI | Operation::SubI | Operation::MulI | Operation::DivI => {
                let rhs = self.pop()? as i64;
                let lhs = self.pop()? as i64;
                let value = match op {
                    Operation::AddI => lhs.wrapping_add(rhs),
                    Operation::SubI => lhs.wrapping_sub(rhs),
                    Operation::MulI => lhs.wrapping_mul(rhs),
                    _ if rhs == 0 => return Err("division by zero".to_string()),
                    _ => lhs.wrapping_div(rhs),
                };
                self.stack.push(value as u64);
            }
            Operation::CmpI => {
                let rhs = self.pop()? as i64;
                let lhs = self.pop()? as i64;
                self.stack.push(lhs.cmp(&rhs) as i64 as u64);
            }
            Operation::NegI => {
                let value = self.pop()? as i64;
                self.stack.push(value.wrapping_neg() as u64);
            }
            Operation::SetLt => {
                let value = self.pop()? as i64;
                self.stack.push(u64::from(value < 0));
            }
            Operation::SetGt => {
                let value = self.pop()? as i64;
                self.stack.push(u64::from(value > 0));
            }
            Operation::Br => self.jump(operand)?,
            Operation::BrFalse => {
                if self.pop()? == 0 {
                    self.jump(operand)?;
                }
            }
            Operation::BrTrue => {
                if self.pop()? != 0 {
                    self.jump(operand)?;
                }
            }
            Operation::Call => self.enter(index)?,
            Operation::Ret => {
                let frame = self.frames.pop().ok_or("ret without frame")?;
                let ret = self.module.functions[frame.function].return_slots as usize;
                self.stack.truncate(frame.args + ret);
            }
            Operation::CallName => self.builtin(index)?,
        }
        Ok(())
    }

    fn enter(&mut self, function: usize) -> Result<(), String> {
        let callee = self
            .module
            .functions
            .get(function)
            .ok_or_else(|| format!("no function {function}"))?;
        let frame_args = (callee.param_slots + callee.return_slots) as usize;
        let args = self
            .stack
            .len()
            .checked_sub(frame_args)
            .ok_or("call with missing arguments")?;
        let locals = self.stack.len();
        self.stack.resize(locals + callee.local_slots as usize, 0);
        self.frames.push(Frame {
            function,
            pc: 0,
            args,
            locals,
        });
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn builtin(&mut self, name_id: usize) -> Result<(), String> {
        let name = u32::try_from(name_id)
            .ok()
            .and_then(|id| self.module.global_text(id))
            .ok_or_else(|| format!("global {name_id} is not a name"))?;
        match name {
            "getint" | "getchar" => {
                let value = self.input.pop_front().ok_or("input exhausted")?;
                *self.stack.last_mut().ok_or("no return slot")? = value as u64;
            }
            "putint" => {
                let value = self.pop()? as i64;
                self.result.output.push_str(&value.to_string());
            }
            "putchar" => {
                let value = self.pop()?;
                let c = char::from_u32(value as u32).ok_or("bad character")?;
                self.result.output.push(c);
            }
            "putstr" => {
                let id = self.pop()?;
                let text = u32::try_from(id)
                    .ok()
                    .and_then(|id| self.module.global_text(id))
                    .ok_or("putstr of a non-string global")?;
                self.result.output.push_str(text);
            }
            "putln" => self.result.output.push('\n'),
            other => return Err(format!("unknown builtin {other}")),
        }
        Ok(())
    }

    fn jump(&mut self, offset: i64) -> Result<(), String> {
        let frame = self.top_frame();
        let target = i64::try_from(frame.pc).unwrap_or(i64::MAX) + offset;
        frame.pc = usize::try_from(target).map_err(|_| "branch before function start")?;
        Ok(())
    }

    fn read(&self, address: u64) -> Result<u64, String> {
        if address & GLOBAL_TAG != 0 {
            let id = usize::try_from(address & !GLOBAL_TAG).unwrap_or(usize::MAX);
            return self.globals.get(id).copied().ok_or_else(|| "bad global".into());
        }
        usize::try_from(address)
            .ok()
            .and_then(|slot| self.stack.get(slot).copied())
            .ok_or_else(|| format!("bad stack address {address}"))
    }

    fn write(&mut self, address: u64, value: u64) -> Result<(), String> {
        let slot = if address & GLOBAL_TAG != 0 {
            let id = usize::try_from(address & !GLOBAL_TAG).unwrap_or(usize::MAX);
            self.globals.get_mut(id)
        } else {
            usize::try_from(address)
                .ok()
                .and_then(|slot| self.stack.get_mut(slot))
        };
        *slot.ok_or_else(|| format!("bad address {address:#x}"))? = value;
        Ok(())
    }

    fn pop(&mut self) -> Result<u64, String> {
        self.stack.pop().ok_or_else(|| "stack underflow".to_string())
    }

    fn frame(&self) -> Frame {
        self.frames.last().copied().unwrap_or(Frame {
            function: 0,
            pc: 0,
            args: 0,
            locals: 0,
        })
    }

    fn top_frame(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("no active frame")
    }
}

/// Compile `source` and run it through the binary encoding.
pub fn run_program(source: &str, input: &[i64]) -> RunResult {
    let compiler = Compiler::new();
    let bytes = compiler
        .compile(source)
        .unwrap_or_else(|e| panic!("Compile failed: {e:#}"));
    let module = compiler.decode(&bytes).expect("Decode failed");
    Vm::new(&module, input)
        .run()
        .unwrap_or_else(|e| panic!("Execution failed: {e}"))
}

/// Output of running `source`.
pub fn output_of(source: &str, input: &[i64]) -> String {
    run_program(source, input).output
}
