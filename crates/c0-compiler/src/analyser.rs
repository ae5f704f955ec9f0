//! Single-pass analyser for miniplc0.
//!
//! Parses the token stream by recursive descent and, in the same pass:
//! - resolves names against the scoped symbol table
//! - enforces declaration, mutability, initialization and call-shape rules
//! - emits stack machine instructions
//!
//! No syntax tree is built. Each construct returns its instruction fragment
//! to the caller, which either splices it into a larger fragment or appends
//! it to the module.

use crate::control_flow::{Condition, IfChain, Relation, WhileLoop};
use crate::frontend::{unexpected, Token, TokenKind, TokenStream};
use crate::instruction::{Instruction, Operation};
use crate::module::Module;
use crate::operator::{BinaryOperator, OperatorStack};
use crate::symbols::{
    Declaration, SymbolEntry, SymbolKind, SymbolTable, ValueType, GLOBAL_DEPTH,
};
use c0_common::{CompileError, CompileResult, CompilerConfig, ErrorCode, Span};
use tracing::debug;

/// Tokens that may start an operand.
const OPERAND_START: [TokenKind; 5] = [
    TokenKind::Minus,
    TokenKind::Ident,
    TokenKind::LParen,
    TokenKind::UintLiteral,
    TokenKind::StringLiteral,
];

/// Analyse a complete program.
///
/// # Errors
///
/// Returns the first tokenize, syntax or semantic error.
pub fn analyse(source: &str, config: &CompilerConfig) -> CompileResult<Module> {
    Analyser::new(source, config).analyse()
}

/// Recursive-descent analyser state for one module.
#[derive(Debug)]
pub struct Analyser<'src> {
    tokens: TokenStream<'src>,
    symbols: SymbolTable,
    depth: u32,
    main_name: String,
}

impl<'src> Analyser<'src> {
    /// Create an analyser over `source`.
    pub fn new(source: &'src str, config: &CompilerConfig) -> Self {
        Self {
            tokens: TokenStream::new(source),
            symbols: SymbolTable::new(&config.entry.start, config.library.builtins),
            depth: GLOBAL_DEPTH,
            main_name: config.entry.main.clone(),
        }
    }

    /// Run the analysis and return the finished module.
    ///
    /// # Errors
    ///
    /// Returns the first tokenize, syntax or semantic error.
    pub fn analyse(mut self) -> CompileResult<Module> {
        self.program()?;
        Ok(self.symbols.finish(&self.main_name))
    }

    // program -> (declaration | function)* EOF
    fn program(&mut self) -> CompileResult<()> {
        loop {
            match self.tokens.peek_kind()? {
                TokenKind::Let | TokenKind::Const => {
                    let code = self.declaration()?;
                    self.symbols.append_instructions(self.depth, code);
                }
                TokenKind::Fn => self.function()?,
                TokenKind::Eof => return Ok(()),
                _ => {
                    let token = self.tokens.next()?;
                    return Err(unexpected(
                        &token,
                        &[TokenKind::Fn, TokenKind::Let, TokenKind::Const, TokenKind::Eof],
                    ));
                }
            }
        }
    }

    // declaration -> ('let' | 'const') IDENT ':' type ('=' expr)? ';'
    fn declaration(&mut self) -> CompileResult<Vec<Instruction>> {
        let keyword = self
            .tokens
            .expect_one_of(&[TokenKind::Let, TokenKind::Const])?;
        let constant = keyword.kind == TokenKind::Const;
        let name = self.tokens.expect(TokenKind::Ident)?;
        self.tokens.expect(TokenKind::Colon)?;
        let ty = self.value_type(false)?;

        let decl = Declaration::new(name.text(), SymbolKind::Variable, ty, name.span)
            .constant(constant);
        let id = self.symbols.declare(decl, self.depth)?;

        let initializer = if constant {
            Some(self.tokens.expect(TokenKind::Assign)?)
        } else {
            self.tokens.next_if(TokenKind::Assign)?
        };

        let mut code = Vec::new();
        if initializer.is_some() {
            code.push(self.slot_address(self.symbols.entry(id), name.span)?);
            code.extend(self.expression()?);
            code.push(Instruction::new(Operation::Store64));
            self.symbols.initialize(id);
        }
        self.tokens.expect(TokenKind::Semicolon)?;
        Ok(code)
    }

    // function -> 'fn' IDENT '(' params? ')' '->' type block
    fn function(&mut self) -> CompileResult<()> {
        self.tokens.expect(TokenKind::Fn)?;
        let name = self.tokens.expect(TokenKind::Ident)?;

        // Visible before the body so the function can call itself
        let decl =
            Declaration::new(name.text(), SymbolKind::Function, ValueType::Void, name.span)
                .constant(true)
                .initialized(true);
        self.symbols.declare(decl, self.depth)?;

        self.tokens.expect(TokenKind::LParen)?;
        if !self.tokens.check(TokenKind::RParen)? {
            loop {
                self.parameter()?;
                if self.tokens.next_if(TokenKind::Comma)?.is_none() {
                    break;
                }
            }
        }
        self.tokens.expect(TokenKind::RParen)?;
        self.tokens.expect(TokenKind::Arrow)?;
        let ret = self.value_type(true)?;
        self.symbols.set_return_type(ret);

        let mut body = self.block()?;
        body.push(Instruction::new(Operation::Ret));
        self.symbols.append_instructions(self.depth + 1, body);

        let function = self.symbols.current_function();
        debug!(
            function = name.text(),
            params = function.param_slots,
            locals = function.local_slots,
            instructions = function.body.len(),
            "Function analysed"
        );
        Ok(())
    }

    // parameter -> 'const'? IDENT ':' type
    fn parameter(&mut self) -> CompileResult<()> {
        let constant = self.tokens.next_if(TokenKind::Const)?.is_some();
        let name = self.tokens.expect(TokenKind::Ident)?;
        self.tokens.expect(TokenKind::Colon)?;
        let ty = self.value_type(false)?;
        let decl = Declaration::new(name.text(), SymbolKind::Parameter, ty, name.span)
            .constant(constant)
            .initialized(true);
        self.symbols.declare(decl, self.depth + 1)?;
        Ok(())
    }

    fn value_type(&mut self, allow_void: bool) -> CompileResult<ValueType> {
        let accepted: &[TokenKind] = if allow_void {
            &[TokenKind::Int, TokenKind::Void]
        } else {
            &[TokenKind::Int]
        };
        let token = self.tokens.expect_one_of(accepted)?;
        Ok(match token.kind {
            TokenKind::Void => ValueType::Void,
            _ => ValueType::Int,
        })
    }

    fn block(&mut self) -> CompileResult<Vec<Instruction>> {
        self.tokens.expect(TokenKind::LBrace)?;
        self.depth += 1;
        let mut code = Vec::new();
        while !self.tokens.check(TokenKind::RBrace)? {
            code.extend(self.statement()?);
        }
        self.tokens.next()?;
        self.symbols.exit_scope(self.depth);
        self.depth -= 1;
        Ok(code)
    }

    fn statement(&mut self) -> CompileResult<Vec<Instruction>> {
        match self.tokens.peek_kind()? {
            TokenKind::Let | TokenKind::Const => self.declaration(),
            TokenKind::If => self.if_statement(),
            TokenKind::While => self.while_statement(),
            TokenKind::Return => self.return_statement(),
            TokenKind::LBrace => self.block(),
            TokenKind::Semicolon => {
                self.tokens.next()?;
                Ok(Vec::new())
            }
            _ => {
                let mut code = Vec::new();
                let mut ops = OperatorStack::new();
                let unused = self.operator_chain(&mut ops, &mut code)?;
                ops.finish(&mut code);
                self.tokens.expect(TokenKind::Semicolon)?;
                // Drop the result so a statement leaves the stack as it found it
                if unused > 0 {
                    code.push(Instruction::indexed(Operation::PopN, unused));
                }
                Ok(code)
            }
        }
    }

    // if -> 'if' cond block ('else' 'if' cond block)* ('else' block)?
    fn if_statement(&mut self) -> CompileResult<Vec<Instruction>> {
        self.tokens.expect(TokenKind::If)?;
        let mut chain = IfChain::new();
        loop {
            let condition = self.condition()?;
            let block = self.block()?;
            chain.add_clause(condition, block);
            if self.tokens.next_if(TokenKind::Else)?.is_none() {
                break;
            }
            if self.tokens.next_if(TokenKind::If)?.is_none() {
                let block = self.block()?;
                chain.add_else(block);
                break;
            }
        }
        chain.generate()
    }

    fn while_statement(&mut self) -> CompileResult<Vec<Instruction>> {
        self.tokens.expect(TokenKind::While)?;
        let condition = self.condition()?;
        let body = self.block()?;
        WhileLoop { condition, body }.generate()
    }

    fn return_statement(&mut self) -> CompileResult<Vec<Instruction>> {
        let keyword = self.tokens.expect(TokenKind::Return)?;
        let mut code = Vec::new();
        if !self.tokens.check(TokenKind::Semicolon)? {
            if self.symbols.current_return_type() == ValueType::Void {
                return Err(CompileError::analyse(ErrorCode::WrongReturn, keyword.span));
            }
            // Argument slot 0 holds the return value
            code.push(Instruction::indexed(Operation::ArgA, 0));
            code.extend(self.expression()?);
            code.push(Instruction::new(Operation::Store64));
        }
        self.tokens.expect(TokenKind::Semicolon)?;
        code.push(Instruction::new(Operation::Ret));
        Ok(code)
    }

    // cond -> expr (relop expr)?
    fn condition(&mut self) -> CompileResult<Condition> {
        let left = self.expression()?;
        match Relation::from_token(self.tokens.peek_kind()?) {
            Some(relation) => {
                self.tokens.next()?;
                let right = self.expression()?;
                Ok(Condition::compare(left, relation, right))
            }
            None => Ok(Condition::truthy(left)),
        }
    }

    /// Complete expression with its own operator stack.
    fn expression(&mut self) -> CompileResult<Vec<Instruction>> {
        let mut code = Vec::new();
        let mut ops = OperatorStack::new();
        self.operator_chain(&mut ops, &mut code)?;
        ops.finish(&mut code);
        Ok(code)
    }

    // chain -> operand (binop operand)*
    //
    // Returns the number of stack slots the chain leaves behind.
    fn operator_chain(
        &mut self,
        ops: &mut OperatorStack,
        code: &mut Vec<Instruction>,
    ) -> CompileResult<u32> {
        let mut slots = self.operand(ops, code)?;
        while let Some(op) = BinaryOperator::from_token(self.tokens.peek_kind()?) {
            self.tokens.next()?;
            ops.push(op, code);
            self.operand(ops, code)?;
            slots = 1;
        }
        Ok(slots)
    }

    // operand -> ('-' operand | IDENT ... | '(' chain ')' | literal) ('as' type)*
    fn operand(
        &mut self,
        ops: &mut OperatorStack,
        code: &mut Vec<Instruction>,
    ) -> CompileResult<u32> {
        let token = self.tokens.next()?;
        let slots = match token.kind {
            TokenKind::Minus => {
                code.push(Instruction::push(0));
                self.operand(ops, code)?;
                code.push(Instruction::new(Operation::SubI));
                1
            }
            TokenKind::Ident => match self.tokens.peek_kind()? {
                TokenKind::Assign => {
                    self.assignment(&token, code)?;
                    0
                }
                TokenKind::LParen => self.call(&token, code)?,
                _ => {
                    self.read(&token, code)?;
                    1
                }
            },
            TokenKind::LParen => {
                ops.open_group();
                let slots = self.operator_chain(ops, code)?;
                self.tokens.expect(TokenKind::RParen)?;
                ops.close_group(code);
                slots
            }
            TokenKind::UintLiteral => {
                code.push(Instruction::push(token.uint()));
                1
            }
            TokenKind::StringLiteral => {
                let id = self.symbols.add_global_string(token.text(), token.span);
                code.push(Instruction::push(u64::from(id)));
                1
            }
            _ => return Err(unexpected(&token, &OPERAND_START)),
        };

        // Casts are checked for a valid type and otherwise erased
        while self.tokens.next_if(TokenKind::As)?.is_some() {
            self.value_type(false)?;
        }
        Ok(slots)
    }

    // IDENT '=' expr
    fn assignment(&mut self, target: &Token, code: &mut Vec<Instruction>) -> CompileResult<()> {
        let id = self.symbols.check_assignable(target.text(), target.span)?;
        self.tokens.expect(TokenKind::Assign)?;
        code.push(self.slot_address(self.symbols.entry(id), target.span)?);
        code.extend(self.expression()?);
        code.push(Instruction::new(Operation::Store64));
        self.symbols.mark_initialized(target.text(), target.span)
    }

    // IDENT '(' (expr (',' expr)*)? ')'
    fn call(&mut self, callee: &Token, code: &mut Vec<Instruction>) -> CompileResult<u32> {
        let target = self.symbols.resolve_call(callee.text(), callee.span)?;
        self.tokens.expect(TokenKind::LParen)?;
        code.push(Instruction::indexed(
            Operation::StackAlloc,
            target.signature.ret.slots(),
        ));

        let mut arguments = 0;
        if !self.tokens.check(TokenKind::RParen)? {
            loop {
                code.extend(self.expression()?);
                arguments += 1;
                if self.tokens.next_if(TokenKind::Comma)?.is_none() {
                    break;
                }
            }
        }
        self.tokens.expect(TokenKind::RParen)?;

        if arguments != target.signature.params.len() {
            return Err(CompileError::analyse(ErrorCode::WrongParamsNum, callee.span));
        }
        code.push(target.call);
        Ok(target.signature.ret.slots())
    }

    fn read(&self, name: &Token, code: &mut Vec<Instruction>) -> CompileResult<()> {
        let entry = self.symbols.lookup(name.text(), name.span)?;
        if !entry.is_initialized {
            return Err(CompileError::analyse(ErrorCode::NotInitialized, name.span));
        }
        code.push(self.slot_address(entry, name.span)?);
        code.push(Instruction::new(Operation::Load64));
        Ok(())
    }

    /// Address-of instruction for a data symbol.
    fn slot_address(&self, entry: &SymbolEntry, span: Span) -> CompileResult<Instruction> {
        match entry.kind {
            SymbolKind::Function => Err(CompileError::analyse(
                ErrorCode::CantGetProcAddress,
                span,
            )),
            // Argument slots after the return slot
            SymbolKind::Parameter => Ok(Instruction::indexed(
                Operation::ArgA,
                entry.offset + self.symbols.current_function().return_slots,
            )),
            _ if entry.depth <= GLOBAL_DEPTH => {
                Ok(Instruction::indexed(Operation::GlobA, entry.offset))
            }
            _ => Ok(Instruction::indexed(Operation::LocA, entry.offset)),
        }
    }
}
