//! Recursive-descent parser for the program text format.
//!
//! The parser only checks syntax. Whether names resolve, types agree and blocks are
//! terminated is the verifier's job, so a program that parses may still be rejected
//! by [`crate::ir::Verifier`].
//!
//! # Grammar
//!
//! ```text
//! program    := (declare | define | metadata)*
//! declare    := 'declare' type global '(' params ')'
//! define     := 'define' type global '(' params ')' '{' block+ '}'
//! params     := [param (',' param)*] [',' '...'] | '...'
//! param      := type [local]
//! block      := label ':' instr*
//! instr      := [local '='] op [',' '!dbg' meta-ref]
//! metadata   := meta-ref '=' '!DILocation' '(' 'line' ':' int ',' 'column' ':' int ')'
//! ```

use std::str::FromStr;

use crate::{
    ir::{
        lexer::{Lexer, Token, TokenKind},
        BasicBlock, BinaryOp, CallOp, Callee, DebugLocation, Function, IcmpPredicate,
        Instruction, IrType, Op, Operand, Param, Program, Value,
    },
    Error, Result,
};

/// Parses a complete program.
pub(crate) fn parse(source: &str) -> Result<Program> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens).parse_program()
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            position: 0,
        }
    }

    // ========================================================================
    // Cursor helpers
    // ========================================================================

    fn peek(&self) -> &Token {
        // the lexer always terminates the stream with Eof
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.position.min(last)]
    }

    fn peek_kind_at(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.position + offset).map(|t| &t.kind)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.position += 1;
        }
        token
    }

    fn error(&self, token: &Token, message: impl Into<String>) -> Error {
        Error::Parse {
            line: token.line,
            column: token.column,
            message: message.into(),
        }
    }

    fn unexpected(&self, token: &Token, expected: &str) -> Error {
        self.error(token, format!("expected {expected}, found {}", token.kind))
    }

    fn expect(&mut self, kind: &TokenKind, expected: &str) -> Result<Token> {
        let token = self.advance();
        if &token.kind == kind {
            Ok(token)
        } else {
            Err(self.unexpected(&token, expected))
        }
    }

    fn expect_word(&mut self, word: &str) -> Result<()> {
        let token = self.advance();
        match &token.kind {
            TokenKind::Word(w) if w == word => Ok(()),
            _ => Err(self.unexpected(&token, &format!("'{word}'"))),
        }
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if &self.peek().kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn at_label(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::Word(_) | TokenKind::Int(_) | TokenKind::Str(_)
        ) && self.peek_kind_at(1) == Some(&TokenKind::Colon)
    }

    // ========================================================================
    // Top level
    // ========================================================================

    fn parse_program(mut self) -> Result<Program> {
        let mut program = Program::new();

        loop {
            let token = self.peek().clone();
            match &token.kind {
                TokenKind::Eof => break,
                TokenKind::Word(w) if w == "declare" => {
                    self.advance();
                    let function = self.parse_header(false)?;
                    program.add_function(function);
                }
                TokenKind::Word(w) if w == "define" => {
                    self.advance();
                    let function = self.parse_definition()?;
                    program.add_function(function);
                }
                TokenKind::MetaRef(_) => {
                    let location = self.parse_debug_location()?;
                    program.add_debug_location(location);
                }
                _ => return Err(self.unexpected(&token, "'declare', 'define' or metadata")),
            }
        }

        Ok(program)
    }

    fn parse_header(&mut self, named_params: bool) -> Result<Function> {
        let ret = self.parse_type()?;
        let name_token = self.advance();
        let TokenKind::Global(name) = name_token.kind.clone() else {
            return Err(self.unexpected(&name_token, "a function name"));
        };

        self.expect(&TokenKind::LParen, "'('")?;
        let mut params = Vec::new();
        let mut variadic = false;

        if !self.eat(&TokenKind::RParen) {
            loop {
                if self.eat(&TokenKind::Ellipsis) {
                    variadic = true;
                    self.expect(&TokenKind::RParen, "')' after '...'")?;
                    break;
                }

                let ty_token = self.peek().clone();
                let ty = self.parse_type()?;
                if ty.is_void() {
                    return Err(self.error(&ty_token, "parameters cannot be void"));
                }

                let param = match self.peek().kind.clone() {
                    TokenKind::Local(param_name) => {
                        self.advance();
                        Param::named(ty, param_name)
                    }
                    _ if named_params => {
                        let token = self.peek().clone();
                        return Err(self.unexpected(&token, "a parameter name"));
                    }
                    _ => Param::unnamed(ty),
                };
                params.push(param);

                let token = self.advance();
                match token.kind {
                    TokenKind::Comma => continue,
                    TokenKind::RParen => break,
                    _ => return Err(self.unexpected(&token, "',' or ')'")),
                }
            }
        }

        let function = Function::new(name, ret, params);
        Ok(if variadic { function.variadic() } else { function })
    }

    fn parse_definition(&mut self) -> Result<Function> {
        let mut function = self.parse_header(true)?;
        self.expect(&TokenKind::LBrace, "'{'")?;

        loop {
            if self.eat(&TokenKind::RBrace) {
                break;
            }
            let block = self.parse_block()?;
            function.blocks_mut().push(block);
        }

        if function.is_declaration() {
            let token = self.tokens[self.position.saturating_sub(1)].clone();
            return Err(self.error(&token, "function body has no blocks"));
        }
        Ok(function)
    }

    fn parse_block(&mut self) -> Result<BasicBlock> {
        let token = self.advance();
        let label = match token.kind.clone() {
            TokenKind::Word(w) | TokenKind::Str(w) => w,
            TokenKind::Int(i) => i.to_string(),
            _ => return Err(self.unexpected(&token, "a block label")),
        };
        self.expect(&TokenKind::Colon, "':' after block label")?;

        let mut block = BasicBlock::new(label);
        while !self.at_label() && self.peek().kind != TokenKind::RBrace {
            if self.peek().kind == TokenKind::Eof {
                let token = self.peek().clone();
                return Err(self.unexpected(&token, "'}'"));
            }
            block.add_instruction(self.parse_instruction()?);
        }
        Ok(block)
    }

    fn parse_debug_location(&mut self) -> Result<DebugLocation> {
        let token = self.advance();
        let TokenKind::MetaRef(id) = token.kind.clone() else {
            return Err(self.unexpected(&token, "a metadata id"));
        };
        self.expect(&TokenKind::Equals, "'='")?;

        let kind_token = self.advance();
        match &kind_token.kind {
            TokenKind::MetaKind(kind) if kind == "DILocation" => {}
            _ => return Err(self.unexpected(&kind_token, "'!DILocation'")),
        }

        self.expect(&TokenKind::LParen, "'('")?;
        let mut line = None;
        let mut column = None;
        loop {
            let field_token = self.advance();
            let TokenKind::Word(field) = field_token.kind.clone() else {
                return Err(self.unexpected(&field_token, "a field name"));
            };
            self.expect(&TokenKind::Colon, "':'")?;
            let value = self.parse_u32()?;
            match field.as_str() {
                "line" => line = Some(value),
                "column" => column = Some(value),
                other => {
                    return Err(self.error(
                        &field_token,
                        format!("unknown DILocation field '{other}'"),
                    ))
                }
            }

            let token = self.advance();
            match token.kind {
                TokenKind::Comma => continue,
                TokenKind::RParen => break,
                _ => return Err(self.unexpected(&token, "',' or ')'")),
            }
        }

        match (line, column) {
            (Some(line), Some(column)) => Ok(DebugLocation { id, line, column }),
            _ => Err(self.error(&token, "DILocation requires both 'line' and 'column'")),
        }
    }

    // ========================================================================
    // Instructions
    // ========================================================================

    fn parse_instruction(&mut self) -> Result<Instruction> {
        let result = match (self.peek().kind.clone(), self.peek_kind_at(1)) {
            (TokenKind::Local(name), Some(TokenKind::Equals)) => {
                self.advance();
                self.advance();
                Some(name)
            }
            _ => None,
        };

        let op = self.parse_op()?;
        let mut instruction = match result {
            Some(name) => Instruction::with_result(name, op),
            None => Instruction::new(op),
        };

        if self.peek().kind == TokenKind::Comma
            && matches!(self.peek_kind_at(1), Some(TokenKind::MetaKind(k)) if k == "dbg")
        {
            self.advance();
            self.advance();
            let token = self.advance();
            let TokenKind::MetaRef(id) = token.kind.clone() else {
                return Err(self.unexpected(&token, "a metadata reference after '!dbg'"));
            };
            instruction = instruction.with_debug_loc(id);
        }

        Ok(instruction)
    }

    fn parse_op(&mut self) -> Result<Op> {
        let token = self.advance();
        let TokenKind::Word(mnemonic) = token.kind.clone() else {
            return Err(self.unexpected(&token, "an instruction"));
        };

        if let Ok(op) = BinaryOp::from_str(&mnemonic) {
            let ty = self.parse_type()?;
            let lhs = self.parse_value()?;
            self.expect(&TokenKind::Comma, "','")?;
            let rhs = self.parse_value()?;
            return Ok(Op::Binary { op, ty, lhs, rhs });
        }

        match mnemonic.as_str() {
            "icmp" => {
                let pred_token = self.advance();
                let pred = match &pred_token.kind {
                    TokenKind::Word(w) => IcmpPredicate::from_str(w).ok(),
                    _ => None,
                }
                .ok_or_else(|| self.unexpected(&pred_token, "a comparison predicate"))?;
                let ty = self.parse_type()?;
                let lhs = self.parse_value()?;
                self.expect(&TokenKind::Comma, "','")?;
                let rhs = self.parse_value()?;
                Ok(Op::ICmp { pred, ty, lhs, rhs })
            }
            "alloca" => Ok(Op::Alloca {
                ty: self.parse_type()?,
            }),
            "load" => {
                let ty = self.parse_type()?;
                self.expect(&TokenKind::Comma, "','")?;
                self.expect_word("ptr")?;
                let ptr = self.parse_value()?;
                Ok(Op::Load { ty, ptr })
            }
            "store" => {
                let ty = self.parse_type()?;
                let value = self.parse_value()?;
                self.expect(&TokenKind::Comma, "','")?;
                self.expect_word("ptr")?;
                let ptr = self.parse_value()?;
                Ok(Op::Store { ty, value, ptr })
            }
            "call" => self.parse_call().map(Op::Call),
            "br" => self.parse_branch(),
            "ret" => {
                let ty_token = self.peek().clone();
                let ty = self.parse_type()?;
                if ty.is_void() {
                    return Ok(Op::Ret { value: None });
                }
                if !matches!(
                    self.peek().kind,
                    TokenKind::Local(_) | TokenKind::Global(_) | TokenKind::Int(_) | TokenKind::Word(_)
                ) {
                    return Err(self.error(&ty_token, "'ret' of a non-void type needs a value"));
                }
                let value = self.parse_value()?;
                Ok(Op::Ret {
                    value: Some(Operand::new(ty, value)),
                })
            }
            "unreachable" => Ok(Op::Unreachable),
            _ => Err(self.error(&token, format!("unknown instruction '{mnemonic}'"))),
        }
    }

    fn parse_call(&mut self) -> Result<CallOp> {
        let ret = self.parse_type()?;

        let callee_token = self.advance();
        let callee = match callee_token.kind.clone() {
            TokenKind::Global(name) => Callee::Direct(name),
            TokenKind::Local(name) => Callee::Indirect(Value::Local(name)),
            _ => return Err(self.unexpected(&callee_token, "a callee")),
        };

        self.expect(&TokenKind::LParen, "'('")?;
        let mut args = Vec::new();
        if !self.eat(&TokenKind::RParen) {
            loop {
                let ty_token = self.peek().clone();
                let ty = self.parse_type()?;
                if ty.is_void() {
                    return Err(self.error(&ty_token, "call arguments cannot be void"));
                }
                let value = self.parse_value()?;
                args.push(Operand::new(ty, value));

                let token = self.advance();
                match token.kind {
                    TokenKind::Comma => continue,
                    TokenKind::RParen => break,
                    _ => return Err(self.unexpected(&token, "',' or ')'")),
                }
            }
        }

        Ok(CallOp { ret, callee, args })
    }

    fn parse_branch(&mut self) -> Result<Op> {
        let token = self.advance();
        match &token.kind {
            TokenKind::Word(w) if w == "label" => Ok(Op::Br {
                target: self.parse_label_ref()?,
            }),
            TokenKind::Word(w) if w == "i1" => {
                let cond = self.parse_value()?;
                self.expect(&TokenKind::Comma, "','")?;
                self.expect_word("label")?;
                let then_target = self.parse_label_ref()?;
                self.expect(&TokenKind::Comma, "','")?;
                self.expect_word("label")?;
                let else_target = self.parse_label_ref()?;
                Ok(Op::CondBr {
                    cond,
                    then_target,
                    else_target,
                })
            }
            _ => Err(self.unexpected(&token, "'label' or 'i1'")),
        }
    }

    // ========================================================================
    // Leaves
    // ========================================================================

    fn parse_label_ref(&mut self) -> Result<String> {
        let token = self.advance();
        match token.kind {
            TokenKind::Local(label) => Ok(label),
            _ => Err(self.unexpected(&token, "a block label reference")),
        }
    }

    fn parse_type(&mut self) -> Result<IrType> {
        let token = self.advance();
        match &token.kind {
            TokenKind::Word(w) => IrType::from_str(w).map_err(|_| self.unexpected(&token, "a type")),
            _ => Err(self.unexpected(&token, "a type")),
        }
    }

    fn parse_value(&mut self) -> Result<Value> {
        let token = self.advance();
        match token.kind.clone() {
            TokenKind::Local(name) => Ok(Value::Local(name)),
            TokenKind::Global(name) => Ok(Value::Global(name)),
            TokenKind::Int(value) => Ok(Value::Int(value)),
            TokenKind::Word(w) => match w.as_str() {
                "null" => Ok(Value::Null),
                "true" => Ok(Value::Int(1)),
                "false" => Ok(Value::Int(0)),
                _ => Err(self.unexpected(&token, "a value")),
            },
            _ => Err(self.unexpected(&token, "a value")),
        }
    }

    fn parse_u32(&mut self) -> Result<u32> {
        let token = self.advance();
        match token.kind {
            TokenKind::Int(value) => {
                u32::try_from(value).map_err(|_| self.error(&token, "value out of range"))
            }
            _ => Err(self.unexpected(&token, "an unsigned integer")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::InstructionCategory;

    const SAMPLE: &str = r#"
declare i32 @printf(ptr, ...)
declare void @_Z3foov()

define void @_Z3bari(i32 %I) {
entry:
  %r = add i32 %I, 1, !dbg !0
  ret void
}

define i32 @main(i32 %argc, ptr %argv) {
entry:
  %c = icmp sgt i32 %argc, 1
  br i1 %c, label %more, label %done
more:
  call void @_Z3foov(), !dbg !1
  br label %done
done:
  ret i32 0
}

!0 = !DILocation(line: 3, column: 5)
!1 = !DILocation(line: 9, column: 3)
"#;

    #[test]
    fn test_parse_sample() {
        let program = parse(SAMPLE).unwrap();
        assert_eq!(program.function_count(), 4);
        assert_eq!(program.debug_locations().len(), 2);

        let printf = program.function_by_name("printf").unwrap();
        assert!(printf.is_declaration());
        assert!(printf.is_variadic());

        let main = program.function_by_name("main").unwrap();
        assert_eq!(main.block_count(), 3);
        let call = &main.blocks()[1].instructions()[0];
        assert_eq!(call.category(), InstructionCategory::Call);
        assert_eq!(call.debug_loc(), Some(1));
        assert_eq!(
            call.op().as_call().unwrap().callee,
            Callee::Direct("_Z3foov".into())
        );
    }

    #[test]
    fn test_print_parse_round_trip() {
        let program = parse(SAMPLE).unwrap();
        let printed = program.to_string();
        let reparsed = parse(&printed).unwrap();
        assert_eq!(program, reparsed);
        assert_eq!(printed, reparsed.to_string());
    }

    #[test]
    fn test_indirect_call() {
        let program = parse(
            "define void @f(ptr %fp) {\nentry:\n  call void %fp(i32 1)\n  ret void\n}\n",
        )
        .unwrap();
        let call = program.functions()[0].blocks()[0].instructions()[0]
            .op()
            .as_call()
            .unwrap();
        assert!(call.callee.is_indirect());
    }

    #[test]
    fn test_error_positions() {
        let err = parse("define void @f() {\nentry:\n  frobnicate i32 1\n}\n").unwrap_err();
        match err {
            Error::Parse {
                line,
                column,
                message,
            } => {
                assert_eq!((line, column), (3, 3));
                assert!(message.contains("frobnicate"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_rejects_malformed_text() {
        assert!(parse("define void @f() {\n}\n").is_err());
        assert!(parse("define void @f() {\nentry:\n  ret void\n").is_err());
        assert!(parse("declare i32 @g(i32 %a").is_err());
        assert!(parse("define void @f(i32) {\nentry:\n  ret void\n}").is_err());
        assert!(parse("!0 = !DILocation(line: 1)").is_err());
        assert!(parse("!0 = !DILocation(line: 1, column: 2, scope: 3)").is_err());
        assert!(parse("call void @f()").is_err());
    }
}
