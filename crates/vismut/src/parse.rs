//! The parser: token stream to AST and scope tree.
//!
//! Expressions use Pratt precedence climbing with a one-token lookahead;
//! statements are recognized by their lead token. The parser constructs the
//! scope tree as it goes (one scope per block and function body) and
//! registers function signatures in the module-level registry so call sites
//! can resolve during analysis regardless of declaration order.

use smallvec::SmallVec;

use crate::{
    ast::{Ast, BinaryOp, ChainBuilder, FunctionSig, NodeId, NodeKind, Param, UnaryOp},
    error::{CompileError, ErrorKind},
    intern::{Interner, NameId},
    scope::ScopeId,
    token::{Span, Token, TokenKind, TokenPayload},
    tokenizer::Tokenizer,
    value::ValueType,
};

/// Result of parsing: the AST with its module root node.
#[derive(Debug)]
pub struct ParsedModule {
    pub ast: Ast,
    pub module: NodeId,
}

/// Parses a whole module.
pub fn parse(source: &[u8], module_name: &str) -> Result<ParsedModule, CompileError> {
    let mut parser = Parser::new(source, module_name);
    parser.parse_module()?;
    Ok(ParsedModule {
        module: parser.module,
        ast: parser.ast,
    })
}

// Precedence ladder, lowest to highest. Power and assignment associate to
// the right; everything else to the left.
const PREC_NONE: u8 = 0;
const PREC_ASSIGNMENT: u8 = 1;
const PREC_MINIMAL: u8 = PREC_ASSIGNMENT;
const PREC_TERNARY: u8 = 2;
const PREC_LOGICAL_OR: u8 = 3;
const PREC_LOGICAL_AND: u8 = 4;
const PREC_EQUALITY: u8 = 5;
const PREC_RELATIONAL: u8 = 6;
const PREC_ADDITIVE: u8 = 7;
const PREC_MULTIPLICATIVE: u8 = 8;
const PREC_POWER: u8 = 9;

fn precedence(token: TokenKind) -> u8 {
    match token {
        TokenKind::Assign => PREC_ASSIGNMENT,
        TokenKind::Question => PREC_TERNARY,
        TokenKind::PipePipe => PREC_LOGICAL_OR,
        TokenKind::AmpAmp => PREC_LOGICAL_AND,
        TokenKind::EqEq | TokenKind::NotEq => PREC_EQUALITY,
        TokenKind::Less | TokenKind::LessEq | TokenKind::Greater | TokenKind::GreaterEq => {
            PREC_RELATIONAL
        }
        TokenKind::Plus | TokenKind::Minus => PREC_ADDITIVE,
        TokenKind::Star | TokenKind::Slash | TokenKind::SlashSlash => PREC_MULTIPLICATIVE,
        TokenKind::Power => PREC_POWER,
        _ => PREC_NONE,
    }
}

fn binary_op_of(token: TokenKind) -> Option<BinaryOp> {
    let op = match token {
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::SlashSlash => BinaryOp::IntDiv,
        TokenKind::Power => BinaryOp::Pow,
        TokenKind::Assign => BinaryOp::Assign,
        TokenKind::EqEq => BinaryOp::Eq,
        TokenKind::NotEq => BinaryOp::NotEq,
        TokenKind::Less => BinaryOp::Less,
        TokenKind::LessEq => BinaryOp::LessEq,
        TokenKind::Greater => BinaryOp::Greater,
        TokenKind::GreaterEq => BinaryOp::GreaterEq,
        TokenKind::PipePipe => BinaryOp::Or,
        TokenKind::AmpAmp => BinaryOp::And,
        _ => return None,
    };
    Some(op)
}

fn is_right_assoc(op: BinaryOp) -> bool {
    matches!(op, BinaryOp::Pow | BinaryOp::Assign)
}

fn unary_op_of(token: TokenKind) -> Option<UnaryOp> {
    let op = match token {
        TokenKind::Plus => UnaryOp::Plus,
        TokenKind::Minus => UnaryOp::Minus,
        TokenKind::Bang => UnaryOp::Not,
        TokenKind::Tilde => UnaryOp::BitNot,
        TokenKind::Increment => UnaryOp::Increment,
        TokenKind::Decrement => UnaryOp::Decrement,
        _ => return None,
    };
    Some(op)
}

struct Parser<'src> {
    tokenizer: Tokenizer<'src>,
    current: Token,
    ast: Ast,
    module: NodeId,
    current_scope: ScopeId,
    /// Nonzero inside any block or function body; function declarations are
    /// module-level only.
    nesting: u32,
}

impl<'src> Parser<'src> {
    fn new(source: &'src [u8], module_name: &str) -> Self {
        let mut ast = Ast::new(Interner::new());
        let module_scope = ast.scopes.allocate(None);
        let module = ast.module(module_name, module_scope);
        Self {
            tokenizer: Tokenizer::new(source),
            current: Token::new(TokenKind::Eof, Span::default()),
            ast,
            module,
            current_scope: module_scope,
            nesting: 0,
        }
    }

    fn advance(&mut self) -> Result<(), CompileError> {
        self.current = self.tokenizer.next_token(&mut self.ast.interner)?;
        Ok(())
    }

    fn expect(&self, kind: TokenKind) -> Result<(), CompileError> {
        if self.current.kind == kind {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn unexpected(&self) -> CompileError {
        CompileError::with_token(
            ErrorKind::UnexpectedToken,
            self.current.span,
            self.current.kind,
        )
    }

    fn node_span(&self, id: NodeId) -> Span {
        self.ast.nodes[id].span
    }

    fn parse_module(&mut self) -> Result<(), CompileError> {
        self.advance()?;

        let mut statements = ChainBuilder::new();
        let mut functions = ChainBuilder::new();

        loop {
            while self.current.kind == TokenKind::Semicolon {
                self.advance()?;
            }
            if self.current.kind == TokenKind::Eof {
                break;
            }
            let statement = self.parse_statement()?;
            // Function declarations live on their own chain so the emitter
            // can forward-declare them; each node sits in exactly one chain.
            if matches!(self.ast.nodes[statement].kind, NodeKind::FunctionDecl { .. }) {
                functions.push(&mut self.ast, statement);
            } else {
                statements.push(&mut self.ast, statement);
            }
        }

        let module_span = Span::new(0, self.tokenizer.source().len() as u32);
        let NodeKind::Module {
            statements: stmts_slot,
            functions: funcs_slot,
            ..
        } = &mut self.ast.nodes[self.module].kind
        else {
            unreachable!("module node is always a module");
        };
        *stmts_slot = statements.first();
        *funcs_slot = functions.first();
        self.ast.nodes[self.module].span = module_span;
        Ok(())
    }

    fn parse_statement(&mut self) -> Result<NodeId, CompileError> {
        while self.current.kind == TokenKind::Semicolon {
            self.advance()?;
        }
        let statement = match self.current.kind {
            TokenKind::NameDecl => self.parse_name_declaration()?,
            TokenKind::If => self.parse_if_statement()?,
            TokenKind::While => self.parse_while_statement()?,
            TokenKind::Print => self.parse_print_statement()?,
            TokenKind::LBrace => self.parse_block()?,
            _ => self.parse_expression()?,
        };
        while self.current.kind == TokenKind::Semicolon {
            self.advance()?;
        }
        Ok(statement)
    }

    /// `$ name ...`: a variable declaration, or a function declaration when
    /// the name is followed by `(`.
    fn parse_name_declaration(&mut self) -> Result<NodeId, CompileError> {
        let decl_span = self.current.span;
        self.advance()?;
        self.expect(TokenKind::Identifier)?;
        let TokenPayload::Name(name) = self.current.payload else {
            return Err(self.unexpected());
        };
        let name_span = self.current.span;
        self.advance()?;

        match self.current.kind {
            TokenKind::LParen => self.parse_function_declaration(decl_span, name, name_span),
            TokenKind::Assign => {
                self.advance()?;
                let init = self.parse_expression()?;
                let span = decl_span.join(self.node_span(init));
                Ok(self.ast.var_decl(span, name, ValueType::Auto, Some(init)))
            }
            TokenKind::Colon => {
                self.advance()?;
                let ty = self
                    .current
                    .type_keyword()
                    .ok_or(CompileError::with_token(
                        ErrorKind::UnknownType,
                        self.current.span,
                        self.current.kind,
                    ))?;
                let ty_span = self.current.span;
                self.advance()?;
                if self.current.kind != TokenKind::Assign {
                    // Annotated, uninitialized declaration.
                    let span = decl_span.join(ty_span);
                    return Ok(self.ast.var_decl(span, name, ty, None));
                }
                self.advance()?;
                let init = self.parse_expression()?;
                let span = decl_span.join(self.node_span(init));
                Ok(self.ast.var_decl(span, name, ty, Some(init)))
            }
            _ => Err(self.unexpected()),
        }
    }

    /// `$ name(param: type, ...) -> type` followed by a block body or
    /// `=> expression`.
    fn parse_function_declaration(
        &mut self,
        decl_span: Span,
        name: NameId,
        name_span: Span,
    ) -> Result<NodeId, CompileError> {
        if self.nesting > 0 {
            // Function declarations are module-level only.
            return Err(self.unexpected());
        }
        self.advance()?; // past '('

        let mut params: SmallVec<[Param; 8]> = SmallVec::new();
        if self.current.kind != TokenKind::RParen {
            loop {
                self.expect(TokenKind::Identifier)?;
                let TokenPayload::Name(param_name) = self.current.payload else {
                    return Err(self.unexpected());
                };
                self.advance()?;
                self.expect(TokenKind::Colon)?;
                self.advance()?;
                let ty = self
                    .current
                    .type_keyword()
                    .ok_or(CompileError::with_token(
                        ErrorKind::UnknownType,
                        self.current.span,
                        self.current.kind,
                    ))?;
                self.advance()?;
                params.push(Param {
                    name: param_name,
                    ty,
                });
                if self.current.kind != TokenKind::Comma {
                    break;
                }
                self.advance()?;
            }
        }
        self.expect(TokenKind::RParen)?;
        self.advance()?;

        let declared_return = if self.current.kind == TokenKind::Arrow {
            self.advance()?;
            let ty = self
                .current
                .type_keyword()
                .ok_or(CompileError::with_token(
                    ErrorKind::UnknownType,
                    self.current.span,
                    self.current.kind,
                ))?;
            self.advance()?;
            Some(ty)
        } else {
            None
        };

        let function_scope = self.ast.scopes.allocate(Some(self.current_scope));
        let outer_scope = self.current_scope;
        self.current_scope = function_scope;
        self.nesting += 1;

        let (body, return_type) = match self.current.kind {
            TokenKind::FatArrow => {
                self.advance()?;
                let body = self.parse_expression()?;
                (body, declared_return.unwrap_or(ValueType::Auto))
            }
            TokenKind::LBrace => {
                let body = self.parse_block()?;
                (body, declared_return.unwrap_or(ValueType::Void))
            }
            _ => return Err(self.unexpected()),
        };

        self.current_scope = outer_scope;
        self.nesting -= 1;

        if self.ast.functions.contains_key(&name) {
            return Err(CompileError::new(
                ErrorKind::FunctionAlreadyDefined,
                name_span,
            ));
        }
        let hash = self.ast.interner.name_hash(name);
        let sig = self.ast.sigs.alloc(FunctionSig {
            name,
            hash,
            return_type,
            params: params.to_vec(),
        });
        self.ast.functions.insert(name, sig);

        let span = decl_span.join(self.node_span(body));
        Ok(self.ast.function_decl(span, sig, body, function_scope))
    }

    /// `# cond body` with optional `! else-body` or `!# ...` chains; the
    /// else-if token is rewritten to a nested if.
    fn parse_if_statement(&mut self) -> Result<NodeId, CompileError> {
        let if_span = self.current.span;
        self.advance()?;

        let condition = self.parse_expression()?;
        let then_branch = self.parse_expression_or_block()?;

        let else_branch = match self.current.kind {
            TokenKind::Bang => {
                self.advance()?;
                Some(self.parse_expression_or_block()?)
            }
            TokenKind::ElseIf => {
                self.current.kind = TokenKind::If;
                Some(self.parse_if_statement()?)
            }
            _ => None,
        };

        let end = else_branch.unwrap_or(then_branch);
        let span = if_span.join(self.node_span(end));
        Ok(self.ast.if_stmt(span, condition, then_branch, else_branch))
    }

    /// `@ cond body`.
    fn parse_while_statement(&mut self) -> Result<NodeId, CompileError> {
        let while_span = self.current.span;
        self.advance()?;
        let condition = self.parse_expression()?;
        let body = self.parse_expression_or_block()?;
        let span = while_span.join(self.node_span(body));
        Ok(self.ast.while_stmt(span, condition, body))
    }

    /// `:: expr, expr, ...`.
    fn parse_print_statement(&mut self) -> Result<NodeId, CompileError> {
        let print_span = self.current.span;
        self.advance()?;

        let mut args = ChainBuilder::new();
        let mut last_span = print_span;
        while self.current.kind != TokenKind::Eof {
            let expr = self.parse_expression()?;
            last_span = self.node_span(expr);
            args.push(&mut self.ast, expr);
            if self.current.kind != TokenKind::Comma {
                break;
            }
            self.advance()?;
        }

        Ok(self.ast.print_stmt(print_span.join(last_span), args.first()))
    }

    /// `{ statements }` in a fresh scope.
    fn parse_block(&mut self) -> Result<NodeId, CompileError> {
        let lbrace_span = self.current.span;
        self.advance()?;

        let block_scope = self.ast.scopes.allocate(Some(self.current_scope));
        let outer_scope = self.current_scope;
        self.current_scope = block_scope;
        self.nesting += 1;

        let result = (|| {
            let mut statements = ChainBuilder::new();
            loop {
                while self.current.kind == TokenKind::Semicolon {
                    self.advance()?;
                }
                if self.current.kind == TokenKind::RBrace {
                    break;
                }
                if self.current.kind == TokenKind::Eof {
                    return Err(self.unexpected());
                }
                let statement = self.parse_statement()?;
                statements.push(&mut self.ast, statement);
            }
            let rbrace_span = self.current.span;
            self.advance()?;
            Ok((statements.first(), rbrace_span))
        })();

        self.current_scope = outer_scope;
        self.nesting -= 1;

        let (statements, rbrace_span) = result?;
        Ok(self
            .ast
            .block(lbrace_span.join(rbrace_span), block_scope, statements))
    }

    fn parse_expression_or_block(&mut self) -> Result<NodeId, CompileError> {
        if self.current.kind == TokenKind::LBrace {
            self.parse_block()
        } else {
            self.parse_expression()
        }
    }

    fn parse_expression(&mut self) -> Result<NodeId, CompileError> {
        self.parse_expression_with_precedence(PREC_MINIMAL)
    }

    fn parse_expression_with_precedence(&mut self, min: u8) -> Result<NodeId, CompileError> {
        let mut left = self.parse_unary_expression()?;

        loop {
            let op_token = self.current.kind;
            let prec = precedence(op_token);
            if prec < min {
                break;
            }

            if op_token == TokenKind::Question {
                self.advance()?;
                let then_expr = self.parse_expression()?;
                self.expect(TokenKind::Colon)?;
                self.advance()?;
                // The else branch parses one level below ternary precedence
                // to keep `a ? b : c ? d : e` right-associative.
                let else_expr = self.parse_expression_with_precedence(PREC_TERNARY - 1)?;
                let span = self.node_span(left).join(self.node_span(else_expr));
                left = self.ast.ternary(span, left, then_expr, else_expr);
                continue;
            }

            self.advance()?;
            let op = binary_op_of(op_token).expect("token with a precedence maps to an operator");
            let right_min = if is_right_assoc(op) { prec } else { prec + 1 };
            let right = self.parse_expression_with_precedence(right_min)?;
            let span = self.node_span(left).join(self.node_span(right));
            left = self
                .ast
                .binary(span, op, left, right, op != BinaryOp::Assign);
        }

        Ok(left)
    }

    fn parse_unary_expression(&mut self) -> Result<NodeId, CompileError> {
        let Some(op) = unary_op_of(self.current.kind) else {
            return self.parse_primary_expression();
        };
        let op_span = self.current.span;
        self.advance()?;
        let operand = self.parse_unary_expression()?;
        let pure = !matches!(op, UnaryOp::Increment | UnaryOp::Decrement);
        let span = op_span.join(self.node_span(operand));
        Ok(self.ast.unary(span, op, operand, pure))
    }

    fn parse_primary_expression(&mut self) -> Result<NodeId, CompileError> {
        match self.current.kind {
            // Only the numeric type keywords open a cast.
            TokenKind::I64Type | TokenKind::F64Type => self.parse_type_cast(),
            TokenKind::IntLiteral | TokenKind::FloatLiteral | TokenKind::StrLiteral => {
                let value = self
                    .current
                    .literal_value()
                    .ok_or_else(|| self.unexpected())?;
                let span = self.current.span;
                self.advance()?;
                Ok(self.ast.literal(span, value))
            }
            TokenKind::Identifier => {
                let TokenPayload::Name(name) = self.current.payload else {
                    return Err(self.unexpected());
                };
                let span = self.current.span;
                self.advance()?;
                if self.current.kind == TokenKind::LParen {
                    self.parse_function_call(name, span)
                } else {
                    Ok(self.ast.var_ref(span, name))
                }
            }
            TokenKind::LParen => self.parse_parenthesized_expression(),
            _ => Err(self.unexpected()),
        }
    }

    fn parse_parenthesized_expression(&mut self) -> Result<NodeId, CompileError> {
        let lparen_span = self.current.span;
        self.advance()?;
        let inner = self.parse_expression()?;
        self.expect(TokenKind::RParen)?;
        let rparen_span = self.current.span;
        self.advance()?;
        // The parenthesized text belongs to the inner expression's span.
        self.ast.nodes[inner].span = lparen_span.join(rparen_span);
        Ok(inner)
    }

    /// `i64(expr)` / `f64(expr)` — an explicit cast, pre-flagged pure.
    fn parse_type_cast(&mut self) -> Result<NodeId, CompileError> {
        let keyword_span = self.current.span;
        let target = self
            .current
            .type_keyword()
            .ok_or_else(|| self.unexpected())?;
        self.advance()?;
        self.expect(TokenKind::LParen)?;
        self.advance()?;
        let expr = self.parse_expression()?;
        self.expect(TokenKind::RParen)?;
        let rparen_span = self.current.span;
        self.advance()?;
        Ok(self
            .ast
            .type_cast(keyword_span.join(rparen_span), expr, target, true))
    }

    fn parse_function_call(&mut self, callee: NameId, name_span: Span) -> Result<NodeId, CompileError> {
        self.advance()?; // past '('

        let mut args = ChainBuilder::new();
        let mut arg_count = 0u32;
        if self.current.kind != TokenKind::RParen {
            loop {
                let arg = self.parse_expression()?;
                args.push(&mut self.ast, arg);
                arg_count += 1;
                if self.current.kind != TokenKind::Comma {
                    break;
                }
                self.advance()?;
            }
        }
        self.expect(TokenKind::RParen)?;
        let rparen_span = self.current.span;
        self.advance()?;

        Ok(self
            .ast
            .function_call(name_span.join(rparen_span), callee, args.first(), arg_count))
    }
}
