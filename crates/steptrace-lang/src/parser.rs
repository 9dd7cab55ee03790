//! Recursive-descent parser.
//!
//! Grammar notes:
//! - A suite is either `: NEWLINE INDENT stmt+ DEDENT` or a single simple
//!   statement on the same line (`if x: y = 1`).
//! - `break`/`continue` outside a loop and `return` outside a function are
//!   rejected here, at compile time, the way CPython does.
//! - Expression precedence, loosest first: `or`, `and`, `not`, comparison
//!   (including `in` / `not in`), additive, multiplicative, unary minus,
//!   postfix (call / index / method), atom.

use crate::ast::*;
use crate::error::SyntaxError;
use crate::lexer::Token;

pub fn parse(tokens: Vec<(Token, u32)>) -> Result<Vec<Stmt>, SyntaxError> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        loop_depth: 0,
        func_depth: 0,
    };
    parser.program()
}

struct Parser {
    tokens: Vec<(Token, u32)>,
    pos: usize,
    loop_depth: u32,
    func_depth: u32,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].0
    }

    fn line(&self) -> u32 {
        self.tokens[self.pos.min(self.tokens.len() - 1)].1
    }

    fn bump(&mut self) -> Token {
        let tok = self.tokens[self.pos.min(self.tokens.len() - 1)].0.clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, tok: &Token) -> bool {
        if self.peek() == tok {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, tok: Token, context: &str) -> Result<(), SyntaxError> {
        if self.peek() == &tok {
            self.bump();
            Ok(())
        } else {
            Err(SyntaxError::new(
                self.line(),
                format!(
                    "expected {} {}, found {}",
                    tok.describe(),
                    context,
                    self.peek().describe()
                ),
            ))
        }
    }

    fn program(&mut self) -> Result<Vec<Stmt>, SyntaxError> {
        let mut stmts = Vec::new();
        while self.peek() != &Token::Eof {
            stmts.push(self.statement()?);
        }
        Ok(stmts)
    }

    fn statement(&mut self) -> Result<Stmt, SyntaxError> {
        let line = self.line();
        match self.peek() {
            Token::Def => self.def_stmt(line),
            Token::If => self.if_stmt(line),
            Token::While => self.while_stmt(line),
            Token::For => self.for_stmt(line),
            _ => self.simple_stmt(),
        }
    }

    /// A one-line statement terminated by NEWLINE.
    fn simple_stmt(&mut self) -> Result<Stmt, SyntaxError> {
        let line = self.line();
        let kind = match self.peek() {
            Token::Return => {
                if self.func_depth == 0 {
                    return Err(SyntaxError::new(line, "'return' outside function"));
                }
                self.bump();
                if self.peek() == &Token::Newline {
                    StmtKind::Return(None)
                } else {
                    StmtKind::Return(Some(self.expression()?))
                }
            }
            Token::Break => {
                if self.loop_depth == 0 {
                    return Err(SyntaxError::new(line, "'break' outside loop"));
                }
                self.bump();
                StmtKind::Break
            }
            Token::Continue => {
                if self.loop_depth == 0 {
                    return Err(SyntaxError::new(line, "'continue' not properly in loop"));
                }
                self.bump();
                StmtKind::Continue
            }
            Token::Pass => {
                self.bump();
                StmtKind::Pass
            }
            Token::Global => {
                self.bump();
                let mut names = vec![self.ident("after 'global'")?];
                while self.eat(&Token::Comma) {
                    names.push(self.ident("after ','")?);
                }
                StmtKind::Global(names)
            }
            _ => self.assignment_or_expr()?,
        };
        self.expect(Token::Newline, "after statement")?;
        Ok(Stmt { line, kind })
    }

    fn assignment_or_expr(&mut self) -> Result<StmtKind, SyntaxError> {
        let expr = self.expression()?;
        let aug = match self.peek() {
            Token::Assign => None,
            Token::PlusAssign => Some(BinOp::Add),
            Token::MinusAssign => Some(BinOp::Sub),
            Token::StarAssign => Some(BinOp::Mul),
            Token::SlashAssign => Some(BinOp::Div),
            Token::SlashSlashAssign => Some(BinOp::FloorDiv),
            Token::PercentAssign => Some(BinOp::Mod),
            _ => return Ok(StmtKind::Expr(expr)),
        };
        let line = self.line();
        self.bump();
        let target = as_target(expr).ok_or_else(|| {
            SyntaxError::new(line, "cannot assign to this expression")
        })?;
        let value = self.expression()?;
        Ok(match aug {
            None => StmtKind::Assign { target, value },
            Some(op) => StmtKind::AugAssign { target, op, value },
        })
    }

    fn def_stmt(&mut self, line: u32) -> Result<Stmt, SyntaxError> {
        self.bump(); // def
        let name = self.ident("after 'def'")?;
        self.expect(Token::LParen, "after function name")?;
        let mut params = Vec::new();
        if self.peek() != &Token::RParen {
            params.push(self.ident("as parameter name")?);
            while self.eat(&Token::Comma) {
                params.push(self.ident("as parameter name")?);
            }
        }
        self.expect(Token::RParen, "after parameters")?;
        self.func_depth += 1;
        // A fresh function body is not inside the enclosing loop.
        let saved_loops = std::mem::replace(&mut self.loop_depth, 0);
        let body = self.suite();
        self.loop_depth = saved_loops;
        self.func_depth -= 1;
        Ok(Stmt {
            line,
            kind: StmtKind::Def {
                name,
                params,
                body: body?,
            },
        })
    }

    fn if_stmt(&mut self, line: u32) -> Result<Stmt, SyntaxError> {
        self.bump(); // if
        let mut arms = vec![(self.expression()?, self.suite()?)];
        let mut orelse = Vec::new();
        loop {
            match self.peek() {
                Token::Elif => {
                    self.bump();
                    arms.push((self.expression()?, self.suite()?));
                }
                Token::Else => {
                    self.bump();
                    orelse = self.suite()?;
                    break;
                }
                _ => break,
            }
        }
        Ok(Stmt {
            line,
            kind: StmtKind::If { arms, orelse },
        })
    }

    fn while_stmt(&mut self, line: u32) -> Result<Stmt, SyntaxError> {
        self.bump(); // while
        let cond = self.expression()?;
        self.loop_depth += 1;
        let body = self.suite();
        self.loop_depth -= 1;
        Ok(Stmt {
            line,
            kind: StmtKind::While { cond, body: body? },
        })
    }

    fn for_stmt(&mut self, line: u32) -> Result<Stmt, SyntaxError> {
        self.bump(); // for
        let var = self.ident("after 'for'")?;
        self.expect(Token::In, "after loop variable")?;
        let iter = self.expression()?;
        self.loop_depth += 1;
        let body = self.suite();
        self.loop_depth -= 1;
        Ok(Stmt {
            line,
            kind: StmtKind::For {
                var,
                iter,
                body: body?,
            },
        })
    }

    fn suite(&mut self) -> Result<Vec<Stmt>, SyntaxError> {
        self.expect(Token::Colon, "to open a block")?;
        if self.eat(&Token::Newline) {
            self.expect(Token::Indent, "to start an indented block")?;
            let mut stmts = Vec::new();
            while self.peek() != &Token::Dedent && self.peek() != &Token::Eof {
                stmts.push(self.statement()?);
            }
            self.expect(Token::Dedent, "to close the block")?;
            Ok(stmts)
        } else {
            // Inline suite: a single simple statement after the colon.
            Ok(vec![self.simple_stmt()?])
        }
    }

    fn ident(&mut self, context: &str) -> Result<String, SyntaxError> {
        let line = self.line();
        match self.bump() {
            Token::Ident(name) => Ok(name),
            other => Err(SyntaxError::new(
                line,
                format!("expected name {context}, found {}", other.describe()),
            )),
        }
    }

    // ---- expressions -------------------------------------------------

    fn expression(&mut self) -> Result<Expr, SyntaxError> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.and_expr()?;
        while self.peek() == &Token::Or {
            let line = self.line();
            self.bump();
            let rhs = self.and_expr()?;
            lhs = Expr {
                line,
                kind: ExprKind::BoolOp {
                    op: BoolOp::Or,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
            };
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.not_expr()?;
        while self.peek() == &Token::And {
            let line = self.line();
            self.bump();
            let rhs = self.not_expr()?;
            lhs = Expr {
                line,
                kind: ExprKind::BoolOp {
                    op: BoolOp::And,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
            };
        }
        Ok(lhs)
    }

    fn not_expr(&mut self) -> Result<Expr, SyntaxError> {
        if self.peek() == &Token::Not {
            let line = self.line();
            self.bump();
            let operand = self.not_expr()?;
            return Ok(Expr {
                line,
                kind: ExprKind::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                },
            });
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, SyntaxError> {
        let lhs = self.additive()?;
        let op = match self.peek() {
            Token::EqEq => CmpOp::Eq,
            Token::NotEq => CmpOp::Ne,
            Token::Lt => CmpOp::Lt,
            Token::Le => CmpOp::Le,
            Token::Gt => CmpOp::Gt,
            Token::Ge => CmpOp::Ge,
            Token::In => CmpOp::In,
            Token::Not => {
                // `not in`
                let line = self.line();
                self.bump();
                self.expect(Token::In, "after 'not' in comparison")?;
                let rhs = self.additive()?;
                return Ok(Expr {
                    line,
                    kind: ExprKind::Compare {
                        op: CmpOp::NotIn,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    },
                });
            }
            _ => return Ok(lhs),
        };
        let line = self.line();
        self.bump();
        let rhs = self.additive()?;
        Ok(Expr {
            line,
            kind: ExprKind::Compare {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
        })
    }

    fn additive(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => return Ok(lhs),
            };
            let line = self.line();
            self.bump();
            let rhs = self.multiplicative()?;
            lhs = Expr {
                line,
                kind: ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
            };
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                Token::SlashSlash => BinOp::FloorDiv,
                Token::Percent => BinOp::Mod,
                _ => return Ok(lhs),
            };
            let line = self.line();
            self.bump();
            let rhs = self.unary()?;
            lhs = Expr {
                line,
                kind: ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
            };
        }
    }

    fn unary(&mut self) -> Result<Expr, SyntaxError> {
        if self.peek() == &Token::Minus {
            let line = self.line();
            self.bump();
            let operand = self.unary()?;
            return Ok(Expr {
                line,
                kind: ExprKind::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(operand),
                },
            });
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.atom()?;
        loop {
            match self.peek() {
                Token::LParen => {
                    let line = self.line();
                    self.bump();
                    let args = self.call_args()?;
                    expr = Expr {
                        line,
                        kind: ExprKind::Call {
                            func: Box::new(expr),
                            args,
                        },
                    };
                }
                Token::LBracket => {
                    let line = self.line();
                    self.bump();
                    let index = self.expression()?;
                    self.expect(Token::RBracket, "after index")?;
                    expr = Expr {
                        line,
                        kind: ExprKind::Index {
                            base: Box::new(expr),
                            index: Box::new(index),
                        },
                    };
                }
                Token::Dot => {
                    let line = self.line();
                    self.bump();
                    let name = self.ident("after '.'")?;
                    self.expect(Token::LParen, "to call a method")?;
                    let args = self.call_args()?;
                    expr = Expr {
                        line,
                        kind: ExprKind::MethodCall {
                            recv: Box::new(expr),
                            name,
                            args,
                        },
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    /// Arguments up to and including the closing `)`.
    fn call_args(&mut self) -> Result<Vec<Expr>, SyntaxError> {
        let mut args = Vec::new();
        if self.peek() != &Token::RParen {
            args.push(self.expression()?);
            while self.eat(&Token::Comma) {
                args.push(self.expression()?);
            }
        }
        self.expect(Token::RParen, "after arguments")?;
        Ok(args)
    }

    fn atom(&mut self) -> Result<Expr, SyntaxError> {
        let line = self.line();
        let kind = match self.bump() {
            Token::Int(v) => ExprKind::Int(v),
            Token::Float(v) => ExprKind::Float(v),
            Token::Str(s) => ExprKind::Str(s),
            Token::True => ExprKind::Bool(true),
            Token::False => ExprKind::Bool(false),
            Token::NoneKw => ExprKind::NoneLit,
            Token::Ident(name) => ExprKind::Name(name),
            Token::LParen => {
                let inner = self.expression()?;
                self.expect(Token::RParen, "after expression")?;
                return Ok(inner);
            }
            Token::LBracket => {
                let mut items = Vec::new();
                if self.peek() != &Token::RBracket {
                    items.push(self.expression()?);
                    while self.eat(&Token::Comma) {
                        if self.peek() == &Token::RBracket {
                            break; // trailing comma
                        }
                        items.push(self.expression()?);
                    }
                }
                self.expect(Token::RBracket, "after list items")?;
                ExprKind::List(items)
            }
            other => {
                return Err(SyntaxError::new(
                    line,
                    format!("unexpected {}", other.describe()),
                ))
            }
        };
        Ok(Expr { line, kind })
    }
}

/// Reinterprets an already-parsed expression as an assignment target.
fn as_target(expr: Expr) -> Option<Target> {
    match expr.kind {
        ExprKind::Name(name) => Some(Target::Name(name)),
        ExprKind::Index { base, index } => Some(Target::Index {
            base: *base,
            index: *index,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn parse_ok(source: &str) -> Vec<Stmt> {
        parse(lex(source).unwrap()).unwrap()
    }

    fn parse_err(source: &str) -> SyntaxError {
        match lex(source) {
            Err(e) => e,
            Ok(toks) => parse(toks).unwrap_err(),
        }
    }

    #[test]
    fn assignment_and_expression() {
        let stmts = parse_ok("x = 1\nprint(x)");
        assert_eq!(stmts.len(), 2);
        assert!(matches!(stmts[0].kind, StmtKind::Assign { .. }));
        assert!(matches!(stmts[1].kind, StmtKind::Expr(_)));
        assert_eq!(stmts[0].line, 1);
        assert_eq!(stmts[1].line, 2);
    }

    #[test]
    fn def_with_body() {
        let stmts = parse_ok("def f(a, b):\n    return a + b\nf(1, 2)");
        match &stmts[0].kind {
            StmtKind::Def { name, params, body } => {
                assert_eq!(name, "f");
                assert_eq!(params, &["a".to_string(), "b".to_string()]);
                assert_eq!(body.len(), 1);
                assert_eq!(body[0].line, 2);
            }
            other => panic!("expected Def, got {other:?}"),
        }
    }

    #[test]
    fn malformed_def_is_a_syntax_error() {
        let err = parse_err("def f(:\n    pass");
        assert_eq!(err.line, 1);
    }

    #[test]
    fn if_elif_else() {
        let stmts = parse_ok("if a:\n    pass\nelif b:\n    pass\nelse:\n    pass");
        match &stmts[0].kind {
            StmtKind::If { arms, orelse } => {
                assert_eq!(arms.len(), 2);
                assert_eq!(orelse.len(), 1);
            }
            other => panic!("expected If, got {other:?}"),
        }
    }

    #[test]
    fn while_with_break() {
        let stmts = parse_ok("while True:\n    break");
        assert!(matches!(stmts[0].kind, StmtKind::While { .. }));
    }

    #[test]
    fn break_outside_loop_rejected() {
        let err = parse_err("break");
        assert!(err.message.contains("outside loop"));
    }

    #[test]
    fn return_outside_function_rejected() {
        let err = parse_err("return 1");
        assert!(err.message.contains("outside function"));
    }

    #[test]
    fn loop_does_not_leak_into_nested_def() {
        // A def inside a loop body starts a fresh loop context.
        let err = parse_err("while True:\n    def f():\n        break");
        assert!(err.message.contains("outside loop"));
    }

    #[test]
    fn precedence_mul_binds_tighter() {
        let stmts = parse_ok("x = 1 + 2 * 3");
        match &stmts[0].kind {
            StmtKind::Assign { value, .. } => match &value.kind {
                ExprKind::Binary { op: BinOp::Add, rhs, .. } => {
                    assert!(matches!(rhs.kind, ExprKind::Binary { op: BinOp::Mul, .. }));
                }
                other => panic!("expected Add at top, got {other:?}"),
            },
            other => panic!("expected Assign, got {other:?}"),
        }
    }

    #[test]
    fn augmented_assignment() {
        let stmts = parse_ok("x += 2");
        assert!(matches!(
            stmts[0].kind,
            StmtKind::AugAssign { op: BinOp::Add, .. }
        ));
    }

    #[test]
    fn index_target() {
        let stmts = parse_ok("xs[0] = 5");
        assert!(matches!(
            stmts[0].kind,
            StmtKind::Assign { target: Target::Index { .. }, .. }
        ));
    }

    #[test]
    fn cannot_assign_to_call() {
        let err = parse_err("f() = 1");
        assert!(err.message.contains("cannot assign"));
    }

    #[test]
    fn method_call() {
        let stmts = parse_ok("xs.append(4)");
        match &stmts[0].kind {
            StmtKind::Expr(e) => assert!(matches!(e.kind, ExprKind::MethodCall { .. })),
            other => panic!("expected Expr, got {other:?}"),
        }
    }

    #[test]
    fn inline_suite() {
        let stmts = parse_ok("if x: y = 1");
        match &stmts[0].kind {
            StmtKind::If { arms, .. } => assert_eq!(arms[0].1.len(), 1),
            other => panic!("expected If, got {other:?}"),
        }
    }

    #[test]
    fn not_in_comparison() {
        let stmts = parse_ok("x = 1 not in xs");
        match &stmts[0].kind {
            StmtKind::Assign { value, .. } => {
                assert!(matches!(value.kind, ExprKind::Compare { op: CmpOp::NotIn, .. }));
            }
            other => panic!("expected Assign, got {other:?}"),
        }
    }

    #[test]
    fn global_statement() {
        let stmts = parse_ok("def f():\n    global a, b\n    a = 1");
        match &stmts[0].kind {
            StmtKind::Def { body, .. } => {
                assert!(matches!(&body[0].kind, StmtKind::Global(names) if names.len() == 2));
            }
            other => panic!("expected Def, got {other:?}"),
        }
    }
}
