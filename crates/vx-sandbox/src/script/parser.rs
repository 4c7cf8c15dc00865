//! Recursive-descent parser producing [`Stmt`] lists.

use std::rc::Rc;

use super::ast::{BinOp, Expr, FunctionDef, LogicalOp, Stmt, UnaryOp};
use super::error::{ErrorKind, ScriptError};
use super::lexer::{Tok, Token, tokenize};

type PResult<T> = Result<T, ScriptError>;

const RESERVED: &[&str] = &[
    "let", "const", "var", "function", "if", "else", "while", "for", "return", "throw",
    "try", "catch", "finally", "break", "continue", "true", "false", "null", "undefined",
    "typeof", "new",
];

/// Parse a complete program. `max_nesting` bounds how deeply statements and
/// expressions may nest.
pub fn parse_program(source: &str, max_nesting: usize) -> PResult<Vec<Stmt>> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        max_nesting,
        loop_depth: 0,
        fn_depth: 0,
    };
    let mut program = Vec::new();
    while !parser.at_eof() {
        program.push(parser.statement()?);
    }
    Ok(program)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    max_nesting: usize,
    loop_depth: usize,
    fn_depth: usize,
}

impl Parser {
    // -- token cursor -----------------------------------------------------

    fn peek(&self) -> &Tok {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].tok
    }

    fn line(&self) -> u32 {
        self.tokens[self.pos.min(self.tokens.len() - 1)].line
    }

    fn prev_line(&self) -> u32 {
        self.tokens[self.pos.saturating_sub(1)].line
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek(), Tok::Eof)
    }

    fn advance(&mut self) -> Tok {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn is_punct(&self, p: &str) -> bool {
        matches!(self.peek(), Tok::Punct(q) if *q == p)
    }

    fn is_keyword(&self, kw: &str) -> bool {
        matches!(self.peek(), Tok::Ident(name) if name == kw)
    }

    fn eat_punct(&mut self, p: &str) -> bool {
        if self.is_punct(p) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        if self.is_keyword(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, p: &str) -> PResult<()> {
        if self.eat_punct(p) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn unexpected(&self) -> ScriptError {
        let what = match self.peek() {
            Tok::Eof => "Unexpected end of input".to_string(),
            Tok::Num(n) => format!("Unexpected number {n}"),
            Tok::Str(_) => "Unexpected string".to_string(),
            Tok::Ident(name) => format!("Unexpected token '{name}'"),
            Tok::Punct(p) => format!("Unexpected token '{p}'"),
        };
        ScriptError::syntax(self.line(), what)
    }

    fn identifier(&mut self) -> PResult<String> {
        match self.peek() {
            Tok::Ident(name) if !RESERVED.contains(&name.as_str()) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            },
            _ => Err(self.unexpected()),
        }
    }

    /// Accept an explicit `;` or an implied one before `}`, end of input, or
    /// a line break.
    fn end_statement(&mut self) -> PResult<()> {
        if self.eat_punct(";") || self.is_punct("}") || self.at_eof() {
            return Ok(());
        }
        if self.line() > self.prev_line() {
            return Ok(());
        }
        Err(self.unexpected())
    }

    fn enter(&mut self) -> PResult<()> {
        self.depth += 1;
        if self.depth > self.max_nesting {
            return Err(ScriptError::new(
                ErrorKind::Range,
                format!("Maximum nesting depth of {} exceeded", self.max_nesting),
            ));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    // -- statements -------------------------------------------------------

    fn statement(&mut self) -> PResult<Stmt> {
        self.enter()?;
        let stmt = self.statement_inner();
        self.leave();
        stmt
    }

    fn statement_inner(&mut self) -> PResult<Stmt> {
        let line = self.line();
        if self.eat_punct(";") {
            return Ok(Stmt::Empty);
        }
        if self.is_punct("{") {
            return Ok(Stmt::Block(self.block()?));
        }
        let word = match self.peek() {
            Tok::Ident(word) => word.clone(),
            _ => return self.expression_statement(),
        };
        match word.as_str() {
            "let" | "var" | "const" => {
                let stmt = self.declaration()?;
                self.end_statement()?;
                Ok(stmt)
            },
            "function" => {
                self.advance();
                let name = self.identifier()?;
                let def = self.function_rest(Some(name))?;
                Ok(Stmt::Function(def))
            },
            "if" => {
                self.advance();
                self.expect_punct("(")?;
                let cond = self.expression()?;
                self.expect_punct(")")?;
                let then = Box::new(self.statement()?);
                let otherwise = if self.eat_keyword("else") {
                    Some(Box::new(self.statement()?))
                } else {
                    None
                };
                Ok(Stmt::If {
                    cond,
                    then,
                    otherwise,
                })
            },
            "while" => {
                self.advance();
                self.expect_punct("(")?;
                let cond = self.expression()?;
                self.expect_punct(")")?;
                let body = Box::new(self.loop_body()?);
                Ok(Stmt::While { cond, body })
            },
            "for" => self.for_statement(),
            "return" => {
                self.advance();
                if self.fn_depth == 0 {
                    return Err(ScriptError::syntax(line, "Illegal return statement"));
                }
                let value = if self.is_punct(";")
                    || self.is_punct("}")
                    || self.at_eof()
                    || self.line() > line
                {
                    None
                } else {
                    Some(self.expression()?)
                };
                self.end_statement()?;
                Ok(Stmt::Return(value))
            },
            "throw" => {
                self.advance();
                if self.line() > line {
                    return Err(ScriptError::syntax(line, "Illegal newline after throw"));
                }
                let value = self.expression()?;
                self.end_statement()?;
                Ok(Stmt::Throw(value))
            },
            "try" => self.try_statement(),
            "break" | "continue" => {
                let is_break = word == "break";
                self.advance();
                if self.loop_depth == 0 {
                    let msg = if is_break {
                        "Illegal break statement"
                    } else {
                        "Illegal continue statement"
                    };
                    return Err(ScriptError::syntax(line, msg));
                }
                self.end_statement()?;
                Ok(if is_break { Stmt::Break } else { Stmt::Continue })
            },
            _ => self.expression_statement(),
        }
    }

    fn expression_statement(&mut self) -> PResult<Stmt> {
        let expr = self.expression()?;
        self.end_statement()?;
        Ok(Stmt::Expr(expr))
    }

    fn block(&mut self) -> PResult<Vec<Stmt>> {
        self.expect_punct("{")?;
        let mut body = Vec::new();
        while !self.is_punct("}") {
            if self.at_eof() {
                return Err(self.unexpected());
            }
            body.push(self.statement()?);
        }
        self.advance();
        Ok(body)
    }

    fn loop_body(&mut self) -> PResult<Stmt> {
        self.loop_depth += 1;
        let body = self.statement();
        self.loop_depth -= 1;
        body
    }

    /// `let a = 1, b;` without the trailing terminator.
    fn declaration(&mut self) -> PResult<Stmt> {
        let constant = matches!(self.advance(), Tok::Ident(kw) if kw == "const");
        let mut bindings = Vec::new();
        loop {
            let line = self.line();
            let name = self.identifier()?;
            let init = if self.eat_punct("=") {
                Some(self.assignment()?)
            } else if constant {
                return Err(ScriptError::syntax(
                    line,
                    "Missing initializer in const declaration",
                ));
            } else {
                None
            };
            bindings.push((name, init));
            if !self.eat_punct(",") {
                break;
            }
        }
        Ok(Stmt::Let { bindings, constant })
    }

    fn for_statement(&mut self) -> PResult<Stmt> {
        self.advance();
        self.expect_punct("(")?;
        let init = if self.is_punct(";") {
            None
        } else if self.is_keyword("let") || self.is_keyword("var") || self.is_keyword("const")
        {
            Some(Box::new(self.declaration()?))
        } else {
            Some(Box::new(Stmt::Expr(self.expression()?)))
        };
        self.expect_punct(";")?;
        let cond = if self.is_punct(";") {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect_punct(";")?;
        let update = if self.is_punct(")") {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect_punct(")")?;
        let body = Box::new(self.loop_body()?);
        Ok(Stmt::For {
            init,
            cond,
            update,
            body,
        })
    }

    fn try_statement(&mut self) -> PResult<Stmt> {
        let line = self.line();
        self.advance();
        let body = self.block()?;
        let mut param = None;
        let mut handler = None;
        if self.eat_keyword("catch") {
            if self.eat_punct("(") {
                param = Some(self.identifier()?);
                self.expect_punct(")")?;
            }
            handler = Some(self.block()?);
        }
        let finalizer = if self.eat_keyword("finally") {
            Some(self.block()?)
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            return Err(ScriptError::syntax(line, "Missing catch or finally after try"));
        }
        Ok(Stmt::Try {
            body,
            param,
            handler,
            finalizer,
        })
    }

    /// Parameters and body after `function name`.
    fn function_rest(&mut self, name: Option<String>) -> PResult<Rc<FunctionDef>> {
        self.expect_punct("(")?;
        let mut params = Vec::new();
        if !self.eat_punct(")") {
            loop {
                params.push(self.identifier()?);
                if self.eat_punct(")") {
                    break;
                }
                self.expect_punct(",")?;
            }
        }
        // Loop control does not cross function boundaries.
        let saved_loops = std::mem::replace(&mut self.loop_depth, 0);
        self.fn_depth += 1;
        let body = self.block();
        self.fn_depth -= 1;
        self.loop_depth = saved_loops;
        Ok(Rc::new(FunctionDef {
            name,
            params,
            body: body?,
        }))
    }

    // -- expressions ------------------------------------------------------

    fn expression(&mut self) -> PResult<Expr> {
        self.enter()?;
        let expr = self.assignment();
        self.leave();
        expr
    }

    fn assignment(&mut self) -> PResult<Expr> {
        let line = self.line();
        let target = self.conditional()?;
        let op = match self.peek() {
            Tok::Punct("=") => None,
            Tok::Punct("+=") => Some(BinOp::Add),
            Tok::Punct("-=") => Some(BinOp::Sub),
            Tok::Punct("*=") => Some(BinOp::Mul),
            Tok::Punct("/=") => Some(BinOp::Div),
            Tok::Punct("%=") => Some(BinOp::Rem),
            _ => return Ok(target),
        };
        if !target.is_assignable() {
            return Err(ScriptError::syntax(line, "Invalid left-hand side in assignment"));
        }
        self.advance();
        self.enter()?;
        let value = self.assignment();
        self.leave();
        Ok(Expr::Assign {
            target: Box::new(target),
            op,
            value: Box::new(value?),
        })
    }

    fn conditional(&mut self) -> PResult<Expr> {
        let cond = self.logical_or()?;
        if !self.eat_punct("?") {
            return Ok(cond);
        }
        let then = self.assignment()?;
        self.expect_punct(":")?;
        let otherwise = self.assignment()?;
        Ok(Expr::Conditional {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    fn logical_or(&mut self) -> PResult<Expr> {
        let mut lhs = self.logical_and()?;
        while self.eat_punct("||") {
            let rhs = self.logical_and()?;
            lhs = Expr::Logical {
                op: LogicalOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn logical_and(&mut self) -> PResult<Expr> {
        let mut lhs = self.equality()?;
        while self.eat_punct("&&") {
            let rhs = self.equality()?;
            lhs = Expr::Logical {
                op: LogicalOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn binary_level(
        &mut self,
        table: &[(&str, BinOp)],
        next: fn(&mut Self) -> PResult<Expr>,
    ) -> PResult<Expr> {
        let mut lhs = next(self)?;
        'outer: loop {
            for (p, op) in table {
                if self.eat_punct(p) {
                    let rhs = next(self)?;
                    lhs = Expr::Binary {
                        op: *op,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    };
                    continue 'outer;
                }
            }
            return Ok(lhs);
        }
    }

    fn equality(&mut self) -> PResult<Expr> {
        self.binary_level(
            &[
                ("===", BinOp::StrictEq),
                ("!==", BinOp::StrictNe),
                ("==", BinOp::Eq),
                ("!=", BinOp::Ne),
            ],
            Self::relational,
        )
    }

    fn relational(&mut self) -> PResult<Expr> {
        self.binary_level(
            &[
                ("<=", BinOp::Le),
                (">=", BinOp::Ge),
                ("<", BinOp::Lt),
                (">", BinOp::Gt),
            ],
            Self::additive,
        )
    }

    fn additive(&mut self) -> PResult<Expr> {
        self.binary_level(&[("+", BinOp::Add), ("-", BinOp::Sub)], Self::multiplicative)
    }

    fn multiplicative(&mut self) -> PResult<Expr> {
        self.binary_level(
            &[("*", BinOp::Mul), ("/", BinOp::Div), ("%", BinOp::Rem)],
            Self::unary,
        )
    }

    fn unary(&mut self) -> PResult<Expr> {
        let line = self.line();
        let op = match self.peek() {
            Tok::Punct("-") => Some(UnaryOp::Neg),
            Tok::Punct("+") => Some(UnaryOp::Plus),
            Tok::Punct("!") => Some(UnaryOp::Not),
            Tok::Ident(kw) if kw == "typeof" => Some(UnaryOp::TypeOf),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            self.enter()?;
            let expr = self.unary();
            self.leave();
            return Ok(Expr::Unary {
                op,
                expr: Box::new(expr?),
            });
        }
        let delta = match self.peek() {
            Tok::Punct("++") => Some(1.0),
            Tok::Punct("--") => Some(-1.0),
            _ => None,
        };
        if let Some(delta) = delta {
            self.advance();
            let target = self.unary()?;
            if !target.is_assignable() {
                return Err(ScriptError::syntax(
                    line,
                    "Invalid left-hand side expression in prefix operation",
                ));
            }
            return Ok(Expr::Update {
                target: Box::new(target),
                delta,
                prefix: true,
            });
        }
        self.postfix()
    }

    fn postfix(&mut self) -> PResult<Expr> {
        let line = self.line();
        let expr = self.call_member()?;
        // A line break before `++` ends the statement instead.
        if self.line() != self.prev_line() {
            return Ok(expr);
        }
        let delta = match self.peek() {
            Tok::Punct("++") => 1.0,
            Tok::Punct("--") => -1.0,
            _ => return Ok(expr),
        };
        if !expr.is_assignable() {
            return Err(ScriptError::syntax(
                line,
                "Invalid left-hand side expression in postfix operation",
            ));
        }
        self.advance();
        Ok(Expr::Update {
            target: Box::new(expr),
            delta,
            prefix: false,
        })
    }

    fn call_member(&mut self) -> PResult<Expr> {
        let mut expr = if self.eat_keyword("new") {
            let callee = self.member_only()?;
            let args = if self.is_punct("(") {
                self.arguments()?
            } else {
                Vec::new()
            };
            Expr::New {
                callee: Box::new(callee),
                args,
            }
        } else {
            self.primary()?
        };
        loop {
            if self.eat_punct(".") {
                let property = self.property_name()?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property,
                };
            } else if self.eat_punct("[") {
                let index = self.expression()?;
                self.expect_punct("]")?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self.is_punct("(") {
                let args = self.arguments()?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    /// Callee of `new`: a primary followed by member accesses, no calls.
    fn member_only(&mut self) -> PResult<Expr> {
        let mut expr = self.primary()?;
        loop {
            if self.eat_punct(".") {
                let property = self.property_name()?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property,
                };
            } else if self.eat_punct("[") {
                let index = self.expression()?;
                self.expect_punct("]")?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                return Ok(expr);
            }
        }
    }

    /// Property after `.`; keywords are allowed here.
    fn property_name(&mut self) -> PResult<String> {
        match self.peek() {
            Tok::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            },
            _ => Err(self.unexpected()),
        }
    }

    fn arguments(&mut self) -> PResult<Vec<Expr>> {
        self.expect_punct("(")?;
        let mut args = Vec::new();
        if self.eat_punct(")") {
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            if self.eat_punct(")") {
                return Ok(args);
            }
            self.expect_punct(",")?;
            if self.eat_punct(")") {
                return Ok(args);
            }
        }
    }

    fn primary(&mut self) -> PResult<Expr> {
        match self.peek().clone() {
            Tok::Num(n) => {
                self.advance();
                Ok(Expr::Number(n))
            },
            Tok::Str(s) => {
                self.advance();
                Ok(Expr::Str(s))
            },
            Tok::Punct("(") => {
                self.advance();
                let expr = self.expression()?;
                self.expect_punct(")")?;
                Ok(expr)
            },
            Tok::Punct("[") => {
                self.advance();
                self.enter()?;
                let items = self.array_items();
                self.leave();
                Ok(Expr::Array(items?))
            },
            Tok::Punct("{") => {
                self.advance();
                self.enter()?;
                let entries = self.object_entries();
                self.leave();
                Ok(Expr::Object(entries?))
            },
            Tok::Ident(word) => match word.as_str() {
                "true" => {
                    self.advance();
                    Ok(Expr::Bool(true))
                },
                "false" => {
                    self.advance();
                    Ok(Expr::Bool(false))
                },
                "null" => {
                    self.advance();
                    Ok(Expr::Null)
                },
                "undefined" => {
                    self.advance();
                    Ok(Expr::Undefined)
                },
                "function" => {
                    self.advance();
                    let name = match self.peek() {
                        Tok::Ident(_) => Some(self.identifier()?),
                        _ => None,
                    };
                    Ok(Expr::Function(self.function_rest(name)?))
                },
                _ => Ok(Expr::Ident(self.identifier()?)),
            },
            _ => Err(self.unexpected()),
        }
    }

    fn array_items(&mut self) -> PResult<Vec<Expr>> {
        let mut items = Vec::new();
        loop {
            if self.eat_punct("]") {
                return Ok(items);
            }
            items.push(self.expression()?);
            if self.eat_punct("]") {
                return Ok(items);
            }
            self.expect_punct(",")?;
        }
    }

    fn object_entries(&mut self) -> PResult<Vec<(String, Expr)>> {
        let mut entries = Vec::new();
        loop {
            if self.eat_punct("}") {
                return Ok(entries);
            }
            let key = match self.peek() {
                Tok::Ident(name) => name.clone(),
                Tok::Str(s) => s.to_string(),
                Tok::Num(n) => super::value::number_to_string(*n),
                _ => return Err(self.unexpected()),
            };
            self.advance();
            let value = if self.eat_punct(":") {
                self.expression()?
            } else if matches!(self.peek(), Tok::Punct(",") | Tok::Punct("}")) {
                // Shorthand `{ name }`.
                Expr::Ident(key.clone())
            } else {
                return Err(self.unexpected());
            };
            entries.push((key, value));
            if self.eat_punct("}") {
                return Ok(entries);
            }
            self.expect_punct(",")?;
        }
    }
}
