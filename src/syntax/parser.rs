//! Hand-written recursive descent parser.
//!
//! Produces one [`File`] per source file. Errors are values carrying the
//! byte offset where parsing stopped; a file that fails to parse is
//! skipped by the loader, it never aborts a request.

use thiserror::Error;

use crate::base::Span;
use crate::syntax::ast::*;
use crate::syntax::lexer::{self, Tok, Token};

#[derive(Debug, Error)]
#[error("syntax error at offset {offset}: {message}")]
pub struct SyntaxError {
    pub message: String,
    pub offset: u32,
}

type PResult<T> = Result<T, SyntaxError>;

/// Parse a whole source file.
pub fn parse_file(src: &str) -> PResult<File> {
    let mut p = Parser::new(src);
    p.parse_file()
}

/// Parse a single type expression, as produced by the printer. The
/// resolver uses this to re-enter type strings it synthesized earlier
/// (`map[string]int`, `func(int) error`, ...).
pub fn parse_type_str(src: &str) -> Option<Expr> {
    let mut p = Parser::new(src);
    match p.parse_type() {
        Ok(expr) if p.at_eof_or_semi() => Some(expr),
        _ => None,
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    end: u32,
}

impl Parser {
    fn new(src: &str) -> Self {
        Self {
            tokens: lexer::tokenize(src),
            pos: 0,
            end: src.len() as u32,
        }
    }

    fn peek(&self) -> Tok {
        self.tokens.get(self.pos).map_or(Tok::Error, |t| t.kind)
    }

    fn nth(&self, n: usize) -> Tok {
        self.tokens.get(self.pos + n).map_or(Tok::Error, |t| t.kind)
    }

    fn at_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn at_eof_or_semi(&self) -> bool {
        self.at_eof() || self.peek() == Tok::Semi
    }

    fn offset(&self) -> u32 {
        self.tokens.get(self.pos).map_or(self.end, |t| t.span.start)
    }

    fn prev_end(&self) -> u32 {
        if self.pos == 0 {
            0
        } else {
            self.tokens[self.pos - 1].span.end
        }
    }

    fn bump(&mut self) -> Token {
        let t = self.tokens.get(self.pos).cloned().unwrap_or(Token {
            kind: Tok::Error,
            text: String::new(),
            span: Span::new(self.end, self.end),
        });
        self.pos += 1;
        t
    }

    fn at(&self, kind: Tok) -> bool {
        self.peek() == kind
    }

    fn eat(&mut self, kind: Tok) -> bool {
        if self.at(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: Tok) -> PResult<Token> {
        if self.at(kind) {
            Ok(self.bump())
        } else {
            Err(self.error(format!("expected {:?}, found {:?}", kind, self.peek())))
        }
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError {
            message: message.into(),
            offset: self.offset(),
        }
    }

    fn ident(&mut self) -> PResult<Ident> {
        let t = self.expect(Tok::Ident)?;
        Ok(Ident::new(t.text, t.span))
    }

    // ------------------------------------------------------------------
    // File and declarations
    // ------------------------------------------------------------------

    fn parse_file(&mut self) -> PResult<File> {
        let start = self.offset();
        self.expect(Tok::Package)?;
        let package = self.ident()?;
        self.expect(Tok::Semi)?;

        let mut decls = Vec::new();
        while !self.at_eof() {
            if self.eat(Tok::Semi) {
                continue;
            }
            decls.push(self.parse_decl()?);
        }
        Ok(File {
            package,
            decls,
            span: Span::new(start, self.end),
        })
    }

    fn parse_decl(&mut self) -> PResult<Decl> {
        let start = self.offset();
        let decl = match self.peek() {
            Tok::Import => {
                self.bump();
                let mut specs = Vec::new();
                if self.eat(Tok::LParen) {
                    while !self.at(Tok::RParen) && !self.at_eof() {
                        if self.eat(Tok::Semi) {
                            continue;
                        }
                        specs.push(self.parse_import_spec()?);
                    }
                    self.expect(Tok::RParen)?;
                } else {
                    specs.push(self.parse_import_spec()?);
                }
                DeclKind::Import(specs)
            }
            Tok::Const => {
                self.bump();
                DeclKind::Const(self.parse_value_specs()?)
            }
            Tok::Var => {
                self.bump();
                DeclKind::Var(self.parse_value_specs()?)
            }
            Tok::Type => {
                self.bump();
                let mut specs = Vec::new();
                if self.eat(Tok::LParen) {
                    while !self.at(Tok::RParen) && !self.at_eof() {
                        if self.eat(Tok::Semi) {
                            continue;
                        }
                        specs.push(self.parse_type_spec()?);
                    }
                    self.expect(Tok::RParen)?;
                } else {
                    specs.push(self.parse_type_spec()?);
                }
                DeclKind::Type(specs)
            }
            Tok::Func => DeclKind::Func(self.parse_func_decl()?),
            other => return Err(self.error(format!("expected declaration, found {other:?}"))),
        };
        Ok(Decl {
            kind: decl,
            span: Span::new(start, self.prev_end()),
        })
    }

    fn parse_import_spec(&mut self) -> PResult<ImportSpec> {
        let start = self.offset();
        let alias = if self.at(Tok::Ident) {
            Some(self.ident()?)
        } else if self.at(Tok::Dot) {
            let t = self.bump();
            Some(Ident::new(".", t.span))
        } else {
            None
        };
        let path_tok = self.expect(Tok::Str)?;
        Ok(ImportSpec {
            alias,
            path: lexer::unquote(&path_tok.text),
            path_span: path_tok.span,
            span: Span::new(start, path_tok.span.end),
        })
    }

    fn parse_value_specs(&mut self) -> PResult<Vec<ValueSpec>> {
        let mut specs = Vec::new();
        if self.eat(Tok::LParen) {
            while !self.at(Tok::RParen) && !self.at_eof() {
                if self.eat(Tok::Semi) {
                    continue;
                }
                specs.push(self.parse_value_spec()?);
            }
            self.expect(Tok::RParen)?;
        } else {
            specs.push(self.parse_value_spec()?);
        }
        Ok(specs)
    }

    fn parse_value_spec(&mut self) -> PResult<ValueSpec> {
        let start = self.offset();
        let mut names = vec![self.ident()?];
        while self.eat(Tok::Comma) {
            names.push(self.ident()?);
        }
        let ty = if !self.at(Tok::Eq) && !self.at(Tok::Semi) && !self.at(Tok::RParen) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let mut values = Vec::new();
        if self.eat(Tok::Eq) {
            values.push(self.parse_expr(false)?);
            while self.eat(Tok::Comma) {
                values.push(self.parse_expr(false)?);
            }
        }
        Ok(ValueSpec {
            names,
            ty,
            values,
            span: Span::new(start, self.prev_end()),
        })
    }

    fn parse_type_spec(&mut self) -> PResult<TypeSpec> {
        let start = self.offset();
        let name = self.ident()?;
        // Alias declarations use `=`; both forms record the same shape.
        self.eat(Tok::Eq);
        let ty = self.parse_type()?;
        Ok(TypeSpec {
            name,
            ty,
            span: Span::new(start, self.prev_end()),
        })
    }

    fn parse_func_decl(&mut self) -> PResult<FuncDecl> {
        let start = self.offset();
        self.expect(Tok::Func)?;
        let recv = if self.at(Tok::LParen) {
            let mut fields = self.parse_paren_field_list()?;
            if fields.len() != 1 {
                return Err(self.error("receiver must be a single field"));
            }
            Some(fields.remove(0))
        } else {
            None
        };
        let name = self.ident()?;
        let ty = self.parse_signature()?;
        let body = if self.at(Tok::LBrace) {
            Some(self.parse_block()?)
        } else {
            None
        };
        Ok(FuncDecl {
            name,
            recv,
            ty,
            body,
            span: Span::new(start, self.prev_end()),
        })
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    fn parse_type(&mut self) -> PResult<Expr> {
        let start = self.offset();
        match self.peek() {
            Tok::Ident => {
                let name = self.ident()?;
                if self.at(Tok::Dot) && self.nth(1) == Tok::Ident {
                    self.bump();
                    let sel = self.ident()?;
                    let span = Span::new(start, sel.span.end);
                    let x = Expr::new(ExprKind::Ident(name.name), name.span);
                    Ok(Expr::new(
                        ExprKind::Selector {
                            x: Box::new(x),
                            sel,
                        },
                        span,
                    ))
                } else {
                    Ok(Expr::new(ExprKind::Ident(name.name), name.span))
                }
            }
            Tok::Star => {
                self.bump();
                let inner = self.parse_type()?;
                let span = Span::new(start, inner.span.end);
                Ok(Expr::new(ExprKind::Star(Box::new(inner)), span))
            }
            Tok::LBracket => {
                self.bump();
                let len = if self.at(Tok::RBracket) {
                    None
                } else if self.eat(Tok::DotDotDot) {
                    None
                } else {
                    Some(Box::new(self.parse_expr(false)?))
                };
                self.expect(Tok::RBracket)?;
                let elt = self.parse_type()?;
                let span = Span::new(start, elt.span.end);
                Ok(Expr::new(
                    ExprKind::ArrayType {
                        len,
                        elt: Box::new(elt),
                    },
                    span,
                ))
            }
            Tok::Map => {
                self.bump();
                self.expect(Tok::LBracket)?;
                let key = self.parse_type()?;
                self.expect(Tok::RBracket)?;
                let value = self.parse_type()?;
                let span = Span::new(start, value.span.end);
                Ok(Expr::new(
                    ExprKind::MapType {
                        key: Box::new(key),
                        value: Box::new(value),
                    },
                    span,
                ))
            }
            Tok::Chan => {
                self.bump();
                let dir = if self.eat(Tok::Arrow) {
                    ChanDir::Send
                } else {
                    ChanDir::Both
                };
                let elt = self.parse_type()?;
                let span = Span::new(start, elt.span.end);
                Ok(Expr::new(
                    ExprKind::ChanType {
                        dir,
                        elt: Box::new(elt),
                    },
                    span,
                ))
            }
            Tok::Arrow => {
                self.bump();
                self.expect(Tok::Chan)?;
                let elt = self.parse_type()?;
                let span = Span::new(start, elt.span.end);
                Ok(Expr::new(
                    ExprKind::ChanType {
                        dir: ChanDir::Recv,
                        elt: Box::new(elt),
                    },
                    span,
                ))
            }
            Tok::Func => {
                self.bump();
                let ty = self.parse_signature()?;
                let span = ty.span;
                Ok(Expr::new(ExprKind::FuncType(ty), span))
            }
            Tok::Struct => self.parse_struct_type(),
            Tok::Interface => self.parse_interface_type(),
            Tok::LParen => {
                self.bump();
                let inner = self.parse_type()?;
                let close = self.expect(Tok::RParen)?;
                Ok(Expr::new(
                    ExprKind::Paren(Box::new(inner)),
                    Span::new(start, close.span.end),
                ))
            }
            Tok::DotDotDot => {
                self.bump();
                let elt = self.parse_type()?;
                let span = Span::new(start, elt.span.end);
                Ok(Expr::new(
                    ExprKind::Ellipsis {
                        elt: Some(Box::new(elt)),
                    },
                    span,
                ))
            }
            other => Err(self.error(format!("expected type, found {other:?}"))),
        }
    }

    fn starts_type(&self) -> bool {
        matches!(
            self.peek(),
            Tok::Ident
                | Tok::Star
                | Tok::LBracket
                | Tok::Map
                | Tok::Chan
                | Tok::Arrow
                | Tok::Func
                | Tok::Struct
                | Tok::Interface
                | Tok::LParen
                | Tok::DotDotDot
        )
    }

    fn parse_struct_type(&mut self) -> PResult<Expr> {
        let start = self.offset();
        self.expect(Tok::Struct)?;
        self.expect(Tok::LBrace)?;
        let mut fields = Vec::new();
        while !self.at(Tok::RBrace) && !self.at_eof() {
            if self.eat(Tok::Semi) {
                continue;
            }
            fields.push(self.parse_struct_field()?);
        }
        let close = self.expect(Tok::RBrace)?;
        let span = Span::new(start, close.span.end);
        Ok(Expr::new(
            ExprKind::StructType(StructType { fields, span }),
            span,
        ))
    }

    fn parse_struct_field(&mut self) -> PResult<Field> {
        let start = self.offset();
        let first = self.parse_type()?;
        let field = if first.as_ident().is_some() && (self.at(Tok::Comma) || self.starts_type()) {
            // Named field(s): collect the rest of the name list, then the type.
            let mut names = vec![Ident::new(
                first.as_ident().unwrap_or_default(),
                first.span,
            )];
            while self.eat(Tok::Comma) {
                names.push(self.ident()?);
            }
            let ty = self.parse_type()?;
            Field {
                names,
                ty,
                span: Span::new(start, self.prev_end()),
            }
        } else {
            // Embedded field: a bare (possibly pointer or qualified) type.
            Field {
                names: Vec::new(),
                span: Span::new(start, first.span.end),
                ty: first,
            }
        };
        // Field tags carry no API information here.
        if self.at(Tok::Str) {
            self.bump();
        }
        Ok(field)
    }

    fn parse_interface_type(&mut self) -> PResult<Expr> {
        let start = self.offset();
        self.expect(Tok::Interface)?;
        self.expect(Tok::LBrace)?;
        let mut methods = Vec::new();
        while !self.at(Tok::RBrace) && !self.at_eof() {
            if self.eat(Tok::Semi) {
                continue;
            }
            let fstart = self.offset();
            if self.at(Tok::Ident) && self.nth(1) == Tok::LParen {
                let name = self.ident()?;
                let ty = self.parse_signature()?;
                let span = Span::new(fstart, self.prev_end());
                methods.push(Field {
                    names: vec![name],
                    ty: Expr::new(ExprKind::FuncType(ty), span),
                    span,
                });
            } else {
                let ty = self.parse_type()?;
                methods.push(Field {
                    names: Vec::new(),
                    span: ty.span,
                    ty,
                });
            }
        }
        let close = self.expect(Tok::RBrace)?;
        let span = Span::new(start, close.span.end);
        Ok(Expr::new(
            ExprKind::InterfaceType(InterfaceType { methods, span }),
            span,
        ))
    }

    /// Parameters and results, the `func` keyword already consumed.
    fn parse_signature(&mut self) -> PResult<FuncType> {
        let start = self.offset();
        let params = self.parse_paren_field_list()?;
        let results = if self.at(Tok::LParen) {
            self.parse_paren_field_list()?
        } else if self.starts_type() {
            let ty = self.parse_type()?;
            vec![Field {
                names: Vec::new(),
                span: ty.span,
                ty,
            }]
        } else {
            Vec::new()
        };
        Ok(FuncType {
            params,
            results,
            span: Span::new(start, self.prev_end()),
        })
    }

    /// A parenthesized field list: parameters, results, or a receiver.
    ///
    /// Elements are collected as types first; when an element turns out
    /// to be followed by a type, the pending elements were names all
    /// along and are redistributed (the grammar's usual two-token
    /// lookahead dodge).
    fn parse_paren_field_list(&mut self) -> PResult<Vec<Field>> {
        self.expect(Tok::LParen)?;
        let mut fields: Vec<Field> = Vec::new();
        let mut pending: Vec<Expr> = Vec::new();
        while !self.at(Tok::RParen) && !self.at_eof() {
            let start = pending.first().map_or(self.offset(), |e| e.span.start);
            let elem = self.parse_type()?;
            if elem.as_ident().is_some() && self.starts_type() {
                let mut names: Vec<Ident> = Vec::new();
                for e in pending.drain(..) {
                    match e.kind {
                        ExprKind::Ident(name) => names.push(Ident::new(name, e.span)),
                        _ => return Err(self.error("mixed named and unnamed parameters")),
                    }
                }
                names.push(Ident::new(elem.as_ident().unwrap_or_default(), elem.span));
                let ty = self.parse_type()?;
                fields.push(Field {
                    names,
                    ty,
                    span: Span::new(start, self.prev_end()),
                });
            } else {
                pending.push(elem);
            }
            if !self.eat(Tok::Comma) {
                break;
            }
        }
        self.expect(Tok::RParen)?;
        for e in pending {
            fields.push(Field {
                names: Vec::new(),
                span: e.span,
                ty: e,
            });
        }
        Ok(fields)
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn parse_block(&mut self) -> PResult<Block> {
        let open = self.expect(Tok::LBrace)?;
        let mut stmts = Vec::new();
        while !self.at(Tok::RBrace) && !self.at_eof() {
            if self.eat(Tok::Semi) {
                continue;
            }
            stmts.push(self.parse_stmt()?);
        }
        let close = self.expect(Tok::RBrace)?;
        Ok(Block {
            stmts,
            span: Span::new(open.span.start, close.span.end),
        })
    }

    fn parse_stmt(&mut self) -> PResult<Stmt> {
        let start = self.offset();
        let kind = match self.peek() {
            Tok::Const | Tok::Var | Tok::Type => StmtKind::Decl(self.parse_decl()?),
            Tok::LBrace => StmtKind::Block(self.parse_block()?),
            Tok::If => return self.parse_if(),
            Tok::For => return self.parse_for(),
            Tok::Switch => return self.parse_switch(),
            Tok::Select => return self.parse_select(),
            Tok::Go => {
                self.bump();
                StmtKind::Go(self.parse_expr(false)?)
            }
            Tok::Defer => {
                self.bump();
                StmtKind::Defer(self.parse_expr(false)?)
            }
            Tok::Return => {
                self.bump();
                let mut results = Vec::new();
                if !self.at(Tok::Semi) && !self.at(Tok::RBrace) {
                    results.push(self.parse_expr(false)?);
                    while self.eat(Tok::Comma) {
                        results.push(self.parse_expr(false)?);
                    }
                }
                StmtKind::Return(results)
            }
            Tok::Break | Tok::Continue | Tok::Goto | Tok::Fallthrough => {
                self.bump();
                let label = if self.at(Tok::Ident) {
                    Some(self.ident()?)
                } else {
                    None
                };
                StmtKind::Branch { label }
            }
            Tok::Semi => {
                self.bump();
                StmtKind::Empty
            }
            _ => {
                if self.at(Tok::Ident) && self.nth(1) == Tok::Colon {
                    let label = self.ident()?;
                    self.bump(); // ':'
                    let stmt = self.parse_stmt()?;
                    let span = Span::new(start, stmt.span.end);
                    return Ok(Stmt {
                        kind: StmtKind::Labeled {
                            label,
                            stmt: Box::new(stmt),
                        },
                        span,
                    });
                }
                return self.parse_simple_stmt(false);
            }
        };
        Ok(Stmt {
            kind,
            span: Span::new(start, self.prev_end()),
        })
    }

    fn is_assign_op(tok: Tok) -> bool {
        matches!(
            tok,
            Tok::Eq
                | Tok::ColonEq
                | Tok::PlusEq
                | Tok::MinusEq
                | Tok::StarEq
                | Tok::SlashEq
                | Tok::PercentEq
                | Tok::AmpEq
                | Tok::PipeEq
                | Tok::CaretEq
                | Tok::ShlEq
                | Tok::ShrEq
                | Tok::AmpCaretEq
        )
    }

    /// Expression statement, send, inc/dec, or assignment.
    fn parse_simple_stmt(&mut self, no_lit: bool) -> PResult<Stmt> {
        let start = self.offset();
        let mut lhs = vec![self.parse_expr(no_lit)?];
        while self.eat(Tok::Comma) {
            lhs.push(self.parse_expr(no_lit)?);
        }
        let kind = if Self::is_assign_op(self.peek()) {
            let op = self.bump();
            let mut rhs = vec![self.parse_expr(no_lit)?];
            while self.eat(Tok::Comma) {
                rhs.push(self.parse_expr(no_lit)?);
            }
            StmtKind::Assign {
                lhs,
                rhs,
                define: op.kind == Tok::ColonEq,
            }
        } else if self.at(Tok::Arrow) && lhs.len() == 1 {
            self.bump();
            let value = self.parse_expr(no_lit)?;
            StmtKind::Send {
                chan: lhs.remove(0),
                value,
            }
        } else if (self.at(Tok::PlusPlus) || self.at(Tok::MinusMinus)) && lhs.len() == 1 {
            self.bump();
            StmtKind::IncDec { x: lhs.remove(0) }
        } else {
            StmtKind::Expr(lhs.remove(0))
        };
        Ok(Stmt {
            kind,
            span: Span::new(start, self.prev_end()),
        })
    }

    fn parse_if(&mut self) -> PResult<Stmt> {
        let start = self.offset();
        self.expect(Tok::If)?;
        let first = self.parse_simple_stmt(true)?;
        let (init, cond) = if self.eat(Tok::Semi) {
            let cond_stmt = self.parse_simple_stmt(true)?;
            (Some(Box::new(first)), Self::stmt_expr(cond_stmt)?)
        } else {
            (None, Self::stmt_expr(first)?)
        };
        let body = self.parse_block()?;
        let else_branch = if self.eat(Tok::Else) {
            Some(Box::new(if self.at(Tok::If) {
                self.parse_if()?
            } else {
                let blk = self.parse_block()?;
                let span = blk.span;
                Stmt {
                    kind: StmtKind::Block(blk),
                    span,
                }
            }))
        } else {
            None
        };
        Ok(Stmt {
            kind: StmtKind::If {
                init,
                cond,
                body,
                else_branch,
            },
            span: Span::new(start, self.prev_end()),
        })
    }

    fn stmt_expr(stmt: Stmt) -> PResult<Expr> {
        match stmt.kind {
            StmtKind::Expr(e) => Ok(e),
            _ => Err(SyntaxError {
                message: "expected condition expression".into(),
                offset: stmt.span.start,
            }),
        }
    }

    fn parse_for(&mut self) -> PResult<Stmt> {
        let start = self.offset();
        self.expect(Tok::For)?;

        if self.at(Tok::LBrace) {
            let body = self.parse_block()?;
            return Ok(Stmt {
                kind: StmtKind::For {
                    init: None,
                    cond: None,
                    post: None,
                    body,
                },
                span: Span::new(start, self.prev_end()),
            });
        }

        if self.eat(Tok::Range) {
            let x = self.parse_expr(true)?;
            let body = self.parse_block()?;
            return Ok(Stmt {
                kind: StmtKind::Range {
                    key: None,
                    value: None,
                    define: false,
                    x,
                    body,
                },
                span: Span::new(start, self.prev_end()),
            });
        }

        // `for k, v := range x` / `for k = range x`: look for `range`
        // after the assignment operator while parsing the first clause.
        let clause_start = self.offset();
        let mut lhs = Vec::new();
        if !self.at(Tok::Semi) {
            lhs.push(self.parse_expr(true)?);
            while self.eat(Tok::Comma) {
                lhs.push(self.parse_expr(true)?);
            }
            if Self::is_assign_op(self.peek()) {
                let op = self.bump();
                if self.eat(Tok::Range) {
                    let x = self.parse_expr(true)?;
                    let body = self.parse_block()?;
                    let mut iter = lhs.into_iter();
                    return Ok(Stmt {
                        kind: StmtKind::Range {
                            key: iter.next(),
                            value: iter.next(),
                            define: op.kind == Tok::ColonEq,
                            x,
                            body,
                        },
                        span: Span::new(start, self.prev_end()),
                    });
                }
                let mut rhs = vec![self.parse_expr(true)?];
                while self.eat(Tok::Comma) {
                    rhs.push(self.parse_expr(true)?);
                }
                let init = Stmt {
                    kind: StmtKind::Assign {
                        lhs,
                        rhs,
                        define: op.kind == Tok::ColonEq,
                    },
                    span: Span::new(clause_start, self.prev_end()),
                };
                return self.parse_for_rest(start, Some(init));
            }
            if self.at(Tok::LBrace) && lhs.len() == 1 {
                // `for cond { ... }`
                let cond = lhs.remove(0);
                let body = self.parse_block()?;
                return Ok(Stmt {
                    kind: StmtKind::For {
                        init: None,
                        cond: Some(cond),
                        post: None,
                        body,
                    },
                    span: Span::new(start, self.prev_end()),
                });
            }
            let init = Stmt {
                kind: StmtKind::Expr(lhs.remove(0)),
                span: Span::new(clause_start, self.prev_end()),
            };
            return self.parse_for_rest(start, Some(init));
        }
        self.parse_for_rest(start, None)
    }

    /// The `; cond ; post { body }` tail of a three-clause `for`.
    fn parse_for_rest(&mut self, start: u32, init: Option<Stmt>) -> PResult<Stmt> {
        self.expect(Tok::Semi)?;
        let cond = if self.at(Tok::Semi) {
            None
        } else {
            Some(self.parse_expr(true)?)
        };
        self.expect(Tok::Semi)?;
        let post = if self.at(Tok::LBrace) {
            None
        } else {
            Some(Box::new(self.parse_simple_stmt(true)?))
        };
        let body = self.parse_block()?;
        Ok(Stmt {
            kind: StmtKind::For {
                init: init.map(Box::new),
                cond,
                post,
                body,
            },
            span: Span::new(start, self.prev_end()),
        })
    }

    fn is_type_switch_guard(stmt: &Stmt) -> bool {
        let expr = match &stmt.kind {
            StmtKind::Expr(e) => e,
            StmtKind::Assign { rhs, .. } if rhs.len() == 1 => &rhs[0],
            _ => return false,
        };
        matches!(&expr.kind, ExprKind::TypeAssert { ty: None, .. })
    }

    fn parse_switch(&mut self) -> PResult<Stmt> {
        let start = self.offset();
        self.expect(Tok::Switch)?;

        let mut init: Option<Box<Stmt>> = None;
        let mut guard: Option<Stmt> = None;
        if !self.at(Tok::LBrace) {
            let first = self.parse_simple_stmt(true)?;
            if self.eat(Tok::Semi) {
                init = Some(Box::new(first));
                if !self.at(Tok::LBrace) {
                    guard = Some(self.parse_simple_stmt(true)?);
                }
            } else {
                guard = Some(first);
            }
        }

        let type_switch = guard.as_ref().is_some_and(Self::is_type_switch_guard);
        let cases = self.parse_case_clauses()?;
        let kind = if type_switch {
            StmtKind::TypeSwitch {
                init,
                assign: Box::new(guard.unwrap_or(Stmt {
                    kind: StmtKind::Empty,
                    span: Span::new(start, start),
                })),
                cases,
            }
        } else {
            let tag = match guard {
                Some(stmt) => Some(Self::stmt_expr(stmt)?),
                None => None,
            };
            StmtKind::Switch { init, tag, cases }
        };
        Ok(Stmt {
            kind,
            span: Span::new(start, self.prev_end()),
        })
    }

    fn parse_case_clauses(&mut self) -> PResult<Vec<CaseClause>> {
        self.expect(Tok::LBrace)?;
        let mut cases = Vec::new();
        while !self.at(Tok::RBrace) && !self.at_eof() {
            let cstart = self.offset();
            let list = if self.eat(Tok::Case) {
                let mut list = vec![self.parse_expr(false)?];
                while self.eat(Tok::Comma) {
                    list.push(self.parse_expr(false)?);
                }
                list
            } else {
                self.expect(Tok::Default)?;
                Vec::new()
            };
            self.expect(Tok::Colon)?;
            let body = self.parse_clause_body()?;
            cases.push(CaseClause {
                list,
                body,
                span: Span::new(cstart, self.prev_end()),
            });
        }
        self.expect(Tok::RBrace)?;
        Ok(cases)
    }

    fn parse_clause_body(&mut self) -> PResult<Vec<Stmt>> {
        let mut body = Vec::new();
        while !self.at(Tok::Case) && !self.at(Tok::Default) && !self.at(Tok::RBrace) && !self.at_eof()
        {
            if self.eat(Tok::Semi) {
                continue;
            }
            body.push(self.parse_stmt()?);
        }
        Ok(body)
    }

    fn parse_select(&mut self) -> PResult<Stmt> {
        let start = self.offset();
        self.expect(Tok::Select)?;
        self.expect(Tok::LBrace)?;
        let mut cases = Vec::new();
        while !self.at(Tok::RBrace) && !self.at_eof() {
            let cstart = self.offset();
            let comm = if self.eat(Tok::Case) {
                Some(Box::new(self.parse_simple_stmt(false)?))
            } else {
                self.expect(Tok::Default)?;
                None
            };
            self.expect(Tok::Colon)?;
            let body = self.parse_clause_body()?;
            cases.push(CommClause {
                comm,
                body,
                span: Span::new(cstart, self.prev_end()),
            });
        }
        self.expect(Tok::RBrace)?;
        Ok(Stmt {
            kind: StmtKind::Select { cases },
            span: Span::new(start, self.prev_end()),
        })
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn parse_expr(&mut self, no_lit: bool) -> PResult<Expr> {
        self.parse_binary(1, no_lit)
    }

    fn parse_binary(&mut self, min_prec: u8, no_lit: bool) -> PResult<Expr> {
        let mut lhs = self.parse_unary(no_lit)?;
        loop {
            let Some(op) = self.binary_op() else { break };
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.bump();
            let rhs = self.parse_binary(prec + 1, no_lit)?;
            let span = lhs.span.to(rhs.span);
            lhs = Expr::new(
                ExprKind::Binary {
                    op,
                    x: Box::new(lhs),
                    y: Box::new(rhs),
                },
                span,
            );
        }
        Ok(lhs)
    }

    fn binary_op(&self) -> Option<BinOp> {
        Some(match self.peek() {
            Tok::PipePipe => BinOp::LOr,
            Tok::AmpAmp => BinOp::LAnd,
            Tok::EqEq => BinOp::Eql,
            Tok::NotEq => BinOp::Neq,
            Tok::Lt => BinOp::Lss,
            Tok::Le => BinOp::Leq,
            Tok::Gt => BinOp::Gtr,
            Tok::Ge => BinOp::Geq,
            Tok::Plus => BinOp::Add,
            Tok::Minus => BinOp::Sub,
            Tok::Pipe => BinOp::Or,
            Tok::Caret => BinOp::Xor,
            Tok::Star => BinOp::Mul,
            Tok::Slash => BinOp::Div,
            Tok::Percent => BinOp::Rem,
            Tok::Shl => BinOp::Shl,
            Tok::Shr => BinOp::Shr,
            Tok::Amp => BinOp::And,
            Tok::AmpCaret => BinOp::AndNot,
            _ => return None,
        })
    }

    fn parse_unary(&mut self, no_lit: bool) -> PResult<Expr> {
        let start = self.offset();
        let op = match self.peek() {
            Tok::Plus => Some(UnOp::Pos),
            Tok::Minus => Some(UnOp::Neg),
            Tok::Not => Some(UnOp::Not),
            Tok::Caret => Some(UnOp::Xor),
            Tok::Amp => Some(UnOp::Amp),
            Tok::Arrow => Some(UnOp::Arrow),
            Tok::Star => {
                self.bump();
                let x = self.parse_unary(no_lit)?;
                let span = Span::new(start, x.span.end);
                return Ok(Expr::new(ExprKind::Star(Box::new(x)), span));
            }
            _ => None,
        };
        if let Some(op) = op {
            // `<-chan T` is a type, not a receive.
            if op == UnOp::Arrow && self.nth(1) == Tok::Chan {
                return self.parse_type();
            }
            self.bump();
            let x = self.parse_unary(no_lit)?;
            let span = Span::new(start, x.span.end);
            return Ok(Expr::new(
                ExprKind::Unary {
                    op,
                    x: Box::new(x),
                },
                span,
            ));
        }
        self.parse_primary(no_lit)
    }

    fn parse_primary(&mut self, no_lit: bool) -> PResult<Expr> {
        let mut x = self.parse_operand(no_lit)?;
        loop {
            match self.peek() {
                Tok::Dot => {
                    self.bump();
                    if self.eat(Tok::LParen) {
                        let ty = if self.eat(Tok::Type) {
                            None
                        } else {
                            Some(Box::new(self.parse_type()?))
                        };
                        let close = self.expect(Tok::RParen)?;
                        let span = Span::new(x.span.start, close.span.end);
                        x = Expr::new(
                            ExprKind::TypeAssert {
                                x: Box::new(x),
                                ty,
                            },
                            span,
                        );
                    } else {
                        let sel = self.ident()?;
                        let span = Span::new(x.span.start, sel.span.end);
                        x = Expr::new(
                            ExprKind::Selector {
                                x: Box::new(x),
                                sel,
                            },
                            span,
                        );
                    }
                }
                Tok::LParen => {
                    self.bump();
                    let mut args = Vec::new();
                    while !self.at(Tok::RParen) && !self.at_eof() {
                        args.push(self.parse_expr(false)?);
                        // `f(xs...)` spreads; the shape is all we keep.
                        self.eat(Tok::DotDotDot);
                        if !self.eat(Tok::Comma) {
                            break;
                        }
                    }
                    let close = self.expect(Tok::RParen)?;
                    let span = Span::new(x.span.start, close.span.end);
                    x = Expr::new(
                        ExprKind::Call {
                            func: Box::new(x),
                            args,
                        },
                        span,
                    );
                }
                Tok::LBracket => {
                    self.bump();
                    let low = if self.at(Tok::Colon) {
                        None
                    } else {
                        Some(Box::new(self.parse_expr(false)?))
                    };
                    if self.eat(Tok::Colon) {
                        let high = if self.at(Tok::RBracket) || self.at(Tok::Colon) {
                            None
                        } else {
                            Some(Box::new(self.parse_expr(false)?))
                        };
                        // Three-index slices add a capacity bound.
                        if self.eat(Tok::Colon) && !self.at(Tok::RBracket) {
                            self.parse_expr(false)?;
                        }
                        let close = self.expect(Tok::RBracket)?;
                        let span = Span::new(x.span.start, close.span.end);
                        x = Expr::new(
                            ExprKind::Slice {
                                x: Box::new(x),
                                low,
                                high,
                            },
                            span,
                        );
                    } else {
                        let index = low
                            .ok_or_else(|| self.error("expected index expression"))?;
                        let close = self.expect(Tok::RBracket)?;
                        let span = Span::new(x.span.start, close.span.end);
                        x = Expr::new(
                            ExprKind::Index {
                                x: Box::new(x),
                                index,
                            },
                            span,
                        );
                    }
                }
                Tok::LBrace => {
                    if !Self::can_start_composite(&x) || (no_lit && Self::is_bare_name(&x)) {
                        break;
                    }
                    let elts = self.parse_composite_body()?;
                    let span = Span::new(x.span.start, self.prev_end());
                    x = Expr::new(
                        ExprKind::CompositeLit {
                            ty: Some(Box::new(x)),
                            elts,
                        },
                        span,
                    );
                }
                _ => break,
            }
        }
        Ok(x)
    }

    fn can_start_composite(x: &Expr) -> bool {
        matches!(
            x.kind,
            ExprKind::Ident(_)
                | ExprKind::Selector { .. }
                | ExprKind::ArrayType { .. }
                | ExprKind::MapType { .. }
                | ExprKind::StructType(_)
        )
    }

    fn is_bare_name(x: &Expr) -> bool {
        matches!(x.kind, ExprKind::Ident(_) | ExprKind::Selector { .. })
    }

    fn parse_composite_body(&mut self) -> PResult<Vec<Expr>> {
        self.expect(Tok::LBrace)?;
        let mut elts = Vec::new();
        while !self.at(Tok::RBrace) && !self.at_eof() {
            elts.push(self.parse_composite_elt()?);
            if !self.eat(Tok::Comma) {
                self.eat(Tok::Semi);
            }
        }
        self.expect(Tok::RBrace)?;
        Ok(elts)
    }

    fn parse_composite_elt(&mut self) -> PResult<Expr> {
        let start = self.offset();
        let value = if self.at(Tok::LBrace) {
            // Nested literal with elided type.
            let elts = self.parse_composite_body()?;
            Expr::new(
                ExprKind::CompositeLit { ty: None, elts },
                Span::new(start, self.prev_end()),
            )
        } else {
            self.parse_expr(false)?
        };
        if self.eat(Tok::Colon) {
            let v = if self.at(Tok::LBrace) {
                let elts = self.parse_composite_body()?;
                Expr::new(
                    ExprKind::CompositeLit { ty: None, elts },
                    Span::new(start, self.prev_end()),
                )
            } else {
                self.parse_expr(false)?
            };
            let span = Span::new(start, self.prev_end());
            return Ok(Expr::new(
                ExprKind::KeyValue {
                    key: Box::new(value),
                    value: Box::new(v),
                },
                span,
            ));
        }
        Ok(value)
    }

    fn parse_operand(&mut self, _no_lit: bool) -> PResult<Expr> {
        let start = self.offset();
        match self.peek() {
            Tok::Int => self.lit(LitKind::Int),
            Tok::Float => self.lit(LitKind::Float),
            Tok::Imag => self.lit(LitKind::Imag),
            Tok::Char => self.lit(LitKind::Char),
            Tok::Str => self.lit(LitKind::Str),
            Tok::Ident => {
                let t = self.bump();
                Ok(Expr::new(ExprKind::Ident(t.text), t.span))
            }
            Tok::LParen => {
                self.bump();
                let inner = self.parse_expr(false)?;
                let close = self.expect(Tok::RParen)?;
                Ok(Expr::new(
                    ExprKind::Paren(Box::new(inner)),
                    Span::new(start, close.span.end),
                ))
            }
            Tok::Func => {
                self.bump();
                let ty = self.parse_signature()?;
                if self.at(Tok::LBrace) {
                    let body = self.parse_block()?;
                    let span = Span::new(start, self.prev_end());
                    Ok(Expr::new(ExprKind::FuncLit { ty, body }, span))
                } else {
                    let span = ty.span;
                    Ok(Expr::new(ExprKind::FuncType(ty), span))
                }
            }
            Tok::LBracket | Tok::Map | Tok::Chan | Tok::Struct | Tok::Interface | Tok::Arrow => {
                self.parse_type()
            }
            other => Err(self.error(format!("unexpected token {other:?}"))),
        }
    }

    fn lit(&mut self, kind: LitKind) -> PResult<Expr> {
        let t = self.bump();
        Ok(Expr::new(
            ExprKind::BasicLit {
                kind,
                value: t.text,
            },
            t.span,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(src: &str) -> File {
        parse_file(src).expect("parse failed")
    }

    #[test]
    fn test_parse_package_and_const() {
        let f = file("package p\nconst K = 1\n");
        assert_eq!(f.package.name, "p");
        assert_eq!(f.decls.len(), 1);
        match &f.decls[0].kind {
            DeclKind::Const(specs) => {
                assert_eq!(specs[0].names[0].name, "K");
                assert_eq!(specs[0].values.len(), 1);
            }
            other => panic!("expected const decl, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_struct_fields_and_embedding() {
        let f = file("package p\ntype A struct {\n\tX, Y int\n\tio.Reader\n\t*B\n}\n");
        match &f.decls[0].kind {
            DeclKind::Type(specs) => match &specs[0].ty.kind {
                ExprKind::StructType(st) => {
                    assert_eq!(st.fields.len(), 3);
                    assert_eq!(st.fields[0].names.len(), 2);
                    assert!(st.fields[1].names.is_empty());
                    assert!(st.fields[2].names.is_empty());
                    assert!(matches!(st.fields[2].ty.kind, ExprKind::Star(_)));
                }
                other => panic!("expected struct, got {other:?}"),
            },
            other => panic!("expected type decl, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_interface_methods() {
        let f = file("package p\ntype R interface {\n\tRead([]byte) (int, error)\n\terror\n}\n");
        match &f.decls[0].kind {
            DeclKind::Type(specs) => match &specs[0].ty.kind {
                ExprKind::InterfaceType(it) => {
                    assert_eq!(it.methods.len(), 2);
                    assert_eq!(it.methods[0].names[0].name, "Read");
                    assert!(it.methods[1].names.is_empty());
                }
                other => panic!("expected interface, got {other:?}"),
            },
            other => panic!("expected type decl, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_method_with_receiver() {
        let f = file("package p\nfunc (t *T) Close() error { return nil }\n");
        match &f.decls[0].kind {
            DeclKind::Func(fd) => {
                assert_eq!(fd.name.name, "Close");
                let recv = fd.recv.as_ref().expect("receiver");
                assert_eq!(recv.names[0].name, "t");
                assert!(matches!(recv.ty.kind, ExprKind::Star(_)));
            }
            other => panic!("expected func decl, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_range_and_type_switch() {
        let src = r#"package p
func f(v interface{}, xs []int) {
	for i, x := range xs {
		_ = i + x
	}
	switch t := v.(type) {
	case int:
		_ = t
	default:
	}
}
"#;
        let f = file(src);
        match &f.decls[0].kind {
            DeclKind::Func(fd) => {
                let body = fd.body.as_ref().expect("body");
                assert!(matches!(body.stmts[0].kind, StmtKind::Range { .. }));
                assert!(matches!(body.stmts[1].kind, StmtKind::TypeSwitch { .. }));
            }
            other => panic!("expected func decl, got {other:?}"),
        }
    }

    #[test]
    fn test_composite_literal_suppressed_in_if_header() {
        let src = "package p\nfunc f(x int) {\n\tif x > 0 {\n\t\tx--\n\t}\n}\n";
        assert!(parse_file(src).is_ok());
    }

    #[test]
    fn test_parse_type_str_round_trip_shapes() {
        assert!(matches!(
            parse_type_str("map[string]int").map(|e| e.kind),
            Some(ExprKind::MapType { .. })
        ));
        assert!(matches!(
            parse_type_str("[]byte").map(|e| e.kind),
            Some(ExprKind::ArrayType { len: None, .. })
        ));
        assert!(matches!(
            parse_type_str("func(int) string").map(|e| e.kind),
            Some(ExprKind::FuncType(_))
        ));
        assert!(parse_type_str("not a type ((").is_none());
    }

    #[test]
    fn test_parse_error_reports_offset() {
        let err = parse_file("package p\nfunc {\n").unwrap_err();
        assert!(err.offset > 0);
    }
}
