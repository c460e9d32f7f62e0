//! Recursive descent parser, resolver, and checker.
//!
//! One pass, one token of lookahead, and a short rewind over the token
//! stream to tell a function definition from a global declaration. Every
//! node is type-checked as it is built: identifiers resolve to their storage
//! site immediately, operator operands are validated against the type
//! predicates, and frame offsets accumulate as locals are declared. The
//! first error aborts the parse with a framed diagnostic.

use crate::ast::{Declaration, Exp, FuncDef, InfixOp, Program, Stmt, StringLit, UnaryOp, Var};
use crate::diag;
use crate::token::{self, Token, TokenKind, Tokenizer};
use crate::types::Type;
use std::collections::HashMap;

/// Array lengths above this are rejected outright; it keeps every storage
/// computation far away from overflow.
const MAX_ARRAY_LEN: i64 = 1 << 28;

fn align_to(n: usize, align: usize) -> usize {
    n.div_ceil(align) * align
}

/// Everything remembered about a definition for checking later calls. The
/// name is the key of record; no node identity is involved.
struct FuncSig {
    ret: Type,
    params: Vec<(String, Type)>,
}

/// Per-function symbol state while its body is being parsed.
#[derive(Default)]
struct FnCtx {
    locals: HashMap<String, Var>,
    offsets: HashMap<String, usize>,
    offset_cnt: usize,
}

impl FnCtx {
    /// Reserve a frame slot for `ty` and return its offset below `rbp`.
    fn reserve(&mut self, ty: &Type) -> usize {
        self.offset_cnt = align_to(self.offset_cnt, ty.align()) + ty.storage();
        self.offset_cnt
    }
}

pub struct Parser<'src> {
    source: &'src str,
    tokens: Vec<Token>,
    pos: usize,
    marks: Vec<usize>,
    globals: HashMap<String, Var>,
    funcs: HashMap<String, FuncSig>,
    strings: Vec<StringLit>,
    fx: Option<FnCtx>,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Self {
        Parser {
            source,
            tokens: Vec::new(),
            pos: 0,
            marks: Vec::new(),
            globals: HashMap::new(),
            funcs: HashMap::new(),
            strings: Vec::new(),
            fx: None,
        }
    }

    /// Parse the whole translation unit into a typed, resolved program.
    pub fn parse(&mut self) -> Result<Program, String> {
        self.tokens = Tokenizer::new(self.source).tokenize()?;
        self.pos = 1; // skip the Start sentinel

        let mut program = Program::default();
        while self.cur().kind != TokenKind::Eof {
            if self.looks_like_funcdef()? {
                program.funcs.push(self.funcdef()?);
            } else {
                let decls = self.declaration()?;
                program.globals.extend(decls);
            }
        }
        program.strings = std::mem::take(&mut self.strings);
        Ok(program)
    }

    // =========================================================================
    // Token cursor
    // =========================================================================

    fn cur(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) {
        if self.cur().kind != TokenKind::Eof {
            self.pos += 1;
        }
    }

    fn mark(&mut self) {
        self.marks.push(self.pos);
    }

    fn rewind(&mut self) {
        self.pos = self.marks.pop().expect("rewind without mark");
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.cur().kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Require one of `kinds` at the cursor, return the token, and step past
    /// it.
    fn consume(&mut self, kinds: &[TokenKind]) -> Result<Token, String> {
        token::expect(self.source, self.cur(), kinds)?;
        let token = self.cur().clone();
        self.advance();
        Ok(token)
    }

    fn error_at(&self, offset: usize, msg: &str) -> String {
        diag::render(self.source, offset, msg)
    }

    // =========================================================================
    // Symbols
    // =========================================================================

    fn register(&mut self, name: &str, ty: Type, offset: usize) -> Result<Var, String> {
        if let Some(fx) = self.fx.as_mut() {
            if fx.locals.contains_key(name) {
                return Err(self.error_at(offset, &format!("Duplicate declaration: {}", name)));
            }
            let slot = fx.reserve(&ty);
            let var = Var {
                name: name.to_string(),
                ty,
                is_local: true,
                offset: slot,
            };
            fx.locals.insert(name.to_string(), var.clone());
            fx.offsets.insert(name.to_string(), slot);
            Ok(var)
        } else {
            if self.globals.contains_key(name) {
                return Err(self.error_at(offset, &format!("Duplicate declaration: {}", name)));
            }
            let var = Var {
                name: name.to_string(),
                ty,
                is_local: false,
                offset: 0,
            };
            self.globals.insert(name.to_string(), var.clone());
            Ok(var)
        }
    }

    /// `can_assign` plus the null pointer constant: a literal `0` may
    /// initialize or be assigned to any pointer.
    fn assignable(ty: &Type, rhs: &Exp) -> bool {
        ty.can_assign(&rhs.ty())
            || (matches!(ty, Type::Pointer(_)) && matches!(rhs, Exp::Num { val: 0, .. }))
    }

    /// Resolve an identifier, preferring the current function's locals over
    /// globals.
    fn lookup(&self, name: &str, offset: usize) -> Result<Var, String> {
        if let Some(fx) = &self.fx {
            if let Some(var) = fx.locals.get(name) {
                return Ok(var.clone());
            }
        }
        if let Some(var) = self.globals.get(name) {
            return Ok(var.clone());
        }
        Err(self.error_at(offset, &format!("Undeclared identifier: {}", name)))
    }

    // =========================================================================
    // Declarations and definitions
    // =========================================================================

    /// Peek past `declspec "*"* IDENT` to see whether a `(` follows, then
    /// rewind. This is the only place the parser backtracks.
    fn looks_like_funcdef(&mut self) -> Result<bool, String> {
        self.mark();
        let result = (|| {
            self.declspec()?;
            while self.eat(TokenKind::Asterisk) {}
            if self.cur().kind != TokenKind::Ident {
                return Ok(false);
            }
            self.advance();
            Ok(self.cur().kind == TokenKind::LParen)
        })();
        self.rewind();
        result
    }

    fn declspec(&mut self) -> Result<Type, String> {
        let token = self.consume(&[TokenKind::KwInt, TokenKind::KwChar])?;
        Ok(match token.kind {
            TokenKind::KwInt => Type::Int,
            _ => Type::Char,
        })
    }

    /// `"*"* IDENT ("[" NUM "]")?` applied to a base type. Returns the
    /// declared name, its type, and the name token's offset.
    fn declarator(&mut self, base: &Type) -> Result<(String, Type, usize), String> {
        let mut ty = base.clone();
        while self.eat(TokenKind::Asterisk) {
            ty = Type::pointer_to(ty);
        }
        let name = self.consume(&[TokenKind::Ident])?;
        if self.eat(TokenKind::LBracket) {
            let num = self.consume(&[TokenKind::Num])?;
            if num.val <= 0 {
                return Err(self.error_at(num.offset, "Array length must be positive"));
            }
            if num.val > MAX_ARRAY_LEN {
                return Err(self.error_at(num.offset, "Array length out of range"));
            }
            ty = Type::array_of(ty, num.val as usize);
            self.consume(&[TokenKind::RBracket])?;
        }
        Ok((name.lexeme, ty, name.offset))
    }

    /// Parse one declaration statement. Declarators carrying an initializer
    /// become their own `Declaration`; initializer-less neighbors are
    /// grouped, preserving source order. A bare `int;` produces nothing.
    fn declaration(&mut self) -> Result<Vec<Declaration>, String> {
        let base = self.declspec()?;
        let mut decls = Vec::new();
        let mut group: Vec<Var> = Vec::new();
        let mut group_offset = 0;

        if !self.eat(TokenKind::Semicolon) {
            loop {
                let (name, ty, name_offset) = self.declarator(&base)?;
                let var = self.register(&name, ty, name_offset)?;
                if self.eat(TokenKind::Assign) {
                    if !group.is_empty() {
                        decls.push(Declaration {
                            vars: std::mem::take(&mut group),
                            init: None,
                            offset: group_offset,
                        });
                    }
                    let init = self.initializer()?;
                    self.check_initializer(&var, &init)?;
                    decls.push(Declaration {
                        vars: vec![var],
                        init: Some(init),
                        offset: name_offset,
                    });
                } else {
                    if group.is_empty() {
                        group_offset = name_offset;
                    }
                    group.push(var);
                }
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.consume(&[TokenKind::Semicolon])?;
            if !group.is_empty() {
                decls.push(Declaration {
                    vars: group,
                    init: None,
                    offset: group_offset,
                });
            }
        }
        Ok(decls)
    }

    /// `expr` or a braced array literal; the latter is only legal here.
    fn initializer(&mut self) -> Result<Exp, String> {
        if self.cur().kind != TokenKind::LBrace {
            return self.expr();
        }
        let offset = self.cur().offset;
        self.advance();
        let mut elems = vec![self.expr()?];
        while self.eat(TokenKind::Comma) {
            elems.push(self.expr()?);
        }
        self.consume(&[TokenKind::RBrace])?;
        Ok(Exp::ArrayLit { elems, offset })
    }

    fn check_initializer(&self, var: &Var, init: &Exp) -> Result<(), String> {
        if let Type::Array(base, len) = &var.ty {
            match init {
                Exp::Str { lit, .. } if **base == Type::Char => {
                    if lit.size() > *len {
                        return Err(self.error_at(
                            init.offset(),
                            &format!(
                                "String literal of {} bytes does not fit in {}",
                                lit.size(),
                                var.ty
                            ),
                        ));
                    }
                    Ok(())
                }
                Exp::ArrayLit { elems, .. } => {
                    if elems.len() > *len {
                        return Err(self.error_at(
                            init.offset(),
                            &format!("Too many initializers for {}", var.ty),
                        ));
                    }
                    for elem in elems {
                        if !base.can_assign(&elem.ty()) {
                            return Err(self.error_at(
                                elem.offset(),
                                &format!(
                                    "Type mismatch: cannot initialize {} with {}",
                                    base,
                                    elem.ty()
                                ),
                            ));
                        }
                    }
                    Ok(())
                }
                _ => Err(self.error_at(
                    init.offset(),
                    &format!(
                        "Type mismatch: cannot initialize {} from {}",
                        var.ty,
                        init.ty()
                    ),
                )),
            }
        } else if Self::assignable(&var.ty, init) {
            Ok(())
        } else {
            Err(self.error_at(
                init.offset(),
                &format!("Type mismatch: cannot assign {} to {}", init.ty(), var.ty),
            ))
        }
    }

    fn funcdef(&mut self) -> Result<FuncDef, String> {
        let start = self.cur().offset;
        let base = self.declspec()?;
        let mut ret = base;
        while self.eat(TokenKind::Asterisk) {
            ret = Type::pointer_to(ret);
        }
        let name = self.consume(&[TokenKind::Ident])?;
        if self.funcs.contains_key(&name.lexeme) {
            return Err(self.error_at(
                name.offset,
                &format!("Duplicate definition of function: {}", name.lexeme),
            ));
        }

        self.fx = Some(FnCtx::default());
        self.consume(&[TokenKind::LParen])?;
        let mut params = Vec::new();
        if self.cur().kind != TokenKind::RParen {
            loop {
                let pbase = self.declspec()?;
                let (pname, pty, poffset) = self.declarator(&pbase)?;
                // An array parameter decays to a pointer to its element.
                let pty = match pty {
                    Type::Array(base, _) => Type::Pointer(base),
                    ty => ty,
                };
                params.push(self.register(&pname, pty, poffset)?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(&[TokenKind::RParen])?;

        // The signature is visible before the body so recursive calls
        // resolve and check.
        self.funcs.insert(
            name.lexeme.clone(),
            FuncSig {
                ret: ret.clone(),
                params: params
                    .iter()
                    .map(|p| (p.name.clone(), p.ty.clone()))
                    .collect(),
            },
        );

        let body = self.block()?;
        let fx = self.fx.take().expect("function context");
        let frame_size = align_to(fx.offsets.values().copied().max().unwrap_or(0), 16);

        Ok(FuncDef {
            name: name.lexeme,
            ret,
            params,
            body,
            locals: fx.locals,
            offsets: fx.offsets,
            frame_size,
            offset: start,
        })
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn block(&mut self) -> Result<Stmt, String> {
        self.consume(&[TokenKind::LBrace])?;
        let mut stmts = Vec::new();
        while self.cur().kind != TokenKind::RBrace {
            if self.cur().kind == TokenKind::Eof {
                return Err(self.error_at(self.cur().offset, "Unexpected end of input"));
            }
            stmts.push(self.stmt()?);
        }
        self.advance(); // }
        Ok(Stmt::Block(stmts))
    }

    fn declaration_stmt(&mut self) -> Result<Stmt, String> {
        let mut decls = self.declaration()?;
        if decls.len() == 1 {
            Ok(Stmt::Declaration(decls.pop().expect("one declaration")))
        } else {
            Ok(Stmt::StmtList(
                decls.into_iter().map(Stmt::Declaration).collect(),
            ))
        }
    }

    fn stmt(&mut self) -> Result<Stmt, String> {
        match self.cur().kind {
            TokenKind::KwInt | TokenKind::KwChar => self.declaration_stmt(),
            TokenKind::LBrace => self.block(),
            TokenKind::KwReturn => {
                self.advance();
                let exp = self.expr()?;
                self.consume(&[TokenKind::Semicolon])?;
                Ok(Stmt::Return { exp })
            }
            TokenKind::KwIf => {
                self.advance();
                self.consume(&[TokenKind::LParen])?;
                let cond = self.expr()?;
                self.consume(&[TokenKind::RParen])?;
                let then = Box::new(self.stmt()?);
                let els = if self.eat(TokenKind::KwElse) {
                    Some(Box::new(self.stmt()?))
                } else {
                    None
                };
                Ok(Stmt::If { cond, then, els })
            }
            TokenKind::KwWhile => {
                self.advance();
                self.consume(&[TokenKind::LParen])?;
                let cond = self.expr()?;
                self.consume(&[TokenKind::RParen])?;
                let body = Box::new(self.stmt()?);
                Ok(Stmt::While { cond, body })
            }
            TokenKind::KwFor => {
                self.advance();
                self.consume(&[TokenKind::LParen])?;
                let init = if self.eat(TokenKind::Semicolon) {
                    None
                } else if matches!(self.cur().kind, TokenKind::KwInt | TokenKind::KwChar) {
                    Some(Box::new(self.declaration_stmt()?))
                } else {
                    let exp = self.expr()?;
                    self.consume(&[TokenKind::Semicolon])?;
                    Some(Box::new(Stmt::ExpStmt(exp)))
                };
                let cond = if self.cur().kind == TokenKind::Semicolon {
                    None
                } else {
                    Some(self.expr()?)
                };
                self.consume(&[TokenKind::Semicolon])?;
                let step = if self.cur().kind == TokenKind::RParen {
                    None
                } else {
                    Some(self.expr()?)
                };
                self.consume(&[TokenKind::RParen])?;
                let body = Box::new(self.stmt()?);
                Ok(Stmt::For {
                    init,
                    cond,
                    step,
                    body,
                })
            }
            _ => {
                let exp = self.expr()?;
                self.consume(&[TokenKind::Semicolon])?;
                Ok(Stmt::ExpStmt(exp))
            }
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn expr(&mut self) -> Result<Exp, String> {
        self.assign()
    }

    fn assign(&mut self) -> Result<Exp, String> {
        let left = self.equality()?;
        if self.cur().kind != TokenKind::Assign {
            return Ok(left);
        }
        let op_offset = self.cur().offset;
        self.advance();
        let right = self.assign()?;

        if !matches!(
            left,
            Exp::Ident { .. }
                | Exp::Index { .. }
                | Exp::Unary {
                    op: UnaryOp::Deref,
                    ..
                }
        ) {
            return Err(self.error_at(op_offset, "Cannot assign to this expression"));
        }
        if !Self::assignable(&left.ty(), &right) {
            return Err(self.error_at(
                op_offset,
                &format!("Type mismatch: cannot assign {} to {}", right.ty(), left.ty()),
            ));
        }
        Ok(Exp::Infix {
            op: InfixOp::Assign,
            left: Box::new(left),
            right: Box::new(right),
            offset: op_offset,
        })
    }

    fn equality(&mut self) -> Result<Exp, String> {
        let mut node = self.relational()?;
        loop {
            let op = match self.cur().kind {
                TokenKind::Eq => InfixOp::Eq,
                TokenKind::NotEq => InfixOp::Ne,
                _ => return Ok(node),
            };
            let op_offset = self.cur().offset;
            self.advance();
            let right = self.relational()?;
            self.check_comparison(op, &node, &right, op_offset)?;
            node = Exp::Infix {
                op,
                left: Box::new(node),
                right: Box::new(right),
                offset: op_offset,
            };
        }
    }

    fn relational(&mut self) -> Result<Exp, String> {
        let mut node = self.add()?;
        loop {
            let op = match self.cur().kind {
                TokenKind::Lt => InfixOp::Lt,
                TokenKind::Le => InfixOp::Le,
                TokenKind::Gt => InfixOp::Gt,
                TokenKind::Ge => InfixOp::Ge,
                _ => return Ok(node),
            };
            let op_offset = self.cur().offset;
            self.advance();
            let right = self.add()?;
            self.check_comparison(op, &node, &right, op_offset)?;
            node = Exp::Infix {
                op,
                left: Box::new(node),
                right: Box::new(right),
                offset: op_offset,
            };
        }
    }

    fn check_comparison(
        &self,
        op: InfixOp,
        left: &Exp,
        right: &Exp,
        offset: usize,
    ) -> Result<(), String> {
        if left.ty().is_integral() && right.ty().is_integral() {
            Ok(())
        } else {
            Err(self.error_at(
                offset,
                &format!(
                    "Invalid operands for {}: {} and {}",
                    op,
                    left.ty(),
                    right.ty()
                ),
            ))
        }
    }

    fn add(&mut self) -> Result<Exp, String> {
        let mut node = self.mul()?;
        loop {
            let op = match self.cur().kind {
                TokenKind::Plus => InfixOp::Add,
                TokenKind::Minus => InfixOp::Sub,
                _ => return Ok(node),
            };
            let op_offset = self.cur().offset;
            self.advance();
            let right = self.mul()?;
            if !node.ty().can_add(&right.ty()) {
                return Err(self.error_at(
                    op_offset,
                    &format!(
                        "Invalid operands for {}: {} and {}",
                        op,
                        node.ty(),
                        right.ty()
                    ),
                ));
            }
            node = Exp::Infix {
                op,
                left: Box::new(node),
                right: Box::new(right),
                offset: op_offset,
            };
        }
    }

    fn mul(&mut self) -> Result<Exp, String> {
        let mut node = self.unary()?;
        loop {
            let op = match self.cur().kind {
                TokenKind::Asterisk => InfixOp::Mul,
                TokenKind::Slash => InfixOp::Div,
                _ => return Ok(node),
            };
            let op_offset = self.cur().offset;
            self.advance();
            let right = self.unary()?;
            if !node.ty().can_mul(&right.ty()) {
                return Err(self.error_at(
                    op_offset,
                    &format!(
                        "Pointer cannot be multiplied or divided: {} {} {}",
                        node.ty(),
                        op,
                        right.ty()
                    ),
                ));
            }
            node = Exp::Infix {
                op,
                left: Box::new(node),
                right: Box::new(right),
                offset: op_offset,
            };
        }
    }

    fn unary(&mut self) -> Result<Exp, String> {
        let op = match self.cur().kind {
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Asterisk => UnaryOp::Deref,
            TokenKind::Amp => UnaryOp::Addr,
            TokenKind::KwSizeof => UnaryOp::Sizeof,
            _ => return self.primary(),
        };
        let offset = self.cur().offset;
        self.advance();
        let operand = Box::new(self.unary()?);
        Ok(Exp::Unary {
            op,
            operand,
            offset,
        })
    }

    fn primary(&mut self) -> Result<Exp, String> {
        token::expect(
            self.source,
            self.cur(),
            &[
                TokenKind::Num,
                TokenKind::Str,
                TokenKind::Ident,
                TokenKind::LParen,
            ],
        )?;
        match self.cur().kind {
            TokenKind::Num => {
                let token = self.cur().clone();
                self.advance();
                Ok(Exp::Num {
                    val: token.val,
                    offset: token.offset,
                })
            }
            TokenKind::Str => {
                let token = self.cur().clone();
                self.advance();
                let lit = StringLit {
                    value: token.lexeme,
                    label: format!(".L.string.{}", self.strings.len()),
                };
                self.strings.push(lit.clone());
                Ok(Exp::Str {
                    lit,
                    offset: token.offset,
                })
            }
            TokenKind::LParen => {
                self.advance();
                let exp = self.expr()?;
                self.consume(&[TokenKind::RParen])?;
                Ok(exp)
            }
            _ => {
                let name = self.cur().clone();
                self.advance();
                match self.cur().kind {
                    TokenKind::LParen => self.call(name),
                    TokenKind::LBracket => self.index(name),
                    _ => {
                        let var = self.lookup(&name.lexeme, name.offset)?;
                        Ok(Exp::Ident {
                            var,
                            offset: name.offset,
                        })
                    }
                }
            }
        }
    }

    fn call(&mut self, name: Token) -> Result<Exp, String> {
        self.advance(); // (
        let mut args = Vec::new();
        if self.cur().kind != TokenKind::RParen {
            loop {
                args.push(self.expr()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(&[TokenKind::RParen])?;

        // A known definition pins down the arity, the parameter types, and
        // the result type; unknown names are left for the linker and default
        // to int.
        let ret = match self.funcs.get(&name.lexeme) {
            Some(sig) => {
                if args.len() != sig.params.len() {
                    return Err(self.error_at(
                        name.offset,
                        &format!(
                            "Wrong number of arguments to {}: expected {}, got {}",
                            name.lexeme,
                            sig.params.len(),
                            args.len()
                        ),
                    ));
                }
                for (arg, (pname, pty)) in args.iter().zip(&sig.params) {
                    if !Self::assignable(pty, arg) {
                        return Err(self.error_at(
                            arg.offset(),
                            &format!(
                                "Argument types do not match for {}. Expected {}, but got {}.",
                                pname,
                                pty,
                                arg.ty()
                            ),
                        ));
                    }
                }
                sig.ret.clone()
            }
            None => Type::Int,
        };

        Ok(Exp::Call {
            name: name.lexeme,
            args,
            ret,
            offset: name.offset,
        })
    }

    fn index(&mut self, name: Token) -> Result<Exp, String> {
        let var = self.lookup(&name.lexeme, name.offset)?;
        if !matches!(var.ty, Type::Array(..)) {
            return Err(self.error_at(
                name.offset,
                &format!("Array type expected, but got {}", var.ty),
            ));
        }
        self.advance(); // [
        let index = self.expr()?;
        if !index.ty().is_integral() {
            return Err(self.error_at(
                index.offset(),
                &format!("Array index must be integral, but got {}", index.ty()),
            ));
        }
        self.consume(&[TokenKind::RBracket])?;
        Ok(Exp::Index {
            var,
            index: Box::new(index),
            offset: name.offset,
        })
    }
}
