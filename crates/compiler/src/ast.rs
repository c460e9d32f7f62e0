//! Abstract syntax tree.
//!
//! `Stmt` and `Exp` are sum types with one case per construct, so code
//! generation is an exhaustive match on the discriminator. Nodes are built
//! once by the parser and never mutated; identifiers carry their resolved
//! symbol, so later stages never look names up again.
//!
//! `Display` renders the canonical source form: every infix and unary
//! expression fully parenthesized. The parser tests assert these strings.

use crate::types::Type;
use std::collections::HashMap;
use std::fmt;

/// A named storage site: local, parameter, or global.
#[derive(Debug, Clone, PartialEq)]
pub struct Var {
    pub name: String,
    pub ty: Type,
    pub is_local: bool,
    /// Byte offset below the frame base. Globals have none; their address
    /// is their label.
    pub offset: usize,
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.ty, self.name)
    }
}

/// A string literal and its unique data-section label (`.L.string.N`).
#[derive(Debug, Clone, PartialEq)]
pub struct StringLit {
    pub value: String,
    pub label: String,
}

impl StringLit {
    /// Emitted size in bytes, including the trailing NUL of `.string`.
    pub fn size(&self) -> usize {
        self.value.len() + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Neg,
    Deref,
    Addr,
    Sizeof,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnaryOp::Plus => "+",
            UnaryOp::Neg => "-",
            UnaryOp::Deref => "*",
            UnaryOp::Addr => "&",
            UnaryOp::Sizeof => "sizeof",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl InfixOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            InfixOp::Eq | InfixOp::Ne | InfixOp::Lt | InfixOp::Le | InfixOp::Gt | InfixOp::Ge
        )
    }
}

impl fmt::Display for InfixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InfixOp::Assign => "=",
            InfixOp::Add => "+",
            InfixOp::Sub => "-",
            InfixOp::Mul => "*",
            InfixOp::Div => "/",
            InfixOp::Eq => "==",
            InfixOp::Ne => "!=",
            InfixOp::Lt => "<",
            InfixOp::Le => "<=",
            InfixOp::Gt => ">",
            InfixOp::Ge => ">=",
        };
        write!(f, "{}", s)
    }
}

/// An expression. Every variant records the byte offset of its first token
/// for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub enum Exp {
    Num {
        val: i64,
        offset: usize,
    },
    Str {
        lit: StringLit,
        offset: usize,
    },
    Ident {
        var: Var,
        offset: usize,
    },
    /// `name[index]`; the base must name an array.
    Index {
        var: Var,
        index: Box<Exp>,
        offset: usize,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Exp>,
        offset: usize,
    },
    Infix {
        op: InfixOp,
        left: Box<Exp>,
        right: Box<Exp>,
        offset: usize,
    },
    Call {
        name: String,
        args: Vec<Exp>,
        /// Return type from the definition when one was seen, `int` for
        /// calls the linker resolves.
        ret: Type,
        offset: usize,
    },
    /// `{ e, e, e }` — legal only as a declaration initializer.
    ArrayLit {
        elems: Vec<Exp>,
        offset: usize,
    },
}

impl Exp {
    /// The synthesized type of this expression.
    ///
    /// Comparisons yield `int`; other infix nodes take the right operand's
    /// type. Dereferencing a pointer or array yields its base, dereferencing
    /// an integral value stays `int`.
    pub fn ty(&self) -> Type {
        match self {
            Exp::Num { .. } => Type::Int,
            Exp::Str { .. } => Type::pointer_to(Type::Char),
            Exp::Ident { var, .. } => var.ty.clone(),
            Exp::Index { var, .. } => var.ty.base().cloned().unwrap_or(Type::Int),
            Exp::Unary { op, operand, .. } => match op {
                UnaryOp::Plus | UnaryOp::Neg | UnaryOp::Sizeof => Type::Int,
                UnaryOp::Addr => Type::pointer_to(operand.ty()),
                UnaryOp::Deref => match operand.ty() {
                    Type::Pointer(base) | Type::Array(base, _) => *base,
                    _ => Type::Int,
                },
            },
            Exp::Infix { op, right, .. } => {
                if op.is_comparison() {
                    Type::Int
                } else {
                    right.ty()
                }
            }
            Exp::Call { ret, .. } => ret.clone(),
            Exp::ArrayLit { elems, .. } => {
                let base = elems.first().map_or(Type::Int, Exp::ty);
                Type::array_of(base, elems.len())
            }
        }
    }

    pub fn offset(&self) -> usize {
        match self {
            Exp::Num { offset, .. }
            | Exp::Str { offset, .. }
            | Exp::Ident { offset, .. }
            | Exp::Index { offset, .. }
            | Exp::Unary { offset, .. }
            | Exp::Infix { offset, .. }
            | Exp::Call { offset, .. }
            | Exp::ArrayLit { offset, .. } => *offset,
        }
    }
}

impl fmt::Display for Exp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exp::Num { val, .. } => write!(f, "{}", val),
            Exp::Str { lit, .. } => write!(f, "\"{}\"", lit.value),
            Exp::Ident { var, .. } => write!(f, "{}", var.name),
            Exp::Index { var, index, .. } => write!(f, "{}[{}]", var.name, index),
            Exp::Unary { op, operand, .. } => {
                if *op == UnaryOp::Sizeof {
                    write!(f, "(sizeof {})", operand)
                } else {
                    write!(f, "({}{})", op, operand)
                }
            }
            Exp::Infix {
                op, left, right, ..
            } => write!(f, "({} {} {})", left, op, right),
            Exp::Call { name, args, .. } => {
                let args = args
                    .iter()
                    .map(Exp::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{}({})", name, args)
            }
            Exp::ArrayLit { elems, .. } => {
                let elems = elems
                    .iter()
                    .map(Exp::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{{{}}}", elems)
            }
        }
    }
}

/// One declaration statement. Multi-declarator source declarations are split
/// while parsing: a declarator with an initializer gets its own node,
/// initializer-less neighbors are grouped.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub vars: Vec<Var>,
    pub init: Option<Exp>,
    pub offset: usize,
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let vars = self
            .vars
            .iter()
            .map(Var::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{}", vars)?;
        if let Some(init) = &self.init {
            write!(f, " = {}", init)?;
        }
        write!(f, ";")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Declaration(Declaration),
    ExpStmt(Exp),
    Return {
        exp: Exp,
    },
    If {
        cond: Exp,
        then: Box<Stmt>,
        els: Option<Box<Stmt>>,
    },
    While {
        cond: Exp,
        body: Box<Stmt>,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Exp>,
        step: Option<Exp>,
        body: Box<Stmt>,
    },
    Block(Vec<Stmt>),
    /// A flat run of statements produced by splitting one declaration.
    StmtList(Vec<Stmt>),
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Declaration(decl) => write!(f, "{}", decl),
            Stmt::ExpStmt(exp) => write!(f, "{};", exp),
            Stmt::Return { exp } => write!(f, "return {};", exp),
            Stmt::If { cond, then, els } => {
                write!(f, "if ({}) {}", cond, then)?;
                if let Some(els) = els {
                    write!(f, " else {}", els)?;
                }
                Ok(())
            }
            Stmt::While { cond, body } => write!(f, "while ({}) {}", cond, body),
            Stmt::For {
                init,
                cond,
                step,
                body,
            } => {
                write!(f, "for (")?;
                match init {
                    Some(init) => write!(f, "{}", init)?,
                    None => write!(f, ";")?,
                }
                if let Some(cond) = cond {
                    write!(f, " {}", cond)?;
                }
                write!(f, ";")?;
                if let Some(step) = step {
                    write!(f, " {}", step)?;
                }
                write!(f, ") {}", body)
            }
            Stmt::Block(stmts) => {
                let joined = stmts
                    .iter()
                    .map(Stmt::to_string)
                    .collect::<Vec<_>>()
                    .join(" ");
                write!(f, "{{ {} }}", joined)
            }
            Stmt::StmtList(stmts) => {
                let joined = stmts
                    .iter()
                    .map(Stmt::to_string)
                    .collect::<Vec<_>>()
                    .join(" ");
                write!(f, "{}", joined)
            }
        }
    }
}

/// A function definition with its resolved frame layout.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncDef {
    pub name: String,
    pub ret: Type,
    pub params: Vec<Var>,
    pub body: Stmt,
    /// All locals (parameters included) by name.
    pub locals: HashMap<String, Var>,
    /// Frame offsets by name; one entry per local.
    pub offsets: HashMap<String, usize>,
    /// Local storage rounded up to 16 bytes.
    pub frame_size: usize,
    pub offset: usize,
}

impl fmt::Display for FuncDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self
            .params
            .iter()
            .map(Var::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{} {} ({}) {}", self.ret, self.name, params, self.body)
    }
}

/// The whole translation unit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub globals: Vec<Declaration>,
    pub funcs: Vec<FuncDef>,
    /// Every string literal in the program, in label order.
    pub strings: Vec<StringLit>,
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self.globals.iter().map(Declaration::to_string).collect();
        parts.extend(self.funcs.iter().map(FuncDef::to_string));
        write!(f, "{}", parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(val: i64) -> Exp {
        Exp::Num { val, offset: 0 }
    }

    fn local(name: &str, ty: Type) -> Var {
        Var {
            name: name.to_string(),
            ty,
            is_local: true,
            offset: 8,
        }
    }

    #[test]
    fn test_infix_display_parenthesizes() {
        let exp = Exp::Infix {
            op: InfixOp::Add,
            left: Box::new(num(1)),
            right: Box::new(Exp::Infix {
                op: InfixOp::Mul,
                left: Box::new(num(2)),
                right: Box::new(num(3)),
                offset: 0,
            }),
            offset: 0,
        };
        assert_eq!(exp.to_string(), "(1 + (2 * 3))");
    }

    #[test]
    fn test_unary_display() {
        let a = Exp::Ident {
            var: local("a", Type::Int),
            offset: 0,
        };
        let neg = Exp::Unary {
            op: UnaryOp::Neg,
            operand: Box::new(a.clone()),
            offset: 0,
        };
        assert_eq!(neg.to_string(), "(-a)");
        let size = Exp::Unary {
            op: UnaryOp::Sizeof,
            operand: Box::new(a),
            offset: 0,
        };
        assert_eq!(size.to_string(), "(sizeof a)");
    }

    #[test]
    fn test_comparison_type_is_int() {
        let c = Exp::Infix {
            op: InfixOp::Lt,
            left: Box::new(num(1)),
            right: Box::new(num(2)),
            offset: 0,
        };
        assert_eq!(c.ty(), Type::Int);
    }

    #[test]
    fn test_addr_and_deref_types() {
        let g = Exp::Ident {
            var: local("g", Type::Int),
            offset: 0,
        };
        let addr = Exp::Unary {
            op: UnaryOp::Addr,
            operand: Box::new(g),
            offset: 0,
        };
        assert_eq!(addr.ty(), Type::pointer_to(Type::Int));
        let deref = Exp::Unary {
            op: UnaryOp::Deref,
            operand: Box::new(addr),
            offset: 0,
        };
        assert_eq!(deref.ty(), Type::Int);
    }

    #[test]
    fn test_declaration_display() {
        let decl = Declaration {
            vars: vec![local("a", Type::pointer_to(Type::Int))],
            init: Some(num(0)),
            offset: 0,
        };
        assert_eq!(decl.to_string(), "int* a = 0;");
    }
}
