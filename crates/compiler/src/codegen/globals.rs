//! `.data` emission and constant folding for global initializers.
//!
//! A global initializer must fold to a closed constant: a number, a string
//! literal, the address of a global, or an array of those. The folder is a
//! small recursive evaluator over the expression tree; anything else is a
//! fatal diagnostic. Data directives match the referenced size of the
//! declared type: `char` is `.byte`, `int` is `.long`, pointers are
//! `.quad`, array elements use the element's directive.

use super::{CodeGen, CodeGenError};
use crate::ast::{Declaration, Exp, InfixOp, StringLit, UnaryOp, Var};
use crate::types::Type;

/// The closed results of folding a global initializer.
enum Folded {
    Num(i64),
    Str(StringLit),
    Addr(String),
    List(Vec<Folded>),
}

fn directive_for(size: usize) -> Result<&'static str, CodeGenError> {
    match size {
        1 => Ok(".byte"),
        4 => Ok(".long"),
        8 => Ok(".quad"),
        other => Err(CodeGenError::Logic(format!("Invalid data size: {}", other))),
    }
}

impl CodeGen<'_> {
    /// Emit one string literal: label, bytes, and size (NUL included).
    pub(super) fn string_def(&mut self, lit: &StringLit) -> Result<(), CodeGenError> {
        self.w.data()?;
        self.w.label(&lit.label)?;
        self.w.string_lit(&lit.value)?;
        Ok(self.w.size(&lit.label, lit.size())?)
    }

    pub(super) fn global_def(&mut self, decl: &Declaration) -> Result<(), CodeGenError> {
        match &decl.init {
            None => {
                for var in &decl.vars {
                    self.zero_global(var)?;
                }
                Ok(())
            }
            Some(init) => {
                let folded = self.eval(init)?;
                self.init_global(&decl.vars[0], folded, init.offset())
            }
        }
    }

    /// An uninitialized global is all zeroes, but still gets its label.
    fn zero_global(&mut self, var: &Var) -> Result<(), CodeGenError> {
        self.w.globl(&var.name)?;
        self.w.data()?;
        self.w.label(&var.name)?;
        match &var.ty {
            Type::Array(..) => Ok(self.w.raw(&format!(".zero {}", var.ty.size()))?),
            ty => {
                let dir = directive_for(ty.size())?;
                Ok(self.w.raw(&format!("{} 0", dir))?)
            }
        }
    }

    fn init_global(&mut self, var: &Var, folded: Folded, offset: usize) -> Result<(), CodeGenError> {
        self.w.globl(&var.name)?;
        self.w.data()?;
        self.w.label(&var.name)?;
        match folded {
            Folded::Num(n) => {
                let dir = directive_for(var.ty.size())?;
                Ok(self.w.raw(&format!("{} {}", dir, n))?)
            }
            Folded::Addr(symbol) => Ok(self.w.raw(&format!(".quad {}", symbol))?),
            Folded::Str(lit) => match &var.ty {
                Type::Array(_, len) => {
                    self.w.string_lit(&lit.value)?;
                    let pad = len - lit.size();
                    if pad > 0 {
                        self.w.raw(&format!(".zero {}", pad))?;
                    }
                    Ok(())
                }
                _ => Ok(self.w.raw(&format!(".quad {}", lit.label))?),
            },
            Folded::List(elems) => {
                let Type::Array(base, len) = &var.ty else {
                    return Err(self.err_at(offset, "Array literal initializes a non-array"));
                };
                let dir = directive_for(base.size())?;
                let count = elems.len();
                for elem in elems {
                    match elem {
                        Folded::Num(n) => self.w.raw(&format!("{} {}", dir, n))?,
                        Folded::Addr(symbol) => self.w.raw(&format!(".quad {}", symbol))?,
                        Folded::Str(lit) => self.w.raw(&format!(".quad {}", lit.label))?,
                        Folded::List(_) => {
                            return Err(
                                self.err_at(offset, "Nested array literal in global initializer")
                            );
                        }
                    }
                }
                let pad = (len - count) * base.size();
                if pad > 0 {
                    self.w.raw(&format!(".zero {}", pad))?;
                }
                Ok(())
            }
        }
    }

    // =========================================================================
    // Constant folding
    // =========================================================================

    fn eval(&self, exp: &Exp) -> Result<Folded, CodeGenError> {
        match exp {
            Exp::Num { val, .. } => Ok(Folded::Num(*val)),
            Exp::Str { lit, .. } => Ok(Folded::Str(lit.clone())),
            Exp::ArrayLit { elems, .. } => Ok(Folded::List(
                elems
                    .iter()
                    .map(|elem| self.eval(elem))
                    .collect::<Result<_, _>>()?,
            )),
            Exp::Unary {
                op,
                operand,
                offset,
            } => match op {
                UnaryOp::Addr => match operand.as_ref() {
                    Exp::Ident { var, .. } => Ok(Folded::Addr(var.name.clone())),
                    other => Err(self.err_at(
                        other.offset(),
                        "Only the address of a named symbol is constant",
                    )),
                },
                UnaryOp::Plus => Ok(Folded::Num(self.eval_num(operand)?)),
                UnaryOp::Neg => Ok(Folded::Num(-self.eval_num(operand)?)),
                _ => Err(self.err_at(
                    *offset,
                    &format!("Invalid operator in global initializer: {}", op),
                )),
            },
            Exp::Infix {
                op,
                left,
                right,
                offset,
            } => {
                let l = self.eval_num(left)?;
                let r = self.eval_num(right)?;
                match op {
                    InfixOp::Add => Ok(Folded::Num(l + r)),
                    InfixOp::Sub => Ok(Folded::Num(l - r)),
                    InfixOp::Mul => Ok(Folded::Num(l * r)),
                    InfixOp::Div => {
                        if r == 0 {
                            Err(self.err_at(*offset, "Division by zero in constant expression"))
                        } else {
                            Ok(Folded::Num(l / r))
                        }
                    }
                    _ => Err(self.err_at(
                        *offset,
                        &format!("Invalid operator in global initializer: {}", op),
                    )),
                }
            }
            _ => Err(self.err_at(exp.offset(), "Non-constant global initializer")),
        }
    }

    fn eval_num(&self, exp: &Exp) -> Result<i64, CodeGenError> {
        match self.eval(exp)? {
            Folded::Num(n) => Ok(n),
            _ => Err(self.err_at(exp.offset(), "Non-constant global initializer")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::Syntax;
    use crate::parser::Parser;

    fn compile(source: &str) -> String {
        let program = Parser::new(source).parse().unwrap();
        CodeGen::new(source, Syntax::Intel)
            .generate(&program)
            .unwrap()
    }

    fn compile_err(source: &str) -> String {
        let program = Parser::new(source).parse().unwrap();
        CodeGen::new(source, Syntax::Intel)
            .generate(&program)
            .unwrap_err()
            .to_string()
    }

    #[test]
    fn test_uninitialized_global_is_zero_with_label() {
        let out = compile("int g; int main() { return g; }");
        assert!(out.contains("  .globl g\n  .data\ng:\n  .long 0\n"));
    }

    #[test]
    fn test_directive_matches_declared_type() {
        let out = compile("char c = 65; int i = 70000; int main() { return 0; }");
        assert!(out.contains("c:\n  .byte 65\n"));
        assert!(out.contains("i:\n  .long 70000\n"));
    }

    #[test]
    fn test_initializer_is_folded() {
        let out = compile("int g = 1 + 2 * 3; int h = -(3) + +4; int main() { return g; }");
        assert!(out.contains("g:\n  .long 7\n"));
        assert!(out.contains("h:\n  .long 1\n"));
    }

    #[test]
    fn test_pointer_global_emits_symbol() {
        let out = compile("int g; int *p = &g; int main() { return 0; }");
        assert!(out.contains("p:\n  .quad g\n"));
    }

    #[test]
    fn test_string_literal_globals() {
        let out = compile("char *s = \"hi\"; int main() { return 0; }");
        assert!(out.contains(".L.string.0:\n  .string \"hi\"\n  .size .L.string.0, 3\n"));
        assert!(out.contains("s:\n  .quad .L.string.0\n"));
    }

    #[test]
    fn test_char_array_from_string() {
        let out = compile("char s[6] = \"hello\"; int main() { return sizeof(s); }");
        assert!(out.contains("s:\n  .string \"hello\"\n"));
        // Exactly fits: 5 bytes + NUL, no padding.
        assert!(!out.contains(".zero"));

        let out = compile("char s[8] = \"hello\"; int main() { return 0; }");
        assert!(out.contains("s:\n  .string \"hello\"\n  .zero 2\n"));
    }

    #[test]
    fn test_array_literal_global() {
        let out = compile("int a[3] = {1, 2, 4}; int main() { return 0; }");
        assert!(out.contains("a:\n  .long 1\n  .long 2\n  .long 4\n"));

        let out = compile("int a[4] = {1, 2}; int main() { return 0; }");
        assert!(out.contains("a:\n  .long 1\n  .long 2\n  .zero 8\n"));
    }

    #[test]
    fn test_uninitialized_global_array() {
        let out = compile("int a[3]; int main() { return 0; }");
        assert!(out.contains("a:\n  .zero 12\n"));
    }

    #[test]
    fn test_non_constant_initializer_is_fatal() {
        let err = compile_err("int a; int g = a; int main() { return 0; }");
        assert!(err.contains("Non-constant global initializer"));
        assert_eq!(err.lines().count(), 3);

        let err = compile_err("int g = 1 / 0; int main() { return 0; }");
        assert!(err.contains("Division by zero in constant expression"));

        let err = compile_err("int g = 1 == 1; int main() { return 0; }");
        assert!(err.contains("Invalid operator in global initializer: =="));
    }
}
