//! Stack-machine code generation.
//!
//! The generator walks the typed AST depth-first and keeps one invariant:
//! every expression leaves its value in RAX (or the width-correct
//! sub-register), and nested evaluations park intermediates on the hardware
//! stack. Addresses are computed into RAX by [`CodeGen::address`]; an
//! assignment pushes the target address, evaluates the right side, and pops
//! the address back into RDI for the store.
//!
//! Conventions this generator commits to:
//! - array r-values decay to the array's address, and `&a[i]` is
//!   `base + i * element_storage` with no negated scale;
//! - `>` and `>=` lower directly to `setg` / `setge`;
//! - stack-passed arguments (the 7th onward) are pushed right-to-left and
//!   read by the callee at `[rbp+16]` upward; the caller pops them after
//!   the call.

mod error;
mod globals;

pub use error::CodeGenError;

use crate::asm::{self, AsmWriter, Syntax};
use crate::ast::{Declaration, Exp, FuncDef, InfixOp, Program, Stmt, UnaryOp, Var};
use crate::diag;
use crate::types::Type;

const RIP: &str = "rip";
const RAX: &str = "rax";
const RBP: &str = "rbp";
const RSP: &str = "rsp";
const RDI: &str = "rdi";
const AL: &str = "al";

/// Parameter registers in System V AMD64 order.
const ARG_REGS: [&str; 6] = ["rdi", "rsi", "rdx", "rcx", "r8", "r9"];

fn dword_reg(reg: &str) -> Option<&'static str> {
    match reg {
        "rax" => Some("eax"),
        "rdi" => Some("edi"),
        "rsi" => Some("esi"),
        "rdx" => Some("edx"),
        "rcx" => Some("ecx"),
        "r8" => Some("r8d"),
        "r9" => Some("r9d"),
        _ => None,
    }
}

fn byte_reg(reg: &str) -> Option<&'static str> {
    match reg {
        "rax" => Some("al"),
        "rdi" => Some("dil"),
        "rsi" => Some("sil"),
        "rdx" => Some("dl"),
        "rcx" => Some("cl"),
        "r8" => Some("r8b"),
        "r9" => Some("r9b"),
        _ => None,
    }
}

/// Pick the sub-register of `reg` matching a value of type `ty`: 1 byte for
/// `char`, 4 for `int`, the full register for pointers and arrays.
fn reg_for(reg: &str, ty: &Type) -> Result<String, CodeGenError> {
    let sub = match ty {
        Type::Char => byte_reg(reg),
        Type::Int => dword_reg(reg),
        Type::Pointer(_) | Type::Array(..) => Some(reg),
    };
    match sub {
        Some(name) => Ok(name.to_string()),
        None => Err(CodeGenError::Logic(format!(
            "Invalid register {} for {}",
            reg, ty
        ))),
    }
}

pub struct CodeGen<'src> {
    source: &'src str,
    w: Box<dyn AsmWriter>,
    label_cnt: usize,
    current_fn: String,
}

impl<'src> CodeGen<'src> {
    pub fn new(source: &'src str, syntax: Syntax) -> Self {
        CodeGen {
            source,
            w: asm::new_writer(syntax),
            label_cnt: 0,
            current_fn: String::new(),
        }
    }

    /// Generate the whole program and hand out the buffered assembly.
    pub fn generate(&mut self, program: &Program) -> Result<String, CodeGenError> {
        self.w.header()?;
        for lit in &program.strings {
            self.string_def(lit)?;
        }
        for decl in &program.globals {
            self.global_def(decl)?;
        }
        for func in &program.funcs {
            self.func_def(func)?;
        }
        Ok(self.w.commit())
    }

    fn err_at(&self, offset: usize, msg: &str) -> CodeGenError {
        CodeGenError::Logic(diag::render(self.source, offset, msg))
    }

    fn gen_label(&mut self) -> String {
        let label = format!(".L{}", self.label_cnt);
        self.label_cnt += 1;
        label
    }

    // =========================================================================
    // Functions
    // =========================================================================

    fn func_def(&mut self, func: &FuncDef) -> Result<(), CodeGenError> {
        self.current_fn = func.name.clone();
        self.w.text()?;
        self.w.globl(&func.name)?;
        self.w.label(&func.name)?;

        // Prologue.
        self.w.push(RBP)?;
        self.w.mov(RSP, RBP)?;
        self.w.sub(&func.frame_size.to_string(), RSP)?;

        self.spill_params(func)?;
        self.stmt(&func.body)?;

        // Epilogue, shared by every return.
        self.w.label(&format!(".L.return.{}", func.name))?;
        self.w.mov(RBP, RSP)?;
        self.w.pop(RBP)?;
        Ok(self.w.ret()?)
    }

    /// Copy every parameter to its home slot: the first six from their
    /// registers, the rest from the caller's argument area above the saved
    /// frame pointer.
    fn spill_params(&mut self, func: &FuncDef) -> Result<(), CodeGenError> {
        for (i, param) in func.params.iter().enumerate() {
            if i < ARG_REGS.len() {
                self.w.lea(&format!("-{}", param.offset), RBP, RAX)?;
                let addr = self.w.address(RAX);
                let src = reg_for(ARG_REGS[i], &param.ty)?;
                self.w.mov(&src, &addr)?;
            } else {
                let arg_slot = self.w.address_disp(16 + 8 * (i as i64 - 6), RBP);
                self.w.mov(&arg_slot, RDI)?;
                self.w.lea(&format!("-{}", param.offset), RBP, RAX)?;
                let addr = self.w.address(RAX);
                let src = reg_for(RDI, &param.ty)?;
                self.w.mov(&src, &addr)?;
            }
        }
        Ok(())
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn stmt(&mut self, stmt: &Stmt) -> Result<(), CodeGenError> {
        match stmt {
            Stmt::Declaration(decl) => self.local_declaration(decl),
            Stmt::ExpStmt(exp) => self.exp(exp),
            Stmt::Return { exp } => {
                self.exp(exp)?;
                let label = format!(".L.return.{}", self.current_fn);
                Ok(self.w.jmp(&label)?)
            }
            Stmt::If { cond, then, els } => {
                let lbl_else = self.gen_label();
                let lbl_end = self.gen_label();
                self.exp(cond)?;
                self.w.cmp("0", RAX)?;
                self.w.je(&lbl_else)?;
                self.stmt(then)?;
                self.w.jmp(&lbl_end)?;
                self.w.label(&lbl_else)?;
                if let Some(els) = els {
                    self.stmt(els)?;
                }
                Ok(self.w.label(&lbl_end)?)
            }
            Stmt::While { cond, body } => {
                let lbl_begin = self.gen_label();
                let lbl_end = self.gen_label();
                self.w.label(&lbl_begin)?;
                self.exp(cond)?;
                self.w.cmp("0", RAX)?;
                self.w.je(&lbl_end)?;
                self.stmt(body)?;
                self.w.jmp(&lbl_begin)?;
                Ok(self.w.label(&lbl_end)?)
            }
            Stmt::For {
                init,
                cond,
                step,
                body,
            } => {
                let lbl_begin = self.gen_label();
                let lbl_end = self.gen_label();
                if let Some(init) = init {
                    self.stmt(init)?;
                }
                self.w.label(&lbl_begin)?;
                if let Some(cond) = cond {
                    self.exp(cond)?;
                    self.w.cmp("0", RAX)?;
                    self.w.je(&lbl_end)?;
                }
                self.stmt(body)?;
                if let Some(step) = step {
                    self.exp(step)?;
                }
                self.w.jmp(&lbl_begin)?;
                Ok(self.w.label(&lbl_end)?)
            }
            Stmt::Block(stmts) | Stmt::StmtList(stmts) => {
                for stmt in stmts {
                    self.stmt(stmt)?;
                }
                Ok(())
            }
        }
    }

    /// A local declaration with an initializer stores at declaration time.
    fn local_declaration(&mut self, decl: &Declaration) -> Result<(), CodeGenError> {
        let Some(init) = &decl.init else {
            return Ok(());
        };
        let var = &decl.vars[0];
        match init {
            Exp::ArrayLit { elems, .. } => {
                let Type::Array(base, _) = &var.ty else {
                    return Err(self.err_at(decl.offset, "Array literal initializes a non-array"));
                };
                let unit = base.storage() as i64;
                for (i, elem) in elems.iter().enumerate() {
                    let disp = i as i64 * unit - var.offset as i64;
                    self.w.lea(&disp.to_string(), RBP, RAX)?;
                    self.w.push(RAX)?;
                    self.exp(elem)?;
                    self.w.pop(RDI)?;
                    let addr = self.w.address(RDI);
                    let src = reg_for(RAX, base)?;
                    self.w.mov(&src, &addr)?;
                }
                Ok(())
            }
            Exp::Str { lit, .. } if matches!(var.ty, Type::Array(..)) => {
                // Byte-wise stores of the literal plus its NUL.
                for (i, byte) in lit.value.bytes().chain([0u8]).enumerate() {
                    let disp = i as i64 - var.offset as i64;
                    self.w.lea(&disp.to_string(), RBP, RAX)?;
                    self.w.push(RAX)?;
                    let dst = reg_for(RAX, &Type::Int)?;
                    self.w.mov(&byte.to_string(), &dst)?;
                    self.w.pop(RDI)?;
                    let addr = self.w.address(RDI);
                    let src = reg_for(RAX, &Type::Char)?;
                    self.w.mov(&src, &addr)?;
                }
                Ok(())
            }
            _ => {
                self.address_of_var(var)?;
                self.w.push(RAX)?;
                self.exp(init)?;
                self.w.pop(RDI)?;
                let addr = self.w.address(RDI);
                let src = reg_for(RAX, &var.ty)?;
                Ok(self.w.mov(&src, &addr)?)
            }
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    /// Evaluate `exp` into RAX (width-correct sub-register).
    fn exp(&mut self, exp: &Exp) -> Result<(), CodeGenError> {
        match exp {
            Exp::Num { val, .. } => {
                let dst = reg_for(RAX, &Type::Int)?;
                Ok(self.w.mov(&val.to_string(), &dst)?)
            }
            Exp::Str { lit, .. } => Ok(self.w.lea(&lit.label, RIP, RAX)?),
            Exp::Ident { var, .. } => {
                self.address_of_var(var)?;
                if matches!(var.ty, Type::Array(..)) {
                    // Decay: the array's address is its value.
                    return Ok(());
                }
                self.load(&var.ty)
            }
            Exp::Index { .. } => {
                self.address(exp)?;
                self.load(&exp.ty())
            }
            Exp::Unary { op, operand, .. } => match op {
                UnaryOp::Addr => self.address(operand),
                UnaryOp::Deref => {
                    self.exp(operand)?;
                    self.load(&exp.ty())
                }
                UnaryOp::Plus => self.exp(operand),
                UnaryOp::Neg => {
                    self.exp(operand)?;
                    Ok(self.w.neg(RAX)?)
                }
                UnaryOp::Sizeof => {
                    let size = operand.ty().storage();
                    let dst = reg_for(RAX, &Type::Int)?;
                    Ok(self.w.mov(&size.to_string(), &dst)?)
                }
            },
            Exp::Infix {
                op, left, right, ..
            } => self.infix(*op, left, right),
            Exp::Call { name, args, .. } => self.call(name, args),
            Exp::ArrayLit { offset, .. } => Err(self.err_at(
                *offset,
                "Array literal is only allowed as a declaration initializer",
            )),
        }
    }

    /// Dereference the address in RAX with a width-correct load; `char`
    /// sign-extends into a 32-bit register.
    fn load(&mut self, ty: &Type) -> Result<(), CodeGenError> {
        if *ty == Type::Char {
            let dst = dword_reg(RAX).expect("rax has a dword form");
            Ok(self.w.movsx_byte(RAX, dst)?)
        } else {
            let addr = self.w.address(RAX);
            let dst = reg_for(RAX, ty)?;
            Ok(self.w.mov(&addr, &dst)?)
        }
    }

    fn infix(&mut self, op: InfixOp, left: &Exp, right: &Exp) -> Result<(), CodeGenError> {
        if op == InfixOp::Assign {
            self.address(left)?;
            self.w.push(RAX)?;
            self.exp(right)?;
            self.w.pop(RDI)?;
            let addr = self.w.address(RDI);
            let src = reg_for(RAX, &left.ty())?;
            return Ok(self.w.mov(&src, &addr)?);
        }

        // Right first, so the left operand ends up in RAX and the right in
        // RDI.
        self.exp(right)?;
        self.w.push(RAX)?;
        self.exp(left)?;
        self.w.pop(RDI)?;

        match op {
            InfixOp::Add | InfixOp::Sub => {
                if let Type::Pointer(base) | Type::Array(base, _) = left.ty() {
                    // Scale the integer operand by the pointee's storage.
                    self.w.mul(&base.storage().to_string(), RDI)?;
                }
                if op == InfixOp::Add {
                    Ok(self.w.add(RDI, RAX)?)
                } else {
                    Ok(self.w.sub(RDI, RAX)?)
                }
            }
            InfixOp::Mul => Ok(self.w.mul(RDI, RAX)?),
            InfixOp::Div => Ok(self.w.div(RDI)?),
            InfixOp::Eq | InfixOp::Ne | InfixOp::Lt | InfixOp::Le | InfixOp::Gt | InfixOp::Ge => {
                self.w.cmp(RDI, RAX)?;
                match op {
                    InfixOp::Eq => self.w.sete(AL)?,
                    InfixOp::Ne => self.w.setne(AL)?,
                    InfixOp::Lt => self.w.setl(AL)?,
                    InfixOp::Le => self.w.setle(AL)?,
                    InfixOp::Gt => self.w.setg(AL)?,
                    InfixOp::Ge => self.w.setge(AL)?,
                    _ => unreachable!("comparison op"),
                }
                Ok(self.w.movzb(AL, RAX)?)
            }
            InfixOp::Assign => unreachable!("assign handled above"),
        }
    }

    fn call(&mut self, name: &str, args: &[Exp]) -> Result<(), CodeGenError> {
        // First six left-to-right into the parameter registers.
        for (i, arg) in args.iter().enumerate().take(ARG_REGS.len()) {
            self.exp(arg)?;
            let src = reg_for(RAX, &arg.ty())?;
            let dst = reg_for(ARG_REGS[i], &arg.ty())?;
            self.w.mov(&src, &dst)?;
        }
        // The rest right-to-left, so the callee sees them in forward order
        // at [rbp+16] upward.
        let extra = args.len().saturating_sub(ARG_REGS.len());
        for arg in args.iter().skip(ARG_REGS.len()).rev() {
            self.exp(arg)?;
            self.w.push(RAX)?;
        }

        // Variadic-safe: no vector registers are used.
        self.w.mov("0", AL)?;
        self.w.call(name)?;
        if extra > 0 {
            self.w.add(&(8 * extra).to_string(), RSP)?;
        }
        Ok(())
    }

    // =========================================================================
    // Addresses
    // =========================================================================

    fn address_of_var(&mut self, var: &Var) -> Result<(), CodeGenError> {
        if var.is_local {
            Ok(self.w.lea(&format!("-{}", var.offset), RBP, RAX)?)
        } else {
            Ok(self.w.lea(&var.name, RIP, RAX)?)
        }
    }

    /// Compute the address of an l-value into RAX.
    fn address(&mut self, exp: &Exp) -> Result<(), CodeGenError> {
        match exp {
            Exp::Ident { var, .. } => self.address_of_var(var),
            Exp::Index { var, index, .. } => {
                let unit = var.ty.base().map_or(8, Type::storage);
                self.exp(index)?;
                if var.is_local {
                    Ok(self
                        .w
                        .lea_index(&format!("-{}", var.offset), RBP, RAX, unit, RAX)?)
                } else {
                    self.w.lea(&var.name, RIP, RDI)?;
                    Ok(self.w.lea_index("", RDI, RAX, unit, RAX)?)
                }
            }
            Exp::Unary {
                op: UnaryOp::Deref,
                operand,
                ..
            } => self.exp(operand),
            _ => Err(self.err_at(
                exp.offset(),
                "Expression does not denote a storage location",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn compile(source: &str) -> String {
        compile_with(source, Syntax::Intel)
    }

    fn compile_with(source: &str, syntax: Syntax) -> String {
        let program = Parser::new(source).parse().unwrap();
        CodeGen::new(source, syntax).generate(&program).unwrap()
    }

    #[test]
    fn test_arithmetic_snapshot() {
        let out = compile("int main() { return (5 + 5) * 5 / 2; }");
        let want = "\
.intel_syntax noprefix
  .text
  .globl main
main:
  push rbp
  mov rbp, rsp
  sub rsp, 0
  mov eax, 2
  push rax
  mov eax, 5
  push rax
  mov eax, 5
  push rax
  mov eax, 5
  pop rdi
  add rax, rdi
  pop rdi
  imul rax, rdi
  pop rdi
  cqo
  idiv rdi
  jmp .L.return.main
.L.return.main:
  mov rsp, rbp
  pop rbp
  ret
";
        assert_eq!(out, want);
    }

    #[test]
    fn test_comparison_snapshot() {
        let out = compile("int main() { return (5 * 5) == (5 * 2); }");
        let want = "\
.intel_syntax noprefix
  .text
  .globl main
main:
  push rbp
  mov rbp, rsp
  sub rsp, 0
  mov eax, 2
  push rax
  mov eax, 5
  pop rdi
  imul rax, rdi
  push rax
  mov eax, 5
  push rax
  mov eax, 5
  pop rdi
  imul rax, rdi
  pop rdi
  cmp rax, rdi
  sete al
  movzb rax, al
  jmp .L.return.main
.L.return.main:
  mov rsp, rbp
  pop rbp
  ret
";
        assert_eq!(out, want);
    }

    #[test]
    fn test_locals_load_and_store() {
        let out = compile("int main() { int a=3; int b=4; return a*a + b*b; }");
        // a at rbp-8, b at rbp-16; int loads are 32-bit.
        assert!(out.contains("  lea rax, -8[rbp]"));
        assert!(out.contains("  lea rax, -16[rbp]"));
        assert!(out.contains("  mov eax, [rax]"));
        assert!(out.contains("  mov [rdi], eax"));
    }

    #[test]
    fn test_array_indexing_scales_upward() {
        let out = compile("int main() { int a[3]; a[0]=1; a[1]=2; a[2]=4; return a[0]+a[1]+a[2]; }");
        // &a[i] = rbp - 24 + i*8; no negated scale anywhere.
        assert!(out.contains("  lea rax, -24[rbp+rax*8]"));
        assert!(!out.contains("  neg rdi"));
    }

    #[test]
    fn test_pointer_arithmetic_scales_by_pointee() {
        let out = compile("int main() { int a[2]; int *p = &a[0]; *(p + 1) = 7; return *(p + 1); }");
        assert!(out.contains("  imul rdi, 8"));
        assert!(out.contains("  add rax, rdi"));
    }

    #[test]
    fn test_char_loads_sign_extend() {
        let out = compile("int main() { char c = 7; return c; }");
        assert!(out.contains("  mov [rdi], al"));
        assert!(out.contains("  movsx eax, BYTE PTR [rax]"));
    }

    #[test]
    fn test_control_flow_labels() {
        let out = compile(
            "int fib(int n){ if(n<2) return n; return fib(n-1)+fib(n-2); } \
             int main(){ return fib(10); }",
        );
        assert!(out.contains(".L0:"));
        assert!(out.contains(".L1:"));
        assert!(out.contains("  je .L0"));
        assert!(out.contains("  call fib"));
        assert!(out.contains(".L.return.fib:"));
        assert!(out.contains(".L.return.main:"));
        // Condition lowering.
        assert!(out.contains("  cmp rax, 0"));
        assert!(out.contains("  setl al"));
    }

    #[test]
    fn test_greater_than_uses_setg() {
        let out = compile("int main() { int a = 1; return a > 0; }");
        assert!(out.contains("  setg al"));
        let out = compile("int main() { int a = 1; return a >= 0; }");
        assert!(out.contains("  setge al"));
    }

    #[test]
    fn test_call_argument_registers() {
        let out = compile(
            "int add3(int a, int b, int c) { return a + b + c; } \
             int main() { return add3(1, 2, 3); }",
        );
        assert!(out.contains("  mov edi, eax"));
        assert!(out.contains("  mov esi, eax"));
        assert!(out.contains("  mov edx, eax"));
        assert!(out.contains("  mov al, 0"));
        // Parameter spill into home slots.
        assert!(out.contains("  mov [rax], edi"));
        assert!(out.contains("  mov [rax], esi"));
        assert!(out.contains("  mov [rax], edx"));
    }

    #[test]
    fn test_seven_plus_arguments_use_the_stack() {
        let out = compile(
            "int sum(int a, int b, int c, int d, int e, int f, int g, int h) \
             { return a + h; } \
             int main() { return sum(1, 2, 3, 4, 5, 6, 7, 8); }",
        );
        // Callee reads the extra args above the saved frame pointer.
        assert!(out.contains("  mov rdi, [rbp+16]"));
        assert!(out.contains("  mov rdi, [rbp+24]"));
        // Caller pushes them and pops them back off after the call.
        assert!(out.contains("  push rax"));
        assert!(out.contains("  add rsp, 16"));
    }

    #[test]
    fn test_address_of_global() {
        let out = compile("int g; int main(){ int *p=&g; *p=42; return g; }");
        assert!(out.contains("  lea rax, g[rip]"));
        assert!(out.contains("  mov [rdi], rax"));
    }

    #[test]
    fn test_sizeof_is_static() {
        let out = compile("int main() { int a[3]; return sizeof(a); }");
        assert!(out.contains("  mov eax, 24"));
        // The operand itself is never evaluated.
        assert!(!out.contains("[rbp+rax"));
    }

    #[test]
    fn test_att_flavor() {
        let out = compile_with("int main() { return 42; }", Syntax::Att);
        assert!(!out.contains(".intel_syntax"));
        assert!(out.contains("  mov $42, %eax"));
        assert!(out.contains("  push %rbp"));
        assert!(out.contains("  mov %rbp, %rsp\n  pop %rbp\n  ret\n"));
    }

    #[test]
    fn test_generator_is_deterministic() {
        let src = "int g = 3; int f(int x) { return x * g; } int main() { return f(7); }";
        assert_eq!(compile(src), compile(src));
    }
}
