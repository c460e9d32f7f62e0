//! Syntax-agnostic assembly writing.
//!
//! The code generator talks to an [`AsmWriter`]; the two backends only
//! differ in operand spelling (bare names and `dst, src` order for Intel,
//! `%`/`$` prefixes and `src, dst` order for AT&T). Output is buffered in
//! memory and handed out once by [`AsmWriter::commit`], so nothing reaches
//! the output stream unless the whole program compiled.

use std::fmt::Write as _;
use std::str::FromStr;

/// Output flavor selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Syntax {
    #[default]
    Intel,
    Att,
}

impl FromStr for Syntax {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "intel" => Ok(Syntax::Intel),
            "att" => Ok(Syntax::Att),
            other => Err(format!("unknown syntax '{}' (use intel or att)", other)),
        }
    }
}

/// Build the writer for a flavor.
pub fn new_writer(syntax: Syntax) -> Box<dyn AsmWriter> {
    match syntax {
        Syntax::Intel => Box::new(IntelWriter::new()),
        Syntax::Att => Box::new(AttWriter::new()),
    }
}

/// Opcode-level emission requests. Register operands are base names
/// (`rax`, `eax`, `al`); immediates are decimal strings; memory operands
/// are built with [`AsmWriter::address`] or the `lea` variants.
pub trait AsmWriter {
    fn header(&mut self) -> std::fmt::Result;

    /// `mov dst <- src`.
    fn mov(&mut self, src: &str, dst: &str) -> std::fmt::Result;
    fn add(&mut self, src: &str, dst: &str) -> std::fmt::Result;
    fn sub(&mut self, src: &str, dst: &str) -> std::fmt::Result;
    fn mul(&mut self, src: &str, dst: &str) -> std::fmt::Result;
    /// Signed division of RDX:RAX by `reg` (`cqo` + `idiv`).
    fn div(&mut self, reg: &str) -> std::fmt::Result;
    /// `cmp left, right` in value terms: sets flags for `left - right`.
    fn cmp(&mut self, right: &str, left: &str) -> std::fmt::Result;

    fn push(&mut self, reg: &str) -> std::fmt::Result;
    fn pop(&mut self, reg: &str) -> std::fmt::Result;
    fn neg(&mut self, reg: &str) -> std::fmt::Result;

    fn sete(&mut self, reg: &str) -> std::fmt::Result;
    fn setne(&mut self, reg: &str) -> std::fmt::Result;
    fn setl(&mut self, reg: &str) -> std::fmt::Result;
    fn setle(&mut self, reg: &str) -> std::fmt::Result;
    fn setg(&mut self, reg: &str) -> std::fmt::Result;
    fn setge(&mut self, reg: &str) -> std::fmt::Result;
    fn movzb(&mut self, src: &str, dst: &str) -> std::fmt::Result;
    /// Sign-extending byte load from `[addr_reg]` into a 32-bit register.
    fn movsx_byte(&mut self, addr_reg: &str, dst: &str) -> std::fmt::Result;

    fn je(&mut self, label: &str) -> std::fmt::Result;
    fn jmp(&mut self, label: &str) -> std::fmt::Result;
    fn call(&mut self, label: &str) -> std::fmt::Result;
    fn ret(&mut self) -> std::fmt::Result;

    /// `lea dst <- offset[base]`; `offset` is a decimal displacement or a
    /// symbol (paired with `rip`).
    fn lea(&mut self, offset: &str, base: &str, dst: &str) -> std::fmt::Result;
    /// `lea dst <- offset[base + index*scale]`.
    fn lea_index(
        &mut self,
        offset: &str,
        base: &str,
        index: &str,
        scale: usize,
        dst: &str,
    ) -> std::fmt::Result;
    /// An indirect operand through `reg` for use as a mov source or target.
    fn address(&self, reg: &str) -> String;
    /// An indirect operand with a byte displacement, e.g. the caller's
    /// argument area at `[rbp+16]`.
    fn address_disp(&self, disp: i64, reg: &str) -> String;

    fn label(&mut self, name: &str) -> std::fmt::Result;
    fn globl(&mut self, name: &str) -> std::fmt::Result;
    fn data(&mut self) -> std::fmt::Result;
    fn text(&mut self) -> std::fmt::Result;
    fn string_lit(&mut self, value: &str) -> std::fmt::Result;
    fn size(&mut self, label: &str, bytes: usize) -> std::fmt::Result;
    /// An arbitrary directive line, e.g. `.long 42`.
    fn raw(&mut self, line: &str) -> std::fmt::Result;

    /// Take the buffered output. Called once, after the whole program has
    /// been generated.
    fn commit(&mut self) -> String;
}

pub struct IntelWriter {
    buf: String,
}

impl IntelWriter {
    pub fn new() -> Self {
        IntelWriter { buf: String::new() }
    }
}

impl Default for IntelWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl AsmWriter for IntelWriter {
    fn header(&mut self) -> std::fmt::Result {
        writeln!(self.buf, ".intel_syntax noprefix")
    }

    fn mov(&mut self, src: &str, dst: &str) -> std::fmt::Result {
        writeln!(self.buf, "  mov {}, {}", dst, src)
    }

    fn add(&mut self, src: &str, dst: &str) -> std::fmt::Result {
        writeln!(self.buf, "  add {}, {}", dst, src)
    }

    fn sub(&mut self, src: &str, dst: &str) -> std::fmt::Result {
        writeln!(self.buf, "  sub {}, {}", dst, src)
    }

    fn mul(&mut self, src: &str, dst: &str) -> std::fmt::Result {
        writeln!(self.buf, "  imul {}, {}", dst, src)
    }

    fn div(&mut self, reg: &str) -> std::fmt::Result {
        writeln!(self.buf, "  cqo")?;
        writeln!(self.buf, "  idiv {}", reg)
    }

    fn cmp(&mut self, right: &str, left: &str) -> std::fmt::Result {
        writeln!(self.buf, "  cmp {}, {}", left, right)
    }

    fn push(&mut self, reg: &str) -> std::fmt::Result {
        writeln!(self.buf, "  push {}", reg)
    }

    fn pop(&mut self, reg: &str) -> std::fmt::Result {
        writeln!(self.buf, "  pop {}", reg)
    }

    fn neg(&mut self, reg: &str) -> std::fmt::Result {
        writeln!(self.buf, "  neg {}", reg)
    }

    fn sete(&mut self, reg: &str) -> std::fmt::Result {
        writeln!(self.buf, "  sete {}", reg)
    }

    fn setne(&mut self, reg: &str) -> std::fmt::Result {
        writeln!(self.buf, "  setne {}", reg)
    }

    fn setl(&mut self, reg: &str) -> std::fmt::Result {
        writeln!(self.buf, "  setl {}", reg)
    }

    fn setle(&mut self, reg: &str) -> std::fmt::Result {
        writeln!(self.buf, "  setle {}", reg)
    }

    fn setg(&mut self, reg: &str) -> std::fmt::Result {
        writeln!(self.buf, "  setg {}", reg)
    }

    fn setge(&mut self, reg: &str) -> std::fmt::Result {
        writeln!(self.buf, "  setge {}", reg)
    }

    fn movzb(&mut self, src: &str, dst: &str) -> std::fmt::Result {
        writeln!(self.buf, "  movzb {}, {}", dst, src)
    }

    fn movsx_byte(&mut self, addr_reg: &str, dst: &str) -> std::fmt::Result {
        writeln!(self.buf, "  movsx {}, BYTE PTR [{}]", dst, addr_reg)
    }

    fn je(&mut self, label: &str) -> std::fmt::Result {
        writeln!(self.buf, "  je {}", label)
    }

    fn jmp(&mut self, label: &str) -> std::fmt::Result {
        writeln!(self.buf, "  jmp {}", label)
    }

    fn call(&mut self, label: &str) -> std::fmt::Result {
        writeln!(self.buf, "  call {}", label)
    }

    fn ret(&mut self) -> std::fmt::Result {
        writeln!(self.buf, "  ret")
    }

    fn lea(&mut self, offset: &str, base: &str, dst: &str) -> std::fmt::Result {
        writeln!(self.buf, "  lea {}, {}[{}]", dst, offset, base)
    }

    fn lea_index(
        &mut self,
        offset: &str,
        base: &str,
        index: &str,
        scale: usize,
        dst: &str,
    ) -> std::fmt::Result {
        writeln!(
            self.buf,
            "  lea {}, {}[{}+{}*{}]",
            dst, offset, base, index, scale
        )
    }

    fn address(&self, reg: &str) -> String {
        format!("[{}]", reg)
    }

    fn address_disp(&self, disp: i64, reg: &str) -> String {
        format!("[{}{:+}]", reg, disp)
    }

    fn label(&mut self, name: &str) -> std::fmt::Result {
        writeln!(self.buf, "{}:", name)
    }

    fn globl(&mut self, name: &str) -> std::fmt::Result {
        writeln!(self.buf, "  .globl {}", name)
    }

    fn data(&mut self) -> std::fmt::Result {
        writeln!(self.buf, "  .data")
    }

    fn text(&mut self) -> std::fmt::Result {
        writeln!(self.buf, "  .text")
    }

    fn string_lit(&mut self, value: &str) -> std::fmt::Result {
        writeln!(self.buf, "  .string \"{}\"", value)
    }

    fn size(&mut self, label: &str, bytes: usize) -> std::fmt::Result {
        writeln!(self.buf, "  .size {}, {}", label, bytes)
    }

    fn raw(&mut self, line: &str) -> std::fmt::Result {
        writeln!(self.buf, "  {}", line)
    }

    fn commit(&mut self) -> String {
        std::mem::take(&mut self.buf)
    }
}

pub struct AttWriter {
    buf: String,
}

impl AttWriter {
    pub fn new() -> Self {
        AttWriter { buf: String::new() }
    }
}

impl Default for AttWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Prefix an operand the AT&T way: `$` for immediates, `%` for registers,
/// indirect operands pass through.
fn prefixed(operand: &str) -> String {
    if operand.parse::<i64>().is_ok() {
        return format!("${}", operand);
    }
    if operand.starts_with('(') {
        return operand.to_string();
    }
    format!("%{}", operand)
}

impl AsmWriter for AttWriter {
    fn header(&mut self) -> std::fmt::Result {
        // The GNU assembler defaults to AT&T syntax; no mode line needed.
        Ok(())
    }

    fn mov(&mut self, src: &str, dst: &str) -> std::fmt::Result {
        writeln!(self.buf, "  mov {}, {}", prefixed(src), prefixed(dst))
    }

    fn add(&mut self, src: &str, dst: &str) -> std::fmt::Result {
        writeln!(self.buf, "  add {}, {}", prefixed(src), prefixed(dst))
    }

    fn sub(&mut self, src: &str, dst: &str) -> std::fmt::Result {
        writeln!(self.buf, "  sub {}, {}", prefixed(src), prefixed(dst))
    }

    fn mul(&mut self, src: &str, dst: &str) -> std::fmt::Result {
        writeln!(self.buf, "  imul {}, {}", prefixed(src), prefixed(dst))
    }

    fn div(&mut self, reg: &str) -> std::fmt::Result {
        writeln!(self.buf, "  cqo")?;
        writeln!(self.buf, "  idiv {}", prefixed(reg))
    }

    fn cmp(&mut self, right: &str, left: &str) -> std::fmt::Result {
        writeln!(self.buf, "  cmp {}, {}", prefixed(right), prefixed(left))
    }

    fn push(&mut self, reg: &str) -> std::fmt::Result {
        writeln!(self.buf, "  push {}", prefixed(reg))
    }

    fn pop(&mut self, reg: &str) -> std::fmt::Result {
        writeln!(self.buf, "  pop {}", prefixed(reg))
    }

    fn neg(&mut self, reg: &str) -> std::fmt::Result {
        writeln!(self.buf, "  neg {}", prefixed(reg))
    }

    fn sete(&mut self, reg: &str) -> std::fmt::Result {
        writeln!(self.buf, "  sete {}", prefixed(reg))
    }

    fn setne(&mut self, reg: &str) -> std::fmt::Result {
        writeln!(self.buf, "  setne {}", prefixed(reg))
    }

    fn setl(&mut self, reg: &str) -> std::fmt::Result {
        writeln!(self.buf, "  setl {}", prefixed(reg))
    }

    fn setle(&mut self, reg: &str) -> std::fmt::Result {
        writeln!(self.buf, "  setle {}", prefixed(reg))
    }

    fn setg(&mut self, reg: &str) -> std::fmt::Result {
        writeln!(self.buf, "  setg {}", prefixed(reg))
    }

    fn setge(&mut self, reg: &str) -> std::fmt::Result {
        writeln!(self.buf, "  setge {}", prefixed(reg))
    }

    fn movzb(&mut self, src: &str, dst: &str) -> std::fmt::Result {
        writeln!(self.buf, "  movzb {}, {}", prefixed(src), prefixed(dst))
    }

    fn movsx_byte(&mut self, addr_reg: &str, dst: &str) -> std::fmt::Result {
        writeln!(self.buf, "  movsbl (%{}), {}", addr_reg, prefixed(dst))
    }

    fn je(&mut self, label: &str) -> std::fmt::Result {
        writeln!(self.buf, "  je {}", label)
    }

    fn jmp(&mut self, label: &str) -> std::fmt::Result {
        writeln!(self.buf, "  jmp {}", label)
    }

    fn call(&mut self, label: &str) -> std::fmt::Result {
        writeln!(self.buf, "  call {}", label)
    }

    fn ret(&mut self) -> std::fmt::Result {
        writeln!(self.buf, "  ret")
    }

    fn lea(&mut self, offset: &str, base: &str, dst: &str) -> std::fmt::Result {
        writeln!(self.buf, "  lea {}(%{}), {}", offset, base, prefixed(dst))
    }

    fn lea_index(
        &mut self,
        offset: &str,
        base: &str,
        index: &str,
        scale: usize,
        dst: &str,
    ) -> std::fmt::Result {
        writeln!(
            self.buf,
            "  lea {}(%{},%{},{}), {}",
            offset,
            base,
            index,
            scale,
            prefixed(dst)
        )
    }

    fn address(&self, reg: &str) -> String {
        format!("(%{})", reg)
    }

    fn address_disp(&self, disp: i64, reg: &str) -> String {
        format!("{}(%{})", disp, reg)
    }

    fn label(&mut self, name: &str) -> std::fmt::Result {
        writeln!(self.buf, "{}:", name)
    }

    fn globl(&mut self, name: &str) -> std::fmt::Result {
        writeln!(self.buf, "  .globl {}", name)
    }

    fn data(&mut self) -> std::fmt::Result {
        writeln!(self.buf, "  .data")
    }

    fn text(&mut self) -> std::fmt::Result {
        writeln!(self.buf, "  .text")
    }

    fn string_lit(&mut self, value: &str) -> std::fmt::Result {
        writeln!(self.buf, "  .string \"{}\"", value)
    }

    fn size(&mut self, label: &str, bytes: usize) -> std::fmt::Result {
        writeln!(self.buf, "  .size {}, {}", label, bytes)
    }

    fn raw(&mut self, line: &str) -> std::fmt::Result {
        writeln!(self.buf, "  {}", line)
    }

    fn commit(&mut self) -> String {
        std::mem::take(&mut self.buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_from_str() {
        assert_eq!("intel".parse::<Syntax>().unwrap(), Syntax::Intel);
        assert_eq!("att".parse::<Syntax>().unwrap(), Syntax::Att);
        assert!("masm".parse::<Syntax>().is_err());
    }

    #[test]
    fn test_intel_operand_order() {
        let mut w = IntelWriter::new();
        w.mov("5", "eax").unwrap();
        w.add("rdi", "rax").unwrap();
        w.cmp("0", "rax").unwrap();
        let out = w.commit();
        assert_eq!(out, "  mov eax, 5\n  add rax, rdi\n  cmp rax, 0\n");
    }

    #[test]
    fn test_att_prefixes() {
        let mut w = AttWriter::new();
        w.mov("5", "eax").unwrap();
        w.add("rdi", "rax").unwrap();
        let addr = w.address("rdi");
        w.mov("eax", &addr).unwrap();
        let out = w.commit();
        assert_eq!(out, "  mov $5, %eax\n  add %rdi, %rax\n  mov %eax, (%rdi)\n");
    }

    #[test]
    fn test_lea_forms() {
        let mut intel = IntelWriter::new();
        intel.lea("-8", "rbp", "rax").unwrap();
        intel.lea("g", "rip", "rax").unwrap();
        intel.lea_index("-24", "rbp", "rax", 8, "rax").unwrap();
        assert_eq!(
            intel.commit(),
            "  lea rax, -8[rbp]\n  lea rax, g[rip]\n  lea rax, -24[rbp+rax*8]\n"
        );

        let mut att = AttWriter::new();
        att.lea("-8", "rbp", "rax").unwrap();
        att.lea_index("-24", "rbp", "rax", 8, "rax").unwrap();
        assert_eq!(
            att.commit(),
            "  lea -8(%rbp), %rax\n  lea -24(%rbp,%rax,8), %rax\n"
        );
    }

    #[test]
    fn test_address_forms() {
        let intel = IntelWriter::new();
        assert_eq!(intel.address("rax"), "[rax]");
        assert_eq!(intel.address_disp(16, "rbp"), "[rbp+16]");
        assert_eq!(intel.address_disp(-8, "rbp"), "[rbp-8]");

        let att = AttWriter::new();
        assert_eq!(att.address("rax"), "(%rax)");
        assert_eq!(att.address_disp(16, "rbp"), "16(%rbp)");
    }

    #[test]
    fn test_div_emits_sign_extension() {
        let mut w = IntelWriter::new();
        w.div("rdi").unwrap();
        assert_eq!(w.commit(), "  cqo\n  idiv rdi\n");
    }

    #[test]
    fn test_header() {
        let mut intel = IntelWriter::new();
        intel.header().unwrap();
        assert_eq!(intel.commit(), ".intel_syntax noprefix\n");

        let mut att = AttWriter::new();
        att.header().unwrap();
        assert_eq!(att.commit(), "");
    }

    #[test]
    fn test_buffering_is_atomic() {
        let mut w = IntelWriter::new();
        w.label("main").unwrap();
        w.ret().unwrap();
        assert_eq!(w.commit(), "main:\n  ret\n");
        // Nothing left behind after commit.
        assert_eq!(w.commit(), "");
    }
}
