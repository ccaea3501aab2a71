use std::fmt;
use std::str::FromStr;

use num_derive::{FromPrimitive, ToPrimitive};
use util::ParseEnumError;

/// Operand-count constraint attached to every opcode. Programs violating it
/// are rejected at parse time.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ArgCount {
    Exact(usize),
    AtLeast(usize),
    AtMost(usize),
    Range(usize, usize),
}

impl ArgCount {
    pub fn accepts(self, actual: usize) -> bool {
        match self {
            ArgCount::Exact(n) => actual == n,
            ArgCount::AtLeast(n) => actual >= n,
            ArgCount::AtMost(n) => actual <= n,
            ArgCount::Range(lo, hi) => actual >= lo && actual <= hi,
        }
    }
}

impl fmt::Display for ArgCount {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ArgCount::Exact(n) => write!(f, "exactly {}", n),
            ArgCount::AtLeast(n) => write!(f, "at least {}", n),
            ArgCount::AtMost(n) => write!(f, "at most {}", n),
            ArgCount::Range(lo, hi) => write!(f, "between {} and {}", lo, hi),
        }
    }
}

/// The opcode catalogue. The numbering is stable: the image format stores
/// opcodes as single bytes in exactly this order.
#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive, ToPrimitive)]
pub enum Opcode {
    Nop,
    Push,
    Mov,
    Pop,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Xor,
    Not,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Jmp,
    JmpIf,
    Call,
    Ret,
    Load,
    Store,
    Print,
    Dup,
    Swap,
    Drop,
    Rotl,
    Rotr,
    Alloc,
    Halt,
    Merge,
    Xcall,
    SizeOf,
    MemCmp,
    Dec,
    Inc,
    Eval,
    Cmp,
    ReadMem,
    CpyMem,
    WriteMem,
    Var,
    SetVar,
    GetVar,
    Free,
    ToggleLocalScope,
    GetGlobalVar,
    SetGlobalVar,
    Ovm,
    Cast,
    Here,
    Sprintf,
}

pub struct OpcodeInfo {
    pub name: &'static str,
    pub opcode: Opcode,
    pub args: ArgCount,
}

/// Mnemonic table: name, opcode, arity. Mnemonics are case-sensitive and
/// all lowercase.
pub const OPCODES: &[OpcodeInfo] = &[
    OpcodeInfo { name: "nop", opcode: Opcode::Nop, args: ArgCount::Exact(0) },
    OpcodeInfo { name: "push", opcode: Opcode::Push, args: ArgCount::Exact(1) },
    OpcodeInfo { name: "mov", opcode: Opcode::Mov, args: ArgCount::Exact(2) },
    OpcodeInfo { name: "pop", opcode: Opcode::Pop, args: ArgCount::Exact(1) },
    OpcodeInfo { name: "add", opcode: Opcode::Add, args: ArgCount::Range(0, 2) },
    OpcodeInfo { name: "sub", opcode: Opcode::Sub, args: ArgCount::Range(0, 2) },
    OpcodeInfo { name: "mul", opcode: Opcode::Mul, args: ArgCount::Exact(0) },
    OpcodeInfo { name: "div", opcode: Opcode::Div, args: ArgCount::Exact(0) },
    OpcodeInfo { name: "mod", opcode: Opcode::Mod, args: ArgCount::Exact(0) },
    OpcodeInfo { name: "and", opcode: Opcode::And, args: ArgCount::Exact(0) },
    OpcodeInfo { name: "or", opcode: Opcode::Or, args: ArgCount::Exact(0) },
    OpcodeInfo { name: "xor", opcode: Opcode::Xor, args: ArgCount::Exact(2) },
    OpcodeInfo { name: "not", opcode: Opcode::Not, args: ArgCount::Exact(0) },
    OpcodeInfo { name: "eq", opcode: Opcode::Eq, args: ArgCount::Exact(0) },
    OpcodeInfo { name: "ne", opcode: Opcode::Ne, args: ArgCount::Exact(0) },
    OpcodeInfo { name: "lt", opcode: Opcode::Lt, args: ArgCount::Exact(0) },
    OpcodeInfo { name: "gt", opcode: Opcode::Gt, args: ArgCount::Exact(0) },
    OpcodeInfo { name: "le", opcode: Opcode::Le, args: ArgCount::Exact(0) },
    OpcodeInfo { name: "ge", opcode: Opcode::Ge, args: ArgCount::Exact(0) },
    OpcodeInfo { name: "jmp", opcode: Opcode::Jmp, args: ArgCount::Exact(1) },
    OpcodeInfo { name: "jmpif", opcode: Opcode::JmpIf, args: ArgCount::Exact(1) },
    OpcodeInfo { name: "call", opcode: Opcode::Call, args: ArgCount::Exact(1) },
    OpcodeInfo { name: "ret", opcode: Opcode::Ret, args: ArgCount::Exact(0) },
    OpcodeInfo { name: "load", opcode: Opcode::Load, args: ArgCount::Exact(1) },
    OpcodeInfo { name: "store", opcode: Opcode::Store, args: ArgCount::Exact(1) },
    OpcodeInfo { name: "print", opcode: Opcode::Print, args: ArgCount::AtLeast(0) },
    OpcodeInfo { name: "dup", opcode: Opcode::Dup, args: ArgCount::Exact(0) },
    OpcodeInfo { name: "swap", opcode: Opcode::Swap, args: ArgCount::Exact(0) },
    OpcodeInfo { name: "drop", opcode: Opcode::Drop, args: ArgCount::Exact(0) },
    OpcodeInfo { name: "rotl", opcode: Opcode::Rotl, args: ArgCount::Exact(1) },
    OpcodeInfo { name: "rotr", opcode: Opcode::Rotr, args: ArgCount::Exact(1) },
    OpcodeInfo { name: "alloc", opcode: Opcode::Alloc, args: ArgCount::Range(0, 3) },
    OpcodeInfo { name: "halt", opcode: Opcode::Halt, args: ArgCount::AtMost(1) },
    OpcodeInfo { name: "merge", opcode: Opcode::Merge, args: ArgCount::AtLeast(0) },
    OpcodeInfo { name: "xcall", opcode: Opcode::Xcall, args: ArgCount::Exact(0) },
    OpcodeInfo { name: "sizeof", opcode: Opcode::SizeOf, args: ArgCount::Exact(1) },
    OpcodeInfo { name: "@cmp", opcode: Opcode::MemCmp, args: ArgCount::Range(0, 4) },
    OpcodeInfo { name: "dec", opcode: Opcode::Dec, args: ArgCount::Exact(1) },
    OpcodeInfo { name: "inc", opcode: Opcode::Inc, args: ArgCount::Exact(1) },
    OpcodeInfo { name: "eval", opcode: Opcode::Eval, args: ArgCount::AtLeast(1) },
    OpcodeInfo { name: "cmp", opcode: Opcode::Cmp, args: ArgCount::Exact(2) },
    OpcodeInfo { name: "@r", opcode: Opcode::ReadMem, args: ArgCount::Range(0, 4) },
    OpcodeInfo { name: "@cpy", opcode: Opcode::CpyMem, args: ArgCount::Exact(0) },
    OpcodeInfo { name: "@w", opcode: Opcode::WriteMem, args: ArgCount::Range(0, 4) },
    OpcodeInfo { name: "var", opcode: Opcode::Var, args: ArgCount::Exact(1) },
    OpcodeInfo { name: "setvar", opcode: Opcode::SetVar, args: ArgCount::Exact(1) },
    OpcodeInfo { name: "getvar", opcode: Opcode::GetVar, args: ArgCount::Exact(1) },
    OpcodeInfo { name: "free", opcode: Opcode::Free, args: ArgCount::AtMost(1) },
    OpcodeInfo { name: "togglelocalscope", opcode: Opcode::ToggleLocalScope, args: ArgCount::Exact(0) },
    OpcodeInfo { name: "getglobalvar", opcode: Opcode::GetGlobalVar, args: ArgCount::Exact(1) },
    OpcodeInfo { name: "setglobalvar", opcode: Opcode::SetGlobalVar, args: ArgCount::Exact(1) },
    OpcodeInfo { name: "ovm", opcode: Opcode::Ovm, args: ArgCount::Exact(1) },
    OpcodeInfo { name: "cast", opcode: Opcode::Cast, args: ArgCount::Exact(1) },
    OpcodeInfo { name: "here", opcode: Opcode::Here, args: ArgCount::Exact(0) },
    OpcodeInfo { name: "sprintf", opcode: Opcode::Sprintf, args: ArgCount::Exact(0) },
];

impl Opcode {
    fn info(self) -> &'static OpcodeInfo {
        OPCODES.iter().find(|info| info.opcode == self).unwrap()
    }

    pub fn mnemonic(self) -> &'static str {
        self.info().name
    }

    pub fn args(self) -> ArgCount {
        self.info().args
    }

    pub fn from_mnemonic(name: &str) -> Option<Opcode> {
        OPCODES
            .iter()
            .find(|info| info.name == name)
            .map(|info| info.opcode)
    }
}

impl FromStr for Opcode {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Opcode, ParseEnumError> {
        Opcode::from_mnemonic(s).ok_or_else(|| ParseEnumError {
            value: s.to_owned(),
            enum_name: "Opcode",
        })
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// One decoded instruction: opcode, raw operand strings, source line.
/// Operands stay strings until execution or encoding classifies them.
#[derive(Clone, Debug, PartialEq)]
pub struct InstructionData {
    pub opcode: Opcode,
    pub operands: Vec<String>,
    pub line: u32,
}

impl InstructionData {
    pub fn new(opcode: Opcode, operands: Vec<String>, line: u32) -> InstructionData {
        InstructionData {
            opcode,
            operands,
            line,
        }
    }

    pub fn nop(line: u32) -> InstructionData {
        InstructionData::new(Opcode::Nop, Vec::new(), line)
    }
}

pub fn is_int_literal(s: &str) -> bool {
    s.parse::<i64>().is_ok()
}

pub fn is_float_literal(s: &str) -> bool {
    s.contains('.') && s.parse::<f32>().is_ok()
}

pub fn is_string_literal(s: &str) -> bool {
    s.len() >= 2 && s.starts_with('"') && s.ends_with('"')
}

/// Strips the surrounding quotes off a string literal; other operands come
/// back unchanged.
pub fn unquote(s: &str) -> &str {
    if is_string_literal(s) {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// Parenthesized raw address, e.g. `(4096)` or `(0x1000)`.
pub fn pointer_literal_value(s: &str) -> Option<u64> {
    let inner = s.strip_prefix('(')?.strip_suffix(')')?;
    match inner.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => inner.parse().ok(),
    }
}

/// Joins operand tokens with single spaces, unquoting string literals.
pub fn merge_operands(operands: &[String]) -> String {
    operands
        .iter()
        .map(|operand| unquote(operand))
        .collect::<Vec<_>>()
        .join(" ")
}
