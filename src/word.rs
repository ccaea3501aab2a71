use std::cmp::Ordering;
use std::fmt;

use num_derive::{FromPrimitive, ToPrimitive};

use crate::constants;

/// Runtime type tag of a [`Word`].
///
/// The discriminant values are stable: memory opcodes accept a type supplied
/// on the stack as a plain integer with exactly this numbering.
#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive, ToPrimitive)]
pub enum WordType {
    Int,
    Float,
    String,
    Char,
    Pointer,
    Bool,
}

impl WordType {
    /// Looks up a source-level type keyword.
    pub fn from_keyword(s: &str) -> Option<WordType> {
        match s {
            "int" => Some(WordType::Int),
            "float" => Some(WordType::Float),
            "charp" => Some(WordType::String),
            "char" => Some(WordType::Char),
            "pointer" => Some(WordType::Pointer),
            "bool" => Some(WordType::Bool),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            WordType::Int => "INT",
            WordType::Float => "FLOAT",
            WordType::String => "CHARP",
            WordType::Char => "CHAR",
            WordType::Pointer => "POINTER",
            WordType::Bool => "BOOL",
        }
    }

    /// Width in bytes of a memory cell holding a value of this type. A
    /// `charp` cell stores the address of the bytes, not the bytes.
    pub fn byte_size(self) -> u32 {
        match self {
            WordType::Int => constants::INT_BYTES,
            WordType::Float => constants::FLOAT_BYTES,
            WordType::Char | WordType::Bool => constants::CHAR_BYTES,
            WordType::String | WordType::Pointer => constants::POINTER_BYTES,
        }
    }
}

impl fmt::Display for WordType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A dynamically typed VM value. `String` owns its bytes, so cloning a word
/// duplicates them.
#[derive(Clone, Debug, PartialEq)]
pub enum Word {
    Int(i64),
    Float(f32),
    Char(u8),
    String(String),
    Pointer(u64),
    Bool(bool),
}

/// Two operand types that no arithmetic rule covers.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TypeMismatch {
    pub lhs: WordType,
    pub rhs: WordType,
}

impl fmt::Display for TypeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} and {}", self.lhs.name(), self.rhs.name())
    }
}

impl Word {
    pub fn null() -> Word {
        Word::Pointer(0)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Word::Pointer(0))
    }

    pub fn word_type(&self) -> WordType {
        match self {
            Word::Int(_) => WordType::Int,
            Word::Float(_) => WordType::Float,
            Word::String(_) => WordType::String,
            Word::Char(_) => WordType::Char,
            Word::Pointer(_) => WordType::Pointer,
            Word::Bool(_) => WordType::Bool,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.word_type().name()
    }

    fn mismatch(lhs: Word, rhs: Word) -> TypeMismatch {
        TypeMismatch {
            lhs: lhs.word_type(),
            rhs: rhs.word_type(),
        }
    }

    /// `self + rhs`. `Int` promotes to `Float` when mixed; a pointer offsets
    /// by the integer number of bytes.
    pub fn add(self, rhs: Word) -> Result<Word, TypeMismatch> {
        match (self, rhs) {
            (Word::Int(a), Word::Int(b)) => Ok(Word::Int(a.wrapping_add(b))),
            (Word::Float(a), Word::Float(b)) => Ok(Word::Float(a + b)),
            (Word::Int(a), Word::Float(b)) => Ok(Word::Float(a as f32 + b)),
            (Word::Float(a), Word::Int(b)) => Ok(Word::Float(a + b as f32)),
            (Word::Pointer(p), Word::Int(n)) => Ok(Word::Pointer(p.wrapping_add(n as u64))),
            (Word::Char(a), Word::Char(b)) => Ok(Word::Char(a.wrapping_add(b))),
            (lhs, rhs) => Err(Word::mismatch(lhs, rhs)),
        }
    }

    /// `self - rhs`, with the same type rules as [`Word::add`].
    pub fn sub(self, rhs: Word) -> Result<Word, TypeMismatch> {
        match (self, rhs) {
            (Word::Int(a), Word::Int(b)) => Ok(Word::Int(a.wrapping_sub(b))),
            (Word::Float(a), Word::Float(b)) => Ok(Word::Float(a - b)),
            (Word::Int(a), Word::Float(b)) => Ok(Word::Float(a as f32 - b)),
            (Word::Float(a), Word::Int(b)) => Ok(Word::Float(a - b as f32)),
            (Word::Pointer(p), Word::Int(n)) => Ok(Word::Pointer(p.wrapping_sub(n as u64))),
            (Word::Char(a), Word::Char(b)) => Ok(Word::Char(a.wrapping_sub(b))),
            (lhs, rhs) => Err(Word::mismatch(lhs, rhs)),
        }
    }

    pub fn mul(self, rhs: Word) -> Result<Word, TypeMismatch> {
        match (self, rhs) {
            (Word::Int(a), Word::Int(b)) => Ok(Word::Int(a.wrapping_mul(b))),
            (Word::Float(a), Word::Float(b)) => Ok(Word::Float(a * b)),
            (Word::Int(a), Word::Float(b)) => Ok(Word::Float(a as f32 * b)),
            (Word::Float(a), Word::Int(b)) => Ok(Word::Float(a * b as f32)),
            (lhs, rhs) => Err(Word::mismatch(lhs, rhs)),
        }
    }

    /// `self / rhs`. The caller is responsible for rejecting a zero divisor.
    pub fn div(self, rhs: Word) -> Result<Word, TypeMismatch> {
        match (self, rhs) {
            (Word::Int(a), Word::Int(b)) => Ok(Word::Int(a.wrapping_div(b))),
            (Word::Float(a), Word::Float(b)) => Ok(Word::Float(a / b)),
            (Word::Int(a), Word::Float(b)) => Ok(Word::Float(a as f32 / b)),
            (Word::Float(a), Word::Int(b)) => Ok(Word::Float(a / b as f32)),
            (lhs, rhs) => Err(Word::mismatch(lhs, rhs)),
        }
    }

    /// `self % rhs`, integers only. The caller rejects a zero divisor.
    pub fn rem(self, rhs: Word) -> Result<Word, TypeMismatch> {
        match (self, rhs) {
            (Word::Int(a), Word::Int(b)) => Ok(Word::Int(a.wrapping_rem(b))),
            (lhs, rhs) => Err(Word::mismatch(lhs, rhs)),
        }
    }

    /// Ordering is defined for `Int`-`Int`, `Float`-`Float` and
    /// (lexicographically) `String`-`String`; anything else has none.
    pub fn compare(&self, other: &Word) -> Option<Ordering> {
        match (self, other) {
            (Word::Int(a), Word::Int(b)) => Some(a.cmp(b)),
            (Word::Float(a), Word::Float(b)) => a.partial_cmp(b),
            (Word::String(a), Word::String(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Re-tags the word as `target` without converting the value: the raw
    /// payload bits are reinterpreted. A `String` payload has no bit pattern
    /// to reinterpret, so it can only be retagged as itself.
    pub fn retag(self, target: WordType) -> Option<Word> {
        if self.word_type() == target {
            return Some(self);
        }
        let bits = match &self {
            Word::Int(v) => *v as u64,
            Word::Float(v) => u64::from(v.to_bits()),
            Word::Char(c) => u64::from(*c),
            Word::Pointer(p) => *p,
            Word::Bool(b) => *b as u64,
            Word::String(_) => return None,
        };
        match target {
            WordType::Int => Some(Word::Int(bits as i64)),
            WordType::Float => Some(Word::Float(f32::from_bits(bits as u32))),
            WordType::Char => Some(Word::Char(bits as u8)),
            WordType::Pointer => Some(Word::Pointer(bits)),
            WordType::Bool => Some(Word::Bool(bits != 0)),
            WordType::String => None,
        }
    }
}

/// Default formatting, as used by `print` and `sprintf`.
impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Word::Int(v) => write!(f, "{}", v),
            Word::Float(v) => write!(f, "{:.6}", v),
            Word::Char(c) => write!(f, "{}", *c as char),
            Word::String(s) => f.write_str(s),
            Word::Pointer(0) => f.write_str("(nil)"),
            Word::Pointer(p) => write!(f, "0x{:x}", p),
            Word::Bool(b) => f.write_str(if *b { "true" } else { "false" }),
        }
    }
}
