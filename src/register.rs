use std::fmt;

use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::{FromPrimitive, ToPrimitive};
use util::EnumFromStr;
use util_derive::EnumFromStr;

use crate::constants;
use crate::word::Word;

/// The sixteen general registers. The declaration order fixes the ids used
/// by the `'R'` operand encoding of the image format.
///
/// `RA` holds the return address written by `call`; programs may touch it,
/// but what happens then is their problem.
#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive, ToPrimitive, EnumFromStr)]
pub enum RegisterId {
    RAX,
    RBX,
    RCX,
    RDX,
    RSI,
    RDI,
    R8,
    R9,
    R10,
    R11,
    R12,
    R13,
    R14,
    R15,
    RA,
    FR,
}

impl RegisterId {
    /// Case-insensitive lookup of a register name.
    pub fn parse(name: &str) -> Option<RegisterId> {
        EnumFromStr::from_str(&name.to_uppercase()).ok()
    }

    pub fn index(self) -> usize {
        self.to_usize().unwrap()
    }

    pub fn from_index(index: usize) -> Option<RegisterId> {
        RegisterId::from_usize(index)
    }

    pub fn name(self) -> &'static str {
        match self {
            RegisterId::RAX => "RAX",
            RegisterId::RBX => "RBX",
            RegisterId::RCX => "RCX",
            RegisterId::RDX => "RDX",
            RegisterId::RSI => "RSI",
            RegisterId::RDI => "RDI",
            RegisterId::R8 => "R8",
            RegisterId::R9 => "R9",
            RegisterId::R10 => "R10",
            RegisterId::R11 => "R11",
            RegisterId::R12 => "R12",
            RegisterId::R13 => "R13",
            RegisterId::R14 => "R14",
            RegisterId::R15 => "R15",
            RegisterId::RA => "RA",
            RegisterId::FR => "FR",
        }
    }
}

impl fmt::Display for RegisterId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub fn is_register(name: &str) -> bool {
    RegisterId::parse(name).is_some()
}

/// One register cell: a word plus the declared width in bytes.
#[derive(Clone, Debug)]
pub struct Register {
    value: Word,
    size: usize,
}

impl Register {
    fn new() -> Register {
        Register {
            value: Word::null(),
            size: constants::REGISTER_BYTES,
        }
    }

    pub fn value(&self) -> &Word {
        &self.value
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

pub struct RegisterBank {
    registers: [Register; constants::REGISTER_COUNT],
}

impl RegisterBank {
    pub fn new() -> RegisterBank {
        RegisterBank {
            registers: std::array::from_fn(|_| Register::new()),
        }
    }

    pub fn get(&self, id: RegisterId) -> &Word {
        &self.registers[id.index()].value
    }

    pub fn set(&mut self, id: RegisterId, value: Word) {
        self.registers[id.index()].value = value;
    }

    pub fn reset(&mut self) {
        for register in self.registers.iter_mut() {
            register.value = Word::null();
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (RegisterId, &Word)> {
        self.registers
            .iter()
            .enumerate()
            .map(|(i, r)| (RegisterId::from_index(i).unwrap(), &r.value))
    }
}

impl Default for RegisterBank {
    fn default() -> RegisterBank {
        RegisterBank::new()
    }
}
