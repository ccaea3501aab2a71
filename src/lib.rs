pub mod constants;
pub mod error;
pub mod eval;
pub mod heap;
pub mod host;
pub mod instruction;
pub mod processor;
pub mod program;
pub mod register;
pub mod scope;
pub mod sprintf;
pub mod stack;
pub mod word;

#[cfg(test)]
mod test;

pub use util::Endian;

pub use crate::error::{Diagnostic, ExecError};
pub use crate::heap::{Heap, HeapError};
pub use crate::host::{NativeLoader, NoNativeLoader};
pub use crate::instruction::{ArgCount, InstructionData, Opcode, OpcodeInfo, OPCODES};
pub use crate::processor::Processor;
pub use crate::program::{CapabilityFlag, Label, Program};
pub use crate::register::{is_register, Register, RegisterBank, RegisterId};
pub use crate::scope::{Scope, ScopeStack};
pub use crate::stack::ValueStack;
pub use crate::word::{Word, WordType};
