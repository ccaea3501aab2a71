use num_derive::{FromPrimitive, ToPrimitive};

use crate::instruction::{InstructionData, Opcode};

/// Context used for local labels declared before any non-local one.
const GLOBAL_CONTEXT: &str = "_global";

#[derive(Clone, Debug, PartialEq)]
pub struct Label {
    pub name: String,
    pub address: usize,
}

/// Capability classes advertised by a compiled image, derived from the
/// instruction stream.
#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive, ToPrimitive)]
pub enum CapabilityFlag {
    Nothing,
    Stack,
    Memory,
    Xcall,
}

/// Mangles a local label name with its enclosing context.
pub fn mangle_local(context: Option<&str>, name: &str) -> String {
    let bare = name.strip_prefix('.').unwrap_or(name);
    format!("{}_{}", context.unwrap_or(GLOBAL_CONTEXT), bare)
}

/// A parsed or loaded program: the instruction stream plus its label table.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Program {
    pub filename: String,
    pub instructions: Vec<InstructionData>,
    pub labels: Vec<Label>,
    last_non_local_label: Option<String>,
}

impl Program {
    pub fn new(filename: &str) -> Program {
        Program {
            filename: filename.to_owned(),
            instructions: Vec::new(),
            labels: Vec::new(),
            last_non_local_label: None,
        }
    }

    pub fn add_instruction(&mut self, instruction: InstructionData) {
        self.instructions.push(instruction);
    }

    /// Records a label at the current instruction index and emits the `nop`
    /// that pins its address. Local names (leading `.`) are mangled with the
    /// most recently declared non-local label.
    pub fn add_label(&mut self, name: &str, line: u32) {
        let resolved = if name.starts_with('.') {
            mangle_local(self.last_non_local_label.as_deref(), name)
        } else {
            self.last_non_local_label = Some(name.to_owned());
            name.to_owned()
        };
        self.labels.push(Label {
            name: resolved,
            address: self.instructions.len(),
        });
        self.add_instruction(InstructionData::nop(line));
    }

    pub fn add_raw_label(&mut self, name: &str, address: usize) {
        self.labels.push(Label {
            name: name.to_owned(),
            address,
        });
    }

    pub fn find_label(&self, name: &str) -> Option<usize> {
        self.labels
            .iter()
            .find(|label| label.name == name)
            .map(|label| label.address)
    }

    pub fn last_non_local_label(&self) -> Option<&str> {
        self.last_non_local_label.as_deref()
    }

    /// Parse-time bookkeeping only; the assembler clears it when done.
    pub fn clear_label_context(&mut self) {
        self.last_non_local_label = None;
    }

    /// Scans the instruction stream for the capability classes it uses.
    pub fn capability_flags(&self) -> Vec<CapabilityFlag> {
        let mut flags = Vec::new();
        for instruction in &self.instructions {
            let flag = match instruction.opcode {
                Opcode::Push | Opcode::Pop => CapabilityFlag::Stack,
                Opcode::Alloc | Opcode::ReadMem | Opcode::WriteMem => CapabilityFlag::Memory,
                Opcode::Xcall => CapabilityFlag::Xcall,
                _ => continue,
            };
            if !flags.contains(&flag) {
                flags.push(flag);
            }
        }
        flags
    }
}
