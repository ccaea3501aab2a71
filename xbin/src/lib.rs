//! Serializer and loader for the `.xbin` image format.
//!
//! An image is the concatenation of a fixed metadata block (4-byte ASCII
//! magic `XBIN`, a one-byte flag count and four one-byte flag slots), the
//! length-prefixed source filename, the instruction records and the label
//! table. Each instruction record is a one-byte opcode, a four-byte line
//! number and a length-prefixed operand list; each operand carries a
//! one-byte type tag (`R` register, `N` integer, `S` string) followed by
//! its payload. Integers are stored at the smallest of 1, 2, 4 or 8 bytes
//! that holds the signed value and are sign-extended on load.
//!
//! All multi-byte integers are little-endian and length fields are 64 bits
//! wide, so images are portable across little-endian hosts.

use std::fs::File;
use std::io::prelude::*;
use std::io::{self, BufReader, BufWriter};
use std::path::Path;
use std::{error::Error as StdError, fmt};

use byteorder::{ReadBytesExt, WriteBytesExt};
use num_traits::{FromPrimitive, ToPrimitive};
use util::Endian;

use ortavm::instruction::{self, InstructionData, Opcode};
use ortavm::program::Program;
use ortavm::register::RegisterId;

pub const MAGIC: [u8; 4] = *b"XBIN";

const FLAG_SLOTS: usize = 4;

const TAG_REGISTER: u8 = b'R';
const TAG_NUMBER: u8 = b'N';
const TAG_STRING: u8 = b'S';

#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    BadMagic([u8; 4]),
    UnknownOpcode(u8),
    UnknownRegister(u8),
    UnknownOperandTag(u8),
    BadWidth(u8),
    BadString,
    BadOperandCount { mnemonic: &'static str, count: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "{}", err),
            Error::BadMagic(magic) => write!(f, "bad magic {:?}, expected \"XBIN\"", magic),
            Error::UnknownOpcode(byte) => write!(f, "unknown opcode {}", byte),
            Error::UnknownRegister(id) => write!(f, "unknown register id {}", id),
            Error::UnknownOperandTag(tag) => write!(f, "unknown operand tag {}", tag),
            Error::BadWidth(width) => write!(f, "unsupported integer width {}", width),
            Error::BadString => f.write_str("operand is not valid UTF-8"),
            Error::BadOperandCount { mnemonic, count } => {
                write!(f, "instruction '{}' decoded with {} operands", mnemonic, count)
            }
        }
    }
}

impl StdError for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

/// Smallest of 1, 2, 4 or 8 bytes that holds `value` in two's complement.
pub fn optimal_size(value: i64) -> u8 {
    if value >= i64::from(i8::MIN) && value <= i64::from(i8::MAX) {
        1
    } else if value >= i64::from(i16::MIN) && value <= i64::from(i16::MAX) {
        2
    } else if value >= i64::from(i32::MIN) && value <= i64::from(i32::MAX) {
        4
    } else {
        8
    }
}

fn write_bytes<W: Write>(writer: &mut W, bytes: &[u8]) -> Result<(), Error> {
    writer.write_u64::<Endian>(bytes.len() as u64)?;
    writer.write_all(bytes)?;
    Ok(())
}

fn write_operand<W: Write>(writer: &mut W, operand: &str) -> Result<(), Error> {
    if let Some(register) = RegisterId::parse(operand) {
        writer.write_u8(TAG_REGISTER)?;
        writer.write_u8(register.index() as u8)?;
    } else if instruction::is_int_literal(operand) {
        let value: i64 = operand.parse().unwrap();
        let width = optimal_size(value);
        writer.write_u8(TAG_NUMBER)?;
        writer.write_u8(width)?;
        writer.write_int::<Endian>(value, width as usize)?;
    } else {
        writer.write_u8(TAG_STRING)?;
        write_bytes(writer, operand.as_bytes())?;
    }
    Ok(())
}

/// Serializes `program`, deriving the capability flags from its instruction
/// stream first.
pub fn write<W: Write>(writer: &mut W, program: &Program) -> Result<(), Error> {
    let flags = program.capability_flags();
    writer.write_all(&MAGIC)?;
    writer.write_u8(flags.len() as u8)?;
    for slot in 0..FLAG_SLOTS {
        let value = flags.get(slot).map(|f| f.to_u8().unwrap()).unwrap_or(0);
        writer.write_u8(value)?;
    }

    write_bytes(writer, program.filename.as_bytes())?;

    writer.write_u64::<Endian>(program.instructions.len() as u64)?;
    for instr in &program.instructions {
        writer.write_u8(instr.opcode.to_u8().unwrap())?;
        writer.write_u32::<Endian>(instr.line)?;
        writer.write_u64::<Endian>(instr.operands.len() as u64)?;
        for operand in &instr.operands {
            write_operand(writer, operand)?;
        }
    }

    writer.write_u64::<Endian>(program.labels.len() as u64)?;
    for label in &program.labels {
        write_bytes(writer, label.name.as_bytes())?;
        writer.write_u64::<Endian>(label.address as u64)?;
    }
    Ok(())
}

fn read_string<R: Read>(reader: &mut R) -> Result<String, Error> {
    let len = reader.read_u64::<Endian>()?;
    let mut bytes = vec![0; len as usize];
    reader.read_exact(&mut bytes)?;
    String::from_utf8(bytes).map_err(|_| Error::BadString)
}

fn read_operand<R: Read>(reader: &mut R) -> Result<String, Error> {
    match reader.read_u8()? {
        TAG_REGISTER => {
            let id = reader.read_u8()?;
            RegisterId::from_index(id as usize)
                .map(|register| register.name().to_owned())
                .ok_or(Error::UnknownRegister(id))
        }
        TAG_NUMBER => {
            let width = reader.read_u8()?;
            if !matches!(width, 1 | 2 | 4 | 8) {
                return Err(Error::BadWidth(width));
            }
            let value = reader.read_int::<Endian>(width as usize)?;
            Ok(value.to_string())
        }
        TAG_STRING => read_string(reader),
        tag => Err(Error::UnknownOperandTag(tag)),
    }
}

/// Deserializes a program. On any error the partially decoded program is
/// discarded; no VM state is touched.
pub fn read<R: Read>(reader: &mut R) -> Result<Program, Error> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(Error::BadMagic(magic));
    }
    // flags are advisory; loaders re-derive them from the instructions
    let _flag_count = reader.read_u8()?;
    let mut slots = [0u8; FLAG_SLOTS];
    reader.read_exact(&mut slots)?;

    let filename = read_string(reader)?;
    let mut program = Program::new(&filename);

    let instruction_count = reader.read_u64::<Endian>()?;
    for _ in 0..instruction_count {
        let opcode_byte = reader.read_u8()?;
        let opcode = Opcode::from_u8(opcode_byte).ok_or(Error::UnknownOpcode(opcode_byte))?;
        let line = reader.read_u32::<Endian>()?;
        let operand_count = reader.read_u64::<Endian>()?;
        let mut operands = Vec::new();
        for _ in 0..operand_count {
            operands.push(read_operand(reader)?);
        }
        if !opcode.args().accepts(operands.len()) {
            return Err(Error::BadOperandCount {
                mnemonic: opcode.mnemonic(),
                count: operands.len(),
            });
        }
        program.add_instruction(InstructionData::new(opcode, operands, line));
    }

    let label_count = reader.read_u64::<Endian>()?;
    for _ in 0..label_count {
        let name = read_string(reader)?;
        let address = reader.read_u64::<Endian>()?;
        program.add_raw_label(&name, address as usize);
    }

    Ok(program)
}

pub trait ReadXbinExt: Read + Sized {
    fn read_xbin(&mut self) -> Result<Program, Error> {
        read(self)
    }
}

impl<R: Read + Sized> ReadXbinExt for R {}

pub trait WriteXbinExt: Write + Sized {
    fn write_xbin(&mut self, program: &Program) -> Result<(), Error> {
        write(self, program)
    }
}

impl<W: Write + Sized> WriteXbinExt for W {}

pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Program, Error> {
    BufReader::new(File::open(path)?).read_xbin()
}

pub fn write_file<P: AsRef<Path>>(path: P, program: &Program) -> Result<(), Error> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_xbin(program)?;
    writer.flush()?;
    Ok(())
}

/// In-memory loader with the same semantics as [`read_file`]; used when
/// images are bundled into another artifact.
pub fn load_from_memory(mut data: &[u8]) -> Result<Program, Error> {
    read(&mut data)
}

/// Serializes into an owned buffer.
pub fn save_to_memory(program: &Program) -> Result<Vec<u8>, Error> {
    let mut out = Vec::new();
    write(&mut out, program)?;
    Ok(out)
}
