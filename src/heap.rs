use std::collections::BTreeMap;
use std::{error::Error as StdError, fmt};

use byteorder::ByteOrder;
use util::Endian;

use crate::word::{Word, WordType};

/// First address handed out by the allocator; zero stays the null pointer.
const BASE_ADDRESS: u64 = 0x1000;

/// Block bases are spaced so that consecutive allocations never touch.
const ALIGNMENT: u64 = 16;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum HeapError {
    Null,
    OutOfRange { address: u64, len: u32 },
    ValueType { cell: WordType, value: WordType },
}

impl fmt::Display for HeapError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            HeapError::Null => f.write_str("null address"),
            HeapError::OutOfRange { address, len } => write!(
                f,
                "address 0x{:x} (+{} bytes) is outside any allocation",
                address, len
            ),
            HeapError::ValueType { cell, value } => {
                write!(f, "cannot store {} into a {} cell", value, cell)
            }
        }
    }
}

impl StdError for HeapError {}

/// Address-space allocator backing `alloc`, the memory opcodes and `free`.
///
/// Blocks live in a VM-private address space; a `Pointer` word is a plain
/// address into it, so pointer arithmetic stays valid anywhere inside a
/// block. Nothing ever moves a block, and every access is bounds-checked
/// against the block containing the address.
pub struct Heap {
    blocks: BTreeMap<u64, Vec<u8>>,
    next: u64,
}

impl Heap {
    pub fn new() -> Heap {
        Heap {
            blocks: BTreeMap::new(),
            next: BASE_ADDRESS,
        }
    }

    /// Allocates `size` zero-filled bytes and returns the block address.
    pub fn alloc(&mut self, size: usize) -> u64 {
        let base = self.next;
        let span = ((size as u64).max(1) + ALIGNMENT - 1) / ALIGNMENT * ALIGNMENT;
        self.next += span;
        self.blocks.insert(base, vec![0; size]);
        base
    }

    /// Releases the block starting at `address`. Addresses that do not name
    /// a live block are ignored.
    pub fn free(&mut self, address: u64) -> bool {
        self.blocks.remove(&address).is_some()
    }

    /// Number of live blocks; used by shutdown leak checks.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    fn locate(&self, address: u64, len: u32) -> Result<(u64, usize), HeapError> {
        if address == 0 {
            return Err(HeapError::Null);
        }
        let out_of_range = HeapError::OutOfRange { address, len };
        let (base, block) = self
            .blocks
            .range(..=address)
            .next_back()
            .ok_or(out_of_range)?;
        let offset = (address - base) as usize;
        if offset + len as usize <= block.len() {
            Ok((*base, offset))
        } else {
            Err(out_of_range)
        }
    }

    pub fn slice(&self, address: u64, len: u32) -> Result<&[u8], HeapError> {
        let (base, offset) = self.locate(address, len)?;
        Ok(&self.blocks[&base][offset..offset + len as usize])
    }

    pub fn slice_mut(&mut self, address: u64, len: u32) -> Result<&mut [u8], HeapError> {
        let (base, offset) = self.locate(address, len)?;
        let block = self.blocks.get_mut(&base).unwrap();
        Ok(&mut block[offset..offset + len as usize])
    }

    /// Reads one typed cell at `address`. A `charp` cell holds the address
    /// of NUL-terminated bytes, which are copied back out into an owned
    /// string.
    pub fn read_value(&self, address: u64, ty: WordType) -> Result<Word, HeapError> {
        Ok(match ty {
            WordType::Int => Word::Int(i64::from(Endian::read_i32(self.slice(address, 4)?))),
            WordType::Float => Word::Float(Endian::read_f32(self.slice(address, 4)?)),
            WordType::Char => Word::Char(self.slice(address, 1)?[0]),
            WordType::Bool => Word::Bool(self.slice(address, 1)?[0] != 0),
            WordType::Pointer => Word::Pointer(Endian::read_u64(self.slice(address, 8)?)),
            WordType::String => {
                let target = Endian::read_u64(self.slice(address, 8)?);
                self.read_string(target)?
            }
        })
    }

    /// Copies the NUL-terminated bytes at `address` into an owned string.
    pub fn read_string(&self, address: u64) -> Result<Word, HeapError> {
        let (base, offset) = self.locate(address, 1)?;
        let bytes = &self.blocks[&base][offset..];
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok(Word::String(
            String::from_utf8_lossy(&bytes[..end]).into_owned(),
        ))
    }

    /// Writes one typed cell at `address`. Numeric cells coerce between
    /// `Int` and `Float` (or store zero for foreign variants); `pointer`
    /// and `charp` cells insist on matching values. Storing a string
    /// allocates a fresh NUL-terminated block and releases the one the cell
    /// pointed at before.
    pub fn write_value(&mut self, address: u64, value: &Word, ty: WordType) -> Result<(), HeapError> {
        match ty {
            WordType::Int => {
                let v = match value {
                    Word::Int(v) => *v as i32,
                    Word::Float(f) => *f as i32,
                    Word::Char(c) => i32::from(*c),
                    _ => 0,
                };
                Endian::write_i32(self.slice_mut(address, 4)?, v);
            }
            WordType::Float => {
                let v = match value {
                    Word::Float(f) => *f,
                    Word::Int(v) => *v as f32,
                    _ => 0.0,
                };
                Endian::write_f32(self.slice_mut(address, 4)?, v);
            }
            WordType::Char => {
                let v = match value {
                    Word::Char(c) => *c,
                    Word::Int(v) => *v as u8,
                    _ => 0,
                };
                self.slice_mut(address, 1)?[0] = v;
            }
            WordType::Bool => {
                let v = match value {
                    Word::Bool(b) => *b as u8,
                    Word::Int(v) => (*v != 0) as u8,
                    _ => 0,
                };
                self.slice_mut(address, 1)?[0] = v;
            }
            WordType::Pointer => match value {
                Word::Pointer(p) => Endian::write_u64(self.slice_mut(address, 8)?, *p),
                other => {
                    return Err(HeapError::ValueType {
                        cell: WordType::Pointer,
                        value: other.word_type(),
                    })
                }
            },
            WordType::String => match value {
                Word::String(s) => {
                    let old = Endian::read_u64(self.slice(address, 8)?);
                    let target = self.alloc(s.len() + 1);
                    self.slice_mut(target, s.len() as u32)?
                        .copy_from_slice(s.as_bytes());
                    if old != 0 {
                        self.free(old);
                    }
                    Endian::write_u64(self.slice_mut(address, 8)?, target);
                }
                other => {
                    return Err(HeapError::ValueType {
                        cell: WordType::String,
                        value: other.word_type(),
                    })
                }
            },
        }
        Ok(())
    }

    /// Byte-wise comparison of two regions; the result follows `memcmp`.
    pub fn compare(&self, a: u64, b: u64, len: u32) -> Result<i32, HeapError> {
        let lhs = self.slice(a, len)?;
        let rhs = self.slice(b, len)?;
        Ok(match lhs.cmp(rhs) {
            std::cmp::Ordering::Less => -1,
            std::cmp::Ordering::Equal => 0,
            std::cmp::Ordering::Greater => 1,
        })
    }

    /// Copies `len` bytes from `src` to `dst`.
    pub fn copy(&mut self, dst: u64, src: u64, len: u32) -> Result<(), HeapError> {
        let data = self.slice(src, len)?.to_vec();
        self.slice_mut(dst, len)?.copy_from_slice(&data);
        Ok(())
    }
}

impl Default for Heap {
    fn default() -> Heap {
        Heap::new()
    }
}
