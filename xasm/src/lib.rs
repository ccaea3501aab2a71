//! Assembler for the [OrtaVM](../ortavm/index.html) virtual machine.
//!
//! The main entry points are [`assemble_source`], which turns (already
//! preprocessed) source text into a [`Program`], and [`assemble_file`],
//! which runs the [`Preprocessor`] first and also returns the
//! [`AssemblyOptions`] collected from `#stack` and `#entry` directives.
//! The compiled program can then be executed directly or serialized with
//! the [xbin](../xbin/index.html) crate.
//!
//! # The Orta assembly language
//!
//! A program is a sequence of lines. A line holds a label declaration, an
//! instruction, a preprocessor directive, or nothing; comments start with
//! `;` and run to the end of the line.
//!
//! ```text
//! #define GREETING "hello world"
//!
//! __entry:
//!     push GREETING
//!     print               ; prints hello world
//!     call fact_demo
//!     halt
//!
//! fact_demo:
//!     push 10
//!     setvar n
//!     push 1
//!     setvar acc
//! .loop:
//!     getvar n
//!     push 0
//!     eq
//!     jmpif .done
//!     getvar acc
//!     getvar n
//!     mul
//!     setvar acc
//!     dec n
//!     jmp .loop
//! .done:
//!     getvar acc
//!     print
//!     ret
//! ```
//!
//! Mnemonics are lowercase and case-sensitive; register names (`RAX`,
//! `RBX`, ... `RA`, `FR`) are case-insensitive. Operands are integers
//! (decimal or `0x` hex), floats, double-quoted strings, register names,
//! type keywords or label references, separated by whitespace with
//! optional commas.
//!
//! Labels ending in `:` name the following instruction. A label starting
//! with `.` is local: its name is mangled with the most recently declared
//! non-local label, so every function can have its own `.loop`. Parsing is
//! two-pass (labels first, instructions second), which makes forward
//! references work; every declaration emits a `nop` so the label address
//! is a concrete program counter value.

mod error;
mod instructions;
mod labels;
mod parser;
mod preprocessor;

#[cfg(test)]
mod test;

use std::fs;
use std::path::Path;

use pest::iterators::Pairs;
use pest::Parser;

use ortavm::program::Program;

use crate::parser::{OrtaParser, Rule};

pub use crate::error::{Error, ParseError, PreprocessError};
pub use crate::preprocessor::{AssemblyOptions, Preprocessor};

fn parse(input: &str) -> Result<Pairs<Rule>, ParseError> {
    let mut pairs = OrtaParser::parse(Rule::program, input).map_err(ParseError::from)?;
    Ok(pairs.next().unwrap().into_inner())
}

/// Parses preprocessed source text into a [`Program`]. `filename` names
/// the program in diagnostics and in the compiled image.
pub fn assemble_source(input: &str, filename: &str) -> Result<Program, Error> {
    let statements = parse(input).map_err(Error::Parse)?;
    let labels = labels::collect_labels(statements.clone()).map_err(Error::Parse)?;
    let mut program = Program::new(filename);
    instructions::process_instructions(statements, &labels, &mut program).map_err(Error::Parse)?;
    Ok(program)
}

/// Preprocesses and assembles the file at `path`.
pub fn assemble_file<P: AsRef<Path>>(path: P) -> Result<(Program, AssemblyOptions), Error> {
    let path = path.as_ref();
    let mut preprocessor = Preprocessor::new();
    let (text, options) = preprocessor.preprocess_file(path)?;
    let program = assemble_source(&text, &path.to_string_lossy())?;
    Ok((program, options))
}

/// Assembles the file at `path` without preprocessing it; directives in
/// the raw source are ignored by the grammar.
pub fn assemble_file_raw<P: AsRef<Path>>(path: P) -> Result<Program, Error> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| {
        Error::Preprocess(PreprocessError::Io {
            path: path.to_owned(),
            source,
        })
    })?;
    assemble_source(&text, &path.to_string_lossy())
}
