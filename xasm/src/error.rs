use std::io;
use std::path::PathBuf;
use std::{error::Error as StdError, fmt};

use pest::error::Error as PestError;

use ortavm::instruction::ArgCount;

use crate::parser::Rule;

#[derive(Debug)]
pub enum ParseError {
    Pest(Box<PestError<Rule>>),
    UnknownMnemonic {
        name: String,
        line: usize,
    },
    ArityMismatch {
        mnemonic: &'static str,
        expected: ArgCount,
        actual: usize,
        line: usize,
    },
    DuplicateLabel {
        name: String,
        line: usize,
    },
    IntOutOfRange {
        literal: String,
        line: usize,
    },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParseError::Pest(err) => write!(f, "{}", err),
            ParseError::UnknownMnemonic { name, line } => {
                write!(f, "Unknown instruction '{}' at line {}", name, line)
            }
            ParseError::ArityMismatch {
                mnemonic,
                expected,
                actual,
                line,
            } => write!(
                f,
                "Expected {} operands for '{}', got {} at line {}",
                expected, mnemonic, actual, line
            ),
            ParseError::DuplicateLabel { name, line } => {
                write!(f, "Duplicate label '{}' at line {}", name, line)
            }
            ParseError::IntOutOfRange { literal, line } => {
                write!(f, "Integer literal '{}' at line {} is out of range", literal, line)
            }
        }
    }
}

impl StdError for ParseError {}

impl From<PestError<Rule>> for ParseError {
    fn from(err: PestError<Rule>) -> ParseError {
        ParseError::Pest(Box::new(err))
    }
}

#[derive(Debug)]
pub enum PreprocessError {
    Io { path: PathBuf, source: io::Error },
    MissingInclude { spec: String, from: PathBuf },
    CircularInclude { path: PathBuf },
    DepthExceeded { path: PathBuf },
    BadDirective { directive: String, line: usize },
}

impl fmt::Display for PreprocessError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PreprocessError::Io { path, source } => {
                write!(f, "Cannot read \"{}\": {}", path.display(), source)
            }
            PreprocessError::MissingInclude { spec, from } => write!(
                f,
                "Include \"{}\" (from \"{}\") was not found on the search path",
                spec,
                from.display()
            ),
            PreprocessError::CircularInclude { path } => {
                write!(f, "Circular include of \"{}\"", path.display())
            }
            PreprocessError::DepthExceeded { path } => write!(
                f,
                "Include depth exceeded while processing \"{}\"",
                path.display()
            ),
            PreprocessError::BadDirective { directive, line } => {
                write!(f, "Bad directive '{}' at line {}", directive, line)
            }
        }
    }
}

impl StdError for PreprocessError {}

#[derive(Debug)]
pub enum Error {
    Parse(ParseError),
    Preprocess(PreprocessError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Parse(err) => write!(f, "{}", err),
            Error::Preprocess(err) => write!(f, "{}", err),
        }
    }
}

impl StdError for Error {}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Error {
        Error::Parse(err)
    }
}

impl From<PreprocessError> for Error {
    fn from(err: PreprocessError) -> Error {
        Error::Preprocess(err)
    }
}
