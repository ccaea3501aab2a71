use std::path::PathBuf;
use std::{error::Error, fmt};

/// Byte order used by the heap and the `.xbin` image format.
pub type Endian = byteorder::LittleEndian;

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ParseEnumError {
    pub value: String,
    pub enum_name: &'static str,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Failed to parse \"{}\" as {}.",
            &self.value, &self.enum_name
        )
    }
}

impl Error for ParseEnumError {}

pub trait EnumFromStr: Sized {
    fn from_str(s: &str) -> Result<Self, ParseEnumError>;
}

/// Expands a leading `~` using `HOME` (POSIX) or `USERPROFILE` (Windows).
pub fn expand_home(path: &str) -> Option<PathBuf> {
    match path.strip_prefix('~') {
        Some(rest) => {
            let home = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE"))?;
            let mut full = PathBuf::from(home);
            let rest = rest.strip_prefix('/').unwrap_or(rest);
            if !rest.is_empty() {
                full.push(rest);
            }
            Some(full)
        }
        None => Some(PathBuf::from(path)),
    }
}
