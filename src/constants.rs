/// Default capacity of the value stack; the `#stack` directive overrides it.
pub const DEFAULT_STACK_CAPACITY: usize = 16_384;

/// Default entry label; the `#entry` directive overrides it.
pub const DEFAULT_ENTRY: &str = "__entry";

/// Prefix of every diagnostic line written to stderr.
pub const LOG_PREFIX: &str = "[OVM] ";

pub const REGISTER_COUNT: usize = 16;
pub const REGISTER_BYTES: usize = 8;

/// Widths of typed memory cells.
pub const INT_BYTES: u32 = 4;
pub const FLOAT_BYTES: u32 = 4;
pub const CHAR_BYTES: u32 = 1;
pub const POINTER_BYTES: u32 = 8;

/// Includes nested deeper than this are treated as circular.
pub const MAX_INCLUDE_DEPTH: usize = 16;
