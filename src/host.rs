use std::process::Command;
use std::thread;
use std::time::Duration;

/// Status codes reported in `RAX` by the library selectors of `xcall`.
pub const XCALL_OK: i64 = 0;
pub const XCALL_ERROR_OPEN: i64 = -1;
pub const XCALL_ERROR_SYMBOL: i64 = -2;
pub const XCALL_ERROR_CLOSE: i64 = -3;
pub const XCALL_ERROR_INVALID: i64 = -4;

/// Host capability behind `xcall` selectors 4 (open), 5 (sym) and 6 (call).
///
/// Handles and symbol addresses are opaque nonzero values chosen by the
/// implementation; the VM keeps them in `Pointer` words and never
/// dereferences them itself. Loaded libraries are released when the loader
/// is dropped.
pub trait NativeLoader {
    fn open(&mut self, path: &str) -> Option<u64>;
    fn sym(&mut self, handle: u64, name: &str) -> Option<u64>;
    fn call(&mut self, address: u64, args: &[i64]) -> Option<i64>;
}

/// Default loader: refuses every request with the documented status codes.
/// Real dynamic loading is an embedder-supplied capability.
pub struct NoNativeLoader;

impl NativeLoader for NoNativeLoader {
    fn open(&mut self, _path: &str) -> Option<u64> {
        None
    }

    fn sym(&mut self, _handle: u64, _name: &str) -> Option<u64> {
        None
    }

    fn call(&mut self, _address: u64, _args: &[i64]) -> Option<i64> {
        None
    }
}

pub fn sleep_millis(millis: u64) {
    thread::sleep(Duration::from_millis(millis));
}

/// Runs a command through the platform shell and reports its exit code.
/// The command is passed through untouched; `xcall 2` is privileged.
pub fn shell(command: &str) -> i32 {
    let status = if cfg!(windows) {
        Command::new("cmd").arg("/C").arg(command).status()
    } else {
        Command::new("sh").arg("-c").arg(command).status()
    };
    status.ok().and_then(|s| s.code()).unwrap_or(-1)
}
