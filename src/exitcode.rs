//! Process exit codes, following BSD sysexits.h

pub const OK: i32 = 0;

/// Bad arguments: conflicting or missing input, no module source
pub const USAGE: i32 = 64;

/// Cyclic dependencies, unparseable manifests or hierarchy files, and
/// unknown modules under `--strict`
pub const DATAERR: i32 = 65;

/// A manifest, module path or hierarchy file does not exist
pub const NOINPUT: i32 = 66;

/// A lookup the graph guarantees failed anyway
pub const SOFTWARE: i32 = 70;

/// Reading or writing a file failed
pub const IOERR: i32 = 74;

/// Config file or `DEPTRIM_*` variable is invalid
pub const CONFIG: i32 = 78;
