use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub mod utils;

pub type Result<T> = std::result::Result<T, anyhow::Error>;

/// Host filesystem capabilities the crate is built on.
///
/// There are exactly two implementations, `sys::unix` and `sys::windows`, and the one
/// matching the build target is exported as `sys::Host`. Nothing dispatches at runtime.
///
/// Query methods follow one convention: `Ok(false)` means "there is nothing at this path"
/// (the not-found class of OS errors), `Err` means the OS refused to answer for any other
/// reason.
pub(crate) trait FsBackend {
    /// An open directory stream. Owned by exactly one cursor, never duplicated.
    type Handle;

    fn exists(path: &Path) -> Result<bool>;

    fn is_directory(path: &Path) -> Result<bool>;

    /// Creates exactly one directory level.
    fn create_directory(path: &Path) -> Result<()>;

    /// Returns the absolute current working directory.
    fn cwd() -> Result<PathBuf>;

    fn open_directory(path: &Path) -> Result<Self::Handle>;

    /// Returns the next raw entry name, `.` and `..` included.
    /// `Ok(None)` marks the end of the stream.
    fn read_entry(handle: &mut Self::Handle) -> Result<Option<OsString>>;

    /// Releases the stream. Consumes the handle, so it can't be released twice.
    fn close(handle: Self::Handle) -> Result<()>;
}
