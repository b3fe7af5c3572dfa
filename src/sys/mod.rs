//! Host backends. Exactly one is compiled in and exported as `Host`.

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub(crate) use unix::UnixFs as Host;
#[cfg(windows)]
pub(crate) use windows::WindowsFs as Host;

#[cfg(not(any(unix, windows)))]
compile_error!("fs-prims supports unix and windows hosts only");

/// Size of the first buffer tried when querying the current directory.
pub const CWD_INITIAL_BUFFER: usize = 128;

/// Upper bound for the current directory buffer (bytes on unix, UTF-16 units on windows).
/// A longer current directory is reported as an error instead of growing further.
pub const CWD_BUFFER_LIMIT: usize = 1 << 20;
