//! Stateless path utilities.
//!
//! The filesystem queries come in two flavours:
//! - the plain ones (`exists`, `is_directory`, `create_directory`, `cwd`) answer with a
//!   `bool` or a `String` and swallow every failure;
//! - the `try_` ones keep "nothing there" (`Ok(false)`) apart from "the OS refused to
//!   answer" (`Err`).
//!
//! The string helpers never touch the filesystem; they work on the host's preferred
//! separator, [`SEPARATOR`].

use std::path::{Path, PathBuf};

use crate::core::utils::{self, SEPARATOR, UNIX_SEPARATOR};
use crate::core::{FsBackend, Result};
use crate::sys::Host;

/// Returns true, if an entry (file, directory, anything) resolves at `path`.
/// Symbolic links are followed, so a dangling link does not exist.
pub fn exists<P: AsRef<Path>>(path: P) -> bool {
    try_exists(path.as_ref()).unwrap_or_else(|err| {
        log::debug!("{err:#}");
        false
    })
}

/// Like [`exists`], but reports failures other than "not found".
///
/// # Returns
/// * `Ok(true)` - something resolves at `path`.
/// * `Ok(false)` - nothing does (missing entry, missing parent, invalid name, drive not
///   ready...).
/// * `Err(anyhow::Error)` - the OS could not tell, e.g. permission denied on a parent.
pub fn try_exists<P: AsRef<Path>>(path: P) -> Result<bool> {
    Host::exists(path.as_ref())
}

/// Returns true, if `path` exists and is a directory (after following links).
pub fn is_directory<P: AsRef<Path>>(path: P) -> bool {
    try_is_directory(path.as_ref()).unwrap_or_else(|err| {
        log::debug!("{err:#}");
        false
    })
}

/// Like [`is_directory`], with the error semantics of [`try_exists`].
pub fn try_is_directory<P: AsRef<Path>>(path: P) -> Result<bool> {
    Host::is_directory(path.as_ref())
}

/// Creates a single directory level. Parents are not created.
/// Returns false if the directory already exists, the parent is missing, or access is denied.
pub fn create_directory<P: AsRef<Path>>(path: P) -> bool {
    match try_create_directory(path.as_ref()) {
        Ok(()) => true,
        Err(err) => {
            log::debug!("{err:#}");
            false
        }
    }
}

/// Like [`create_directory`], carrying the OS error on failure.
///
/// The new directory gets mode `0o777` minus the umask on unix, and inherits the parent's
/// ACL on windows.
pub fn try_create_directory<P: AsRef<Path>>(path: P) -> Result<()> {
    Host::create_directory(path.as_ref())
}

/// Returns the current working directory, or an empty string on failure.
///
/// An empty result is an error, never the root. Non-UTF-8 components are replaced with
/// `U+FFFD`; use [`try_cwd`] to get the exact path.
pub fn cwd() -> String {
    match try_cwd() {
        Ok(path) => path.to_string_lossy().into_owned(),
        Err(err) => {
            crate::report!("{err:#}");
            String::new()
        }
    }
}

/// Returns the current working directory as an absolute path. On unix symbolic links are
/// resolved.
///
/// Fails if the OS call fails or the path is longer than [`crate::CWD_BUFFER_LIMIT`].
pub fn try_cwd() -> Result<PathBuf> {
    Host::cwd()
}

/// Appends one separator to `path`. An existing trailing separator is kept, so the result
/// may end in two.
pub fn separator(path: &str) -> String {
    let mut result = String::with_capacity(path.len() + 1);
    result.push_str(path);
    result.push(SEPARATOR);
    result
}

/// Replaces every `/` in `path` with the host separator. No-op on unix.
pub fn change_from_unix_path(path: &mut String) {
    utils::replace_separator(path, UNIX_SEPARATOR, SEPARATOR);
}

/// Copying version of [`change_from_unix_path`].
pub fn copy_from_unix_path(path: &str) -> String {
    let mut copy = path.to_owned();
    change_from_unix_path(&mut copy);
    copy
}

/// Replaces every host separator in `path` with `/`. No-op on unix.
pub fn change_to_unix_path(path: &mut String) {
    utils::replace_separator(path, SEPARATOR, UNIX_SEPARATOR);
}

/// Copying version of [`change_to_unix_path`].
pub fn copy_to_unix_path(path: &str) -> String {
    let mut copy = path.to_owned();
    change_to_unix_path(&mut copy);
    copy
}

/// Returns the last segment of `path`.
///
/// Follows POSIX `basename`: a trailing separator is ignored and a path consisting only of
/// separators gives a single separator.
///
/// ```
/// use fs_prims::path::{basename, separator};
///
/// let sep = separator("");
/// assert_eq!(basename(&format!("{sep}a{sep}b{sep}c")), "c");
/// assert_eq!(basename(&format!("{sep}a{sep}b{sep}")), "b");
/// assert_eq!(basename(&sep), sep);
/// assert_eq!(basename(""), "");
/// ```
pub fn basename(path: &str) -> String {
    utils::basename_with(path, SEPARATOR)
}
