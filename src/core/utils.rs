//! Separator constants and the string algorithms behind the public path helpers.
//!
//! The algorithms take the separator as an argument so that the Windows behaviour can be
//! checked on a unix host and vice versa; the public wrappers in `crate::path` pass
//! [`SEPARATOR`].

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Separator used by Unix-style paths, whatever the host.
pub const UNIX_SEPARATOR: char = '/';

/// Preferred separator of the host platform.
#[cfg(not(windows))]
pub const SEPARATOR: char = '/';
#[cfg(windows)]
pub const SEPARATOR: char = '\\';

/// [`SEPARATOR`] as a string slice.
#[cfg(not(windows))]
pub const SEPARATOR_STR: &str = "/";
#[cfg(windows)]
pub const SEPARATOR_STR: &str = "\\";

/// Replaces every `from` with `to` in place.
pub fn replace_separator(path: &mut String, from: char, to: char) {
    if from == to || !path.contains(from) {
        return;
    }
    *path = path.replace(from, to.encode_utf8(&mut [0; 4]));
}

/// Returns the last segment of `path`, with `separator` as the segment delimiter.
///
/// Mirrors the classic POSIX `basename`: a trailing separator is ignored, and a path made
/// only of separators yields a single separator.
pub fn basename_with(path: &str, separator: char) -> String {
    let mut basename = String::with_capacity(path.len());
    let mut last_was_separator = false;

    let mut chars = path.chars().peekable();
    while let Some(c) = chars.next() {
        if c == separator {
            if chars.peek().is_none() {
                if basename.is_empty() {
                    basename.push(separator);
                }
                break;
            }
            last_was_separator = true;
        } else {
            if last_was_separator {
                last_was_separator = false;
                basename.clear();
            }
            basename.push(c);
        }
    }

    basename
}

/// True for the `.` and `..` pseudo entries every directory stream reports.
pub fn is_dot_entry(name: &OsStr) -> bool {
    name == "." || name == ".."
}

/// `dir + SEPARATOR + name`, by plain concatenation.
/// Unlike `Path::join` this never drops `dir` when `name` looks absolute.
pub fn join_entry(dir: &Path, name: &OsStr) -> PathBuf {
    let mut joined = OsString::with_capacity(dir.as_os_str().len() + 1 + name.len());
    joined.push(dir.as_os_str());
    joined.push(SEPARATOR_STR);
    joined.push(name);
    PathBuf::from(joined)
}
