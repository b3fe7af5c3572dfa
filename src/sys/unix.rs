//! POSIX backend on top of `libc`.

use std::ffi::{CStr, CString, OsStr, OsString};
use std::io;
use std::mem::MaybeUninit;
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::{Path, PathBuf};
use std::ptr::{self, NonNull};

use anyhow::{Context, anyhow};

use super::{CWD_BUFFER_LIMIT, CWD_INITIAL_BUFFER};
use crate::core::{FsBackend, Result};

pub(crate) struct UnixFs;

/// An open `DIR*` stream.
#[derive(Debug)]
pub(crate) struct DirStream(NonNull<libc::DIR>);

// SAFETY: a DIR stream can be used from any thread as long as calls are not concurrent.
// `DirStream` is not `Sync` and every use goes through `&mut` or by value.
unsafe impl Send for DirStream {}

/// Errors meaning "nothing there" rather than "can't tell".
fn is_not_found(err: &io::Error) -> bool {
    matches!(
        err.raw_os_error(),
        Some(libc::ENOENT | libc::ENOTDIR | libc::ENAMETOOLONG)
    )
}

/// `None` if the path has an interior NUL, which no file can be named with.
fn to_cstring(path: &Path) -> Option<CString> {
    CString::new(path.as_os_str().as_bytes()).ok()
}

/// `stat(2)` following symlinks. `Ok(None)` if nothing resolves at `path`.
fn stat(path: &Path) -> Result<Option<libc::stat>> {
    let Some(c_path) = to_cstring(path) else {
        return Ok(None);
    };

    let mut st = MaybeUninit::<libc::stat>::uninit();
    let rc = unsafe { libc::stat(c_path.as_ptr(), st.as_mut_ptr()) };
    if rc == 0 {
        // SAFETY: stat() filled the buffer.
        return Ok(Some(unsafe { st.assume_init() }));
    }

    let err = io::Error::last_os_error();
    if is_not_found(&err) {
        return Ok(None);
    }
    Err(err).with_context(|| format!("unable to stat {}", path.display()))
}

fn realpath(raw: Vec<u8>) -> Result<PathBuf> {
    let c_path = CString::new(raw)?;
    let resolved = unsafe { libc::realpath(c_path.as_ptr(), ptr::null_mut()) };
    if resolved.is_null() {
        return Err(io::Error::last_os_error()).with_context(|| {
            format!(
                "unable to resolve {}",
                String::from_utf8_lossy(c_path.as_bytes())
            )
        });
    }

    // SAFETY: realpath() returned a malloc'ed, NUL-terminated string we now own.
    let bytes = unsafe { CStr::from_ptr(resolved) }.to_bytes().to_vec();
    unsafe { libc::free(resolved.cast()) };

    Ok(PathBuf::from(OsString::from_vec(bytes)))
}

/// Calls `getcwd` with a buffer of `initial` bytes, doubling it while the call reports
/// `ERANGE`, up to `limit`. Returns the bytes before the terminating NUL.
fn read_cwd<F>(initial: usize, limit: usize, mut getcwd: F) -> Result<Vec<u8>>
where
    F: FnMut(&mut [u8]) -> io::Result<()>,
{
    let mut size = initial.max(1);
    loop {
        let mut buf = vec![0u8; size];
        match getcwd(&mut buf) {
            Ok(()) => {
                let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
                buf.truncate(len);
                return Ok(buf);
            }
            Err(err) if err.raw_os_error() == Some(libc::ERANGE) => {
                if size >= limit {
                    return Err(anyhow!("current directory is longer than {} bytes", limit));
                }
                size = (size * 2).min(limit);
            }
            Err(err) => return Err(err).context("unable to get the current directory"),
        }
    }
}

impl FsBackend for UnixFs {
    type Handle = DirStream;

    fn exists(path: &Path) -> Result<bool> {
        Ok(stat(path)?.is_some())
    }

    fn is_directory(path: &Path) -> Result<bool> {
        Ok(stat(path)?.is_some_and(|st| st.st_mode & libc::S_IFMT == libc::S_IFDIR))
    }

    fn create_directory(path: &Path) -> Result<()> {
        let c_path = to_cstring(path)
            .ok_or_else(|| anyhow!("invalid path {:?}: contains a nul byte", path))?;

        let mode = libc::S_IRWXU | libc::S_IRWXG | libc::S_IRWXO;
        let rc = unsafe { libc::mkdir(c_path.as_ptr(), mode as libc::mode_t) };
        if rc != 0 {
            return Err(io::Error::last_os_error())
                .with_context(|| format!("unable to create directory {}", path.display()));
        }
        Ok(())
    }

    fn cwd() -> Result<PathBuf> {
        let raw = read_cwd(CWD_INITIAL_BUFFER, CWD_BUFFER_LIMIT, |buf| {
            let rc = unsafe { libc::getcwd(buf.as_mut_ptr().cast(), buf.len()) };
            if rc.is_null() {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        })?;
        realpath(raw)
    }

    fn open_directory(path: &Path) -> Result<DirStream> {
        let c_path = to_cstring(path)
            .ok_or_else(|| anyhow!("invalid path {:?}: contains a nul byte", path))?;

        let dir = unsafe { libc::opendir(c_path.as_ptr()) };
        NonNull::new(dir).map(DirStream).ok_or_else(|| {
            anyhow::Error::new(io::Error::last_os_error())
                .context(format!("unable to open directory {}", path.display()))
        })
    }

    fn read_entry(handle: &mut DirStream) -> Result<Option<OsString>> {
        let entry = unsafe { libc::readdir(handle.0.as_ptr()) };
        if entry.is_null() {
            return Ok(None);
        }

        // SAFETY: d_name is NUL-terminated and valid until the next readdir() on this stream.
        let name = unsafe { CStr::from_ptr((*entry).d_name.as_ptr()) };
        Ok(Some(OsStr::from_bytes(name.to_bytes()).to_os_string()))
    }

    fn close(handle: DirStream) -> Result<()> {
        let rc = unsafe { libc::closedir(handle.0.as_ptr()) };
        if rc != 0 {
            return Err(io::Error::last_os_error()).context("unable to close directory stream");
        }
        Ok(())
    }
}
