//! Win32 backend on top of `winapi`, using the wide (UTF-16) entry points.

use std::ffi::{OsStr, OsString};
use std::io;
use std::iter;
use std::mem;
use std::os::windows::ffi::{OsStrExt, OsStringExt};
use std::path::{Path, PathBuf};
use std::ptr;

use anyhow::{Context, anyhow};
use winapi::shared::minwindef::DWORD;
use winapi::shared::winerror::{
    ERROR_BAD_NETPATH, ERROR_BAD_PATHNAME, ERROR_FILE_NOT_FOUND, ERROR_INVALID_DRIVE,
    ERROR_INVALID_NAME, ERROR_INVALID_PARAMETER, ERROR_NO_MORE_FILES, ERROR_NOT_READY,
    ERROR_PATH_NOT_FOUND, ERROR_SHARING_VIOLATION,
};
use winapi::um::errhandlingapi::GetLastError;
use winapi::um::fileapi::{
    CreateDirectoryW, CreateFileW, FindClose, FindFirstFileW, FindNextFileW, GetFileAttributesW,
    INVALID_FILE_ATTRIBUTES, OPEN_EXISTING,
};
use winapi::um::handleapi::{CloseHandle, INVALID_HANDLE_VALUE};
use winapi::um::ioapiset::DeviceIoControl;
use winapi::um::minwinbase::WIN32_FIND_DATAW;
use winapi::um::processenv::GetCurrentDirectoryW;
use winapi::um::winbase::{FILE_FLAG_BACKUP_SEMANTICS, FILE_FLAG_OPEN_REPARSE_POINT};
use winapi::um::winioctl::FSCTL_GET_REPARSE_POINT;
use winapi::um::winnt::{
    FILE_ATTRIBUTE_DIRECTORY, FILE_ATTRIBUTE_REPARSE_POINT, FILE_READ_EA, FILE_SHARE_DELETE,
    FILE_SHARE_READ, FILE_SHARE_WRITE, HANDLE, IO_REPARSE_TAG_MOUNT_POINT, IO_REPARSE_TAG_SYMLINK,
};

use super::{CWD_BUFFER_LIMIT, CWD_INITIAL_BUFFER};
use crate::core::{FsBackend, Result};

/// Largest reparse data block `FSCTL_GET_REPARSE_POINT` can return.
pub(crate) const MAXIMUM_REPARSE_DATA_BUFFER_SIZE: usize = 16 * 1024;

const SHARE_ALL: DWORD = FILE_SHARE_DELETE | FILE_SHARE_READ | FILE_SHARE_WRITE;

pub(crate) struct WindowsFs;

/// An open `FindFirstFileW` search.
///
/// `FindFirstFileW` hands out the first entry together with the handle; it is kept in
/// `pending` until the first `read_entry`.
#[derive(Debug)]
pub(crate) struct FindHandle {
    handle: HANDLE,
    pending: Option<OsString>,
}

// SAFETY: a search handle may move between threads; it is never used concurrently.
unsafe impl Send for FindHandle {}

/// Closes a file handle on scope exit.
struct HandleGuard(HANDLE);

impl HandleGuard {
    fn is_valid(&self) -> bool {
        self.0 != INVALID_HANDLE_VALUE
    }
}

impl Drop for HandleGuard {
    fn drop(&mut self) {
        if self.is_valid() {
            unsafe { CloseHandle(self.0) };
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ReparseKind {
    Symlink,
    /// Directory junction or volume mount point.
    MountPoint,
}

fn to_wide(s: &OsStr) -> Vec<u16> {
    s.encode_wide().chain(iter::once(0)).collect()
}

fn from_wide(buf: &[u16]) -> OsString {
    let len = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    OsString::from_wide(&buf[..len])
}

fn is_not_found(code: DWORD) -> bool {
    matches!(
        code,
        ERROR_FILE_NOT_FOUND
            | ERROR_PATH_NOT_FOUND
            | ERROR_INVALID_NAME // "tools/src/:sys:stat.h", "//foo"
            | ERROR_INVALID_DRIVE // card reader with no card
            | ERROR_NOT_READY // optical drive with no disc
            | ERROR_INVALID_PARAMETER // ":sys:stat.h"
            | ERROR_BAD_PATHNAME // "//nosuch" on Win64
            | ERROR_BAD_NETPATH // "//nosuch" on Win32
    )
}

/// Classifies the last error of a failed status query.
/// `Ok(None)` for the not-found class. A sharing violation means the entry is there but
/// locked (`pagefile.sys`), so it is reported present with unknown attributes.
fn status_failure(path: &Path) -> Result<Option<DWORD>> {
    let code = unsafe { GetLastError() };
    if is_not_found(code) {
        return Ok(None);
    }
    if code == ERROR_SHARING_VIOLATION {
        return Ok(Some(0));
    }
    Err(io::Error::from_raw_os_error(code as i32))
        .with_context(|| format!("unable to query {}", path.display()))
}

fn tag_kind(tag: DWORD) -> Option<ReparseKind> {
    match tag {
        IO_REPARSE_TAG_SYMLINK => Some(ReparseKind::Symlink),
        IO_REPARSE_TAG_MOUNT_POINT => Some(ReparseKind::MountPoint),
        _ => None,
    }
}

/// Reads the reparse tag of the link itself (not its target).
fn reparse_kind(wide: &[u16]) -> Option<ReparseKind> {
    let link = HandleGuard(unsafe {
        CreateFileW(
            wide.as_ptr(),
            FILE_READ_EA,
            SHARE_ALL,
            ptr::null_mut(),
            OPEN_EXISTING,
            FILE_FLAG_BACKUP_SEMANTICS | FILE_FLAG_OPEN_REPARSE_POINT,
            ptr::null_mut(),
        )
    });
    if !link.is_valid() {
        return None;
    }

    let mut buf = vec![0u8; MAXIMUM_REPARSE_DATA_BUFFER_SIZE];
    let mut returned: DWORD = 0;
    let ok = unsafe {
        DeviceIoControl(
            link.0,
            FSCTL_GET_REPARSE_POINT,
            ptr::null_mut(),
            0,
            buf.as_mut_ptr().cast(),
            buf.len() as DWORD,
            &mut returned,
            ptr::null_mut(),
        )
    };
    if ok == 0 || (returned as usize) < mem::size_of::<DWORD>() {
        return None;
    }

    // ReparseTag is the first field of REPARSE_DATA_BUFFER.
    tag_kind(DWORD::from_ne_bytes([buf[0], buf[1], buf[2], buf[3]]))
}

/// Attributes of whatever `path` resolves to. `Ok(None)` if nothing does.
fn attributes(path: &Path) -> Result<Option<DWORD>> {
    let wide = to_wide(path.as_os_str());
    let attr = unsafe { GetFileAttributesW(wide.as_ptr()) };
    if attr == INVALID_FILE_ATTRIBUTES {
        return status_failure(path);
    }

    if attr & FILE_ATTRIBUTE_REPARSE_POINT != 0 {
        // GetFileAttributesW does not follow links; opening the entry does, and fails for a
        // dangling one.
        let target = HandleGuard(unsafe {
            CreateFileW(
                wide.as_ptr(),
                0,
                SHARE_ALL,
                ptr::null_mut(),
                OPEN_EXISTING,
                FILE_FLAG_BACKUP_SEMANTICS,
                ptr::null_mut(),
            )
        });
        if !target.is_valid() {
            return status_failure(path);
        }

        match reparse_kind(&wide) {
            Some(kind) => log::trace!("{} is a {:?} reparse point", path.display(), kind),
            None => log::trace!("{} has an unrecognised reparse tag", path.display()),
        }
    }

    Ok(Some(attr))
}

/// Appends the `*` wildcard, adding a separator unless `dir` already ends in one or in a
/// drive colon.
fn search_pattern(dir: &OsStr) -> OsString {
    let ends_with_separator = matches!(
        dir.encode_wide().last(),
        Some(c) if c == u16::from(b'\\') || c == u16::from(b'/') || c == u16::from(b':')
    );

    let mut pattern = dir.to_os_string();
    pattern.push(if ends_with_separator { "*" } else { "\\*" });
    pattern
}

impl FsBackend for WindowsFs {
    type Handle = FindHandle;

    fn exists(path: &Path) -> Result<bool> {
        Ok(attributes(path)?.is_some())
    }

    fn is_directory(path: &Path) -> Result<bool> {
        Ok(attributes(path)?.is_some_and(|attr| attr & FILE_ATTRIBUTE_DIRECTORY != 0))
    }

    fn create_directory(path: &Path) -> Result<()> {
        let wide = to_wide(path.as_os_str());
        if unsafe { CreateDirectoryW(wide.as_ptr(), ptr::null_mut()) } == 0 {
            return Err(io::Error::last_os_error())
                .with_context(|| format!("unable to create directory {}", path.display()));
        }
        Ok(())
    }

    /// `GetCurrentDirectoryW` reports the size it needs when the buffer is short; retry
    /// until the answer fits, in case the directory changes between calls.
    fn cwd() -> Result<PathBuf> {
        let mut size = CWD_INITIAL_BUFFER;
        loop {
            if size > CWD_BUFFER_LIMIT {
                return Err(anyhow!(
                    "current directory is longer than {} characters",
                    CWD_BUFFER_LIMIT
                ));
            }

            let mut buf = vec![0u16; size];
            let len = unsafe { GetCurrentDirectoryW(size as DWORD, buf.as_mut_ptr()) } as usize;
            if len == 0 {
                return Err(io::Error::last_os_error())
                    .context("unable to get the current directory");
            }
            if len < size {
                buf.truncate(len);
                return Ok(PathBuf::from(OsString::from_wide(&buf)));
            }
            size = len;
        }
    }

    fn open_directory(path: &Path) -> Result<FindHandle> {
        if path.as_os_str().is_empty() {
            return Err(anyhow!("unable to open directory: empty path"));
        }

        let pattern = to_wide(&search_pattern(path.as_os_str()));
        let mut data: WIN32_FIND_DATAW = unsafe { mem::zeroed() };
        let handle = unsafe { FindFirstFileW(pattern.as_ptr(), &mut data) };
        if handle == INVALID_HANDLE_VALUE {
            return Err(io::Error::last_os_error())
                .with_context(|| format!("unable to open directory {}", path.display()));
        }

        Ok(FindHandle {
            handle,
            pending: Some(from_wide(&data.cFileName)),
        })
    }

    fn read_entry(handle: &mut FindHandle) -> Result<Option<OsString>> {
        if let Some(name) = handle.pending.take() {
            return Ok(Some(name));
        }

        let mut data: WIN32_FIND_DATAW = unsafe { mem::zeroed() };
        if unsafe { FindNextFileW(handle.handle, &mut data) } == 0 {
            let code = unsafe { GetLastError() };
            if code == ERROR_NO_MORE_FILES {
                return Ok(None);
            }
            return Err(io::Error::from_raw_os_error(code as i32))
                .context("unable to read directory entry");
        }
        Ok(Some(from_wide(&data.cFileName)))
    }

    fn close(handle: FindHandle) -> Result<()> {
        if unsafe { FindClose(handle.handle) } == 0 {
            return Err(io::Error::last_os_error()).context("unable to close directory search");
        }
        Ok(())
    }
}
