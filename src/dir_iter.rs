//! Single-level directory enumeration.
//!
//! [`DirIter`] is a cursor over the entries of one directory. It opens the directory when it
//! is built, skips the `.` and `..` pseudo entries, and releases the directory handle as soon
//! as the listing is exhausted (or when dropped, whichever comes first).
//!
//! Two ways to drive it:
//!
//! ```no_run
//! use fs_prims::DirIter;
//!
//! // cursor style
//! let end = DirIter::end();
//! let mut it = DirIter::new("/tmp");
//! while it != end {
//!     println!("{}", it.path().unwrap().display());
//!     it.advance();
//! }
//!
//! // iterator style
//! for path in DirIter::new("/tmp") {
//!     println!("{}", path.display());
//! }
//! ```

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::iter::FusedIterator;
use std::path::{Path, PathBuf};

use crate::core::FsBackend;
use crate::core::utils;
use crate::sys::Host;

/// Backend-generic state machine behind [`DirIter`].
///
/// Invariants: `at_end` iff `handle` is `None`; `current` is empty when `at_end` and is
/// never `.` or `..`.
pub(crate) struct Cursor<B: FsBackend> {
    dir: PathBuf,
    current: OsString,
    handle: Option<B::Handle>,
    at_end: bool,
}

impl<B: FsBackend> Cursor<B> {
    pub(crate) fn open(dir: PathBuf) -> Self {
        let mut cursor = Self {
            dir,
            current: OsString::new(),
            handle: None,
            at_end: true,
        };
        match B::open_directory(&cursor.dir) {
            Ok(handle) => {
                cursor.handle = Some(handle);
                cursor.at_end = false;
                cursor.advance();
            }
            Err(err) => log::debug!("{err:#}"),
        }
        cursor
    }

    pub(crate) fn end() -> Self {
        Self {
            dir: PathBuf::new(),
            current: OsString::new(),
            handle: None,
            at_end: true,
        }
    }

    pub(crate) fn advance(&mut self) {
        let Some(handle) = self.handle.as_mut() else {
            return;
        };

        loop {
            match B::read_entry(handle) {
                Ok(Some(name)) if utils::is_dot_entry(&name) => continue,
                Ok(Some(name)) => {
                    log::trace!("{}: entry {:?}", self.dir.display(), name);
                    self.current = name;
                    return;
                }
                Ok(None) => break,
                Err(err) => {
                    log::debug!("{err:#}");
                    break;
                }
            }
        }
        self.close();
    }

    /// Releases the handle, if any, and moves to the exhausted state.
    pub(crate) fn close(&mut self) {
        self.at_end = true;
        self.current.clear();
        if let Some(handle) = self.handle.take()
            && let Err(err) = B::close(handle)
        {
            crate::report!("{}: {err:#}", self.dir.display());
        }
    }

    pub(crate) fn is_end(&self) -> bool {
        self.at_end
    }

    pub(crate) fn dir(&self) -> &Path {
        &self.dir
    }

    pub(crate) fn name(&self) -> Option<&OsStr> {
        if self.at_end {
            return None;
        }
        Some(&self.current)
    }

    pub(crate) fn path(&self) -> Option<PathBuf> {
        self.name().map(|name| utils::join_entry(&self.dir, name))
    }
}

impl<B: FsBackend> Drop for Cursor<B> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Forward-only, single-pass cursor over the entries of a directory.
///
/// ### Behaviour
/// - Construction never fails: a path that can't be opened (missing, not a directory, no
///   permission) gives an iterator that is already at its end. That case can't be told apart
///   from an empty directory; use [`crate::path::try_is_directory`] first if it matters.
/// - Entries come in the order the OS reports them. `.` and `..` are never reported.
/// - There is no rewind and no `Clone`: each iterator owns its own OS handle, so two
///   iterators over the same directory are independent.
///
/// ### Comparison
/// `a == b` holds only when both are at their end. A positioned iterator is unequal to every
/// iterator, itself included, which is why `PartialEq` is implemented but `Eq` is not. The
/// only meaningful comparison is against [`DirIter::end()`].
pub struct DirIter {
    cursor: Cursor<Host>,
}

impl DirIter {
    /// Opens `path` and moves to its first entry.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            cursor: Cursor::open(path.as_ref().to_path_buf()),
        }
    }

    /// The end sentinel. Owns no handle.
    pub fn end() -> Self {
        Self {
            cursor: Cursor::end(),
        }
    }

    /// Moves to the next entry. No-op once at the end.
    pub fn advance(&mut self) -> &mut Self {
        self.cursor.advance();
        self
    }

    /// Returns `dir + SEPARATOR + name` of the current entry, or `None` at the end.
    /// The directory part is kept exactly as given to [`DirIter::new`].
    pub fn path(&self) -> Option<PathBuf> {
        self.cursor.path()
    }

    /// Bare name of the current entry.
    pub fn name(&self) -> Option<&OsStr> {
        self.cursor.name()
    }

    /// Directory being listed, as given to [`DirIter::new`]. Empty for the end sentinel.
    pub fn dir(&self) -> &Path {
        self.cursor.dir()
    }

    pub fn is_end(&self) -> bool {
        self.cursor.is_end()
    }

    /// Releases the directory handle early. The iterator becomes equal to the end sentinel.
    pub fn close(&mut self) {
        self.cursor.close();
    }
}

impl Default for DirIter {
    fn default() -> Self {
        Self::end()
    }
}

impl PartialEq for DirIter {
    fn eq(&self, other: &Self) -> bool {
        self.is_end() && other.is_end()
    }
}

impl Iterator for DirIter {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        let path = self.path()?;
        self.advance();
        Some(path)
    }
}

impl FusedIterator for DirIter {}

impl fmt::Debug for DirIter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirIter")
            .field("dir", &self.cursor.dir)
            .field("current", &self.cursor.current)
            .field("at_end", &self.cursor.at_end)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeSet, VecDeque};
    use tempdir::TempDir;

    mod cursor {
        use super::*;
        use crate::core::Result;
        use anyhow::anyhow;
        use std::cell::{Cell, RefCell};

        thread_local! {
            static SCRIPT: RefCell<VecDeque<Step>> = const { RefCell::new(VecDeque::new()) };
            static OPENED: Cell<u32> = const { Cell::new(0) };
            static CLOSED: Cell<u32> = const { Cell::new(0) };
        }

        enum Step {
            Entry(&'static str),
            Fail,
        }

        /// Replays `SCRIPT`; paths starting with "missing" fail to open.
        struct ScriptedFs;

        struct ScriptedHandle;

        impl FsBackend for ScriptedFs {
            type Handle = ScriptedHandle;

            fn exists(_: &Path) -> Result<bool> {
                unreachable!()
            }

            fn is_directory(_: &Path) -> Result<bool> {
                unreachable!()
            }

            fn create_directory(_: &Path) -> Result<()> {
                unreachable!()
            }

            fn cwd() -> Result<PathBuf> {
                unreachable!()
            }

            fn open_directory(path: &Path) -> Result<ScriptedHandle> {
                if path.starts_with("missing") {
                    return Err(anyhow!("unable to open directory {}", path.display()));
                }
                OPENED.with(|c| c.set(c.get() + 1));
                Ok(ScriptedHandle)
            }

            fn read_entry(_: &mut ScriptedHandle) -> Result<Option<OsString>> {
                match SCRIPT.with(|s| s.borrow_mut().pop_front()) {
                    Some(Step::Entry(name)) => Ok(Some(OsString::from(name))),
                    Some(Step::Fail) => Err(anyhow!("unable to read directory entry")),
                    None => Ok(None),
                }
            }

            fn close(_: ScriptedHandle) -> Result<()> {
                CLOSED.with(|c| c.set(c.get() + 1));
                Ok(())
            }
        }

        fn script(steps: Vec<Step>) {
            SCRIPT.with(|s| *s.borrow_mut() = steps.into());
            OPENED.with(|c| c.set(0));
            CLOSED.with(|c| c.set(0));
        }

        fn closed() -> u32 {
            CLOSED.with(|c| c.get())
        }

        fn drain(cursor: &mut Cursor<ScriptedFs>) -> Vec<OsString> {
            let mut names = Vec::new();
            while let Some(name) = cursor.name() {
                names.push(name.to_os_string());
                cursor.advance();
            }
            names
        }

        #[test]
        fn test_dot_entries_are_skipped_anywhere() {
            script(vec![
                Step::Entry("."),
                Step::Entry("a"),
                Step::Entry(".."),
                Step::Entry("b"),
                Step::Entry("."),
            ]);
            let mut cursor = Cursor::<ScriptedFs>::open(PathBuf::from("dir"));
            assert_eq!(drain(&mut cursor), vec![OsString::from("a"), OsString::from("b")]);
            assert!(cursor.is_end());
        }

        #[test]
        fn test_only_dot_entries_is_empty() {
            script(vec![Step::Entry("."), Step::Entry("..")]);
            let cursor = Cursor::<ScriptedFs>::open(PathBuf::from("dir"));
            assert!(cursor.is_end());
            assert_eq!(cursor.name(), None);
            assert_eq!(closed(), 1);
        }

        #[test]
        fn test_handle_released_once_on_exhaustion() {
            script(vec![Step::Entry("a")]);
            let mut cursor = Cursor::<ScriptedFs>::open(PathBuf::from("dir"));
            assert_eq!(closed(), 0);

            cursor.advance();
            assert!(cursor.is_end());
            assert_eq!(closed(), 1);

            cursor.advance();
            cursor.close();
            drop(cursor);
            assert_eq!(closed(), 1);
        }

        #[test]
        fn test_handle_released_on_drop() {
            script(vec![Step::Entry("a"), Step::Entry("b")]);
            let cursor = Cursor::<ScriptedFs>::open(PathBuf::from("dir"));
            assert!(!cursor.is_end());
            drop(cursor);
            assert_eq!(closed(), 1);
        }

        #[test]
        fn test_open_failure_is_end() {
            script(vec![]);
            let cursor = Cursor::<ScriptedFs>::open(PathBuf::from("missing/dir"));
            assert!(cursor.is_end());
            assert_eq!(cursor.path(), None);
            assert_eq!(OPENED.with(|c| c.get()), 0);
            drop(cursor);
            assert_eq!(closed(), 0);
        }

        #[test]
        fn test_read_error_ends_listing() {
            script(vec![Step::Entry("a"), Step::Fail, Step::Entry("b")]);
            let mut cursor = Cursor::<ScriptedFs>::open(PathBuf::from("dir"));
            assert_eq!(drain(&mut cursor), vec![OsString::from("a")]);
            assert_eq!(closed(), 1);
        }

        #[test]
        fn test_end_sentinel_owns_nothing() {
            script(vec![]);
            let cursor = Cursor::<ScriptedFs>::end();
            assert!(cursor.is_end());
            assert_eq!(cursor.dir(), Path::new(""));
            drop(cursor);
            assert_eq!(closed(), 0);
        }

        #[test]
        fn test_path_joins_dir_and_name() {
            script(vec![Step::Entry("x")]);
            let cursor = Cursor::<ScriptedFs>::open(PathBuf::from("dir"));
            let expected = format!("dir{}x", utils::SEPARATOR);
            assert_eq!(cursor.path(), Some(PathBuf::from(expected)));
        }
    }

    mod listing {
        use super::*;

        #[test]
        fn test_lists_entries_without_dots() {
            let temp_dir = setup_test_env();
            std::fs::write(temp_dir.path().join("x"), b"").unwrap();
            std::fs::write(temp_dir.path().join("y"), b"").unwrap();

            let names: BTreeSet<_> = DirIter::new(temp_dir.path())
                .map(|p| p.file_name().unwrap().to_os_string())
                .collect();

            let expected: BTreeSet<_> = ["x", "y"].into_iter().map(OsString::from).collect();
            assert_eq!(names, expected);
        }

        #[test]
        fn test_cursor_protocol_reaches_end() {
            let temp_dir = setup_test_env();
            std::fs::write(temp_dir.path().join("x"), b"").unwrap();
            std::fs::write(temp_dir.path().join("y"), b"").unwrap();

            let end = DirIter::end();
            let mut it = DirIter::new(temp_dir.path());
            let mut seen = 0;
            while it != end {
                let path = it.path().unwrap();
                assert!(path.starts_with(temp_dir.path()));
                seen += 1;
                it.advance();
            }
            assert_eq!(seen, 2);
            assert!(it == end);
            assert!(it == DirIter::default());
        }

        #[test]
        fn test_path_is_dir_plus_separator_plus_name() {
            let temp_dir = setup_test_env();
            std::fs::write(temp_dir.path().join("only"), b"").unwrap();

            let it = DirIter::new(temp_dir.path());
            let mut expected = temp_dir.path().as_os_str().to_os_string();
            expected.push(utils::SEPARATOR_STR);
            expected.push("only");

            assert_eq!(it.path().unwrap().as_os_str(), expected);
            assert_eq!(it.name(), Some(OsStr::new("only")));
            assert_eq!(it.dir(), temp_dir.path());
        }

        #[test]
        fn test_subdirectories_are_not_descended() {
            let temp_dir = setup_test_env();
            std::fs::create_dir_all(temp_dir.path().join("sub/deeper")).unwrap();
            std::fs::write(temp_dir.path().join(".hidden"), b"").unwrap();

            let mut names: Vec<_> = DirIter::new(temp_dir.path())
                .map(|p| p.file_name().unwrap().to_os_string())
                .collect();
            names.sort();

            assert_eq!(names, vec![OsString::from(".hidden"), OsString::from("sub")]);
        }

        #[test]
        fn test_unicode_names() {
            let temp_dir = setup_test_env();
            std::fs::write(temp_dir.path().join("файл.txt"), b"").unwrap();

            let names: Vec<_> = DirIter::new(temp_dir.path())
                .map(|p| p.file_name().unwrap().to_os_string())
                .collect();
            assert_eq!(names, vec![OsString::from("файл.txt")]);
        }

        #[test]
        fn test_fused_after_end() {
            let temp_dir = setup_test_env();
            std::fs::write(temp_dir.path().join("x"), b"").unwrap();

            let mut it = DirIter::new(temp_dir.path());
            assert!(it.next().is_some());
            assert!(it.next().is_none());
            assert!(it.next().is_none());
            it.advance();
            assert!(it.is_end());
        }
    }

    mod failures {
        use super::*;

        #[test]
        fn test_missing_directory_is_end() {
            let temp_dir = setup_test_env();
            let it = DirIter::new(temp_dir.path().join("missing"));
            assert!(it == DirIter::end());
            assert_eq!(it.count(), 0);
        }

        #[test]
        fn test_file_is_end() {
            let temp_dir = setup_test_env();
            let file = temp_dir.path().join("file.txt");
            std::fs::write(&file, b"content").unwrap();

            assert!(DirIter::new(&file).is_end());
        }

        #[test]
        fn test_empty_path_is_end() {
            assert!(DirIter::new("").is_end());
        }

        #[test]
        fn test_empty_directory_is_end() {
            let temp_dir = setup_test_env();
            assert!(DirIter::new(temp_dir.path()) == DirIter::end());
        }
    }

    mod comparison {
        use super::*;

        #[test]
        #[allow(clippy::eq_op)]
        fn test_positioned_never_equal() {
            let temp_dir = setup_test_env();
            std::fs::write(temp_dir.path().join("x"), b"").unwrap();

            let a = DirIter::new(temp_dir.path());
            let b = DirIter::new(temp_dir.path());
            assert!(a != b);
            assert!(a != DirIter::end());
            assert!(a != a);
        }

        #[test]
        fn test_close_makes_end() {
            let temp_dir = setup_test_env();
            std::fs::write(temp_dir.path().join("x"), b"").unwrap();

            let mut it = DirIter::new(temp_dir.path());
            assert!(!it.is_end());
            it.close();
            assert!(it == DirIter::end());
            assert_eq!(it.path(), None);
            it.close();
        }

        #[test]
        fn test_independent_iterators() {
            let temp_dir = setup_test_env();
            std::fs::write(temp_dir.path().join("x"), b"").unwrap();
            std::fs::write(temp_dir.path().join("y"), b"").unwrap();

            let mut first = DirIter::new(temp_dir.path());
            let second = DirIter::new(temp_dir.path());
            first.advance();
            first.advance();
            assert!(first.is_end());
            assert_eq!(second.count(), 2);
        }

        #[test]
        fn test_iterator_can_move_between_threads() {
            let temp_dir = setup_test_env();
            std::fs::write(temp_dir.path().join("x"), b"").unwrap();

            let it = DirIter::new(temp_dir.path());
            let count = std::thread::spawn(move || it.count()).join().unwrap();
            assert_eq!(count, 1);
        }
    }

    // Helper function: Creates a temporary directory for tests
    fn setup_test_env() -> TempDir {
        TempDir::new("diriter_test").unwrap()
    }
}
