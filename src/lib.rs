//! Cross-platform filesystem primitives.
//! Gives one API over POSIX and Win32 for the few things most programs need from the host
//! filesystem before they start doing real work.
//!
//! ### Overview
//!
//! - **Queries**: `exists`, `is_directory` (symbolic links, junctions and mount points are
//!   resolved the same way on both platforms).
//! - **Creation**: `create_directory`, one level at a time.
//! - **Enumeration**: [`DirIter`], a single-level listing that never reports `.` or `..`.
//! - **Current directory**: `cwd`, absolute, any length.
//! - **Separators**: building, converting to and from `/`, and `basename`.
//!
//! **Key ideas**:
//! - **No surprises**: queries return plain answers; the `try_` variants tell "not found"
//!   apart from "could not check".
//! - **No hidden state**: the only global is the compile-time [`SEPARATOR`].
//! - **Owned handles**: every open directory belongs to exactly one iterator and is closed
//!   exactly once.
//!
//! ### Example
//!
//! ```no_run
//! use fs_prims::{DirIter, path};
//!
//! let root = path::cwd();
//! let scratch = path::separator(&root) + "scratch";
//! if !path::exists(&scratch) {
//!     path::create_directory(&scratch);
//! }
//! for entry in DirIter::new(&root) {
//!     println!("{}", path::basename(&entry.to_string_lossy()));
//! }
//! ```

mod core;
mod dir_iter;
pub mod path;
mod report;
mod sys;

pub use crate::core::Result;
pub use crate::core::utils::{SEPARATOR, SEPARATOR_STR};
pub use dir_iter::DirIter;
pub use path::{basename, create_directory, cwd, exists, is_directory, separator};
pub use report::{ErrorReport, ReportKind};
pub use sys::{CWD_BUFFER_LIMIT, CWD_INITIAL_BUFFER};
