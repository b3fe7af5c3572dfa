//! Error descriptors for failures worth a diagnostic.
//!
//! Most failures in this crate are ordinary results (`false`, an empty string, an exhausted
//! iterator). The few that deserve attention, such as a directory handle the OS refuses to
//! release, are described by an [`ErrorReport`] and written to the `log` facade. The crate
//! never installs a logger; what happens to a report is up to the application.

use std::fmt;

/// Category of an [`ErrorReport`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReportKind {
    /// A failure reported by the surrounding system.
    Exception,
    /// A failure of this crate's own bookkeeping.
    Internal,
    /// A violated assertion.
    Assertion,
}

/// Source location plus message of a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    kind: ReportKind,
    file: &'static str,
    line: u32,
    message: String,
}

impl ErrorReport {
    /// Usually built through the [`report!`](crate::report!) macro, which fills in the
    /// location.
    pub fn new(file: &'static str, line: u32, message: impl Into<String>) -> Self {
        Self {
            kind: ReportKind::Exception,
            file,
            line,
            message: message.into(),
        }
    }

    pub fn internal(file: &'static str, line: u32, message: impl Into<String>) -> Self {
        Self {
            kind: ReportKind::Internal,
            ..Self::new(file, line, message)
        }
    }

    /// Builds the multi-line assertion banner.
    ///
    /// ```
    /// use fs_prims::ErrorReport;
    ///
    /// let report = ErrorReport::assertion("lib.rs", 7, "x > 0", "check", "x must be positive");
    /// assert!(report.message().contains("Assert expression : x > 0"));
    /// ```
    pub fn assertion(
        file: &'static str,
        line: u32,
        expr: &str,
        function: &str,
        message: &str,
    ) -> Self {
        let banner = format!(
            "ASSERTION\n{message}\nIn function       : {function}\nAssert expression : {expr}\n"
        );
        Self {
            kind: ReportKind::Assertion,
            ..Self::new(file, line, banner)
        }
    }

    pub fn kind(&self) -> ReportKind {
        self.kind
    }

    pub fn file(&self) -> &'static str {
        self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Hands the report to the log sink at `error` level.
    pub fn emit(&self) {
        log::error!("[{}:{}] EXCEPTION: {}", self.file, self.line, self.message);
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ErrorReport {}

/// Builds an [`ErrorReport`] at the call site, emits it and evaluates to it.
///
/// ```
/// let report = fs_prims::report!("unable to close {}", "/tmp");
/// assert_eq!(report.message(), "unable to close /tmp");
/// ```
#[macro_export]
macro_rules! report {
    ($($arg:tt)*) => {{
        let report = $crate::ErrorReport::new(file!(), line!(), format!($($arg)*));
        report.emit();
        report
    }};
}
