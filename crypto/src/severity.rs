/// The severity taxonomy used by every status line the core emits, matching
/// the `<FATAL|CRITICAL|ERROR|WARNING|INFO|DEBUG>` convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Fatal,
    Critical,
    Error,
    Warning,
    Info,
    Debug,
}

impl Severity {
    /// FATAL and CRITICAL both land on `log::Level::Error`; they're
    /// distinguished by the tag, not the underlying log level, since `log`
    /// has no level above Error.
    pub fn as_log_level(self) -> log::Level {
        match self {
            Severity::Fatal | Severity::Critical | Severity::Error => log::Level::Error,
            Severity::Warning => log::Level::Warn,
            Severity::Info => log::Level::Info,
            Severity::Debug => log::Level::Debug,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Severity::Fatal => "FATAL",
            Severity::Critical => "CRITICAL",
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
            Severity::Info => "INFO",
            Severity::Debug => "DEBUG",
        }
    }
}

/// Emits a severity-tagged line through the `log` facade. In debug builds
/// the module path and line are appended, matching the original's
/// `FILE_LINE_DEBUG` macro which is compiled in only for debug builds.
#[macro_export]
macro_rules! log_severity {
    ($sev:expr, $($arg:tt)+) => {{
        let sev: $crate::Severity = $sev;
        if cfg!(debug_assertions) {
            log::log!(sev.as_log_level(), "<{}> {} (file: \"{}\", line: {})",
                sev.tag(), format_args!($($arg)+), file!(), line!());
        } else {
            log::log!(sev.as_log_level(), "<{}> {}", sev.tag(), format_args!($($arg)+));
        }
    }};
}
