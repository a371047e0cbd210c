//! Leveled stderr logging macros.
//!
//! Thread-safe printing with an env-configured level, in the spirit of a
//! kernel `printk`. The runtime logs through these rather than a logging
//! framework so that worker threads (which run with all signals blocked
//! and may be deep in a syscall path) never allocate or take framework
//! locks to report a problem.
//!
//! # Environment
//!
//! - `WEFT_LOG_LEVEL` - `off`/`error`/`warn`/`info`/`debug`/`trace` or `0`-`5`
//! - `WEFT_FLUSH_EPRINT` - flush stderr after every line (crash debugging)

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Log levels, lowest (most severe) first.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    fn from_env(s: &str) -> LogLevel {
        match s.to_lowercase().as_str() {
            "off" | "0" => LogLevel::Off,
            "error" | "1" => LogLevel::Error,
            "warn" | "2" => LogLevel::Warn,
            "info" | "3" => LogLevel::Info,
            "debug" | "4" => LogLevel::Debug,
            "trace" | "5" => LogLevel::Trace,
            _ => LogLevel::Info,
        }
    }

    pub fn prefix(self) -> &'static str {
        match self {
            LogLevel::Off => "",
            LogLevel::Error => "[ERROR]",
            LogLevel::Warn => "[WARN] ",
            LogLevel::Info => "[INFO] ",
            LogLevel::Debug => "[DEBUG]",
            LogLevel::Trace => "[TRACE]",
        }
    }
}

static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);
static FLUSH: AtomicBool = AtomicBool::new(false);
static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Read `WEFT_LOG_LEVEL` / `WEFT_FLUSH_EPRINT`. Runs once; later calls
/// are no-ops. Called lazily from the first log line.
pub fn init() {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }
    if let Ok(v) = std::env::var("WEFT_LOG_LEVEL") {
        LOG_LEVEL.store(LogLevel::from_env(&v) as u8, Ordering::Relaxed);
    }
    if let Ok(v) = std::env::var("WEFT_FLUSH_EPRINT") {
        let on = matches!(v.as_str(), "1" | "true" | "yes" | "on");
        FLUSH.store(on, Ordering::Relaxed);
    }
}

/// Set the level programmatically (overrides the env).
pub fn set_log_level(level: LogLevel) {
    init();
    LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

#[inline]
pub fn level_enabled(level: LogLevel) -> bool {
    if !INITIALIZED.load(Ordering::Relaxed) {
        init();
    }
    level as u8 <= LOG_LEVEL.load(Ordering::Relaxed)
}

#[doc(hidden)]
pub fn _wlog_impl(level: Option<LogLevel>, args: std::fmt::Arguments<'_>) {
    if let Some(level) = level {
        if !level_enabled(level) {
            return;
        }
    }
    let stderr = std::io::stderr();
    let mut handle = stderr.lock();
    if let Some(level) = level {
        let _ = write!(handle, "{} ", level.prefix());
    }
    let _ = handle.write_fmt(args);
    let _ = handle.write_all(b"\n");
    if FLUSH.load(Ordering::Relaxed) {
        let _ = handle.flush();
    }
}

/// Print a line to stderr unconditionally (locked, optionally flushed).
#[macro_export]
macro_rules! wprintln {
    () => {{
        $crate::wprint::_wlog_impl(None, format_args!(""));
    }};
    ($($arg:tt)*) => {{
        $crate::wprint::_wlog_impl(None, format_args!($($arg)*));
    }};
}

/// Error-level log line.
#[macro_export]
macro_rules! werror {
    ($($arg:tt)*) => {{
        $crate::wprint::_wlog_impl(Some($crate::wprint::LogLevel::Error), format_args!($($arg)*));
    }};
}

/// Warning-level log line.
#[macro_export]
macro_rules! wwarn {
    ($($arg:tt)*) => {{
        $crate::wprint::_wlog_impl(Some($crate::wprint::LogLevel::Warn), format_args!($($arg)*));
    }};
}

/// Info-level log line.
#[macro_export]
macro_rules! winfo {
    ($($arg:tt)*) => {{
        $crate::wprint::_wlog_impl(Some($crate::wprint::LogLevel::Info), format_args!($($arg)*));
    }};
}

/// Debug-level log line.
#[macro_export]
macro_rules! wdebug {
    ($($arg:tt)*) => {{
        $crate::wprint::_wlog_impl(Some($crate::wprint::LogLevel::Debug), format_args!($($arg)*));
    }};
}

/// Trace-level log line.
#[macro_export]
macro_rules! wtrace {
    ($($arg:tt)*) => {{
        $crate::wprint::_wlog_impl(Some($crate::wprint::LogLevel::Trace), format_args!($($arg)*));
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_order() {
        assert!(LogLevel::Error < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Trace);
    }

    #[test]
    fn parse() {
        assert_eq!(LogLevel::from_env("off"), LogLevel::Off);
        assert_eq!(LogLevel::from_env("ERROR"), LogLevel::Error);
        assert_eq!(LogLevel::from_env("5"), LogLevel::Trace);
        assert_eq!(LogLevel::from_env("garbage"), LogLevel::Info);
    }

    #[test]
    fn macros_compile() {
        set_log_level(LogLevel::Off);
        wprintln!("plain {}", 1);
        werror!("e");
        wwarn!("w");
        winfo!("i");
        wdebug!("d");
        wtrace!("t");
    }
}
