//! Colored terminal logging.
//!
//! All output goes to stderr so compiled markup on stdout stays clean.
//!
//! ```ignore
//! log!("resolve"; "fetched {}", path);
//! debug!("compile"; "pass {} rewrote {} usages", pass, count);
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

use owo_colors::{OwoColorize, Stream};

/// Global verbose flag (set by --verbose)
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Global quiet flag (set by --quiet); suppresses everything but errors
static QUIET: AtomicBool = AtomicBool::new(false);

pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

pub fn set_quiet(q: bool) {
    QUIET.store(q, Ordering::SeqCst);
}

pub fn is_quiet() -> bool {
    QUIET.load(Ordering::SeqCst)
}

/// Log a message with a colored module prefix
///
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Log a debug message (only shown when verbose is enabled)
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

/// Write `[module] message` to stderr
pub fn log(module: &str, message: &str) {
    let module_lower = module.to_ascii_lowercase();
    if is_quiet() && module_lower != "error" {
        return;
    }
    let prefix = colorize_prefix(module, &module_lower);
    let mut stderr = std::io::stderr().lock();
    writeln!(stderr, "{prefix} {message}").ok();
}

/// Warning line: `[sloth]` prefix and yellow message
pub fn warn(message: &str) {
    if is_quiet() {
        return;
    }
    let prefix = colorize_prefix("sloth", "sloth");
    let body = message.if_supports_color(Stream::Stderr, |m| m.yellow());
    let mut stderr = std::io::stderr().lock();
    writeln!(stderr, "{prefix} {body}").ok();
}

/// Error line: `[sloth]` prefix and red message. Never suppressed.
pub fn error(message: &str) {
    let prefix = colorize_prefix("sloth", "sloth");
    let body = message.if_supports_color(Stream::Stderr, |m| m.red());
    let mut stderr = std::io::stderr().lock();
    writeln!(stderr, "{prefix} {body}").ok();
}

fn colorize_prefix(module: &str, module_lower: &str) -> String {
    let prefix = format!("[{module}]");
    match module_lower {
        "error" => prefix
            .if_supports_color(Stream::Stderr, |p| p.bright_red())
            .to_string(),
        "reload" => prefix
            .if_supports_color(Stream::Stderr, |p| p.bright_green())
            .to_string(),
        "resolve" => prefix
            .if_supports_color(Stream::Stderr, |p| p.bright_blue())
            .to_string(),
        _ => prefix
            .if_supports_color(Stream::Stderr, |p| p.bright_magenta())
            .to_string(),
    }
}
