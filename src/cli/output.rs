//! Output formatting utilities for CLI commands

use is_terminal::IsTerminal;
use std::io::{self, Write};

/// Wrap `text` in an ANSI colour when stderr is a terminal.
pub fn color(code: &str, text: &str) -> String {
    if io::stderr().is_terminal() {
        format!("\x1b[{}m{}\x1b[0m", code, text)
    } else {
        text.to_string()
    }
}

/// Format error message for display
pub fn format_error(details: &str) -> String {
    format!("{} {}", color("31", "error:"), details)
}

/// Write lines to stdout and flush.
pub fn write_lines<I, S>(lines: I) -> Result<(), String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for line in lines {
        writeln!(out, "{}", line.as_ref()).map_err(|e| format!("Failed to write to stdout: {}", e))?;
    }
    out.flush().map_err(|e| format!("Failed to flush stdout: {}", e))
}
