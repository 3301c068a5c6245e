//! Human-readable diagnostic rendering.
//!
//! Produces the module name, 1-based line and column, the offending source
//! line, and a caret underline sized to the error span. ANSI color is
//! process-wide state configured once at startup; the library itself never
//! prints.

use std::{
    fmt::Write as _,
    sync::atomic::{AtomicBool, Ordering},
};

use crate::{error::CompileError, position::find_position};

static COLOR_ENABLED: AtomicBool = AtomicBool::new(false);

/// Enables or disables ANSI color for every subsequently rendered
/// diagnostic. Configured once by the driver at startup.
pub fn set_color_enabled(enabled: bool) {
    COLOR_ENABLED.store(enabled, Ordering::Relaxed);
}

#[must_use]
pub fn color_enabled() -> bool {
    COLOR_ENABLED.load(Ordering::Relaxed)
}

const RED: &str = "\x1b[31m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

fn paint(text: &str, style: &str) -> String {
    if color_enabled() {
        format!("{style}{text}{RESET}")
    } else {
        text.to_owned()
    }
}

/// Renders one diagnostic against its source.
#[must_use]
pub fn render(source: &[u8], module_name: &str, error: &CompileError) -> String {
    let position = find_position(source, error.span.offset);
    let line_text =
        String::from_utf8_lossy(&source[position.line_start as usize..position.line_end as usize]);

    let header = format!("error[{:02}]: {error}", error.kind.code());
    let location = format!("{module_name}:{}:{}", position.line, position.column);

    // The caret underline covers the error span, but never outruns the
    // offending line.
    let caret_offset = (position.column - 1) as usize;
    let line_len = (position.line_end - position.line_start) as usize;
    let remaining = line_len.saturating_sub(caret_offset);
    let caret_width = (error.span.length as usize).clamp(1, remaining.max(1));

    let gutter = format!("{:>4} | ", position.line);
    let padding = " ".repeat(gutter.len() - 2) + "| ";

    let mut out = String::new();
    let _ = writeln!(out, "{}", paint(&header, BOLD));
    let _ = writeln!(out, " --> {location}");
    let _ = writeln!(out, "{}", paint(&padding, DIM));
    let _ = writeln!(out, "{}{line_text}", paint(&gutter, DIM));
    let _ = writeln!(
        out,
        "{}{}{}",
        paint(&padding, DIM),
        " ".repeat(caret_offset),
        paint(&"^".repeat(caret_width), RED),
    );
    out
}
