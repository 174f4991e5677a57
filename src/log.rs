//! Minimal stderr logging for non-fatal conditions (skipped dangling
//! references, out-of-bounds ranges handled best-effort, etc): a coloured
//! prefix written straight to stderr via `termcolor`, no background logger
//! or structured logging.

use std::io::Write;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Prints `WARNING: <message>` to stderr in yellow.
pub fn warn(message: impl AsRef<str>) {
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    let _ = stderr.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)));
    let _ = write!(&mut stderr, "WARNING: ");
    let _ = stderr.reset();
    let _ = writeln!(&mut stderr, "{}", message.as_ref());
}
