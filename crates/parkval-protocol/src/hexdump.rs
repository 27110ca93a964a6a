//! Hex dump of raw frames for debug logging.

use std::fmt::Write;

use tracing::debug;

/// Frames longer than this are truncated in the debug log.
pub const MAX_LOGGED_BYTES: usize = 256;

/// Render `data` as `offset   hex bytes   ascii` lines, 16 bytes per line.
///
/// ```
/// let dump = parkval_protocol::hexdump::format_hex_dump(b"AB\x00");
/// assert!(dump.starts_with("0000   41 42 00"));
/// assert!(dump.ends_with("AB."));
/// ```
pub fn format_hex_dump(data: &[u8]) -> String {
    let mut out = String::new();
    for (line, chunk) in data.chunks(16).enumerate() {
        if line > 0 {
            out.push('\n');
        }
        let hex = chunk
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(" ");
        let ascii: String = chunk
            .iter()
            .map(|&b| if (32..127).contains(&b) { char::from(b) } else { '.' })
            .collect();
        let _ = write!(out, "{:04x}   {hex:<47}  {ascii}", line * 16);
    }
    out
}

/// Log `data` at debug level under `title`, truncated to [`MAX_LOGGED_BYTES`].
pub fn log_frame(title: &str, data: &[u8]) {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }
    let (shown, note) = if data.len() > MAX_LOGGED_BYTES {
        (&data[..MAX_LOGGED_BYTES], format!(" (first {MAX_LOGGED_BYTES} bytes)"))
    } else {
        (data, String::new())
    };
    debug!(len = data.len(), "{title}{note}:\n{}", format_hex_dump(shown));
}
