//! Subprocess helpers shared by the yt-dlp and streamlink wrappers.

use std::ffi::OsStr;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Create a `tokio::process::Command` that does not flash a console
/// window on Windows. A no-op elsewhere.
pub fn command(program: impl AsRef<OsStr>) -> tokio::process::Command {
    #[allow(unused_mut)]
    let mut cmd = tokio::process::Command::new(program);
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        cmd.as_std_mut().creation_flags(CREATE_NO_WINDOW);
    }
    cmd
}

/// Last `max_lines` lines of captured tool output, trimmed, for
/// log-sized diagnostics.
pub fn output_tail(raw: &[u8], max_lines: usize) -> String {
    let text = String::from_utf8_lossy(raw);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n").trim().to_string()
}
