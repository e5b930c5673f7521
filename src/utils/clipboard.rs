use std::error::Error as StdError;
use std::fmt;
use std::io::Write;
use std::process::{Command, Stdio};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardError {
    /// No clipboard helper is installed or reachable.
    Unavailable(String),
    /// A helper ran but refused the copy.
    Rejected(String),
}

impl fmt::Display for ClipboardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClipboardError::Unavailable(reason) => write!(f, "Clipboard unavailable: {reason}"),
            ClipboardError::Rejected(reason) => write!(f, "Clipboard copy rejected: {reason}"),
        }
    }
}

impl StdError for ClipboardError {}

pub trait Clipboard: Send + Sync {
    fn copy(&self, text: &str) -> Result<(), ClipboardError>;
}

/// Copies through the platform's clipboard command.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn copy(&self, text: &str) -> Result<(), ClipboardError> {
        copy_to_clipboard(text)
    }
}

pub fn copy_to_clipboard(text: &str) -> Result<(), ClipboardError> {
    #[cfg(target_os = "macos")]
    {
        return run_with_stdin("pbcopy", &[], text);
    }
    #[cfg(target_os = "windows")]
    {
        return run_with_stdin("cmd", &["/C", "clip"], text);
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        let mut last_rejection = None;
        for (cmd, args) in [
            ("wl-copy", &[][..]),
            ("xclip", &["-selection", "clipboard"][..]),
            ("xsel", &["--clipboard", "--input"][..]),
        ] {
            match run_with_stdin(cmd, args, text) {
                Ok(()) => return Ok(()),
                Err(err @ ClipboardError::Rejected(_)) => last_rejection = Some(err),
                Err(ClipboardError::Unavailable(_)) => {}
            }
        }
        Err(last_rejection.unwrap_or_else(|| {
            ClipboardError::Unavailable(
                "no clipboard command found (install wl-copy, xclip, or xsel)".to_string(),
            )
        }))
    }
}

fn run_with_stdin(cmd: &str, args: &[&str], input: &str) -> Result<(), ClipboardError> {
    let mut child = Command::new(cmd)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|_| ClipboardError::Unavailable(format!("`{cmd}` not available")))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(input.as_bytes())
            .map_err(|err| ClipboardError::Rejected(format!("`{cmd}`: {err}")))?;
    }
    match child.wait() {
        Ok(status) if status.success() => Ok(()),
        Ok(status) => Err(ClipboardError::Rejected(format!(
            "`{cmd}` exited with {status}"
        ))),
        Err(err) => Err(ClipboardError::Rejected(format!("`{cmd}`: {err}"))),
    }
}
