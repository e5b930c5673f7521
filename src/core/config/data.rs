use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// On-disk settings. Every field is optional; the resolved value with its
/// default comes from the accessors in `defaults`.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    /// Backend root, e.g. "http://localhost:8000/api"
    pub api_base_url: Option<String>,
    /// Upper bound for a single backend request, in seconds
    pub request_timeout_secs: Option<u64>,
    /// Where conversations (and credentials, unless the keyring is used) live
    pub data_dir: Option<PathBuf>,
    /// Keep the credential pair in the system keyring instead of `data_dir`
    pub use_keyring: Option<bool>,
    pub export_columns: Option<usize>,
    pub export_lines_per_page: Option<usize>,
    /// Label for your side of shared and exported transcripts
    pub user_display_name: Option<String>,
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
///
/// # Examples
/// - Unix: `/home/user/.local/share/nova` → `~/.local/share/nova`
/// - Windows: `C:\\Users\\user\\AppData\\Roaming\\nova` → `C:\\Users\\user\\AppData\\Roaming\\nova`
/// - macOS: `/Users/user/Library/Application Support/...` → `~/Library/Application Support/...`
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
