use crate::core::chat::transcript::PageLayout;
use crate::core::config::data::Config;
use directories::ProjectDirs;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";
pub const API_BASE_URL_ENV: &str = "NOVA_API_BASE_URL";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

impl Config {
    /// `NOVA_API_BASE_URL` wins over the file, which wins over the default.
    pub fn api_base_url(&self) -> String {
        self.api_base_url_with_env(std::env::var(API_BASE_URL_ENV).ok())
    }

    pub(crate) fn api_base_url_with_env(&self, env_value: Option<String>) -> String {
        env_value
            .filter(|value| !value.trim().is_empty())
            .or_else(|| self.api_base_url.clone())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
    }

    /// Zero is treated as unset; requests always carry a finite timeout.
    pub fn request_timeout(&self) -> Duration {
        let secs = self
            .request_timeout_secs
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        Duration::from_secs(secs)
    }

    pub fn data_dir(&self) -> Option<PathBuf> {
        self.data_dir.clone().or_else(|| {
            ProjectDirs::from("ai", "nova", "nova").map(|dirs| dirs.data_dir().to_path_buf())
        })
    }

    pub fn use_keyring(&self) -> bool {
        self.use_keyring.unwrap_or(false)
    }

    pub fn page_layout(&self) -> PageLayout {
        let defaults = PageLayout::default();
        PageLayout {
            columns: self
                .export_columns
                .filter(|columns| *columns > 0)
                .unwrap_or(defaults.columns),
            lines_per_page: self
                .export_lines_per_page
                .filter(|lines| *lines > 2)
                .unwrap_or(defaults.lines_per_page),
        }
    }

    pub fn user_label(&self) -> Option<&str> {
        self.user_display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}
