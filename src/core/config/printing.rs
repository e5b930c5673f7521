use crate::core::config::data::{path_display, Config};

impl Config {
    pub fn print_all(&self) {
        println!("Current configuration:");
        println!("  api-base-url: {}", self.api_base_url());
        println!("  request-timeout: {}s", self.request_timeout().as_secs());
        match self.data_dir() {
            Some(dir) => println!("  data-dir: {}", path_display(dir)),
            None => println!("  data-dir: (unavailable)"),
        }
        match self.use_keyring() {
            true => println!("  keyring: on"),
            false => println!("  keyring: off"),
        }
        let layout = self.page_layout();
        println!(
            "  export-page: {} columns x {} lines",
            layout.columns, layout.lines_per_page
        );
        match self.user_label() {
            Some(name) => println!("  display-name: {name}"),
            None => println!("  display-name: (from profile)"),
        }
    }
}
