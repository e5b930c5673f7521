pub mod clipboard;
pub mod logging;
pub mod prompt;
#[cfg(test)]
pub mod test_utils;
pub mod url;
