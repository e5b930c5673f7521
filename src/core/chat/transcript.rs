use std::fmt::Write as _;

use crate::core::message::{Artifact, Message};
use crate::core::text_wrapping::{TextWrapper, WrapConfig};

pub const ASSISTANT_LABEL: &str = "NOVA";
const PAGE_BREAK: char = '\u{0C}';

pub fn format_message(message: &Message, user_label: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{user_label}: {}", message.message);
    for attachment in message.attachments() {
        let _ = writeln!(
            out,
            "[attachment] {} ({}, {} bytes)",
            attachment.name, attachment.mime_type, attachment.size
        );
    }
    out.push('\n');
    let _ = write!(out, "{ASSISTANT_LABEL}: {}", message.response);

    for artifact in message.artifacts() {
        out.push_str("\n\n");
        match artifact {
            Artifact::Code {
                language,
                content,
                title,
            } => {
                if let Some(title) = title {
                    let _ = writeln!(out, "{title}");
                }
                let _ = write!(
                    out,
                    "```{}\n{}\n```",
                    language.as_deref().unwrap_or_default(),
                    content.trim_end_matches('\n')
                );
            }
            Artifact::Text { content, title } => {
                if let Some(title) = title {
                    let _ = writeln!(out, "## {title}");
                }
                out.push_str(content);
            }
            Artifact::File {
                name,
                url,
                mime_type,
            } => {
                let _ = write!(out, "[file] {name}");
                if let Some(mime_type) = mime_type {
                    let _ = write!(out, " ({mime_type})");
                }
                if let Some(url) = url {
                    let _ = write!(out, " <{url}>");
                }
            }
        }
    }
    out
}

/// All exchanges, separated by blank lines.
pub fn format_session(messages: &[Message], user_label: &str) -> String {
    messages
        .iter()
        .map(|message| format_message(message, user_label))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLayout {
    pub columns: usize,
    pub lines_per_page: usize,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            columns: 80,
            lines_per_page: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub number: usize,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub title: String,
    pub pages: Vec<Page>,
}

impl Document {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Plain text with a header per page and form feeds between pages.
    pub fn render_text(&self) -> String {
        let total = self.pages.len();
        let mut out = String::new();
        for (index, page) in self.pages.iter().enumerate() {
            if index > 0 {
                out.push(PAGE_BREAK);
            }
            let _ = writeln!(out, "{} (page {}/{})", self.title, page.number, total);
            out.push('\n');
            for line in &page.lines {
                out.push_str(line);
                out.push('\n');
            }
        }
        out
    }
}

/// Split `text` into pages whose lines fit `layout.columns` display cells.
///
/// The page header takes two of each page's lines.
pub fn paginate(title: &str, text: &str, layout: PageLayout) -> Document {
    let body_lines = layout.lines_per_page.saturating_sub(2).max(1);
    let lines = TextWrapper::wrap_lines(text, &WrapConfig::new(layout.columns));

    let pages = lines
        .chunks(body_lines)
        .enumerate()
        .map(|(index, chunk)| Page {
            number: index + 1,
            lines: chunk.to_vec(),
        })
        .collect();

    Document {
        title: title.to_string(),
        pages,
    }
}
