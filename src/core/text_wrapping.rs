//! Word wrapping for exported transcripts.
//!
//! Widths are measured in terminal display cells, so wide CJK characters and
//! emoji count as two. Words longer than the line are broken at the width.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

#[derive(Debug, Clone, Copy)]
pub struct WrapConfig {
    /// Maximum width for text lines. Zero disables wrapping.
    pub width: usize,
}

impl WrapConfig {
    pub fn new(width: usize) -> Self {
        Self { width }
    }
}

pub struct TextWrapper;

impl TextWrapper {
    /// Wrap every line of `text`, keeping explicit newlines (and blank lines).
    pub fn wrap_lines(text: &str, config: &WrapConfig) -> Vec<String> {
        text.split('\n')
            .flat_map(|line| wrap_line(line.trim_end_matches('\r'), config.width))
            .collect()
    }
}

fn wrap_line(line: &str, width: usize) -> Vec<String> {
    if width == 0 || UnicodeWidthStr::width(line) <= width {
        return vec![line.to_string()];
    }

    let mut builder = LineBuilder::new(width);
    for segment in segments(line) {
        match segment {
            Segment::Spaces(spaces) => builder.push_spaces(spaces),
            Segment::Word(word) => builder.push_word(word),
        }
    }
    builder.finish()
}

enum Segment<'a> {
    Word(&'a str),
    Spaces(&'a str),
}

fn segments(line: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_space: Option<bool> = None;
    for (idx, ch) in line.char_indices() {
        let is_space = ch.is_whitespace();
        match in_space {
            Some(previous) if previous != is_space => {
                out.push(if previous {
                    Segment::Spaces(&line[start..idx])
                } else {
                    Segment::Word(&line[start..idx])
                });
                start = idx;
            }
            _ => {}
        }
        in_space = Some(is_space);
    }
    if let Some(previous) = in_space {
        let rest = &line[start..];
        out.push(if previous {
            Segment::Spaces(rest)
        } else {
            Segment::Word(rest)
        });
    }
    out
}

struct LineBuilder {
    width: usize,
    lines: Vec<String>,
    current: String,
    current_width: usize,
    pending_spaces: String,
}

impl LineBuilder {
    fn new(width: usize) -> Self {
        Self {
            width,
            lines: Vec::new(),
            current: String::new(),
            current_width: 0,
            pending_spaces: String::new(),
        }
    }

    fn push_spaces(&mut self, spaces: &str) {
        // Leading indentation on the first line is kept; spaces at a soft
        // break are dropped.
        if self.current.is_empty() && self.lines.is_empty() {
            self.pending_spaces.push_str(spaces);
        } else if !self.current.is_empty() {
            self.pending_spaces.push_str(spaces);
        }
    }

    fn push_word(&mut self, word: &str) {
        let word_width = UnicodeWidthStr::width(word);
        let spaces_width = UnicodeWidthStr::width(self.pending_spaces.as_str());

        if self.current_width + spaces_width + word_width <= self.width {
            self.current.push_str(&self.pending_spaces);
            self.current.push_str(word);
            self.current_width += spaces_width + word_width;
            self.pending_spaces.clear();
            return;
        }

        self.pending_spaces.clear();
        if !self.current.is_empty() {
            self.break_line();
        }

        if word_width <= self.width {
            self.current.push_str(word);
            self.current_width = word_width;
            return;
        }

        for ch in word.chars() {
            let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
            if self.current_width + ch_width > self.width && !self.current.is_empty() {
                self.break_line();
            }
            self.current.push(ch);
            self.current_width += ch_width;
        }
    }

    fn break_line(&mut self) {
        self.lines.push(std::mem::take(&mut self.current));
        self.current_width = 0;
    }

    fn finish(mut self) -> Vec<String> {
        if !self.current.is_empty() || self.lines.is_empty() {
            self.lines.push(self.current);
        }
        self.lines
    }
}
