//! Interactive prompts for the account commands.

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::fmt;
use std::io::{self, IsTerminal, Write};

#[derive(Debug, Clone)]
pub struct PromptError {
    message: String,
}

impl PromptError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for PromptError {}

impl From<io::Error> for PromptError {
    fn from(err: io::Error) -> Self {
        PromptError::new(err.to_string())
    }
}

/// Read one trimmed line from stdin.
pub fn prompt_line(label: &str) -> Result<String, PromptError> {
    print!("{label}");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SecretStep {
    Continue { redraw: bool },
    Submit,
    Cancel,
}

fn apply_secret_key(secret: &mut String, key: &KeyEvent) -> SecretStep {
    match key.code {
        KeyCode::Enter => SecretStep::Submit,
        KeyCode::Esc => SecretStep::Cancel,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => SecretStep::Cancel,
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            let redraw = !secret.is_empty();
            secret.clear();
            SecretStep::Continue { redraw }
        }
        KeyCode::Backspace => SecretStep::Continue {
            redraw: secret.pop().is_some(),
        },
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            secret.push(c);
            SecretStep::Continue { redraw: true }
        }
        _ => SecretStep::Continue { redraw: false },
    }
}

/// Read a password, echoing `*` per character when stdin is a terminal.
/// Piped input is read as a plain line.
pub fn prompt_secret(label: &str) -> Result<String, PromptError> {
    if !io::stdin().is_terminal() {
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        return Ok(input.trim_end_matches(['\r', '\n']).to_string());
    }

    enable_raw_mode()?;
    let result = read_secret_raw(label);
    let restore = disable_raw_mode();
    println!();
    let secret = result?;
    restore?;
    Ok(secret)
}

fn read_secret_raw(label: &str) -> Result<String, PromptError> {
    let mut secret = String::new();
    let mut stdout = io::stdout();
    write!(stdout, "{label}")?;
    stdout.flush()?;

    loop {
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match apply_secret_key(&mut secret, &key) {
            SecretStep::Submit => return Ok(secret),
            SecretStep::Cancel => return Err(PromptError::new("Cancelled by user")),
            SecretStep::Continue { redraw: false } => {}
            SecretStep::Continue { redraw: true } => {
                write!(
                    stdout,
                    "\r\x1b[K{label}{}",
                    "*".repeat(secret.chars().count())
                )?;
                stdout.flush()?;
            }
        }
    }
}
