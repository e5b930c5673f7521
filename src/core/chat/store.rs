use std::sync::Arc;

use chrono::Utc;
use unicode_segmentation::UnicodeSegmentation;

use crate::core::message::{ChatSession, Message};
use crate::core::storage::{read_json, write_json, KeyValueStore, StorageError};

pub const SESSIONS_KEY: &str = "chat_sessions";
pub const PREVIEW_LIMIT: usize = 50;
pub const ELLIPSIS: &str = "...";

pub fn messages_key(session_id: &str) -> String {
    format!("chat_messages_{session_id}")
}

/// Cut `text` to [`PREVIEW_LIMIT`] grapheme clusters, marking the cut.
pub fn truncate_preview(text: &str) -> String {
    let mut graphemes = text.graphemes(true);
    let head: String = graphemes.by_ref().take(PREVIEW_LIMIT).collect();
    if graphemes.next().is_some() {
        format!("{head}{ELLIPSIS}")
    } else {
        head
    }
}

/// Conversation summaries plus the full history of the active conversation.
///
/// Summaries live under one key and each conversation's messages under their
/// own, so opening a conversation reads exactly one message list.
pub struct ChatSessionStore {
    backend: Arc<dyn KeyValueStore>,
    sessions: Vec<ChatSession>,
    active: Option<String>,
    messages: Vec<Message>,
}

impl ChatSessionStore {
    pub fn open(backend: Arc<dyn KeyValueStore>) -> Self {
        let sessions = match read_json::<Vec<ChatSession>>(backend.as_ref(), SESSIONS_KEY) {
            Ok(sessions) => sessions.unwrap_or_default(),
            Err(err) => {
                tracing::warn!(error = %err, "Discarding unreadable session list");
                Vec::new()
            }
        };
        Self {
            backend,
            sessions,
            active: None,
            messages: Vec::new(),
        }
    }

    /// Newest first.
    pub fn list_sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    pub fn session(&self, id: &str) -> Option<&ChatSession> {
        self.sessions.iter().find(|session| session.id == id)
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn active_session(&self) -> Option<&ChatSession> {
        self.active.as_deref().and_then(|id| self.session(id))
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn message(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|message| message.id == id)
    }

    fn persist_sessions(&self, sessions: &[ChatSession]) -> Result<(), StorageError> {
        write_json(self.backend.as_ref(), SESSIONS_KEY, sessions)
    }

    fn persist_messages(&self, session_id: &str, messages: &[Message]) -> Result<(), StorageError> {
        write_json(self.backend.as_ref(), &messages_key(session_id), messages)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.sessions.iter().position(|session| session.id == id)
    }

    /// Insert a fresh "New Chat" at the front and make it active.
    pub fn create_session(&mut self) -> Result<ChatSession, StorageError> {
        let session = ChatSession::new(Utc::now());
        let mut sessions = Vec::with_capacity(self.sessions.len() + 1);
        sessions.push(session.clone());
        sessions.extend(self.sessions.iter().cloned());
        self.persist_sessions(&sessions)?;

        tracing::debug!(session_id = %session.id, "Created chat session");
        self.sessions = sessions;
        self.active = Some(session.id.clone());
        self.messages.clear();
        Ok(session)
    }

    /// Returns the active session id, creating a session when none is active.
    pub fn ensure_active(&mut self) -> Result<String, StorageError> {
        match self.active.clone() {
            Some(id) => Ok(id),
            None => self.create_session().map(|session| session.id),
        }
    }

    /// Activate `id` and load its history. Unknown ids leave nothing active.
    pub fn load_session(&mut self, id: &str) -> bool {
        if self.position(id).is_none() {
            self.active = None;
            self.messages.clear();
            return false;
        }

        self.messages = match read_json::<Vec<Message>>(self.backend.as_ref(), &messages_key(id))
        {
            Ok(messages) => messages.unwrap_or_default(),
            Err(err) => {
                tracing::warn!(session_id = id, error = %err, "Discarding unreadable message list");
                Vec::new()
            }
        };
        self.active = Some(id.to_string());
        true
    }

    /// Store a truncated preview and move the session to the front.
    pub fn update_preview(&mut self, id: &str, text: &str) -> Result<bool, StorageError> {
        let Some(index) = self.position(id) else {
            return Ok(false);
        };
        let mut sessions = self.sessions.clone();
        let mut session = sessions.remove(index);
        session.preview = truncate_preview(text);
        session.updated_at = Utc::now();
        sessions.insert(0, session);
        self.persist_sessions(&sessions)?;
        self.sessions = sessions;
        Ok(true)
    }

    /// Title a still-untitled session after its first message.
    pub fn set_title_if_placeholder(&mut self, id: &str, text: &str) -> Result<bool, StorageError> {
        let Some(index) = self.position(id) else {
            return Ok(false);
        };
        let title = truncate_preview(text.trim());
        if !self.sessions[index].has_placeholder_title() || title.is_empty() {
            return Ok(false);
        }
        self.rename_session(id, &title)
    }

    pub fn rename_session(&mut self, id: &str, title: &str) -> Result<bool, StorageError> {
        let Some(index) = self.position(id) else {
            return Ok(false);
        };
        let mut sessions = self.sessions.clone();
        sessions[index].title = title.to_string();
        self.persist_sessions(&sessions)?;
        self.sessions = sessions;
        Ok(true)
    }

    /// Append to the active session's history.
    pub fn append_message(&mut self, message: Message) -> Result<bool, StorageError> {
        let Some(id) = self.active.clone() else {
            return Ok(false);
        };
        let mut messages = self.messages.clone();
        messages.push(message);
        self.persist_messages(&id, &messages)?;
        self.messages = messages;
        Ok(true)
    }

    /// Overwrite the active-session message sharing `message.id`.
    pub fn replace_message(&mut self, message: Message) -> Result<bool, StorageError> {
        let Some(id) = self.active.clone() else {
            return Ok(false);
        };
        let Some(index) = self.messages.iter().position(|m| m.id == message.id) else {
            return Ok(false);
        };
        let mut messages = self.messages.clone();
        messages[index] = message;
        self.persist_messages(&id, &messages)?;
        self.messages = messages;
        Ok(true)
    }

    /// Empty the active history and reset its preview. The summary stays.
    pub fn clear_active(&mut self) -> Result<bool, StorageError> {
        let Some(id) = self.active.clone() else {
            return Ok(false);
        };
        self.persist_messages(&id, &[])?;
        self.messages.clear();

        if let Some(index) = self.position(&id) {
            let mut sessions = self.sessions.clone();
            sessions[index].preview = String::new();
            self.persist_sessions(&sessions)?;
            self.sessions = sessions;
        }
        Ok(true)
    }

    /// Remove a session and its history for good.
    pub fn delete_session(&mut self, id: &str) -> Result<bool, StorageError> {
        let Some(index) = self.position(id) else {
            return Ok(false);
        };
        self.backend.delete(&messages_key(id))?;
        let mut sessions = self.sessions.clone();
        sessions.remove(index);
        self.persist_sessions(&sessions)?;
        self.sessions = sessions;

        if self.active.as_deref() == Some(id) {
            self.active = None;
            self.messages.clear();
        }
        Ok(true)
    }
}
