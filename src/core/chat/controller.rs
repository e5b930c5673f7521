use std::error::Error as StdError;
use std::fmt;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;

use crate::api::{ApiError, ChatBackend, ChatReply};
use crate::core::chat::store::ChatSessionStore;
use crate::core::chat::transcript::{
    format_message, format_session, paginate, Document, PageLayout,
};
use crate::core::ids::new_id;
use crate::core::message::{AttachmentMeta, ChatSession, Message, PendingFile};
use crate::core::storage::StorageError;
use crate::utils::clipboard::{Clipboard, ClipboardError};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_USER_LABEL: &str = "You";

#[derive(Debug)]
pub enum SendError {
    /// Neither text nor files were supplied.
    EmptyMessage,
    /// Another send or regenerate is still in flight.
    Busy,
    UnknownMessage(String),
    Network(String),
    Server { status: u16, message: String },
    Unauthorized,
    InvalidAttachment(String),
    Timeout,
    /// The caller navigated away before the response arrived.
    Cancelled,
    Storage(StorageError),
}

impl From<ApiError> for SendError {
    fn from(err: ApiError) -> Self {
        if err.is_unauthorized() {
            return SendError::Unauthorized;
        }
        match err {
            ApiError::Timeout => SendError::Timeout,
            ApiError::Status { status, .. } => SendError::Server {
                status,
                message: err
                    .body_message(&["error"])
                    .unwrap_or_else(|| "The server could not process the message".to_string()),
            },
            ApiError::InvalidUpload { .. } => SendError::InvalidAttachment(err.to_string()),
            ApiError::Transport(_) | ApiError::Decode(_) => SendError::Network(err.to_string()),
        }
    }
}

impl From<StorageError> for SendError {
    fn from(err: StorageError) -> Self {
        SendError::Storage(err)
    }
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::EmptyMessage => write!(f, "Type a message or attach a file first"),
            SendError::Busy => write!(f, "Still waiting for the previous response"),
            SendError::UnknownMessage(id) => write!(f, "No message with id '{id}'"),
            SendError::Network(reason) => write!(f, "{reason}"),
            SendError::Server { status, message } => write!(f, "{message} ({status})"),
            SendError::Unauthorized => write!(f, "Your session has expired; please log in again"),
            SendError::InvalidAttachment(reason) => write!(f, "{reason}"),
            SendError::Timeout => write!(f, "The server took too long to respond"),
            SendError::Cancelled => write!(f, "The request was abandoned"),
            SendError::Storage(err) => write!(f, "Could not save the conversation: {err}"),
        }
    }
}

impl StdError for SendError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            SendError::Storage(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum ExportError {
    AlreadyExists(PathBuf),
    Io(std::io::Error),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::AlreadyExists(path) => write!(
                f,
                "File '{}' already exists. Choose a different name or overwrite it.",
                path.display()
            ),
            ExportError::Io(err) => write!(f, "Export failed: {err}"),
        }
    }
}

impl StdError for ExportError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ExportError::Io(err) => Some(err),
            ExportError::AlreadyExists(_) => None,
        }
    }
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        ExportError::Io(err)
    }
}

/// Text and files waiting to be sent.
#[derive(Debug, Default)]
struct Compose {
    text: String,
    files: Vec<PendingFile>,
}

/// Releases the busy flag when the in-flight operation ends, however it ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives sends, regenerations and transcript actions for the active session.
///
/// Locks are never held across an await, so the controller can be shared by
/// reference between concurrently polled futures. Mutating network
/// operations are serialized by a busy flag: a second one started while the
/// first is in flight fails with [`SendError::Busy`].
pub struct ChatController {
    store: Mutex<ChatSessionStore>,
    backend: Arc<dyn ChatBackend>,
    clipboard: Arc<dyn Clipboard>,
    compose: Mutex<Compose>,
    busy: AtomicBool,
    cancel: Mutex<CancellationToken>,
    timeout: Duration,
    layout: PageLayout,
    user_label: String,
}

impl ChatController {
    pub fn new(
        store: ChatSessionStore,
        backend: Arc<dyn ChatBackend>,
        clipboard: Arc<dyn Clipboard>,
    ) -> Self {
        Self {
            store: Mutex::new(store),
            backend,
            clipboard,
            compose: Mutex::new(Compose::default()),
            busy: AtomicBool::new(false),
            cancel: Mutex::new(CancellationToken::new()),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            layout: PageLayout::default(),
            user_label: DEFAULT_USER_LABEL.to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_page_layout(mut self, layout: PageLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_user_label(mut self, label: impl Into<String>) -> Self {
        self.user_label = label.into();
        self
    }

    fn store(&self) -> MutexGuard<'_, ChatSessionStore> {
        self.store
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn compose(&self) -> MutexGuard<'_, Compose> {
        self.compose
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn cancel_token(&self) -> CancellationToken {
        self.cancel
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn acquire(&self) -> Result<BusyGuard<'_>, SendError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| BusyGuard(&self.busy))
            .map_err(|_| SendError::Busy)
    }

    pub fn user_label(&self) -> &str {
        &self.user_label
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn list_sessions(&self) -> Vec<ChatSession> {
        self.store().list_sessions().to_vec()
    }

    pub fn active_session(&self) -> Option<ChatSession> {
        self.store().active_session().cloned()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.store().messages().to_vec()
    }

    pub fn new_session(&self) -> Result<ChatSession, StorageError> {
        self.store().create_session()
    }

    pub fn load_session(&self, id: &str) -> bool {
        self.store().load_session(id)
    }

    pub fn rename_session(&self, id: &str, title: &str) -> Result<bool, StorageError> {
        self.store().rename_session(id, title)
    }

    /// Rejected while a send or regenerate is in flight.
    pub fn clear_active(&self) -> Result<bool, SendError> {
        let _guard = self.acquire()?;
        Ok(self.store().clear_active()?)
    }

    pub fn delete_session(&self, id: &str) -> Result<bool, SendError> {
        let _guard = self.acquire()?;
        Ok(self.store().delete_session(id)?)
    }

    /// Abandon any in-flight request; its response will be discarded.
    pub fn detach(&self) {
        let mut cancel = self
            .cancel
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        cancel.cancel();
        *cancel = CancellationToken::new();
    }

    pub fn set_input(&self, text: impl Into<String>) {
        self.compose().text = text.into();
    }

    pub fn input(&self) -> String {
        self.compose().text.clone()
    }

    pub fn stage_file(&self, file: PendingFile) {
        self.compose().files.push(file);
    }

    pub fn stage_path(&self, path: &Path) -> std::io::Result<AttachmentMeta> {
        let file = PendingFile::from_path(path)?;
        let meta = file.metadata();
        self.stage_file(file);
        Ok(meta)
    }

    pub fn unstage_file(&self, index: usize) -> Option<PendingFile> {
        let mut compose = self.compose();
        (index < compose.files.len()).then(|| compose.files.remove(index))
    }

    pub fn staged_files(&self) -> Vec<AttachmentMeta> {
        self.compose()
            .files
            .iter()
            .map(PendingFile::metadata)
            .collect()
    }

    /// Send whatever is currently staged.
    pub async fn send_pending(&self) -> Result<Message, SendError> {
        let (text, files) = {
            let compose = self.compose();
            (compose.text.clone(), compose.files.clone())
        };
        self.send_message(&text, files).await
    }

    async fn dispatch(
        &self,
        token: &CancellationToken,
        text: &str,
        files: &[PendingFile],
    ) -> Result<ChatReply, SendError> {
        tokio::select! {
            _ = token.cancelled() => Err(SendError::Cancelled),
            result = tokio::time::timeout(self.timeout, self.backend.send_chat(text, files)) => {
                match result {
                    Err(_) => Err(SendError::Timeout),
                    Ok(Ok(reply)) => Ok(reply),
                    Ok(Err(err)) => Err(SendError::from(err)),
                }
            }
        }
    }

    /// `issued_for` is the session that was active when the request left,
    /// `None` when nothing was active.
    fn ensure_current(
        &self,
        store: &ChatSessionStore,
        token: &CancellationToken,
        issued_for: Option<&str>,
    ) -> Result<(), SendError> {
        if token.is_cancelled() || store.active_id() != issued_for {
            tracing::debug!(session_id = ?issued_for, "Discarding response for abandoned session");
            return Err(SendError::Cancelled);
        }
        Ok(())
    }

    /// Send `text` and `files`, recording the exchange only once a response
    /// has arrived. A session is created for it then if none is active. On
    /// any failure the store is left exactly as it was.
    pub async fn send_message(
        &self,
        text: &str,
        files: Vec<PendingFile>,
    ) -> Result<Message, SendError> {
        if text.trim().is_empty() && files.is_empty() {
            return Err(SendError::EmptyMessage);
        }
        let _guard = self.acquire()?;
        let issued_for = self.store().active_id().map(str::to_string);
        let token = self.cancel_token();

        tracing::debug!(session_id = ?issued_for, files = files.len(), "Sending chat message");
        let reply = self.dispatch(&token, text, &files).await?;

        let attachments: Vec<AttachmentMeta> = files.iter().map(PendingFile::metadata).collect();
        let message = Message {
            id: new_id(),
            message: text.to_string(),
            response: reply.response,
            timestamp: Utc::now(),
            artifacts: reply.artifacts.filter(|artifacts| !artifacts.is_empty()),
            attachments: (!attachments.is_empty()).then_some(attachments),
        };

        {
            let mut store = self.store();
            self.ensure_current(&store, &token, issued_for.as_deref())?;
            let session_id = store.ensure_active()?;
            store.append_message(message.clone())?;

            let preview_source = preview_text(&message);
            if let Err(err) = store
                .update_preview(&session_id, &preview_source)
                .and_then(|_| store.set_title_if_placeholder(&session_id, &preview_source))
            {
                tracing::warn!(session_id = %session_id, error = %err, "Failed to update session summary");
            }
        }

        let mut compose = self.compose();
        compose.text.clear();
        compose.files.clear();
        Ok(message)
    }

    /// Ask again for the response to an existing message, replacing it in place.
    pub async fn regenerate_response(&self, message_id: &str) -> Result<Message, SendError> {
        let _guard = self.acquire()?;
        let (session_id, original) = {
            let store = self.store();
            let original = store
                .message(message_id)
                .cloned()
                .ok_or_else(|| SendError::UnknownMessage(message_id.to_string()))?;
            let session_id = store
                .active_id()
                .map(str::to_string)
                .ok_or_else(|| SendError::UnknownMessage(message_id.to_string()))?;
            (session_id, original)
        };
        let token = self.cancel_token();

        tracing::debug!(session_id = %session_id, message_id, "Regenerating response");
        let reply = self.dispatch(&token, &original.message, &[]).await?;

        let updated = Message {
            response: reply.response,
            artifacts: reply.artifacts.filter(|artifacts| !artifacts.is_empty()),
            timestamp: Utc::now(),
            ..original
        };

        let mut store = self.store();
        self.ensure_current(&store, &token, Some(session_id.as_str()))?;
        if !store.replace_message(updated.clone())? {
            return Err(SendError::UnknownMessage(message_id.to_string()));
        }
        Ok(updated)
    }

    /// Copy the whole active transcript. `Ok(false)` when there is nothing to copy.
    pub fn share_session(&self) -> Result<bool, ClipboardError> {
        let text = {
            let store = self.store();
            if store.messages().is_empty() {
                return Ok(false);
            }
            format_session(store.messages(), &self.user_label)
        };
        self.clipboard.copy(&text)?;
        Ok(true)
    }

    pub fn share_message(&self, message_id: &str) -> Result<bool, ClipboardError> {
        let text = {
            let store = self.store();
            let Some(message) = store.message(message_id) else {
                return Ok(false);
            };
            format_message(message, &self.user_label)
        };
        self.clipboard.copy(&text)?;
        Ok(true)
    }

    /// Paginated transcript of the active session, or `None` when it is empty.
    pub fn export_transcript(&self) -> Option<Document> {
        let store = self.store();
        if store.messages().is_empty() {
            return None;
        }
        let title = store
            .active_session()
            .map(|session| session.title.clone())
            .unwrap_or_else(|| "Chat".to_string());
        let text = format_session(store.messages(), &self.user_label);
        Some(paginate(&title, &text, self.layout))
    }

    /// Write the exported transcript to `path`, returning the page count.
    pub fn export_to_file(&self, path: &Path, overwrite: bool) -> Result<Option<usize>, ExportError> {
        let Some(document) = self.export_transcript() else {
            return Ok(None);
        };
        if !overwrite && path.exists() {
            return Err(ExportError::AlreadyExists(path.to_path_buf()));
        }

        let parent = path.parent().filter(|dir| !dir.as_os_str().is_empty());
        let mut temp_file = match parent {
            Some(dir) => NamedTempFile::new_in(dir)?,
            None => NamedTempFile::new_in(".")?,
        };
        temp_file.write_all(document.render_text().as_bytes())?;
        temp_file.as_file_mut().sync_all()?;
        temp_file.persist(path).map_err(|err| ExportError::Io(err.error))?;
        Ok(Some(document.page_count()))
    }
}

/// Preview shown for a message: its text, or the attached file names.
fn preview_text(message: &Message) -> String {
    if !message.message.trim().is_empty() {
        return message.message.clone();
    }
    message
        .attachments()
        .iter()
        .map(|attachment| attachment.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
