use std::error::Error;
use std::sync::Arc;

use crate::api::ApiClient;
use crate::auth::AuthSession;
use crate::core::chat::{ChatController, ChatSessionStore};
use crate::core::config::data::Config;
use crate::core::routes::{Navigation, RouteGuard, View};
use crate::core::storage::{read_json, write_json, FileStore, KeyValueStore, KeyringStore};
use crate::core::token_store::TokenStore;
use crate::utils::clipboard::SystemClipboard;
use crate::utils::url::is_valid_base_url;

/// Remembers which conversation later `nova chat` invocations continue.
pub const ACTIVE_CHAT_KEY: &str = "cli_active_chat";
const DEFAULT_USER_LABEL: &str = "You";

/// Everything one CLI invocation needs, built from the loaded config.
pub struct AppContext {
    pub config: Config,
    pub auth: AuthSession,
    storage: Arc<dyn KeyValueStore>,
}

impl AppContext {
    pub fn from_config(config: Config) -> Result<Self, Box<dyn Error>> {
        let base_url = config.api_base_url();
        if !is_valid_base_url(&base_url) {
            return Err(format!("Invalid API base URL: {base_url}").into());
        }
        let data_dir = config
            .data_dir()
            .ok_or("Could not determine a data directory; set data_dir in the config file")?;

        let api = Arc::new(ApiClient::new(&base_url, config.request_timeout())?);
        tracing::debug!(base_url = %api.base_url(), data_dir = %data_dir.display(), "Using backend");
        let storage: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(data_dir));
        Ok(Self::with_parts(config, api, storage))
    }

    pub fn with_parts(config: Config, api: Arc<ApiClient>, storage: Arc<dyn KeyValueStore>) -> Self {
        let credentials: Arc<dyn KeyValueStore> = if config.use_keyring() {
            Arc::new(KeyringStore::new())
        } else {
            Arc::clone(&storage)
        };
        let auth = AuthSession::new(api, TokenStore::new(credentials));
        Self {
            config,
            auth,
            storage,
        }
    }

    /// Restore the login and apply the chat view's guard.
    pub async fn require_chat_access(&mut self) -> Result<(), Box<dyn Error>> {
        self.auth.init().await;
        match RouteGuard::check(View::Chat, &self.auth) {
            Navigation::Allow => Ok(()),
            Navigation::Redirect(View::Login) => {
                Err("Please log in first: nova login <username>".into())
            }
            Navigation::Redirect(other) => Err(format!("Redirected to {other}").into()),
            Navigation::Pending => Err("Still restoring your login; try again".into()),
        }
    }

    fn user_label(&self) -> String {
        self.config
            .user_label()
            .map(str::to_string)
            .or_else(|| self.auth.current_user().map(|user| user.display_name()))
            .unwrap_or_else(|| DEFAULT_USER_LABEL.to_string())
    }

    /// Controller positioned on the remembered conversation, if it still exists.
    pub fn chat_controller(&self) -> ChatController {
        let mut store = ChatSessionStore::open(Arc::clone(&self.storage));
        match read_json::<String>(self.storage.as_ref(), ACTIVE_CHAT_KEY) {
            Ok(Some(id)) => {
                if !store.load_session(&id) {
                    tracing::debug!(session_id = %id, "Remembered chat no longer exists");
                }
            }
            Ok(None) => {}
            Err(err) => tracing::warn!(error = %err, "Ignoring unreadable active chat marker"),
        }

        ChatController::new(store, self.auth.api().clone(), Arc::new(SystemClipboard))
            .with_timeout(self.config.request_timeout())
            .with_page_layout(self.config.page_layout())
            .with_user_label(self.user_label())
    }

    pub fn remember_active(&self, controller: &ChatController) {
        let result = match controller.active_session() {
            Some(session) => write_json(self.storage.as_ref(), ACTIVE_CHAT_KEY, &session.id),
            None => self.storage.delete(ACTIVE_CHAT_KEY),
        };
        if let Err(err) = result {
            tracing::warn!(error = %err, "Failed to remember the active chat");
        }
    }
}
