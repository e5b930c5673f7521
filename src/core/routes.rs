//! Top-level views and the guard that keeps protected ones behind a login.

use std::fmt;
use std::str::FromStr;

use crate::auth::AuthSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Home,
    Features,
    About,
    Support,
    Login,
    Register,
    Chat,
    Admin,
}

impl View {
    pub const ALL: [View; 8] = [
        View::Home,
        View::Features,
        View::About,
        View::Support,
        View::Login,
        View::Register,
        View::Chat,
        View::Admin,
    ];

    pub fn is_protected(self) -> bool {
        matches!(self, View::Chat | View::Admin)
    }

    pub fn path(self) -> &'static str {
        match self {
            View::Home => "/",
            View::Features => "/features",
            View::About => "/about",
            View::Support => "/support",
            View::Login => "/login",
            View::Register => "/register",
            View::Chat => "/chat",
            View::Admin => "/admin",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownView(pub String);

impl fmt::Display for UnknownView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown view: {}", self.0)
    }
}

impl std::error::Error for UnknownView {}

impl FromStr for View {
    type Err = UnknownView;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let normalized = trimmed.trim_end_matches('/');
        let normalized = if normalized.is_empty() { "/" } else { normalized };
        View::ALL
            .into_iter()
            .find(|view| {
                view.path() == normalized
                    || view.path().trim_start_matches('/').eq_ignore_ascii_case(normalized)
            })
            .ok_or_else(|| UnknownView(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Allow,
    Redirect(View),
    /// Login restoration has not finished yet.
    Pending,
}

pub struct RouteGuard;

impl RouteGuard {
    pub fn check(view: View, auth: &AuthSession) -> Navigation {
        Self::check_state(view, auth.is_loading(), auth.is_authenticated())
    }

    fn check_state(view: View, loading: bool, authenticated: bool) -> Navigation {
        if !view.is_protected() {
            return Navigation::Allow;
        }
        if loading {
            Navigation::Pending
        } else if authenticated {
            Navigation::Allow
        } else {
            tracing::debug!(%view, "Redirecting unauthenticated visitor to login");
            Navigation::Redirect(View::Login)
        }
    }
}

/// History of visited views.
///
/// A refused view is replaced by its redirect target rather than recorded,
/// so going back from the login page never lands on it.
#[derive(Debug, Clone)]
pub struct Navigator {
    history: Vec<View>,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new(View::Home)
    }
}

impl Navigator {
    pub fn new(start: View) -> Self {
        Self {
            history: vec![start],
        }
    }

    pub fn current(&self) -> View {
        self.history.last().copied().unwrap_or(View::Home)
    }

    pub fn history(&self) -> &[View] {
        &self.history
    }

    /// While the guard is pending nothing is recorded.
    pub fn navigate(&mut self, view: View, auth: &AuthSession) -> Navigation {
        let outcome = RouteGuard::check(view, auth);
        self.apply(view, outcome);
        outcome
    }

    fn apply(&mut self, view: View, outcome: Navigation) {
        match outcome {
            Navigation::Allow => {
                if self.current() != view {
                    self.history.push(view);
                }
            }
            Navigation::Redirect(target) => {
                if self.current() != target {
                    self.history.push(target);
                }
            }
            Navigation::Pending => {}
        }
    }

    pub fn back(&mut self) -> View {
        if self.history.len() > 1 {
            self.history.pop();
        }
        self.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiClient;
    use crate::core::storage::MemoryStore;
    use crate::core::token_store::TokenStore;
    use std::sync::Arc;

    fn signed_out_session() -> AuthSession {
        let api = Arc::new(ApiClient::with_client(
            reqwest::Client::new(),
            "http://127.0.0.1:9/api",
        ));
        AuthSession::new(api, TokenStore::new(Arc::new(MemoryStore::new())))
    }

    #[test]
    fn only_chat_and_admin_are_protected() {
        let protected: Vec<View> = View::ALL
            .into_iter()
            .filter(|view| view.is_protected())
            .collect();
        assert_eq!(protected, vec![View::Chat, View::Admin]);
    }

    #[test]
    fn guard_decisions() {
        assert_eq!(RouteGuard::check_state(View::Home, true, false), Navigation::Allow);
        assert_eq!(RouteGuard::check_state(View::Chat, true, false), Navigation::Pending);
        assert_eq!(
            RouteGuard::check_state(View::Chat, false, false),
            Navigation::Redirect(View::Login)
        );
        assert_eq!(
            RouteGuard::check_state(View::Admin, false, false),
            Navigation::Redirect(View::Login)
        );
        assert_eq!(RouteGuard::check_state(View::Chat, false, true), Navigation::Allow);
    }

    #[tokio::test]
    async fn signed_out_chat_visit_redirects_with_replace() {
        let mut auth = signed_out_session();
        let mut navigator = Navigator::default();
        assert_eq!(navigator.navigate(View::Chat, &auth), Navigation::Pending);
        assert_eq!(navigator.history(), &[View::Home]);

        auth.init().await;
        navigator.navigate(View::About, &auth);
        assert_eq!(
            navigator.navigate(View::Chat, &auth),
            Navigation::Redirect(View::Login)
        );
        assert_eq!(navigator.history(), &[View::Home, View::About, View::Login]);
        assert_eq!(navigator.back(), View::About);
    }

    #[test]
    fn allowed_navigation_pushes_once() {
        let mut navigator = Navigator::new(View::Login);
        navigator.apply(View::Chat, Navigation::Allow);
        navigator.apply(View::Chat, Navigation::Allow);
        assert_eq!(navigator.history(), &[View::Login, View::Chat]);
        assert_eq!(navigator.back(), View::Login);
        assert_eq!(navigator.back(), View::Login);
    }

    #[test]
    fn parses_paths_and_names() {
        assert_eq!("/chat".parse::<View>(), Ok(View::Chat));
        assert_eq!("admin/".parse::<View>(), Ok(View::Admin));
        assert_eq!("/".parse::<View>(), Ok(View::Home));
        assert_eq!("Support".parse::<View>(), Ok(View::Support));
        assert!("/settings".parse::<View>().is_err());
    }
}
