//! Cabinet shell
//!
//! Owns the API client, the session store, the auth state (which carries the
//! profile aggregate) and the selected tab. Panels never hold the aggregate:
//! they receive it by reference and hand back a new one, which the shell swaps
//! in with [`Cabinet::apply`].

use std::fmt;
use std::str::FromStr;

use minddy_core::{
    ApiClient, FileSessionStore, FullProfile, IdentityAssertion, MinddyConfig, Session,
    SessionStore,
};

use crate::auth::{AuthState, LoginView};
use crate::error::{Action, CabinetError};
use crate::panels::{ChatPreview, PersonaEditor, ProfileEditor, PublishPanel};

/// Header name shown when the identity carries neither first name nor username.
pub const FALLBACK_DISPLAY_NAME: &str = "Психолог";

// ============================================================================
// Tabs and views
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Profile,
    Persona,
    Preview,
    Publish,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::Profile, Tab::Persona, Tab::Preview, Tab::Publish];

    pub fn id(&self) -> &'static str {
        match self {
            Tab::Profile => "profile",
            Tab::Persona => "ai-twin",
            Tab::Preview => "preview",
            Tab::Publish => "publish",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tab::Profile => "Профиль",
            Tab::Persona => "AI-двойник",
            Tab::Preview => "Превью",
            Tab::Publish => "Публикация",
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Tab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tab::ALL
            .into_iter()
            .find(|tab| tab.id() == s)
            .ok_or_else(|| format!("unknown tab: {}", s))
    }
}

/// What the caller should render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Loading,
    Login { error: Option<String> },
    Panel { tab: Tab },
}

// ============================================================================
// Cabinet
// ============================================================================

pub struct Cabinet<S> {
    api: ApiClient,
    store: S,
    state: AuthState,
    tab: Tab,
    bot_username: String,
}

impl Cabinet<FileSessionStore> {
    /// Build a shell against the configured backend and session file.
    pub fn from_config(config: &MinddyConfig) -> Result<Self, CabinetError> {
        let api = ApiClient::new(&config.api.base_url)?;
        let store = FileSessionStore::new(config.session.resolved_path());
        Ok(Cabinet::new(api, store).with_bot_username(&config.telegram.bot_username))
    }
}

impl<S: SessionStore> Cabinet<S> {
    pub fn new(api: ApiClient, store: S) -> Self {
        Self {
            api: api.without_session(),
            store,
            state: AuthState::logged_out(),
            tab: Tab::default(),
            bot_username: minddy_core::config::DEFAULT_BOT_USERNAME.to_string(),
        }
    }

    pub fn with_bot_username(mut self, bot_username: impl Into<String>) -> Self {
        self.bot_username = bot_username.into();
        self
    }

    // ------------------------------------------------------------------------
    // Auth flow
    // ------------------------------------------------------------------------

    /// Restore a persisted session. Any failure (missing keys, unreadable
    /// store, rejected token) ends logged out with no error for the user.
    /// Returns whether the cabinet is now authenticated.
    pub async fn restore(&mut self) -> bool {
        let session = match self.store.load() {
            Ok(Some(session)) => session,
            Ok(None) => {
                tracing::debug!("No stored session");
                self.state = AuthState::logged_out();
                return false;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Stored session unreadable, starting logged out");
                self.discard_session();
                return false;
            }
        };

        self.state = AuthState::Authenticating;
        self.api = self.api.with_session(session);
        self.load_profile().await
    }

    /// Exchange an identity assertion for a session and load the profile.
    ///
    /// A rejected assertion leaves the login view up with the error message.
    pub async fn login(&mut self, assertion: IdentityAssertion) -> Result<(), CabinetError> {
        self.state = AuthState::Authenticating;

        let auth = match self.api.without_session().authenticate(&assertion).await {
            Ok(auth) => auth,
            Err(e) => {
                tracing::error!(error = %e, telegram_id = assertion.id, "Login failed");
                let message = Some(e.user_message())
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| Action::Login.alert_text().to_string());
                self.state = AuthState::Unauthenticated {
                    error: Some(message),
                };
                return Err(CabinetError::Action {
                    action: Action::Login,
                    source: e,
                });
            }
        };

        tracing::info!(
            psychologist_id = %auth.psychologist.id,
            is_new = auth.is_new,
            "Logged in"
        );

        let session = Session::new(auth.token, assertion.identity_id());
        if let Err(e) = self.store.save(&session) {
            tracing::error!(error = %e, "Failed to persist session");
            self.state = AuthState::Unauthenticated {
                error: Some(e.to_string()),
            };
            return Err(e.into());
        }
        self.api = self.api.with_session(session);

        if self.load_profile().await {
            Ok(())
        } else {
            Err(CabinetError::NotAuthenticated)
        }
    }

    /// Wait for the login widget to emit an assertion, then log in with it.
    pub async fn login_with(&mut self, view: LoginView) -> Result<(), CabinetError> {
        match view.assertion().await {
            Some(assertion) => self.login(assertion).await,
            None => Err(CabinetError::LoginAborted),
        }
    }

    pub fn logout(&mut self) {
        tracing::info!("Logged out");
        self.discard_session();
        self.tab = Tab::default();
    }

    /// Re-fetch the aggregate with the current session.
    pub async fn refresh(&mut self) -> Result<(), CabinetError> {
        if !self.is_authenticated() {
            return Err(CabinetError::NotAuthenticated);
        }
        if self.load_profile().await {
            Ok(())
        } else {
            Err(CabinetError::NotAuthenticated)
        }
    }

    async fn load_profile(&mut self) -> bool {
        match self.api.get_profile().await {
            Ok(profile) => {
                self.state = AuthState::Authenticated { profile };
                true
            }
            Err(e) => {
                // Expired or invalid token: drop it quietly.
                tracing::warn!(error = %e, "Failed to load profile, clearing session");
                self.discard_session();
                false
            }
        }
    }

    fn discard_session(&mut self) {
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "Failed to clear stored session");
        }
        self.api = self.api.without_session();
        self.state = AuthState::logged_out();
    }

    // ------------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------------

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }

    pub fn view(&self) -> View {
        match &self.state {
            AuthState::Authenticating => View::Loading,
            AuthState::Unauthenticated { error } => View::Login {
                error: error.clone(),
            },
            AuthState::Authenticated { .. } => View::Panel { tab: self.tab },
        }
    }

    pub fn profile(&self) -> Option<&FullProfile> {
        match &self.state {
            AuthState::Authenticated { profile } => Some(profile),
            _ => None,
        }
    }

    fn require_profile(&self) -> Result<&FullProfile, CabinetError> {
        self.profile().ok_or(CabinetError::NotAuthenticated)
    }

    /// Swap in an aggregate returned by a panel. Ignored when logged out.
    pub fn apply(&mut self, updated: FullProfile) {
        match &mut self.state {
            AuthState::Authenticated { profile } => *profile = updated,
            _ => tracing::debug!("Dropping profile update received while logged out"),
        }
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn select_tab(&mut self, tab: Tab) -> Result<(), CabinetError> {
        self.require_profile()?;
        self.tab = tab;
        Ok(())
    }

    pub fn display_name(&self) -> Option<&str> {
        let profile = self.profile()?;
        let name = profile
            .psychologist
            .as_ref()
            .and_then(|p| {
                p.first_name
                    .as_deref()
                    .filter(|n| !n.is_empty())
                    .or(p.username.as_deref().filter(|n| !n.is_empty()))
            })
            .unwrap_or(FALLBACK_DISPLAY_NAME);
        Some(name)
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn bot_username(&self) -> &str {
        &self.bot_username
    }

    // ------------------------------------------------------------------------
    // Panels
    // ------------------------------------------------------------------------

    pub fn profile_editor(&self) -> Result<ProfileEditor, CabinetError> {
        Ok(ProfileEditor::new(self.api.clone(), self.require_profile()?))
    }

    pub fn persona_editor(&self) -> Result<PersonaEditor, CabinetError> {
        Ok(PersonaEditor::new(self.api.clone(), self.require_profile()?))
    }

    pub fn chat_preview(&self) -> Result<ChatPreview, CabinetError> {
        self.require_profile()?;
        Ok(ChatPreview::new(self.api.clone()))
    }

    pub fn publish_panel(&self) -> Result<PublishPanel, CabinetError> {
        self.require_profile()?;
        Ok(PublishPanel::new(self.api.clone(), &self.bot_username))
    }
}
