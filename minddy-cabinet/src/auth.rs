//! Authentication state and the login-widget channel
//!
//! The identity widget lives outside the cabinet. It gets an
//! [`AssertionSender`] while the login view is open and emits exactly one
//! [`IdentityAssertion`] through it. The shell awaits the matching
//! [`LoginView`]; dropping either end closes the channel.

use minddy_core::{FullProfile, IdentityAssertion};
use tokio::sync::oneshot;

/// Where the shell is in the login lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    /// No session. `error` is the message from the last explicit login
    /// attempt, never from a silent restore.
    Unauthenticated { error: Option<String> },
    Authenticating,
    Authenticated { profile: FullProfile },
}

impl AuthState {
    pub fn logged_out() -> Self {
        AuthState::Unauthenticated { error: None }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            AuthState::Unauthenticated { error } => error.as_deref(),
            _ => None,
        }
    }
}

impl Default for AuthState {
    fn default() -> Self {
        Self::logged_out()
    }
}

/// Widget side of the login channel.
#[derive(Debug)]
pub struct AssertionSender(oneshot::Sender<IdentityAssertion>);

impl AssertionSender {
    /// Hand the assertion to the login view. Gives it back if the view is
    /// already gone.
    pub fn emit(self, assertion: IdentityAssertion) -> Result<(), IdentityAssertion> {
        self.0.send(assertion)
    }

    pub fn is_closed(&self) -> bool {
        self.0.is_closed()
    }
}

/// Shell side of the login channel; lives as long as the login view.
#[derive(Debug)]
pub struct LoginView {
    rx: oneshot::Receiver<IdentityAssertion>,
}

impl LoginView {
    pub fn open() -> (AssertionSender, LoginView) {
        let (tx, rx) = oneshot::channel();
        (AssertionSender(tx), LoginView { rx })
    }

    /// Wait for the widget. `None` if the widget side was dropped first.
    pub async fn assertion(self) -> Option<IdentityAssertion> {
        self.rx.await.ok()
    }
}
