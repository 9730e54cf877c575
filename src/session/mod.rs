//! Application session core.
//!
//! Turns identity-provider callbacks, push-token arrivals and silent
//! notification payloads into one [`Session`] value that observers can follow.
//!
//! # Layers
//!
//! * [`SessionMachine`] is the synchronous state machine. It never performs I/O;
//!   each call reports whether the session changed and which side effect, if
//!   any, should run.
//! * [`SessionReconciler`] owns a machine on a dedicated tokio task, feeds it
//!   from the [`IdentityProvider`] listener and the
//!   [`NotificationBus`](crate::messaging::NotificationBus), publishes to
//!   observers and runs profile upserts against the [`UserDirectory`].

pub mod directory;
pub mod machine;
pub mod provider;
pub mod reconciler;


pub use self::directory::{DirectoryError, ProfileFields, UserDirectory};
pub use self::machine::{Effect, Outcome, SessionMachine};
pub use self::provider::{
    AuthSnapshot, IdentityProvider, ListenerGuard, ListenerHandle, ListenerRegistry, Principal,
    StateListener,
};
pub use self::reconciler::SessionReconciler;

use thiserror::Error;

/// Errors surfaced by a running [`SessionReconciler`].
#[derive(Error, Debug)]
pub enum SessionError {
    /// The reconciler was shut down and no longer accepts commands.
    #[error("Session reconciler has shut down")]
    Closed,
}

/// Coarse authentication state shown to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No identity-provider event has been seen yet.
    #[default]
    Waiting,
    /// The app is walking the user through account setup. Identity events are
    /// held until the setup is completed.
    AccountSetup,
    LoggedIn,
    LoggedOut,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Waiting => "waiting",
            SessionState::AccountSetup => "account_setup",
            SessionState::LoggedIn => "logged_in",
            SessionState::LoggedOut => "logged_out",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated principal as seen by the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    /// Empty when the provider did not report an email.
    pub email: String,
    pub display_name: Option<String>,
    pub is_anonymous: bool,
}

/// A silent notification payload waiting to be shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub body: String,
}

impl Alert {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Application-facing session value published to observers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    pub state: SessionState,
    pub identity: Option<Identity>,
    /// Most recent push token, empty until one arrives.
    pub push_token: String,
    /// Single-slot mailbox; a newer payload replaces an unconsumed one.
    /// Cleared once delivered to an observer or taken.
    pub pending_alert: Option<Alert>,
}

impl Session {
    pub fn is_logged_in(&self) -> bool {
        self.state == SessionState::LoggedIn
    }

    pub fn has_pending_alert(&self) -> bool {
        self.pending_alert.is_some()
    }

    pub fn email(&self) -> Option<&str> {
        self.identity.as_ref().map(|identity| identity.email.as_str())
    }
}
