use super::directory::ProfileFields;
use super::provider::AuthSnapshot;
use super::{Alert, Identity, Session, SessionState};
use tracing::{debug, info, warn};

/// Side effect requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    UpsertProfile {
        principal_id: String,
        fields: ProfileFields,
    },
}

/// Result of feeding one event to the [`SessionMachine`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Outcome {
    /// Whether the session value differs from before the event.
    pub changed: bool,
    pub effect: Option<Effect>,
}

impl Outcome {
    fn unchanged() -> Self {
        Self::default()
    }
}

/// Synchronous session state machine.
///
/// ```text
/// Waiting    --principal present--> LoggedIn
/// Waiting    --principal absent---> LoggedOut
/// LoggedOut  --principal present--> LoggedIn
/// LoggedIn   --principal absent---> LoggedOut
/// any        --request setup------> AccountSetup
/// AccountSetup --complete setup---> LoggedIn | LoggedOut
/// AccountSetup --identity event---> AccountSetup
/// ```
#[derive(Debug, Clone, Default)]
pub struct SessionMachine {
    session: Session,
}

impl SessionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn identity_changed(&mut self, snapshot: &AuthSnapshot) -> Outcome {
        if self.session.state == SessionState::AccountSetup {
            debug!("identity change held during account setup");
            return Outcome::unchanged();
        }
        self.reconcile(snapshot)
    }

    /// Stores the token. A profile upsert is requested only while logged in
    /// and only for a non-empty, new token.
    pub fn push_token_arrived(&mut self, token: String) -> Outcome {
        if self.session.push_token == token {
            return Outcome::unchanged();
        }
        self.session.push_token = token;

        let effect = if self.session.is_logged_in() && !self.session.push_token.is_empty() {
            self.upsert_effect()
        } else {
            None
        };

        Outcome {
            changed: true,
            effect,
        }
    }

    /// Last write wins: an unconsumed alert is replaced.
    pub fn silent_payload_arrived(&mut self, alert: Alert) -> Outcome {
        if self.session.pending_alert.as_ref() == Some(&alert) {
            return Outcome::unchanged();
        }
        if let Some(dropped) = self.session.pending_alert.replace(alert) {
            debug!(title = %dropped.title, "unconsumed alert replaced");
        }
        Outcome {
            changed: true,
            effect: None,
        }
    }

    pub fn take_pending_alert(&mut self) -> Option<Alert> {
        self.session.pending_alert.take()
    }

    pub fn request_account_setup(&mut self) -> Outcome {
        if self.session.state == SessionState::AccountSetup {
            return Outcome::unchanged();
        }
        info!(from = %self.session.state, "entering account setup");
        self.session.state = SessionState::AccountSetup;
        Outcome {
            changed: true,
            effect: None,
        }
    }

    /// Leaves account setup and re-applies `snapshot`, the provider's
    /// current state. Ignored unless account setup is in progress.
    pub fn complete_account_setup(&mut self, snapshot: &AuthSnapshot) -> Outcome {
        if self.session.state != SessionState::AccountSetup {
            debug!(state = %self.session.state, "account setup not in progress");
            return Outcome::unchanged();
        }
        info!("account setup completed");
        self.reconcile(snapshot)
    }

    fn reconcile(&mut self, snapshot: &AuthSnapshot) -> Outcome {
        let before = self.session.clone();

        let principal = match snapshot.current_principal.as_ref() {
            Some(principal) if principal.id.is_empty() => {
                warn!("principal without an id; treating as signed out");
                None
            }
            other => other,
        };

        match principal {
            None => {
                self.session.state = SessionState::LoggedOut;
                self.session.identity = None;
            }
            Some(principal) => {
                self.session.state = SessionState::LoggedIn;
                self.session.identity = Some(Identity {
                    id: principal.id.clone(),
                    email: principal.email.clone().unwrap_or_default(),
                    display_name: principal.display_name.clone(),
                    is_anonymous: principal.is_anonymous,
                });
            }
        }

        let logged_in_as = |session: &Session| {
            if session.is_logged_in() {
                session.identity.as_ref().map(|identity| identity.id.clone())
            } else {
                None
            }
        };
        let previous = logged_in_as(&before);
        let current = logged_in_as(&self.session);

        let effect = match (&previous, &current) {
            (_, Some(id)) if previous.as_ref() != Some(id) => {
                info!(principal_id = %id, "logged in");
                self.upsert_effect()
            }
            (Some(id), None) => {
                info!(principal_id = %id, "logged out");
                None
            }
            _ => None,
        };

        Outcome {
            changed: self.session != before,
            effect,
        }
    }

    fn upsert_effect(&self) -> Option<Effect> {
        let identity = self.session.identity.as_ref()?;
        let push_token = &self.session.push_token;
        Some(Effect::UpsertProfile {
            principal_id: identity.id.clone(),
            fields: ProfileFields {
                email: identity.email.clone(),
                name: identity.display_name.clone().unwrap_or_default(),
                push_token: (!push_token.is_empty()).then(|| push_token.clone()),
            },
        })
    }
}
