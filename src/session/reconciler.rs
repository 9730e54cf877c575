use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::directory::UserDirectory;
use super::machine::{Effect, Outcome, SessionMachine};
use super::provider::{AuthSnapshot, IdentityProvider, ListenerGuard};
use super::{Alert, Session, SessionError};
use crate::messaging::{Notification, NotificationBus};

type Observer = Box<dyn Fn(&Session) + Send + 'static>;

enum Command {
    IdentityChanged(AuthSnapshot),
    PushToken(String),
    SilentPayload(Alert),
    TakePendingAlert(oneshot::Sender<Option<Alert>>),
    RequestAccountSetup,
    CompleteAccountSetup,
    Subscribe(Observer),
    Current(oneshot::Sender<Session>),
    Shutdown,
}

/// Owns the application [`Session`] and keeps it in step with the identity
/// provider and the notification bus.
///
/// Every event is queued to a single worker task that owns the session, so
/// callbacks may come from any thread. Profile upserts run on their own tasks
/// and never hold up publication.
///
/// Must be started from within a tokio runtime.
pub struct SessionReconciler {
    commands: mpsc::UnboundedSender<Command>,
    listener: ListenerGuard,
    forwarder: JoinHandle<()>,
    worker: Option<JoinHandle<()>>,
}

impl SessionReconciler {
    pub fn start(
        provider: Arc<dyn IdentityProvider>,
        directory: Arc<dyn UserDirectory>,
        bus: &NotificationBus,
    ) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();

        let worker = Worker {
            machine: SessionMachine::new(),
            observers: Vec::new(),
            provider: provider.clone(),
            directory,
        };
        let worker = tokio::spawn(worker.run(receiver));
        let forwarder = tokio::spawn(forward_notifications(bus.subscribe(), commands.clone()));

        let listener_commands = commands.clone();
        let listener = ListenerGuard::register(
            provider,
            Box::new(move |snapshot| {
                let _ = listener_commands.send(Command::IdentityChanged(snapshot));
            }),
        );

        Self {
            commands,
            listener,
            forwarder,
            worker: Some(worker),
        }
    }

    fn send(&self, command: Command) -> Result<(), SessionError> {
        self.commands.send(command).map_err(|_| SessionError::Closed)
    }

    /// Feeds an identity snapshot directly, as the provider listener does.
    pub fn identity_changed(&self, snapshot: AuthSnapshot) -> Result<(), SessionError> {
        self.send(Command::IdentityChanged(snapshot))
    }

    pub fn push_token_arrived(&self, token: impl Into<String>) -> Result<(), SessionError> {
        self.send(Command::PushToken(token.into()))
    }

    pub fn silent_payload_arrived(
        &self,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<(), SessionError> {
        self.send(Command::SilentPayload(Alert::new(title, body)))
    }

    pub fn request_account_setup(&self) -> Result<(), SessionError> {
        self.send(Command::RequestAccountSetup)
    }

    /// Ends account setup and re-reads the provider's current snapshot.
    pub fn complete_account_setup(&self) -> Result<(), SessionError> {
        self.send(Command::CompleteAccountSetup)
    }

    /// Registers `observer`. It receives the current session first and every
    /// changed session afterwards.
    ///
    /// Observers run on the worker task, not on the caller's: the first call
    /// happens once every command queued before `subscribe` has been applied.
    /// A pending alert counts as consumed once it has been passed to at least
    /// one observer; later sessions carry `pending_alert: None` until a new
    /// payload arrives.
    pub fn subscribe<F>(&self, observer: F) -> Result<(), SessionError>
    where
        F: Fn(&Session) + Send + 'static,
    {
        self.send(Command::Subscribe(Box::new(observer)))
    }

    /// Removes and returns the pending alert. A given alert is handed out at
    /// most once, either here or through an observer.
    pub async fn take_pending_alert(&self) -> Result<Option<Alert>, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::TakePendingAlert(tx))?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    /// Returns the session after every previously queued command has been
    /// applied.
    pub async fn session(&self) -> Result<Session, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Current(tx))?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    /// Deregisters the provider listener and stops the worker.
    ///
    /// Profile upserts already in flight are left to finish on their own.
    pub async fn shutdown(mut self) {
        self.listener.release();
        self.forwarder.abort();
        let _ = self.commands.send(Command::Shutdown);
        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.await {
                warn!(error = %e, "session worker ended abnormally");
            }
        }
    }
}

impl Drop for SessionReconciler {
    fn drop(&mut self) {
        self.forwarder.abort();
        let _ = self.commands.send(Command::Shutdown);
    }
}

struct Worker {
    machine: SessionMachine,
    observers: Vec<Observer>,
    provider: Arc<dyn IdentityProvider>,
    directory: Arc<dyn UserDirectory>,
}

impl Worker {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = commands.recv().await {
            let outcome = match command {
                Command::IdentityChanged(snapshot) => self.machine.identity_changed(&snapshot),
                Command::PushToken(token) => self.machine.push_token_arrived(token),
                Command::SilentPayload(alert) => self.machine.silent_payload_arrived(alert),
                Command::RequestAccountSetup => self.machine.request_account_setup(),
                Command::CompleteAccountSetup => {
                    let snapshot = self.provider.current_snapshot();
                    self.machine.complete_account_setup(&snapshot)
                }
                Command::TakePendingAlert(reply) => {
                    let alert = self.machine.take_pending_alert();
                    let changed = alert.is_some();
                    let _ = reply.send(alert);
                    Outcome {
                        changed,
                        effect: None,
                    }
                }
                Command::Subscribe(observer) => {
                    observer(self.machine.session());
                    self.observers.push(observer);
                    self.consume_delivered_alert();
                    continue;
                }
                Command::Current(reply) => {
                    let _ = reply.send(self.machine.session().clone());
                    continue;
                }
                Command::Shutdown => break,
            };
            self.apply(outcome);
        }
        debug!("session worker stopped");
    }

    fn apply(&mut self, outcome: Outcome) {
        if outcome.changed {
            let session = self.machine.session();
            debug!(state = %session.state, "session changed");
            for observer in &self.observers {
                observer(session);
            }
            self.consume_delivered_alert();
        }
        if let Some(effect) = outcome.effect {
            self.spawn_effect(effect);
        }
    }

    /// Clears the alert slot once an observer has seen it.
    fn consume_delivered_alert(&mut self) {
        if self.observers.is_empty() {
            return;
        }
        if let Some(alert) = self.machine.take_pending_alert() {
            debug!(title = %alert.title, "alert delivered to observers");
        }
    }

    fn spawn_effect(&self, effect: Effect) {
        match effect {
            Effect::UpsertProfile {
                principal_id,
                fields,
            } => {
                let directory = self.directory.clone();
                tokio::spawn(async move {
                    match directory.upsert_profile(&principal_id, fields).await {
                        Ok(()) => debug!(principal_id = %principal_id, "profile upserted"),
                        Err(e) => {
                            warn!(principal_id = %principal_id, error = %e, "profile upsert failed")
                        }
                    }
                });
            }
        }
    }
}

async fn forward_notifications(
    mut notifications: broadcast::Receiver<Notification>,
    commands: mpsc::UnboundedSender<Command>,
) {
    loop {
        let command = match notifications.recv().await {
            Ok(Notification::PushToken { token }) => Command::PushToken(token),
            Ok(Notification::SilentPayload { title, body }) => {
                Command::SilentPayload(Alert { title, body })
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "notification bus lagged; notifications dropped");
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        if commands.send(command).is_err() {
            break;
        }
    }
}
