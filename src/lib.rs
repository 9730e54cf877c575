//! Firebase client session core.
//!
//! [`FirebaseApp`] is the composition root: it owns one [`FirebaseIdentity`]
//! and hands out the Firestore client, the user directory and a running
//! [`SessionReconciler`] wired to them. Nothing here is a process-wide
//! singleton; construct the app once and pass it (or the pieces it returns)
//! to the code that needs them.
//!
//! [`FirebaseIdentity`]: auth::FirebaseIdentity

#[cfg(feature = "auth")]
pub mod auth;
pub mod core;
#[cfg(feature = "firestore")]
pub mod firestore;
pub mod messaging;
pub mod session;

#[cfg(all(test, feature = "auth", feature = "firestore"))]
mod tests;

pub use crate::core::options::FirebaseOptions;
pub use crate::messaging::{Notification, NotificationBus};
pub use crate::session::{Session, SessionReconciler, SessionState};

#[cfg(feature = "auth")]
use auth::FirebaseIdentity;
#[cfg(all(feature = "auth", feature = "firestore"))]
use firestore::{FirebaseFirestore, FirestoreDirectory};
#[cfg(all(feature = "auth", feature = "firestore"))]
use std::sync::Arc;

pub struct FirebaseApp {
    options: FirebaseOptions,
    #[cfg(feature = "auth")]
    auth: FirebaseIdentity,
}

impl FirebaseApp {
    pub fn new(options: FirebaseOptions) -> Self {
        Self {
            #[cfg(feature = "auth")]
            auth: FirebaseIdentity::new(&options),
            options,
        }
    }

    pub fn options(&self) -> &FirebaseOptions {
        &self.options
    }

    /// The app's identity client. Every call returns a handle to the same
    /// signed-in user.
    #[cfg(feature = "auth")]
    pub fn auth(&self) -> FirebaseIdentity {
        self.auth.clone()
    }

    /// A Firestore client authorized as the app's signed-in user.
    #[cfg(all(feature = "auth", feature = "firestore"))]
    pub fn firestore(&self) -> FirebaseFirestore {
        FirebaseFirestore::new(&self.options, Arc::new(self.auth.clone()))
    }

    /// The profile directory in the configured users collection.
    #[cfg(all(feature = "auth", feature = "firestore"))]
    pub fn directory(&self) -> FirestoreDirectory {
        FirestoreDirectory::new(self.firestore(), self.options.users_collection.clone())
    }

    /// Starts a session reconciler fed by this app's identity client and
    /// `bus`, writing profiles to [`directory`](Self::directory).
    ///
    /// Must be called from within a tokio runtime.
    #[cfg(all(feature = "auth", feature = "firestore"))]
    pub fn start_session(&self, bus: &NotificationBus) -> SessionReconciler {
        SessionReconciler::start(Arc::new(self.auth()), Arc::new(self.directory()), bus)
    }
}
