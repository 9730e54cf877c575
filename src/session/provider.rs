use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// A signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Principal {
    pub id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub is_anonymous: bool,
}

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn anonymous(mut self) -> Self {
        self.is_anonymous = true;
        self
    }
}

/// Auth state delivered to listeners on every change.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthSnapshot {
    pub current_principal: Option<Principal>,
}

impl AuthSnapshot {
    pub fn signed_in(principal: Principal) -> Self {
        Self {
            current_principal: Some(principal),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            current_principal: None,
        }
    }
}

pub type StateListener = Box<dyn Fn(AuthSnapshot) + Send + Sync>;

/// Identifies a registered auth-state listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

impl ListenerHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// The identity provider as consumed by the session core.
pub trait IdentityProvider: Send + Sync {
    /// Registers `listener`. It is called right away with the current snapshot
    /// and again after every auth-state change until removed.
    fn add_state_listener(&self, listener: StateListener) -> ListenerHandle;

    fn remove_listener(&self, handle: ListenerHandle);

    fn current_snapshot(&self) -> AuthSnapshot;
}

/// Bookkeeping for auth-state listeners, shared by provider implementations.
///
/// Listeners are invoked outside the internal lock, so a listener may add or
/// remove listeners without deadlocking.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<u64, Arc<StateListener>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `listener` and delivers `initial` to it before returning.
    pub fn register(&self, listener: StateListener, initial: AuthSnapshot) -> ListenerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let listener = Arc::new(listener);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, listener.clone());
        listener(initial);
        ListenerHandle(id)
    }

    /// Returns `false` when the handle was unknown or already removed.
    pub fn remove(&self, handle: ListenerHandle) -> bool {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&handle.0)
            .is_some()
    }

    pub fn notify(&self, snapshot: &AuthSnapshot) {
        let listeners: Vec<Arc<StateListener>> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        for listener in listeners {
            listener(snapshot.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Scoped listener registration.
///
/// The listener is removed from the provider exactly once: by [`release`]
/// or, failing that, when the guard is dropped.
///
/// [`release`]: ListenerGuard::release
pub struct ListenerGuard {
    provider: Arc<dyn IdentityProvider>,
    handle: Option<ListenerHandle>,
}

impl ListenerGuard {
    pub fn register(provider: Arc<dyn IdentityProvider>, listener: StateListener) -> Self {
        let handle = provider.add_state_listener(listener);
        Self {
            provider,
            handle: Some(handle),
        }
    }

    pub fn handle(&self) -> Option<ListenerHandle> {
        self.handle
    }

    /// Removes the listener. Returns `false` if it was already released.
    pub fn release(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                self.provider.remove_listener(handle);
                tracing::debug!(listener = handle.id(), "auth state listener removed");
                true
            }
            None => false,
        }
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.release();
    }
}
