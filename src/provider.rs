//! Who is signed in, for every screen

use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::auth::{AuthChangeEvent, User};
use crate::backend::Backend;

/// Read-only view of the session state
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    /// The signed in user
    pub identity: Option<User>,
    /// True until the initial session lookup has finished
    pub loading: bool,
}

impl SessionSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// Id of the signed in user
    pub fn user_id(&self) -> Option<&str> {
        self.identity.as_ref().map(|u| u.id.as_str())
    }

    /// Email of the signed in user
    pub fn email(&self) -> Option<&str> {
        self.identity.as_ref().and_then(|u| u.email.as_deref())
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            identity: None,
            loading: true,
        }
    }
}

/// Holds the current identity and keeps it in step with the backend's auth
/// events.
///
/// The listener task runs until [`SessionProvider::shutdown`] or drop.
pub struct SessionProvider {
    state: watch::Receiver<SessionSnapshot>,
    listener: Option<JoinHandle<()>>,
}

impl SessionProvider {
    /// Start tracking the session of `backend`.
    ///
    /// Must be called inside a tokio runtime. The snapshot reports
    /// `loading` until the persisted session has been looked up.
    pub fn start(backend: Arc<dyn Backend>) -> Self {
        let (tx, rx) = watch::channel(SessionSnapshot::default());

        // Subscribe before the lookup so no event slips between the two.
        let events = backend.subscribe_auth_changes();
        let listener = tokio::spawn(run(backend, events, tx));

        Self {
            state: rx,
            listener: Some(listener),
        }
    }

    /// The current state
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// A receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.clone()
    }

    /// Wait for the initial lookup and return the settled state
    pub async fn wait_until_loaded(&self) -> SessionSnapshot {
        self.wait_for(|s| !s.loading).await
    }

    /// Wait until the state satisfies `predicate`. Returns the last known
    /// state if the listener has stopped.
    pub async fn wait_for<F>(&self, predicate: F) -> SessionSnapshot
    where
        F: Fn(&SessionSnapshot) -> bool,
    {
        let mut rx = self.state.clone();
        loop {
            {
                let current = rx.borrow_and_update();
                if predicate(&current) {
                    return current.clone();
                }
            }
            if rx.changed().await.is_err() {
                return rx.borrow().clone();
            }
        }
    }

    /// Stop following auth events
    pub fn shutdown(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
            log::debug!("Session provider stopped");
        }
    }
}

impl Drop for SessionProvider {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn run(
    backend: Arc<dyn Backend>,
    mut events: broadcast::Receiver<AuthChangeEvent>,
    tx: watch::Sender<SessionSnapshot>,
) {
    let identity = match backend.current_session().await {
        Ok(session) => session.map(|s| s.user),
        Err(err) => {
            log::warn!("Initial session lookup failed, continuing signed out: {}", err);
            None
        }
    };
    log::debug!("Session provider loaded (signed in: {})", identity.is_some());
    tx.send_replace(SessionSnapshot {
        identity,
        loading: false,
    });

    loop {
        match events.recv().await {
            Ok(change) => {
                log::debug!("Applying auth event {:?}", change.event);
                let identity = change.user().cloned();
                tx.send_replace(SessionSnapshot {
                    identity,
                    loading: false,
                });
            }
            Err(RecvError::Lagged(skipped)) => {
                log::warn!("Missed {} auth events, resynchronising", skipped);
                tx.send_replace(SessionSnapshot {
                    identity: backend.current_identity(),
                    loading: false,
                });
            }
            Err(RecvError::Closed) => break,
        }
    }
}
