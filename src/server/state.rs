use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;
use uuid::Uuid;

use crate::bindings::{BindingTable, Session};
use crate::error::DashboardError;
use crate::server::error::AppError;
use crate::store::DatasetStore;

/// Shared application state available to all route handlers via Axum's
/// `State` extractor.
pub struct AppState {
    /// Loaded once at startup and never mutated.
    pub store: Arc<DatasetStore>,

    pub bindings: BindingTable,

    /// Live sessions keyed by id. Capped at `max_sessions`; the least
    /// recently used session is dropped to make room.
    pub sessions: Mutex<HashMap<Uuid, Session>>,

    pub max_sessions: usize,
}

impl AppState {
    pub fn new(store: Arc<DatasetStore>, max_sessions: usize) -> Self {
        Self {
            store,
            bindings: BindingTable::new(),
            sessions: Mutex::new(HashMap::new()),
            max_sessions: max_sessions.max(1),
        }
    }

    fn sessions(&self) -> Result<MutexGuard<'_, HashMap<Uuid, Session>>, AppError> {
        self.sessions
            .lock()
            .map_err(|_| AppError::internal("Session lock poisoned"))
    }

    /// Store `session`, evicting the least recently used ones over the cap.
    pub fn insert_session(&self, session: Session) -> Result<(), AppError> {
        let mut sessions = self.sessions()?;
        while sessions.len() >= self.max_sessions {
            let Some(oldest) = sessions
                .values()
                .min_by_key(|s| s.last_used())
                .map(Session::id)
            else {
                break;
            };
            sessions.remove(&oldest);
            debug!(session = %oldest, "session evicted");
        }
        debug!(session = %session.id(), live = sessions.len() + 1, "session created");
        sessions.insert(session.id(), session);
        Ok(())
    }

    /// Copy of a session's current state. Marks the session as used.
    pub fn session(&self, id: Uuid) -> Result<Session, AppError> {
        let mut sessions = self.sessions()?;
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| DashboardError::SessionNotFound(id.to_string()))?;
        session.touch();
        Ok(session.clone())
    }

    /// Run `f` on a live session while holding the sessions lock, so
    /// concurrent updates to one session apply one after the other.
    pub fn update_session<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut Session) -> crate::error::Result<T>,
    ) -> Result<T, AppError> {
        let mut sessions = self.sessions()?;
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| DashboardError::SessionNotFound(id.to_string()))?;
        session.touch();
        Ok(f(session)?)
    }

    pub fn remove_session(&self, id: Uuid) -> Result<(), AppError> {
        match self.sessions()?.remove(&id) {
            Some(_) => {
                debug!(session = %id, "session closed");
                Ok(())
            }
            None => Err(DashboardError::SessionNotFound(id.to_string()).into()),
        }
    }

    pub fn session_count(&self) -> Result<usize, AppError> {
        Ok(self.sessions()?.len())
    }
}
