//! The session table: every session a manager owns, plus a username index.
//!
//! Not thread-safe on its own. The table belongs to exactly one control
//! loop (see `actor.rs`), which is what serializes access to it.

use std::collections::HashMap;

use tokio::time::Instant;
use tollgate_types::{CodecError, SessionId};

use crate::ids::{TokenSource, unique_token};
use crate::session::{Session, SessionInfo};
use crate::SessionError;

pub(crate) struct SessionTable {
    /// All sessions, keyed by id.
    sessions: HashMap<SessionId, Session>,

    /// Username to session id. Kept in sync with `sessions`; this is what
    /// enforces one session per username.
    usernames: HashMap<String, SessionId>,

    tokens: Box<dyn TokenSource>,
}

impl SessionTable {
    pub(crate) fn new(tokens: Box<dyn TokenSource>) -> Self {
        Self {
            sessions: HashMap::new(),
            usernames: HashMap::new(),
            tokens,
        }
    }

    /// Creates a session for `username` with a fresh, unique id.
    ///
    /// A username whose previous session has expired but not been swept
    /// yet is allowed to start over.
    ///
    /// # Errors
    /// - [`SessionError::DuplicateSession`]: the username already has a
    ///   live entry in the table
    /// - [`SessionError::IdExhausted`]: no unused id could be drawn
    pub(crate) fn create(
        &mut self,
        username: &str,
        role: Option<String>,
        address: String,
        expires_at: Option<Instant>,
        now: Instant,
    ) -> Result<SessionId, SessionError> {
        if let Some(existing) = self.usernames.get(username) {
            let expired = self
                .sessions
                .get(existing)
                .is_none_or(|s| s.is_expired(now));
            if !expired {
                return Err(SessionError::DuplicateSession(username.to_string()));
            }
            let existing = existing.clone();
            self.remove(&existing);
        }

        let sessions = &self.sessions;
        let token = unique_token(self.tokens.as_mut(), |candidate| {
            sessions.contains_key(&SessionId::new(candidate))
        })?;
        let id = SessionId::new(token);

        let session = Session::new(id.clone(), username.to_string(), role, address, expires_at);
        self.usernames.insert(username.to_string(), id.clone());
        self.sessions.insert(id.clone(), session);

        tracing::info!(session = %id, username, "session created");
        Ok(id)
    }

    /// Inserts a session rebuilt from a snapshot.
    ///
    /// # Errors
    /// [`CodecError::InvalidSnapshot`] if the id or username is already
    /// present, which means the snapshot is inconsistent.
    pub(crate) fn insert_restored(&mut self, session: Session) -> Result<(), CodecError> {
        if self.sessions.contains_key(&session.id) {
            return Err(CodecError::InvalidSnapshot(format!(
                "session {} appears twice",
                session.id
            )));
        }
        if self.usernames.contains_key(&session.username) {
            return Err(CodecError::InvalidSnapshot(format!(
                "user {:?} has more than one session",
                session.username
            )));
        }
        self.usernames
            .insert(session.username.clone(), session.id.clone());
        self.sessions.insert(session.id.clone(), session);
        Ok(())
    }

    /// Looks up a session that is still within its lifetime.
    ///
    /// An expired session is removed on the spot.
    ///
    /// # Errors
    /// - [`SessionError::NotFound`]: no such id
    /// - [`SessionError::Expired`]: the session outlived its lifetime
    pub(crate) fn live_mut(
        &mut self,
        id: &SessionId,
        now: Instant,
    ) -> Result<&mut Session, SessionError> {
        let expired = self
            .sessions
            .get(id)
            .ok_or_else(|| SessionError::NotFound(id.clone()))?
            .is_expired(now);

        if expired {
            self.remove(id);
            tracing::info!(session = %id, "session expired");
            return Err(SessionError::Expired(id.clone()));
        }

        self.sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.clone()))
    }

    /// Direct access, ignoring expiry. Used by the unlock path, which must
    /// be a no-op for sessions that are gone.
    pub(crate) fn get_mut(&mut self, id: &SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(id)
    }

    pub(crate) fn remove(&mut self, id: &SessionId) -> Option<Session> {
        let session = self.sessions.remove(id)?;
        self.usernames.remove(&session.username);
        Some(session)
    }

    /// Removes every expired session. Returns the ids removed.
    pub(crate) fn expire_stale(&mut self, now: Instant) -> Vec<SessionId> {
        let expired: Vec<SessionId> = self
            .sessions
            .values()
            .filter(|s| s.is_expired(now))
            .map(|s| s.id.clone())
            .collect();

        for id in &expired {
            self.remove(id);
            tracing::info!(session = %id, "session expired (swept)");
        }
        expired
    }

    pub(crate) fn sessions_mut(&mut self) -> impl Iterator<Item = &mut Session> {
        self.sessions.values_mut()
    }

    /// Point-in-time copies of every session, ordered by id so snapshots
    /// are stable.
    pub(crate) fn infos(&self, now: Instant) -> Vec<SessionInfo> {
        let mut infos: Vec<SessionInfo> = self.sessions.values().map(|s| s.info(now)).collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }

    pub(crate) fn len(&self) -> usize {
        self.sessions.len()
    }
}

// =========================================================================
// Tests
// =========================================================================
