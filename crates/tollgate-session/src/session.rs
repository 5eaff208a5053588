//! The session entity and the attempt counter it owns.
//!
//! A session is the server's record of one user's login flow:
//! - WHO the user is (username, role)
//! - WHETHER they're logged in (`alive`) or locked out (`locked`)
//! - WHERE their requests have come from (known addresses)
//! - HOW MANY failed attempts they've made (the attempt counter)
//!
//! `Session` itself never leaves the manager. Callers get a
//! [`SessionInfo`] copy instead, so nothing outside the control loop can
//! hold a mutable reference to session state.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tollgate_types::SessionId;

use crate::{AddressPolicy, SessionError};

// ---------------------------------------------------------------------------
// AddressState
// ---------------------------------------------------------------------------

/// Whether requests from an address are accepted for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressState {
    Allowed,
    Blocked,
}

// ---------------------------------------------------------------------------
// AttemptCounter
// ---------------------------------------------------------------------------

/// Failed authentication attempts for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct AttemptCounter {
    attempts: u32,
}

impl AttemptCounter {
    /// Counts one more failure and returns the new total.
    fn record(&mut self) -> u32 {
        self.attempts = self.attempts.saturating_add(1);
        self.attempts
    }

    fn reset(&mut self) {
        self.attempts = 0;
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.attempts
    }
}

/// What recording a failed attempt did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FailureOutcome {
    /// Still under the limit.
    Counted { attempts: u32 },
    /// This attempt reached the limit; the session is now locked. `epoch`
    /// identifies this particular lockout.
    LockedOut { attempts: u32, epoch: u64 },
    /// The session was already locked; the attempt was counted anyway.
    AlreadyLocked { attempts: u32 },
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One user's session.
///
/// ```text
///   create ──→ [inactive] ──login──→ [alive] ──logout──→ [inactive]
///                   │                   │
///                   └──── N failures ───┴──→ [locked] ──(lockout elapses)──→ unlocked
/// ```
///
/// `locked` overrides `alive`: a locked session fails verification even
/// while logged in.
#[derive(Debug, Clone)]
pub(crate) struct Session {
    pub(crate) id: SessionId,
    pub(crate) username: String,
    pub(crate) role: Option<String>,
    pub(crate) alive: bool,
    pub(crate) locked: bool,
    pub(crate) addresses: BTreeMap<String, AddressState>,
    pub(crate) counter: AttemptCounter,
    /// `None` means the session never expires.
    pub(crate) expires_at: Option<Instant>,
    /// Bumped on every lockout. An unlock only applies if it carries the
    /// current epoch, so a timer from an earlier lockout can't clear a
    /// newer one.
    pub(crate) lock_epoch: u64,
}

impl Session {
    /// A fresh, not-yet-logged-in session that has seen one address.
    pub(crate) fn new(
        id: SessionId,
        username: String,
        role: Option<String>,
        address: String,
        expires_at: Option<Instant>,
    ) -> Self {
        let mut addresses = BTreeMap::new();
        addresses.insert(address, AddressState::Allowed);
        Self {
            id,
            username,
            role,
            alive: false,
            locked: false,
            addresses,
            counter: AttemptCounter::default(),
            expires_at,
            lock_epoch: 0,
        }
    }

    /// Rebuilds a session from a snapshot record. Remaining lifetime is
    /// measured from `now`.
    pub(crate) fn from_info(info: SessionInfo, now: Instant) -> Self {
        Self {
            id: info.id,
            username: info.username,
            role: info.role,
            alive: info.alive,
            locked: info.locked,
            addresses: info.addresses,
            counter: AttemptCounter {
                attempts: info.attempts,
            },
            expires_at: info.expires_in.map(|d| now + d),
            lock_epoch: 0,
        }
    }

    pub(crate) fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    pub(crate) fn login(&mut self) -> Result<(), SessionError> {
        if self.locked {
            return Err(SessionError::Locked(self.id.clone()));
        }
        if self.alive {
            return Err(SessionError::AlreadyAlive(self.id.clone()));
        }
        self.alive = true;
        self.counter.reset();
        Ok(())
    }

    pub(crate) fn logout(&mut self) -> Result<(), SessionError> {
        if !self.alive {
            return Err(SessionError::NotAlive(self.id.clone()));
        }
        self.alive = false;
        Ok(())
    }

    /// Lock is checked before liveness.
    pub(crate) fn verify(&self) -> Result<(), SessionError> {
        if self.locked {
            return Err(SessionError::Locked(self.id.clone()));
        }
        if !self.alive {
            return Err(SessionError::Inactive(self.id.clone()));
        }
        Ok(())
    }

    /// Applies the provenance policy to a request address.
    ///
    /// Under [`AddressPolicy::Permissive`] an unseen address is recorded
    /// as allowed, which is why this takes `&mut self`.
    pub(crate) fn check_address(
        &mut self,
        address: &str,
        policy: AddressPolicy,
    ) -> Result<(), SessionError> {
        match (self.addresses.get(address), policy) {
            (Some(AddressState::Allowed), _) => Ok(()),
            (Some(AddressState::Blocked), _) => Err(SessionError::BlockedAddress {
                session: self.id.clone(),
                address: address.to_string(),
            }),
            (None, AddressPolicy::Permissive) => {
                self.addresses
                    .insert(address.to_string(), AddressState::Allowed);
                tracing::debug!(session = %self.id, address, "new address registered");
                Ok(())
            }
            (None, AddressPolicy::Strict) => Err(SessionError::UnknownAddress {
                session: self.id.clone(),
                address: address.to_string(),
            }),
        }
    }

    pub(crate) fn set_address(&mut self, address: String, state: AddressState) {
        self.addresses.insert(address, state);
    }

    /// Role membership. Callers short-circuit the empty set before getting
    /// here.
    pub(crate) fn check_role(&self, roles: &HashSet<String>) -> Result<(), SessionError> {
        match &self.role {
            Some(role) if roles.contains(role) => Ok(()),
            actual => {
                let mut wanted: Vec<String> = roles.iter().cloned().collect();
                wanted.sort();
                Err(SessionError::RoleMismatch {
                    wanted,
                    actual: actual.clone(),
                })
            }
        }
    }

    /// Counts a failed attempt and locks the session when `max` is reached.
    pub(crate) fn record_failure(&mut self, max: u32) -> FailureOutcome {
        let attempts = self.counter.record();
        if self.locked {
            return FailureOutcome::AlreadyLocked { attempts };
        }
        if attempts >= max {
            self.locked = true;
            self.lock_epoch += 1;
            return FailureOutcome::LockedOut {
                attempts,
                epoch: self.lock_epoch,
            };
        }
        FailureOutcome::Counted { attempts }
    }

    /// Starts a new lockout epoch for a session that is already locked
    /// (used after a restore, when the original timer is gone).
    pub(crate) fn rearm_lock(&mut self) -> Option<u64> {
        if !self.locked {
            return None;
        }
        self.lock_epoch += 1;
        Some(self.lock_epoch)
    }

    /// Clears the lock if `epoch` names the current lockout. Returns
    /// whether anything changed.
    pub(crate) fn unlock(&mut self, epoch: u64) -> bool {
        if !self.locked || self.lock_epoch != epoch {
            return false;
        }
        self.locked = false;
        self.counter.reset();
        true
    }

    pub(crate) fn info(&self, now: Instant) -> SessionInfo {
        SessionInfo {
            id: self.id.clone(),
            username: self.username.clone(),
            role: self.role.clone(),
            alive: self.alive,
            locked: self.locked,
            attempts: self.counter.attempts(),
            addresses: self.addresses.clone(),
            expires_in: self
                .expires_at
                .map(|at| at.saturating_duration_since(now)),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionInfo
// ---------------------------------------------------------------------------

/// A read-only copy of a session, as handed to callers and written into
/// snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: SessionId,
    pub username: String,
    pub role: Option<String>,
    pub alive: bool,
    pub locked: bool,
    pub attempts: u32,
    pub addresses: BTreeMap<String, AddressState>,
    /// Time left before the session expires, if it has a lifetime.
    pub expires_in: Option<Duration>,
}
