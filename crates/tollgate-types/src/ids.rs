//! Identifier newtypes shared by every Tollgate crate.
//!
//! Both identifiers wrap an opaque random token. A `SessionId` is a bearer
//! secret: whoever presents it in a cookie is treated as its owner. That's
//! why neither `Display` nor `Debug` prints the full token. Logs get a
//! short, recognisable prefix; the full value is only reachable through
//! [`SessionId::as_str`], which the cookie layer uses to write the header.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of leading characters shown when an id is displayed.
const VISIBLE_PREFIX: usize = 8;

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

/// Identifies one session inside one manager's table.
///
/// The `#[serde(transparent)]` attribute serializes this as the bare
/// string, so snapshots read `"4f1c..."` rather than `{ "0": "4f1c..." }`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wraps a raw token, typically one read back from a cookie.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the full token. Only the cookie layer should need this.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", prefix(&self.0))
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", prefix(&self.0))
    }
}

// ---------------------------------------------------------------------------
// ManagerId
// ---------------------------------------------------------------------------

/// Identifies a session manager within a manager registry.
///
/// Manager ids are not secrets (they end up in cookie *names*), so they
/// print in full.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManagerId(String);

impl ManagerId {
    /// Wraps a raw manager id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ManagerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M-{}", self.0)
    }
}

/// Returns at most the first `VISIBLE_PREFIX` characters of a token.
fn prefix(token: &str) -> &str {
    match token.char_indices().nth(VISIBLE_PREFIX) {
        Some((end, _)) => &token[..end],
        None => token,
    }
}
