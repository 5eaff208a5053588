//! Request guards: the decision an HTTP middleware needs, without the HTTP.
//!
//! A middleware reads the session cookie (named by
//! [`session_cookie_name`]) and the client address from the request, asks
//! a [`Guard`] for a decision, and turns the returned [`Access`] into a
//! response.
//!
//! ```text
//!   cookie? ──no──→ deny
//!      │
//!   verify / verify_with_address ──err──→ deny
//!      │
//!   check_role (Restricted only) ──err──→ deny
//!      │
//!   Granted
//! ```

use tollgate_session::{SessionError, SessionHandle};
use tollgate_types::{ManagerId, SessionId};

/// Prefix shared by every Tollgate session cookie.
pub const COOKIE_PREFIX: &str = "SESStlgt";

/// The cookie a manager's session id travels in.
///
/// Each manager gets its own cookie so several managers can serve one
/// site without clobbering each other.
pub fn session_cookie_name(manager: &ManagerId) -> String {
    format!("{COOKIE_PREFIX}{}", manager.as_str())
}

// ---------------------------------------------------------------------------
// Rule / Access / Denial
// ---------------------------------------------------------------------------

/// What a guarded route requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// A verified session whose role is one of `roles`. An empty list
    /// accepts any verified session.
    Restricted { roles: Vec<String> },
    /// A verified session; failures get 401.
    Validate,
    /// A verified session; failures are sent to `location`.
    Redirect { location: String },
}

/// A guard's decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Granted,
    Unauthorized,
    Redirect(String),
}

impl Access {
    /// The HTTP status a middleware should answer with.
    pub fn status(&self) -> u16 {
        match self {
            Self::Granted => 200,
            Self::Unauthorized => 401,
            Self::Redirect(_) => 303,
        }
    }

    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Why a request was turned away.
#[derive(Debug, thiserror::Error)]
pub enum Denial {
    #[error("no session cookie")]
    MissingCookie,

    /// Address binding is on but the request carried no address.
    #[error("no client address")]
    MissingAddress,

    #[error(transparent)]
    Session(#[from] SessionError),
}

// ---------------------------------------------------------------------------
// Guard
// ---------------------------------------------------------------------------

/// Applies one [`Rule`] to incoming requests against one manager.
#[derive(Debug, Clone)]
pub struct Guard {
    sessions: SessionHandle,
    rule: Rule,
    bind_address: bool,
}

impl Guard {
    pub fn new(sessions: SessionHandle, rule: Rule) -> Self {
        Self {
            sessions,
            rule,
            bind_address: false,
        }
    }

    /// Verified session with one of `roles`; 401 otherwise.
    pub fn restricted<I, S>(sessions: SessionHandle, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let roles = roles.into_iter().map(Into::into).collect();
        Self::new(sessions, Rule::Restricted { roles })
    }

    /// Verified session; 401 otherwise.
    pub fn validate(sessions: SessionHandle) -> Self {
        Self::new(sessions, Rule::Validate)
    }

    /// Verified session; redirect to `location` otherwise.
    pub fn redirect(sessions: SessionHandle, location: impl Into<String>) -> Self {
        Self::new(
            sessions,
            Rule::Redirect {
                location: location.into(),
            },
        )
    }

    /// Also require the request address to pass the manager's provenance
    /// policy.
    pub fn bind_address(mut self, bind: bool) -> Self {
        self.bind_address = bind;
        self
    }

    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    /// Name of the cookie this guard reads.
    pub fn cookie_name(&self) -> String {
        session_cookie_name(self.sessions.id())
    }

    /// Decides a request. `cookie` is the session cookie's value, if the
    /// request had one.
    ///
    /// Every denial is logged at `debug` with its reason.
    pub async fn check(&self, cookie: Option<&str>, address: Option<&str>) -> Access {
        match self.authorize(cookie, address).await {
            Ok(()) => Access::Granted,
            Err(reason) => {
                tracing::debug!(
                    manager = %self.sessions.id(),
                    %reason,
                    "access denied"
                );
                self.deny()
            }
        }
    }

    /// Same checks as [`check`](Self::check), returning the reason for a
    /// denial instead of the response to send.
    pub async fn authorize(
        &self,
        cookie: Option<&str>,
        address: Option<&str>,
    ) -> Result<(), Denial> {
        let id = SessionId::new(cookie.ok_or(Denial::MissingCookie)?);

        if self.bind_address {
            let address = address.ok_or(Denial::MissingAddress)?;
            self.sessions.verify_with_address(&id, address).await?;
        } else {
            self.sessions.verify(&id).await?;
        }

        if let Rule::Restricted { roles } = &self.rule {
            let roles: Vec<&str> = roles.iter().map(String::as_str).collect();
            self.sessions.check_role(&roles, &id).await?;
        }
        Ok(())
    }

    fn deny(&self) -> Access {
        match &self.rule {
            Rule::Redirect { location } => Access::Redirect(location.clone()),
            Rule::Restricted { .. } | Rule::Validate => Access::Unauthorized,
        }
    }
}
