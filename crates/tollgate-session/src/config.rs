//! Manager configuration and the address provenance policy.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tollgate_hash::{HashStrategy, HashStrength};

// ---------------------------------------------------------------------------
// AddressPolicy
// ---------------------------------------------------------------------------

/// What `verify_with_address` does with an address a session hasn't seen.
///
/// Blocked addresses are rejected under either policy; blocking only ever
/// happens through an explicit `block_address` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressPolicy {
    /// Register the new address as allowed and let the request through.
    Permissive,
    /// Reject the request with `UnknownAddress`.
    Strict,
}

// ---------------------------------------------------------------------------
// ManagerConfig
// ---------------------------------------------------------------------------

/// Settings for one session manager.
///
/// Changes made through the manager's setters apply to sessions created
/// and attempts recorded afterwards. Sessions already in the table keep
/// the expiry they were given, and running lockout timers keep their
/// original duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// How long a session lives after creation. `None` keeps sessions
    /// until they're removed, like a browser-session cookie.
    pub session_lifetime: Option<Duration>,

    /// Failed attempts allowed before the session is locked.
    pub max_login_attempts: u32,

    /// How long a lockout lasts.
    pub lockout_duration: Duration,

    /// Strategy used by `hash_password` / `check_password`.
    pub hash_strategy: HashStrategy,

    /// Work factor or rounds for `hash_strategy`.
    pub hash_strength: HashStrength,

    /// How unseen request addresses are treated.
    pub address_policy: AddressPolicy,

    /// How often the control loop sweeps expired sessions out.
    pub sweep_interval: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            session_lifetime: None,
            max_login_attempts: 5,
            lockout_duration: Duration::from_secs(5 * 60),
            hash_strategy: HashStrategy::default(),
            hash_strength: HashStrength::default(),
            address_policy: AddressPolicy::Strict,
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl ManagerConfig {
    pub const MIN_SESSION_LIFETIME: Duration = Duration::from_secs(1);
    pub const MAX_SESSION_LIFETIME: Duration = Duration::from_secs(365 * 24 * 60 * 60);
    pub const MAX_LOGIN_ATTEMPTS: u32 = 1_000;
    pub const MIN_LOCKOUT: Duration = Duration::from_secs(1);
    pub const MAX_LOCKOUT: Duration = Duration::from_secs(24 * 60 * 60);
    pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);
    pub const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

    /// Clamps every out-of-range field so the config is safe to run with.
    ///
    /// Called when a manager is spawned or restored. Each adjustment is
    /// logged as a warning.
    pub fn validated(mut self) -> Self {
        let (lifetime, note) = clamp_lifetime(self.session_lifetime);
        self.session_lifetime = lifetime;
        warn_adjusted(note);

        let (attempts, note) = clamp_attempts(self.max_login_attempts);
        self.max_login_attempts = attempts;
        warn_adjusted(note);

        let (lockout, note) = clamp_lockout(self.lockout_duration);
        self.lockout_duration = lockout;
        warn_adjusted(note);

        let (sweep, note) = clamp_duration(
            "sweep_interval",
            self.sweep_interval,
            Self::MIN_SWEEP_INTERVAL,
            Self::MAX_SWEEP_INTERVAL,
        );
        self.sweep_interval = sweep;
        warn_adjusted(note);

        self
    }
}

fn warn_adjusted(note: Option<String>) {
    if let Some(note) = note {
        tracing::warn!("{note}");
    }
}

// ---------------------------------------------------------------------------
// Clamp helpers
//
// Each returns the value to apply plus, when it had to change the input, a
// message describing the change. Setters hand that message back to the
// caller as `InvalidConfiguration`.
// ---------------------------------------------------------------------------

pub(crate) fn clamp_lifetime(value: Option<Duration>) -> (Option<Duration>, Option<String>) {
    match value {
        None => (None, None),
        Some(d) => {
            let (d, note) = clamp_duration(
                "session_lifetime",
                d,
                ManagerConfig::MIN_SESSION_LIFETIME,
                ManagerConfig::MAX_SESSION_LIFETIME,
            );
            (Some(d), note)
        }
    }
}

pub(crate) fn clamp_attempts(value: u32) -> (u32, Option<String>) {
    let clamped = value.clamp(1, ManagerConfig::MAX_LOGIN_ATTEMPTS);
    let note = (clamped != value).then(|| {
        format!(
            "max_login_attempts must be within 1..={}; set to {clamped} (requested {value})",
            ManagerConfig::MAX_LOGIN_ATTEMPTS
        )
    });
    (clamped, note)
}

pub(crate) fn clamp_lockout(value: Duration) -> (Duration, Option<String>) {
    clamp_duration(
        "lockout_duration",
        value,
        ManagerConfig::MIN_LOCKOUT,
        ManagerConfig::MAX_LOCKOUT,
    )
}

pub(crate) fn clamp_strength(value: u32) -> (HashStrength, Option<String>) {
    let clamped = HashStrength::saturating(value);
    let note = (clamped.get() != value).then(|| {
        format!(
            "hash_strength must be within {}..={}; set to {clamped} (requested {value})",
            HashStrength::MIN,
            HashStrength::MAX
        )
    });
    (clamped, note)
}

fn clamp_duration(
    field: &str,
    value: Duration,
    min: Duration,
    max: Duration,
) -> (Duration, Option<String>) {
    let clamped = value.clamp(min, max);
    let note = (clamped != value).then(|| {
        format!("{field} must be within {min:?}..={max:?}; set to {clamped:?} (requested {value:?})")
    });
    (clamped, note)
}
