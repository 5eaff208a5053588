//! Hash strategies and their strength parameter.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::HashError;

// ---------------------------------------------------------------------------
// HashStrategy
// ---------------------------------------------------------------------------

/// The algorithm family used to turn a secret into a stored digest.
///
/// - `Bcrypt` is adaptive and salted; `strength` is its cost factor.
///   Use it for passwords.
/// - `Sha256` / `Sha512` are fast, unsalted digests applied `strength`
///   times in a row. Fine for low-value tokens, not for passwords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashStrategy {
    #[default]
    Bcrypt,
    Sha256,
    Sha512,
}

impl HashStrategy {
    /// Every supported strategy.
    pub const ALL: [HashStrategy; 3] = [Self::Bcrypt, Self::Sha256, Self::Sha512];

    /// The lowercase name used in configuration.
    pub fn name(self) -> &'static str {
        match self {
            Self::Bcrypt => "bcrypt",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    /// Returns `true` for work-factor strategies that salt internally.
    pub fn is_adaptive(self) -> bool {
        matches!(self, Self::Bcrypt)
    }
}

impl fmt::Display for HashStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashStrategy {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| HashError::UnsupportedStrategy(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// HashStrength
// ---------------------------------------------------------------------------

/// Work factor (bcrypt) or repetition rounds (digests).
///
/// Always within [`HashStrength::MIN`]..=[`HashStrength::MAX`]. The lower
/// bound is bcrypt's minimum cost; above the upper bound a single bcrypt
/// hash takes seconds, which would stall a login endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct HashStrength(u32);

impl HashStrength {
    pub const MIN: HashStrength = HashStrength(4);
    pub const MAX: HashStrength = HashStrength(16);

    /// Creates a strength, rejecting out-of-range values.
    ///
    /// # Errors
    /// Returns [`HashError::StrengthOutOfRange`] when `value` is outside
    /// the supported range.
    pub fn new(value: u32) -> Result<Self, HashError> {
        if (Self::MIN.0..=Self::MAX.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(HashError::StrengthOutOfRange {
                requested: value,
                min: Self::MIN.0,
                max: Self::MAX.0,
            })
        }
    }

    /// Creates a strength, clamping out-of-range values to the nearest
    /// bound.
    pub fn saturating(value: u32) -> Self {
        Self(value.clamp(Self::MIN.0, Self::MAX.0))
    }

    /// Returns the raw value.
    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for HashStrength {
    fn default() -> Self {
        Self(10)
    }
}

impl TryFrom<u32> for HashStrength {
    type Error = HashError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<HashStrength> for u32 {
    fn from(strength: HashStrength) -> Self {
        strength.0
    }
}

impl fmt::Display for HashStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
