//! Hashing and comparison.
//!
//! Digest layout per strategy:
//!
//! ```text
//! Bcrypt          : the bcrypt modular-crypt string ("$2b$10$...") as bytes
//! Sha256 / Sha512 : [rounds: u32 big-endian][raw digest bytes]
//! ```
//!
//! Digest strategies carry their round count so [`compare`] can re-hash
//! without being told the strength that was in force at hashing time.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Sha256, Sha512};
use subtle::ConstantTimeEq;

use crate::{HashError, HashStrategy, HashStrength};

/// Size of the round-count header on digest-strategy output.
const ROUNDS_HEADER: usize = 4;

/// Bcrypt only reads this many bytes of a secret; the rest would be
/// silently ignored.
pub const BCRYPT_MAX_SECRET: usize = 72;

// ---------------------------------------------------------------------------
// Digest
// ---------------------------------------------------------------------------

/// An opaque stored credential.
///
/// Never compare two `Digest`s with `==` to check a password; use
/// [`compare`], which re-derives and compares in constant time.
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Digest(Vec<u8>);

impl Digest {
    /// Wraps bytes loaded from storage.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({} bytes)", self.0.len())
    }
}

// ---------------------------------------------------------------------------
// CredentialHasher
// ---------------------------------------------------------------------------

/// A strategy and strength bundled together.
///
/// The session manager hands one of these to a blocking task whenever a
/// password needs hashing, so the work never runs on its control loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CredentialHasher {
    pub strategy: HashStrategy,
    pub strength: HashStrength,
}

impl CredentialHasher {
    pub fn new(strategy: HashStrategy, strength: HashStrength) -> Self {
        Self { strategy, strength }
    }

    pub fn hash(&self, secret: &str) -> Result<Digest, HashError> {
        hash(secret, self.strategy, self.strength)
    }

    pub fn compare(&self, secret: &str, digest: &Digest) -> Result<(), HashError> {
        compare(secret, digest, self.strategy)
    }
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Hashes `secret` with the given strategy.
///
/// # Errors
/// - [`HashError::SecretTooLong`]: bcrypt with a secret over
///   [`BCRYPT_MAX_SECRET`] bytes
/// - [`HashError::Bcrypt`]: bcrypt rejected the input
pub fn hash(
    secret: &str,
    strategy: HashStrategy,
    strength: HashStrength,
) -> Result<Digest, HashError> {
    let bytes = match strategy {
        HashStrategy::Bcrypt => {
            if secret.len() > BCRYPT_MAX_SECRET {
                return Err(HashError::SecretTooLong {
                    len: secret.len(),
                    max: BCRYPT_MAX_SECRET,
                });
            }
            bcrypt::hash(secret, strength.get())?.into_bytes()
        }
        HashStrategy::Sha256 => framed::<Sha256>(secret.as_bytes(), strength.get()),
        HashStrategy::Sha512 => framed::<Sha512>(secret.as_bytes(), strength.get()),
    };
    tracing::trace!(%strategy, %strength, "credential hashed");
    Ok(Digest(bytes))
}

/// Checks `secret` against a digest previously produced by [`hash`].
///
/// # Errors
/// - [`HashError::PasswordMismatch`]: wrong secret, including a bcrypt
///   secret too long to have been hashed
/// - [`HashError::MalformedDigest`]: the digest wasn't made by `strategy`
pub fn compare(secret: &str, digest: &Digest, strategy: HashStrategy) -> Result<(), HashError> {
    let matched = match strategy {
        // `hash` refuses these, so no stored digest can belong to one.
        HashStrategy::Bcrypt if secret.len() > BCRYPT_MAX_SECRET => false,
        HashStrategy::Bcrypt => {
            let encoded = std::str::from_utf8(digest.as_bytes())
                .map_err(|_| HashError::MalformedDigest(strategy))?;
            // bcrypt's verifier does its own constant-time comparison.
            bcrypt::verify(secret, encoded).map_err(|err| {
                tracing::debug!(error = %err, "stored bcrypt digest rejected");
                HashError::MalformedDigest(strategy)
            })?
        }
        HashStrategy::Sha256 => reframe_matches::<Sha256>(secret, digest, strategy)?,
        HashStrategy::Sha512 => reframe_matches::<Sha512>(secret, digest, strategy)?,
    };

    if matched {
        Ok(())
    } else {
        Err(HashError::PasswordMismatch)
    }
}

/// Applies `D` to `secret` `rounds` times and prefixes the round count.
fn framed<D: sha2::Digest>(secret: &[u8], rounds: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(ROUNDS_HEADER + <D as sha2::Digest>::output_size());
    out.extend_from_slice(&rounds.to_be_bytes());
    out.extend_from_slice(&iterate::<D>(secret, rounds));
    out
}

fn iterate<D: sha2::Digest>(secret: &[u8], rounds: u32) -> Vec<u8> {
    let mut current = D::digest(secret);
    for _ in 1..rounds {
        current = D::digest(&current);
    }
    current.to_vec()
}

/// Recomputes a framed digest for `secret` and compares in constant time.
fn reframe_matches<D: sha2::Digest>(
    secret: &str,
    digest: &Digest,
    strategy: HashStrategy,
) -> Result<bool, HashError> {
    let bytes = digest.as_bytes();
    if bytes.len() != ROUNDS_HEADER + <D as sha2::Digest>::output_size() {
        return Err(HashError::MalformedDigest(strategy));
    }
    let (header, stored) = bytes.split_at(ROUNDS_HEADER);
    let rounds = u32::from_be_bytes(
        header
            .try_into()
            .map_err(|_| HashError::MalformedDigest(strategy))?,
    );
    if HashStrength::new(rounds).is_err() {
        return Err(HashError::MalformedDigest(strategy));
    }

    let candidate = iterate::<D>(secret.as_bytes(), rounds);
    Ok(candidate.ct_eq(stored).into())
}
