//! Reusable hashing parameters, and verification of untrusted hashes.

use super::{
    check, format, generate_salt, hash_password, parse, requires_rehash, RehashResult,
    ShaCryptError, Variant, ROUNDS_DEFAULT, ROUNDS_MAX, SALT_LENGTH_MAX, SALT_LENGTH_MIN,
};
use crate::NatronError;

/// Parameters for computing new password hashes.
///
/// The default configuration uses SHA-512-crypt with [`ROUNDS_DEFAULT`] rounds and a salt of
/// [`SALT_LENGTH_MAX`] characters, which matches what `crypt()` produces for a `$6$` hash with no
/// explicit round count. With the `use-serde` feature, missing fields take their default value
/// when deserialising.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(
    feature = "use-serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct HashConfig {
    /// The variant to hash with.
    pub variant: Variant,

    /// The number of rounds, between [`ROUNDS_MIN`](super::ROUNDS_MIN) and [`ROUNDS_MAX`].
    pub rounds: u32,

    /// The length of newly generated salts, between [`SALT_LENGTH_MIN`] and [`SALT_LENGTH_MAX`].
    pub salt_length: usize,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            variant: Variant::Sha512,
            rounds: ROUNDS_DEFAULT,
            salt_length: SALT_LENGTH_MAX,
        }
    }
}

impl HashConfig {
    /// Check the round count and salt length are within range.
    pub fn validate(&self) -> Result<(), NatronError> {
        format::validate_rounds(self.rounds)?;
        if !(SALT_LENGTH_MIN..=SALT_LENGTH_MAX).contains(&self.salt_length) {
            return Err(ShaCryptError::InvalidSalt.into());
        }

        Ok(())
    }

    /// Hash `password` with a freshly generated salt, returning the full hash string.
    pub fn hash(&self, password: impl AsRef<[u8]>) -> Result<String, NatronError> {
        self.validate()?;

        let salt = generate_salt(self.salt_length)?;
        hash_password(password, &salt, self.rounds, self.variant)
    }

    /// Determine if `hash` was computed with this configuration's variant and round count.
    ///
    /// See [`requires_rehash`](super::requires_rehash).
    pub fn requires_rehash(&self, hash: &str) -> Result<RehashResult, NatronError> {
        requires_rehash(hash, self.variant, self.rounds)
    }
}

/// Verifies passwords against hashes which may come from an untrusted source.
///
/// The round count of a hash string decides how long it takes to verify. A `Verifier` rejects
/// hashes with more than `max_rounds` rounds with [`ShaCryptError::RoundsLimitExceeded`], before
/// doing any hashing.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(
    feature = "use-serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct Verifier {
    /// The largest round count which will be verified.
    pub max_rounds: u32,
}

impl Default for Verifier {
    fn default() -> Self {
        Self {
            max_rounds: ROUNDS_MAX,
        }
    }
}

impl Verifier {
    /// Create a new verifier which accepts at most `max_rounds` rounds.
    pub fn new(max_rounds: u32) -> Self {
        Self { max_rounds }
    }

    /// Verify `password` matches the provided `hash`.
    ///
    /// This is the same as [`verify_password`](super::verify_password), except that hashes with
    /// more than `max_rounds` rounds are rejected.
    pub fn verify(&self, password: impl AsRef<[u8]>, hash: &str) -> Result<(), NatronError> {
        let hash = parse(hash)?;

        if hash.rounds() > self.max_rounds {
            tracing::warn!(
                rounds = hash.rounds(),
                max_rounds = self.max_rounds,
                "refusing to verify SHA-crypt hash with too many rounds"
            );
            return Err(ShaCryptError::RoundsLimitExceeded.into());
        }

        check(password.as_ref(), &hash)
    }
}
