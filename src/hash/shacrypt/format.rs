//! The textual `$id$[rounds=N$]salt$digest` form of a SHA-crypt hash.

use super::{
    encode, ShaCryptError, Variant, ROUNDS_DEFAULT, ROUNDS_MAX, ROUNDS_MIN, ROUNDS_PREFIX,
    SALT_LENGTH_MAX, SALT_LENGTH_MIN,
};
use core::fmt;
use core::str::FromStr;

/// A parsed SHA-crypt hash string.
///
/// Parsing checks every field: the variant identifier, the round count, the salt, and the length
/// and alphabet of the encoded digest. A `HashString` which parsed successfully may still not
/// match any particular password, that is only checked by
/// [`verify_password`](super::verify_password).
///
/// The [`Display`](fmt::Display) implementation produces the canonical form: the `rounds=` field
/// is written only if the round count differs from [`ROUNDS_DEFAULT`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HashString {
    variant: Variant,
    rounds: u32,
    salt: String,
    digest: String,
}

impl HashString {
    pub(super) fn from_parts(variant: Variant, rounds: u32, salt: String, digest: String) -> Self {
        Self {
            variant,
            rounds,
            salt,
            digest,
        }
    }

    /// The variant this hash was computed with.
    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// The number of rounds this hash was computed with.
    ///
    /// This is [`ROUNDS_DEFAULT`] if the hash string had no `rounds=` field.
    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    /// The salt this hash was computed with.
    pub fn salt(&self) -> &str {
        &self.salt
    }

    /// The encoded digest.
    pub fn digest(&self) -> &str {
        &self.digest
    }
}

impl FromStr for HashString {
    type Err = ShaCryptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s.strip_prefix('$').ok_or(ShaCryptError::MalformedHash)?;
        let (identifier, rest) = rest.split_once('$').ok_or(ShaCryptError::MalformedHash)?;
        let variant =
            Variant::from_identifier(identifier).ok_or(ShaCryptError::UnsupportedVariant)?;

        let (rounds, rest) = match rest.strip_prefix(ROUNDS_PREFIX) {
            Some(rest) => {
                let (rounds, rest) = rest.split_once('$').ok_or(ShaCryptError::MalformedHash)?;
                (parse_rounds(rounds)?, rest)
            }
            None => (ROUNDS_DEFAULT, rest),
        };

        let (salt, digest) = rest.split_once('$').ok_or(ShaCryptError::MalformedHash)?;
        validate_salt(salt.as_bytes())?;
        encode::decode(digest, variant)?;

        Ok(Self::from_parts(
            variant,
            rounds,
            salt.to_owned(),
            digest.to_owned(),
        ))
    }
}

impl fmt::Display for HashString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}$", self.variant.identifier())?;
        if self.rounds != ROUNDS_DEFAULT {
            write!(f, "{}{}$", ROUNDS_PREFIX, self.rounds)?;
        }
        write!(f, "{}${}", self.salt, self.digest)
    }
}

/// Parse the value of a `rounds=` field. Only ASCII digits are accepted, so signs and whitespace
/// are rejected rather than skipped.
fn parse_rounds(field: &str) -> Result<u32, ShaCryptError> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ShaCryptError::InvalidRounds);
    }

    let rounds = field
        .parse::<u32>()
        .map_err(|_| ShaCryptError::InvalidRounds)?;
    validate_rounds(rounds)?;

    Ok(rounds)
}

/// Check `salt` is between [`SALT_LENGTH_MIN`] and [`SALT_LENGTH_MAX`] bytes long, and only uses
/// characters from `[A-Za-z0-9./]`.
pub(super) fn validate_salt(salt: &[u8]) -> Result<(), ShaCryptError> {
    if !(SALT_LENGTH_MIN..=SALT_LENGTH_MAX).contains(&salt.len())
        || !salt.iter().all(|&c| encode::in_alphabet(c))
    {
        return Err(ShaCryptError::InvalidSalt);
    }

    Ok(())
}

/// Check `rounds` is between [`ROUNDS_MIN`] and [`ROUNDS_MAX`].
pub(super) fn validate_rounds(rounds: u32) -> Result<(), ShaCryptError> {
    if !(ROUNDS_MIN..=ROUNDS_MAX).contains(&rounds) {
        return Err(ShaCryptError::InvalidRounds);
    }

    Ok(())
}
