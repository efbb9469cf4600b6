//! crypt(3)-compatible password hashing (SHA-256-crypt and SHA-512-crypt)
//!
//! This module computes and verifies password hashes in the `$5$...` and `$6$...` formats
//! understood by glibc's `crypt()` function, and found in `/etc/shadow` on most Linux
//! distributions. The construction is described in [Ulrich Drepper's
//! specification](https://www.akkadia.org/drepper/SHA-crypt.txt).
//!
//! A hash string has the form `$id$[rounds=N$]salt$digest`:
//! * `id` is `5` for SHA-256-crypt ([`Variant::Sha256`]) or `6` for SHA-512-crypt
//!   ([`Variant::Sha512`])
//! * `N` is the number of rounds, between [`ROUNDS_MIN`] and [`ROUNDS_MAX`]. The field is omitted
//!   when the round count is [`ROUNDS_DEFAULT`]
//! * `salt` is between [`SALT_LENGTH_MIN`] and [`SALT_LENGTH_MAX`] characters from
//!   `[A-Za-z0-9./]`
//! * `digest` is the derived digest, in `crypt`'s own flavour of Base64: 43 characters for
//!   SHA-256-crypt, 86 for SHA-512-crypt
//!
//! # Algorithm Details
//! SHA-crypt repeatedly mixes the password and salt into a [SHA-2](crate::hash::sha2) digest,
//! once for every round. Unlike Argon2 or scrypt it is not memory-hard, so it offers much less
//! protection against GPU or ASIC based brute force attacks. Its advantage is compatibility: every
//! glibc-based system can check these hashes. Prefer a memory-hard function for new systems which
//! don't need to interoperate with `crypt()`.
//!
//! # Choosing the Number of Rounds
//! The round count is the only cost parameter. [`ROUNDS_DEFAULT`] (5000) is what `crypt()` uses
//! when no count is given, and is low by current standards: pick the largest count which still
//! hashes in an acceptable time on your hardware (for online logins, a few hundred milliseconds).
//! [`requires_rehash`] can be used to upgrade old hashes to a new round count as users log in.
//!
//! # Security Considerations
//! The round count in a stored hash is used as-is when verifying it. If hashes can come from an
//! untrusted source, a very large count makes verification arbitrarily slow: use a [`Verifier`]
//! with a suitable `max_rounds` to reject such hashes before any work is done.
//!
//! [`verify_password`] compares the recomputed hash with the stored one in constant time, using
//! [`mem::eq`](crate::mem::eq). Don't compare hash strings yourself with `==`.
//!
//! Salts must be random and unique per password. [`generate_salt`] produces a suitable salt using
//! Sodium's CSPRNG, and [`HashConfig::hash`] does this for you.
//!
//! # Examples
//! A user authentication flow using [`HashConfig`] and [`verify_password`]:
//!
//! ```rust
//! use natron::hash::shacrypt::{verify_password, HashConfig, ShaCryptError};
//! use natron::NatronError;
//! # fn store_details_in_db(_username: &str, _passwd_hash: &str) {}
//!
//! /// Creates a new user account with the specified username and password
//! fn create_user_account(username: &str, passwd: &str) {
//!     let config = HashConfig {
//!         rounds: 10_000,
//!         ..Default::default()
//!     };
//!     let hash = config.hash(passwd).unwrap();
//!
//!     store_details_in_db(username, &hash);
//! }
//!
//! # fn retrieve_passwd_hash_from_db(_username: &str) -> &'static str {
//! #     "$6$rounds=10000$saltstringsaltst$OW1/O6BYHV6BcXZu8QVeXbDWra3Oeqh0sbHbbMCVNSnCM/UrjmM0Dp8vOuZeH\
//! #     By/YTBmSK6H9qs/y3RnOaw5v."
//! # }
//! /// Tries to log in a user with the given username and password
//! fn log_in(username: &str, passwd: &str) -> bool {
//!     let hash = retrieve_passwd_hash_from_db(username);
//!
//!     match verify_password(passwd, hash) {
//!         Ok(_) => true,
//!         Err(NatronError::ShaCryptError(ShaCryptError::Mismatch)) => false,
//!         Err(_) => panic!("some other error occurred"),
//!     }
//! }
//! # create_user_account("some_dude", "Hello world!");
//! # assert!(log_in("some_dude", "Hello world!"));
//! # assert!(!log_in("some_dude", "hunter2"));
//! ```
//!
//! Hashing with a known salt (using [`hash_password`]):
//!
//! ```rust
//! use natron::hash::shacrypt::{hash_password, Variant, ROUNDS_DEFAULT};
//!
//! let hash = hash_password("Hello world!", "saltstring", ROUNDS_DEFAULT, Variant::Sha256).unwrap();
//! assert_eq!(hash, "$5$saltstring$5B8vYYiY.CVt1RlTTf8KbXBH3hsxY/GNooZaBBGWEc5");
//! ```
//!
//! A shadow-file style example is available in
//! [`demos/shadow-entry.rs`](https://github.com/tom25519/natron/blob/main/demos/shadow-entry.rs).

use crate::hash::sha2::{self, DigestEngine};
use crate::{mem, random, NatronError};
use rand_core::{CryptoRng, RngCore};
use thiserror::Error;

mod config;
mod derive;
mod encode;
mod format;
mod sequence;

pub use config::{HashConfig, Verifier};
pub use format::HashString;

/// The minimum length of a salt, in characters.
pub const SALT_LENGTH_MIN: usize = 1;

/// The maximum length of a salt, in characters.
///
/// Longer salts are rejected, not truncated.
pub const SALT_LENGTH_MAX: usize = 16;

/// The minimum number of rounds.
pub const ROUNDS_MIN: u32 = 1000;

/// The maximum number of rounds.
pub const ROUNDS_MAX: u32 = 999_999_999;

/// The number of rounds used when a hash string has no `rounds=` field.
pub const ROUNDS_DEFAULT: u32 = 5000;

/// Introduces the optional round count field in a hash string.
const ROUNDS_PREFIX: &str = "rounds=";

/// Error type returned if something went wrong in the shacrypt module.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum ShaCryptError {
    /// The salt was too short or too long, or contained a character outside `[A-Za-z0-9./]`.
    ///
    /// Salts must be at least [`SALT_LENGTH_MIN`] and at most [`SALT_LENGTH_MAX`] characters.
    #[error("salt length or characters invalid")]
    InvalidSalt,

    /// The number of rounds was smaller than [`ROUNDS_MIN`] or greater than [`ROUNDS_MAX`], or the
    /// `rounds=` field of a hash string was not a decimal number.
    #[error("number of rounds outside acceptable range")]
    InvalidRounds,

    /// The hash string identifies an algorithm other than `5` (SHA-256-crypt) or `6`
    /// (SHA-512-crypt), or the wrong one of the two for a variant-specific module.
    #[error("unsupported hash algorithm identifier")]
    UnsupportedVariant,

    /// The hash string is not of the form `$id$[rounds=N$]salt$digest`, or its digest has the
    /// wrong length or contains invalid characters.
    #[error("malformed hash string")]
    MalformedHash,

    /// The password verification against the provided hash failed.
    ///
    /// The hash string was well-formed, but the password was incorrect for it.
    #[error("the password was incorrect for this hash")]
    Mismatch,

    /// The hash uses more rounds than the [`Verifier`] allows.
    #[error("number of rounds exceeds the configured limit")]
    RoundsLimitExceeded,
}

/// Possible results of [`requires_rehash`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RehashResult {
    /// The parameters of the hash match, a rehash is not required.
    ParametersMatch,

    /// The hash appears to be in the correct format, but the variant or the number of rounds
    /// differs from those specified.
    ///
    /// You may wish to compute a new hash the next time the user logs in.
    ParametersDiffer,

    /// The hash is not in the correct format.
    ///
    /// You may wish to compute a new hash the next time the user logs in.
    InvalidHash,
}

/// The SHA-crypt variants.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(
    feature = "use-serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum Variant {
    /// SHA-256-crypt, identified by `$5$`.
    Sha256,

    /// SHA-512-crypt, identified by `$6$`.
    Sha512,
}

impl Variant {
    /// The identifier between the first two `$` of a hash string for this variant.
    pub const fn identifier(self) -> &'static str {
        match self {
            Variant::Sha256 => "5",
            Variant::Sha512 => "6",
        }
    }

    /// Look up a variant by its hash string identifier.
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        match identifier {
            "5" => Some(Variant::Sha256),
            "6" => Some(Variant::Sha512),
            _ => None,
        }
    }

    /// The length of the raw digest for this variant, in bytes.
    pub const fn digest_length(self) -> usize {
        match self {
            Variant::Sha256 => sha2::sha256::DIGEST_LENGTH,
            Variant::Sha512 => sha2::sha512::DIGEST_LENGTH,
        }
    }

    /// The length of the encoded digest field of a hash string for this variant, in characters.
    pub const fn encoded_length(self) -> usize {
        (self.digest_length() * 4 + 2) / 3
    }
}

/// Run the derivation with the engine `E` and encode the result.
fn derive_encoded<E: DigestEngine>(
    password: &[u8],
    salt: &[u8],
    rounds: u32,
    variant: Variant,
) -> Result<String, NatronError>
where
    E::Digest: AsMut<[u8]>,
{
    let mut digest = derive::derive::<E>(password, salt, rounds)?;
    let encoded = encode::encode(digest.as_ref(), variant);
    mem::clear(digest.as_mut())?;

    Ok(encoded)
}

/// Compute the hash of `password` with parameters which have already been validated.
fn compute(
    password: &[u8],
    salt: &str,
    rounds: u32,
    variant: Variant,
) -> Result<HashString, NatronError> {
    tracing::trace!(?variant, rounds, salt_len = salt.len(), "computing SHA-crypt hash");

    let digest = match variant {
        Variant::Sha256 => {
            derive_encoded::<sha2::sha256::Multipart>(password, salt.as_bytes(), rounds, variant)?
        }
        Variant::Sha512 => {
            derive_encoded::<sha2::sha512::Multipart>(password, salt.as_bytes(), rounds, variant)?
        }
    };

    Ok(HashString::from_parts(
        variant,
        rounds,
        salt.to_owned(),
        digest,
    ))
}

/// Parse `hash`, logging the reason if it is rejected.
fn parse(hash: &str) -> Result<HashString, NatronError> {
    hash.parse::<HashString>().map_err(|error| {
        tracing::debug!(%error, "rejected SHA-crypt hash string");
        NatronError::from(error)
    })
}

/// Recompute `expected` for `password`, and compare the two canonical hash strings in constant
/// time.
fn check(password: &[u8], expected: &HashString) -> Result<(), NatronError> {
    let actual = compute(
        password,
        expected.salt(),
        expected.rounds(),
        expected.variant(),
    )?;

    if mem::eq(
        expected.to_string().as_bytes(),
        actual.to_string().as_bytes(),
    )? {
        Ok(())
    } else {
        tracing::debug!(variant = ?expected.variant(), "password does not match hash");
        Err(ShaCryptError::Mismatch.into())
    }
}

fn validate_salt_length(len: usize) -> Result<(), NatronError> {
    if !(SALT_LENGTH_MIN..=SALT_LENGTH_MAX).contains(&len) {
        return Err(ShaCryptError::InvalidSalt.into());
    }

    Ok(())
}

/// Generate a random salt of `len` characters, using Sodium's CSPRNG.
///
/// `len` must be between [`SALT_LENGTH_MIN`] and [`SALT_LENGTH_MAX`]. Each character is chosen
/// uniformly from `[A-Za-z0-9./]`, so a salt of [`SALT_LENGTH_MAX`] characters carries 96 bits of
/// randomness.
pub fn generate_salt(len: usize) -> Result<String, NatronError> {
    validate_salt_length(len)?;

    (0..len)
        .map(|_| {
            random::random_u32_in_range(0, encode::ALPHABET.len() as u32)
                .map(|i| char::from(encode::ALPHABET[i as usize]))
        })
        .collect()
}

/// Generate a random salt of `len` characters, using the provided random number generator.
///
/// This is the same as [`generate_salt`], but draws randomness from `rng` rather than from Sodium.
pub fn generate_salt_with<R: RngCore + CryptoRng>(
    rng: &mut R,
    len: usize,
) -> Result<String, NatronError> {
    validate_salt_length(len)?;

    // The alphabet has exactly 64 characters, so the top 6 bits of each output are a uniform
    // index.
    Ok((0..len)
        .map(|_| char::from(encode::ALPHABET[(rng.next_u32() >> 26) as usize]))
        .collect())
}

/// Hash a password, for storage and later identity verification.
///
/// The first argument to this function is the password from which the hash will be calculated.
/// Any byte sequence is accepted, including the empty password.
///
/// `salt` must be between [`SALT_LENGTH_MIN`] and [`SALT_LENGTH_MAX`] characters from
/// `[A-Za-z0-9./]`, and should be randomly generated for each password (see [`generate_salt`]).
/// `rounds` must be between [`ROUNDS_MIN`] and [`ROUNDS_MAX`]. Both are checked before any hashing
/// is done.
///
/// If hashing is successful, the full hash string is returned. This entire string should be
/// stored, and can later be used with [`verify_password`] to verify the password. The `rounds=`
/// field is omitted if `rounds` is [`ROUNDS_DEFAULT`].
pub fn hash_password(
    password: impl AsRef<[u8]>,
    salt: &str,
    rounds: u32,
    variant: Variant,
) -> Result<String, NatronError> {
    format::validate_salt(salt.as_bytes())?;
    format::validate_rounds(rounds)?;

    compute(password.as_ref(), salt, rounds, variant).map(|hash| hash.to_string())
}

/// Verify `password` matches the provided `hash`.
///
/// The variant, salt and number of rounds are all read from `hash`. Returns `Ok(())` if
/// `password` is correct, [`ShaCryptError::Mismatch`] if it is not, or another
/// [`ShaCryptError`] if `hash` could not be parsed.
///
/// `hash` is trusted to carry a reasonable round count. Use a [`Verifier`] to verify hashes from
/// an untrusted source.
pub fn verify_password(password: impl AsRef<[u8]>, hash: &str) -> Result<(), NatronError> {
    let hash = parse(hash)?;
    check(password.as_ref(), &hash)
}

/// Determine if `hash` is a valid hash string for the given `variant` and number of `rounds`.
///
/// This function is intended to be used if you update the variant or the number of rounds used to
/// store passwords. As users log in, if the password hash needs updating (as determined using this
/// function), then the hash can be recalculated.
///
/// Returns [`RehashResult::ParametersMatch`] if the hash is well-formed and uses the given
/// parameters, [`RehashResult::ParametersDiffer`] if it is well-formed but uses different ones,
/// and [`RehashResult::InvalidHash`] if it could not be parsed. Fails with
/// [`ShaCryptError::InvalidRounds`] if `rounds` itself is out of range.
pub fn requires_rehash(
    hash: &str,
    variant: Variant,
    rounds: u32,
) -> Result<RehashResult, NatronError> {
    format::validate_rounds(rounds)?;

    match hash.parse::<HashString>() {
        Ok(hash) if hash.variant() == variant && hash.rounds() == rounds => {
            Ok(RehashResult::ParametersMatch)
        }
        Ok(_) => Ok(RehashResult::ParametersDiffer),
        Err(_) => Ok(RehashResult::InvalidHash),
    }
}

/// Generates the API for a variant-specific `shacrypt` module.
macro_rules! shacrypt_module {
    ($variant:expr) => {
        use $crate::hash::shacrypt::{self, RehashResult, ShaCryptError, Variant};
        use $crate::NatronError;

        /// The variant implemented by this module.
        pub const VARIANT: Variant = $variant;

        /// The length of the digest field of a hash string for this variant, in characters.
        pub const DIGEST_ENCODED_LENGTH: usize = VARIANT.encoded_length();

        /// Hash a password with this variant.
        ///
        /// See [`shacrypt::hash_password`].
        pub fn hash_password(
            password: impl AsRef<[u8]>,
            salt: &str,
            rounds: u32,
        ) -> Result<String, NatronError> {
            shacrypt::hash_password(password, salt, rounds, VARIANT)
        }

        /// Verify `password` matches the provided `hash`.
        ///
        /// This is the same as [`shacrypt::verify_password`], except that a well-formed hash of
        /// any other variant is rejected with [`ShaCryptError::UnsupportedVariant`].
        pub fn verify_password(password: impl AsRef<[u8]>, hash: &str) -> Result<(), NatronError> {
            let hash = shacrypt::parse(hash)?;
            if hash.variant() != VARIANT {
                return Err(ShaCryptError::UnsupportedVariant.into());
            }

            shacrypt::check(password.as_ref(), &hash)
        }

        /// Determine if `hash` is a valid hash string for this variant with the given number of
        /// `rounds`.
        ///
        /// A hash of any other variant is not in the correct format for this module, so
        /// [`RehashResult::InvalidHash`] is returned for it. See [`shacrypt::requires_rehash`].
        pub fn requires_rehash(hash: &str, rounds: u32) -> Result<RehashResult, NatronError> {
            match hash.parse::<shacrypt::HashString>() {
                Ok(parsed) if parsed.variant() != VARIANT => {
                    shacrypt::format::validate_rounds(rounds)?;
                    Ok(RehashResult::InvalidHash)
                }
                _ => shacrypt::requires_rehash(hash, VARIANT, rounds),
            }
        }
    };
}

/// Generates tests for a variant-specific `shacrypt` module. Takes test vectors produced with the
/// default formatting as arguments.
#[allow(unused_macros)]
macro_rules! shacrypt_tests {
    ( $( {
        pass: $pass:expr,
        salt: $salt:expr,
        rounds: $rounds:expr,
        hash: $hash:expr,
    }, )* ) => {
        use $crate::hash::shacrypt::{HashConfig, HashString, RehashResult, ShaCryptError};
        use $crate::hash::shacrypt::{ROUNDS_DEFAULT, ROUNDS_MAX, ROUNDS_MIN};
        use $crate::NatronError;
        use super::{hash_password, requires_rehash, verify_password, DIGEST_ENCODED_LENGTH, VARIANT};

        #[test]
        fn hash_test_vectors() -> Result<(), NatronError> {
            $(
                assert_eq!(hash_password($pass, $salt, $rounds)?, $hash);
            )*

            Ok(())
        }

        #[test]
        fn verify_test_vectors() -> Result<(), NatronError> {
            $(
                verify_password($pass, $hash)?;
                assert_eq!(
                    verify_password(b"not the password", $hash),
                    Err(NatronError::ShaCryptError(ShaCryptError::Mismatch)),
                );
            )*

            Ok(())
        }

        #[test]
        fn digest_field_length() -> Result<(), NatronError> {
            $(
                let hash: HashString = $hash.parse()?;
                assert_eq!(hash.digest().len(), DIGEST_ENCODED_LENGTH);
            )*

            Ok(())
        }

        #[test]
        fn truncated_digest_is_malformed() {
            $(
                let truncated = &$hash[..$hash.len() - 1];
                assert_eq!(
                    verify_password($pass, truncated),
                    Err(NatronError::ShaCryptError(ShaCryptError::MalformedHash)),
                );
            )*
        }

        #[test]
        fn round_trip() -> Result<(), NatronError> {
            let passwords: [&[u8]; 4] = [b"", b"a", b"Correct Horse Battery Staple", &[0xff; 200]];

            for password in passwords {
                let config = HashConfig {
                    variant: VARIANT,
                    rounds: ROUNDS_MIN,
                    ..Default::default()
                };
                let hash = config.hash(password)?;
                verify_password(password, &hash)?;
                assert_eq!(
                    verify_password(b"Incorrect Horse Battery Staple", &hash),
                    Err(NatronError::ShaCryptError(ShaCryptError::Mismatch)),
                );
            }

            Ok(())
        }

        #[test]
        fn single_byte_changes_alter_digest() -> Result<(), NatronError> {
            let password = *b"Hello world!";
            let salt = "saltstring";
            let reference: HashString = hash_password(password, salt, ROUNDS_MIN)?.parse()?;

            for i in 0..password.len() {
                let mut changed = password;
                changed[i] ^= 0x01;
                let hash: HashString = hash_password(changed, salt, ROUNDS_MIN)?.parse()?;
                assert_ne!(hash.digest(), reference.digest());
            }

            for i in 0..salt.len() {
                let changed: String = salt
                    .chars()
                    .enumerate()
                    .map(|(j, c)| match (i == j, c) {
                        (true, 'a') => 'b',
                        (true, _) => 'a',
                        (false, c) => c,
                    })
                    .collect();
                let hash: HashString = hash_password(password, &changed, ROUNDS_MIN)?.parse()?;
                assert_ne!(hash.digest(), reference.digest());
            }

            Ok(())
        }

        #[test]
        fn default_rounds_are_omitted() -> Result<(), NatronError> {
            let prefix = format!("${}$", VARIANT.identifier());

            let hash = hash_password("password", "saltstring", ROUNDS_DEFAULT)?;
            assert!(hash.starts_with(&format!("{}saltstring$", prefix)));
            assert!(!hash.contains("rounds="));

            for rounds in [ROUNDS_MIN, ROUNDS_DEFAULT - 1, ROUNDS_DEFAULT + 1] {
                let hash = hash_password("password", "saltstring", rounds)?;
                assert!(hash.starts_with(&format!("{}rounds={}$saltstring$", prefix, rounds)));
            }

            Ok(())
        }

        #[test]
        fn invalid_params() {
            assert_eq!(
                hash_password("password", "saltstring", ROUNDS_MIN - 1),
                Err(NatronError::ShaCryptError(ShaCryptError::InvalidRounds)),
            );
            assert_eq!(
                hash_password("password", "saltstring", ROUNDS_MAX + 1),
                Err(NatronError::ShaCryptError(ShaCryptError::InvalidRounds)),
            );
            assert_eq!(
                hash_password("password", "", ROUNDS_MIN),
                Err(NatronError::ShaCryptError(ShaCryptError::InvalidSalt)),
            );
            assert_eq!(
                hash_password("password", "saltstringsaltstr", ROUNDS_MIN),
                Err(NatronError::ShaCryptError(ShaCryptError::InvalidSalt)),
            );
            assert_eq!(
                hash_password("password", "salt$", ROUNDS_MIN),
                Err(NatronError::ShaCryptError(ShaCryptError::InvalidSalt)),
            );
        }

        #[test]
        fn needs_rehash() -> Result<(), NatronError> {
            let hash = hash_password("password", "saltstring", 2000)?;

            assert_eq!(requires_rehash(&hash, 2000)?, RehashResult::ParametersMatch);
            assert_eq!(requires_rehash(&hash, 4000)?, RehashResult::ParametersDiffer);
            assert_eq!(
                requires_rehash(&hash, ROUNDS_DEFAULT)?,
                RehashResult::ParametersDiffer
            );
            assert_eq!(requires_rehash("not valid", 2000)?, RehashResult::InvalidHash);
            assert_eq!(
                requires_rehash(&hash, ROUNDS_MIN - 1),
                Err(NatronError::ShaCryptError(ShaCryptError::InvalidRounds)),
            );

            Ok(())
        }
    };
}

/// The SHA-256-crypt (`$5$`) variant.
pub mod sha256 {
    shacrypt_module!(Variant::Sha256);

}

/// The SHA-512-crypt (`$6$`) variant.
pub mod sha512 {
    shacrypt_module!(Variant::Sha512);

}
