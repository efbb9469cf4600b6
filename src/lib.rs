//! crypt(3)-compatible SHA-256-crypt and SHA-512-crypt password hashing, built on
//! [Sodium](https://libsodium.org).
//!
//! Many Unix-like systems store password hashes in the format produced by glibc's `crypt()`
//! function, in particular the `$5$` (SHA-256-crypt) and `$6$` (SHA-512-crypt) schemes described
//! in [Ulrich Drepper's specification](https://www.akkadia.org/drepper/SHA-crypt.txt). This crate
//! computes and verifies hashes in that format, so that applications can check passwords against
//! an existing `/etc/shadow`-style database, or migrate such a database to a different scheme.
//!
//! The underlying SHA-2 hash functions are provided by Sodium, and are not reimplemented here.
//! The SHA-crypt construction itself (the repeated mixing of password and salt material, and the
//! custom Base64 encoding of the output) is implemented in the [`hash::shacrypt`] module.
//!
//! # Which API Should I Use?
//! I want to...
//! * Check a password against an existing `$5$...` or `$6$...` hash
//!     * Use [`hash::shacrypt::verify_password`]
//! * Store a new password in a format `crypt()` understands
//!     * Use [`hash::shacrypt::HashConfig`], or [`hash::shacrypt::hash_password`] if you already
//!       have a salt
//! * Upgrade old hashes to a higher round count as users log in
//!     * Use [`hash::shacrypt::requires_rehash`]
//! * Hash some data with plain SHA-256/SHA-512
//!     * Use [`hash::sha2`]
//!
//! For new applications which don't need `crypt()` compatibility, a memory-hard password hash
//! such as Argon2id is a much better choice than SHA-crypt.
//!
//! # Logging
//! This crate emits [`tracing`](https://docs.rs/tracing) events at the `trace`/`debug`/`warn`
//! levels. Passwords, salts and hash strings are never included in these events. No subscriber is
//! installed by the library itself.

use libsodium_sys as sodium;
use thiserror::Error;

pub mod hash;
pub mod mem;
pub mod random;

/// General error type used in natron.
///
/// This type is returned by functions which can possibly fail throughout natron.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum NatronError {
    /// Failed to initialise Sodium.
    ///
    /// This corresponds to a call to `sodium_init` returning -1, indicating initialisation
    /// failure. In such a case, Sodium is unsafe to use.
    #[error("failed to initialise libsodium")]
    SodiumInitFailed,

    /// Memory management error.
    ///
    /// Sodium's allocator failed to allocate the memory required for a hash state.
    #[error("memory management error")]
    MemoryManagement,

    /// An error occurred in the [`hash::shacrypt`] module.
    #[error("SHA-crypt error: {0}")]
    ShaCryptError(#[from] hash::shacrypt::ShaCryptError),

    /// An error occurred in the [`random`] module.
    #[error("PRNG error: {0}")]
    RandomError(#[from] random::RandomError),
}

/// Panic with a message naming a Sodium function which returned an error code that should be
/// impossible.
macro_rules! unexpected_err {
    ($func:expr) => {
        panic!(
            "{} returned an unexpected error, this is a bug in natron or Sodium",
            $func
        )
    };
}

pub(crate) use unexpected_err;

/// Panic via [`unexpected_err`] if `$result` (the return value of a Sodium function) is not `0`.
macro_rules! assert_not_err {
    ($result:expr, $func:expr) => {
        if $result != 0 {
            $crate::unexpected_err!($func);
        }
    };
}

pub(crate) use assert_not_err;

/// Attempt to initialise Sodium.
///
/// This function should be called in any scenario where a function from Sodium will be used
/// internally. Returns `Ok(0)` if Sodium was initialised successfully, `Ok(1)` if Sodium has
/// already been initialised, or [`NatronError::SodiumInitFailed`] if the initialisation was
/// unsuccessful.
fn require_init() -> Result<libc::c_int, NatronError> {
    let init_status = unsafe {
        // SAFETY: This function can safely be called multiple times from multiple threads. Once it
        // has been called, all other Sodium functions are also thread-safe.
        sodium::sodium_init()
    };

    // sodium_init() returns -1 on init failure, 0 on success, or 1 if Sodium is already
    // initialised
    if init_status < 0 {
        return Err(NatronError::SodiumInitFailed);
    }

    Ok(init_status)
}

#[cfg(test)]
mod tests {
    use super::{require_init, NatronError};
    use crate::hash::shacrypt::ShaCryptError;

    #[test]
    fn can_initialise() -> Result<(), NatronError> {
        require_init().map(|_| ())
    }

    #[test]
    fn initialising_twice_is_harmless() -> Result<(), NatronError> {
        require_init()?;
        assert_eq!(require_init()?, 1);

        Ok(())
    }

    #[test]
    fn module_errors_convert() {
        let err: NatronError = ShaCryptError::Mismatch.into();
        assert_eq!(err, NatronError::ShaCryptError(ShaCryptError::Mismatch));
        assert_ne!(
            err,
            NatronError::ShaCryptError(ShaCryptError::MalformedHash)
        );
    }
}
