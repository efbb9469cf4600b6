//! Random data suitable for cryptographic use.
//!
//! This module is a wrapper around the [`randombytes`
//! API](https://doc.libsodium.org/generating_random_data) from Sodium. Random data is sourced from
//! the platform's secure RNG API (e.g: /dev/urandom).
//!
//! Within this crate, it is used to generate salts for new password hashes (see
//! [`hash::shacrypt::generate_salt`](crate::hash::shacrypt::generate_salt)).
//!
//! # Examples
//! Using the [rand](https://rust-random.github.io/book)-compatible API:
//!
//! ```rust
//! use rand::prelude::*;
//! use natron::random::SodiumRng;
//!
//! let mut rng = SodiumRng;
//! let random_number = rng.gen_range(1..101);
//! println!("My random number is... {}", random_number);
//! ```
//!
//! Using the more basic API:
//!
//! ```rust
//! use natron::random;
//!
//! let mut my_random_data = [0u8; 32];
//! random::fill_random(&mut my_random_data).unwrap();
//! println!("Here's some random bytes: {:x?}", my_random_data);
//! ```

use crate::{require_init, NatronError};
use libsodium_sys as sodium;
use rand_core::{impls, CryptoRng, Error as RandError, RngCore};
use thiserror::Error;

/// Error type returned if something went wrong in the random module.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum RandomError {
    /// Tried to call [`random_u32_in_range`] with `low` > `high`.
    #[error("lower bound exceeds upper bound")]
    BoundsInvalid,
}

/// [rand](https://rust-random.github.io/book)-compatible CSPRNG API.
///
/// This struct implements the `RngCore` trait, allowing it to be used as a source of randomness
/// for `rand`, or passed to
/// [`generate_salt_with`](crate::hash::shacrypt::generate_salt_with).
#[derive(Clone, Copy, Debug)]
pub struct SodiumRng;

impl RngCore for SodiumRng {
    fn next_u32(&mut self) -> u32 {
        match random_u32() {
            Ok(x) => x,
            Err(_) => crate::unexpected_err!("sodium_init"),
        }
    }

    fn next_u64(&mut self) -> u64 {
        impls::next_u64_via_u32(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        if self.try_fill_bytes(dest).is_err() {
            crate::unexpected_err!("sodium_init");
        }
    }

    #[cfg(feature = "std")]
    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), RandError> {
        fill_random(dest).map_err(RandError::new)
    }

    #[cfg(not(feature = "std"))]
    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), RandError> {
        fill_random(dest).map_err(|_| {
            core::num::NonZeroU32::new(RandError::CUSTOM_START)
                .unwrap()
                .into()
        })
    }
}

impl CryptoRng for SodiumRng {}

/// Returns a random 32-bit integer.
pub fn random_u32() -> Result<u32, NatronError> {
    require_init()?;

    unsafe {
        // SAFETY: This function is safe as long as Sodium has been initialised, which we ensure
        // with the call to `require_init` above.
        Ok(sodium::randombytes_random())
    }
}

/// Returns a random number in the range low (included) to high (excluded).
///
/// This should be preferred to simply taking [`random_u32`] modulo some value, which does not
/// guarantee a uniform distribution of output values.
pub fn random_u32_in_range(low: u32, high: u32) -> Result<u32, NatronError> {
    require_init()?;

    if low > high {
        return Err(RandomError::BoundsInvalid.into());
    }

    let upper_bound = high - low;
    let unshifted = unsafe {
        // SAFETY: This function is safe as long as Sodium has been initialised, which we ensure
        // with the call to `require_init` above.
        sodium::randombytes_uniform(upper_bound)
    };

    Ok(low + unshifted)
}

/// Fill `buf` with random data suitable for cryptographic use.
///
/// Returns an error if Sodium could not be correctly initialised.
pub fn fill_random(buf: &mut [u8]) -> Result<(), NatronError> {
    require_init()?;

    unsafe {
        // SAFETY: The first argument to this function should be a pointer to which random data will
        // be written, and the second argument should be the number of bytes to write, starting at
        // the pointer. We use `buf.len()` to specify the number of bytes to write, so `buf` is
        // clearly valid for writes of the required length.
        sodium::randombytes_buf(buf.as_mut_ptr() as *mut libc::c_void, buf.len());
    }

    Ok(())
}
