//! The [SHA-2](https://en.wikipedia.org/wiki/SHA-2) family of hash functions.
//!
//! This module corresponds to the [`crypto_hash`
//! API](https://doc.libsodium.org/advanced/sha-2_hash_function) from Sodium. It is the digest
//! engine underneath [`hash::shacrypt`](crate::hash::shacrypt): SHA-256 for `$5$` hashes, SHA-512
//! for `$6$` hashes.
//!
//! # Security Considerations
//! Generic hash functions such as SHA-2 *must not* be used directly for password hashing, they are
//! not sufficiently computationally intensive. Use [`hash::shacrypt`](crate::hash::shacrypt) (or,
//! where `crypt()` compatibility is not needed, a memory-hard function like Argon2id).
//!
//! SHA-2 is vulnerable to [length extension
//! attacks](https://en.wikipedia.org/wiki/Length_extension_attack).
//!
//! # Examples
//! Single-part hashing (using [`hash`]):
//!
//! ```rust
//! use natron::hash::sha2::sha256;
//!
//! let hash = sha256::hash(b"Hello world!").unwrap();
//! assert_eq!(hash[..4], [0xc0, 0x53, 0x5e, 0x4b]);
//! ```
//!
//! Reusing one state for several digests (using [`DigestEngine`]):
//!
//! ```rust
//! use natron::hash::sha2::{sha512, DigestEngine};
//!
//! let mut engine = sha512::Multipart::new().unwrap();
//! engine.update(b"Hello ");
//! engine.update(b"world!");
//! let digest_a = engine.finalise_reset();
//!
//! engine.update(b"Hello world!");
//! let digest_b = engine.finalise_reset();
//!
//! assert_eq!(digest_a, digest_b);
//! assert_eq!(digest_a, sha512::hash(b"Hello world!").unwrap());
//! ```

use crate::NatronError;

/// A streaming hash accumulator with reset/append/finalise semantics.
///
/// This is the capability the SHA-crypt derivation needs from a hash function. It is implemented
/// by [`sha256::Multipart`] and [`sha512::Multipart`].
///
/// An engine is a sequential, stateful accumulator: it must not be shared between concurrent
/// computations.
pub trait DigestEngine: Sized {
    /// The length of the output of this hash function, in bytes.
    const DIGEST_LENGTH: usize;

    /// The digest produced by this hash function.
    type Digest: AsRef<[u8]> + Copy;

    /// Create a new engine, ready to accept input.
    fn new() -> Result<Self, NatronError>;

    /// Discard any input written so far.
    fn reset(&mut self);

    /// Append `chunk` to the message being hashed.
    fn update(&mut self, chunk: &[u8]);

    /// Return the digest of everything written since the last reset, and reset the engine.
    fn finalise_reset(&mut self) -> Self::Digest;
}

/// Generates the API for a `sha2` module with the given functions from Sodium for a specific
/// implementation.
macro_rules! sha2_module {
    (
        $digest_len:expr,   // crypto_hash_BYTES
        $hash:path,         // crypto_hash
        $mp_state:ty,       // crypto_hash_state
        $mp_init:path,      // crypto_hash_init
        $mp_update:path,    // crypto_hash_update
        $mp_final:path,     // crypto_hash_final
    ) => {
        use $crate::hash::sha2::DigestEngine;
        use $crate::{assert_not_err, mem, require_init, unexpected_err, NatronError};

        /// The length of the output of this hash function, in bytes.
        pub const DIGEST_LENGTH: usize = $digest_len as usize;

        /// Stores the digest ("fingerprint") of a message calculated using this hash function.
        pub type Digest = [u8; DIGEST_LENGTH];

        /// Streaming hash API, for long/multi-part message hashing.
        ///
        /// This struct uses heap memory while in scope, allocated using Sodium's [secure memory
        /// utilities](https://doc.libsodium.org/memory_management), so intermediate hash states
        /// derived from a password are never swapped to disk.
        pub struct Multipart {
            state: core::ptr::NonNull<$mp_state>,
            _marker: core::marker::PhantomData<$mp_state>,
        }

        impl Multipart {
            /// Create a new instance of the struct.
            pub fn new() -> Result<Self, NatronError> {
                require_init()?;

                let mut state = unsafe {
                    // SAFETY: This call to malloc() will allocate the memory required for a
                    // `crypto_hash_state` type, outside of Rust's memory management. The
                    // associated memory is always freed in the corresponding `drop` call for the
                    // Multipart struct, unless initialisation fails, in which case it is freed
                    // before `Multipart::new` returns, and not used again.
                    mem::malloc()?
                };

                let init_result = unsafe {
                    // SAFETY: This function initialises a `crypto_hash_state` struct. It expects a
                    // pointer to a region of memory sufficient to store such a struct, which is
                    // what we allocated above. If the return value indicates success, the memory
                    // pointed to by `state` is a valid `crypto_hash_state`.
                    $mp_init(state.as_mut())
                };

                // This return value is not possible in the current implementation of
                // `crypto_hash_init` in Sodium, but could be in the future.
                if init_result != 0 {
                    unsafe {
                        // SAFETY: The memory was allocated above using Sodium's allocator and has
                        // not been freed. `unexpected_err!` always panics, so no `Self` is ever
                        // built around this pointer.
                        mem::free(state);
                    }
                    unexpected_err!(stringify!($mp_init));
                }

                Ok(Self {
                    state,
                    _marker: core::marker::PhantomData,
                })
            }

            /// Try to clone this Multipart state.
            ///
            /// The new struct starts in the same state as the current one, so any data already
            /// written will also be part of its digest.
            pub fn try_clone(&self) -> Result<Self, NatronError> {
                let state = unsafe {
                    // SAFETY: This allocates a fresh `crypto_hash_state`, freed in `drop`.
                    let mut state = mem::malloc()?;

                    // SAFETY: Both pointers are valid for `size_of::<crypto_hash_state>` bytes and
                    // cannot overlap, as `state` was just allocated. `self.state` always points to
                    // a valid `crypto_hash_state`, so after the copy `state` does too.
                    core::ptr::copy_nonoverlapping(self.state.as_ptr(), state.as_mut(), 1);

                    state
                };

                Ok(Self {
                    state,
                    _marker: core::marker::PhantomData,
                })
            }

            /// Add message contents to hash.
            pub fn update(&mut self, chunk: &[u8]) {
                let update_result = unsafe {
                    // SAFETY: `self.state` points to a valid `crypto_hash_state`, initialised in
                    // `Multipart::new`. We use `chunk.len()` to specify the number of bytes to
                    // read from `chunk`, so the pointer is valid for reads of this length.
                    $mp_update(
                        self.state.as_mut(),
                        chunk.as_ptr(),
                        chunk.len() as libc::c_ulonglong,
                    )
                };

                assert_not_err!(update_result, stringify!($mp_update));
            }

            /// Discard all message contents written so far, as if the struct were newly created.
            pub fn reset(&mut self) {
                let init_result = unsafe {
                    // SAFETY: `self.state` points to memory sufficient to store a
                    // `crypto_hash_state`, which this call reinitialises in place.
                    $mp_init(self.state.as_mut())
                };

                assert_not_err!(init_result, stringify!($mp_init));
            }

            /// Finalise the hash state, returning the digest.
            ///
            /// Sodium wipes the state after finalising, so it must be reset before being written
            /// to again.
            fn finalise(&mut self) -> Digest {
                let mut digest = [0u8; DIGEST_LENGTH];

                let finalise_result = unsafe {
                    // SAFETY: `self.state` points to a valid `crypto_hash_state`. The `digest`
                    // array is `crypto_hash_BYTES` long, so it is valid for writes of the digest.
                    $mp_final(self.state.as_mut(), digest.as_mut_ptr())
                };
                assert_not_err!(finalise_result, stringify!($mp_final));

                digest
            }

            /// Calculate the hash of the concatenated message contents.
            pub fn calculate(mut self) -> Digest {
                self.finalise()
            }

            /// Compare the hash of the specified message to another hash, returning `true` if the
            /// message hashes to the given value, and `false` otherwise.
            ///
            /// This comparison runs in constant time.
            pub fn compare(mut self, digest: &Digest) -> Result<bool, NatronError> {
                let actual_digest = self.finalise();
                mem::eq(digest, &actual_digest)
            }
        }

        impl DigestEngine for Multipart {
            const DIGEST_LENGTH: usize = DIGEST_LENGTH;

            type Digest = Digest;

            fn new() -> Result<Self, NatronError> {
                Multipart::new()
            }

            fn reset(&mut self) {
                Multipart::reset(self)
            }

            fn update(&mut self, chunk: &[u8]) {
                Multipart::update(self, chunk)
            }

            fn finalise_reset(&mut self) -> Digest {
                let digest = self.finalise();
                Multipart::reset(self);
                digest
            }
        }

        impl Drop for Multipart {
            fn drop(&mut self) {
                unsafe {
                    // SAFETY: `self.state` was allocated in the `Multipart` constructor using
                    // Sodium's allocator, and is only freed here. `drop` runs at most once, and
                    // no method is reachable afterwards, so neither a double-free nor a
                    // use-after-free is possible from safe code.
                    mem::free(self.state);
                }
            }
        }

        /// Calculate the hash of the provided message.
        ///
        /// The same message will always produce the same hash.
        pub fn hash(message: &[u8]) -> Result<Digest, NatronError> {
            require_init()?;

            let mut digest = [0u8; DIGEST_LENGTH];

            let hash_result = unsafe {
                // SAFETY: `digest` is `crypto_hash_BYTES` long, so it is valid for writes of the
                // digest. We use `message.len()` to specify the length of the message, so
                // `message` is valid for reads of this length.
                $hash(
                    digest.as_mut_ptr(),
                    message.as_ptr(),
                    message.len() as libc::c_ulonglong,
                )
            };
            assert_not_err!(hash_result, stringify!($hash));

            Ok(digest)
        }
    };
}

/// Generates tests for a `sha2` implementation.
#[allow(unused_macros)]
macro_rules! sha2_tests {
    ( $( {
        msg: $msg:expr,
        out: $out:expr,
    }, )* ) => {
        use $crate::{NatronError, random};
        use $crate::hash::sha2::DigestEngine;
        use super::{hash, Multipart};

        #[test]
        fn single_part_test_vectors() -> Result<(), NatronError> {
            $(
                let digest = hash($msg)?;
                assert_eq!(digest, $out);
            )*

            Ok(())
        }

        #[test]
        fn multi_part_test_vectors() -> Result<(), NatronError> {
            $(
                let mut state = Multipart::new()?;
                state.update($msg);
                let state_b = state.try_clone()?;
                assert!(state_b.compare(&$out)?);
                let digest = state.calculate();
                assert_eq!(digest, $out);
            )*

            for _ in 0..1000 {
                $(
                    let mut state = Multipart::new()?;
                    let boundary = random::random_u32_in_range(0, $msg.len() as u32)? as usize;
                    state.update(&$msg[..boundary]);
                    state.update(&$msg[boundary..]);
                    let digest = state.calculate();
                    assert_eq!(digest, $out);
                )*
            }

            Ok(())
        }

        #[test]
        fn engine_is_reusable() -> Result<(), NatronError> {
            let mut engine = <Multipart as DigestEngine>::new()?;

            $(
                engine.update(b"discarded by the reset below");
                DigestEngine::reset(&mut engine);
                DigestEngine::update(&mut engine, $msg);
                assert_eq!(engine.finalise_reset(), $out);

                // Finalising leaves the engine ready for a fresh message.
                DigestEngine::update(&mut engine, $msg);
                assert_eq!(engine.finalise_reset(), $out);
            )*

            Ok(())
        }
    };
}

/// The SHA-256 hash function.
pub mod sha256 {
    use libsodium_sys as sodium;

    sha2_module!(
        sodium::crypto_hash_sha256_BYTES,
        sodium::crypto_hash_sha256,
        sodium::crypto_hash_sha256_state,
        sodium::crypto_hash_sha256_init,
        sodium::crypto_hash_sha256_update,
        sodium::crypto_hash_sha256_final,
    );

}

/// The SHA-512 hash function.
pub mod sha512 {
    use libsodium_sys as sodium;

    sha2_module!(
        sodium::crypto_hash_sha512_BYTES,
        sodium::crypto_hash_sha512,
        sodium::crypto_hash_sha512_state,
        sodium::crypto_hash_sha512_init,
        sodium::crypto_hash_sha512_update,
        sodium::crypto_hash_sha512_final,
    );

    #[cfg(test)]
    mod tests {
        sha2_tests! [
            {
                msg: b"testing\n",
                out: [0x24, 0xf9, 0x50, 0xaa, 0xc7, 0xb9, 0xea, 0x9b, 0x3c, 0xb7, 0x28, 0x22, 0x8a,
                      0x0c, 0x82, 0xb6, 0x7c, 0x39, 0xe9, 0x6b, 0x4b, 0x34, 0x47, 0x98, 0x87, 0x0d,
                      0x5d, 0xae, 0xe9, 0x3e, 0x3a, 0xe5, 0x93, 0x1b, 0xaa, 0xe8, 0xc7, 0xca, 0xcf,
                      0xea, 0x4b, 0x62, 0x94, 0x52, 0xc3, 0x80, 0x26, 0xa8, 0x1d, 0x13, 0x8b, 0xc7,
                      0xaa, 0xd1, 0xaf, 0x3e, 0xf7, 0xbf, 0xd5, 0xec, 0x64, 0x6d, 0x6c, 0x28],
            },
            {
                msg: b"Hello world!",
                out: [0xf6, 0xcd, 0xe2, 0xa0, 0xf8, 0x19, 0x31, 0x4c, 0xdd, 0xe5, 0x5f, 0xc2, 0x27,
                      0xd8, 0xd7, 0xda, 0xe3, 0xd2, 0x8c, 0xc5, 0x56, 0x22, 0x2a, 0x0a, 0x8a, 0xd6,
                      0x6d, 0x91, 0xcc, 0xad, 0x4a, 0xad, 0x60, 0x94, 0xf5, 0x17, 0xa2, 0x18, 0x23,
                      0x60, 0xc9, 0xaa, 0xcf, 0x6a, 0x3d, 0xc3, 0x23, 0x16, 0x2c, 0xb6, 0xfd, 0x8c,
                      0xdf, 0xfe, 0xdb, 0x0f, 0xe0, 0x38, 0xf5, 0x5e, 0x85, 0xff, 0xb5, 0xb6],
            },
        ];
    }
}
