//! Hash algorithms.
//!
//! [`sha2`] exposes the plain SHA-256 and SHA-512 hash functions from Sodium. [`shacrypt`] builds
//! the deliberately slow, salted `crypt(3)` password hashes (`$5$`/`$6$`) on top of them.

pub mod sha2;
pub mod shacrypt;
