//! The SHA-crypt digest derivation.
//!
//! This follows the numbered steps of [Drepper's
//! specification](https://www.akkadia.org/drepper/SHA-crypt.txt), except that digest B is
//! computed before digest A (it is an input to A, and the two are otherwise independent).

use super::sequence::{expand_to_length, select_by_parity};
use crate::hash::sha2::DigestEngine;
use crate::{mem, NatronError};

/// Number of times the salt is fed into digest DS, before adding the first byte of digest A.
const DS_BASE_REPEATS: usize = 16;

/// Run the full derivation for `password` and `salt` over `rounds` rounds, returning the raw final
/// digest.
///
/// `salt` and `rounds` are assumed to have been validated by the caller. A single engine is used
/// for every digest, reset between each one.
pub(super) fn derive<E: DigestEngine>(
    password: &[u8],
    salt: &[u8],
    rounds: u32,
) -> Result<E::Digest, NatronError> {
    let mut engine = E::new()?;

    // Digest B = H(P || S || P)
    engine.update(password);
    engine.update(salt);
    engine.update(password);
    let digest_b = engine.finalise_reset();

    // Digest A = H(P || S || B stretched to |P| || B-or-P for each bit of |P|)
    engine.update(password);
    engine.update(salt);
    let mut stretched_b = expand_to_length(digest_b.as_ref(), password.len());
    engine.update(&stretched_b);
    mem::clear(&mut stretched_b)?;
    for chunk in select_by_parity(password.len(), digest_b.as_ref(), password) {
        engine.update(chunk);
    }
    let digest_a = engine.finalise_reset();

    // Digest DP = H(P repeated |P| times), stretched to |P|
    for _ in 0..password.len() {
        engine.update(password);
    }
    let digest_dp = engine.finalise_reset();
    let mut p_seq = expand_to_length(digest_dp.as_ref(), password.len());

    // Digest DS = H(S repeated 16 + A[0] times), stretched to |S|
    for _ in 0..DS_BASE_REPEATS + usize::from(digest_a.as_ref()[0]) {
        engine.update(salt);
    }
    let digest_ds = engine.finalise_reset();
    let s_seq = expand_to_length(digest_ds.as_ref(), salt.len());

    let mut digest = digest_a;
    for round in 0..rounds {
        let odd = round % 2 == 1;

        if odd {
            engine.update(&p_seq);
        } else {
            engine.update(digest.as_ref());
        }

        if round % 3 != 0 {
            engine.update(&s_seq);
        }

        if round % 7 != 0 {
            engine.update(&p_seq);
        }

        if odd {
            engine.update(digest.as_ref());
        } else {
            engine.update(&p_seq);
        }

        digest = engine.finalise_reset();
    }

    mem::clear(&mut p_seq)?;

    Ok(digest)
}

#[cfg(test)]
mod tests {
    use super::derive;
    use crate::hash::sha2::{sha256, sha512, DigestEngine};
    use crate::NatronError;

    /// Recompute digest B and digest A the long way, with one contiguous buffer each.
    fn digest_a_by_concatenation<E: DigestEngine>(
        password: &[u8],
        salt: &[u8],
    ) -> Result<Vec<u8>, NatronError> {
        let mut engine = E::new()?;

        engine.update(&[password, salt, password].concat());
        let digest_b = engine.finalise_reset().as_ref().to_vec();

        let mut input = [password, salt].concat();
        for i in 0..password.len() {
            input.push(digest_b[i % digest_b.len()]);
        }
        let mut len = password.len();
        while len > 0 {
            if len & 1 == 1 {
                input.extend_from_slice(&digest_b);
            } else {
                input.extend_from_slice(password);
            }
            len >>= 1;
        }

        engine.update(&input);
        Ok(engine.finalise_reset().as_ref().to_vec())
    }

    #[test]
    fn zero_rounds_yields_digest_a() -> Result<(), NatronError> {
        let passwords: [&[u8]; 4] = [b"", b"a", b"Hello world!", &[0x42; 70]];

        for password in passwords {
            let expected = digest_a_by_concatenation::<sha256::Multipart>(password, b"salt")?;
            let actual = derive::<sha256::Multipart>(password, b"salt", 0)?;
            assert_eq!(actual.as_ref(), &expected[..]);

            let expected = digest_a_by_concatenation::<sha512::Multipart>(password, b"salt")?;
            let actual = derive::<sha512::Multipart>(password, b"salt", 0)?;
            assert_eq!(actual.as_ref(), &expected[..]);
        }

        Ok(())
    }

    #[test]
    fn derivation_is_deterministic() -> Result<(), NatronError> {
        let a = derive::<sha512::Multipart>(b"correct horse", b"battery", 1000)?;
        let b = derive::<sha512::Multipart>(b"correct horse", b"battery", 1000)?;
        assert_eq!(a, b);

        let c = derive::<sha512::Multipart>(b"correct horse", b"battery", 1001)?;
        assert_ne!(a, c);

        Ok(())
    }

    #[test]
    fn empty_password() -> Result<(), NatronError> {
        let digest = derive::<sha256::Multipart>(b"", b"saltstring", 1000)?;
        assert_eq!(digest.len(), sha256::DIGEST_LENGTH);

        Ok(())
    }
}
