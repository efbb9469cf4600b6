//! The `crypt(3)` flavour of Base64 used for SHA-crypt digests.
//!
//! The alphabet is `./0-9A-Za-z`, and each group of three digest bytes is emitted least
//! significant 6 bits first (the reverse of standard Base64). The digest bytes are not encoded in
//! order: every variant has a fixed permutation deciding which bytes form each group. The final
//! group only holds one or two bytes, and emits one character more than it holds bytes.

use super::{ShaCryptError, Variant};

/// The crypt Base64 alphabet, indexed by 6-bit value.
pub(super) const ALPHABET: &[u8; 64] = b"./0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Marks a byte outside [`ALPHABET`] in [`DECODE_TABLE`].
const INVALID: u8 = 0xff;

/// Digest byte indices for SHA-256-crypt, most significant byte of each group first.
#[rustfmt::skip]
const SHA256_PERMUTATION: [u8; 32] = [
    0, 10, 20, 21, 1, 11, 12, 22, 2, 3, 13, 23,
    24, 4, 14, 15, 25, 5, 6, 16, 26, 27, 7, 17,
    18, 28, 8, 9, 19, 29, 31, 30,
];

/// Digest byte indices for SHA-512-crypt, most significant byte of each group first.
#[rustfmt::skip]
const SHA512_PERMUTATION: [u8; 64] = [
    0, 21, 42, 22, 43, 1, 44, 2, 23, 3, 24, 45,
    25, 46, 4, 47, 5, 26, 6, 27, 48, 28, 49, 7,
    50, 8, 29, 9, 30, 51, 31, 52, 10, 53, 11, 32,
    12, 33, 54, 34, 55, 13, 56, 14, 35, 15, 36, 57,
    37, 58, 16, 59, 17, 38, 18, 39, 60, 40, 61, 19,
    62, 20, 41, 63,
];

lazy_static::lazy_static! {
    /// Maps an ASCII byte to its 6-bit value, or [`INVALID`].
    static ref DECODE_TABLE: [u8; 256] = {
        let mut table = [INVALID; 256];
        for (value, &c) in ALPHABET.iter().enumerate() {
            table[usize::from(c)] = value as u8;
        }
        table
    };
}

fn permutation(variant: Variant) -> &'static [u8] {
    match variant {
        Variant::Sha256 => &SHA256_PERMUTATION,
        Variant::Sha512 => &SHA512_PERMUTATION,
    }
}

/// Returns true if `c` belongs to the crypt Base64 alphabet.
///
/// The salt alphabet `[A-Za-z0-9./]` is the same set of characters.
pub(super) fn in_alphabet(c: u8) -> bool {
    DECODE_TABLE[usize::from(c)] != INVALID
}

/// Encode a raw `digest` for `variant`.
///
/// `digest` must be exactly `variant.digest_length()` bytes.
pub(super) fn encode(digest: &[u8], variant: Variant) -> String {
    debug_assert_eq!(digest.len(), variant.digest_length());

    let mut out = String::with_capacity(variant.encoded_length());

    for group in permutation(variant).chunks(3) {
        let mut w = group
            .iter()
            .fold(0u32, |w, &i| (w << 8) | u32::from(digest[usize::from(i)]));

        for _ in 0..=group.len() {
            out.push(char::from(ALPHABET[(w & 0x3f) as usize]));
            w >>= 6;
        }
    }

    out
}

/// Decode an encoded digest for `variant`, returning the raw digest bytes.
///
/// Fails with [`ShaCryptError::MalformedHash`] if `encoded` has the wrong length, contains a
/// character outside the alphabet, or sets bits in the final group which no digest could produce.
pub(super) fn decode(encoded: &str, variant: Variant) -> Result<Vec<u8>, ShaCryptError> {
    let encoded = encoded.as_bytes();
    if encoded.len() != variant.encoded_length() {
        return Err(ShaCryptError::MalformedHash);
    }

    let mut digest = vec![0u8; variant.digest_length()];
    let mut chars = encoded.iter();

    for group in permutation(variant).chunks(3) {
        let mut w = 0u32;
        for shift in 0..=group.len() {
            let value = chars
                .next()
                .map(|&c| DECODE_TABLE[usize::from(c)])
                .ok_or(ShaCryptError::MalformedHash)?;
            if value == INVALID {
                return Err(ShaCryptError::MalformedHash);
            }
            w |= u32::from(value) << (6 * shift);
        }

        if w >> (8 * group.len()) != 0 {
            return Err(ShaCryptError::MalformedHash);
        }

        for (j, &i) in group.iter().enumerate() {
            digest[usize::from(i)] = (w >> (8 * (group.len() - 1 - j))) as u8;
        }
    }

    Ok(digest)
}

#[cfg(test)]
mod tests {
    use super::{decode, encode, in_alphabet, SHA256_PERMUTATION, SHA512_PERMUTATION};
    use crate::hash::shacrypt::{ShaCryptError, Variant};

    macro_rules! encode_tests {
        ( $variant:expr, $( [
            $bin:expr,
            $b64:expr
        ], )* ) => {
            $(
                assert_eq!(encode(&$bin, $variant), $b64);
                assert_eq!(decode($b64, $variant), Ok($bin.to_vec()));
            )*
        };
    }

    fn counting<const N: usize>() -> [u8; N] {
        let mut out = [0u8; N];
        for (i, b) in out.iter_mut().enumerate() {
            *b = i as u8;
        }
        out
    }

    #[test]
    fn permutations_cover_every_byte() {
        let mut seen = [false; 32];
        SHA256_PERMUTATION.iter().for_each(|&i| seen[usize::from(i)] = true);
        assert!(seen.iter().all(|s| *s));

        let mut seen = [false; 64];
        SHA512_PERMUTATION.iter().for_each(|&i| seen[usize::from(i)] = true);
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn sha256_encoding() {
        encode_tests![
            Variant::Sha256,
            [[0u8; 32], "..........................................."],
            [[0xffu8; 32], "zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzD"],
            [counting::<32>(), "Ic..92E30M/1Lok.CE.43Yl1O.V/FQk46kV2RAF0Sw/"],
        ];
    }

    #[test]
    fn sha512_encoding() {
        encode_tests![
            Variant::Sha512,
            [
                [0xffu8; 64],
                "zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz1"
            ],
            [
                counting::<64>(),
                "eI/./gW3L6.9hUl.2sG4OIk9kgV/5215RUUAnsF08En5UgEBq201BQX6Xs.CtEm1EcH7a2lCwQW2Ho18dEVDz."
            ],
        ];
    }

    #[test]
    fn decode_rejects_wrong_length() {
        let encoded = encode(&[0x5a; 32], Variant::Sha256);
        assert_eq!(
            decode(&encoded[..42], Variant::Sha256),
            Err(ShaCryptError::MalformedHash)
        );
        assert_eq!(
            decode(&format!("{}.", encoded), Variant::Sha256),
            Err(ShaCryptError::MalformedHash)
        );
        assert_eq!(
            decode(&encoded, Variant::Sha512),
            Err(ShaCryptError::MalformedHash)
        );
        assert_eq!(decode("", Variant::Sha512), Err(ShaCryptError::MalformedHash));
    }

    #[test]
    fn decode_rejects_invalid_characters() {
        let mut encoded = encode(&[0x5a; 32], Variant::Sha256).into_bytes();
        for bad in [b'$', b'+', b'=', b'-', b' ', 0x00, 0xc3] {
            encoded[7] = bad;
            let encoded = String::from_utf8_lossy(&encoded).into_owned();
            assert_eq!(
                decode(&encoded, Variant::Sha256),
                Err(ShaCryptError::MalformedHash)
            );
        }
    }

    #[test]
    fn decode_rejects_non_canonical_tail() {
        // The last SHA-256 group holds 16 bits in 3 characters, so its final character must be
        // below 16 ('D' is 15, 'E' is 16).
        let mut encoded = "zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzD".to_owned();
        assert!(decode(&encoded, Variant::Sha256).is_ok());
        encoded.pop();
        encoded.push('E');
        assert_eq!(
            decode(&encoded, Variant::Sha256),
            Err(ShaCryptError::MalformedHash)
        );

        // The last SHA-512 group holds 8 bits in 2 characters, so its final character must be
        // below 4 ('1' is 3, '2' is 4).
        let mut encoded = encode(&[0xff; 64], Variant::Sha512);
        encoded.pop();
        encoded.push('2');
        assert_eq!(
            decode(&encoded, Variant::Sha512),
            Err(ShaCryptError::MalformedHash)
        );
    }

    #[test]
    fn salt_alphabet() {
        for c in b"./0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz" {
            assert!(in_alphabet(*c));
        }
        for c in [b'$', b':', b'+', b'=', b'*', b'!', b' ', b'\n', 0x00, 0x80, 0xff] {
            assert!(!in_alphabet(c));
        }
    }
}
