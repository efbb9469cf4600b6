//! Byte sequence helpers for the SHA-crypt derivation.

/// Repeat `seed` until it covers `len` bytes, then truncate to exactly `len` bytes.
///
/// This is how SHA-crypt stretches a fixed-size digest over a password or salt of arbitrary
/// length. An empty `seed` or a `len` of `0` produces an empty sequence.
pub fn expand_to_length(seed: &[u8], len: usize) -> Vec<u8> {
    if seed.is_empty() || len == 0 {
        return Vec::new();
    }

    seed.iter().copied().cycle().take(len).collect()
}

/// Walk the bits of `counter` from least significant up to and including its highest set bit,
/// yielding `on_set` for every 1 bit and `on_clear` for every 0 bit.
///
/// A `counter` of `0` yields nothing.
pub fn select_by_parity<'a>(
    counter: usize,
    on_set: &'a [u8],
    on_clear: &'a [u8],
) -> impl Iterator<Item = &'a [u8]> + 'a {
    let significant_bits = usize::BITS - counter.leading_zeros();

    (0..significant_bits).map(move |bit| {
        if (counter >> bit) & 1 == 1 {
            on_set
        } else {
            on_clear
        }
    })
}

#[cfg(test)]
mod tests {
    use super::{expand_to_length, select_by_parity};

    #[test]
    fn expand_shorter_than_seed() {
        assert_eq!(expand_to_length(b"abcdef", 4), b"abcd");
        assert_eq!(expand_to_length(b"abcdef", 6), b"abcdef");
    }

    #[test]
    fn expand_longer_than_seed() {
        assert_eq!(expand_to_length(b"abc", 7), b"abcabca");
        assert_eq!(expand_to_length(b"abc", 9), b"abcabcabc");

        let digest = [0xa5u8; 32];
        let expanded = expand_to_length(&digest, 100);
        assert_eq!(expanded.len(), 100);
        assert!(expanded.iter().all(|b| *b == 0xa5));
    }

    #[test]
    fn expand_degenerate_lengths() {
        assert!(expand_to_length(b"abc", 0).is_empty());
        assert!(expand_to_length(b"", 0).is_empty());
        assert!(expand_to_length(b"", 12).is_empty());
    }

    #[test]
    fn parity_selection() {
        let set: &[u8] = b"B";
        let clear: &[u8] = b"P";

        let picks = |n| select_by_parity(n, set, clear).collect::<Vec<_>>().concat();

        assert_eq!(picks(0), b"");
        assert_eq!(picks(1), b"B");
        assert_eq!(picks(2), b"PB");
        // 12 = 0b1100
        assert_eq!(picks(12), b"PPBB");
        // 13 = 0b1101
        assert_eq!(picks(13), b"BPBB");
        assert_eq!(picks(usize::MAX).len(), usize::BITS as usize);
    }
}
