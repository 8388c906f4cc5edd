use alloy::primitives::{B256, U256};

/// Packs two 128-bit values into one word, `high` in the most significant half.
pub fn pack_u128_pair(high: u128, low: u128) -> B256 {
    let packed = (U256::from(high) << 128) | U256::from(low);
    B256::from(packed)
}

/// Inverse of [`pack_u128_pair`].
pub fn unpack_u128_pair(word: B256) -> (u128, u128) {
    let value = U256::from_be_bytes(word.0);
    let high: u128 = (value >> 128usize).to::<u128>();
    let low: u128 = (value & U256::from(u128::MAX)).to::<u128>();
    (high, low)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_high_half_is_most_significant() {
        let word = pack_u128_pair(1, 2);

        assert_eq!(word.0[15], 1);
        assert_eq!(word.0[31], 2);
        assert!(word.0[..15].iter().all(|b| *b == 0));
        assert_eq!(unpack_u128_pair(word), (1, 2));
    }

    #[test]
    fn test_full_width_values() {
        let word = pack_u128_pair(u128::MAX, 0);
        assert_eq!(unpack_u128_pair(word), (u128::MAX, 0));
    }

    #[test]
    fn test_unpack_splits_raw_word() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0x80;
        bytes[16..].copy_from_slice(&u128::MAX.to_be_bytes());

        assert_eq!(unpack_u128_pair(B256::from(bytes)), (1u128 << 127, u128::MAX));
    }
}
