//! Positions of the most and least significant set bit of a word.

use crate::libraries::big_num::U256;

/// Index of the most significant set bit, where `x >= 2^msb` and
/// `x < 2^(msb + 1)`. Panics for `x = 0`.
pub fn most_significant_bit(x: U256) -> u8 {
    assert!(!x.is_zero());
    (x.bits() - 1) as u8
}

/// Index of the least significant set bit. Panics for `x = 0`.
pub fn least_significant_bit(x: U256) -> u8 {
    assert!(!x.is_zero());
    x.trailing_zeros() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn msb_of_powers_of_two() {
        for i in 0..=255u32 {
            assert_eq!(most_significant_bit(U256::from(1) << i), i as u8);
        }
    }

    #[test]
    fn msb_ignores_lower_bits() {
        let x = (U256::from(1) << 200u32) | U256::from(0xffu64);
        assert_eq!(most_significant_bit(x), 200);
    }

    #[test]
    fn lsb_of_powers_of_two() {
        for i in 0..=255u32 {
            assert_eq!(least_significant_bit(U256::from(1) << i), i as u8);
        }
    }

    #[test]
    fn lsb_ignores_higher_bits() {
        let x = (U256::from(1) << 200u32) | (U256::from(1) << 31u32);
        assert_eq!(least_significant_bit(x), 31);
    }

    #[test]
    #[should_panic]
    fn msb_of_zero_panics() {
        most_significant_bit(U256::default());
    }

    #[test]
    #[should_panic]
    fn lsb_of_zero_panics() {
        least_significant_bit(U256::default());
    }
}
