//! Conversion between ticks and Q64.96 sqrt prices.
//!
//! A tick `i` encodes the price `1.0001^i`, so the sqrt price at a tick
//! is `1.0001^(i/2)`. The forward map multiplies precomputed Q128.128
//! factors, one per set bit of the tick; the inverse approximates the
//! binary logarithm of the price and refines with the forward map.

use crate::error::ErrorCode;
use crate::libraries::big_num::U256;

/// The minimum tick that may be passed to [`get_sqrt_ratio_at_tick`],
/// computed from log base 1.0001 of 2^-128.
pub const MIN_TICK: i32 = -887272;
/// The maximum tick that may be passed to [`get_sqrt_ratio_at_tick`],
/// computed from log base 1.0001 of 2^128.
pub const MAX_TICK: i32 = -MIN_TICK;

/// Equivalent to `get_sqrt_ratio_at_tick(MIN_TICK)`.
pub const MIN_SQRT_RATIO_X96: U256 = U256([4295128739, 0, 0, 0]);
/// Equivalent to `get_sqrt_ratio_at_tick(MAX_TICK)`. The pool price can
/// never reach this value.
pub const MAX_SQRT_RATIO_X96: U256 = U256([
    0x5d951d5263988d26,
    0xefd1fc6a50648849,
    0xfffd8963,
    0,
]);

const BIT_PRECISION: u32 = 16;

/// Calculates `1.0001^(tick/2) * 2^96` as a Q64.96 number representing
/// the sqrt of the token_1/token_0 ratio.
///
/// Each magic factor is `2^128 / (1.0001^(2^(i - 1)))` for i in
/// `[0, 20)`; the Q128.128 product is rounded up into Q64.96 at the end.
///
/// Fails if |tick| > MAX_TICK
pub fn get_sqrt_ratio_at_tick(tick: i32) -> Result<U256, ErrorCode> {
    let abs_tick = tick.unsigned_abs();
    if abs_tick > MAX_TICK as u32 {
        return Err(ErrorCode::TickOutOfRange);
    }

    // i = 0
    let mut ratio = if abs_tick & 0x1 != 0 {
        U256([0xaa2d162d1a594001, 0xfffcb933bd6fad37, 0, 0])
    } else {
        // 2^128
        U256([0, 0, 1, 0])
    };
    // i = 1
    if abs_tick & 0x2 != 0 {
        ratio = (ratio * U256([0x59a46990580e213a, 0xfff97272373d4132, 0, 0])) >> 128u32
    };
    // i = 2
    if abs_tick & 0x4 != 0 {
        ratio = (ratio * U256([0xef12357cf3c7fdcc, 0xfff2e50f5f656932, 0, 0])) >> 128u32
    };
    // i = 3
    if abs_tick & 0x8 != 0 {
        ratio = (ratio * U256([0x1c3624eaa0941cd0, 0xffe5caca7e10e4e6, 0, 0])) >> 128u32
    };
    // i = 4
    if abs_tick & 0x10 != 0 {
        ratio = (ratio * U256([0xc9db58835c926644, 0xffcb9843d60f6159, 0, 0])) >> 128u32
    };
    // i = 5
    if abs_tick & 0x20 != 0 {
        ratio = (ratio * U256([0x472e6896dfb254c0, 0xff973b41fa98c081, 0, 0])) >> 128u32
    };
    // i = 6
    if abs_tick & 0x40 != 0 {
        ratio = (ratio * U256([0x43ec78b326b52861, 0xff2ea16466c96a38, 0, 0])) >> 128u32
    };
    // i = 7
    if abs_tick & 0x80 != 0 {
        ratio = (ratio * U256([0x11c461f1969c3053, 0xfe5dee046a99a2a8, 0, 0])) >> 128u32
    };
    // i = 8
    if abs_tick & 0x100 != 0 {
        ratio = (ratio * U256([0xdcffc83b479aa3a4, 0xfcbe86c7900a88ae, 0, 0])) >> 128u32
    };
    // i = 9
    if abs_tick & 0x200 != 0 {
        ratio = (ratio * U256([0x6f2b074cf7815e54, 0xf987a7253ac41317, 0, 0])) >> 128u32
    };
    // i = 10
    if abs_tick & 0x400 != 0 {
        ratio = (ratio * U256([0x940c7a398e4b70f3, 0xf3392b0822b70005, 0, 0])) >> 128u32
    };
    // i = 11
    if abs_tick & 0x800 != 0 {
        ratio = (ratio * U256([0x43b29c7fa6e889d9, 0xe7159475a2c29b74, 0, 0])) >> 128u32
    };
    // i = 12
    if abs_tick & 0x1000 != 0 {
        ratio = (ratio * U256([0x845ad8f792aa5825, 0xd097f3bdfd2022b8, 0, 0])) >> 128u32
    };
    // i = 13
    if abs_tick & 0x2000 != 0 {
        ratio = (ratio * U256([0x8a65dc1f90e061e5, 0xa9f746462d870fdf, 0, 0])) >> 128u32
    };
    // i = 14
    if abs_tick & 0x4000 != 0 {
        ratio = (ratio * U256([0x90bb3df62baf32f7, 0x70d869a156d2a1b8, 0, 0])) >> 128u32
    };
    // i = 15
    if abs_tick & 0x8000 != 0 {
        ratio = (ratio * U256([0x81231505542fcfa6, 0x31be135f97d08fd9, 0, 0])) >> 128u32
    };
    // i = 16
    if abs_tick & 0x10000 != 0 {
        ratio = (ratio * U256([0xc677de54f3e99bc9, 0x09aa508b5b7a84e1, 0, 0])) >> 128u32
    };
    // i = 17
    if abs_tick & 0x20000 != 0 {
        ratio = (ratio * U256([0x6699c329225ee604, 0x005d6af8dedb8119, 0, 0])) >> 128u32
    };
    // i = 18
    if abs_tick & 0x40000 != 0 {
        ratio = (ratio * U256([0x1ea926041bedfe98, 0x00002216e584f5fa, 0, 0])) >> 128u32
    };
    // i = 19
    if abs_tick & 0x80000 != 0 {
        ratio = (ratio * U256([0x91f7dc42444e8fa2, 0x00000000048a1703, 0, 0])) >> 128u32
    }

    // Divide to obtain 1.0001^tick * 2^128 in numerator
    if tick > 0 {
        ratio = U256::MAX / ratio;
    }

    // Round up from Q128.128 into Q64.96 so that the round trip with
    // get_tick_at_sqrt_ratio holds at tick boundaries
    Ok((ratio >> 32u32)
        + if (ratio % (U256::from(1) << 32u32)).is_zero() {
            U256::default()
        } else {
            U256::from(1)
        })
}

/// Calculates the greatest tick whose sqrt ratio is less than or equal
/// to the input.
///
/// Formula: `i = log base(√1.0001) (√P)`
///
/// Fails if `sqrt_price_x96 < MIN_SQRT_RATIO_X96` or
/// `sqrt_price_x96 >= MAX_SQRT_RATIO_X96` (the price can never reach the
/// ratio at the max tick).
pub fn get_tick_at_sqrt_ratio(sqrt_price_x96: U256) -> Result<i32, ErrorCode> {
    if sqrt_price_x96 < MIN_SQRT_RATIO_X96 || sqrt_price_x96 >= MAX_SQRT_RATIO_X96 {
        return Err(ErrorCode::SqrtPriceOutOfRange);
    }

    // Determine log_b(sqrt_ratio). First by calculating the integer
    // portion (msb) relative to the 2^96 fixed point
    let msb = (sqrt_price_x96.bits() - 1) as u32;
    let log2p_integer_x32 = (i128::from(msb) - 96) << 32;

    // Normalize the mantissa to a Q1.63 in [1, 2) for the fractional part
    let mut r: u128 = if msb >= 64 {
        (sqrt_price_x96 >> (msb - 63)).as_u128()
    } else {
        (sqrt_price_x96 << (63 - msb)).as_u128()
    };

    // Log2 iterative approximation for the fractional part: append the
    // current bit whenever the running square exceeds 2
    let mut bit: i128 = 0x8000_0000_0000_0000i128;
    let mut precision = 0;
    let mut log2p_fraction_x64: i128 = 0;

    while bit > 0 && precision < BIT_PRECISION {
        r *= r;
        let is_r_more_than_two = (r >> 127) as u32;
        r >>= 63 + is_r_more_than_two;
        log2p_fraction_x64 += bit * i128::from(is_r_more_than_two);
        bit >>= 1;
        precision += 1;
    }
    let log2p_fraction_x32 = log2p_fraction_x64 >> 32;
    let log2p_x32 = log2p_integer_x32 + log2p_fraction_x32;

    // Change of base rule: multiply with 2^32 / log2(√1.0001)
    let log_sqrt_10001_x64 = log2p_x32 * 59543866431248i128;

    // The approximation error bounds the candidates to two adjacent
    // ticks; pick with the forward map
    let tick_low = ((log_sqrt_10001_x64 - 184467440737095516i128) >> 64) as i32;
    let tick_high = ((log_sqrt_10001_x64 + 15793534762490258745i128) >> 64) as i32;

    Ok(if tick_low == tick_high {
        tick_low
    } else if get_sqrt_ratio_at_tick(tick_high)? <= sqrt_price_x96 {
        tick_high
    } else {
        tick_low
    })
}

#[cfg(test)]
mod test {
    use super::*;

    mod get_sqrt_ratio_at_tick_test {
        use super::*;

        #[test]
        fn throws_for_too_low_and_too_high() {
            assert_eq!(
                get_sqrt_ratio_at_tick(MIN_TICK - 1),
                Err(ErrorCode::TickOutOfRange)
            );
            assert_eq!(
                get_sqrt_ratio_at_tick(MAX_TICK + 1),
                Err(ErrorCode::TickOutOfRange)
            );
        }

        #[test]
        fn min_and_max_tick_match_the_ratio_bounds() {
            assert_eq!(get_sqrt_ratio_at_tick(MIN_TICK).unwrap(), MIN_SQRT_RATIO_X96);
            assert_eq!(get_sqrt_ratio_at_tick(MAX_TICK).unwrap(), MAX_SQRT_RATIO_X96);
        }

        #[test]
        fn tick_zero_is_unit_price() {
            assert_eq!(
                get_sqrt_ratio_at_tick(0).unwrap(),
                U256::from(79228162514264337593543950336u128)
            );
        }

        #[test]
        fn known_ratios_around_zero() {
            assert_eq!(
                get_sqrt_ratio_at_tick(1).unwrap(),
                U256::from(79232123823359799118286999568u128)
            );
            assert_eq!(
                get_sqrt_ratio_at_tick(-1).unwrap(),
                U256::from(79224201403219477170569942574u128)
            );
        }

        #[test]
        fn min_plus_one() {
            assert_eq!(
                get_sqrt_ratio_at_tick(MIN_TICK + 1).unwrap(),
                U256::from(4295343490u64)
            );
        }

        #[test]
        fn monotonically_increasing() {
            let mut prev = get_sqrt_ratio_at_tick(MIN_TICK).unwrap();
            let mut tick = MIN_TICK + 50_000;
            while tick <= MAX_TICK {
                let cur = get_sqrt_ratio_at_tick(tick).unwrap();
                assert!(cur > prev, "not increasing at tick {}", tick);
                prev = cur;
                tick += 50_000;
            }
        }
    }

    mod get_tick_at_sqrt_ratio_test {
        use super::*;

        #[test]
        fn throws_outside_of_the_price_range() {
            assert_eq!(
                get_tick_at_sqrt_ratio(MIN_SQRT_RATIO_X96 - 1),
                Err(ErrorCode::SqrtPriceOutOfRange)
            );
            assert_eq!(
                get_tick_at_sqrt_ratio(MAX_SQRT_RATIO_X96),
                Err(ErrorCode::SqrtPriceOutOfRange)
            );
        }

        #[test]
        fn boundary_ratios() {
            assert_eq!(get_tick_at_sqrt_ratio(MIN_SQRT_RATIO_X96).unwrap(), MIN_TICK);
            assert_eq!(
                get_tick_at_sqrt_ratio(MAX_SQRT_RATIO_X96 - 1).unwrap(),
                MAX_TICK - 1
            );
        }

        #[test]
        fn unit_price_is_tick_zero() {
            assert_eq!(
                get_tick_at_sqrt_ratio(U256::from(79228162514264337593543950336u128)).unwrap(),
                0
            );
        }

        #[test]
        fn ratio_closest_to_max_tick() {
            // one below the ratio at MAX_TICK resolves to MAX_TICK - 1
            let ratio = get_sqrt_ratio_at_tick(MAX_TICK).unwrap() - 1;
            assert_eq!(get_tick_at_sqrt_ratio(ratio).unwrap(), MAX_TICK - 1);
        }

        #[test]
        fn round_trip_holds_on_a_tick_grid() {
            let mut tick = MIN_TICK;
            while tick <= MAX_TICK {
                let ratio = get_sqrt_ratio_at_tick(tick).unwrap();
                assert_eq!(get_tick_at_sqrt_ratio(ratio).unwrap(), tick, "tick {}", tick);
                // a price one above the tick's own ratio still belongs to it
                if tick != MAX_TICK {
                    assert_eq!(
                        get_tick_at_sqrt_ratio(ratio + 1).unwrap(),
                        tick,
                        "tick {} + 1 wei",
                        tick
                    );
                }
                tick += 2_741; // prime stride to hit varied bit patterns
            }
        }
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn round_trip(tick in MIN_TICK..=MAX_TICK) {
                let ratio = get_sqrt_ratio_at_tick(tick).unwrap();
                prop_assert_eq!(get_tick_at_sqrt_ratio(ratio).unwrap(), tick);
            }

            #[test]
            fn tick_of_ratio_never_exceeds_ratio(tick in MIN_TICK..MAX_TICK) {
                // the resolved tick's own ratio is <= the queried price
                let ratio = get_sqrt_ratio_at_tick(tick).unwrap();
                let probe = ratio + (ratio >> 20u32);
                if probe < MAX_SQRT_RATIO_X96 {
                    let resolved = get_tick_at_sqrt_ratio(probe).unwrap();
                    prop_assert!(get_sqrt_ratio_at_tick(resolved).unwrap() <= probe);
                    prop_assert!(get_sqrt_ratio_at_tick(resolved + 1).unwrap() > probe);
                }
            }
        }
    }
}
