//! Constants for Q128.128 fixed point numbers, the encoding of
//! per-unit-of-liquidity fee growth.

use crate::libraries::big_num::U256;

/// 2^128, as a little endian limb array.
pub const Q128: U256 = U256([0, 0, 1, 0]);
