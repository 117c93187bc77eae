//! Price changes for a change in token supply and vice versa.

use crate::error::ErrorCode;
use crate::libraries::big_num::U256;
use crate::libraries::fixed_point_96;
use crate::libraries::full_math::MulDiv;
use crate::libraries::tick_math;
use crate::libraries::unsafe_math::UnsafeMathTrait;

/// Gets the next sqrt price √P' given a delta of token_0.
///
/// Always round up, because in the exact output case (decreasing supply)
/// the price must move up enough to pay out the exact output, and in the
/// exact input case (increasing supply) rounding up keeps the price from
/// overshooting past what the input pays for.
///
/// # Formula
///
/// * `√P' = √P * L / (L + Δx * √P)`
/// * If `Δx * √P` overflows, the alternate form `√P' = L / (L/√P + Δx)`
///
/// # Arguments
///
/// * `sqrt_price_x96` - The starting price `√P`
/// * `liquidity` - The amount of usable liquidity L
/// * `amount` - Delta of token 0 (Δx) to add or remove from virtual reserves
/// * `add` - Whether to add or remove the amount of token_0
///
pub fn get_next_sqrt_price_from_amount_0_rounding_up(
    sqrt_price_x96: U256,
    liquidity: u128,
    amount: u128,
    add: bool,
) -> Result<U256, ErrorCode> {
    // short circuit amount == 0 because the result is otherwise not
    // guaranteed to equal the input price
    if amount == 0 {
        return Ok(sqrt_price_x96);
    }
    let numerator_1 = U256::from(liquidity) << fixed_point_96::RESOLUTION;

    if add {
        if let Some(product) = U256::from(amount).checked_mul(sqrt_price_x96) {
            let (denominator, overflow) = numerator_1.overflowing_add(product);
            if !overflow {
                return numerator_1
                    .mul_div_ceil(sqrt_price_x96, denominator)
                    .ok_or(ErrorCode::MathOverflow);
            }
        }
        // Alternate form if the product overflows - `√P' = L / (L/√P + Δx)`
        Ok(U256::div_rounding_up(
            numerator_1,
            (numerator_1 / sqrt_price_x96)
                .checked_add(U256::from(amount))
                .ok_or(ErrorCode::MathOverflow)?,
        ))
    } else {
        // if the product overflows the denominator underflows: removing
        // this much token_0 would push the price past the upper bound
        let product = U256::from(amount)
            .checked_mul(sqrt_price_x96)
            .ok_or(ErrorCode::MathOverflow)?;
        if numerator_1 <= product {
            return Err(ErrorCode::MathOverflow);
        }

        let denominator = numerator_1 - product;
        numerator_1
            .mul_div_ceil(sqrt_price_x96, denominator)
            .ok_or(ErrorCode::MathOverflow)
    }
}

/// Gets the next sqrt price given a delta of token_1.
///
/// Always round down: in the exact output case the price moves down and
/// must not stop short of paying the exact output; in the exact input
/// case the upward move may not overstate what the input pays for.
///
/// # Formula
///
/// * `√P' = √P + Δy / L`
///
/// # Arguments
///
/// * `sqrt_price_x96` - The starting price `√P`
/// * `liquidity` - The amount of usable liquidity L
/// * `amount` - Delta of token 1 (Δy) to add or remove from virtual reserves
/// * `add` - Whether to add or remove the amount of token_1
///
pub fn get_next_sqrt_price_from_amount_1_rounding_down(
    sqrt_price_x96: U256,
    liquidity: u128,
    amount: u128,
    add: bool,
) -> Result<U256, ErrorCode> {
    // if we are adding (subtracting), rounding down requires rounding the
    // quotient down (up)
    let numerator = U256::from(amount) << fixed_point_96::RESOLUTION;
    if add {
        let quotient = numerator / U256::from(liquidity);
        let next = sqrt_price_x96
            .checked_add(quotient)
            .ok_or(ErrorCode::MathOverflow)?;
        if next >= tick_math::MAX_SQRT_RATIO_X96 {
            return Err(ErrorCode::SqrtPriceOutOfRange);
        }
        Ok(next)
    } else {
        let quotient = U256::div_rounding_up(numerator, U256::from(liquidity));
        if sqrt_price_x96 <= quotient {
            return Err(ErrorCode::MathOverflow);
        }
        Ok(sqrt_price_x96 - quotient)
    }
}

/// Gets the next sqrt price given an input amount of token_0 or token_1.
///
/// Fails if price or liquidity are 0, or if the next price is out of bounds.
///
/// # Arguments
///
/// * `sqrt_price_x96` - The starting price `√P`, before accounting for the input amount
/// * `liquidity` - The amount of usable liquidity
/// * `amount_in` - How much of token_0, or token_1, is being swapped in
/// * `zero_for_one` - Whether the amount in is token_0 or token_1
///
pub fn get_next_sqrt_price_from_input(
    sqrt_price_x96: U256,
    liquidity: u128,
    amount_in: u128,
    zero_for_one: bool,
) -> Result<U256, ErrorCode> {
    assert!(!sqrt_price_x96.is_zero());
    assert!(liquidity > 0);

    // round to make sure that we don't pass the target price
    if zero_for_one {
        get_next_sqrt_price_from_amount_0_rounding_up(sqrt_price_x96, liquidity, amount_in, true)
    } else {
        get_next_sqrt_price_from_amount_1_rounding_down(sqrt_price_x96, liquidity, amount_in, true)
    }
}

/// Gets the next sqrt price given an output amount of token_0 or token_1.
///
/// Fails if price or liquidity are 0, or the next price is out of bounds.
///
/// # Arguments
///
/// * `sqrt_price_x96` - The starting price `√P`, before accounting for the output amount
/// * `liquidity` - The amount of usable liquidity
/// * `amount_out` - How much of token_0, or token_1, is being swapped out
/// * `zero_for_one` - Whether the amount out is token_1 or token_0
///
pub fn get_next_sqrt_price_from_output(
    sqrt_price_x96: U256,
    liquidity: u128,
    amount_out: u128,
    zero_for_one: bool,
) -> Result<U256, ErrorCode> {
    assert!(!sqrt_price_x96.is_zero());
    assert!(liquidity > 0);

    if zero_for_one {
        get_next_sqrt_price_from_amount_1_rounding_down(sqrt_price_x96, liquidity, amount_out, false)
    } else {
        get_next_sqrt_price_from_amount_0_rounding_up(sqrt_price_x96, liquidity, amount_out, false)
    }
}

/// Gets the amount_0 delta between two prices for a given amount of
/// liquidity.
///
/// # Formula
///
/// * `Δx = L * (1 / √P_lower - 1 / √P_upper)`
/// * i.e. `L * (√P_upper - √P_lower) / (√P_upper * √P_lower)`
///
/// # Arguments
///
/// * `sqrt_ratio_a_x96` - A sqrt price
/// * `sqrt_ratio_b_x96` - Another sqrt price
/// * `liquidity` - The amount of usable liquidity
/// * `round_up` - Whether to round the amount up or down
///
pub fn get_amount_0_delta_unsigned(
    mut sqrt_ratio_a_x96: U256,
    mut sqrt_ratio_b_x96: U256,
    liquidity: u128,
    round_up: bool,
) -> Result<u128, ErrorCode> {
    // sqrt_ratio_a_x96 holds the smaller value
    if sqrt_ratio_a_x96 > sqrt_ratio_b_x96 {
        core::mem::swap(&mut sqrt_ratio_a_x96, &mut sqrt_ratio_b_x96);
    };
    assert!(!sqrt_ratio_a_x96.is_zero());

    let numerator_1 = U256::from(liquidity) << fixed_point_96::RESOLUTION;
    let numerator_2 = sqrt_ratio_b_x96 - sqrt_ratio_a_x96;

    let amount = if round_up {
        U256::div_rounding_up(
            numerator_1
                .mul_div_ceil(numerator_2, sqrt_ratio_b_x96)
                .ok_or(ErrorCode::MathOverflow)?,
            sqrt_ratio_a_x96,
        )
    } else {
        numerator_1
            .mul_div_floor(numerator_2, sqrt_ratio_b_x96)
            .ok_or(ErrorCode::MathOverflow)?
            / sqrt_ratio_a_x96
    };
    if amount > U256::from(u128::MAX) {
        return Err(ErrorCode::MathOverflow);
    }
    Ok(amount.as_u128())
}

/// Gets the amount_1 delta between two prices for a given amount of
/// liquidity.
///
/// # Formula
///
/// * `Δy = L * (√P_upper - √P_lower)`
///
/// # Arguments
///
/// * `sqrt_ratio_a_x96` - A sqrt price
/// * `sqrt_ratio_b_x96` - Another sqrt price
/// * `liquidity` - The amount of usable liquidity
/// * `round_up` - Whether to round the amount up or down
///
pub fn get_amount_1_delta_unsigned(
    mut sqrt_ratio_a_x96: U256,
    mut sqrt_ratio_b_x96: U256,
    liquidity: u128,
    round_up: bool,
) -> Result<u128, ErrorCode> {
    // sqrt_ratio_a_x96 holds the smaller value
    if sqrt_ratio_a_x96 > sqrt_ratio_b_x96 {
        core::mem::swap(&mut sqrt_ratio_a_x96, &mut sqrt_ratio_b_x96);
    };

    let q96 = U256::from(fixed_point_96::Q96);
    let amount = if round_up {
        U256::from(liquidity).mul_div_ceil(sqrt_ratio_b_x96 - sqrt_ratio_a_x96, q96)
    } else {
        U256::from(liquidity).mul_div_floor(sqrt_ratio_b_x96 - sqrt_ratio_a_x96, q96)
    }
    .ok_or(ErrorCode::MathOverflow)?;
    if amount > U256::from(u128::MAX) {
        return Err(ErrorCode::MathOverflow);
    }
    Ok(amount.as_u128())
}

/// Helper to get the signed token_0 delta between two prices for a
/// signed change in liquidity. The pool rounds up when it is owed
/// tokens (positive delta) and down when it pays (negative delta).
pub fn get_amount_0_delta_signed(
    sqrt_ratio_a_x96: U256,
    sqrt_ratio_b_x96: U256,
    liquidity: i128,
) -> Result<i128, ErrorCode> {
    if liquidity < 0 {
        let amount = get_amount_0_delta_unsigned(
            sqrt_ratio_a_x96,
            sqrt_ratio_b_x96,
            liquidity.unsigned_abs(),
            false,
        )?;
        Ok(-i128::try_from(amount).map_err(|_| ErrorCode::MathOverflow)?)
    } else {
        let amount =
            get_amount_0_delta_unsigned(sqrt_ratio_a_x96, sqrt_ratio_b_x96, liquidity as u128, true)?;
        i128::try_from(amount).map_err(|_| ErrorCode::MathOverflow)
    }
}

/// Helper to get the signed token_1 delta between two prices for a
/// signed change in liquidity.
pub fn get_amount_1_delta_signed(
    sqrt_ratio_a_x96: U256,
    sqrt_ratio_b_x96: U256,
    liquidity: i128,
) -> Result<i128, ErrorCode> {
    if liquidity < 0 {
        let amount = get_amount_1_delta_unsigned(
            sqrt_ratio_a_x96,
            sqrt_ratio_b_x96,
            liquidity.unsigned_abs(),
            false,
        )?;
        Ok(-i128::try_from(amount).map_err(|_| ErrorCode::MathOverflow)?)
    } else {
        let amount =
            get_amount_1_delta_unsigned(sqrt_ratio_a_x96, sqrt_ratio_b_x96, liquidity as u128, true)?;
        i128::try_from(amount).map_err(|_| ErrorCode::MathOverflow)
    }
}
