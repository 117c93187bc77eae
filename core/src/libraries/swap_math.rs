//! Finds the result of a swap within a single tick range.

use crate::error::ErrorCode;
use crate::libraries::big_num::U256;
use crate::libraries::full_math::MulDiv;
use crate::libraries::sqrt_price_math;
use crate::states::pool::FEE_RATE_DENOMINATOR;

/// Result of a swap step
#[derive(Default, Debug, PartialEq, Eq)]
pub struct SwapStep {
    /// The price after swapping the amount in/out, not to exceed the price target
    pub sqrt_ratio_next_x96: U256,

    /// The amount to be swapped in, of either token_0 or token_1, based on the direction of the swap
    pub amount_in: u128,

    /// The amount to be received, of either token_0 or token_1, based on the direction of the swap
    pub amount_out: u128,

    /// The amount of input that will be taken as a fee
    pub fee_amount: u128,
}

/// Computes the result of swapping some amount in, or amount out, given
/// the parameters of the swap.
///
/// The fee, plus the amount in, will never exceed the amount remaining
/// in an exact input swap.
///
/// # Arguments
///
/// * `sqrt_ratio_current_x96` - The current sqrt price of the pool
/// * `sqrt_ratio_target_x96` - The price that cannot be exceeded, from which
///   the direction of the swap is determined
/// * `liquidity` - The usable liquidity
/// * `amount_remaining` - How much input or output amount is remaining to be
///   swapped in/out; exact input when positive
/// * `fee_pips` - The fee taken from the input amount, in hundredths of a bip
///
pub fn compute_swap_step(
    sqrt_ratio_current_x96: U256,
    sqrt_ratio_target_x96: U256,
    liquidity: u128,
    amount_remaining: i128,
    fee_pips: u32,
) -> Result<SwapStep, ErrorCode> {
    let zero_for_one = sqrt_ratio_current_x96 >= sqrt_ratio_target_x96;
    let exact_in = amount_remaining >= 0;
    let mut swap_step = SwapStep::default();

    if exact_in {
        // round up amount_in
        let amount_remaining_less_fee = (amount_remaining as u128)
            .mul_div_floor(
                (FEE_RATE_DENOMINATOR - fee_pips) as u128,
                FEE_RATE_DENOMINATOR as u128,
            )
            .ok_or(ErrorCode::MathOverflow)?;
        swap_step.amount_in = if zero_for_one {
            sqrt_price_math::get_amount_0_delta_unsigned(
                sqrt_ratio_target_x96,
                sqrt_ratio_current_x96,
                liquidity,
                true,
            )?
        } else {
            sqrt_price_math::get_amount_1_delta_unsigned(
                sqrt_ratio_current_x96,
                sqrt_ratio_target_x96,
                liquidity,
                true,
            )?
        };
        swap_step.sqrt_ratio_next_x96 = if amount_remaining_less_fee >= swap_step.amount_in {
            sqrt_ratio_target_x96
        } else {
            sqrt_price_math::get_next_sqrt_price_from_input(
                sqrt_ratio_current_x96,
                liquidity,
                amount_remaining_less_fee,
                zero_for_one,
            )?
        };
    } else {
        // round down amount_out
        swap_step.amount_out = if zero_for_one {
            sqrt_price_math::get_amount_1_delta_unsigned(
                sqrt_ratio_target_x96,
                sqrt_ratio_current_x96,
                liquidity,
                false,
            )?
        } else {
            sqrt_price_math::get_amount_0_delta_unsigned(
                sqrt_ratio_current_x96,
                sqrt_ratio_target_x96,
                liquidity,
                false,
            )?
        };
        swap_step.sqrt_ratio_next_x96 = if amount_remaining.unsigned_abs() >= swap_step.amount_out {
            sqrt_ratio_target_x96
        } else {
            sqrt_price_math::get_next_sqrt_price_from_output(
                sqrt_ratio_current_x96,
                liquidity,
                amount_remaining.unsigned_abs(),
                zero_for_one,
            )?
        }
    }

    // whether we reached the target price for this tick range
    let max = sqrt_ratio_target_x96 == swap_step.sqrt_ratio_next_x96;
    // get the input / output amounts when the target price is not reached
    if zero_for_one {
        // if max is reached for the exact input case, the whole amount_in is needed
        if !(max && exact_in) {
            swap_step.amount_in = sqrt_price_math::get_amount_0_delta_unsigned(
                swap_step.sqrt_ratio_next_x96,
                sqrt_ratio_current_x96,
                liquidity,
                true,
            )?;
        };
        if !(max && !exact_in) {
            swap_step.amount_out = sqrt_price_math::get_amount_1_delta_unsigned(
                swap_step.sqrt_ratio_next_x96,
                sqrt_ratio_current_x96,
                liquidity,
                false,
            )?;
        };
    } else {
        if !(max && exact_in) {
            swap_step.amount_in = sqrt_price_math::get_amount_1_delta_unsigned(
                sqrt_ratio_current_x96,
                swap_step.sqrt_ratio_next_x96,
                liquidity,
                true,
            )?;
        };
        if !(max && !exact_in) {
            swap_step.amount_out = sqrt_price_math::get_amount_0_delta_unsigned(
                sqrt_ratio_current_x96,
                swap_step.sqrt_ratio_next_x96,
                liquidity,
                false,
            )?;
        };
    }

    // cap the output amount to not exceed the remaining output amount
    if !exact_in && swap_step.amount_out > amount_remaining.unsigned_abs() {
        swap_step.amount_out = amount_remaining.unsigned_abs();
    }

    swap_step.fee_amount = if exact_in && swap_step.sqrt_ratio_next_x96 != sqrt_ratio_target_x96 {
        // we didn't reach the target, so the remainder of the maximum
        // input is taken as fee; swap dust is granted as fee
        (amount_remaining as u128)
            .checked_sub(swap_step.amount_in)
            .ok_or(ErrorCode::MathOverflow)?
    } else {
        // take the pip percentage as fee
        swap_step
            .amount_in
            .mul_div_ceil(fee_pips as u128, (FEE_RATE_DENOMINATOR - fee_pips) as u128)
            .ok_or(ErrorCode::MathOverflow)?
    };

    Ok(swap_step)
}
