//! The swap execution loop: walks initialized ticks along the price
//! curve until the specified amount is satisfied or the limit price is
//! reached.

use crate::error::ErrorCode;
use crate::interfaces::{Reserves, SwapCallback};
use crate::libraries::big_num::U256;
use crate::libraries::fixed_point_128;
use crate::libraries::full_math::MulDiv;
use crate::libraries::{liquidity_math, swap_math, tick_math};
use crate::states::pool::{Pool, SwapEvent};
use crate::states::tick::TickState;
use crate::Address;

/// Values that do not change over the course of the swap.
struct SwapCache {
    /// Liquidity at the beginning of the swap
    liquidity_start: u128,
    /// The protocol fee denominator for the input token
    fee_protocol: u8,
    /// The current-block accumulators, computed only on the first tick
    /// cross that needs them
    seconds_per_liquidity_cumulative_x128: U256,
    tick_cumulative: i64,
    computed_latest_observation: bool,
}

/// The top level state of the swap, the results of which are recorded
/// at the end.
#[derive(Debug)]
struct SwapState {
    /// The amount remaining to be swapped in/out of the input/output asset
    amount_specified_remaining: i128,
    /// The amount already swapped out/in of the output/input asset
    amount_calculated: i128,
    /// Current sqrt(price)
    sqrt_price_x96: U256,
    /// The tick associated with the current price
    tick: i32,
    /// The global fee growth of the input token
    fee_growth_global_x128: U256,
    /// The amount of input token paid as protocol fee
    protocol_fee: u128,
    /// The current liquidity in range
    liquidity: u128,
}

#[derive(Default)]
struct StepComputations {
    /// The price at the beginning of the step
    sqrt_price_start_x96: U256,
    /// The next tick to swap to from the current tick in the swap direction
    tick_next: i32,
    /// Whether tick_next is initialized
    initialized: bool,
    /// sqrt(price) for the next tick (1/0)
    sqrt_price_next_x96: U256,
    /// How much is being swapped in in this step
    amount_in: u128,
    /// How much is being swapped out
    amount_out: u128,
    /// How much fee is being paid in
    fee_amount: u128,
}

impl Pool {
    /// Swaps token_0 for token_1, or token_1 for token_0.
    ///
    /// Returns the signed balance deltas of the pool: positive amounts
    /// are owed to the pool, negative amounts were paid to `recipient`.
    /// The output side is paid out first, then `callback` must settle
    /// the input side on `reserves`; the pool verifies the input-token
    /// balance grew by at least the owed amount and aborts with
    /// `InsufficientPayment` otherwise, without writing any state.
    ///
    /// # Arguments
    ///
    /// * `recipient` - The address receiving the swap output
    /// * `zero_for_one` - The swap direction, token_0 in for token_1 out when true
    /// * `amount_specified` - The swap amount: exact input when positive,
    ///   exact output when negative
    /// * `sqrt_price_limit_x96` - The Q64.96 price the swap may not pass,
    ///   strictly between the current price and the representable bound
    /// * `data` - Opaque bytes passed through to the callback
    /// * `time` - The current timestamp
    /// * `reserves` - The pool's token ledger
    /// * `callback` - The payer of the owed input
    ///
    #[allow(clippy::too_many_arguments)]
    pub fn swap<R: Reserves>(
        &mut self,
        recipient: Address,
        zero_for_one: bool,
        amount_specified: i128,
        sqrt_price_limit_x96: U256,
        data: &[u8],
        time: u32,
        reserves: &mut R,
        callback: &mut dyn SwapCallback<R>,
    ) -> Result<(i128, i128), ErrorCode> {
        self.with_lock(|pool| {
            pool.swap_inner(
                recipient,
                zero_for_one,
                amount_specified,
                sqrt_price_limit_x96,
                data,
                time,
                reserves,
                callback,
            )
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn swap_inner<R: Reserves>(
        &mut self,
        recipient: Address,
        zero_for_one: bool,
        amount_specified: i128,
        sqrt_price_limit_x96: U256,
        data: &[u8],
        time: u32,
        reserves: &mut R,
        callback: &mut dyn SwapCallback<R>,
    ) -> Result<(i128, i128), ErrorCode> {
        if amount_specified == 0 {
            return Err(ErrorCode::ZeroAmount);
        }
        let limit_ok = if zero_for_one {
            sqrt_price_limit_x96 < self.sqrt_price_x96
                && sqrt_price_limit_x96 > tick_math::MIN_SQRT_RATIO_X96
        } else {
            sqrt_price_limit_x96 > self.sqrt_price_x96
                && sqrt_price_limit_x96 < tick_math::MAX_SQRT_RATIO_X96
        };
        if !limit_ok {
            return Err(ErrorCode::BadSqrtPriceLimit);
        }

        let tick_start = self.tick;
        let mut cache = SwapCache {
            liquidity_start: self.liquidity,
            fee_protocol: if zero_for_one {
                self.fee_protocol % 16
            } else {
                self.fee_protocol >> 4
            },
            seconds_per_liquidity_cumulative_x128: U256::default(),
            tick_cumulative: 0,
            computed_latest_observation: false,
        };

        let exact_input = amount_specified > 0;

        let mut state = SwapState {
            amount_specified_remaining: amount_specified,
            amount_calculated: 0,
            sqrt_price_x96: self.sqrt_price_x96,
            tick: self.tick,
            fee_growth_global_x128: if zero_for_one {
                self.fee_growth_global_0_x128
            } else {
                self.fee_growth_global_1_x128
            },
            protocol_fee: 0,
            liquidity: cache.liquidity_start,
        };

        // ticks crossed during the walk are staged here and written back
        // only once payment has been verified
        let mut crossed_ticks: Vec<TickState> = Vec::new();

        // continue swapping as long as we haven't used the entire
        // input/output and haven't reached the price limit
        while state.amount_specified_remaining != 0
            && state.sqrt_price_x96 != sqrt_price_limit_x96
        {
            let mut step = StepComputations::default();
            step.sqrt_price_start_x96 = state.sqrt_price_x96;

            let (tick_next, initialized) = self.tick_bitmap.next_initialized_tick_within_one_word(
                state.tick,
                self.tick_spacing,
                zero_for_one,
            );
            step.tick_next = tick_next.clamp(tick_math::MIN_TICK, tick_math::MAX_TICK);
            step.initialized = initialized;

            step.sqrt_price_next_x96 = tick_math::get_sqrt_ratio_at_tick(step.tick_next)?;

            // swap toward the tick boundary or the limit, whichever is closer
            let target_price = if (zero_for_one && step.sqrt_price_next_x96 < sqrt_price_limit_x96)
                || (!zero_for_one && step.sqrt_price_next_x96 > sqrt_price_limit_x96)
            {
                sqrt_price_limit_x96
            } else {
                step.sqrt_price_next_x96
            };

            let swap_step = swap_math::compute_swap_step(
                state.sqrt_price_x96,
                target_price,
                state.liquidity,
                state.amount_specified_remaining,
                self.fee,
            )?;
            state.sqrt_price_x96 = swap_step.sqrt_ratio_next_x96;
            step.amount_in = swap_step.amount_in;
            step.amount_out = swap_step.amount_out;
            step.fee_amount = swap_step.fee_amount;

            if exact_input {
                state.amount_specified_remaining = state
                    .amount_specified_remaining
                    .checked_sub(
                        i128::try_from(step.amount_in + step.fee_amount)
                            .map_err(|_| ErrorCode::MathOverflow)?,
                    )
                    .ok_or(ErrorCode::MathOverflow)?;
                state.amount_calculated = state
                    .amount_calculated
                    .checked_sub(
                        i128::try_from(step.amount_out).map_err(|_| ErrorCode::MathOverflow)?,
                    )
                    .ok_or(ErrorCode::MathOverflow)?;
            } else {
                state.amount_specified_remaining = state
                    .amount_specified_remaining
                    .checked_add(
                        i128::try_from(step.amount_out).map_err(|_| ErrorCode::MathOverflow)?,
                    )
                    .ok_or(ErrorCode::MathOverflow)?;
                state.amount_calculated = state
                    .amount_calculated
                    .checked_add(
                        i128::try_from(step.amount_in + step.fee_amount)
                            .map_err(|_| ErrorCode::MathOverflow)?,
                    )
                    .ok_or(ErrorCode::MathOverflow)?;
            }

            // if the protocol fee is on, calculate how much is owed,
            // decrement fee_amount, and increment protocol_fee
            if cache.fee_protocol > 0 {
                let delta = step.fee_amount / cache.fee_protocol as u128;
                step.fee_amount -= delta;
                state.protocol_fee += delta;
            }

            // update the global fee tracker
            if state.liquidity > 0 {
                state.fee_growth_global_x128 = state
                    .fee_growth_global_x128
                    .overflowing_add(
                        U256::from(step.fee_amount)
                            .mul_div_floor(fixed_point_128::Q128, U256::from(state.liquidity))
                            .ok_or(ErrorCode::MathOverflow)?,
                    )
                    .0;
            }

            // shift tick if we reached the next price
            if state.sqrt_price_x96 == step.sqrt_price_next_x96 {
                // if the tick is initialized, run the tick transition
                if step.initialized {
                    // check for the placeholder value, which we replace
                    // with the actual value the first time the swap
                    // crosses an initialized tick
                    if !cache.computed_latest_observation {
                        let (tick_cumulative, seconds_per_liquidity_cumulative_x128) =
                            self.observations.observe_single(
                                time,
                                0,
                                tick_start,
                                self.observation_index,
                                cache.liquidity_start,
                                self.observation_cardinality,
                            )?;
                        cache.tick_cumulative = tick_cumulative;
                        cache.seconds_per_liquidity_cumulative_x128 =
                            seconds_per_liquidity_cumulative_x128;
                        cache.computed_latest_observation = true;
                    }

                    let mut tick_state = crossed_ticks
                        .iter()
                        .find(|t| t.tick == step.tick_next)
                        .copied()
                        .or_else(|| self.ticks.get(&step.tick_next).copied())
                        .expect("bitmap and tick book out of sync");

                    let mut liquidity_net = tick_state.cross(
                        if zero_for_one {
                            state.fee_growth_global_x128
                        } else {
                            self.fee_growth_global_0_x128
                        },
                        if zero_for_one {
                            self.fee_growth_global_1_x128
                        } else {
                            state.fee_growth_global_x128
                        },
                        cache.seconds_per_liquidity_cumulative_x128,
                        cache.tick_cumulative,
                        time,
                    );
                    crossed_ticks.retain(|t| t.tick != step.tick_next);
                    crossed_ticks.push(tick_state);

                    // if we're moving leftward, we interpret liquidity_net
                    // as the opposite sign
                    if zero_for_one {
                        liquidity_net = -liquidity_net;
                    }

                    state.liquidity = liquidity_math::add_delta(state.liquidity, liquidity_net)?;
                }

                state.tick = if zero_for_one {
                    step.tick_next - 1
                } else {
                    step.tick_next
                };
            } else if state.sqrt_price_x96 != step.sqrt_price_start_x96 {
                // recompute unless we're on a lower tick boundary (i.e.
                // already transitioned ticks), and haven't moved
                state.tick = tick_math::get_tick_at_sqrt_ratio(state.sqrt_price_x96)?;
            }
        }

        let (amount_0, amount_1) = if zero_for_one == exact_input {
            (
                amount_specified - state.amount_specified_remaining,
                state.amount_calculated,
            )
        } else {
            (
                state.amount_calculated,
                amount_specified - state.amount_specified_remaining,
            )
        };

        // the curve ran out of liquidity before the swap made any
        // progress at all
        if amount_0 == 0 && amount_1 == 0 {
            return Err(ErrorCode::InsufficientLiquidity);
        }

        // settle: pay the output, collect the input, verify
        if zero_for_one {
            if amount_1 < 0 {
                reserves.transfer_1(recipient, amount_1.unsigned_abs());
            }
            let balance_0_before = reserves.balance_0();
            callback.swap_callback(amount_0, amount_1, data, reserves);
            if reserves.balance_0().saturating_sub(balance_0_before) < amount_0 as u128 {
                return Err(ErrorCode::InsufficientPayment);
            }
        } else {
            if amount_0 < 0 {
                reserves.transfer_0(recipient, amount_0.unsigned_abs());
            }
            let balance_1_before = reserves.balance_1();
            callback.swap_callback(amount_0, amount_1, data, reserves);
            if reserves.balance_1().saturating_sub(balance_1_before) < amount_1 as u128 {
                return Err(ErrorCode::InsufficientPayment);
            }
        }

        // payment verified; commit the staged state
        for tick_state in crossed_ticks {
            self.ticks.insert(tick_state.tick, tick_state);
        }

        // update the price and, if the tick changed, write an oracle
        // entry for the pre-swap state
        if state.tick != tick_start {
            let (observation_index, observation_cardinality) = self.observations.write(
                self.observation_index,
                time,
                tick_start,
                cache.liquidity_start,
                self.observation_cardinality,
                self.observation_cardinality_next,
            );
            self.observation_index = observation_index;
            self.observation_cardinality = observation_cardinality;
            self.tick = state.tick;
        }
        self.sqrt_price_x96 = state.sqrt_price_x96;

        // update liquidity if it changed
        if cache.liquidity_start != state.liquidity {
            self.liquidity = state.liquidity;
        }

        // update fee growth global and, if necessary, protocol fees on
        // the input side
        if zero_for_one {
            self.fee_growth_global_0_x128 = state.fee_growth_global_x128;
            if state.protocol_fee > 0 {
                self.protocol_fees_token_0 =
                    self.protocol_fees_token_0.saturating_add(state.protocol_fee);
            }
        } else {
            self.fee_growth_global_1_x128 = state.fee_growth_global_x128;
            if state.protocol_fee > 0 {
                self.protocol_fees_token_1 =
                    self.protocol_fees_token_1.saturating_add(state.protocol_fee);
            }
        }

        let event = SwapEvent {
            recipient,
            amount_0,
            amount_1,
            sqrt_price_x96: state.sqrt_price_x96,
            liquidity: state.liquidity,
            tick: state.tick,
        };
        tracing::debug!(?event, "swap");

        Ok((amount_0, amount_1))
    }
}
