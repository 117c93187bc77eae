//! Shared plumbing for mint and burn: applies a liquidity delta to a
//! position, its bound ticks, the bitmap, the in-range liquidity and
//! the oracle, and prices the delta in token amounts.

use crate::error::ErrorCode;
use crate::libraries::{liquidity_math, sqrt_price_math, tick_math};
use crate::states::position::PositionKey;
use crate::states::tick::{self, TickState};
use crate::states::pool::Pool;
use crate::Address;

impl Pool {
    /// Prices a liquidity delta in signed token amounts at the current
    /// pool price, without touching any state. Positive amounts are
    /// owed to the pool, negative amounts are owed to the position
    /// owner.
    pub(crate) fn amounts_for_liquidity_delta(
        &self,
        tick_lower: i32,
        tick_upper: i32,
        liquidity_delta: i128,
    ) -> Result<(i128, i128), ErrorCode> {
        if liquidity_delta == 0 {
            return Ok((0, 0));
        }

        if self.tick < tick_lower {
            // current tick is below the range: the position needs only
            // token_0, which is more valuable at lower prices
            Ok((
                sqrt_price_math::get_amount_0_delta_signed(
                    tick_math::get_sqrt_ratio_at_tick(tick_lower)?,
                    tick_math::get_sqrt_ratio_at_tick(tick_upper)?,
                    liquidity_delta,
                )?,
                0,
            ))
        } else if self.tick < tick_upper {
            Ok((
                sqrt_price_math::get_amount_0_delta_signed(
                    self.sqrt_price_x96,
                    tick_math::get_sqrt_ratio_at_tick(tick_upper)?,
                    liquidity_delta,
                )?,
                sqrt_price_math::get_amount_1_delta_signed(
                    tick_math::get_sqrt_ratio_at_tick(tick_lower)?,
                    self.sqrt_price_x96,
                    liquidity_delta,
                )?,
            ))
        } else {
            // current tick is above the range: only token_1
            Ok((
                0,
                sqrt_price_math::get_amount_1_delta_signed(
                    tick_math::get_sqrt_ratio_at_tick(tick_lower)?,
                    tick_math::get_sqrt_ratio_at_tick(tick_upper)?,
                    liquidity_delta,
                )?,
            ))
        }
    }

    /// Applies a liquidity change to a position and everything hanging
    /// off it, returning the signed token deltas the change is worth.
    ///
    /// All fallible steps run against staged copies before the first
    /// write, so an error commits nothing.
    pub(crate) fn modify_position(
        &mut self,
        owner: Address,
        tick_lower: i32,
        tick_upper: i32,
        liquidity_delta: i128,
        time: u32,
    ) -> Result<(i128, i128), ErrorCode> {
        Pool::check_ticks(tick_lower, tick_upper)?;
        let spacing = self.tick_spacing as i32;
        if tick_lower % spacing != 0 || tick_upper % spacing != 0 {
            return Err(ErrorCode::TickNotSpaced);
        }

        let (amount_0, amount_1) =
            self.amounts_for_liquidity_delta(tick_lower, tick_upper, liquidity_delta)?;

        // the in-range liquidity change is pre-checked so the later
        // commit cannot fail halfway
        let in_range =
            liquidity_delta != 0 && self.tick >= tick_lower && self.tick < tick_upper;
        let liquidity_next = if in_range {
            Some(liquidity_math::add_delta(self.liquidity, liquidity_delta)?)
        } else {
            None
        };

        self.update_position(owner, tick_lower, tick_upper, liquidity_delta, time)?;

        if let Some(liquidity_next) = liquidity_next {
            // a position intersecting the current tick changes the
            // active liquidity: record an observation of the state
            // before the change
            let (index, cardinality) = self.observations.write(
                self.observation_index,
                time,
                self.tick,
                self.liquidity,
                self.observation_cardinality,
                self.observation_cardinality_next,
            );
            self.observation_index = index;
            self.observation_cardinality = cardinality;
            self.liquidity = liquidity_next;
        }

        Ok((amount_0, amount_1))
    }

    /// Updates the position record and its two bound ticks, flipping
    /// bitmap bits and clearing ticks whose gross liquidity returns to
    /// zero.
    fn update_position(
        &mut self,
        owner: Address,
        tick_lower: i32,
        tick_upper: i32,
        liquidity_delta: i128,
        time: u32,
    ) -> Result<(), ErrorCode> {
        let tick_current = self.tick;

        // stage the tick updates on copies
        let mut lower = self
            .ticks
            .get(&tick_lower)
            .copied()
            .unwrap_or_else(|| TickState::new(tick_lower));
        let mut upper = self
            .ticks
            .get(&tick_upper)
            .copied()
            .unwrap_or_else(|| TickState::new(tick_upper));

        let mut flipped_lower = false;
        let mut flipped_upper = false;
        if liquidity_delta != 0 {
            let (tick_cumulative, seconds_per_liquidity_cumulative_x128) =
                self.observations.observe_single(
                    time,
                    0,
                    self.tick,
                    self.observation_index,
                    self.liquidity,
                    self.observation_cardinality,
                )?;

            flipped_lower = lower.update(
                tick_current,
                liquidity_delta,
                self.fee_growth_global_0_x128,
                self.fee_growth_global_1_x128,
                seconds_per_liquidity_cumulative_x128,
                tick_cumulative,
                time,
                false,
                self.max_liquidity_per_tick,
            )?;
            flipped_upper = upper.update(
                tick_current,
                liquidity_delta,
                self.fee_growth_global_0_x128,
                self.fee_growth_global_1_x128,
                seconds_per_liquidity_cumulative_x128,
                tick_cumulative,
                time,
                true,
                self.max_liquidity_per_tick,
            )?;
        }

        let (fee_growth_inside_0_x128, fee_growth_inside_1_x128) = tick::get_fee_growth_inside(
            &lower,
            &upper,
            tick_current,
            self.fee_growth_global_0_x128,
            self.fee_growth_global_1_x128,
        );

        let key = PositionKey {
            owner,
            tick_lower,
            tick_upper,
        };
        let mut position = self.positions.get(&key).copied().unwrap_or_default();
        position.update(
            liquidity_delta,
            fee_growth_inside_0_x128,
            fee_growth_inside_1_x128,
        )?;

        // every fallible step is done; commit
        if liquidity_delta != 0 {
            if flipped_lower {
                self.tick_bitmap.flip_tick(tick_lower, self.tick_spacing)?;
            }
            if flipped_upper {
                self.tick_bitmap.flip_tick(tick_upper, self.tick_spacing)?;
            }

            // ticks flipped off by removed liquidity are deallocated
            if flipped_lower && liquidity_delta < 0 {
                self.ticks.remove(&tick_lower);
            } else {
                self.ticks.insert(tick_lower, lower);
            }
            if flipped_upper && liquidity_delta < 0 {
                self.ticks.remove(&tick_upper);
            } else {
                self.ticks.insert(tick_upper, upper);
            }
        }
        self.positions.insert(key, position);

        Ok(())
    }
}
