//! Per-tick state and the outside-accumulator bookkeeping.

use crate::error::ErrorCode;
use crate::libraries::big_num::U256;
use crate::libraries::{liquidity_math, tick_math};

/// State for a price tick that at least one position references as a
/// bound. `liquidity_gross == 0` means the tick is uninitialized; the
/// `initialized` flag is kept alongside so crossing never has to infer
/// it.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickState {
    /// The price tick whose info is stored in this record
    pub tick: i32,

    /// The total position liquidity that references this tick
    pub liquidity_gross: u128,

    /// Amount of net liquidity added (subtracted) when the tick is
    /// crossed from left to right (right to left)
    pub liquidity_net: i128,

    /// Fee growth per unit of liquidity on the _other_ side of this tick
    /// (relative to the current tick). Has only relative meaning: the
    /// value depends on when the tick was initialized.
    pub fee_growth_outside_0_x128: U256,
    pub fee_growth_outside_1_x128: U256,

    /// The cumulative tick value on the other side of the tick
    pub tick_cumulative_outside: i64,

    /// The seconds per unit of liquidity on the _other_ side of this
    /// tick. Relative meaning only, like the fee growth values.
    pub seconds_per_liquidity_outside_x128: U256,

    /// The seconds spent on the other side of the tick
    pub seconds_outside: u32,

    /// True while `liquidity_gross != 0`
    pub initialized: bool,
}

impl TickState {
    pub fn new(tick: i32) -> Self {
        TickState {
            tick,
            ..Default::default()
        }
    }

    /// Updates the tick for a position change and returns true if the
    /// tick flipped between initialized and uninitialized.
    ///
    /// # Arguments
    ///
    /// * `tick_current` - The current tick
    /// * `liquidity_delta` - A new amount of liquidity to be added (subtracted)
    ///   when the tick is crossed from left to right (right to left)
    /// * `fee_growth_global_0_x128` - The all-time global fee growth in token_0,
    ///   per unit of liquidity
    /// * `fee_growth_global_1_x128` - The all-time global fee growth in token_1,
    ///   per unit of liquidity
    /// * `seconds_per_liquidity_cumulative_x128` - The all-time seconds per
    ///   max(1, liquidity) of the pool
    /// * `tick_cumulative` - The tick * time elapsed since the pool was first
    ///   initialized
    /// * `time` - The current block timestamp cast to a u32
    /// * `upper` - true when updating a position's upper tick, false for the
    ///   lower tick
    /// * `max_liquidity` - The maximum liquidity allocation for a single tick
    ///
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        tick_current: i32,
        liquidity_delta: i128,
        fee_growth_global_0_x128: U256,
        fee_growth_global_1_x128: U256,
        seconds_per_liquidity_cumulative_x128: U256,
        tick_cumulative: i64,
        time: u32,
        upper: bool,
        max_liquidity: u128,
    ) -> Result<bool, ErrorCode> {
        let liquidity_gross_before = self.liquidity_gross;
        let liquidity_gross_after =
            liquidity_math::add_delta(liquidity_gross_before, liquidity_delta)?;

        if liquidity_gross_after > max_liquidity {
            return Err(ErrorCode::LiquidityOverflow);
        }

        // Either liquidity_gross_after becomes 0 (uninitialized) XOR
        // liquidity_gross_before was zero (initialized)
        let flipped = (liquidity_gross_after == 0) != (liquidity_gross_before == 0);

        if liquidity_gross_before == 0 {
            // by convention, all growth before a tick was initialized is
            // assumed to have happened _below_ the tick
            if self.tick <= tick_current {
                self.fee_growth_outside_0_x128 = fee_growth_global_0_x128;
                self.fee_growth_outside_1_x128 = fee_growth_global_1_x128;
                self.seconds_per_liquidity_outside_x128 = seconds_per_liquidity_cumulative_x128;
                self.tick_cumulative_outside = tick_cumulative;
                self.seconds_outside = time;
            }
            self.initialized = true;
        }

        self.liquidity_gross = liquidity_gross_after;

        // when the lower (upper) tick is crossed left to right (right to
        // left), liquidity must be added (removed)
        self.liquidity_net = if upper {
            self.liquidity_net.checked_sub(liquidity_delta)
        } else {
            self.liquidity_net.checked_add(liquidity_delta)
        }
        .ok_or(ErrorCode::LiquidityOverflow)?;

        Ok(flipped)
    }

    /// Transitions this tick as the price crosses it, returning the
    /// amount of liquidity added (subtracted) when the tick is crossed
    /// from left to right (right to left).
    ///
    /// Every outside accumulator flips to `global - outside`; fee growth
    /// arithmetic wraps mod 2^256 by design.
    ///
    /// # Arguments
    ///
    /// * `fee_growth_global_0_x128` - The all-time global fee growth in token_0
    /// * `fee_growth_global_1_x128` - The all-time global fee growth in token_1
    /// * `seconds_per_liquidity_cumulative_x128` - The current seconds per liquidity
    /// * `tick_cumulative` - The tick * time elapsed since the pool was first initialized
    /// * `time` - The current block timestamp
    ///
    pub fn cross(
        &mut self,
        fee_growth_global_0_x128: U256,
        fee_growth_global_1_x128: U256,
        seconds_per_liquidity_cumulative_x128: U256,
        tick_cumulative: i64,
        time: u32,
    ) -> i128 {
        self.fee_growth_outside_0_x128 = fee_growth_global_0_x128
            .overflowing_sub(self.fee_growth_outside_0_x128)
            .0;
        self.fee_growth_outside_1_x128 = fee_growth_global_1_x128
            .overflowing_sub(self.fee_growth_outside_1_x128)
            .0;
        self.seconds_per_liquidity_outside_x128 = seconds_per_liquidity_cumulative_x128
            .overflowing_sub(self.seconds_per_liquidity_outside_x128)
            .0;
        self.tick_cumulative_outside =
            tick_cumulative.wrapping_sub(self.tick_cumulative_outside);
        self.seconds_outside = time.wrapping_sub(self.seconds_outside);

        self.liquidity_net
    }

    /// Clears all tick data except the tick index itself.
    pub fn clear(&mut self) {
        self.liquidity_gross = 0;
        self.liquidity_net = 0;
        self.fee_growth_outside_0_x128 = U256::default();
        self.fee_growth_outside_1_x128 = U256::default();
        self.tick_cumulative_outside = 0;
        self.seconds_per_liquidity_outside_x128 = U256::default();
        self.seconds_outside = 0;
        self.initialized = false;
    }

    pub fn is_clear(&self) -> bool {
        self.liquidity_gross == 0
            && self.liquidity_net == 0
            && self.fee_growth_outside_0_x128.is_zero()
            && self.fee_growth_outside_1_x128.is_zero()
            && self.tick_cumulative_outside == 0
            && self.seconds_per_liquidity_outside_x128.is_zero()
            && self.seconds_outside == 0
    }
}

/// Retrieves the all-time fee growth, per unit of liquidity, inside a
/// position's tick boundaries.
///
/// Calculates `fr = fg - f_below(lower) - f_above(upper)`, where the
/// below/above decomposition depends on which side of each bound the
/// current tick is on. All subtraction is mod 2^256.
///
/// # Arguments
///
/// * `tick_lower` - The lower tick boundary of the position
/// * `tick_upper` - The upper tick boundary of the position
/// * `tick_current` - The current tick
/// * `fee_growth_global_0_x128` - The all-time global fee growth in token_0
/// * `fee_growth_global_1_x128` - The all-time global fee growth in token_1
///
pub fn get_fee_growth_inside(
    tick_lower: &TickState,
    tick_upper: &TickState,
    tick_current: i32,
    fee_growth_global_0_x128: U256,
    fee_growth_global_1_x128: U256,
) -> (U256, U256) {
    // calculate fee growth below
    let (fee_growth_below_0_x128, fee_growth_below_1_x128) = if tick_current >= tick_lower.tick {
        (
            tick_lower.fee_growth_outside_0_x128,
            tick_lower.fee_growth_outside_1_x128,
        )
    } else {
        (
            fee_growth_global_0_x128
                .overflowing_sub(tick_lower.fee_growth_outside_0_x128)
                .0,
            fee_growth_global_1_x128
                .overflowing_sub(tick_lower.fee_growth_outside_1_x128)
                .0,
        )
    };

    // calculate fee growth above
    let (fee_growth_above_0_x128, fee_growth_above_1_x128) = if tick_current < tick_upper.tick {
        (
            tick_upper.fee_growth_outside_0_x128,
            tick_upper.fee_growth_outside_1_x128,
        )
    } else {
        (
            fee_growth_global_0_x128
                .overflowing_sub(tick_upper.fee_growth_outside_0_x128)
                .0,
            fee_growth_global_1_x128
                .overflowing_sub(tick_upper.fee_growth_outside_1_x128)
                .0,
        )
    };

    let fee_growth_inside_0_x128 = fee_growth_global_0_x128
        .overflowing_sub(fee_growth_below_0_x128)
        .0
        .overflowing_sub(fee_growth_above_0_x128)
        .0;
    let fee_growth_inside_1_x128 = fee_growth_global_1_x128
        .overflowing_sub(fee_growth_below_1_x128)
        .0
        .overflowing_sub(fee_growth_above_1_x128)
        .0;

    (fee_growth_inside_0_x128, fee_growth_inside_1_x128)
}

/// Derives the maximum liquidity per tick from the tick spacing.
///
/// # Arguments
///
/// * `tick_spacing` - The amount of required tick separation; e.g. a
///   tick spacing of 3 permits ticks ..., -6, -3, 0, 3, 6, ...
///
pub fn max_liquidity_per_tick(tick_spacing: u16) -> u128 {
    let spacing = tick_spacing as i32;
    let min_tick = (tick_math::MIN_TICK / spacing) * spacing;
    let max_tick = (tick_math::MAX_TICK / spacing) * spacing;
    let num_ticks = ((max_tick - min_tick) / spacing) as u128 + 1;

    u128::MAX / num_ticks
}
