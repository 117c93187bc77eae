//! The pool state: immutable parameters, the spot price record, fee
//! accumulators, and the owned books (ticks, bitmap, positions,
//! observations).

use std::collections::BTreeMap;

use crate::error::ErrorCode;
use crate::libraries::big_num::U256;
use crate::libraries::tick_math;
use crate::states::oracle::ObservationState;
use crate::states::position::{PositionKey, PositionState};
use crate::states::tick::{self, TickState};
use crate::states::tick_bitmap::TickBitmap;
use crate::Address;

/// The fee denominator: fees are expressed in hundredths of a bip.
pub const FEE_RATE_DENOMINATOR: u32 = 1_000_000;

/// A single two-asset concentrated liquidity pool.
///
/// Token balances live behind the [`crate::interfaces::Reserves`]
/// collaborator; everything else the pool owns outright. The pool starts
/// uninitialized (price zero, locked) and becomes usable after
/// [`Pool::initialize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pool {
    /// Token pair of the pool, where `token_0 < token_1`
    pub token_0: Address,
    pub token_1: Address,

    /// Fee amount for swaps, denominated in hundredths of a bip
    pub fee: u32,

    /// The minimum number of ticks between initialized ticks
    pub tick_spacing: u16,

    /// The maximum liquidity any one tick may reference, derived from
    /// the tick spacing
    pub max_liquidity_per_tick: u128,

    /// The factory owner, allowed to set and collect protocol fees
    pub owner: Address,

    /// The current price of the pool as a sqrt(token_1/token_0) Q64.96
    /// value. Zero until initialized.
    pub sqrt_price_x96: U256,

    /// The current tick, i.e. according to the last tick transition that
    /// was run. May not always equal
    /// `get_tick_at_sqrt_ratio(sqrt_price_x96)` if the price is on a
    /// tick boundary. Not necessarily a multiple of tick_spacing.
    pub tick: i32,

    /// The most-recently updated index of the observations ring
    pub observation_index: u16,

    /// The current maximum number of observations that are being stored
    pub observation_cardinality: u16,

    /// The next maximum number of observations to store, triggered on a
    /// write that wraps the live prefix
    pub observation_cardinality_next: u16,

    /// The denominators of the protocol's share of fees, packed as two
    /// nibbles: low for token_0, high for token_1. Each nibble is 0 or
    /// in [4, 10].
    pub fee_protocol: u8,

    /// Whether the pool is currently unlocked to state-changing
    /// operations
    pub unlocked: bool,

    /// Fees of token_0 and token_1 collected per unit of liquidity for
    /// the entire life of the pool, as Q128.128 values that wrap on
    /// overflow
    pub fee_growth_global_0_x128: U256,
    pub fee_growth_global_1_x128: U256,

    /// The amounts of token_0 and token_1 owed to the protocol; they
    /// saturate rather than wrap
    pub protocol_fees_token_0: u128,
    pub protocol_fees_token_1: u128,

    /// The currently in-range liquidity available to the pool. This
    /// value has no relationship to the total liquidity across all
    /// ticks.
    pub liquidity: u128,

    /// Initialized tick states, keyed by tick index
    pub ticks: BTreeMap<i32, TickState>,

    /// Word-packed set of initialized ticks
    pub tick_bitmap: TickBitmap,

    /// Position states, keyed by owner and bounds
    pub positions: BTreeMap<PositionKey, PositionState>,

    /// The oracle ring buffer
    pub observations: ObservationState,
}

impl Pool {
    /// Creates an uninitialized pool for an ordered token pair.
    ///
    /// # Arguments
    ///
    /// * `token_0`, `token_1` - The pool pair, ordered `token_0 < token_1`
    /// * `fee` - Trade fee in hundredths of a bip
    /// * `tick_spacing` - The stride between usable ticks
    /// * `owner` - The factory owner, allowed to adjust protocol fees
    ///
    pub fn new(token_0: Address, token_1: Address, fee: u32, tick_spacing: u16, owner: Address) -> Self {
        assert!(token_0 < token_1, "token pair must be ordered");
        assert!(fee < FEE_RATE_DENOMINATOR, "fee must be below 100%");
        assert!(tick_spacing > 0, "tick spacing must be positive");

        Pool {
            token_0,
            token_1,
            fee,
            tick_spacing,
            max_liquidity_per_tick: tick::max_liquidity_per_tick(tick_spacing),
            owner,
            sqrt_price_x96: U256::default(),
            tick: 0,
            observation_index: 0,
            observation_cardinality: 0,
            observation_cardinality_next: 0,
            fee_protocol: 0,
            unlocked: false,
            fee_growth_global_0_x128: U256::default(),
            fee_growth_global_1_x128: U256::default(),
            protocol_fees_token_0: 0,
            protocol_fees_token_1: 0,
            liquidity: 0,
            ticks: BTreeMap::new(),
            tick_bitmap: TickBitmap::default(),
            positions: BTreeMap::new(),
            observations: ObservationState::default(),
        }
    }

    /// Common checks for valid tick inputs.
    pub(crate) fn check_ticks(tick_lower: i32, tick_upper: i32) -> Result<(), ErrorCode> {
        if tick_lower >= tick_upper {
            return Err(ErrorCode::TickMisordered);
        }
        if tick_lower < tick_math::MIN_TICK || tick_upper > tick_math::MAX_TICK {
            return Err(ErrorCode::TickOutOfRange);
        }
        Ok(())
    }

    /// Runs a state-mutating operation under the reentrancy flag.
    ///
    /// Operations are atomic: a body that returns `Err` has not written
    /// any pool state, so the flag is restored on both outcomes.
    pub(crate) fn with_lock<T>(
        &mut self,
        f: impl FnOnce(&mut Pool) -> Result<T, ErrorCode>,
    ) -> Result<T, ErrorCode> {
        if !self.unlocked {
            return Err(ErrorCode::Locked);
        }
        self.unlocked = false;
        let result = f(self);
        self.unlocked = true;
        result
    }

    /// Returns the accumulator values as of each of `seconds_agos`
    /// seconds before `time`. Read-only, does not take the lock.
    pub fn observe(&self, time: u32, seconds_agos: &[u32]) -> Result<Vec<(i64, U256)>, ErrorCode> {
        self.observations.observe(
            time,
            seconds_agos,
            self.tick,
            self.observation_index,
            self.liquidity,
            self.observation_cardinality,
        )
    }

    /// Returns a snapshot of the tick cumulative, seconds per liquidity
    /// and seconds inside a tick range.
    ///
    /// Snapshots must only be compared to other snapshots taken over a
    /// period for which a position existed: the individual values have
    /// no absolute meaning. Both bound ticks must be initialized.
    pub fn snapshot_cumulatives_inside(
        &self,
        tick_lower: i32,
        tick_upper: i32,
        time: u32,
    ) -> Result<SnapshotCumulative, ErrorCode> {
        Pool::check_ticks(tick_lower, tick_upper)?;
        let lower = self
            .ticks
            .get(&tick_lower)
            .ok_or(ErrorCode::TickNotInitialized)?;
        let upper = self
            .ticks
            .get(&tick_upper)
            .ok_or(ErrorCode::TickNotInitialized)?;

        if self.tick < tick_lower {
            Ok(SnapshotCumulative {
                tick_cumulative_inside: lower
                    .tick_cumulative_outside
                    .wrapping_sub(upper.tick_cumulative_outside),
                seconds_per_liquidity_inside_x128: lower
                    .seconds_per_liquidity_outside_x128
                    .overflowing_sub(upper.seconds_per_liquidity_outside_x128)
                    .0,
                seconds_inside: lower.seconds_outside.wrapping_sub(upper.seconds_outside),
            })
        } else if self.tick < tick_upper {
            let (tick_cumulative, seconds_per_liquidity_cumulative_x128) =
                self.observations.observe_single(
                    time,
                    0,
                    self.tick,
                    self.observation_index,
                    self.liquidity,
                    self.observation_cardinality,
                )?;
            Ok(SnapshotCumulative {
                tick_cumulative_inside: tick_cumulative
                    .wrapping_sub(lower.tick_cumulative_outside)
                    .wrapping_sub(upper.tick_cumulative_outside),
                seconds_per_liquidity_inside_x128: seconds_per_liquidity_cumulative_x128
                    .overflowing_sub(lower.seconds_per_liquidity_outside_x128)
                    .0
                    .overflowing_sub(upper.seconds_per_liquidity_outside_x128)
                    .0,
                seconds_inside: time
                    .wrapping_sub(lower.seconds_outside)
                    .wrapping_sub(upper.seconds_outside),
            })
        } else {
            Ok(SnapshotCumulative {
                tick_cumulative_inside: upper
                    .tick_cumulative_outside
                    .wrapping_sub(lower.tick_cumulative_outside),
                seconds_per_liquidity_inside_x128: upper
                    .seconds_per_liquidity_outside_x128
                    .overflowing_sub(lower.seconds_per_liquidity_outside_x128)
                    .0,
                seconds_inside: upper.seconds_outside.wrapping_sub(lower.seconds_outside),
            })
        }
    }
}

/// A snapshot of the tick cumulative, seconds per liquidity and seconds
/// inside a tick range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotCumulative {
    /// The snapshot of the tick accumulator for the range
    pub tick_cumulative_inside: i64,

    /// The snapshot of seconds per liquidity for the range
    pub seconds_per_liquidity_inside_x128: U256,

    /// The snapshot of seconds spent inside the range
    pub seconds_inside: u32,
}

/// Emitted exactly once, when a pool is initialized with a starting
/// price.
#[derive(Debug)]
pub struct InitializeEvent {
    /// The initial sqrt price of the pool, as a Q64.96
    pub sqrt_price_x96: U256,
    /// The initial tick of the pool
    pub tick: i32,
}

/// Emitted for every swap.
#[derive(Debug)]
pub struct SwapEvent {
    /// The address that received the swap output
    pub recipient: Address,
    /// The delta of the pool's token_0 balance (negative when paid out)
    pub amount_0: i128,
    /// The delta of the pool's token_1 balance (negative when paid out)
    pub amount_1: i128,
    /// The sqrt(price) of the pool after the swap, as a Q64.96
    pub sqrt_price_x96: U256,
    /// The liquidity of the pool after the swap
    pub liquidity: u128,
    /// The log base 1.0001 of the price of the pool after the swap
    pub tick: i32,
}

/// Emitted for every flash loan.
#[derive(Debug)]
pub struct FlashEvent {
    /// The address that received the loaned amounts
    pub recipient: Address,
    /// The amount of token_0 loaned
    pub amount_0: u128,
    /// The amount of token_1 loaned
    pub amount_1: u128,
    /// The amount of token_0 actually repaid above the loan
    pub paid_0: u128,
    /// The amount of token_1 actually repaid above the loan
    pub paid_1: u128,
}

/// Emitted when the protocol fee is changed.
#[derive(Debug)]
pub struct SetFeeProtocolEvent {
    pub fee_protocol_0_old: u8,
    pub fee_protocol_1_old: u8,
    pub fee_protocol_0: u8,
    pub fee_protocol_1: u8,
}

/// Emitted when collected protocol fees are withdrawn by the owner.
#[derive(Debug)]
pub struct CollectProtocolEvent {
    /// The address that received the collected fees
    pub recipient: Address,
    /// The amount of token_0 protocol fees withdrawn
    pub amount_0: u128,
    /// The amount of token_1 protocol fees withdrawn
    pub amount_1: u128,
}

/// Emitted when the ring of observations grows. `observation_cardinality_next`
/// is not the live cardinality until a write wraps into the new slots.
#[derive(Debug)]
pub struct IncreaseObservationCardinalityNextEvent {
    /// The previous value of the next observation cardinality
    pub observation_cardinality_next_old: u16,
    /// The updated value of the next observation cardinality
    pub observation_cardinality_next_new: u16,
}
