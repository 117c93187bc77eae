//! Oracle provides price and liquidity data useful for a wide variety
//! of system designs.
//!
//! Instances of stored oracle data, "observations", are kept in a ring
//! buffer. The buffer starts with a single live slot; anyone can pay to
//! grow the number of slots. When the live prefix is fully populated it
//! wraps and overwrites the oldest observation.
//!
//! Timestamps are 32 bit seconds and all comparisons tolerate a single
//! wrap of the counter.

use crate::error::ErrorCode;
use crate::libraries::big_num::U256;
use crate::libraries::full_math::MulDiv;

/// Maximum number of slots the ring can ever hold.
pub const ORACLE_CAPACITY: usize = 65535;

/// A recorded accumulator snapshot.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    /// The block timestamp of the observation
    pub block_timestamp: u32,

    /// The tick multiplied by seconds elapsed for the life of the pool
    /// as of the observation timestamp
    pub tick_cumulative: i64,

    /// The seconds per in-range liquidity for the life of the pool as of
    /// the observation timestamp
    pub seconds_per_liquidity_cumulative_x128: U256,

    /// Whether the observation has been initialized and the values are
    /// safe to use
    pub initialized: bool,
}

impl Observation {
    /// Transforms a previous observation into a new observation given
    /// the passage of time and the current tick and liquidity values.
    ///
    /// # Arguments
    ///
    /// * `block_timestamp` - The timestamp of the new observation, must be
    ///   chronologically at or after `self.block_timestamp`, safe for one
    ///   counter wrap
    /// * `tick` - The active tick at the time of the new observation
    /// * `liquidity` - The total in-range liquidity at the time of the new
    ///   observation
    ///
    pub fn transform(self, block_timestamp: u32, tick: i32, liquidity: u128) -> Observation {
        let delta = block_timestamp.wrapping_sub(self.block_timestamp);
        Observation {
            block_timestamp,
            tick_cumulative: self
                .tick_cumulative
                .wrapping_add(tick as i64 * delta as i64),
            seconds_per_liquidity_cumulative_x128: self
                .seconds_per_liquidity_cumulative_x128
                .overflowing_add(
                    (U256::from(delta) << 128)
                        / U256::from(if liquidity > 0 { liquidity } else { 1 }),
                )
                .0,
            initialized: true,
        }
    }
}

/// The ring buffer of observations. Only the prefix
/// `[0, cardinality)` is live; slots between `cardinality` and
/// `cardinality_next` have been allocated by [`ObservationState::grow`]
/// and hold a sentinel timestamp until the write index wraps into them.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct ObservationState {
    pub observations: Vec<Observation>,
}

impl ObservationState {
    /// Seeds slot 0 with the pool's first timestamp, returning the
    /// initial cardinality and next cardinality.
    pub fn initialize(&mut self, time: u32) -> (u16, u16) {
        self.observations.clear();
        self.observations.push(Observation {
            block_timestamp: time,
            tick_cumulative: 0,
            seconds_per_liquidity_cumulative_x128: U256::default(),
            initialized: true,
        });
        (1, 1)
    }

    /// Writes an oracle observation, returning the updated index and
    /// cardinality. Writable at most once per second of pool time;
    /// repeated writes in the same second are a no-op. The live
    /// cardinality grows onto pre-paid slots only when the write index
    /// sits on the final live slot, to preserve ordering.
    ///
    /// # Arguments
    ///
    /// * `index` - The index of the most recently written observation
    /// * `time` - The timestamp of the new observation
    /// * `tick` - The active tick at the time of the new observation
    /// * `liquidity` - The total in-range liquidity at the time of the new observation
    /// * `cardinality` - The number of populated elements in the ring
    /// * `cardinality_next` - The new length of the ring, independent of population
    ///
    pub fn write(
        &mut self,
        index: u16,
        time: u32,
        tick: i32,
        liquidity: u128,
        cardinality: u16,
        cardinality_next: u16,
    ) -> (u16, u16) {
        let last = self.observations[index as usize];

        if last.block_timestamp == time {
            return (index, cardinality);
        }

        // if the conditions are right, we can bump the cardinality
        let cardinality_updated = if cardinality_next > cardinality && index == cardinality - 1 {
            cardinality_next
        } else {
            cardinality
        };

        let index_updated = (index + 1) % cardinality_updated;
        self.observations[index_updated as usize] = last.transform(time, tick, liquidity);
        (index_updated, cardinality_updated)
    }

    /// Prepares the ring to store up to `next` observations by writing a
    /// sentinel timestamp into every new slot, so the storage cost of a
    /// future write is prepaid by the caller of grow. Returns the
    /// effective next cardinality.
    pub fn grow(&mut self, current: u16, next: u16) -> u16 {
        assert!(current > 0, "oracle not initialized");
        // no-op if the passed next value isn't greater than the current one
        if next <= current {
            return current;
        }
        debug_assert!(next as usize <= ORACLE_CAPACITY);
        for _ in self.observations.len()..next as usize {
            self.observations.push(Observation {
                block_timestamp: 1,
                ..Default::default()
            });
        }
        next
    }

    /// Returns the accumulator values as of `seconds_ago` seconds before
    /// `time`.
    ///
    /// 0 seconds ago returns the current accumulators, extrapolated from
    /// the newest observation if the current second has not been
    /// recorded. Targets between two observations are linearly
    /// interpolated. Fails `OracleOld` for targets before the oldest
    /// recorded observation.
    ///
    /// # Arguments
    ///
    /// * `time` - The current timestamp
    /// * `seconds_ago` - The lookback, in seconds, at which to return an observation
    /// * `tick` - The current tick
    /// * `index` - The index of the most recently written observation
    /// * `liquidity` - The current in-range pool liquidity
    /// * `cardinality` - The number of populated elements in the ring
    ///
    pub fn observe_single(
        &self,
        time: u32,
        seconds_ago: u32,
        tick: i32,
        index: u16,
        liquidity: u128,
        cardinality: u16,
    ) -> Result<(i64, U256), ErrorCode> {
        if cardinality == 0 {
            return Err(ErrorCode::OracleUninitialized);
        }

        if seconds_ago == 0 {
            let mut last = self.observations[index as usize];
            if last.block_timestamp != time {
                last = last.transform(time, tick, liquidity);
            }
            return Ok((
                last.tick_cumulative,
                last.seconds_per_liquidity_cumulative_x128,
            ));
        }

        let target = time.wrapping_sub(seconds_ago);
        let (before_or_at, at_or_after) =
            self.get_surrounding_observations(time, target, tick, index, liquidity, cardinality)?;

        Ok(if target == before_or_at.block_timestamp {
            // we're at the left boundary
            (
                before_or_at.tick_cumulative,
                before_or_at.seconds_per_liquidity_cumulative_x128,
            )
        } else if target == at_or_after.block_timestamp {
            // we're at the right boundary
            (
                at_or_after.tick_cumulative,
                at_or_after.seconds_per_liquidity_cumulative_x128,
            )
        } else {
            // we're in the middle
            let observation_time_delta = at_or_after
                .block_timestamp
                .wrapping_sub(before_or_at.block_timestamp);
            let target_delta = target.wrapping_sub(before_or_at.block_timestamp);
            (
                before_or_at.tick_cumulative.wrapping_add(
                    at_or_after
                        .tick_cumulative
                        .wrapping_sub(before_or_at.tick_cumulative)
                        / observation_time_delta as i64
                        * target_delta as i64,
                ),
                before_or_at
                    .seconds_per_liquidity_cumulative_x128
                    .overflowing_add(
                        at_or_after
                            .seconds_per_liquidity_cumulative_x128
                            .overflowing_sub(
                                before_or_at.seconds_per_liquidity_cumulative_x128,
                            )
                            .0
                            .mul_div_floor(
                                U256::from(target_delta),
                                U256::from(observation_time_delta),
                            )
                            .expect("interpolation cannot overflow"),
                    )
                    .0,
            )
        })
    }

    /// Returns the accumulator values as of each element of
    /// `seconds_agos`.
    pub fn observe(
        &self,
        time: u32,
        seconds_agos: &[u32],
        tick: i32,
        index: u16,
        liquidity: u128,
        cardinality: u16,
    ) -> Result<Vec<(i64, U256)>, ErrorCode> {
        seconds_agos
            .iter()
            .map(|seconds_ago| {
                self.observe_single(time, *seconds_ago, tick, index, liquidity, cardinality)
            })
            .collect()
    }

    /// Fetches the observations `before_or_at` and `at_or_after` a
    /// target, where `at_or_after` may be an unrecorded extrapolation of
    /// the newest observation when the target is after it.
    fn get_surrounding_observations(
        &self,
        time: u32,
        target: u32,
        tick: i32,
        index: u16,
        liquidity: u128,
        cardinality: u16,
    ) -> Result<(Observation, Observation), ErrorCode> {
        // optimistically start with the newest observation
        let mut before_or_at = self.observations[index as usize];

        if lte(time, before_or_at.block_timestamp, target) {
            if before_or_at.block_timestamp == target {
                // the answer is exact, at_or_after goes unused
                return Ok((before_or_at, before_or_at));
            }
            // the target is newer than everything recorded: extrapolate
            return Ok((before_or_at, before_or_at.transform(target, tick, liquidity)));
        }

        // set before_or_at to the oldest observation in the ring
        before_or_at = self.observations[((index + 1) % cardinality) as usize];
        if !before_or_at.initialized {
            before_or_at = self.observations[0];
        }

        if !lte(time, before_or_at.block_timestamp, target) {
            return Err(ErrorCode::OracleOld);
        }

        self.binary_search(time, target, index, cardinality)
    }

    /// Binary search over the live prefix, in chronological order via
    /// the modulo index space, skipping slots that were grown but never
    /// written.
    fn binary_search(
        &self,
        time: u32,
        target: u32,
        index: u16,
        cardinality: u16,
    ) -> Result<(Observation, Observation), ErrorCode> {
        let mut l = (index as usize + 1) % cardinality as usize; // oldest observation
        let mut r = l + cardinality as usize - 1; // newest observation

        loop {
            let i = (l + r) / 2;

            let before_or_at = self.observations[i % cardinality as usize];

            // hit an uninitialized slot: keep searching higher (more recent)
            if !before_or_at.initialized {
                l = i + 1;
                continue;
            }

            let at_or_after = self.observations[(i + 1) % cardinality as usize];

            let target_at_or_after = lte(time, before_or_at.block_timestamp, target);

            if target_at_or_after && lte(time, target, at_or_after.block_timestamp) {
                return Ok((before_or_at, at_or_after));
            }

            if !target_at_or_after {
                r = i - 1;
            } else {
                l = i + 1;
            }
        }
    }
}

/// 32 bit timestamp comparison `a <= b`, tolerating one wrap of the
/// counter: values greater than `time` are interpreted as having been
/// recorded before the counter wrapped.
fn lte(time: u32, a: u32, b: u32) -> bool {
    // no adjustment needed if there hasn't been an overflow
    if a <= time && b <= time {
        return a <= b;
    }

    let a_adjusted = if a > time { a as u64 } else { a as u64 + (1 << 32) };
    let b_adjusted = if b > time { b as u64 } else { b as u64 + (1 << 32) };

    a_adjusted <= b_adjusted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(state: &ObservationState, time: u32, ago: u32, index: u16, cardinality: u16) -> (i64, U256) {
        state
            .observe_single(time, ago, 0, index, 0, cardinality)
            .unwrap()
    }

    mod lte_comparator {
        use super::*;

        #[test]
        fn plain_ordering_without_wrap() {
            assert!(lte(100, 5, 10));
            assert!(!lte(100, 10, 5));
            assert!(lte(100, 10, 10));
        }

        #[test]
        fn values_beyond_time_sort_before_the_wrap() {
            // time = 10 after wrapping; u32::MAX - 5 was recorded earlier
            assert!(lte(10, u32::MAX - 5, 4));
            assert!(!lte(10, 4, u32::MAX - 5));
            assert!(lte(10, u32::MAX - 5, u32::MAX - 2));
        }
    }

    mod initialize_and_write {
        use super::*;

        #[test]
        fn initialize_seeds_slot_zero() {
            let mut state = ObservationState::default();
            assert_eq!(state.initialize(5), (1, 1));
            assert_eq!(state.observations[0].block_timestamp, 5);
            assert!(state.observations[0].initialized);
        }

        #[test]
        fn same_second_write_is_a_no_op() {
            let mut state = ObservationState::default();
            state.initialize(5);
            assert_eq!(state.write(0, 5, 3, 1000, 1, 1), (0, 1));
            assert_eq!(state.observations[0].tick_cumulative, 0);
        }

        #[test]
        fn single_slot_ring_overwrites_in_place() {
            let mut state = ObservationState::default();
            state.initialize(5);
            let (index, cardinality) = state.write(0, 10, 2, 0, 1, 1);
            assert_eq!((index, cardinality), (0, 1));
            assert_eq!(state.observations[0].block_timestamp, 10);
            // 2 * 5 seconds
            assert_eq!(state.observations[0].tick_cumulative, 10);
            // liquidity 0 is treated as 1
            assert_eq!(
                state.observations[0].seconds_per_liquidity_cumulative_x128,
                U256::from(5) << 128
            );
        }

        #[test]
        fn grow_prepays_slots_and_write_expands_at_the_wrap() {
            let mut state = ObservationState::default();
            state.initialize(5);
            assert_eq!(state.grow(1, 3), 3);
            assert_eq!(state.observations.len(), 3);
            assert_eq!(state.observations[1].block_timestamp, 1);
            assert!(!state.observations[1].initialized);

            // index sits on the last live slot, so the write expands
            let (index, cardinality) = state.write(0, 10, 1, 4, 1, 3);
            assert_eq!((index, cardinality), (1, 3));
            let (index, cardinality) = state.write(index, 20, 1, 4, cardinality, 3);
            assert_eq!((index, cardinality), (2, 3));
            // wraps around the live prefix
            let (index, cardinality) = state.write(index, 30, 1, 4, cardinality, 3);
            assert_eq!((index, cardinality), (0, 3));
        }

        #[test]
        fn grow_is_a_no_op_when_not_larger() {
            let mut state = ObservationState::default();
            state.initialize(5);
            state.grow(1, 4);
            assert_eq!(state.grow(4, 3), 4);
            assert_eq!(state.observations.len(), 4);
        }
    }

    mod observe {
        use super::*;

        #[test]
        fn fails_before_initialization() {
            let state = ObservationState::default();
            assert_eq!(
                state.observe_single(10, 0, 0, 0, 0, 0),
                Err(ErrorCode::OracleUninitialized)
            );
        }

        #[test]
        fn current_second_extrapolates_from_the_head() {
            let mut state = ObservationState::default();
            state.initialize(5);
            let (tick_cumulative, seconds_per_liquidity) =
                state.observe_single(11, 0, 3, 0, 4, 1).unwrap();
            assert_eq!(tick_cumulative, 18); // 3 * 6
            assert_eq!(seconds_per_liquidity, (U256::from(6) << 128) / 4);
        }

        #[test]
        fn exact_match_returns_the_recorded_observation() {
            let mut state = ObservationState::default();
            state.initialize(5);
            state.grow(1, 2);
            let (index, cardinality) = state.write(0, 10, 7, 9, 1, 2);

            // target lands exactly on the first observation
            let (tick_cumulative, _) = single(&state, 20, 15, index, cardinality);
            assert_eq!(tick_cumulative, 0);
            // and exactly on the second
            let (tick_cumulative, _) = single(&state, 20, 10, index, cardinality);
            assert_eq!(tick_cumulative, 35); // 7 * 5
        }

        #[test]
        fn interpolates_between_observations() {
            let mut state = ObservationState::default();
            state.initialize(0);
            state.grow(1, 2);
            // 10 seconds at tick 10, liquidity 5
            let (index, cardinality) = state.write(0, 10, 10, 5, 1, 2);

            let (tick_cumulative, seconds_per_liquidity) = state
                .observe_single(10, 5, 10, index, 5, cardinality)
                .unwrap();
            assert_eq!(tick_cumulative, 50); // half of 10 * 10
            assert_eq!(seconds_per_liquidity, (U256::from(5) << 128) / 5);
        }

        #[test]
        fn fails_for_targets_before_the_oldest_observation() {
            let mut state = ObservationState::default();
            state.initialize(100);
            assert_eq!(
                state.observe_single(200, 150, 0, 0, 1, 1),
                Err(ErrorCode::OracleOld)
            );
        }

        #[test]
        fn skips_grown_but_unwritten_slots() {
            let mut state = ObservationState::default();
            state.initialize(0);
            state.grow(1, 5);
            let (index, cardinality) = state.write(0, 10, 1, 1, 1, 5);
            let (index, cardinality) = state.write(index, 20, 1, 1, cardinality, 5);

            // only 3 of 5 slots are initialized; search must not land on
            // the sentinel slots
            let (tick_cumulative, _) = single(&state, 20, 15, index, cardinality);
            assert_eq!(tick_cumulative, 5);
        }

        #[test]
        fn observe_maps_each_lookback() {
            let mut state = ObservationState::default();
            state.initialize(0);
            state.grow(1, 4);
            let (index, cardinality) = state.write(0, 10, 1, 1, 1, 4);
            let (index, cardinality) = state.write(index, 20, 2, 1, cardinality, 4);

            let results = state
                .observe(20, &[0, 10, 20], 2, index, 1, cardinality)
                .unwrap();
            assert_eq!(results.len(), 3);
            assert_eq!(results[0].0, 30); // 1 * 10 + 2 * 10
            assert_eq!(results[1].0, 10); // 1 * 10
            assert_eq!(results[2].0, 0);
        }

        #[test]
        fn tolerates_one_timestamp_wrap() {
            let mut state = ObservationState::default();
            state.initialize(u32::MAX - 4);
            state.grow(1, 2);
            // 10 seconds elapse across the wrap
            let (index, cardinality) = state.write(0, 5, 3, 1, 1, 2);
            assert_eq!(state.observations[index as usize].tick_cumulative, 30);

            let (tick_cumulative, _) = single(&state, 5, 5, index, cardinality);
            assert_eq!(tick_cumulative, 15);
        }
    }
}
