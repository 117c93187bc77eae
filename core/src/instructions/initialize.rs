//! One-shot pool initialization: the only transition out of the
//! uninitialized state.

use crate::error::ErrorCode;
use crate::libraries::big_num::U256;
use crate::libraries::tick_math;
use crate::states::pool::{InitializeEvent, Pool};

impl Pool {
    /// Sets the initial price for the pool and seeds the oracle.
    ///
    /// Not locked: this is the only operation permitted while the pool
    /// is uninitialized, and it unlocks the pool on success.
    ///
    /// # Arguments
    ///
    /// * `sqrt_price_x96` - The initial sqrt price of the pool as a Q64.96
    /// * `time` - The current timestamp, seeding observation slot 0
    ///
    pub fn initialize(&mut self, sqrt_price_x96: U256, time: u32) -> Result<(), ErrorCode> {
        if !self.sqrt_price_x96.is_zero() {
            return Err(ErrorCode::AlreadyInitialized);
        }

        let tick = tick_math::get_tick_at_sqrt_ratio(sqrt_price_x96)?;
        let (cardinality, cardinality_next) = self.observations.initialize(time);

        self.sqrt_price_x96 = sqrt_price_x96;
        self.tick = tick;
        self.observation_index = 0;
        self.observation_cardinality = cardinality;
        self.observation_cardinality_next = cardinality_next;
        self.unlocked = true;

        let event = InitializeEvent {
            sqrt_price_x96,
            tick,
        };
        tracing::debug!(?event, "initialize");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utilities::*;

    #[test]
    fn sets_price_tick_and_oracle() {
        let mut pool = new_pool(3000, 60);
        pool.initialize(encode_price_1(), 1000).unwrap();

        assert_eq!(pool.tick, 0);
        assert_eq!(pool.liquidity, 0);
        assert_eq!(pool.observation_cardinality, 1);
        assert_eq!(pool.observation_cardinality_next, 1);
        assert!(pool.unlocked);
    }

    #[test]
    fn tick_is_the_floor_of_the_price() {
        let mut pool = new_pool(3000, 60);
        // one above the unit price still belongs to tick 0
        pool.initialize(encode_price_1() + 1, 1000).unwrap();
        assert_eq!(pool.tick, 0);
    }

    #[test]
    fn can_only_run_once() {
        let mut pool = new_pool(3000, 60);
        pool.initialize(encode_price_1(), 1000).unwrap();
        assert_eq!(
            pool.initialize(encode_price_1(), 1001),
            Err(ErrorCode::AlreadyInitialized)
        );
    }

    #[test]
    fn rejects_out_of_range_prices() {
        let mut pool = new_pool(3000, 60);
        assert_eq!(
            pool.initialize(tick_math::MIN_SQRT_RATIO_X96 - 1, 1000),
            Err(ErrorCode::SqrtPriceOutOfRange)
        );
        assert_eq!(
            pool.initialize(tick_math::MAX_SQRT_RATIO_X96, 1000),
            Err(ErrorCode::SqrtPriceOutOfRange)
        );
        assert!(!pool.unlocked);
    }
}
