//! Owner controls and oracle administration.

use crate::error::ErrorCode;
use crate::states::pool::{
    IncreaseObservationCardinalityNextEvent, Pool, SetFeeProtocolEvent,
};
use crate::Address;

impl Pool {
    /// Sets the denominators of the protocol's share of swap fees.
    /// Factory owner only. Each value is 0 (off) or a denominator in
    /// [4, 10], packed as `fee_protocol_0 | fee_protocol_1 << 4`.
    pub fn set_fee_protocol(
        &mut self,
        caller: Address,
        fee_protocol_0: u8,
        fee_protocol_1: u8,
    ) -> Result<(), ErrorCode> {
        self.with_lock(|pool| {
            if caller != pool.owner {
                return Err(ErrorCode::Unauthorized);
            }
            let valid = |fp: u8| fp == 0 || (4..=10).contains(&fp);
            if !valid(fee_protocol_0) || !valid(fee_protocol_1) {
                return Err(ErrorCode::BadFeeProtocol);
            }

            let fee_protocol_old = pool.fee_protocol;
            pool.fee_protocol = fee_protocol_0 | (fee_protocol_1 << 4);

            let event = SetFeeProtocolEvent {
                fee_protocol_0_old: fee_protocol_old % 16,
                fee_protocol_1_old: fee_protocol_old >> 4,
                fee_protocol_0,
                fee_protocol_1,
            };
            tracing::debug!(?event, "set_fee_protocol");

            Ok(())
        })
    }

    /// Grows the number of slots the oracle ring may use. The new slots
    /// become live as writes wrap into them.
    pub fn increase_observation_cardinality_next(
        &mut self,
        observation_cardinality_next: u16,
    ) -> Result<(), ErrorCode> {
        self.with_lock(|pool| {
            let old = pool.observation_cardinality_next;
            let new = pool
                .observations
                .grow(old, observation_cardinality_next);
            pool.observation_cardinality_next = new;

            if old != new {
                let event = IncreaseObservationCardinalityNextEvent {
                    observation_cardinality_next_old: old,
                    observation_cardinality_next_new: new,
                };
                tracing::debug!(?event, "increase_observation_cardinality_next");
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utilities::*;

    fn setup() -> Pool {
        let mut pool = new_pool(3000, 60);
        pool.initialize(encode_price_1(), 1000).unwrap();
        pool
    }

    #[test]
    fn packs_the_two_nibbles() {
        let mut pool = setup();
        pool.set_fee_protocol(FACTORY_OWNER, 5, 10).unwrap();
        assert_eq!(pool.fee_protocol, 5 | (10 << 4));
        // turning it off again
        pool.set_fee_protocol(FACTORY_OWNER, 0, 0).unwrap();
        assert_eq!(pool.fee_protocol, 0);
    }

    #[test]
    fn validates_the_denominators() {
        let mut pool = setup();
        for bad in [1u8, 2, 3, 11, 255] {
            assert_eq!(
                pool.set_fee_protocol(FACTORY_OWNER, bad, 0),
                Err(ErrorCode::BadFeeProtocol)
            );
            assert_eq!(
                pool.set_fee_protocol(FACTORY_OWNER, 0, bad),
                Err(ErrorCode::BadFeeProtocol)
            );
        }
        assert!(pool.unlocked);
    }

    #[test]
    fn only_the_owner_may_set_fees() {
        let mut pool = setup();
        assert_eq!(
            pool.set_fee_protocol(ALICE, 4, 4),
            Err(ErrorCode::Unauthorized)
        );
    }

    #[test]
    fn cardinality_next_grows_monotonically() {
        let mut pool = setup();
        pool.increase_observation_cardinality_next(5).unwrap();
        assert_eq!(pool.observation_cardinality_next, 5);
        // the live cardinality is untouched until writes wrap
        assert_eq!(pool.observation_cardinality, 1);

        pool.increase_observation_cardinality_next(3).unwrap();
        assert_eq!(pool.observation_cardinality_next, 5);
    }
}
