//! Removes liquidity from a position, crediting the withdrawn tokens
//! into the position's owed balances.

use crate::error::ErrorCode;
use crate::states::pool::Pool;
use crate::states::position::{BurnEvent, PositionKey};
use crate::Address;

impl Pool {
    /// Burns liquidity from the caller's position and credits the
    /// withdrawn token amounts to its `tokens_owed`, to be pulled later
    /// via `collect`. No tokens move here.
    ///
    /// Burning zero liquidity is a "poke" that recomputes the fees owed
    /// to a position.
    ///
    /// # Arguments
    ///
    /// * `owner` - The position owner
    /// * `tick_lower`, `tick_upper` - The bounds of the position
    /// * `amount` - How much liquidity to burn; zero pokes
    /// * `time` - The current timestamp
    ///
    pub fn burn(
        &mut self,
        owner: Address,
        tick_lower: i32,
        tick_upper: i32,
        amount: u128,
        time: u32,
    ) -> Result<(u128, u128), ErrorCode> {
        self.with_lock(|pool| {
            let liquidity_delta =
                i128::try_from(amount).map_err(|_| ErrorCode::LiquidityOverflow)?;
            let (amount_0_int, amount_1_int) =
                pool.modify_position(owner, tick_lower, tick_upper, -liquidity_delta, time)?;

            let amount_0 = amount_0_int.unsigned_abs();
            let amount_1 = amount_1_int.unsigned_abs();

            if amount_0 > 0 || amount_1 > 0 {
                let position = pool
                    .positions
                    .get_mut(&PositionKey {
                        owner,
                        tick_lower,
                        tick_upper,
                    })
                    .expect("position was just updated");
                position.tokens_owed_0 = position.tokens_owed_0.saturating_add(amount_0);
                position.tokens_owed_1 = position.tokens_owed_1.saturating_add(amount_1);
            }

            let event = BurnEvent {
                owner,
                tick_lower,
                tick_upper,
                amount,
                amount_0,
                amount_1,
            };
            tracing::debug!(?event, "burn");

            Ok((amount_0, amount_1))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utilities::*;

    fn setup_with_position() -> Pool {
        let mut pool = new_pool(3000, 60);
        pool.initialize(encode_price_1(), 1000).unwrap();
        pool.mint(
            ALICE,
            -600,
            600,
            10u128.pow(18),
            &[],
            1000,
            &mut Ledger::default(),
            &mut Payer::default(),
        )
        .unwrap();
        pool
    }

    #[test]
    fn credits_withdrawn_amounts_as_owed_tokens() {
        let mut pool = setup_with_position();

        let (amount_0, amount_1) = pool.burn(ALICE, -600, 600, 10u128.pow(18), 1000).unwrap();
        assert!(amount_0 > 0 && amount_1 > 0);

        let position = pool.positions[&PositionKey {
            owner: ALICE,
            tick_lower: -600,
            tick_upper: 600,
        }];
        assert_eq!(position.liquidity, 0);
        assert_eq!(position.tokens_owed_0, amount_0);
        assert_eq!(position.tokens_owed_1, amount_1);
        // the position record survives for collection
        assert_eq!(pool.positions.len(), 1);
        assert_eq!(pool.liquidity, 0);
        check_invariants(&pool);
    }

    #[test]
    fn partial_burn_keeps_the_ticks() {
        let mut pool = setup_with_position();

        pool.burn(ALICE, -600, 600, 4 * 10u128.pow(17), 1000).unwrap();
        assert_eq!(pool.liquidity, 6 * 10u128.pow(17));
        assert!(pool.tick_bitmap.is_initialized(-600, 60));
        assert!(pool.ticks.contains_key(&600));
        check_invariants(&pool);
    }

    #[test]
    fn poke_of_a_missing_position_is_rejected() {
        let mut pool = setup_with_position();
        assert_eq!(
            pool.burn(BOB, -600, 600, 0, 1000),
            Err(ErrorCode::ZeroAmount)
        );
    }

    #[test]
    fn cannot_burn_more_than_the_position() {
        let mut pool = setup_with_position();
        assert_eq!(
            pool.burn(ALICE, -600, 600, 2 * 10u128.pow(18), 1000),
            Err(ErrorCode::LiquidityOverflow)
        );
        // nothing was written
        assert_eq!(pool.liquidity, 10u128.pow(18));
        check_invariants(&pool);
    }
}
