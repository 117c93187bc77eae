//! Flash loans: lend any amount of either token within one operation,
//! verified repaid with a fee that is donated to in-range liquidity.

use crate::error::ErrorCode;
use crate::interfaces::{FlashCallback, Reserves};
use crate::libraries::fixed_point_128;
use crate::libraries::full_math::MulDiv;
use crate::libraries::big_num::U256;
use crate::states::pool::{FlashEvent, Pool, FEE_RATE_DENOMINATOR};
use crate::Address;

impl Pool {
    /// Transfers the requested amounts to `recipient`, invokes the
    /// callback, and requires the balances back plus the pool fee. The
    /// surplus actually paid is split between the protocol share and
    /// the fee growth owed to in-range positions.
    ///
    /// # Arguments
    ///
    /// * `recipient` - The address receiving the loaned amounts
    /// * `amount_0`, `amount_1` - How much of each token to lend
    /// * `data` - Opaque bytes passed through to the callback
    /// * `reserves` - The pool's token ledger
    /// * `callback` - The borrower, expected to repay plus fees
    ///
    #[allow(clippy::too_many_arguments)]
    pub fn flash<R: Reserves>(
        &mut self,
        recipient: Address,
        amount_0: u128,
        amount_1: u128,
        data: &[u8],
        reserves: &mut R,
        callback: &mut dyn FlashCallback<R>,
    ) -> Result<(), ErrorCode> {
        self.with_lock(|pool| {
            if pool.liquidity == 0 {
                return Err(ErrorCode::InsufficientLiquidity);
            }

            let fee_0 = amount_0
                .mul_div_ceil(pool.fee as u128, FEE_RATE_DENOMINATOR as u128)
                .ok_or(ErrorCode::MathOverflow)?;
            let fee_1 = amount_1
                .mul_div_ceil(pool.fee as u128, FEE_RATE_DENOMINATOR as u128)
                .ok_or(ErrorCode::MathOverflow)?;

            let balance_0_before = reserves.balance_0();
            let balance_1_before = reserves.balance_1();

            if amount_0 > 0 {
                reserves.transfer_0(recipient, amount_0);
            }
            if amount_1 > 0 {
                reserves.transfer_1(recipient, amount_1);
            }

            callback.flash_callback(fee_0, fee_1, data, reserves);

            let balance_0_after = reserves.balance_0();
            let balance_1_after = reserves.balance_1();

            if balance_0_after < balance_0_before.saturating_add(fee_0)
                || balance_1_after < balance_1_before.saturating_add(fee_1)
            {
                return Err(ErrorCode::InsufficientPayment);
            }

            // the surplus actually paid, fee or more
            let paid_0 = balance_0_after - balance_0_before;
            let paid_1 = balance_1_after - balance_1_before;

            if paid_0 > 0 {
                let fee_protocol_0 = pool.fee_protocol % 16;
                let fees_0 = if fee_protocol_0 == 0 {
                    0
                } else {
                    paid_0 / fee_protocol_0 as u128
                };
                pool.protocol_fees_token_0 = pool.protocol_fees_token_0.saturating_add(fees_0);
                pool.fee_growth_global_0_x128 = pool
                    .fee_growth_global_0_x128
                    .overflowing_add(
                        U256::from(paid_0 - fees_0)
                            .mul_div_floor(fixed_point_128::Q128, U256::from(pool.liquidity))
                            .ok_or(ErrorCode::MathOverflow)?,
                    )
                    .0;
            }
            if paid_1 > 0 {
                let fee_protocol_1 = pool.fee_protocol >> 4;
                let fees_1 = if fee_protocol_1 == 0 {
                    0
                } else {
                    paid_1 / fee_protocol_1 as u128
                };
                pool.protocol_fees_token_1 = pool.protocol_fees_token_1.saturating_add(fees_1);
                pool.fee_growth_global_1_x128 = pool
                    .fee_growth_global_1_x128
                    .overflowing_add(
                        U256::from(paid_1 - fees_1)
                            .mul_div_floor(fixed_point_128::Q128, U256::from(pool.liquidity))
                            .ok_or(ErrorCode::MathOverflow)?,
                    )
                    .0;
            }

            let event = FlashEvent {
                recipient,
                amount_0,
                amount_1,
                paid_0,
                paid_1,
            };
            tracing::debug!(?event, "flash");

            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utilities::*;

    fn setup() -> (Pool, Ledger) {
        let mut pool = new_pool(3000, 60);
        pool.initialize(encode_price_1(), 1000).unwrap();
        let mut ledger = Ledger::default();
        pool.mint(
            ALICE,
            -600,
            600,
            10u128.pow(18),
            &[],
            1000,
            &mut ledger,
            &mut Payer::default(),
        )
        .unwrap();
        (pool, ledger)
    }

    #[test]
    fn fee_accrues_to_fee_growth() {
        let (mut pool, mut ledger) = setup();
        let liquidity = pool.liquidity;
        let mut borrower = FlashBorrower {
            loan_0: 10u128.pow(6),
            ..Default::default()
        };

        pool.flash(BOB, 10u128.pow(6), 0, &[], &mut ledger, &mut borrower)
            .unwrap();

        // fee = ceil(10^6 * 3000 / 10^6) = 3000, all donated to liquidity
        assert_eq!(
            pool.fee_growth_global_0_x128,
            U256::from(3000u64)
                .mul_div_floor(fixed_point_128::Q128, U256::from(liquidity))
                .unwrap()
        );
        assert!(pool.fee_growth_global_1_x128.is_zero());
        assert_eq!(pool.protocol_fees_token_0, 0);
        check_invariants(&pool);
    }

    #[test]
    fn protocol_share_is_split_off() {
        let (mut pool, mut ledger) = setup();
        pool.set_fee_protocol(FACTORY_OWNER, 6, 6).unwrap();
        let liquidity = pool.liquidity;
        let mut borrower = FlashBorrower {
            loan_0: 10u128.pow(6),
            ..Default::default()
        };

        pool.flash(BOB, 10u128.pow(6), 0, &[], &mut ledger, &mut borrower)
            .unwrap();

        // 3000 paid: 500 to the protocol, 2500 to fee growth
        assert_eq!(pool.protocol_fees_token_0, 500);
        assert_eq!(
            pool.fee_growth_global_0_x128,
            U256::from(2500u64)
                .mul_div_floor(fixed_point_128::Q128, U256::from(liquidity))
                .unwrap()
        );
    }

    #[test]
    fn overpayment_is_donated() {
        let (mut pool, mut ledger) = setup();
        let liquidity = pool.liquidity;
        let mut borrower = FlashBorrower {
            loan_1: 1000,
            extra_1: 17,
            ..Default::default()
        };

        pool.flash(BOB, 0, 1000, &[], &mut ledger, &mut borrower)
            .unwrap();

        // fee = ceil(1000 * 3000 / 10^6) = 3, plus the 17 extra
        assert_eq!(
            pool.fee_growth_global_1_x128,
            U256::from(20u64)
                .mul_div_floor(fixed_point_128::Q128, U256::from(liquidity))
                .unwrap()
        );
    }

    #[test]
    fn short_repayment_aborts() {
        let (mut pool, mut ledger) = setup();
        let balance_before = ledger.balance_0;
        let mut borrower = FlashBorrower {
            loan_0: 1000,
            short_0: 1,
            ..Default::default()
        };

        assert_eq!(
            pool.flash(BOB, 1000, 0, &[], &mut ledger, &mut borrower),
            Err(ErrorCode::InsufficientPayment)
        );
        assert!(pool.fee_growth_global_0_x128.is_zero());
        assert!(pool.unlocked);
        // the pool is untouched; the one-unit shortfall stays on the ledger
        assert_eq!(ledger.balance_0, balance_before + 2);
    }

    #[test]
    fn requires_in_range_liquidity() {
        let mut pool = new_pool(3000, 60);
        pool.initialize(encode_price_1(), 1000).unwrap();
        let mut ledger = Ledger::default();
        let mut borrower = FlashBorrower::default();

        assert_eq!(
            pool.flash(BOB, 1, 0, &[], &mut ledger, &mut borrower),
            Err(ErrorCode::InsufficientLiquidity)
        );
    }
}
