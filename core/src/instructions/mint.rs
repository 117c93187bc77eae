//! Adds liquidity for a position, collecting the deposit through the
//! mint callback.

use crate::error::ErrorCode;
use crate::interfaces::{MintCallback, Reserves};
use crate::states::pool::Pool;
use crate::states::position::MintEvent;
use crate::Address;

impl Pool {
    /// Adds liquidity for the given recipient/tick_lower/tick_upper
    /// position, returning the token_0 and token_1 amounts the deposit
    /// required.
    ///
    /// The owed amounts are handed to `callback`, which must settle them
    /// on `reserves` before returning; the pool verifies settlement by
    /// the balance delta and aborts with `InsufficientPayment` short of
    /// it, without having written any state.
    ///
    /// # Arguments
    ///
    /// * `recipient` - The owner of the minted position
    /// * `tick_lower`, `tick_upper` - The bounds of the position
    /// * `amount` - The liquidity to mint; must be positive
    /// * `data` - Opaque bytes passed through to the callback
    /// * `time` - The current timestamp
    /// * `reserves` - The pool's token ledger
    /// * `callback` - The payer of the owed deposit
    ///
    #[allow(clippy::too_many_arguments)]
    pub fn mint<R: Reserves>(
        &mut self,
        recipient: Address,
        tick_lower: i32,
        tick_upper: i32,
        amount: u128,
        data: &[u8],
        time: u32,
        reserves: &mut R,
        callback: &mut dyn MintCallback<R>,
    ) -> Result<(u128, u128), ErrorCode> {
        self.with_lock(|pool| {
            if amount == 0 {
                return Err(ErrorCode::ZeroAmount);
            }
            Pool::check_ticks(tick_lower, tick_upper)?;
            let spacing = pool.tick_spacing as i32;
            if tick_lower % spacing != 0 || tick_upper % spacing != 0 {
                return Err(ErrorCode::TickNotSpaced);
            }
            let liquidity_delta =
                i128::try_from(amount).map_err(|_| ErrorCode::LiquidityOverflow)?;

            // price the deposit first so payment can be verified before
            // any state is written
            let (amount_0_int, amount_1_int) =
                pool.amounts_for_liquidity_delta(tick_lower, tick_upper, liquidity_delta)?;
            let amount_0 = amount_0_int as u128;
            let amount_1 = amount_1_int as u128;

            let balance_0_before = if amount_0 > 0 { reserves.balance_0() } else { 0 };
            let balance_1_before = if amount_1 > 0 { reserves.balance_1() } else { 0 };

            callback.mint_callback(amount_0, amount_1, data, reserves);

            if amount_0 > 0
                && reserves.balance_0().saturating_sub(balance_0_before) < amount_0
            {
                return Err(ErrorCode::InsufficientPayment);
            }
            if amount_1 > 0
                && reserves.balance_1().saturating_sub(balance_1_before) < amount_1
            {
                return Err(ErrorCode::InsufficientPayment);
            }

            pool.modify_position(recipient, tick_lower, tick_upper, liquidity_delta, time)?;

            let event = MintEvent {
                owner: recipient,
                tick_lower,
                tick_upper,
                amount,
                amount_0,
                amount_1,
            };
            tracing::debug!(?event, "mint");

            Ok((amount_0, amount_1))
        })
    }
}
