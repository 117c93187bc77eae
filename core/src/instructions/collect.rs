//! Withdraws tokens owed to a position, and protocol fees owed to the
//! factory owner.

use crate::error::ErrorCode;
use crate::interfaces::Reserves;
use crate::states::pool::{CollectProtocolEvent, Pool};
use crate::states::position::{CollectEvent, PositionKey};
use crate::Address;

impl Pool {
    /// Collects tokens owed to a position, from accrued fees and burned
    /// liquidity.
    ///
    /// Does not recompute fees, which must be done through `mint` or
    /// `burn` (a zero burn works). To withdraw a single asset the other
    /// requested amount can be 0; to withdraw everything owed request
    /// more than is owed, e.g. `u128::MAX`. Tick ordering is not
    /// revalidated: collecting from a nonexistent position returns
    /// zero.
    ///
    /// # Arguments
    ///
    /// * `owner` - The position owner
    /// * `recipient` - The address receiving the withdrawn tokens
    /// * `tick_lower`, `tick_upper` - The bounds of the position
    /// * `amount_0_requested`, `amount_1_requested` - How much to withdraw
    /// * `reserves` - The pool's token ledger
    ///
    #[allow(clippy::too_many_arguments)]
    pub fn collect<R: Reserves>(
        &mut self,
        owner: Address,
        recipient: Address,
        tick_lower: i32,
        tick_upper: i32,
        amount_0_requested: u128,
        amount_1_requested: u128,
        reserves: &mut R,
    ) -> Result<(u128, u128), ErrorCode> {
        self.with_lock(|pool| {
            let key = PositionKey {
                owner,
                tick_lower,
                tick_upper,
            };
            let (amount_0, amount_1) = match pool.positions.get_mut(&key) {
                Some(position) => {
                    let amount_0 = amount_0_requested.min(position.tokens_owed_0);
                    let amount_1 = amount_1_requested.min(position.tokens_owed_1);
                    position.tokens_owed_0 -= amount_0;
                    position.tokens_owed_1 -= amount_1;
                    (amount_0, amount_1)
                }
                // dead positions return zero
                None => (0, 0),
            };

            if amount_0 > 0 {
                reserves.transfer_0(recipient, amount_0);
            }
            if amount_1 > 0 {
                reserves.transfer_1(recipient, amount_1);
            }

            let event = CollectEvent {
                owner,
                recipient,
                tick_lower,
                tick_upper,
                amount_0,
                amount_1,
            };
            tracing::debug!(?event, "collect");

            Ok((amount_0, amount_1))
        })
    }

    /// Collects accrued protocol fees. Factory owner only.
    ///
    /// A touched non-empty fee slot always retains one unit, matching
    /// the warm-storage behavior of the chain deployment this mirrors.
    ///
    /// # Arguments
    ///
    /// * `caller` - Must be the factory owner
    /// * `recipient` - The address receiving the collected fees
    /// * `amount_0_requested`, `amount_1_requested` - How much to withdraw
    /// * `reserves` - The pool's token ledger
    ///
    pub fn collect_protocol<R: Reserves>(
        &mut self,
        caller: Address,
        recipient: Address,
        amount_0_requested: u128,
        amount_1_requested: u128,
        reserves: &mut R,
    ) -> Result<(u128, u128), ErrorCode> {
        self.with_lock(|pool| {
            if caller != pool.owner {
                return Err(ErrorCode::Unauthorized);
            }

            let mut amount_0 = amount_0_requested.min(pool.protocol_fees_token_0);
            let mut amount_1 = amount_1_requested.min(pool.protocol_fees_token_1);

            if amount_0 > 0 {
                if amount_0 == pool.protocol_fees_token_0 {
                    amount_0 -= 1; // the slot is never fully cleared
                }
                pool.protocol_fees_token_0 -= amount_0;
                reserves.transfer_0(recipient, amount_0);
            }
            if amount_1 > 0 {
                if amount_1 == pool.protocol_fees_token_1 {
                    amount_1 -= 1;
                }
                pool.protocol_fees_token_1 -= amount_1;
                reserves.transfer_1(recipient, amount_1);
            }

            let event = CollectProtocolEvent {
                recipient,
                amount_0,
                amount_1,
            };
            tracing::debug!(?event, "collect_protocol");

            Ok((amount_0, amount_1))
        })
    }
}
