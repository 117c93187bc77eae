//! Positions represent an owner's liquidity between a lower and upper
//! tick boundary, along with the fees owed to the position.

use crate::error::ErrorCode;
use crate::libraries::big_num::U256;
use crate::libraries::fixed_point_128;
use crate::libraries::full_math::MulDiv;
use crate::libraries::liquidity_math;
use crate::Address;

/// The key a position is stored under: owner and tick bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PositionKey {
    pub owner: Address,
    pub tick_lower: i32,
    pub tick_upper: i32,
}

/// Info stored for each position. Positions outlive their liquidity so
/// accrued `tokens_owed` survive a full burn until collected.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionState {
    /// The amount of liquidity owned by this position
    pub liquidity: u128,

    /// The token_0 fee growth per unit of liquidity inside the
    /// position's bounds as of the last update to liquidity or fees owed
    pub fee_growth_inside_0_last_x128: U256,

    /// The token_1 fee growth per unit of liquidity inside the
    /// position's bounds as of the last update to liquidity or fees owed
    pub fee_growth_inside_1_last_x128: U256,

    /// The fees owed to the position owner in token_0
    pub tokens_owed_0: u128,

    /// The fees owed to the position owner in token_1
    pub tokens_owed_1: u128,
}

impl PositionState {
    /// Credits accumulated fees to the position and applies a liquidity
    /// change.
    ///
    /// Fee growth deltas are computed with wrapping subtraction; owed
    /// token counters saturate rather than wrap, so fees must be
    /// withdrawn before the counters pin at `u128::MAX`.
    ///
    /// # Arguments
    ///
    /// * `liquidity_delta` - The change in pool liquidity as a result of
    ///   the position update; a poke of a zero-liquidity position is
    ///   rejected
    /// * `fee_growth_inside_0_x128` - The all-time fee growth in token_0,
    ///   per unit of liquidity, inside the position's tick boundaries
    /// * `fee_growth_inside_1_x128` - The all-time fee growth in token_1,
    ///   per unit of liquidity, inside the position's tick boundaries
    ///
    pub fn update(
        &mut self,
        liquidity_delta: i128,
        fee_growth_inside_0_x128: U256,
        fee_growth_inside_1_x128: U256,
    ) -> Result<(), ErrorCode> {
        let liquidity_next = if liquidity_delta == 0 {
            // disallow pokes for 0 liquidity positions
            if self.liquidity == 0 {
                return Err(ErrorCode::ZeroAmount);
            }
            self.liquidity
        } else {
            liquidity_math::add_delta(self.liquidity, liquidity_delta)?
        };

        // calculate accumulated fees
        let tokens_owed_0 = fee_growth_inside_0_x128
            .overflowing_sub(self.fee_growth_inside_0_last_x128)
            .0
            .mul_div_floor(U256::from(self.liquidity), fixed_point_128::Q128)
            .ok_or(ErrorCode::MathOverflow)?
            .low_u128();
        let tokens_owed_1 = fee_growth_inside_1_x128
            .overflowing_sub(self.fee_growth_inside_1_last_x128)
            .0
            .mul_div_floor(U256::from(self.liquidity), fixed_point_128::Q128)
            .ok_or(ErrorCode::MathOverflow)?
            .low_u128();

        if liquidity_delta != 0 {
            self.liquidity = liquidity_next;
        }
        self.fee_growth_inside_0_last_x128 = fee_growth_inside_0_x128;
        self.fee_growth_inside_1_last_x128 = fee_growth_inside_1_x128;
        if tokens_owed_0 > 0 || tokens_owed_1 > 0 {
            self.tokens_owed_0 = self.tokens_owed_0.saturating_add(tokens_owed_0);
            self.tokens_owed_1 = self.tokens_owed_1.saturating_add(tokens_owed_1);
        }

        Ok(())
    }
}

/// Emitted when liquidity is minted for a position
#[derive(Debug)]
pub struct MintEvent {
    /// The owner of the position and recipient of any minted liquidity
    pub owner: Address,
    /// The lower tick of the position
    pub tick_lower: i32,
    /// The upper tick of the position
    pub tick_upper: i32,
    /// The amount of liquidity minted to the position range
    pub amount: u128,
    /// How much token_0 was required for the minted liquidity
    pub amount_0: u128,
    /// How much token_1 was required for the minted liquidity
    pub amount_1: u128,
}

/// Emitted when a position's liquidity is removed.
///
/// Does not withdraw any fees earned by the liquidity position, which
/// must be withdrawn via `collect`.
#[derive(Debug)]
pub struct BurnEvent {
    /// The owner of the position for which liquidity is removed
    pub owner: Address,
    /// The lower tick of the position
    pub tick_lower: i32,
    /// The upper tick of the position
    pub tick_upper: i32,
    /// The amount of liquidity removed
    pub amount: u128,
    /// The amount of token_0 credited to tokens owed
    pub amount_0: u128,
    /// The amount of token_1 credited to tokens owed
    pub amount_1: u128,
}

/// Emitted when fees are collected by the owner of a position.
///
/// Collect events may report zero amounts when the caller chooses not
/// to collect fees.
#[derive(Debug)]
pub struct CollectEvent {
    /// The owner of the position for which fees are collected
    pub owner: Address,
    /// The address that received the output
    pub recipient: Address,
    /// The lower tick of the position
    pub tick_lower: i32,
    /// The upper tick of the position
    pub tick_upper: i32,
    /// The amount of token_0 fees collected
    pub amount_0: u128,
    /// The amount of token_1 fees collected
    pub amount_1: u128,
}
