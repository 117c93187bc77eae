//! Shared fixtures for pool-level tests: an in-memory double-ledger and
//! a counterparty that settles callbacks against it.

use crate::interfaces::{FlashCallback, MintCallback, Reserves, SwapCallback};
use crate::libraries::big_num::U256;
use crate::states::pool::Pool;
use crate::Address;

pub const TOKEN_0: Address = [1; 32];
pub const TOKEN_1: Address = [2; 32];
pub const FACTORY_OWNER: Address = [3; 32];
pub const ALICE: Address = [4; 32];
pub const BOB: Address = [5; 32];

/// sqrt price of 1.0 as Q64.96
pub fn encode_price_1() -> U256 {
    U256::from(1u128 << 96)
}

pub fn new_pool(fee: u32, tick_spacing: u16) -> Pool {
    Pool::new(TOKEN_0, TOKEN_1, fee, tick_spacing, FACTORY_OWNER)
}

/// An in-memory double-ledger holding the pool's reserves. Outbound
/// transfers are tallied per direction so tests can assert payouts.
#[derive(Default, Debug)]
pub struct Ledger {
    pub balance_0: u128,
    pub balance_1: u128,
    pub total_out_0: u128,
    pub total_out_1: u128,
}

impl Ledger {
    /// A counterparty pays the pool.
    pub fn credit_0(&mut self, amount: u128) {
        self.balance_0 += amount;
    }

    pub fn credit_1(&mut self, amount: u128) {
        self.balance_1 += amount;
    }
}

impl Reserves for Ledger {
    fn balance_0(&self) -> u128 {
        self.balance_0
    }

    fn balance_1(&self) -> u128 {
        self.balance_1
    }

    fn transfer_0(&mut self, _to: Address, amount: u128) {
        self.balance_0 -= amount;
        self.total_out_0 += amount;
    }

    fn transfer_1(&mut self, _to: Address, amount: u128) {
        self.balance_1 -= amount;
        self.total_out_1 += amount;
    }
}

/// Settles whatever a callback owes, optionally shorting the payment to
/// provoke `InsufficientPayment`.
#[derive(Default, Debug)]
pub struct Payer {
    pub short_0: u128,
    pub short_1: u128,
}

impl MintCallback<Ledger> for Payer {
    fn mint_callback(
        &mut self,
        amount_0_owed: u128,
        amount_1_owed: u128,
        _data: &[u8],
        reserves: &mut Ledger,
    ) {
        reserves.credit_0(amount_0_owed.saturating_sub(self.short_0));
        reserves.credit_1(amount_1_owed.saturating_sub(self.short_1));
    }
}

impl SwapCallback<Ledger> for Payer {
    fn swap_callback(
        &mut self,
        amount_0_delta: i128,
        amount_1_delta: i128,
        _data: &[u8],
        reserves: &mut Ledger,
    ) {
        if amount_0_delta > 0 {
            reserves.credit_0((amount_0_delta as u128).saturating_sub(self.short_0));
        }
        if amount_1_delta > 0 {
            reserves.credit_1((amount_1_delta as u128).saturating_sub(self.short_1));
        }
    }
}

/// Repays the loan plus fees, with a configurable extra donation or
/// shortfall.
#[derive(Default, Debug)]
pub struct FlashBorrower {
    pub loan_0: u128,
    pub loan_1: u128,
    pub extra_0: u128,
    pub extra_1: u128,
    pub short_0: u128,
    pub short_1: u128,
}

impl FlashCallback<Ledger> for FlashBorrower {
    fn flash_callback(&mut self, fee_0: u128, fee_1: u128, _data: &[u8], reserves: &mut Ledger) {
        reserves.credit_0((self.loan_0 + fee_0 + self.extra_0).saturating_sub(self.short_0));
        reserves.credit_1((self.loan_1 + fee_1 + self.extra_1).saturating_sub(self.short_1));
    }
}

/// Asserts the book-keeping invariants that must hold after every
/// externally initiated operation.
pub fn check_invariants(pool: &Pool) {
    // the pool is unlocked at rest (once initialized)
    if !pool.sqrt_price_x96.is_zero() {
        assert!(pool.unlocked, "pool locked at rest");
    }

    // in-range liquidity equals the sum over positions spanning the
    // current tick
    let expected: u128 = pool
        .positions
        .iter()
        .filter(|(key, _)| key.tick_lower <= pool.tick && pool.tick < key.tick_upper)
        .map(|(_, position)| position.liquidity)
        .sum();
    assert_eq!(pool.liquidity, expected, "in-range liquidity out of sync");

    // per-tick gross liquidity matches referencing positions, and the
    // bitmap tracks exactly the initialized ticks
    for (tick, state) in pool.ticks.iter() {
        let gross: u128 = pool
            .positions
            .iter()
            .filter(|(key, _)| key.tick_lower == *tick || key.tick_upper == *tick)
            .map(|(_, position)| position.liquidity)
            .sum();
        assert_eq!(state.liquidity_gross, gross, "gross liquidity at {}", tick);
        assert_eq!(
            pool.tick_bitmap.is_initialized(*tick, pool.tick_spacing),
            gross > 0,
            "bitmap bit at {}",
            tick
        );
    }

    // the sum of liquidity nets at or below the current tick is the
    // in-range liquidity
    let net_sum: i128 = pool
        .ticks
        .iter()
        .filter(|(tick, _)| **tick <= pool.tick)
        .map(|(_, state)| state.liquidity_net)
        .sum();
    assert_eq!(net_sum, pool.liquidity as i128, "net liquidity walk");
}
