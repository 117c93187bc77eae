//! Collaborator interfaces the pool core requires.
//!
//! The pool never holds token balances itself; the two-asset ledger sits
//! behind [`Reserves`] so the engine can be driven against an in-memory
//! double-ledger in tests and against real transfer mechanics in an
//! embedding. Callbacks are capabilities handed into the operation that
//! invokes them: they receive the owed amounts and must settle balances
//! on the ledger before returning. Settlement is verified by the pool's
//! post-balance check, never by a return value, and a callback that
//! panics aborts the whole operation.

use crate::Address;

/// The two-token settlement ledger of a pool.
pub trait Reserves {
    /// Pool-owned balance of token 0.
    fn balance_0(&self) -> u128;

    /// Pool-owned balance of token 1.
    fn balance_1(&self) -> u128;

    /// Move `amount` of token 0 out of the pool's reserve.
    fn transfer_0(&mut self, to: Address, amount: u128);

    /// Move `amount` of token 1 out of the pool's reserve.
    fn transfer_1(&mut self, to: Address, amount: u128);
}

/// Invoked inside `mint` once the owed deposit amounts are known.
pub trait MintCallback<R: Reserves + ?Sized> {
    fn mint_callback(
        &mut self,
        amount_0_owed: u128,
        amount_1_owed: u128,
        data: &[u8],
        reserves: &mut R,
    );
}

/// Invoked inside `swap` after the output side has been paid out.
/// Positive deltas are owed to the pool, negative deltas were paid out.
pub trait SwapCallback<R: Reserves + ?Sized> {
    fn swap_callback(
        &mut self,
        amount_0_delta: i128,
        amount_1_delta: i128,
        data: &[u8],
        reserves: &mut R,
    );
}

/// Invoked inside `flash` after the requested amounts have been paid
/// out.
pub trait FlashCallback<R: Reserves + ?Sized> {
    fn flash_callback(&mut self, fee_0: u128, fee_1: u128, data: &[u8], reserves: &mut R);
}
