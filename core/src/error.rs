use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = core::result::Result<T, ErrorCode>;

/// Every way a pool operation can abort. No error is recovered
/// internally; an `Err` return leaves the pool state untouched.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    #[error("pool is locked")]
    Locked,

    #[error("pool price is already initialized")]
    AlreadyInitialized,

    #[error("the lower tick must be below the upper tick")]
    TickMisordered,

    #[error("tick outside the [-887272, 887272] range")]
    TickOutOfRange,

    #[error("tick is not a multiple of the pool tick spacing")]
    TickNotSpaced,

    #[error("tick has no initialized state")]
    TickNotInitialized,

    #[error("amount must be greater than 0")]
    ZeroAmount,

    #[error("protocol fee denominator must be 0 or within [4, 10]")]
    BadFeeProtocol,

    #[error("sqrt price limit out of bounds or on the wrong side of the price")]
    BadSqrtPriceLimit,

    #[error("sqrt price outside the representable range")]
    SqrtPriceOutOfRange,

    #[error("liquidity addition or subtraction out of range")]
    LiquidityOverflow,

    #[error("math overflow")]
    MathOverflow,

    #[error("oracle target predates the oldest observation")]
    OracleOld,

    #[error("oracle has no initialized observations")]
    OracleUninitialized,

    #[error("not enough in-range liquidity to make progress")]
    InsufficientLiquidity,

    #[error("callback did not settle the owed token amounts")]
    InsufficientPayment,

    #[error("caller is not the pool owner")]
    Unauthorized,
}
