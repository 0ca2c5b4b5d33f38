//! Error taxonomy for pool operations.
//!
//! Every variant is a rejected operation: the pool state is never committed
//! when one of these is returned. Only [`PoolError::Diverged`] means the
//! collaborators' balances moved anyway.

use derive_more::Display;

/// Rejection reported by an external asset ledger (token or native).
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum TransferError {
    /// The sender does not hold enough of the asset
    #[display("insufficient balance")]
    InsufficientBalance,
    /// The spender's allowance does not cover the amount
    #[display("insufficient allowance")]
    InsufficientAllowance,
    /// The collaborator refused the transfer for its own reasons
    #[display("transfer rejected: {_0}")]
    Rejected(String),
}

impl std::error::Error for TransferError {}

/// Errors returned by the exchange pool.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum PoolError {
    /// Zero amount where one is not allowed, or a formula applied to an empty pool
    #[display("invalid amount")]
    InvalidAmount,
    /// Non-bootstrap deposit that does not carry enough tokens for the current ratio
    #[display("insufficient token amount")]
    RatioMismatch,
    /// Withdrawal larger than the caller's liquidity position
    #[display("insufficient shares")]
    InsufficientShares,
    /// Swap output below the caller's minimum (slippage guard)
    #[display("insufficient output amount")]
    InsufficientOutputAmount,
    /// Checked arithmetic overflowed its fixed width
    #[display("arithmetic overflow")]
    Overflow,
    /// The pool's own account named as payer, provider or recipient
    #[display("invalid counterparty")]
    InvalidCounterparty,
    /// Swap fee outside `0..10_000` basis points
    #[display("invalid fee: {_0} bps")]
    InvalidFee(u16),
    /// An external ledger rejected one of the settlement transfers
    #[display("{_0}")]
    Transfer(TransferError),
    /// A settlement transfer was rejected and reversing an earlier one failed
    /// too, so the pool's balances no longer match its reserves
    #[display("settlement diverged: {_0}")]
    Diverged(TransferError),
}

impl std::error::Error for PoolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transfer(err) | Self::Diverged(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TransferError> for PoolError {
    fn from(err: TransferError) -> Self {
        Self::Transfer(err)
    }
}

/// Result alias used across the pool engine
pub type PoolResult<T> = Result<T, PoolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            PoolError::InsufficientOutputAmount.to_string(),
            "insufficient output amount"
        );
        assert_eq!(PoolError::InvalidFee(12_000).to_string(), "invalid fee: 12000 bps");
        assert_eq!(
            PoolError::from(TransferError::Rejected("frozen".into())).to_string(),
            "transfer rejected: frozen"
        );
        assert_eq!(
            PoolError::Diverged(TransferError::InsufficientBalance).to_string(),
            "settlement diverged: insufficient balance"
        );
    }

    #[test]
    fn test_transfer_source() {
        use std::error::Error;

        let err = PoolError::Transfer(TransferError::InsufficientAllowance);
        assert_eq!(
            err.source().map(ToString::to_string),
            Some("insufficient allowance".to_string())
        );
        assert!(PoolError::Overflow.source().is_none());
    }
}
