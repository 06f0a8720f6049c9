//! The module contains the errors the engine can throw.
//!
//! Errors fall in four groups:
//!
//! - validation ([`InvalidAmount`], [`InvalidTransfer`], ...), rejected
//!   before the database is touched;
//! - not found ([`AccountNotFound`], [`ItemNotFound`]);
//! - business rules ([`InsufficientBalance`]);
//! - transient ([`Conflict`], [`Database`]): the unit of work was rolled back
//!   and the caller may resend the whole operation.
//!
//!  [`InvalidAmount`]: EngineError::InvalidAmount
//!  [`InvalidTransfer`]: EngineError::InvalidTransfer
//!  [`AccountNotFound`]: EngineError::AccountNotFound
//!  [`ItemNotFound`]: EngineError::ItemNotFound
//!  [`InsufficientBalance`]: EngineError::InsufficientBalance
//!  [`Conflict`]: EngineError::Conflict
//!  [`Database`]: EngineError::Database
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid transfer: {0}")]
    InvalidTransfer(String),
    #[error("Invalid item name: {0}")]
    InvalidItemName(String),
    #[error("Invalid username: {0}")]
    InvalidUsername(String),
    #[error("Invalid counterparty: {0}")]
    InvalidCounterparty(String),
    #[error("Account \"{0}\" not found!")]
    AccountNotFound(String),
    #[error("Item \"{0}\" not found!")]
    ItemNotFound(String),
    #[error("Account \"{0}\" already present!")]
    ExistingAccount(String),
    #[error("Insufficient balance: needed {needed}, available {available}")]
    InsufficientBalance { needed: i64, available: i64 },
    #[error("Concurrent update conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    /// Whether resending the same operation may succeed.
    ///
    /// Only store failures and lost optimistic races qualify; validation,
    /// not-found and business-rule errors are final for the given input.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::Database(_))
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidTransfer(a), Self::InvalidTransfer(b)) => a == b,
            (Self::InvalidItemName(a), Self::InvalidItemName(b)) => a == b,
            (Self::InvalidUsername(a), Self::InvalidUsername(b)) => a == b,
            (Self::InvalidCounterparty(a), Self::InvalidCounterparty(b)) => a == b,
            (Self::AccountNotFound(a), Self::AccountNotFound(b)) => a == b,
            (Self::ItemNotFound(a), Self::ItemNotFound(b)) => a == b,
            (Self::ExistingAccount(a), Self::ExistingAccount(b)) => a == b,
            (
                Self::InsufficientBalance {
                    needed: n1,
                    available: a1,
                },
                Self::InsufficientBalance {
                    needed: n2,
                    available: a2,
                },
            ) => n1 == n2 && a1 == a2,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
