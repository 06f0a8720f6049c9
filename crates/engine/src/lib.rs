//! Ledger and inventory engine of the coin store.
//!
//! Users hold a coin balance, send coins to each other and spend them on
//! catalog items. Every operation that moves coins runs as one database
//! transaction: either all of its effects (balances, inventory, ledger) are
//! committed together or none of them is.
//!
//! The store collaborators live in their own modules and can be used inside
//! any sea-orm connection or transaction:
//!
//! - [`accounts`]: balances, with compare-and-swap updates;
//! - [`items`]: the read-only catalog;
//! - [`inventory`]: what each user owns;
//! - [`ledger`]: the append-only log of transfers and purchases.
//!
//! [`Engine`] orchestrates them.

pub use accounts::Account;
pub use error::EngineError;
pub use history::{CoinHistory, InventoryItem, ReceivedCoins, SentCoins, UserInfo};
pub use inventory::InventoryEntry;
pub use items::Item;
pub use ledger::{Counterparty, LedgerEntry, NewLedgerEntry};
pub use ops::{DEFAULT_STARTING_GRANT, Engine, EngineBuilder};

pub mod accounts;
mod error;
mod history;
pub mod inventory;
pub mod items;
pub mod ledger;
mod ops;

pub type ResultEngine<T> = Result<T, EngineError>;
