//! FinTrack Core - Domain entities, services, and traits.
//!
//! This crate contains the ledger logic of FinTrack: transactions, monthly
//! budgets, shared wallets with ratio-based settlement and recurring
//! transactions. It is database-agnostic and defines traits that are
//! implemented by the `storage-sqlite` crate.

pub mod budgets;
pub mod constants;
pub mod errors;
pub mod money;
pub mod notifications;
pub mod recurring;
pub mod shared_wallets;
pub mod transactions;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

pub use money::Money;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
