//! SQLite storage implementation for FinTrack.
//!
//! This crate provides all database-related functionality using Diesel ORM with SQLite.
//! It implements the repository traits defined in `fintrack-core` and contains:
//! - Database connection pooling and management
//! - Diesel migrations
//! - Repository implementations for every domain entity
//! - Database-specific row types (with Diesel derives)
//!
//! # Architecture
//!
//! This crate is the only place where Diesel dependencies exist. The core is
//! database-agnostic and works with traits.
//!
//! ```text
//!        core (domain)
//!              │
//!              ▼
//!   storage-sqlite (this crate)
//!              │
//!              ▼
//!          SQLite DB
//! ```
//!
//! Reads go through the r2d2 pool. Every write goes through a single writer
//! task ([`WriteHandle`]) inside an immediate transaction, so multi-row
//! writes such as recording a recurring run are atomic.

pub mod db;
pub mod errors;
pub mod schema;
pub mod utils;

// Repository implementations
pub mod budgets;
pub mod notifications;
pub mod recurring;
pub mod shared_wallets;
pub mod transactions;

#[cfg(test)]
pub(crate) mod test_support;

pub use db::{
    create_pool, get_connection, get_db_path, init, run_migrations, spawn_writer, DbConnection,
    DbPool, WriteHandle,
};

pub use errors::{IntoCore, StorageError};

pub use budgets::BudgetRepository;
pub use notifications::NotificationRepository;
pub use recurring::RecurringJobRepository;
pub use shared_wallets::SharedWalletRepository;
pub use transactions::TransactionRepository;

// Re-export from fintrack-core for convenience
pub use fintrack_core::errors::{DatabaseError, Error, Result};
