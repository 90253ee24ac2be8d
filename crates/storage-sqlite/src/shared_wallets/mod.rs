//! SQLite storage implementation for shared wallets and their members.

mod model;
mod repository;

pub use model::{SharedWalletDB, SharedWalletMemberDB};
pub use repository::SharedWalletRepository;
