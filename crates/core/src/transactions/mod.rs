//! Transactions module - ledger entries and the change fan-out that keeps
//! budgets and wallet balances in step with them.

mod change_dispatcher;
mod transactions_model;
mod transactions_service;
mod transactions_traits;

#[cfg(test)]
mod transactions_service_tests;

pub use change_dispatcher::TransactionChangeDispatcher;
pub use transactions_model::{
    ChangeKind, NewTransaction, Transaction, TransactionFilter, TransactionSummary,
    TransactionType, TransactionUpdate,
};
pub use transactions_service::TransactionService;
pub use transactions_traits::{
    TransactionChangeHandlerTrait, TransactionRepositoryTrait, TransactionServiceTrait,
};
