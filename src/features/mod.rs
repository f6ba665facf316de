mod account;
mod auth;
mod engine;
mod store;
mod transaction;

pub use self::{
    account::{UserAccount, UserId},
    auth::{AdminPolicy, AllowListPolicy},
    engine::{LedgerEngine, LedgerError, PendingTransaction},
    store::{MemoryStore, StoreError, UserStore},
    transaction::{Transaction, TransactionId, TransactionKind, TransactionStatus},
};
