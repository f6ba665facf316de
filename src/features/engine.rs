use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::Serialize;
use thiserror::Error;

use super::account::{AccountError, UserAccount, UserId};
use super::auth::AdminPolicy;
use super::store::{StoreError, UserStore};
use super::transaction::{Transaction, TransactionId, TransactionKind, UnknownTransactionType};

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Unknown user - {0}")]
    UserNotFound(UserId),

    #[error("Invalid request - {0}")]
    InvalidRequest(String),

    #[error(
        "You cannot withdraw {requested}. It is more than the {available} available in the account"
    )]
    InsufficientBalance {
        requested: Decimal,
        available: Decimal,
    },

    #[error("No pending transaction with id {0}")]
    TransactionNotFound(TransactionId),

    #[error("{0}")]
    InvalidTransactionType(#[from] UnknownTransactionType),

    #[error("Caller {0} is not an administrator")]
    Unauthorized(UserId),

    #[error("Concurrent update detected, retry the request")]
    Conflict,

    #[error("Storage failure - {0}")]
    Storage(StoreError),
}

impl From<AccountError> for LedgerError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::InsufficientFund {
                requested,
                available,
            } => Self::InsufficientBalance {
                requested,
                available,
            },
            AccountError::PendingNotFound(id) => Self::TransactionNotFound(id),
        }
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { .. } => Self::Conflict,
            other => Self::Storage(other),
        }
    }
}

type LedgerResult<T> = Result<T, LedgerError>;

/// A Pending transaction tagged with its owner and kind, as returned by the
/// administrator queue.
#[derive(Serialize, Debug, Clone)]
pub struct PendingTransaction {
    pub user_id: UserId,
    pub kind: TransactionKind,
    pub transaction: Transaction,
}

/// The transaction ledger and approval engine.
///
/// Users submit deposit and withdrawal requests, which are recorded Pending
/// with no balance effect. An administrator approves or rejects them; approval
/// is the sole authority over the balance. Every mutation is a fetch of the
/// full user record, an in-memory change and a versioned write-back, so a
/// concurrent update on the same user surfaces as [`LedgerError::Conflict`]
/// instead of silently losing a balance change.
pub struct LedgerEngine<S, P> {
    store: S,
    admins: P,
}

impl<S: UserStore, P: AdminPolicy> LedgerEngine<S, P> {
    pub fn new(store: S, admins: P) -> Self {
        Self { store, admins }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Record a deposit request. Returns the created transaction and the
    /// user's current, unchanged balance.
    pub fn submit_deposit(
        &self,
        user_id: &UserId,
        amount: Decimal,
        method: &str,
    ) -> LedgerResult<(Transaction, Decimal)> {
        validate_amount(amount)?;
        validate_field(method, "method")?;

        let mut account = self.fetch(user_id)?;
        let tx = account.submit_deposit(amount, method);
        let balance = account.balance;
        self.commit(account)?;

        info!("{user_id} requested a deposit of {amount} by {method}");
        Ok((tx, balance))
    }

    /// Record a withdrawal request. The `balance >= amount` check here is an
    /// early user-facing guard only: funds are not reserved and the
    /// authoritative check happens again at approval time.
    pub fn submit_withdrawal(
        &self,
        user_id: &UserId,
        amount: Decimal,
        method: &str,
        destination: &str,
    ) -> LedgerResult<(Transaction, Decimal)> {
        validate_amount(amount)?;
        validate_field(method, "method")?;
        validate_field(destination, "destination account")?;

        let mut account = self.fetch(user_id)?;
        let tx = account.submit_withdrawal(amount, method, destination)?;
        let balance = account.balance;
        self.commit(account)?;

        info!("{user_id} requested a withdrawal of {amount} to {destination}");
        Ok((tx, balance))
    }

    /// Approve a Pending transaction and apply its balance effect. Returns the
    /// new balance.
    ///
    /// Only a transaction that is still Pending matches: approving the same id
    /// twice fails with [`LedgerError::TransactionNotFound`] on the second
    /// call and never credits or debits twice. A withdrawal that no longer
    /// fits the balance fails with [`LedgerError::InsufficientBalance`] and
    /// stays Pending.
    pub fn approve(
        &self,
        admin_id: &UserId,
        user_id: &UserId,
        transaction_id: TransactionId,
        kind: TransactionKind,
    ) -> LedgerResult<Decimal> {
        self.authorize(admin_id)?;

        let mut account = self.fetch(user_id)?;
        let new_balance = account.approve(kind, transaction_id)?;
        self.commit(account)?;

        info!("{admin_id} approved {kind} {transaction_id} of {user_id}, new balance {new_balance}");
        Ok(new_balance)
    }

    /// Reject a Pending transaction. No balance effect for either kind; the
    /// same Pending-only filter as [`Self::approve`] applies.
    pub fn reject(
        &self,
        admin_id: &UserId,
        user_id: &UserId,
        transaction_id: TransactionId,
        kind: TransactionKind,
    ) -> LedgerResult<()> {
        self.authorize(admin_id)?;

        let mut account = self.fetch(user_id)?;
        account.reject(kind, transaction_id)?;
        self.commit(account)?;

        info!("{admin_id} rejected {kind} {transaction_id} of {user_id}");
        Ok(())
    }

    /// The administrator queue: every Pending transaction across all users and
    /// both histories, oldest first.
    pub fn list_pending(&self, admin_id: &UserId) -> LedgerResult<Vec<PendingTransaction>> {
        self.authorize(admin_id)?;

        let mut pending = Vec::new();
        for account in self.store.list_users()? {
            for kind in [TransactionKind::Deposit, TransactionKind::Withdrawal] {
                pending.extend(
                    account
                        .history(kind)
                        .iter()
                        .filter(|tx| tx.is_pending())
                        .map(|tx| PendingTransaction {
                            user_id: account.id.clone(),
                            kind,
                            transaction: tx.clone(),
                        }),
                );
            }
        }

        // Stable sort: ties keep the per-user scan order.
        pending.sort_by_key(|p| p.transaction.created_at);
        Ok(pending)
    }

    fn authorize(&self, admin_id: &UserId) -> LedgerResult<()> {
        if self.admins.is_administrator(admin_id) {
            Ok(())
        } else {
            Err(LedgerError::Unauthorized(admin_id.clone()))
        }
    }

    fn fetch(&self, user_id: &UserId) -> LedgerResult<UserAccount> {
        self.store
            .get_user(user_id)?
            .ok_or_else(|| LedgerError::UserNotFound(user_id.clone()))
    }

    fn commit(&self, account: UserAccount) -> LedgerResult<()> {
        debug_assert!(
            account.is_consistent(),
            "balance diverged from the approved history of {}",
            account.id
        );
        self.store.save_user(account)?;
        Ok(())
    }
}

fn validate_amount(amount: Decimal) -> LedgerResult<()> {
    if amount <= dec!(0) {
        return Err(LedgerError::InvalidRequest(format!(
            "amount must be positive, got {amount}"
        )));
    }
    Ok(())
}

fn validate_field(value: &str, name: &str) -> LedgerResult<()> {
    if value.trim().is_empty() {
        return Err(LedgerError::InvalidRequest(format!("{name} is required")));
    }
    Ok(())
}
