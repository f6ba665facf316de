use super::transaction::{Transaction, TransactionId, TransactionKind, TransactionStatus};
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// User identifier, e.g. the email address the user registered with
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, PartialOrd, Eq, Ord, Hash)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Error, Debug)]
pub(crate) enum AccountError {
    #[error(
        "You cannot withdraw {requested}. It is more than the {available} available in the account"
    )]
    InsufficientFund {
        requested: Decimal,
        available: Decimal,
    },

    #[error("No pending transaction with id {0}")]
    PendingNotFound(TransactionId),
}

type AccountResult<T> = Result<T, AccountError>;

/// A user's ledger: the stored balance plus the deposit and withdrawal
/// histories it is derived from.
///
/// Invariant: `balance` equals the sum of Approved deposit amounts minus the
/// sum of Approved withdrawal amounts, from account creation onwards.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UserAccount {
    pub id: UserId,

    /// Stored aggregate of the approved history. Never negative.
    pub balance: Decimal,

    pub deposits: Vec<Transaction>,

    pub withdrawals: Vec<Transaction>,

    /// Referral code other users can sign up with. Not used by the ledger
    /// itself, only looked up through the store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral_code: Option<String>,

    /// Bumped by the store on every successful save. A stale version on a
    /// write-back means a concurrent update won and the save is refused.
    pub version: u64,
}

impl UserAccount {
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            balance: dec!(0),
            deposits: Vec::new(),
            withdrawals: Vec::new(),
            referral_code: None,
            version: 0,
        }
    }

    pub fn with_referral_code(mut self, code: impl Into<String>) -> Self {
        self.referral_code = Some(code.into());
        self
    }

    /// Record a deposit request. Balance is untouched until approval.
    pub(crate) fn submit_deposit(&mut self, amount: Decimal, method: &str) -> Transaction {
        let tx = Transaction::pending(amount, method, None);
        self.deposits.push(tx.clone());
        tx
    }

    /// Record a withdrawal request. The balance check here is advisory only:
    /// funds are not reserved, and the authoritative check runs again at
    /// approval time.
    pub(crate) fn submit_withdrawal(
        &mut self,
        amount: Decimal,
        method: &str,
        destination: &str,
    ) -> AccountResult<Transaction> {
        if self.balance < amount {
            return Err(AccountError::InsufficientFund {
                requested: amount,
                available: self.balance,
            });
        }

        let tx = Transaction::pending(amount, method, Some(destination));
        self.withdrawals.push(tx.clone());
        Ok(tx)
    }

    /// Apply an administrator approval: Pending -> Approved plus the balance
    /// effect. Only a Pending transaction matches, so a second approval (or an
    /// approval after a rejection) finds nothing and changes nothing.
    ///
    /// A withdrawal that no longer fits the balance fails and stays Pending.
    pub(crate) fn approve(
        &mut self,
        kind: TransactionKind,
        transaction_id: TransactionId,
    ) -> AccountResult<Decimal> {
        let index = self
            .position_pending(kind, transaction_id)
            .ok_or(AccountError::PendingNotFound(transaction_id))?;
        let amount = self.history(kind)[index].amount;

        match kind {
            TransactionKind::Deposit => self.balance += amount,
            TransactionKind::Withdrawal => {
                if self.balance < amount {
                    return Err(AccountError::InsufficientFund {
                        requested: amount,
                        available: self.balance,
                    });
                }
                self.balance -= amount;
            }
        }

        self.history_mut(kind)[index].status = TransactionStatus::Approved;
        Ok(self.balance)
    }

    /// Apply an administrator rejection: Pending -> Rejected, no balance
    /// effect. Same Pending-only filter as [`Self::approve`].
    pub(crate) fn reject(
        &mut self,
        kind: TransactionKind,
        transaction_id: TransactionId,
    ) -> AccountResult<()> {
        let index = self
            .position_pending(kind, transaction_id)
            .ok_or(AccountError::PendingNotFound(transaction_id))?;

        self.history_mut(kind)[index].status = TransactionStatus::Rejected;
        Ok(())
    }

    /// The balance recomputed from the approved history.
    pub fn ledger_balance(&self) -> Decimal {
        let approved = |history: &[Transaction]| -> Decimal {
            history
                .iter()
                .filter(|tx| tx.status == TransactionStatus::Approved)
                .map(|tx| tx.amount)
                .sum()
        };

        approved(&self.deposits) - approved(&self.withdrawals)
    }

    /// Whether the stored balance still matches the approved history.
    pub fn is_consistent(&self) -> bool {
        self.balance == self.ledger_balance()
    }

    pub(crate) fn history(&self, kind: TransactionKind) -> &[Transaction] {
        match kind {
            TransactionKind::Deposit => &self.deposits,
            TransactionKind::Withdrawal => &self.withdrawals,
        }
    }

    fn history_mut(&mut self, kind: TransactionKind) -> &mut [Transaction] {
        match kind {
            TransactionKind::Deposit => &mut self.deposits,
            TransactionKind::Withdrawal => &mut self.withdrawals,
        }
    }

    fn position_pending(&self, kind: TransactionKind, id: TransactionId) -> Option<usize> {
        self.history(kind)
            .iter()
            .position(|tx| tx.id == id && tx.is_pending())
    }
}
