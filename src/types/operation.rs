//! Operation requests and their receipts
//!
//! An [`Operation`] is what a caller asks the engine to do; a [`Receipt`] is
//! what the engine hands back once the operation has committed.

use super::account::AccountId;
use super::transaction::{TransactionEntry, TransactionKind};
use rust_decimal::Decimal;
use std::fmt;

/// Balance-affecting request submitted to the ledger engine
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Deposit {
        account: AccountId,
        amount: Decimal,
        description: String,
    },
    Withdrawal {
        account: AccountId,
        amount: Decimal,
        description: String,
    },
    Transfer {
        source: AccountId,
        destination: AccountId,
        amount: Decimal,
        description: String,
    },
}

impl Operation {
    /// Kind of log entry this operation produces
    pub fn kind(&self) -> TransactionKind {
        match self {
            Operation::Deposit { .. } => TransactionKind::Deposit,
            Operation::Withdrawal { .. } => TransactionKind::Withdrawal,
            Operation::Transfer { .. } => TransactionKind::Transfer,
        }
    }

    /// Accounts the operation touches, source first
    pub fn accounts(&self) -> Vec<&AccountId> {
        match self {
            Operation::Deposit { account, .. } | Operation::Withdrawal { account, .. } => {
                vec![account]
            }
            Operation::Transfer {
                source,
                destination,
                ..
            } => vec![source, destination],
        }
    }

    pub fn amount(&self) -> Decimal {
        match self {
            Operation::Deposit { amount, .. }
            | Operation::Withdrawal { amount, .. }
            | Operation::Transfer { amount, .. } => *amount,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Deposit {
                account, amount, ..
            }
            | Operation::Withdrawal {
                account, amount, ..
            } => write!(f, "{},account={},amount={}", self.kind(), account, amount),
            Operation::Transfer {
                source,
                destination,
                amount,
                ..
            } => write!(
                f,
                "{},source={},destination={},amount={}",
                self.kind(),
                source,
                destination,
                amount
            ),
        }
    }
}

/// Outcome of a committed deposit
#[derive(Debug, Clone, PartialEq)]
pub struct DepositReceipt {
    pub entry: TransactionEntry,
    pub new_balance: Decimal,
}

/// Outcome of a committed withdrawal
#[derive(Debug, Clone, PartialEq)]
pub struct WithdrawalReceipt {
    pub entry: TransactionEntry,
    pub new_balance: Decimal,
    /// Allowance left for the rest of the calendar day
    pub remaining_daily_allowance: Decimal,
}

/// Outcome of a committed transfer
#[derive(Debug, Clone, PartialEq)]
pub struct TransferReceipt {
    pub entry: TransactionEntry,
    pub source_balance: Decimal,
    pub destination_balance: Decimal,
}

/// Receipt for any committed operation
#[derive(Debug, Clone, PartialEq)]
pub enum Receipt {
    Deposit(DepositReceipt),
    Withdrawal(WithdrawalReceipt),
    Transfer(TransferReceipt),
}

impl Receipt {
    /// The log entry written by the operation
    pub fn entry(&self) -> &TransactionEntry {
        match self {
            Receipt::Deposit(r) => &r.entry,
            Receipt::Withdrawal(r) => &r.entry,
            Receipt::Transfer(r) => &r.entry,
        }
    }
}
