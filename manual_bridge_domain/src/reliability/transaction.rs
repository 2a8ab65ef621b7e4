// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::TxnId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionState {
    Open,
    Committed,
    RolledBack,
}

/// A forward operation paired with its compensating (undo) operation.
/// Both are opaque descriptors interpreted by the graph client; the
/// transaction manager itself never inspects their contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    pub forward: String,
    pub compensating: String,
}

/// A saga: a sequence of forward operations, each with a compensating
/// operation recorded only after the forward op itself succeeded.
/// `commit` discards the compensation list; `rollback` runs it in reverse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub txn_id: TxnId,
    pub started_at: DateTime<Utc>,
    pub ops: Vec<Operation>,
    pub state: TransactionState,
}

/// A transaction open longer than this is eligible for automated rollback
/// by the recovery controller's `stuck transaction` strategy (§4.1, §4.10).
pub const STUCK_TRANSACTION_AGE: chrono::Duration = chrono::Duration::minutes(30);

impl Transaction {
    pub fn begin() -> Self {
        Self {
            txn_id: TxnId::new(),
            started_at: Utc::now(),
            ops: Vec::new(),
            state: TransactionState::Open,
        }
    }

    pub fn add(&mut self, forward: impl Into<String>, compensating: impl Into<String>) {
        debug_assert_eq!(self.state, TransactionState::Open, "cannot add to a closed transaction");
        self.ops.push(Operation {
            forward: forward.into(),
            compensating: compensating.into(),
        });
    }

    /// Commits the saga, discarding compensations (testable property #8: a
    /// committed saga has an empty compensation list).
    pub fn commit(&mut self) {
        self.state = TransactionState::Committed;
        self.ops.clear();
    }

    /// Returns the compensating descriptors in the order they must be run
    /// (reverse of recording order); the caller executes them against the
    /// graph client and reports back via [`Transaction::mark_rolled_back`].
    pub fn compensations_in_rollback_order(&self) -> Vec<String> {
        self.ops.iter().rev().map(|op| op.compensating.clone()).collect()
    }

    pub fn mark_rolled_back(&mut self) {
        self.state = TransactionState::RolledBack;
        self.ops.clear();
    }

    pub fn is_stuck(&self, now: DateTime<Utc>) -> bool {
        self.state == TransactionState::Open && now.signed_duration_since(self.started_at) > STUCK_TRANSACTION_AGE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_empties_compensation_list() {
        let mut txn = Transaction::begin();
        txn.add("create A", "delete A");
        txn.commit();
        assert!(txn.ops.is_empty());
        assert_eq!(txn.state, TransactionState::Committed);
    }

    #[test]
    fn compensations_run_in_reverse_of_recording_order() {
        let mut txn = Transaction::begin();
        txn.add("create A", "delete A");
        txn.add("create B", "delete B");
        assert_eq!(txn.compensations_in_rollback_order(), vec!["delete B", "delete A"]);
    }

    #[test]
    fn stuck_after_thirty_minutes_open() {
        let mut txn = Transaction::begin();
        txn.started_at = Utc::now() - chrono::Duration::minutes(31);
        assert!(txn.is_stuck(Utc::now()));
    }
}
