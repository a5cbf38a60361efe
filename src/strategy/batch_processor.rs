//! Batch processing with account-connected partitioning
//!
//! # Design
//!
//! Two operations may run in parallel only if they share no account. A batch
//! is therefore split into groups: operations land in the same group when
//! their account sets are connected, directly or through other operations of
//! the batch (a transfer A→B and a later deposit to B join A's group).
//! Groups are disjoint in accounts, so running them in parallel gives the
//! same result as running the batch in file order, as long as each group
//! keeps its own file order.
//!
//! # Architecture
//!
//! ```text
//! BatchProcessor
//!     ├── Arc<LedgerEngine>   (shared ledger)
//!     └── workers             (lanes per batch)
//!
//! batch ──partition──► groups ──round robin──► lanes ──spawn_blocking──► engine.apply
//! ```
//!
//! # Thread Safety
//!
//! Engine calls block on account locks, so lanes run on tokio's blocking
//! pool rather than on async worker threads.

use crate::core::LedgerEngine;
use crate::types::{AccountId, LedgerError, Operation, Receipt};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, warn};

/// Result of processing a single operation
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    /// The operation that was applied
    pub operation: Operation,

    /// The engine outcome
    pub result: Result<Receipt, LedgerError>,
}

/// Disjoint-set forest over the accounts of one batch
struct AccountSets {
    index: HashMap<AccountId, usize>,
    parent: Vec<usize>,
}

impl AccountSets {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            parent: Vec::new(),
        }
    }

    fn slot(&mut self, id: &AccountId) -> usize {
        if let Some(&slot) = self.index.get(id) {
            return slot;
        }
        let slot = self.parent.len();
        self.parent.push(slot);
        self.index.insert(id.clone(), slot);
        slot
    }

    fn root(&mut self, mut slot: usize) -> usize {
        while self.parent[slot] != slot {
            self.parent[slot] = self.parent[self.parent[slot]];
            slot = self.parent[slot];
        }
        slot
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.root(a), self.root(b));
        if ra != rb {
            self.parent[rb] = ra;
        }
    }
}

/// Applies batches of operations with account-connected partitioning
#[derive(Clone)]
pub struct BatchProcessor {
    engine: Arc<LedgerEngine>,
    workers: usize,
}

impl BatchProcessor {
    /// # Arguments
    ///
    /// * `engine` - Shared ledger engine
    /// * `workers` - Maximum number of groups applied at the same time (at least 1)
    pub fn new(engine: Arc<LedgerEngine>, workers: usize) -> Self {
        Self {
            engine,
            workers: workers.max(1),
        }
    }

    /// Split a batch into account-disjoint groups
    ///
    /// # Guarantees
    ///
    /// - Each operation appears in exactly one group
    /// - Operations sharing an account, directly or transitively, share a group
    /// - Within a group, operations keep their batch order
    /// - Groups are ordered by the position of their first operation
    pub fn partition(&self, batch: Vec<Operation>) -> Vec<Vec<Operation>> {
        let mut sets = AccountSets::new();
        let mut first_slot = Vec::with_capacity(batch.len());

        for operation in &batch {
            let slots: Vec<usize> = operation
                .accounts()
                .into_iter()
                .map(|id| sets.slot(id))
                .collect();
            for pair in slots.windows(2) {
                sets.union(pair[0], pair[1]);
            }
            first_slot.push(slots[0]);
        }

        let mut group_of_root: HashMap<usize, usize> = HashMap::new();
        let mut groups: Vec<Vec<Operation>> = Vec::new();

        for (operation, slot) in batch.into_iter().zip(first_slot) {
            let root = sets.root(slot);
            let group = *group_of_root.entry(root).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[group].push(operation);
        }

        groups
    }

    /// Apply one group in order on the current thread
    pub fn process_group(&self, operations: Vec<Operation>) -> Vec<ProcessingResult> {
        operations
            .into_iter()
            .map(|operation| {
                let result = self.engine.apply(&operation);
                if let Err(e) = &result {
                    warn!(%operation, error = %e, "operation rejected");
                }
                ProcessingResult { operation, result }
            })
            .collect()
    }

    /// Apply a batch, running account-disjoint groups in parallel
    ///
    /// Waits for the whole batch before returning, so operations of later
    /// batches always observe every effect of this one.
    ///
    /// # Returns
    ///
    /// * `Ok(results)` - one `ProcessingResult` per operation, ordered by lane
    ///   rather than by batch position
    /// * `Err(LedgerError::WorkerFailed)` - a lane panicked; the other lanes
    ///   still ran to completion
    pub async fn process_batch(
        &self,
        batch: Vec<Operation>,
    ) -> Result<Vec<ProcessingResult>, LedgerError> {
        let groups = self.partition(batch);
        let lane_count = self.workers.min(groups.len());

        let mut lanes: Vec<Vec<Vec<Operation>>> = (0..lane_count).map(|_| Vec::new()).collect();
        for (i, group) in groups.into_iter().enumerate() {
            lanes[i % lane_count].push(group);
        }

        let mut tasks = Vec::with_capacity(lanes.len());
        for lane in lanes {
            let processor = self.clone();
            tasks.push(tokio::task::spawn_blocking(move || {
                lane.into_iter()
                    .flat_map(|group| processor.process_group(group))
                    .collect::<Vec<_>>()
            }));
        }

        let mut results = Vec::new();
        let mut failure = None;
        for task in tasks {
            match task.await {
                Ok(lane_results) => results.extend(lane_results),
                Err(e) => {
                    error!(error = %e, "batch lane panicked");
                    failure.get_or_insert_with(|| LedgerError::worker_failed(e.to_string()));
                }
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(results),
        }
    }
}
