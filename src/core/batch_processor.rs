//! Batch processing with user-based partitioning
//!
//! This module provides the `BatchProcessor` struct, which runs batches of
//! operations concurrently across users while keeping each user's operations
//! in their original order.
//!
//! # Design
//!
//! A batch is partitioned by user ID and every partition is processed on its
//! own tokio task. Operations of one user run sequentially, so a redemption
//! is always checked against the balance left by the user's earlier
//! operations in the input.
//!
//! Transaction IDs are global. Users whose operations name the same
//! transaction ID within a batch are merged into one partition, which runs
//! their operations in input order, so the first row to claim an ID wins
//! exactly as it would in a sequential run.
//!
//! # Architecture
//!
//! ```text
//! BatchProcessor
//!     └── Arc<TransactionProcessor>  (shared transaction processor)
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tracing::error;

use crate::core::processor::TransactionProcessor;
use crate::types::{CoinTransaction, LoyaltyError, Operation, TransactionId, UserId};

/// Result of executing a single operation
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    /// The operation that was executed
    pub operation: Operation,

    /// The resulting transaction record, or why the operation was refused
    pub result: Result<CoinTransaction, LoyaltyError>,
}

/// Batch processor with user-based partitioning
#[derive(Clone)]
pub struct BatchProcessor {
    /// Shared transaction processor
    processor: Arc<TransactionProcessor>,
}

impl BatchProcessor {
    pub fn new(processor: Arc<TransactionProcessor>) -> Self {
        Self { processor }
    }

    /// Group a batch into partitions that can run concurrently
    ///
    /// # Guarantees
    ///
    /// - All operations of a user are in the same partition
    /// - Operations naming the same transaction ID are in the same partition
    /// - Every partition keeps the input order of its operations
    pub fn partition(&self, batch: Vec<Operation>) -> Vec<Vec<Operation>> {
        let mut groups = UserGroups::default();
        let mut claimed: HashMap<TransactionId, UserId> = HashMap::new();
        for operation in &batch {
            let user = operation.user();
            groups.add(user);
            let first = *claimed.entry(operation.tx()).or_insert(user);
            groups.merge(first, user);
        }

        let mut partitions: HashMap<UserId, Vec<Operation>> = HashMap::new();
        for operation in batch {
            let root = groups.root(operation.user());
            partitions.entry(root).or_default().push(operation);
        }

        partitions.into_values().collect()
    }

    /// Execute one user's operations sequentially
    ///
    /// Every operation is executed even if an earlier one fails. Results are
    /// returned in input order.
    pub async fn process_user_operations(&self, operations: Vec<Operation>) -> Vec<ProcessingResult> {
        let mut results = Vec::with_capacity(operations.len());

        for operation in operations {
            let result = self.processor.execute(operation.clone());
            results.push(ProcessingResult { operation, result });
        }

        results
    }

    /// Execute a batch, one tokio task per partition
    ///
    /// Results of different partitions may be interleaved in any order.
    pub async fn process_batch(&self, batch: Vec<Operation>) -> Vec<ProcessingResult> {
        let partitions = self.partition(batch);

        let mut tasks = Vec::with_capacity(partitions.len());
        for operations in partitions {
            let processor = self.clone();
            tasks.push(tokio::spawn(async move {
                processor.process_user_operations(operations).await
            }));
        }

        let mut results = Vec::new();
        for task in tasks {
            match task.await {
                Ok(user_results) => results.extend(user_results),
                Err(e) => error!(error = %e, "user batch task failed"),
            }
        }

        results
    }
}

/// Disjoint sets of users, merged when they share a transaction ID
#[derive(Debug, Default)]
struct UserGroups {
    parent: HashMap<UserId, UserId>,
}

impl UserGroups {
    fn add(&mut self, user: UserId) {
        self.parent.entry(user).or_insert(user);
    }

    fn root(&mut self, user: UserId) -> UserId {
        let mut root = user;
        while let Some(&next) = self.parent.get(&root) {
            if next == root {
                break;
            }
            root = next;
        }

        // Path compression
        let mut current = user;
        while current != root {
            let next = self.parent.insert(current, root).unwrap_or(root);
            current = next;
        }
        root
    }

    fn merge(&mut self, a: UserId, b: UserId) {
        let (root_a, root_b) = (self.root(a), self.root(b));
        if root_a != root_b {
            self.parent.insert(root_b, root_a);
        }
    }
}
