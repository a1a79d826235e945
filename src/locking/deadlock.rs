//! # Deadlock Detection and Victim Selection
//!
//! A blocked transaction waits for every holder of an incompatible mode
//! on the object it requested. Those wait-for edges form a directed graph
//! over transactions; a cycle in it is a deadlock no release will ever
//! resolve on its own.
//!
//! Detection is snapshot-based: the graph is rebuilt from the pending
//! queue and the holder sets each time, inside the manager's critical
//! section, and cycles are found with a depth-first search.
//! There is no background detector; callers decide when to scan, and
//! what to do with the victim (typically `rollback`).
//!
//! ## Victim Policy
//!
//! Among the transactions on any cycle, the victim is the one with the
//! lowest importance; ties break toward the larger handle, so of two
//! equally important transactions the younger one loses.

use hashbrown::{HashMap, HashSet};

use crate::locking::target::LockTarget;
use crate::locking::transaction::TransInfo;
use crate::types::TxnId;

/// One detected wait-for cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadlockInfo {
    pub transactions: Vec<TxnId>,
}

impl DeadlockInfo {
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn involves(&self, trans: TxnId) -> bool {
        self.transactions.contains(&trans)
    }
}

/// Wait-for adjacency over transactions, built from one registry
/// snapshot.
struct WaitGraph {
    edges: HashMap<TxnId, Vec<TxnId>>,
    roots: Vec<TxnId>,
}

impl WaitGraph {
    /// Builds the graph: for each pending transaction, one edge to every
    /// other transaction holding a mode incompatible with the pending
    /// request on the same object.
    fn build(transactions: &HashMap<TxnId, TransInfo>, pending: &[TxnId]) -> Self {
        let mut holders: HashMap<(_, _), Vec<(TxnId, LockTarget)>> = HashMap::new();
        for info in transactions.values() {
            for held in &info.held {
                holders
                    .entry((held.table, held.scope))
                    .or_default()
                    .push((info.trans, *held));
            }
        }

        let mut edges: HashMap<TxnId, Vec<TxnId>> = HashMap::new();
        let mut roots = Vec::new();
        for &waiter in pending {
            let Some(info) = transactions.get(&waiter) else {
                continue;
            };
            let Some(wanted) = info.pending else {
                continue;
            };
            let Some(object_holders) = holders.get(&(wanted.table, wanted.scope)) else {
                continue;
            };

            let mut blockers = Vec::new();
            for (holder, held) in object_holders {
                if *holder == waiter
                    || wanted.access.compatible_with(held.access)
                    || blockers.contains(holder)
                {
                    continue;
                }
                blockers.push(*holder);
            }
            if !blockers.is_empty() {
                roots.push(waiter);
                edges.insert(waiter, blockers);
            }
        }
        Self { edges, roots }
    }

    /// Every distinct cycle reachable from the pending queue, in
    /// discovery order. Nodes of a reported cycle are not revisited, so
    /// overlapping cycles collapse into the first one found.
    fn cycles(&self) -> Vec<Vec<TxnId>> {
        let mut visited = HashSet::new();
        let mut found = Vec::new();
        for &root in &self.roots {
            if visited.contains(&root) {
                continue;
            }
            let mut stack = HashSet::new();
            let mut path = Vec::new();
            if let Some(cycle) = self.dfs(root, &mut visited, &mut stack, &mut path) {
                found.push(cycle);
            }
        }
        found
    }

    fn dfs(
        &self,
        node: TxnId,
        visited: &mut HashSet<TxnId>,
        stack: &mut HashSet<TxnId>,
        path: &mut Vec<TxnId>,
    ) -> Option<Vec<TxnId>> {
        visited.insert(node);
        stack.insert(node);
        path.push(node);

        if let Some(next) = self.edges.get(&node) {
            for &neighbor in next {
                if stack.contains(&neighbor) {
                    let start = path
                        .iter()
                        .position(|&on_path| on_path == neighbor)
                        .unwrap_or(0);
                    return Some(path[start..].to_vec());
                }
                if !visited.contains(&neighbor) {
                    if let Some(cycle) = self.dfs(neighbor, visited, stack, path) {
                        return Some(cycle);
                    }
                }
            }
        }

        stack.remove(&node);
        path.pop();
        None
    }
}

/// Detects every wait-for cycle in the given registry snapshot.
pub fn detect(transactions: &HashMap<TxnId, TransInfo>, pending: &[TxnId]) -> Vec<DeadlockInfo> {
    WaitGraph::build(transactions, pending)
        .cycles()
        .into_iter()
        .map(|transactions| DeadlockInfo { transactions })
        .collect()
}

/// Selects the deadlock victim: lowest importance on any cycle, ties
/// broken toward the larger handle.
pub fn pick_victim(
    transactions: &HashMap<TxnId, TransInfo>,
    pending: &[TxnId],
) -> Option<TxnId> {
    let mut candidates: Vec<TxnId> = Vec::new();
    for info in detect(transactions, pending) {
        for trans in info.transactions {
            if !candidates.contains(&trans) {
                candidates.push(trans);
            }
        }
    }
    candidates.into_iter().min_by_key(|trans| {
        let importance = transactions
            .get(trans)
            .map(|info| info.importance)
            .unwrap_or(u64::MAX);
        (importance, std::cmp::Reverse(*trans))
    })
}
