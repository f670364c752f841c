//! Holder registry
//!
//! Incrementally maintained set of addresses holding a non-zero balance,
//! per partition and across the whole bond, so coupon holder enumeration
//! never needs a full ledger scan.
//!
//! # Critical Invariants
//!
//! 1. Every registered address had a non-zero total at its last mutation
//! 2. Enumeration order is insertion order; re-entry goes to the back
//! 3. Removal is eager: the ledger syncs the registry after every change

use crate::models::types::{Address, Partition};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::ops::Range;

/// Insertion-ordered address set with O(log n) removal
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Address>", into = "Vec<Address>")]
struct OrderedSet {
    next_seq: u64,
    by_seq: BTreeMap<u64, Address>,
    seq_of: HashMap<Address, u64>,
}

impl OrderedSet {
    fn insert(&mut self, address: Address) -> bool {
        if self.seq_of.contains_key(&address) {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.by_seq.insert(seq, address);
        self.seq_of.insert(address, seq);
        true
    }

    fn remove(&mut self, address: &Address) -> bool {
        match self.seq_of.remove(address) {
            Some(seq) => {
                self.by_seq.remove(&seq);
                true
            }
            None => false,
        }
    }

    fn contains(&self, address: &Address) -> bool {
        self.seq_of.contains_key(address)
    }

    fn len(&self) -> usize {
        self.seq_of.len()
    }

    fn iter(&self) -> impl Iterator<Item = &Address> {
        self.by_seq.values()
    }

    fn slice(&self, range: Range<usize>) -> Vec<Address> {
        let Range { start, end } = range;
        if start >= end {
            return Vec::new();
        }
        self.iter().skip(start).take(end - start).copied().collect()
    }
}

impl From<Vec<Address>> for OrderedSet {
    fn from(addresses: Vec<Address>) -> Self {
        let mut set = OrderedSet::default();
        for address in addresses {
            set.insert(address);
        }
        set
    }
}

impl From<OrderedSet> for Vec<Address> {
    fn from(set: OrderedSet) -> Self {
        set.by_seq.into_values().collect()
    }
}

/// Registry of current holders
///
/// # Example
/// ```
/// use bond_coupon_engine::{Address, HolderRegistry, Partition};
///
/// let mut registry = HolderRegistry::new();
/// let alice = Address::from_low_u64(1);
/// registry.sync(alice, Partition::DEFAULT, 100, 100);
/// assert_eq!(registry.count(&Partition::DEFAULT), 1);
///
/// registry.sync(alice, Partition::DEFAULT, 0, 0);
/// assert_eq!(registry.total_count(), 0);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HolderRegistry {
    partitions: BTreeMap<Partition, OrderedSet>,
    all: OrderedSet,
}

impl HolderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile membership of `holder` after a balance change
    ///
    /// # Arguments
    /// * `partition_total` - holder's total balance in `partition` after the change
    /// * `overall_total` - holder's total balance across all partitions after the change
    pub fn sync(
        &mut self,
        holder: Address,
        partition: Partition,
        partition_total: u64,
        overall_total: u64,
    ) {
        if partition_total > 0 {
            self.partitions.entry(partition).or_default().insert(holder);
        } else if let Some(set) = self.partitions.get_mut(&partition) {
            set.remove(&holder);
            if set.len() == 0 {
                self.partitions.remove(&partition);
            }
        }

        if overall_total > 0 {
            self.all.insert(holder);
        } else {
            self.all.remove(&holder);
        }
    }

    /// Holders of `partition` in insertion order
    pub fn holders(&self, partition: &Partition) -> Vec<Address> {
        self.partitions
            .get(partition)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn count(&self, partition: &Partition) -> usize {
        self.partitions.get(partition).map_or(0, OrderedSet::len)
    }

    /// Page through holders of `partition`; out-of-range bounds are clamped
    pub fn slice(&self, partition: &Partition, start: usize, end: usize) -> Vec<Address> {
        self.partitions
            .get(partition)
            .map(|set| set.slice(start..end))
            .unwrap_or_default()
    }

    pub fn contains(&self, partition: &Partition, holder: &Address) -> bool {
        self.partitions
            .get(partition)
            .is_some_and(|set| set.contains(holder))
    }

    /// Holders with a non-zero balance in any partition, in insertion order
    pub fn all_holders(&self) -> Vec<Address> {
        self.all.iter().copied().collect()
    }

    /// Whether `holder` has a non-zero balance in any partition
    pub fn is_holder(&self, holder: &Address) -> bool {
        self.all.contains(holder)
    }

    pub fn total_count(&self) -> usize {
        self.all.len()
    }

    pub fn slice_all(&self, start: usize, end: usize) -> Vec<Address> {
        self.all.slice(start..end)
    }

    /// Partitions with at least one holder
    pub fn partitions(&self) -> impl Iterator<Item = &Partition> {
        self.partitions.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reentry_moves_holder_to_back() {
        let mut set = OrderedSet::default();
        let a = Address::from_low_u64(1);
        let b = Address::from_low_u64(2);
        set.insert(a);
        set.insert(b);
        set.remove(&a);
        set.insert(a);
        assert_eq!(set.slice(0..10), vec![b, a]);
    }

    #[test]
    fn test_ordered_set_serde_preserves_order() {
        let mut set = OrderedSet::default();
        for i in [5u64, 3, 9] {
            set.insert(Address::from_low_u64(i));
        }
        let json = serde_json::to_string(&set).unwrap();
        let back: OrderedSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back.slice(0..3), set.slice(0..3));
    }
}
