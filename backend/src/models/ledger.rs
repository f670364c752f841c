//! Partitioned balance ledger
//!
//! Holds every holder's [`HolderBalance`] per partition together with the
//! lock, hold and clearing records that explain the encumbered buckets.
//! The coupon engine reads it through [`PartitionedBalanceLedger::total_balance_of`]
//! and [`PartitionedBalanceLedger::total_balance_across`]; the mutation
//! methods stand in for the transfer/lock/hold/freeze/clearing subsystems.
//!
//! # Critical Invariants
//!
//! 1. **Conservation**: per partition, the sum of holder totals equals the
//!    partition's total supply
//! 2. **Non-negative buckets**: every bucket is unsigned and every debit is
//!    checked against what the holder can actually spend
//! 3. **All-or-nothing**: each mutation validates completely before writing
//! 4. **Registry sync**: every write reconciles the [`HolderRegistry`]

use crate::models::balance::HolderBalance;
use crate::models::holders::HolderRegistry;
use crate::models::types::{Address, Amount, Partition, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

pub type LockId = u64;
pub type HoldId = u64;
pub type ClearingId = u64;

/// Errors raised by ledger mutations
#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    #[error("Amount must be positive")]
    ZeroAmount,

    #[error("Insufficient balance for {holder} in {partition}: required {required}, available {available}")]
    InsufficientBalance {
        holder: Address,
        partition: Partition,
        required: Amount,
        available: Amount,
    },

    #[error("Insufficient frozen balance for {holder} in {partition}: required {required}, frozen {frozen}")]
    InsufficientFrozenBalance {
        holder: Address,
        partition: Partition,
        required: Amount,
        frozen: Amount,
    },

    #[error("Lock {0} not found")]
    LockNotFound(LockId),

    #[error("Lock {id} expires at {expiration}, now is {now}")]
    LockExpirationNotReached {
        id: LockId,
        expiration: Timestamp,
        now: Timestamp,
    },

    #[error("Hold {0} not found")]
    HoldNotFound(HoldId),

    #[error("Hold {id} expired at {expiration}, now is {now}")]
    HoldExpired {
        id: HoldId,
        expiration: Timestamp,
        now: Timestamp,
    },

    #[error("Hold {id} has {remaining} remaining, requested {requested}")]
    HoldAmountExceeded {
        id: HoldId,
        requested: Amount,
        remaining: Amount,
    },

    #[error("Hold {id} is bound to {expected}, not {actual}")]
    HoldDestinationMismatch {
        id: HoldId,
        expected: Address,
        actual: Address,
    },

    #[error("Clearing {0} not found")]
    ClearingNotFound(ClearingId),

    #[error("Clearing {id} expired at {expiration}, now is {now}")]
    ClearingExpired {
        id: ClearingId,
        expiration: Timestamp,
        now: Timestamp,
    },

    #[error("Total supply of {0} would overflow")]
    SupplyOverflow(Partition),

    #[error("Total supply across partitions would overflow")]
    BondSupplyOverflow,

    #[error("Conservation violated in {partition}: supply {supply}, sum of holders {sum}")]
    ConservationViolated {
        partition: Partition,
        supply: Amount,
        sum: u128,
    },

    #[error("{bucket} of {holder} in {partition} is {balance}, records add up to {recorded}")]
    RecordMismatch {
        holder: Address,
        partition: Partition,
        bucket: &'static str,
        recorded: u128,
        balance: Amount,
    },

    #[error("Cleared {cleared} of {holder} in {partition} exceeds free {free}")]
    ClearedExceedsFree {
        holder: Address,
        partition: Partition,
        cleared: Amount,
        free: Amount,
    },

    #[error("{kind} record {id} is inconsistent with the id counter")]
    RecordIdMismatch { kind: &'static str, id: u64 },

    #[error("Holder registry disagrees with balances for {0}")]
    RegistryOutOfSync(Address),
}

/// Units locked until `expiration`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lock {
    pub id: LockId,
    pub holder: Address,
    pub partition: Partition,
    pub amount: Amount,
    pub expiration: Timestamp,
}

/// Units escrowed under a hold
///
/// `to` pins the destination when set; otherwise the escrow chooses it at
/// execution time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hold {
    pub id: HoldId,
    pub holder: Address,
    pub partition: Partition,
    pub amount: Amount,
    pub escrow: Address,
    pub to: Option<Address>,
    pub expiration: Timestamp,
}

/// Pending clearing transfer reserving units out of the sender's free bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clearing {
    pub id: ClearingId,
    pub from: Address,
    pub to: Address,
    pub partition: Partition,
    pub amount: Amount,
    pub expiration: Timestamp,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PartitionBook {
    balances: BTreeMap<Address, HolderBalance>,
    total_supply: Amount,
}

/// Multi-partition ledger of encumbered balances
///
/// # Example
/// ```
/// use bond_coupon_engine::{Address, Partition, PartitionedBalanceLedger};
///
/// let mut ledger = PartitionedBalanceLedger::new();
/// let alice = Address::from_low_u64(1);
/// ledger.issue(alice, Partition::DEFAULT, 1_000).unwrap();
/// ledger.lock(alice, Partition::DEFAULT, 300, 10_000).unwrap();
///
/// assert_eq!(ledger.total_balance_of(&alice, &Partition::DEFAULT), 1_000);
/// assert_eq!(ledger.balance_of(&alice, &Partition::DEFAULT).free, 700);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartitionedBalanceLedger {
    books: BTreeMap<Partition, PartitionBook>,
    registry: HolderRegistry,
    locks: BTreeMap<LockId, Lock>,
    holds: BTreeMap<HoldId, Hold>,
    clearings: BTreeMap<ClearingId, Clearing>,
    next_lock_id: LockId,
    next_hold_id: HoldId,
    next_clearing_id: ClearingId,
}

impl PartitionedBalanceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Bucket breakdown for `holder` in `partition` (all zero if unknown)
    pub fn balance_of(&self, holder: &Address, partition: &Partition) -> HolderBalance {
        self.books
            .get(partition)
            .and_then(|book| book.balances.get(holder))
            .copied()
            .unwrap_or_default()
    }

    /// free + locked + held + frozen for `holder` in `partition`
    pub fn total_balance_of(&self, holder: &Address, partition: &Partition) -> Amount {
        self.balance_of(holder, partition).total()
    }

    /// Total balance of `holder` summed over every partition
    ///
    /// Issuance keeps supply across all partitions within `Amount`, so the
    /// sum is exact.
    pub fn total_balance_across(&self, holder: &Address) -> Amount {
        self.books
            .values()
            .filter_map(|book| book.balances.get(holder))
            .map(HolderBalance::total)
            .fold(0, Amount::saturating_add)
    }

    /// Partitions in which `holder` has a non-zero total
    pub fn partitions_of(&self, holder: &Address) -> Vec<Partition> {
        self.books
            .iter()
            .filter(|(_, book)| book.balances.get(holder).is_some_and(|b| !b.is_empty()))
            .map(|(partition, _)| *partition)
            .collect()
    }

    pub fn total_supply(&self, partition: &Partition) -> Amount {
        self.books.get(partition).map_or(0, |book| book.total_supply)
    }

    /// Supply across all partitions, widened so it cannot overflow
    pub fn total_supply_all(&self) -> u128 {
        self.books
            .values()
            .map(|book| u128::from(book.total_supply))
            .sum()
    }

    pub fn registry(&self) -> &HolderRegistry {
        &self.registry
    }

    pub fn lock_record(&self, id: LockId) -> Option<&Lock> {
        self.locks.get(&id)
    }

    pub fn hold_record(&self, id: HoldId) -> Option<&Hold> {
        self.holds.get(&id)
    }

    pub fn clearing_record(&self, id: ClearingId) -> Option<&Clearing> {
        self.clearings.get(&id)
    }

    /// Check supply conservation for every partition
    pub fn verify_conservation(&self) -> Result<(), LedgerError> {
        for (partition, book) in &self.books {
            let sum: u128 = book
                .balances
                .values()
                .map(|b| u128::from(b.free) + u128::from(b.locked) + u128::from(b.held) + u128::from(b.frozen))
                .sum();
            if sum != u128::from(book.total_supply) {
                return Err(LedgerError::ConservationViolated {
                    partition: *partition,
                    supply: book.total_supply,
                    sum,
                });
            }
        }
        Ok(())
    }

    /// Check that the lock, hold and clearing records explain the encumbered
    /// buckets and that the holder registry matches the balances
    ///
    /// Every mutation keeps this true; it guards state that was deserialized
    /// rather than built through the mutation methods.
    pub fn verify_records(&self) -> Result<(), LedgerError> {
        if self.total_supply_all() > u128::from(Amount::MAX) {
            return Err(LedgerError::BondSupplyOverflow);
        }

        // (locked, held, cleared) per holder and partition
        let mut recorded: BTreeMap<(Address, Partition), [u128; 3]> = BTreeMap::new();
        for (id, lock) in &self.locks {
            Self::check_record_id("Lock", *id, lock.id, self.next_lock_id)?;
            recorded.entry((lock.holder, lock.partition)).or_default()[0] += u128::from(lock.amount);
        }
        for (id, hold) in &self.holds {
            Self::check_record_id("Hold", *id, hold.id, self.next_hold_id)?;
            recorded.entry((hold.holder, hold.partition)).or_default()[1] += u128::from(hold.amount);
        }
        for (id, clearing) in &self.clearings {
            Self::check_record_id("Clearing", *id, clearing.id, self.next_clearing_id)?;
            recorded.entry((clearing.from, clearing.partition)).or_default()[2] +=
                u128::from(clearing.amount);
        }

        for (partition, book) in &self.books {
            for (holder, balance) in &book.balances {
                let sums = recorded.remove(&(*holder, *partition)).unwrap_or_default();
                Self::check_buckets(holder, partition, balance, sums)?;
                if balance.cleared > balance.free {
                    return Err(LedgerError::ClearedExceedsFree {
                        holder: *holder,
                        partition: *partition,
                        cleared: balance.cleared,
                        free: balance.free,
                    });
                }
            }
        }
        for ((holder, partition), sums) in recorded {
            Self::check_buckets(&holder, &partition, &HolderBalance::default(), sums)?;
        }

        self.verify_registry()
    }

    fn check_record_id(kind: &'static str, key: u64, id: u64, next: u64) -> Result<(), LedgerError> {
        if key != id || id == 0 || id > next {
            return Err(LedgerError::RecordIdMismatch { kind, id: key });
        }
        Ok(())
    }

    fn check_buckets(
        holder: &Address,
        partition: &Partition,
        balance: &HolderBalance,
        sums: [u128; 3],
    ) -> Result<(), LedgerError> {
        let buckets = [
            ("locked", balance.locked),
            ("held", balance.held),
            ("cleared", balance.cleared),
        ];
        for ((bucket, actual), recorded) in buckets.into_iter().zip(sums) {
            if recorded != u128::from(actual) {
                return Err(LedgerError::RecordMismatch {
                    holder: *holder,
                    partition: *partition,
                    bucket,
                    recorded,
                    balance: actual,
                });
            }
        }
        Ok(())
    }

    fn verify_registry(&self) -> Result<(), LedgerError> {
        let partitions: BTreeSet<&Partition> = self.books.keys().chain(self.registry.partitions()).collect();
        let mut holders = BTreeSet::new();
        for partition in partitions {
            let expected: Vec<&Address> = self
                .books
                .get(partition)
                .map(|book| {
                    book.balances
                        .iter()
                        .filter(|(_, balance)| !balance.is_empty())
                        .map(|(holder, _)| holder)
                        .collect()
                })
                .unwrap_or_default();
            if let Some(holder) = expected.iter().find(|h| !self.registry.contains(partition, h)) {
                return Err(LedgerError::RegistryOutOfSync(**holder));
            }
            if self.registry.count(partition) != expected.len() {
                let stray = self
                    .registry
                    .holders(partition)
                    .into_iter()
                    .find(|h| !expected.contains(&h));
                return Err(LedgerError::RegistryOutOfSync(stray.unwrap_or(Address::ZERO)));
            }
            holders.extend(expected);
        }
        if let Some(holder) = holders.iter().find(|h| !self.registry.is_holder(h)) {
            return Err(LedgerError::RegistryOutOfSync(*holder));
        }
        if self.registry.total_count() != holders.len() {
            let stray = self
                .registry
                .all_holders()
                .into_iter()
                .find(|h| !holders.contains(h));
            return Err(LedgerError::RegistryOutOfSync(stray.unwrap_or(Address::ZERO)));
        }
        Ok(())
    }

    // =========================================================================
    // Issue / transfer / redeem
    // =========================================================================

    /// Mint `amount` free units to `to`
    pub fn issue(&mut self, to: Address, partition: Partition, amount: Amount) -> Result<(), LedgerError> {
        if amount == 0 {
            return Ok(());
        }
        let supply = self
            .total_supply(&partition)
            .checked_add(amount)
            .ok_or(LedgerError::SupplyOverflow(partition))?;
        if self.total_supply_all() + u128::from(amount) > u128::from(Amount::MAX) {
            return Err(LedgerError::BondSupplyOverflow);
        }
        let mut balance = self.balance_of(&to, &partition);
        balance.free += amount;

        self.books.entry(partition).or_default().total_supply = supply;
        self.put(to, partition, balance);
        Ok(())
    }

    /// Move `amount` available units from `from` to `to`
    pub fn transfer(
        &mut self,
        from: Address,
        to: Address,
        partition: Partition,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let mut sender = self.balance_of(&from, &partition);
        self.ensure_available(&from, &partition, &sender, amount)?;
        if amount == 0 || from == to {
            return Ok(());
        }
        let mut receiver = self.balance_of(&to, &partition);
        sender.free -= amount;
        receiver.free += amount;

        self.put(from, partition, sender);
        self.put(to, partition, receiver);
        Ok(())
    }

    /// Burn `amount` available units held by `from`
    pub fn redeem(&mut self, from: Address, partition: Partition, amount: Amount) -> Result<(), LedgerError> {
        let mut balance = self.balance_of(&from, &partition);
        self.ensure_available(&from, &partition, &balance, amount)?;
        if amount == 0 {
            return Ok(());
        }
        balance.free -= amount;

        if let Some(book) = self.books.get_mut(&partition) {
            book.total_supply -= amount;
        }
        self.put(from, partition, balance);
        Ok(())
    }

    // =========================================================================
    // Locks
    // =========================================================================

    /// Lock `amount` available units until `expiration`
    pub fn lock(
        &mut self,
        holder: Address,
        partition: Partition,
        amount: Amount,
        expiration: Timestamp,
    ) -> Result<LockId, LedgerError> {
        let mut balance = self.balance_of(&holder, &partition);
        Self::ensure_positive(amount)?;
        self.ensure_available(&holder, &partition, &balance, amount)?;
        balance.free -= amount;
        balance.locked += amount;

        self.next_lock_id += 1;
        let id = self.next_lock_id;
        self.locks.insert(
            id,
            Lock {
                id,
                holder,
                partition,
                amount,
                expiration,
            },
        );
        self.put(holder, partition, balance);
        Ok(id)
    }

    /// Return a lock's units to the free bucket once it has expired
    pub fn release_lock(&mut self, id: LockId, now: Timestamp) -> Result<Lock, LedgerError> {
        let lock = self.locks.get(&id).ok_or(LedgerError::LockNotFound(id))?;
        if now < lock.expiration {
            return Err(LedgerError::LockExpirationNotReached {
                id,
                expiration: lock.expiration,
                now,
            });
        }
        let lock = self.locks.remove(&id).ok_or(LedgerError::LockNotFound(id))?;
        let mut balance = self.balance_of(&lock.holder, &lock.partition);
        balance.locked -= lock.amount;
        balance.free += lock.amount;
        self.put(lock.holder, lock.partition, balance);
        Ok(lock)
    }

    // =========================================================================
    // Holds
    // =========================================================================

    /// Escrow `amount` available units under a new hold
    pub fn create_hold(
        &mut self,
        holder: Address,
        partition: Partition,
        amount: Amount,
        escrow: Address,
        to: Option<Address>,
        expiration: Timestamp,
    ) -> Result<HoldId, LedgerError> {
        let mut balance = self.balance_of(&holder, &partition);
        Self::ensure_positive(amount)?;
        self.ensure_available(&holder, &partition, &balance, amount)?;
        balance.free -= amount;
        balance.held += amount;

        self.next_hold_id += 1;
        let id = self.next_hold_id;
        self.holds.insert(
            id,
            Hold {
                id,
                holder,
                partition,
                amount,
                escrow,
                to,
                expiration,
            },
        );
        self.put(holder, partition, balance);
        Ok(id)
    }

    /// Pay `amount` of a hold out to `to` before the hold expires
    ///
    /// The hold is removed once fully consumed. An expired hold can only be
    /// released back to its holder.
    pub fn execute_hold(
        &mut self,
        id: HoldId,
        to: Address,
        amount: Amount,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        let hold = self.checked_hold(id, amount)?;
        if now >= hold.expiration {
            return Err(LedgerError::HoldExpired {
                id,
                expiration: hold.expiration,
                now,
            });
        }
        if let Some(expected) = hold.to {
            if expected != to {
                return Err(LedgerError::HoldDestinationMismatch {
                    id,
                    expected,
                    actual: to,
                });
            }
        }
        let (holder, partition) = (hold.holder, hold.partition);

        let mut sender = self.balance_of(&holder, &partition);
        sender.held -= amount;
        self.put(holder, partition, sender);
        let mut receiver = self.balance_of(&to, &partition);
        receiver.free += amount;
        self.put(to, partition, receiver);

        self.consume_hold(id, amount);
        Ok(())
    }

    /// Return `amount` of a hold to the holder's free bucket
    pub fn release_hold(&mut self, id: HoldId, amount: Amount) -> Result<(), LedgerError> {
        let hold = self.checked_hold(id, amount)?;
        let (holder, partition) = (hold.holder, hold.partition);

        let mut balance = self.balance_of(&holder, &partition);
        balance.held -= amount;
        balance.free += amount;
        self.put(holder, partition, balance);

        self.consume_hold(id, amount);
        Ok(())
    }

    fn checked_hold(&self, id: HoldId, amount: Amount) -> Result<&Hold, LedgerError> {
        Self::ensure_positive(amount)?;
        let hold = self.holds.get(&id).ok_or(LedgerError::HoldNotFound(id))?;
        if amount > hold.amount {
            return Err(LedgerError::HoldAmountExceeded {
                id,
                requested: amount,
                remaining: hold.amount,
            });
        }
        Ok(hold)
    }

    fn consume_hold(&mut self, id: HoldId, amount: Amount) {
        if let Some(hold) = self.holds.get_mut(&id) {
            hold.amount -= amount;
            if hold.amount == 0 {
                self.holds.remove(&id);
            }
        }
    }

    // =========================================================================
    // Freeze
    // =========================================================================

    /// Move `amount` available units into the frozen bucket
    pub fn freeze(&mut self, holder: Address, partition: Partition, amount: Amount) -> Result<(), LedgerError> {
        let mut balance = self.balance_of(&holder, &partition);
        Self::ensure_positive(amount)?;
        self.ensure_available(&holder, &partition, &balance, amount)?;
        balance.free -= amount;
        balance.frozen += amount;
        self.put(holder, partition, balance);
        Ok(())
    }

    /// Move `amount` frozen units back into the free bucket
    pub fn unfreeze(&mut self, holder: Address, partition: Partition, amount: Amount) -> Result<(), LedgerError> {
        let mut balance = self.balance_of(&holder, &partition);
        Self::ensure_positive(amount)?;
        if balance.frozen < amount {
            return Err(LedgerError::InsufficientFrozenBalance {
                holder,
                partition,
                required: amount,
                frozen: balance.frozen,
            });
        }
        balance.frozen -= amount;
        balance.free += amount;
        self.put(holder, partition, balance);
        Ok(())
    }

    // =========================================================================
    // Clearing
    // =========================================================================

    /// Reserve `amount` of `from`'s free units for a pending clearing transfer
    pub fn create_clearing(
        &mut self,
        from: Address,
        to: Address,
        partition: Partition,
        amount: Amount,
        expiration: Timestamp,
    ) -> Result<ClearingId, LedgerError> {
        let mut balance = self.balance_of(&from, &partition);
        Self::ensure_positive(amount)?;
        self.ensure_available(&from, &partition, &balance, amount)?;
        balance.cleared += amount;

        self.next_clearing_id += 1;
        let id = self.next_clearing_id;
        self.clearings.insert(
            id,
            Clearing {
                id,
                from,
                to,
                partition,
                amount,
                expiration,
            },
        );
        self.put(from, partition, balance);
        Ok(id)
    }

    /// Settle a clearing before it expires: the reservation leaves `from`
    /// and lands free at `to`
    ///
    /// An expired clearing can only be cancelled.
    pub fn approve_clearing(&mut self, id: ClearingId, now: Timestamp) -> Result<Clearing, LedgerError> {
        let expiration = self
            .clearings
            .get(&id)
            .ok_or(LedgerError::ClearingNotFound(id))?
            .expiration;
        if now >= expiration {
            return Err(LedgerError::ClearingExpired { id, expiration, now });
        }
        let clearing = self
            .clearings
            .remove(&id)
            .ok_or(LedgerError::ClearingNotFound(id))?;

        let mut sender = self.balance_of(&clearing.from, &clearing.partition);
        sender.cleared -= clearing.amount;
        sender.free -= clearing.amount;
        self.put(clearing.from, clearing.partition, sender);
        let mut receiver = self.balance_of(&clearing.to, &clearing.partition);
        receiver.free += clearing.amount;
        self.put(clearing.to, clearing.partition, receiver);
        Ok(clearing)
    }

    /// Drop a clearing and give the reserved units back to `from`
    pub fn cancel_clearing(&mut self, id: ClearingId) -> Result<Clearing, LedgerError> {
        let clearing = self
            .clearings
            .remove(&id)
            .ok_or(LedgerError::ClearingNotFound(id))?;

        let mut balance = self.balance_of(&clearing.from, &clearing.partition);
        balance.cleared -= clearing.amount;
        self.put(clearing.from, clearing.partition, balance);
        Ok(clearing)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn ensure_positive(amount: Amount) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        Ok(())
    }

    fn ensure_available(
        &self,
        holder: &Address,
        partition: &Partition,
        balance: &HolderBalance,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let available = balance.available();
        if amount > available {
            return Err(LedgerError::InsufficientBalance {
                holder: *holder,
                partition: *partition,
                required: amount,
                available,
            });
        }
        Ok(())
    }

    /// Write a holder's buckets and reconcile the registry
    fn put(&mut self, holder: Address, partition: Partition, balance: HolderBalance) {
        let book = self.books.entry(partition).or_default();
        if balance == HolderBalance::default() {
            book.balances.remove(&holder);
        } else {
            book.balances.insert(holder, balance);
        }
        let overall = self.total_balance_across(&holder);
        self.registry.sync(holder, partition, balance.total(), overall);
    }
}
