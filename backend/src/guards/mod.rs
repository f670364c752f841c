//! Command guards
//!
//! Pause, control-list, KYC, clearing-mode and recovery checks are not part
//! of the accrual engine. They are composable predicates that the bond's
//! command dispatcher runs, in registration order, before a command reaches
//! the core. The first failing guard rejects the command and its error is
//! surfaced unchanged.
//!
//! The in-memory implementations here hold their state behind `Arc`, so a
//! host keeps one clone to flip switches while the bond owns another.

use crate::models::types::{Address, Partition};
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Rejections produced by guards
#[derive(Debug, Error, PartialEq, Clone)]
pub enum GuardError {
    #[error("Account {account} has no role for {operation}")]
    AccountHasNoRole { account: Address, operation: Operation },

    #[error("Account {0} is blocked")]
    AccountIsBlocked(Address),

    #[error("Invalid KYC status for {0}")]
    InvalidKycStatus(Address),

    #[error("Token is paused")]
    TokenIsPaused,

    #[error("Clearing is activated")]
    ClearingIsActivated,

    #[error("Wallet {0} has been recovered")]
    WalletRecovered(Address),
}

/// Command kinds as seen by guards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    SetCoupon,
    UpdateMaturityDate,
    Issue,
    Transfer,
    Redeem,
    RedeemAtMaturity,
    Lock,
    ReleaseLock,
    CreateHold,
    ExecuteHold,
    ReleaseHold,
    Freeze,
    Unfreeze,
    CreateClearing,
    ApproveClearing,
    CancelClearing,
}

impl Operation {
    /// Operations that move units directly and are barred while clearing is active
    pub fn bypasses_clearing(&self) -> bool {
        matches!(
            self,
            Operation::Transfer | Operation::Redeem | Operation::RedeemAtMaturity | Operation::CreateHold
        )
    }

    /// Operations that only touch bond terms, not holder balances
    pub fn is_administrative(&self) -> bool {
        matches!(self, Operation::SetCoupon | Operation::UpdateMaturityDate)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What a guard gets to see about a command
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub operation: Operation,
    /// Holders whose balances the command touches
    pub accounts: Vec<Address>,
    pub partition: Option<Partition>,
    /// Account issuing the command, when the host knows it
    pub operator: Option<Address>,
}

impl CommandContext {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            accounts: Vec::new(),
            partition: None,
            operator: None,
        }
    }

    pub fn with_accounts(mut self, accounts: impl IntoIterator<Item = Address>) -> Self {
        self.accounts.extend(accounts);
        self
    }

    pub fn with_partition(mut self, partition: Partition) -> Self {
        self.partition = Some(partition);
        self
    }

    pub fn with_operator(mut self, operator: Address) -> Self {
        self.operator = Some(operator);
        self
    }
}

/// A predicate run before a command reaches the core
pub trait CommandGuard: Send + Sync {
    fn check(&self, ctx: &CommandContext) -> Result<(), GuardError>;
}

/// Ordered chain of guards
#[derive(Default, Clone)]
pub struct GuardChain {
    guards: Vec<Arc<dyn CommandGuard>>,
}

impl GuardChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, guard: impl CommandGuard + 'static) {
        self.guards.push(Arc::new(guard));
    }

    pub fn len(&self) -> usize {
        self.guards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    /// Run every guard; the first rejection wins
    pub fn check(&self, ctx: &CommandContext) -> Result<(), GuardError> {
        self.guards.iter().try_for_each(|guard| guard.check(ctx))
    }
}

impl fmt::Debug for GuardChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardChain")
            .field("guards", &self.guards.len())
            .finish()
    }
}

// ============================================================================
// In-memory guards
// ============================================================================

/// Global pause switch
#[derive(Debug, Clone, Default)]
pub struct PauseSwitch {
    paused: Arc<AtomicBool>,
}

impl PauseSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn unpause(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

impl CommandGuard for PauseSwitch {
    fn check(&self, _ctx: &CommandContext) -> Result<(), GuardError> {
        if self.is_paused() {
            return Err(GuardError::TokenIsPaused);
        }
        Ok(())
    }
}

/// Shared address set used by the list-based guards
#[derive(Debug, Clone, Default)]
struct AddressSet(Arc<RwLock<HashSet<Address>>>);

impl AddressSet {
    fn insert(&self, address: Address) {
        if let Ok(mut set) = self.0.write() {
            set.insert(address);
        }
    }

    fn remove(&self, address: &Address) {
        if let Ok(mut set) = self.0.write() {
            set.remove(address);
        }
    }

    fn contains(&self, address: &Address) -> bool {
        self.0.read().map(|set| set.contains(address)).unwrap_or(false)
    }
}

/// Block list: any touched or operating account on the list is rejected
#[derive(Debug, Clone, Default)]
pub struct ControlList {
    blocked: AddressSet,
}

impl ControlList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block(&self, account: Address) {
        self.blocked.insert(account);
    }

    pub fn unblock(&self, account: &Address) {
        self.blocked.remove(account);
    }
}

impl CommandGuard for ControlList {
    fn check(&self, ctx: &CommandContext) -> Result<(), GuardError> {
        match ctx
            .accounts
            .iter()
            .chain(ctx.operator.iter())
            .find(|account| self.blocked.contains(account))
        {
            Some(account) => Err(GuardError::AccountIsBlocked(*account)),
            None => Ok(()),
        }
    }
}

/// KYC registry: every account touched by a balance command must be granted
#[derive(Debug, Clone, Default)]
pub struct KycRegistry {
    granted: AddressSet,
}

impl KycRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&self, account: Address) {
        self.granted.insert(account);
    }

    pub fn revoke(&self, account: &Address) {
        self.granted.remove(account);
    }
}

impl CommandGuard for KycRegistry {
    fn check(&self, ctx: &CommandContext) -> Result<(), GuardError> {
        if ctx.operation.is_administrative() {
            return Ok(());
        }
        match ctx.accounts.iter().find(|account| !self.granted.contains(account)) {
            Some(account) => Err(GuardError::InvalidKycStatus(*account)),
            None => Ok(()),
        }
    }
}

/// Clearing mode: while active, units may only move through clearing
#[derive(Debug, Clone, Default)]
pub struct ClearingMode {
    active: Arc<AtomicBool>,
}

impl ClearingMode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn activate(&self) {
        self.active.store(true, Ordering::SeqCst);
    }

    pub fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

impl CommandGuard for ClearingMode {
    fn check(&self, ctx: &CommandContext) -> Result<(), GuardError> {
        if self.active.load(Ordering::SeqCst) && ctx.operation.bypasses_clearing() {
            return Err(GuardError::ClearingIsActivated);
        }
        Ok(())
    }
}

/// Wallets whose keys were recovered to a new address
#[derive(Debug, Clone, Default)]
pub struct RecoveredWallets {
    recovered: AddressSet,
}

impl RecoveredWallets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_recovered(&self, account: Address) {
        self.recovered.insert(account);
    }
}

impl CommandGuard for RecoveredWallets {
    fn check(&self, ctx: &CommandContext) -> Result<(), GuardError> {
        match ctx.accounts.iter().find(|account| self.recovered.contains(account)) {
            Some(account) => Err(GuardError::WalletRecovered(*account)),
            None => Ok(()),
        }
    }
}
