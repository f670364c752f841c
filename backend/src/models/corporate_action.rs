//! Corporate actions and their append-only store
//!
//! Actions are identified by a 1-based sequential id; id 0 is reserved and
//! never valid. Besides the global sequence the store keeps a per-kind index
//! so a coupon can be addressed by its coupon number (1st coupon, 2nd
//! coupon, ...) independently of other action kinds.
//!
//! The only field mutated after creation is `snapshot_id`, written once when
//! the record-date snapshot is captured.

use crate::models::types::{Amount, Timestamp};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type ActionId = u64;
pub type SnapshotId = u64;

/// Errors raised when addressing a corporate action
#[derive(Debug, Error, PartialEq)]
pub enum ActionError {
    #[error("Wrong index for action: {id}")]
    WrongIndexForAction { id: u64 },
}

/// Whether a coupon's rate is final
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RateStatus {
    /// Rate still to be fixed on the fixing date
    Pending,
    #[default]
    Set,
}

/// Scheduled interest payment
///
/// `rate` is scaled by `10^rate_decimals` (rate 50 with 1 decimal is 5.0).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    pub record_date: Timestamp,
    pub execution_date: Timestamp,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    pub fixing_date: Timestamp,
    pub rate: u64,
    pub rate_decimals: u8,
    #[serde(default)]
    pub rate_status: RateStatus,
}

impl Coupon {
    /// Accrual period in seconds (`end_date - start_date`)
    ///
    /// Saturates to 0 for an inverted period, which date validation rejects
    /// before a coupon is ever stored.
    pub fn period(&self) -> u64 {
        self.end_date.saturating_sub(self.start_date)
    }
}

/// Per-unit cash distribution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dividend {
    pub record_date: Timestamp,
    pub execution_date: Timestamp,
    pub amount: Amount,
    pub amount_decimals: u8,
}

/// Payload of a corporate action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ActionKind {
    Coupon(Coupon),
    Dividend(Dividend),
}

/// Discriminant of [`ActionKind`], used for per-kind indexing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionType {
    Coupon,
    Dividend,
}

impl ActionKind {
    pub fn action_type(&self) -> ActionType {
        match self {
            ActionKind::Coupon(_) => ActionType::Coupon,
            ActionKind::Dividend(_) => ActionType::Dividend,
        }
    }

    /// Date at which entitlement balances are fixed
    pub fn record_date(&self) -> Timestamp {
        match self {
            ActionKind::Coupon(coupon) => coupon.record_date,
            ActionKind::Dividend(dividend) => dividend.record_date,
        }
    }
}

/// Stored corporate action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorporateAction {
    pub id: ActionId,
    pub kind: ActionKind,
    /// 0 until the record-date snapshot is captured
    pub snapshot_id: SnapshotId,
}

impl CorporateAction {
    pub fn as_coupon(&self) -> Option<&Coupon> {
        match &self.kind {
            ActionKind::Coupon(coupon) => Some(coupon),
            _ => None,
        }
    }

    pub fn has_snapshot(&self) -> bool {
        self.snapshot_id != 0
    }
}

/// Append-only, 1-indexed action sequence
///
/// # Example
/// ```
/// use bond_coupon_engine::{ActionKind, ActionType, CorporateActionStore, Dividend};
///
/// let mut store = CorporateActionStore::new();
/// let id = store.append(ActionKind::Dividend(Dividend {
///     record_date: 10,
///     execution_date: 20,
///     amount: 5,
///     amount_decimals: 0,
/// }));
/// assert_eq!(id, 1);
/// assert_eq!(store.count_of(ActionType::Dividend), 1);
/// assert!(store.get(0).is_err());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorporateActionStore {
    actions: Vec<CorporateAction>,
    coupon_ids: Vec<ActionId>,
    dividend_ids: Vec<ActionId>,
}

impl CorporateActionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an action and return its id (ids start at 1)
    pub fn append(&mut self, kind: ActionKind) -> ActionId {
        let id = self.actions.len() as ActionId + 1;
        match kind.action_type() {
            ActionType::Coupon => self.coupon_ids.push(id),
            ActionType::Dividend => self.dividend_ids.push(id),
        }
        self.actions.push(CorporateAction {
            id,
            kind,
            snapshot_id: 0,
        });
        id
    }

    /// Look up an action by id
    ///
    /// # Errors
    /// `WrongIndexForAction` for id 0 or any id past the end
    pub fn get(&self, id: ActionId) -> Result<&CorporateAction, ActionError> {
        id.checked_sub(1)
            .and_then(|index| usize::try_from(index).ok())
            .and_then(|index| self.actions.get(index))
            .ok_or(ActionError::WrongIndexForAction { id })
    }

    pub fn count(&self) -> usize {
        self.actions.len()
    }

    pub fn count_of(&self, action_type: ActionType) -> usize {
        self.ids_of(action_type).len()
    }

    /// Resolve the `index`-th (1-based) action of `action_type` to its action id
    pub fn id_by_kind_index(&self, action_type: ActionType, index: u64) -> Result<ActionId, ActionError> {
        index
            .checked_sub(1)
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| self.ids_of(action_type).get(i))
            .copied()
            .ok_or(ActionError::WrongIndexForAction { id: index })
    }

    /// Record the snapshot for `id`; later writes are ignored
    ///
    /// Returns `true` if this call wrote the id.
    pub fn set_snapshot(&mut self, id: ActionId, snapshot_id: SnapshotId) -> Result<bool, ActionError> {
        let index = self.get(id)?.id as usize - 1;
        let action = &mut self.actions[index];
        if action.has_snapshot() {
            return Ok(false);
        }
        action.snapshot_id = snapshot_id;
        Ok(true)
    }

    /// All actions in id order
    pub fn iter(&self) -> impl Iterator<Item = &CorporateAction> {
        self.actions.iter()
    }

    fn ids_of(&self, action_type: ActionType) -> &[ActionId] {
        match action_type {
            ActionType::Coupon => &self.coupon_ids,
            ActionType::Dividend => &self.dividend_ids,
        }
    }
}
