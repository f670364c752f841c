//! Checkpoint - Save/Load Bond State
//!
//! Serializes the complete bond state (terms, ledger, corporate actions,
//! snapshots, event log) to JSON so a host can persist and resume it.
//!
//! # Critical Invariants
//!
//! - **Config Matching**: state can only be loaded under the config it was saved with
//! - **Conservation**: per partition, holder totals sum to total supply
//! - **Record Consistency**: encumbrance records explain every locked, held
//!   and cleared bucket, and the holder registry mirrors the balances
//! - **Snapshot Linkage**: every action's snapshot id resolves to a snapshot
//!   taken for that same action, and every snapshot is claimed by its action
//!
//! Guards are host wiring, not state; a loaded bond starts with an empty chain.
//! Pending record-date triggers are rebuilt from the action store.

use crate::bond::config::BondConfig;
use crate::bond::engine::{Bond, BondError};
use crate::core::time::Clock;
use crate::models::bond_details::BondDetails;
use crate::models::corporate_action::CorporateActionStore;
use crate::models::event::EventLog;
use crate::models::ledger::PartitionedBalanceLedger;
use crate::models::types::Timestamp;
use crate::snapshot::SnapshotEngine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

// ============================================================================
// Checkpoint Structure
// ============================================================================

/// Complete bond state at a point in time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BondCheckpoint {
    /// SHA256 of the canonical config JSON
    pub config_hash: String,
    pub bond_id: Uuid,
    pub saved_at: Timestamp,
    pub details: BondDetails,
    pub ledger: PartitionedBalanceLedger,
    pub actions: CorporateActionStore,
    pub snapshots: SnapshotEngine,
    pub events: EventLog,
}

// ============================================================================
// Config Hashing
// ============================================================================

/// Compute deterministic SHA256 hash of config
///
/// Object keys are sorted recursively before hashing, so the hash does not
/// depend on field order.
pub fn compute_config_hash<T: Serialize>(config: &T) -> Result<String, BondError> {
    use serde_json::Value;
    use std::collections::BTreeMap;

    let value = serde_json::to_value(config).map_err(|e| {
        BondError::SerializationError(format!("Config serialization failed: {}", e))
    })?;

    fn canonicalize(value: Value) -> Value {
        match value {
            Value::Object(map) => {
                let sorted: BTreeMap<String, Value> =
                    map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
                Value::Object(sorted.into_iter().collect())
            }
            Value::Array(arr) => Value::Array(arr.into_iter().map(canonicalize).collect()),
            other => other,
        }
    }

    let json = serde_json::to_string(&canonicalize(value)).map_err(|e| {
        BondError::SerializationError(format!("Config serialization failed: {}", e))
    })?;

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

// ============================================================================
// Validation
// ============================================================================

/// Validate checkpoint integrity
///
/// Checks:
/// - Balance conservation in every partition
/// - Lock, hold and clearing records match the encumbered buckets
/// - The holder registry matches the balances
/// - Action → snapshot links point at snapshots of the same action
/// - No snapshot is orphaned (its action does not claim it)
pub fn validate_checkpoint(checkpoint: &BondCheckpoint) -> Result<(), BondError> {
    checkpoint
        .ledger
        .verify_conservation()
        .map_err(|e| BondError::StateValidationError(e.to_string()))?;
    checkpoint
        .ledger
        .verify_records()
        .map_err(|e| BondError::StateValidationError(e.to_string()))?;

    for action in checkpoint.actions.iter().filter(|a| a.has_snapshot()) {
        match checkpoint.snapshots.get(action.snapshot_id) {
            Some(snapshot) if snapshot.action_id == action.id => {}
            Some(snapshot) => {
                return Err(BondError::StateValidationError(format!(
                    "Action {} points at snapshot {} taken for action {}",
                    action.id, action.snapshot_id, snapshot.action_id
                )));
            }
            None => {
                return Err(BondError::StateValidationError(format!(
                    "Action {} points at missing snapshot {}",
                    action.id, action.snapshot_id
                )));
            }
        }
    }

    for id in 1..=checkpoint.snapshots.count() as u64 {
        let Some(snapshot) = checkpoint.snapshots.get(id) else {
            continue;
        };
        let claimed = checkpoint
            .actions
            .get(snapshot.action_id)
            .is_ok_and(|action| action.snapshot_id == id);
        if !claimed {
            return Err(BondError::StateValidationError(format!(
                "Orphaned snapshot {} for action {}",
                id, snapshot.action_id
            )));
        }
    }

    Ok(())
}

// ============================================================================
// Save / Load
// ============================================================================

impl Bond {
    /// Capture the full bond state
    pub fn checkpoint(&self) -> Result<BondCheckpoint, BondError> {
        Ok(BondCheckpoint {
            config_hash: compute_config_hash(self.config())?,
            bond_id: self.config().bond_id,
            saved_at: self.now(),
            details: self.get_bond_details().clone(),
            ledger: self.ledger().clone(),
            actions: self.actions().clone(),
            snapshots: self.snapshot_engine().clone(),
            events: self.events().clone(),
        })
    }

    /// Serialize the full bond state to JSON
    pub fn save_checkpoint(&self) -> Result<String, BondError> {
        let checkpoint = self.checkpoint()?;
        let json = serde_json::to_string(&checkpoint).map_err(|e| {
            BondError::SerializationError(format!("Checkpoint serialization failed: {}", e))
        })?;
        info!(bond_id = %checkpoint.bond_id, saved_at = checkpoint.saved_at, "Checkpoint saved");
        Ok(json)
    }

    /// Restore a bond from JSON produced by [`Bond::save_checkpoint`]
    ///
    /// # Errors
    /// - `InvalidConfig` if `config` is invalid or differs from the saved one
    /// - `SerializationError` if the JSON is malformed
    /// - `StateValidationError` if the restored state breaks an invariant
    pub fn load_checkpoint(config: BondConfig, json: &str, clock: Arc<dyn Clock>) -> Result<Bond, BondError> {
        config.validate()?;
        let checkpoint: BondCheckpoint = serde_json::from_str(json).map_err(|e| {
            BondError::SerializationError(format!("Checkpoint deserialization failed: {}", e))
        })?;

        let expected = compute_config_hash(&config)?;
        if checkpoint.config_hash != expected {
            return Err(BondError::InvalidConfig(format!(
                "Config hash mismatch: checkpoint {}, config {}",
                checkpoint.config_hash, expected
            )));
        }
        validate_checkpoint(&checkpoint)?;

        info!(bond_id = %checkpoint.bond_id, saved_at = checkpoint.saved_at, "Checkpoint loaded");
        Ok(Bond::from_parts(
            config,
            checkpoint.details,
            checkpoint.ledger,
            checkpoint.actions,
            checkpoint.snapshots,
            checkpoint.events,
            clock,
        ))
    }
}
