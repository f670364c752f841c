//! Scenario replay
//!
//! ```json
//! {
//!   "config": { "currency": "EUR", "nominal_value": 100, ... },
//!   "start_time": 1700000000,
//!   "steps": [
//!     { "step": "command", "command": { "command": "issue", "to": "0x…01", "amount": 1000 } },
//!     { "step": "advance", "seconds": 500 },
//!     { "step": "query", "query": { "query": "coupon_for", "coupon_id": 1, "holder": "0x…01" } }
//!   ]
//! }
//! ```

use anyhow::{bail, Context, Result};
use bond_coupon_engine::{Bond, BondCommand, BondConfig, BondQuery, Clock, ManualClock};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct Scenario {
    config: BondConfig,
    start_time: u64,
    #[serde(default)]
    steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
enum Step {
    Advance { seconds: u64 },
    AdvanceTo { timestamp: u64 },
    Command { command: BondCommand },
    Query { query: BondQuery },
}

pub fn run(path: PathBuf, fail_fast: bool, checkpoint_out: Option<PathBuf>) -> Result<()> {
    let text = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read scenario {}", path.display()))?;
    let scenario: Scenario = serde_json::from_str(&text).context("Invalid scenario JSON")?;

    let clock = ManualClock::new(scenario.start_time);
    let mut bond = Bond::new(scenario.config, Arc::new(clock.clone()))?;
    info!(steps = scenario.steps.len(), "Replaying scenario");

    let mut rejected = 0usize;
    for (index, step) in scenario.steps.into_iter().enumerate() {
        let result = apply_step(&mut bond, &clock, step);
        let line = match result {
            Ok(value) => json!({ "step": index, "now": clock.now(), "ok": value }),
            Err(err) => {
                rejected += 1;
                warn!(step = index, error = %err, "Step rejected");
                if fail_fast {
                    bail!("step {} rejected: {}", index, err);
                }
                json!({ "step": index, "now": clock.now(), "error": err.to_string() })
            }
        };
        println!("{}", line);
    }

    if let Some(out) = checkpoint_out {
        fs::write(&out, bond.save_checkpoint()?)
            .with_context(|| format!("Failed to write checkpoint {}", out.display()))?;
        info!(path = %out.display(), "Checkpoint written");
    }
    info!(rejected, "Scenario finished");
    Ok(())
}

fn apply_step(bond: &mut Bond, clock: &ManualClock, step: Step) -> Result<Value> {
    Ok(match step {
        Step::Advance { seconds } => {
            clock.advance(seconds);
            Value::Null
        }
        Step::AdvanceTo { timestamp } => {
            if timestamp < clock.now() {
                bail!("cannot move clock back from {} to {}", clock.now(), timestamp);
            }
            clock.set(timestamp);
            Value::Null
        }
        Step::Command { command } => serde_json::to_value(bond.execute(command)?)?,
        Step::Query { query } => serde_json::to_value(bond.query(query)?)?,
    })
}
