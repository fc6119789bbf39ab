//! Append-only record of user accept/reject decisions for proposed actions.
//!
//! Two lifetimes live here: the per-turn log, drained into the next
//! outbound message as a "prior actions" block, and the per-session
//! `last_decision_by_tool` map, which survives drains and feeds cross-turn
//! gating.

use crate::tools::action_tool_name;
use anyhow::{bail, Result};
use std::collections::HashMap;
use std::time::Instant;

/// Upper bound on undrained entries. A turn that somehow produces more
/// decisions than this is malfunctioning; recording then fails and the
/// caller logs and proceeds without auditing.
const MAX_TURN_ENTRIES: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accepted,
    Rejected,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Accepted => "accepted",
            Decision::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DecisionEntry {
    pub preview_id: u64,
    pub tool_name: String,
    pub decision: Decision,
    pub recorded_at: Instant,
}

#[derive(Debug, Default)]
pub struct DecisionLedger {
    turn_entries: Vec<DecisionEntry>,
    last_by_tool: HashMap<String, Decision>,
}

impl DecisionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert the decision for one preview. Re-recording the same
    /// `preview_id` overwrites in place, so repeated calls are idempotent.
    pub fn record(&mut self, action_type: &str, decision: Decision, preview_id: u64) -> Result<()> {
        let tool_name = action_tool_name(action_type).to_string();

        if let Some(entry) = self
            .turn_entries
            .iter_mut()
            .find(|entry| entry.preview_id == preview_id)
        {
            entry.tool_name = tool_name.clone();
            entry.decision = decision;
            entry.recorded_at = Instant::now();
        } else {
            if self.turn_entries.len() >= MAX_TURN_ENTRIES {
                bail!("decision ledger full ({MAX_TURN_ENTRIES} undrained entries)");
            }
            self.turn_entries.push(DecisionEntry {
                preview_id,
                tool_name: tool_name.clone(),
                decision,
                recorded_at: Instant::now(),
            });
        }

        self.last_by_tool.insert(tool_name, decision);
        Ok(())
    }

    /// Latest decision ever recorded for a tool, across drains. Lives for
    /// the whole session.
    pub fn last_decision(&self, tool_name: &str) -> Option<Decision> {
        self.last_by_tool.get(tool_name).copied()
    }

    pub fn turn_entries(&self) -> &[DecisionEntry] {
        &self.turn_entries
    }

    /// Format everything recorded since the last drain as a human-readable
    /// block for the next outbound message, then clear the per-turn log.
    /// Returns `None` when nothing was recorded. `last_decision_by_tool`
    /// is deliberately left untouched.
    pub fn drain_for_next_message(&mut self) -> Option<String> {
        if self.turn_entries.is_empty() {
            return None;
        }
        let mut block = String::from("[Prior actions]");
        for entry in &self.turn_entries {
            block.push_str(&format!(
                "\n- {}: {}",
                entry.tool_name,
                entry.decision.as_str()
            ));
        }
        self.turn_entries.clear();
        Some(block)
    }
}
