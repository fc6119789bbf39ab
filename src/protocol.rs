//! Wire messages exchanged with the host document process.
//!
//! Both directions are fire-and-forget JSON messages discriminated by a
//! `type` field. Inbound payloads come from a host we do not control, so
//! decoding is total: anything unknown or malformed becomes
//! [`HostInbound::Unknown`], which the session logs and ignores.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Coordinator -> host.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostOutbound {
    UserMessage {
        message: String,
        mode: String,
        selected_model_id: String,
        enabled_tools: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        contexts: Option<Value>,
    },
    ApplyPreviewedAction {
        action_type: String,
        parameters: Value,
        preview_id: u64,
    },
    RejectPreviewedAction {
        action_type: String,
        preview_id: u64,
    },
    StopGeneration {
        message_id: String,
    },
}

/// Host -> coordinator.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostInbound {
    ToolPreview {
        #[serde(default)]
        success: bool,
        #[serde(default)]
        preview_mode: bool,
        action_type: String,
        #[serde(default)]
        parameters: Value,
        #[serde(default)]
        message: String,
    },
    ActionApplied {
        success: bool,
        #[serde(default)]
        message: String,
        #[serde(default)]
        preview_id: Option<u64>,
    },
    ToolProgress {
        message: String,
        #[serde(default)]
        timestamp: Option<f64>,
    },
    AppendContent {
        content: String,
    },
    StartGenerating,
    FinishGenerating,
    #[serde(other)]
    Unknown,
}

/// Decode one raw inbound frame. Never fails: undecodable input is reported
/// as `Unknown` so the dispatch loop stays total.
pub fn decode_inbound(raw: &str) -> HostInbound {
    match serde_json::from_str::<HostInbound>(raw) {
        Ok(message) => message,
        Err(error) => {
            debug!(%error, raw, "undecodable host message, ignoring");
            HostInbound::Unknown
        }
    }
}

/// What a `tool_progress` message means for the card cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressSignal {
    /// A tool began running; carries the tool name.
    Started(String),
    /// A tool finished; carries the tool name.
    Finished(String),
    /// Free-form progress detail for the currently running card.
    Detail,
}

/// Classify a `tool_progress` message by its start/finish marker. The host
/// emits `<tool_name> started` / `<tool_name> finished` in English and
/// `<tool_name>开始` / `<tool_name>完成` in Chinese; anything else is a
/// detail line.
pub fn classify_progress(message: &str) -> ProgressSignal {
    let trimmed = message.trim();
    for marker in [" started", "开始"] {
        if let Some(name) = trimmed.strip_suffix(marker) {
            let name = name.trim();
            if !name.is_empty() {
                return ProgressSignal::Started(name.to_string());
            }
        }
    }
    for marker in [" finished", "完成"] {
        if let Some(name) = trimmed.strip_suffix(marker) {
            let name = name.trim();
            if !name.is_empty() {
                return ProgressSignal::Finished(name.to_string());
            }
        }
    }
    ProgressSignal::Detail
}

/// One-way send primitive toward the host. Sends never block and never
/// propagate failure; a closed channel means the host is gone and the
/// session is about to be torn down anyway.
#[derive(Clone)]
pub struct HostChannel {
    tx: mpsc::UnboundedSender<HostOutbound>,
}

impl HostChannel {
    pub fn new(tx: mpsc::UnboundedSender<HostOutbound>) -> Self {
        Self { tx }
    }

    pub fn send(&self, message: HostOutbound) {
        if self.tx.send(message).is_err() {
            warn!("host channel closed, outbound message dropped");
        }
    }
}
