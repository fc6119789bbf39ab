//! Coordination layer for a document-embedded assistant panel.
//!
//! The panel streams model output, surfaces tool-call status cards inline,
//! and gates every document mutation behind a user-approved preview. This
//! crate owns that lifecycle: intent-based tool whitelisting per message,
//! the preview state machine, the decision ledger fed back to the model,
//! and the streaming coordinator that suspends rendering while a preview
//! awaits its verdict. The host document application sits on the other
//! side of [`protocol::HostOutbound`] / [`protocol::HostInbound`]; the
//! visual layer plugs in through [`render::RenderSink`].

pub mod config;
pub mod intent;
pub mod ledger;
pub mod preview;
pub mod protocol;
pub mod render;
pub mod session;
pub mod stream;
pub mod tools;
pub mod util;

pub use config::PanelConfig;
pub use intent::Intent;
pub use ledger::{Decision, DecisionLedger};
pub use preview::{Preview, PreviewManager, PreviewStatus};
pub use protocol::{HostChannel, HostInbound, HostOutbound};
pub use render::{RecordingSink, RenderSink, SinkEvent};
pub use session::PanelSession;
pub use stream::{CardStatus, StreamCoordinator, ToolCallCard};
