//! Path-level packet-state reconciliation and the run loop driving it.

pub mod event;
pub mod path;

pub use event::{EventProcessor, EventProcessorBuilder};
pub use path::PathProcessor;

use crate::error::Error;
use crate::types::{ChainId, PacketInfo};

/// Handler action names as they appear in the `message` event's `action`
/// attribute.
pub const MSG_TRANSFER: &str = "transfer";
pub const MSG_RECV_PACKET: &str = "recv_packet";
pub const MSG_ACKNOWLEDGEMENT: &str = "acknowledge_packet";
pub const MSG_TIMEOUT: &str = "timeout_packet";
pub const MSG_TIMEOUT_ON_CLOSE: &str = "timeout_on_close_packet";
pub const MSG_UPDATE_CLIENT: &str = "update_client";

/// The packet lifecycle transitions tracked per channel pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PacketAction {
    Transfer,
    RecvPacket,
    Acknowledgement,
    Timeout,
}

impl PacketAction {
    /// Map an observed handler action to the queue it belongs to. Unknown
    /// actions are not packet lifecycle transitions.
    pub fn from_action(action: &str) -> Option<Self> {
        match action {
            MSG_TRANSFER => Some(Self::Transfer),
            MSG_RECV_PACKET => Some(Self::RecvPacket),
            MSG_ACKNOWLEDGEMENT => Some(Self::Acknowledgement),
            MSG_TIMEOUT | MSG_TIMEOUT_ON_CLOSE => Some(Self::Timeout),
            _ => None,
        }
    }
}

/// One outgoing message to submit to a destination chain, ready for
/// transaction construction by a collaborator that knows how to build the
/// chain-specific message for each kind.
#[derive(Clone, Debug)]
pub struct RelayAction {
    pub dst_chain_id: ChainId,
    pub kind: PacketAction,
    pub packet: PacketInfo,
}

/// Collaborator that turns relay actions into signed, submitted
/// transactions.
pub trait RelaySubmitter: Send + Sync {
    fn submit(&self, actions: Vec<RelayAction>) -> Result<(), Error>;
}

/// Discards every batch. Used in tests where the simulated counterparty
/// chains deliver the follow-up events on their own.
pub struct NullSubmitter;

impl RelaySubmitter for NullSubmitter {
    fn submit(&self, _actions: Vec<RelayAction>) -> Result<(), Error> {
        Ok(())
    }
}
