//! Domain types shared by the event parser and the path processors.
//!
//! Identifiers are plain strings as they appear in event attributes; no
//! chain-specific validation happens here. The message info variants mirror
//! the facts a chain emits, one record per handled message.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Chain identifier, e.g. `ibc-0`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChainId(String);

impl ChainId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ChainId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Revision/height pair, rendered as `R-H` in event attributes.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Height {
    pub revision_number: u64,
    pub revision_height: u64,
}

impl Height {
    pub const ZERO: Height = Height {
        revision_number: 0,
        revision_height: 0,
    };

    pub fn new(revision_number: u64, revision_height: u64) -> Self {
        Self {
            revision_number,
            revision_height,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.revision_number == 0 && self.revision_height == 0
    }
}

impl fmt::Display for Height {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.revision_number, self.revision_height)
    }
}

/// One side of a relay path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathEnd {
    pub chain_id: ChainId,
    pub client_id: String,
}

/// Identifies one directed channel-pair relationship. The primary key for
/// queue partitioning in the path processor.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChannelKey {
    pub channel_id: String,
    pub port_id: String,
    pub counterparty_channel_id: String,
    pub counterparty_port_id: String,
}

impl ChannelKey {
    /// The same relationship seen from the other chain.
    pub fn counterparty(&self) -> Self {
        Self {
            channel_id: self.counterparty_channel_id.clone(),
            port_id: self.counterparty_port_id.clone(),
            counterparty_channel_id: self.channel_id.clone(),
            counterparty_port_id: self.port_id.clone(),
        }
    }

    /// Key from the perspective of the chain that sent the packet.
    pub fn from_packet_source(packet: &PacketInfo) -> Self {
        Self {
            channel_id: packet.source_channel.clone(),
            port_id: packet.source_port.clone(),
            counterparty_channel_id: packet.dest_channel.clone(),
            counterparty_port_id: packet.dest_port.clone(),
        }
    }

    /// Key from the perspective of the chain that received the packet.
    pub fn from_packet_destination(packet: &PacketInfo) -> Self {
        Self {
            channel_id: packet.dest_channel.clone(),
            port_id: packet.dest_port.clone(),
            counterparty_channel_id: packet.source_channel.clone(),
            counterparty_port_id: packet.source_port.clone(),
        }
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} -> {}/{}",
            self.port_id, self.channel_id, self.counterparty_port_id, self.counterparty_channel_id
        )
    }
}

/// One client-related fact (create/update/upgrade/misbehaviour).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub client_id: String,
    pub consensus_height: Height,
    pub header: Vec<u8>,
}

impl ClientInfo {
    pub fn client_state(&self) -> (String, Height) {
        (self.client_id.clone(), self.consensus_height)
    }
}

/// One connection handshake fact.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub conn_id: String,
    pub client_id: String,
    pub counterparty_conn_id: String,
    pub counterparty_client_id: String,
    pub height: u64,
}

/// One channel handshake fact.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChannelInfo {
    pub port_id: String,
    pub channel_id: String,
    pub counterparty_port_id: String,
    pub counterparty_channel_id: String,
    pub conn_id: String,
    pub height: u64,
}

/// Packet lifecycle facts, accumulated across the packet events of one event
/// group. `send_packet` supplies the sequence, ports and timeout; a paired
/// `write_acknowledgement` supplies `ack`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PacketInfo {
    pub sequence: u64,
    pub source_port: String,
    pub source_channel: String,
    pub dest_port: String,
    pub dest_channel: String,
    pub data: Vec<u8>,
    pub ack: Vec<u8>,
    pub timeout_height: Height,
    pub timeout_timestamp: u64,
    pub height: u64,
}

/// The info variants a parsed message can carry. The set is fixed and
/// exhaustively handled by every consumer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MessageInfo {
    Client(ClientInfo),
    Connection(ConnectionInfo),
    Channel(ChannelInfo),
    Packet(PacketInfo),
}

/// One typed protocol message extracted from a transaction's event log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IbcMessage {
    /// Handler action name from the `message` event, e.g. `recv_packet`.
    pub action: String,
    pub info: MessageInfo,
}
