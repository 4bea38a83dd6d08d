//! Parsing of a transaction's event log into typed IBC messages.
//!
//! A transaction log is a list of event groups, one group per handled
//! message. Each group yields at most one [`IbcMessage`]: the `message`
//! event supplies the handler action name, and the remaining events are
//! classified by type and folded into one info record. Packet events are
//! special: a single packet's facts can be split across several event types
//! within one group (`send_packet` plus `write_acknowledgement`, say), so
//! all packet events of a group share one accumulator.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use tracing::{error, warn};

use crate::event::attribute;
use crate::event::attribute::AttributeError;
use crate::types::{ChannelInfo, ClientInfo, ConnectionInfo, IbcMessage, MessageInfo, PacketInfo};

/// A single key/value attribute of an event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

impl Attribute {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// One event emitted while handling a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    pub kind: String,
    pub attributes: Vec<Attribute>,
}

impl Event {
    pub fn new(kind: impl Into<String>, attributes: Vec<Attribute>) -> Self {
        Self {
            kind: kind.into(),
            attributes,
        }
    }
}

/// The group of events emitted while handling one message of a transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageLog {
    pub events: Vec<Event>,
}

pub const MESSAGE_EVENT: &str = "message";
pub const ACTION_ATTRIBUTE: &str = "action";

pub const CREATE_CLIENT: &str = "create_client";
pub const UPDATE_CLIENT: &str = "update_client";
pub const UPGRADE_CLIENT: &str = "upgrade_client";
pub const CLIENT_MISBEHAVIOUR: &str = "client_misbehaviour";
pub const UPDATE_CLIENT_PROPOSAL: &str = "update_client_proposal";

pub const CONNECTION_OPEN_INIT: &str = "connection_open_init";
pub const CONNECTION_OPEN_TRY: &str = "connection_open_try";
pub const CONNECTION_OPEN_ACK: &str = "connection_open_ack";
pub const CONNECTION_OPEN_CONFIRM: &str = "connection_open_confirm";

pub const CHANNEL_OPEN_INIT: &str = "channel_open_init";
pub const CHANNEL_OPEN_TRY: &str = "channel_open_try";
pub const CHANNEL_OPEN_ACK: &str = "channel_open_ack";
pub const CHANNEL_OPEN_CONFIRM: &str = "channel_open_confirm";
pub const CHANNEL_CLOSE_INIT: &str = "channel_close_init";
pub const CHANNEL_CLOSE_CONFIRM: &str = "channel_close_confirm";

pub const SEND_PACKET: &str = "send_packet";
pub const RECV_PACKET: &str = "recv_packet";
pub const WRITE_ACKNOWLEDGEMENT: &str = "write_acknowledgement";
pub const ACKNOWLEDGE_PACKET: &str = "acknowledge_packet";
pub const TIMEOUT_PACKET: &str = "timeout_packet";
pub const TIMEOUT_ON_CLOSE_PACKET: &str = "timeout_on_close_packet";

pub const CLIENT_ID_ATTRIBUTE: &str = "client_id";
pub const CONSENSUS_HEIGHT_ATTRIBUTE: &str = "consensus_height";
pub const HEADER_ATTRIBUTE: &str = "header";

pub const CONNECTION_ID_ATTRIBUTE: &str = "connection_id";
pub const COUNTERPARTY_CONNECTION_ID_ATTRIBUTE: &str = "counterparty_connection_id";
pub const COUNTERPARTY_CLIENT_ID_ATTRIBUTE: &str = "counterparty_client_id";

pub const PORT_ID_ATTRIBUTE: &str = "port_id";
pub const CHANNEL_ID_ATTRIBUTE: &str = "channel_id";
pub const COUNTERPARTY_PORT_ID_ATTRIBUTE: &str = "counterparty_port_id";
pub const COUNTERPARTY_CHANNEL_ID_ATTRIBUTE: &str = "counterparty_channel_id";

pub const PACKET_SEQUENCE_ATTRIBUTE: &str = "packet_sequence";
pub const PACKET_TIMEOUT_TIMESTAMP_ATTRIBUTE: &str = "packet_timeout_timestamp";
pub const PACKET_TIMEOUT_HEIGHT_ATTRIBUTE: &str = "packet_timeout_height";
pub const PACKET_DATA_ATTRIBUTE: &str = "packet_data";
pub const PACKET_DATA_HEX_ATTRIBUTE: &str = "packet_data_hex";
pub const PACKET_ACK_ATTRIBUTE: &str = "packet_ack";
pub const PACKET_ACK_HEX_ATTRIBUTE: &str = "packet_ack_hex";
pub const PACKET_SRC_PORT_ATTRIBUTE: &str = "packet_src_port";
pub const PACKET_SRC_CHANNEL_ATTRIBUTE: &str = "packet_src_channel";
pub const PACKET_DST_PORT_ATTRIBUTE: &str = "packet_dst_port";
pub const PACKET_DST_CHANNEL_ATTRIBUTE: &str = "packet_dst_channel";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EventClass {
    Client,
    Connection,
    Channel,
    Packet,
}

/// Static dispatch table from event type to handler class. Unknown event
/// types fall through to a no-op, so future event types parse as "not IBC
/// relevant" without code change.
static EVENT_CLASSES: Lazy<HashMap<&'static str, EventClass>> = Lazy::new(|| {
    let mut classes = HashMap::new();

    for kind in [
        CREATE_CLIENT,
        UPDATE_CLIENT,
        UPGRADE_CLIENT,
        CLIENT_MISBEHAVIOUR,
        UPDATE_CLIENT_PROPOSAL,
    ] {
        classes.insert(kind, EventClass::Client);
    }

    for kind in [
        CONNECTION_OPEN_INIT,
        CONNECTION_OPEN_TRY,
        CONNECTION_OPEN_ACK,
        CONNECTION_OPEN_CONFIRM,
    ] {
        classes.insert(kind, EventClass::Connection);
    }

    for kind in [
        CHANNEL_OPEN_INIT,
        CHANNEL_OPEN_TRY,
        CHANNEL_OPEN_ACK,
        CHANNEL_OPEN_CONFIRM,
        CHANNEL_CLOSE_INIT,
        CHANNEL_CLOSE_CONFIRM,
    ] {
        classes.insert(kind, EventClass::Channel);
    }

    for kind in [
        SEND_PACKET,
        RECV_PACKET,
        WRITE_ACKNOWLEDGEMENT,
        ACKNOWLEDGE_PACKET,
        TIMEOUT_PACKET,
        TIMEOUT_ON_CLOSE_PACKET,
    ] {
        classes.insert(kind, EventClass::Packet);
    }

    classes
});

fn classify(kind: &str) -> Option<EventClass> {
    EVENT_CLASSES.get(kind).copied()
}

// Which info record a group scan has built so far. Packet events all fold
// into the one accumulator threaded through the scan.
enum Scanned {
    Client(ClientInfo),
    Connection(ConnectionInfo),
    Channel(ChannelInfo),
    Packet,
}

/// Parse all event groups of one transaction into typed messages.
///
/// Output preserves the transaction's event-group order. Groups with no
/// matched event types produce nothing; a group that built an info record
/// without an action attribute is a parser contract violation and is
/// discarded with an error event.
pub fn ibc_messages_from_logs(logs: &[MessageLog], height: u64) -> Vec<IbcMessage> {
    let mut messages = Vec::new();

    for log in logs {
        let mut action = String::new();
        let mut scanned: Option<Scanned> = None;
        let mut packet_accumulator: Option<PacketInfo> = None;

        for event in &log.events {
            if event.kind == MESSAGE_EVENT {
                for attr in &event.attributes {
                    if attr.key == ACTION_ATTRIBUTE {
                        action = attr.value.clone();
                    }
                }
                continue;
            }

            match classify(&event.kind) {
                Some(EventClass::Client) => {
                    let mut info = ClientInfo::default();
                    fold_client_attributes(&mut info, &event.attributes);
                    scanned = Some(Scanned::Client(info));
                }
                Some(EventClass::Connection) => {
                    let mut info = ConnectionInfo {
                        height,
                        ..Default::default()
                    };
                    fold_connection_attributes(&mut info, &event.attributes);
                    scanned = Some(Scanned::Connection(info));
                }
                Some(EventClass::Channel) => {
                    let mut info = ChannelInfo {
                        height,
                        ..Default::default()
                    };
                    fold_channel_attributes(&mut info, &event.attributes);
                    scanned = Some(Scanned::Channel(info));
                }
                Some(EventClass::Packet) => {
                    let accumulator = packet_accumulator.get_or_insert_with(|| PacketInfo {
                        height,
                        ..Default::default()
                    });
                    fold_packet_attributes(accumulator, &event.attributes);
                    scanned = Some(Scanned::Packet);
                }
                None => {}
            }
        }

        let info = match scanned {
            None => continue, // not an IBC message, nothing to log
            Some(Scanned::Client(info)) => MessageInfo::Client(info),
            Some(Scanned::Connection(info)) => MessageInfo::Connection(info),
            Some(Scanned::Channel(info)) => MessageInfo::Channel(info),
            Some(Scanned::Packet) => match packet_accumulator.take() {
                Some(packet) => MessageInfo::Packet(packet),
                None => continue,
            },
        };

        if action.is_empty() {
            error!(
                ?info,
                "unexpected parser state: message info is populated but action is empty"
            );
            continue;
        }

        messages.push(IbcMessage { action, info });
    }

    messages
}

fn decode_failure(key: &str, value: &str, e: &AttributeError) {
    warn!(key, value, "failed to decode event attribute: {e}");
}

fn fold_client_attributes(info: &mut ClientInfo, attributes: &[Attribute]) {
    for attr in attributes {
        match attr.key.as_str() {
            CLIENT_ID_ATTRIBUTE => info.client_id = attr.value.clone(),
            CONSENSUS_HEIGHT_ATTRIBUTE => match attribute::parse_height(&attr.value) {
                Ok(height) => info.consensus_height = height,
                Err(e) => decode_failure(&attr.key, &attr.value, &e),
            },
            HEADER_ATTRIBUTE => match attribute::parse_hex(&attr.value) {
                Ok(header) => info.header = header,
                Err(e) => decode_failure(&attr.key, &attr.value, &e),
            },
            _ => {}
        }
    }
}

fn fold_connection_attributes(info: &mut ConnectionInfo, attributes: &[Attribute]) {
    for attr in attributes {
        match attr.key.as_str() {
            CONNECTION_ID_ATTRIBUTE => info.conn_id = attr.value.clone(),
            CLIENT_ID_ATTRIBUTE => info.client_id = attr.value.clone(),
            COUNTERPARTY_CONNECTION_ID_ATTRIBUTE => {
                info.counterparty_conn_id = attr.value.clone();
            }
            COUNTERPARTY_CLIENT_ID_ATTRIBUTE => {
                info.counterparty_client_id = attr.value.clone();
            }
            _ => {}
        }
    }
}

fn fold_channel_attributes(info: &mut ChannelInfo, attributes: &[Attribute]) {
    for attr in attributes {
        match attr.key.as_str() {
            PORT_ID_ATTRIBUTE => info.port_id = attr.value.clone(),
            CHANNEL_ID_ATTRIBUTE => info.channel_id = attr.value.clone(),
            COUNTERPARTY_PORT_ID_ATTRIBUTE => info.counterparty_port_id = attr.value.clone(),
            COUNTERPARTY_CHANNEL_ID_ATTRIBUTE => {
                info.counterparty_channel_id = attr.value.clone();
            }
            CONNECTION_ID_ATTRIBUTE => info.conn_id = attr.value.clone(),
            _ => {}
        }
    }
}

fn fold_packet_attributes(info: &mut PacketInfo, attributes: &[Attribute]) {
    for attr in attributes {
        match attr.key.as_str() {
            PACKET_SEQUENCE_ATTRIBUTE => match attribute::parse_number(&attr.value) {
                Ok(sequence) => info.sequence = sequence,
                Err(e) => decode_failure(&attr.key, &attr.value, &e),
            },
            PACKET_TIMEOUT_TIMESTAMP_ATTRIBUTE => match attribute::parse_number(&attr.value) {
                Ok(timestamp) => info.timeout_timestamp = timestamp,
                Err(e) => decode_failure(&attr.key, &attr.value, &e),
            },
            PACKET_TIMEOUT_HEIGHT_ATTRIBUTE => match attribute::parse_height(&attr.value) {
                Ok(height) => info.timeout_height = height,
                Err(e) => decode_failure(&attr.key, &attr.value, &e),
            },
            // Deprecated per IBC spec, still emitted by older chains.
            PACKET_DATA_ATTRIBUTE => info.data = attr.value.clone().into_bytes(),
            PACKET_DATA_HEX_ATTRIBUTE => match attribute::parse_hex(&attr.value) {
                Ok(data) => info.data = data,
                Err(e) => decode_failure(&attr.key, &attr.value, &e),
            },
            // Deprecated per IBC spec, still emitted by older chains.
            PACKET_ACK_ATTRIBUTE => info.ack = attr.value.clone().into_bytes(),
            PACKET_ACK_HEX_ATTRIBUTE => match attribute::parse_hex(&attr.value) {
                Ok(ack) => info.ack = ack,
                Err(e) => decode_failure(&attr.key, &attr.value, &e),
            },
            PACKET_SRC_PORT_ATTRIBUTE => info.source_port = attr.value.clone(),
            PACKET_SRC_CHANNEL_ATTRIBUTE => info.source_channel = attr.value.clone(),
            PACKET_DST_PORT_ATTRIBUTE => info.dest_port = attr.value.clone(),
            PACKET_DST_CHANNEL_ATTRIBUTE => info.dest_channel = attr.value.clone(),
            _ => {}
        }
    }
}
