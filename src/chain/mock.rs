//! A simulated chain event source for tests.
//!
//! The mock produces one block per call, asking a caller-supplied generator
//! for the transaction messages of that block. Messages are rendered into
//! raw event logs and run through the real parser, so tests exercise the
//! full extraction path, not just the reconciliation engine.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::chain::{ChainProcessor, EventBatch};
use crate::error::Error;
use crate::event::parser::{self, Attribute, Event, MessageLog};
use crate::processor::{MSG_ACKNOWLEDGEMENT, MSG_RECV_PACKET, MSG_TIMEOUT, MSG_TRANSFER};
use crate::types::{ChainId, PacketInfo};

/// One simulated transaction: the handler action plus the packet it acted on.
#[derive(Clone, Debug)]
pub struct TransactionMessage {
    pub action: String,
    pub packet: PacketInfo,
}

impl TransactionMessage {
    pub fn new(action: &str, packet: PacketInfo) -> Self {
        Self {
            action: action.to_string(),
            packet,
        }
    }

    /// Render the transaction as the event group a real chain would emit
    /// for it.
    fn message_log(&self) -> MessageLog {
        let mut events = vec![Event::new(
            parser::MESSAGE_EVENT,
            vec![Attribute::new(parser::ACTION_ATTRIBUTE, &self.action)],
        )];

        match self.action.as_str() {
            MSG_TRANSFER => {
                events.push(packet_event(parser::SEND_PACKET, &self.packet));
            }
            MSG_RECV_PACKET => {
                events.push(packet_event(parser::RECV_PACKET, &self.packet));
                // A successful recv writes its acknowledgement in the same
                // event group; the parser must merge the two.
                events.push(Event::new(
                    parser::WRITE_ACKNOWLEDGEMENT,
                    vec![
                        Attribute::new(
                            parser::PACKET_SEQUENCE_ATTRIBUTE,
                            self.packet.sequence.to_string(),
                        ),
                        Attribute::new(
                            parser::PACKET_ACK_HEX_ATTRIBUTE,
                            hex::encode(&self.packet.ack),
                        ),
                    ],
                ));
            }
            MSG_ACKNOWLEDGEMENT => {
                events.push(packet_event(parser::ACKNOWLEDGE_PACKET, &self.packet));
            }
            MSG_TIMEOUT => {
                events.push(packet_event(parser::TIMEOUT_PACKET, &self.packet));
            }
            // Leave only the `message` event: the parser skips the group.
            _ => {}
        }

        MessageLog { events }
    }
}

fn packet_event(kind: &str, packet: &PacketInfo) -> Event {
    Event::new(
        kind,
        vec![
            Attribute::new(
                parser::PACKET_SEQUENCE_ATTRIBUTE,
                packet.sequence.to_string(),
            ),
            Attribute::new(parser::PACKET_SRC_PORT_ATTRIBUTE, &packet.source_port),
            Attribute::new(parser::PACKET_SRC_CHANNEL_ATTRIBUTE, &packet.source_channel),
            Attribute::new(parser::PACKET_DST_PORT_ATTRIBUTE, &packet.dest_port),
            Attribute::new(parser::PACKET_DST_CHANNEL_ATTRIBUTE, &packet.dest_channel),
            Attribute::new(parser::PACKET_DATA_HEX_ATTRIBUTE, hex::encode(&packet.data)),
            Attribute::new(
                parser::PACKET_TIMEOUT_HEIGHT_ATTRIBUTE,
                packet.timeout_height.to_string(),
            ),
            Attribute::new(
                parser::PACKET_TIMEOUT_TIMESTAMP_ATTRIBUTE,
                packet.timeout_timestamp.to_string(),
            ),
        ],
    )
}

type MessageGenerator = Box<dyn FnMut() -> Vec<TransactionMessage> + Send>;

/// Simulated chain producing one block per [`next_batch`] call, paced by
/// `block_time`.
pub struct MockChainProcessor {
    chain_id: ChainId,
    block_time: Duration,
    height: u64,
    get_messages: MessageGenerator,
}

impl MockChainProcessor {
    pub fn new(
        chain_id: ChainId,
        block_time: Duration,
        get_messages: impl FnMut() -> Vec<TransactionMessage> + Send + 'static,
    ) -> Self {
        Self {
            chain_id,
            block_time,
            height: 0,
            get_messages: Box::new(get_messages),
        }
    }
}

impl ChainProcessor for MockChainProcessor {
    fn chain_id(&self) -> &ChainId {
        &self.chain_id
    }

    fn next_batch(&mut self) -> Result<Option<EventBatch>, Error> {
        std::thread::sleep(self.block_time);
        self.height += 1;

        let logs: Vec<MessageLog> = (self.get_messages)()
            .iter()
            .map(TransactionMessage::message_log)
            .collect();

        let messages = parser::ibc_messages_from_logs(&logs, self.height);

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();

        Ok(Some(EventBatch {
            chain_id: self.chain_id.clone(),
            height: self.height,
            timestamp,
            messages,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Height, MessageInfo};

    fn mock_packet(sequence: u64) -> PacketInfo {
        PacketInfo {
            sequence,
            source_port: "port-0".to_string(),
            source_channel: "channel-0".to_string(),
            dest_port: "port-1".to_string(),
            dest_channel: "channel-1".to_string(),
            data: vec![1, 2, 3],
            ack: vec![1],
            timeout_height: Height::new(0, 1000),
            ..Default::default()
        }
    }

    #[test]
    fn mock_blocks_round_trip_through_the_parser() {
        let mut chain = MockChainProcessor::new(
            ChainId::from("mock-chain-0"),
            Duration::from_millis(1),
            || {
                vec![
                    TransactionMessage::new(MSG_TRANSFER, mock_packet(1)),
                    TransactionMessage::new(MSG_RECV_PACKET, mock_packet(9)),
                ]
            },
        );

        let batch = chain.next_batch().unwrap().unwrap();
        assert_eq!(batch.height, 1);
        assert_eq!(batch.messages.len(), 2);

        assert_eq!(batch.messages[0].action, MSG_TRANSFER);
        match &batch.messages[0].info {
            MessageInfo::Packet(packet) => {
                assert_eq!(packet.sequence, 1);
                assert_eq!(packet.data, vec![1, 2, 3]);
                assert_eq!(packet.height, 1);
            }
            other => panic!("expected packet info, got {other:?}"),
        }

        // The recv group contains a write_acknowledgement event; the parsed
        // packet must carry the ack.
        match &batch.messages[1].info {
            MessageInfo::Packet(packet) => {
                assert_eq!(packet.sequence, 9);
                assert_eq!(packet.ack, vec![1]);
            }
            other => panic!("expected packet info, got {other:?}"),
        }
    }
}
