//! The path-level packet-state reconciliation engine.
//!
//! A [`PathProcessor`] owns the pending relay queues for one configured pair
//! of chain endpoints. Both chain threads feed it observed messages through
//! [`ingest`](PathProcessor::ingest); the run loop drains the next batch of
//! relay actions through [`flush`](PathProcessor::flush). All state lives
//! behind one mutex, so ingestion and flushing are serialized.
//!
//! Queue discipline per channel pair, keyed by sequence:
//! - a send on one side queues a pending transfer there, retired when the
//!   matching `recv_packet` is observed on the other side;
//! - an observed recv queues the acknowledgement relay back to the origin,
//!   retired when `acknowledge_packet` is observed there;
//! - delivered acknowledgements and timeouts are terminal.
//!
//! Retired sequences are remembered for the life of the process, so replayed
//! heights and duplicate events stay no-ops. State does not survive
//! restarts.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::chain::EventBatch;
use crate::processor::{PacketAction, RelayAction};
use crate::types::{ChainId, ChannelKey, Height, IbcMessage, MessageInfo, PacketInfo, PathEnd};

/// How many flush cycles a partial packet assembly is retained before it is
/// dropped with a warning.
pub const DEFAULT_INCOMPLETE_LOOKBACK: usize = 8;

#[derive(Clone, Debug)]
struct PendingPacket {
    packet: PacketInfo,
    /// Set once the entry has been emitted in a flush batch; pending entries
    /// are emitted at most once.
    submitted: bool,
    /// The record is missing fields required to build its relay message and
    /// is excluded from flush output until corrected.
    incomplete: bool,
    /// Flush cycles spent incomplete.
    age: usize,
}

impl PendingPacket {
    fn new(packet: PacketInfo, incomplete: bool) -> Self {
        Self {
            packet,
            submitted: false,
            incomplete,
            age: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum InsertOutcome {
    Inserted,
    /// An incomplete entry was completed by a later event for the same
    /// sequence.
    Corrected,
    Duplicate,
    /// The sequence was already retired; the message is a replay.
    Retired,
}

#[derive(Debug, Default)]
struct PacketQueue {
    pending: BTreeMap<u64, PendingPacket>,
    retired: BTreeSet<u64>,
}

impl PacketQueue {
    fn insert(&mut self, sequence: u64, entry: PendingPacket) -> InsertOutcome {
        if self.retired.contains(&sequence) {
            return InsertOutcome::Retired;
        }
        match self.pending.get_mut(&sequence) {
            Some(existing) => {
                if existing.incomplete && !entry.incomplete {
                    let submitted = existing.submitted;
                    *existing = PendingPacket { submitted, ..entry };
                    InsertOutcome::Corrected
                } else {
                    InsertOutcome::Duplicate
                }
            }
            None => {
                self.pending.insert(sequence, entry);
                InsertOutcome::Inserted
            }
        }
    }

    /// Remove any pending entry and remember the sequence as retired, so a
    /// later or replayed triggering event cannot resurrect it. Returns
    /// whether an entry was actually pending.
    fn retire(&mut self, sequence: u64) -> bool {
        self.retired.insert(sequence);
        self.pending.remove(&sequence).is_some()
    }

    fn sequences(&self) -> Vec<u64> {
        self.pending.keys().copied().collect()
    }
}

#[derive(Debug, Default)]
struct ChannelQueues {
    transfer: PacketQueue,
    recv: PacketQueue,
    ack: PacketQueue,
    timeout: PacketQueue,
}

impl ChannelQueues {
    fn queue(&self, action: PacketAction) -> &PacketQueue {
        match action {
            PacketAction::Transfer => &self.transfer,
            PacketAction::RecvPacket => &self.recv,
            PacketAction::Acknowledgement => &self.ack,
            PacketAction::Timeout => &self.timeout,
        }
    }
}

#[derive(Debug)]
struct PathEndRuntime {
    info: PathEnd,
    latest_height: u64,
    latest_timestamp: u64,
    client_consensus_height: Height,
    channels: BTreeMap<ChannelKey, ChannelQueues>,
}

impl PathEndRuntime {
    fn new(info: PathEnd) -> Self {
        Self {
            info,
            latest_height: 0,
            latest_timestamp: 0,
            client_consensus_height: Height::ZERO,
            channels: BTreeMap::new(),
        }
    }

    fn queues(&mut self, key: &ChannelKey) -> &mut ChannelQueues {
        self.channels.entry(key.clone()).or_default()
    }
}

struct State {
    ends: [PathEndRuntime; 2],
}

impl State {
    /// The runtime the message was observed on, and its counterpart.
    fn both_mut(&mut self, observed: usize) -> (&mut PathEndRuntime, &mut PathEndRuntime) {
        let (first, second) = self.ends.split_at_mut(1);
        if observed == 0 {
            (&mut first[0], &mut second[0])
        } else {
            (&mut second[0], &mut first[0])
        }
    }
}

/// Reconciles the message streams of two chains into pending relay queues.
pub struct PathProcessor {
    path_end_1: PathEnd,
    path_end_2: PathEnd,
    /// Channel pairs relayed on this path; empty means every observed pair.
    channel_filter: Vec<ChannelKey>,
    incomplete_lookback: usize,
    state: Mutex<State>,
}

impl PathProcessor {
    pub fn new(path_end_1: PathEnd, path_end_2: PathEnd) -> Self {
        let state = State {
            ends: [
                PathEndRuntime::new(path_end_1.clone()),
                PathEndRuntime::new(path_end_2.clone()),
            ],
        };
        Self {
            path_end_1,
            path_end_2,
            channel_filter: Vec::new(),
            incomplete_lookback: DEFAULT_INCOMPLETE_LOOKBACK,
            state: Mutex::new(state),
        }
    }

    pub fn with_channel_filter(mut self, channels: Vec<ChannelKey>) -> Self {
        self.channel_filter = channels;
        self
    }

    pub fn with_incomplete_lookback(mut self, flushes: usize) -> Self {
        self.incomplete_lookback = flushes;
        self
    }

    pub fn involves_chain(&self, chain_id: &ChainId) -> bool {
        self.side_of(chain_id).is_some()
    }

    /// Apply one chain's event batch to the path state. Idempotent: replayed
    /// heights and duplicate messages leave the queues unchanged.
    pub fn ingest(&self, batch: &EventBatch) {
        let Some(side) = self.side_of(&batch.chain_id) else {
            debug!(chain = %batch.chain_id, "batch from a chain not on this path, ignoring");
            return;
        };

        let mut state = self.state.lock().unwrap();

        {
            let end = &mut state.ends[side];
            if batch.height > end.latest_height {
                end.latest_height = batch.height;
            }
            if batch.timestamp > end.latest_timestamp {
                end.latest_timestamp = batch.timestamp;
            }
        }

        for message in &batch.messages {
            self.apply(&mut state, side, message);
        }
    }

    /// Drain the next batch of relay actions: at most one per pending,
    /// not-yet-submitted queue entry, in ascending sequence order within
    /// each action kind.
    pub fn flush(&self) -> Vec<RelayAction> {
        let mut state = self.state.lock().unwrap();
        let mut actions = Vec::new();

        for side in 0..2 {
            let (observed, counterpart) = state.both_mut(side);
            let own_chain = observed.info.chain_id.clone();
            let counterpart_chain = counterpart.info.chain_id.clone();
            let counterpart_height = counterpart.latest_height;
            let counterpart_timestamp = counterpart.latest_timestamp;

            for (key, queues) in observed.channels.iter_mut() {
                // Pending transfers become RecvPacket relays to the
                // counterparty, unless their timeout has already elapsed
                // from the counterparty's point of view.
                let mut timed_out = Vec::new();
                for (&sequence, entry) in queues.transfer.pending.iter_mut() {
                    if entry.incomplete || entry.submitted {
                        continue;
                    }
                    if timeout_elapsed(&entry.packet, counterpart_height, counterpart_timestamp) {
                        timed_out.push(sequence);
                        continue;
                    }
                    entry.submitted = true;
                    actions.push(RelayAction {
                        dst_chain_id: counterpart_chain.clone(),
                        kind: PacketAction::RecvPacket,
                        packet: entry.packet.clone(),
                    });
                }

                for sequence in timed_out {
                    let Some(entry) = queues.transfer.pending.remove(&sequence) else {
                        continue;
                    };
                    queues.transfer.retired.insert(sequence);
                    warn!(
                        channel = %key,
                        sequence,
                        "packet timed out before being received, scheduling timeout"
                    );
                    let packet = entry.packet.clone();
                    let outcome = queues.timeout.insert(
                        sequence,
                        PendingPacket {
                            submitted: true,
                            ..entry
                        },
                    );
                    // A retired timeout sequence means a recv confirmation
                    // already won; never submit both terminal paths.
                    if outcome == InsertOutcome::Inserted {
                        actions.push(RelayAction {
                            dst_chain_id: own_chain.clone(),
                            kind: PacketAction::Timeout,
                            packet,
                        });
                    }
                }

                // Observed recvs become Acknowledgement relays back to the
                // packet's origin chain.
                for (&_sequence, entry) in queues.recv.pending.iter_mut() {
                    if entry.incomplete || entry.submitted {
                        continue;
                    }
                    entry.submitted = true;
                    actions.push(RelayAction {
                        dst_chain_id: counterpart_chain.clone(),
                        kind: PacketAction::Acknowledgement,
                        packet: entry.packet.clone(),
                    });
                }

                // Delivered acknowledgements are terminal: nothing to relay.
                for sequence in queues.ack.sequences() {
                    queues.ack.retire(sequence);
                    debug!(
                        channel = %key,
                        sequence,
                        "acknowledgement delivered, packet lifecycle complete"
                    );
                }

                age_incomplete(key, &mut queues.transfer, self.incomplete_lookback);
                age_incomplete(key, &mut queues.recv, self.incomplete_lookback);
            }
        }

        actions
    }

    /// Pending sequences on the first path end for one channel pair and
    /// action kind.
    pub fn path_end_1_messages(&self, key: &ChannelKey, action: PacketAction) -> Vec<u64> {
        self.pending_sequences(0, key, action)
    }

    /// Pending sequences on the second path end for one channel pair and
    /// action kind.
    pub fn path_end_2_messages(&self, key: &ChannelKey, action: PacketAction) -> Vec<u64> {
        self.pending_sequences(1, key, action)
    }

    /// Latest client consensus height observed on the first path end.
    pub fn path_end_1_client_height(&self) -> Height {
        self.state.lock().unwrap().ends[0].client_consensus_height
    }

    /// Latest client consensus height observed on the second path end.
    pub fn path_end_2_client_height(&self) -> Height {
        self.state.lock().unwrap().ends[1].client_consensus_height
    }

    fn pending_sequences(&self, side: usize, key: &ChannelKey, action: PacketAction) -> Vec<u64> {
        let state = self.state.lock().unwrap();
        state.ends[side]
            .channels
            .get(key)
            .map(|queues| queues.queue(action).sequences())
            .unwrap_or_default()
    }

    fn side_of(&self, chain_id: &ChainId) -> Option<usize> {
        if *chain_id == self.path_end_1.chain_id {
            Some(0)
        } else if *chain_id == self.path_end_2.chain_id {
            Some(1)
        } else {
            None
        }
    }

    fn allows(&self, key: &ChannelKey) -> bool {
        self.channel_filter.is_empty()
            || self.channel_filter.contains(key)
            || self.channel_filter.contains(&key.counterparty())
    }

    fn apply(&self, state: &mut State, side: usize, message: &IbcMessage) {
        match &message.info {
            MessageInfo::Packet(packet) => {
                let Some(action) = PacketAction::from_action(&message.action) else {
                    debug!(action = %message.action, "not a packet lifecycle action, ignoring");
                    return;
                };
                if packet.sequence == 0 {
                    warn!(
                        action = %message.action,
                        "dropping packet message without a sequence number"
                    );
                    return;
                }
                self.apply_packet(state, side, action, packet);
            }
            MessageInfo::Client(client) => {
                let end = &mut state.ends[side];
                if client.consensus_height > end.client_consensus_height {
                    end.client_consensus_height = client.consensus_height;
                }
                debug!(
                    chain = %end.info.chain_id,
                    client = %client.client_id,
                    consensus_height = %client.consensus_height,
                    "observed client update"
                );
            }
            MessageInfo::Connection(conn) => {
                // Handshake message construction is a collaborator concern;
                // the core only extracts the facts.
                debug!(
                    action = %message.action,
                    connection = %conn.conn_id,
                    "observed connection handshake event"
                );
            }
            MessageInfo::Channel(chan) => {
                debug!(
                    action = %message.action,
                    port = %chan.port_id,
                    channel = %chan.channel_id,
                    "observed channel handshake event"
                );
            }
        }
    }

    fn apply_packet(
        &self,
        state: &mut State,
        side: usize,
        action: PacketAction,
        packet: &PacketInfo,
    ) {
        let sequence = packet.sequence;
        let (observed, counterpart) = state.both_mut(side);

        match action {
            PacketAction::Transfer => {
                let key = ChannelKey::from_packet_source(packet);
                if !self.allows(&key) {
                    return;
                }
                let incomplete = transfer_incomplete(packet);
                let outcome = observed
                    .queues(&key)
                    .transfer
                    .insert(sequence, PendingPacket::new(packet.clone(), incomplete));
                log_insert("transfer", &key, sequence, outcome);
            }
            PacketAction::RecvPacket => {
                let key = ChannelKey::from_packet_destination(packet);
                if !self.allows(&key) {
                    return;
                }
                let counterpart_key = key.counterparty();

                // The packet reached its destination: the transfer must
                // never be relayed again, whoever delivered it.
                counterpart.queues(&counterpart_key).transfer.retire(sequence);
                if counterpart.queues(&counterpart_key).timeout.retire(sequence) {
                    warn!(
                        channel = %counterpart_key,
                        sequence,
                        "recv confirmation observed for a packet scheduled as timed out, confirmation wins"
                    );
                }

                let incomplete = recv_incomplete(packet);
                let outcome = observed
                    .queues(&key)
                    .recv
                    .insert(sequence, PendingPacket::new(packet.clone(), incomplete));
                log_insert("recv", &key, sequence, outcome);
            }
            PacketAction::Acknowledgement => {
                let key = ChannelKey::from_packet_source(packet);
                if !self.allows(&key) {
                    return;
                }

                // The acknowledgement landed on the origin chain: the recv
                // entry on the counterparty no longer needs its ack relayed,
                // and the packet itself is complete.
                counterpart.queues(&key.counterparty()).recv.retire(sequence);
                observed.queues(&key).transfer.retire(sequence);
                if observed.queues(&key).timeout.retire(sequence) {
                    warn!(
                        channel = %key,
                        sequence,
                        "acknowledgement observed for a packet scheduled as timed out, confirmation wins"
                    );
                }

                let outcome = observed
                    .queues(&key)
                    .ack
                    .insert(sequence, PendingPacket::new(packet.clone(), false));
                log_insert("ack", &key, sequence, outcome);
            }
            PacketAction::Timeout => {
                let key = ChannelKey::from_packet_source(packet);
                if !self.allows(&key) {
                    return;
                }

                // Timeout delivered on the origin chain: terminal.
                observed.queues(&key).transfer.retire(sequence);
                observed.queues(&key).timeout.retire(sequence);
                debug!(channel = %key, sequence, "timeout delivered, packet lifecycle complete");
            }
        }
    }
}

fn log_insert(queue: &str, key: &ChannelKey, sequence: u64, outcome: InsertOutcome) {
    match outcome {
        InsertOutcome::Inserted => {
            debug!(queue, channel = %key, sequence, "queued pending packet");
        }
        InsertOutcome::Corrected => {
            debug!(queue, channel = %key, sequence, "completed a partial packet record");
        }
        InsertOutcome::Duplicate => {
            debug!(queue, channel = %key, sequence, "duplicate message, already pending");
        }
        InsertOutcome::Retired => {
            debug!(queue, channel = %key, sequence, "message for an already-retired sequence");
        }
    }
}

/// Whichever timeout is set decides; a packet with neither never times out.
/// Batch heights carry no revision number, so the height comparison is on
/// revision heights only.
fn timeout_elapsed(packet: &PacketInfo, dst_height: u64, dst_timestamp: u64) -> bool {
    let height_elapsed = !packet.timeout_height.is_zero()
        && dst_height >= packet.timeout_height.revision_height;
    let timestamp_elapsed =
        packet.timeout_timestamp > 0 && dst_timestamp >= packet.timeout_timestamp;
    height_elapsed || timestamp_elapsed
}

// A transfer needs both endpoints to build the recv message.
fn transfer_incomplete(packet: &PacketInfo) -> bool {
    packet.source_port.is_empty()
        || packet.source_channel.is_empty()
        || packet.dest_port.is_empty()
        || packet.dest_channel.is_empty()
}

// A recv additionally needs the written acknowledgement.
fn recv_incomplete(packet: &PacketInfo) -> bool {
    transfer_incomplete(packet) || packet.ack.is_empty()
}

fn age_incomplete(key: &ChannelKey, queue: &mut PacketQueue, lookback: usize) {
    let mut expired = Vec::new();
    for (&sequence, entry) in queue.pending.iter_mut() {
        if !entry.incomplete {
            continue;
        }
        entry.age += 1;
        if entry.age > lookback {
            expired.push(sequence);
        }
    }
    for sequence in expired {
        queue.pending.remove(&sequence);
        warn!(
            channel = %key,
            sequence,
            "dropping packet record that never completed assembly"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClientInfo;

    fn path_ends() -> (PathEnd, PathEnd) {
        (
            PathEnd {
                chain_id: ChainId::from("chain-a"),
                client_id: "client-a".to_string(),
            },
            PathEnd {
                chain_id: ChainId::from("chain-b"),
                client_id: "client-b".to_string(),
            },
        )
    }

    fn channel_key() -> ChannelKey {
        ChannelKey {
            channel_id: "channel-0".to_string(),
            port_id: "port-0".to_string(),
            counterparty_channel_id: "channel-1".to_string(),
            counterparty_port_id: "port-1".to_string(),
        }
    }

    // Packet sent from chain-a, as its send_packet event describes it.
    fn packet(sequence: u64) -> PacketInfo {
        PacketInfo {
            sequence,
            source_port: "port-0".to_string(),
            source_channel: "channel-0".to_string(),
            dest_port: "port-1".to_string(),
            dest_channel: "channel-1".to_string(),
            data: vec![7],
            ack: vec![1],
            timeout_height: Height::new(0, 1000),
            ..Default::default()
        }
    }

    fn message(action: &str, packet: PacketInfo) -> IbcMessage {
        IbcMessage {
            action: action.to_string(),
            info: MessageInfo::Packet(packet),
        }
    }

    fn batch(chain: &str, height: u64, messages: Vec<IbcMessage>) -> EventBatch {
        EventBatch {
            chain_id: ChainId::from(chain),
            height,
            timestamp: 0,
            messages,
        }
    }

    fn processor() -> PathProcessor {
        let (end_1, end_2) = path_ends();
        PathProcessor::new(end_1, end_2)
    }

    #[test]
    fn ingest_is_idempotent() {
        let processor = processor();
        let transfer = message(crate::processor::MSG_TRANSFER, packet(1));

        processor.ingest(&batch("chain-a", 10, vec![transfer.clone()]));
        processor.ingest(&batch("chain-a", 10, vec![transfer]));

        assert_eq!(
            processor.path_end_1_messages(&channel_key(), PacketAction::Transfer),
            vec![1]
        );

        let actions = processor.flush();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].kind, PacketAction::RecvPacket);
        assert_eq!(actions[0].dst_chain_id, ChainId::from("chain-b"));

        // Already submitted: nothing more to emit.
        assert!(processor.flush().is_empty());
    }

    #[test]
    fn out_of_order_sends_flush_in_ascending_sequence_order() {
        let processor = processor();

        for sequence in [3, 1, 2] {
            processor.ingest(&batch(
                "chain-a",
                sequence,
                vec![message(crate::processor::MSG_TRANSFER, packet(sequence))],
            ));
        }

        let sequences: Vec<u64> = processor
            .flush()
            .iter()
            .map(|action| action.packet.sequence)
            .collect();
        assert_eq!(sequences, vec![1, 2, 3]);
    }

    #[test]
    fn observed_recv_retires_the_pending_transfer() {
        let processor = processor();

        processor.ingest(&batch(
            "chain-a",
            5,
            vec![message(crate::processor::MSG_TRANSFER, packet(1))],
        ));
        processor.ingest(&batch(
            "chain-b",
            6,
            vec![message(crate::processor::MSG_RECV_PACKET, packet(1))],
        ));

        assert!(processor
            .path_end_1_messages(&channel_key(), PacketAction::Transfer)
            .is_empty());

        // The recv generated a pending acknowledgement relay, but no
        // RecvPacket action may be emitted for the retired sequence.
        let actions = processor.flush();
        assert!(actions
            .iter()
            .all(|action| action.kind != PacketAction::RecvPacket));
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].kind, PacketAction::Acknowledgement);
        assert_eq!(actions[0].dst_chain_id, ChainId::from("chain-a"));
    }

    #[test]
    fn recv_observed_before_the_send_event_still_suppresses_relay() {
        let processor = processor();

        // chain-b's poll got ahead of chain-a's.
        processor.ingest(&batch(
            "chain-b",
            6,
            vec![message(crate::processor::MSG_RECV_PACKET, packet(1))],
        ));
        processor.ingest(&batch(
            "chain-a",
            5,
            vec![message(crate::processor::MSG_TRANSFER, packet(1))],
        ));

        assert!(processor
            .path_end_1_messages(&channel_key(), PacketAction::Transfer)
            .is_empty());
        let actions = processor.flush();
        assert!(actions
            .iter()
            .all(|action| action.kind != PacketAction::RecvPacket));
    }

    #[test]
    fn acknowledgement_retires_the_pending_recv() {
        let processor = processor();
        let key = channel_key();

        processor.ingest(&batch(
            "chain-b",
            6,
            vec![message(crate::processor::MSG_RECV_PACKET, packet(1))],
        ));
        assert_eq!(
            processor.path_end_2_messages(&key.counterparty(), PacketAction::RecvPacket),
            vec![1]
        );

        processor.ingest(&batch(
            "chain-a",
            7,
            vec![message(crate::processor::MSG_ACKNOWLEDGEMENT, packet(1))],
        ));
        assert!(processor
            .path_end_2_messages(&key.counterparty(), PacketAction::RecvPacket)
            .is_empty());

        // The delivered ack itself is terminal and drained by flush.
        assert_eq!(
            processor.path_end_1_messages(&key, PacketAction::Acknowledgement),
            vec![1]
        );
        processor.flush();
        assert!(processor
            .path_end_1_messages(&key, PacketAction::Acknowledgement)
            .is_empty());
    }

    #[test]
    fn elapsed_timeout_schedules_timeout_instead_of_recv() {
        let processor = processor();
        let key = channel_key();

        let mut timed_out_packet = packet(1);
        timed_out_packet.timeout_height = Height::new(0, 10);

        processor.ingest(&batch(
            "chain-a",
            5,
            vec![message(crate::processor::MSG_TRANSFER, timed_out_packet)],
        ));
        // The destination chain has advanced past the timeout height.
        processor.ingest(&batch("chain-b", 20, vec![]));

        let actions = processor.flush();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].kind, PacketAction::Timeout);
        assert_eq!(actions[0].dst_chain_id, ChainId::from("chain-a"));
        assert_eq!(
            processor.path_end_1_messages(&key, PacketAction::Timeout),
            vec![1]
        );

        // The delivered timeout retires the pending entry.
        processor.ingest(&batch(
            "chain-a",
            8,
            vec![message(crate::processor::MSG_TIMEOUT, packet(1))],
        ));
        assert!(processor
            .path_end_1_messages(&key, PacketAction::Timeout)
            .is_empty());
    }

    #[test]
    fn timeout_height_check_ignores_the_revision_number() {
        let processor = processor();

        let mut expiring_packet = packet(1);
        expiring_packet.timeout_height = Height::new(5, 10);

        processor.ingest(&batch(
            "chain-a",
            5,
            vec![message(crate::processor::MSG_TRANSFER, expiring_packet)],
        ));
        // Batch heights carry no revision number; 20 elapses a timeout at
        // revision height 10 regardless of the packet's revision 5.
        processor.ingest(&batch("chain-b", 20, vec![]));

        let actions = processor.flush();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].kind, PacketAction::Timeout);
    }

    #[test]
    fn recv_confirmation_wins_over_scheduled_timeout() {
        let processor = processor();
        let key = channel_key();

        let mut timed_out_packet = packet(1);
        timed_out_packet.timeout_height = Height::new(0, 10);

        processor.ingest(&batch(
            "chain-a",
            5,
            vec![message(crate::processor::MSG_TRANSFER, timed_out_packet)],
        ));
        processor.ingest(&batch("chain-b", 20, vec![]));
        let actions = processor.flush();
        assert_eq!(actions[0].kind, PacketAction::Timeout);

        // A recv confirmation for the same sequence arrives after all: the
        // packet was not actually timed out from the destination's view.
        processor.ingest(&batch(
            "chain-b",
            21,
            vec![message(crate::processor::MSG_RECV_PACKET, packet(1))],
        ));

        assert!(processor
            .path_end_1_messages(&key, PacketAction::Timeout)
            .is_empty());
        let actions = processor.flush();
        assert!(actions
            .iter()
            .all(|action| action.kind != PacketAction::Timeout));
    }

    #[test]
    fn incomplete_records_are_excluded_then_dropped() {
        let (end_1, end_2) = path_ends();
        let processor = PathProcessor::new(end_1, end_2).with_incomplete_lookback(2);
        let key = channel_key();

        let mut partial = packet(1);
        partial.dest_channel = String::new();

        processor.ingest(&batch(
            "chain-a",
            5,
            vec![message(crate::processor::MSG_TRANSFER, partial)],
        ));

        // Excluded from flush output while incomplete.
        assert!(processor.flush().is_empty());
        assert!(processor.flush().is_empty());

        // Beyond the lookback horizon the record is dropped.
        assert!(processor.flush().is_empty());
        assert!(processor
            .path_end_1_messages(&key, PacketAction::Transfer)
            .is_empty());
    }

    #[test]
    fn later_event_corrects_a_partial_record() {
        let (end_1, end_2) = path_ends();
        let processor = PathProcessor::new(end_1, end_2).with_incomplete_lookback(4);

        let mut partial = packet(1);
        partial.dest_channel = String::new();

        processor.ingest(&batch(
            "chain-a",
            5,
            vec![message(crate::processor::MSG_TRANSFER, partial)],
        ));
        assert!(processor.flush().is_empty());

        processor.ingest(&batch(
            "chain-a",
            6,
            vec![message(crate::processor::MSG_TRANSFER, packet(1))],
        ));

        let actions = processor.flush();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].kind, PacketAction::RecvPacket);
    }

    #[test]
    fn channel_filter_excludes_foreign_pairs() {
        let (end_1, end_2) = path_ends();
        let other = ChannelKey {
            channel_id: "channel-9".to_string(),
            port_id: "port-9".to_string(),
            counterparty_channel_id: "channel-8".to_string(),
            counterparty_port_id: "port-8".to_string(),
        };
        let processor = PathProcessor::new(end_1, end_2).with_channel_filter(vec![other]);

        processor.ingest(&batch(
            "chain-a",
            5,
            vec![message(crate::processor::MSG_TRANSFER, packet(1))],
        ));

        assert!(processor.flush().is_empty());
        assert!(processor
            .path_end_1_messages(&channel_key(), PacketAction::Transfer)
            .is_empty());
    }

    #[test]
    fn client_updates_advance_the_observed_consensus_height() {
        let processor = processor();

        let update = IbcMessage {
            action: crate::processor::MSG_UPDATE_CLIENT.to_string(),
            info: MessageInfo::Client(ClientInfo {
                client_id: "client-a".to_string(),
                consensus_height: Height::new(1, 300),
                header: vec![],
            }),
        };
        processor.ingest(&batch("chain-a", 5, vec![update]));

        assert_eq!(processor.path_end_1_client_height(), Height::new(1, 300));
        assert_eq!(processor.path_end_2_client_height(), Height::ZERO);
    }
}
