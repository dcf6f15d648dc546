//! Context for node firmware code generators
//!
//! Templates themselves live outside this crate. This module only produces
//! the read-only data they consume for one deployed node: its messages with
//! the identifiers and filter masks the node uses, and the identifier layout
//! constants.

use crate::identifier::{FROM_NODE_ID_OFFSET, MSG_ID_OFFSET, PRIORITY_OFFSET, TO_NODE_ID_OFFSET};
use crate::network::{Message, Network, NodeInstance};
use crate::signal::{Endianness, Signal, INJECT_WORD_WIDTH};
use serde::Serialize;

/// Direction of a message relative to the node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Rx,
    Tx,
}

/// Everything a template needs for one node instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeContext {
    pub node_id: String,
    pub node: String,
    pub description: String,
    pub number_of_messages: usize,
    /// Received messages first, then sent messages
    pub messages: Vec<MessageView>,
    pub message_id_offsets: IdOffsets,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageView {
    #[serde(rename = "type")]
    pub direction: Direction,
    pub name: String,
    /// Listen id for rx, broadcast id from this node for tx
    pub id: String,
    pub mask: String,
    pub signals: Vec<SignalView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignalView {
    pub name: String,
    pub offset: u32,
    pub size: u32,
    #[serde(rename = "type")]
    pub signal_type: String,
    pub endianness: Endianness,
    pub display_type: Option<String>,
    /// Position of the signal in the frame packed as one 64-bit word
    pub bit_offset: u32,
    pub mask: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IdOffsets {
    pub priority: u32,
    pub from_node_id: u32,
    pub to_node_id: u32,
    pub msg_id: u32,
}

impl Default for IdOffsets {
    fn default() -> Self {
        Self {
            priority: PRIORITY_OFFSET,
            from_node_id: FROM_NODE_ID_OFFSET,
            to_node_id: TO_NODE_ID_OFFSET,
            msg_id: MSG_ID_OFFSET,
        }
    }
}

/// Build the context for the instance deployed under `instance_id`
pub fn node_context(network: &Network, instance_id: u8) -> Option<NodeContext> {
    network.instance_by_id(instance_id).map(instance_context)
}

/// Build the context for one node instance
pub fn instance_context(instance: &NodeInstance) -> NodeContext {
    let node = &instance.node;

    let rx = node
        .rx_messages
        .iter()
        .map(|m| message_view(m, Direction::Rx, m.listen_id()));
    let tx = node
        .tx_messages
        .iter()
        .map(|m| message_view(m, Direction::Tx, m.broadcast_id(instance.id)));
    let messages: Vec<MessageView> = rx.chain(tx).collect();

    NodeContext {
        node_id: format!("{:#x}", instance.id),
        node: node.name.clone(),
        description: instance.name.clone(),
        number_of_messages: messages.len(),
        messages,
        message_id_offsets: IdOffsets::default(),
    }
}

fn message_view(message: &Message, direction: Direction, id: u32) -> MessageView {
    MessageView {
        direction,
        name: message.name.clone(),
        id: format!("{:#x}", id),
        mask: format!("{:#x}", message.mask()),
        signals: message.signals.iter().map(signal_view).collect(),
    }
}

fn signal_view(signal: &Signal) -> SignalView {
    let (bit_offset, mask) = signal
        .words(INJECT_WORD_WIDTH)
        .next()
        .map(|word| (word.bit_offset, word.mask))
        .unwrap_or((0, 0));

    SignalView {
        name: signal.name.clone(),
        offset: signal.offset,
        size: signal.size,
        signal_type: signal.signal_type.clone(),
        endianness: signal.endianness,
        display_type: signal.display_type.clone(),
        bit_offset,
        mask: format!("{:#x}", mask),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network() -> Network {
        let mut network = Network::new();
        network
            .add_message(
                Message::new(0x10, "Speed", 0x3)
                    .with_signal(Signal::new("rpm", 0, 16))
                    .with_signal(Signal::new("state", 16, 2)),
            )
            .unwrap();
        network
            .add_message(Message::new(0x20, "Command", 0x1).with_signal(Signal::new("target", 4, 8)))
            .unwrap();
        network.add_node("Motor", &["Command"], &["Speed"]).unwrap();
        network.add_instance(0x07, "Front motor", "Motor").unwrap();
        network
    }

    #[test]
    fn test_rx_then_tx_with_node_ids() {
        let context = node_context(&network(), 0x07).unwrap();

        assert_eq!(context.node_id, "0x7");
        assert_eq!(context.node, "Motor");
        assert_eq!(context.description, "Front motor");
        assert_eq!(context.number_of_messages, 2);

        let command = &context.messages[0];
        assert_eq!(command.direction, Direction::Rx);
        assert_eq!(command.id, "0x2000001");
        assert_eq!(command.mask, "0x2000000");

        let speed = &context.messages[1];
        assert_eq!(speed.direction, Direction::Tx);
        assert_eq!(speed.id, "0x1000073");
        assert_eq!(speed.signals[1].bit_offset, 16);
        assert_eq!(speed.signals[1].mask, "0x30000");
    }

    #[test]
    fn test_unknown_instance() {
        assert!(node_context(&network(), 0x08).is_none());
    }

    #[test]
    fn test_serialized_shape() {
        let context = node_context(&network(), 0x07).unwrap();
        let json = serde_json::to_value(&context).unwrap();

        assert_eq!(json["messages"][0]["type"], "rx");
        assert_eq!(json["messages"][0]["signals"][0]["type"], "uint");
        assert_eq!(json["messages"][0]["signals"][0]["mask"], "0xff0");
        assert_eq!(json["message_id_offsets"]["from_node_id"], 4);
        assert_eq!(json["message_id_offsets"]["to_node_id"], 12);
    }
}
