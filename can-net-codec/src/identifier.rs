//! CAN arbitration identifier encoding
//!
//! The 29-bit identifier carries four fixed fields:
//!
//! | Field            | Bit offset | Bit width |
//! |------------------|------------|-----------|
//! | priority         | 0          | 4         |
//! | sender node id   | 4          | 8         |
//! | receiver node id | 12         | 8         |
//! | message id       | 20         | 8         |
//!
//! No range validation is performed. Values wider than their field spill into
//! the neighbouring field exactly as the bitwise composition dictates.

use crate::network::Message;
use serde::Serialize;
use std::fmt;

/// Width of a node id field in bits
pub const NODE_ID_SIZE: u32 = 8;
/// Width of the message id field in bits
pub const MSG_ID_SIZE: u32 = 8;
/// Width of the priority field in bits
pub const PRIORITY_SIZE: u32 = 4;

/// Bit offset of the priority field
pub const PRIORITY_OFFSET: u32 = 0;
/// Bit offset of the sender (from-node) id
pub const FROM_NODE_ID_OFFSET: u32 = 4;
/// Bit offset of the receiver (to-node) id
pub const TO_NODE_ID_OFFSET: u32 = 12;
/// Bit offset of the message id
pub const MSG_ID_OFFSET: u32 = 20;

/// Compose an arbitration identifier from its four fields
pub fn encode(msg_id: u32, priority: u32, from_id: u32, to_id: u32) -> u32 {
    (msg_id << MSG_ID_OFFSET)
        | (to_id << TO_NODE_ID_OFFSET)
        | (from_id << FROM_NODE_ID_OFFSET)
        | (priority << PRIORITY_OFFSET)
}

/// Message id carried by an arbitration identifier
pub fn decode_msg_id(can_id: u32) -> u8 {
    ((can_id >> MSG_ID_OFFSET) & 0xFF) as u8
}

/// Receiver (to-node) id carried by an arbitration identifier
pub fn decode_receiver(can_id: u32) -> u8 {
    ((can_id >> TO_NODE_ID_OFFSET) & 0xFF) as u8
}

/// Sender (from-node) id carried by an arbitration identifier
pub fn decode_sender(can_id: u32) -> u8 {
    ((can_id >> FROM_NODE_ID_OFFSET) & 0xFF) as u8
}

/// Priority carried by an arbitration identifier
pub fn decode_priority(can_id: u32) -> u8 {
    ((can_id >> PRIORITY_OFFSET) & 0xF) as u8
}

/// Identifier a node listens on for `message` (sender and receiver zeroed)
pub fn listen_id(message: &Message) -> u32 {
    encode(message.id as u32, message.priority as u32, 0, 0)
}

/// Identifier used when `from_id` broadcasts `message` (receiver zeroed)
pub fn broadcast_id(message: &Message, from_id: u8) -> u32 {
    encode(message.id as u32, message.priority as u32, from_id as u32, 0)
}

/// Receive filter mask isolating the message id field
///
/// Note this is the message id shifted into place, not an all-ones field mask.
pub fn filter_mask(message: &Message) -> u32 {
    (message.id as u32) << MSG_ID_OFFSET
}

/// A decomposed arbitration identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CanId(pub u32);

impl CanId {
    /// Build an identifier from its fields
    pub fn new(msg_id: u8, priority: u8, from_id: u8, to_id: u8) -> Self {
        CanId(encode(
            msg_id as u32,
            priority as u32,
            from_id as u32,
            to_id as u32,
        ))
    }

    pub fn msg_id(&self) -> u8 {
        decode_msg_id(self.0)
    }

    pub fn receiver(&self) -> u8 {
        decode_receiver(self.0)
    }

    pub fn sender(&self) -> u8 {
        decode_sender(self.0)
    }

    pub fn priority(&self) -> u8 {
        decode_priority(self.0)
    }

    /// Raw 32-bit value
    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for CanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

impl From<u32> for CanId {
    fn from(raw: u32) -> Self {
        CanId(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: u8, priority: u8) -> Message {
        Message {
            id,
            name: "Test".to_string(),
            priority,
            signals: Vec::new(),
        }
    }

    #[test]
    fn test_encode_example() {
        let can_id = encode(0x10, 0x3, 0x01, 0x02);
        assert_eq!(can_id, 0x1002013);

        assert_eq!(decode_msg_id(can_id), 0x10);
        assert_eq!(decode_receiver(can_id), 0x02);
        assert_eq!(decode_sender(can_id), 0x01);
        assert_eq!(decode_priority(can_id), 0x3);
    }

    #[test]
    fn test_round_trip_all_fields() {
        for msg_id in [0u8, 1, 0x7F, 0x80, 0xFF] {
            for from_id in 0..=255u8 {
                for to_id in [0u8, 0x42, 0xFF] {
                    for priority in 0..=15u8 {
                        let id = CanId::new(msg_id, priority, from_id, to_id);
                        assert_eq!(id.msg_id(), msg_id);
                        assert_eq!(id.sender(), from_id);
                        assert_eq!(id.receiver(), to_id);
                        assert_eq!(id.priority(), priority);
                    }
                }
            }
        }
    }

    #[test]
    fn test_identifier_fits_29_bits() {
        let id = CanId::new(0xFF, 0xF, 0xFF, 0xFF);
        assert_eq!(id.raw(), 0x0FFF_FFFF);
        assert!(id.raw() < (1 << 29));
    }

    #[test]
    fn test_out_of_range_values_wrap() {
        // A 5-bit priority spills into the sender field
        let can_id = encode(0, 0x1F, 0, 0);
        assert_eq!(decode_priority(can_id), 0xF);
        assert_eq!(decode_sender(can_id), 0x01);
    }

    #[test]
    fn test_message_derived_ids() {
        let msg = message(0x10, 0x3);

        assert_eq!(listen_id(&msg), 0x1000003);
        assert_eq!(broadcast_id(&msg, 0x01), 0x1000013);
        assert_eq!(filter_mask(&msg), 0x1000000);
    }

    #[test]
    fn test_display() {
        assert_eq!(CanId(0x1002013).to_string(), "0x01002013");
    }
}
