//! Serial line wire format (PDU)
//!
//! A PDU is an ASCII hex line decoding to exactly 13 bytes:
//!
//! | Bytes | Content                                   |
//! |-------|-------------------------------------------|
//! | 0-3   | arbitration id, little-endian             |
//! | 4-11  | 8-byte payload                            |
//! | 12    | checksum position (present, not verified) |
//!
//! Outgoing frames always carry the constant `A5` in the checksum position
//! rather than a computed checksum.

use crate::identifier::CanId;
use byteorder::{ByteOrder, LittleEndian};

/// Number of bytes a PDU line decodes to
pub const PDU_LEN: usize = 13;

/// Payload length of a frame
pub const PAYLOAD_LEN: usize = 8;

/// Constant emitted in the checksum position of outgoing frames
pub const CHECKSUM_PLACEHOLDER: u8 = 0xA5;

/// Errors raised while decoding a PDU line
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("PDU is not valid hex: {0}")]
    InvalidHex(String),

    #[error("PDU decodes to {0} bytes, expected 13")]
    WrongLength(usize),
}

/// A frame received from the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrame {
    pub can_id: u32,
    pub payload: [u8; PAYLOAD_LEN],
    /// Checksum byte as received (not validated)
    pub checksum: u8,
}

impl RawFrame {
    /// Decode one PDU line; surrounding whitespace and the newline are ignored
    pub fn parse(line: &[u8]) -> Result<Self, FrameError> {
        let text = std::str::from_utf8(line)
            .map_err(|e| FrameError::InvalidHex(e.to_string()))?
            .trim();

        let bytes = hex::decode(text).map_err(|e| FrameError::InvalidHex(e.to_string()))?;
        if bytes.len() != PDU_LEN {
            return Err(FrameError::WrongLength(bytes.len()));
        }

        let mut payload = [0u8; PAYLOAD_LEN];
        payload.copy_from_slice(&bytes[4..12]);

        Ok(RawFrame {
            can_id: LittleEndian::read_u32(&bytes[0..4]),
            payload,
            checksum: bytes[12],
        })
    }

    pub fn id(&self) -> CanId {
        CanId(self.can_id)
    }
}

/// A frame ready to be written to the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutgoingFrame {
    pub can_id: u32,
    /// Payload packed as one integer, byte 0 in the low bits
    pub data: u64,
}

impl OutgoingFrame {
    pub fn new(can_id: u32, data: u64) -> Self {
        Self { can_id, data }
    }

    /// Payload bytes in transmission order
    pub fn payload(&self) -> [u8; PAYLOAD_LEN] {
        let mut payload = [0u8; PAYLOAD_LEN];
        LittleEndian::write_u64(&mut payload, self.data);
        payload
    }

    /// Encode as a newline-terminated PDU line
    pub fn to_pdu(&self) -> String {
        let mut bytes = [0u8; PDU_LEN];
        LittleEndian::write_u32(&mut bytes[0..4], self.can_id);
        LittleEndian::write_u64(&mut bytes[4..12], self.data);
        bytes[12] = CHECKSUM_PLACEHOLDER;

        let mut line = hex::encode_upper(bytes);
        line.push('\n');
        line
    }
}
