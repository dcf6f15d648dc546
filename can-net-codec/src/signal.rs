//! Bit-level signal placement
//!
//! A signal occupies `size` bits starting at bit `offset` of the payload. For
//! a chosen word width the signal is decomposed into the words it touches,
//! each with the bit offset and mask of the part living in that word.
//!
//! Extraction and injection are deliberately asymmetric:
//! - extraction walks every touched byte (`word_width = 8`) in ascending index
//!   order and reassembles the value,
//! - injection packs the whole payload as a single 64-bit word and only uses
//!   the first touched word, so anything beyond the 64-bit frame is dropped.
//!
//! The declared endianness is stored but does not change the byte order of
//! extraction. Bytes are always consumed in ascending index order.

use crate::types::NetworkError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Usable bit width of an 8-byte payload
pub const PAYLOAD_BITS: u32 = 64;

/// Word width used when extracting from a byte-addressed payload
pub const EXTRACT_WORD_WIDTH: u32 = 8;

/// Word width used when packing a whole frame into one integer
pub const INJECT_WORD_WIDTH: u32 = 64;

/// Declared byte order of a signal (stored, not applied)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
    #[default]
    Little,
    Big,
}

impl fmt::Display for Endianness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endianness::Little => write!(f, "little"),
            Endianness::Big => write!(f, "big"),
        }
    }
}

/// A named bit field within a message payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    /// Signal name, unique within its message
    pub name: String,
    /// Index of the first bit
    pub offset: u32,
    /// Width in bits
    pub size: u32,
    /// Semantic type tag (e.g. "uint")
    pub signal_type: String,
    /// Declared byte order
    pub endianness: Endianness,
    /// Name of the enum used to display the value, if any
    pub display_type: Option<String>,
}

/// The part of a signal living in one word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordSlice {
    /// Index of the word within the payload
    pub index: u32,
    /// Offset of the signal's first bit inside this word
    pub bit_offset: u32,
    /// Mask selecting the signal's bits inside this word
    pub mask: u64,
}

impl WordSlice {
    /// Number of signal bits stored in this word
    pub fn bit_count(&self) -> u32 {
        self.mask.count_ones()
    }
}

impl Signal {
    /// Create an unsigned little-endian signal
    pub fn new(name: impl Into<String>, offset: u32, size: u32) -> Self {
        Self {
            name: name.into(),
            offset,
            size,
            signal_type: "uint".to_string(),
            endianness: Endianness::Little,
            display_type: None,
        }
    }

    /// Builder method: display the value through the named enum
    pub fn with_display_type(mut self, display_type: impl Into<String>) -> Self {
        self.display_type = Some(display_type.into());
        self
    }

    /// Index of the first word touched
    pub fn word_offset(&self, width: u32) -> u32 {
        self.offset / width
    }

    /// Number of words needed to hold `size` bits
    pub fn word_count(&self, width: u32) -> u32 {
        self.size.div_ceil(width)
    }

    /// Mask of the signal's bits inside word `word` for the given width
    ///
    /// Offsets are clamped at zero, so a word the signal does not reach yields
    /// an empty mask instead of an error.
    pub fn word_mask(&self, word: u32, width: u32) -> u64 {
        let word_start = word as u64 * width as u64;
        let signal_start = self.offset as u64;
        let signal_end = signal_start + self.size as u64;

        let bit_offset = signal_start.saturating_sub(word_start);
        let trailing_zero_bits = (word_start + width as u64).saturating_sub(signal_end);
        let n_bits = (width as u64)
            .saturating_sub(bit_offset)
            .saturating_sub(trailing_zero_bits);

        if n_bits == 0 || bit_offset >= 64 {
            return 0;
        }

        let field = if n_bits >= 64 {
            u64::MAX
        } else {
            (1u64 << n_bits) - 1
        };

        field << bit_offset
    }

    /// All words touched by the signal, in ascending index order
    pub fn words(&self, width: u32) -> impl Iterator<Item = WordSlice> + '_ {
        debug_assert!(width > 0 && width <= 64, "word width must be 1..=64");

        let first = self.word_offset(width);
        // A zero-sized signal touches nothing
        let last = match (self.offset as u64 + self.size as u64).checked_sub(1) {
            Some(last_bit) if self.size > 0 => {
                Some(u32::try_from(last_bit / width as u64).unwrap_or(u32::MAX))
            }
            _ => None,
        };

        last.into_iter()
            .flat_map(move |last| first..=last)
            .map(move |word| WordSlice {
                index: word,
                // Bounded by `offset`, so it fits back into u32
                bit_offset: (self.offset as u64).saturating_sub(word as u64 * width as u64) as u32,
                mask: self.word_mask(word, width),
            })
    }

    /// Extract the signal's raw value from a byte-addressed payload
    ///
    /// Bytes missing from `payload` read as zero. Each byte's bits land right
    /// after the bits already gathered, so for a multi-byte signal that does
    /// not start on a byte boundary the result differs from shifting the k-th
    /// touched byte by `8 * k`. Byte-aligned signals read the same either way.
    pub fn extract(&self, payload: &[u8]) -> u64 {
        let mut value: u64 = 0;
        let mut shift: u32 = 0;

        let present = self
            .words(EXTRACT_WORD_WIDTH)
            .take_while(|word| (word.index as usize) < payload.len());

        for word in present {
            let byte = payload[word.index as usize] as u64;
            let bits = (byte & word.mask) >> word.bit_offset;

            if shift < 64 {
                value |= bits << shift;
            }
            shift += word.bit_count();
        }

        value
    }

    /// Place `value` into a frame packed as a single 64-bit integer
    ///
    /// Only the first touched word is used. A signal starting beyond the
    /// 64-bit frame contributes nothing, and excess value bits are masked off.
    pub fn inject(&self, value: u64) -> u64 {
        match self.words(INJECT_WORD_WIDTH).next() {
            Some(word) if word.index == 0 => (value << word.bit_offset) & word.mask,
            _ => 0,
        }
    }

    /// Strict validation: reject signals that do not fit in `frame_bits`
    pub fn check_bounds(&self, frame_bits: u32) -> Result<(), NetworkError> {
        if self.size == 0 {
            return Err(NetworkError::InvalidSignalDefinition(format!(
                "signal '{}' has zero size",
                self.name
            )));
        }

        if self.offset as u64 + self.size as u64 > frame_bits as u64 {
            return Err(NetworkError::InvalidSignalDefinition(format!(
                "signal '{}' (offset {}, size {}) exceeds {} bits",
                self.name, self.offset, self.size, frame_bits
            )));
        }

        Ok(())
    }

    /// Number of hex digits needed to display the value
    pub fn hex_digits(&self) -> usize {
        (self.size.div_ceil(4) as usize).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touched_words() {
        let signal = Signal::new("s", 4, 12);
        let words: Vec<WordSlice> = signal.words(8).collect();

        assert_eq!(words.len(), 2);
        assert_eq!(words[0].index, 0);
        assert_eq!(words[0].bit_offset, 4);
        assert_eq!(words[0].mask, 0xF0);
        assert_eq!(words[1].index, 1);
        assert_eq!(words[1].bit_offset, 0);
        assert_eq!(words[1].mask, 0xFF);
    }

    #[test]
    fn test_word_offset_and_count() {
        let signal = Signal::new("s", 20, 17);
        assert_eq!(signal.word_offset(8), 2);
        assert_eq!(signal.word_count(8), 3);
        assert_eq!(signal.word_count(64), 1);
    }

    #[test]
    fn test_masks_cover_signal_exactly() {
        for width in [8u32, 16, 32, 64] {
            for offset in 0..64u32 {
                for size in 1..=(64 - offset) {
                    let signal = Signal::new("s", offset, size);
                    let words: Vec<WordSlice> = signal.words(width).collect();

                    // Every touched word carries at least one bit
                    assert!(words.iter().all(|w| w.mask != 0));

                    let total: u32 = words.iter().map(|w| w.bit_count()).sum();
                    assert_eq!(total, size, "offset {} size {} width {}", offset, size, width);

                    // Placing each mask back at its word position yields no overlap
                    let mut covered: u128 = 0;
                    for w in &words {
                        let placed = (w.mask as u128) << (w.index * width);
                        assert_eq!(covered & placed, 0);
                        covered |= placed;
                    }
                    let expected = ((1u128 << size) - 1) << offset;
                    assert_eq!(covered, expected);
                }
            }
        }
    }

    #[test]
    fn test_extract_aligned() {
        let payload = [0xAB, 0xCD, 0xEF, 0x12, 0, 0, 0, 0];
        assert_eq!(Signal::new("s", 0, 8).extract(&payload), 0xAB);
        assert_eq!(Signal::new("s", 0, 16).extract(&payload), 0xCDAB);
        assert_eq!(Signal::new("s", 8, 16).extract(&payload), 0xEFCD);
    }

    #[test]
    fn test_extract_sub_byte() {
        let payload = [0b1010_0110, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(Signal::new("s", 1, 3).extract(&payload), 0b011);
        assert_eq!(Signal::new("s", 4, 4).extract(&payload), 0b1010);
    }

    #[test]
    fn test_extract_unaligned_cross_byte() {
        // Value 0xABC placed at bit 4
        let payload = [0xC0, 0xAB, 0, 0, 0, 0, 0, 0];
        assert_eq!(Signal::new("s", 4, 12).extract(&payload), 0xABC);
    }

    #[test]
    fn test_extract_ignores_endianness() {
        let payload = [0x34, 0x12, 0, 0, 0, 0, 0, 0];
        let mut signal = Signal::new("s", 0, 16);
        signal.endianness = Endianness::Big;
        assert_eq!(signal.extract(&payload), 0x1234);
    }

    #[test]
    fn test_extract_out_of_range_reads_zero() {
        let payload = [0xFF; 8];
        assert_eq!(Signal::new("s", 64, 8).extract(&payload), 0);
        assert_eq!(Signal::new("s", 60, 8).extract(&payload), 0x0F);
    }

    #[test]
    fn test_inject() {
        assert_eq!(Signal::new("s", 0, 8).inject(0xAB), 0xAB);
        assert_eq!(Signal::new("s", 4, 12).inject(0xABC), 0xABC0);
        // Excess bits are masked off
        assert_eq!(Signal::new("s", 0, 4).inject(0xFF), 0x0F);
        // Signals beyond the frame contribute nothing
        assert_eq!(Signal::new("s", 64, 8).inject(0xFF), 0);
        // Truncated at the end of the 64-bit word
        assert_eq!(Signal::new("s", 60, 8).inject(0xFF), 0xF000_0000_0000_0000);
    }

    #[test]
    fn test_inject_then_extract_round_trip() {
        let cases = [
            (0u32, 1u32),
            (0, 8),
            (3, 5),
            (4, 12),
            (7, 9),
            (13, 30),
            (0, 64),
            (32, 32),
            (63, 1),
        ];

        for (offset, size) in cases {
            let signal = Signal::new("s", offset, size);
            let max = if size == 64 { u64::MAX } else { (1u64 << size) - 1 };

            for value in [0, 1, max / 3, max] {
                let payload = signal.inject(value).to_le_bytes();
                assert_eq!(signal.extract(&payload), value, "offset {} size {}", offset, size);
            }
        }
    }

    #[test]
    fn test_far_offset_is_permissive() {
        let payload = [0xFF; 8];

        let far = Signal::new("far", u32::MAX, 2);
        assert_eq!(far.extract(&payload), 0);
        assert_eq!(far.inject(0xFF), 0);
        let words: Vec<WordSlice> = far.words(8).collect();
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].bit_offset, 7);
        assert_eq!(words[1].bit_offset, 0);

        // A huge size only reads the bytes that exist
        let wide = Signal::new("wide", 4, u32::MAX);
        assert_eq!(wide.extract(&payload), u64::MAX >> 4);
        assert_eq!(wide.inject(u64::MAX), u64::MAX << 4);
    }

    #[test]
    fn test_zero_size_signal_is_permissive() {
        let signal = Signal::new("s", 0, 0);
        assert_eq!(signal.words(8).count(), 0);
        assert_eq!(signal.extract(&[0xFF; 8]), 0);
        assert_eq!(signal.inject(0xFF), 0);
    }

    #[test]
    fn test_check_bounds() {
        assert!(Signal::new("s", 0, 64).check_bounds(PAYLOAD_BITS).is_ok());
        assert!(Signal::new("s", 60, 8).check_bounds(PAYLOAD_BITS).is_err());
        assert!(Signal::new("s", 0, 0).check_bounds(PAYLOAD_BITS).is_err());
    }

    #[test]
    fn test_hex_digits() {
        assert_eq!(Signal::new("s", 0, 1).hex_digits(), 1);
        assert_eq!(Signal::new("s", 0, 4).hex_digits(), 1);
        assert_eq!(Signal::new("s", 0, 5).hex_digits(), 2);
        assert_eq!(Signal::new("s", 0, 12).hex_digits(), 3);
    }
}
