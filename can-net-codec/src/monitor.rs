//! Live frame monitor
//!
//! Aggregates observed frames per full arbitration identifier (so different
//! sender/receiver pairs of one message type are tracked separately), decodes
//! payloads of known messages and renders a textual summary.
//!
//! Decode problems never propagate: malformed lines are dropped, unknown
//! identifiers are shown by their hex value only, and unresolvable enum
//! values render as `UNKNOWN`. Each case is counted in [`Diagnostics`].

use crate::frame::{RawFrame, PAYLOAD_LEN};
use crate::identifier::{self, CanId};
use crate::network::{Message, Network};
use crate::types::Timestamp;
use chrono::Duration;
use std::collections::{BTreeSet, HashMap};
use std::fmt::Write;
use std::sync::Arc;

/// Placeholder for enum values with no matching member
pub const UNKNOWN_VALUE: &str = "UNKNOWN";

/// Aggregated state of one arbitration identifier
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRecord {
    pub can_id: u32,
    pub count: u64,
    pub last_received: Timestamp,
    /// Time since the previous observation (zero on the first one)
    pub time_delta: Duration,
    pub payload: [u8; PAYLOAD_LEN],
    /// Decoded signals, if the message id is known
    pub decoded: Option<DecodedMessage>,
}

/// A payload decoded through its message definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMessage {
    pub name: String,
    pub fields: Vec<DecodedField>,
}

/// One decoded signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedField {
    pub name: String,
    pub raw: u64,
    /// Enum member name, `UNKNOWN`, or zero-padded hex
    pub display: String,
}

/// Counters for silently handled decode problems
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub observed: u64,
    pub malformed_lines: u64,
    pub unknown_identifiers: u64,
    pub unresolved_enum_values: u64,
}

/// Per-identifier aggregation of a live frame stream
pub struct FrameMonitor {
    network: Arc<Network>,
    /// Records in first-seen order
    records: Vec<FrameRecord>,
    index: HashMap<u32, usize>,
    diagnostics: Diagnostics,
}

impl FrameMonitor {
    pub fn new(network: Arc<Network>) -> Self {
        Self {
            network,
            records: Vec::new(),
            index: HashMap::new(),
            diagnostics: Diagnostics::default(),
        }
    }

    /// Apply one raw PDU line received at `received`
    ///
    /// Returns the updated record, or `None` if the line was malformed.
    pub fn observe_line(&mut self, line: &[u8], received: Timestamp) -> Option<&FrameRecord> {
        match RawFrame::parse(line) {
            Ok(frame) => Some(self.observe(&frame, received)),
            Err(e) => {
                log::trace!("Dropping malformed line: {}", e);
                self.diagnostics.malformed_lines += 1;
                None
            }
        }
    }

    /// Apply one decoded frame received at `received`
    pub fn observe(&mut self, frame: &RawFrame, received: Timestamp) -> &FrameRecord {
        self.diagnostics.observed += 1;

        let decoded = self.decode(frame.can_id, &frame.payload);
        if decoded.is_none() {
            self.diagnostics.unknown_identifiers += 1;
        }

        match self.index.get(&frame.can_id) {
            Some(&i) => {
                let previous = &self.records[i];
                let record = FrameRecord {
                    can_id: frame.can_id,
                    count: previous.count + 1,
                    last_received: received,
                    time_delta: received - previous.last_received,
                    payload: frame.payload,
                    decoded,
                };
                self.records[i] = record;
                &self.records[i]
            }
            None => {
                let i = self.records.len();
                self.index.insert(frame.can_id, i);
                self.records.push(FrameRecord {
                    can_id: frame.can_id,
                    count: 1,
                    last_received: received,
                    time_delta: Duration::zero(),
                    payload: frame.payload,
                    decoded,
                });
                &self.records[i]
            }
        }
    }

    fn decode(&mut self, can_id: u32, payload: &[u8]) -> Option<DecodedMessage> {
        let network = Arc::clone(&self.network);
        let message = network.message_for_can_id(can_id)?;

        let fields = message
            .decode_signals(payload)
            .map(|(signal, raw)| {
                let value_table = signal
                    .display_type
                    .as_deref()
                    .and_then(|name| network.enum_by_name(name));

                let display = match value_table {
                    Some(table) => match table.name_of(raw) {
                        Some(member) => member.to_string(),
                        None => {
                            self.diagnostics.unresolved_enum_values += 1;
                            UNKNOWN_VALUE.to_string()
                        }
                    },
                    None => format!("0x{:0width$X}", raw, width = signal.hex_digits()),
                };

                DecodedField {
                    name: signal.name.clone(),
                    raw,
                    display,
                }
            })
            .collect();

        Some(DecodedMessage {
            name: message.name.clone(),
            fields,
        })
    }

    pub fn record(&self, can_id: u32) -> Option<&FrameRecord> {
        self.index.get(&can_id).map(|&i| &self.records[i])
    }

    /// Records in first-seen order
    pub fn records(&self) -> &[FrameRecord] {
        &self.records
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.diagnostics
    }

    pub fn network(&self) -> &Arc<Network> {
        &self.network
    }

    fn message_for(&self, can_id: u32) -> Option<&Message> {
        self.network.message_for_can_id(can_id).map(|m| m.as_ref())
    }

    /// One summary line for a record
    pub fn render_row(&self, record: &FrameRecord) -> String {
        let id = CanId(record.can_id);
        let name = self
            .message_for(record.can_id)
            .map(|message| message.name.as_str())
            .unwrap_or("-");

        format!(
            "0x{:02X} | 0x{:02X} => 0x{:02X} | {:>5} | {} | {} | {}",
            id.msg_id(),
            id.sender(),
            id.receiver(),
            record.count,
            record.last_received.format("%H:%M:%S"),
            format_delta(record.time_delta),
            name
        )
    }

    /// Summary lines for every record, in first-seen order
    pub fn render_table(&self) -> Vec<String> {
        self.records.iter().map(|r| self.render_row(r)).collect()
    }

    /// Detail block for one record
    ///
    /// Known messages get a headline with receiver and sender followed by one
    /// `name: value` line per signal. Unknown identifiers render as their bare
    /// hex value.
    pub fn render_details(&self, record: &FrameRecord) -> String {
        let mut text = String::new();

        match &record.decoded {
            Some(decoded) => {
                let _ = writeln!(
                    text,
                    "{} | To: 0x{:02X} From: 0x{:02X}",
                    decoded.name,
                    identifier::decode_receiver(record.can_id),
                    identifier::decode_sender(record.can_id)
                );
                for field in &decoded.fields {
                    let _ = writeln!(text, "{}: {}", field.name, field.display);
                }
            }
            None => {
                let _ = writeln!(text, "0x{:07X}", record.can_id);
            }
        }

        text
    }

    /// Detail blocks for every selected identifier that has been observed
    pub fn render_selection(&self, selection: &Selection) -> String {
        selection
            .iter()
            .filter_map(|can_id| self.record(can_id))
            .map(|record| self.render_details(record))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn format_delta(delta: Duration) -> String {
    let millis = delta.num_milliseconds();
    let sign = if millis < 0 { "-" } else { "" };
    let millis = millis.unsigned_abs();
    format!("{}{}.{:03}s", sign, millis / 1000, millis % 1000)
}

/// Identifiers expanded for detail display
///
/// Independent of aggregation; only affects rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    selected: BTreeSet<u32>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the selection of `can_id`; returns whether it is now selected
    pub fn toggle(&mut self, can_id: u32) -> bool {
        if self.selected.remove(&can_id) {
            false
        } else {
            self.selected.insert(can_id);
            true
        }
    }

    pub fn contains(&self, can_id: u32) -> bool {
        self.selected.contains(&can_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.selected.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}
