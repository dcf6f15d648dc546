//! CAN Network Codec Library
//!
//! Encoding, decoding and live monitoring of frames on a CAN network described
//! by a versioned JSON document.
//!
//! # Architecture
//!
//! - `signal` / `identifier`: bit-level signal placement and the 29-bit
//!   arbitration identifier layout
//! - `network`: the in-memory model and the include-resolving JSON loader
//! - `fingerprint`: order-independent digest of a network and the frozen,
//!   content-addressed artifact named after it
//! - `frame` / `transport` / `reader`: the hex line wire format, transport
//!   halves, and the single-reader ingestion worker
//! - `monitor` / `dispatch` / `session`: per-identifier aggregation, key
//!   triggered transmission, and the event-loop state tying them together
//! - `codegen`: read-only context for node firmware templates
//!
//! Terminal rendering, serial port setup and argument parsing live in the
//! application layer (can-net-cli).
//!
//! # Example Usage
//!
//! ```no_run
//! use can_net_codec::{load_network, FrameMonitor, Fingerprint, LoadOptions};
//! use chrono::Utc;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let network = load_network(Path::new("network.json"), &LoadOptions::new()).unwrap();
//! println!("Fingerprint: {}", Fingerprint::of(&network));
//!
//! let mut monitor = FrameMonitor::new(Arc::new(network));
//! monitor.observe_line(b"13200001AB00000000000000A5\n", Utc::now());
//!
//! for row in monitor.render_table() {
//!     println!("{}", row);
//! }
//! ```

// Public modules
pub mod codegen;
pub mod config;
pub mod dispatch;
pub mod fingerprint;
pub mod frame;
pub mod identifier;
pub mod monitor;
pub mod network;
pub mod reader;
pub mod session;
pub mod signal;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use codegen::{node_context, NodeContext};
pub use config::LoadOptions;
pub use dispatch::{DispatchError, KeyAction, KeyActionDispatcher, KeyMapping};
pub use fingerprint::{freeze, load_frozen, Fingerprint};
pub use frame::{FrameError, OutgoingFrame, RawFrame};
pub use identifier::CanId;
pub use monitor::{Diagnostics, FrameMonitor, FrameRecord, Selection};
pub use network::{load_network, parse_network, Enum, Message, Network, NetworkStats, Node, NodeInstance};
pub use reader::{FrameReader, RawLine, ReaderExit};
pub use session::MonitorSession;
pub use signal::{Endianness, Signal};
pub use transport::{BufLineSource, FrameSink, LineSource};
pub use types::{NetworkError, Result, Timestamp};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_basics() {
        // Smoke test: an empty network has no entities and a zero fingerprint
        let network = Network::new();
        assert_eq!(network.stats().num_messages, 0);
        assert_eq!(Fingerprint::of(&network).to_string(), "0000000");
    }
}
