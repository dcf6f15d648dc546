//! Network description: model, JSON schema and loader
//!
//! This module contains the in-memory model of a CAN network (messages,
//! nodes, enums, node instances) and the loader that builds it from the
//! versioned JSON description.

pub mod loader;
pub mod model;
pub mod schema;

// Re-export key types for convenience
pub use loader::{build_network, load_network, parse_network, ResolvedDocument};
pub use model::{Enum, Message, Network, NetworkStats, Node, NodeInstance};
pub use schema::{NetworkDocument, SCHEMA_VERSION};
