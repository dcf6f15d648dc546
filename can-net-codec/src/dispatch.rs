//! Key-triggered frame transmission
//!
//! A key symbol maps to zero or more actions, each naming a message and the
//! values of some of its signals. Dispatching a key builds one frame per
//! action, identified as a broadcast from the monitor's own node, and writes
//! it to the transport.

use crate::frame::OutgoingFrame;
use crate::network::Network;
use crate::transport::FrameSink;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One configured transmission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyAction {
    /// Message name
    #[serde(alias = "messageName")]
    pub message: String,
    /// Signal values; unmapped signals are sent as zero
    #[serde(default, alias = "signalValues")]
    pub signals: BTreeMap<String, u64>,
}

impl KeyAction {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            signals: BTreeMap::new(),
        }
    }

    /// Builder method: set one signal value
    pub fn with_signal(mut self, name: impl Into<String>, value: u64) -> Self {
        self.signals.insert(name.into(), value);
        self
    }
}

/// Key symbol to actions
pub type KeyMapping = HashMap<String, Vec<KeyAction>>;

/// Errors raised while dispatching a key action
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Key '{key}' references unknown message '{message}'")]
    UnknownMessage { key: String, message: String },

    #[error("No writable transport")]
    NoTransport,

    #[error("Transport write failed: {0}")]
    Transport(#[from] std::io::Error),
}

/// Outcome of one action
pub type DispatchResult = Result<OutgoingFrame, DispatchError>;

/// Builds and sends the frames bound to key symbols
#[derive(Debug, Clone, Default)]
pub struct KeyActionDispatcher {
    bindings: KeyMapping,
    own_node_id: u8,
}

impl KeyActionDispatcher {
    pub fn new(bindings: KeyMapping, own_node_id: u8) -> Self {
        Self {
            bindings,
            own_node_id,
        }
    }

    pub fn own_node_id(&self) -> u8 {
        self.own_node_id
    }

    pub fn is_bound(&self, key: &str) -> bool {
        self.bindings.contains_key(key)
    }

    /// Bound key symbols, sorted
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.bindings.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Build the frames bound to `key` without sending them
    pub fn frames(&self, key: &str, network: &Network) -> Vec<DispatchResult> {
        self.actions(key)
            .iter()
            .map(|action| self.build(key, action, network))
            .collect()
    }

    /// Build and send the frames bound to `key`
    ///
    /// Returns one result per configured action, in configuration order. An
    /// unbound key yields an empty list. A failed action does not stop the
    /// remaining ones.
    pub fn dispatch(
        &self,
        key: &str,
        network: &Network,
        mut sink: Option<&mut dyn FrameSink>,
    ) -> Vec<DispatchResult> {
        self.actions(key)
            .iter()
            .map(|action| {
                let frame = self.build(key, action, network)?;
                let sink = sink.as_deref_mut().ok_or(DispatchError::NoTransport)?;
                sink.write_frame(&frame)?;
                log::debug!("Key '{}' sent {} as 0x{:08X}", key, action.message, frame.can_id);
                Ok(frame)
            })
            .collect()
    }

    fn actions(&self, key: &str) -> &[KeyAction] {
        self.bindings.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    fn build(&self, key: &str, action: &KeyAction, network: &Network) -> DispatchResult {
        let message = network
            .message_by_name(&action.message)
            .ok_or_else(|| DispatchError::UnknownMessage {
                key: key.to_string(),
                message: action.message.clone(),
            })?;

        Ok(OutgoingFrame::new(
            message.broadcast_id(self.own_node_id),
            message.encode_signals(&action.signals),
        ))
    }
}
