//! Network model: messages, nodes, enums and node instances
//!
//! A `Network` is built once at load time and shared read-only afterwards.
//! Messages are indexed by id and by name, node instances by numeric id and by
//! name, so every lookup the monitor and dispatcher need is O(1).

use crate::identifier;
use crate::signal::Signal;
use crate::types::{NetworkError, Result};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// A CAN message definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Message id (8 bits, placed at bit 20 of the identifier)
    pub id: u8,
    /// Message name
    pub name: String,
    /// Priority (4 bits, low bits of the identifier)
    pub priority: u8,
    /// Signals in declaration order
    pub signals: Vec<Signal>,
}

impl Message {
    /// Create a message without signals
    pub fn new(id: u8, name: impl Into<String>, priority: u8) -> Self {
        Self {
            id,
            name: name.into(),
            priority,
            signals: Vec::new(),
        }
    }

    /// Builder method: append a signal
    pub fn with_signal(mut self, signal: Signal) -> Self {
        self.signals.push(signal);
        self
    }

    /// Look up a signal by name
    pub fn signal(&self, name: &str) -> Option<&Signal> {
        self.signals.iter().find(|s| s.name == name)
    }

    /// Receive filter mask isolating the message id field
    pub fn mask(&self) -> u32 {
        identifier::filter_mask(self)
    }

    /// Identifier with sender and receiver zeroed
    pub fn listen_id(&self) -> u32 {
        identifier::listen_id(self)
    }

    /// Identifier used when `from_id` broadcasts this message
    pub fn broadcast_id(&self, from_id: u8) -> u32 {
        identifier::broadcast_id(self, from_id)
    }

    /// Extract every signal's raw value from a byte payload
    pub fn decode_signals<'a>(&'a self, payload: &'a [u8]) -> impl Iterator<Item = (&'a Signal, u64)> + 'a {
        self.signals.iter().map(move |signal| (signal, signal.extract(payload)))
    }

    /// Pack signal values into a single 64-bit frame word
    ///
    /// Signals missing from `values` are left at zero; names in `values` that
    /// match no signal are ignored.
    pub fn encode_signals(&self, values: &BTreeMap<String, u64>) -> u64 {
        self.signals
            .iter()
            .filter_map(|signal| values.get(&signal.name).map(|v| signal.inject(*v)))
            .fold(0, |frame, bits| frame | bits)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X} ({})", self.id, self.name)
    }
}

/// A logical participant, defined by the messages it receives and sends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    pub rx_messages: Vec<Arc<Message>>,
    pub tx_messages: Vec<Arc<Message>>,
}

impl Node {
    /// Received messages followed by sent messages
    pub fn all_messages(&self) -> impl Iterator<Item = &Arc<Message>> {
        self.rx_messages.iter().chain(self.tx_messages.iter())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A named value table used to display signal values symbolically
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enum {
    pub name: String,
    members: Vec<(String, u64)>,
}

impl Enum {
    /// Create an enum; members keep their order for reverse lookup
    pub fn new(name: impl Into<String>, members: Vec<(String, u64)>) -> Self {
        Self {
            name: name.into(),
            members,
        }
    }

    /// Members in declaration order
    pub fn members(&self) -> &[(String, u64)] {
        &self.members
    }

    pub fn value_of(&self, member: &str) -> Option<u64> {
        self.members
            .iter()
            .find(|(name, _)| name == member)
            .map(|(_, value)| *value)
    }

    /// First member declared with `value`
    pub fn name_of(&self, value: u64) -> Option<&str> {
        self.members
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(name, _)| name.as_str())
    }
}

impl fmt::Display for Enum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A node definition deployed under a concrete id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInstance {
    pub id: u8,
    pub name: String,
    pub node: Arc<Node>,
}

/// A loaded network description
#[derive(Debug, Clone, Default)]
pub struct Network {
    messages: Vec<Arc<Message>>,
    message_by_id: HashMap<u8, usize>,
    message_by_name: HashMap<String, usize>,

    nodes: Vec<Arc<Node>>,
    node_by_name: HashMap<String, usize>,

    enums: Vec<Enum>,
    enum_by_name: HashMap<String, usize>,

    instances: Vec<NodeInstance>,
    instance_by_id: HashMap<u8, usize>,
    instance_by_name: HashMap<String, usize>,
}

impl Network {
    /// Create an empty network
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message; ids and names must be unique
    pub fn add_message(&mut self, message: Message) -> Result<()> {
        if self.message_by_id.contains_key(&message.id) {
            return Err(NetworkError::DuplicateMessageId(message.id));
        }
        if self.message_by_name.contains_key(&message.name) {
            return Err(NetworkError::DuplicateMessageName(message.name));
        }

        let index = self.messages.len();
        self.message_by_id.insert(message.id, index);
        self.message_by_name.insert(message.name.clone(), index);
        self.messages.push(Arc::new(message));
        Ok(())
    }

    /// Add a node whose rx/tx lists name already-added messages
    pub fn add_node<S: AsRef<str>>(&mut self, name: &str, rx: &[S], tx: &[S]) -> Result<()> {
        if self.node_by_name.contains_key(name) {
            return Err(NetworkError::DuplicateNode(name.to_string()));
        }

        let node = Node {
            name: name.to_string(),
            rx_messages: self.resolve_messages(name, rx)?,
            tx_messages: self.resolve_messages(name, tx)?,
        };

        self.node_by_name.insert(node.name.clone(), self.nodes.len());
        self.nodes.push(Arc::new(node));
        Ok(())
    }

    fn resolve_messages<S: AsRef<str>>(&self, node: &str, names: &[S]) -> Result<Vec<Arc<Message>>> {
        names
            .iter()
            .map(|name| {
                self.message_by_name(name.as_ref())
                    .cloned()
                    .ok_or_else(|| NetworkError::UnknownMessage {
                        node: node.to_string(),
                        message: name.as_ref().to_string(),
                    })
            })
            .collect()
    }

    pub fn add_enum(&mut self, value_table: Enum) -> Result<()> {
        if self.enum_by_name.contains_key(&value_table.name) {
            return Err(NetworkError::DuplicateEnum(value_table.name));
        }

        self.enum_by_name
            .insert(value_table.name.clone(), self.enums.len());
        self.enums.push(value_table);
        Ok(())
    }

    /// Bind an already-added node definition to a deployed id
    pub fn add_instance(&mut self, id: u8, name: &str, node: &str) -> Result<()> {
        if self.instance_by_id.contains_key(&id) {
            return Err(NetworkError::DuplicateInstanceId(id));
        }
        if self.instance_by_name.contains_key(name) {
            return Err(NetworkError::DuplicateInstanceName(name.to_string()));
        }

        let node = self
            .node(node)
            .cloned()
            .ok_or_else(|| NetworkError::UnknownNode {
                instance: name.to_string(),
                node: node.to_string(),
            })?;

        let index = self.instances.len();
        self.instance_by_id.insert(id, index);
        self.instance_by_name.insert(name.to_string(), index);
        self.instances.push(NodeInstance {
            id,
            name: name.to_string(),
            node,
        });
        Ok(())
    }

    /// Messages in insertion order
    pub fn messages(&self) -> &[Arc<Message>] {
        &self.messages
    }

    pub fn message_by_id(&self, id: u8) -> Option<&Arc<Message>> {
        self.message_by_id.get(&id).map(|&i| &self.messages[i])
    }

    pub fn message_by_name(&self, name: &str) -> Option<&Arc<Message>> {
        self.message_by_name.get(name).map(|&i| &self.messages[i])
    }

    /// Message definition for an arbitration identifier, if known
    pub fn message_for_can_id(&self, can_id: u32) -> Option<&Arc<Message>> {
        self.message_by_id(identifier::decode_msg_id(can_id))
    }

    pub fn nodes(&self) -> &[Arc<Node>] {
        &self.nodes
    }

    pub fn node(&self, name: &str) -> Option<&Arc<Node>> {
        self.node_by_name.get(name).map(|&i| &self.nodes[i])
    }

    pub fn enums(&self) -> &[Enum] {
        &self.enums
    }

    pub fn enum_by_name(&self, name: &str) -> Option<&Enum> {
        self.enum_by_name.get(name).map(|&i| &self.enums[i])
    }

    pub fn instances(&self) -> &[NodeInstance] {
        &self.instances
    }

    pub fn instance_by_id(&self, id: u8) -> Option<&NodeInstance> {
        self.instance_by_id.get(&id).map(|&i| &self.instances[i])
    }

    pub fn instance_by_name(&self, name: &str) -> Option<&NodeInstance> {
        self.instance_by_name.get(name).map(|&i| &self.instances[i])
    }

    /// Get network statistics
    pub fn stats(&self) -> NetworkStats {
        NetworkStats {
            num_messages: self.messages.len(),
            num_signals: self.messages.iter().map(|m| m.signals.len()).sum(),
            num_nodes: self.nodes.len(),
            num_enums: self.enums.len(),
            num_instances: self.instances.len(),
        }
    }
}

/// Network statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkStats {
    pub num_messages: usize,
    pub num_signals: usize,
    pub num_nodes: usize,
    pub num_enums: usize,
    pub num_instances: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_network() -> Network {
        let mut network = Network::new();
        network
            .add_message(
                Message::new(0x10, "Speed", 0x3)
                    .with_signal(Signal::new("rpm", 0, 16))
                    .with_signal(Signal::new("state", 16, 2).with_display_type("State")),
            )
            .unwrap();
        network
            .add_message(Message::new(0x20, "Command", 0x1).with_signal(Signal::new("target", 0, 8)))
            .unwrap();
        network.add_node("Motor", &["Command"], &["Speed"]).unwrap();
        network
            .add_enum(Enum::new(
                "State",
                vec![("OFF".to_string(), 0), ("ON".to_string(), 1)],
            ))
            .unwrap();
        network.add_instance(0x01, "Front motor", "Motor").unwrap();
        network
    }

    #[test]
    fn test_lookups() {
        let network = sample_network();

        assert_eq!(network.message_by_id(0x10).unwrap().name, "Speed");
        assert_eq!(network.message_by_name("Command").unwrap().id, 0x20);
        assert_eq!(network.message_for_can_id(0x1002013).unwrap().name, "Speed");
        assert!(network.message_for_can_id(0x5500000).is_none());

        let instance = network.instance_by_id(0x01).unwrap();
        assert_eq!(instance.name, "Front motor");
        assert_eq!(instance.node.name, "Motor");
        assert_eq!(network.instance_by_name("Front motor").unwrap().id, 0x01);

        let stats = network.stats();
        assert_eq!(stats.num_messages, 2);
        assert_eq!(stats.num_signals, 3);
        assert_eq!(stats.num_nodes, 1);
    }

    #[test]
    fn test_duplicates_rejected() {
        let mut network = sample_network();

        assert!(matches!(
            network.add_message(Message::new(0x10, "Other", 0)),
            Err(NetworkError::DuplicateMessageId(0x10))
        ));
        assert!(matches!(
            network.add_message(Message::new(0x11, "Speed", 0)),
            Err(NetworkError::DuplicateMessageName(_))
        ));
        assert!(matches!(
            network.add_instance(0x01, "Rear motor", "Motor"),
            Err(NetworkError::DuplicateInstanceId(0x01))
        ));
    }

    #[test]
    fn test_unknown_references() {
        let mut network = sample_network();

        assert!(matches!(
            network.add_node("Brake", &["Missing"], &[]),
            Err(NetworkError::UnknownMessage { .. })
        ));
        assert!(matches!(
            network.add_instance(0x02, "Brake", "Brake"),
            Err(NetworkError::UnknownNode { .. })
        ));
    }

    #[test]
    fn test_message_in_rx_and_tx_of_different_nodes() {
        let mut network = sample_network();
        network.add_node("Controller", &["Speed"], &["Command"]).unwrap();

        let controller = network.node("Controller").unwrap();
        let names: Vec<&str> = controller.all_messages().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Speed", "Command"]);
    }

    #[test]
    fn test_enum_reverse_lookup_first_match() {
        let table = Enum::new(
            "Mode",
            vec![
                ("IDLE".to_string(), 0),
                ("STOPPED".to_string(), 0),
                ("RUN".to_string(), 2),
            ],
        );

        assert_eq!(table.name_of(0), Some("IDLE"));
        assert_eq!(table.name_of(2), Some("RUN"));
        assert_eq!(table.name_of(7), None);
        assert_eq!(table.value_of("STOPPED"), Some(0));
    }

    #[test]
    fn test_encode_decode_signals() {
        let network = sample_network();
        let speed = network.message_by_name("Speed").unwrap();

        let mut values = BTreeMap::new();
        values.insert("rpm".to_string(), 0x1234);
        values.insert("state".to_string(), 1);
        values.insert("unknown".to_string(), 0xFF);

        let frame = speed.encode_signals(&values);
        assert_eq!(frame, 0x1_1234);

        let payload = frame.to_le_bytes();
        let decoded: Vec<(&str, u64)> = speed
            .decode_signals(&payload)
            .map(|(s, v)| (s.name.as_str(), v))
            .collect();
        assert_eq!(decoded, vec![("rpm", 0x1234), ("state", 1)]);
    }

    #[test]
    fn test_unmapped_signals_default_to_zero() {
        let network = sample_network();
        let speed = network.message_by_name("Speed").unwrap();
        assert_eq!(speed.encode_signals(&BTreeMap::new()), 0);
    }

    #[test]
    fn test_message_display() {
        assert_eq!(Message::new(0x10, "Speed", 3).to_string(), "0x10 (Speed)");
    }
}
