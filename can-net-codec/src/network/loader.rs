//! Network description loader
//!
//! Reads a versioned JSON document, expands `{"file": ...}` includes
//! recursively (relative to the including file), then validates and links
//! everything into a `Network`. Nothing is returned unless the whole
//! description is consistent.

use super::model::{Enum, Message, Network};
use super::schema::{
    EnumDef, EnumMembers, Entry, Hex, InstanceDef, MessageDef, NetworkDocument, NodeDef, SignalDef,
    SCHEMA_VERSION,
};
use crate::config::LoadOptions;
use crate::signal::Signal;
use crate::types::{NetworkError, Result};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

/// A network description with every include expanded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedDocument {
    pub messages: Vec<MessageDef>,
    pub nodes: Vec<NodeDef>,
    pub enums: Vec<EnumDef>,
    pub instances: Vec<InstanceDef>,
}

/// Load a network description file
pub fn load_network(path: &Path, options: &LoadOptions) -> Result<Network> {
    log::info!("Loading network description: {:?}", path);

    let text = fs::read_to_string(path).map_err(|e| NetworkError::io(path, e))?;
    let document: NetworkDocument =
        serde_json::from_str(&text).map_err(|e| NetworkError::json(path, e))?;

    let mut resolver = IncludeResolver::default();
    if let Ok(canonical) = fs::canonicalize(path) {
        resolver.stack.push(canonical);
    }

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let resolved = resolver.resolve_document(document, base_dir)?;
    let network = build_network(resolved, options)?;

    let stats = network.stats();
    log::info!(
        "Network loaded: {} messages, {} signals, {} nodes, {} enums, {} instances",
        stats.num_messages,
        stats.num_signals,
        stats.num_nodes,
        stats.num_enums,
        stats.num_instances
    );

    Ok(network)
}

/// Parse a network description from a JSON string
///
/// Includes are resolved relative to `base_dir`.
pub fn parse_network(text: &str, base_dir: &Path, options: &LoadOptions) -> Result<Network> {
    let document: NetworkDocument =
        serde_json::from_str(text).map_err(|e| NetworkError::json("<inline>", e))?;

    let resolved = IncludeResolver::default().resolve_document(document, base_dir)?;
    build_network(resolved, options)
}

#[derive(Default)]
struct IncludeResolver {
    /// Files currently being expanded, outermost first
    stack: Vec<PathBuf>,
}

impl IncludeResolver {
    fn resolve_document(&mut self, document: NetworkDocument, base_dir: &Path) -> Result<ResolvedDocument> {
        if document.version != SCHEMA_VERSION {
            return Err(NetworkError::UnsupportedVersion(document.version));
        }

        let mut resolved = ResolvedDocument::default();
        self.resolve(document.messages, base_dir, &mut resolved.messages)?;
        self.resolve(document.nodes, base_dir, &mut resolved.nodes)?;
        self.resolve(document.enums, base_dir, &mut resolved.enums)?;
        self.resolve(document.instances, base_dir, &mut resolved.instances)?;
        Ok(resolved)
    }

    fn resolve<T: DeserializeOwned>(
        &mut self,
        entries: Vec<Entry<T>>,
        base_dir: &Path,
        out: &mut Vec<T>,
    ) -> Result<()> {
        for entry in entries {
            match entry {
                Entry::Inline(item) => out.push(item),
                Entry::Include(include) => {
                    let path = base_dir.join(&include.file);
                    log::debug!("Resolving include: {:?}", path);

                    let canonical = fs::canonicalize(&path).map_err(|e| NetworkError::io(&path, e))?;
                    if self.stack.contains(&canonical) {
                        return Err(NetworkError::IncludeCycle(path));
                    }

                    let text = fs::read_to_string(&path).map_err(|e| NetworkError::io(&path, e))?;
                    let nested: Vec<Entry<T>> =
                        serde_json::from_str(&text).map_err(|e| NetworkError::json(&path, e))?;

                    let nested_dir = path.parent().unwrap_or_else(|| Path::new("."));
                    self.stack.push(canonical);
                    self.resolve(nested, nested_dir, out)?;
                    self.stack.pop();
                }
            }
        }

        Ok(())
    }
}

/// Validate and link a resolved document into a `Network`
pub fn build_network(document: ResolvedDocument, options: &LoadOptions) -> Result<Network> {
    let mut network = Network::new();

    for def in document.messages {
        let message = message_from_def(def)?;

        if options.strict_signals {
            for signal in &message.signals {
                signal.check_bounds(options.frame_bits)?;
            }
        }

        network.add_message(message)?;
    }

    for def in document.nodes {
        network.add_node(&def.name, &def.rx, &def.tx)?;
    }

    for def in document.enums {
        network.add_enum(Enum::new(def.name, def.members.0))?;
    }

    for def in document.instances {
        network.add_instance(def.id.0, &def.name, &def.node)?;
    }

    Ok(network)
}

fn message_from_def(def: MessageDef) -> Result<Message> {
    let priority = def.priority.0;
    if priority > 0xF {
        return Err(NetworkError::InvalidPriority {
            message: def.name,
            priority,
        });
    }

    let signals = def
        .signals
        .into_iter()
        .map(|s| Signal {
            name: s.name,
            offset: s.offset.0,
            size: s.size.0,
            signal_type: s.signal_type,
            endianness: s.endianness,
            display_type: s.display_type,
        })
        .collect();

    Ok(Message {
        id: def.id.0,
        name: def.name,
        priority,
        signals,
    })
}

impl Network {
    /// The fully-resolved, include-free document describing this network
    pub fn to_document(&self) -> NetworkDocument {
        let messages = self
            .messages()
            .iter()
            .map(|m| {
                Entry::Inline(MessageDef {
                    id: Hex(m.id),
                    name: m.name.clone(),
                    priority: Hex(m.priority),
                    signals: m
                        .signals
                        .iter()
                        .map(|s| SignalDef {
                            name: s.name.clone(),
                            offset: Hex(s.offset),
                            size: Hex(s.size),
                            signal_type: s.signal_type.clone(),
                            endianness: s.endianness,
                            display_type: s.display_type.clone(),
                        })
                        .collect(),
                })
            })
            .collect();

        let nodes = self
            .nodes()
            .iter()
            .map(|n| {
                Entry::Inline(NodeDef {
                    name: n.name.clone(),
                    rx: n.rx_messages.iter().map(|m| m.name.clone()).collect(),
                    tx: n.tx_messages.iter().map(|m| m.name.clone()).collect(),
                })
            })
            .collect();

        let enums = self
            .enums()
            .iter()
            .map(|e| {
                Entry::Inline(EnumDef {
                    name: e.name.clone(),
                    members: EnumMembers(e.members().to_vec()),
                })
            })
            .collect();

        let instances = self
            .instances()
            .iter()
            .map(|i| {
                Entry::Inline(InstanceDef {
                    id: Hex(i.id),
                    name: i.name.clone(),
                    node: i.node.name.clone(),
                })
            })
            .collect();

        NetworkDocument {
            version: SCHEMA_VERSION,
            messages,
            nodes,
            enums,
            instances,
        }
    }
}
