//! Content fingerprint of a network description
//!
//! Per-entity hashes are combined with XOR, so the fingerprint does not depend
//! on the order entities appear in the description. A known consequence: two
//! identical signals in one message cancel each other out.
//!
//! The fingerprint names a frozen, gzip-compressed copy of the fully-resolved
//! description (`<fingerprint>.json.gz`), so configuration drift can be
//! detected by comparing file names alone.

use crate::config::LoadOptions;
use crate::network::{build_network, Enum, Message, Network, NetworkDocument, Node, NodeInstance};
use crate::network::loader::ResolvedDocument;
use crate::network::schema::Entry;
use crate::signal::Signal;
use crate::types::{NetworkError, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const BASE36_DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Width of a rendered fingerprint
pub const FINGERPRINT_WIDTH: usize = 7;

/// Extension of frozen network artifacts
pub const FROZEN_EXTENSION: &str = "json.gz";

/// Rolling hash: `h = 37 * h + b (mod 2^32)` over every byte
pub fn byte_hash(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .fold(0u32, |hash, &b| hash.wrapping_mul(37).wrapping_add(b as u32))
}

/// Base-36 rendering (`0-9A-Z`) left-padded with zeros to 7 characters
pub fn to_base36(value: u32) -> String {
    let mut digits = Vec::with_capacity(FINGERPRINT_WIDTH);
    let mut quotient = value;

    while quotient != 0 {
        digits.push(BASE36_DIGITS[(quotient % 36) as usize]);
        quotient /= 36;
    }
    while digits.len() < FINGERPRINT_WIDTH {
        digits.push(b'0');
    }
    digits.reverse();

    // Only ASCII digits were pushed
    digits.into_iter().map(char::from).collect()
}

/// Deterministic 32-bit content hash
pub trait ContentHash {
    fn content_hash(&self) -> u32;
}

impl ContentHash for Signal {
    fn content_hash(&self) -> u32 {
        byte_hash(format!("{}:{}:{}", self.name, self.size, self.signal_type).as_bytes())
    }
}

impl ContentHash for Message {
    fn content_hash(&self) -> u32 {
        self.signals
            .iter()
            .fold(0, |hash, signal| hash ^ signal.content_hash())
    }
}

impl ContentHash for Node {
    /// Node name combined with its role-tagged message names
    fn content_hash(&self) -> u32 {
        let rx = self
            .rx_messages
            .iter()
            .map(|m| byte_hash(format!("rx:{}", m.name).as_bytes()));
        let tx = self
            .tx_messages
            .iter()
            .map(|m| byte_hash(format!("tx:{}", m.name).as_bytes()));

        rx.chain(tx)
            .fold(byte_hash(self.name.as_bytes()), |hash, h| hash ^ h)
    }
}

impl ContentHash for NodeInstance {
    fn content_hash(&self) -> u32 {
        let binding = byte_hash(format!("{}:{}:{}", self.id, self.name, self.node.name).as_bytes());
        binding ^ self.node.content_hash()
    }
}

impl ContentHash for Enum {
    fn content_hash(&self) -> u32 {
        self.members()
            .iter()
            .map(|(name, value)| byte_hash(format!("{}:{}", name, value).as_bytes()))
            .fold(byte_hash(self.name.as_bytes()), |hash, h| hash ^ h)
    }
}

/// A network fingerprint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub u32);

impl Fingerprint {
    /// Fingerprint of a whole network: messages, node instances and enums
    pub fn of(network: &Network) -> Self {
        let messages = network.messages().iter().map(|m| m.content_hash());
        let instances = network.instances().iter().map(|i| i.content_hash());
        let enums = network.enums().iter().map(|e| e.content_hash());

        Fingerprint(messages.chain(instances).chain(enums).fold(0, |hash, h| hash ^ h))
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    /// File name of the frozen artifact for this fingerprint
    pub fn artifact_name(&self) -> String {
        format!("{}.{}", self, FROZEN_EXTENSION)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_base36(self.0))
    }
}

/// Write the resolved network to `<dir>/<fingerprint>.json.gz`
///
/// Returns the path of the written artifact.
pub fn freeze(network: &Network, dir: &Path) -> Result<PathBuf> {
    let fingerprint = Fingerprint::of(network);
    let path = dir.join(fingerprint.artifact_name());

    log::info!("Freezing network {} to {:?}", fingerprint, path);

    let file = File::create(&path).map_err(|e| NetworkError::io(&path, e))?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::best());

    serde_json::to_writer(&mut encoder, &network.to_document())
        .map_err(|e| NetworkError::json(&path, e))?;

    encoder
        .finish()
        .and_then(|mut writer| writer.flush())
        .map_err(|e| NetworkError::io(&path, e))?;

    Ok(path)
}

/// Load a frozen artifact written by [`freeze`]
///
/// Frozen documents are include-free; any include entry is rejected.
pub fn load_frozen(path: &Path, options: &LoadOptions) -> Result<Network> {
    log::info!("Loading frozen network: {:?}", path);

    let file = File::open(path).map_err(|e| NetworkError::io(path, e))?;
    let document: NetworkDocument = serde_json::from_reader(GzDecoder::new(BufReader::new(file)))
        .map_err(|e| NetworkError::json(path, e))?;

    if document.version != crate::network::SCHEMA_VERSION {
        return Err(NetworkError::UnsupportedVersion(document.version));
    }

    let resolved = ResolvedDocument {
        messages: inline_only(document.messages, path)?,
        nodes: inline_only(document.nodes, path)?,
        enums: inline_only(document.enums, path)?,
        instances: inline_only(document.instances, path)?,
    };

    build_network(resolved, options)
}

fn inline_only<T>(entries: Vec<Entry<T>>, path: &Path) -> Result<Vec<T>> {
    entries
        .into_iter()
        .map(|entry| match entry {
            Entry::Inline(item) => Ok(item),
            Entry::Include(include) => Err(NetworkError::FrozenInclude {
                path: path.to_path_buf(),
                file: include.file,
            }),
        })
        .collect()
}
