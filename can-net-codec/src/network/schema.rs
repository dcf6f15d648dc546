//! Versioned JSON schema of a network description
//!
//! Every list in the document holds entries that are either an inline entity
//! or a reference to another JSON file holding a list of entries of the same
//! kind:
//!
//! ```json
//! {
//!   "version": 1,
//!   "messages": [
//!     { "file": "messages/motor.json" },
//!     { "id": "0x10", "name": "Speed", "priority": "0x3",
//!       "signals": [ { "name": "rpm", "offset": "0x0", "size": "0x10" } ] }
//!   ],
//!   "nodes": [ { "name": "Motor", "rx": [], "tx": ["Speed"] } ],
//!   "enums": [ { "name": "State", "members": { "OFF": "0x0", "ON": "0x1" } } ],
//!   "instances": [ { "id": "0x01", "name": "Front motor", "node": "Motor" } ]
//! }
//! ```
//!
//! Numbers are hex strings (with or without `0x`) or plain JSON integers.

use crate::signal::Endianness;
use serde::de::{self, DeserializeOwned, MapAccess, Unexpected, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;
use std::path::PathBuf;

/// The only schema version understood by this loader
pub const SCHEMA_VERSION: u32 = 1;

fn default_version() -> u32 {
    SCHEMA_VERSION
}

/// Top-level network description document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkDocument {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub messages: Vec<Entry<MessageDef>>,
    #[serde(default)]
    pub nodes: Vec<Entry<NodeDef>>,
    #[serde(default)]
    pub enums: Vec<Entry<EnumDef>>,
    #[serde(default)]
    pub instances: Vec<Entry<InstanceDef>>,
}

/// A list entry: inline entity or include
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged, bound(deserialize = "T: DeserializeOwned"))]
pub enum Entry<T> {
    Include(IncludeRef),
    Inline(T),
}

/// Reference to a JSON file holding a list of entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IncludeRef {
    pub file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDef {
    pub id: Hex<u8>,
    pub name: String,
    pub priority: Hex<u8>,
    #[serde(default)]
    pub signals: Vec<SignalDef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalDef {
    pub name: String,
    pub offset: Hex<u32>,
    pub size: Hex<u32>,
    #[serde(rename = "type", default = "default_signal_type")]
    pub signal_type: String,
    #[serde(default)]
    pub endianness: Endianness,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_type: Option<String>,
}

fn default_signal_type() -> String {
    "uint".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDef {
    pub name: String,
    #[serde(default)]
    pub rx: Vec<String>,
    #[serde(default)]
    pub tx: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumDef {
    pub name: String,
    pub members: EnumMembers,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceDef {
    pub id: Hex<u8>,
    pub name: String,
    pub node: String,
}

/// Parse a hex number, with or without a `0x` prefix
pub fn parse_hex(text: &str) -> Option<u64> {
    let trimmed = text.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    u64::from_str_radix(digits, 16).ok()
}

/// An integer written as a hex string or a JSON number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Hex<T>(pub T);

struct HexVisitor;

impl<'de> Visitor<'de> for HexVisitor {
    type Value = u64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a hex string or an unsigned integer")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<u64, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<u64, E> {
        u64::try_from(v).map_err(|_| E::invalid_value(Unexpected::Signed(v), &self))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<u64, E> {
        parse_hex(v).ok_or_else(|| E::invalid_value(Unexpected::Str(v), &self))
    }
}

impl<'de, T: TryFrom<u64>> Deserialize<'de> for Hex<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = deserializer.deserialize_any(HexVisitor)?;
        T::try_from(raw)
            .map(Hex)
            .map_err(|_| de::Error::custom(format!("value 0x{:X} is out of range", raw)))
    }
}

impl<T: Into<u64> + Copy> Serialize for Hex<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{:X}", self.0.into()))
    }
}

/// Enum members in declaration order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnumMembers(pub Vec<(String, u64)>);

struct MembersVisitor(PhantomData<EnumMembers>);

impl<'de> Visitor<'de> for MembersVisitor {
    type Value = EnumMembers;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of member names to values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<EnumMembers, A::Error> {
        let mut members = Vec::with_capacity(map.size_hint().unwrap_or(0));

        while let Some((name, value)) = map.next_entry::<String, Hex<u64>>()? {
            if members.iter().any(|(existing, _)| *existing == name) {
                return Err(de::Error::custom(format!("duplicate enum member '{}'", name)));
            }
            members.push((name, value.0));
        }

        Ok(EnumMembers(members))
    }
}

impl<'de> Deserialize<'de> for EnumMembers {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(MembersVisitor(PhantomData))
    }
}

impl Serialize for EnumMembers {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, &Hex(*value))?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("0x1F"), Some(0x1F));
        assert_eq!(parse_hex("1F"), Some(0x1F));
        assert_eq!(parse_hex("10"), Some(0x10));
        assert_eq!(parse_hex("0XfF"), Some(0xFF));
        assert_eq!(parse_hex("zz"), None);
    }

    #[test]
    fn test_hex_accepts_strings_and_integers() {
        let from_str: Hex<u8> = serde_json::from_str("\"0x10\"").unwrap();
        let from_int: Hex<u8> = serde_json::from_str("16").unwrap();
        assert_eq!(from_str, from_int);

        // Does not fit a u8
        assert!(serde_json::from_str::<Hex<u8>>("\"0x100\"").is_err());
        assert!(serde_json::from_str::<Hex<u8>>("-1").is_err());
    }

    #[test]
    fn test_hex_serializes_as_string() {
        assert_eq!(serde_json::to_string(&Hex(0x1Fu8)).unwrap(), "\"0x1F\"");
    }

    #[test]
    fn test_entry_variants() {
        let entries: Vec<Entry<NodeDef>> = serde_json::from_str(
            r#"[ {"file": "nodes.json"}, {"name": "Motor", "tx": ["Speed"]} ]"#,
        )
        .unwrap();

        assert!(matches!(&entries[0], Entry::Include(inc) if inc.file == PathBuf::from("nodes.json")));
        match &entries[1] {
            Entry::Inline(node) => {
                assert_eq!(node.name, "Motor");
                assert!(node.rx.is_empty());
                assert_eq!(node.tx, vec!["Speed".to_string()]);
            }
            other => panic!("expected inline node, got {:?}", other),
        }
    }

    #[test]
    fn test_signal_defaults() {
        let signal: SignalDef =
            serde_json::from_str(r#"{"name": "rpm", "offset": "0x0", "size": "0x10"}"#).unwrap();

        assert_eq!(signal.size.0, 16);
        assert_eq!(signal.signal_type, "uint");
        assert_eq!(signal.endianness, Endianness::Little);
        assert_eq!(signal.display_type, None);
    }

    #[test]
    fn test_enum_members_keep_declaration_order() {
        let def: EnumDef = serde_json::from_str(
            r#"{"name": "State", "members": {"ZETA": "0x1", "ALPHA": "0x1", "MID": 2}}"#,
        )
        .unwrap();

        let names: Vec<&str> = def.members.0.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["ZETA", "ALPHA", "MID"]);

        let json = serde_json::to_string(&def.members).unwrap();
        assert_eq!(json, r#"{"ZETA":"0x1","ALPHA":"0x1","MID":"0x2"}"#);
    }

    #[test]
    fn test_document_defaults() {
        let doc: NetworkDocument = serde_json::from_str("{}").unwrap();
        assert_eq!(doc.version, SCHEMA_VERSION);
        assert!(doc.messages.is_empty());
    }
}
