//! Node storage: one ordered table of byte blobs per file.

use crate::name::Name;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One addressable blob within a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: u64,
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
    /// Account billed for this row. Set on insert, kept on overwrite.
    pub payer: Name,
}

/// The nodes of a single file, ordered by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeTable {
    pub(crate) nodes: BTreeMap<u64, Node>,
}

impl NodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: u64) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Insert a node or overwrite its data in place.
    ///
    /// Returns true if a new row was created.
    pub fn upsert(&mut self, id: u64, data: Vec<u8>, payer: Name) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => {
                node.data = data;
                false
            }
            None => {
                self.nodes.insert(id, Node { id, data, payer });
                true
            }
        }
    }

    pub fn remove(&mut self, id: u64) -> Option<Node> {
        self.nodes.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over nodes in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Node ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.nodes.keys().copied()
    }

    /// Total payload bytes across all nodes.
    pub fn data_len(&self) -> u64 {
        self.nodes.values().map(|node| node.data.len() as u64).sum()
    }
}

/// Hex encoding for byte payloads in JSON snapshots.
pub(crate) mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Name {
        Name::parse("alice").unwrap()
    }

    #[test]
    fn test_upsert_inserts_then_overwrites() {
        let mut table = NodeTable::new();

        assert!(table.upsert(7, b"first".to_vec(), alice()));
        assert!(!table.upsert(7, b"second".to_vec(), Name::parse("bob").unwrap()));

        let node = table.get(7).unwrap();
        assert_eq!(node.data, b"second");
        // Payer is not re-attributed on overwrite
        assert_eq!(node.payer, alice());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_empty_data() {
        let mut table = NodeTable::new();
        table.upsert(0, Vec::new(), alice());
        assert_eq!(table.get(0).unwrap().data, Vec::<u8>::new());
        assert_eq!(table.data_len(), 0);
    }

    #[test]
    fn test_ids_are_ordered() {
        let mut table = NodeTable::new();
        for id in [42, 3, u64::MAX, 0] {
            table.upsert(id, vec![1, 2], alice());
        }
        assert_eq!(table.ids().collect::<Vec<_>>(), vec![0, 3, 42, u64::MAX]);
        assert_eq!(table.data_len(), 8);
    }

    #[test]
    fn test_remove() {
        let mut table = NodeTable::new();
        table.upsert(1, vec![9], alice());

        assert!(table.remove(1).is_some());
        assert!(table.remove(1).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn test_serde_hex_data() {
        let mut table = NodeTable::new();
        table.upsert(5, vec![0xde, 0xad, 0xbe, 0xef], alice());

        let json = serde_json::to_string(&table).unwrap();
        assert!(json.contains("\"deadbeef\""));

        let parsed: NodeTable = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, table);
    }
}
