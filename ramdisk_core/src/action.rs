//! Actions accepted by the ramdisk and their results.

use crate::name::Name;
use crate::node::hex_bytes;
use serde::{Deserialize, Serialize};

/// One call into the ramdisk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Action {
    /// Claim a new file name.
    Create { owner: Name, filename: Name },
    /// Delete every node of a file.
    Reset { owner: Name, filename: Name },
    /// Delete a file and all its nodes.
    Del { owner: Name, filename: Name },
    /// Freeze a file forever.
    SetImmutable { owner: Name, filename: Name },
    /// Insert or overwrite one node.
    SetNode {
        owner: Name,
        filename: Name,
        nodeid: u64,
        #[serde(with = "hex_bytes")]
        data: Vec<u8>,
    },
    /// Delete one node if present.
    DelNode {
        owner: Name,
        filename: Name,
        nodeid: u64,
    },
    /// Delete existing nodes with ids in `[startid, endid]`.
    DelNodes {
        owner: Name,
        filename: Name,
        startid: u64,
        endid: u64,
    },
    /// Delete the contiguous run of nodes beginning at `startid`.
    DelNodec {
        owner: Name,
        filename: Name,
        startid: u64,
        count: u64,
    },
}

impl Action {
    /// The action's name as used in the journal.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Create { .. } => "create",
            Action::Reset { .. } => "reset",
            Action::Del { .. } => "del",
            Action::SetImmutable { .. } => "setimmutable",
            Action::SetNode { .. } => "setnode",
            Action::DelNode { .. } => "delnode",
            Action::DelNodes { .. } => "delnodes",
            Action::DelNodec { .. } => "delnodec",
        }
    }

    /// The account the call claims to act for.
    pub fn owner(&self) -> Name {
        match self {
            Action::Create { owner, .. }
            | Action::Reset { owner, .. }
            | Action::Del { owner, .. }
            | Action::SetImmutable { owner, .. }
            | Action::SetNode { owner, .. }
            | Action::DelNode { owner, .. }
            | Action::DelNodes { owner, .. }
            | Action::DelNodec { owner, .. } => *owner,
        }
    }

    /// The file the call targets.
    pub fn filename(&self) -> Name {
        match self {
            Action::Create { filename, .. }
            | Action::Reset { filename, .. }
            | Action::Del { filename, .. }
            | Action::SetImmutable { filename, .. }
            | Action::SetNode { filename, .. }
            | Action::DelNode { filename, .. }
            | Action::DelNodes { filename, .. }
            | Action::DelNodec { filename, .. } => *filename,
        }
    }

    /// Short summary of the action-specific arguments.
    pub fn detail(&self) -> String {
        match self {
            Action::SetNode { nodeid, data, .. } => format!("node={},size={}", nodeid, data.len()),
            Action::DelNode { nodeid, .. } => format!("node={}", nodeid),
            Action::DelNodes { startid, endid, .. } => format!("start={},end={}", startid, endid),
            Action::DelNodec { startid, count, .. } => {
                format!("start={},count={}", startid, count)
            }
            _ => String::new(),
        }
    }
}

/// What a successful action did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    FileCreated,
    FileFrozen,
    FileDeleted { nodes_removed: usize },
    NodeStored { inserted: bool },
    NodesRemoved { count: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Name {
        Name::parse(s).unwrap()
    }

    #[test]
    fn test_action_accessors() {
        let action = Action::DelNodes {
            owner: name("alice"),
            filename: name("photos"),
            startid: 5,
            endid: 10,
        };
        assert_eq!(action.name(), "delnodes");
        assert_eq!(action.owner(), name("alice"));
        assert_eq!(action.filename(), name("photos"));
        assert_eq!(action.detail(), "start=5,end=10");
    }

    #[test]
    fn test_action_serde() {
        let action = Action::SetNode {
            owner: name("alice"),
            filename: name("photos"),
            nodeid: 1,
            data: vec![0xca, 0xfe],
        };
        let json = serde_json::to_string(&action).unwrap();
        assert!(json.contains(r#""action":"setnode""#));
        assert!(json.contains(r#""data":"cafe""#));

        let parsed: Action = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, action);
    }
}
