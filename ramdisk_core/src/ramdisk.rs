//! The action engine: file registry plus per-file node tables.
//!
//! Every action checks all of its preconditions before touching state, so a
//! call that returns an error leaves the ramdisk exactly as it found it.

use crate::action::{Action, Outcome};
use crate::auth::Authenticator;
use crate::error::{Error, Result};
use crate::file::{FileRecord, Owner};
use crate::name::Name;
use crate::naming::{FULL_NAME_LEN, authorize_filename};
use crate::node::{Node, NodeTable};
use crate::system::NameRegistry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Shortest valid filename.
pub const MIN_FILENAME_LEN: usize = 1;

/// Longest valid filename.
pub const MAX_FILENAME_LEN: usize = FULL_NAME_LEN;

/// All files and their nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ramdisk {
    files: BTreeMap<Name, FileRecord>,
    /// Node tables scoped by file name. Empty tables are dropped.
    nodes: BTreeMap<Name, NodeTable>,
}

impl Ramdisk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one action.
    pub fn apply(
        &mut self,
        action: &Action,
        auth: &dyn Authenticator,
        registry: &dyn NameRegistry,
    ) -> Result<Outcome> {
        match action {
            Action::Create { owner, filename } => {
                self.create(auth, registry, *owner, *filename)?;
                Ok(Outcome::FileCreated)
            }
            Action::Reset { owner, filename } => {
                let count = self.reset(auth, *owner, *filename)?;
                Ok(Outcome::NodesRemoved { count })
            }
            Action::Del { owner, filename } => {
                let nodes_removed = self.del(auth, *owner, *filename)?;
                Ok(Outcome::FileDeleted { nodes_removed })
            }
            Action::SetImmutable { owner, filename } => {
                self.set_immutable(auth, *owner, *filename)?;
                Ok(Outcome::FileFrozen)
            }
            Action::SetNode {
                owner,
                filename,
                nodeid,
                data,
            } => {
                let inserted = self.set_node(auth, *owner, *filename, *nodeid, data.clone())?;
                Ok(Outcome::NodeStored { inserted })
            }
            Action::DelNode {
                owner,
                filename,
                nodeid,
            } => {
                let removed = self.del_node(auth, *owner, *filename, *nodeid)?;
                Ok(Outcome::NodesRemoved {
                    count: usize::from(removed),
                })
            }
            Action::DelNodes {
                owner,
                filename,
                startid,
                endid,
            } => {
                let count = self.del_nodes(auth, *owner, *filename, *startid, *endid)?;
                Ok(Outcome::NodesRemoved { count })
            }
            Action::DelNodec {
                owner,
                filename,
                startid,
                count,
            } => {
                let count = self.del_nodec(auth, *owner, *filename, *startid, *count)?;
                Ok(Outcome::NodesRemoved { count })
            }
        }
    }

    /// Create a file owned by `owner`.
    pub fn create(
        &mut self,
        auth: &dyn Authenticator,
        registry: &dyn NameRegistry,
        owner: Name,
        filename: Name,
    ) -> Result<()> {
        let len = filename.length();
        if !(MIN_FILENAME_LEN..=MAX_FILENAME_LEN).contains(&len) {
            return Err(Error::invalid_argument(format!(
                "Invalid filename: '{}' has {} characters, expected {} to {}",
                filename, len, MIN_FILENAME_LEN, MAX_FILENAME_LEN
            )));
        }

        if !auth.authenticate(owner) {
            return Err(Error::permission_denied(owner));
        }

        if self.files.contains_key(&filename) {
            return Err(Error::already_exists(filename));
        }

        authorize_filename(owner, filename, registry)?;

        self.files.insert(filename, FileRecord::new(owner));
        debug!(%owner, %filename, "file created");
        Ok(())
    }

    /// Delete all nodes of a file, keeping the file.
    pub fn reset(&mut self, auth: &dyn Authenticator, owner: Name, filename: Name) -> Result<usize> {
        self.authorize_owner(auth, owner, filename)?;
        let removed = self.clear_nodes(filename);
        debug!(%filename, removed, "file reset");
        Ok(removed)
    }

    /// Delete a file and all of its nodes.
    pub fn del(&mut self, auth: &dyn Authenticator, owner: Name, filename: Name) -> Result<usize> {
        self.authorize_owner(auth, owner, filename)?;
        self.files.remove(&filename);
        let removed = self.clear_nodes(filename);
        debug!(%filename, removed, "file deleted");
        Ok(removed)
    }

    /// Make a file permanently immutable.
    pub fn set_immutable(
        &mut self,
        auth: &dyn Authenticator,
        owner: Name,
        filename: Name,
    ) -> Result<()> {
        self.authorize_owner(auth, owner, filename)?;
        if let Some(file) = self.files.get_mut(&filename) {
            file.make_immutable();
        }
        debug!(%owner, %filename, "file made immutable");
        Ok(())
    }

    /// Insert or overwrite one node. Returns true if the node is new.
    pub fn set_node(
        &mut self,
        auth: &dyn Authenticator,
        owner: Name,
        filename: Name,
        nodeid: u64,
        data: Vec<u8>,
    ) -> Result<bool> {
        self.authorize_owner(auth, owner, filename)?;
        let size = data.len();
        let inserted = self
            .nodes
            .entry(filename)
            .or_default()
            .upsert(nodeid, data, owner);
        debug!(%filename, nodeid, size, inserted, "node stored");
        Ok(inserted)
    }

    /// Delete one node. A missing node is not an error.
    pub fn del_node(
        &mut self,
        auth: &dyn Authenticator,
        owner: Name,
        filename: Name,
        nodeid: u64,
    ) -> Result<bool> {
        self.authorize_owner(auth, owner, filename)?;
        let removed = self.with_nodes(filename, |table| table.remove(nodeid).is_some());
        debug!(%filename, nodeid, removed, "node deleted");
        Ok(removed)
    }

    /// Delete every existing node with an id in `[startid, endid]`.
    pub fn del_nodes(
        &mut self,
        auth: &dyn Authenticator,
        owner: Name,
        filename: Name,
        startid: u64,
        endid: u64,
    ) -> Result<usize> {
        self.authorize_owner(auth, owner, filename)?;
        let removed = self.with_nodes(filename, |table| table.delete_range(startid, endid));
        debug!(%filename, startid, endid, removed, "node range deleted");
        Ok(removed)
    }

    /// Delete the contiguous run of nodes starting at `startid`.
    ///
    /// Deletion stops at the first missing id. `count` is what the caller
    /// expects to delete; it does not bound the run.
    pub fn del_nodec(
        &mut self,
        auth: &dyn Authenticator,
        owner: Name,
        filename: Name,
        startid: u64,
        count: u64,
    ) -> Result<usize> {
        self.authorize_owner(auth, owner, filename)?;
        let removed = self.with_nodes(filename, |table| table.delete_run(startid));
        debug!(%filename, startid, count, removed, "contiguous node run deleted");
        Ok(removed)
    }

    /// The record for `filename`, if the file exists.
    pub fn file(&self, filename: Name) -> Option<&FileRecord> {
        self.files.get(&filename)
    }

    /// All files in name order.
    pub fn files(&self) -> impl Iterator<Item = (&Name, &FileRecord)> {
        self.files.iter()
    }

    /// One node of a file.
    pub fn node(&self, filename: Name, nodeid: u64) -> Option<&Node> {
        self.nodes.get(&filename).and_then(|table| table.get(nodeid))
    }

    /// The node table of a file, if it has any nodes.
    pub fn nodes(&self, filename: Name) -> Option<&NodeTable> {
        self.nodes.get(&filename)
    }

    /// All non-empty node tables in file name order.
    pub(crate) fn node_tables(&self) -> impl Iterator<Item = (&Name, &NodeTable)> {
        self.nodes.iter()
    }

    /// Check the structure a loaded snapshot must have. Returns the first
    /// violation found.
    pub(crate) fn check_invariants(&self) -> std::result::Result<(), String> {
        if let Some(filename) = self
            .files
            .keys()
            .find(|filename| !(MIN_FILENAME_LEN..=MAX_FILENAME_LEN).contains(&filename.length()))
        {
            return Err(format!("invalid filename '{}'", filename));
        }

        for (filename, table) in &self.nodes {
            if !self.files.contains_key(filename) {
                return Err(format!("nodes stored for missing file {}", filename));
            }
            if table.is_empty() {
                return Err(format!("empty node table for {}", filename));
            }
            if let Some((id, node)) = table.nodes.iter().find(|(id, node)| **id != node.id) {
                return Err(format!(
                    "node {} of {} is stored under id {}",
                    node.id, filename, id
                ));
            }
        }

        Ok(())
    }

    /// Check that the caller controls an existing file.
    fn authorize_owner(&self, auth: &dyn Authenticator, owner: Name, filename: Name) -> Result<()> {
        let file = self
            .files
            .get(&filename)
            .ok_or_else(|| Error::not_found(filename))?;

        if !auth.authenticate(owner) {
            return Err(Error::permission_denied(owner));
        }

        // An immutable owner matches no account
        if file.owner != Owner::Account(owner) {
            return Err(Error::not_owner(owner, filename));
        }

        Ok(())
    }

    fn clear_nodes(&mut self, filename: Name) -> usize {
        self.nodes.remove(&filename).map_or(0, |mut table| table.clear())
    }

    /// Run `f` on a file's node table, dropping the table if it ends up empty.
    fn with_nodes<T: Default>(&mut self, filename: Name, f: impl FnOnce(&mut NodeTable) -> T) -> T {
        let Some(table) = self.nodes.get_mut(&filename) else {
            return T::default();
        };
        let result = f(table);
        if table.is_empty() {
            self.nodes.remove(&filename);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SignerSet;
    use crate::system::{NameBid, SystemRegistry};

    fn name(s: &str) -> Name {
        Name::parse(s).unwrap()
    }

    fn signed(account: &str) -> SignerSet {
        SignerSet::single(name(account))
    }

    /// A ramdisk with `alice` owning the full-length file `alicesfiles1`.
    fn setup() -> (Ramdisk, SystemRegistry, Name) {
        let mut disk = Ramdisk::new();
        let registry = SystemRegistry::new();
        let file = name("alicesfiles1");
        disk.create(&signed("alice"), &registry, name("alice"), file)
            .unwrap();
        (disk, registry, file)
    }

    fn put(disk: &mut Ramdisk, file: Name, ids: &[u64]) {
        for &id in ids {
            disk.set_node(&signed("alice"), name("alice"), file, id, vec![id as u8])
                .unwrap();
        }
    }

    fn node_ids(disk: &Ramdisk, file: Name) -> Vec<u64> {
        disk.nodes(file)
            .map(|table| table.ids().collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_create_once() {
        let (mut disk, registry, file) = setup();

        assert_eq!(disk.file(file).unwrap().owner, Owner::Account(name("alice")));
        let err = disk
            .create(&signed("alice"), &registry, name("alice"), file)
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { .. }));

        let err = disk
            .create(&signed("bob"), &registry, name("bob"), file)
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { .. }));
    }

    #[test]
    fn test_create_invalid_length() {
        let mut disk = Ramdisk::new();
        let registry = SystemRegistry::new();

        let err = disk
            .create(&signed("alice"), &registry, name("alice"), Name::EMPTY)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));

        let err = disk
            .create(&signed("alice"), &registry, name("alice"), name("abcdefghijkla"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }

    #[test]
    fn test_create_requires_authentication() {
        let mut disk = Ramdisk::new();
        let registry = SystemRegistry::new();

        let err = disk
            .create(&signed("bob"), &registry, name("alice"), name("alicesfiles1"))
            .unwrap_err();
        assert!(matches!(err, Error::PermissionDenied { .. }));
        assert!(disk.file(name("alicesfiles1")).is_none());
    }

    #[test]
    fn test_create_naming_checked() {
        let mut disk = Ramdisk::new();
        let mut registry = SystemRegistry::new();
        registry.add_account(name("bob"));
        registry.place_bid(NameBid {
            newname: name("hot"),
            high_bidder: name("alice"),
            high_bid: 1_000,
            last_bid_time: 0,
        });

        let err = disk
            .create(&signed("alice"), &registry, name("alice"), name("bob"))
            .unwrap_err();
        assert!(matches!(err, Error::SuffixNotOwned { .. }));

        let err = disk
            .create(&signed("alice"), &registry, name("alice"), name("hot"))
            .unwrap_err();
        assert!(matches!(err, Error::AuctionOpen { .. }));

        assert!(disk.files().next().is_none());
        disk.create(&signed("bob"), &registry, name("bob"), name("bob"))
            .unwrap();
    }

    #[test]
    fn test_missing_file() {
        let mut disk = Ramdisk::new();
        let err = disk
            .set_node(&signed("alice"), name("alice"), name("nofile"), 1, vec![])
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_owner_checks() {
        let (mut disk, _registry, file) = setup();

        // Bob signs as bob but does not own the file
        let err = disk
            .set_node(&signed("bob"), name("bob"), file, 1, vec![1])
            .unwrap_err();
        assert!(matches!(err, Error::NotOwner { .. }));

        // Bob claims to be alice without her signature
        let err = disk
            .set_node(&signed("bob"), name("alice"), file, 1, vec![1])
            .unwrap_err();
        assert!(matches!(err, Error::PermissionDenied { .. }));

        assert!(disk.nodes(file).is_none());
    }

    #[test]
    fn test_set_node_read_back() {
        let (mut disk, _registry, file) = setup();
        let alice = signed("alice");

        assert!(disk.set_node(&alice, name("alice"), file, 9, b"one".to_vec()).unwrap());
        assert!(!disk.set_node(&alice, name("alice"), file, 9, b"two".to_vec()).unwrap());
        assert_eq!(disk.node(file, 9).unwrap().data, b"two");

        disk.set_node(&alice, name("alice"), file, 9, Vec::new()).unwrap();
        assert_eq!(disk.node(file, 9).unwrap().data, Vec::<u8>::new());
        assert_eq!(disk.node(file, 9).unwrap().payer, name("alice"));
    }

    #[test]
    fn test_del_node_missing_is_noop() {
        let (mut disk, _registry, file) = setup();
        put(&mut disk, file, &[1, 2]);
        let before = disk.clone();

        assert!(!disk.del_node(&signed("alice"), name("alice"), file, 3).unwrap());
        assert_eq!(disk, before);

        assert!(disk.del_node(&signed("alice"), name("alice"), file, 1).unwrap());
        assert_eq!(node_ids(&disk, file), vec![2]);
    }

    #[test]
    fn test_del_nodes_range() {
        let (mut disk, _registry, file) = setup();
        put(&mut disk, file, &[5, 7, 10, 12]);

        let removed = disk
            .del_nodes(&signed("alice"), name("alice"), file, 5, 10)
            .unwrap();
        assert_eq!(removed, 3);
        assert_eq!(node_ids(&disk, file), vec![12]);
    }

    #[test]
    fn test_del_nodec_stops_at_gap() {
        let (mut disk, _registry, file) = setup();
        put(&mut disk, file, &[5, 6, 7, 9]);

        let removed = disk
            .del_nodec(&signed("alice"), name("alice"), file, 5, 100)
            .unwrap();
        assert_eq!(removed, 3);
        assert_eq!(node_ids(&disk, file), vec![9]);
    }

    #[test]
    fn test_del_nodec_count_is_advisory() {
        let (mut disk, _registry, file) = setup();
        put(&mut disk, file, &[0, 1, 2, 3]);

        let removed = disk
            .del_nodec(&signed("alice"), name("alice"), file, 0, 2)
            .unwrap();
        assert_eq!(removed, 4);
        assert!(disk.nodes(file).is_none());
    }

    #[test]
    fn test_reset_keeps_file() {
        let (mut disk, _registry, file) = setup();
        put(&mut disk, file, &[1, 2, 3]);

        assert_eq!(disk.reset(&signed("alice"), name("alice"), file).unwrap(), 3);
        assert!(disk.file(file).is_some());
        assert!(disk.nodes(file).is_none());
    }

    #[test]
    fn test_del_leaves_no_residue() {
        let (mut disk, registry, file) = setup();
        put(&mut disk, file, &[1, 2, 3]);

        assert_eq!(disk.del(&signed("alice"), name("alice"), file).unwrap(), 3);
        assert_eq!(disk, Ramdisk::new());

        // Anyone may now claim the name again
        disk.create(&signed("bob"), &registry, name("bob"), file)
            .unwrap();
        assert!(disk.nodes(file).is_none());
        assert_eq!(disk.file(file).unwrap().owner, Owner::Account(name("bob")));
    }

    #[test]
    fn test_immutable_blocks_everything() {
        let (mut disk, _registry, file) = setup();
        put(&mut disk, file, &[1, 2]);
        let alice = signed("alice");
        let owner = name("alice");

        disk.set_immutable(&alice, owner, file).unwrap();
        assert!(disk.file(file).unwrap().owner.is_immutable());
        let frozen = disk.clone();

        let results = [
            disk.reset(&alice, owner, file).map(|_| ()),
            disk.del(&alice, owner, file).map(|_| ()),
            disk.set_immutable(&alice, owner, file),
            disk.set_node(&alice, owner, file, 3, vec![3]).map(|_| ()),
            disk.del_node(&alice, owner, file, 1).map(|_| ()),
            disk.del_nodes(&alice, owner, file, 0, 10).map(|_| ()),
            disk.del_nodec(&alice, owner, file, 1, 2).map(|_| ()),
        ];
        for result in results {
            assert!(matches!(result, Err(Error::NotOwner { .. })));
        }

        // Not even the empty name gets through
        let err = disk
            .set_node(&SignerSet::new(), Name::EMPTY, file, 3, vec![3])
            .unwrap_err();
        assert!(matches!(err, Error::PermissionDenied { .. }));

        assert_eq!(disk, frozen);
    }

    #[test]
    fn test_files_are_independent() {
        let (mut disk, registry, file) = setup();
        let other = name("bobsfiles123");
        disk.create(&signed("bob"), &registry, name("bob"), other)
            .unwrap();

        put(&mut disk, file, &[1, 2]);
        disk.set_node(&signed("bob"), name("bob"), other, 1, vec![42])
            .unwrap();
        disk.reset(&signed("alice"), name("alice"), file).unwrap();

        assert_eq!(disk.node(other, 1).unwrap().data, vec![42]);
    }

    #[test]
    fn test_apply_dispatch() {
        let mut disk = Ramdisk::new();
        let registry = SystemRegistry::new();
        let alice = signed("alice");
        let owner = name("alice");
        let filename = name("alicesfiles1");

        let outcome = disk
            .apply(&Action::Create { owner, filename }, &alice, &registry)
            .unwrap();
        assert_eq!(outcome, Outcome::FileCreated);

        let outcome = disk
            .apply(
                &Action::SetNode {
                    owner,
                    filename,
                    nodeid: 4,
                    data: vec![1, 2, 3],
                },
                &alice,
                &registry,
            )
            .unwrap();
        assert_eq!(outcome, Outcome::NodeStored { inserted: true });

        let outcome = disk
            .apply(
                &Action::DelNode {
                    owner,
                    filename,
                    nodeid: 4,
                },
                &alice,
                &registry,
            )
            .unwrap();
        assert_eq!(outcome, Outcome::NodesRemoved { count: 1 });

        let outcome = disk
            .apply(&Action::Del { owner, filename }, &alice, &registry)
            .unwrap();
        assert_eq!(outcome, Outcome::FileDeleted { nodes_removed: 0 });
    }

    #[test]
    fn test_serde_snapshot() {
        let (mut disk, _registry, file) = setup();
        put(&mut disk, file, &[1, 300]);

        let json = serde_json::to_string(&disk).unwrap();
        let parsed: Ramdisk = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, disk);
        assert!(parsed.check_invariants().is_ok());
    }

    #[test]
    fn test_check_invariants_rejects_bad_state() {
        let (mut disk, _registry, file) = setup();
        put(&mut disk, file, &[1]);

        let mut orphan = disk.clone();
        orphan.files.remove(&file);
        assert!(orphan.check_invariants().unwrap_err().contains("missing file"));

        let mut empty = disk.clone();
        empty.nodes.get_mut(&file).unwrap().nodes.clear();
        assert!(empty.check_invariants().unwrap_err().contains("empty node table"));

        let mut misfiled = disk.clone();
        let table = misfiled.nodes.get_mut(&file).unwrap();
        let node = table.nodes.remove(&1).unwrap();
        table.nodes.insert(2, node);
        assert!(misfiled.check_invariants().is_err());

        let mut long_name = disk.clone();
        long_name
            .files
            .insert(name("abcdefghijkla"), FileRecord::new(name("alice")));
        assert!(long_name.check_invariants().unwrap_err().contains("invalid filename"));
    }

    // Property-based tests
    use proptest::prelude::*;

    fn arb_short_name() -> impl Strategy<Value = String> {
        "[a-z1-5]{1,12}"
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            max_shrink_iters: 1000,
            ..ProptestConfig::default()
        })]

        /// A valid filename can be created exactly once
        #[test]
        fn prop_create_exactly_once(filename in arb_short_name()) {
            let filename = Name::parse(&filename)?;
            let mut disk = Ramdisk::new();
            let registry = SystemRegistry::new();
            // The filename itself is never a registered account here, so
            // undotted names are free; sign as the suffix to cover both cases
            let owner = filename.suffix();
            let signers = SignerSet::single(owner);

            prop_assert!(disk.create(&signers, &registry, owner, filename).is_ok());
            let second = disk.create(&signers, &registry, owner, filename);
            let already_exists = matches!(second, Err(Error::AlreadyExists { .. }));
            prop_assert!(already_exists, "second create must fail with AlreadyExists");
        }

        /// The last write to a node is what a reader sees
        #[test]
        fn prop_last_write_wins(
            nodeid: u64,
            writes in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 1..5),
        ) {
            let (mut disk, _registry, file) = setup();
            for data in &writes {
                disk.set_node(&signed("alice"), name("alice"), file, nodeid, data.clone())?;
            }
            prop_assert_eq!(&disk.node(file, nodeid).unwrap().data, writes.last().unwrap());
        }

        /// Failed calls never change state
        #[test]
        fn prop_rejected_calls_are_atomic(
            ids in prop::collection::btree_set(0u64..50, 0..20),
            start in 0u64..50,
            end in 0u64..50,
        ) {
            let (mut disk, _registry, file) = setup();
            for &id in &ids {
                disk.set_node(&signed("alice"), name("alice"), file, id, vec![0])?;
            }
            let before = disk.clone();

            prop_assert!(disk.del_nodes(&signed("bob"), name("bob"), file, start, end).is_err());
            prop_assert!(disk.del_nodec(&signed("bob"), name("alice"), file, start, 9).is_err());
            prop_assert!(disk.reset(&signed("bob"), name("bob"), file).is_err());
            prop_assert_eq!(disk, before);
        }
    }
}
