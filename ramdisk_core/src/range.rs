//! Bulk node deletion.

use crate::node::NodeTable;
use std::collections::BTreeMap;

impl NodeTable {
    /// Delete every existing node with an id in `[start, end]`.
    ///
    /// Gaps inside the range are skipped. Returns the number of nodes removed.
    pub fn delete_range(&mut self, start: u64, end: u64) -> usize {
        if start > end {
            return 0;
        }

        let mut removed = self.nodes.split_off(&start);
        let mut above = match end.checked_add(1) {
            Some(after) => removed.split_off(&after),
            None => BTreeMap::new(),
        };
        self.nodes.append(&mut above);

        removed.len()
    }

    /// Delete the contiguous run of nodes `start, start + 1, ...`.
    ///
    /// Stops at the first missing id. Returns the number of nodes removed.
    pub fn delete_run(&mut self, start: u64) -> usize {
        let mut expected = start;
        let mut removed = 0;

        while self.nodes.remove(&expected).is_some() {
            removed += 1;
            match expected.checked_add(1) {
                Some(next) => expected = next,
                None => break,
            }
        }

        removed
    }

    /// Delete every node. Returns the number of nodes removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.nodes.len();
        self.nodes.clear();
        removed
    }
}
