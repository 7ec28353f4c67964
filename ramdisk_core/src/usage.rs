//! Billed storage per payer.
//!
//! The host bills every stored row to a payer. This module reproduces that
//! bill from the current state so tooling can report it; it never blocks an
//! action.

use crate::name::Name;
use crate::ramdisk::Ramdisk;
use serde::Serialize;

/// Fixed per-row cost charged by the host on top of the row payload.
pub const ROW_OVERHEAD: u64 = 108;

/// Payload size of a file row (the owner name).
const FILE_ROW_SIZE: u64 = 8;

/// Storage billed to one account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RamUsage {
    /// Number of billed rows (files and nodes).
    pub rows: u64,
    /// Total billed bytes including row overhead.
    pub bytes: u64,
}

impl RamUsage {
    fn add_row(&mut self, payload: u64) {
        self.rows += 1;
        self.bytes += ROW_OVERHEAD + payload;
    }
}

/// Serialized size of a node row: id, length prefix, then the data.
pub fn node_row_size(data_len: usize) -> u64 {
    8 + varint_len(data_len as u64) + data_len as u64
}

/// Bytes taken by an unsigned LEB128 length prefix.
fn varint_len(mut value: u64) -> u64 {
    let mut len = 1;
    while value >= 0x80 {
        value >>= 7;
        len += 1;
    }
    len
}

impl Ramdisk {
    /// Storage currently billed to `payer`.
    pub fn ram_usage(&self, payer: Name) -> RamUsage {
        let mut usage = RamUsage::default();

        for _ in self.files().filter(|(_, file)| file.payer == payer) {
            usage.add_row(FILE_ROW_SIZE);
        }

        for (_, table) in self.node_tables() {
            for node in table.iter().filter(|node| node.payer == payer) {
                usage.add_row(node_row_size(node.data.len()));
            }
        }

        usage
    }
}
