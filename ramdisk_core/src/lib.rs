//! # Ramdisk Core
//!
//! Sparse files stored in ledger RAM.
//!
//! An account claims a file name and then stores arbitrary byte blobs
//! ("nodes") in it, each addressed by a caller-chosen 64-bit id. Files are
//! owned by exactly one account and can be frozen forever.
//!
//! ## Features
//!
//! - First-come-first-served file names, interlocked with the name auction
//! - Sparse per-file node tables with range and contiguous-run deletion
//! - Irreversible immutability
//! - All-or-nothing actions with checksummed, atomically written snapshots
//! - Journal of executed actions
//!
//! ## Example
//!
//! ```no_run
//! use ramdisk_core::{Action, Ledger, LedgerConfig, Name, SignerSet};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut ledger = Ledger::init("./my-ledger", LedgerConfig::default())?;
//!
//! let alice = Name::parse("alice")?;
//! let filename = Name::parse("alicesfiles1")?;
//! let signers = SignerSet::single(alice);
//!
//! ledger.execute(&Action::Create { owner: alice, filename }, &signers)?;
//! ledger.execute(
//!     &Action::SetNode { owner: alice, filename, nodeid: 0, data: b"hello".to_vec() },
//!     &signers,
//! )?;
//!
//! let node = ledger.state().node(filename, 0).expect("node stored");
//! assert_eq!(node.data, b"hello");
//! # Ok(())
//! # }
//! ```

mod action;
mod auth;
mod config;
mod error;
mod file;
mod journal;
mod ledger;
mod name;
mod naming;
mod node;
mod ramdisk;
mod range;
mod system;
mod usage;

pub use action::{Action, Outcome};
pub use auth::{Authenticator, SignerSet};
pub use config::{DEFAULT_MAX_NODE_SIZE, LedgerConfig};
pub use error::{Error, Result};
pub use file::{FileRecord, Owner};
pub use journal::{Journal, JournalEntry};
pub use ledger::Ledger;
pub use name::{MAX_NAME_LEN, Name};
pub use naming::authorize_filename;
pub use node::{Node, NodeTable};
pub use ramdisk::{MAX_FILENAME_LEN, MIN_FILENAME_LEN, Ramdisk};
pub use system::{DEFAULT_SYSTEM_ACCOUNT, NameBid, NameRegistry, SystemRegistry};
pub use usage::{ROW_OVERHEAD, RamUsage, node_row_size};
