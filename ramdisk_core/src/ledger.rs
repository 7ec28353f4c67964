//! Ledger directory: the host that executes actions and keeps committed state.

use crate::action::{Action, Outcome};
use crate::auth::Authenticator;
use crate::config::LedgerConfig;
use crate::error::{Error, Result};
use crate::journal::{Journal, JournalEntry};
use crate::name::Name;
use crate::ramdisk::Ramdisk;
use crate::system::{NameBid, SystemRegistry};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Prefix of the checksum line at the top of every snapshot.
const CHECKSUM_PREFIX: &str = "blake3=";

/// A ledger directory holding ramdisk state.
///
/// Each call to [`Ledger::execute`] is all-or-nothing: a rejected action
/// writes nothing, and a committed one is persisted before it is journaled.
#[derive(Debug)]
pub struct Ledger {
    root: PathBuf,
    config: LedgerConfig,
    state: Ramdisk,
    registry: SystemRegistry,
    journal: Journal,
}

impl Ledger {
    /// Initialize a new ledger at the given path.
    ///
    /// Creates the layout:
    /// - `config` file with version, system account and node size cap
    /// - `state` snapshot of all files and nodes
    /// - `system/<account>.json` snapshot of the name-auction registry
    /// - `journal` file of executed actions
    pub fn init<P: AsRef<Path>>(root: P, config: LedgerConfig) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        if root.join("state").exists() {
            return Err(Error::invalid_ledger(&root, "ledger already initialized"));
        }

        fs::create_dir_all(root.join("system"))?;
        fs::write(root.join("config"), config.render())?;

        let state = Ramdisk::new();
        write_snapshot(&root.join("state"), &state)?;

        // Keep a registry that is already there (another ledger may share it)
        let registry_path = Self::registry_path_in(&root, config.system_account);
        let registry = if registry_path.exists() {
            read_snapshot(&registry_path)?
        } else {
            let registry = SystemRegistry::new();
            write_snapshot(&registry_path, &registry)?;
            registry
        };

        let journal = Journal::open(root.join("journal"))?;

        info!(root = %root.display(), system = %config.system_account, "ledger initialized");

        Ok(Self {
            root,
            config,
            state,
            registry,
            journal,
        })
    }

    /// Open an existing ledger at the given path.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        if !root.exists() {
            return Err(Error::invalid_ledger(&root, "directory does not exist"));
        }

        let config_path = root.join("config");
        if !config_path.exists() {
            return Err(Error::invalid_ledger(&root, "config file not found"));
        }
        let config = LedgerConfig::parse(&fs::read_to_string(&config_path)?)?;

        let state_path = root.join("state");
        if !state_path.exists() {
            return Err(Error::invalid_ledger(&root, "state snapshot missing"));
        }
        let state: Ramdisk = read_snapshot(&state_path)?;
        state
            .check_invariants()
            .map_err(|reason| Error::corrupted_state(&state_path, reason))?;

        let registry_path = Self::registry_path_in(&root, config.system_account);
        if !registry_path.exists() {
            return Err(Error::invalid_ledger(
                &root,
                format!("no registry for system account {}", config.system_account),
            ));
        }
        let registry = read_snapshot(&registry_path)?;

        let journal = Journal::open(root.join("journal"))?;

        debug!(root = %root.display(), "ledger opened");

        Ok(Self {
            root,
            config,
            state,
            registry,
            journal,
        })
    }

    fn registry_path_in(root: &Path, system_account: Name) -> PathBuf {
        root.join("system").join(format!("{}.json", system_account))
    }

    /// Get the root directory of the ledger.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Committed ramdisk state, for inspection.
    pub fn state(&self) -> &Ramdisk {
        &self.state
    }

    /// The name-auction registry the ledger consults.
    pub fn registry(&self) -> &SystemRegistry {
        &self.registry
    }

    /// Get a reference to the journal.
    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Path of the registry snapshot for the configured system account.
    pub fn registry_path(&self) -> PathBuf {
        Self::registry_path_in(&self.root, self.config.system_account)
    }

    /// Execute one action and commit its effects.
    ///
    /// The action runs against a copy of the state. The new snapshot is
    /// staged, the action is journaled, and only then is the snapshot moved
    /// into place and the copy adopted.
    pub fn execute(&mut self, action: &Action, auth: &dyn Authenticator) -> Result<Outcome> {
        if let Action::SetNode { data, .. } = action {
            self.config.check_node_size(data.len())?;
        }

        let mut next = self.state.clone();
        let outcome = match next.apply(action, auth, &self.registry) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(
                    action = action.name(),
                    owner = %action.owner(),
                    filename = %action.filename(),
                    error = %err,
                    "action rejected"
                );
                return Err(err);
            }
        };

        let state_path = self.root.join("state");
        let staged = stage_snapshot(&state_path, &next)?;

        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs() as i64)
            .unwrap_or_default();
        let journal_mark = self.journal.size()?;

        if let Err(err) = self
            .journal
            .append(&JournalEntry::for_action(timestamp, action))
        {
            self.rollback_journal(journal_mark);
            return Err(err);
        }

        if let Err(err) = staged.persist(&state_path) {
            self.rollback_journal(journal_mark);
            return Err(err.into());
        }

        self.state = next;

        info!(
            action = action.name(),
            owner = %action.owner(),
            filename = %action.filename(),
            ?outcome,
            "action executed"
        );

        Ok(outcome)
    }

    /// Drop a journal entry whose action did not commit.
    fn rollback_journal(&self, mark: u64) {
        if let Err(err) = self.journal.truncate(mark) {
            warn!(error = %err, "failed to roll back journal entry");
        }
    }

    /// Register an account in the local system registry.
    pub fn add_account(&mut self, account: Name) -> Result<()> {
        let mut registry = self.registry.clone();
        registry.add_account(account);
        write_snapshot(&self.registry_path(), &registry)?;
        self.registry = registry;
        debug!(%account, "account registered");
        Ok(())
    }

    /// Record a name-auction bid in the local system registry.
    pub fn place_bid(&mut self, bid: NameBid) -> Result<()> {
        let mut registry = self.registry.clone();
        debug!(newname = %bid.newname, bidder = %bid.high_bidder, amount = bid.high_bid, "bid recorded");
        registry.place_bid(bid);
        write_snapshot(&self.registry_path(), &registry)?;
        self.registry = registry;
        Ok(())
    }
}

/// Write a checksummed JSON snapshot atomically.
fn write_snapshot<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    stage_snapshot(path, value)?.persist(path)?;
    Ok(())
}

/// Write a snapshot next to `path` without replacing it yet.
///
/// Dropping the returned file discards the snapshot.
fn stage_snapshot<T: Serialize>(path: &Path, value: &T) -> Result<NamedTempFile> {
    let payload = serde_json::to_vec(value)?;
    let checksum = hex::encode(blake3::hash(&payload).as_bytes());

    let dir = path
        .parent()
        .ok_or_else(|| Error::invalid_ledger(path, "snapshot path has no parent"))?;
    let mut temp_file = NamedTempFile::new_in(dir)?;
    writeln!(temp_file, "{}{}", CHECKSUM_PREFIX, checksum)?;
    temp_file.write_all(&payload)?;
    temp_file.flush()?;

    Ok(temp_file)
}

/// Read a snapshot written by [`write_snapshot`], verifying its checksum.
fn read_snapshot<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = fs::read(path)?;

    let newline = contents
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| Error::corrupted_state(path, "missing checksum line"))?;
    let (header, payload) = (&contents[..newline], &contents[newline + 1..]);

    let expected = std::str::from_utf8(header)
        .ok()
        .and_then(|line| line.strip_prefix(CHECKSUM_PREFIX))
        .ok_or_else(|| Error::corrupted_state(path, "malformed checksum line"))?;

    let computed = hex::encode(blake3::hash(payload).as_bytes());
    if computed != expected {
        return Err(Error::corrupted_state(
            path,
            format!("Checksum mismatch: expected {}, got {}", expected, computed),
        ));
    }

    serde_json::from_slice(payload)
        .map_err(|e| Error::corrupted_state(path, format!("Invalid snapshot: {}", e)))
}
