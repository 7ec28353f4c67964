//! Journal of executed actions.

use crate::action::Action;
use crate::error::{Error, Result};
use crate::name::Name;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// A journal entry recording one executed action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    /// Unix timestamp when the action was executed.
    pub timestamp: i64,
    /// Action name (e.g., "setnode").
    pub action: String,
    /// Account the action was executed for.
    pub owner: Name,
    /// File the action targeted.
    pub filename: Name,
    /// Action-specific arguments (e.g., "node=3,size=1024").
    pub detail: String,
}

impl JournalEntry {
    /// Create a new journal entry.
    pub fn new(
        timestamp: i64,
        action: String,
        owner: Name,
        filename: Name,
        detail: String,
    ) -> Self {
        Self {
            timestamp,
            action,
            owner,
            filename,
            detail,
        }
    }

    /// Create the entry describing `action`.
    pub fn for_action(timestamp: i64, action: &Action) -> Self {
        Self::new(
            timestamp,
            action.name().to_string(),
            action.owner(),
            action.filename(),
            action.detail(),
        )
    }

    /// Serialize the entry to a pipe-delimited line.
    pub fn to_line(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.timestamp, self.action, self.owner, self.filename, self.detail
        )
    }

    /// Parse a journal entry from a pipe-delimited line.
    pub fn from_line(line: &str) -> Result<Self> {
        let parts: Vec<&str> = line.split('|').collect();
        if parts.len() != 5 {
            return Err(Error::invalid_argument(format!(
                "Invalid journal entry format: expected 5 fields, got {}",
                parts.len()
            )));
        }

        let timestamp = parts[0].parse::<i64>().map_err(|_| {
            Error::invalid_argument(format!("Invalid timestamp in journal entry: {}", parts[0]))
        })?;

        Ok(Self {
            timestamp,
            action: parts[1].to_string(),
            owner: Name::parse(parts[2])?,
            filename: Name::parse(parts[3])?,
            detail: parts[4].to_string(),
        })
    }
}

/// Append-only log of executed actions.
#[derive(Debug)]
pub struct Journal {
    path: PathBuf,
}

impl Journal {
    /// Open or create a journal at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            File::create(&path)?;
        }

        Ok(Self { path })
    }

    /// Append an entry to the journal.
    pub fn append(&self, entry: &JournalEntry) -> Result<()> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        writeln!(file, "{}", entry.to_line())?;
        file.flush()?;
        Ok(())
    }

    /// Current journal size in bytes, for rolling back an append.
    pub(crate) fn size(&self) -> Result<u64> {
        Ok(std::fs::metadata(&self.path)?.len())
    }

    /// Cut the journal back to `len` bytes.
    pub(crate) fn truncate(&self, len: u64) -> Result<()> {
        let file = OpenOptions::new().write(true).open(&self.path)?;
        file.set_len(len)?;
        Ok(())
    }

    /// Read every well-formed entry, oldest first.
    fn read_all(&self) -> Result<Vec<JournalEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(&self.path)?);
        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Ok(entry) = JournalEntry::from_line(line) {
                entries.push(entry);
            }
        }

        Ok(entries)
    }

    /// Read the most recent N entries from the journal.
    pub fn read_recent(&self, count: usize) -> Result<Vec<JournalEntry>> {
        let entries = self.read_all()?;
        let skip = entries.len().saturating_sub(count);
        Ok(entries.into_iter().skip(skip).collect())
    }

    /// Every entry that targeted `filename`, oldest first.
    pub fn entries_for(&self, filename: Name) -> Result<Vec<JournalEntry>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|entry| entry.filename == filename)
            .collect())
    }
}
