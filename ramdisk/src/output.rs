//! Output formatting for CLI commands.
//!
//! Provides abstraction layer for outputting results in text or JSON format.

use anyhow::Result;
use ramdisk_core::{FileRecord, JournalEntry, Name, NameBid, Node, Outcome, RamUsage};
use serde::Serialize;
use std::io::{self, Write};

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Writer for command output with format abstraction.
pub struct OutputWriter {
    format: OutputFormat,
    stdout: io::Stdout,
}

impl OutputWriter {
    /// Create a new OutputWriter.
    pub fn new(json: bool) -> Self {
        Self {
            format: if json {
                OutputFormat::Json
            } else {
                OutputFormat::Text
            },
            stdout: io::stdout(),
        }
    }

    /// Check if JSON mode is enabled.
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Write output using the configured format.
    ///
    /// The `data` parameter must be a serializable struct that includes
    /// `success: bool` and `result_code: u8` fields.
    ///
    /// The `text_fn` closure is called only in text mode to generate the
    /// human-readable output.
    pub fn write<T: Serialize>(&self, data: &T, text_fn: impl FnOnce() -> String) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(data)?;
                writeln!(&self.stdout, "{}", json)?;
            }
            OutputFormat::Text => {
                let text = text_fn();
                if !text.is_empty() {
                    write!(&self.stdout, "{}", text)?;
                }
            }
        }
        Ok(())
    }

    /// Write raw bytes to stdout (text mode only).
    pub fn write_raw(&self, data: &[u8]) -> Result<()> {
        let mut handle = self.stdout.lock();
        handle.write_all(data)?;
        handle.flush()?;
        Ok(())
    }

    /// Write an error message to stderr.
    ///
    /// In JSON mode, writes a JSON error object with success=false.
    /// In text mode, writes the error message directly.
    pub fn write_error(&self, error: &anyhow::Error, result_code: u8) {
        match self.format {
            OutputFormat::Json => {
                let error_output = ErrorOutput {
                    success: false,
                    result_code,
                    error: format!("{:#}", error),
                };
                if let Ok(json) = serde_json::to_string_pretty(&error_output) {
                    let _ = writeln!(io::stderr(), "{}", json);
                }
            }
            OutputFormat::Text => {
                let _ = writeln!(io::stderr(), "Error: {:#}", error);
            }
        }
    }
}

// ============================================================================
// Data Transfer Objects (DTOs) for JSON output
// ============================================================================

/// Error output structure.
#[derive(Debug, Serialize)]
pub struct ErrorOutput {
    pub success: bool,
    pub result_code: u8,
    pub error: String,
}

/// Output for `init` command.
#[derive(Debug, Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub result_code: u8,
    pub root: String,
    pub system: Name,
    pub max_node_size: usize,
}

/// Output for the ramdisk actions.
#[derive(Debug, Serialize)]
pub struct ActionOutput {
    pub success: bool,
    pub result_code: u8,
    pub action: String,
    pub owner: Name,
    pub filename: Name,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// File information for `ls`.
#[derive(Debug, Clone, Serialize)]
pub struct FileInfo {
    pub filename: Name,
    pub owner: String,
    pub immutable: bool,
    pub payer: Name,
}

impl FileInfo {
    pub fn new(filename: Name, record: &FileRecord) -> Self {
        Self {
            filename,
            owner: record.owner.to_string(),
            immutable: record.owner.is_immutable(),
            payer: record.payer,
        }
    }
}

/// Node information for `ls <file>`.
#[derive(Debug, Clone, Serialize)]
pub struct NodeInfo {
    pub id: u64,
    pub size: usize,
}

impl From<&Node> for NodeInfo {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id,
            size: node.data.len(),
        }
    }
}

/// Data variants for `ls` command.
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum LsData {
    FileList { files: Vec<FileInfo> },
    NodeList { filename: Name, nodes: Vec<NodeInfo> },
}

/// Output for `ls` command.
#[derive(Debug, Serialize)]
pub struct LsOutput {
    pub success: bool,
    pub result_code: u8,
    #[serde(flatten)]
    pub data: LsData,
}

/// Output for `cat` command in JSON mode.
#[derive(Debug, Serialize)]
pub struct CatOutput {
    pub success: bool,
    pub result_code: u8,
    pub filename: Name,
    pub id: u64,
    pub data: String,
}

/// Output for `stat` command.
#[derive(Debug, Serialize)]
pub struct StatOutput {
    pub success: bool,
    pub result_code: u8,
    #[serde(flatten)]
    pub file: FileInfo,
    pub node_count: usize,
    pub data_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_id: Option<u64>,
}

/// Output for `usage` command.
#[derive(Debug, Serialize)]
pub struct UsageOutput {
    pub success: bool,
    pub result_code: u8,
    pub account: Name,
    #[serde(flatten)]
    pub usage: RamUsage,
}

/// Journal entry information.
#[derive(Debug, Clone, Serialize)]
pub struct JournalEntryInfo {
    pub timestamp: i64,
    pub timestamp_human: String,
    pub action: String,
    pub owner: Name,
    pub filename: Name,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl From<JournalEntry> for JournalEntryInfo {
    fn from(entry: JournalEntry) -> Self {
        let timestamp_human = chrono::DateTime::from_timestamp(entry.timestamp, 0)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| entry.timestamp.to_string());
        Self {
            timestamp: entry.timestamp,
            timestamp_human,
            action: entry.action,
            owner: entry.owner,
            filename: entry.filename,
            detail: (!entry.detail.is_empty()).then_some(entry.detail),
        }
    }
}

/// Output for `journal` command.
#[derive(Debug, Serialize)]
pub struct JournalOutput {
    pub success: bool,
    pub result_code: u8,
    pub entries: Vec<JournalEntryInfo>,
}

/// Output for `system account` command.
#[derive(Debug, Serialize)]
pub struct SystemAccountOutput {
    pub success: bool,
    pub result_code: u8,
    pub account: Name,
}

/// Output for `system bid` command.
#[derive(Debug, Serialize)]
pub struct SystemBidOutput {
    pub success: bool,
    pub result_code: u8,
    #[serde(flatten)]
    pub bid: NameBid,
    pub open: bool,
}

/// Output for `system list` command.
#[derive(Debug, Serialize)]
pub struct SystemListOutput {
    pub success: bool,
    pub result_code: u8,
    pub system: Name,
    pub accounts: Vec<Name>,
    pub bids: Vec<NameBid>,
}
