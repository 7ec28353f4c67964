mod output;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use output::*;
use ramdisk_core::{
    Action, DEFAULT_MAX_NODE_SIZE, Ledger, LedgerConfig, Name, NameBid, Owner, SignerSet,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Ramdisk - Sparse files stored in ledger RAM
#[derive(Parser)]
#[command(name = "ramdisk")]
#[command(about = "Store sparse binary files under first-come-first-served names", long_about = None)]
#[command(version)]
struct Cli {
    /// Ledger root directory (defaults to RAMDISK_ROOT env var or ./ramdisk-ledger)
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    /// Output results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Account authorizing the call (repeatable; defaults to the owner argument)
    #[arg(short = 'p', long = "auth", global = true)]
    auth: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FileArgs {
    /// Account acting on the file
    owner: String,

    /// File name (1 to 12 characters)
    filename: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new ledger
    Init {
        /// Account owning the name-auction registry
        #[arg(long, default_value = "eosio")]
        system: String,

        /// Largest accepted node payload in bytes (0 for no limit)
        #[arg(long, default_value_t = DEFAULT_MAX_NODE_SIZE)]
        max_node_size: usize,
    },

    /// Claim a new file name
    Create(FileArgs),

    /// Delete every node of a file
    Reset(FileArgs),

    /// Delete a file and all its nodes
    Del(FileArgs),

    /// Make a file permanently immutable
    #[command(name = "setimmutable")]
    SetImmutable(FileArgs),

    /// Insert or overwrite a node
    #[command(name = "setnode")]
    SetNode {
        #[command(flatten)]
        file: FileArgs,

        /// Node id
        nodeid: u64,

        /// Node data as a hex string
        #[arg(long, conflicts_with = "input", required_unless_present = "input")]
        hex: Option<String>,

        /// Read node data from a file
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Delete a node (no-op if absent)
    #[command(name = "delnode")]
    DelNode {
        #[command(flatten)]
        file: FileArgs,

        /// Node id
        nodeid: u64,
    },

    /// Delete existing nodes with ids in [startid, endid]
    #[command(name = "delnodes")]
    DelNodes {
        #[command(flatten)]
        file: FileArgs,

        /// First id of the range
        startid: u64,

        /// Last id of the range (inclusive)
        endid: u64,
    },

    /// Delete the contiguous run of nodes starting at startid
    #[command(name = "delnodec")]
    DelNodec {
        #[command(flatten)]
        file: FileArgs,

        /// First id of the run
        startid: u64,

        /// Expected number of nodes (the run stops at the first gap)
        count: u64,
    },

    /// List files, or the nodes of one file
    Ls {
        /// File to list nodes of (lists all files if omitted)
        filename: Option<String>,
    },

    /// Output node data to stdout
    Cat {
        /// File name
        filename: String,

        /// Node id
        nodeid: u64,
    },

    /// Show file metadata
    Stat {
        /// File name
        filename: String,
    },

    /// Show storage billed to an account
    Usage {
        /// Account name
        account: String,
    },

    /// Show executed actions
    Journal {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value_t = 20)]
        count: usize,

        /// Only show actions on this file
        #[arg(long)]
        file: Option<String>,
    },

    /// Manage the local system registry (accounts and name auctions)
    #[command(subcommand)]
    System(SystemCommands),
}

#[derive(Subcommand)]
enum SystemCommands {
    /// Register an account
    Account {
        /// Account name
        name: String,
    },

    /// Record a name-auction bid (negative amount = auction closed)
    Bid {
        /// Name being auctioned
        name: String,

        /// High bidder
        bidder: String,

        /// High bid amount
        #[arg(allow_negative_numbers = true)]
        amount: i64,

        /// Time of the last bid (microseconds since the epoch)
        #[arg(long, default_value_t = 0)]
        time: u64,
    },

    /// List registered accounts and bids
    List,
}

fn main() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::WARN.into())
        .from_env_lossy();

    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_filter(env_filter);

    tracing_subscriber::registry().with(stderr_layer).init();

    let cli = Cli::parse();
    let output = OutputWriter::new(cli.json);

    if let Err(err) = run(cli, &output) {
        let code = result_code(&err);
        output.write_error(&err, code);
        std::process::exit(i32::from(code));
    }
}

/// Exit code for an error: 2 for rejected actions, 3 for a broken ledger, 1 otherwise.
fn result_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<ramdisk_core::Error>() {
        Some(e) if e.is_rejection() => 2,
        Some(
            ramdisk_core::Error::InvalidLedger { .. } | ramdisk_core::Error::CorruptedState { .. },
        ) => 3,
        _ => 1,
    }
}

fn run(cli: Cli, output: &OutputWriter) -> Result<()> {
    // Determine ledger root: CLI arg > RAMDISK_ROOT env var > ./ramdisk-ledger default
    let root = cli
        .root
        .or_else(|| std::env::var("RAMDISK_ROOT").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("./ramdisk-ledger"));
    let auth = cli.auth;
    tracing::debug!(root = %root.display(), signers = ?auth, "resolved ledger root");

    match cli.command {
        Commands::Init {
            system,
            max_node_size,
        } => cmd_init(&root, &system, max_node_size, output),
        Commands::Create(file) => {
            let (owner, filename) = file.parse()?;
            execute(&root, &auth, Action::Create { owner, filename }, output)
        }
        Commands::Reset(file) => {
            let (owner, filename) = file.parse()?;
            execute(&root, &auth, Action::Reset { owner, filename }, output)
        }
        Commands::Del(file) => {
            let (owner, filename) = file.parse()?;
            execute(&root, &auth, Action::Del { owner, filename }, output)
        }
        Commands::SetImmutable(file) => {
            let (owner, filename) = file.parse()?;
            execute(&root, &auth, Action::SetImmutable { owner, filename }, output)
        }
        Commands::SetNode {
            file,
            nodeid,
            hex,
            input,
        } => {
            let (owner, filename) = file.parse()?;
            let data = read_node_data(hex.as_deref(), input.as_deref())?;
            let action = Action::SetNode {
                owner,
                filename,
                nodeid,
                data,
            };
            execute(&root, &auth, action, output)
        }
        Commands::DelNode { file, nodeid } => {
            let (owner, filename) = file.parse()?;
            let action = Action::DelNode {
                owner,
                filename,
                nodeid,
            };
            execute(&root, &auth, action, output)
        }
        Commands::DelNodes {
            file,
            startid,
            endid,
        } => {
            let (owner, filename) = file.parse()?;
            let action = Action::DelNodes {
                owner,
                filename,
                startid,
                endid,
            };
            execute(&root, &auth, action, output)
        }
        Commands::DelNodec {
            file,
            startid,
            count,
        } => {
            let (owner, filename) = file.parse()?;
            let action = Action::DelNodec {
                owner,
                filename,
                startid,
                count,
            };
            execute(&root, &auth, action, output)
        }
        Commands::Ls { filename } => cmd_ls(&root, filename.as_deref(), output),
        Commands::Cat { filename, nodeid } => cmd_cat(&root, &filename, nodeid, output),
        Commands::Stat { filename } => cmd_stat(&root, &filename, output),
        Commands::Usage { account } => cmd_usage(&root, &account, output),
        Commands::Journal { count, file } => cmd_journal(&root, count, file.as_deref(), output),
        Commands::System(system_cmd) => match system_cmd {
            SystemCommands::Account { name } => cmd_system_account(&root, &name, output),
            SystemCommands::Bid {
                name,
                bidder,
                amount,
                time,
            } => cmd_system_bid(&root, &name, &bidder, amount, time, output),
            SystemCommands::List => cmd_system_list(&root, output),
        },
    }
}

impl FileArgs {
    fn parse(&self) -> Result<(Name, Name)> {
        Ok((parse_name(&self.owner)?, parse_name(&self.filename)?))
    }
}

fn parse_name(s: &str) -> Result<Name> {
    Name::parse(s).with_context(|| format!("Invalid name: {}", s))
}

fn open_ledger(root: &Path) -> Result<Ledger> {
    Ledger::open(root).with_context(|| format!("Failed to open ledger at {}", root.display()))
}

/// Signers for a call: the `--auth` accounts, or the owner alone.
fn signers(auth: &[String], owner: Name) -> Result<SignerSet> {
    if auth.is_empty() {
        return Ok(SignerSet::single(owner));
    }
    auth.iter().map(|s| parse_name(s)).collect()
}

fn read_node_data(hex_data: Option<&str>, input: Option<&Path>) -> Result<Vec<u8>> {
    match (hex_data, input) {
        (Some(hex_data), _) => {
            hex::decode(hex_data.trim()).with_context(|| "Node data is not valid hex")
        }
        (None, Some(path)) => std::fs::read(path)
            .with_context(|| format!("Failed to read node data from {}", path.display())),
        (None, None) => anyhow::bail!("Either --hex or --input is required"),
    }
}

fn cmd_init(root: &Path, system: &str, max_node_size: usize, output: &OutputWriter) -> Result<()> {
    let config = LedgerConfig {
        system_account: parse_name(system)?,
        max_node_size,
    };

    Ledger::init(root, config)
        .with_context(|| format!("Failed to initialize ledger at {}", root.display()))?;

    let data = InitOutput {
        success: true,
        result_code: 0,
        root: root.display().to_string(),
        system: config.system_account,
        max_node_size,
    };

    output.write(&data, || {
        format!(
            "Initialized ramdisk ledger at {}\nSystem account: {}\n",
            root.display(),
            config.system_account
        )
    })
}

fn execute(root: &Path, auth: &[String], action: Action, output: &OutputWriter) -> Result<()> {
    let mut ledger = open_ledger(root)?;
    let signers = signers(auth, action.owner())?;

    let outcome = ledger
        .execute(&action, &signers)
        .with_context(|| format!("{} failed on {}", action.name(), action.filename()))?;

    let data = ActionOutput {
        success: true,
        result_code: 0,
        action: action.name().to_string(),
        owner: action.owner(),
        filename: action.filename(),
        outcome,
    };

    output.write(&data, || match outcome {
        ramdisk_core::Outcome::FileCreated => format!("Created {}\n", action.filename()),
        ramdisk_core::Outcome::FileFrozen => {
            format!("{} is now immutable\n", action.filename())
        }
        ramdisk_core::Outcome::FileDeleted { nodes_removed } => format!(
            "Deleted {} ({} nodes)\n",
            action.filename(),
            nodes_removed
        ),
        ramdisk_core::Outcome::NodeStored { inserted } => format!(
            "{} node in {}\n",
            if inserted { "Created" } else { "Updated" },
            action.filename()
        ),
        ramdisk_core::Outcome::NodesRemoved { count } => {
            format!("Removed {} nodes from {}\n", count, action.filename())
        }
    })
}

fn cmd_ls(root: &Path, filename: Option<&str>, output: &OutputWriter) -> Result<()> {
    let ledger = open_ledger(root)?;
    let state = ledger.state();

    let Some(filename) = filename else {
        let files: Vec<FileInfo> = state
            .files()
            .map(|(name, record)| FileInfo::new(*name, record))
            .collect();

        let text = if files.is_empty() {
            "No files (use 'ramdisk create' to claim one)\n".to_string()
        } else {
            files
                .iter()
                .map(|f| format!("{} {}\n", f.filename, f.owner))
                .collect()
        };

        let data = LsOutput {
            success: true,
            result_code: 0,
            data: LsData::FileList { files },
        };
        return output.write(&data, || text);
    };

    let filename = parse_name(filename)?;
    if state.file(filename).is_none() {
        return Err(ramdisk_core::Error::not_found(filename).into());
    }

    let nodes: Vec<NodeInfo> = state
        .nodes(filename)
        .map(|table| table.iter().map(NodeInfo::from).collect())
        .unwrap_or_default();

    let text: String = nodes
        .iter()
        .map(|n| format!("{} {} bytes\n", n.id, n.size))
        .collect();

    let data = LsOutput {
        success: true,
        result_code: 0,
        data: LsData::NodeList { filename, nodes },
    };
    output.write(&data, || text)
}

fn cmd_cat(root: &Path, filename: &str, nodeid: u64, output: &OutputWriter) -> Result<()> {
    let ledger = open_ledger(root)?;
    let filename = parse_name(filename)?;

    let node = ledger
        .state()
        .node(filename, nodeid)
        .with_context(|| format!("Node {} not found in {}", nodeid, filename))?;

    if output.is_json() {
        let data = CatOutput {
            success: true,
            result_code: 0,
            filename,
            id: nodeid,
            data: hex::encode(&node.data),
        };
        output.write(&data, String::new)
    } else {
        output.write_raw(&node.data)
    }
}

fn cmd_stat(root: &Path, filename: &str, output: &OutputWriter) -> Result<()> {
    let ledger = open_ledger(root)?;
    let filename = parse_name(filename)?;
    let state = ledger.state();

    let record = state
        .file(filename)
        .ok_or_else(|| ramdisk_core::Error::not_found(filename))?;
    let table = state.nodes(filename);

    let data = StatOutput {
        success: true,
        result_code: 0,
        file: FileInfo::new(filename, record),
        node_count: table.map_or(0, |t| t.len()),
        data_bytes: table.map_or(0, |t| t.data_len()),
        first_id: table.and_then(|t| t.ids().next()),
        last_id: table.and_then(|t| t.ids().last()),
    };

    output.write(&data, || {
        let mut text = format!("File: {}\n", filename);
        match record.owner {
            Owner::Account(owner) => text.push_str(&format!("Owner: {}\n", owner)),
            Owner::Immutable => text.push_str("Owner: none (immutable)\n"),
        }
        text.push_str(&format!("Payer: {}\n", record.payer));
        text.push_str(&format!("Nodes: {}\n", data.node_count));
        text.push_str(&format!("Size: {} bytes\n", data.data_bytes));
        if let (Some(first), Some(last)) = (data.first_id, data.last_id) {
            text.push_str(&format!("Ids: {}..={}\n", first, last));
        }
        text
    })
}

fn cmd_usage(root: &Path, account: &str, output: &OutputWriter) -> Result<()> {
    let ledger = open_ledger(root)?;
    let account = parse_name(account)?;
    let usage = ledger.state().ram_usage(account);

    let data = UsageOutput {
        success: true,
        result_code: 0,
        account,
        usage,
    };

    output.write(&data, || {
        format!(
            "{}: {} rows, {} bytes billed\n",
            account, usage.rows, usage.bytes
        )
    })
}

fn cmd_journal(root: &Path, count: usize, file: Option<&str>, output: &OutputWriter) -> Result<()> {
    let ledger = open_ledger(root)?;

    let entries = match file {
        Some(file) => {
            let entries = ledger
                .journal()
                .entries_for(parse_name(file)?)
                .with_context(|| "Failed to read journal")?;
            let skip = entries.len().saturating_sub(count);
            entries.into_iter().skip(skip).collect()
        }
        None => ledger
            .journal()
            .read_recent(count)
            .with_context(|| "Failed to read journal")?,
    };

    let entries: Vec<JournalEntryInfo> = entries.into_iter().map(Into::into).collect();

    let text = if entries.is_empty() {
        "No journal entries\n".to_string()
    } else {
        entries
            .iter()
            .map(|e| {
                format!(
                    "{} {} {} {} {}\n",
                    e.timestamp_human,
                    e.action,
                    e.owner,
                    e.filename,
                    e.detail.as_deref().unwrap_or("")
                )
            })
            .collect()
    };

    let data = JournalOutput {
        success: true,
        result_code: 0,
        entries,
    };
    output.write(&data, || text)
}

fn cmd_system_account(root: &Path, name: &str, output: &OutputWriter) -> Result<()> {
    let mut ledger = open_ledger(root)?;
    let account = parse_name(name)?;

    ledger
        .add_account(account)
        .with_context(|| format!("Failed to register account: {}", account))?;

    let data = SystemAccountOutput {
        success: true,
        result_code: 0,
        account,
    };
    output.write(&data, || format!("Registered account {}\n", account))
}

fn cmd_system_bid(
    root: &Path,
    name: &str,
    bidder: &str,
    amount: i64,
    time: u64,
    output: &OutputWriter,
) -> Result<()> {
    let mut ledger = open_ledger(root)?;
    let bid = NameBid {
        newname: parse_name(name)?,
        high_bidder: parse_name(bidder)?,
        high_bid: amount,
        last_bid_time: time,
    };

    ledger
        .place_bid(bid.clone())
        .with_context(|| format!("Failed to record bid on {}", bid.newname))?;

    let open = bid.is_open();
    let text = format!(
        "{} -> {} ({}, {})\n",
        bid.newname,
        bid.high_bidder,
        bid.high_bid,
        if open { "open" } else { "closed" }
    );
    let data = SystemBidOutput {
        success: true,
        result_code: 0,
        bid,
        open,
    };
    output.write(&data, || text)
}

fn cmd_system_list(root: &Path, output: &OutputWriter) -> Result<()> {
    let ledger = open_ledger(root)?;
    let registry = ledger.registry();

    let data = SystemListOutput {
        success: true,
        result_code: 0,
        system: ledger.config().system_account,
        accounts: registry.accounts().copied().collect(),
        bids: registry.bids().cloned().collect(),
    };

    output.write(&data, || {
        let mut text = format!("System account: {}\n", data.system);
        for account in &data.accounts {
            text.push_str(&format!("account {}\n", account));
        }
        for bid in &data.bids {
            text.push_str(&format!(
                "bid {} -> {} ({}, {})\n",
                bid.newname,
                bid.high_bidder,
                bid.high_bid,
                if bid.is_open() { "open" } else { "closed" }
            ));
        }
        text
    })
}
