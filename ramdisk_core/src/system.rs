//! Read-only view of the system name-auction registry and account table.

use crate::name::Name;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Default account holding the name-auction table.
pub const DEFAULT_SYSTEM_ACCOUNT: Name = Name::from_u64(0x5530_ea00_0000_0000); // eosio

/// One row of the name-auction table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameBid {
    /// Name being auctioned.
    pub newname: Name,
    /// Current (or winning) bidder.
    pub high_bidder: Name,
    /// Highest bid. Negative once the auction has closed.
    pub high_bid: i64,
    /// Time of the last bid, microseconds since the epoch.
    pub last_bid_time: u64,
}

impl NameBid {
    /// True while bidding is still in progress.
    pub fn is_open(&self) -> bool {
        self.high_bid >= 0
    }
}

/// Lookups the naming check needs from the host chain.
pub trait NameRegistry {
    /// The auction row for `name`, if one was ever created.
    fn name_bid(&self, name: Name) -> Option<NameBid>;

    /// True if an account named `name` exists.
    fn is_account(&self, name: Name) -> bool;
}

/// In-memory registry of accounts and name bids.
///
/// Stands in for the host chain's system tables when running locally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemRegistry {
    accounts: BTreeSet<Name>,
    bids: BTreeMap<Name, NameBid>,
}

impl SystemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account.
    pub fn add_account(&mut self, account: Name) {
        self.accounts.insert(account);
    }

    /// Create or replace the auction row for `bid.newname`.
    pub fn place_bid(&mut self, bid: NameBid) {
        self.bids.insert(bid.newname, bid);
    }

    /// All registered accounts in name order.
    pub fn accounts(&self) -> impl Iterator<Item = &Name> {
        self.accounts.iter()
    }

    /// All auction rows in name order.
    pub fn bids(&self) -> impl Iterator<Item = &NameBid> {
        self.bids.values()
    }
}

impl NameRegistry for SystemRegistry {
    fn name_bid(&self, name: Name) -> Option<NameBid> {
        self.bids.get(&name).cloned()
    }

    fn is_account(&self, name: Name) -> bool {
        self.accounts.contains(&name)
    }
}
